//! Address allocation from the tunnel network range.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// Pick the first free host address in `network`, ascending. The network and
/// broadcast addresses are never candidates, and any address whose final
/// octet is 1 is reserved for the daemon's own interface. `used` should be
/// the union of addresses seen in the config file and in the record store;
/// the two can disagree, so both are consulted by callers.
pub fn allocate(network: Ipv4Net, used: &HashSet<String>) -> Result<Ipv4Addr, AllocError> {
    for host in network.hosts() {
        if host.octets()[3] == 1 {
            continue;
        }
        if !used.contains(&host.to_string()) {
            return Ok(host);
        }
    }
    Err(AllocError::Exhausted(network))
}

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("no free address left in {0}")]
    Exhausted(Ipv4Net),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used(addrs: &[&str]) -> HashSet<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn skips_reserved_first_host() {
        let net: Ipv4Net = "10.0.0.0/24".parse().unwrap();
        let ip = allocate(net, &HashSet::new()).unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn skips_used_addresses() {
        let net: Ipv4Net = "10.0.0.0/24".parse().unwrap();
        let ip = allocate(net, &used(&["10.0.0.2"])).unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 3));
    }

    #[test]
    fn never_yields_network_broadcast_or_dot_one() {
        let net: Ipv4Net = "10.0.0.0/29".parse().unwrap();
        let mut seen = HashSet::new();
        loop {
            match allocate(net, &seen) {
                Ok(ip) => {
                    assert_ne!(ip, net.network());
                    assert_ne!(ip, net.broadcast());
                    assert_ne!(ip.octets()[3], 1);
                    seen.insert(ip.to_string());
                }
                Err(AllocError::Exhausted(_)) => break,
            }
        }
        // /29 has hosts .1-.6; .1 is reserved.
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn exhausted_when_only_reserved_host_remains() {
        let net: Ipv4Net = "10.0.0.0/30".parse().unwrap();
        let err = allocate(net, &used(&["10.0.0.2"]));
        assert!(matches!(err, Err(AllocError::Exhausted(_))));
    }
}
