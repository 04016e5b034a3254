//! Peer block parser: scans config lines for `[Peer]` stanzas and produces
//! structured descriptors. Lenient by design — incomplete blocks are skipped,
//! never an error, so hand-edited files keep working.

use serde::{Deserialize, Serialize};

/// One peer as read out of the config file. Reconstructed on every parse;
/// carries no identity beyond its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub name: String,
    pub public_key: String,
    pub allowed_address: String,
}

/// Parser state: outside any peer block, or inside one with the fields
/// collected so far.
enum State {
    Idle,
    InBlock {
        public_key: Option<String>,
        allowed_address: Option<String>,
    },
}

/// Extract all complete peer blocks, in file order.
///
/// Comments accumulate across blank lines; the last one before a block's data
/// lines becomes the peer name. A block with no preceding comment gets the
/// placeholder `peer-<lastOctet>`. A section header other than `[Peer]`
/// discards pending comments. A block is emitted as soon as both `PublicKey`
/// and `AllowedIPs` have been seen (keys matched case-insensitively, the
/// address prefix stripped), at most once per block.
pub fn parse_peers(lines: &[String]) -> Vec<PeerDescriptor> {
    let mut peers = Vec::new();
    let mut comments: Vec<String> = Vec::new();
    let mut state = State::Idle;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            let comment = rest.trim_start_matches('#').trim();
            if !comment.is_empty() {
                comments.push(comment.to_string());
            }
            continue;
        }
        if line == "[Peer]" {
            state = State::InBlock {
                public_key: None,
                allowed_address: None,
            };
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            state = State::Idle;
            comments.clear();
            continue;
        }
        if let State::InBlock {
            public_key,
            allowed_address,
        } = &mut state
        {
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.eq_ignore_ascii_case("PublicKey") {
                    let value = value.trim();
                    if !value.is_empty() {
                        *public_key = Some(value.to_string());
                    }
                } else if key.eq_ignore_ascii_case("AllowedIPs") {
                    let address = value.trim().split('/').next().unwrap_or("");
                    if !address.is_empty() {
                        *allowed_address = Some(address.to_string());
                    }
                }
            }
            if let (Some(pk), Some(addr)) = (public_key.as_ref(), allowed_address.as_ref()) {
                let name = comments
                    .last()
                    .cloned()
                    .unwrap_or_else(|| format!("peer-{}", last_octet(addr)));
                peers.push(PeerDescriptor {
                    name,
                    public_key: pk.clone(),
                    allowed_address: addr.clone(),
                });
                state = State::Idle;
                comments.clear();
            }
        }
    }

    peers
}

/// Every address mentioned on an `AllowedIPs` line, block structure ignored.
/// Used to exclude in-file addresses from allocation, including addresses in
/// blocks this system never wrote.
pub fn used_addresses(lines: &[String]) -> std::collections::HashSet<String> {
    let mut used = std::collections::HashSet::new();
    for raw in lines {
        let line = raw.trim();
        if !line.to_ascii_lowercase().starts_with("allowedips") {
            continue;
        }
        if let Some((_, value)) = line.split_once('=') {
            let address = value.trim().split('/').next().unwrap_or("");
            if !address.is_empty() {
                used.insert(address.to_string());
            }
        }
    }
    used
}

/// Final dotted octet of an address (the address itself if it has no dots).
pub fn last_octet(address: &str) -> &str {
    address.rsplit('.').next().unwrap_or(address)
}
