//! Client-side config rendering and artifact filename handling.

/// Inputs for one rendered client configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig<'a> {
    pub private_key: &'a str,
    pub address: &'a str,
    pub dns: &'a str,
    pub server_public_key: &'a str,
    pub endpoint: &'a str,
}

/// Render the config text a client imports: its own `[Interface]` plus one
/// `[Peer]` pointing at the server, routing everything through the tunnel.
pub fn render_client_config(cfg: &ClientConfig<'_>) -> String {
    [
        "[Interface]".to_string(),
        format!("PrivateKey = {}", cfg.private_key),
        format!("Address = {}/32", cfg.address),
        format!("DNS = {}", cfg.dns),
        String::new(),
        "[Peer]".to_string(),
        format!("PublicKey = {}", cfg.server_public_key),
        format!("Endpoint = {}", cfg.endpoint),
        "AllowedIPs = 0.0.0.0/0".to_string(),
        "PersistentKeepalive = 20".to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Reduce a peer name to a safe artifact filename stem: runs of characters
/// outside `[A-Za-z0-9_-]` collapse to one `_`, leading/trailing `_` are
/// dropped, and an empty result falls back to `peer`.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sub = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            pending_sub = false;
        } else if !pending_sub {
            out.push('_');
            pending_sub = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "peer".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_full_client_config() {
        let text = render_client_config(&ClientConfig {
            private_key: "PRIV",
            address: "10.0.0.2",
            dns: "8.8.8.8",
            server_public_key: "SRV",
            endpoint: "vpn.example.net:51820",
        });
        assert_eq!(
            text,
            "[Interface]\nPrivateKey = PRIV\nAddress = 10.0.0.2/32\nDNS = 8.8.8.8\n\n[Peer]\nPublicKey = SRV\nEndpoint = vpn.example.net:51820\nAllowedIPs = 0.0.0.0/0\nPersistentKeepalive = 20\n"
        );
    }

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize_name("alice's laptop!"), "alice_s_laptop");
        assert_eq!(sanitize_name("  my phone  "), "my_phone");
        assert_eq!(sanitize_name("ok-name_1"), "ok-name_1");
    }

    #[test]
    fn sanitize_falls_back_to_peer() {
        assert_eq!(sanitize_name("!!!"), "peer");
        assert_eq!(sanitize_name(""), "peer");
    }
}
