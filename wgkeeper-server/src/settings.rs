//! Load settings from file and environment. Built once at startup and passed
//! by reference; no ambient global state.

use std::net::SocketAddr;
use std::path::PathBuf;

use ipnet::Ipv4Net;
use serde::Deserialize;

/// Daemon settings. File: ~/.config/wgkeeper/config.toml or
/// /etc/wgkeeper/config.toml. Every field has a WGKEEPER_* env override.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// API listen address (default 127.0.0.1:8080).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Shared daemon config file this server appends peer blocks to.
    #[serde(default = "default_conf_path")]
    pub conf_path: PathBuf,
    /// Address pool for peers.
    #[serde(default = "default_network")]
    pub network: Ipv4Net,
    /// Interface name, used for restarts and live apply.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Endpoint clients dial, host:port.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// DNS pushed into client configs.
    #[serde(default = "default_dns")]
    pub dns: String,
    /// Where the server's own public key is read from.
    #[serde(default = "default_server_public_key_path")]
    pub server_public_key_path: PathBuf,
    /// Root for generated artifacts: clients/, qr/, peers.db.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where per-peer key copies land when save_keys is on.
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,
    /// Restart the tunnel after each mutation.
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Push peer changes into the running interface with `wg set`.
    #[serde(default)]
    pub live_apply: bool,
    /// Generate random key material instead of calling `wg` (dev hosts).
    #[serde(default)]
    pub fake_keys: bool,
    /// Keep per-peer private/public key copies on disk.
    #[serde(default)]
    pub save_keys: bool,
    /// Import peers found in the config file at startup.
    #[serde(default = "default_true")]
    pub import_on_start: bool,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}
fn default_conf_path() -> PathBuf {
    PathBuf::from("/etc/wireguard/wg0.conf")
}
fn default_network() -> Ipv4Net {
    "10.0.0.0/24".parse().unwrap()
}
fn default_interface() -> String {
    "wg0".to_string()
}
fn default_endpoint() -> String {
    "127.0.0.1:51820".to_string()
}
fn default_dns() -> String {
    "8.8.8.8".to_string()
}
fn default_server_public_key_path() -> PathBuf {
    PathBuf::from("/etc/wireguard/keys/publickey")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_keys_dir() -> PathBuf {
    PathBuf::from("/etc/wireguard/keys")
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            conf_path: default_conf_path(),
            network: default_network(),
            interface: default_interface(),
            endpoint: default_endpoint(),
            dns: default_dns(),
            server_public_key_path: default_server_public_key_path(),
            data_dir: default_data_dir(),
            keys_dir: default_keys_dir(),
            restart: true,
            live_apply: false,
            fake_keys: false,
            save_keys: false,
            import_on_start: true,
        }
    }
}

impl Settings {
    pub fn clients_dir(&self) -> PathBuf {
        self.data_dir.join("clients")
    }

    pub fn qr_dir(&self) -> PathBuf {
        self.data_dir.join("qr")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("peers.db")
    }
}

/// Load settings: defaults, then config file (if present), then env vars.
pub fn load() -> Settings {
    let mut s = load_file().unwrap_or_default();
    if let Ok(v) = std::env::var("WGKEEPER_LISTEN_ADDR") {
        if let Ok(a) = v.parse() {
            s.listen_addr = a;
        }
    }
    if let Ok(v) = std::env::var("WGKEEPER_CONF_PATH") {
        s.conf_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("WGKEEPER_NETWORK") {
        if let Ok(n) = v.parse() {
            s.network = n;
        }
    }
    if let Ok(v) = std::env::var("WGKEEPER_INTERFACE") {
        s.interface = v;
    }
    if let Ok(v) = std::env::var("WGKEEPER_ENDPOINT") {
        s.endpoint = v;
    }
    if let Ok(v) = std::env::var("WGKEEPER_DNS") {
        s.dns = v;
    }
    if let Ok(v) = std::env::var("WGKEEPER_SERVER_PUBLIC_KEY_PATH") {
        s.server_public_key_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("WGKEEPER_DATA_DIR") {
        s.data_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("WGKEEPER_KEYS_DIR") {
        s.keys_dir = PathBuf::from(v);
    }
    s.restart = env_flag("WGKEEPER_RESTART", s.restart);
    s.live_apply = env_flag("WGKEEPER_LIVE_APPLY", s.live_apply);
    s.fake_keys = env_flag("WGKEEPER_FAKE_KEYS", s.fake_keys);
    s.save_keys = env_flag("WGKEEPER_SAVE_KEYS", s.save_keys);
    s.import_on_start = env_flag("WGKEEPER_IMPORT_ON_START", s.import_on_start);
    s
}

fn env_flag(var: &str, current: bool) -> bool {
    match std::env::var(var) {
        Ok(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        Err(_) => current,
    }
}

fn config_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(p) = std::env::var("WGKEEPER_CONFIG") {
        out.push(PathBuf::from(p));
        return out;
    }
    if let Some(h) = std::env::var_os("HOME").map(PathBuf::from) {
        out.push(h.join(".config/wgkeeper/config.toml"));
    }
    out.push(PathBuf::from("/etc/wgkeeper/config.toml"));
    out
}

fn load_file() -> Option<Settings> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Settings>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}
