//! wg0.conf peer-block logic: parse, mutate, allocate.
//! Pure line-vector edits; the daemon decides when to read and write the file.

pub mod alloc;
pub mod client;
pub mod conf;
pub mod mutate;
pub mod parse;

pub use alloc::{allocate, AllocError};
pub use client::{render_client_config, sanitize_name, ClientConfig};
pub use conf::{ConfError, ConfStore};
pub use mutate::{append_peer, remove_peer};
pub use parse::{parse_peers, used_addresses, PeerDescriptor};
