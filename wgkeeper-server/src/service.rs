//! Peer lifecycle orchestration: create, delete, startup import.
//!
//! Every read-modify-write of the config file runs behind one in-process
//! mutex, so concurrent API requests cannot interleave their edits. Writers
//! outside this process are still unprotected, and the file write and the
//! store write are not transactional: a crash between them leaves drift that
//! only the next startup import heals, and only for additions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use wgkeeper_core::{
    allocate, append_peer, parse_peers, remove_peer, render_client_config, sanitize_name,
    used_addresses, ClientConfig, ConfError, ConfStore,
};

use crate::artifacts;
use crate::error::{Error, Result};
use crate::keys;
use crate::settings::Settings;
use crate::store::{NewPeer, PeerRecord, PeerStore};
use crate::wg;

pub struct PeerManager {
    settings: Arc<Settings>,
    store: PeerStore,
    conf: ConfStore,
    conf_lock: Mutex<()>,
}

impl PeerManager {
    pub fn new(settings: Arc<Settings>, store: PeerStore) -> Self {
        let conf = ConfStore::new(&settings.conf_path);
        Self {
            settings,
            store,
            conf,
            conf_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &PeerStore {
        &self.store
    }

    /// Create a peer: allocate an address, generate a keypair, write client
    /// artifacts, append the block, restart the tunnel, persist the record.
    #[instrument(skip(self), fields(name = %name.trim()))]
    pub async fn create(&self, name: &str) -> Result<PeerRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.store.find_by_name(name).await?.is_some() {
            return Err(Error::NameTaken(name.to_string()));
        }

        let (private_key, public_key) = keys::generate_keypair(&self.settings).await?;
        let server_public = keys::load_server_public_key(&self.settings).await?;

        let (address, config_path, qr_path) = {
            let _guard = self.conf_lock.lock().await;
            let mut lines = self.conf.read()?;

            // The file and the store can disagree; exclude both.
            let mut used = used_addresses(&lines);
            used.extend(self.store.used_addresses().await?);
            let address = allocate(self.settings.network, &used)?.to_string();

            let client_text = render_client_config(&ClientConfig {
                private_key: &private_key,
                address: &address,
                dns: &self.settings.dns,
                server_public_key: &server_public,
                endpoint: &self.settings.endpoint,
            });
            let stem = sanitize_name(name);
            let config_path =
                artifacts::save_client_config(&self.settings.clients_dir(), &stem, &client_text)?;
            let qr_path = artifacts::save_qr_png(&self.settings.qr_dir(), &stem, &client_text)?;
            artifacts::save_key_copies(&self.settings, &stem, &private_key, &public_key)?;

            append_peer(&mut lines, name, &public_key, &address);
            self.conf.write(&lines)?;
            (address, config_path, qr_path)
        };

        // Already committed to file and disk; a restart failure surfaces to
        // the caller but nothing is rolled back.
        wg::restart(&self.settings).await?;
        wg::apply_add(&self.settings, &public_key, &address).await?;

        let config_path = config_path.display().to_string();
        let qr_path = qr_path.display().to_string();
        let id = self
            .store
            .insert(NewPeer {
                name,
                address: &address,
                public_key: &public_key,
                private_key: Some(&private_key),
                config_path: Some(&config_path),
                qr_path: Some(&qr_path),
            })
            .await?;
        info!(id, address, "peer created");
        self.store.find(id).await?.ok_or(Error::NotFound)
    }

    /// Delete a peer: drop its block from the file, restart, clean up
    /// artifacts, delete the record.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let record = self.store.find(id).await?.ok_or(Error::NotFound)?;

        {
            let _guard = self.conf_lock.lock().await;
            let mut lines = self.conf.read()?;
            if remove_peer(&mut lines, &record.address) {
                self.conf.write(&lines)?;
            } else {
                debug!(address = %record.address, "no matching block in config file");
            }
        }

        wg::restart(&self.settings).await?;
        wg::apply_remove(&self.settings, &record.public_key).await?;

        artifacts::remove_artifacts(&record);
        self.store.delete(id).await?;
        info!(id, address = %record.address, "peer deleted");
        Ok(())
    }

    /// One-shot startup reconciliation: import every file-derived peer the
    /// store does not know. Never runs again afterward.
    #[instrument(skip(self))]
    pub async fn import_from_conf(&self) -> Result<usize> {
        let lines = match self.conf.read() {
            Ok(lines) => lines,
            Err(ConfError::NotFound(path)) => {
                warn!(path = %path.display(), "config file missing, skipping import");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let descriptors = parse_peers(&lines);
        if descriptors.is_empty() {
            return Ok(0);
        }
        let imported = self.store.import(&descriptors).await?;
        info!(found = descriptors.len(), imported, "startup import done");
        Ok(imported)
    }
}
