//! Generated per-peer artifacts: client .conf file, QR PNG, optional key
//! copies. Filenames come from the sanitized peer name.

use std::fs;
use std::path::{Path, PathBuf};

use image::Luma;
use qrcode::QrCode;
use tracing::warn;

use crate::error::Result;
use crate::settings::Settings;
use crate::store::PeerRecord;

pub fn save_client_config(clients_dir: &Path, stem: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(clients_dir)?;
    let path = clients_dir.join(format!("{stem}.conf"));
    fs::write(&path, text)?;
    Ok(path)
}

/// Render the client config as a QR PNG so phones can import it with the
/// camera.
pub fn save_qr_png(qr_dir: &Path, stem: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(qr_dir)?;
    let path = qr_dir.join(format!("{stem}.png"));
    let code = QrCode::new(text.as_bytes())?;
    let img = code.render::<Luma<u8>>().build();
    img.save(&path)?;
    Ok(path)
}

pub fn save_key_copies(settings: &Settings, stem: &str, private: &str, public: &str) -> Result<()> {
    if !settings.save_keys {
        return Ok(());
    }
    fs::create_dir_all(&settings.keys_dir)?;
    fs::write(settings.keys_dir.join(format!("{stem}_private")), private)?;
    fs::write(settings.keys_dir.join(format!("{stem}_public")), public)?;
    Ok(())
}

/// Unlink a deleted peer's artifacts. Best effort: a missing or stubborn file
/// is logged, never an error, so the record deletion still goes through.
pub fn remove_artifacts(record: &PeerRecord) {
    for path in [&record.config_path, &record.qr_path].into_iter().flatten() {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path, error = %e, "could not remove artifact");
            }
        }
    }
}
