//! Keypair generation. Real mode shells out to the `wg` binary; fake mode
//! produces random base64 material for hosts without it.

use base64::prelude::*;
use rand::RngCore;
use tokio::fs;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::wg::run_cmd;

/// Generate a (private, public) keypair. Fake mode keys are two independent
/// random values: good enough for exercising the pipeline, useless for an
/// actual handshake.
pub async fn generate_keypair(settings: &Settings) -> Result<(String, String)> {
    if settings.fake_keys {
        return Ok((random_key(), random_key()));
    }
    let private = run_cmd("wg", &["genkey"], None).await?;
    let public = run_cmd("wg", &["pubkey"], Some(&private)).await?;
    Ok((private, public))
}

fn random_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

/// Read the server's own public key for client configs.
pub async fn load_server_public_key(settings: &Settings) -> Result<String> {
    match fs::read_to_string(&settings.server_public_key_path).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ServerKeyMissing(
            settings.server_public_key_path.display().to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_keys_are_distinct_base64() {
        let settings = Settings {
            fake_keys: true,
            ..Settings::default()
        };
        let (private, public) = generate_keypair(&settings).await.unwrap();
        assert_ne!(private, public);
        assert_eq!(BASE64_STANDARD.decode(&private).unwrap().len(), 32);
        assert_eq!(BASE64_STANDARD.decode(&public).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn missing_server_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            server_public_key_path: dir.path().join("publickey"),
            ..Settings::default()
        };
        let err = load_server_public_key(&settings).await.unwrap_err();
        assert!(matches!(err, Error::ServerKeyMissing(_)));
    }

    #[tokio::test]
    async fn server_key_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publickey");
        std::fs::write(&path, "SRVKEY\n").unwrap();
        let settings = Settings {
            server_public_key_path: path,
            ..Settings::default()
        };
        assert_eq!(load_server_public_key(&settings).await.unwrap(), "SRVKEY");
    }
}
