//! Tunnel daemon control: restart via systemctl, live peer changes via
//! `wg set`. Every invocation goes through one spawn-and-collect helper.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Run a command, optionally feeding `input` on stdin, and collect trimmed
/// stdout. A nonzero exit surfaces trimmed stderr as a command failure.
pub async fn run_cmd(program: &str, args: &[&str], input: Option<&str>) -> Result<String> {
    debug!(program, ?args, "running command");
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    if let Some(text) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }
    }
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::Command(if stderr.is_empty() {
            format!("{program} exited with {}", output.status)
        } else {
            stderr
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Restart the tunnel unit so a rewritten config file takes effect. Gated by
/// the restart toggle; synchronous relative to the request that triggered it.
pub async fn restart(settings: &Settings) -> Result<()> {
    if !settings.restart {
        return Ok(());
    }
    let unit = format!("wg-quick@{}", settings.interface);
    run_cmd("systemctl", &["restart", &unit], None).await?;
    Ok(())
}

/// Push a new peer into the running interface without a restart.
pub async fn apply_add(settings: &Settings, public_key: &str, address: &str) -> Result<()> {
    if !settings.live_apply || settings.fake_keys {
        return Ok(());
    }
    let allowed = format!("{address}/32");
    run_cmd(
        "wg",
        &[
            "set",
            &settings.interface,
            "peer",
            public_key,
            "allowed-ips",
            &allowed,
        ],
        None,
    )
    .await?;
    Ok(())
}

/// Drop a peer from the running interface without a restart.
pub async fn apply_remove(settings: &Settings, public_key: &str) -> Result<()> {
    if !settings.live_apply || settings.fake_keys {
        return Ok(());
    }
    run_cmd(
        "wg",
        &["set", &settings.interface, "peer", public_key, "remove"],
        None,
    )
    .await?;
    Ok(())
}
