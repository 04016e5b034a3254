//! Service error taxonomy. The API layer maps these onto status codes.

use wgkeeper_core::{AllocError, ConfError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("peer not found")]
    NotFound,
    #[error("name is required")]
    EmptyName,
    #[error("name already exists: {0}")]
    NameTaken(String),
    #[error(transparent)]
    Exhausted(#[from] AllocError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("server public key not found: {0}")]
    ServerKeyMissing(String),
    #[error(transparent)]
    Conf(#[from] ConfError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("qr encode failed: {0}")]
    Qr(#[from] qrcode::types::QrError),
    #[error("qr image write failed: {0}")]
    QrImage(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
