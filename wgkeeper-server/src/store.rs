//! Peer record store over sqlite.
//!
//! One `peers` table keyed by rowid, with unique constraints on `name` and
//! `address`. Also hosts the startup reconciliation import that heals drift
//! between the config file and the store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use wgkeeper_core::parse::last_octet;
use wgkeeper_core::PeerDescriptor;

use crate::error::{Error, Result};

pub type PeerRowTuple = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

/// One persisted peer. `private_key` and the artifact paths are absent for
/// records created by import: the daemon file never stores a private key and
/// no artifacts were ever generated for them.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub config_path: Option<String>,
    pub qr_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PeerRowTuple> for PeerRecord {
    type Error = Error;

    fn try_from(row: PeerRowTuple) -> Result<Self> {
        let (id, name, address, public_key, private_key, config_path, qr_path, created_at) = row;
        Ok(PeerRecord {
            id,
            name,
            address,
            public_key,
            private_key,
            config_path,
            qr_path,
            created_at: parse_datetime(&created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| Error::Db(sqlx::Error::Decode(Box::new(e))))
}

/// Fields for one insert. Paths are owned by the caller; the store just
/// persists them.
#[derive(Debug, Clone, Copy)]
pub struct NewPeer<'a> {
    pub name: &'a str,
    pub address: &'a str,
    pub public_key: &'a str,
    pub private_key: Option<&'a str>,
    pub config_path: Option<&'a str>,
    pub qr_path: Option<&'a str>,
}

pub async fn connect(path: &Path) -> std::result::Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new().connect_with(options).await
}

#[derive(Clone)]
pub struct PeerStore {
    pool: SqlitePool,
}

impl PeerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                address TEXT UNIQUE NOT NULL,
                public_key TEXT NOT NULL,
                private_key TEXT,
                config_path TEXT,
                qr_path TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<PeerRecord>> {
        let rows: Vec<PeerRowTuple> = sqlx::query_as(
            "SELECT id, name, address, public_key, private_key, config_path, qr_path, created_at
             FROM peers ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PeerRecord::try_from).collect()
    }

    pub async fn find(&self, id: i64) -> Result<Option<PeerRecord>> {
        let row: Option<PeerRowTuple> = sqlx::query_as(
            "SELECT id, name, address, public_key, private_key, config_path, qr_path, created_at
             FROM peers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PeerRecord::try_from).transpose()
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<PeerRecord>> {
        let row: Option<PeerRowTuple> = sqlx::query_as(
            "SELECT id, name, address, public_key, private_key, config_path, qr_path, created_at
             FROM peers WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PeerRecord::try_from).transpose()
    }

    pub async fn find_by_address(&self, address: &str) -> Result<Option<PeerRecord>> {
        let row: Option<PeerRowTuple> = sqlx::query_as(
            "SELECT id, name, address, public_key, private_key, config_path, qr_path, created_at
             FROM peers WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PeerRecord::try_from).transpose()
    }

    pub async fn insert(&self, peer: NewPeer<'_>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO peers (name, address, public_key, private_key, config_path, qr_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(peer.name)
        .bind(peer.address)
        .bind(peer.public_key)
        .bind(peer.private_key)
        .bind(peer.config_path)
        .bind(peer.qr_path)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM peers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Every address currently recorded. Unioned with the config file's
    /// addresses at allocation time; the two can disagree.
    pub async fn used_addresses(&self) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT address FROM peers")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(a,)| a).collect())
    }

    /// Import file-derived descriptors, in file order. A descriptor whose
    /// address is already recorded is skipped; a name collision on a new
    /// address is resolved by appending `-<lastOctet>`. Imported records
    /// carry no private key and no artifact paths. Returns the count of new
    /// records.
    pub async fn import(&self, descriptors: &[PeerDescriptor]) -> Result<usize> {
        let mut imported = 0;
        for d in descriptors {
            if self.find_by_address(&d.allowed_address).await?.is_some() {
                continue;
            }
            let mut name = d.name.clone();
            if self.find_by_name(&name).await?.is_some() {
                name = format!("{}-{}", name, last_octet(&d.allowed_address));
            }
            self.insert(NewPeer {
                name: &name,
                address: &d.allowed_address,
                public_key: &d.public_key,
                private_key: None,
                config_path: None,
                qr_path: None,
            })
            .await?;
            imported += 1;
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> PeerStore {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("in-memory pool");
        let store = PeerStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn descriptor(name: &str, key: &str, address: &str) -> PeerDescriptor {
        PeerDescriptor {
            name: name.to_string(),
            public_key: key.to_string(),
            allowed_address: address.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_roundtrip() {
        let store = make_store().await;
        let id = store
            .insert(NewPeer {
                name: "laptop",
                address: "10.0.0.2",
                public_key: "AAA",
                private_key: Some("PRIV"),
                config_path: Some("data/clients/laptop.conf"),
                qr_path: None,
            })
            .await
            .unwrap();

        let rec = store.find(id).await.unwrap().unwrap();
        assert_eq!(rec.name, "laptop");
        assert_eq!(rec.address, "10.0.0.2");
        assert_eq!(rec.private_key.as_deref(), Some("PRIV"));
        assert!(rec.qr_path.is_none());

        assert!(store.find_by_name("laptop").await.unwrap().is_some());
        assert!(store.find_by_address("10.0.0.2").await.unwrap().is_some());
        assert!(store.find_by_address("10.0.0.9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = make_store().await;
        for (n, a) in [("a", "10.0.0.2"), ("b", "10.0.0.3")] {
            store
                .insert(NewPeer {
                    name: n,
                    address: a,
                    public_key: "K",
                    private_key: None,
                    config_path: None,
                    qr_path: None,
                })
                .await
                .unwrap();
        }
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "b");
        assert_eq!(all[1].name, "a");
    }

    #[tokio::test]
    async fn duplicate_address_is_rejected() {
        let store = make_store().await;
        let peer = NewPeer {
            name: "a",
            address: "10.0.0.2",
            public_key: "K",
            private_key: None,
            config_path: None,
            qr_path: None,
        };
        store.insert(peer).await.unwrap();
        let dup = NewPeer { name: "b", ..peer };
        assert!(store.insert(dup).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = make_store().await;
        let id = store
            .insert(NewPeer {
                name: "a",
                address: "10.0.0.2",
                public_key: "K",
                private_key: None,
                config_path: None,
                qr_path: None,
            })
            .await
            .unwrap();
        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert!(store.find(id).await.unwrap().is_none());
        assert_eq!(store.delete(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_is_idempotent_on_address() {
        let store = make_store().await;
        let peers = vec![descriptor("laptop", "AAA", "10.0.0.2")];
        assert_eq!(store.import(&peers).await.unwrap(), 1);
        assert_eq!(store.import(&peers).await.unwrap(), 0);
        assert_eq!(store.list().await.unwrap().len(), 1);

        let rec = store.find_by_address("10.0.0.2").await.unwrap().unwrap();
        assert!(rec.private_key.is_none());
        assert!(rec.config_path.is_none());
        assert!(rec.qr_path.is_none());
    }

    #[tokio::test]
    async fn import_renames_on_name_collision() {
        let store = make_store().await;
        let peers = vec![
            descriptor("laptop", "AAA", "10.0.0.2"),
            descriptor("laptop", "BBB", "10.0.0.3"),
        ];
        assert_eq!(store.import(&peers).await.unwrap(), 2);
        assert!(store.find_by_name("laptop").await.unwrap().is_some());
        let renamed = store.find_by_name("laptop-3").await.unwrap().unwrap();
        assert_eq!(renamed.address, "10.0.0.3");
    }

    #[tokio::test]
    async fn used_addresses_covers_all_records() {
        let store = make_store().await;
        store
            .import(&[
                descriptor("a", "K1", "10.0.0.2"),
                descriptor("b", "K2", "10.0.0.5"),
            ])
            .await
            .unwrap();
        let used = store.used_addresses().await.unwrap();
        assert!(used.contains("10.0.0.2"));
        assert!(used.contains("10.0.0.5"));
        assert_eq!(used.len(), 2);
    }
}
