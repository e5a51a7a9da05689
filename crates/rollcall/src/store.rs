use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

use rollcall_core::{Encoding, Gallery, GalleryEntry};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("encoding encryption failed")]
    EncryptionFailed,
    #[error("encoding decryption failed: key mismatch or corrupted data")]
    DecryptionFailed,
    #[error("invalid encoding blob size: {0} bytes")]
    InvalidBlob(usize),
    #[error("encoding is empty")]
    EmptyEncoding,
    #[error("invalid encoding value (NaN/Inf)")]
    InvalidEncodingValue,
    #[error("encryption key I/O error: {0}")]
    KeyIo(#[source] std::io::Error),
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// SQLite-backed enrollment store with AES-256-GCM encrypted encodings.
///
/// A per-installation 32-byte key is generated at first use and stored at
/// `{db_dir}/.key` (mode 0600). The same connection also hosts the attendance
/// ledger, see [`crate::ledger::AttendanceLedger`].
#[derive(Clone)]
pub struct FaceStore {
    conn: Connection,
    enc_key: [u8; 32],
}

impl FaceStore {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let enc_key = if db_path == Path::new(":memory:") {
            // In-memory DB (tests): fixed all-zeros key
            [0u8; 32]
        } else {
            let key_path = db_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(".key");
            load_or_generate_key(&key_path)?
        };

        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE IF NOT EXISTS users (
                     identity TEXT PRIMARY KEY,
                     email TEXT NOT NULL DEFAULT '',
                     roll_no TEXT NOT NULL DEFAULT '',
                     encoding BLOB NOT NULL,
                     dim INTEGER NOT NULL,
                     created_at TEXT NOT NULL
                 );",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, enc_key })
    }

    /// Shared connection, for components living in the same database.
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    /// Enroll an identity. Re-enrolling replaces the encoding and contact
    /// details but keeps the identity's position in the gallery.
    pub async fn enroll(
        &self,
        identity: &str,
        email: &str,
        roll_no: &str,
        encoding: &Encoding,
    ) -> Result<(), StoreError> {
        validate_encoding_values(encoding.values())?;
        let blob = self.encrypt_encoding(encoding.values())?;
        let dim = encoding.dim() as i64;
        let created_at = chrono::Utc::now().to_rfc3339();

        let identity = identity.to_string();
        let email = email.to_string();
        let roll_no = roll_no.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (identity, email, roll_no, encoding, dim, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(identity) DO UPDATE SET
                         email = excluded.email,
                         roll_no = excluded.roll_no,
                         encoding = excluded.encoding,
                         dim = excluded.dim",
                    rusqlite::params![identity, email, roll_no, blob, dim, created_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    /// Snapshot of every enrolled encoding, in enrollment order.
    pub async fn gallery(&self) -> Result<Gallery, StoreError> {
        // Fetch raw rows from SQLite; decrypt outside the blocking closure
        let rows: Vec<(String, Vec<u8>)> = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT identity, encoding FROM users ORDER BY rowid")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (identity, blob) in rows {
            let values = self.decrypt_encoding(&blob)?;
            entries.push(GalleryEntry {
                identity,
                encoding: Encoding::new(values),
            });
        }
        Ok(entries.into_iter().collect())
    }

    /// Enrolled users (metadata only, no encodings), in enrollment order.
    pub async fn users(&self) -> Result<Vec<UserInfo>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT identity, email, roll_no, dim, created_at
                     FROM users ORDER BY rowid",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(UserInfo {
                        identity: row.get(0)?,
                        email: row.get(1)?,
                        roll_no: row.get(2)?,
                        dim: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Remove an enrolled identity. Attendance history is kept.
    pub async fn remove(&self, identity: &str) -> Result<bool, StoreError> {
        let identity = identity.to_string();
        self.conn
            .call(move |conn| {
                let affected = conn.execute("DELETE FROM users WHERE identity = ?1", [&identity])?;
                Ok(affected > 0)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.conn
            .call(|conn| {
                let count: u64 =
                    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(StoreError::from)
    }

    // ── Encryption helpers ────────────────────────────────────────────────────

    /// Output: 12-byte random nonce || ciphertext || 16-byte GCM tag.
    fn encrypt_encoding(&self, values: &[f32]) -> Result<Vec<u8>, StoreError> {
        let plaintext = encoding_to_bytes(values);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let key = Key::<Aes256Gcm>::from_slice(&self.enc_key);
        let cipher = Aes256Gcm::new(key);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| StoreError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn decrypt_encoding(&self, blob: &[u8]) -> Result<Vec<f32>, StoreError> {
        if blob.len() <= NONCE_LEN {
            return Err(StoreError::InvalidBlob(blob.len()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let key = Key::<Aes256Gcm>::from_slice(&self.enc_key);
        let cipher = Aes256Gcm::new(key);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| StoreError::DecryptionFailed)?;

        bytes_to_encoding(&plaintext)
    }
}

// ── Key management ────────────────────────────────────────────────────────────

/// Load the encryption key from disk, or generate and persist a new one.
fn load_or_generate_key(key_path: &Path) -> Result<[u8; 32], StoreError> {
    if key_path.exists() {
        let bytes = std::fs::read(key_path).map_err(StoreError::KeyIo)?;
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            StoreError::KeyIo(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "encryption key file has wrong length ({} bytes, expected 32)",
                    bytes.len()
                ),
            ))
        })?;
        tracing::debug!(path = %key_path.display(), "loaded encryption key");
        Ok(key)
    } else {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);

        use std::io::Write;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut f = options.open(key_path).map_err(StoreError::KeyIo)?;
        f.write_all(&key).map_err(StoreError::KeyIo)?;

        tracing::info!(path = %key_path.display(), "generated new AES-256 encryption key");
        Ok(key)
    }
}

// ── Serialization helpers ─────────────────────────────────────────────────────

fn encoding_to_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_encoding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidBlob(bytes.len()));
    }

    let mut values = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let arr: [u8; 4] = chunk
            .try_into()
            .map_err(|_| StoreError::InvalidBlob(bytes.len()))?;
        let v = f32::from_le_bytes(arr);
        if !v.is_finite() {
            return Err(StoreError::InvalidEncodingValue);
        }
        values.push(v);
    }
    Ok(values)
}

fn validate_encoding_values(values: &[f32]) -> Result<(), StoreError> {
    if values.is_empty() {
        return Err(StoreError::EmptyEncoding);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::InvalidEncodingValue);
    }
    Ok(())
}

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata about an enrolled user (no encoding data).
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserInfo {
    pub identity: String,
    pub email: String,
    pub roll_no: String,
    pub dim: i64,
    pub created_at: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
