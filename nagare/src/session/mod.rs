use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backends::BackendDescriptor;

const SNAPSHOT_MAGIC: &[u8; 4] = b"NGSS";
const SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_COMPRESSION_LEVEL: i32 = 1;

/// Identifies the exact backend configuration a snapshot was taken from.
/// A snapshot is only valid for that configuration; anything else is
/// rejected at load time instead of corrupting decode state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotHeader {
    pub backend_id: String,
    pub model_id: String,
    pub context_length: u64,
}

impl From<BackendDescriptor> for SnapshotHeader {
    fn from(value: BackendDescriptor) -> Self {
        Self {
            backend_id: value.backend_id,
            model_id: value.model_id,
            context_length: value.context_length,
        }
    }
}

impl std::fmt::Display for SnapshotHeader {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}/{} (context {})",
            self.backend_id, self.model_id, self.context_length
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unable to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to encode session: {0}")]
    Encode(String),
    #[error("Corrupt session file: {0}")]
    Corrupt(String),
    #[error("Incompatible session: expected {expected}, found {found}")]
    Incompatible { expected: String, found: String },
}

/// Snapshot files on disk: magic, format version, bincode header, then the
/// backend's opaque blob behind a zstd stream. The blob has no
/// cross-backend portability; the header is what makes mismatches
/// detectable.
pub struct SessionStore;

impl SessionStore {
    pub fn save(
        path: &Path,
        header: &SnapshotHeader,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        bincode::serialize_into(&mut writer, header)
            .map_err(|error| SessionError::Encode(error.to_string()))?;

        let mut encoder =
            zstd::stream::Encoder::new(writer, SNAPSHOT_COMPRESSION_LEVEL)?;
        encoder.write_all(payload)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;

        info!(
            path = %path.display(),
            bytes = payload.len(),
            "saved session snapshot"
        );
        Ok(())
    }

    pub fn load(
        path: &Path,
        expected: &SnapshotHeader,
    ) -> Result<Vec<u8>, SessionError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(SessionError::Corrupt(
                "not a session snapshot".to_string(),
            ));
        }
        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let version = u32::from_le_bytes(version);
        if version != SNAPSHOT_VERSION {
            return Err(SessionError::Corrupt(format!(
                "unsupported snapshot version {}",
                version
            )));
        }

        let header: SnapshotHeader = bincode::deserialize_from(&mut reader)
            .map_err(|error| SessionError::Corrupt(error.to_string()))?;
        if header != *expected {
            return Err(SessionError::Incompatible {
                expected: expected.to_string(),
                found: header.to_string(),
            });
        }

        let mut decoder = zstd::stream::Decoder::new(reader)?;
        let mut payload = Vec::new();
        decoder.read_to_end(&mut payload)?;

        info!(path = %path.display(), "loaded session snapshot");
        Ok(payload)
    }
}
