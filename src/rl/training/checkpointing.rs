//! Model Checkpointing
//!
//! Model files carry a small versioned header in front of the parameter
//! record so that an architecture mismatch is reported before any parameter
//! is touched:
//!
//! ```text
//! b"RBAL" | u32 LE header length | JSON header | parameter record
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RebalanceError, Result};

/// Leading bytes of every model file
pub const MODEL_MAGIC: &[u8; 4] = b"RBAL";

/// Current model file format version
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Architecture description stored with the parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHeader {
    pub format_version: u32,
    pub n_assets: usize,
    pub state_dim: usize,
    pub action_dim: usize,
    pub hidden_dim: usize,
    pub saved_at: DateTime<Utc>,
}

impl ModelHeader {
    /// Header for the current format, stamped now
    pub fn new(n_assets: usize, state_dim: usize, action_dim: usize, hidden_dim: usize) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            n_assets,
            state_dim,
            action_dim,
            hidden_dim,
            saved_at: Utc::now(),
        }
    }

    /// Compact architecture string used in error messages
    pub fn architecture(&self) -> String {
        format!(
            "n_assets={}, state_dim={}, action_dim={}, hidden_dim={}",
            self.n_assets, self.state_dim, self.action_dim, self.hidden_dim
        )
    }

    /// Fail unless `self` (read from disk) matches the live architecture
    pub fn ensure_compatible(&self, live: &ModelHeader) -> Result<()> {
        if self.n_assets != live.n_assets
            || self.state_dim != live.state_dim
            || self.action_dim != live.action_dim
            || self.hidden_dim != live.hidden_dim
        {
            return Err(RebalanceError::IncompatibleModel {
                expected: live.architecture(),
                found: self.architecture(),
            });
        }
        Ok(())
    }
}

/// Encode header and parameter record into the model file layout
pub fn encode_model(header: &ModelHeader, record: &[u8]) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(header)?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| RebalanceError::ModelFormat("header too large".to_string()))?;

    let mut bytes = Vec::with_capacity(8 + header_bytes.len() + record.len());
    bytes.extend_from_slice(MODEL_MAGIC);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(&header_bytes);
    bytes.extend_from_slice(record);
    Ok(bytes)
}

/// Split a model file into header and parameter record
pub fn decode_model(bytes: &[u8]) -> Result<(ModelHeader, Vec<u8>)> {
    if bytes.len() < 8 || &bytes[..4] != MODEL_MAGIC {
        return Err(RebalanceError::ModelFormat(
            "missing model file signature".to_string(),
        ));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[4..8]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_end = 8usize
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| RebalanceError::ModelFormat("truncated model header".to_string()))?;

    let header: ModelHeader = serde_json::from_slice(&bytes[8..header_end])
        .map_err(|e| RebalanceError::ModelFormat(format!("unreadable model header: {}", e)))?;
    if header.format_version != MODEL_FORMAT_VERSION {
        return Err(RebalanceError::ModelFormat(format!(
            "unsupported model format version {} (expected {})",
            header.format_version, MODEL_FORMAT_VERSION
        )));
    }
    Ok((header, bytes[header_end..].to_vec()))
}

/// Write a model file; the target is replaced only once the write completed
pub fn write_model_file(path: &Path, header: &ModelHeader, record: &[u8]) -> Result<()> {
    let bytes = encode_model(header, record)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), arch = %header.architecture(), "Saved model");
    Ok(())
}

/// Read a model file into header and parameter record
pub fn read_model_file(path: &Path) -> Result<(ModelHeader, Vec<u8>)> {
    let bytes = fs::read(path)?;
    decode_model(&bytes)
}

/// Read only the header of a model file
pub fn read_model_header(path: &Path) -> Result<ModelHeader> {
    read_model_file(path).map(|(header, _)| header)
}

/// Checkpoint paths derived from the final save path
#[derive(Debug, Clone)]
pub struct Checkpointer {
    checkpoint_dir: PathBuf,
    prefix: String,
    extension: String,
}

impl Checkpointer {
    /// Checkpoints land next to `save_path`, named after its stem
    pub fn for_save_path(save_path: &Path) -> Self {
        let checkpoint_dir = save_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let prefix = save_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let extension = save_path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());
        Self {
            checkpoint_dir,
            prefix,
            extension,
        }
    }

    /// Path of the checkpoint written after `episode`
    pub fn episode_path(&self, episode: usize) -> PathBuf {
        self.checkpoint_dir.join(format!(
            "{}.{}",
            episode_name(&self.prefix, episode),
            self.extension
        ))
    }
}

/// Generate a checkpoint name with timestamp
pub fn timestamped_name(prefix: &str) -> String {
    let now = Utc::now();
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Generate a checkpoint name with episode number
pub fn episode_name(prefix: &str, episode: usize) -> String {
    format!("{}_ep{:06}", prefix, episode)
}
