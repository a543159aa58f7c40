//! # Checkpoints
//!
//! Weights go to `<model_dir>/<model><task>.safetensors`; a JSON sidecar with
//! the same stem records the architecture and the epoch that produced them.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use msfan_core::{EmbeddingTables, MsfanError, Result, Task};
use safetensors::SafeTensors;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::model::Msfan;

/// `<model_dir>/<name><task>.safetensors`
pub fn checkpoint_path(model_dir: &Path, name: &str, task: Task) -> PathBuf {
    model_dir.join(format!("{name}{task}.safetensors"))
}

/// Sidecar path next to a weights file.
pub fn metadata_path(weights: &Path) -> PathBuf {
    weights.with_extension("json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub model: ModelConfig,
    pub task: Task,
    pub epoch: usize,
    pub dev_f1: f64,
}

/// Write weights and sidecar, overwriting any previous checkpoint.
pub fn save(varmap: &VarMap, metadata: &CheckpointMetadata, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    varmap.save(path)?;
    fs::write(metadata_path(path), serde_json::to_vec_pretty(metadata)?)?;
    info!(
        path = %path.display(),
        epoch = metadata.epoch,
        dev_f1 = metadata.dev_f1,
        "checkpoint written"
    );
    Ok(())
}

pub fn load_metadata(path: &Path) -> Result<CheckpointMetadata> {
    let sidecar = metadata_path(path);
    let bytes = fs::read(&sidecar).map_err(|source| MsfanError::Read {
        path: sidecar.clone(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Rebuild the model described by the sidecar and restore its weights.
///
/// Every variable the architecture declares must be present in the file with
/// a matching shape.
pub fn load(
    path: &Path,
    tables: &EmbeddingTables,
    device: &Device,
) -> Result<(Msfan, VarMap, CheckpointMetadata)> {
    if !path.exists() {
        return Err(MsfanError::Checkpoint(format!(
            "no checkpoint at {}",
            path.display()
        )));
    }
    let metadata = load_metadata(path)?;

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = Msfan::new(tables, &metadata.model, vb)?;
    varmap
        .load(path)
        .map_err(|e| MsfanError::Checkpoint(format!("{}: {e}", path.display())))?;

    for (name, shape) in inventory(path)? {
        debug!(%name, ?shape, "restored tensor");
    }
    info!(
        path = %path.display(),
        epoch = metadata.epoch,
        dev_f1 = metadata.dev_f1,
        "checkpoint loaded"
    );
    Ok((model, varmap, metadata))
}

/// Names and shapes of the tensors stored in a safetensors file, sorted.
pub fn inventory(path: &Path) -> Result<Vec<(String, Vec<usize>)>> {
    let bytes = fs::read(path).map_err(|source| MsfanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tensors =
        SafeTensors::deserialize(&bytes).map_err(|e| MsfanError::Checkpoint(e.to_string()))?;
    let mut entries: Vec<(String, Vec<usize>)> = tensors
        .tensors()
        .into_iter()
        .map(|(name, view)| (name, view.shape().to_vec()))
        .collect();
    entries.sort();
    Ok(entries)
}
