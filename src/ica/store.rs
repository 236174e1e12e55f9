//! Persisted decomposition models, one per partition.
//!
//! A stored model is never refitted: re-running the pipeline reuses it, so a
//! partially completed session resumes without repeating the expensive fit.
use ndarray::ArrayView2;
use std::path::{Path, PathBuf};

use super::{Decomposer, DecompositionModel};
use crate::error::Result;

/// Identity of one partition's model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub basename: String,
    pub index: usize,
}

pub trait ModelStore: Send + Sync {
    fn load(&self, key: &ModelKey) -> Result<Option<DecompositionModel>>;
    fn save(&self, key: &ModelKey, model: &DecompositionModel) -> Result<()>;
}

/// Models as `<dir>/<basename>_<index>-ica.safetensors`.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    dir: PathBuf,
}

impl FsModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, key: &ModelKey) -> PathBuf {
        model_path(&self.dir, &key.basename, key.index)
    }
}

pub fn model_path(dir: &Path, basename: &str, index: usize) -> PathBuf {
    dir.join(format!("{basename}_{index}-ica.safetensors"))
}

impl ModelStore for FsModelStore {
    fn load(&self, key: &ModelKey) -> Result<Option<DecompositionModel>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        DecompositionModel::load(&path).map(Some)
    }

    fn save(&self, key: &ModelKey, model: &DecompositionModel) -> Result<()> {
        model.save(&self.path(key))
    }
}

/// Load the stored model for `key`, or fit one on `data` (excluding `ignore`)
/// and store it before returning.
pub fn load_or_fit(
    store: &dyn ModelStore,
    key: &ModelKey,
    decomposer: &dyn Decomposer,
    data: ArrayView2<f64>,
    ignore: &[bool],
) -> Result<DecompositionModel> {
    if let Some(model) = store.load(key)? {
        log::debug!("loading ICA (part {}) for {}", key.index, key.basename);
        return Ok(model);
    }
    log::debug!("running ICA (part {}) on {}", key.index, key.basename);
    let model = decomposer.fit(data, ignore)?;
    store.save(key, &model)?;
    Ok(model)
}
