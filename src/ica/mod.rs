//! Independent-component decomposition of a partition.
//!
//! - [`model`]: the fitted transform, its exact inverse and persistence.
//! - [`fastica`]: the default fitting procedure.
//! - [`store`]: one persisted model per partition, reused across runs.

pub mod fastica;
pub mod model;
pub mod store;

use ndarray::ArrayView2;

use crate::error::Result;

pub use fastica::FastIca;
pub use model::DecompositionModel;
pub use store::{load_or_fit, model_path, FsModelStore, ModelKey, ModelStore};

/// Anything that can fit a decomposition on `[C, T]` data while leaving the
/// `ignore`d samples out of the fit.
pub trait Decomposer: Send + Sync {
    fn fit(&self, data: ArrayView2<f64>, ignore: &[bool]) -> Result<DecompositionModel>;
}
