//! A fitted decomposition and its exact inverse.
//!
//! Forward (channels → components), per channel `c`:
//!
//! ```text
//! x'  = x / pre_whitener[c]
//! x'' = x' − pca_mean[c]
//! s   = unmixing · pca_components · x''
//! ```
//!
//! [`DecompositionModel::reconstruct`] undoes these steps in reverse order.
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::path::Path;

use crate::error::{CleanError, Result};
use crate::io::{StReader, StWriter};

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionModel {
    /// [C, K] components → PCA space.
    pub mixing: Array2<f64>,
    /// [K, C] PCA space → components (whitening folded in). Inverse of
    /// `mixing`; `K == C` for every model the pipeline fits.
    pub unmixing: Array2<f64>,
    /// [C, C] orthonormal projection, rows in decreasing explained variance.
    pub pca_components: Array2<f64>,
    /// [C] mean of the scaled data, removed before projection.
    pub pca_mean: Array1<f64>,
    /// [C] per-channel scale divided out before centring.
    pub pre_whitener: Array1<f64>,
}

impl DecompositionModel {
    pub fn n_channels(&self) -> usize {
        self.pca_mean.len()
    }

    pub fn n_components(&self) -> usize {
        self.unmixing.nrows()
    }

    /// Component time series for `data` ([C, T]) → [K, T].
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        if data.nrows() != self.n_channels() {
            return Err(CleanError::MalformedInput(format!(
                "model expects {} channels, data has {}",
                self.n_channels(),
                data.nrows()
            )));
        }
        let mut x = data.to_owned();
        x /= &self.pre_whitener.view().insert_axis(Axis(1));
        x -= &self.pca_mean.view().insert_axis(Axis(1));
        let pca = self.pca_components.dot(&x);
        Ok(self.unmixing.dot(&pca))
    }

    /// Map (cleaned) component series ([K, T]) back to channel space in
    /// original units.
    ///
    /// Order matters: the mean is restored before the scale because the
    /// forward pass scaled first and centred second.
    pub fn reconstruct(&self, sources: ArrayView2<f64>) -> Result<Array2<f64>> {
        if sources.nrows() != self.n_components() {
            return Err(CleanError::MalformedInput(format!(
                "model has {} components, sources have {}",
                self.n_components(),
                sources.nrows()
            )));
        }
        let pca = self.mixing.dot(&sources);
        let proj_inv = invert(&self.pca_components)?;
        let mut x = proj_inv.dot(&pca);
        x += &self.pca_mean.view().insert_axis(Axis(1));
        x *= &self.pre_whitener.view().insert_axis(Axis(1));
        Ok(x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64_arr2("mixing", &self.mixing);
        w.add_f64_arr2("unmixing", &self.unmixing);
        w.add_f64_arr2("pca_components", &self.pca_components);
        w.add_f64_arr1("pca_mean", &self.pca_mean);
        w.add_f64_arr1("pre_whitener", &self.pre_whitener);
        w.write(path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let r = StReader::open(path)?;
        let model = Self {
            mixing: r.f64_arr2("mixing")?,
            unmixing: r.f64_arr2("unmixing")?,
            pca_components: r.f64_arr2("pca_components")?,
            pca_mean: r.f64_arr1("pca_mean")?,
            pre_whitener: r.f64_arr1("pre_whitener")?,
        };
        let c = model.n_channels();
        let k = model.n_components();
        if model.pca_components.dim() != (c, c)
            || model.pre_whitener.len() != c
            || model.unmixing.dim() != (k, c)
            || model.mixing.dim() != (c, k)
        {
            return Err(CleanError::MalformedInput(format!(
                "{}: inconsistent model dimensions",
                path.display()
            )));
        }
        Ok(model)
    }
}

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> nalgebra::DMatrix<f64> {
    nalgebra::DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(m: &nalgebra::DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Inverse of a square matrix, or `Decomposition` if it is singular.
pub(crate) fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    to_dmatrix(a)
        .try_inverse()
        .map(|m| from_dmatrix(&m))
        .ok_or_else(|| CleanError::Decomposition(format!("{:?} matrix is singular", a.dim())))
}
