//! Symmetric FastICA with the logcosh non-linearity.
//!
//! Steps, all statistics over the non-ignored samples only:
//!   • pre_whitener = per-channel std (ddof = 0), flat channels get 1
//!   • pca_mean     = mean of the scaled data
//!   • PCA          = eigenvectors of the covariance, decreasing eigenvalue
//!   • whitening    = ÷ √λ (λ floored at 1e-12 · λ_max)
//!   • W            = fixed-point iteration  W₊ = E[g(WZ)Zᵀ] − diag(E[g′(WZ)])·W,
//!                    followed by symmetric decorrelation (W Wᵀ)^{-½} W
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::model::{from_dmatrix, invert, to_dmatrix, DecompositionModel};
use super::Decomposer;
use crate::config::IcaParams;
use crate::error::{CleanError, Result};

const EIG_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Default)]
pub struct FastIca {
    pub params: IcaParams,
}

impl FastIca {
    pub fn new(params: IcaParams) -> Self {
        Self { params }
    }
}

impl Decomposer for FastIca {
    fn fit(&self, data: ArrayView2<f64>, ignore: &[bool]) -> Result<DecompositionModel> {
        let (n_ch, n_t) = data.dim();
        if ignore.len() != n_t {
            return Err(CleanError::MalformedInput(format!(
                "ignore mask has {} samples, data has {n_t}",
                ignore.len()
            )));
        }
        let keep: Vec<usize> = (0..n_t).filter(|&t| !ignore[t]).collect();
        if n_ch == 0 || keep.len() <= n_ch {
            return Err(CleanError::DegenerateStatistics { component: 0, usable: keep.len() });
        }
        let x = data.select(Axis(1), &keep);
        let n = keep.len() as f64;

        // Scale, then centre.
        let pre_whitener: Array1<f64> = x.map_axis(Axis(1), |row| {
            let m = row.sum() / n;
            let sd = (row.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n).sqrt();
            if sd > 0.0 { sd } else { 1.0 }
        });
        let mut xs = x / &pre_whitener.view().insert_axis(Axis(1));
        let pca_mean = xs.sum_axis(Axis(1)) / n;
        xs -= &pca_mean.view().insert_axis(Axis(1));

        // PCA.
        let cov = xs.dot(&xs.t()) / n;
        let (eigvals, eigvecs) = sorted_eigen(&cov);
        let lambda_max = eigvals.first().copied().unwrap_or(0.0);
        if lambda_max <= 0.0 {
            return Err(CleanError::Decomposition("data has zero variance".into()));
        }
        let floor = lambda_max * EIG_FLOOR;
        let inv_sqrt: Array1<f64> = eigvals.mapv(|l| 1.0 / l.max(floor).sqrt());
        let pca_components = eigvecs.t().to_owned();
        let z = pca_components.dot(&xs) * &inv_sqrt.view().insert_axis(Axis(1));

        let w = self.iterate(&z)?;

        let unmixing = &w * &inv_sqrt.view().insert_axis(Axis(0));
        let mixing = invert(&unmixing)?;
        Ok(DecompositionModel { mixing, unmixing, pca_components, pca_mean, pre_whitener })
    }
}

impl FastIca {
    fn iterate(&self, z: &Array2<f64>) -> Result<Array2<f64>> {
        let k = z.nrows();
        let n = z.ncols() as f64;
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let w0 = Array2::from_shape_fn((k, k), |_| rng.random_range(-1.0..1.0));
        let mut w = sym_decorrelate(&w0)?;

        for it in 0..self.params.max_iter {
            let wz = w.dot(z);
            let g = wz.mapv(f64::tanh);
            let g_prime_mean = g.mapv(|v| 1.0 - v * v).sum_axis(Axis(1)) / n;
            let w1 = g.dot(&z.t()) / n - &w * &g_prime_mean.view().insert_axis(Axis(1));
            let w1 = sym_decorrelate(&w1)?;

            let lim = w1
                .dot(&w.t())
                .diag()
                .iter()
                .map(|d| (d.abs() - 1.0).abs())
                .fold(0.0_f64, f64::max);
            w = w1;
            if lim < self.params.tol {
                log::debug!("FastICA converged after {} iterations", it + 1);
                return Ok(w);
            }
        }
        log::warn!(
            "FastICA did not converge in {} iterations, using last estimate",
            self.params.max_iter
        );
        Ok(w)
    }
}

/// Eigen-decomposition of a symmetric matrix, eigenvalues decreasing.
/// Eigenvectors are the columns of the returned matrix.
fn sorted_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let eig = to_dmatrix(a).symmetric_eigen();
    let vals: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    let mut order: Vec<usize> = (0..vals.len()).collect();
    order.sort_by(|&i, &j| vals[j].total_cmp(&vals[i]));

    let vecs = from_dmatrix(&eig.eigenvectors);
    let sorted_vals = Array1::from_iter(order.iter().map(|&i| vals[i]));
    let sorted_vecs = vecs.select(Axis(1), &order);
    (sorted_vals, sorted_vecs)
}

/// `(W Wᵀ)^{-½} W`.
fn sym_decorrelate(w: &Array2<f64>) -> Result<Array2<f64>> {
    let (s, u) = sorted_eigen(&w.dot(&w.t()));
    if s.iter().any(|&v| v <= 0.0) {
        return Err(CleanError::Decomposition("unmixing matrix lost rank".into()));
    }
    let inv_sqrt = s.mapv(|v| 1.0 / v.sqrt());
    let scaled = &u * &inv_sqrt.view().insert_axis(Axis(0));
    Ok(scaled.dot(&u.t()).dot(w))
}
