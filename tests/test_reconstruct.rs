mod common;
use common::{max_abs_diff, synthetic_eeg};
use lcf::lcf::lcf as run_lcf;
use lcf::{Decomposer, DecompositionModel, FastIca, IcaParams, LcfParams};
use ndarray::{array, Array2, Axis};

#[test]
fn round_trip_through_fitted_model() {
    let x = synthetic_eeg(6, 4000, 1) * 1e-5 + 3e-6;
    let ignore = vec![false; x.ncols()];
    let model = FastIca::new(IcaParams::default()).fit(x.view(), &ignore).unwrap();

    let s = model.transform(x.view()).unwrap();
    let back = model.reconstruct(s.view()).unwrap();
    let err = max_abs_diff(&back, &x);
    assert!(err < 1e-12, "max abs error {err:.2e}");
}

#[test]
fn round_trip_with_zero_suppression() {
    // Sinusoids only: nothing crosses the IQR thresholds.
    let x = Array2::from_shape_fn((3, 3000), |(c, t)| {
        let t = t as f64;
        match c {
            0 => (t * 0.02).sin() + 0.5 * (t * 0.11).cos(),
            1 => 2.0 * (t * 0.02).sin() - (t * 0.07).sin(),
            _ => (t * 0.11).cos() + 0.3 * (t * 0.07).sin() + 1.0,
        }
    });
    let ignore = vec![false; 3000];
    let model = FastIca::default().fit(x.view(), &ignore).unwrap();
    let s = model.transform(x.view()).unwrap();
    let params = LcfParams { sfreq: 500.0, iqr_thresh: 3.0, dilator_width: 0.1, transition_width: 0.1 };
    let cleaned = run_lcf(s.view(), s.view(), &params, None).unwrap();
    assert_eq!(cleaned, s);

    let back = model.reconstruct(cleaned.view()).unwrap();
    assert!(max_abs_diff(&back, &x) < 1e-9);
}

#[test]
fn mean_is_restored_before_scale() {
    // Identity projection and mixing: reconstruct(s) = (s + mean) · scale.
    let model = DecompositionModel {
        mixing: Array2::eye(2),
        unmixing: Array2::eye(2),
        pca_components: Array2::eye(2),
        pca_mean: array![1.0, -2.0],
        pre_whitener: array![10.0, 0.5],
    };
    let s = array![[0.0, 1.0], [2.0, 4.0]];
    let x = model.reconstruct(s.view()).unwrap();
    assert_eq!(x, array![[10.0, 20.0], [0.0, 1.0]]);

    // Scale-then-mean would give s·scale + mean instead.
    let wrong = &s * &model.pre_whitener.view().insert_axis(Axis(1))
        + &model.pca_mean.view().insert_axis(Axis(1));
    assert_ne!(x, wrong);

    assert_eq!(model.transform(x.view()).unwrap(), s);
}

#[test]
fn model_survives_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m-ica.safetensors");
    let x = synthetic_eeg(4, 2000, 9);
    let model = FastIca::default().fit(x.view(), &vec![false; 2000]).unwrap();
    model.save(&path).unwrap();
    let loaded = DecompositionModel::load(&path).unwrap();
    assert_eq!(loaded, model);
}

#[test]
fn wrong_channel_count_is_rejected() {
    let model = DecompositionModel {
        mixing: Array2::eye(2),
        unmixing: Array2::eye(2),
        pca_components: Array2::eye(2),
        pca_mean: array![0.0, 0.0],
        pre_whitener: array![1.0, 1.0],
    };
    assert!(model.transform(Array2::<f64>::zeros((3, 10)).view()).is_err());
    assert!(model.reconstruct(Array2::<f64>::zeros((3, 10)).view()).is_err());
}
