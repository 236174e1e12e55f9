//! Common average reference: subtract the mean across channels at each time
//! point.
//!
//! `data`: [C, T]  →  `data[c, t] -= mean(data[:, t])`
use ndarray::{Array2, Axis};

pub fn average_reference_inplace(data: &mut Array2<f64>) {
    let Some(means) = data.mean_axis(Axis(0)) else { return };
    for mut row in data.rows_mut() {
        row -= &means;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn channel_sum_is_zero_after_reference() {
        let mut data = Array2::from_shape_fn((8, 512), |(c, t)| ((c * 7 + t * 3) as f64).sin());
        average_reference_inplace(&mut data);
        for &s in data.sum_axis(Axis(0)).iter() {
            approx::assert_abs_diff_eq!(s, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn reference_preserves_channel_differences() {
        let mut data = Array2::from_shape_fn((2, 10), |(c, _)| if c == 0 { 2.0 } else { 4.0 });
        average_reference_inplace(&mut data);
        for t in 0..10 {
            approx::assert_abs_diff_eq!(data[[0, t]] - data[[1, t]], -2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn no_channels_is_a_no_op() {
        let mut data = Array2::<f64>::zeros((0, 5));
        average_reference_inplace(&mut data);
        assert_eq!(data.dim(), (0, 5));
    }
}
