//! Statistical utility functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 denominator). Zero for fewer than two points.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Population variance (n denominator). Zero for empty input.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Ordinary least squares fit of `y = a + b * x` over index positions.
/// Returns `(intercept, slope)`; slope is 0 for constant or single-point data.
pub fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        return (values.first().copied().unwrap_or(0.0), 0.0);
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    if sxx == 0.0 {
        return (y_mean, 0.0);
    }
    let slope = sxy / sxx;
    (y_mean - slope * x_mean, slope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_values() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0, epsilon = 1e-12);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variances() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_variance(&values), 4.0, epsilon = 1e-12);
        assert_relative_eq!(sample_variance(&values), 32.0 / 7.0, epsilon = 1e-12);

        assert_eq!(sample_variance(&[5.0]), 0.0);
        assert_eq!(population_variance(&[]), 0.0);
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let (a, b) = linear_fit(&values);
        assert_relative_eq!(a, 3.0, epsilon = 1e-9);
        assert_relative_eq!(b, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_fit_constant_series_has_zero_slope() {
        let (a, b) = linear_fit(&[5.0; 8]);
        assert_relative_eq!(a, 5.0, epsilon = 1e-12);
        assert_eq!(b, 0.0);

        let (a, b) = linear_fit(&[7.0]);
        assert_eq!(a, 7.0);
        assert_eq!(b, 0.0);
    }
}
