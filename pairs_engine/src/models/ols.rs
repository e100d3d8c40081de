/// models/ols.rs — Single-regressor least squares
///
///   y_i = α + β·x_i + e_i
///
///   β̂ = Σ(x_i − x̄)(y_i − ȳ) / Σ(x_i − x̄)²,   α̂ = ȳ − β̂·x̄
///
/// Shared by the hedge regression (P2 on P1) and the AR(1) fit of the
/// spread (s_t on s_{t−1}).
use ndarray::Array1;

/// Relative tolerance under which a variance / std is treated as zero.
pub(crate) const DEGENERATE_REL_EPS: f64 = 1e-12;

#[derive(Debug, Clone)]
pub(crate) struct OlsFit {
    pub alpha: f64,
    pub beta: f64,
    /// y − (α̂ + β̂·x), one per observation
    pub residuals: Array1<f64>,
    /// Σ(y − ȳ)²
    pub syy: f64,
}

impl OlsFit {
    /// 1 − SS_res / SS_tot; 1 for a constant response.
    pub fn r_squared(&self) -> f64 {
        if self.syy > 0.0 {
            1.0 - self.residuals.dot(&self.residuals) / self.syy
        } else {
            1.0
        }
    }
}

/// Fit y on x.  `None` when the lengths differ, there are fewer than two
/// observations, or x has no variance relative to its level.
pub(crate) fn ols(x: &Array1<f64>, y: &Array1<f64>) -> Option<OlsFit> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let x_mean = x.mean()?;
    let y_mean = y.mean()?;
    let dx = x - x_mean;
    let dy = y - y_mean;

    let sxx = dx.dot(&dx);
    let x_scale = x_mean.abs().max(1.0);
    if !(sxx / n as f64 > (DEGENERATE_REL_EPS * x_scale).powi(2)) {
        return None;
    }

    let beta = dx.dot(&dy) / sxx;
    let alpha = y_mean - beta * x_mean;
    let residuals = y - &x.mapv(|v| alpha + beta * v);
    Some(OlsFit { alpha, beta, residuals, syy: dy.dot(&dy) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line() {
        let x = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let y = x.mapv(|v| 3.0 - 0.5 * v);
        let fit = ols(&x, &y).unwrap();
        assert!((fit.beta + 0.5).abs() < 1e-12);
        assert!((fit.alpha - 3.0).abs() < 1e-12);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-12));
        assert!((fit.r_squared() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_regressor_has_no_fit() {
        let x = Array1::from(vec![5.0; 6]);
        let y = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(ols(&x, &y).is_none());
        assert!(ols(&Array1::from(vec![1.0]), &Array1::from(vec![2.0])).is_none());
    }
}
