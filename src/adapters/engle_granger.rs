//! Engle-Granger two-step cointegration test.
//!
//! 1. OLS of `y` on `[1, x]`.
//! 2. Augmented Dickey-Fuller regression of the residuals without
//!    deterministic terms: `de_t = g * e_{t-1} + sum_i phi_i * de_{t-i}`.
//!    The lag count minimizes AIC over `0..=12 * (n / 100)^(1/4)` on a common
//!    sample, then the chosen lag is refitted on all available rows.
//!
//! The statistic is the t-ratio of `g`; its p-value comes from MacKinnon's
//! (1994) response surface for two variables with a constant.

use crate::domain::error::CopulaTraderError;
use crate::ports::cointegration_port::{CointegrationTest, CointegrationTestResult};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};

pub const MIN_OBSERVATIONS: usize = 20;

// MacKinnon (1994) surface, N = 2, constant term.
const TAU_MAX: f64 = 0.92;
const TAU_MIN: f64 = -18.86;
const TAU_STAR: f64 = -2.62;
const TAU_SMALL_P: [f64; 3] = [2.92, 1.5012, 0.039796];
const TAU_LARGE_P: [f64; 4] = [2.1945, 0.64695, -0.29198, -0.042377];

// Residuals of an (almost) exact fit carry no information.
const PERFECT_FIT_R2: f64 = 1.0 - 100.0 * 1.490_116_119_384_765_6e-8;

#[derive(Debug, Default, Clone, Copy)]
pub struct EngleGrangerTest;

impl EngleGrangerTest {
    pub fn new() -> Self {
        Self
    }
}

impl CointegrationTest for EngleGrangerTest {
    fn test(&self, y: &[f64], x: &[f64]) -> Result<CointegrationTestResult, CopulaTraderError> {
        let n = y.len();
        if n != x.len() {
            return Err(CopulaTraderError::invalid_input(format!(
                "cointegration inputs differ in length ({} vs {})",
                n,
                x.len()
            )));
        }
        if n < MIN_OBSERVATIONS {
            return Err(CopulaTraderError::invalid_input(format!(
                "cointegration needs at least {MIN_OBSERVATIONS} observations, got {n}"
            )));
        }
        if y.iter().chain(x).any(|v| !v.is_finite()) {
            return Err(CopulaTraderError::invalid_input(
                "cointegration inputs contain non-finite values",
            ));
        }

        let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
        let fit = ols(&DVector::from_column_slice(y), &design).ok_or_else(|| {
            CopulaTraderError::invalid_input("cointegrating regression is singular")
        })?;

        let y_mean = y.iter().sum::<f64>() / n as f64;
        let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
        if sst > 0.0 && 1.0 - fit.ssr / sst >= PERFECT_FIT_R2 {
            log::warn!("cointegrating regression fits exactly; reporting p-value 0");
            return Ok(CointegrationTestResult {
                statistic: f64::NEG_INFINITY,
                p_value: 0.0,
            });
        }

        let statistic = adf_statistic(fit.residuals.as_slice())?;
        Ok(CointegrationTestResult {
            statistic,
            p_value: mackinnon_p_value(statistic),
        })
    }
}

struct OlsFit {
    beta: DVector<f64>,
    residuals: DVector<f64>,
    ssr: f64,
    xtx_inv: DMatrix<f64>,
}

fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> Option<OlsFit> {
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    let beta = &xtx_inv * (&xt * y);
    let residuals = y - x * &beta;
    let ssr = residuals.norm_squared();
    Some(OlsFit {
        beta,
        residuals,
        ssr,
        xtx_inv,
    })
}

/// Schwert's rule `ceil(12 * (n/100)^(1/4))`, capped so every lag leaves
/// enough rows.
pub fn max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(1))
}

/// Design for `lags` lagged differences on the rows that a `max_lag` trim
/// keeps: column 0 is `e_{t-1}`, column `i` is `de_{t-i}`.
fn adf_design(series: &[f64], diffs: &[f64], lags: usize, trim: usize) -> (DVector<f64>, DMatrix<f64>) {
    let rows = diffs.len() - trim;
    let dep = DVector::from_fn(rows, |r, _| diffs[trim + r]);
    let design = DMatrix::from_fn(rows, lags + 1, |r, c| {
        let t = trim + r;
        if c == 0 { series[t] } else { diffs[t - c] }
    });
    (dep, design)
}

fn aic(fit: &OlsFit, rows: usize, params: usize) -> f64 {
    let nobs = rows as f64;
    let llf = -nobs / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (fit.ssr / nobs).ln() + 1.0);
    -2.0 * llf + 2.0 * params as f64
}

/// t-ratio of the lagged level in the no-constant ADF regression.
pub fn adf_statistic(series: &[f64]) -> Result<f64, CopulaTraderError> {
    let n = series.len();
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let max = max_lag(n);

    let mut best: Option<(usize, f64)> = None;
    for lags in 0..=max {
        let (dep, design) = adf_design(series, &diffs, lags, max);
        if dep.len() <= lags + 2 {
            continue;
        }
        if let Some(fit) = ols(&dep, &design) {
            let score = aic(&fit, dep.len(), lags + 1);
            log::trace!("adf lag {lags}: aic {score:.4}");
            if score.is_finite() && best.is_none_or(|(_, b)| score < b) {
                best = Some((lags, score));
            }
        }
    }
    let (lags, _) = best
        .ok_or_else(|| CopulaTraderError::invalid_input("ADF regression is singular for every lag"))?;

    let (dep, design) = adf_design(series, &diffs, lags, lags);
    let rows = dep.len();
    let fit = ols(&dep, &design)
        .ok_or_else(|| CopulaTraderError::invalid_input("ADF regression is singular"))?;
    let dof = rows.saturating_sub(lags + 1);
    if dof == 0 {
        return Err(CopulaTraderError::invalid_input(
            "ADF regression has no residual degrees of freedom",
        ));
    }
    let sigma2 = fit.ssr / dof as f64;
    let se = (sigma2 * fit.xtx_inv[(0, 0)]).sqrt();
    log::debug!("adf: {lags} lags, gamma {:.6}, se {:.6}", fit.beta[0], se);
    if se > 0.0 {
        Ok(fit.beta[0] / se)
    } else {
        Ok(f64::NEG_INFINITY)
    }
}

/// MacKinnon approximate p-value for the Engle-Granger statistic.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefs.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::distributions::Distribution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        noise(n, seed)
            .into_iter()
            .scan(100.0, |level, step| {
                *level += step;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn p_value_bounds() {
        assert_eq!(mackinnon_p_value(1.5), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert!(mackinnon_p_value(f64::NAN).is_nan());
    }

    #[test]
    fn p_value_is_continuous_at_the_switch_point() {
        let below = mackinnon_p_value(TAU_STAR - 1e-9);
        let above = mackinnon_p_value(TAU_STAR + 1e-9);
        assert_relative_eq!(below, above, max_relative = 1e-2);
    }

    #[test]
    fn p_value_is_monotone() {
        let mut last = 0.0;
        for i in 0..200 {
            let t = -10.0 + i as f64 * 0.05;
            let p = mackinnon_p_value(t);
            assert!(p >= last - 1e-12, "p-value fell at t = {t}");
            last = p;
        }
    }

    #[test]
    fn five_percent_critical_value_is_near_minus_3_34() {
        // the tabulated 5% critical value for two variables with constant
        let p = mackinnon_p_value(-3.34);
        assert!((p - 0.05).abs() < 0.01, "p = {p}");
    }

    #[test]
    fn max_lag_follows_schwert_rule() {
        assert_eq!(max_lag(100), 12);
        assert_eq!(max_lag(1000), 22);
        assert_eq!(max_lag(20), 9);
    }

    #[test]
    fn white_noise_residuals_reject_unit_root() {
        let stat = adf_statistic(&noise(500, 7)).unwrap();
        assert!(stat < -5.0, "stat = {stat}");
    }

    #[test]
    fn cointegrated_pair_is_flagged() {
        let x = random_walk(500, 11);
        let y: Vec<f64> = x
            .iter()
            .zip(noise(500, 12))
            .map(|(xi, e)| 2.0 * xi + 0.5 * e)
            .collect();
        let result = EngleGrangerTest::new().test(&y, &x).unwrap();
        assert!(result.p_value < 0.05, "p = {}", result.p_value);
    }

    #[test]
    fn independent_walks_are_not_flagged() {
        let x = random_walk(500, 21);
        // an explosive component no linear combination with x can remove
        let z: Vec<f64> = random_walk(500, 22)
            .into_iter()
            .enumerate()
            .map(|(t, v)| v + (0.02 * t as f64).exp())
            .collect();
        let result = EngleGrangerTest::new().test(&z, &x).unwrap();
        assert!(result.p_value >= 0.05, "p = {}", result.p_value);
    }

    #[test]
    fn exact_linear_relation_has_zero_p_value() {
        let x = random_walk(50, 3);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let result = EngleGrangerTest::new().test(&y, &x).unwrap();
        assert_eq!(result.p_value, 0.0);
    }

    #[test]
    fn short_or_mismatched_inputs_rejected() {
        let test = EngleGrangerTest::new();
        let short = vec![1.0; 10];
        assert!(matches!(
            test.test(&short, &short).unwrap_err(),
            CopulaTraderError::InvalidInput { .. }
        ));
        assert!(test.test(&vec![1.0; 30], &vec![1.0; 31]).is_err());
    }
}
