//! Bivariate pair copulas used on the edges of a vine.
//!
//! Every copula takes its first argument `u` as the conditioning (root-side)
//! variable: `h(u, v) = P(V <= v | U = u) = dC(u, v) / du`, and
//! `h_inverse(u, w)` solves `h(u, v) = w` for `v`.
//!
//! Parameters come from inverting Kendall's tau; the family is the one with
//! the lowest AIC on the edge's pseudo-observations.

use super::kendall::kendall_tau;
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{FRAC_PI_2, SQRT_2};
use std::fmt;

/// Inputs are clamped to `[UNIT_EPS, 1 - UNIT_EPS]` before evaluation.
pub const UNIT_EPS: f64 = 1e-10;

pub const GAUSSIAN_MAX_RHO: f64 = 0.99;
pub const CLAYTON_MAX_THETA: f64 = 28.0;
pub const GUMBEL_MAX_THETA: f64 = 20.0;
pub const FRANK_MAX_THETA: f64 = 35.0;

// Below this distance from independence a family is not worth a parameter.
const MIN_DEPENDENCE: f64 = 1e-4;

const BISECTION_STEPS: usize = 60;
const DEBYE_INTERVALS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Independence,
    Gaussian,
    Clayton,
    Gumbel,
    Frank,
    /// Clayton rotated 180 degrees (upper tail dependence).
    SurvivalClayton,
    /// Gumbel rotated 180 degrees (lower tail dependence).
    SurvivalGumbel,
}

impl Family {
    pub const ALL: [Family; 7] = [
        Family::Independence,
        Family::Gaussian,
        Family::Clayton,
        Family::Gumbel,
        Family::Frank,
        Family::SurvivalClayton,
        Family::SurvivalGumbel,
    ];

    pub fn parameter_count(self) -> usize {
        match self {
            Family::Independence => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Family::Independence => "independence",
            Family::Gaussian => "gaussian",
            Family::Clayton => "clayton",
            Family::Gumbel => "gumbel",
            Family::Frank => "frank",
            Family::SurvivalClayton => "survival clayton",
            Family::SurvivalGumbel => "survival gumbel",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCopula {
    pub family: Family,
    /// Correlation for the Gaussian, theta otherwise; 0 for independence.
    pub parameter: f64,
}

impl PairCopula {
    pub fn independence() -> Self {
        Self {
            family: Family::Independence,
            parameter: 0.0,
        }
    }

    /// Parameter matching Kendall's `tau`, clamped to the family's usable
    /// range. `None` when the family cannot express `tau`.
    pub fn from_tau(family: Family, tau: f64) -> Option<Self> {
        if !tau.is_finite() {
            return None;
        }
        let tau = tau.clamp(-1.0, 1.0);
        let parameter = match family {
            Family::Independence => 0.0,
            Family::Gaussian => (FRAC_PI_2 * tau)
                .sin()
                .clamp(-GAUSSIAN_MAX_RHO, GAUSSIAN_MAX_RHO),
            Family::Clayton | Family::SurvivalClayton => {
                if tau <= 0.0 {
                    return None;
                }
                let theta = if tau >= 1.0 {
                    CLAYTON_MAX_THETA
                } else {
                    (2.0 * tau / (1.0 - tau)).min(CLAYTON_MAX_THETA)
                };
                if theta < MIN_DEPENDENCE {
                    return None;
                }
                theta
            }
            Family::Gumbel | Family::SurvivalGumbel => {
                if tau <= 0.0 {
                    return None;
                }
                let theta = if tau >= 1.0 {
                    GUMBEL_MAX_THETA
                } else {
                    (1.0 / (1.0 - tau)).min(GUMBEL_MAX_THETA)
                };
                if theta - 1.0 < MIN_DEPENDENCE {
                    return None;
                }
                theta
            }
            Family::Frank => {
                if tau.abs() < MIN_DEPENDENCE {
                    return None;
                }
                frank_theta_from_tau(tau)
            }
        };
        Some(Self { family, parameter })
    }

    /// Kendall's tau implied by the parameter.
    pub fn kendall_tau(&self) -> f64 {
        let p = self.parameter;
        match self.family {
            Family::Independence => 0.0,
            Family::Gaussian => p.asin() / FRAC_PI_2,
            Family::Clayton | Family::SurvivalClayton => p / (p + 2.0),
            Family::Gumbel | Family::SurvivalGumbel => 1.0 - 1.0 / p,
            Family::Frank => frank_tau(p),
        }
    }

    pub fn log_pdf(&self, u: f64, v: f64) -> f64 {
        let (u, v) = (clamp_unit(u), clamp_unit(v));
        let p = self.parameter;
        match self.family {
            Family::Independence => 0.0,
            Family::Gaussian => gaussian_log_pdf(p, u, v),
            Family::Clayton => clayton_log_pdf(p, u, v),
            Family::Gumbel => gumbel_log_pdf(p, u, v),
            Family::Frank => frank_log_pdf(p, u, v),
            Family::SurvivalClayton => clayton_log_pdf(p, 1.0 - u, 1.0 - v),
            Family::SurvivalGumbel => gumbel_log_pdf(p, 1.0 - u, 1.0 - v),
        }
    }

    /// `P(V <= v | U = u)`.
    pub fn h(&self, u: f64, v: f64) -> f64 {
        let (u, v) = (clamp_unit(u), clamp_unit(v));
        let p = self.parameter;
        let raw = match self.family {
            Family::Independence => v,
            Family::Gaussian => gaussian_h(p, u, v),
            Family::Clayton => clayton_h(p, u, v),
            Family::Gumbel => gumbel_h(p, u, v),
            Family::Frank => frank_h(p, u, v),
            Family::SurvivalClayton => 1.0 - clayton_h(p, 1.0 - u, 1.0 - v),
            Family::SurvivalGumbel => 1.0 - gumbel_h(p, 1.0 - u, 1.0 - v),
        };
        clamp_unit(raw)
    }

    /// `v` such that `h(u, v) = w`.
    pub fn h_inverse(&self, u: f64, w: f64) -> f64 {
        let (u, w) = (clamp_unit(u), clamp_unit(w));
        let p = self.parameter;
        let raw = match self.family {
            Family::Independence => w,
            Family::Gaussian => gaussian_h_inverse(p, u, w),
            Family::Clayton => clayton_h_inverse(p, u, w),
            Family::Gumbel => gumbel_h_inverse(p, u, w),
            Family::Frank => frank_h_inverse(p, u, w),
            Family::SurvivalClayton => 1.0 - clayton_h_inverse(p, 1.0 - u, 1.0 - w),
            Family::SurvivalGumbel => 1.0 - gumbel_h_inverse(p, 1.0 - u, 1.0 - w),
        };
        clamp_unit(raw)
    }

    pub fn log_likelihood(&self, u: &[f64], v: &[f64]) -> f64 {
        u.iter().zip(v).map(|(&a, &b)| self.log_pdf(a, b)).sum()
    }
}

impl fmt::Display for PairCopula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            Family::Independence => write!(f, "{}", self.family),
            _ => write!(f, "{}({:.4})", self.family, self.parameter),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PairSelection {
    pub copula: PairCopula,
    pub empirical_tau: f64,
    pub log_likelihood: f64,
    pub aic: f64,
}

/// Lowest-AIC family among `families` for the pseudo-observations `(u, v)`.
///
/// Families are tried in the given order and a later one must be strictly
/// better. Falls back to independence when no candidate yields a finite
/// likelihood.
pub fn select_pair_copula(u: &[f64], v: &[f64], families: &[Family]) -> PairSelection {
    let empirical_tau = kendall_tau(u, v);
    let mut best: Option<PairSelection> = None;

    for &family in families {
        let Some(copula) = PairCopula::from_tau(family, empirical_tau) else {
            continue;
        };
        let log_likelihood = copula.log_likelihood(u, v);
        if !log_likelihood.is_finite() {
            continue;
        }
        let aic = -2.0 * log_likelihood + 2.0 * family.parameter_count() as f64;
        if best.is_none_or(|b| aic < b.aic) {
            best = Some(PairSelection {
                copula,
                empirical_tau,
                log_likelihood,
                aic,
            });
        }
    }

    best.unwrap_or(PairSelection {
        copula: PairCopula::independence(),
        empirical_tau,
        log_likelihood: 0.0,
        aic: 0.0,
    })
}

pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        return 0.5;
    }
    x.clamp(UNIT_EPS, 1.0 - UNIT_EPS)
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

fn norm_quantile(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// `ln(e^a + e^b)`
fn log_sum_exp(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp()).ln()
}

fn gaussian_log_pdf(rho: f64, u: f64, v: f64) -> f64 {
    let (x, y) = (norm_quantile(u), norm_quantile(v));
    let r2 = rho * rho;
    -0.5 * (1.0 - r2).ln() - (r2 * (x * x + y * y) - 2.0 * rho * x * y) / (2.0 * (1.0 - r2))
}

fn gaussian_h(rho: f64, u: f64, v: f64) -> f64 {
    let (x, y) = (norm_quantile(u), norm_quantile(v));
    norm_cdf((y - rho * x) / (1.0 - rho * rho).sqrt())
}

fn gaussian_h_inverse(rho: f64, u: f64, w: f64) -> f64 {
    let x = norm_quantile(u);
    norm_cdf(norm_quantile(w) * (1.0 - rho * rho).sqrt() + rho * x)
}

/// `ln(u^-theta + v^-theta - 1)`
fn clayton_log_sum(theta: f64, lu: f64, lv: f64) -> f64 {
    let (a, b) = (-theta * lu, -theta * lv);
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp() - (-m).exp()).ln()
}

fn clayton_log_pdf(theta: f64, u: f64, v: f64) -> f64 {
    let (lu, lv) = (u.ln(), v.ln());
    theta.ln_1p() - (1.0 + theta) * (lu + lv) - (2.0 + 1.0 / theta) * clayton_log_sum(theta, lu, lv)
}

fn clayton_h(theta: f64, u: f64, v: f64) -> f64 {
    let (lu, lv) = (u.ln(), v.ln());
    (-(theta + 1.0) * lu - (1.0 + 1.0 / theta) * clayton_log_sum(theta, lu, lv)).exp()
}

fn clayton_h_inverse(theta: f64, u: f64, w: f64) -> f64 {
    let z = (-theta * u.ln()).exp() * (-theta / (1.0 + theta) * w.ln()).exp_m1();
    (-z.ln_1p() / theta).exp()
}

/// `(x, y, s, a)` with `x = -ln u`, `y = -ln v`, `s = ln(x^t + y^t)`,
/// `a = (x^t + y^t)^(1/t)`.
fn gumbel_terms(theta: f64, u: f64, v: f64) -> (f64, f64, f64, f64) {
    let (x, y) = (-u.ln(), -v.ln());
    let s = log_sum_exp(theta * x.ln(), theta * y.ln());
    (x, y, s, (s / theta).exp())
}

fn gumbel_log_pdf(theta: f64, u: f64, v: f64) -> f64 {
    let (x, y, s, a) = gumbel_terms(theta, u, v);
    -a - u.ln() - v.ln()
        + (theta - 1.0) * (x.ln() + y.ln())
        + (1.0 / theta - 2.0) * s
        + (a + theta - 1.0).ln()
}

fn gumbel_h(theta: f64, u: f64, v: f64) -> f64 {
    let (x, _, s, a) = gumbel_terms(theta, u, v);
    (-a - u.ln() + (theta - 1.0) * x.ln() + (1.0 / theta - 1.0) * s).exp()
}

fn gumbel_h_inverse(theta: f64, u: f64, w: f64) -> f64 {
    let (mut lo, mut hi) = (UNIT_EPS, 1.0 - UNIT_EPS);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if gumbel_h(theta, u, mid) < w {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

fn frank_log_pdf(theta: f64, u: f64, v: f64) -> f64 {
    // (1 - e^-t) - (1 - e^-tu)(1 - e^-tv), rearranged into two same-signed terms
    let denom = (-theta * u).exp() * -(-theta * v).exp_m1()
        + (-theta * v).exp() * -(-theta * (1.0 - v)).exp_m1();
    (theta * -(-theta).exp_m1()).ln() - theta * (u + v) - 2.0 * denom.abs().ln()
}

fn frank_h(theta: f64, u: f64, v: f64) -> f64 {
    let ratio = (theta * (u - v)).exp() * (-theta * (1.0 - v)).exp_m1() / (-theta * v).exp_m1();
    1.0 / (1.0 + ratio)
}

fn frank_h_inverse(theta: f64, u: f64, w: f64) -> f64 {
    let numer = log_sum_exp((-w).ln_1p() - theta * u, w.ln() - theta);
    let denom = (w + (1.0 - w) * (-theta * u).exp()).ln();
    -(numer - denom) / theta
}

/// Debye function of order one, `(1/x) * integral_0^x t / (e^t - 1) dt`.
fn debye1(x: f64) -> f64 {
    let integrand = |t: f64| if t == 0.0 { 1.0 } else { t / t.exp_m1() };
    let n = DEBYE_INTERVALS;
    let step = x / n as f64;
    let mut sum = integrand(0.0) + integrand(x);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(i as f64 * step);
    }
    sum * step / 3.0 / x
}

pub fn frank_tau(theta: f64) -> f64 {
    if theta.abs() < 1e-8 {
        return 0.0;
    }
    let t = theta.abs();
    let tau = 1.0 - 4.0 / t + 4.0 * debye1(t) / t;
    tau.copysign(theta)
}

fn frank_theta_from_tau(tau: f64) -> f64 {
    let target = tau.abs();
    if target >= frank_tau(FRANK_MAX_THETA) {
        return FRANK_MAX_THETA.copysign(tau);
    }
    let (mut lo, mut hi) = (0.0, FRANK_MAX_THETA);
    for _ in 0..BISECTION_STEPS * 2 {
        let mid = 0.5 * (lo + hi);
        if frank_tau(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (0.5 * (lo + hi)).copysign(tau)
}
