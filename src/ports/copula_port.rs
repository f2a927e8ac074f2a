//! Copula fitting port trait.
//!
//! Structure selection and signal generation only ever see this interface,
//! so any C-vine estimator satisfying it can be swapped in.

use crate::domain::error::CopulaTraderError;
use crate::domain::ordering::VineOrdering;
use crate::domain::rank::RankMatrix;
use rand::rngs::StdRng;

pub trait CopulaFitter {
    type Model;

    /// Fits a C-vine with the structure implied by `ordering`.
    ///
    /// Numerical trouble is [`CopulaTraderError::FitFailure`].
    fn fit(
        &self,
        ordering: &VineOrdering,
        ranks: &RankMatrix,
    ) -> Result<Self::Model, CopulaTraderError>;

    fn log_likelihood(
        &self,
        model: &Self::Model,
        ranks: &RankMatrix,
    ) -> Result<f64, CopulaTraderError>;

    /// `n` draws from the fitted joint distribution, one row per draw, with
    /// coordinates in the column order of the rank matrix used for fitting.
    fn simulate(
        &self,
        model: &Self::Model,
        n: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec<f64>>, CopulaTraderError>;
}
