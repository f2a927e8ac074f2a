//! Sequential C-vine copula estimator.
//!
//! For an ordering `o`, tree `j` has root `o[j]` and links it with every
//! later position. Edges are fitted on the conditional pseudo-observations
//! left by the previous tree, then `h`-transformed to condition on the root
//! before the next tree is fitted.
//!
//! Simulation inverts the `h`-functions root by root: position `i` starts
//! from an independent uniform and is pushed back through trees `i-1..=0`.

pub mod bicop;
pub mod kendall;

use crate::domain::error::CopulaTraderError;
use crate::domain::ordering::VineOrdering;
use crate::domain::rank::RankMatrix;
use crate::ports::copula_port::CopulaFitter;
use bicop::{clamp_unit, select_pair_copula, Family, PairCopula};
use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

/// A fitted C-vine.
#[derive(Debug, Clone)]
pub struct CVineCopula {
    ordering: VineOrdering,
    columns: Vec<usize>,
    /// `trees[j][i - j - 1]` links root `j` with vine position `i > j`.
    trees: Vec<Vec<PairCopula>>,
    fit_log_likelihood: f64,
}

impl CVineCopula {
    pub fn ordering(&self) -> &VineOrdering {
        &self.ordering
    }

    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    pub fn trees(&self) -> &[Vec<PairCopula>] {
        &self.trees
    }

    /// Pair copula linking vine positions `root` and `other` (0-based,
    /// `root < other`).
    pub fn edge(&self, root: usize, other: usize) -> Option<&PairCopula> {
        if other <= root {
            return None;
        }
        self.trees.get(root)?.get(other - root - 1)
    }

    /// In-sample log-likelihood recorded when the vine was fitted.
    pub fn fit_log_likelihood(&self) -> f64 {
        self.fit_log_likelihood
    }
}

#[derive(Debug, Clone)]
pub struct CVineFitter {
    families: Vec<Family>,
}

impl Default for CVineFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CVineFitter {
    /// Fitter choosing among every supported family.
    pub fn new() -> Self {
        Self::with_families(Family::ALL.to_vec())
    }

    /// Fitter restricted to `families`. An empty list fits independence on
    /// every edge.
    pub fn with_families(families: Vec<Family>) -> Self {
        Self { families }
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }
}

fn fit_failure(ordering: &VineOrdering, reason: impl Into<String>) -> CopulaTraderError {
    CopulaTraderError::FitFailure {
        ordering: ordering.to_string(),
        reason: reason.into(),
    }
}

/// Rank columns rearranged into vine order, clamped away from 0 and 1.
fn vine_columns(
    ordering: &VineOrdering,
    ranks: &RankMatrix,
) -> Result<Vec<Vec<f64>>, CopulaTraderError> {
    if ordering.len() != ranks.cols() {
        return Err(fit_failure(
            ordering,
            format!(
                "ordering covers {} series but the rank matrix has {}",
                ordering.len(),
                ranks.cols()
            ),
        ));
    }
    if ranks.rows() < 2 {
        return Err(fit_failure(
            ordering,
            format!("need at least 2 observations, got {}", ranks.rows()),
        ));
    }
    if let Some(bad) = ranks
        .columns
        .iter()
        .flatten()
        .find(|u| !(u.is_finite() && (0.0..=1.0).contains(*u)))
    {
        return Err(fit_failure(
            ordering,
            format!("pseudo-observation {bad} is outside [0, 1]"),
        ));
    }

    Ok(ordering
        .columns()
        .into_iter()
        .map(|c| ranks.columns[c].iter().map(|&u| clamp_unit(u)).collect())
        .collect())
}

/// Replaces every column after `root` with its `h`-transform given the root.
fn condition_on_root(w: &mut [Vec<f64>], root: usize, edges: &[PairCopula]) {
    let (head, tail) = w.split_at_mut(root + 1);
    let conditioning = &head[root];
    tail.par_iter_mut().zip(edges).for_each(|(column, copula)| {
        for (v, &u) in column.iter_mut().zip(conditioning) {
            *v = copula.h(u, *v);
        }
    });
}

impl CopulaFitter for CVineFitter {
    type Model = CVineCopula;

    fn fit(
        &self,
        ordering: &VineOrdering,
        ranks: &RankMatrix,
    ) -> Result<CVineCopula, CopulaTraderError> {
        let mut w = vine_columns(ordering, ranks)?;
        let k = w.len();
        let positions = ordering.positions();

        let mut trees = Vec::with_capacity(k - 1);
        let mut total = 0.0;
        for j in 0..k - 1 {
            let root = &w[j];
            let selections: Vec<_> = w[j + 1..]
                .par_iter()
                .map(|column| select_pair_copula(root, column, &self.families))
                .collect();

            for (offset, sel) in selections.iter().enumerate() {
                log::debug!(
                    "ordering {ordering} tree {}: edge {},{} -> {} (tau {:.4}, loglik {:.4})",
                    j + 1,
                    positions[j],
                    positions[j + 1 + offset],
                    sel.copula,
                    sel.empirical_tau,
                    sel.log_likelihood
                );
                total += sel.log_likelihood;
            }

            let edges: Vec<PairCopula> = selections.into_iter().map(|s| s.copula).collect();
            condition_on_root(&mut w, j, &edges);
            trees.push(edges);
        }

        if !total.is_finite() {
            return Err(fit_failure(
                ordering,
                format!("non-finite log-likelihood {total}"),
            ));
        }

        Ok(CVineCopula {
            ordering: ordering.clone(),
            columns: ordering.columns(),
            trees,
            fit_log_likelihood: total,
        })
    }

    fn log_likelihood(
        &self,
        model: &CVineCopula,
        ranks: &RankMatrix,
    ) -> Result<f64, CopulaTraderError> {
        let mut w = vine_columns(&model.ordering, ranks)?;
        let mut total = 0.0;
        for (j, edges) in model.trees.iter().enumerate() {
            let per_edge: Vec<f64> = w[j + 1..]
                .par_iter()
                .zip(edges)
                .map(|(column, copula)| copula.log_likelihood(&w[j], column))
                .collect();
            // summed in edge order so equal vines score bit-for-bit equal
            total += per_edge.iter().sum::<f64>();
            condition_on_root(&mut w, j, edges);
        }
        Ok(total)
    }

    fn simulate(
        &self,
        model: &CVineCopula,
        n: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec<f64>>, CopulaTraderError> {
        let k = model.dimension();
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            let draws: Vec<f64> = (0..k).map(|_| rng.sample(Open01)).collect();
            let mut row = vec![0.0; k];
            for i in 0..k {
                let mut v = draws[i];
                for j in (0..i).rev() {
                    v = model.trees[j][i - j - 1].h_inverse(draws[j], v);
                }
                row[model.columns[i]] = v;
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
