//! Maximum-likelihood C-vine structure selection.
//!
//! Each candidate ordering is fitted and scored on the same rank matrix
//! (in-sample). A candidate replaces the incumbent only with a strictly
//! greater log-likelihood, so the earliest ordering wins ties.

use crate::domain::error::CopulaTraderError;
use crate::domain::ordering::VineOrdering;
use crate::domain::rank::RankMatrix;
use crate::ports::copula_port::CopulaFitter;

#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub ordering: VineOrdering,
    pub log_likelihood: f64,
}

#[derive(Debug)]
pub struct StructureSelection<M> {
    pub ordering: VineOrdering,
    pub model: M,
    pub log_likelihood: f64,
    /// Every candidate in evaluation order.
    pub candidates: Vec<CandidateScore>,
}

impl<M> StructureSelection<M> {
    pub fn pivotal_column(&self) -> usize {
        self.ordering.pivotal_column()
    }
}

pub fn select_structure<F: CopulaFitter>(
    fitter: &F,
    orderings: &[VineOrdering],
    ranks: &RankMatrix,
) -> Result<StructureSelection<F::Model>, CopulaTraderError> {
    if orderings.is_empty() {
        return Err(CopulaTraderError::invalid_input(
            "no candidate orderings to select from",
        ));
    }
    if let Some(bad) = orderings.iter().find(|o| o.len() != ranks.cols()) {
        return Err(CopulaTraderError::invalid_input(format!(
            "ordering {} does not match {} series",
            bad,
            ranks.cols()
        )));
    }

    let mut best: Option<(VineOrdering, F::Model, f64)> = None;
    let mut candidates = Vec::with_capacity(orderings.len());

    for ordering in orderings {
        let model = fitter.fit(ordering, ranks).map_err(|e| as_fit_failure(ordering, e))?;
        let log_likelihood = fitter
            .log_likelihood(&model, ranks)
            .map_err(|e| as_fit_failure(ordering, e))?;
        if !log_likelihood.is_finite() {
            return Err(CopulaTraderError::FitFailure {
                ordering: ordering.to_string(),
                reason: format!("non-finite log-likelihood {log_likelihood}"),
            });
        }
        log::debug!("ordering {ordering}: log-likelihood {log_likelihood:.4}");

        candidates.push(CandidateScore {
            ordering: ordering.clone(),
            log_likelihood,
        });

        let improves = match &best {
            None => true,
            Some((_, _, incumbent)) => log_likelihood > *incumbent,
        };
        if improves {
            best = Some((ordering.clone(), model, log_likelihood));
        }
    }

    let (ordering, model, log_likelihood) = best.ok_or_else(|| {
        CopulaTraderError::invalid_input("no candidate ordering produced a model")
    })?;
    log::info!("selected ordering {ordering} (log-likelihood {log_likelihood:.4})");

    Ok(StructureSelection {
        ordering,
        model,
        log_likelihood,
        candidates,
    })
}

fn as_fit_failure(ordering: &VineOrdering, err: CopulaTraderError) -> CopulaTraderError {
    match err {
        CopulaTraderError::FitFailure { .. } => err,
        other => CopulaTraderError::FitFailure {
            ordering: ordering.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::reference_orderings;
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scores each ordering from a lookup table; the model is the ordering.
    struct TableFitter {
        scores: HashMap<String, f64>,
        fail_on: Option<String>,
        fitted: RefCell<Vec<String>>,
    }

    impl TableFitter {
        fn new(scores: &[(&str, f64)]) -> Self {
            Self {
                scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                fail_on: None,
                fitted: RefCell::new(Vec::new()),
            }
        }
    }

    impl CopulaFitter for TableFitter {
        type Model = String;

        fn fit(
            &self,
            ordering: &VineOrdering,
            _ranks: &RankMatrix,
        ) -> Result<String, CopulaTraderError> {
            let key = ordering.to_string();
            self.fitted.borrow_mut().push(key.clone());
            if self.fail_on.as_deref() == Some(key.as_str()) {
                return Err(CopulaTraderError::invalid_input("singular correlation"));
            }
            Ok(key)
        }

        fn log_likelihood(
            &self,
            model: &String,
            _ranks: &RankMatrix,
        ) -> Result<f64, CopulaTraderError> {
            Ok(self.scores.get(model).copied().unwrap_or(0.0))
        }

        fn simulate(
            &self,
            _model: &String,
            _n: usize,
            _rng: &mut StdRng,
        ) -> Result<Vec<Vec<f64>>, CopulaTraderError> {
            Ok(Vec::new())
        }
    }

    fn ranks4() -> RankMatrix {
        RankMatrix::from_columns(vec![
            vec![0.25, 0.5, 0.75, 1.0],
            vec![0.5, 0.25, 1.0, 0.75],
            vec![1.0, 0.75, 0.5, 0.25],
            vec![0.75, 1.0, 0.25, 0.5],
        ])
        .unwrap()
    }

    #[test]
    fn picks_maximum_likelihood() {
        let fitter = TableFitter::new(&[
            ("1-2-3-4", 10.0),
            ("1-2-4-3", 12.5),
            ("1-3-2-4", 11.0),
            ("1-3-4-2", 12.4),
            ("1-4-2-3", -3.0),
            ("1-4-3-2", 0.0),
        ]);
        let sel = select_structure(&fitter, &reference_orderings(4), &ranks4()).unwrap();

        assert_eq!(sel.ordering.to_string(), "1-2-4-3");
        assert_eq!(sel.model, "1-2-4-3");
        assert!((sel.log_likelihood - 12.5).abs() < f64::EPSILON);
        assert_eq!(sel.pivotal_column(), 2);
        assert_eq!(sel.candidates.len(), 6);
        assert_eq!(fitter.fitted.borrow().len(), 6);
    }

    #[test]
    fn ties_keep_first_seen() {
        let fitter = TableFitter::new(&[
            ("1-2-3-4", 5.0),
            ("1-2-4-3", 7.0),
            ("1-3-2-4", 7.0),
            ("1-3-4-2", 7.0),
            ("1-4-2-3", 1.0),
            ("1-4-3-2", 7.0),
        ]);
        let sel = select_structure(&fitter, &reference_orderings(4), &ranks4()).unwrap();
        assert_eq!(sel.ordering.to_string(), "1-2-4-3");
    }

    #[test]
    fn all_equal_selects_first_candidate() {
        let fitter = TableFitter::new(&[]);
        let sel = select_structure(&fitter, &reference_orderings(4), &ranks4()).unwrap();
        assert_eq!(sel.ordering.to_string(), "1-2-3-4");
    }

    #[test]
    fn fit_error_is_fatal_fit_failure() {
        let mut fitter = TableFitter::new(&[("1-2-3-4", 1.0)]);
        fitter.fail_on = Some("1-3-2-4".into());
        let err = select_structure(&fitter, &reference_orderings(4), &ranks4()).unwrap_err();

        assert!(
            matches!(err, CopulaTraderError::FitFailure { ref ordering, .. } if ordering == "1-3-2-4")
        );
        // later candidates are never attempted
        assert_eq!(fitter.fitted.borrow().len(), 3);
    }

    #[test]
    fn non_finite_likelihood_is_fit_failure() {
        let fitter = TableFitter::new(&[("1-2-3-4", 1.0), ("1-2-4-3", f64::NAN)]);
        let err = select_structure(&fitter, &reference_orderings(4), &ranks4()).unwrap_err();
        assert!(
            matches!(err, CopulaTraderError::FitFailure { ref ordering, .. } if ordering == "1-2-4-3")
        );
    }

    #[test]
    fn empty_candidates_rejected() {
        let fitter = TableFitter::new(&[]);
        let err = select_structure(&fitter, &[], &ranks4()).unwrap_err();
        assert!(matches!(err, CopulaTraderError::InvalidInput { .. }));
    }

    #[test]
    fn ordering_width_must_match_ranks() {
        let fitter = TableFitter::new(&[]);
        let err = select_structure(&fitter, &reference_orderings(3), &ranks4()).unwrap_err();
        assert!(matches!(err, CopulaTraderError::InvalidInput { .. }));
    }
}
