//! C-vine variable orderings.
//!
//! An ordering is a permutation of the 1-based series positions. Position
//! `ordering[j]` is the root of tree `j + 1`; the last position is the pivotal
//! series whose conditional distribution given the rest drives the signal.

use crate::domain::error::CopulaTraderError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VineOrdering(Vec<usize>);

impl VineOrdering {
    pub fn new(positions: Vec<usize>) -> Result<Self, CopulaTraderError> {
        let k = positions.len();
        if k < 2 {
            return Err(CopulaTraderError::invalid_input(format!(
                "ordering needs at least 2 positions, got {k}"
            )));
        }
        let mut seen = vec![false; k];
        for &p in &positions {
            if p == 0 || p > k || seen[p - 1] {
                return Err(CopulaTraderError::invalid_input(format!(
                    "ordering {:?} is not a permutation of 1..={k}",
                    positions
                )));
            }
            seen[p - 1] = true;
        }
        Ok(Self(positions))
    }

    /// Accepts `1-2-4-3`, `1,2,4,3` or `1 2 4 3`.
    pub fn parse(input: &str) -> Result<Self, CopulaTraderError> {
        let positions = input
            .split(|c: char| c == '-' || c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<usize>().map_err(|_| {
                    CopulaTraderError::invalid_input(format!(
                        "invalid ordering token '{t}' in '{input}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(positions)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    /// 0-based column indices in vine order.
    pub fn columns(&self) -> Vec<usize> {
        self.0.iter().map(|p| p - 1).collect()
    }

    /// 0-based column of the pivotal series.
    pub fn pivotal_column(&self) -> usize {
        self.0[self.0.len() - 1] - 1
    }
}

impl fmt::Display for VineOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("-"))
    }
}

/// Every ordering that keeps position 1 first, in lexicographic order.
///
/// For four series: 1-2-3-4, 1-2-4-3, 1-3-2-4, 1-3-4-2, 1-4-2-3, 1-4-3-2.
pub fn reference_orderings(k: usize) -> Vec<VineOrdering> {
    if k < 2 {
        return Vec::new();
    }
    let rest: Vec<usize> = (2..=k).collect();
    let mut out = Vec::new();
    permute(&mut vec![1], &rest, &mut out);
    out
}

fn permute(prefix: &mut Vec<usize>, remaining: &[usize], out: &mut Vec<VineOrdering>) {
    if remaining.is_empty() {
        out.push(VineOrdering(prefix.clone()));
        return;
    }
    for i in 0..remaining.len() {
        let mut next = remaining.to_vec();
        let p = next.remove(i);
        prefix.push(p);
        permute(prefix, &next, out);
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_orderings_for_four_series() {
        let orders: Vec<String> = reference_orderings(4).iter().map(|o| o.to_string()).collect();
        assert_eq!(
            orders,
            vec!["1-2-3-4", "1-2-4-3", "1-3-2-4", "1-3-4-2", "1-4-2-3", "1-4-3-2"]
        );
    }

    #[test]
    fn reference_orderings_small() {
        assert_eq!(reference_orderings(2).len(), 1);
        assert_eq!(reference_orderings(3).len(), 2);
        assert!(reference_orderings(1).is_empty());
    }

    #[test]
    fn pivotal_is_last_position() {
        let o = VineOrdering::new(vec![1, 2, 4, 3]).unwrap();
        assert_eq!(o.pivotal_column(), 2);
        assert_eq!(o.columns(), vec![0, 1, 3, 2]);
    }

    #[test]
    fn parse_accepts_separators() {
        let expected = VineOrdering::new(vec![1, 3, 4, 2]).unwrap();
        assert_eq!(VineOrdering::parse("1-3-4-2").unwrap(), expected);
        assert_eq!(VineOrdering::parse("1,3,4,2").unwrap(), expected);
        assert_eq!(VineOrdering::parse(" 1 3 4 2 ").unwrap(), expected);
    }

    #[test]
    fn rejects_non_permutations() {
        assert!(VineOrdering::new(vec![1, 1, 2]).is_err());
        assert!(VineOrdering::new(vec![0, 1, 2]).is_err());
        assert!(VineOrdering::new(vec![1, 2, 5]).is_err());
        assert!(VineOrdering::new(vec![1]).is_err());
        assert!(VineOrdering::parse("1-x-3").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let o = VineOrdering::new(vec![2, 1, 3]).unwrap();
        assert_eq!(VineOrdering::parse(&o.to_string()).unwrap(), o);
    }
}
