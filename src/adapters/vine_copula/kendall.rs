//! Kendall's tau-b with tie correction.

use rayon::prelude::*;

/// Kendall's tau-b of two equally long samples.
///
/// Returns 0 when either sample is constant or the samples are shorter than
/// two observations. Pairs beyond the shorter sample are ignored.
pub fn kendall_tau(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    // (concordant - discordant, untied pairs, tied only in x, tied only in y)
    let (score, untied, ties_x, ties_y) = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut acc = (0i64, 0i64, 0i64, 0i64);
            for j in (i + 1)..n {
                let dx = x[i] - x[j];
                let dy = y[i] - y[j];
                if dx == 0.0 && dy == 0.0 {
                    continue;
                } else if dx == 0.0 {
                    acc.2 += 1;
                } else if dy == 0.0 {
                    acc.3 += 1;
                } else {
                    acc.0 += if (dx > 0.0) == (dy > 0.0) { 1 } else { -1 };
                    acc.1 += 1;
                }
            }
            acc
        })
        .reduce(
            || (0, 0, 0, 0),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
        );

    let pairs_untied_in_x = untied + ties_y;
    let pairs_untied_in_y = untied + ties_x;
    if pairs_untied_in_x == 0 || pairs_untied_in_y == 0 {
        return 0.0;
    }
    score as f64 / ((pairs_untied_in_x as f64) * (pairs_untied_in_y as f64)).sqrt()
}
