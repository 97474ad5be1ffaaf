//! Small numeric routines used by the standard compute callbacks.
//!
//! Everything returns `None` when the sample is too small for the statistic.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample variance (ddof = 1).
pub fn variance(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    Some(ss / (xs.len() - 1) as f64)
}

pub fn std_dev(xs: &[f64]) -> Option<f64> {
    variance(xs).map(f64::sqrt)
}

/// Independent-samples Cohen's d with pooled standard deviation.
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let (var_a, var_b) = (variance(a)?, variance(b)?);
    let (df_a, df_b) = ((a.len() - 1) as f64, (b.len() - 1) as f64);
    let pooled = (var_a * df_a + var_b * df_b) / (df_a + df_b);
    if pooled == 0.0 {
        return None;
    }
    Some((mean(a)? - mean(b)?) / pooled.sqrt())
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(xs: &[f64], q: f64) -> Option<f64> {
    if xs.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Percentile bootstrap interval of `statistic` at confidence `ci`.
pub fn bootstrap_ci(
    xs: &[f64],
    n_bootstrap: usize,
    ci: f64,
    rng: &mut StdRng,
    statistic: impl Fn(&[f64]) -> Option<f64>,
) -> Option<(f64, f64)> {
    if xs.is_empty() || n_bootstrap == 0 || !(0.0..1.0).contains(&ci) {
        return None;
    }

    let mut resampled = vec![0.0; xs.len()];
    let mut estimates = Vec::with_capacity(n_bootstrap);
    for _ in 0..n_bootstrap {
        for slot in resampled.iter_mut() {
            *slot = xs[rng.gen_range(0..xs.len())];
        }
        if let Some(estimate) = statistic(&resampled) {
            estimates.push(estimate);
        }
    }

    let lower_q = (1.0 - ci) / 2.0;
    Some((quantile(&estimates, lower_q)?, quantile(&estimates, ci + lower_q)?))
}

/// Outcome of a two-sided permutation test on the difference of means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermutationTest {
    pub observed: f64,
    pub p_value: f64,
}

pub fn permutation_test(
    a: &[f64],
    b: &[f64],
    n_permutations: usize,
    rng: &mut StdRng,
) -> Option<PermutationTest> {
    let observed = mean(a)? - mean(b)?;

    let mut pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let mut extreme = 0usize;
    for _ in 0..n_permutations {
        pooled.shuffle(rng);
        let (pa, pb) = pooled.split_at(a.len());
        let diff = mean(pa)? - mean(pb)?;
        if diff.abs() >= observed.abs() {
            extreme += 1;
        }
    }

    Some(PermutationTest {
        observed,
        p_value: (extreme + 1) as f64 / (n_permutations + 1) as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn moments() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&xs).unwrap(), 5.0));
        assert!(close(variance(&xs).unwrap(), 32.0 / 7.0));
        assert_eq!(variance(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn cohens_d_uses_pooled_sd() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 4.0, 5.0];
        assert!(close(cohens_d(&a, &b).unwrap(), -2.0));
        assert_eq!(cohens_d(&[1.0, 1.0], &[1.0, 1.0]), None);
    }

    #[test]
    fn quantile_interpolates() {
        let xs = [4.0, 1.0, 3.0, 2.0];
        assert!(close(quantile(&xs, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&xs, 0.5).unwrap(), 2.5));
        assert!(close(quantile(&xs, 1.0).unwrap(), 4.0));
        assert_eq!(quantile(&xs, 1.5), None);
    }

    #[test]
    fn bootstrap_is_reproducible_with_a_seed() {
        let xs: Vec<f64> = (1..=20).map(f64::from).collect();
        let first = bootstrap_ci(&xs, 500, 0.95, &mut rng(Some(7)), mean).unwrap();
        let second = bootstrap_ci(&xs, 500, 0.95, &mut rng(Some(7)), mean).unwrap();
        assert_eq!(first, second);
        assert!(first.0 < 10.5 && 10.5 < first.1);
    }

    #[test]
    fn permutation_p_value_bounds() {
        let a = [10.0, 11.0, 12.0, 13.0, 14.0];
        let b = [0.0, 1.0, 2.0, 3.0, 4.0];
        let test = permutation_test(&a, &b, 999, &mut rng(Some(1))).unwrap();
        assert!(close(test.observed, 10.0));
        assert!(test.p_value < 0.05);

        let same = permutation_test(&a, &a, 99, &mut rng(Some(1))).unwrap();
        assert!(close(same.p_value, 1.0));
    }
}
