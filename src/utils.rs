/// Missing values are stored as NaN.
#[inline]
pub fn is_missing(value: &f64) -> bool {
    value.is_nan()
}

/// Weighted quantile of `v`, the smallest value whose cumulative weight
/// reaches `alpha` of the total. Returns `None` for empty or weightless input.
///
/// * `v` - Values, need not be sorted.
/// * `w` - Non-negative weight of each value.
/// * `alpha` - Quantile in `[0, 1]`, `0.5` gives the weighted median.
pub fn weighted_quantile(v: &[f64], w: &[f64], alpha: f64) -> Option<f64> {
    let total: f64 = w.iter().sum();
    if v.is_empty() || total <= 0.0 {
        return None;
    }
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|a, b| v[*a].total_cmp(&v[*b]));

    let target = alpha * total;
    let mut cuml = 0.0;
    for i in idx.iter() {
        cuml += w[*i];
        if cuml >= target {
            return Some(v[*i]);
        }
    }
    idx.last().map(|i| v[*i])
}

#[inline]
pub fn weighted_median(v: &[f64], w: &[f64]) -> Option<f64> {
    weighted_quantile(v, w, 0.5)
}

/// Minimum and maximum of a slice, `None` if it is empty.
pub fn min_max(v: &[f64]) -> Option<(f64, f64)> {
    v.iter().fold(None, |acc, x| match acc {
        None => Some((*x, *x)),
        Some((lo, hi)) => Some((lo.min(*x), hi.max(*x))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_median() {
        let v = vec![4., 5., 6., 1., 2., 3., 7., 8., 9., 10.];
        let w = vec![1.; v.len()];
        assert_eq!(weighted_median(&v, &w), Some(5.0));

        let v = vec![10., 8., 9., 1., 2., 3., 6., 7., 4., 5.];
        let w = vec![1., 1., 1., 1., 1., 2., 1., 1., 5., 1.];
        assert_eq!(weighted_median(&v, &w), Some(4.0));
        assert_eq!(weighted_quantile(&v, &w, 1.0), Some(10.0));

        assert_eq!(weighted_median(&[], &[]), None);
        assert_eq!(weighted_median(&[1.0], &[0.0]), None);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[3., -1., 2.]), Some((-1., 3.)));
        assert_eq!(min_max(&[]), None);
    }

}
