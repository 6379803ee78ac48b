// src/analytics/stats.rs
// Small numeric helpers. Every function returns 0 where the statistic is undefined.

pub fn mean(xs: &[f64]) -> f64 {
    match xs {
        [] => 0.0,
        [first, ..] if is_constant(xs) => *first,
        _ => xs.iter().sum::<f64>() / xs.len() as f64,
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 || is_constant(xs) {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    finite((ss / (xs.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator).
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() || is_constant(xs) {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    finite((ss / xs.len() as f64).sqrt())
}

/// Pearson correlation; 0 when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if is_constant(xs) || is_constant(ys) {
        return 0.0;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    finite(sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
}

/// Ordinary least squares of `ys` on `xs`. `None` when `xs` has no spread
/// or an intermediate is not finite. Constant `ys` gives slope 0 and r 0.
pub fn linregress(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if is_constant(xs) {
        return None;
    }
    if is_constant(ys) {
        return Some(LinearFit {
            slope: 0.0,
            intercept: ys[0],
            r: 0.0,
        });
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if !(sxx.is_finite() && sxy.is_finite() && syy.is_finite()) || sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r = if syy <= 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };
    if !(slope.is_finite() && intercept.is_finite() && r.is_finite()) {
        return None;
    }
    Some(LinearFit {
        slope,
        intercept,
        r,
    })
}

// exact check; the mean of equal values can round away from them
fn is_constant(xs: &[f64]) -> bool {
    xs.iter().all(|x| *x == xs[0])
}

fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_variants() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&xs) - 2.0).abs() < 1e-12);
        assert!((sample_std(&xs) - 2.138089935299395).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn pearson_degenerate_is_zero() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn linregress_fits_line() {
        let fit = linregress(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r - 1.0).abs() < 1e-12);
        assert!(linregress(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_none());
        let flat = linregress(&[0.0, 1.0, 2.0], &[0.3, 0.3, 0.3]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r, 0.0);
    }
}
