//! Descriptive statistics helpers
//!
//! Two-pass formulas are used for slices; [`RunningStats`] uses Welford's
//! update so partial accumulators can be merged without losing precision.

/// Welford accumulator for count, mean, variance and extrema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add one observation
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Combine with an accumulator built over a disjoint set of observations
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let total = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / total;
        self.m2 += other.m2 + delta * delta * n_a * n_b / total;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Variance with denominator `n`
    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Variance with denominator `n - 1`
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn population_std(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    pub fn sample_std(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sum of squared deviations from the mean (second pass)
fn squared_deviations(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum())
}

/// Sample variance (denominator `n - 1`); `None` below two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    squared_deviations(values).map(|ss| ss / (values.len() - 1) as f64)
}

/// Population standard deviation (denominator `n`)
pub fn population_std(values: &[f64]) -> Option<f64> {
    squared_deviations(values).map(|ss| (ss / values.len() as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Pearson correlation; `None` when either side has no variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_sample_variance() {
        // mean 5, squared deviations 9+1+1+9 = 20, / 3
        let v = sample_variance(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((v - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[3.0]), None);
    }

    #[test]
    fn test_population_std() {
        let s = population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_running_stats_matches_two_pass() {
        let values = [6.5, 7.25, 8.0, 5.75, 9.5, 6.0];
        let stats: RunningStats = values.iter().copied().collect();

        assert_eq!(stats.count(), 6);
        assert!((stats.mean().unwrap() - mean(&values).unwrap()).abs() < 1e-12);
        assert!((stats.sample_variance().unwrap() - sample_variance(&values).unwrap()).abs() < 1e-12);
        assert_eq!(stats.min(), Some(5.75));
        assert_eq!(stats.max(), Some(9.5));
    }

    #[test]
    fn test_running_stats_merge() {
        let values = [1.0, 2.0, 3.0, 10.0, 20.0, 30.0, 4.5];
        let whole: RunningStats = values.iter().copied().collect();

        let mut left: RunningStats = values[..3].iter().copied().collect();
        let right: RunningStats = values[3..].iter().copied().collect();
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean().unwrap() - whole.mean().unwrap()).abs() < 1e-12);
        assert!((left.sample_variance().unwrap() - whole.sample_variance().unwrap()).abs() < 1e-9);
        assert_eq!(left.max(), Some(30.0));
    }

    #[test]
    fn test_running_stats_empty() {
        let stats = RunningStats::new();
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.sample_std(), None);
        assert_eq!(stats.population_std(), None);
    }

    #[test]
    fn test_pearson() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 1.0], &[2.0, 3.0]), None);
    }
}
