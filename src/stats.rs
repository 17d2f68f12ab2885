//! Streaming accumulators, jackknife errors, and series diagnostics for
//! per-sweep observables.

/// Collects per-sweep samples of one observable.
///
/// Keeps the raw series so derived quantities can be jackknifed after the
/// run.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    samples: Vec<f64>,
    sum: f64,
    sum_sq: f64,
}

impl Accumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Accumulator::default()
    }

    /// Record one sample.
    pub fn push(&mut self, x: f64) {
        self.samples.push(x);
        self.sum += x;
        self.sum_sq += x * x;
    }

    /// Number of samples recorded.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Sample mean; zero when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    /// Standard error of the mean.
    pub fn stderr(&self) -> f64 {
        let n = self.samples.len() as f64;
        if self.samples.len() < 2 {
            return 0.0;
        }
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        (var.max(0.0) / n).sqrt()
    }

    /// The recorded series.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// Jackknife mean and error of `f` applied to the means of several equal
/// length series.
///
/// Used for nonlinear derived observables (specific heat, susceptibility,
/// Binder ratio) whose plug-in estimator is biased at O(1/n).
pub fn jackknife<F>(series: &[&[f64]], f: F) -> (f64, f64)
where
    F: Fn(&[f64]) -> f64,
{
    let n = series.first().map(|s| s.len()).unwrap_or(0);
    debug_assert!(series.iter().all(|s| s.len() == n));
    let totals: Vec<f64> = series.iter().map(|s| s.iter().sum()).collect();
    let full: Vec<f64> = totals.iter().map(|t| t / n as f64).collect();
    let theta_full = f(&full);
    if n < 2 {
        return (theta_full, 0.0);
    }

    let mut leave_out = vec![0.0; series.len()];
    let mut theta_sum = 0.0;
    let mut theta_sq = 0.0;
    for i in 0..n {
        for (k, s) in series.iter().enumerate() {
            leave_out[k] = (totals[k] - s[i]) / (n - 1) as f64;
        }
        let theta = f(&leave_out);
        theta_sum += theta;
        theta_sq += theta * theta;
    }
    let nf = n as f64;
    let theta_dot = theta_sum / nf;
    let var = (theta_sq / nf - theta_dot * theta_dot).max(0.0);
    let err = ((nf - 1.0) * var).sqrt();
    let unbiased = nf * theta_full - (nf - 1.0) * theta_dot;
    (unbiased, err)
}

/// Cyclic FFT autocorrelation of an observable series, normalized so lag
/// zero is one.
#[cfg(feature = "autocorrelations")]
pub fn autocorrelation(series: &[f64]) -> Vec<f64> {
    use rustfft::num_complex::Complex;
    use rustfft::FftPlanner;

    let n = series.len();
    if n == 0 {
        return vec![];
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    let mut buf: Vec<Complex<f64>> = series
        .iter()
        .map(|x| Complex::new(x - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buf);
    buf.iter_mut()
        .for_each(|c| *c = Complex::new(c.norm_sqr(), 0.0));
    planner.plan_fft_inverse(n).process(&mut buf);

    let c0 = buf[0].re;
    if c0 <= 0.0 {
        return vec![1.0; n];
    }
    buf.iter().map(|c| c.re / c0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stderr() {
        let mut acc = Accumulator::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            acc.push(x);
        }
        assert!((acc.mean() - 2.5).abs() < 1e-12);
        // sample variance 5/3, stderr sqrt(5/12)
        assert!((acc.stderr() - (5.0f64 / 12.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn jackknife_linear_matches_mean() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (m, err) = jackknife(&[&xs], |v| v[0]);
        assert!((m - 3.0).abs() < 1e-12);
        let mut acc = Accumulator::new();
        xs.iter().for_each(|x| acc.push(*x));
        assert!((err - acc.stderr()).abs() < 1e-12);
    }

    #[test]
    fn jackknife_of_variance_like_combination() {
        let e = [1.0, 2.0, 3.0, 2.0];
        let e2: Vec<f64> = e.iter().map(|x| x * x).collect();
        let (v, err) = jackknife(&[&e, &e2], |m| m[1] - m[0] * m[0]);
        assert!(v.is_finite() && err.is_finite());
        assert!(v > 0.0);
    }

    #[cfg(feature = "autocorrelations")]
    #[test]
    fn autocorrelation_lag_zero_is_one() {
        let series: Vec<f64> = (0..64).map(|i| ((i % 7) as f64).sin()).collect();
        let rho = autocorrelation(&series);
        assert!((rho[0] - 1.0).abs() < 1e-9);
    }
}
