//! Derived samplers: exponential variates and Poisson event counts.
//!
//! Two regimes feed the generation loop. Slow sources draw inter-spike
//! intervals directly (exponential, scaled by the mean interval); fast
//! sources draw the number of events in one tick from the precomputed
//! `exp(-lambda)` using the product-of-uniforms method. The cutoff
//! between the two is a configuration parameter, not a property of the
//! samplers.

use crate::kiss::KissRng;

impl KissRng {
    /// Draw a unit-rate exponential variate: `-ln(U)`.
    pub fn exp_variate(&mut self) -> f64 {
        -self.next_unit().ln()
    }

    /// Draw the gap in ticks until a slow source's next spike.
    ///
    /// `mean_isi_ticks` is `1 / (rate * dt)` in tick units.
    pub fn interval_ticks(&mut self, mean_isi_ticks: f64) -> f64 {
        self.exp_variate() * mean_isi_ticks
    }

    /// Draw a Poisson-distributed event count from `p = exp(-lambda)`.
    ///
    /// Product-of-uniforms: multiply unit draws until the running product
    /// drops to `p`, returning the number of extra draws that took.
    ///
    /// `p == 0.0` (a rate beyond the range where `exp(-lambda)` is
    /// representable) returns 0: extreme rates clamp to no events this
    /// tick rather than saturating the fabric.
    pub fn poisson_count(&mut self, exp_minus_lambda: f64) -> u32 {
        if exp_minus_lambda <= 0.0 {
            return 0;
        }
        let mut product = self.next_unit();
        let mut count = 0u32;
        while product > exp_minus_lambda {
            count += 1;
            product *= self.next_unit();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kiss::Seed;

    fn rng() -> KissRng {
        KissRng::from_seed(Seed([0x1234_5678, 0x9ABC_DEF0, 42, 7]))
    }

    #[test]
    fn exp_variate_is_positive() {
        let mut rng = rng();
        for _ in 0..10_000 {
            assert!(rng.exp_variate() > 0.0);
        }
    }

    #[test]
    fn exp_variate_mean_is_near_one() {
        let mut rng = rng();
        let n = 200_000;
        let sum: f64 = (0..n).map(|_| rng.exp_variate()).sum();
        let mean = sum / n as f64;
        assert!((mean - 1.0).abs() < 0.02, "exponential mean {mean} far from 1");
    }

    #[test]
    fn interval_scales_with_mean() {
        let mut rng = rng();
        let n = 100_000;
        let sum: f64 = (0..n).map(|_| rng.interval_ticks(250.0)).sum();
        let mean = sum / n as f64;
        assert!((mean - 250.0).abs() < 5.0, "interval mean {mean} far from 250");
    }

    #[test]
    fn poisson_count_matches_mean_and_variance() {
        // lambda = 1: mean 1, variance 1.
        let p = (-1.0f64).exp();
        let mut rng = rng();
        let n = 200_000u32;
        let counts: Vec<u32> = (0..n).map(|_| rng.poisson_count(p)).collect();
        let mean = counts.iter().map(|&k| k as f64).sum::<f64>() / n as f64;
        let var = counts
            .iter()
            .map(|&k| (k as f64 - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        assert!((mean - 1.0).abs() < 0.02, "Poisson(1) mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "Poisson(1) variance {var}");
    }

    #[test]
    fn poisson_count_high_rate() {
        // lambda = 5: mean 5.
        let p = (-5.0f64).exp();
        let mut rng = rng();
        let n = 100_000u32;
        let sum: u64 = (0..n).map(|_| u64::from(rng.poisson_count(p))).sum();
        let mean = sum as f64 / n as f64;
        assert!((mean - 5.0).abs() < 0.1, "Poisson(5) mean {mean}");
    }

    #[test]
    fn poisson_count_zero_lambda_never_fires() {
        // lambda = 0 gives p = 1; every unit draw is below it.
        let mut rng = rng();
        for _ in 0..10_000 {
            assert_eq!(rng.poisson_count(1.0), 0);
        }
    }

    #[test]
    fn underflowed_p_clamps_to_zero_events() {
        let mut rng = rng();
        assert_eq!((-800.0f64).exp(), 0.0);
        for _ in 0..1000 {
            assert_eq!(rng.poisson_count(0.0), 0);
        }
    }
}
