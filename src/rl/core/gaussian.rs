//! Gaussian helpers shared by the return simulator and policy sampling

use rand::Rng;

/// ln(2π)
pub const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Draw from N(0, 1) using the Box-Muller transform
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen::<f64>() is in [0, 1); shift to (0, 1] so ln never sees zero
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Log density of a diagonal Gaussian, summed over dimensions
pub fn diag_log_prob(x: &[f32], mean: &[f32], std: &[f32]) -> f32 {
    x.iter()
        .zip(mean.iter())
        .zip(std.iter())
        .map(|((&x, &mu), &sigma)| {
            let z = (x - mu) / sigma;
            -0.5 * z * z - sigma.ln() - 0.5 * LN_2PI as f32
        })
        .sum()
}

/// Entropy of a diagonal Gaussian, summed over dimensions
pub fn diag_entropy(std: &[f32]) -> f32 {
    std.iter()
        .map(|&sigma| 0.5 + 0.5 * LN_2PI as f32 + sigma.ln())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.05, "var {}", var);
        assert!(samples.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_log_prob_at_mean() {
        let lp = diag_log_prob(&[0.5], &[0.5], &[1.0]);
        assert!((lp + 0.5 * LN_2PI as f32).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_unit_std() {
        let h = diag_entropy(&[1.0, 1.0]);
        assert!((h - 2.0 * (0.5 + 0.5 * LN_2PI as f32)).abs() < 1e-5);
    }
}
