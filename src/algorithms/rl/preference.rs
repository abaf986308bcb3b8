//! Objective preference vectors.
//!
//! A preference weights the `W` objectives (e.g. latency and energy). The
//! critic returns one value per objective; callers scalarize with these
//! helpers.

use rand::Rng;

use super::error::OffloadError;
use super::layout::check_width;

/// Draws a preference uniformly from the probability simplex of dimension
/// `objectives`.
///
/// Uses normalized exponential variates, which gives a flat Dirichlet.
pub fn sample_preference<R: Rng + ?Sized>(rng: &mut R, objectives: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..objectives)
        .map(|_| -(1.0 - rng.gen::<f64>()).ln())
        .collect();
    let total: f64 = draws.iter().sum();
    if total > 0.0 {
        draws.iter().map(|d| d / total).collect()
    } else {
        vec![1.0 / objectives as f64; objectives]
    }
}

/// Uniform weighting over `objectives`.
pub fn uniform_preference(objectives: usize) -> Vec<f64> {
    vec![1.0 / objectives as f64; objectives]
}

/// Returns true if `preference` is nonnegative and sums to 1 within `tol`.
pub fn is_on_simplex(preference: &[f64], tol: f64) -> bool {
    !preference.is_empty()
        && preference.iter().all(|&p| p >= 0.0)
        && (preference.iter().sum::<f64>() - 1.0).abs() <= tol
}

/// Dot product of a per-objective value vector with a preference.
pub fn scalarize(values: &[f64], preference: &[f64]) -> Result<f64, OffloadError> {
    check_width("preference", values.len(), preference.len())?;
    Ok(values.iter().zip(preference).map(|(v, w)| v * w).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sampled_preferences_lie_on_simplex() {
        let mut rng = StdRng::seed_from_u64(7);
        for w in 1..5 {
            for _ in 0..50 {
                let p = sample_preference(&mut rng, w);
                assert_eq!(p.len(), w);
                assert!(is_on_simplex(&p, 1e-9));
            }
        }
    }

    #[test]
    fn uniform_is_on_simplex() {
        assert!(is_on_simplex(&uniform_preference(3), 1e-12));
        assert!(!is_on_simplex(&[0.6, 0.6], 1e-6));
        assert!(!is_on_simplex(&[1.5, -0.5], 1e-6));
    }

    #[test]
    fn scalarize_dot_product() {
        let v = scalarize(&[2.0, -4.0], &[0.25, 0.75]).unwrap();
        assert!((v - (-2.5)).abs() < 1e-12);
        assert!(scalarize(&[1.0], &[0.5, 0.5]).is_err());
    }
}
