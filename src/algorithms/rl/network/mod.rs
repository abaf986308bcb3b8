//! Neural networks for hybrid offloading using tch-rs (PyTorch bindings).
//!
//! Provides the hybrid discrete-continuous actor ([`HybridPolicy`]), the
//! twin per-objective critic ([`TwinVectorCritic`]) and a [`NeuralOffloadPolicy`]
//! adapter for the [`OffloadPolicy`](super::policy::OffloadPolicy) trait.
//! This module is only available with the `rl-nn` feature.

pub mod actor;
pub mod critic;
pub mod neural;

pub use actor::{GreedyAction, HybridPolicy, PolicySample};
pub use critic::{pessimistic_scalarized, scalarize_tensor, TwinVectorCritic};
pub use neural::NeuralOffloadPolicy;

use tch::{nn, nn::Init, Kind, Tensor};

use super::error::OffloadError;
use super::layout::check_width;

/// `ln(sqrt(2π))`, constant term of the standard normal log-density.
pub(crate) const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Linear layer with Xavier-uniform weights (gain 1) and zero bias.
pub(crate) fn xavier_linear(p: nn::Path<'_>, in_dim: usize, out_dim: usize) -> nn::Linear {
    let bound = (6.0 / (in_dim + out_dim) as f64).sqrt();
    nn::linear(
        p,
        in_dim as i64,
        out_dim as i64,
        nn::LinearConfig {
            ws_init: Init::Uniform {
                lo: -bound,
                up: bound,
            },
            bs_init: Some(Init::Const(0.0)),
            bias: true,
        },
    )
}

/// Sigmoid squash kept strictly inside `(0, 1)`.
///
/// In `f32` the plain sigmoid saturates to exactly 0 or 1 for large inputs,
/// so the result is clamped to `[margin, 1 - margin]`.
pub(crate) fn squash(x: &Tensor, margin: f64) -> Tensor {
    x.sigmoid().clamp(margin, 1.0 - margin)
}

/// Clamps a raw log-std into `[min, max]` and returns `(log_std, std)`.
pub(crate) fn bounded_std(raw_log_std: &Tensor, min: f64, max: f64) -> (Tensor, Tensor) {
    let log_std = raw_log_std.clamp(min, max);
    let std = log_std.exp();
    (log_std, std)
}

/// Stacks equally wide rows into a `[rows, width]` float tensor.
///
/// `input` names the rows in the error when one has the wrong width.
pub fn rows_to_tensor(
    input: &'static str,
    rows: &[Vec<f64>],
    width: usize,
) -> Result<Tensor, OffloadError> {
    for row in rows {
        check_width(input, width, row.len())?;
    }
    let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Ok(Tensor::from_slice(&flat)
        .reshape([rows.len() as i64, width as i64])
        .to_kind(Kind::Float))
}

/// Fails on the first row of a `[n, _]` network output holding inf or NaN.
///
/// `rows` maps output rows back to input rows for the error.
pub(crate) fn ensure_finite(
    output: &'static str,
    tensor: &Tensor,
    rows: &[usize],
) -> Result<(), OffloadError> {
    let bad = tensor
        .isfinite()
        .logical_not()
        .any_dim(1, false)
        .nonzero()
        .squeeze_dim(1);
    let bad: Vec<i64> = Vec::try_from(&bad)?;
    match bad.first() {
        None => Ok(()),
        Some(&r) => Err(OffloadError::NonFinite {
            output,
            row: rows.get(r as usize).copied().unwrap_or(r as usize),
        }),
    }
}

/// Returns the batch size of a rank-2 tensor whose width must be `width`.
pub(crate) fn batch_of(
    input: &'static str,
    tensor: &Tensor,
    width: usize,
) -> Result<usize, OffloadError> {
    let size = tensor.size();
    if size.len() != 2 {
        return Err(OffloadError::RankMismatch {
            input,
            expected: 2,
            actual: size.len(),
        });
    }
    check_width(input, width, size[1] as usize)?;
    Ok(size[0] as usize)
}

pub(crate) fn same_batch(
    input: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), OffloadError> {
    if expected == actual {
        Ok(())
    } else {
        Err(OffloadError::BatchMismatch {
            input,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squash_stays_open_for_extreme_inputs() {
        let x = Tensor::from_slice(&[-1e6f32, -50.0, 0.0, 50.0, 1e6]);
        let a: Vec<f32> = Vec::try_from(&squash(&x, 1e-6)).unwrap();
        for v in a {
            assert!(v > 0.0 && v < 1.0, "{v} escaped (0, 1)");
        }
    }

    #[test]
    fn clamp_bounds_give_finite_std() {
        let raw = Tensor::from_slice(&[-20.0f32, 2.0, -1e4, 1e4, 0.0]);
        let (log_std, std) = bounded_std(&raw, -20.0, 2.0);
        let log_std: Vec<f32> = Vec::try_from(&log_std).unwrap();
        let std: Vec<f32> = Vec::try_from(&std).unwrap();
        assert_eq!(log_std[0], -20.0);
        assert_eq!(log_std[1], 2.0);
        assert_eq!(log_std[2], -20.0);
        assert_eq!(log_std[3], 2.0);
        for s in std {
            assert!(s.is_finite() && s > 0.0);
        }
    }

    #[test]
    fn batch_of_checks_rank_and_width() {
        let t = Tensor::zeros([3, 4], (Kind::Float, tch::Device::Cpu));
        assert_eq!(batch_of("state", &t, 4).unwrap(), 3);
        assert!(matches!(
            batch_of("state", &t, 5),
            Err(OffloadError::ShapeMismatch { .. })
        ));
        let v = Tensor::zeros([4], (Kind::Float, tch::Device::Cpu));
        assert!(matches!(
            batch_of("state", &v, 4),
            Err(OffloadError::RankMismatch { .. })
        ));
    }

    #[test]
    fn rows_to_tensor_shape() {
        let t = rows_to_tensor("state", &[vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(t.size(), &[2, 2]);
        assert_eq!(t.kind(), Kind::Float);
        let empty = rows_to_tensor("state", &[], 3).unwrap();
        assert_eq!(empty.size(), &[0, 3]);
    }

    #[test]
    fn rows_to_tensor_rejects_ragged_rows() {
        let err = rows_to_tensor("preference", &[vec![0.5, 0.5], vec![1.0]], 2).unwrap_err();
        assert_eq!(
            err,
            OffloadError::ShapeMismatch {
                input: "preference",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn ensure_finite_reports_input_row() {
        let t = Tensor::from_slice(&[0.0f32, 1.0, 2.0, f32::INFINITY, f32::NAN, 0.0])
            .reshape([3, 2]);
        let err = ensure_finite("mean", &t, &[4, 7, 9]).unwrap_err();
        assert_eq!(
            err,
            OffloadError::NonFinite {
                output: "mean",
                row: 7
            }
        );
        let ok = Tensor::zeros([0, 2], (Kind::Float, tch::Device::Cpu));
        assert!(ensure_finite("mean", &ok, &[]).is_ok());
    }
}
