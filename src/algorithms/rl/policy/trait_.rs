//! Policy trait for offloading decisions.

use crate::algorithms::rl::config::OffloadConfig;
use crate::algorithms::rl::error::OffloadError;
use crate::algorithms::rl::layout::check_width;
use crate::algorithms::rl::sanitize::retained_rows;
use crate::algorithms::rl::types::OffloadDecision;

/// One row of decisions; `None` when the input row contained NaN and was
/// not evaluated.
pub type BatchDecisions = Vec<Option<Vec<OffloadDecision>>>;

/// A policy that places every device's computation given the current state
/// and an objective preference.
///
/// Output rows stay aligned with input rows: a row excluded by NaN
/// sanitation yields `None` rather than being dropped.
pub trait OffloadPolicy: Send + Sync {
    /// Decides one set of per-device actions per input row.
    ///
    /// # Arguments
    ///
    /// * `states` - State rows of width `state_dim`
    /// * `preferences` - Preference rows of width `objectives`, paired with `states` by position
    ///
    /// # Errors
    ///
    /// Returns [`OffloadError::BatchMismatch`] or [`OffloadError::ShapeMismatch`]
    /// if the inputs disagree with the policy's configuration.
    fn decide(
        &mut self,
        states: &[Vec<f64>],
        preferences: &[Vec<f64>],
    ) -> Result<BatchDecisions, OffloadError>;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}

/// Checks that states and preferences pair up and have the configured widths.
pub(crate) fn check_batch(
    config: &OffloadConfig,
    states: &[Vec<f64>],
    preferences: &[Vec<f64>],
) -> Result<(), OffloadError> {
    if states.len() != preferences.len() {
        return Err(OffloadError::BatchMismatch {
            input: "preference",
            expected: states.len(),
            actual: preferences.len(),
        });
    }
    for (s, p) in states.iter().zip(preferences) {
        check_width("state", config.state_dim, s.len())?;
        check_width("preference", config.objectives, p.len())?;
    }
    Ok(())
}

/// Checks the batch like [`check_batch`], then returns the rows free of NaN.
pub(crate) fn validate_batch(
    config: &OffloadConfig,
    states: &[Vec<f64>],
    preferences: &[Vec<f64>],
) -> Result<Vec<usize>, OffloadError> {
    check_batch(config, states, preferences)?;
    let rows = retained_rows(states, preferences);
    if rows.len() < states.len() {
        log::debug!(
            "excluded {} of {} rows containing NaN",
            states.len() - rows.len(),
            states.len()
        );
    }
    Ok(rows)
}
