//! Flattened hybrid action layout.
//!
//! The policy emits one continuous parameter pair per (device slot,
//! destination) candidate, stored flat as
//! ```text
//! [slot_0: dest_0(2) .. dest_S(2)] ++ [slot_1: ...] ++ ... ++ [slot_{D-1}: ...]
//! ```
//! and one destination index per slot. The critic consumes one block per slot:
//! ```text
//! [one_hot(destination, S + 1)] ++ [selected pair(2)]
//! ```
//! All offset arithmetic for both layouts lives here.

use super::config::OffloadConfig;
use super::error::OffloadError;
use super::types::{Destination, OffloadDecision};

const PAIR: usize = OffloadConfig::PARAMS_PER_CANDIDATE;

/// Index bookkeeping for `D` device slots with `S + 1` destinations each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLayout {
    devices: usize,
    servers: usize,
}

impl ActionLayout {
    /// Creates a layout for `devices` slots and `servers` candidate servers.
    pub fn new(devices: usize, servers: usize) -> Self {
        Self { devices, servers }
    }

    pub fn from_config(config: &OffloadConfig) -> Self {
        Self::new(config.devices, config.servers)
    }

    pub fn devices(&self) -> usize {
        self.devices
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Destinations per slot (`S + 1`).
    pub fn destinations(&self) -> usize {
        self.servers + 1
    }

    /// Discrete index meaning "run locally".
    pub fn local_index(&self) -> usize {
        self.servers
    }

    pub fn discrete_logits_dim(&self) -> usize {
        self.devices * self.destinations()
    }

    pub fn continuous_raw_dim(&self) -> usize {
        self.discrete_logits_dim() * PAIR
    }

    pub fn continuous_selected_dim(&self) -> usize {
        self.devices * PAIR
    }

    /// Width of one critic slot block, `S + 3`.
    pub fn slot_block_dim(&self) -> usize {
        self.destinations() + PAIR
    }

    /// Width of the full critic action encoding, `D * (S + 3)`.
    pub fn action_encoding_dim(&self) -> usize {
        self.devices * self.slot_block_dim()
    }

    /// Flat offset of the parameter pair for `(slot, destination)` in the
    /// per-candidate continuous action.
    pub fn continuous_offset(&self, slot: usize, destination: usize) -> usize {
        slot * self.destinations() * PAIR + destination * PAIR
    }

    /// Validates one row of discrete actions given as numbers and converts
    /// them to indices.
    ///
    /// `row` is only used to locate the offending entry in the error.
    pub fn discrete_indices(&self, row: usize, values: &[f64]) -> Result<Vec<usize>, OffloadError> {
        check_width("discrete", self.devices, values.len())?;
        values
            .iter()
            .enumerate()
            .map(|(slot, &value)| {
                if value.fract() == 0.0 && value >= 0.0 && value <= self.servers as f64 {
                    Ok(value as usize)
                } else {
                    Err(OffloadError::InvalidDiscreteIndex {
                        row,
                        slot,
                        value,
                        max: self.servers,
                    })
                }
            })
            .collect()
    }

    /// Gathers the chosen parameter pair of every slot from one row of the
    /// per-candidate continuous action.
    pub fn select_continuous(
        &self,
        continuous_raw: &[f64],
        discrete: &[usize],
    ) -> Result<Vec<f64>, OffloadError> {
        check_width("continuous_raw", self.continuous_raw_dim(), continuous_raw.len())?;
        self.check_discrete(discrete)?;
        let mut selected = Vec::with_capacity(self.continuous_selected_dim());
        for (slot, &dest) in discrete.iter().enumerate() {
            let offset = self.continuous_offset(slot, dest);
            selected.extend_from_slice(&continuous_raw[offset..offset + PAIR]);
        }
        Ok(selected)
    }

    /// One-hot indicator of a destination index.
    pub fn one_hot(&self, index: usize) -> Result<Vec<f64>, OffloadError> {
        if index > self.servers {
            return Err(OffloadError::InvalidDiscreteIndex {
                row: 0,
                slot: 0,
                value: index as f64,
                max: self.servers,
            });
        }
        let mut v = vec![0.0; self.destinations()];
        v[index] = 1.0;
        Ok(v)
    }

    /// Builds the critic's action encoding for one row.
    pub fn encode_slots(
        &self,
        discrete: &[usize],
        continuous_selected: &[f64],
    ) -> Result<Vec<f64>, OffloadError> {
        self.check_discrete(discrete)?;
        check_width(
            "continuous_selected",
            self.continuous_selected_dim(),
            continuous_selected.len(),
        )?;
        let mut encoded = Vec::with_capacity(self.action_encoding_dim());
        for (&dest, pair) in discrete.iter().zip(continuous_selected.chunks(PAIR)) {
            encoded.extend(self.one_hot(dest)?);
            encoded.extend_from_slice(pair);
        }
        Ok(encoded)
    }

    /// Decodes one row of policy output into per-device decisions.
    pub fn decode(
        &self,
        discrete: &[usize],
        continuous_selected: &[f64],
    ) -> Result<Vec<OffloadDecision>, OffloadError> {
        self.check_discrete(discrete)?;
        check_width(
            "continuous_selected",
            self.continuous_selected_dim(),
            continuous_selected.len(),
        )?;
        Ok(discrete
            .iter()
            .zip(continuous_selected.chunks(PAIR))
            .enumerate()
            .map(|(device, (&dest, pair))| OffloadDecision {
                device,
                // checked above
                destination: Destination::from_index(dest, self.servers)
                    .unwrap_or(Destination::Local),
                params: [pair[0], pair[1]],
            })
            .collect())
    }

    fn check_discrete(&self, discrete: &[usize]) -> Result<(), OffloadError> {
        check_width("discrete", self.devices, discrete.len())?;
        match discrete.iter().position(|&d| d > self.servers) {
            Some(slot) => Err(OffloadError::InvalidDiscreteIndex {
                row: 0,
                slot,
                value: discrete[slot] as f64,
                max: self.servers,
            }),
            None => Ok(()),
        }
    }
}

/// Index of the largest entry; the first one wins on ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

pub(crate) fn check_width(
    input: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), OffloadError> {
    if expected == actual {
        Ok(())
    } else {
        Err(OffloadError::ShapeMismatch {
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
    fn widths_match_config() {
        let cfg = OffloadConfig {
            devices: 2,
            servers: 2,
            ..OffloadConfig::default()
        };
        let layout = ActionLayout::from_config(&cfg);
        assert_eq!(layout.discrete_logits_dim(), cfg.discrete_logits_dim());
        assert_eq!(layout.continuous_raw_dim(), cfg.continuous_raw_dim());
        assert_eq!(layout.continuous_selected_dim(), cfg.continuous_selected_dim());
        assert_eq!(layout.slot_block_dim(), 5);
        assert_eq!(
            cfg.state_dim + layout.action_encoding_dim() + cfg.objectives,
            cfg.critic_input_dim()
        );
    }

    #[test]
    fn continuous_offsets_are_disjoint_and_cover_raw_action() {
        let layout = ActionLayout::new(3, 2);
        let mut seen = vec![false; layout.continuous_raw_dim()];
        for slot in 0..3 {
            for dest in 0..=2 {
                let off = layout.continuous_offset(slot, dest);
                for k in off..off + 2 {
                    assert!(!seen[k]);
                    seen[k] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(layout.continuous_offset(1, 2), 10);
    }

    #[test]
    fn select_continuous_picks_chosen_pair() {
        let layout = ActionLayout::new(2, 2);
        let raw: Vec<f64> = (0..12).map(|i| i as f64 / 100.0).collect();
        let selected = layout.select_continuous(&raw, &[2, 0]).unwrap();
        // slot 0 dest 2 -> offset 4; slot 1 dest 0 -> offset 6
        assert_eq!(selected, vec![0.04, 0.05, 0.06, 0.07]);
    }

    #[test]
    fn select_continuous_rejects_bad_width() {
        let layout = ActionLayout::new(2, 2);
        let err = layout.select_continuous(&[0.5; 10], &[0, 0]).unwrap_err();
        assert_eq!(
            err,
            OffloadError::ShapeMismatch {
                input: "continuous_raw",
                expected: 12,
                actual: 10
            }
        );
    }

    #[test]
    fn one_hot_argmax_round_trip() {
        let layout = ActionLayout::new(1, 4);
        for i in 0..=4 {
            let v = layout.one_hot(i).unwrap();
            assert_eq!(v.iter().sum::<f64>(), 1.0);
            assert_eq!(argmax(&v), Some(i));
        }
        assert!(layout.one_hot(5).is_err());
    }

    #[test]
    fn encode_slots_interleaves_one_hot_and_pair() {
        let layout = ActionLayout::new(2, 2);
        let enc = layout.encode_slots(&[1, 2], &[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(
            enc,
            vec![0.0, 1.0, 0.0, 0.1, 0.2, 0.0, 0.0, 1.0, 0.3, 0.4]
        );
    }

    #[test]
    fn discrete_indices_reject_out_of_range_and_fractional() {
        let layout = ActionLayout::new(2, 2);
        assert_eq!(layout.discrete_indices(0, &[0.0, 2.0]).unwrap(), vec![0, 2]);
        assert_eq!(
            layout.discrete_indices(3, &[0.0, 3.0]).unwrap_err(),
            OffloadError::InvalidDiscreteIndex {
                row: 3,
                slot: 1,
                value: 3.0,
                max: 2
            }
        );
        assert!(layout.discrete_indices(0, &[-1.0, 0.0]).is_err());
        assert!(layout.discrete_indices(0, &[0.5, 0.0]).is_err());
        assert!(layout.discrete_indices(0, &[f64::NAN, 0.0]).is_err());
    }

    #[test]
    fn decode_maps_local_index() {
        let layout = ActionLayout::new(2, 1);
        let decisions = layout.decode(&[1, 0], &[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(decisions[0].destination, Destination::Local);
        assert_eq!(decisions[0].params, [0.1, 0.2]);
        assert_eq!(decisions[1].destination, Destination::Server(0));
        assert_eq!(decisions[1].device, 1);
    }

    #[test]
    fn argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
