//! Row sanitation for batches that contain undefined (NaN) entries.
//!
//! Rows whose state or preference contains NaN are not evaluated at all; the
//! surviving rows are renumbered contiguously. The helpers here keep track of
//! which input row each output row came from.

/// Indices of the rows whose state and preference contain no NaN.
///
/// Rows are paired by position; extra rows in the longer slice are ignored.
pub fn retained_rows<S, P>(states: &[S], preferences: &[P]) -> Vec<usize>
where
    S: AsRef<[f64]>,
    P: AsRef<[f64]>,
{
    states
        .iter()
        .zip(preferences)
        .enumerate()
        .filter(|(_, (s, p))| {
            let s: &[f64] = AsRef::<[f64]>::as_ref(*s);
            let p: &[f64] = AsRef::<[f64]>::as_ref(*p);
            !s.iter().chain(p).any(|x| x.is_nan())
        })
        .map(|(i, _)| i)
        .collect()
}

/// Per-input-row validity flags derived from the retained row indices.
pub fn validity_mask(rows: &[usize], batch: usize) -> Vec<bool> {
    let mut mask = vec![false; batch];
    for &r in rows {
        if r < batch {
            mask[r] = true;
        }
    }
    mask
}

/// Spreads per-retained-row outputs back to input positions, leaving `None`
/// for excluded rows.
pub fn scatter_rows<T>(rows: &[usize], outputs: Vec<T>, batch: usize) -> Vec<Option<T>> {
    let mut full: Vec<Option<T>> = (0..batch).map(|_| None).collect();
    for (&r, out) in rows.iter().zip(outputs) {
        if r < batch {
            full[r] = Some(out);
        }
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_rows_with_nan_in_state_or_preference() {
        let states = vec![
            vec![0.1, 0.2],
            vec![f64::NAN, 0.2],
            vec![0.3, 0.4],
            vec![0.5, 0.6],
        ];
        let prefs = vec![
            vec![0.5, 0.5],
            vec![0.5, 0.5],
            vec![0.5, 0.5],
            vec![f64::NAN, 0.5],
        ];
        assert_eq!(retained_rows(&states, &prefs), vec![0, 2]);
    }

    #[test]
    fn infinities_are_not_dropped() {
        let states = vec![vec![f64::INFINITY]];
        let prefs = vec![vec![1.0]];
        assert_eq!(retained_rows(&states, &prefs), vec![0]);
    }

    #[test]
    fn all_rows_dropped_is_empty() {
        let states = vec![vec![f64::NAN]];
        let prefs = vec![vec![1.0]];
        assert!(retained_rows(&states, &prefs).is_empty());
    }

    #[test]
    fn mask_and_scatter_restore_alignment() {
        let rows = vec![0, 2];
        assert_eq!(validity_mask(&rows, 3), vec![true, false, true]);
        let full = scatter_rows(&rows, vec!["a", "c"], 3);
        assert_eq!(full, vec![Some("a"), None, Some("c")]);
    }
}
