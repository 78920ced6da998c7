//! Mode tracking across sweep steps.
//!
//! Solvers return modes sorted by real(neff), so two modes that cross while a
//! parameter changes swap their native positions. Tracking keeps a stable
//! *slot* per physical mode.
//!
//! # Algorithm
//!
//! For each slot's last seen mode `r` and each mode `c` of the new step:
//!
//! 1. Only pairs with the same polarization label are candidates.
//! 2. Candidates are ranked by `|Δneff| = |neff(c) − neff(r)|`, smallest first.
//! 3. Pairs whose `|Δneff|` fall in the same tie bucket are ranked by field
//!    overlap `|⟨r, c⟩|/(‖r‖‖c‖)`, largest first.
//!
//! Assignment is greedy over the ranked list. New modes that found no slot
//! fill the slots that have no reference yet, then open new slots, both in
//! native order. A slot whose reference matched nothing stays empty.

use crate::mode::Mode;
use crate::postprocess;

/// `|Δneff|` values closer than this are treated as a tie.
pub const NEFF_TIE_TOLERANCE: f64 = 1e-9;

// ============================================================================
// Overlap Matrix Computation
// ============================================================================

/// `O[i][j] = overlap(prev[i], curr[j])`; rows of absent slots are zero.
pub fn compute_overlap_matrix(prev: &[Option<&Mode>], curr: &[Mode]) -> Vec<Vec<f64>> {
    prev.iter()
        .map(|slot| match slot {
            Some(p) => curr.iter().map(|c| postprocess::overlap(p, c)).collect(),
            None => vec![0.0; curr.len()],
        })
        .collect()
}

// ============================================================================
// Assignment
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    mode: usize,
    bucket: u64,
    overlap: f64,
}

/// Greedy slot assignment: `assignment[slot] = Some(j)` pairs slot with
/// `curr[j]`.
pub fn find_assignment(
    prev: &[Option<&Mode>],
    curr: &[Mode],
    overlap: &[Vec<f64>],
) -> Vec<Option<usize>> {
    let mut candidates = Vec::with_capacity(prev.len() * curr.len());
    for (slot, reference) in prev.iter().enumerate() {
        let Some(reference) = reference else {
            continue;
        };
        for (j, mode) in curr.iter().enumerate() {
            if mode.polarization() != reference.polarization() {
                continue;
            }
            let dn = (mode.neff() - reference.neff()).norm();
            candidates.push(Candidate {
                slot,
                mode: j,
                bucket: (dn / NEFF_TIE_TOLERANCE).floor().min(u64::MAX as f64) as u64,
                overlap: overlap[slot][j],
            });
        }
    }
    candidates.sort_by(|a, b| {
        a.bucket
            .cmp(&b.bucket)
            .then(b.overlap.total_cmp(&a.overlap))
            .then(a.slot.cmp(&b.slot))
            .then(a.mode.cmp(&b.mode))
    });

    let mut assignment = vec![None; prev.len()];
    let mut used = vec![false; curr.len()];
    for c in candidates {
        if assignment[c.slot].is_none() && !used[c.mode] {
            assignment[c.slot] = Some(c.mode);
            used[c.mode] = true;
        }
    }
    assignment
}

/// Result of tracking one step against the previous slots.
#[derive(Debug, Clone)]
pub struct TrackingResult {
    /// `slots[i]` is the native index of the mode now occupying slot `i`.
    pub slots: Vec<Option<usize>>,
    /// The overlap matrix (for diagnostics).
    pub overlap_matrix: Vec<Vec<f64>>,
    /// Whether any slot holds a mode other than its native position.
    pub had_swaps: bool,
    /// Minimum overlap over matched pairs (lower values indicate potential issues).
    pub min_overlap: f64,
}

/// Assigns `curr` to the slots whose last seen modes are `prev`.
///
/// Unmatched modes take the slots that have no reference yet, in native
/// order; any still left open new slots after the existing ones.
pub fn track_modes(prev: &[Option<&Mode>], curr: &[Mode]) -> TrackingResult {
    let overlap_matrix = compute_overlap_matrix(prev, curr);
    let mut slots = find_assignment(prev, curr, &overlap_matrix);

    let mut min_overlap = f64::INFINITY;
    for (slot, assigned) in slots.iter().enumerate() {
        if let Some(j) = assigned {
            min_overlap = min_overlap.min(overlap_matrix[slot][*j]);
        }
    }
    if min_overlap == f64::INFINITY {
        min_overlap = 0.0;
    }

    let mut used = vec![false; curr.len()];
    for j in slots.iter().flatten() {
        used[*j] = true;
    }
    let mut unmatched = (0..curr.len()).filter(|&j| !used[j]);
    // A slot whose reference found no same-polarization candidate stays empty.
    for (slot, assigned) in slots.iter_mut().enumerate() {
        if assigned.is_none() && prev[slot].is_none() {
            match unmatched.next() {
                Some(j) => *assigned = Some(j),
                None => break,
            }
        }
    }
    slots.extend(unmatched.map(Some));

    let had_swaps = slots
        .iter()
        .enumerate()
        .any(|(i, s)| matches!(s, Some(j) if *j != i));

    TrackingResult {
        slots,
        overlap_matrix,
        had_swaps,
        min_overlap,
    }
}

/// Slots for the first step: native order.
pub fn baseline(n_slots: usize, curr: &[Mode]) -> Vec<Option<usize>> {
    (0..n_slots.max(curr.len()))
        .map(|i| (i < curr.len()).then_some(i))
        .collect()
}
