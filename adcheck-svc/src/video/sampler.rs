//! Frame sampling
//!
//! Selects a bounded, representative set of frame indices for visual
//! analysis. Pure and total: degenerate input yields an empty selection,
//! never an error (the orchestrator treats an empty selection as fatal).
//!
//! The adaptive strategy biases sampling toward narrative structure:
//! advertisements front-load branding and close with calls to action, so
//! the beginning and end windows get more than their share of the budget.
//! The window proportions are behavior-compatibility constants; do not
//! re-derive them.

use serde::{Deserialize, Serialize};

/// Share of the budget allocated to the first quarter of the video
const BEGINNING_SHARE: f64 = 0.4;
/// Share of the budget allocated to the middle third
const MIDDLE_SHARE: f64 = 0.3;
/// Below this budget the adaptive strategy degenerates to even stepping
const ADAPTIVE_MIN_BUDGET: usize = 6;

/// Frame sampling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    Uniform,
    #[default]
    Adaptive,
}

impl SamplingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingStrategy::Uniform => "uniform",
            SamplingStrategy::Adaptive => "adaptive",
        }
    }

    /// Parse from configuration; unrecognized values fall back to adaptive
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => SamplingStrategy::Uniform,
            _ => SamplingStrategy::Adaptive,
        }
    }
}

/// Select frame indices for analysis.
///
/// Returns a strictly increasing, deduplicated sequence of length
/// `<= min(budget, total_frames)` with every index `< total_frames`.
pub fn select_frames(total_frames: u64, budget: usize, strategy: SamplingStrategy) -> Vec<u64> {
    let budget = (budget as u64).min(total_frames);

    if total_frames == 0 || budget == 0 {
        return Vec::new();
    }

    // Small-budget shortcuts, independent of strategy
    match budget {
        1 => return vec![total_frames / 2],
        2 => return vec![0, total_frames - 1],
        3 => return vec![0, total_frames / 2, total_frames - 1],
        _ => {}
    }

    match strategy {
        SamplingStrategy::Uniform => stepped(0, total_frames, budget),
        SamplingStrategy::Adaptive => {
            if (budget as usize) < ADAPTIVE_MIN_BUDGET {
                stepped(0, total_frames, budget)
            } else {
                adaptive(total_frames, budget)
            }
        }
    }
}

/// Evenly stepped indices within `[start, end)`, truncated to `count`
fn stepped(start: u64, end: u64, count: u64) -> Vec<u64> {
    let span = end.saturating_sub(start);
    if span == 0 || count == 0 {
        return Vec::new();
    }
    if count >= span {
        return (start..end).collect();
    }
    let step = (span / count).max(1);
    (start..end)
        .step_by(step as usize)
        .take(count as usize)
        .collect()
}

/// Window-weighted sampling: 40% beginning, 30% middle, remainder end
fn adaptive(total_frames: u64, budget: u64) -> Vec<u64> {
    let mut frames = Vec::new();

    // Beginning window: first quarter of the video
    let beginning_count = ((budget as f64 * BEGINNING_SHARE) as u64).max(1);
    let beginning_end = total_frames / 4;
    if beginning_end > 0 {
        frames.extend(stepped(0, beginning_end, beginning_count));
    }

    // Middle window
    let middle_count = ((budget as f64 * MIDDLE_SHARE) as u64).max(1);
    let middle_start = total_frames / 3;
    let middle_end = total_frames * 2 / 3;
    if middle_end > middle_start {
        frames.extend(stepped(middle_start, middle_end, middle_count));
    }

    // End window gets whatever budget remains
    let end_count = budget.saturating_sub(frames.len() as u64);
    if end_count > 0 {
        let end_start = total_frames * 3 / 4;
        if total_frames > end_start {
            frames.extend(stepped(end_start, total_frames, end_count));
        }
    }

    frames.sort_unstable();
    frames.dedup();

    // Backfill a deduplication deficit by stepping across the whole video
    if (frames.len() as u64) < budget {
        let deficit = budget - frames.len() as u64;
        let step = (total_frames / (deficit + 1)).max(1);
        for i in 0..deficit {
            let candidate = (i + 1) * step;
            if candidate < total_frames && !frames.contains(&candidate) {
                frames.push(candidate);
            }
        }
        frames.sort_unstable();
        frames.truncate(budget as usize);
    }

    frames
}
