//! Projected residual risk after applying proposed controls
//!
//! Each bucket of controls has diminishing returns: the first control in a
//! bucket gets full credit, each later one is discounted geometrically.
//!
//! Global invariants enforced:
//! - projected <= current
//! - Eliminate forces projected = 0
//! - hard multiplier >= hard floor, soft multiplier >= soft floor

use crate::control::{Control, ControlBucket, EffectivenessTable};
use crate::risk::{classify_score_with_thresholds, CategoryThresholds, RiskCategory};
use serde::Serialize;

/// Decay bases and residual-risk floors for the two control buckets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub hard_decay: f64,
    pub soft_decay: f64,
    pub hard_floor: f64,
    pub soft_floor: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        ProjectionParams {
            hard_decay: 0.4,
            soft_decay: 0.5,
            hard_floor: 0.35,
            soft_floor: 0.50,
        }
    }
}

/// Result of projecting one score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub current_score: u32,
    pub projected_score: u32,
    pub reduction_percent: u32,
    /// Clamped hard multiplier (1.0 when no hard controls)
    pub hard_multiplier: f64,
    /// Clamped soft multiplier (1.0 when no soft controls)
    pub soft_multiplier: f64,
}

impl Projection {
    fn unchanged(current: u32) -> Self {
        Projection {
            current_score: current,
            projected_score: current,
            reduction_percent: 0,
            hard_multiplier: 1.0,
            soft_multiplier: 1.0,
        }
    }

    pub fn current_category(&self, thresholds: &CategoryThresholds) -> RiskCategory {
        classify_score_with_thresholds(self.current_score, thresholds)
    }

    pub fn projected_category(&self, thresholds: &CategoryThresholds) -> RiskCategory {
        classify_score_with_thresholds(self.projected_score, thresholds)
    }
}

/// Project a score with the default effectiveness table and parameters
pub fn project(current: u32, controls: &[Control]) -> Projection {
    project_with_params(
        current,
        controls,
        &EffectivenessTable::default(),
        &ProjectionParams::default(),
    )
}

/// Project a score with custom effectiveness and parameters
pub fn project_with_params(
    current: u32,
    controls: &[Control],
    effectiveness: &EffectivenessTable,
    params: &ProjectionParams,
) -> Projection {
    if controls.is_empty() {
        return Projection::unchanged(current);
    }

    if controls
        .iter()
        .any(|c| c.control_type.bucket() == Some(ControlBucket::Elimination))
    {
        return Projection {
            current_score: current,
            projected_score: 0,
            reduction_percent: if current > 0 { 100 } else { 0 },
            hard_multiplier: 0.0,
            soft_multiplier: 0.0,
        };
    }

    let hard = bucket_multiplier(controls, ControlBucket::Hard, effectiveness, params.hard_decay)
        .max(params.hard_floor);
    let soft = bucket_multiplier(controls, ControlBucket::Soft, effectiveness, params.soft_decay)
        .max(params.soft_floor);

    let projected = (current as f64 * hard * soft).round().clamp(0.0, current as f64) as u32;

    Projection {
        current_score: current,
        projected_score: projected,
        reduction_percent: reduction_percent(current, projected),
        hard_multiplier: hard,
        soft_multiplier: soft,
    }
}

/// Product of `1 - eff * decay^i` over the controls in one bucket, in order
fn bucket_multiplier(
    controls: &[Control],
    bucket: ControlBucket,
    effectiveness: &EffectivenessTable,
    decay: f64,
) -> f64 {
    controls
        .iter()
        .filter(|c| c.control_type.bucket() == Some(bucket))
        .enumerate()
        .fold(1.0, |acc, (i, c)| {
            acc * (1.0 - effectiveness.effectiveness(&c.control_type) * decay.powi(i as i32))
        })
}

fn reduction_percent(current: u32, projected: u32) -> u32 {
    if current == 0 {
        return 0;
    }
    let reduced = current.saturating_sub(projected) as f64;
    (100.0 * reduced / current as f64).round().clamp(0.0, 100.0) as u32
}

/// Parse a displayed score; missing, negative or non-numeric text yields 0
pub fn parse_score(text: &str) -> u32 {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}
