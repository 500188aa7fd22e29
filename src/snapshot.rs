use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kinematics::{KinematicState, BOOM_ANGLE_MIN};

/// Full boom travel, `BOOM_ANGLE_MAX - BOOM_ANGLE_MIN`.
const BOOM_TRAVEL: f64 = 0.8;

/// Rounded status readout derived from [`KinematicState`] once per tick.
///
/// All rounding is half away from zero on the stored binary value, so
/// `7.25` reads `7.3` and `-3.45` (stored just below `-3.45`) reads `-3.5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Boom travel from fully lowered (0) to fully raised (100).
    pub boom_percent: u8,
    /// Cable length to one decimal.
    pub cable_length: f64,
    /// Platform heading in whole degrees, in `(-360, 360]`.
    pub rotation_degrees: i32,
    /// Trolley offset to one decimal.
    pub trolley_position: f64,
}

impl DisplaySnapshot {
    pub fn from_state(state: &KinematicState) -> Self {
        let percent = ((state.boom_angle - BOOM_ANGLE_MIN) / BOOM_TRAVEL * 100.0).round();
        Self {
            boom_percent: percent.clamp(0.0, 100.0) as u8,
            cable_length: round_tenths(state.cable_length),
            rotation_degrees: wrap_degrees(state.rotation),
            trolley_position: round_tenths(state.trolley_offset),
        }
    }
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self::from_state(&KinematicState::default())
    }
}

impl From<&KinematicState> for DisplaySnapshot {
    fn from(state: &KinematicState) -> Self {
        Self::from_state(state)
    }
}

impl fmt::Display for DisplaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Boom: {}% | Cable: {:.1} | Rotation: {}° | Trolley: {:.1}",
            self.boom_percent, self.cable_length, self.rotation_degrees, self.trolley_position
        )
    }
}

/// Nearest tenth of the exact binary value, ties away from zero.
///
/// `value * 10.0` is itself rounded, so `1.15` (stored just below 1.15)
/// would land on the tie `11.5`. The neighbouring midpoints are compared
/// against the exact product with a fused multiply-add instead.
fn round_tenths(value: f64) -> f64 {
    let mut tenths = (value * 10.0).round();
    let below = value.mul_add(10.0, -(tenths - 0.5));
    let above = value.mul_add(10.0, -(tenths + 0.5));
    if below < 0.0 || (below == 0.0 && tenths <= 0.0) {
        tenths -= 1.0;
    } else if above > 0.0 || (above == 0.0 && tenths >= 0.0) {
        tenths += 1.0;
    }
    // `+ 0.0` turns a rounded `-0.0` into `0.0`.
    tenths / 10.0 + 0.0
}

/// Remainder keeps the sign of the angle; a result of -360 folds to 0.
fn wrap_degrees(radians: f64) -> i32 {
    let degrees = (radians.to_degrees() % 360.0).round() as i32;
    if degrees == -360 {
        0
    } else {
        degrees
    }
}
