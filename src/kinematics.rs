//! The crane's four control parameters and their per-tick update rule.

use serde::{Deserialize, Serialize};

use crate::input::{ControlKey, InputSnapshot};

pub const BOOM_ANGLE_MIN: f64 = -0.5;
pub const BOOM_ANGLE_MAX: f64 = 0.3;
pub const BOOM_STEP: f64 = 0.01;

pub const CABLE_LENGTH_MIN: f64 = 1.0;
pub const CABLE_LENGTH_MAX: f64 = 15.0;
pub const CABLE_STEP: f64 = 0.1;

pub const ROTATION_STEP: f64 = 0.02;

pub const TROLLEY_OFFSET_MIN: f64 = -8.0;
pub const TROLLEY_OFFSET_MAX: f64 = 8.0;
pub const TROLLEY_STEP: f64 = 0.1;

/// Continuous crane parameters. Every field except `rotation` stays inside
/// its `*_MIN..=*_MAX` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    /// Boom pitch in radians; positive raises the tip.
    pub boom_angle: f64,
    pub cable_length: f64,
    /// Platform yaw in radians. Never wrapped.
    pub rotation: f64,
    /// Trolley travel along the boom rail, measured from the rail center.
    pub trolley_offset: f64,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self {
            boom_angle: 0.0,
            cable_length: 5.0,
            rotation: 0.0,
            trolley_offset: 0.0,
        }
    }
}

impl KinematicState {
    /// Builds a state, clamping each bounded field into range.
    pub fn new(boom_angle: f64, cable_length: f64, rotation: f64, trolley_offset: f64) -> Self {
        Self {
            boom_angle: boom_angle.clamp(BOOM_ANGLE_MIN, BOOM_ANGLE_MAX),
            cable_length: cable_length.clamp(CABLE_LENGTH_MIN, CABLE_LENGTH_MAX),
            rotation,
            trolley_offset: trolley_offset.clamp(TROLLEY_OFFSET_MIN, TROLLEY_OFFSET_MAX),
        }
    }

    /// Returns the state one tick later.
    ///
    /// Opposing keys held together both apply, in the order boom, cable,
    /// rotation, trolley and raise-before-lower within each pair. Guards are
    /// strict, so a field sitting on a bound only moves away from it. Each
    /// step is clamped so accumulated rounding cannot overshoot a bound.
    pub fn advance(&self, input: &InputSnapshot) -> Self {
        let mut next = *self;

        if input.is_down(ControlKey::BoomUp) && next.boom_angle < BOOM_ANGLE_MAX {
            next.boom_angle = (next.boom_angle + BOOM_STEP).min(BOOM_ANGLE_MAX);
        }
        if input.is_down(ControlKey::BoomDown) && next.boom_angle > BOOM_ANGLE_MIN {
            next.boom_angle = (next.boom_angle - BOOM_STEP).max(BOOM_ANGLE_MIN);
        }

        if input.is_down(ControlKey::CableIn) && next.cable_length > CABLE_LENGTH_MIN {
            next.cable_length = (next.cable_length - CABLE_STEP).max(CABLE_LENGTH_MIN);
        }
        if input.is_down(ControlKey::CableOut) && next.cable_length < CABLE_LENGTH_MAX {
            next.cable_length = (next.cable_length + CABLE_STEP).min(CABLE_LENGTH_MAX);
        }

        if input.is_down(ControlKey::SlewLeft) {
            next.rotation += ROTATION_STEP;
        }
        if input.is_down(ControlKey::SlewRight) {
            next.rotation -= ROTATION_STEP;
        }

        if input.is_down(ControlKey::TrolleyIn) && next.trolley_offset > TROLLEY_OFFSET_MIN {
            next.trolley_offset = (next.trolley_offset - TROLLEY_STEP).max(TROLLEY_OFFSET_MIN);
        }
        if input.is_down(ControlKey::TrolleyOut) && next.trolley_offset < TROLLEY_OFFSET_MAX {
            next.trolley_offset = (next.trolley_offset + TROLLEY_STEP).min(TROLLEY_OFFSET_MAX);
        }

        next
    }

    pub fn in_range(&self) -> bool {
        (BOOM_ANGLE_MIN..=BOOM_ANGLE_MAX).contains(&self.boom_angle)
            && (CABLE_LENGTH_MIN..=CABLE_LENGTH_MAX).contains(&self.cable_length)
            && (TROLLEY_OFFSET_MIN..=TROLLEY_OFFSET_MAX).contains(&self.trolley_offset)
            && self.rotation.is_finite()
    }
}

/// Free-function form of [`KinematicState::advance`].
pub fn advance(state: &KinematicState, input: &InputSnapshot) -> KinematicState {
    state.advance(input)
}
