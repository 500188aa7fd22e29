//! Forward kinematics for the crane's joint chain.
//!
//! Poses are derived from [`KinematicState`] by composing fixed joint
//! offsets in a documented order instead of relying on scene-graph
//! parenting:
//!
//! ```text
//! world → platform (yaw) → boom (pitch) → boom tip → trolley
//!                                                      └─ cable anchor → hook
//! ```
//!
//! The cable and hook take only the trolley's world position. Their
//! rotation is always identity, so the cable hangs straight down however the
//! platform and boom are turned.

use std::ops::Mul;

use glam::{DMat4, DQuat, DVec3, Mat4};
use serde::{Deserialize, Serialize};

use crate::kinematics::KinematicState;
use crate::rig::RigGeometry;

/// Moving parts of the crane whose poses are recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CranePart {
    Platform,
    Boom,
    Trolley,
    Cable,
    Hook,
}

impl CranePart {
    pub const ALL: [CranePart; 5] = [
        CranePart::Platform,
        CranePart::Boom,
        CranePart::Trolley,
        CranePart::Cable,
        CranePart::Hook,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            CranePart::Platform => "platform",
            CranePart::Boom => "boom",
            CranePart::Trolley => "trolley",
            CranePart::Cable => "cable",
            CranePart::Hook => "hook",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|part| part.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Rigid transform: rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation,
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `parent * child` places `child` (expressed in the parent's frame) in
    /// the parent's outer frame.
    fn mul(self, child: Transform) -> Transform {
        Transform {
            translation: self.transform_point(child.translation),
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }
}

/// World-space pose written into a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePose {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for NodePose {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl NodePose {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    fn from_transform(transform: Transform) -> Self {
        Self {
            position: transform.translation,
            rotation: transform.rotation,
            scale: DVec3::ONE,
        }
    }

    /// Single-precision model matrix for the renderer.
    pub fn model_matrix(&self) -> Mat4 {
        let matrix = DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        Mat4::from_cols_array(&matrix.to_cols_array().map(|value| value as f32))
    }
}

/// Poses of every moving part for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSet {
    pub platform: NodePose,
    pub boom: NodePose,
    pub trolley: NodePose,
    pub cable: NodePose,
    pub hook: NodePose,
}

impl PoseSet {
    pub fn get(&self, part: CranePart) -> &NodePose {
        match part {
            CranePart::Platform => &self.platform,
            CranePart::Boom => &self.boom,
            CranePart::Trolley => &self.trolley,
            CranePart::Cable => &self.cable,
            CranePart::Hook => &self.hook,
        }
    }

    /// Parts paired with their poses, parents first.
    pub fn iter(&self) -> impl Iterator<Item = (CranePart, &NodePose)> + '_ {
        CranePart::ALL.into_iter().map(move |part| (part, self.get(part)))
    }
}

/// Derives part poses from the crane parameters for a fixed rig.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForwardKinematics {
    geometry: RigGeometry,
}

impl ForwardKinematics {
    pub fn new(geometry: RigGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &RigGeometry {
        &self.geometry
    }

    /// Trolley travel after clamping to the physical rail.
    pub fn rail_position(&self, trolley_offset: f64) -> f64 {
        let span = self.geometry.rail_half_span;
        trolley_offset.clamp(-span, span)
    }

    pub fn compute_poses(&self, state: &KinematicState) -> PoseSet {
        let geometry = &self.geometry;

        let platform = Transform::from_translation(geometry.platform_mount)
            * Transform::from_rotation(DQuat::from_rotation_y(state.rotation));

        let boom = platform
            * Transform::from_translation(geometry.boom_mount)
            * Transform::from_rotation(DQuat::from_rotation_z(state.boom_angle));

        let boom_tip = boom * Transform::from_translation(geometry.boom_tip);

        let trolley = boom_tip
            * Transform::from_translation(DVec3::X * self.rail_position(state.trolley_offset))
            * Transform::from_translation(geometry.trolley_hang);

        let anchor = trolley.translation;
        let cable = NodePose {
            position: anchor,
            rotation: DQuat::IDENTITY,
            scale: DVec3::new(1.0, state.cable_length, 1.0),
        };
        let hook = NodePose::at(DVec3::new(
            anchor.x,
            anchor.y - state.cable_length,
            anchor.z,
        ));

        PoseSet {
            platform: NodePose::from_transform(platform),
            boom: NodePose::from_transform(boom),
            trolley: NodePose::from_transform(trolley),
            cable,
            hook,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    const EPS: f64 = 1e-9;

    fn kinematics() -> ForwardKinematics {
        ForwardKinematics::new(RigGeometry::default())
    }

    #[test]
    fn rest_pose_lines_up_along_x() {
        let poses = kinematics().compute_poses(&KinematicState::default());
        let geometry = RigGeometry::default();
        assert!(poses.platform.position.abs_diff_eq(geometry.platform_mount, EPS));
        let hinge = geometry.platform_mount + geometry.boom_mount;
        assert!(poses.boom.position.abs_diff_eq(hinge, EPS));
        let trolley = hinge + geometry.boom_tip + geometry.trolley_hang;
        assert!(poses.trolley.position.abs_diff_eq(trolley, EPS));
        assert!(poses
            .hook
            .position
            .abs_diff_eq(trolley - DVec3::Y * 5.0, EPS));
    }

    #[test]
    fn platform_yaw_swings_the_trolley_around_the_tower() {
        let state = KinematicState {
            rotation: FRAC_PI_2,
            ..KinematicState::default()
        };
        let poses = kinematics().compute_poses(&state);
        // A quarter turn about +Y maps +X onto -Z.
        let geometry = RigGeometry::default();
        let expected_z = -(geometry.boom_tip.x + geometry.trolley_hang.x);
        assert!((poses.trolley.position.z - expected_z).abs() < EPS);
        assert!(poses.trolley.position.x.abs() < EPS);
    }

    #[test]
    fn raising_the_boom_lifts_the_trolley() {
        let level = kinematics().compute_poses(&KinematicState::default());
        let raised = kinematics().compute_poses(&KinematicState::new(0.3, 5.0, 0.0, 0.0));
        assert!(raised.trolley.position.y > level.trolley.position.y);
        assert!(raised.trolley.position.x < level.trolley.position.x);
    }

    #[test]
    fn trolley_offset_slides_along_the_boom() {
        let state = KinematicState::new(0.0, 5.0, 0.0, -3.0);
        let poses = kinematics().compute_poses(&state);
        let rest = kinematics().compute_poses(&KinematicState::default());
        assert!((rest.trolley.position.x - poses.trolley.position.x - 3.0).abs() < EPS);
    }

    #[test]
    fn trolley_is_clamped_to_the_rail() {
        let geometry = RigGeometry {
            rail_half_span: 2.0,
            ..RigGeometry::default()
        };
        let fk = ForwardKinematics::new(geometry);
        let far = fk.compute_poses(&KinematicState::new(0.0, 5.0, 0.0, 8.0));
        let limit = fk.compute_poses(&KinematicState::new(0.0, 5.0, 0.0, 2.0));
        assert!(far.trolley.position.abs_diff_eq(limit.trolley.position, EPS));
        assert_eq!(fk.rail_position(-7.5), -2.0);
    }

    #[test]
    fn cable_and_hook_hang_straight_down() {
        let state = KinematicState::new(-0.4, 11.0, 2.3, 6.5);
        let poses = kinematics().compute_poses(&state);
        assert!(poses.trolley.rotation.angle_between(DQuat::IDENTITY) > 0.1);
        assert_eq!(poses.cable.rotation, DQuat::IDENTITY);
        assert_eq!(poses.hook.rotation, DQuat::IDENTITY);
        assert_eq!(poses.cable.position, poses.trolley.position);
        assert_eq!(poses.cable.scale.y, 11.0);
        assert!(
            ((poses.hook.position.y - poses.trolley.position.y) + state.cable_length).abs() < EPS
        );
        assert_eq!(poses.hook.position.x, poses.trolley.position.x);
        assert_eq!(poses.hook.position.z, poses.trolley.position.z);
    }

    #[test]
    fn parts_parse_from_names() {
        assert_eq!(CranePart::from_name("Hook"), Some(CranePart::Hook));
        assert_eq!(CranePart::from_name("tower"), None);
        assert_eq!(
            PoseSet::iter(&kinematics().compute_poses(&KinematicState::default())).count(),
            5
        );
    }

    #[test]
    fn model_matrix_applies_scale_then_translation() {
        let pose = NodePose {
            position: DVec3::new(1.0, 2.0, 3.0),
            rotation: DQuat::IDENTITY,
            scale: DVec3::new(1.0, 4.0, 1.0),
        };
        let point = pose.model_matrix().transform_point3(glam::Vec3::new(0.0, -1.0, 0.0));
        assert!(point.abs_diff_eq(glam::Vec3::new(1.0, -2.0, 3.0), 1e-6));
    }
}
