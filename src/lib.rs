//! Core modules for an interactive tower-crane simulator.
//!
//! Keyboard input drives four crane parameters once per rendered frame.
//! Forward kinematics turns them into part poses, and a rounded status line
//! is published alongside. Everything except [`app`] and [`render`] is free
//! of windowing so the simulation can run headless under tests or scripts.

pub mod app;
pub mod control;
pub mod input;
pub mod kinematics;
pub mod pose;
pub mod render;
pub mod rig;
pub mod scene_graph;
pub mod script;
pub mod snapshot;

pub use app::{
    camera_from_rig, key_name, light_from_rig, print_final_state, summary_line, WindowScene,
};
pub use control::{ControlLoop, LoopError, LoopState, SceneBinding};
pub use input::{normalize_key, ControlKey, InputSnapshot, InputState};
pub use kinematics::{advance, KinematicState};
pub use pose::{CranePart, ForwardKinematics, NodePose, PoseSet, Transform};
pub use render::{CameraParams, LightParams, Renderer};
pub use rig::{CameraDescription, LightDescription, PartDescription, Rig, RigGeometry};
pub use scene_graph::{SceneGraph, SceneNode};
pub use script::{InputScript, ScriptCommand};
pub use snapshot::DisplaySnapshot;
