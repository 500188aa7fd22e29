use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use glam::{DVec3, Vec3};
use log::trace;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::control::SceneBinding;
use crate::kinematics::KinematicState;
use crate::pose::{CranePart, ForwardKinematics, NodePose};
use crate::rig::{PartDescription, Rig};

/// Renderable node: a box styled by the rig and placed by a pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<CranePart>,
    pub pose: NodePose,
    pub size: Vec3,
    pub pivot: Vec3,
    pub color: Vec3,
}

impl SceneNode {
    fn from_description(desc: &PartDescription, pose: NodePose) -> Self {
        Self {
            name: desc.name.clone(),
            part: desc.part,
            pose,
            size: desc.size,
            pivot: desc.pivot,
            color: desc.color,
        }
    }
}

/// Shared, thread-safe set of scene nodes.
///
/// Clones share the same nodes, so a renderer can read what the control loop
/// writes. Used directly as the headless [`SceneBinding`].
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    nodes: Arc<RwLock<Vec<SceneNode>>>,
    viewport: Arc<RwLock<(u32, u32)>>,
    frames: Arc<AtomicU64>,
}

impl SceneGraph {
    /// Creates an empty scene graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<SceneNode>) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            ..Self::default()
        }
    }

    /// Builds one node per rig part, with crane parts in their rest pose.
    pub fn from_rig(rig: &Rig) -> Self {
        let rest = ForwardKinematics::new(rig.geometry).compute_poses(&KinematicState::default());
        let nodes = rig
            .parts
            .iter()
            .map(|desc| {
                let pose = match desc.part {
                    Some(part) => *rest.get(part),
                    None => NodePose::at(desc.offset.as_dvec3()),
                };
                SceneNode::from_description(desc, pose)
            })
            .collect();
        Self::from_nodes(nodes)
    }

    /// Returns a snapshot of all stored nodes.
    pub fn all_nodes(&self) -> Vec<SceneNode> {
        self.nodes.read().clone()
    }

    /// Returns a clone of the named node.
    pub fn get(&self, name: &str) -> Option<SceneNode> {
        self.nodes
            .read()
            .iter()
            .find(|node| node.name == name)
            .cloned()
    }

    pub fn pose(&self, part: CranePart) -> Option<NodePose> {
        self.nodes
            .read()
            .iter()
            .find(|node| node.part == Some(part))
            .map(|node| node.pose)
    }

    /// Applies a mutation to the node bound to `part`.
    pub fn update<F, R>(&self, part: CranePart, mut updater: F) -> Option<R>
    where
        F: FnMut(&mut SceneNode) -> R,
    {
        let mut guard = self.nodes.write();
        let node = guard.iter_mut().find(|node| node.part == Some(part))?;
        Some(updater(node))
    }

    pub fn set_pose(&self, part: CranePart, pose: NodePose) -> bool {
        self.update(part, |node| node.pose = pose).is_some()
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        *self.viewport.read()
    }

    /// Frames presented through the headless binding.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl SceneBinding for SceneGraph {
    fn has_node(&self, part: CranePart) -> bool {
        self.nodes.read().iter().any(|node| node.part == Some(part))
    }

    fn write_pose(&mut self, part: CranePart, pose: &NodePose) {
        if !self.set_pose(part, *pose) {
            trace!("no scene node bound to {}", part.name());
        }
    }

    fn render(&mut self) -> Result<()> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        *self.viewport.write() = (width.max(1), height.max(1));
    }
}
