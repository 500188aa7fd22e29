//! Per-frame driver tying input, kinematics and the scene together.

use std::sync::Arc;

use log::{debug, info, trace};
use thiserror::Error;

use crate::input::{normalize_key, ControlKey, InputState};
use crate::kinematics::KinematicState;
use crate::pose::{CranePart, ForwardKinematics, NodePose};
use crate::snapshot::DisplaySnapshot;

/// Handle to the renderable scene owned by the hosting view.
///
/// The control loop only writes poses and asks for a frame; it never creates
/// or destroys nodes.
pub trait SceneBinding {
    /// Whether the scene is attached to a live view.
    fn is_mounted(&self) -> bool {
        true
    }

    fn has_node(&self, part: CranePart) -> bool;

    fn write_pose(&mut self, part: CranePart, pose: &NodePose);

    /// Presents the scene after this tick's poses were written.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Called by the host on viewport changes, never by the loop.
    fn resize(&mut self, width: u32, height: u32);
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("scene is not mounted")]
    NotMounted,
    #[error("scene has no {} node", .0.name())]
    MissingNode(CranePart),
    #[error("control loop is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

/// Lifecycle of a [`ControlLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Owns the crane state and advances it once per scheduled tick.
pub struct ControlLoop<B> {
    input: Arc<InputState>,
    kinematics: ForwardKinematics,
    state: KinematicState,
    binding: Option<B>,
    snapshot: DisplaySnapshot,
    ticks: u64,
}

impl<B: SceneBinding> ControlLoop<B> {
    pub fn new(kinematics: ForwardKinematics) -> Self {
        Self::with_input(kinematics, Arc::new(InputState::new()))
    }

    /// Uses an existing input state so callers can script key sequences.
    pub fn with_input(kinematics: ForwardKinematics, input: Arc<InputState>) -> Self {
        let state = KinematicState::default();
        Self {
            input,
            kinematics,
            state,
            binding: None,
            snapshot: DisplaySnapshot::from_state(&state),
            ticks: 0,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        if self.binding.is_some() {
            LoopState::Running
        } else {
            LoopState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.loop_state() == LoopState::Running
    }

    /// Attaches to `binding` and starts accepting key events and ticks.
    pub fn start(&mut self, binding: B) -> Result<(), LoopError> {
        if self.is_running() {
            return Err(LoopError::AlreadyRunning);
        }
        if !binding.is_mounted() {
            return Err(LoopError::NotMounted);
        }
        if let Some(part) = CranePart::ALL
            .into_iter()
            .find(|part| !binding.has_node(*part))
        {
            return Err(LoopError::MissingNode(part));
        }
        self.binding = Some(binding);
        info!("control loop started ({})", self.snapshot);
        Ok(())
    }

    /// Detaches from the scene and releases all keys. Safe to call when idle.
    pub fn stop(&mut self) -> Option<B> {
        let binding = self.binding.take()?;
        self.input.clear();
        info!(
            "control loop stopped after {} ticks ({})",
            self.ticks, self.snapshot
        );
        Some(binding)
    }

    /// Key listener. Events are dropped unless the loop is running.
    pub fn handle_key(&self, key: &str, held: bool) -> bool {
        if !self.is_running() {
            trace!("dropping key {key:?} while idle");
            return false;
        }
        if ControlKey::from_name(key).is_none() {
            trace!("ignoring unmapped key {:?}", normalize_key(key));
        }
        self.input.set_key(key, held);
        true
    }

    /// Releases every key, e.g. when the view loses focus.
    pub fn release_all(&self) {
        self.input.clear();
    }

    /// Runs one tick: snapshot input, advance, pose, write, render, publish.
    ///
    /// Returns `Ok(None)` without touching anything while idle. A render
    /// error is returned after the tick's state and snapshot are published.
    pub fn tick(&mut self) -> Result<Option<DisplaySnapshot>, LoopError> {
        let Some(binding) = self.binding.as_mut() else {
            return Ok(None);
        };

        let input = self.input.snapshot();
        self.state = self.state.advance(&input);

        let poses = self.kinematics.compute_poses(&self.state);
        for (part, pose) in poses.iter() {
            binding.write_pose(part, pose);
        }
        let rendered = binding.render();

        // Published even when the frame failed, so it always matches `state`.
        let snapshot = DisplaySnapshot::from_state(&self.state);
        if snapshot != self.snapshot {
            debug!("{snapshot}");
        }
        self.snapshot = snapshot;
        self.ticks += 1;
        trace!("tick {} state {:?}", self.ticks, self.state);

        rendered?;
        Ok(Some(snapshot))
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn latest_snapshot(&self) -> DisplaySnapshot {
        self.snapshot
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn kinematics(&self) -> &ForwardKinematics {
        &self.kinematics
    }

    pub fn input(&self) -> &Arc<InputState> {
        &self.input
    }

    pub fn binding(&self) -> Option<&B> {
        self.binding.as_ref()
    }

    /// Host access to the bound scene, e.g. to forward a resize.
    pub fn binding_mut(&mut self) -> Option<&mut B> {
        self.binding.as_mut()
    }
}
