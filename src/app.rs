use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3};
use log::warn;
use winit::dpi::PhysicalSize;
use winit::keyboard::{Key, NamedKey};

use crate::control::{ControlLoop, SceneBinding};
use crate::pose::{CranePart, NodePose};
use crate::render::{CameraParams, LightParams, Renderer};
use crate::rig::{CameraDescription, LightDescription, Rig};
use crate::scene_graph::SceneGraph;
use crate::snapshot::DisplaySnapshot;

pub const WINDOW_TITLE: &str = "Crane Simulator";

/// Scene binding for the interactive window: poses land in a [`SceneGraph`]
/// and every rendered frame draws its nodes through the GPU renderer.
pub struct WindowScene {
    graph: SceneGraph,
    renderer: Renderer,
    camera: CameraDescription,
    light: LightParams,
}

impl WindowScene {
    pub fn new(graph: SceneGraph, renderer: Renderer, rig: &Rig) -> Self {
        Self {
            graph,
            renderer,
            camera: rig.camera,
            light: light_from_rig(&rig.light),
        }
    }
}

impl SceneBinding for WindowScene {
    fn has_node(&self, part: CranePart) -> bool {
        self.graph.has_node(part)
    }

    fn write_pose(&mut self, part: CranePart, pose: &NodePose) {
        self.graph.write_pose(part, pose);
    }

    fn render(&mut self) -> Result<()> {
        let camera = camera_from_rig(&self.camera, self.renderer.aspect());
        self.renderer.update_globals(&camera, &self.light);
        let nodes = self.graph.all_nodes();
        match self.renderer.render(&nodes) {
            Ok(()) => self.graph.render(),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.reconfigure();
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("GPU is out of memory")),
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                Ok(())
            }
            #[allow(unreachable_patterns)]
            Err(err) => {
                warn!("surface error: {err}; retrying next frame");
                Ok(())
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(PhysicalSize::new(width, height));
        self.graph.resize(width, height);
    }
}

pub fn camera_from_rig(camera: &CameraDescription, aspect: f32) -> CameraParams {
    let forward = camera.target - camera.position;
    // Looking straight down the Y axis needs a different up vector.
    let up = if forward.normalize_or_zero().abs().y > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(camera.position, camera.target, up);
    let fov = camera.fov.clamp(1.0, 179.0).to_radians();
    let projection = Mat4::perspective_rh_gl(fov, aspect.max(0.01), 0.1, 500.0);
    CameraParams {
        view_proj: projection * view,
        position: camera.position,
    }
}

pub fn light_from_rig(light: &LightDescription) -> LightParams {
    LightParams {
        position: light.position,
        color: light.color,
        intensity: light.intensity.max(0.1),
    }
}

/// Maps a winit logical key to the lowercase name the input state uses.
pub fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(text) => Some(text.to_lowercase()),
        Key::Named(named) => {
            let name = match named {
                NamedKey::ArrowLeft => "arrowleft",
                NamedKey::ArrowRight => "arrowright",
                NamedKey::ArrowUp => "arrowup",
                NamedKey::ArrowDown => "arrowdown",
                NamedKey::Space => "space",
                NamedKey::Enter => "enter",
                NamedKey::Tab => "tab",
                NamedKey::Shift => "shift",
                NamedKey::Control => "control",
                NamedKey::Alt => "alt",
                _ => return None,
            };
            Some(name.to_string())
        }
        _ => None,
    }
}

/// Snapshot line printed by the binary after a session.
pub fn summary_line(snapshot: &DisplaySnapshot) -> String {
    format!("Status: {snapshot}")
}

pub fn print_final_state<B: SceneBinding>(control: &ControlLoop<B>) {
    println!("Final crane state:");
    println!("{}", summary_line(&control.latest_snapshot()));
    let poses = control.kinematics().compute_poses(control.state());
    for (part, pose) in poses.iter() {
        println!(" - {}", pose_line(part, pose));
    }
}

fn pose_line(part: CranePart, pose: &NodePose) -> String {
    let p = pose.position;
    format!(
        "{} pos=({:.2}, {:.2}, {:.2})",
        part.name(),
        hundredths(p.x),
        hundredths(p.y),
        hundredths(p.z)
    )
}

fn hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

#[cfg(test)]
mod tests {
    use glam::{DVec3, Vec4};
    use winit::keyboard::SmolStr;

    use super::*;

    #[test]
    fn camera_projects_its_target_to_the_screen_center() {
        let camera = CameraDescription::default();
        let params = camera_from_rig(&camera, 16.0 / 9.0);
        let clip = params.view_proj * Vec4::from((camera.target, 1.0));
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
        assert_eq!(params.position, camera.position);
    }

    #[test]
    fn overhead_camera_is_still_finite() {
        let camera = CameraDescription {
            position: Vec3::new(0.0, 40.0, 0.0),
            target: Vec3::ZERO,
            fov: 45.0,
        };
        let params = camera_from_rig(&camera, 1.0);
        assert!(params.view_proj.is_finite());
    }

    #[test]
    fn light_intensity_has_a_floor() {
        let light = LightDescription {
            intensity: 0.0,
            ..LightDescription::default()
        };
        assert_eq!(light_from_rig(&light).intensity, 0.1);
    }

    #[test]
    fn keys_map_to_lowercase_names() {
        assert_eq!(
            key_name(&Key::Character(SmolStr::new("Q"))).as_deref(),
            Some("q")
        );
        assert_eq!(
            key_name(&Key::Named(NamedKey::ArrowLeft)).as_deref(),
            Some("arrowleft")
        );
        assert_eq!(
            key_name(&Key::Named(NamedKey::ArrowRight)).as_deref(),
            Some("arrowright")
        );
        assert_eq!(key_name(&Key::Named(NamedKey::F1)), None);
    }

    #[test]
    fn summary_line_prefixes_the_status() {
        assert_eq!(
            summary_line(&DisplaySnapshot::default()),
            "Status: Boom: 63% | Cable: 5.0 | Rotation: 0° | Trolley: 0.0"
        );
    }

    #[test]
    fn pose_lines_never_print_negative_zero() {
        let pose = NodePose::at(DVec3::new(10.0, 7.5, -1e-12));
        assert_eq!(
            pose_line(CranePart::Hook, &pose),
            "hook pos=(10.00, 7.50, 0.00)"
        );
    }
}
