use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{DVec3, Vec3};
use log::warn;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::pose::CranePart;

/// Complete description of the crane scene: joint geometry, part styling,
/// camera and light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rig {
    pub geometry: RigGeometry,
    pub parts: Vec<PartDescription>,
    pub camera: CameraDescription,
    pub light: LightDescription,
}

/// Fixed offsets between the crane's joints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigGeometry {
    /// Platform origin in world space (top of the tower).
    pub platform_mount: DVec3,
    /// Boom hinge relative to the platform.
    pub boom_mount: DVec3,
    /// Trolley rail center relative to the boom hinge, in boom space.
    pub boom_tip: DVec3,
    /// Trolley origin relative to its point on the rail.
    pub trolley_hang: DVec3,
    /// Distance the trolley may travel either side of `boom_tip`.
    pub rail_half_span: f64,
}

impl Default for RigGeometry {
    fn default() -> Self {
        Self {
            platform_mount: DVec3::new(0.0, 12.0, 0.0),
            boom_mount: DVec3::new(0.0, 1.0, 0.0),
            boom_tip: DVec3::new(10.0, 0.0, 0.0),
            trolley_hang: DVec3::new(0.0, -0.5, 0.0),
            rail_half_span: 9.0,
        }
    }
}

/// Renderable box attached to a crane part, or a static prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<CranePart>,
    /// World position for props. Crane parts keep their mount in [`RigGeometry`].
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default = "default_size")]
    pub size: Vec3,
    /// Box center in node-local space.
    #[serde(default)]
    pub pivot: Vec3,
    #[serde(default = "default_color")]
    pub color: Vec3,
}

impl PartDescription {
    fn new(name: &str, part: Option<CranePart>) -> Self {
        Self {
            name: name.to_string(),
            part,
            offset: Vec3::ZERO,
            size: default_size(),
            pivot: Vec3::ZERO,
            color: default_color(),
        }
    }

    fn styled(mut self, offset: Vec3, size: Vec3, pivot: Vec3, color: Vec3) -> Self {
        self.offset = offset;
        self.size = size;
        self.pivot = pivot;
        self.color = color;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: Vec3::new(30.0, 20.0, 30.0),
            target: Vec3::new(0.0, 8.0, 0.0),
            fov: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDescription {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for LightDescription {
    fn default() -> Self {
        Self {
            position: Vec3::new(20.0, 40.0, 20.0),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl Default for Rig {
    fn default() -> Self {
        let steel = Vec3::new(0.55, 0.57, 0.6);
        let crane_yellow = Vec3::new(0.94, 0.75, 0.16);
        let parts = vec![
            PartDescription::new("ground", None).styled(
                Vec3::ZERO,
                Vec3::new(60.0, 0.1, 60.0),
                Vec3::new(0.0, -0.05, 0.0),
                Vec3::new(0.3, 0.42, 0.3),
            ),
            PartDescription::new("tower", None).styled(
                Vec3::ZERO,
                Vec3::new(1.5, 12.0, 1.5),
                Vec3::new(0.0, 6.0, 0.0),
                crane_yellow,
            ),
            PartDescription::new("platform", Some(CranePart::Platform)).styled(
                Vec3::ZERO,
                Vec3::new(3.0, 1.0, 3.0),
                Vec3::new(0.0, 0.5, 0.0),
                steel,
            ),
            PartDescription::new("boom", Some(CranePart::Boom)).styled(
                Vec3::ZERO,
                Vec3::new(24.0, 0.6, 0.6),
                Vec3::new(8.0, 0.0, 0.0),
                crane_yellow,
            ),
            PartDescription::new("trolley", Some(CranePart::Trolley)).styled(
                Vec3::ZERO,
                Vec3::new(1.2, 0.4, 0.8),
                Vec3::ZERO,
                steel,
            ),
            PartDescription::new("cable", Some(CranePart::Cable)).styled(
                Vec3::ZERO,
                Vec3::new(0.08, 1.0, 0.08),
                Vec3::new(0.0, -0.5, 0.0),
                Vec3::new(0.15, 0.15, 0.15),
            ),
            PartDescription::new("hook", Some(CranePart::Hook)).styled(
                Vec3::ZERO,
                Vec3::new(0.6, 0.6, 0.6),
                Vec3::new(0.0, -0.3, 0.0),
                Vec3::new(0.8, 0.15, 0.1),
            ),
        ];
        Self {
            geometry: RigGeometry::default(),
            parts,
            camera: CameraDescription::default(),
            light: LightDescription::default(),
        }
    }
}

impl Rig {
    /// Loads a rig description file, layering it over the built-in rig.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read rig file {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid rig file {}", path.display()))
    }

    /// Parses a rig description. Tags that are absent keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid rig XML")?;
        let mut rig = Rig::default();

        for node in document.descendants().filter(|n| n.has_tag_name("part")) {
            let name = required_text(&node, "name")?;
            rig.apply_part(&node, &name)
                .with_context(|| format!("invalid <part> {name}"))?;
        }

        if let Some(camera) = document.descendants().find(|n| n.has_tag_name("camera")) {
            let current = rig.camera;
            rig.camera = CameraDescription {
                position: parse_vec3(optional_text(&camera, "position"), current.position)?,
                target: parse_vec3(optional_text(&camera, "target"), current.target)?,
                fov: parse_f32(optional_text(&camera, "fov"), current.fov)?,
            };
        } else {
            warn!("rig has no <camera>; using the default view");
        }

        if let Some(light) = document.descendants().find(|n| n.has_tag_name("light")) {
            let current = rig.light;
            rig.light = LightDescription {
                position: parse_vec3(optional_text(&light, "position"), current.position)?,
                color: parse_color(optional_text(&light, "color"), current.color)?,
                intensity: parse_f32(optional_text(&light, "intensity"), current.intensity)?,
            };
        } else {
            warn!("rig has no <light>; using the default light");
        }

        Ok(rig)
    }

    pub fn part(&self, part: CranePart) -> Option<&PartDescription> {
        self.parts.iter().find(|desc| desc.part == Some(part))
    }

    pub fn props(&self) -> impl Iterator<Item = &PartDescription> {
        self.parts.iter().filter(|desc| desc.part.is_none())
    }

    fn apply_part(&mut self, node: &Node<'_, '_>, name: &str) -> Result<()> {
        let part = CranePart::from_name(name);
        let offset = optional_text(node, "offset");

        if let Some(part) = part {
            let geometry = &mut self.geometry;
            let target = match part {
                CranePart::Platform => Some(&mut geometry.platform_mount),
                CranePart::Boom => Some(&mut geometry.boom_mount),
                CranePart::Trolley => Some(&mut geometry.trolley_hang),
                // Cable and hook hang from the trolley; they have no mount.
                CranePart::Cable | CranePart::Hook => None,
            };
            if let Some(target) = target {
                *target = parse_vec3(offset.clone(), target.as_vec3())?.as_dvec3();
            }
            if part == CranePart::Boom {
                geometry.boom_tip =
                    parse_vec3(optional_text(node, "tip"), geometry.boom_tip.as_vec3())?
                        .as_dvec3();
                let rail = parse_f32(
                    optional_text(node, "rail"),
                    geometry.rail_half_span as f32,
                )?;
                if !rail.is_finite() || rail < 0.0 {
                    return Err(anyhow!("<rail> must be a non-negative distance, got {rail}"));
                }
                geometry.rail_half_span = f64::from(rail);
            }
        }

        let existing = match part {
            Some(part) => self.parts.iter().position(|desc| desc.part == Some(part)),
            None => self.parts.iter().position(|desc| desc.name == name),
        };
        let index = match existing {
            Some(index) => index,
            None => {
                self.parts.push(PartDescription::new(name, part));
                self.parts.len() - 1
            }
        };
        let desc = &mut self.parts[index];
        if part.is_none() {
            desc.offset = parse_vec3(offset, desc.offset)?;
        }
        desc.size = parse_vec3(optional_text(node, "size"), desc.size)?;
        desc.pivot = parse_vec3(optional_text(node, "pivot"), desc.pivot)?;
        desc.color = parse_color(optional_text(node, "color"), desc.color)?;
        Ok(())
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_size() -> Vec3 {
    Vec3::ONE
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components(value: &str, what: &str) -> Result<Vec3> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("{what} component {component:?} is not a number: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!(
            "{what} needs 3 components, found {}",
            numbers.len()
        )),
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_components(&value, "vector"),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(parse_components(&value, "color")? / 255.0),
        None => Ok(default),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}
