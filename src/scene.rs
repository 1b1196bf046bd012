use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::descriptor::{CrystalDescriptor, CrystalParams};
use crate::geometry::CrystalGeometry;
use crate::options::ViewerOptions;

/// Everything the renderer draws for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalScene {
    pub crystal: CrystalMesh,
    pub camera: PerspectiveCamera,
    pub lights: Vec<Light>,
    pub background: Vec3,
}

impl CrystalScene {
    /// Builds the scene for a fetched descriptor, framing it from
    /// `options.camera_distance`.
    pub fn from_descriptor(
        descriptor: &CrystalDescriptor,
        options: &ViewerOptions,
        aspect: f32,
    ) -> Self {
        let geometry = CrystalGeometry::from_descriptor(descriptor.geometry.as_ref());
        let material = CrystalMaterial::from_params(&descriptor.crystal, geometry.has_colors());
        Self {
            crystal: CrystalMesh::new(geometry, material),
            camera: PerspectiveCamera::new(options.camera_distance, aspect),
            lights: default_lights(),
            background: Vec3::ZERO,
        }
    }

    pub fn ambient(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|light| light.kind == LightKind::Ambient)
    }

    pub fn directional(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|light| light.kind == LightKind::Directional)
    }

    pub fn point(&self) -> Option<&Light> {
        self.lights.iter().find(|light| light.kind == LightKind::Point)
    }
}

/// The crystal itself: geometry, material and current orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalMesh {
    pub geometry: CrystalGeometry,
    pub material: CrystalMaterial,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
}

impl CrystalMesh {
    pub fn new(geometry: CrystalGeometry, material: CrystalMaterial) -> Self {
        Self {
            geometry,
            material,
            rotation: Vec3::ZERO,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z)
    }
}

/// Phong-style surface description derived from the crystal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrystalMaterial {
    pub base_color: Vec3,
    pub vertex_colors: bool,
    pub opacity: f32,
    pub transparent: bool,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub shininess: f32,
}

impl CrystalMaterial {
    pub fn from_params(params: &CrystalParams, vertex_colors: bool) -> Self {
        let opacity = clamp_unit(params.purity);
        Self {
            base_color: hex_color(0x88ccff),
            vertex_colors,
            opacity,
            transparent: opacity < 1.0,
            emissive: hex_color(0x4488ff),
            emissive_intensity: clamp_unit(params.glow_intensity),
            shininess: 100.0,
        }
    }
}

/// Clamps to `0..=1`; non-finite values become 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Perspective camera on the +Z axis looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    pub fn new(distance: f32, aspect: f32) -> Self {
        Self {
            fov: 75.0,
            aspect: aspect.max(0.01),
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, distance),
        }
    }

    /// Updates the aspect ratio from a viewport size; zero heights are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y);
        let projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect.max(0.01), self.near, self.far);
        projection * view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

/// Scene light. `position` is ignored for ambient lights and is the
/// direction the light comes from for directional lights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    #[serde(default)]
    pub position: Vec3,
}

pub fn default_lights() -> Vec<Light> {
    vec![
        Light {
            kind: LightKind::Ambient,
            color: hex_color(0x404040),
            intensity: 0.6,
            position: Vec3::ZERO,
        },
        Light {
            kind: LightKind::Directional,
            color: Vec3::ONE,
            intensity: 0.8,
            position: Vec3::new(5.0, 5.0, 5.0),
        },
        Light {
            kind: LightKind::Point,
            color: hex_color(0x4fc3f7),
            intensity: 0.6,
            position: Vec3::new(-5.0, -5.0, 5.0),
        },
    ]
}

/// Converts `0xRRGGBB` into linear-ish `0..=1` components.
pub fn hex_color(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}
