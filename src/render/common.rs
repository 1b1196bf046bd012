use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::scene::{CrystalMaterial, CrystalMesh, CrystalScene, Light, LightKind};

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl CameraParams {
    pub fn from_scene(scene: &CrystalScene) -> Self {
        Self {
            view_proj: scene.camera.view_proj(),
            position: scene.camera.position,
        }
    }
}

/// Lighting state consumed by the renderer's uniform buffer. Missing
/// lights contribute nothing.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub ambient: Vec3,
    pub directional_direction: Vec3,
    pub directional_color: Vec3,
    pub directional_intensity: f32,
    pub point_position: Vec3,
    pub point_color: Vec3,
    pub point_intensity: f32,
}

impl LightParams {
    pub fn from_scene(scene: &CrystalScene) -> Self {
        let ambient = scene
            .ambient()
            .map(|light| light.color * light.intensity)
            .unwrap_or(Vec3::ZERO);
        let directional = scene.directional().copied().unwrap_or_else(dark_light);
        let point = scene.point().copied().unwrap_or_else(dark_light);
        Self {
            ambient,
            directional_direction: directional.position.normalize_or_zero(),
            directional_color: directional.color,
            directional_intensity: directional.intensity,
            point_position: point.position,
            point_color: point.color,
            point_intensity: point.intensity,
        }
    }
}

fn dark_light() -> Light {
    Light {
        kind: LightKind::Point,
        color: Vec3::ZERO,
        intensity: 0.0,
        position: Vec3::Z,
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub directional_direction: [f32; 4],
    pub directional_color: [f32; 4],
    pub point_position: [f32; 4],
    pub point_color: [f32; 4],
}

impl GlobalUniform {
    pub fn new(camera: &CameraParams, light: &LightParams) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            ambient: light.ambient.extend(1.0).into(),
            directional_direction: light.directional_direction.extend(0.0).into(),
            directional_color: light
                .directional_color
                .extend(light.directional_intensity)
                .into(),
            point_position: light.point_position.extend(1.0).into(),
            point_color: light.point_color.extend(light.point_intensity).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub base_color: [f32; 4],
    pub emissive: [f32; 4],
    /// `x`: use vertex colors, `y`: shininess.
    pub surface: [f32; 4],
}

impl ObjectConstants {
    pub fn new(mesh: &CrystalMesh) -> Self {
        let model = mesh.model_matrix();
        let normal = Mat3::from_mat4(model).inverse().transpose();
        let material: &CrystalMaterial = &mesh.material;
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            base_color: material.base_color.extend(material.opacity).into(),
            emissive: material
                .emissive
                .extend(material.emissive_intensity)
                .into(),
            surface: [
                if material.vertex_colors { 1.0 } else { 0.0 },
                material.shininess,
                0.0,
                0.0,
            ],
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}
