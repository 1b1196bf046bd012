use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::descriptor::GeometryDescriptor;

/// Floats per interleaved GPU vertex: `position.xyz`, `normal.xyz`, `color.rgb`.
pub const INTERLEAVED_STRIDE: usize = 9;

/// Indexed triangle mesh ready to be uploaded to the renderer.
///
/// `positions`, `normals` and `colors` are flat `xyz`/`rgb` buffers with
/// three floats per vertex; `indices` holds three entries per triangle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrystalGeometry {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<f32>>,
    pub indices: Vec<u32>,
    #[serde(default)]
    pub fallback: bool,
}

impl CrystalGeometry {
    /// Builds the mesh described by the server payload.
    ///
    /// Never fails: a missing descriptor, missing or empty vertex/face lists,
    /// or faces pointing past the vertex list yield [`CrystalGeometry::fallback`].
    pub fn from_descriptor(descriptor: Option<&GeometryDescriptor>) -> Self {
        let Some(descriptor) = descriptor else {
            warn!("crystal payload has no geometry; using fallback shape");
            return Self::fallback();
        };
        let (Some(vertices), Some(faces)) = (&descriptor.vertices, &descriptor.faces) else {
            warn!("crystal geometry is missing vertices or faces; using fallback shape");
            return Self::fallback();
        };
        if vertices.is_empty() || faces.is_empty() {
            warn!("crystal geometry is empty; using fallback shape");
            return Self::fallback();
        }
        let vertex_count = vertices.len();
        if let Some(face) = faces
            .iter()
            .find(|face| face.iter().any(|&index| index as usize >= vertex_count))
        {
            warn!(
                "face {face:?} references a vertex outside 0..{vertex_count}; using fallback shape"
            );
            return Self::fallback();
        }

        let positions: Vec<f32> = vertices.iter().flatten().copied().collect();
        let indices: Vec<u32> = faces.iter().flatten().copied().collect();
        let colors = match &descriptor.colors {
            Some(colors) if colors.len() == vertex_count => {
                Some(colors.iter().flatten().copied().collect())
            }
            Some(colors) => {
                warn!(
                    "ignoring {} vertex colors for {vertex_count} vertices",
                    colors.len()
                );
                None
            }
            None => None,
        };

        let mut geometry = Self {
            normals: vec![0.0; positions.len()],
            positions,
            colors,
            indices,
            fallback: false,
        };
        geometry.compute_vertex_normals();
        geometry
    }

    /// Unit octahedron used whenever the payload cannot be turned into a mesh.
    pub fn fallback() -> Self {
        let positions = OCTAHEDRON_VERTICES.to_vec();
        let mut geometry = Self {
            normals: vec![0.0; positions.len()],
            positions,
            colors: None,
            indices: OCTAHEDRON_INDICES.to_vec(),
            fallback: true,
        };
        geometry.compute_vertex_normals();
        geometry
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Recomputes smooth per-vertex normals from the triangle list.
    ///
    /// Face normals are accumulated unnormalized, so larger faces weigh more.
    pub fn compute_vertex_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];

        for triangle in self.indices.chunks_exact(3) {
            let i0 = triangle[0] as usize;
            let i1 = triangle[1] as usize;
            let i2 = triangle[2] as usize;
            let p0 = self.position(i0);
            let p1 = self.position(i1);
            let p2 = self.position(i2);
            let normal = (p1 - p0).cross(p2 - p0);
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }

        self.normals = accum
            .into_iter()
            .flat_map(|normal| normal.normalize_or_zero().to_array())
            .collect();
    }

    /// Interleaves positions, normals and colors for a single vertex buffer.
    ///
    /// Vertices without colors are written white so the material's base
    /// color shows through unchanged.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut vertices = Vec::with_capacity(self.vertex_count() * INTERLEAVED_STRIDE);
        for i in 0..self.vertex_count() {
            let range = i * 3..i * 3 + 3;
            vertices.extend_from_slice(&self.positions[range.clone()]);
            vertices.extend_from_slice(&self.normals[range.clone()]);
            match &self.colors {
                Some(colors) => vertices.extend_from_slice(&colors[range]),
                None => vertices.extend_from_slice(&[1.0, 1.0, 1.0]),
            }
        }
        vertices
    }

    fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[index * 3..index * 3 + 3])
    }
}

const OCTAHEDRON_VERTICES: &[f32] = &[
    1.0, 0.0, 0.0, // +x
    -1.0, 0.0, 0.0, // -x
    0.0, 1.0, 0.0, // +y
    0.0, -1.0, 0.0, // -y
    0.0, 0.0, 1.0, // +z
    0.0, 0.0, -1.0, // -z
];

const OCTAHEDRON_INDICES: &[u32] = &[
    0, 2, 4, // upper
    2, 1, 4, //
    1, 3, 4, //
    3, 0, 4, //
    2, 0, 5, // lower
    1, 2, 5, //
    3, 1, 5, //
    0, 3, 5, //
];
