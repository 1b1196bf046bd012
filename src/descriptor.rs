use serde::{Deserialize, Serialize};

/// Envelope returned by the crystals endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server-side description of a user's crystal.
///
/// The schema mirrors what the viewer reads; fields the backend omits fall
/// back to neutral defaults instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrystalDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryDescriptor>,
    #[serde(default)]
    pub crystal: CrystalParams,
    #[serde(default)]
    pub metrics: CrystalMetrics,
}

/// Flat mesh description: vertex triplets, triangle index triplets and
/// optional per-vertex RGB colors in `0..=1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<[u32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<[f32; 3]>>,
}

/// Display parameters of the crystal material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrystalParams {
    /// Used as material opacity.
    #[serde(default = "default_purity")]
    pub purity: f32,
    /// Used as emissive intensity.
    #[serde(default)]
    pub glow_intensity: f32,
    #[serde(default)]
    pub facets: u32,
}

impl Default for CrystalParams {
    fn default() -> Self {
        Self {
            purity: default_purity(),
            glow_intensity: 0.0,
            facets: 0,
        }
    }
}

fn default_purity() -> f32 {
    1.0
}

/// Content metrics the crystal was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CrystalMetrics {
    #[serde(default)]
    pub total_content: f64,
    #[serde(default)]
    pub diversity: f64,
}
