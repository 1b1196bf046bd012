use std::fmt;

use crate::descriptor::CrystalDescriptor;
use crate::geometry::CrystalGeometry;
use crate::scene::clamp_unit;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load crystal data";
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize crystal viewer";

/// Status layer drawn over the viewer's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Loading,
    Error(String),
}

impl Overlay {
    pub fn message(&self) -> &str {
        match self {
            Self::Loading => "Loading crystal...",
            Self::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Figures shown in the optional stats panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrystalStats {
    pub vertices: usize,
    pub triangles: usize,
    pub facets: u32,
    pub purity: f32,
    pub glow_intensity: f32,
    pub total_content: f64,
    pub diversity: f64,
    pub fallback_shape: bool,
}

impl CrystalStats {
    pub fn new(descriptor: &CrystalDescriptor, geometry: &CrystalGeometry) -> Self {
        Self {
            vertices: geometry.vertex_count(),
            triangles: geometry.triangle_count(),
            facets: descriptor.crystal.facets,
            purity: clamp_unit(descriptor.crystal.purity),
            glow_intensity: clamp_unit(descriptor.crystal.glow_intensity),
            total_content: descriptor.metrics.total_content,
            diversity: descriptor.metrics.diversity,
            fallback_shape: geometry.is_fallback(),
        }
    }

    /// `label: value` rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let shape = if self.fallback_shape {
            " (placeholder)"
        } else {
            ""
        };
        vec![
            (
                "Mesh",
                format!(
                    "{} vertices, {} triangles{shape}",
                    self.vertices, self.triangles
                ),
            ),
            ("Facets", self.facets.to_string()),
            ("Purity", format!("{:.0}%", self.purity * 100.0)),
            ("Glow", format!("{:.0}%", self.glow_intensity * 100.0)),
            ("Content", format!("{:.0}", self.total_content)),
            ("Diversity", format!("{:.0}%", self.diversity * 100.0)),
        ]
    }
}

impl fmt::Display for CrystalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (label, value)) in self.rows().into_iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}
