//! Interactive 3D viewer for a user's crystal.
//!
//! A [`CrystalViewer`] fetches the crystal descriptor for one user from the
//! crystals API, turns it into mesh geometry and keeps a slowly rotating,
//! drag-rotatable view of it alive inside a host container. Hosts are a
//! winit window natively and a DOM element when built for `wasm32`.

pub mod animation;
#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod client;
pub mod descriptor;
pub mod geometry;
pub mod host;
pub mod input;
pub mod options;
pub mod overlay;
pub mod render;
pub mod scene;
pub mod viewer;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{AnimationLoop, FrameHandle};
pub use client::{CrystalClient, CrystalSource, FetchError};
pub use descriptor::{ApiResponse, CrystalDescriptor, CrystalMetrics, CrystalParams, GeometryDescriptor};
pub use geometry::CrystalGeometry;
pub use host::{ContainerLookup, FrameRenderer, ViewerHost};
pub use input::DragRotation;
pub use options::{CrystalSize, OptionsError, ViewerMount, ViewerOptions};
pub use overlay::{CrystalStats, Overlay};
pub use render::{CameraParams, LightParams, Renderer};
pub use scene::{CrystalMaterial, CrystalMesh, CrystalScene, Light, LightKind, PerspectiveCamera};
pub use viewer::{CrystalViewer, ViewerError, ViewerStatus};
