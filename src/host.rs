//! Platform seams a [`CrystalViewer`](crate::CrystalViewer) is driven through.
//!
//! A host is the thing that owns the drawing surface and delivers events: a
//! winit window natively, a DOM container in the browser, or a recording
//! double in tests.

use std::future::Future;

use anyhow::Result;

use crate::animation::FrameHandle;
use crate::overlay::{CrystalStats, Overlay};
use crate::scene::{CrystalMesh, CrystalScene};

/// Draws a [`CrystalScene`] into a host surface.
pub trait FrameRenderer {
    /// Uploads the crystal's geometry, replacing any previous mesh.
    fn upload_crystal(&mut self, mesh: &CrystalMesh) -> Result<()>;

    fn render(&mut self, scene: &CrystalScene) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    /// Releases GPU resources. Rendering afterwards is a no-op.
    fn dispose(&mut self);
}

/// The container a viewer is bound to.
pub trait ViewerHost {
    type Renderer: FrameRenderer;

    /// Current drawable size in physical pixels.
    fn container_size(&self) -> (u32, u32);

    fn show_overlay(&mut self, overlay: &Overlay);

    fn clear_overlay(&mut self);

    fn show_stats(&mut self, stats: &CrystalStats);

    fn create_renderer(
        &mut self,
        width: u32,
        height: u32,
    ) -> impl Future<Output = Result<Self::Renderer>>;

    /// Arms one callback for the next frame.
    fn schedule_frame(&mut self) -> Result<FrameHandle>;

    fn cancel_frame(&mut self, handle: FrameHandle);

    fn attach_pointer_handlers(&mut self) -> Result<()>;

    fn attach_resize_handler(&mut self) -> Result<()>;

    /// Removes every handler attached by the two methods above.
    fn detach_handlers(&mut self);
}

/// Resolves container ids to hosts.
pub trait ContainerLookup {
    type Host: ViewerHost;

    fn find_container(&self, container_id: &str) -> Option<Self::Host>;
}
