use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use glam::Vec2;
use log::{debug, info, warn};
use parking_lot::RwLock;
use winit::event::TouchPhase;
use winit::window::Window;

use crate::animation::FrameHandle;
use crate::descriptor::CrystalDescriptor;
use crate::geometry::CrystalGeometry;
use crate::host::ViewerHost;
use crate::overlay::{CrystalStats, Overlay};
use crate::render::Renderer;

/// API origin used when none is given on the command line.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

/// Drawable size of the native window, shared with the event loop.
#[derive(Debug)]
pub struct WindowViewport {
    size: RwLock<(u32, u32)>,
}

impl WindowViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width, height)),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }
}

/// A winit window acting as the viewer's container. Overlays are shown in
/// the window title and stats go to stdout.
pub struct WindowHost {
    window: Arc<Window>,
    viewport: Arc<WindowViewport>,
    title: String,
    next_frame: u64,
    pointer_attached: bool,
    resize_attached: bool,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, viewport: Arc<WindowViewport>, title: impl Into<String>) -> Self {
        Self {
            window,
            viewport,
            title: title.into(),
            next_frame: 0,
            pointer_attached: false,
            resize_attached: false,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Whether pointer and touch events should reach the viewer.
    pub fn accepts_pointer(&self) -> bool {
        self.pointer_attached
    }

    pub fn accepts_resize(&self) -> bool {
        self.resize_attached
    }
}

impl ViewerHost for WindowHost {
    type Renderer = Renderer;

    fn container_size(&self) -> (u32, u32) {
        self.viewport.size()
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        if overlay.is_error() {
            warn!("{}", overlay.message());
        }
        self.window.set_title(&overlay_title(&self.title, Some(overlay)));
    }

    fn clear_overlay(&mut self) {
        self.window.set_title(&overlay_title(&self.title, None));
    }

    fn show_stats(&mut self, stats: &CrystalStats) {
        println!("{stats}");
    }

    async fn create_renderer(&mut self, width: u32, height: u32) -> Result<Renderer> {
        Renderer::new(Arc::clone(&self.window), width, height).await
    }

    fn schedule_frame(&mut self) -> Result<FrameHandle> {
        self.next_frame += 1;
        self.window.request_redraw();
        Ok(FrameHandle(self.next_frame))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        // A requested redraw cannot be withdrawn; the stopped loop ignores it.
        debug!("dropping frame request {}", handle.0);
    }

    fn attach_pointer_handlers(&mut self) -> Result<()> {
        self.pointer_attached = true;
        Ok(())
    }

    fn attach_resize_handler(&mut self) -> Result<()> {
        self.resize_attached = true;
        Ok(())
    }

    fn detach_handlers(&mut self) {
        self.pointer_attached = false;
        self.resize_attached = false;
    }
}

/// What a single winit touch event means for the viewer, given every finger
/// currently down.
#[derive(Debug, Clone, PartialEq)]
pub enum TouchGesture {
    Start(Vec<Vec2>),
    Move(Vec<Vec2>),
    End,
}

/// Fingers currently on the window, keyed by winit's touch id.
///
/// winit reports each finger separately; the viewer expects the full set of
/// active touches like a DOM `TouchEvent` carries.
#[derive(Debug, Default)]
pub struct ActiveTouches {
    touches: Vec<(u64, Vec2)>,
}

impl ActiveTouches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.touches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }

    pub fn apply(&mut self, id: u64, phase: TouchPhase, location: Vec2) -> TouchGesture {
        match phase {
            TouchPhase::Started => {
                self.set(id, location);
                TouchGesture::Start(self.points())
            }
            TouchPhase::Moved => {
                self.set(id, location);
                TouchGesture::Move(self.points())
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.retain(|(active, _)| *active != id);
                TouchGesture::End
            }
        }
    }

    fn set(&mut self, id: u64, location: Vec2) {
        match self.touches.iter_mut().find(|(active, _)| *active == id) {
            Some((_, point)) => *point = location,
            None => self.touches.push((id, location)),
        }
    }

    fn points(&self) -> Vec<Vec2> {
        self.touches.iter().map(|(_, point)| *point).collect()
    }
}

pub fn overlay_title(base: &str, overlay: Option<&Overlay>) -> String {
    match overlay {
        Some(overlay) => format!("{base} ({})", overlay.message()),
        None => base.to_string(),
    }
}

/// Text report of a crystal, printed by `--summary-only`.
pub fn crystal_summary(user_id: &str, descriptor: &CrystalDescriptor) -> String {
    let geometry = CrystalGeometry::from_descriptor(descriptor.geometry.as_ref());
    let stats = CrystalStats::new(descriptor, &geometry);
    info!(
        "summarizing crystal for user {user_id} ({} vertices)",
        geometry.vertex_count()
    );
    let mut out = String::new();
    let _ = writeln!(out, "Crystal for user {user_id}");
    for (label, value) in stats.rows() {
        let _ = writeln!(out, " - {label}: {value}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CrystalParams, GeometryDescriptor};
    use crate::input::DragRotation;

    #[test]
    fn viewport_tracks_latest_size() {
        let viewport = WindowViewport::new(400, 400);
        viewport.update(800, 600);
        assert_eq!(viewport.size(), (800, 600));
    }

    fn drag_through(events: &[(u64, TouchPhase, Vec2)]) -> glam::Vec3 {
        let mut touches = ActiveTouches::new();
        let mut drag = DragRotation::new();
        let mut rotation = glam::Vec3::ZERO;
        for &(id, phase, location) in events {
            let delta = match touches.apply(id, phase, location) {
                TouchGesture::Start(points) => {
                    drag.touch_start(&points);
                    None
                }
                TouchGesture::Move(points) => drag.touch_move(&points),
                TouchGesture::End => {
                    drag.release();
                    None
                }
            };
            rotation += delta.unwrap_or(glam::Vec3::ZERO);
        }
        rotation
    }

    #[test]
    fn single_finger_drags() {
        let rotation = drag_through(&[
            (1, TouchPhase::Started, Vec2::ZERO),
            (1, TouchPhase::Moved, Vec2::new(10.0, 20.0)),
        ]);
        assert!((rotation.y - 0.1).abs() < 1e-6);
        assert!((rotation.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn second_finger_stops_rotation() {
        let rotation = drag_through(&[
            (1, TouchPhase::Started, Vec2::ZERO),
            (2, TouchPhase::Started, Vec2::new(100.0, 0.0)),
            (1, TouchPhase::Moved, Vec2::new(1.0, 0.0)),
            (2, TouchPhase::Moved, Vec2::new(150.0, 30.0)),
        ]);
        assert_eq!(rotation, glam::Vec3::ZERO);
    }

    #[test]
    fn lifting_one_of_two_fingers_does_not_resume_dragging() {
        let mut touches = ActiveTouches::new();
        touches.apply(1, TouchPhase::Started, Vec2::ZERO);
        touches.apply(2, TouchPhase::Started, Vec2::new(100.0, 0.0));
        assert_eq!(touches.len(), 2);
        assert_eq!(touches.apply(2, TouchPhase::Cancelled, Vec2::ZERO), TouchGesture::End);
        assert_eq!(
            touches.apply(1, TouchPhase::Moved, Vec2::new(5.0, 0.0)),
            TouchGesture::Move(vec![Vec2::new(5.0, 0.0)])
        );

        let rotation = drag_through(&[
            (1, TouchPhase::Started, Vec2::ZERO),
            (2, TouchPhase::Started, Vec2::new(100.0, 0.0)),
            (2, TouchPhase::Ended, Vec2::new(100.0, 0.0)),
            (1, TouchPhase::Moved, Vec2::new(40.0, 0.0)),
        ]);
        assert_eq!(rotation, glam::Vec3::ZERO);
    }

    #[test]
    fn overlay_title_appends_message() {
        assert_eq!(
            overlay_title("Crystal", Some(&Overlay::Loading)),
            "Crystal (Loading crystal...)"
        );
        assert_eq!(
            overlay_title("Crystal", Some(&Overlay::Error("boom".into()))),
            "Crystal (boom)"
        );
        assert_eq!(overlay_title("Crystal", None), "Crystal");
    }

    #[test]
    fn summary_lists_mesh_and_parameters() {
        let descriptor = CrystalDescriptor {
            geometry: Some(GeometryDescriptor {
                vertices: Some(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
                faces: Some(vec![[0, 1, 2]]),
                colors: None,
            }),
            crystal: CrystalParams {
                purity: 0.5,
                glow_intensity: 0.2,
                facets: 12,
            },
            ..CrystalDescriptor::default()
        };
        let summary = crystal_summary("42", &descriptor);
        assert!(summary.starts_with("Crystal for user 42\n"));
        assert!(summary.contains(" - Facets: 12"));
        assert!(summary.contains(" - Purity: 50%"));
    }
}
