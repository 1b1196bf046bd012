use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;

use crystal_viewer::overlay::{INIT_FAILED_MESSAGE, LOAD_FAILED_MESSAGE};
use crystal_viewer::viewer::RENDER_FAILED_MESSAGE;
use crystal_viewer::{
    ContainerLookup, CrystalDescriptor, CrystalMesh, CrystalScene, CrystalSource, CrystalStats,
    CrystalViewer, FrameHandle, FrameRenderer, Overlay, ViewerError, ViewerHost, ViewerOptions,
    ViewerStatus,
};

#[derive(Debug, Default)]
struct Recorder {
    size: (u32, u32),
    overlays: Vec<Overlay>,
    overlay_visible: bool,
    stats: Option<CrystalStats>,
    renderer_size: Option<(u32, u32)>,
    fail_renderer: bool,
    fail_render: bool,
    uploads: Vec<(usize, usize, bool)>,
    renders: u32,
    resizes: Vec<(u32, u32)>,
    disposed: u32,
    scheduled: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
    pointer_attached: bool,
    resize_attached: bool,
}

type Shared = Rc<RefCell<Recorder>>;

struct RecordingRenderer {
    log: Shared,
}

impl FrameRenderer for RecordingRenderer {
    fn upload_crystal(&mut self, mesh: &CrystalMesh) -> Result<()> {
        let geometry = &mesh.geometry;
        self.log.borrow_mut().uploads.push((
            geometry.vertex_count(),
            geometry.triangle_count(),
            geometry.has_colors(),
        ));
        Ok(())
    }

    fn render(&mut self, _scene: &CrystalScene) -> Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_render {
            return Err(anyhow!("device lost"));
        }
        log.renders += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().resizes.push((width, height));
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed += 1;
    }
}

struct RecordingHost {
    log: Shared,
}

impl ViewerHost for RecordingHost {
    type Renderer = RecordingRenderer;

    fn container_size(&self) -> (u32, u32) {
        self.log.borrow().size
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        let mut log = self.log.borrow_mut();
        log.overlays.push(overlay.clone());
        log.overlay_visible = true;
    }

    fn clear_overlay(&mut self) {
        self.log.borrow_mut().overlay_visible = false;
    }

    fn show_stats(&mut self, stats: &CrystalStats) {
        self.log.borrow_mut().stats = Some(*stats);
    }

    async fn create_renderer(&mut self, width: u32, height: u32) -> Result<RecordingRenderer> {
        let mut log = self.log.borrow_mut();
        if log.fail_renderer {
            return Err(anyhow!("no adapter"));
        }
        log.renderer_size = Some((width, height));
        Ok(RecordingRenderer {
            log: Rc::clone(&self.log),
        })
    }

    fn schedule_frame(&mut self) -> Result<FrameHandle> {
        let mut log = self.log.borrow_mut();
        let handle = FrameHandle(log.scheduled.len() as u64 + 1);
        log.scheduled.push(handle);
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.log.borrow_mut().cancelled.push(handle);
    }

    fn attach_pointer_handlers(&mut self) -> Result<()> {
        self.log.borrow_mut().pointer_attached = true;
        Ok(())
    }

    fn attach_resize_handler(&mut self) -> Result<()> {
        self.log.borrow_mut().resize_attached = true;
        Ok(())
    }

    fn detach_handlers(&mut self) {
        let mut log = self.log.borrow_mut();
        log.pointer_attached = false;
        log.resize_attached = false;
    }
}

struct Page {
    container_id: &'static str,
    log: Shared,
}

impl ContainerLookup for Page {
    type Host = RecordingHost;

    fn find_container(&self, container_id: &str) -> Option<RecordingHost> {
        (container_id == self.container_id).then(|| RecordingHost {
            log: Rc::clone(&self.log),
        })
    }
}

struct StaticSource(Option<CrystalDescriptor>);

impl CrystalSource for StaticSource {
    async fn fetch_crystal_data(&self, _user_id: &str) -> Option<CrystalDescriptor> {
        self.0.clone()
    }
}

fn sample_descriptor() -> CrystalDescriptor {
    serde_json::from_str(
        r#"{
            "geometry": {
                "vertices": [[0,0,0],[1,0,0],[0,1,0]],
                "faces": [[0,1,2]],
                "colors": [[1,0,0],[0,1,0],[0,0,1]]
            },
            "crystal": {"purity": 0.9, "glow_intensity": 0.5, "facets": 3},
            "metrics": {"total_content": 10, "diversity": 0.5}
        }"#,
    )
    .expect("sample descriptor")
}

fn recorder(size: (u32, u32)) -> Shared {
    Rc::new(RefCell::new(Recorder {
        size,
        ..Recorder::default()
    }))
}

fn viewer(
    log: &Shared,
    options: ViewerOptions,
    data: Option<CrystalDescriptor>,
) -> CrystalViewer<RecordingHost, StaticSource> {
    let page = Page {
        container_id: "viewer1",
        log: Rc::clone(log),
    };
    CrystalViewer::mount(&page, "viewer1", "42", options, StaticSource(data))
        .expect("container exists")
}

#[tokio::test]
async fn loads_and_renders_sample_crystal() {
    let log = recorder((800, 600));
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));

    assert_eq!(viewer.init().await, ViewerStatus::Ready);

    let crystal = viewer.crystal().expect("crystal mesh");
    assert_eq!(crystal.geometry.vertex_count(), 3);
    assert_eq!(crystal.geometry.triangle_count(), 1);
    assert!(crystal.geometry.has_colors());
    assert!(crystal.material.vertex_colors);
    assert!(viewer.is_animating());
    assert_eq!(viewer.last_error(), None);

    let log = log.borrow();
    assert_eq!(log.overlays, vec![Overlay::Loading]);
    assert!(!log.overlay_visible);
    assert_eq!(log.uploads, vec![(3, 1, true)]);
    assert_eq!(log.renderer_size, Some((800, 600)));
    assert!(log.pointer_attached);
    assert!(log.resize_attached);
    assert_eq!(log.scheduled.len(), 1);
    assert!(log.stats.is_none());
}

#[tokio::test]
async fn frames_rotate_and_rearm() {
    let log = recorder((400, 400));
    let options = ViewerOptions {
        rotation_speed: 0.01,
        ..ViewerOptions::default()
    };
    let mut viewer = viewer(&log, options, Some(sample_descriptor()));
    viewer.init().await;

    for _ in 0..3 {
        viewer.animate();
    }

    let rotation = viewer.crystal().expect("crystal").rotation;
    assert!((rotation.y - 0.03).abs() < 1e-6);
    assert!((rotation.x - 0.015).abs() < 1e-6);
    assert_eq!(viewer.frames_rendered(), 3);
    assert_eq!(log.borrow().renders, 3);
    assert_eq!(log.borrow().scheduled.len(), 4);
}

#[tokio::test]
async fn destroy_stops_the_loop_and_is_idempotent() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));
    viewer.init().await;
    viewer.animate();

    viewer.destroy();
    viewer.destroy();
    viewer.animate();

    assert_eq!(viewer.status(), ViewerStatus::Destroyed);
    assert!(!viewer.is_animating());
    assert!(viewer.crystal().is_none());
    let log = log.borrow();
    assert_eq!(log.renders, 1);
    assert_eq!(log.scheduled.len(), 2);
    assert_eq!(log.cancelled, vec![FrameHandle(2)]);
    assert_eq!(log.disposed, 1);
    assert!(!log.pointer_attached);
    assert!(!log.resize_attached);
}

#[test]
fn destroy_before_init_is_safe() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), None);
    viewer.destroy();
    viewer.destroy();
    assert_eq!(viewer.status(), ViewerStatus::Destroyed);
    assert_eq!(log.borrow().disposed, 0);
}

#[tokio::test]
async fn dragging_rotates_only_while_pressed() {
    let log = recorder((400, 400));
    let options = ViewerOptions {
        auto_rotate: false,
        ..ViewerOptions::default()
    };
    let mut viewer = viewer(&log, options, Some(sample_descriptor()));
    viewer.init().await;

    viewer.pointer_move(Vec2::new(50.0, 50.0));
    assert_eq!(viewer.crystal().expect("crystal").rotation, glam::Vec3::ZERO);

    viewer.pointer_down(Vec2::new(10.0, 10.0));
    viewer.pointer_move(Vec2::new(30.0, 15.0));
    let rotation = viewer.crystal().expect("crystal").rotation;
    assert!((rotation.y - 0.2).abs() < 1e-6);
    assert!((rotation.x - 0.05).abs() < 1e-6);

    viewer.pointer_up();
    viewer.pointer_move(Vec2::new(80.0, 40.0));
    assert_eq!(viewer.crystal().expect("crystal").rotation, rotation);

    viewer.pointer_down(Vec2::new(0.0, 0.0));
    viewer.pointer_leave();
    viewer.pointer_move(Vec2::new(100.0, 100.0));
    assert_eq!(viewer.crystal().expect("crystal").rotation, rotation);
}

#[tokio::test]
async fn single_touch_drags_and_multi_touch_is_ignored() {
    let log = recorder((400, 400));
    let options = ViewerOptions {
        auto_rotate: false,
        ..ViewerOptions::default()
    };
    let mut viewer = viewer(&log, options, Some(sample_descriptor()));
    viewer.init().await;

    viewer.touch_start(&[Vec2::new(0.0, 0.0), Vec2::new(5.0, 5.0)]);
    viewer.touch_move(&[Vec2::new(20.0, 20.0), Vec2::new(5.0, 5.0)]);
    assert_eq!(viewer.crystal().expect("crystal").rotation, glam::Vec3::ZERO);

    viewer.touch_start(&[Vec2::new(0.0, 0.0)]);
    viewer.touch_move(&[Vec2::new(10.0, -10.0)]);
    viewer.touch_end();
    let rotation = viewer.crystal().expect("crystal").rotation;
    assert!((rotation.y - 0.1).abs() < 1e-6);
    assert!((rotation.x + 0.1).abs() < 1e-6);
}

#[tokio::test]
async fn resize_is_a_noop_before_init() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));
    viewer.on_resize();
    assert!(log.borrow().resizes.is_empty());

    viewer.init().await;
    log.borrow_mut().size = (1000, 500);
    viewer.on_resize();

    assert_eq!(log.borrow().resizes, vec![(1000, 500)]);
    let camera = viewer.scene().expect("scene").camera;
    assert!((camera.aspect - 2.0).abs() < 1e-6);
}

#[test]
fn missing_container_aborts_mount() {
    let log = recorder((400, 400));
    let page = Page {
        container_id: "viewer1",
        log,
    };
    let result = CrystalViewer::mount(
        &page,
        "missing",
        "42",
        ViewerOptions::default(),
        StaticSource(None),
    );
    assert!(matches!(result, Err(ViewerError::ContainerNotFound(id)) if id == "missing"));
}

#[tokio::test]
async fn fetch_failure_shows_load_error() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), None);

    assert_eq!(viewer.init().await, ViewerStatus::Error);
    assert_eq!(viewer.last_error(), Some(LOAD_FAILED_MESSAGE));
    assert!(!viewer.is_animating());

    let log = log.borrow();
    assert_eq!(
        log.overlays.last(),
        Some(&Overlay::Error(LOAD_FAILED_MESSAGE.to_string()))
    );
    assert!(log.overlay_visible);
    assert!(log.renderer_size.is_none());
    assert!(log.scheduled.is_empty());
}

#[tokio::test]
async fn renderer_failure_shows_init_error() {
    let log = recorder((400, 400));
    log.borrow_mut().fail_renderer = true;
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));

    assert_eq!(viewer.init().await, ViewerStatus::Error);
    assert_eq!(viewer.last_error(), Some(INIT_FAILED_MESSAGE));
    assert!(!log.borrow().pointer_attached);
}

#[tokio::test]
async fn render_failure_stops_the_loop() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));
    viewer.init().await;
    log.borrow_mut().fail_render = true;

    viewer.animate();
    viewer.animate();

    assert_eq!(viewer.status(), ViewerStatus::Error);
    assert_eq!(viewer.last_error(), Some(RENDER_FAILED_MESSAGE));
    let log = log.borrow();
    assert_eq!(log.scheduled.len(), 1);
    assert_eq!(log.disposed, 1);
}

#[tokio::test]
async fn zero_sized_container_uses_option_size() {
    let log = recorder((0, 0));
    let options = ViewerOptions {
        show_stats: true,
        size: crystal_viewer::CrystalSize::Small,
        ..ViewerOptions::default()
    };
    let mut viewer = viewer(&log, options, Some(sample_descriptor()));
    viewer.init().await;

    let log = log.borrow();
    assert_eq!(log.renderer_size, Some((200, 200)));
    let stats = log.stats.expect("stats shown");
    assert_eq!(stats.vertices, 3);
    assert_eq!(stats.facets, 3);
}

#[tokio::test]
async fn second_init_is_ignored() {
    let log = recorder((400, 400));
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(sample_descriptor()));
    viewer.init().await;
    assert_eq!(viewer.init().await, ViewerStatus::Ready);
    assert_eq!(log.borrow().uploads.len(), 1);
}

#[tokio::test]
async fn missing_geometry_falls_back_to_placeholder() {
    let log = recorder((400, 400));
    let descriptor = CrystalDescriptor::default();
    let mut viewer = viewer(&log, ViewerOptions::default(), Some(descriptor));

    assert_eq!(viewer.init().await, ViewerStatus::Ready);
    let crystal = viewer.crystal().expect("crystal");
    assert!(crystal.geometry.is_fallback());
    assert!(!crystal.material.vertex_colors);
}
