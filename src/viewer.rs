use anyhow::Context;
use glam::{Vec2, Vec3};
use log::{error, info, warn};
use thiserror::Error;

use crate::animation::AnimationLoop;
use crate::client::CrystalSource;
use crate::descriptor::CrystalDescriptor;
use crate::host::{ContainerLookup, FrameRenderer, ViewerHost};
use crate::input::DragRotation;
use crate::options::ViewerOptions;
use crate::overlay::{
    CrystalStats, Overlay, INIT_FAILED_MESSAGE, LOAD_FAILED_MESSAGE,
};
use crate::scene::{CrystalMesh, CrystalScene};

pub const RENDER_FAILED_MESSAGE: &str = "Crystal rendering stopped";

/// Share of the yaw speed applied to pitch while auto-rotating.
const AUTO_ROTATE_PITCH_RATIO: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("container element '{0}' not found")]
    ContainerNotFound(String),
    #[error("no crystal data available for user {0}")]
    NoData(String),
    #[error(transparent)]
    Setup(#[from] anyhow::Error),
}

/// Lifecycle of a viewer: `Idle → Loading → (Ready | Error)`, then
/// `Destroyed` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStatus {
    Idle,
    Loading,
    Ready,
    Error,
    Destroyed,
}

/// Binds one container to a live, drag-rotatable view of one user's crystal.
pub struct CrystalViewer<H, S>
where
    H: ViewerHost,
    S: CrystalSource,
{
    host: H,
    source: S,
    user_id: String,
    options: ViewerOptions,
    status: ViewerStatus,
    last_error: Option<String>,
    descriptor: Option<CrystalDescriptor>,
    scene: Option<CrystalScene>,
    renderer: Option<H::Renderer>,
    drag: DragRotation,
    animation: AnimationLoop,
}

impl<H, S> CrystalViewer<H, S>
where
    H: ViewerHost,
    S: CrystalSource,
{
    pub fn new(host: H, user_id: impl Into<String>, options: ViewerOptions, source: S) -> Self {
        Self {
            host,
            source,
            user_id: user_id.into(),
            options,
            status: ViewerStatus::Idle,
            last_error: None,
            descriptor: None,
            scene: None,
            renderer: None,
            drag: DragRotation::new(),
            animation: AnimationLoop::new(),
        }
    }

    /// Looks up `container_id` and binds a viewer to it. A missing container
    /// is logged and nothing else is attempted.
    pub fn mount<L>(
        lookup: &L,
        container_id: &str,
        user_id: impl Into<String>,
        options: ViewerOptions,
        source: S,
    ) -> Result<Self, ViewerError>
    where
        L: ContainerLookup<Host = H>,
    {
        let Some(host) = lookup.find_container(container_id) else {
            error!("crystal viewer container '{container_id}' not found");
            return Err(ViewerError::ContainerNotFound(container_id.to_string()));
        };
        Ok(Self::new(host, user_id, options, source))
    }

    /// Loads the crystal and starts rendering it.
    ///
    /// Failures never escape: they are logged, shown in the container and
    /// reflected in the returned status.
    pub async fn init(&mut self) -> ViewerStatus {
        if self.status != ViewerStatus::Idle {
            warn!("ignoring init of a viewer in state {:?}", self.status);
            return self.status;
        }
        self.status = ViewerStatus::Loading;
        self.host.show_overlay(&Overlay::Loading);

        let Some(descriptor) = self.fetch_crystal_data().await else {
            let err = ViewerError::NoData(self.user_id.clone());
            self.fail(LOAD_FAILED_MESSAGE, &err);
            return self.status;
        };

        if let Err(err) = self.setup(descriptor).await {
            self.fail(INIT_FAILED_MESSAGE, &err);
        }
        self.status
    }

    /// Fetches this viewer's descriptor; `None` on any failure.
    pub async fn fetch_crystal_data(&self) -> Option<CrystalDescriptor> {
        self.source.fetch_crystal_data(&self.user_id).await
    }

    async fn setup(&mut self, descriptor: CrystalDescriptor) -> Result<(), ViewerError> {
        let (width, height) = self.viewport_size();
        let mut renderer = self
            .host
            .create_renderer(width, height)
            .await
            .context("failed to create renderer")?;
        let scene = CrystalScene::from_descriptor(
            &descriptor,
            &self.options,
            width as f32 / height.max(1) as f32,
        );
        let upload = renderer
            .upload_crystal(&scene.crystal)
            .context("failed to upload crystal mesh");
        self.renderer = Some(renderer);
        upload?;

        let geometry = &scene.crystal.geometry;
        info!(
            "crystal for user {} has {} vertices and {} triangles",
            self.user_id,
            geometry.vertex_count(),
            geometry.triangle_count()
        );
        let stats = CrystalStats::new(&descriptor, geometry);
        self.scene = Some(scene);
        self.descriptor = Some(descriptor);

        self.host
            .attach_pointer_handlers()
            .context("failed to attach pointer handlers")?;
        if self.options.show_stats {
            self.host.show_stats(&stats);
        }
        self.start_animation()?;
        self.host
            .attach_resize_handler()
            .context("failed to attach resize handler")?;
        self.host.clear_overlay();
        self.status = ViewerStatus::Ready;
        Ok(())
    }

    fn viewport_size(&self) -> (u32, u32) {
        match self.host.container_size() {
            (0, _) | (_, 0) => self.options.size.dimensions(),
            size => size,
        }
    }

    fn start_animation(&mut self) -> Result<(), ViewerError> {
        self.animation.start();
        let handle = self
            .host
            .schedule_frame()
            .context("failed to schedule first frame")?;
        self.animation.set_pending(handle);
        Ok(())
    }

    /// Runs one frame: auto-rotates, renders and re-arms the next frame.
    /// Does nothing once the loop is stopped.
    pub fn animate(&mut self) {
        if !self.animation.begin_frame() {
            return;
        }
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            self.animation.stop();
            return;
        };
        if self.options.auto_rotate {
            let speed = self.options.rotation_speed;
            scene.crystal.rotation.y += speed;
            scene.crystal.rotation.x += speed * AUTO_ROTATE_PITCH_RATIO;
        }
        if let Err(err) = renderer.render(scene) {
            let err = ViewerError::Setup(err);
            self.fail(RENDER_FAILED_MESSAGE, &err);
            return;
        }
        match self.host.schedule_frame() {
            Ok(handle) => self.animation.set_pending(handle),
            Err(err) => {
                error!("failed to schedule next frame: {err:#}");
                self.animation.stop();
            }
        }
    }

    /// Matches camera aspect and renderer size to the container. No-op until
    /// the viewer is ready.
    pub fn on_resize(&mut self) {
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            return;
        };
        let (width, height) = self.host.container_size();
        if width == 0 || height == 0 {
            return;
        }
        scene.camera.set_viewport(width, height);
        renderer.resize(width, height);
    }

    pub fn pointer_down(&mut self, position: Vec2) {
        self.drag.press(position);
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        if let Some(delta) = self.drag.drag_to(position) {
            self.rotate_by(delta);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag.release();
    }

    pub fn pointer_leave(&mut self) {
        self.drag.release();
    }

    pub fn touch_start(&mut self, touches: &[Vec2]) {
        self.drag.touch_start(touches);
    }

    pub fn touch_move(&mut self, touches: &[Vec2]) {
        if let Some(delta) = self.drag.touch_move(touches) {
            self.rotate_by(delta);
        }
    }

    pub fn touch_end(&mut self) {
        self.drag.release();
    }

    fn rotate_by(&mut self, delta: Vec3) {
        if let Some(scene) = self.scene.as_mut() {
            scene.crystal.rotation += delta;
        }
    }

    /// Stops the loop, releases GPU resources and detaches every handler.
    /// Safe to call at any point and more than once.
    pub fn destroy(&mut self) {
        if self.status == ViewerStatus::Destroyed {
            return;
        }
        self.release_resources();
        self.status = ViewerStatus::Destroyed;
        info!("crystal viewer for user {} destroyed", self.user_id);
    }

    fn release_resources(&mut self) {
        if let Some(handle) = self.animation.stop() {
            self.host.cancel_frame(handle);
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
        self.scene = None;
        self.drag.release();
        self.host.detach_handlers();
    }

    fn fail(&mut self, message: &str, err: &ViewerError) {
        error!("crystal viewer for user {}: {err:#}", self.user_id);
        self.release_resources();
        self.host.show_overlay(&Overlay::Error(message.to_string()));
        self.last_error = Some(message.to_string());
        self.status = ViewerStatus::Error;
    }

    pub fn status(&self) -> ViewerStatus {
        self.status
    }

    /// Message currently shown in the container after a failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn descriptor(&self) -> Option<&CrystalDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn scene(&self) -> Option<&CrystalScene> {
        self.scene.as_ref()
    }

    pub fn crystal(&self) -> Option<&CrystalMesh> {
        self.scene.as_ref().map(|scene| &scene.crystal)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.animation.frames()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H, S> Drop for CrystalViewer<H, S>
where
    H: ViewerHost,
    S: CrystalSource,
{
    fn drop(&mut self) {
        self.destroy();
    }
}
