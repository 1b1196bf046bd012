use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::EventListener;
use log::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent};

use crate::animation::FrameHandle;
use crate::client::CrystalClient;
use crate::host::{ContainerLookup, ViewerHost};
use crate::overlay::{CrystalStats, Overlay};
use crate::render::Renderer;
use crate::viewer::CrystalViewer;

pub(crate) type WebViewer = CrystalViewer<DomHost, CrystalClient>;

/// Holds a viewer once its initialization has finished. DOM callbacks find
/// it empty while `init` is still running and do nothing.
pub(crate) type ViewerSlot = Rc<RefCell<Option<WebViewer>>>;

const OVERLAY_STYLE: &str = "position:absolute;inset:0;display:flex;align-items:center;\
    justify-content:center;font:14px sans-serif;pointer-events:none;";
const STATS_STYLE: &str = "position:absolute;top:8px;left:8px;padding:4px 8px;\
    font:12px monospace;white-space:pre;color:#fff;background:rgba(0,0,0,0.5);\
    pointer-events:none;";

fn document() -> Result<Document> {
    window()
        .and_then(|win| win.document())
        .ok_or_else(|| anyhow!("document not available"))
}

fn js_error(context: &str, err: JsValue) -> anyhow::Error {
    anyhow!("{context}: {err:?}")
}

/// Runs `f` against the viewer in `slot`, if it is mounted and not busy.
fn with_viewer(slot: &Weak<RefCell<Option<WebViewer>>>, f: impl FnOnce(&mut WebViewer)) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let Ok(mut guard) = slot.try_borrow_mut() else {
        return;
    };
    if let Some(viewer) = guard.as_mut() {
        f(viewer);
    }
}

fn touch_points(event: &TouchEvent) -> Vec<Vec2> {
    let touches = event.touches();
    (0..touches.length())
        .filter_map(|index| touches.get(index))
        .map(|touch| Vec2::new(touch.client_x() as f32, touch.client_y() as f32))
        .collect()
}

fn mouse_point(event: &MouseEvent) -> Vec2 {
    Vec2::new(event.client_x() as f32, event.client_y() as f32)
}

/// A DOM element hosting one viewer: a canvas, a status overlay and an
/// optional stats panel.
pub struct DomHost {
    container: HtmlElement,
    slot: Weak<RefCell<Option<WebViewer>>>,
    canvas: Option<HtmlCanvasElement>,
    overlay: Option<HtmlElement>,
    stats: Option<HtmlElement>,
    pointer_listeners: Vec<EventListener>,
    resize_listener: Option<EventListener>,
    frame_callback: Option<Closure<dyn FnMut()>>,
}

impl DomHost {
    fn new(container: HtmlElement, slot: Weak<RefCell<Option<WebViewer>>>) -> Self {
        Self {
            container,
            slot,
            canvas: None,
            overlay: None,
            stats: None,
            pointer_listeners: Vec::new(),
            resize_listener: None,
            frame_callback: None,
        }
    }

    fn append_panel(&self, style: &str) -> Result<HtmlElement> {
        let panel: HtmlElement = document()?
            .create_element("div")
            .map_err(|err| js_error("failed to create element", err))?
            .dyn_into()
            .map_err(|_| anyhow!("created element is not an HtmlElement"))?;
        panel
            .set_attribute("style", style)
            .map_err(|err| js_error("failed to style element", err))?;
        self.container
            .append_child(&panel)
            .map_err(|err| js_error("failed to append element", err))?;
        Ok(panel)
    }

    fn overlay_element(&mut self) -> Result<&HtmlElement> {
        if self.overlay.is_none() {
            if self.container.style().get_property_value("position").ok().as_deref() == Some("") {
                let _ = self.container.style().set_property("position", "relative");
            }
            self.overlay = Some(self.append_panel(OVERLAY_STYLE)?);
        }
        self.overlay
            .as_ref()
            .ok_or_else(|| anyhow!("overlay element missing"))
    }

    fn fit_canvas(&self) {
        let (width, height) = self.container_size();
        if let Some(canvas) = &self.canvas {
            if width > 0 && height > 0 {
                canvas.set_width(width);
                canvas.set_height(height);
            }
        }
    }

    fn frame_callback(&mut self) -> &Closure<dyn FnMut()> {
        let slot = self.slot.clone();
        self.frame_callback.get_or_insert_with(|| {
            Closure::wrap(Box::new(move || {
                with_viewer(&slot, |viewer| viewer.animate());
            }) as Box<dyn FnMut()>)
        })
    }
}

impl Drop for DomHost {
    fn drop(&mut self) {
        self.pointer_listeners.clear();
        self.resize_listener = None;
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
        for panel in [self.overlay.take(), self.stats.take()].into_iter().flatten() {
            panel.remove();
        }
    }
}

impl ViewerHost for DomHost {
    type Renderer = Renderer;

    fn container_size(&self) -> (u32, u32) {
        (
            self.container.client_width().max(0) as u32,
            self.container.client_height().max(0) as u32,
        )
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        let color = if overlay.is_error() { "#ff6b6b" } else { "#ccc" };
        match self.overlay_element() {
            Ok(element) => {
                element.set_text_content(Some(overlay.message()));
                let style = element.style();
                let _ = style.set_property("color", color);
                let _ = style.set_property("display", "flex");
            }
            Err(err) => log::error!("failed to show overlay: {err:#}"),
        }
    }

    fn clear_overlay(&mut self) {
        if let Some(element) = &self.overlay {
            let _ = element.style().set_property("display", "none");
        }
    }

    fn show_stats(&mut self, stats: &CrystalStats) {
        if self.stats.is_none() {
            match self.append_panel(STATS_STYLE) {
                Ok(panel) => self.stats = Some(panel),
                Err(err) => {
                    log::error!("failed to show stats: {err:#}");
                    return;
                }
            }
        }
        if let Some(panel) = &self.stats {
            panel.set_text_content(Some(&stats.to_string()));
        }
    }

    async fn create_renderer(&mut self, width: u32, height: u32) -> Result<Renderer> {
        let canvas: HtmlCanvasElement = document()?
            .create_element("canvas")
            .map_err(|err| js_error("failed to create canvas", err))?
            .dyn_into()
            .map_err(|_| anyhow!("created element is not a canvas"))?;
        canvas.set_width(width);
        canvas.set_height(height);
        let _ = canvas.style().set_property("display", "block");
        self.container
            .append_child(&canvas)
            .map_err(|err| js_error("failed to append canvas", err))?;
        self.canvas = Some(canvas.clone());
        Renderer::new(wgpu::SurfaceTarget::Canvas(canvas), width, height).await
    }

    fn schedule_frame(&mut self) -> Result<FrameHandle> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let callback = self.frame_callback();
        let id = window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|err| js_error("requestAnimationFrame failed", err))?;
        Ok(FrameHandle(id as u64))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(window) = window() {
            if let Err(err) = window.cancel_animation_frame(handle.0 as i32) {
                debug!("cancelAnimationFrame failed: {err:?}");
            }
        }
    }

    fn attach_pointer_handlers(&mut self) -> Result<()> {
        let target = self
            .canvas
            .clone()
            .ok_or_else(|| anyhow!("canvas not created"))?;

        let mut on_mouse = |name: &'static str, action: fn(&mut WebViewer, Vec2)| {
            let slot = self.slot.clone();
            self.pointer_listeners
                .push(EventListener::new(&target, name, move |event| {
                    if let Some(event) = event.dyn_ref::<MouseEvent>() {
                        let point = mouse_point(event);
                        with_viewer(&slot, |viewer| action(viewer, point));
                    }
                }));
        };
        on_mouse("mousedown", |viewer, point| viewer.pointer_down(point));
        on_mouse("mousemove", |viewer, point| viewer.pointer_move(point));
        on_mouse("mouseup", |viewer, _| viewer.pointer_up());
        on_mouse("mouseleave", |viewer, _| viewer.pointer_leave());

        let mut on_touch = |name: &'static str, action: fn(&mut WebViewer, &[Vec2])| {
            let slot = self.slot.clone();
            self.pointer_listeners
                .push(EventListener::new(&target, name, move |event| {
                    if let Some(event) = event.dyn_ref::<TouchEvent>() {
                        let points = touch_points(event);
                        with_viewer(&slot, |viewer| action(viewer, &points));
                    }
                }));
        };
        on_touch("touchstart", |viewer, points| viewer.touch_start(points));
        on_touch("touchmove", |viewer, points| viewer.touch_move(points));
        on_touch("touchend", |viewer, _| viewer.touch_end());
        Ok(())
    }

    fn attach_resize_handler(&mut self) -> Result<()> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let slot = self.slot.clone();
        self.resize_listener = Some(EventListener::new(&window, "resize", move |_| {
            with_viewer(&slot, |viewer| {
                viewer.host().fit_canvas();
                viewer.on_resize();
            });
        }));
        Ok(())
    }

    fn detach_handlers(&mut self) {
        self.pointer_listeners.clear();
        self.resize_listener = None;
    }
}

/// Resolves container ids against the current document.
pub(crate) struct DomLookup {
    slot: Weak<RefCell<Option<WebViewer>>>,
}

impl DomLookup {
    pub(crate) fn new(slot: &ViewerSlot) -> Self {
        Self {
            slot: Rc::downgrade(slot),
        }
    }
}

impl ContainerLookup for DomLookup {
    type Host = DomHost;

    fn find_container(&self, container_id: &str) -> Option<DomHost> {
        let element = document().ok()?.get_element_by_id(container_id)?;
        let container = element.dyn_into::<HtmlElement>().ok()?;
        Some(DomHost::new(container, self.slot.clone()))
    }
}
