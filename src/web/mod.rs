#![cfg(target_arch = "wasm32")]

//! Browser glue: auto-mounts viewers on `[data-crystal-viewer]` elements and
//! exposes a `CrystalViewer` class to JavaScript.

mod host;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_events::EventListener;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, Element};

use crate::client::CrystalClient;
use crate::options::{ViewerMount, ViewerOptions, VIEWER_ATTRIBUTE};
use crate::viewer::{CrystalViewer, ViewerStatus};

pub use host::DomHost;
use host::{DomLookup, ViewerSlot};

thread_local! {
    static MOUNTED: RefCell<Vec<(String, CrystalViewerHandle)>> = RefCell::new(Vec::new());
}

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());

    let Some(document) = window().and_then(|win| win.document()) else {
        return;
    };
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", |_| {
            mount_all();
        })
        .forget();
    } else {
        mount_all();
    }
}

/// Mounts a viewer on every marked element that does not have one yet.
/// Returns how many viewers were created.
#[wasm_bindgen(js_name = mountAll)]
pub fn mount_all() -> u32 {
    let Some(document) = window().and_then(|win| win.document()) else {
        return 0;
    };
    let Ok(nodes) = document.query_selector_all(&format!("[{VIEWER_ATTRIBUTE}]")) else {
        return 0;
    };

    let mut created = 0;
    for index in 0..nodes.length() {
        let Some(element) = nodes.get(index).and_then(|node| node.dyn_into::<Element>().ok())
        else {
            continue;
        };
        let Some(mount) = ViewerMount::from_attributes(|name: &str| element.get_attribute(name))
        else {
            warn!("skipping crystal viewer element without id or user id");
            continue;
        };
        let known = MOUNTED.with(|mounted| {
            mounted
                .borrow()
                .iter()
                .any(|(id, _)| *id == mount.container_id)
        });
        if known {
            continue;
        }
        let handle = CrystalViewerHandle::mount(&mount.container_id, &mount.user_id, mount.options);
        MOUNTED.with(|mounted| mounted.borrow_mut().push((mount.container_id, handle)));
        created += 1;
    }
    info!("mounted {created} crystal viewer(s)");
    created
}

fn page_client() -> CrystalClient {
    let origin = window()
        .and_then(|win| win.location().origin().ok())
        .unwrap_or_default();
    CrystalClient::new(origin)
}

/// JavaScript handle to one viewer.
#[wasm_bindgen(js_name = CrystalViewer)]
pub struct CrystalViewerHandle {
    slot: ViewerSlot,
    destroyed: Rc<Cell<bool>>,
}

#[wasm_bindgen(js_class = CrystalViewer)]
impl CrystalViewerHandle {
    /// `new CrystalViewer(containerId, userId, optionsJson?)`
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, user_id: &str, options_json: Option<String>) -> Self {
        let options = match options_json.as_deref().map(ViewerOptions::from_json_str) {
            Some(Ok(options)) => options,
            Some(Err(err)) => {
                warn!("ignoring invalid viewer options: {err}");
                ViewerOptions::default()
            }
            None => ViewerOptions::default(),
        };
        Self::mount(container_id, user_id, options)
    }

    fn mount(container_id: &str, user_id: &str, options: ViewerOptions) -> Self {
        let slot: ViewerSlot = Rc::new(RefCell::new(None));
        let destroyed = Rc::new(Cell::new(false));
        let lookup = DomLookup::new(&slot);

        match CrystalViewer::mount(&lookup, container_id, user_id, options, page_client()) {
            Ok(mut viewer) => {
                let pending_slot = Rc::clone(&slot);
                let pending_destroyed = Rc::clone(&destroyed);
                spawn_local(async move {
                    viewer.init().await;
                    if pending_destroyed.get() {
                        viewer.destroy();
                    } else {
                        *pending_slot.borrow_mut() = Some(viewer);
                    }
                });
            }
            Err(_) => destroyed.set(true),
        }
        Self { slot, destroyed }
    }

    /// Stops rendering and releases the viewer. Safe to call repeatedly,
    /// including while the crystal is still loading.
    pub fn destroy(&self) {
        self.destroyed.set(true);
        let viewer = self.slot.borrow_mut().take();
        if let Some(mut viewer) = viewer {
            viewer.destroy();
        }
    }

    /// One of `loading`, `ready`, `error` or `destroyed`.
    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        if self.destroyed.get() {
            return "destroyed".into();
        }
        let status = self
            .slot
            .try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(|viewer| viewer.status()));
        match status {
            None | Some(ViewerStatus::Idle | ViewerStatus::Loading) => "loading",
            Some(ViewerStatus::Ready) => "ready",
            Some(ViewerStatus::Error) => "error",
            Some(ViewerStatus::Destroyed) => "destroyed",
        }
        .into()
    }
}
