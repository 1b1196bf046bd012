#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::any::Any;
    use std::env;
    use std::fmt;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{anyhow, Context, Result};
    use glam::Vec2;
    use log::info;
    use tokio::runtime::Runtime;
    use winit::dpi::PhysicalSize;
    use winit::event::{ElementState, Event, MouseButton, Touch, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::window::Window;

    use crystal_viewer::app::{
        crystal_summary, ActiveTouches, TouchGesture, WindowHost, WindowViewport, DEFAULT_API_BASE,
    };
    use crystal_viewer::overlay::LOAD_FAILED_MESSAGE;
    use crystal_viewer::{CrystalClient, CrystalSize, CrystalViewer, ViewerOptions, ViewerStatus};

    type NativeViewer = CrystalViewer<WindowHost, CrystalClient>;

    pub fn main() {
        env_logger::init();
        if let Err(err) = run() {
            eprintln!("Error: {err:?}");
            std::process::exit(1);
        }
    }

    fn run() -> Result<()> {
        let options = CliOptions::parse(env::args().skip(1))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        if options.summary_only {
            return run_summary(&options, &runtime);
        }
        match run_interactive(&options, &runtime) {
            Ok(()) => Ok(()),
            Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
                eprintln!("{err}. Falling back to --summary-only mode.");
                run_summary(&options, &runtime)
            }
            Err(err) => Err(err),
        }
    }

    fn run_summary(options: &CliOptions, runtime: &Runtime) -> Result<()> {
        let client = CrystalClient::new(options.api_base.clone());
        let descriptor = runtime
            .block_on(client.try_fetch(&options.user_id))
            .with_context(|| format!("unable to load crystal data for user {}", options.user_id))?;
        print!("{}", crystal_summary(&options.user_id, &descriptor));
        Ok(())
    }

    fn run_interactive(options: &CliOptions, runtime: &Runtime) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;

        let title = format!("Crystal viewer: user {}", options.user_id);
        let (width, height) = options.viewer.size.dimensions();
        #[allow(deprecated)]
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(title.clone())
                        .with_inner_size(PhysicalSize::new(width, height)),
                )
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let size = window.inner_size();
        let viewport = Arc::new(WindowViewport::new(size.width, size.height));
        let host = WindowHost::new(Arc::clone(&window), Arc::clone(&viewport), title);
        let client = CrystalClient::new(options.api_base.clone());
        let mut viewer = CrystalViewer::new(host, options.user_id.clone(), options.viewer, client);

        match runtime.block_on(viewer.init()) {
            ViewerStatus::Ready => {}
            _ if viewer.last_error() == Some(LOAD_FAILED_MESSAGE) => {
                return Err(anyhow!(
                    "unable to load crystal data for user {}",
                    options.user_id
                ));
            }
            _ => {
                return Err(WindowInitError::from_error(
                    "renderer",
                    viewer.last_error().unwrap_or("unknown error"),
                )
                .into());
            }
        }

        let mut app = AppState {
            viewer,
            viewport,
            cursor: Vec2::ZERO,
            touches: ActiveTouches::new(),
        };
        #[allow(deprecated)]
        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);
                app.process_event(event, elwt);
            })
            .context("event loop failed")?;
        info!("viewer window closed");
        Ok(())
    }

    struct AppState {
        viewer: NativeViewer,
        viewport: Arc<WindowViewport>,
        cursor: Vec2,
        touches: ActiveTouches,
    }

    impl AppState {
        fn process_event(&mut self, event: Event<()>, elwt: &ActiveEventLoop) {
            match event {
                Event::WindowEvent { event, window_id }
                    if window_id == self.viewer.host().window().id() =>
                {
                    self.handle_window_event(event, elwt);
                }
                Event::LoopExiting => self.viewer.destroy(),
                _ => {}
            }
        }

        fn handle_window_event(&mut self, event: WindowEvent, elwt: &ActiveEventLoop) {
            let pointer = self.viewer.host().accepts_pointer();
            match event {
                WindowEvent::CloseRequested => {
                    self.viewer.destroy();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    self.viewport.update(size.width, size.height);
                    if self.viewer.host().accepts_resize() {
                        self.viewer.on_resize();
                    }
                }
                WindowEvent::RedrawRequested => self.viewer.animate(),
                WindowEvent::CursorMoved { position, .. } => {
                    self.cursor = Vec2::new(position.x as f32, position.y as f32);
                    if pointer {
                        self.viewer.pointer_move(self.cursor);
                    }
                }
                WindowEvent::CursorLeft { .. } if pointer => self.viewer.pointer_leave(),
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } if pointer => match state {
                    ElementState::Pressed => self.viewer.pointer_down(self.cursor),
                    ElementState::Released => self.viewer.pointer_up(),
                },
                WindowEvent::Touch(Touch {
                    id,
                    phase,
                    location,
                    ..
                }) => {
                    let location = Vec2::new(location.x as f32, location.y as f32);
                    let gesture = self.touches.apply(id, phase, location);
                    if !pointer {
                        return;
                    }
                    match gesture {
                        TouchGesture::Start(points) => self.viewer.touch_start(&points),
                        TouchGesture::Move(points) => self.viewer.touch_move(&points),
                        TouchGesture::End => self.viewer.touch_end(),
                    }
                }
                _ => {}
            }
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }

    const USAGE: &str = "Usage: crystal-viewer <user-id> [--api-base URL] [--options FILE.json] \
        [--no-auto-rotate] [--rotation-speed N] [--camera-distance N] [--show-stats] \
        [--size small|medium|large] [--summary-only]";

    #[derive(Debug)]
    pub(super) struct CliOptions {
        pub user_id: String,
        pub api_base: String,
        pub viewer: ViewerOptions,
        pub summary_only: bool,
    }

    impl CliOptions {
        pub(super) fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
            let mut args = args.into_iter();
            let mut user_id = None;
            let mut api_base = DEFAULT_API_BASE.to_string();
            let mut options_file: Option<PathBuf> = None;
            let mut auto_rotate = None;
            let mut rotation_speed = None;
            let mut camera_distance = None;
            let mut show_stats = None;
            let mut size: Option<CrystalSize> = None;
            let mut summary_only = false;

            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api-base" => api_base = value_of(&mut args, &arg)?,
                    "--options" => options_file = Some(value_of(&mut args, &arg)?.into()),
                    "--no-auto-rotate" => auto_rotate = Some(false),
                    "--rotation-speed" => rotation_speed = Some(number_of(&mut args, &arg)?),
                    "--camera-distance" => camera_distance = Some(number_of(&mut args, &arg)?),
                    "--show-stats" => show_stats = Some(true),
                    "--size" => size = Some(value_of(&mut args, &arg)?.parse()?),
                    "--summary-only" => summary_only = true,
                    other if other.starts_with("--") => {
                        return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                    }
                    other if user_id.is_none() => user_id = Some(other.to_string()),
                    other => return Err(anyhow!("Unexpected argument: {other}. {USAGE}")),
                }
            }

            let Some(user_id) = user_id else {
                return Err(anyhow!(USAGE));
            };
            let mut viewer = match options_file {
                Some(path) => ViewerOptions::from_json_file(&path)
                    .with_context(|| format!("failed to read options from {}", path.display()))?,
                None => ViewerOptions::default(),
            };
            if let Some(value) = auto_rotate {
                viewer.auto_rotate = value;
            }
            if let Some(value) = rotation_speed {
                viewer.rotation_speed = value;
            }
            if let Some(value) = camera_distance {
                viewer.camera_distance = value;
            }
            if let Some(value) = show_stats {
                viewer.show_stats = value;
            }
            if let Some(value) = size {
                viewer.size = value;
            }

            Ok(Self {
                user_id,
                api_base,
                viewer,
                summary_only,
            })
        }
    }

    fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
        args.next()
            .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
    }

    fn number_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<f32> {
        let value = value_of(args, flag)?;
        value
            .parse::<f32>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| anyhow!("{flag} expects a number, got '{value}'"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    native::main();
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::native::CliOptions;
    use crystal_viewer::CrystalSize;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_user_and_flags() {
        let options = CliOptions::parse(args(&[
            "42",
            "--api-base",
            "http://example.org",
            "--no-auto-rotate",
            "--rotation-speed",
            "0.02",
            "--size",
            "large",
            "--summary-only",
        ]))
        .expect("valid arguments");
        assert_eq!(options.user_id, "42");
        assert_eq!(options.api_base, "http://example.org");
        assert!(!options.viewer.auto_rotate);
        assert_eq!(options.viewer.rotation_speed, 0.02);
        assert_eq!(options.viewer.size, CrystalSize::Large);
        assert!(options.summary_only);
    }

    #[test]
    fn rejects_missing_user_and_unknown_flags() {
        assert!(CliOptions::parse(args(&[])).is_err());
        assert!(CliOptions::parse(args(&["42", "--spin"])).is_err());
        assert!(CliOptions::parse(args(&["42", "--rotation-speed", "fast"])).is_err());
    }
}
