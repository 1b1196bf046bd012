/// Host-issued identifier of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Start/stop state of a viewer's render loop.
///
/// The loop keeps at most one frame request outstanding; [`stop`](Self::stop)
/// hands it back so the host can cancel it.
#[derive(Debug, Default)]
pub struct AnimationLoop {
    running: bool,
    pending: Option<FrameHandle>,
    frames: u64,
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called when a frame callback fires; the pending request is consumed.
    pub fn begin_frame(&mut self) -> bool {
        self.pending = None;
        if self.running {
            self.frames += 1;
        }
        self.running
    }

    pub fn set_pending(&mut self, handle: FrameHandle) {
        self.pending = Some(handle);
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stops the loop and returns the outstanding request, if any.
    pub fn stop(&mut self) -> Option<FrameHandle> {
        self.running = false;
        self.pending.take()
    }
}
