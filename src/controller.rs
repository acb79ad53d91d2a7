use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::camera::backend::CameraBackend;
use crate::camera::error::{CameraError, Result};
use crate::capture::frame::FrameSample;
use crate::capture::output::{SampleBufferDelegate, VideoDataOutput};
use crate::capture::preview::{Color, PreviewLayer, SharedLayer, VideoGravity};
use crate::capture::session::CaptureSession;
use crate::config::CaptureConfig;
use crate::dispatch::{MainEvent, MainQueue};
use crate::view::{OrientationMask, View};

/// Lifecycle of a [`CaptureController`].
///
/// A failed configuration leaves the controller in `Configuring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    AwaitingPermission,
    Configuring,
    Running,
}

/// Frame callback that only acknowledges each frame in the log.
#[derive(Debug, Default)]
pub struct LoggingSampleDelegate;

impl SampleBufferDelegate for LoggingSampleDelegate {
    fn on_frame(&self, sample: &FrameSample) {
        debug!(
            sequence = sample.sequence,
            width = sample.width,
            height = sample.height,
            "sample buffer received"
        );
    }
}

/// Drives camera permission, session setup and the live preview for one
/// view.
///
/// All methods are meant to be called from the main context: the thread
/// that owns the controller and drains its main queue.
pub struct CaptureController {
    backend: Arc<dyn CameraBackend>,
    config: CaptureConfig,
    session: CaptureSession,
    view: View,
    preview_layer: Option<SharedLayer>,
    delegate: Arc<dyn SampleBufferDelegate>,
    main_queue: MainQueue,
    state: ControllerState,
}

impl CaptureController {
    pub fn new(backend: Arc<dyn CameraBackend>, config: CaptureConfig) -> Self {
        Self::with_delegate(backend, config, Arc::new(LoggingSampleDelegate))
    }

    /// Build a controller whose frames go to `delegate` instead of the log.
    pub fn with_delegate(
        backend: Arc<dyn CameraBackend>,
        config: CaptureConfig,
        delegate: Arc<dyn SampleBufferDelegate>,
    ) -> Self {
        let session = CaptureSession::new(config.preset);
        Self {
            backend,
            config,
            session,
            view: View::default(),
            preview_layer: None,
            delegate,
            main_queue: MainQueue::new(),
            state: ControllerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn preview_layer(&self) -> Option<&SharedLayer> {
        self.preview_layer.as_ref()
    }

    pub fn supported_orientations(&self) -> OrientationMask {
        OrientationMask::Portrait
    }

    /// The view became visible.
    ///
    /// Configures right away when camera access is already authorized.
    /// Otherwise asks for access; the answer comes back through the main
    /// queue and configures only if granted.
    pub fn on_appear(&mut self) {
        if self.backend.authorization_status().is_authorized() {
            self.configure();
            return;
        }

        if self.state == ControllerState::Uninitialized {
            self.state = ControllerState::AwaitingPermission;
        }
        let dispatcher = self.main_queue.dispatcher();
        self.backend.request_access(Box::new(move |granted| {
            dispatcher.dispatch(MainEvent::AccessResolved { granted });
        }));
    }

    /// The view's frame changed: match the preview to it.
    pub fn on_layout_change(&mut self) {
        if let Some(layer) = &self.preview_layer {
            layer.lock().set_bounds(self.view.frame());
        }
    }

    /// Run every event already posted to the main queue. Returns how many
    /// ran.
    pub fn process_main_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.main_queue.try_next() {
            self.handle_main_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for one main-queue event and run it.
    pub fn wait_main_event(&mut self, timeout: Duration) -> bool {
        match self.main_queue.next_timeout(timeout) {
            Some(event) => {
                self.handle_main_event(event);
                true
            }
            None => false,
        }
    }

    fn handle_main_event(&mut self, event: MainEvent) {
        match event {
            MainEvent::AccessResolved { granted: true } => self.configure(),
            MainEvent::AccessResolved { granted: false } => {
                debug!("camera access not granted, capture stays off");
            }
        }
    }

    /// Build and start the capture pipeline.
    ///
    /// Does nothing once the session has an input. Failures are logged and
    /// end this attempt; nothing is retried.
    pub fn configure(&mut self) {
        if !self.session.inputs_is_empty() {
            return;
        }
        self.state = ControllerState::Configuring;

        match self.try_configure() {
            Ok(()) => self.state = ControllerState::Running,
            Err(CameraError::DeviceNotFound(reason)) => {
                warn!("no camera found: {reason}");
            }
            Err(e) => {
                error!("error creating capture session: {e}");
            }
        }
    }

    fn try_configure(&mut self) -> Result<()> {
        let camera = self
            .config
            .discovery()
            .find_camera(self.backend.as_ref())?;
        let input = self.backend.open_input(&camera)?;
        self.session.add_input(input)?;

        let mut preview =
            PreviewLayer::with_capacity(&mut self.session, self.config.preview_frames);
        preview.set_frame(self.view.bounds());
        preview.set_background(Color::BLACK);
        preview.set_video_gravity(VideoGravity::ResizeAspect);
        let preview = preview.into_shared();
        self.view.add_sublayer(Arc::clone(&preview));
        self.preview_layer = Some(preview);

        let mut output = VideoDataOutput::new();
        output.set_always_discards_late_frames(self.config.always_discards_late_frames);
        output.set_queue_depth(self.config.queue_depth);
        output.set_sample_buffer_delegate(
            Arc::clone(&self.delegate),
            self.config.sample_queue_label.clone(),
        );
        self.session.add_output(output)?;

        self.session.start_running()?;
        info!("capturing from '{}'", camera.name);
        Ok(())
    }
}
