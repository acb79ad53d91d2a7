use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::camera::backend::DeviceInput;
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraDevice, SessionPreset};
use crate::capture::frame::{FrameBuffer, FrameSample};
use crate::capture::output::{OutputPort, VideoDataOutput};
use crate::diagnostics::stats::DeliverySnapshot;

/// Where an input pushes the frames it produces.
///
/// Fans every frame out to the connected preview rings and to the output's
/// delivery queue. Cloning is cheap.
#[derive(Clone)]
pub struct FrameSink {
    previews: Vec<Arc<FrameBuffer>>,
    output: Option<OutputPort>,
}

impl FrameSink {
    fn new(previews: Vec<Arc<FrameBuffer>>, output: Option<OutputPort>) -> Self {
        Self { previews, output }
    }

    /// A sink connected to nothing. Frames pushed into it are dropped.
    pub fn disconnected() -> Self {
        Self::new(Vec::new(), None)
    }

    /// A sink feeding only the given preview rings.
    pub fn previews_only(previews: Vec<Arc<FrameBuffer>>) -> Self {
        Self::new(previews, None)
    }

    pub fn push(&self, sample: FrameSample) {
        for preview in &self.previews {
            preview.push(sample.clone());
        }
        if let Some(output) = &self.output {
            output.offer(sample);
        }
    }
}

/// Capture pipeline: at most one input, at most one output, any number of
/// preview connections.
pub struct CaptureSession {
    preset: SessionPreset,
    input: Option<Box<dyn DeviceInput>>,
    output: Option<VideoDataOutput>,
    previews: Vec<Arc<FrameBuffer>>,
    running: Arc<AtomicBool>,
}

impl CaptureSession {
    pub fn new(preset: SessionPreset) -> Self {
        Self {
            preset,
            input: None,
            output: None,
            previews: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    pub fn inputs_is_empty(&self) -> bool {
        self.input.is_none()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Device behind the attached input, if any.
    pub fn input_device(&self) -> Option<&CameraDevice> {
        self.input.as_ref().map(|input| input.device())
    }

    pub fn output(&self) -> Option<&VideoDataOutput> {
        self.output.as_ref()
    }

    pub fn preview_connections(&self) -> usize {
        self.previews.len()
    }

    /// Attach the session's only input.
    pub fn add_input(&mut self, input: Box<dyn DeviceInput>) -> Result<()> {
        if let Some(existing) = &self.input {
            return Err(CameraError::SessionConfiguration(format!(
                "input already attached: {}",
                existing.device().name
            )));
        }
        self.input = Some(input);
        Ok(())
    }

    /// Attach the session's only output.
    pub fn add_output(&mut self, output: VideoDataOutput) -> Result<()> {
        if self.output.is_some() {
            return Err(CameraError::SessionConfiguration(
                "output already attached".to_string(),
            ));
        }
        self.output = Some(output);
        Ok(())
    }

    /// Register a preview ring. Takes effect on the next start.
    pub(crate) fn add_preview_connection(&mut self, buffer: Arc<FrameBuffer>) {
        self.previews.push(buffer);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start frame flow from the input to previews and output.
    ///
    /// No-op if already running.
    pub fn start_running(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let Some(input) = self.input.as_mut() else {
            return Err(CameraError::SessionConfiguration(
                "cannot start a session without an input".to_string(),
            ));
        };

        let port = match self.output.as_mut() {
            Some(output) => output.activate()?,
            None => None,
        };
        let sink = FrameSink::new(self.previews.clone(), port);

        if let Err(e) = input.start(sink) {
            if let Some(output) = self.output.as_mut() {
                output.deactivate();
            }
            return Err(e);
        }

        self.running.store(true, Ordering::Relaxed);
        info!(
            "capture session running on '{}' ({:?} preset)",
            input.device().name,
            self.preset
        );
        Ok(())
    }

    /// Stop frame flow. Idempotent.
    pub fn stop_running(&mut self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }
        if let Some(input) = self.input.as_mut() {
            input.stop();
        }
        if let Some(output) = self.output.as_mut() {
            output.deactivate();
        }
        info!("capture session stopped");
    }

    /// Delivery stats of the attached output.
    pub fn diagnostics(&self) -> Option<DeliverySnapshot> {
        self.output.as_ref().map(VideoDataOutput::diagnostics)
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(SessionPreset::default())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.is_running() {
            debug!("capture session dropped while running, stopping");
        }
        self.stop_running();
    }
}
