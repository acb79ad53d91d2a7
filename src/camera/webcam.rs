//! Real webcams through nokhwa.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::camera::backend::{AccessCallback, CameraBackend, DeviceInput};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{
    AuthorizationStatus, CameraDevice, CameraPosition, DeviceId, DeviceType, FormatDescriptor,
    SessionPreset,
};
use crate::capture::frame::FrameSample;
use crate::capture::session::FrameSink;

/// Webcam backend. Devices are reported as `External` with an
/// `Unspecified` position, so discovery must ask for those.
pub struct NokhwaBackend {
    preset: SessionPreset,
}

impl NokhwaBackend {
    pub fn new(preset: SessionPreset) -> Self {
        Self { preset }
    }

    fn requested_format(&self) -> RequestedFormat<'static> {
        let (width, height) = self.preset.target_resolution();
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            nokhwa::utils::Resolution::new(width, height),
        ))
    }
}

/// Index of a device this backend enumerated. Foreign or malformed ids
/// cannot be opened, which is an input failure rather than a missing camera.
fn camera_index(device: &CameraDevice) -> Result<CameraIndex> {
    let not_ours = || CameraError::InputCreation(format!("not a webcam id: {}", device.id));
    let index = device
        .id
        .as_str()
        .strip_prefix("nokhwa:")
        .ok_or_else(not_ours)?
        .parse::<u32>()
        .map_err(|_| not_ours())?;
    Ok(CameraIndex::Index(index))
}

impl CameraBackend for NokhwaBackend {
    fn authorization_status(&self) -> AuthorizationStatus {
        if nokhwa::nokhwa_check() {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::NotDetermined
        }
    }

    fn request_access(&self, on_complete: AccessCallback) {
        let on_complete = Mutex::new(Some(on_complete));
        nokhwa::nokhwa_initialize(move |granted| {
            if let Some(callback) = on_complete.lock().take() {
                callback(granted);
            }
        });
    }

    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CameraError::Enumeration(e.to_string()))?;

        Ok(devices
            .into_iter()
            .filter_map(|info| match info.index() {
                CameraIndex::Index(index) => Some(CameraDevice {
                    id: DeviceId::new(format!("nokhwa:{index}")),
                    name: info.human_name(),
                    device_type: DeviceType::External,
                    position: CameraPosition::Unspecified,
                    is_connected: true,
                }),
                CameraIndex::String(_) => None,
            })
            .collect())
    }

    /// Opens the camera once to validate it and read its format. Streaming
    /// reopens it on the producer thread.
    fn open_input(&self, device: &CameraDevice) -> Result<Box<dyn DeviceInput>> {
        let index = camera_index(device)?;
        let requested = self.requested_format();
        let camera = Camera::new(index.clone(), requested)
            .map_err(|e| CameraError::InputCreation(e.to_string()))?;

        let resolution = camera.resolution();
        let format = FormatDescriptor {
            width: resolution.width(),
            height: resolution.height(),
            fps: camera.frame_rate() as f32,
            pixel_format: "RGB24".to_string(),
        };
        info!(
            "webcam '{}' opened: {}x{} @ {} fps",
            device.name, format.width, format.height, format.fps
        );
        drop(camera);

        Ok(Box::new(WebcamInput {
            device: device.clone(),
            index,
            requested,
            format,
            shutdown: Arc::new(AtomicBool::new(false)),
            producer: None,
        }))
    }
}

struct WebcamInput {
    device: CameraDevice,
    index: CameraIndex,
    requested: RequestedFormat<'static>,
    format: FormatDescriptor,
    shutdown: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl DeviceInput for WebcamInput {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.producer.is_some() {
            return Ok(());
        }
        self.shutdown.store(false, Ordering::Relaxed);

        let shutdown = Arc::clone(&self.shutdown);
        let index = self.index.clone();
        let requested = self.requested;
        let name = self.device.name.clone();

        let handle = std::thread::Builder::new()
            .name(format!("webcam-{}", self.device.id))
            .spawn(move || {
                let mut camera = match Camera::new(index, requested) {
                    Ok(camera) => camera,
                    Err(e) => {
                        warn!("webcam '{name}' could not be reopened: {e}");
                        return;
                    }
                };
                if let Err(e) = camera.open_stream() {
                    warn!("webcam '{name}' failed to stream: {e}");
                    return;
                }

                let started = Instant::now();
                let mut sequence = 0u64;
                while !shutdown.load(Ordering::Relaxed) {
                    let decoded = match camera.frame().and_then(|f| f.decode_image::<RgbFormat>()) {
                        Ok(image) => image,
                        Err(e) => {
                            debug!("webcam '{name}' frame error: {e}");
                            continue;
                        }
                    };
                    sequence += 1;
                    let (width, height) = (decoded.width(), decoded.height());
                    sink.push(FrameSample::new(
                        decoded.into_raw(),
                        width,
                        height,
                        started.elapsed().as_micros() as u64,
                        sequence,
                    ));
                }

                if let Err(e) = camera.stop_stream() {
                    debug!("webcam '{name}' stop error: {e}");
                }
                info!("webcam '{name}' stopped after {sequence} frames");
            })
            .map_err(|e| CameraError::StreamStart(e.to_string()))?;

        self.producer = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WebcamInput {
    fn drop(&mut self) {
        self.stop();
    }
}
