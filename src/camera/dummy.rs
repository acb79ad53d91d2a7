use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::camera::backend::{AccessCallback, CameraBackend, DeviceInput};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{
    AuthorizationStatus, CameraDevice, CameraPosition, DeviceId, DeviceType, FormatDescriptor,
};
use crate::capture::frame::FrameSample;
use crate::capture::session::FrameSink;

const DUMMY_DEVICE_ID: &str = "dummy:back:wide-001";
const DUMMY_DEVICE_NAME: &str = "Dummy Back Camera";
const DUMMY_WIDTH: u32 = 64;
const DUMMY_HEIGHT: u32 = 48;
const DUMMY_FPS: f32 = 30.0;

/// RGB24 test pattern: a diagonal gradient that shifts with `sequence`.
pub fn test_pattern(width: u32, height: u32, sequence: u64) -> Vec<u8> {
    let shift = (sequence % 256) as u32;
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(((x * 255 / width.max(1) + shift) % 256) as u8);
            data.push(((y * 255 / height.max(1) + shift) % 256) as u8);
            data.push(((x + y + shift) % 256) as u8);
        }
    }
    data
}

/// A fake camera backend for running without real hardware.
///
/// Reports one back-facing wide-angle camera by default and produces a
/// small gradient test pattern. Authorization, the user's answer to the
/// access prompt and input failures are all configurable, so the same type
/// serves as the test double.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummyBackend {
    status: Arc<Mutex<AuthorizationStatus>>,
    grant_on_request: bool,
    devices: Vec<CameraDevice>,
    fps: f32,
    fail_input: bool,
    fail_stream_start: bool,
    access_requests: Arc<AtomicUsize>,
    inputs_opened: AtomicUsize,
}

impl DummyBackend {
    /// An authorized backend with one back wide-angle camera at 30 fps.
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(AuthorizationStatus::Authorized)),
            grant_on_request: true,
            devices: vec![Self::default_device()],
            fps: DUMMY_FPS,
            fail_input: false,
            fail_stream_start: false,
            access_requests: Arc::new(AtomicUsize::new(0)),
            inputs_opened: AtomicUsize::new(0),
        }
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// The stable device ID for the default dummy camera.
    pub fn device_id() -> DeviceId {
        DeviceId::new(DUMMY_DEVICE_ID)
    }

    fn default_device() -> CameraDevice {
        CameraDevice {
            id: Self::device_id(),
            name: DUMMY_DEVICE_NAME.to_string(),
            device_type: DeviceType::BuiltInWideAngleCamera,
            position: CameraPosition::Back,
            is_connected: true,
        }
    }

    pub fn with_status(self, status: AuthorizationStatus) -> Self {
        *self.status.lock() = status;
        self
    }

    /// The answer given when access is requested.
    pub fn grant_on_request(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    pub fn with_devices(mut self, devices: Vec<CameraDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps.max(1.0);
        self
    }

    /// Make every `open_input` call fail.
    pub fn failing_input(mut self) -> Self {
        self.fail_input = true;
        self
    }

    /// Make opened inputs fail when started.
    pub fn failing_stream_start(mut self) -> Self {
        self.fail_stream_start = true;
        self
    }

    pub fn access_requests(&self) -> usize {
        self.access_requests.load(Ordering::SeqCst)
    }

    pub fn inputs_opened(&self) -> usize {
        self.inputs_opened.load(Ordering::SeqCst)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for DummyBackend {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    /// Answers from a separate thread, as a system prompt would.
    fn request_access(&self, on_complete: AccessCallback) {
        let status = Arc::clone(&self.status);
        let requests = Arc::clone(&self.access_requests);
        let grant = self.grant_on_request;

        let spawned = std::thread::Builder::new()
            .name("dummy-access-prompt".to_string())
            .spawn(move || {
                requests.fetch_add(1, Ordering::SeqCst);
                let granted = {
                    let mut status = status.lock();
                    match *status {
                        AuthorizationStatus::NotDetermined => {
                            *status = if grant {
                                AuthorizationStatus::Authorized
                            } else {
                                AuthorizationStatus::Denied
                            };
                        }
                        // Once answered the prompt is not shown again.
                        AuthorizationStatus::Authorized
                        | AuthorizationStatus::Denied
                        | AuthorizationStatus::Restricted => {}
                    }
                    status.is_authorized()
                };
                on_complete(granted);
            });

        if let Err(e) = spawned {
            tracing::warn!("dummy access prompt could not be shown: {e}");
        }
    }

    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>> {
        Ok(self.devices.clone())
    }

    fn open_input(&self, device: &CameraDevice) -> Result<Box<dyn DeviceInput>> {
        if self.fail_input {
            return Err(CameraError::InputCreation(format!(
                "{} is in use by another client",
                device.name
            )));
        }
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(CameraError::InputCreation(format!(
                "unknown device {}",
                device.id
            )));
        }

        self.inputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DummyInput {
            device: device.clone(),
            format: FormatDescriptor {
                width: DUMMY_WIDTH,
                height: DUMMY_HEIGHT,
                fps: self.fps,
                pixel_format: "RGB24".to_string(),
            },
            fail_start: self.fail_stream_start,
            shutdown: Arc::new(AtomicBool::new(false)),
            producer: None,
        }))
    }
}

/// Opened dummy camera. Produces frames on its own thread while started.
struct DummyInput {
    device: CameraDevice,
    format: FormatDescriptor,
    fail_start: bool,
    shutdown: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl DeviceInput for DummyInput {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.fail_start {
            return Err(CameraError::StreamStart(format!(
                "{} refused to stream",
                self.device.name
            )));
        }
        if self.producer.is_some() {
            return Ok(());
        }

        self.shutdown.store(false, Ordering::Relaxed);
        let shutdown = Arc::clone(&self.shutdown);
        let (width, height) = (self.format.width, self.format.height);
        let interval = Duration::from_secs_f32(1.0 / self.format.fps);

        let handle = std::thread::Builder::new()
            .name(format!("dummy-producer-{}", self.device.id))
            .spawn(move || {
                let started = Instant::now();
                let mut sequence = 0u64;
                while !shutdown.load(Ordering::Relaxed) {
                    sequence += 1;
                    sink.push(FrameSample::new(
                        test_pattern(width, height, sequence),
                        width,
                        height,
                        started.elapsed().as_micros() as u64,
                        sequence,
                    ));
                    std::thread::sleep(interval);
                }
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

impl Drop for DummyInput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::FrameBuffer;
    use std::sync::mpsc;

    #[test]
    fn dummy_backend_enumerates_one_back_camera() {
        let backend = DummyBackend::new();
        let devices = backend.enumerate_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Dummy Back Camera");
        assert_eq!(devices[0].id, DummyBackend::device_id());
        assert_eq!(devices[0].position, CameraPosition::Back);
        assert_eq!(devices[0].device_type, DeviceType::BuiltInWideAngleCamera);
        assert!(devices[0].is_connected);
    }

    #[test]
    fn dummy_backend_device_id_is_stable() {
        assert_eq!(DummyBackend::device_id(), DummyBackend::device_id());
        assert_eq!(DummyBackend::device_id().as_str(), "dummy:back:wide-001");
    }

    #[test]
    fn default_status_is_authorized() {
        assert_eq!(
            DummyBackend::new().authorization_status(),
            AuthorizationStatus::Authorized
        );
    }

    #[test]
    fn request_access_grants_and_updates_status() {
        let backend = DummyBackend::new().with_status(AuthorizationStatus::NotDetermined);
        let (tx, rx) = mpsc::channel();
        backend.request_access(Box::new(move |granted| {
            tx.send((granted, std::thread::current().id())).unwrap();
        }));

        let (granted, thread) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(granted);
        assert_ne!(thread, std::thread::current().id());
        assert_eq!(backend.authorization_status(), AuthorizationStatus::Authorized);
        assert_eq!(backend.access_requests(), 1);
    }

    #[test]
    fn request_access_can_be_refused() {
        let backend = DummyBackend::new()
            .with_status(AuthorizationStatus::NotDetermined)
            .grant_on_request(false);
        let (tx, rx) = mpsc::channel();
        backend.request_access(Box::new(move |granted| tx.send(granted).unwrap()));

        assert!(!rx.recv_timeout(Duration::from_secs(2)).unwrap());
        assert_eq!(backend.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn denied_status_is_not_re_prompted() {
        let backend = DummyBackend::new().with_status(AuthorizationStatus::Denied);
        let (tx, rx) = mpsc::channel();
        backend.request_access(Box::new(move |granted| tx.send(granted).unwrap()));
        assert!(!rx.recv_timeout(Duration::from_secs(2)).unwrap());
        assert_eq!(backend.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn failing_input_reports_input_creation() {
        let backend = DummyBackend::new().failing_input();
        let device = backend.enumerate_devices().unwrap().remove(0);
        let err = backend.open_input(&device).err().unwrap();
        assert!(matches!(err, CameraError::InputCreation(_)));
        assert_eq!(backend.inputs_opened(), 0);
    }

    #[test]
    fn open_input_rejects_unknown_device() {
        let backend = DummyBackend::new();
        let mut device = backend.enumerate_devices().unwrap().remove(0);
        device.id = DeviceId::new("nonexistent");
        let err = backend.open_input(&device).err().unwrap();
        assert!(matches!(err, CameraError::InputCreation(_)));
        assert_eq!(backend.inputs_opened(), 0);
    }

    #[test]
    fn input_produces_test_pattern_frames() {
        let backend = DummyBackend::new().with_fps(200.0);
        let device = backend.enumerate_devices().unwrap().remove(0);
        let mut input = backend.open_input(&device).unwrap();
        assert_eq!(input.format().pixel_format, "RGB24");

        let preview = Arc::new(FrameBuffer::new(3));
        let sink = FrameSink::previews_only(vec![Arc::clone(&preview)]);
        input.start(sink).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while preview.sequence() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        input.stop();

        let frame = preview.latest().unwrap();
        assert_eq!((frame.width, frame.height), (DUMMY_WIDTH, DUMMY_HEIGHT));
        assert_eq!(frame.byte_len(), (DUMMY_WIDTH * DUMMY_HEIGHT * 3) as usize);
        assert!(preview.sequence() >= 3);
    }

    #[test]
    fn stop_halts_production() {
        let backend = DummyBackend::new().with_fps(200.0);
        let device = backend.enumerate_devices().unwrap().remove(0);
        let mut input = backend.open_input(&device).unwrap();
        let preview = Arc::new(FrameBuffer::new(1));
        input
            .start(FrameSink::previews_only(vec![Arc::clone(&preview)]))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));
        input.stop();
        input.stop();

        let after_stop = preview.sequence();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(preview.sequence(), after_stop);
    }

    #[test]
    fn test_pattern_has_rgb24_length() {
        assert_eq!(test_pattern(4, 3, 0).len(), 36);
        assert_ne!(test_pattern(4, 3, 0), test_pattern(4, 3, 1));
    }

    #[test]
    fn dummy_backend_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DummyBackend>();
    }
}
