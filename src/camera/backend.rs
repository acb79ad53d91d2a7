use crate::camera::error::Result;
use crate::camera::types::{AuthorizationStatus, CameraDevice, FormatDescriptor};
use crate::capture::session::FrameSink;

/// Completion for [`CameraBackend::request_access`]. Receives `true` when
/// access was granted.
pub type AccessCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Platform-agnostic camera backend trait.
///
/// Implemented per platform. Provides camera authorization, device
/// enumeration and input creation.
pub trait CameraBackend: Send + Sync {
    /// Current camera authorization for this process.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for camera access.
    ///
    /// Returns immediately. The callback fires exactly once, on a thread of
    /// the backend's choosing, possibly before this method returns.
    fn request_access(&self, on_complete: AccessCallback);

    /// Enumerate all currently known camera devices.
    fn enumerate_devices(&self) -> Result<Vec<CameraDevice>>;

    /// Open a device for capture. Fails with
    /// [`CameraError::InputCreation`](crate::camera::error::CameraError::InputCreation)
    /// when the device cannot be claimed.
    fn open_input(&self, device: &CameraDevice) -> Result<Box<dyn DeviceInput>>;
}

/// An opened camera that produces frames once started.
pub trait DeviceInput: Send {
    fn device(&self) -> &CameraDevice;

    fn format(&self) -> &FormatDescriptor;

    /// Begin producing frames into `sink` on the input's own thread.
    fn start(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop producing frames and release the sink. Idempotent.
    fn stop(&mut self);
}
