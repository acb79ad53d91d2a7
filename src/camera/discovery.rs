use crate::camera::backend::CameraBackend;
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraDevice, CameraPosition, DeviceType};

/// Preferred back camera kinds, best first.
pub const DEFAULT_DEVICE_TYPES: [DeviceType; 3] = [
    DeviceType::BuiltInDualCamera,
    DeviceType::BuiltInTelephotoCamera,
    DeviceType::BuiltInWideAngleCamera,
];

/// A query for cameras of the given kinds at a given position.
///
/// Matching devices are returned in the order of `device_types`, so the
/// first device is the preferred one.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySession {
    device_types: Vec<DeviceType>,
    position: CameraPosition,
}

impl DiscoverySession {
    pub fn new(device_types: Vec<DeviceType>, position: CameraPosition) -> Self {
        Self {
            device_types,
            position,
        }
    }

    /// Dual, then telephoto, then wide-angle, facing back.
    pub fn back_camera() -> Self {
        Self::new(DEFAULT_DEVICE_TYPES.to_vec(), CameraPosition::Back)
    }

    pub fn device_types(&self) -> &[DeviceType] {
        &self.device_types
    }

    pub fn position(&self) -> CameraPosition {
        self.position
    }

    fn priority(&self, device: &CameraDevice) -> Option<usize> {
        if !device.is_connected {
            return None;
        }
        if self.position != CameraPosition::Unspecified && device.position != self.position {
            return None;
        }
        self.device_types
            .iter()
            .position(|ty| *ty == device.device_type)
    }

    /// Every matching device, best first. Devices of equal kind keep the
    /// backend's enumeration order.
    pub fn devices(&self, backend: &dyn CameraBackend) -> Result<Vec<CameraDevice>> {
        let mut ranked: Vec<(usize, CameraDevice)> = backend
            .enumerate_devices()?
            .into_iter()
            .filter_map(|device| self.priority(&device).map(|rank| (rank, device)))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        Ok(ranked.into_iter().map(|(_, device)| device).collect())
    }

    /// The preferred matching device.
    pub fn find_camera(&self, backend: &dyn CameraBackend) -> Result<CameraDevice> {
        self.devices(backend)?.into_iter().next().ok_or_else(|| {
            CameraError::DeviceNotFound(format!(
                "no {:?} camera of types [{}]",
                self.position,
                self.device_types
                    .iter()
                    .map(|ty| ty.as_id_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

impl Default for DiscoverySession {
    fn default() -> Self {
        Self::back_camera()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::dummy::DummyBackend;
    use crate::camera::types::DeviceId;

    fn device(id: &str, ty: DeviceType, position: CameraPosition) -> CameraDevice {
        CameraDevice {
            id: DeviceId::new(id),
            name: id.to_string(),
            device_type: ty,
            position,
            is_connected: true,
        }
    }

    #[test]
    fn prefers_dual_over_telephoto_over_wide() {
        let backend = DummyBackend::new().with_devices(vec![
            device("wide", DeviceType::BuiltInWideAngleCamera, CameraPosition::Back),
            device("tele", DeviceType::BuiltInTelephotoCamera, CameraPosition::Back),
            device("dual", DeviceType::BuiltInDualCamera, CameraPosition::Back),
        ]);

        let found = DiscoverySession::back_camera().devices(&backend).unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["dual", "tele", "wide"]);
    }

    #[test]
    fn find_camera_returns_best_match() {
        let backend = DummyBackend::new().with_devices(vec![
            device("wide", DeviceType::BuiltInWideAngleCamera, CameraPosition::Back),
            device("tele", DeviceType::BuiltInTelephotoCamera, CameraPosition::Back),
        ]);
        let camera = DiscoverySession::back_camera().find_camera(&backend).unwrap();
        assert_eq!(camera.id.as_str(), "tele");
    }

    #[test]
    fn front_cameras_are_not_a_fallback() {
        let backend = DummyBackend::new().with_devices(vec![device(
            "front",
            DeviceType::BuiltInWideAngleCamera,
            CameraPosition::Front,
        )]);
        let err = DiscoverySession::back_camera()
            .find_camera(&backend)
            .unwrap_err();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }

    #[test]
    fn unlisted_types_and_disconnected_devices_are_skipped() {
        let mut unplugged = device("dual", DeviceType::BuiltInDualCamera, CameraPosition::Back);
        unplugged.is_connected = false;
        let backend = DummyBackend::new().with_devices(vec![
            unplugged,
            device("usb", DeviceType::External, CameraPosition::Back),
        ]);
        assert!(DiscoverySession::back_camera()
            .devices(&backend)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unspecified_position_matches_any() {
        let backend = DummyBackend::new().with_devices(vec![device(
            "usb",
            DeviceType::External,
            CameraPosition::Unspecified,
        )]);
        let query = DiscoverySession::new(vec![DeviceType::External], CameraPosition::Unspecified);
        assert_eq!(query.find_camera(&backend).unwrap().id.as_str(), "usb");
    }

    #[test]
    fn equal_kinds_keep_enumeration_order() {
        let backend = DummyBackend::new().with_devices(vec![
            device("wide-a", DeviceType::BuiltInWideAngleCamera, CameraPosition::Back),
            device("wide-b", DeviceType::BuiltInWideAngleCamera, CameraPosition::Back),
        ]);
        let camera = DiscoverySession::back_camera().find_camera(&backend).unwrap();
        assert_eq!(camera.id.as_str(), "wide-a");
    }

    #[test]
    fn error_message_names_the_query() {
        let backend = DummyBackend::new().with_devices(vec![]);
        let err = DiscoverySession::back_camera()
            .find_camera(&backend)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "device not found: no Back camera of types \
             [builtInDualCamera, builtInTelephotoCamera, builtInWideAngleCamera]"
        );
    }
}
