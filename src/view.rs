//! Host view the controller draws into.

use std::sync::Arc;

use crate::capture::preview::{Rect, SharedLayer};

/// Orientations a controller supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMask {
    Portrait,
    Landscape,
    All,
}

impl OrientationMask {
    pub fn allows_landscape(self) -> bool {
        matches!(self, Self::Landscape | Self::All)
    }

    pub fn allows_portrait(self) -> bool {
        matches!(self, Self::Portrait | Self::All)
    }
}

/// A rectangular area in the host window plus the layers stacked on it.
///
/// The host owns geometry: it calls [`View::set_frame`] whenever the window
/// is laid out and then notifies the controller.
#[derive(Default)]
pub struct View {
    frame: Rect,
    sublayers: Vec<SharedLayer>,
}

impl View {
    pub fn new(frame: Rect) -> Self {
        Self {
            frame,
            sublayers: Vec::new(),
        }
    }

    /// Position and size in the parent's coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// The view's own coordinate space.
    pub fn bounds(&self) -> Rect {
        self.frame.with_zero_origin()
    }

    pub fn add_sublayer(&mut self, layer: SharedLayer) {
        self.sublayers.push(layer);
    }

    pub fn sublayers(&self) -> &[SharedLayer] {
        &self.sublayers
    }

    /// Whether `layer` is attached to this view.
    pub fn contains_layer(&self, layer: &SharedLayer) -> bool {
        self.sublayers.iter().any(|l| Arc::ptr_eq(l, layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::preview::PreviewLayer;
    use crate::capture::session::CaptureSession;

    #[test]
    fn bounds_drop_origin() {
        let view = View::new(Rect::new(10.0, 20.0, 390.0, 844.0));
        assert_eq!(view.bounds(), Rect::new(0.0, 0.0, 390.0, 844.0));
        assert_eq!(view.frame().origin.x, 10.0);
    }

    #[test]
    fn add_sublayer_attaches_layer() {
        let mut session = CaptureSession::default();
        let layer = PreviewLayer::new(&mut session).into_shared();
        let other = PreviewLayer::new(&mut session).into_shared();

        let mut view = View::default();
        view.add_sublayer(Arc::clone(&layer));
        assert_eq!(view.sublayers().len(), 1);
        assert!(view.contains_layer(&layer));
        assert!(!view.contains_layer(&other));
    }

    #[test]
    fn portrait_mask_excludes_landscape() {
        assert!(OrientationMask::Portrait.allows_portrait());
        assert!(!OrientationMask::Portrait.allows_landscape());
        assert!(OrientationMask::All.allows_landscape());
    }
}
