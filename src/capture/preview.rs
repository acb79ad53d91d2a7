use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::capture::frame::{FrameBuffer, FrameSample};
use crate::capture::session::CaptureSession;

/// Number of frames a preview keeps when no size is given.
pub const DEFAULT_PREVIEW_FRAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle in view points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    /// Same size, origin at zero.
    pub fn with_zero_origin(&self) -> Self {
        Self {
            origin: Point::default(),
            size: self.size,
        }
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.origin.y + self.size.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
    pub const CLEAR: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };
}

/// How video is fitted into the layer's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoGravity {
    /// Preserve aspect ratio, fit inside bounds (letterbox).
    #[default]
    ResizeAspect,
    /// Preserve aspect ratio, fill bounds (crop).
    ResizeAspectFill,
    /// Stretch to bounds.
    Resize,
}

/// On-screen rendering target showing the session's live frames.
pub struct PreviewLayer {
    frame: Rect,
    background: Color,
    gravity: VideoGravity,
    buffer: Arc<FrameBuffer>,
}

/// A preview layer shared between its owner and the view hierarchy.
pub type SharedLayer = Arc<Mutex<PreviewLayer>>;

impl PreviewLayer {
    /// Create a layer connected to `session`.
    ///
    /// The connection carries frames from the next time the session starts.
    pub fn new(session: &mut CaptureSession) -> Self {
        Self::with_capacity(session, DEFAULT_PREVIEW_FRAMES)
    }

    pub fn with_capacity(session: &mut CaptureSession, frames: usize) -> Self {
        let buffer = Arc::new(FrameBuffer::new(frames));
        session.add_preview_connection(Arc::clone(&buffer));
        Self {
            frame: Rect::default(),
            background: Color::CLEAR,
            gravity: VideoGravity::default(),
            buffer,
        }
    }

    pub fn into_shared(self) -> SharedLayer {
        Arc::new(Mutex::new(self))
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// The layer's own coordinate space: its frame size at origin zero.
    pub fn bounds(&self) -> Rect {
        self.frame.with_zero_origin()
    }

    /// Resize the layer around its centre, as a bounds change does.
    pub fn set_bounds(&mut self, bounds: Rect) {
        let (mid_x, mid_y) = (self.frame.mid_x(), self.frame.mid_y());
        self.frame = Rect::new(
            mid_x - bounds.size.width / 2.0,
            mid_y - bounds.size.height / 2.0,
            bounds.size.width,
            bounds.size.height,
        );
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn video_gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn set_video_gravity(&mut self, gravity: VideoGravity) {
        self.gravity = gravity;
    }

    /// Most recent frame the session delivered to this layer.
    pub fn latest_frame(&self) -> Option<Arc<FrameSample>> {
        self.buffer.latest()
    }

    /// Frames received since the layer was created.
    pub fn frames_received(&self) -> u64 {
        self.buffer.sequence()
    }

    /// Where the video is drawn inside the layer's bounds, given the latest
    /// frame's dimensions. `None` until a frame has arrived.
    pub fn video_rect(&self) -> Option<Rect> {
        let frame = self.buffer.latest()?;
        Some(fit_video(
            self.bounds(),
            Size::new(f64::from(frame.width), f64::from(frame.height)),
            self.gravity,
        ))
    }
}

/// Place a video of `video` size inside `bounds` according to `gravity`.
pub fn fit_video(bounds: Rect, video: Size, gravity: VideoGravity) -> Rect {
    if video.is_empty() || bounds.size.is_empty() {
        return bounds;
    }

    let sx = bounds.size.width / video.width;
    let sy = bounds.size.height / video.height;
    let scale = match gravity {
        VideoGravity::ResizeAspect => sx.min(sy),
        VideoGravity::ResizeAspectFill => sx.max(sy),
        VideoGravity::Resize => return bounds,
    };

    let width = video.width * scale;
    let height = video.height * scale;
    Rect::new(
        bounds.mid_x() - width / 2.0,
        bounds.mid_y() - height / 2.0,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layer_connects_to_session() {
        let mut session = CaptureSession::default();
        let layer = PreviewLayer::new(&mut session);
        assert_eq!(session.preview_connections(), 1);
        assert!(layer.latest_frame().is_none());
        assert!(layer.video_rect().is_none());
        assert_eq!(layer.video_gravity(), VideoGravity::ResizeAspect);
    }

    #[test]
    fn set_bounds_keeps_centre() {
        let mut session = CaptureSession::default();
        let mut layer = PreviewLayer::new(&mut session);
        layer.set_frame(Rect::new(0.0, 0.0, 100.0, 200.0));

        layer.set_bounds(Rect::new(0.0, 0.0, 300.0, 400.0));
        assert_eq!(layer.frame(), Rect::new(-100.0, -100.0, 300.0, 400.0));
        assert_eq!(layer.bounds(), Rect::new(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn aspect_fit_letterboxes_wide_video_in_tall_bounds() {
        let rect = fit_video(
            Rect::new(0.0, 0.0, 390.0, 844.0),
            Size::new(1920.0, 1080.0),
            VideoGravity::ResizeAspect,
        );
        assert!((rect.size.width - 390.0).abs() < 1e-9);
        assert!((rect.size.height - 219.375).abs() < 1e-9);
        assert!((rect.mid_y() - 422.0).abs() < 1e-9);
    }

    #[test]
    fn aspect_fill_covers_bounds() {
        let rect = fit_video(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Size::new(200.0, 100.0),
            VideoGravity::ResizeAspectFill,
        );
        assert_eq!(rect, Rect::new(-50.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn resize_and_empty_inputs_return_bounds() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(
            fit_video(bounds, Size::new(4.0, 3.0), VideoGravity::Resize),
            bounds
        );
        assert_eq!(
            fit_video(bounds, Size::default(), VideoGravity::ResizeAspect),
            bounds
        );
    }

    #[test]
    fn video_rect_uses_latest_frame() {
        let mut session = CaptureSession::default();
        let mut layer = PreviewLayer::new(&mut session);
        layer.set_frame(Rect::new(0.0, 0.0, 64.0, 96.0));
        layer
            .buffer
            .push(FrameSample::new(vec![0; 64 * 48 * 3], 64, 48, 0, 1));

        assert_eq!(layer.frames_received(), 1);
        assert_eq!(layer.video_rect(), Some(Rect::new(0.0, 24.0, 64.0, 48.0)));
    }

    #[test]
    fn color_constants() {
        assert_eq!(Color::BLACK.a, 255);
        assert_eq!(Color::CLEAR.a, 0);
    }
}
