//! Camera capture controller: asks for camera access, wires the preferred
//! back camera into a capture session, shows a live preview and hands every
//! frame to a callback on a dedicated thread, discarding frames that arrive
//! while the callback is still busy.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rect_capture::camera::dummy::DummyBackend;
//! use rect_capture::capture::preview::Rect;
//! use rect_capture::config::CaptureConfig;
//! use rect_capture::controller::CaptureController;
//!
//! let mut controller =
//!     CaptureController::new(Arc::new(DummyBackend::new()), CaptureConfig::default());
//! controller.view_mut().set_frame(Rect::new(0.0, 0.0, 390.0, 844.0));
//! controller.on_appear();
//! loop {
//!     controller.wait_main_event(Duration::from_millis(16));
//! }
//! ```

pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod dispatch;
pub mod view;
