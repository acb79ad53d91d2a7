// Capture pipeline: session wiring, frame delivery, and preview.

pub mod frame;
pub mod output;
pub mod preview;
pub mod session;
