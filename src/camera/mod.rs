// Camera domain: authorization, discovery, and device inputs.

pub mod backend;
pub mod discovery;
pub mod dummy;
pub mod error;
pub mod types;
#[cfg(feature = "webcam")]
pub mod webcam;
