use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::info;

use rect_capture::camera::backend::CameraBackend;
use rect_capture::camera::dummy::DummyBackend;
use rect_capture::capture::preview::Rect;
use rect_capture::config::CaptureConfig;
use rect_capture::controller::CaptureController;

/// Portrait window the demo host pretends to lay out.
const HOST_FRAME: Rect = Rect {
    origin: rect_capture::capture::preview::Point { x: 0.0, y: 0.0 },
    size: rect_capture::capture::preview::Size {
        width: 390.0,
        height: 844.0,
    },
};

/// Create the camera backend for this build.
///
/// When `DUMMY_CAMERA=1` is set, or no native backend is compiled in, a
/// simulated camera is used.
fn create_backend(config: &mut CaptureConfig) -> Arc<dyn CameraBackend> {
    if DummyBackend::is_enabled() {
        return Arc::new(DummyBackend::new());
    }

    #[cfg(feature = "webcam")]
    {
        use rect_capture::camera::types::{CameraPosition, DeviceType};
        config.position = CameraPosition::Unspecified;
        config.device_types = vec![DeviceType::External];
        Arc::new(rect_capture::camera::webcam::NokhwaBackend::new(
            config.preset,
        ))
    }

    #[cfg(not(feature = "webcam"))]
    {
        let _ = config;
        tracing::warn!("built without the `webcam` feature, using the dummy camera");
        Arc::new(DummyBackend::new())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rect_capture=info".parse()?),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut config = CaptureConfig::load_or_default(config_path.as_deref())?;
    let backend = create_backend(&mut config);

    info!("rect-capture starting");
    info!("  Preset: {:?}", config.preset);
    info!(
        "  Discard late frames: {} (queue depth {})",
        config.always_discards_late_frames, config.queue_depth
    );

    let mut controller = CaptureController::new(backend, config);
    controller.view_mut().set_frame(HOST_FRAME);
    controller.on_layout_change();
    controller.on_appear();

    let mut main_tick = interval(Duration::from_millis(16));
    let mut stats_tick = interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = main_tick.tick() => {
                controller.process_main_events();
            }
            _ = stats_tick.tick() => {
                if let Some(stats) = controller.session().diagnostics() {
                    info!(
                        "{:?}: {:.1} fps delivered, {} dropped ({:.1}%), queue wait {:.1} ms",
                        controller.state(),
                        stats.fps,
                        stats.drop_count,
                        stats.drop_rate,
                        stats.queue_wait_ms
                    );
                }
            }
        }
    }

    drop(controller);
    info!("rect-capture stopped");
    Ok(())
}
