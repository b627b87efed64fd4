//! Drives the confirmation pulse from a tokio interval

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::viewport::ImageViewport;

/// Roughly one display refresh
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Tick `viewport` until its pending confirmation has been finalized
///
/// Returns immediately when nothing is animating. Dropping the future stops
/// the animation without finalizing; the selection stays pending until the
/// viewport is ticked again or torn down.
pub async fn drive_animation(viewport: &mut ImageViewport, frame_interval: Duration) {
    if !viewport.is_animating() {
        return;
    }
    let mut interval = tokio::time::interval(frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frames = 0u32;
    loop {
        let now = interval.tick().await;
        frames += 1;
        if !viewport.tick(now.into_std()) {
            break;
        }
    }
    log::debug!("Confirmation finished after {} frames", frames);
}
