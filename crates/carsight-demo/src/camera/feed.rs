use crate::camera::SyntheticCamera;
use carsight_classifiers::FrameClassifierAdapter;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capture cadence for a [`CameraFeed`]
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Frames per second
    pub fps: u32,

    /// Stop after this many capture ticks (0 = run until stopped)
    pub frames: u64,

    /// Don't capture at all while the adapter is busy
    pub skip_when_busy: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            frames: 0,
            skip_when_busy: false,
        }
    }
}

/// What the feed did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Capture ticks elapsed
    pub ticks: u64,

    /// Frames handed to the adapter
    pub submitted: u64,

    /// Ticks skipped because the adapter was busy
    pub skipped: u64,
}

/// Real-time producer pushing camera frames into the adapter
pub struct CameraFeed {
    camera: SyntheticCamera,
    adapter: FrameClassifierAdapter,
    config: FeedConfig,
}

impl CameraFeed {
    pub fn new(
        camera: SyntheticCamera,
        adapter: FrameClassifierAdapter,
        config: FeedConfig,
    ) -> Self {
        Self {
            camera,
            adapter,
            config,
        }
    }

    /// Run the capture loop until the frame budget is spent or `stop` fires
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> FeedSummary {
        let period = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = FeedSummary::default();
        info!(fps = self.config.fps, frames = self.config.frames, "Camera feed started");

        loop {
            if self.config.frames > 0 && summary.ticks >= self.config.frames {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut stop => {
                    debug!("Stop signal received");
                    break;
                }
            }
            summary.ticks += 1;

            if self.config.skip_when_busy && !self.adapter.is_ready_for_next_frame() {
                summary.skipped += 1;
                continue;
            }

            self.adapter.submit(self.camera.next_frame());
            summary.submitted += 1;
        }

        info!(
            ticks = summary.ticks,
            submitted = summary.submitted,
            skipped = summary.skipped,
            "Camera feed stopped"
        );
        summary
    }
}

/// Turn a shutdown signal into a stop receiver for [`CameraFeed::run`].
///
/// If the signal cannot be listened for, the receiver never fires and the
/// feed runs until its frame budget is spent.
pub fn stop_on<F>(signal: F) -> oneshot::Receiver<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                info!("Shutdown signal received, stopping camera feed");
                let _ = stop_tx.send(());
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for shutdown signal");
                // Dropping the sender would stop the feed
                std::future::pending::<()>().await;
                drop(stop_tx);
            }
        }
    });
    stop_rx
}
