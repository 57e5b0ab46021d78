//! Frame classifier adapter
//!
//! Feeds a live stream of camera frames into a [`Classifier`] while keeping
//! at most one classification in flight. Frames submitted while the
//! classifier is busy are dropped rather than queued, so results always
//! describe a recent frame.
//!
//! Results are delivered three ways, all in admission order:
//! - the per-frame [`PendingClassification`] returned by [`FrameClassifierAdapter::submit`]
//! - a registered callback
//! - a broadcast channel from [`FrameClassifierAdapter::subscribe`]

use crate::classifier::{ClassificationRequest, Classifier, ClassifierLoader};
use crate::config::AdapterConfig;
use carsight_core::{ClassificationResponse, Error, Frame, RequestOptions, Result};
use carsight_telemetry::{MetricsCollector, MetricsSnapshot};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Callback invoked with every successful classification
pub type ResultCallback = Arc<dyn Fn(Arc<ClassificationResponse>) + Send + Sync>;

/// Admits one frame at a time into a classifier and publishes the results.
///
/// Cloning yields another handle to the same adapter.
#[derive(Clone)]
pub struct FrameClassifierAdapter {
    shared: Arc<Shared>,
    runtime: Handle,
}

struct Shared {
    classifier: Arc<dyn Classifier>,
    options: RequestOptions,

    /// Set while a frame is being classified
    busy: AtomicBool,

    /// Serializes result delivery across consecutive classifications
    delivery: Mutex<()>,

    last_result: RwLock<Option<Arc<ClassificationResponse>>>,
    callback: RwLock<Option<ResultCallback>>,
    results: broadcast::Sender<Arc<ClassificationResponse>>,
    metrics: MetricsCollector,
}

/// Outcome of [`FrameClassifierAdapter::submit`]
#[derive(Debug)]
pub enum Submission {
    /// The frame is being classified
    Admitted(PendingClassification),
    /// A classification was already in flight; the frame was discarded
    Dropped,
}

impl Submission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// The completion handle, if the frame was admitted
    pub fn into_pending(self) -> Option<PendingClassification> {
        match self {
            Self::Admitted(pending) => Some(pending),
            Self::Dropped => None,
        }
    }
}

/// Resolves once the admitted frame's classification finishes.
///
/// Dropping it does not cancel the classification.
#[derive(Debug)]
pub struct PendingClassification {
    frame_id: u64,
    rx: oneshot::Receiver<Result<Arc<ClassificationResponse>>>,
}

impl PendingClassification {
    /// Id of the frame being classified
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
}

impl Future for PendingClassification {
    type Output = Result<Arc<ClassificationResponse>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(Error::internal("classification task ended without a result"))
            })
        })
    }
}

/// Clears the busy flag when dropped, whichever way the classification ends
struct InFlight {
    shared: Arc<Shared>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared.busy.store(false, Ordering::Release);
    }
}

impl FrameClassifierAdapter {
    /// Load the configured classifier and build an adapter around it.
    ///
    /// Any loader failure is reported as [`Error::ClassifierUnavailable`];
    /// there is no fallback classifier.
    pub async fn load<L>(loader: &L, config: &AdapterConfig) -> Result<Self>
    where
        L: ClassifierLoader + ?Sized,
    {
        config.validate()?;

        let classifier = loader.load(&config.model).await.map_err(|e| match e {
            Error::ClassifierUnavailable(_) => e,
            other => Error::classifier_unavailable(format!(
                "failed to load model '{}': {}",
                config.model.name, other
            )),
        })?;

        Self::new(classifier, config)
    }

    /// Build an adapter around an already-loaded classifier.
    ///
    /// Must be called from within a tokio runtime; classifications are
    /// spawned on that runtime. Use [`with_runtime`](Self::with_runtime) to
    /// pick another one.
    pub fn new(classifier: Arc<dyn Classifier>, config: &AdapterConfig) -> Result<Self> {
        config.validate()?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("no tokio runtime available: {}", e)))?;
        let (results, _) = broadcast::channel(config.broadcast_capacity);
        let options = config.request_options();

        info!(
            classifier = classifier.name(),
            model = %config.model.name,
            orientation = %options.orientation,
            crop_and_scale = ?options.crop_and_scale,
            "Frame classifier adapter ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                classifier,
                options,
                busy: AtomicBool::new(false),
                delivery: Mutex::new(()),
                last_result: RwLock::new(None),
                callback: RwLock::new(None),
                results,
                metrics: MetricsCollector::new(),
            }),
            runtime,
        })
    }

    /// Spawn classifications on the given runtime
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = runtime;
        self
    }

    /// Offer a frame for classification.
    ///
    /// Never blocks. If a classification is already running the frame is
    /// dropped and [`Submission::Dropped`] is returned.
    pub fn submit(&self, frame: Frame) -> Submission {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.shared.metrics.record_dropped();
            debug!(frame_id = frame.id(), "Classifier busy, dropping frame");
            return Submission::Dropped;
        }

        let in_flight = InFlight {
            shared: Arc::clone(&self.shared),
        };
        let started = Instant::now();
        let frame_id = frame.id();
        self.shared.metrics.record_admitted();
        debug!(frame_id, "Frame admitted for classification");

        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        self.runtime.spawn(async move {
            let outcome = shared.classify_frame(frame, started, in_flight).await;
            // The caller may have dropped the handle
            let _ = tx.send(outcome);
        });

        Submission::Admitted(PendingClassification { frame_id, rx })
    }

    /// Whether the next submitted frame would be admitted
    pub fn is_ready_for_next_frame(&self) -> bool {
        !self.shared.busy.load(Ordering::Acquire)
    }

    /// Install the result callback, replacing any previous one.
    ///
    /// The callback runs on the runtime's worker thread after the adapter
    /// has become ready again, so it may submit the next frame itself.
    pub fn register_result_callback<F>(&self, callback: F)
    where
        F: Fn(Arc<ClassificationResponse>) + Send + Sync + 'static,
    {
        *self.shared.callback.write() = Some(Arc::new(callback));
    }

    /// Remove the result callback
    pub fn clear_result_callback(&self) {
        *self.shared.callback.write() = None;
    }

    /// Receive every successful classification from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ClassificationResponse>> {
        self.shared.results.subscribe()
    }

    /// Most recent successful classification
    pub fn last_result(&self) -> Option<Arc<ClassificationResponse>> {
        self.shared.last_result.read().clone()
    }

    /// Fixed options sent with every request
    pub fn options(&self) -> &RequestOptions {
        &self.shared.options
    }

    /// Name of the underlying classifier
    pub fn classifier_name(&self) -> &str {
        self.shared.classifier.name()
    }

    /// Handle to this adapter's counters
    pub fn metrics(&self) -> MetricsCollector {
        self.shared.metrics.clone()
    }

    /// Current counter values
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Shared {
    async fn classify_frame(
        &self,
        frame: Frame,
        started: Instant,
        in_flight: InFlight,
    ) -> Result<Arc<ClassificationResponse>> {
        let frame_id = frame.id();
        let request = ClassificationRequest::new(frame.clone(), self.options);
        let outcome = AssertUnwindSafe(self.classifier.classify(request))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();

        let observations = match outcome {
            Ok(Ok(observations)) if !observations.is_empty() => observations,
            Ok(Ok(_)) => {
                drop(in_flight);
                let e = Error::classification_failed("classifier returned no results");
                return Err(self.fail(frame_id, e));
            }
            Ok(Err(e)) => {
                drop(in_flight);
                let e = match e {
                    Error::ClassificationFailed(_) => e,
                    other => Error::classification_failed(other.to_string()),
                };
                return Err(self.fail(frame_id, e));
            }
            Err(_) => {
                drop(in_flight);
                self.metrics.record_failed();
                error!(
                    frame_id,
                    classifier = self.classifier.name(),
                    "Classifier panicked"
                );
                return Err(Error::classification_failed("classifier panicked"));
            }
        };

        let response = Arc::new(ClassificationResponse::from_observations(
            observations,
            elapsed,
            frame,
        ));

        // Become ready before delivering, but keep deliveries in admission order
        let _delivery = self.delivery.lock();
        drop(in_flight);

        self.metrics.record_completed(elapsed);
        *self.last_result.write() = Some(Arc::clone(&response));
        debug!(
            frame_id,
            items = response.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Frame classified"
        );

        // No subscribers is fine
        let _ = self.results.send(Arc::clone(&response));

        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            let delivered = Arc::clone(&response);
            if std::panic::catch_unwind(AssertUnwindSafe(|| callback(delivered))).is_err() {
                error!(frame_id, "Result callback panicked");
            }
        }

        Ok(response)
    }

    fn fail(&self, frame_id: u64, e: Error) -> Error {
        self.metrics.record_failed();
        warn!(
            frame_id,
            classifier = self.classifier.name(),
            error = %e,
            "Unable to classify frame"
        );
        e
    }
}
