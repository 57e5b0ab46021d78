//! Adapter behavior tests
//!
//! Mock classifiers with scripted outcomes and controllable completion drive
//! the adapter through admission, dropping, failure and delivery paths.

use async_trait::async_trait;
use carsight_classifiers::{
    AdapterConfig, ClassificationRequest, Classifier, FrameClassifierAdapter, ModelConfig,
    Submission,
};
use carsight_core::{ClassificationResponse, Error, Frame, Observation, RecognitionItem, Result};
use image::RgbImage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("carsight_classifiers=debug")
        .try_init();
}

fn frame() -> Frame {
    Frame::new(RgbImage::new(64, 48))
}

fn cars() -> Vec<Observation> {
    vec![Observation::new("car", 0.9), Observation::new("truck", 0.1)]
}

/// Tracks how many classify calls overlap
#[derive(Default)]
struct Concurrency {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Concurrency {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// Returns the same observations after an optional delay
struct ScriptedClassifier {
    observations: Vec<Observation>,
    latency: Option<Duration>,
    calls: AtomicU32,
    concurrency: Concurrency,
}

impl ScriptedClassifier {
    fn new(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            latency: None,
            calls: AtomicU32::new(0),
            concurrency: Concurrency::default(),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _request: ClassificationRequest) -> Result<Vec<Observation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.concurrency.enter();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.concurrency.exit();
        Ok(self.observations.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Holds every call until the test releases it, then pops the next outcome
struct GatedClassifier {
    gate: Semaphore,
    outcomes: Mutex<VecDeque<Result<Vec<Observation>>>>,
    concurrency: Concurrency,
}

impl GatedClassifier {
    fn new(outcomes: Vec<Result<Vec<Observation>>>) -> Self {
        Self {
            gate: Semaphore::new(0),
            outcomes: Mutex::new(outcomes.into()),
            concurrency: Concurrency::default(),
        }
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Classifier for GatedClassifier {
    async fn classify(&self, _request: ClassificationRequest) -> Result<Vec<Observation>> {
        self.concurrency.enter();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::internal("gate closed"))?;
        permit.forget();
        self.concurrency.exit();

        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::classification_failed("no scripted outcome")))
    }

    fn name(&self) -> &str {
        "gated"
    }
}

struct PanickingClassifier;

#[async_trait]
impl Classifier for PanickingClassifier {
    async fn classify(&self, _request: ClassificationRequest) -> Result<Vec<Observation>> {
        panic!("model runtime crashed");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

fn adapter_with(classifier: Arc<dyn Classifier>) -> FrameClassifierAdapter {
    init_tracing();
    FrameClassifierAdapter::new(classifier, &AdapterConfig::default()).unwrap()
}

type Seen = Arc<Mutex<Vec<Arc<ClassificationResponse>>>>;

fn collect_callbacks(adapter: &FrameClassifierAdapter) -> Seen {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    adapter.register_result_callback(move |response| sink.lock().push(response));
    seen
}

#[tokio::test(start_paused = true)]
async fn test_busy_window_drops_second_frame() {
    let classifier =
        Arc::new(ScriptedClassifier::new(cars()).with_latency(Duration::from_millis(100)));
    let adapter = adapter_with(classifier.clone());
    let seen = collect_callbacks(&adapter);

    let frame_a = frame();
    let pending = adapter
        .submit(frame_a.clone())
        .into_pending()
        .expect("first frame should be admitted");
    assert_eq!(pending.frame_id(), frame_a.id());
    assert!(!adapter.is_ready_for_next_frame());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(adapter.submit(frame()), Submission::Dropped));
    assert!(!adapter.is_ready_for_next_frame());

    let response = pending.await.unwrap();
    assert_eq!(
        response.items,
        vec![
            RecognitionItem::new("car", 0.9),
            RecognitionItem::new("truck", 0.1)
        ]
    );
    assert!(response.elapsed >= Duration::from_millis(100));
    assert!(response.elapsed < Duration::from_millis(150));
    assert_eq!(response.frame.id(), frame_a.id());

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(classifier.call_count(), 1);
    assert!(adapter.is_ready_for_next_frame());
    assert!(adapter.submit(frame()).is_admitted());

    let snapshot = adapter.metrics_snapshot();
    assert_eq!(snapshot.frames_admitted, 2);
    assert_eq!(snapshot.frames_dropped, 1);
}

#[tokio::test]
async fn test_rapid_submissions_keep_one_in_flight() {
    let classifier = Arc::new(GatedClassifier::new(vec![Ok(cars())]));
    let adapter = adapter_with(classifier.clone());

    let mut admitted = Vec::new();
    for _ in 0..50 {
        if let Submission::Admitted(pending) = adapter.submit(frame()) {
            admitted.push(pending);
        }
    }
    assert_eq!(admitted.len(), 1);
    assert_eq!(adapter.metrics_snapshot().frames_dropped, 49);

    classifier.release();
    let pending = admitted.pop().unwrap();
    assert!(pending.await.is_ok());
    assert_eq!(classifier.concurrency.max(), 1);
    assert!(adapter.is_ready_for_next_frame());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_producer_thread_never_overlaps_classifications() {
    let classifier =
        Arc::new(ScriptedClassifier::new(cars()).with_latency(Duration::from_millis(2)));
    let config = AdapterConfig {
        broadcast_capacity: 1024,
        ..AdapterConfig::default()
    };
    init_tracing();
    let adapter = FrameClassifierAdapter::new(classifier.clone(), &config).unwrap();
    let mut results = adapter.subscribe();

    let producer = {
        let adapter = adapter.clone();
        std::thread::spawn(move || {
            for _ in 0..300 {
                adapter.submit(frame());
                std::thread::sleep(Duration::from_micros(200));
            }
        })
    };
    producer.join().unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while adapter.metrics_snapshot().in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("last classification should finish");

    let snapshot = adapter.metrics_snapshot();
    assert_eq!(snapshot.frames_submitted, 300);
    assert!(snapshot.frames_dropped > 0);
    assert_eq!(snapshot.frames_admitted, snapshot.classifications_completed);
    assert_eq!(classifier.concurrency.max(), 1);

    // Deliveries follow admission order
    let mut last_id = 0;
    let mut delivered = 0;
    while let Ok(response) = results.try_recv() {
        assert!(response.frame.id() > last_id);
        last_id = response.frame.id();
        delivered += 1;
    }
    assert!(delivered > 0);
}

#[tokio::test]
async fn test_failure_resets_without_callback() {
    let classifier = Arc::new(GatedClassifier::new(vec![
        Ok(vec![Observation::new("coupe", 0.8)]),
        Err(Error::classification_failed("request failed")),
    ]));
    let adapter = adapter_with(classifier.clone());
    let seen = collect_callbacks(&adapter);

    let first = adapter.submit(frame()).into_pending().unwrap();
    classifier.release();
    let first = first.await.unwrap();
    assert_eq!(seen.lock().len(), 1);

    let second = adapter.submit(frame()).into_pending().unwrap();
    assert!(!adapter.is_ready_for_next_frame());
    classifier.release();
    let err = second.await.unwrap_err();
    assert!(matches!(err, Error::ClassificationFailed(_)));

    assert!(adapter.is_ready_for_next_frame());
    assert_eq!(seen.lock().len(), 1);
    let last = adapter.last_result().unwrap();
    assert!(Arc::ptr_eq(&last, &first));
    assert_eq!(adapter.metrics_snapshot().classifications_failed, 1);
}

#[tokio::test]
async fn test_other_errors_become_classification_failed() {
    let classifier = Arc::new(GatedClassifier::new(vec![Err(Error::internal(
        "tensor shape mismatch",
    ))]));
    let adapter = adapter_with(classifier.clone());

    let pending = adapter.submit(frame()).into_pending().unwrap();
    classifier.release();

    match pending.await {
        Err(Error::ClassificationFailed(msg)) => assert!(msg.contains("tensor shape mismatch")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_results_count_as_failure() {
    let adapter = adapter_with(Arc::new(ScriptedClassifier::new(Vec::new())));
    let seen = collect_callbacks(&adapter);

    let result = adapter.submit(frame()).into_pending().unwrap().await;
    assert!(matches!(result, Err(Error::ClassificationFailed(_))));
    assert!(seen.lock().is_empty());
    assert!(adapter.last_result().is_none());
    assert!(adapter.is_ready_for_next_frame());
}

#[tokio::test]
async fn test_panicking_classifier_releases_adapter() {
    let adapter = adapter_with(Arc::new(PanickingClassifier));

    let result = adapter.submit(frame()).into_pending().unwrap().await;
    assert!(matches!(result, Err(Error::ClassificationFailed(_))));
    assert!(adapter.is_ready_for_next_frame());
    assert!(adapter.submit(frame()).is_admitted());
}

#[tokio::test]
async fn test_all_results_copied_in_order() {
    let observations = vec![
        Observation::new("audi a4", 0.42),
        Observation::new("bmw 3 series", 0.31),
        Observation::new("volvo v60", 0.2),
        Observation::new("kia ceed", 0.05),
        Observation::new("unknown", 0.0),
    ];
    let adapter = adapter_with(Arc::new(ScriptedClassifier::new(observations.clone())));

    let response = adapter.submit(frame()).into_pending().unwrap().await.unwrap();

    assert_eq!(response.len(), observations.len());
    for (item, observation) in response.items.iter().zip(&observations) {
        assert_eq!(item.label, observation.identifier);
        assert_eq!(item.confidence, observation.confidence);
    }
}

#[tokio::test]
async fn test_last_result_is_replaced_not_merged() {
    let classifier = Arc::new(GatedClassifier::new(vec![
        Ok(cars()),
        Ok(vec![Observation::new("van", 0.7)]),
    ]));
    let adapter = adapter_with(classifier.clone());
    assert!(adapter.last_result().is_none());

    for _ in 0..2 {
        let pending = adapter.submit(frame()).into_pending().unwrap();
        classifier.release();
        pending.await.unwrap();
    }

    let last = adapter.last_result().unwrap();
    assert_eq!(last.items, vec![RecognitionItem::new("van", 0.7)]);
}

#[tokio::test]
async fn test_subscribers_receive_results() {
    let adapter = adapter_with(Arc::new(ScriptedClassifier::new(cars())));
    let mut rx = adapter.subscribe();

    let frame = frame();
    adapter.submit(frame.clone());

    let response = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.frame.id(), frame.id());
    assert_eq!(response.top().unwrap().label, "car");
}

#[tokio::test]
async fn test_dropping_handle_does_not_cancel() {
    let classifier = Arc::new(GatedClassifier::new(vec![Ok(cars())]));
    let adapter = adapter_with(classifier.clone());
    let mut rx = adapter.subscribe();

    drop(adapter.submit(frame()));
    classifier.release();

    let response = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.len(), 2);
}

#[tokio::test]
async fn test_callback_can_submit_next_frame() {
    let adapter = adapter_with(Arc::new(ScriptedClassifier::new(cars())));
    let resubmitted = Arc::new(AtomicBool::new(false));
    let mut rx = adapter.subscribe();

    {
        let handle = adapter.clone();
        let resubmitted = Arc::clone(&resubmitted);
        adapter.register_result_callback(move |_| {
            if !resubmitted.swap(true, Ordering::SeqCst) {
                assert!(handle.submit(frame()).is_admitted());
            }
        });
    }

    adapter.submit(frame());
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }

    assert!(resubmitted.load(Ordering::SeqCst));
    assert_eq!(adapter.metrics_snapshot().classifications_completed, 2);
    adapter.clear_result_callback();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_callback_still_delivers() {
    let adapter = adapter_with(Arc::new(ScriptedClassifier::new(cars())));
    let mut rx = adapter.subscribe();
    adapter.register_result_callback(|_| panic!("consumer bug"));

    let first = frame();
    let pending = adapter.submit(first.clone()).into_pending().unwrap();

    let response = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .expect("result should survive a panicking callback");
    assert_eq!(response.frame.id(), first.id());

    let broadcast = rx.recv().await.unwrap();
    assert_eq!(broadcast.frame.id(), first.id());
    assert_eq!(adapter.last_result().unwrap().frame.id(), first.id());
    assert!(adapter.is_ready_for_next_frame());
    assert!(adapter.submit(frame()).is_admitted());
}

#[tokio::test]
async fn test_load_failure_is_unavailable() {
    let loader = |model: &ModelConfig| -> Result<Arc<dyn Classifier>> {
        Err(Error::config(format!("cannot parse {}", model.name)))
    };

    let result = FrameClassifierAdapter::load(&loader, &AdapterConfig::default()).await;
    match result {
        Err(e @ Error::ClassifierUnavailable(_)) => assert!(e.is_fatal()),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("adapter should not be built"),
    }
}

#[tokio::test]
async fn test_load_missing_artifact() {
    let loader = |model: &ModelConfig| -> Result<Arc<dyn Classifier>> {
        model.artifact_path()?;
        Ok(Arc::new(ScriptedClassifier::new(cars())))
    };
    let mut config = AdapterConfig::default();
    config.model = ModelConfig::named("cars").with_path("/nonexistent/cars.mlmodel");

    let result = FrameClassifierAdapter::load(&loader, &config).await;
    assert!(matches!(result, Err(Error::ClassifierUnavailable(_))));
}

#[tokio::test]
async fn test_load_success() {
    let loader = |_: &ModelConfig| -> Result<Arc<dyn Classifier>> {
        Ok(Arc::new(ScriptedClassifier::new(cars())))
    };

    let adapter = FrameClassifierAdapter::load(&loader, &AdapterConfig::default())
        .await
        .unwrap();
    assert_eq!(adapter.classifier_name(), "scripted");
    assert!(adapter.is_ready_for_next_frame());
}

#[test]
fn test_new_requires_runtime() {
    let result = FrameClassifierAdapter::new(
        Arc::new(ScriptedClassifier::new(cars())),
        &AdapterConfig::default(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_with_runtime_from_plain_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let adapter = runtime
        .block_on(async {
            FrameClassifierAdapter::new(
                Arc::new(ScriptedClassifier::new(cars())),
                &AdapterConfig::default(),
            )
        })
        .unwrap()
        .with_runtime(runtime.handle().clone());

    let pending = adapter.submit(frame()).into_pending().unwrap();
    let response = runtime.block_on(pending).unwrap();
    assert_eq!(response.len(), 2);
}
