use async_trait::async_trait;
use carsight_classifiers::{ClassificationRequest, Classifier};
use carsight_core::{Error, Observation, Result};
use parking_lot::Mutex;
use rand::prelude::*;
use std::time::Duration;

const CAR_MODELS: &[&str] = &[
    "audi a4",
    "bmw 3 series",
    "fiat 500",
    "ford focus",
    "honda civic",
    "kia ceed",
    "mercedes c-class",
    "skoda octavia",
    "toyota corolla",
    "volkswagen golf",
    "volvo v60",
];

/// Stand-in for a real car-recognition model.
///
/// Preprocesses the frame like a real backend would, waits a configurable
/// time, then returns randomly ranked car models. Brighter frames bias the
/// ranking so consecutive results for a moving scene vary.
pub struct SimulatedClassifier {
    rng: Mutex<StdRng>,
    latency: Duration,
    jitter: Duration,
    failure_rate: f64,
    top_k: usize,
}

impl SimulatedClassifier {
    pub fn new(latency: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            latency,
            jitter: Duration::ZERO,
            failure_rate: 0.0,
            top_k: 5,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.clamp(1, CAR_MODELS.len());
        self
    }

    /// Decide latency, failure and scores up front; the rng must not be
    /// held across an await
    fn plan(&self, brightness: f32) -> (Duration, Option<Vec<Observation>>) {
        let mut rng = self.rng.lock();

        let jitter_us = self.jitter.as_micros() as u64;
        let delay = self.latency
            + Duration::from_micros(if jitter_us == 0 {
                0
            } else {
                rng.gen_range(0..=jitter_us)
            });

        if rng.gen::<f64>() < self.failure_rate {
            return (delay, None);
        }

        let mut scored: Vec<(f32, &str)> = CAR_MODELS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let bias = 1.0 - ((i as f32 / CAR_MODELS.len() as f32) - brightness).abs();
                (rng.gen::<f32>() * bias, *name)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.top_k);

        let total: f32 = scored.iter().map(|(s, _)| s).sum::<f32>().max(f32::EPSILON);
        let observations = scored
            .into_iter()
            .map(|(score, name)| Observation::new(name, score / total))
            .collect();

        (delay, Some(observations))
    }
}

fn mean_brightness(image: &image::RgbImage) -> f32 {
    let pixels = (image.width() * image.height()).max(1) as f32;
    let sum: u64 = image
        .pixels()
        .map(|p| (p[0] as u64 + p[1] as u64 + p[2] as u64) / 3)
        .sum();
    sum as f32 / pixels / 255.0
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    async fn classify(&self, request: ClassificationRequest) -> Result<Vec<Observation>> {
        let input = tokio::task::spawn_blocking(move || request.prepared_image())
            .await
            .map_err(|e| Error::internal(format!("preprocessing task failed: {}", e)))?;

        let (delay, observations) = self.plan(mean_brightness(&input));
        tokio::time::sleep(delay).await;

        observations.ok_or_else(|| Error::classification_failed("simulated inference failure"))
    }

    fn name(&self) -> &str {
        "simulated-car-classifier"
    }
}
