//! Rate-controlled dispatch of page measurements.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::Url;
use tokio::sync::Semaphore;

use crate::client::ClientPool;
use crate::error::{Error, Result};
use crate::measure::{self, MeasurementRecord, Outcome};
use crate::zipf::RankWeightModel;

/// Default cap on simultaneously executing measurements.
const DEFAULT_MAX_IN_FLIGHT: usize = 100;
/// Default cap on concurrent sub-resource fetches within one measurement.
const DEFAULT_SUBFETCH_CONCURRENCY: usize = 10;
/// Default per-call network timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A builder for a [`Scheduler`].
#[derive(Debug)]
pub struct SchedulerBuilder {
    targets: Vec<Url>,
    model: RankWeightModel,
    pool: ClientPool,
    rate: f64,
    num_requests: u64,
    max_in_flight: usize,
    subfetch_concurrency: usize,
    timeout: Duration,
    seed: u64,
}

impl SchedulerBuilder {
    /// Target submission rate in requests per second. Must be positive.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Total number of requests to submit over the run.
    pub fn num_requests(mut self, num_requests: u64) -> Self {
        self.num_requests = num_requests;
        self
    }

    /// Maximum number of measurements executing at once.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Maximum concurrent sub-resource fetches within one measurement.
    pub fn subfetch_concurrency(mut self, subfetch_concurrency: usize) -> Self {
        self.subfetch_concurrency = subfetch_concurrency;
        self
    }

    /// Per-call network timeout for primary and sub-resource fetches.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Seed for the client-selection RNG, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the parameters and creates the scheduler.
    pub fn build(self) -> Result<Scheduler> {
        if self.targets.is_empty() {
            return Err(Error::InvalidParameter("target list is empty".into()));
        }
        if self.targets.len() != self.model.len() {
            return Err(Error::InvalidParameter(format!(
                "rank model covers {} targets but {} were given",
                self.model.len(),
                self.targets.len()
            )));
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "submission rate must be a positive number of requests/s, got {}",
                self.rate
            )));
        }
        if self.max_in_flight == 0 || self.subfetch_concurrency == 0 {
            return Err(Error::InvalidParameter(
                "concurrency bounds must be at least 1".into(),
            ));
        }

        Ok(Scheduler {
            targets: self.targets,
            model: self.model,
            pool: Arc::new(self.pool),
            rate: self.rate,
            num_requests: self.num_requests,
            max_in_flight: self.max_in_flight,
            subfetch_concurrency: self.subfetch_concurrency,
            timeout: self.timeout,
            rng: SmallRng::seed_from_u64(self.seed),
        })
    }
}

/// The rate-controlled dispatcher.
///
/// Repeatedly draws a target via the rank model, picks a client uniformly at
/// random, and spawns a page measurement, pacing submissions at the target
/// rate while a semaphore bounds how many measurements execute at once.
#[derive(Debug)]
pub struct Scheduler {
    targets: Vec<Url>,
    model: RankWeightModel,
    pool: Arc<ClientPool>,
    rate: f64,
    num_requests: u64,
    max_in_flight: usize,
    subfetch_concurrency: usize,
    timeout: Duration,
    rng: SmallRng,
}

impl Scheduler {
    /// Starts building a scheduler over the given targets, rank model, and
    /// client pool.
    pub fn builder(targets: Vec<Url>, model: RankWeightModel, pool: ClientPool) -> SchedulerBuilder {
        SchedulerBuilder {
            targets,
            model,
            pool,
            rate: 1.0,
            num_requests: 1,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            subfetch_concurrency: DEFAULT_SUBFETCH_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            seed: rand::random(),
        }
    }

    /// Runs the full submission loop and returns every measurement record.
    ///
    /// Pacing governs the submission rate only; completions may lag behind
    /// arbitrarily, with queued work waiting for a worker slot. After the
    /// last submission the call waits for all outstanding measurements.
    /// There is no cancellation path: once started, a run always runs to
    /// completion.
    pub async fn run(mut self) -> Vec<MeasurementRecord> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let records = Arc::new(Mutex::new(Vec::with_capacity(self.num_requests as usize)));
        let pause = Duration::from_secs_f64(1.0 / self.rate);

        let bar = ProgressBar::new(self.num_requests).with_style(
            ProgressStyle::with_template("{wide_bar} {pos}/{len} {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut tasks = Vec::with_capacity(self.num_requests as usize);
        for _ in 0..self.num_requests {
            let target = self.targets[self.model.sample()].clone();
            let client_idx = self.rng.random_range(0..self.pool.len());

            let semaphore = Arc::clone(&semaphore);
            let pool = Arc::clone(&self.pool);
            let records = Arc::clone(&records);
            let bar = bar.clone();
            let timeout = self.timeout;
            let subfetch_concurrency = self.subfetch_concurrency;

            tasks.push(tokio::spawn(async move {
                // The permit is acquired inside the task: pacing below only
                // governs submission, while queued work waits here for one
                // of the `max_in_flight` worker slots.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let record =
                    measure::measure_page(pool.get(client_idx), &target, timeout, subfetch_concurrency)
                        .await;
                match &record.outcome {
                    Outcome::Status(status) => tracing::info!(
                        url = %record.url,
                        status,
                        rtt_ms = record.rtt_ms,
                        "request completed"
                    ),
                    Outcome::Failed(reason) => {
                        tracing::warn!(url = %record.url, %reason, "request failed")
                    }
                }

                records.lock().unwrap().push(record);
                bar.inc(1);
            }));

            tokio::time::sleep(pause).await;
        }

        // Wait for all submitted work before returning.
        futures::future::join_all(tasks).await;
        bar.finish_and_clear();

        Arc::try_unwrap(records)
            .expect("all measurement tasks have completed")
            .into_inner()
            .unwrap()
    }
}
