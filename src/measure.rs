//! Single page-load measurement: primary fetch, sub-resource fan-out, and
//! derived timing/throughput figures.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use futures::StreamExt;
use reqwest::Url;

use crate::client::AddressBoundClient;
use crate::discovery;

/// RTTs below this are reported as exactly this value.
///
/// The floor keeps later throughput math away from division by
/// sub-millisecond noise; it applies on the failure path as well.
const MIN_RTT_MS: f64 = 1.0;

/// How a page measurement ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The primary request completed with this HTTP status code.
    Status(u16),
    /// The primary request failed; the string is a human-readable reason.
    Failed(String),
}

impl Outcome {
    /// Whether the primary request failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "{code}"),
            Outcome::Failed(reason) => write!(f, "Failed: {reason}"),
        }
    }
}

/// The immutable result of one page measurement.
///
/// Exactly one record is produced per measurement, whether it succeeded or
/// failed.
#[derive(Debug, Clone)]
pub struct MeasurementRecord {
    /// The primary URL that was requested.
    pub url: Url,
    /// Wall-clock time just before the primary request was sent.
    pub start_time: SystemTime,
    /// Wall-clock time just after the primary response (or failure) arrived.
    pub end_time: SystemTime,
    /// Round-trip time of the primary request in milliseconds, floored at
    /// 1 ms.
    pub rtt_ms: f64,
    /// Status code of the primary response, or the failure reason.
    pub outcome: Outcome,
    /// Primary plus successful sub-resource bytes, in KB. Zero on failure.
    pub total_size_kb: f64,
    /// `total_size_kb` divided by the fetch-phase duration, or zero when no
    /// fetch phase ran.
    pub throughput_kbps: f64,
    /// Duration of the sub-resource fetch phase in milliseconds. This is
    /// distinct from `rtt_ms` and must not be conflated with it.
    pub latency_ms: f64,
}

/// Performs one logical page-load measurement against `url`.
///
/// The primary GET uses the given per-call `timeout`. On success the
/// response body is scanned for embedded sub-resources, which are all
/// fetched concurrently with the same client and timeout, at most
/// `subfetch_concurrency` at a time. Sub-fetch failures contribute zero
/// bytes and are absorbed here; only a primary-fetch failure is visible in
/// the record's outcome.
///
/// This function never fails; failures are captured in the returned record.
pub async fn measure_page(
    client: &AddressBoundClient,
    url: &Url,
    timeout: Duration,
    subfetch_concurrency: usize,
) -> MeasurementRecord {
    let start_time = SystemTime::now();
    let started = Instant::now();

    let fetched = match client.get(url, timeout).await {
        Ok(fetched) => fetched,
        Err(err) => {
            let end_time = SystemTime::now();
            let rtt_ms = floor_rtt(started.elapsed());
            tracing::warn!(%url, %err, "primary request failed");
            return MeasurementRecord {
                url: url.clone(),
                start_time,
                end_time,
                rtt_ms,
                outcome: Outcome::Failed(err.to_string()),
                total_size_kb: 0.0,
                throughput_kbps: 0.0,
                latency_ms: 0.0,
            };
        }
    };
    let end_time = SystemTime::now();
    let rtt_ms = floor_rtt(fetched.elapsed);

    let body = String::from_utf8_lossy(&fetched.body);
    let links = discovery::discover(&body, url);

    let mut total_size = fetched.body.len() as u64;
    let fetch_secs = if links.is_empty() {
        // No fetch phase at all: zero duration, and thus zero throughput.
        0.0
    } else {
        let sub_total = Arc::new(AtomicU64::new(0));
        let fetch_started = Instant::now();

        futures::stream::iter(links)
            .for_each_concurrent(subfetch_concurrency, |link| {
                let sub_total = Arc::clone(&sub_total);
                async move {
                    match client.get(&link, timeout).await {
                        Ok(sub) => {
                            sub_total.fetch_add(sub.body.len() as u64, Ordering::Relaxed);
                        }
                        // Sub-fetch failures count as zero bytes and are not
                        // reported in the record.
                        Err(err) => tracing::debug!(%link, %err, "sub-resource fetch failed"),
                    }
                }
            })
            .await;

        total_size += sub_total.load(Ordering::Relaxed);
        fetch_started.elapsed().as_secs_f64()
    };

    let total_size_kb = total_size as f64 / 1024.0;
    let throughput_kbps = if fetch_secs > 0.0 {
        total_size_kb / fetch_secs
    } else {
        0.0
    };

    MeasurementRecord {
        url: url.clone(),
        start_time,
        end_time,
        rtt_ms,
        outcome: Outcome::Status(fetched.status),
        total_size_kb,
        throughput_kbps,
        latency_ms: fetch_secs * 1000.0,
    }
}

fn floor_rtt(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).max(MIN_RTT_MS)
}
