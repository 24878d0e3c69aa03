//! Run-level aggregation of measurement records.

use crate::measure::MeasurementRecord;

/// Totals and arithmetic means over a full record collection.
///
/// Recomputed from the complete set rather than incrementally maintained.
/// Failure records contribute their measured RTT and zero size/throughput;
/// they are still counted in `requests` for transparency.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    /// Total number of records, failed requests included.
    pub requests: usize,
    /// Number of records with a failure outcome.
    pub failures: usize,
    /// Sum of all RTTs in milliseconds.
    pub total_rtt_ms: f64,
    /// Mean RTT in milliseconds.
    pub average_rtt_ms: f64,
    /// Sum of all fetched sizes in KB.
    pub total_size_kb: f64,
    /// Mean fetched size in KB.
    pub average_size_kb: f64,
    /// Sum of all per-page throughputs in KB/s.
    pub total_throughput_kbps: f64,
    /// Mean per-page throughput in KB/s.
    pub average_throughput_kbps: f64,
}

impl AggregateRecord {
    /// Aggregates a record collection.
    ///
    /// Returns `None` for an empty collection; callers must treat that as
    /// an explicit "no results" condition instead of reporting zeros.
    pub fn from_records(records: &[MeasurementRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let requests = records.len();
        let failures = records.iter().filter(|r| r.outcome.is_failure()).count();
        let total_rtt_ms: f64 = records.iter().map(|r| r.rtt_ms).sum();
        let total_size_kb: f64 = records.iter().map(|r| r.total_size_kb).sum();
        let total_throughput_kbps: f64 = records.iter().map(|r| r.throughput_kbps).sum();
        let count = requests as f64;

        Some(Self {
            requests,
            failures,
            total_rtt_ms,
            average_rtt_ms: total_rtt_ms / count,
            total_size_kb,
            average_size_kb: total_size_kb / count,
            total_throughput_kbps,
            average_throughput_kbps: total_throughput_kbps / count,
        })
    }
}
