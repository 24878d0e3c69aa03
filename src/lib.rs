//! Synthetic HTTP traffic generation and performance measurement.
//!
//! The library issues a controlled stream of GET requests against a list of
//! target URLs. Targets are drawn from a *Zipf-Mandelbrot* popularity
//! distribution, so low-rank URLs are requested far more often, the way real
//! content popularity behaves. Outgoing connections can be bound to specific
//! local source addresses to simulate distinct clients or subscribers.
//!
//! Each request is a full page-load measurement: the primary fetch is timed
//! for RTT, the response body is scanned for embedded images, scripts, and
//! stylesheets, and every discovered resource is fetched concurrently to
//! derive a total size, a fetch-phase latency, and a throughput figure.
//! Completed measurements are aggregated into run totals and means.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod aggregate;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod measure;
pub mod report;
pub mod scheduler;
pub mod udp;
pub mod zipf;

pub use crate::aggregate::AggregateRecord;
pub use crate::client::{AddressBoundClient, ClientPool};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::measure::{measure_page, MeasurementRecord, Outcome};
pub use crate::scheduler::Scheduler;
pub use crate::zipf::RankWeightModel;
