//! Error taxonomy for the traffic generator.

use std::net::IpAddr;

use thiserror::Error;

/// A `Result` alias using the crate's [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while setting up or running a traffic run.
#[derive(Debug, Error)]
pub enum Error {
    /// A setup parameter is outside its valid domain.
    ///
    /// This is fatal at setup time; a run is never started with invalid
    /// parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A local source address could not be bound.
    ///
    /// Fatal to the construction of that one client, not to the whole run.
    #[error("cannot bind local source address {addr}: {source}")]
    Bind {
        /// The source address that failed to bind.
        addr: IpAddr,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A single HTTP request failed (connect, DNS, TLS, or timeout).
    ///
    /// Never propagated out of a run; converted into a failure-tagged
    /// measurement record instead.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}
