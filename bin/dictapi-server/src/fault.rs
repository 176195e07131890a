//! Reporting of unclassified failures after the client has been answered.
//!
//! A 500 response never carries internal detail. The original failure is
//! wrapped in a [`Fault`] and logged at `error` level once the response
//! document has been handed to the connection, so process-level monitoring
//! still sees it.

use std::convert::Infallible;
use std::fmt::Display;

use axum::body::Body;
use bytes::Bytes;
use futures::{StreamExt, future, stream};
use tracing::error;

/// An internal failure to surface to the hosting process.
#[derive(Debug)]
pub struct Fault {
    origin: &'static str,
    message: String,
}

impl Fault {
    pub fn new(origin: &'static str, cause: impl Display) -> Self {
        Self {
            origin,
            message: cause.to_string(),
        }
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn report(&self) {
        error!(
            origin = self.origin(),
            fault = %self.message(),
            "unhandled failure; client was answered with 500"
        );
    }
}

/// Reports its fault exactly once: when asked to, or else when dropped.
struct PendingReport(Option<Fault>);

impl PendingReport {
    fn report(&mut self) {
        if let Some(fault) = self.0.take() {
            fault.report();
        }
    }
}

impl Drop for PendingReport {
    fn drop(&mut self) {
        self.report();
    }
}

/// A body that yields `document` and then reports `fault` before ending.
///
/// A body dropped before it is fully read still reports on drop.
pub fn body_then_report(document: Vec<u8>, fault: Fault) -> Body {
    let mut pending = PendingReport(Some(fault));
    let document = stream::once(future::ready(Ok::<_, Infallible>(Bytes::from(document))));
    let report = stream::once(async move {
        pending.report();
        None::<Result<Bytes, Infallible>>
    })
    .filter_map(future::ready);
    Body::from_stream(document.chain(report))
}
