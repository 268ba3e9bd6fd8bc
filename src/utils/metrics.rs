//! Codec Metrics
//!
//! Counters for encode and decode activity, owned by a
//! [`crate::core::codec::MessageCodec`] and shared through an `Arc`.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ErrorKind, WireError};

/// Metrics collector for codec operations
#[derive(Debug)]
pub struct Metrics {
    /// Messages successfully written
    pub messages_encoded: AtomicU64,
    /// Bytes produced by successful writes, prefix included
    pub bytes_encoded: AtomicU64,
    /// Messages successfully read
    pub messages_decoded: AtomicU64,
    /// Bytes consumed by successful reads
    pub bytes_decoded: AtomicU64,
    /// Failed writes
    pub encode_failures: AtomicU64,
    /// Failed reads
    pub decode_failures: AtomicU64,
    /// Failures caused by invalid arguments
    pub constraint_errors: AtomicU64,
    /// Failures caused by buffer capacity
    pub capacity_errors: AtomicU64,
    /// Failures caused by malformed input
    pub validation_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            messages_encoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            constraint_errors: AtomicU64::new(0),
            capacity_errors: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a message written
    pub fn message_encoded(&self, byte_count: u64) {
        self.messages_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a message read
    pub fn message_decoded(&self, byte_count: u64) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a failed write
    pub fn encode_failed(&self, err: &WireError) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
        self.error_kind(err.kind());
    }

    /// Record a failed read
    pub fn decode_failed(&self, err: &WireError) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
        self.error_kind(err.kind());
    }

    fn error_kind(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::Constraint => &self.constraint_errors,
            ErrorKind::Capacity => &self.capacity_errors,
            ErrorKind::Validation => &self.validation_errors,
            ErrorKind::Configuration => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_encoded: self.messages_encoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            constraint_errors: self.constraint_errors.load(Ordering::Relaxed),
            capacity_errors: self.capacity_errors.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            messages_encoded = snapshot.messages_encoded,
            bytes_encoded = snapshot.bytes_encoded,
            messages_decoded = snapshot.messages_decoded,
            bytes_decoded = snapshot.bytes_decoded,
            encode_failures = snapshot.encode_failures,
            decode_failures = snapshot.decode_failures,
            constraint_errors = snapshot.constraint_errors,
            capacity_errors = snapshot.capacity_errors,
            validation_errors = snapshot.validation_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_encoded: u64,
    pub bytes_encoded: u64,
    pub messages_decoded: u64,
    pub bytes_decoded: u64,
    pub encode_failures: u64,
    pub decode_failures: u64,
    pub constraint_errors: u64,
    pub capacity_errors: u64,
    pub validation_errors: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
