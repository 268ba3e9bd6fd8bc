//! # Utility Modules
//!
//! Supporting pieces for the message codec.
//!
//! ## Components
//! - **Buffer Pool**: reusable fixed-size packet buffers
//! - **Metrics**: thread-safe encode/decode counters and an operation timer

pub mod buffer_pool;
pub mod metrics;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use metrics::{Metrics, MetricsSnapshot};
