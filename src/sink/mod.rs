//! Destinations for collected price points.
//!
//! [`PointSink`] is the seam between collection and storage; [`InfluxSink`]
//! writes to an InfluxDB 1.x HTTP endpoint in line protocol.

mod influx;
pub mod line_protocol;

pub use influx::{InfluxSink, InfluxSinkBuilder};

use std::future::Future;
use std::sync::Arc;

use crate::error::LoggerError;
use crate::types::PricePoint;

/// Most points sent in one write request.
pub const MAX_BATCH: usize = 5000;

/// Accepts batches of points.
pub trait PointSink: Send + Sync {
    /// Store every point in the batch.
    ///
    /// Implementations split large batches themselves.
    fn write_points(
        &self,
        points: Vec<PricePoint>,
    ) -> impl Future<Output = Result<(), LoggerError>> + Send;
}

impl<T: PointSink> PointSink for Arc<T> {
    fn write_points(
        &self,
        points: Vec<PricePoint>,
    ) -> impl Future<Output = Result<(), LoggerError>> + Send {
        (**self).write_points(points)
    }
}
