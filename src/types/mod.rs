//! Common types used across the price logger.

pub mod common;
pub mod point;
pub mod serde_helpers;

pub use common::*;
pub use point::{field_names, FieldValue, Fields, PricePoint};
