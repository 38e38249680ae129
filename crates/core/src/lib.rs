//! Core types, normalization, and validation for the Beacon analytics collector.

pub mod error;
pub mod event;
pub mod limits;
pub mod normalize;
pub mod range;

pub use error::{Error, RejectReason, Result, StoreErrorCode};
pub use event::*;
pub use normalize::{normalize, normalize_bytes, RawEvent};
pub use range::{RangeSelector, TimeRange};
