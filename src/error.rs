//! Error taxonomy
//!
//! Every failure here is fatal to a run: geometry construction and event
//! scoring stop at the first error and hand it back to the caller.

use glam::DVec3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid segment count {0}: the array needs at least one segment")]
    InvalidSegmentCount(u32),

    #[error("invalid dimensions for '{volume}': {detail}")]
    InvalidDimensions { volume: String, detail: String },

    #[error("invalid material '{name}': {detail}")]
    InvalidMaterial { name: String, detail: String },

    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("index {index} out of range for a table of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot access hits collection '{0}'")]
    MissingCollection(String),

    #[error("copy number {copy_number} in '{collection}' does not belong to any placed volume")]
    UnknownCopyNumber { collection: String, copy_number: u32 },

    #[error("deposit of {energy} for copy number {copy_number} in '{collection}' is not a valid energy")]
    InvalidDeposit {
        collection: String,
        copy_number: u32,
        energy: f64,
    },

    #[error("volume '{volume}' overlaps '{other}' at {point}")]
    GeometryOverlap {
        volume: String,
        other: String,
        point: DVec3,
    },

    #[error("volume '{volume}' protrudes from mother '{mother}' at {point}")]
    Protrusion {
        volume: String,
        mother: String,
        point: DVec3,
    },

    #[error("selection group '{group}' does not fit the layout: {detail}")]
    SelectionMismatch { group: String, detail: String },

    #[error("settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dimensions(volume: &str, detail: impl Into<String>) -> Self {
        Error::InvalidDimensions {
            volume: volume.to_string(),
            detail: detail.into(),
        }
    }
}
