//! Event scoring
//!
//! Reads per-event deposits and writes spectra and ntuple rows:
//! - Energies are smeared with the crystal's resolution curve
//! - Every random draw comes from the caller's source
//! - Crystals are visited in copy-number order

pub mod channel;
pub mod collections;
pub mod processor;
pub mod resolution;
pub mod selection;
pub mod sink;

pub use channel::{Aggregate, Channel, NtupleRow, ShieldColumns};
pub use collections::{CollectionId, CollectionRegistry, DepositMap, EventHits};
pub use processor::{EventProcessor, EventSummary};
pub use resolution::{GaussianSource, ResolutionCurve, Smeared, smear};
pub use selection::{ExclusionRule, SelectionGroup, SelectionGroups};
pub use sink::{AnalysisSink, RecordingSink};
