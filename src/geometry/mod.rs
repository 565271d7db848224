//! Detector geometry
//!
//! Built once from an `ArraySpec` and never modified afterwards. The result
//! is shared by reference with everything that scores events.

pub mod layout;
pub mod material;
pub mod overlap;
pub mod registry;
pub mod shape;
pub mod suppressor;
pub mod transform;
pub mod unit;
pub mod vessel;
pub mod volume;

pub use layout::{
    ArrayGeometry, CRYSTAL_COLLECTION, CRYSTAL_DETECTOR, SHIELD_COLLECTION, SHIELD_DETECTOR,
    build_array, compute_inscribed_radius,
};
pub use material::{Element, Material, MaterialCatalog, Proportion};
pub use registry::{CrystalIndex, CrystalPositionRegistry, Layout};
pub use shape::{Location, Shape, ZPlane};
pub use unit::{DetectorUnit, UnitMaterials, UnitPart, WallThicknesses};
pub use vessel::TubeSpec;
pub use volume::{LogicalVolume, Placement, VolumeId, VolumeStore};
