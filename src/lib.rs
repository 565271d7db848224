//! Scint Array - geometry and event scoring for a segmented scintillator array
//!
//! Core modules:
//! - `geometry`: Materials, shapes, detector units and the ring layout
//! - `scoring`: Per-event resolution smearing and channel routing
//! - `settings`: Array and scoring configuration
//! - `report`: Construction diagnostics

pub mod error;
pub mod geometry;
pub mod report;
pub mod scoring;
pub mod settings;

pub use error::{Error, Result};
pub use geometry::{ArrayGeometry, build_array, compute_inscribed_radius};
pub use report::ConstructionReport;
pub use settings::{ArraySpec, CrystalMaterial, ScoringSettings, Settings, ShieldMode};

use glam::DVec3;

/// Array configuration constants (lengths in mm, energies in keV)
pub mod consts {
    /// Engine energy unit expressed in keV units (deposits arrive in MeV)
    pub const KEV: f64 = 1.0e-3;
    /// Gaussian FWHM = 2.355 sigma
    pub const FWHM_TO_SIGMA: f64 = 2.355;

    /// World box half-extents
    pub const WORLD_HALF_XY: f64 = 400.0;
    pub const WORLD_HALF_Z: f64 = 400.0;

    /// Default crystal half-size (48 mm cube)
    pub const CRYSTAL_HALF_SIZE: f64 = 24.0;

    /// Reflector (TiO2 powder) wall and front thickness
    pub const REFLECTOR_WALL: f64 = 0.5;
    pub const REFLECTOR_FRONT: f64 = 0.5;
    /// Aluminium housing wall and front thickness
    pub const HOUSING_WALL: f64 = 3.0;
    pub const HOUSING_FRONT: f64 = 1.0;
    /// Quartz optical window half-depth
    pub const WINDOW_HALF_DEPTH: f64 = 1.0;

    /// Inscribed radius used when the ring formula degenerates
    pub const SINGLE_SEGMENT_RADIUS: f64 = 150.0;
    pub const TWO_SEGMENT_RADIUS: f64 = 100.0;

    /// Largest array `ArraySpec::validate` accepts
    pub const MAX_CRYSTALS: u32 = 10_000;

    /// Shield copy numbers start here so they never collide with crystals
    pub const SHIELD_COPY_OFFSET: u32 = 100;

    /// Point classification tolerance for overlap checks
    pub const GEOMETRY_TOLERANCE: f64 = 1.0e-6;
    /// Surface points sampled per volume when checking overlaps
    pub const OVERLAP_SAMPLES: u32 = 1000;
}

/// Convert polar (r, phi) in the plane transverse to the beam into a point at z = 0
#[inline]
pub fn polar_to_cartesian(r: f64, phi: f64) -> DVec3 {
    DVec3::new(r * phi.cos(), r * phi.sin(), 0.0)
}

/// Split a point into transverse radius, azimuth and beam coordinate
#[inline]
pub fn cartesian_to_cylindrical(pos: DVec3) -> (f64, f64, f64) {
    (pos.truncate().length(), pos.y.atan2(pos.x), pos.z)
}
