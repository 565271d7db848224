//! Array and scoring settings
//!
//! Loaded once from JSON before construction; nothing here changes afterwards.

use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::consts::{CRYSTAL_HALF_SIZE, MAX_CRYSTALS, OVERLAP_SAMPLES};
use crate::error::{Error, Result};
use crate::geometry::Layout;
use crate::scoring::SelectionGroups;

/// Scintillator used for the crystals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CrystalMaterial {
    #[default]
    CeBr3,
    LaBr3,
    /// Any other catalog material, scored without resolution smearing
    Other(String),
}

impl CrystalMaterial {
    pub fn as_str(&self) -> &str {
        match self {
            CrystalMaterial::CeBr3 => "CeBr3",
            CrystalMaterial::LaBr3 => "LaBr3",
            CrystalMaterial::Other(name) => name,
        }
    }

    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cebr3" => CrystalMaterial::CeBr3,
            "labr3" => CrystalMaterial::LaBr3,
            _ => CrystalMaterial::Other(s.to_string()),
        }
    }
}

/// Compton suppression shield mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShieldMode {
    #[default]
    Off,
    Bgo,
}

impl ShieldMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ShieldMode::Bgo)
    }
}

/// Physical parameters of the array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArraySpec {
    /// Segments distributed around the beam axis
    pub segments: u32,
    /// Crystals per segment along the beam (segment local X), separated by `gap_mm`
    pub rings: u32,
    /// Crystals per segment across the segment (local Y)
    pub columns: u32,
    /// Distance between neighbouring rings
    pub gap_mm: f64,
    /// Crystal half-extents
    pub crystal_half_size_mm: DVec3,
    pub crystal_material: CrystalMaterial,

    // === Optional structures ===
    /// Aluminium vacuum vessel around the array
    ///
    /// The tubes use the fixed dimensions of one physical vessel and intersect
    /// each other and the segments, so a build with `check_overlaps` set fails
    /// with `GeometryOverlap`. Enable it only with the check turned off.
    pub vacuum_chamber: bool,
    pub vacuum_tube_thickness_mm: f64,
    /// Insulation tube between field cage and vessel
    pub insulation_tube: bool,
    pub insulation_tube_thickness_mm: f64,
    /// Vessel flange half-width; grown to the segment half-width when smaller
    pub flange_half_width_mm: f64,
    pub shield: ShieldMode,

    // === Checks ===
    /// Fail construction when placed volumes overlap
    pub check_overlaps: bool,
    /// Surface points sampled per volume by the overlap check
    pub overlap_samples: u32,
}

impl Default for ArraySpec {
    fn default() -> Self {
        Self {
            segments: 15,
            rings: 3,
            columns: 1,
            gap_mm: 3.0,
            crystal_half_size_mm: DVec3::splat(CRYSTAL_HALF_SIZE),
            crystal_material: CrystalMaterial::CeBr3,

            vacuum_chamber: false,
            vacuum_tube_thickness_mm: 3.0,
            insulation_tube: false,
            insulation_tube_thickness_mm: 3.0,
            flange_half_width_mm: 29.0,
            shield: ShieldMode::Off,

            check_overlaps: true,
            overlap_samples: OVERLAP_SAMPLES,
        }
    }
}

impl ArraySpec {
    pub fn layout(&self) -> Layout {
        Layout {
            segments: self.segments,
            rings: self.rings,
            columns: self.columns,
        }
    }

    /// Crystals held by one segment
    pub fn crystals_per_segment(&self) -> u32 {
        self.layout().per_segment()
    }

    /// Crystals in the whole array
    pub fn total_crystals(&self) -> u32 {
        self.layout().total()
    }

    /// Reject parameter sets no layout can be built from
    pub fn validate(&self) -> Result<()> {
        if self.segments < 1 {
            return Err(Error::InvalidSegmentCount(self.segments));
        }
        if self.rings < 1 || self.columns < 1 {
            return Err(Error::dimensions(
                "segment",
                format!(
                    "needs at least one crystal per ring and column, got {}x{}",
                    self.rings, self.columns
                ),
            ));
        }
        match self.layout().checked_total() {
            Some(total) if total <= MAX_CRYSTALS => {}
            _ => {
                return Err(Error::dimensions(
                    "array",
                    format!(
                        "{} segments of {}x{} crystals exceed the limit of {} crystals",
                        self.segments, self.rings, self.columns, MAX_CRYSTALS
                    ),
                ));
            }
        }
        if !(self.gap_mm >= 0.0) {
            return Err(Error::dimensions(
                "segment",
                format!("gap between rings must be non-negative, got {}", self.gap_mm),
            ));
        }
        if self.shield.is_enabled() && self.segments < 3 {
            return Err(Error::dimensions(
                "ComptSuppTrap",
                format!(
                    "suppression ring needs at least 3 segment gaps, got {}",
                    self.segments
                ),
            ));
        }
        if self.vacuum_chamber && !(self.vacuum_tube_thickness_mm > 0.0) {
            return Err(Error::dimensions(
                "vacuum tube",
                format!("thickness must be positive, got {}", self.vacuum_tube_thickness_mm),
            ));
        }
        if self.insulation_tube && !(self.insulation_tube_thickness_mm > 0.0) {
            return Err(Error::dimensions(
                "insulation tube",
                format!(
                    "thickness must be positive, got {}",
                    self.insulation_tube_thickness_mm
                ),
            ));
        }
        Ok(())
    }
}

/// Event scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub selection: SelectionGroups,
    /// Log "begin of event" every N events
    pub print_modulo: u64,
    /// Seed for the demo event stream
    pub seed: u64,
    /// Synthetic events scored by the demo binary
    pub demo_events: u64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            selection: SelectionGroups::default(),
            print_modulo: 1,
            seed: 12345,
            demo_events: 100,
        }
    }
}

/// Complete settings file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub array: ArraySpec,
    pub scoring: ScoringSettings,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Settings(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
