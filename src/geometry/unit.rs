//! Detector unit: crystal, reflector, housing and optical window
//!
//! All four solids are derived from the crystal half-extents:
//! - Reflector = crystal grown by the reflector wall, hollowed by the crystal.
//!   It is open on the +Z face where the window sits and shifted back by half
//!   its front thickness.
//! - Housing = reflector grown by the housing wall, hollowed by the reflector
//!   box and shifted back by half the reflector and housing fronts.
//! - Window = thin box as wide as the housing, just past the crystal's +Z face.
//!
//! The four parts are placed side by side in the same mother; the hollows make
//! them nest without overlapping.

use std::sync::Arc;

use glam::DVec3;

use super::material::{Material, MaterialCatalog};
use super::shape::Shape;
use super::transform::translation;
use crate::consts::{
    HOUSING_FRONT, HOUSING_WALL, REFLECTOR_FRONT, REFLECTOR_WALL, WINDOW_HALF_DEPTH,
};
use crate::error::{Error, Result};
use crate::settings::CrystalMaterial;

/// Layer thicknesses around the crystal (mm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallThicknesses {
    /// Reflector side walls (X and Y)
    pub reflector_wall: f64,
    /// Reflector behind the crystal
    pub reflector_front: f64,
    pub housing_wall: f64,
    pub housing_front: f64,
    pub window_half_depth: f64,
}

impl Default for WallThicknesses {
    fn default() -> Self {
        Self {
            reflector_wall: REFLECTOR_WALL,
            reflector_front: REFLECTOR_FRONT,
            housing_wall: HOUSING_WALL,
            housing_front: HOUSING_FRONT,
            window_half_depth: WINDOW_HALF_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitMaterials {
    pub crystal: Arc<Material>,
    pub reflector: Arc<Material>,
    pub housing: Arc<Material>,
    pub window: Arc<Material>,
}

impl UnitMaterials {
    /// TiO2 reflector, aluminium housing and quartz window around the given crystal
    pub fn from_catalog(catalog: &mut MaterialCatalog, crystal: &CrystalMaterial) -> Result<Self> {
        Ok(Self {
            crystal: catalog.find_or_build(crystal.as_str())?,
            reflector: catalog.get("TiO2")?,
            housing: catalog.get("Aluminum_")?,
            window: catalog.get("Quartz")?,
        })
    }
}

/// One layer of the unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPart {
    pub name: &'static str,
    pub shape: Shape,
    /// Outer half-extents
    pub half: DVec3,
    /// Centre relative to the crystal centre
    pub offset: DVec3,
    pub material: Arc<Material>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorUnit {
    pub crystal: UnitPart,
    pub reflector: UnitPart,
    pub housing: UnitPart,
    pub window: UnitPart,
    pub walls: WallThicknesses,
}

impl DetectorUnit {
    pub fn build(
        crystal_half: DVec3,
        walls: WallThicknesses,
        materials: UnitMaterials,
    ) -> Result<Self> {
        let thicknesses = [
            ("reflector", walls.reflector_wall),
            ("reflector", walls.reflector_front),
            ("housing", walls.housing_wall),
            ("housing", walls.housing_front),
        ];
        if let Some((volume, t)) = thicknesses.iter().find(|(_, t)| !(*t >= 0.0)) {
            return Err(Error::dimensions(
                volume,
                format!("wall thickness must be non-negative, got {t}"),
            ));
        }

        let crystal_shape = Shape::make_box("crystal", crystal_half)?;

        let reflector_half = crystal_half
            + DVec3::new(
                walls.reflector_wall,
                walls.reflector_wall,
                walls.reflector_front / 2.0,
            );
        let reflector_box = Shape::make_box("reflector", reflector_half)?;
        let reflector_shape = Shape::make_subtraction(
            reflector_box.clone(),
            crystal_shape.clone(),
            translation(DVec3::new(0.0, 0.0, walls.reflector_front / 2.0)),
        );

        let housing_half = crystal_half
            + DVec3::new(
                walls.reflector_wall + walls.housing_wall,
                walls.reflector_wall + walls.housing_wall,
                walls.reflector_front / 2.0 + walls.housing_front / 2.0,
            );
        let housing_shape = Shape::make_subtraction(
            Shape::make_box("housing", housing_half)?,
            reflector_box,
            translation(DVec3::new(0.0, 0.0, walls.housing_front / 2.0)),
        );

        let window_half = DVec3::new(housing_half.x, housing_half.y, walls.window_half_depth);
        let window_shape = Shape::make_box("window", window_half)?;

        Ok(Self {
            crystal: UnitPart {
                name: "crystal",
                shape: crystal_shape,
                half: crystal_half,
                offset: DVec3::ZERO,
                material: materials.crystal,
            },
            reflector: UnitPart {
                name: "reflector",
                shape: reflector_shape,
                half: reflector_half,
                offset: DVec3::new(0.0, 0.0, -walls.reflector_front / 2.0),
                material: materials.reflector,
            },
            housing: UnitPart {
                name: "housing",
                shape: housing_shape,
                half: housing_half,
                offset: DVec3::new(
                    0.0,
                    0.0,
                    -(walls.reflector_front / 2.0 + walls.housing_front / 2.0),
                ),
                material: materials.housing,
            },
            window: UnitPart {
                name: "window",
                shape: window_shape,
                half: window_half,
                offset: DVec3::new(0.0, 0.0, crystal_half.z + walls.window_half_depth),
                material: materials.window,
            },
            walls,
        })
    }

    /// Parts in placement order
    pub fn parts(&self) -> [&UnitPart; 4] {
        [&self.crystal, &self.window, &self.reflector, &self.housing]
    }

    pub fn housing_half(&self) -> DVec3 {
        self.housing.half
    }

    /// Half-depth of housing plus window, the depth a segment must hold
    pub fn half_depth(&self) -> f64 {
        self.housing.half.z + self.window.half.z
    }

    /// Crystal centre relative to the centre of the housing+window stack
    pub fn crystal_offset_in_stack(&self) -> DVec3 {
        DVec3::new(0.0, 0.0, self.housing.half.z - self.crystal.half.z - self.window.half.z)
    }
}
