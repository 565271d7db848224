//! Vacuum chamber and insulation tube
//!
//! The chamber is a stack of seven aluminium tubes with fixed dimensions
//! from the physical vessel drawing. Only the innermost radius follows the
//! array, so the literal tubes do not scale with the detector and several
//! of them intersect each other and the canonical segments.

use std::sync::Arc;

use glam::DVec3;

use super::material::Material;
use super::shape::Shape;
use super::transform::translation;
use super::volume::{VolumeId, VolumeStore};
use crate::error::{Error, Result};

/// Half-length of the insulation tube
pub const INSULATION_HALF_LENGTH: f64 = 150.0;

/// Full tube around the beam axis
#[derive(Debug, Clone, PartialEq)]
pub struct TubeSpec {
    pub name: String,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub half_length: f64,
    /// Centre along the beam axis
    pub z: f64,
}

impl TubeSpec {
    fn new(name: &str, inner_radius: f64, outer_radius: f64, half_length: f64, z: f64) -> Self {
        Self {
            name: name.to_string(),
            inner_radius,
            outer_radius,
            half_length,
            z,
        }
    }

    pub fn shape(&self) -> Result<Shape> {
        Shape::make_full_tube(&self.name, self.inner_radius, self.outer_radius, self.half_length)
    }
}

/// The seven chamber tubes around inscribed radius `r`
pub fn vacuum_chamber_tubes(r: f64, thickness: f64) -> Vec<TubeSpec> {
    let inner = r - thickness;
    vec![
        TubeSpec::new("vacuumTube", inner, r, 102.25, 29.25),
        TubeSpec::new("vacuumTube2", inner, 226.0, 5.0, -78.0),
        TubeSpec::new("vacuumTube3", 150.0, 255.0, 5.0, -88.0),
        TubeSpec::new("vacuumTube4", 200.0, 255.0, 15.0, -108.0),
        TubeSpec::new("vacuumTube5", inner, 254.0, 7.5, 138.0),
        TubeSpec::new("vacuumTube6", 239.0, 254.0, 37.5, 174.0),
        TubeSpec::new("vacuumTube7", 239.0, 305.0, 10.0, 226.5),
    ]
}

/// Insulation tube whose outer surface is the inscribed circle
pub fn insulation_tube(r: f64, thickness: f64) -> TubeSpec {
    TubeSpec::new("insulationTube", r - thickness, r, INSULATION_HALF_LENGTH, 0.0)
}

/// Create one logical volume per tube and place each once in `world`
pub fn place_tubes(
    store: &mut VolumeStore,
    world: VolumeId,
    material: &Arc<Material>,
    tubes: &[TubeSpec],
    check_overlaps: bool,
) -> Result<Vec<VolumeId>> {
    tubes
        .iter()
        .map(|tube| {
            if !(tube.inner_radius >= 0.0) {
                return Err(Error::dimensions(
                    &tube.name,
                    format!(
                        "thickness leaves a negative inner radius {}",
                        tube.inner_radius
                    ),
                ));
            }
            let id = store.add_volume(&tube.name, tube.shape()?, material.clone());
            store.place(
                &tube.name,
                id,
                Some(world),
                translation(DVec3::new(0.0, 0.0, tube.z)),
                1,
                check_overlaps,
            );
            Ok(id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::material::MaterialCatalog;

    #[test]
    fn test_chamber_tubes_follow_radius() {
        let tubes = vacuum_chamber_tubes(130.0, 3.0);
        assert_eq!(tubes.len(), 7);
        assert_eq!(tubes[0].inner_radius, 127.0);
        assert_eq!(tubes[0].outer_radius, 130.0);
        assert_eq!(tubes[4].inner_radius, 127.0);
        assert_eq!(tubes[6].z, 226.5);
        assert!(tubes.iter().all(|t| t.shape().is_ok()));
    }

    #[test]
    fn test_insulation_tube() {
        let tube = insulation_tube(129.0, 3.0);
        assert_eq!((tube.inner_radius, tube.outer_radius), (126.0, 129.0));
        assert_eq!(tube.half_length, INSULATION_HALF_LENGTH);
        assert_eq!(tube.z, 0.0);
    }

    #[test]
    fn test_place_tubes_in_world() {
        let mut catalog = MaterialCatalog::with_array_materials().unwrap();
        let al = catalog.find_or_build("G4_Al").unwrap();
        let mut store = VolumeStore::new();
        let world = store.add_volume(
            "World",
            Shape::make_box("World", DVec3::splat(400.0)).unwrap(),
            catalog.get("Air").unwrap(),
        );
        let ids = place_tubes(&mut store, world, &al, &vacuum_chamber_tubes(130.0, 3.0), false)
            .unwrap();
        assert_eq!(ids.len(), 7);
        assert!(store.daughters(world).all(|p| p.copy_number == 1));
        assert_eq!(store.placements()[1].position(), DVec3::new(0.0, 0.0, -78.0));
    }

    #[test]
    fn test_oversized_thickness_rejected() {
        let mut catalog = MaterialCatalog::new();
        let al = catalog.find_or_build("G4_Al").unwrap();
        let mut store = VolumeStore::new();
        let world = store.add_volume(
            "World",
            Shape::make_box("World", DVec3::splat(400.0)).unwrap(),
            al.clone(),
        );
        let err = place_tubes(&mut store, world, &al, &[insulation_tube(100.0, 120.0)], false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { ref volume, .. } if volume == "insulationTube"));
    }
}
