//! Construction-time overlap check
//!
//! Each daughter flagged for checking is sampled on its surface. A sample
//! point may touch its mother's surface but must not leave the mother, and it
//! may touch a sibling but must not be strictly inside one.

use glam::{DAffine3, DVec3};

use super::shape::Location;
use super::volume::{Placement, VolumeId, VolumeStore};
use crate::consts::GEOMETRY_TOLERANCE;
use crate::error::{Error, Result};

/// Sibling prepared for point queries in the mother frame
struct Candidate<'a> {
    placement: &'a Placement,
    inverse: DAffine3,
    centre: DVec3,
    radius: f64,
}

fn label(placement: &Placement) -> String {
    format!("{}:{}", placement.name, placement.copy_number)
}

/// Check every flagged daughter of `mother` against the mother and its siblings
pub fn check_daughters(store: &VolumeStore, mother: VolumeId, samples: usize) -> Result<()> {
    let mother_volume = store.volume(mother);
    let siblings: Vec<Candidate> = store
        .daughters(mother)
        .map(|placement| Candidate {
            placement,
            inverse: placement.transform.inverse(),
            centre: placement.position(),
            radius: store.volume(placement.volume).shape.bounding_radius(),
        })
        .collect();

    let mut checked = 0usize;
    for (i, daughter) in siblings.iter().enumerate() {
        if !daughter.placement.check_overlaps {
            continue;
        }
        let shape = &store.volume(daughter.placement.volume).shape;
        let points: Vec<DVec3> = shape
            .surface_points(samples)
            .into_iter()
            .map(|p| daughter.placement.transform.transform_point3(p))
            .collect();

        for &point in &points {
            if mother_volume.shape.locate(point) == Location::Outside {
                return Err(Error::Protrusion {
                    volume: label(daughter.placement),
                    mother: mother_volume.name.clone(),
                    point,
                });
            }
        }

        let neighbours = siblings.iter().enumerate().filter(|(j, other)| {
            *j != i
                && daughter.centre.distance(other.centre)
                    < daughter.radius + other.radius + GEOMETRY_TOLERANCE
        });
        for (_, other) in neighbours {
            let other_shape = &store.volume(other.placement.volume).shape;
            let hit = points.iter().find(|p| {
                p.distance(other.centre) < other.radius + GEOMETRY_TOLERANCE
                    && other_shape.locate(other.inverse.transform_point3(**p)) == Location::Inside
            });
            if let Some(&point) = hit {
                return Err(Error::GeometryOverlap {
                    volume: label(daughter.placement),
                    other: label(other.placement),
                    point,
                });
            }
        }
        checked += points.len();
    }

    log::debug!(
        "Overlap check of '{}': {} daughters, {} surface points clear",
        mother_volume.name,
        siblings.len(),
        checked
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::material::MaterialCatalog;
    use crate::geometry::shape::Shape;
    use crate::geometry::transform::translation;

    fn store_with_world() -> (VolumeStore, VolumeId, VolumeId) {
        let catalog = MaterialCatalog::with_array_materials().unwrap();
        let air = catalog.get("Air").unwrap();
        let mut store = VolumeStore::new();
        let world = store.add_volume(
            "World",
            Shape::make_box("World", DVec3::splat(10.0)).unwrap(),
            air.clone(),
        );
        let cube = store.add_volume(
            "cube",
            Shape::make_box("cube", DVec3::splat(1.0)).unwrap(),
            air,
        );
        store.place("World", world, None, DAffine3::IDENTITY, 0, false);
        (store, world, cube)
    }

    #[test]
    fn test_touching_daughters_pass() {
        let (mut store, world, cube) = store_with_world();
        store.place("cube", cube, Some(world), translation(DVec3::new(-1.0, 0.0, 0.0)), 1, true);
        store.place("cube", cube, Some(world), translation(DVec3::new(1.0, 0.0, 0.0)), 2, true);
        // Flush against the world wall
        store.place("cube", cube, Some(world), translation(DVec3::new(0.0, 9.0, 0.0)), 3, true);
        assert!(check_daughters(&store, world, 200).is_ok());
    }

    #[test]
    fn test_overlapping_daughters_fail() {
        let (mut store, world, cube) = store_with_world();
        store.place("cube", cube, Some(world), translation(DVec3::ZERO), 1, true);
        store.place("cube", cube, Some(world), translation(DVec3::new(1.5, 0.0, 0.0)), 2, true);
        let err = check_daughters(&store, world, 200).unwrap_err();
        assert!(matches!(err, Error::GeometryOverlap { .. }));
    }

    #[test]
    fn test_protrusion_fails() {
        let (mut store, world, cube) = store_with_world();
        store.place("cube", cube, Some(world), translation(DVec3::new(9.5, 0.0, 0.0)), 7, true);
        let err = check_daughters(&store, world, 200).unwrap_err();
        assert!(
            matches!(err, Error::Protrusion { ref volume, ref mother, .. } if volume == "cube:7" && mother == "World")
        );
    }

    #[test]
    fn test_unflagged_placements_are_skipped() {
        let (mut store, world, cube) = store_with_world();
        store.place("cube", cube, Some(world), translation(DVec3::ZERO), 1, false);
        store.place("cube", cube, Some(world), translation(DVec3::new(0.5, 0.0, 0.0)), 2, false);
        assert!(check_daughters(&store, world, 200).is_ok());
    }
}
