//! Logical volumes and their placements
//!
//! A logical volume is a shape filled with a material. Placements put a
//! logical volume inside a mother volume with a rigid transform and a copy
//! number. One logical volume may be placed many times.

use std::sync::Arc;

use glam::{DAffine3, DVec3};

use super::material::Material;
use super::shape::Shape;

/// Index of a logical volume in its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalVolume {
    pub name: String,
    pub shape: Shape,
    pub material: Arc<Material>,
    /// Name of the detector scoring deposits in this volume
    pub sensitive: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub volume: VolumeId,
    /// `None` only for the world
    pub mother: Option<VolumeId>,
    /// Daughter frame to mother frame
    pub transform: DAffine3,
    pub copy_number: u32,
    pub check_overlaps: bool,
}

impl Placement {
    /// Daughter centre in the mother frame
    pub fn position(&self) -> DVec3 {
        self.transform.translation
    }
}

/// Owns every logical volume and placement of a geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeStore {
    volumes: Vec<LogicalVolume>,
    placements: Vec<Placement>,
}

impl VolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_volume(&mut self, name: &str, shape: Shape, material: Arc<Material>) -> VolumeId {
        self.volumes.push(LogicalVolume {
            name: name.to_string(),
            shape,
            material,
            sensitive: None,
        });
        VolumeId(self.volumes.len() - 1)
    }

    /// Place `volume` in `mother` (or as the world when `mother` is `None`)
    pub fn place(
        &mut self,
        name: &str,
        volume: VolumeId,
        mother: Option<VolumeId>,
        transform: DAffine3,
        copy_number: u32,
        check_overlaps: bool,
    ) -> usize {
        self.placements.push(Placement {
            name: name.to_string(),
            volume,
            mother,
            transform,
            copy_number,
            check_overlaps,
        });
        self.placements.len() - 1
    }

    pub fn set_sensitive(&mut self, id: VolumeId, detector: &str) {
        if let Some(volume) = self.volumes.get_mut(id.0) {
            volume.sensitive = Some(detector.to_string());
        }
    }

    pub fn volume(&self, id: VolumeId) -> &LogicalVolume {
        &self.volumes[id.0]
    }

    pub fn volumes(&self) -> &[LogicalVolume] {
        &self.volumes
    }

    /// Placements in creation order
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Placements whose mother is `mother`, in creation order
    pub fn daughters(&self, mother: VolumeId) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |p| p.mother == Some(mother))
    }

    /// Copy numbers of every placement of a sensitive volume for `detector`
    pub fn sensitive_copy_numbers(&self, detector: &str) -> Vec<u32> {
        let mut copies: Vec<u32> = self
            .placements
            .iter()
            .filter(|p| self.volumes[p.volume.0].sensitive.as_deref() == Some(detector))
            .map(|p| p.copy_number)
            .collect();
        copies.sort_unstable();
        copies.dedup();
        copies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::material::MaterialCatalog;
    use crate::geometry::transform::translation;

    #[test]
    fn test_daughters_and_sensitive_copies() {
        let catalog = MaterialCatalog::with_array_materials().unwrap();
        let air = catalog.get("Air").unwrap();
        let mut store = VolumeStore::new();

        let world = store.add_volume(
            "World",
            Shape::make_box("World", DVec3::splat(100.0)).unwrap(),
            air.clone(),
        );
        let cube = store.add_volume(
            "crystal",
            Shape::make_box("crystal", DVec3::splat(1.0)).unwrap(),
            air,
        );
        store.place("World", world, None, DAffine3::IDENTITY, 0, false);
        for copy in [3, 1, 2] {
            store.place(
                "crystal",
                cube,
                Some(world),
                translation(DVec3::X * copy as f64 * 5.0),
                copy,
                true,
            );
        }
        store.set_sensitive(cube, "crystal");

        assert_eq!(store.daughters(world).count(), 3);
        assert_eq!(store.daughters(cube).count(), 0);
        assert_eq!(store.sensitive_copy_numbers("crystal"), vec![1, 2, 3]);
        assert!(store.sensitive_copy_numbers("ComptSupp").is_empty());
        assert_eq!(store.placements()[1].position(), DVec3::new(15.0, 0.0, 0.0));
    }
}
