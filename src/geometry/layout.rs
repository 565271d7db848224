//! Array layout: inscribed radius, segment ring and the finished geometry
//!
//! Segments are boxes holding a grid of detector units. Segment `s` sits at
//! azimuth `s * 2pi / n` with its local +Z pointing radially outward and its
//! local X along -Z (the beam axis).

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::ops::Range;

use glam::{DAffine3, DVec3};

use super::material::MaterialCatalog;
use super::overlap::check_daughters;
use super::registry::{CrystalPositionRegistry, Layout, RegistryBuilder};
use super::shape::Shape;
use super::suppressor::{place_shields, shield_half_length};
use super::transform::{Rotation, translation};
use super::unit::{DetectorUnit, UnitMaterials, WallThicknesses};
use super::vessel::{TubeSpec, insulation_tube, place_tubes, vacuum_chamber_tubes};
use super::volume::{VolumeId, VolumeStore};
use crate::consts::{
    SHIELD_COPY_OFFSET, SINGLE_SEGMENT_RADIUS, TWO_SEGMENT_RADIUS, WORLD_HALF_XY, WORLD_HALF_Z,
};
use crate::error::{Error, Result};
use crate::polar_to_cartesian;
use crate::settings::{ArraySpec, CrystalMaterial, ShieldMode};

/// Scorer attached to every crystal
pub const CRYSTAL_DETECTOR: &str = "crystal";
/// Scorer attached to the suppression shields
pub const SHIELD_DETECTOR: &str = "ComptSupp";
/// Hits collection of crystal energy deposits
pub const CRYSTAL_COLLECTION: &str = "crystal/edep";
/// Hits collection of shield energy deposits
pub const SHIELD_COLLECTION: &str = "ComptSupp/edep";

/// Radius of the circle inscribed in the segment ring
///
/// The general formula keeps neighbouring segments from overlapping but
/// degenerates for one or two segments, which use fixed radii instead.
pub fn compute_inscribed_radius(segments: u32, housing_half_y: f64, columns: u32) -> Result<f64> {
    match segments {
        0 => Err(Error::InvalidSegmentCount(0)),
        1 => Ok(SINGLE_SEGMENT_RADIUS),
        2 => Ok(TWO_SEGMENT_RADIUS),
        n => Ok(housing_half_y * columns as f64 / (PI / n as f64).tan()),
    }
}

/// Rotation taking segment-local axes to the world at azimuth `phi`
fn segment_rotation(phi: f64) -> Rotation {
    Rotation::IDENTITY.rotate_y(FRAC_PI_2).rotate_z(phi)
}

/// Transform used to carry recorded crystal centres to the world
///
/// Rotating about X by `2pi - phi` and then about Y by 90 degrees equals the
/// segment rotation, so the table agrees with the placed crystals.
fn registry_transform(phi: f64, position: DVec3) -> DAffine3 {
    Rotation::IDENTITY
        .rotate_x(TAU - phi)
        .rotate_y(FRAC_PI_2)
        .then_translate(position)
}

/// Immutable result of building the array
#[derive(Debug, Clone)]
pub struct ArrayGeometry {
    spec: ArraySpec,
    layout: Layout,
    catalog: MaterialCatalog,
    store: VolumeStore,
    world: VolumeId,
    unit: DetectorUnit,
    unit_volumes: [VolumeId; 4],
    segment_volumes: Vec<VolumeId>,
    segment_half: DVec3,
    inscribed_radius: f64,
    flange_half_width: f64,
    shield: Option<VolumeId>,
    vessel_tubes: Vec<TubeSpec>,
    insulation: Option<TubeSpec>,
    registry: CrystalPositionRegistry,
    collections: Vec<String>,
}

/// Build the whole array described by `spec`
pub fn build_array(spec: &ArraySpec) -> Result<ArrayGeometry> {
    spec.validate()?;
    let layout = spec.layout();
    let check = spec.check_overlaps;

    let mut catalog = MaterialCatalog::with_array_materials()?;
    let materials = UnitMaterials::from_catalog(&mut catalog, &spec.crystal_material)?;
    let unit = DetectorUnit::build(
        spec.crystal_half_size_mm,
        WallThicknesses::default(),
        materials,
    )?;
    let housing = unit.housing_half();

    let r = compute_inscribed_radius(spec.segments, housing.y, spec.columns)?;
    log::info!(
        "Inscribed radius {:.3} mm for {} segments of {}x{} crystals",
        r,
        spec.segments,
        spec.rings,
        spec.columns
    );

    let mut store = VolumeStore::new();
    let world = store.add_volume(
        "World",
        Shape::make_box("World", DVec3::new(WORLD_HALF_XY, WORLD_HALF_XY, WORLD_HALF_Z))?,
        catalog.get("Air")?,
    );
    store.place("World", world, None, DAffine3::IDENTITY, 0, false);

    let unit_volumes = unit
        .parts()
        .map(|part| store.add_volume(part.name, part.shape.clone(), part.material.clone()));

    let rings = spec.rings as f64;
    let columns = spec.columns as f64;
    let segment_half = DVec3::new(
        housing.x * rings + spec.gap_mm * (rings - 1.0) / 2.0,
        housing.y * columns,
        unit.half_depth(),
    );
    let segment_shape = Shape::make_box("segmentBox", segment_half)?;
    let galactic = catalog.find_or_build("G4_Galactic")?;

    let mut flange_half_width = spec.flange_half_width_mm;
    if flange_half_width < segment_half.y {
        log::warn!(
            "Flange half-width {} mm is narrower than the segment, grown to {} mm",
            flange_half_width,
            segment_half.y
        );
        flange_half_width = segment_half.y;
    }

    let shield = match spec.shield {
        ShieldMode::Bgo => Some(place_shields(
            &mut store,
            world,
            &catalog.get("BGO")?,
            spec.segments,
            r,
            shield_half_length(housing.x, spec.gap_mm),
            check,
        )?),
        ShieldMode::Off => None,
    };

    let vessel_tubes = if spec.vacuum_chamber {
        if check {
            log::warn!("Vacuum chamber tubes intersect the array, the overlap check will reject them");
        }
        let tubes = vacuum_chamber_tubes(r, spec.vacuum_tube_thickness_mm);
        place_tubes(&mut store, world, &catalog.find_or_build("G4_Al")?, &tubes, check)?;
        log::info!("Vacuum chamber: {} tubes", tubes.len());
        tubes
    } else {
        Vec::new()
    };

    let insulation = if spec.insulation_tube {
        let tube = insulation_tube(r, spec.insulation_tube_thickness_mm);
        place_tubes(
            &mut store,
            world,
            &catalog.find_or_build("G4_Al")?,
            std::slice::from_ref(&tube),
            check,
        )?;
        log::info!(
            "Insulation tube: {} mm to {} mm",
            tube.inner_radius,
            tube.outer_radius
        );
        Some(tube)
    } else {
        None
    };

    // Crystal centre of the first unit, relative to the segment centre
    let start = DVec3::new(
        -(rings * housing.x + spec.gap_mm * (rings - 1.0) / 2.0 - housing.x),
        -(columns * housing.y - housing.y),
        unit.crystal_offset_in_stack().z,
    );
    let ring_step = 2.0 * housing.x + spec.gap_mm;
    let column_step = 2.0 * housing.y;
    let half_depth = unit.half_depth();
    let dphi = TAU / spec.segments as f64;

    let mut registry = RegistryBuilder::new(layout.total() as usize);
    let mut segment_volumes = Vec::with_capacity(spec.segments as usize);
    let mut serial = 1u32;
    for s in 0..spec.segments {
        let phi = s as f64 * dphi;
        let segment = store.add_volume("segmentBoxLog", segment_shape.clone(), galactic.clone());
        let position = polar_to_cartesian(r + half_depth, phi);
        let to_world = registry_transform(phi, position);

        for column in 0..spec.columns {
            for ring in 0..spec.rings {
                let centre =
                    start + DVec3::new(ring as f64 * ring_step, column as f64 * column_step, 0.0);
                for (part, volume) in unit.parts().iter().zip(unit_volumes) {
                    store.place(
                        part_placement_name(part.name),
                        volume,
                        Some(segment),
                        translation(centre + part.offset),
                        serial,
                        check,
                    );
                }
                registry.record((serial - 1) as usize, to_world.transform_point3(centre))?;
                serial += 1;
            }
        }

        store.place(
            "Segment",
            segment,
            Some(world),
            segment_rotation(phi).then_translate(position),
            s,
            check,
        );
        segment_volumes.push(segment);
    }
    let registry = registry.finish()?;

    if check {
        let samples = spec.overlap_samples as usize;
        for &segment in &segment_volumes {
            check_daughters(&store, segment, samples)?;
        }
        check_daughters(&store, world, samples)?;
        log::info!("Overlap check passed ({} samples per volume)", samples);
    }

    let crystal_volume = unit_volumes[0];
    store.set_sensitive(crystal_volume, CRYSTAL_DETECTOR);
    let mut collections = vec![CRYSTAL_COLLECTION.to_string()];
    if let Some(id) = shield {
        store.set_sensitive(id, SHIELD_DETECTOR);
        collections.push(SHIELD_COLLECTION.to_string());
    }

    log::info!(
        "Built array: {} crystals, {} placements",
        layout.total(),
        store.placements().len()
    );

    Ok(ArrayGeometry {
        spec: spec.clone(),
        layout,
        catalog,
        store,
        world,
        unit,
        unit_volumes,
        segment_volumes,
        segment_half,
        inscribed_radius: r,
        flange_half_width,
        shield,
        vessel_tubes,
        insulation,
        registry,
        collections,
    })
}

fn part_placement_name(part: &str) -> &'static str {
    match part {
        "crystal" => "sciCrystPl",
        "window" => "sciWindPl",
        "reflector" => "sciReflPl",
        _ => "sciHousPl",
    }
}

impl ArrayGeometry {
    pub fn spec(&self) -> &ArraySpec {
        &self.spec
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn total_crystals(&self) -> u32 {
        self.layout.total()
    }

    pub fn crystal_material(&self) -> &CrystalMaterial {
        &self.spec.crystal_material
    }

    pub fn shield_mode(&self) -> ShieldMode {
        self.spec.shield
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &VolumeStore {
        &self.store
    }

    pub fn world(&self) -> VolumeId {
        self.world
    }

    pub fn unit(&self) -> &DetectorUnit {
        &self.unit
    }

    pub fn segment_volumes(&self) -> &[VolumeId] {
        &self.segment_volumes
    }

    pub fn segment_half(&self) -> DVec3 {
        self.segment_half
    }

    pub fn inscribed_radius(&self) -> f64 {
        self.inscribed_radius
    }

    /// Flange half-width after growing it to fit the segment
    pub fn flange_half_width(&self) -> f64 {
        self.flange_half_width
    }

    pub fn shield_volume(&self) -> Option<VolumeId> {
        self.shield
    }

    /// Copy numbers carried by the shield blocks (empty when disabled)
    pub fn shield_copy_numbers(&self) -> Range<u32> {
        match self.shield {
            Some(_) => SHIELD_COPY_OFFSET..SHIELD_COPY_OFFSET + self.layout.segments,
            None => SHIELD_COPY_OFFSET..SHIELD_COPY_OFFSET,
        }
    }

    pub fn vessel_tubes(&self) -> &[TubeSpec] {
        &self.vessel_tubes
    }

    pub fn insulation(&self) -> Option<&TubeSpec> {
        self.insulation.as_ref()
    }

    pub fn registry(&self) -> &CrystalPositionRegistry {
        &self.registry
    }

    /// Hits collections the geometry provides scorers for
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// World position of a placed crystal, found by walking its placements
    pub fn placed_crystal_position(&self, serial: u32) -> Result<DVec3> {
        let index = self.layout.index(serial).ok_or(Error::IndexOutOfRange {
            index: serial as usize,
            len: self.layout.total() as usize,
        })?;
        let segment_volume = self.segment_volumes[index.segment as usize];
        let not_placed = || Error::UnknownCopyNumber {
            collection: CRYSTAL_COLLECTION.to_string(),
            copy_number: serial,
        };
        let crystal = self
            .store
            .daughters(segment_volume)
            .find(|p| p.volume == self.unit_volumes[0] && p.copy_number == serial)
            .ok_or_else(not_placed)?;
        let segment = self
            .store
            .daughters(self.world)
            .find(|p| p.volume == segment_volume)
            .ok_or_else(not_placed)?;
        Ok(segment.transform.transform_point3(crystal.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: DVec3, b: DVec3, tol: f64) -> bool {
        (a - b).length() < tol
    }

    #[test]
    fn test_inscribed_radius_fallbacks() {
        assert_eq!(compute_inscribed_radius(1, 27.5, 1).unwrap(), 150.0);
        assert_eq!(compute_inscribed_radius(1, 99.0, 7).unwrap(), 150.0);
        assert_eq!(compute_inscribed_radius(2, 27.5, 3).unwrap(), 100.0);
        assert_eq!(
            compute_inscribed_radius(0, 27.5, 1),
            Err(Error::InvalidSegmentCount(0))
        );
    }

    #[test]
    fn test_inscribed_radius_formula() {
        let h = 27.5;
        let r = compute_inscribed_radius(15, h, 1).unwrap();
        assert!((r - h / (PI / 15.0).tan()).abs() < 1e-12);
        assert!((r - 129.375).abs() < 0.01);
        let r2 = compute_inscribed_radius(15, h, 2).unwrap();
        assert!((r2 - 2.0 * r).abs() < 1e-9);
    }

    #[test]
    fn test_canonical_build() {
        let geometry = build_array(&ArraySpec::default()).unwrap();
        assert_eq!(geometry.total_crystals(), 45);
        assert_eq!(geometry.registry().len(), 45);
        assert_eq!(geometry.segment_half(), DVec3::new(85.5, 27.5, 25.75));
        assert_eq!(geometry.collections(), &[CRYSTAL_COLLECTION.to_string()]);
        assert!(geometry.shield_copy_numbers().is_empty());
        assert_eq!(geometry.flange_half_width(), 29.0);
        // Every crystal sits just outside the inscribed circle
        let r = geometry.inscribed_radius();
        for (_, p) in geometry.registry().iter() {
            let rho = p.truncate().length();
            assert!(rho > r && rho < r + 2.0 * 25.75);
        }
        assert_eq!(
            geometry.store().sensitive_copy_numbers(CRYSTAL_DETECTOR),
            (1..=45).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_single_segment_hand_computed() {
        let spec = ArraySpec {
            segments: 1,
            ..Default::default()
        };
        let geometry = build_array(&spec).unwrap();
        // Segment at (150 + 25.75, 0, 0); local X runs along -Z, local Z outward
        let expected = [
            DVec3::new(175.5, 0.0, 58.0),
            DVec3::new(175.5, 0.0, 0.0),
            DVec3::new(175.5, 0.0, -58.0),
        ];
        for (serial, want) in (1..=3).zip(expected) {
            let got = geometry.registry().by_serial(serial).unwrap();
            assert!(close(got, want, 1e-9), "crystal {serial}: {got} != {want}");
        }
    }

    #[test]
    fn test_registry_matches_placements() {
        let spec = ArraySpec {
            columns: 2,
            ..Default::default()
        };
        let geometry = build_array(&spec).unwrap();
        for serial in 1..=geometry.total_crystals() {
            let recorded = geometry.registry().by_serial(serial).unwrap();
            let placed = geometry.placed_crystal_position(serial).unwrap();
            assert!(close(recorded, placed, 1e-9), "crystal {serial}");
        }
    }

    #[test]
    fn test_numbering_is_segment_major() {
        let geometry = build_array(&ArraySpec::default()).unwrap();
        let (_, phi1, _) = crate::cartesian_to_cylindrical(geometry.registry().by_serial(1).unwrap());
        let (_, phi4, _) = crate::cartesian_to_cylindrical(geometry.registry().by_serial(4).unwrap());
        assert!(phi1.abs() < 1e-9);
        assert!((phi4 - TAU / 15.0).abs() < 1e-9);
        // Rings of one segment step along the beam axis
        let z: Vec<f64> = (1..=3)
            .map(|s| geometry.registry().by_serial(s).unwrap().z)
            .collect();
        assert!((z[0] - z[1] - 58.0).abs() < 1e-9 && (z[1] - z[2] - 58.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let spec = ArraySpec {
            shield: ShieldMode::Bgo,
            insulation_tube: true,
            ..Default::default()
        };
        let a = build_array(&spec).unwrap();
        let b = build_array(&spec).unwrap();
        assert_eq!(a.registry(), b.registry());
        assert_eq!(a.store().placements(), b.store().placements());
    }

    #[test]
    fn test_shield_ring() {
        let spec = ArraySpec {
            shield: ShieldMode::Bgo,
            ..Default::default()
        };
        let geometry = build_array(&spec).unwrap();
        assert_eq!(geometry.shield_copy_numbers(), 100..115);
        assert_eq!(
            geometry.store().sensitive_copy_numbers(SHIELD_DETECTOR),
            (100..115).collect::<Vec<_>>()
        );
        assert_eq!(geometry.collections().len(), 2);
        assert_eq!(geometry.collections()[1], SHIELD_COLLECTION);
    }

    #[test]
    fn test_insulation_tube_clears_segments() {
        let spec = ArraySpec {
            insulation_tube: true,
            ..Default::default()
        };
        let geometry = build_array(&spec).unwrap();
        let tube = geometry.insulation().unwrap();
        assert_eq!(tube.outer_radius, geometry.inscribed_radius());
    }

    #[test]
    fn test_vacuum_chamber_overlaps_are_fatal() {
        let spec = ArraySpec {
            vacuum_chamber: true,
            ..Default::default()
        };
        let err = build_array(&spec).unwrap_err();
        assert!(
            matches!(err, Error::GeometryOverlap { ref volume, .. } if volume.starts_with("vacuumTube")),
            "{err}"
        );

        let unchecked = ArraySpec {
            check_overlaps: false,
            ..spec
        };
        let geometry = build_array(&unchecked).unwrap();
        assert_eq!(geometry.vessel_tubes().len(), 7);
    }

    #[test]
    fn test_flange_grows_to_segment_width() {
        let spec = ArraySpec {
            columns: 2,
            flange_half_width_mm: 29.0,
            check_overlaps: false,
            ..Default::default()
        };
        let geometry = build_array(&spec).unwrap();
        assert_eq!(geometry.flange_half_width(), 55.0);
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let spec = ArraySpec {
            segments: 0,
            ..Default::default()
        };
        assert_eq!(build_array(&spec).unwrap_err(), Error::InvalidSegmentCount(0));

        let spec = ArraySpec {
            crystal_material: CrystalMaterial::Other("G4_PbWO4".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_array(&spec).unwrap_err(),
            Error::UnknownMaterial("G4_PbWO4".to_string())
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_registry_complete(
            segments in 1u32..24,
            rings in 1u32..5,
            columns in 1u32..3,
            gap in 0.0f64..10.0,
        ) {
            let spec = ArraySpec {
                segments,
                rings,
                columns,
                gap_mm: gap,
                check_overlaps: false,
                ..Default::default()
            };
            let geometry = build_array(&spec).unwrap();
            let total = segments * rings * columns;
            prop_assert_eq!(geometry.registry().len(), total as usize);
            for serial in 1..=total {
                let recorded = geometry.registry().by_serial(serial).unwrap();
                let placed = geometry.placed_crystal_position(serial).unwrap();
                prop_assert!(recorded.is_finite());
                prop_assert!((recorded - placed).length() < 1e-9);
            }
        }
    }
}
