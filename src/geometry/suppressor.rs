//! Compton suppression ring
//!
//! One BGO block sits in each gap between neighbouring segments. The block is
//! a box with its two inner corners cut away along the side planes of the
//! adjacent segments, so the ring closes around the array without overlap.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::DVec3;

use super::material::Material;
use super::shape::Shape;
use super::transform::{Rotation, rotated_about_z};
use super::volume::{VolumeId, VolumeStore};
use crate::consts::SHIELD_COPY_OFFSET;
use crate::error::Result;
use crate::polar_to_cartesian;

/// Radial half-extent of a shield block (117 / 2 in integer arithmetic)
pub const SHIELD_HALF_RADIAL: f64 = 58.0;
/// Tangential half-extent of a shield block
pub const SHIELD_HALF_WIDTH: f64 = 30.0;
/// Half-length of the cut boxes along their long axis
const CUT_HALF_LENGTH: f64 = 200.0;

pub const SHIELD_VOLUME: &str = "ComptSuppTrap";

/// Shield block half-length along the beam: three housings plus the gap
pub fn shield_half_length(housing_half_x: f64, gap: f64) -> f64 {
    3.0 * housing_half_x + gap
}

/// BGO block with both inner corners removed for a ring of `segments`
pub fn shield_shape(segments: u32, half_length: f64) -> Result<Shape> {
    let half_dphi = TAU / segments as f64 / 2.0;
    let block = Shape::make_box(
        SHIELD_VOLUME,
        DVec3::new(SHIELD_HALF_RADIAL, SHIELD_HALF_WIDTH, half_length),
    )?;
    let cut_half = DVec3::new(
        CUT_HALF_LENGTH,
        SHIELD_HALF_WIDTH * half_dphi.cos(),
        2.0 * half_length,
    );
    let up = Shape::make_box("ComptSuppSolidUp", cut_half)?;
    let down = Shape::make_box("ComptSuppSolidDown", cut_half)?;

    let without_up = Shape::make_subtraction(
        block,
        up,
        Rotation::IDENTITY
            .rotate_z(half_dphi)
            .then_translate(DVec3::new(-SHIELD_HALF_RADIAL, SHIELD_HALF_WIDTH, 0.0)),
    );
    Ok(Shape::make_subtraction(
        without_up,
        down,
        Rotation::IDENTITY
            .rotate_z(-half_dphi)
            .then_translate(DVec3::new(-SHIELD_HALF_RADIAL, -SHIELD_HALF_WIDTH, 0.0)),
    ))
}

/// Place one shield per segment gap around radius `r`; copies start at 100
pub fn place_shields(
    store: &mut VolumeStore,
    world: VolumeId,
    material: &Arc<Material>,
    segments: u32,
    r: f64,
    half_length: f64,
    check_overlaps: bool,
) -> Result<VolumeId> {
    let dphi = TAU / segments as f64;
    let half_dphi = dphi / 2.0;
    let id = store.add_volume(
        SHIELD_VOLUME,
        shield_shape(segments, half_length)?,
        material.clone(),
    );
    let radius = SHIELD_HALF_RADIAL + r / half_dphi.cos();
    for i in 0..segments {
        let angle = half_dphi + i as f64 * dphi;
        store.place(
            "ComptSuppTrapPl",
            id,
            Some(world),
            rotated_about_z(angle, polar_to_cartesian(radius, angle)),
            SHIELD_COPY_OFFSET + i,
            check_overlaps,
        );
    }
    log::info!(
        "Compton suppression ring: {} BGO blocks at {:.2} mm",
        segments,
        radius
    );
    Ok(id)
}
