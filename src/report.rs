//! Construction report
//!
//! Human-readable summary printed once the array is built: materials, unit
//! dimensions, counts and the world position of every crystal.

use std::fmt;

use glam::DVec3;

use crate::geometry::ArrayGeometry;

const RULE: &str = "$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$";
const MARK: &str = "$$$$";

pub struct ConstructionReport<'g> {
    geometry: &'g ArrayGeometry,
}

impl<'g> ConstructionReport<'g> {
    pub fn new(geometry: &'g ArrayGeometry) -> Self {
        Self { geometry }
    }
}

fn dims(half: DVec3) -> String {
    format!("{}mmx{}mmx{}mm", half.x * 2.0, half.y * 2.0, half.z * 2.0)
}

fn point(p: DVec3) -> String {
    // Clear the sign of rounded zeros
    let c = |v: f64| {
        let r = (v * 1000.0).round() / 1000.0;
        if r == 0.0 { 0.0 } else { r }
    };
    format!("({},{},{})", c(p.x), c(p.y), c(p.z))
}

impl fmt::Display for ConstructionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.geometry;
        let unit = g.unit();
        let walls = unit.walls;
        let layout = g.layout();

        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "{MARK}")?;
        writeln!(f, "{MARK} Crystal material: {}", unit.crystal.material.name)?;
        writeln!(f, "{MARK} Reflector material: {}", unit.reflector.material.name)?;
        writeln!(f, "{MARK} Housing material: {}", unit.housing.material.name)?;
        writeln!(f, "{MARK} Optic window material: {}", unit.window.material.name)?;
        writeln!(f, "{MARK}")?;
        writeln!(f, "{MARK} Single crystal dimensions: {}", dims(unit.crystal.half))?;
        writeln!(
            f,
            "{MARK} Dimensions of the crystal housing: {}",
            dims(unit.housing.half)
        )?;
        writeln!(f, "{MARK} Housing wall thickness: {}mm", walls.housing_wall)?;
        writeln!(f, "{MARK} Housing window thickness: {}mm", walls.housing_front)?;
        writeln!(
            f,
            "{MARK} Reflecting material wall thickness: {}mm",
            walls.reflector_wall
        )?;
        writeln!(
            f,
            "{MARK} Reflecting material thickness in front of the window: {}mm",
            walls.reflector_front
        )?;
        writeln!(f, "{MARK}")?;
        writeln!(f, "{MARK} Number of segments in the array: {}", layout.segments)?;
        writeln!(f, "{MARK} Number of crystals in the segment row: {}", layout.rings)?;
        writeln!(
            f,
            "{MARK} Number of crystals in the segment column: {}",
            layout.columns
        )?;
        writeln!(f, "{MARK} Number of crystals in the array: {}", layout.total())?;
        writeln!(
            f,
            "{MARK} Segment width: {}mm",
            unit.housing.half.y * layout.columns as f64 * 2.0
        )?;
        writeln!(f, "{MARK}")?;
        writeln!(
            f,
            "{MARK} Radius of a circle inscribed in the array: {}mm",
            g.inscribed_radius()
        )?;
        writeln!(f, "{MARK}")?;
        if g.spec().vacuum_chamber {
            writeln!(f, "{MARK} Vacuum chamber tubes: {}", g.vessel_tubes().len())?;
            writeln!(f, "{MARK} Flange width: {}mm", g.flange_half_width() * 2.0)?;
        }
        writeln!(f, "{MARK}")?;
        if let Some(tube) = g.insulation() {
            writeln!(f, "{MARK} Insulator material: G4_Al")?;
            writeln!(
                f,
                "{MARK} Insulator thickness: {}mm",
                g.spec().insulation_tube_thickness_mm
            )?;
            writeln!(f, "{MARK} Insulator tube outer radius: {}mm", tube.outer_radius)?;
            writeln!(f, "{MARK} Insulator tube inner radius: {}mm", tube.inner_radius)?;
        }
        if g.shield_mode().is_enabled() {
            writeln!(
                f,
                "{MARK} Compton suppression blocks: {} (copy numbers {}..{})",
                layout.segments,
                g.shield_copy_numbers().start,
                g.shield_copy_numbers().end - 1
            )?;
        }
        writeln!(f, "{MARK}")?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;
        writeln!(f, "Positions of the crystal centers in the world:")?;
        for (serial, position) in g.registry().iter() {
            writeln!(f, "CrystNb{}: {}", serial, point(position))?;
        }
        writeln!(f)
    }
}
