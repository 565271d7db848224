//! Solid primitives
//!
//! Every shape is described in its own local frame, centred on the origin:
//! - Box: half-extents along X, Y, Z
//! - Tube: cylindrical shell around Z, optionally an angular sector
//! - Polyhedron: regular polygonal shell around Z with a z-profile table
//! - Subtraction: base minus a subtrahend placed by a rigid transform
//!
//! Shapes can classify points (inside / surface / outside) and produce
//! deterministic surface samples, which is all the overlap check needs.

use std::f64::consts::TAU;

use glam::{DAffine3, DVec2, DVec3};

use crate::consts::GEOMETRY_TOLERANCE;
use crate::error::{Error, Result};

/// Where a point sits relative to a solid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Inside,
    Surface,
    Outside,
}

impl Location {
    /// Classify a signed distance (negative inside)
    fn from_distance(d: f64) -> Self {
        if d > GEOMETRY_TOLERANCE {
            Location::Outside
        } else if d < -GEOMETRY_TOLERANCE {
            Location::Inside
        } else {
            Location::Surface
        }
    }
}

/// One row of a polyhedron's radial profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZPlane {
    pub z: f64,
    /// Distance from the axis to the inner faces
    pub inner: f64,
    /// Distance from the axis to the outer faces
    pub outer: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box {
        half: DVec3,
    },
    Tube {
        inner_radius: f64,
        outer_radius: f64,
        half_length: f64,
        start_phi: f64,
        delta_phi: f64,
    },
    Polyhedron {
        start_phi: f64,
        delta_phi: f64,
        sides: u32,
        planes: Vec<ZPlane>,
    },
    Subtraction {
        base: Box<Shape>,
        subtrahend: Box<Shape>,
        /// Subtrahend placement in the base frame
        transform: DAffine3,
        inverse: DAffine3,
    },
}

impl Shape {
    pub fn make_box(name: &str, half: DVec3) -> Result<Self> {
        if !(half.min_element() > 0.0) || !half.is_finite() {
            return Err(Error::dimensions(
                name,
                format!("box half-extents must be positive, got {half}"),
            ));
        }
        Ok(Shape::Box { half })
    }

    /// Cylindrical shell; `delta_phi` of TAU gives a full tube
    pub fn make_tube(
        name: &str,
        inner_radius: f64,
        outer_radius: f64,
        half_length: f64,
        start_phi: f64,
        delta_phi: f64,
    ) -> Result<Self> {
        if !(inner_radius >= 0.0 && outer_radius > inner_radius) {
            return Err(Error::dimensions(
                name,
                format!("tube radii must satisfy 0 <= inner < outer, got {inner_radius} / {outer_radius}"),
            ));
        }
        if !(half_length > 0.0) {
            return Err(Error::dimensions(
                name,
                format!("tube half-length must be positive, got {half_length}"),
            ));
        }
        if !(delta_phi > 0.0 && delta_phi <= TAU) {
            return Err(Error::dimensions(
                name,
                format!("tube angular span must be in (0, 2pi], got {delta_phi}"),
            ));
        }
        Ok(Shape::Tube {
            inner_radius,
            outer_radius,
            half_length,
            start_phi,
            delta_phi,
        })
    }

    /// Full tube around Z
    pub fn make_full_tube(
        name: &str,
        inner_radius: f64,
        outer_radius: f64,
        half_length: f64,
    ) -> Result<Self> {
        Self::make_tube(name, inner_radius, outer_radius, half_length, 0.0, TAU)
    }

    pub fn make_polyhedron(
        name: &str,
        start_phi: f64,
        delta_phi: f64,
        sides: u32,
        planes: Vec<ZPlane>,
    ) -> Result<Self> {
        if sides < 1 {
            return Err(Error::dimensions(name, "polyhedron needs at least one side"));
        }
        if planes.len() < 2 {
            return Err(Error::dimensions(name, "polyhedron needs at least two z-planes"));
        }
        if !(delta_phi > 0.0 && delta_phi <= TAU) {
            return Err(Error::dimensions(
                name,
                format!("polyhedron angular span must be in (0, 2pi], got {delta_phi}"),
            ));
        }
        if planes.windows(2).any(|w| !(w[1].z >= w[0].z)) {
            return Err(Error::dimensions(name, "polyhedron z-planes must be ordered in z"));
        }
        if planes[planes.len() - 1].z <= planes[0].z {
            return Err(Error::dimensions(name, "polyhedron has no extent in z"));
        }
        if let Some(p) = planes
            .iter()
            .find(|p| !(p.inner >= 0.0 && p.outer >= p.inner))
        {
            return Err(Error::dimensions(
                name,
                format!("polyhedron radii at z={} must satisfy 0 <= inner <= outer", p.z),
            ));
        }
        Ok(Shape::Polyhedron {
            start_phi,
            delta_phi,
            sides,
            planes,
        })
    }

    /// `base` minus `subtrahend`, the latter placed in the base frame by `transform`
    pub fn make_subtraction(base: Shape, subtrahend: Shape, transform: DAffine3) -> Self {
        Shape::Subtraction {
            base: Box::new(base),
            subtrahend: Box::new(subtrahend),
            transform,
            inverse: transform.inverse(),
        }
    }

    /// Radius of a sphere about the local origin enclosing the solid
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Shape::Box { half } => half.length(),
            Shape::Tube {
                outer_radius,
                half_length,
                ..
            } => outer_radius.hypot(*half_length),
            Shape::Polyhedron {
                delta_phi,
                sides,
                planes,
                ..
            } => {
                let corner = 1.0 / (0.5 * delta_phi / *sides as f64).cos();
                planes
                    .iter()
                    .map(|p| (p.outer * corner).hypot(p.z))
                    .fold(0.0, f64::max)
            }
            Shape::Subtraction { base, .. } => base.bounding_radius(),
        }
    }

    /// Classify a point given in the shape's local frame
    pub fn locate(&self, p: DVec3) -> Location {
        match self {
            Shape::Box { half } => Location::from_distance((p.abs() - *half).max_element()),
            Shape::Tube {
                inner_radius,
                outer_radius,
                half_length,
                start_phi,
                delta_phi,
            } => {
                let rho = p.truncate().length();
                let mut d = (p.z.abs() - half_length).max(rho - outer_radius);
                if *inner_radius > 0.0 {
                    d = d.max(inner_radius - rho);
                }
                if *delta_phi < TAU {
                    d = d.max(sector_distance(p.truncate(), *start_phi, *delta_phi));
                }
                Location::from_distance(d)
            }
            Shape::Polyhedron {
                start_phi,
                delta_phi,
                sides,
                planes,
            } => {
                let z_lo = planes[0].z;
                let z_hi = planes[planes.len() - 1].z;
                let mut d = (z_lo - p.z).max(p.z - z_hi);
                if d > GEOMETRY_TOLERANCE {
                    return Location::Outside;
                }
                let xy = p.truncate();
                let (inner, outer) = profile_at(planes, p.z.clamp(z_lo, z_hi));
                let width = delta_phi / *sides as f64;
                let offset = wrap_angle(xy.y.atan2(xy.x) - start_phi);
                let sector = ((offset / width).floor() as i64).clamp(0, *sides as i64 - 1);
                let centre = start_phi + (sector as f64 + 0.5) * width;
                let perp = xy.dot(DVec2::new(centre.cos(), centre.sin()));
                d = d.max(perp - outer);
                if inner > 0.0 {
                    d = d.max(inner - perp);
                }
                if *delta_phi < TAU {
                    d = d.max(sector_distance(xy, *start_phi, *delta_phi));
                }
                Location::from_distance(d)
            }
            Shape::Subtraction {
                base,
                subtrahend,
                inverse,
                ..
            } => {
                let a = base.locate(p);
                if a == Location::Outside {
                    return Location::Outside;
                }
                match (a, subtrahend.locate(inverse.transform_point3(p))) {
                    (_, Location::Inside) => Location::Outside,
                    (Location::Inside, Location::Outside) => Location::Inside,
                    _ => Location::Surface,
                }
            }
        }
    }

    /// Deterministic points on the solid's surface, roughly `samples` of them
    pub fn surface_points(&self, samples: usize) -> Vec<DVec3> {
        let samples = samples.max(1);
        match self {
            Shape::Box { half } => {
                let n = grid_size(samples, 6);
                let mut points = Vec::with_capacity(6 * n * n);
                for axis in 0..3 {
                    let (j, k) = ((axis + 1) % 3, (axis + 2) % 3);
                    for sign in [-1.0, 1.0] {
                        for u in cell_centres(n, -half[j], half[j]) {
                            for v in cell_centres(n, -half[k], half[k]) {
                                let mut p = DVec3::ZERO;
                                p[axis] = sign * half[axis];
                                p[j] = u;
                                p[k] = v;
                                points.push(p);
                            }
                        }
                    }
                }
                points
            }
            Shape::Tube {
                inner_radius,
                outer_radius,
                half_length,
                start_phi,
                delta_phi,
            } => {
                let (rmin, rmax, dz) = (*inner_radius, *outer_radius, *half_length);
                let (phi0, phi1) = (*start_phi, start_phi + delta_phi);
                let open = *delta_phi < TAU;
                let faces = 3 + usize::from(rmin > 0.0) + 2 * usize::from(open);
                let n = grid_size(samples, faces);
                let mut points = Vec::with_capacity(faces * n * n);

                for phi in cell_centres(n, phi0, phi1) {
                    let dir = DVec2::new(phi.cos(), phi.sin());
                    for z in cell_centres(n, -dz, dz) {
                        points.push((dir * rmax).extend(z));
                        if rmin > 0.0 {
                            points.push((dir * rmin).extend(z));
                        }
                    }
                    for r in cell_centres(n, rmin, rmax) {
                        points.push((dir * r).extend(-dz));
                        points.push((dir * r).extend(dz));
                    }
                }
                if open {
                    for phi in [phi0, phi1] {
                        let dir = DVec2::new(phi.cos(), phi.sin());
                        for r in cell_centres(n, rmin, rmax) {
                            for z in cell_centres(n, -dz, dz) {
                                points.push((dir * r).extend(z));
                            }
                        }
                    }
                }
                points
            }
            Shape::Polyhedron {
                start_phi,
                delta_phi,
                sides,
                planes,
            } => {
                let width = delta_phi / *sides as f64;
                let half_tan = (0.5 * width).tan();
                let sections = planes.windows(2).filter(|w| w[1].z > w[0].z).count();
                let n = grid_size(samples, *sides as usize * (2 * sections + 2));
                let mut points = Vec::new();

                for side in 0..*sides {
                    let centre = start_phi + (side as f64 + 0.5) * width;
                    let normal = DVec2::new(centre.cos(), centre.sin());
                    let tangent = normal.perp();
                    let at = |perp: f64, u: f64, z: f64| {
                        (normal * perp + tangent * (u * perp * half_tan)).extend(z)
                    };

                    for w in planes.windows(2).filter(|w| w[1].z > w[0].z) {
                        for z in cell_centres(n, w[0].z, w[1].z) {
                            let t = (z - w[0].z) / (w[1].z - w[0].z);
                            let inner = w[0].inner + t * (w[1].inner - w[0].inner);
                            let outer = w[0].outer + t * (w[1].outer - w[0].outer);
                            for u in cell_centres(n, -1.0, 1.0) {
                                points.push(at(outer, u, z));
                                if inner > 0.0 {
                                    points.push(at(inner, u, z));
                                }
                            }
                        }
                    }
                    for cap in [planes[0], planes[planes.len() - 1]] {
                        for perp in cell_centres(n, cap.inner, cap.outer) {
                            for u in cell_centres(n, -1.0, 1.0) {
                                points.push(at(perp, u, cap.z));
                            }
                        }
                    }
                }
                points
            }
            Shape::Subtraction {
                base,
                subtrahend,
                transform,
                inverse,
            } => {
                let mut points: Vec<DVec3> = base
                    .surface_points(samples)
                    .into_iter()
                    .filter(|p| subtrahend.locate(inverse.transform_point3(*p)) != Location::Inside)
                    .collect();
                points.extend(
                    subtrahend
                        .surface_points(samples)
                        .into_iter()
                        .map(|p| transform.transform_point3(p))
                        .filter(|p| base.locate(*p) == Location::Inside),
                );
                points
            }
        }
    }
}

/// Grid points per side so `faces` square grids total about `samples`
fn grid_size(samples: usize, faces: usize) -> usize {
    ((samples as f64 / faces.max(1) as f64).sqrt().ceil() as usize).max(1)
}

/// Centres of `n` equal cells spanning [lo, hi]
fn cell_centres(n: usize, lo: f64, hi: f64) -> impl Iterator<Item = f64> {
    let step = (hi - lo) / n as f64;
    (0..n).map(move |i| lo + (i as f64 + 0.5) * step)
}

/// Angle folded into [0, 2pi)
fn wrap_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Signed distance to an angular sector [start, start + span] in the XY plane
fn sector_distance(xy: DVec2, start: f64, span: f64) -> f64 {
    let rho = xy.length();
    if rho <= GEOMETRY_TOLERANCE {
        return 0.0;
    }
    let offset = wrap_angle(xy.y.atan2(xy.x) - start);
    if offset <= span {
        let to_edge = offset.min(span - offset).min(std::f64::consts::FRAC_PI_2);
        -rho * to_edge.sin()
    } else {
        let past = (offset - span).min(TAU - offset).min(std::f64::consts::FRAC_PI_2);
        rho * past.sin()
    }
}

/// Inner and outer face distance at height z (z within the profile)
fn profile_at(planes: &[ZPlane], z: f64) -> (f64, f64) {
    for w in planes.windows(2) {
        if z >= w[0].z && z <= w[1].z && w[1].z > w[0].z {
            let t = (z - w[0].z) / (w[1].z - w[0].z);
            return (
                w[0].inner + t * (w[1].inner - w[0].inner),
                w[0].outer + t * (w[1].outer - w[0].outer),
            );
        }
    }
    let last = planes[planes.len() - 1];
    (last.inner, last.outer)
}
