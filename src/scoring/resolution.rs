//! Energy resolution model
//!
//! Resolution is a power law in energy, FWHM% = a * E^b with E in keV,
//! turned into a Gaussian sigma through FWHM = 2.355 sigma.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::consts::FWHM_TO_SIGMA;
use crate::settings::CrystalMaterial;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCurve {
    pub a: f64,
    pub b: f64,
}

impl ResolutionCurve {
    pub const CEBR3: Self = Self { a: 94.6, b: -0.476 };
    pub const LABR3: Self = Self { a: 81.0, b: -0.501 };
    /// BGO suppression shields
    pub const BGO: Self = Self { a: 398.0, b: -0.584 };

    /// FWHM in percent of `energy`
    pub fn fwhm_percent(&self, energy: f64) -> f64 {
        self.a * energy.powf(self.b)
    }

    /// Absolute FWHM in keV; zero for non-positive energies
    pub fn fwhm(&self, energy: f64) -> f64 {
        if energy > 0.0 && energy.is_finite() {
            energy * self.fwhm_percent(energy) / 100.0
        } else {
            0.0
        }
    }

    pub fn sigma(&self, energy: f64) -> f64 {
        self.fwhm(energy) / FWHM_TO_SIGMA
    }

    /// Curve for a crystal material; `None` leaves energies unsmeared
    pub fn for_material(material: &CrystalMaterial) -> Option<Self> {
        match material {
            CrystalMaterial::CeBr3 => Some(Self::CEBR3),
            CrystalMaterial::LaBr3 => Some(Self::LABR3),
            CrystalMaterial::Other(_) => None,
        }
    }
}

/// Source of Gaussian samples
pub trait GaussianSource {
    fn gaussian(&mut self, mean: f64, sigma: f64) -> f64;
}

impl<R: Rng + ?Sized> GaussianSource for R {
    fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        if !(sigma > 0.0) {
            return mean;
        }
        match Normal::new(mean, sigma) {
            Ok(normal) => normal.sample(self),
            Err(_) => mean,
        }
    }
}

/// One energy before and after resolution smearing (keV)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smeared {
    pub raw: f64,
    pub energy: f64,
    pub fwhm: f64,
}

/// Smear `raw` with `curve`; without a curve the raw energy passes through
pub fn smear<G: GaussianSource + ?Sized>(
    source: &mut G,
    curve: Option<ResolutionCurve>,
    raw: f64,
) -> Smeared {
    match curve {
        Some(curve) => {
            let sigma = curve.sigma(raw);
            Smeared {
                raw,
                energy: if sigma > 0.0 { source.gaussian(raw, sigma) } else { raw },
                fwhm: curve.fwhm(raw),
            }
        }
        None => Smeared {
            raw,
            energy: raw,
            fwhm: 0.0,
        },
    }
}
