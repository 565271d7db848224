//! Elements, materials and the material catalog
//!
//! Materials are immutable once defined and shared through `Arc`, so the
//! same definition can back any number of logical volumes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Chemical element (atomic mass in g/mole)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub symbol: String,
    pub z: u32,
    pub a: f64,
}

impl Element {
    pub fn new(name: &str, symbol: &str, z: u32, a: f64) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            z,
            a,
        }
    }
}

/// How much of an element a material contains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Proportion {
    /// Atoms per formula unit
    Atoms(u32),
    /// Fraction of the total mass (0..=1)
    MassFraction(f64),
}

/// Named material (density in g/cm3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub density: f64,
    pub components: Vec<(Element, Proportion)>,
}

impl Material {
    /// Mass fraction of every component, in definition order
    pub fn mass_fractions(&self) -> Vec<(&str, f64)> {
        let weights: Vec<f64> = self
            .components
            .iter()
            .map(|(element, proportion)| match proportion {
                Proportion::Atoms(n) => *n as f64 * element.a,
                Proportion::MassFraction(f) => *f,
            })
            .collect();
        let total: f64 = weights.iter().sum();
        self.components
            .iter()
            .zip(weights)
            .map(|((element, _), w)| (element.symbol.as_str(), w / total))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let invalid = |detail: String| Error::InvalidMaterial {
            name: self.name.clone(),
            detail,
        };
        if !(self.density > 0.0) {
            return Err(invalid(format!("density must be positive, got {}", self.density)));
        }
        if self.components.is_empty() {
            return Err(invalid("no components".to_string()));
        }
        let by_mass = self
            .components
            .iter()
            .filter(|(_, p)| matches!(p, Proportion::MassFraction(_)))
            .count();
        if by_mass != 0 && by_mass != self.components.len() {
            return Err(invalid("cannot mix atom counts with mass fractions".to_string()));
        }
        for (element, proportion) in &self.components {
            match proportion {
                Proportion::Atoms(0) => {
                    return Err(invalid(format!("zero atoms of {}", element.symbol)));
                }
                Proportion::MassFraction(f) if !(*f > 0.0 && *f <= 1.0) => {
                    return Err(invalid(format!("mass fraction {f} of {}", element.symbol)));
                }
                _ => {}
            }
        }
        if by_mass > 0 {
            let sum: f64 = self
                .components
                .iter()
                .filter_map(|(_, p)| match p {
                    Proportion::MassFraction(f) => Some(*f),
                    Proportion::Atoms(_) => None,
                })
                .sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(invalid(format!("mass fractions sum to {sum}")));
            }
        }
        Ok(())
    }
}

/// Named materials available to the geometry
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    materials: BTreeMap<String, Arc<Material>>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every material the array is built from
    pub fn with_array_materials() -> Result<Self> {
        let mut catalog = Self::new();

        let n = Element::new("Nitrogen", "N", 7, 14.01);
        let o = Element::new("Oxygen", "O", 8, 16.00);
        let br = Element::new("Bromine", "Br", 35, 79.904);
        let al = Element::new("Aluminum", "Al", 13, 26.98);
        let si = Element::new("Silicon", "Si", 14, 28.09);

        // Near-vacuum air filling the world
        catalog.define(
            "Air",
            2.0e-9,
            vec![
                (n, Proportion::MassFraction(0.7)),
                (o.clone(), Proportion::MassFraction(0.3)),
            ],
        )?;
        catalog.define(
            "CeBr3",
            5.1,
            vec![
                (Element::new("Cerium", "Ce", 58, 140.116), Proportion::Atoms(1)),
                (br.clone(), Proportion::Atoms(3)),
            ],
        )?;
        catalog.define(
            "LaBr3",
            5.1,
            vec![
                (Element::new("Lanthanum", "La", 57, 138.9055), Proportion::Atoms(1)),
                (br, Proportion::Atoms(3)),
            ],
        )?;
        catalog.define(
            "TiO2",
            4.23,
            vec![
                (Element::new("Titanium", "Ti", 22, 47.9), Proportion::Atoms(1)),
                (o.clone(), Proportion::Atoms(2)),
            ],
        )?;
        catalog.define("Aluminum_", 2.7, vec![(al, Proportion::Atoms(1))])?;
        catalog.define(
            "Quartz",
            2.66,
            vec![(si, Proportion::Atoms(1)), (o, Proportion::Atoms(2))],
        )?;
        catalog.define(
            "BGO",
            7.13,
            vec![
                (Element::new("Bismuth", "Bi", 83, 208.98), Proportion::Atoms(4)),
                (Element::new("Germanium", "Ge", 32, 72.63), Proportion::Atoms(3)),
                (Element::new("Oxygen", "O", 8, 15.99), Proportion::Atoms(12)),
            ],
        )?;

        for name in ["G4_AIR", "G4_Al", "G4_Galactic"] {
            catalog.find_or_build(name)?;
        }
        Ok(catalog)
    }

    /// Define a new material; redefining a name replaces the old entry
    pub fn define(
        &mut self,
        name: &str,
        density: f64,
        components: Vec<(Element, Proportion)>,
    ) -> Result<Arc<Material>> {
        let material = Material {
            name: name.to_string(),
            density,
            components,
        };
        material.validate()?;
        let material = Arc::new(material);
        if self
            .materials
            .insert(name.to_string(), material.clone())
            .is_some()
        {
            log::warn!("Material '{}' redefined", name);
        }
        Ok(material)
    }

    /// Look up an already defined material
    pub fn get(&self, name: &str) -> Result<Arc<Material>> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMaterial(name.to_string()))
    }

    /// Look up a material, building it from the standard table on first use
    pub fn find_or_build(&mut self, name: &str) -> Result<Arc<Material>> {
        if let Some(material) = self.materials.get(name) {
            return Ok(material.clone());
        }
        let (density, components) =
            standard_material(name).ok_or_else(|| Error::UnknownMaterial(name.to_string()))?;
        self.define(name, density, components)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }
}

/// Standard (NIST) materials the geometry refers to by name
fn standard_material(name: &str) -> Option<(f64, Vec<(Element, Proportion)>)> {
    match name {
        "G4_AIR" => Some((
            1.20479e-3,
            vec![
                (Element::new("Carbon", "C", 6, 12.011), Proportion::MassFraction(0.000124)),
                (Element::new("Nitrogen", "N", 7, 14.007), Proportion::MassFraction(0.755268)),
                (Element::new("Oxygen", "O", 8, 15.999), Proportion::MassFraction(0.231781)),
                (Element::new("Argon", "Ar", 18, 39.948), Proportion::MassFraction(0.012827)),
            ],
        )),
        "G4_Al" => Some((
            2.699,
            vec![(Element::new("Aluminum", "Al", 13, 26.9815), Proportion::Atoms(1))],
        )),
        "G4_Galactic" => Some((
            1.0e-25,
            vec![(Element::new("Hydrogen", "H", 1, 1.008), Proportion::Atoms(1))],
        )),
        _ => None,
    }
}
