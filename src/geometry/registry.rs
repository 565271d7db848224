//! Crystal serial numbering and the world-frame position table
//!
//! Serial numbers are 1-based. Within a segment the ring index (along the
//! beam) advances fastest, then the column; segments are outermost.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of the crystal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub segments: u32,
    pub rings: u32,
    pub columns: u32,
}

/// Position of one crystal in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrystalIndex {
    pub segment: u32,
    pub column: u32,
    pub ring: u32,
}

impl Layout {
    pub fn per_segment(&self) -> u32 {
        self.rings.saturating_mul(self.columns)
    }

    /// Crystal count, `None` when it does not fit a copy number
    pub fn checked_total(&self) -> Option<u32> {
        self.rings.checked_mul(self.columns)?.checked_mul(self.segments)
    }

    /// Crystal count, saturating at `u32::MAX`
    ///
    /// Layouts of a validated `ArraySpec` never saturate.
    pub fn total(&self) -> u32 {
        self.checked_total().unwrap_or(u32::MAX)
    }

    /// Grid index of a crystal serial, `None` outside 1..=total
    pub fn index(&self, serial: u32) -> Option<CrystalIndex> {
        if serial == 0 || serial > self.total() {
            return None;
        }
        let i = serial - 1;
        Some(CrystalIndex {
            segment: i / self.per_segment(),
            column: (i / self.rings) % self.columns,
            ring: i % self.rings,
        })
    }

    pub fn serial(&self, index: CrystalIndex) -> u32 {
        index.segment * self.per_segment() + index.column * self.rings + index.ring + 1
    }

    /// Every serial in numbering order
    pub fn serials(&self) -> impl Iterator<Item = u32> {
        1..=self.total()
    }
}

/// World-frame centre of every crystal, indexed by serial - 1
#[derive(Debug, Clone, PartialEq)]
pub struct CrystalPositionRegistry {
    positions: Box<[DVec3]>,
}

impl CrystalPositionRegistry {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<DVec3> {
        self.positions
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.positions.len(),
            })
    }

    /// Position of crystal `serial` (1-based)
    pub fn by_serial(&self, serial: u32) -> Result<DVec3> {
        match (serial as usize).checked_sub(1) {
            Some(index) => self.get(index),
            None => Err(Error::IndexOutOfRange {
                index: 0,
                len: self.positions.len(),
            }),
        }
    }

    /// (serial, position) pairs in serial order
    pub fn iter(&self) -> impl Iterator<Item = (u32, DVec3)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u32 + 1, *p))
    }

    pub fn as_slice(&self) -> &[DVec3] {
        &self.positions
    }
}

/// Write-once slots filled while segments are placed
#[derive(Debug, Clone)]
pub(crate) struct RegistryBuilder {
    slots: Vec<Option<DVec3>>,
}

impl RegistryBuilder {
    pub fn new(total: usize) -> Self {
        Self {
            slots: vec![None; total],
        }
    }

    pub fn record(&mut self, index: usize, position: DVec3) -> Result<()> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(position);
                Ok(())
            }
            Some(Some(_)) => Err(Error::dimensions(
                "crystal registry",
                format!("slot {index} written twice"),
            )),
            None => Err(Error::IndexOutOfRange { index, len }),
        }
    }

    pub fn finish(self) -> Result<CrystalPositionRegistry> {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            return Err(Error::dimensions(
                "crystal registry",
                format!("slot {index} never written"),
            ));
        }
        Ok(CrystalPositionRegistry {
            positions: self.slots.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CANONICAL: Layout = Layout {
        segments: 15,
        rings: 3,
        columns: 1,
    };

    #[test]
    fn test_canonical_indexing() {
        assert_eq!(CANONICAL.total(), 45);
        assert_eq!(CANONICAL.checked_total(), Some(45));
        assert_eq!(
            CANONICAL.index(1),
            Some(CrystalIndex { segment: 0, column: 0, ring: 0 })
        );
        assert_eq!(
            CANONICAL.index(3),
            Some(CrystalIndex { segment: 0, column: 0, ring: 2 })
        );
        assert_eq!(
            CANONICAL.index(45),
            Some(CrystalIndex { segment: 14, column: 0, ring: 2 })
        );
        assert_eq!(CANONICAL.index(0), None);
        assert_eq!(CANONICAL.index(46), None);
    }

    #[test]
    fn test_builder_rejects_double_write_and_gaps() {
        let mut builder = RegistryBuilder::new(2);
        builder.record(0, DVec3::X).unwrap();
        assert!(builder.record(0, DVec3::Y).is_err());
        assert_eq!(
            builder.record(2, DVec3::Y),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(builder.clone().finish().is_err());

        builder.record(1, DVec3::Z).unwrap();
        let registry = builder.finish().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_serial(2).unwrap(), DVec3::Z);
        assert_eq!(
            registry.get(5),
            Err(Error::IndexOutOfRange { index: 5, len: 2 })
        );
        assert!(registry.by_serial(0).is_err());
    }

    #[test]
    fn test_oversized_layout_has_no_total() {
        let layout = Layout {
            segments: 70_000,
            rings: 70_000,
            columns: 1,
        };
        assert_eq!(layout.checked_total(), None);
        assert_eq!(layout.total(), u32::MAX);
        assert_eq!(layout.per_segment(), 70_000);
    }

    proptest! {
        #[test]
        fn prop_serial_index_round_trip(
            segments in 1u32..20,
            rings in 1u32..6,
            columns in 1u32..4,
            pick in 0u32..10_000,
        ) {
            let layout = Layout { segments, rings, columns };
            let serial = pick % layout.total() + 1;
            let index = layout.index(serial).unwrap();
            prop_assert!(index.segment < segments);
            prop_assert!(index.column < columns);
            prop_assert!(index.ring < rings);
            prop_assert_eq!(layout.serial(index), serial);
        }
    }
}
