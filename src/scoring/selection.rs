//! Selection groups: crystal subsets scored into their own channels
//!
//! Membership is derived from the crystal's ring and segment, so a group is
//! a rule rather than a list of copy numbers. A group may state how many
//! members it expects; a layout that yields a different count is rejected
//! before any event is scored.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionRule {
    /// Every crystal is a member
    KeepAll,
    /// Drop one ring (0 = first along the local X axis) in every segment
    ExcludeRing { ring: u32 },
    /// Drop one ring in the first `segments` segments only
    ExcludeRingInSegments { ring: u32, segments: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionGroup {
    pub name: String,
    pub rule: ExclusionRule,
    /// Member count the group was designed for
    pub expected_members: Option<u32>,
}

impl SelectionGroup {
    pub fn new(name: &str, rule: ExclusionRule, expected_members: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            rule,
            expected_members,
        }
    }

    /// Whether crystal `serial` belongs to the group
    pub fn contains(&self, layout: &Layout, serial: u32) -> bool {
        let Some(index) = layout.index(serial) else {
            return false;
        };
        match self.rule {
            ExclusionRule::KeepAll => true,
            ExclusionRule::ExcludeRing { ring } => index.ring != ring,
            ExclusionRule::ExcludeRingInSegments { ring, segments } => {
                index.ring != ring || index.segment >= segments
            }
        }
    }

    pub fn members(&self, layout: &Layout) -> Vec<u32> {
        layout
            .serials()
            .filter(|&serial| self.contains(layout, serial))
            .collect()
    }

    pub fn validate(&self, layout: &Layout) -> Result<()> {
        let mismatch = |detail: String| Error::SelectionMismatch {
            group: self.name.clone(),
            detail,
        };
        match self.rule {
            ExclusionRule::KeepAll => {}
            ExclusionRule::ExcludeRing { ring } => {
                if ring >= layout.rings {
                    return Err(mismatch(format!(
                        "ring {ring} does not exist in a layout of {} rings",
                        layout.rings
                    )));
                }
            }
            ExclusionRule::ExcludeRingInSegments { ring, segments } => {
                if ring >= layout.rings {
                    return Err(mismatch(format!(
                        "ring {ring} does not exist in a layout of {} rings",
                        layout.rings
                    )));
                }
                if segments > layout.segments {
                    return Err(mismatch(format!(
                        "rule covers {segments} segments but the array has {}",
                        layout.segments
                    )));
                }
            }
        }
        if let Some(expected) = self.expected_members {
            let count = self.members(layout).len() as u32;
            if count != expected {
                return Err(mismatch(format!(
                    "expected {expected} members, layout gives {count}"
                )));
            }
        }
        Ok(())
    }
}

/// The two grouped channels scored next to the full array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionGroups {
    pub primary: SelectionGroup,
    pub secondary: SelectionGroup,
}

impl Default for SelectionGroups {
    /// The 15 x 3 array without its third ring, and without the third ring of
    /// its first five segments
    fn default() -> Self {
        Self {
            primary: SelectionGroup::new("30-crystal", ExclusionRule::ExcludeRing { ring: 2 }, Some(30)),
            secondary: SelectionGroup::new(
                "40-crystal",
                ExclusionRule::ExcludeRingInSegments { ring: 2, segments: 5 },
                Some(40),
            ),
        }
    }
}

impl SelectionGroups {
    pub fn validate(&self, layout: &Layout) -> Result<()> {
        self.primary.validate(layout)?;
        self.secondary.validate(layout)
    }
}
