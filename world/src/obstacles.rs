//! Read-only obstacle mask consulted by enemy movement policies.

use std::collections::BTreeSet;

use gridturn_core::{CellCoord, ObstacleQuery, Occupancy, Quat, Vec3};

/// Largest number of cells a single probe may cover before it is rejected.
const MAX_PROBED_CELLS: f64 = 4_096.0;

/// Shrinks probe bounds so boxes that merely touch a neighbouring tile do not
/// report it as overlapped.
const CONTACT_EPSILON: f32 = 1e-3;

/// Set of blocked cells implementing [`ObstacleQuery`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObstacleMask {
    blocked: BTreeSet<CellCoord>,
}

impl ObstacleMask {
    /// Creates a mask from the provided blocked cells.
    #[must_use]
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        Self {
            blocked: cells.into_iter().collect(),
        }
    }

    /// Reports whether the provided cell blocks movement.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.blocked.contains(&cell)
    }

    /// Number of distinct blocked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocked.len()
    }
}

impl ObstacleQuery for ObstacleMask {
    fn probe(&self, center: Vec3, half_extents: Vec3, rotation: Quat) -> Occupancy {
        if !center.is_finite() || !half_extents.is_finite() || !rotation.is_finite() {
            return Occupancy::Indeterminate;
        }

        let extents = rotated_extents(half_extents.abs(), rotation);
        let min = (center - extents + Vec3::splat(CONTACT_EPSILON)).round();
        let max = (center + extents - Vec3::splat(CONTACT_EPSILON)).round();
        let min = min.min(center.round());
        let max = max.max(center.round());

        let span = (max - min) + Vec3::ONE;
        let covered = f64::from(span.x) * f64::from(span.y) * f64::from(span.z);
        if covered > MAX_PROBED_CELLS {
            return Occupancy::Indeterminate;
        }

        for x in min.x as i32..=max.x as i32 {
            for y in min.y as i32..=max.y as i32 {
                for z in min.z as i32..=max.z as i32 {
                    if self.is_blocked(CellCoord::new(x, y, z)) {
                        return Occupancy::Occupied;
                    }
                }
            }
        }

        Occupancy::Free
    }
}

/// Half extents of the axis-aligned box enclosing the rotated probe.
fn rotated_extents(half_extents: Vec3, rotation: Quat) -> Vec3 {
    let axes = [
        rotation * Vec3::X * half_extents.x,
        rotation * Vec3::Y * half_extents.y,
        rotation * Vec3::Z * half_extents.z,
    ];
    axes.iter().fold(Vec3::ZERO, |acc, axis| acc + axis.abs())
}
