//! Collision Detection
//!
//! Broad phase: a uniform grid rebuilt once per tick, queried with
//! axis-aligned rectangles. Narrow phase: circle overlap on squared
//! distances. Query results come back in ascending handle order so the
//! first hit is the same on every run.

use std::collections::BTreeMap;

use crate::core::fixed::{Fixed, WideFixed, FIXED_SCALE};
use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityHandle;

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(
    pos_a: FixedVec2,
    radius_a: Fixed,
    pos_b: FixedVec2,
    radius_b: Fixed,
) -> bool {
    let combined = radius_a as WideFixed + radius_b as WideFixed;
    let combined_sq = (combined * combined) >> FIXED_SCALE;
    pos_a.distance_squared(pos_b) <= combined_sq
}

/// Spatial query consumed by the simulation.
pub trait CollisionIndex {
    /// Handles whose bounding box overlaps the rectangle at (`x`, `y`)
    /// with size (`w`, `h`), ascending and deduplicated.
    fn retrieve(&self, x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> Vec<EntityHandle>;
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Aabb {
    min_x: WideFixed,
    min_y: WideFixed,
    max_x: WideFixed,
    max_y: WideFixed,
}

impl Aabb {
    fn around(position: FixedVec2, radius: Fixed) -> Self {
        let r = radius.max(0) as WideFixed;
        Self {
            min_x: position.x as WideFixed - r,
            min_y: position.y as WideFixed - r,
            max_x: position.x as WideFixed + r,
            max_y: position.y as WideFixed + r,
        }
    }

    fn rect(x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> Self {
        Self {
            min_x: x as WideFixed,
            min_y: y as WideFixed,
            max_x: x as WideFixed + w.max(0) as WideFixed,
            max_y: y as WideFixed + h.max(0) as WideFixed,
        }
    }

    fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Uniform grid over the world.
///
/// Boxes spanning more than `MAX_CELLS_PER_AXIS` cells on either axis are
/// kept in a side list checked by every query, and queries that wide scan
/// every entry instead of walking cells.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: WideFixed,
    cells: BTreeMap<(i64, i64), Vec<(EntityHandle, Aabb)>>,
    oversized: Vec<(EntityHandle, Aabb)>,
    entries: Vec<(EntityHandle, Aabb)>,
}

impl SpatialGrid {
    /// Widest span, in cells per axis, walked cell by cell.
    const MAX_CELLS_PER_AXIS: i64 = 64;

    /// Empty grid with square cells of `cell_size` units.
    pub fn new(cell_size: Fixed) -> Self {
        Self {
            cell_size: (cell_size as WideFixed).max(1),
            cells: BTreeMap::new(),
            oversized: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.oversized.clear();
        self.entries.clear();
    }

    /// Number of inserted entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a circle.
    pub fn insert(&mut self, handle: EntityHandle, position: FixedVec2, radius: Fixed) {
        let bounds = Aabb::around(position, radius);
        self.entries.push((handle, bounds));
        match self.cells_for(&bounds) {
            Some(keys) => {
                for key in keys {
                    self.cells.entry(key).or_default().push((handle, bounds));
                }
            }
            None => self.oversized.push((handle, bounds)),
        }
    }

    fn cell_of(&self, v: WideFixed) -> i64 {
        v.div_euclid(self.cell_size)
    }

    /// Cells covered by `bounds`, or `None` when the span is too wide to walk.
    fn cells_for(&self, bounds: &Aabb) -> Option<Vec<(i64, i64)>> {
        let x0 = self.cell_of(bounds.min_x);
        let y0 = self.cell_of(bounds.min_y);
        let x1 = self.cell_of(bounds.max_x);
        let y1 = self.cell_of(bounds.max_y);
        if x1 - x0 >= Self::MAX_CELLS_PER_AXIS || y1 - y0 >= Self::MAX_CELLS_PER_AXIS {
            return None;
        }

        let mut keys = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                keys.push((cx, cy));
            }
        }
        Some(keys)
    }
}

impl CollisionIndex for SpatialGrid {
    fn retrieve(&self, x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> Vec<EntityHandle> {
        let query = Aabb::rect(x, y, w, h);
        let overlapping = |&&(_, bounds): &&(EntityHandle, Aabb)| bounds.overlaps(&query);

        let mut found: Vec<EntityHandle> = match self.cells_for(&query) {
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.cells.get(key))
                .flatten()
                .chain(self.oversized.iter())
                .filter(overlapping)
                .map(|&(handle, _)| handle)
                .collect(),
            None => self
                .entries
                .iter()
                .filter(overlapping)
                .map(|&(handle, _)| handle)
                .collect(),
        };

        found.sort();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<EntityHandle> {
        let mut arena: SlotMap<EntityHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn test_circles_overlap() {
        let pos_a = FixedVec2::new(0, 0);
        let pos_b = FixedVec2::new(to_fixed(1.0), 0);
        let radius = to_fixed(0.6);

        // Distance 1.0, combined radius 1.2
        assert!(circles_overlap(pos_a, radius, pos_b, radius));

        let pos_c = FixedVec2::new(to_fixed(2.0), 0);
        assert!(!circles_overlap(pos_a, radius, pos_c, radius));
    }

    #[test]
    fn test_circles_overlap_far_apart_does_not_wrap() {
        let a = FixedVec2::from_ints(-900, 0);
        let b = FixedVec2::from_ints(900, 0);
        assert!(!circles_overlap(a, to_fixed(5.0), b, to_fixed(5.0)));
    }

    #[test]
    fn test_grid_retrieve_sorted_and_deduped() {
        let ids = handles(3);
        let mut grid = SpatialGrid::new(to_fixed(10.0));

        // Inserted in reverse; the big one spans many cells
        grid.insert(ids[2], FixedVec2::from_ints(5, 5), to_fixed(30.0));
        grid.insert(ids[1], FixedVec2::from_ints(-3, 2), to_fixed(1.0));
        grid.insert(ids[0], FixedVec2::from_ints(400, 400), to_fixed(1.0));
        assert_eq!(grid.len(), 3);

        let found = grid.retrieve(to_fixed(-10.0), to_fixed(-10.0), to_fixed(20.0), to_fixed(20.0));
        assert_eq!(found, vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_grid_negative_coordinates() {
        let ids = handles(1);
        let mut grid = SpatialGrid::new(to_fixed(10.0));
        grid.insert(ids[0], FixedVec2::from_ints(-55, -55), to_fixed(1.0));

        let hit = grid.retrieve(to_fixed(-57.0), to_fixed(-57.0), to_fixed(4.0), to_fixed(4.0));
        assert_eq!(hit, vec![ids[0]]);

        let miss = grid.retrieve(to_fixed(-40.0), to_fixed(-40.0), to_fixed(4.0), to_fixed(4.0));
        assert!(miss.is_empty());
    }

    #[test]
    fn test_grid_clear() {
        let ids = handles(1);
        let mut grid = SpatialGrid::new(to_fixed(10.0));
        grid.insert(ids[0], FixedVec2::ZERO, to_fixed(1.0));
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.retrieve(-FIXED_ONE, -FIXED_ONE, 2 * FIXED_ONE, 2 * FIXED_ONE).is_empty());
    }

    #[test]
    fn test_grid_wide_query_sees_every_overlap() {
        let ids = handles(2);
        let mut grid = SpatialGrid::new(to_fixed(25.0));
        grid.insert(ids[0], FixedVec2::from_ints(900, 0), to_fixed(5.0));
        grid.insert(ids[1], FixedVec2::from_ints(3000, 0), to_fixed(5.0));

        // 80 cells per axis
        let found = grid.retrieve(to_fixed(-1000.0), to_fixed(-1000.0), to_fixed(2000.0), to_fixed(2000.0));
        assert_eq!(found, vec![ids[0]]);
    }

    #[test]
    fn test_grid_wide_entry_found_by_small_query() {
        let ids = handles(1);
        let mut grid = SpatialGrid::new(to_fixed(1.0));
        grid.insert(ids[0], FixedVec2::ZERO, to_fixed(500.0));

        let found = grid.retrieve(to_fixed(450.0), to_fixed(-2.0), to_fixed(4.0), to_fixed(4.0));
        assert_eq!(found, vec![ids[0]]);
        let miss = grid.retrieve(to_fixed(600.0), 0, to_fixed(4.0), to_fixed(4.0));
        assert!(miss.is_empty());
    }
}
