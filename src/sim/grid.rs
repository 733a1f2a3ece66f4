//! Per-tile matrix of obstacle spawn slots
//!
//! Slots are grouped into rows sharing a longitudinal offset. A row never
//! holds more than `ROW_CAPACITY` obstacles.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::pool::{Category, InstanceId, ObjectPool, Placement};
use super::tile::TileId;
use crate::consts::ROW_CAPACITY;

/// Address of one slot in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub tile: TileId,
    pub row: usize,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub local_position: Vec3,
    pub row: usize,
    pub occupant: Option<InstanceId>,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Obstacles each row should receive for `target` spread over `row_count` rows.
///
/// Every row gets `target / row_count`, the first `target % row_count` rows
/// one more, and no row more than `ROW_CAPACITY`.
pub fn row_quotas(target: usize, row_count: usize) -> Vec<usize> {
    if row_count == 0 {
        return Vec::new();
    }
    let base = target / row_count;
    let extra = target % row_count;
    (0..row_count)
        .map(|r| (base + usize::from(r < extra)).min(ROW_CAPACITY))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SlotGrid {
    owner: TileId,
    // A `None` entry is a slot that no longer exists
    rows: Vec<Vec<Option<Slot>>>,
}

impl SlotGrid {
    /// Grid with no rows (scenery tiles)
    pub fn empty() -> Self {
        Self::default()
    }

    /// One inner list of slot local positions per row
    pub fn from_rows(rows: Vec<Vec<Vec3>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(r, positions)| {
                positions
                    .into_iter()
                    .map(|local_position| {
                        Some(Slot {
                            local_position,
                            row: r,
                            occupant: None,
                        })
                    })
                    .collect()
            })
            .collect();
        Self {
            owner: TileId(0),
            rows,
        }
    }

    pub(crate) fn set_owner(&mut self, owner: TileId) {
        self.owner = owner;
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Existing slots across all rows
    pub fn slot_count(&self) -> usize {
        self.rows.iter().flatten().flatten().count()
    }

    pub fn slot(&self, row: usize, index: usize) -> Option<&Slot> {
        self.rows.get(row)?.get(index)?.as_ref()
    }

    pub fn is_occupied(&self, row: usize, index: usize) -> bool {
        self.slot(row, index).is_some_and(|s| s.occupant.is_some())
    }

    pub fn occupied_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .filter(|s| s.occupant.is_some())
            .count()
    }

    pub fn occupied_per_row(&self) -> Vec<usize> {
        self.rows
            .iter()
            .map(|row| row.iter().flatten().filter(|s| s.occupant.is_some()).count())
            .collect()
    }

    /// Every occupant handle, stale ones included
    pub fn occupants(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.rows.iter().flatten().flatten().filter_map(|s| s.occupant)
    }

    /// Release every occupant back to the pool and mark all slots free.
    ///
    /// Occupants destroyed out-of-band, or no longer parented to this grid,
    /// are dropped without a release. Returns how many instances went back
    /// to the pool.
    pub fn clear(&mut self, pool: &mut ObjectPool) -> usize {
        let owner = self.owner;
        let mut released = 0;
        for (r, row) in self.rows.iter_mut().enumerate() {
            for (i, slot) in row.iter_mut().enumerate() {
                let Some(id) = slot.as_mut().and_then(|s| s.occupant.take()) else {
                    continue;
                };
                if Self::owns(owner, pool, id, r, i) {
                    pool.release(id);
                    released += 1;
                }
            }
        }
        released
    }

    /// Whether the pool still has `id` parented to slot `(row, index)` of `owner`
    fn owns(owner: TileId, pool: &ObjectPool, id: InstanceId, row: usize, index: usize) -> bool {
        pool.get(id).is_some_and(|instance| {
            instance.placement
                == Placement::Slot(SlotRef {
                    tile: owner,
                    row,
                    index,
                })
        })
    }

    /// Forget `id` if it still sits in slot `(row, index)`. Used when the
    /// instance was destroyed without going through the grid.
    pub fn vacate(&mut self, row: usize, index: usize, id: InstanceId) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(index)) {
            Some(Some(slot)) if slot.occupant == Some(id) => {
                slot.occupant = None;
                true
            }
            _ => false,
        }
    }

    /// Clear, then place up to `target` obstacles spread across rows.
    ///
    /// Within a row, slots are picked uniformly among the free ones that
    /// still exist. A row stops early when it runs out of free slots; the
    /// whole pass stops when the pool has nothing to give.
    pub fn populate<R: Rng>(&mut self, pool: &mut ObjectPool, target: usize, rng: &mut R) -> usize {
        self.clear(pool);
        let quotas = row_quotas(target, self.rows.len());

        let mut placed = 0;
        'rows: for (r, quota) in quotas.into_iter().enumerate() {
            for _ in 0..quota {
                let candidates: Vec<usize> = self.rows[r]
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.as_ref().is_some_and(Slot::is_free))
                    .map(|(i, _)| i)
                    .collect();
                if candidates.is_empty() {
                    break;
                }
                let index = candidates[rng.random_range(0..candidates.len())];

                let Some(id) = pool.acquire(Category::Obstacle, rng) else {
                    break 'rows;
                };
                pool.attach(
                    id,
                    SlotRef {
                        tile: self.owner,
                        row: r,
                        index,
                    },
                );
                if let Some(slot) = self.rows[r][index].as_mut() {
                    slot.occupant = Some(id);
                }
                placed += 1;
            }
        }
        placed
    }

    /// All free slots, for pathing collaborators choosing waypoints
    pub fn free_slots(&self) -> Vec<SlotRef> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter().enumerate().filter_map(move |(i, slot)| {
                    slot.as_ref().filter(|s| s.is_free()).map(|_| SlotRef {
                        tile: self.owner,
                        row: r,
                        index: i,
                    })
                })
            })
            .collect()
    }

    /// Free slot positions offset by the owning tile's position
    pub fn free_slot_positions(&self, origin: Vec3) -> Vec<Vec3> {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .filter(|s| s.is_free())
            .map(|s| origin + s.local_position)
            .collect()
    }

    /// Delete a slot. Its occupant, if still parented here, goes back to the pool.
    pub fn remove_slot(&mut self, row: usize, index: usize, pool: &mut ObjectPool) -> bool {
        let Some(entry) = self.rows.get_mut(row).and_then(|r| r.get_mut(index)) else {
            return false;
        };
        match entry.take() {
            Some(slot) => {
                if let Some(id) = slot.occupant {
                    if Self::owns(self.owner, pool, id, row, index) {
                        pool.release(id);
                    }
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn grid(rows: usize, lanes: usize) -> SlotGrid {
        let layout = (0..rows)
            .map(|r| (0..lanes).map(|l| Vec3::new(l as f32, 0.0, r as f32)).collect())
            .collect();
        let mut grid = SlotGrid::from_rows(layout);
        grid.set_owner(TileId(3));
        grid
    }

    fn pool() -> ObjectPool {
        ObjectPool::with_prefabs(&["car".into(), "bus".into()], &[])
    }

    #[test]
    fn test_row_quotas_spread() {
        assert_eq!(row_quotas(5, 4), vec![2, 1, 1, 1]);
        assert_eq!(row_quotas(3, 4), vec![1, 1, 1, 0]);
        assert_eq!(row_quotas(0, 3), vec![0, 0, 0]);
        // Capped at two per row
        assert_eq!(row_quotas(9, 2), vec![2, 2]);
        assert!(row_quotas(4, 0).is_empty());
    }

    #[test]
    fn test_populate_parents_to_slot() {
        let mut grid = grid(4, 3);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(7);

        assert_eq!(grid.populate(&mut pool, 4, &mut rng), 4);
        for id in grid.occupants() {
            let instance = pool.get(id).unwrap();
            match instance.placement {
                Placement::Slot(slot) => {
                    assert_eq!(slot.tile, TileId(3));
                    assert_eq!(grid.slot(slot.row, slot.index).unwrap().occupant, Some(id));
                }
                other => panic!("expected slot placement, got {:?}", other),
            }
        }
        assert_eq!(grid.free_slots().len(), 8);
    }

    #[test]
    fn test_clear_then_empty_populate_returns_everything() {
        let mut grid = grid(3, 3);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(11);
        grid.populate(&mut pool, 6, &mut rng);
        let created = pool.stats().created as usize;

        assert_eq!(grid.clear(&mut pool), 6);
        assert_eq!(grid.populate(&mut pool, 0, &mut rng), 0);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.free_slots().len(), 9);
        assert_eq!(pool.stats().released as usize, created);
    }

    #[test]
    fn test_clear_skips_destroyed_occupant() {
        let mut grid = grid(2, 2);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(5);
        grid.populate(&mut pool, 2, &mut rng);

        let victim = grid.occupants().next().unwrap();
        pool.destroy(victim);

        assert_eq!(grid.clear(&mut pool), 1);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_row_short_of_slots_fills_what_exists() {
        let mut grid = grid(2, 3);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(9);
        grid.remove_slot(0, 0, &mut pool);
        grid.remove_slot(0, 1, &mut pool);

        let placed = grid.populate(&mut pool, 4, &mut rng);
        assert_eq!(placed, 3);
        assert_eq!(grid.occupied_per_row(), vec![1, 2]);
    }

    #[test]
    fn test_empty_pool_stops_population() {
        let mut grid = grid(3, 3);
        let mut pool = ObjectPool::new();
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(grid.populate(&mut pool, 6, &mut rng), 0);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_remove_occupied_slot_releases_instance() {
        let mut grid = grid(1, 2);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(2);
        grid.populate(&mut pool, 2, &mut rng);

        assert!(grid.remove_slot(0, 1, &mut pool));
        assert!(!grid.remove_slot(0, 1, &mut pool));
        assert_eq!(pool.stats().released, 1);
        assert_eq!(grid.slot_count(), 1);
    }

    /// Grid `a` keeps a stale reference to an obstacle that grid `b` now holds
    fn reused_by_other_tile() -> (SlotGrid, SlotGrid, ObjectPool, InstanceId) {
        let mut a = SlotGrid::from_rows(vec![vec![Vec3::ZERO]]);
        a.set_owner(TileId(3));
        let mut b = SlotGrid::from_rows(vec![vec![Vec3::ZERO]]);
        b.set_owner(TileId(4));
        let mut pool = ObjectPool::with_prefabs(&["car".into()], &[]);
        let mut rng = Pcg32::seed_from_u64(4);

        a.populate(&mut pool, 1, &mut rng);
        let id = a.occupants().next().unwrap();
        // Host hands the obstacle back directly; the next populate reuses it
        pool.release(id);
        b.populate(&mut pool, 1, &mut rng);
        assert_eq!(b.occupants().next(), Some(id));
        (a, b, pool, id)
    }

    fn assert_held_by_b(b: &SlotGrid, pool: &ObjectPool, id: InstanceId) {
        assert_eq!(b.slot(0, 0).unwrap().occupant, Some(id));
        let instance = pool.get(id).unwrap();
        assert!(instance.is_active());
        assert_eq!(
            instance.placement,
            Placement::Slot(SlotRef {
                tile: TileId(4),
                row: 0,
                index: 0
            })
        );
    }

    #[test]
    fn test_clear_leaves_instance_reused_by_another_tile() {
        let (mut a, b, mut pool, id) = reused_by_other_tile();
        assert_eq!(a.clear(&mut pool), 0);
        assert_eq!(a.occupied_count(), 0);
        assert_held_by_b(&b, &pool, id);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn test_remove_slot_leaves_instance_reused_by_another_tile() {
        let (mut a, b, mut pool, id) = reused_by_other_tile();
        assert!(a.remove_slot(0, 0, &mut pool));
        assert_held_by_b(&b, &pool, id);
    }

    #[test]
    fn test_vacate_only_matching_occupant() {
        let mut grid = grid(1, 1);
        let mut pool = pool();
        let mut rng = Pcg32::seed_from_u64(8);
        grid.populate(&mut pool, 1, &mut rng);
        let id = grid.occupants().next().unwrap();

        pool.destroy(id);
        assert!(grid.is_occupied(0, 0));
        assert!(grid.vacate(0, 0, id));
        assert!(!grid.vacate(0, 0, id));
        assert_eq!(grid.free_slots().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_density_distribution(rows in 1usize..8, lanes in 2usize..5, target in 0usize..24, seed in any::<u64>()) {
            let mut grid = grid(rows, lanes);
            let mut pool = pool();
            let mut rng = Pcg32::seed_from_u64(seed);

            let placed = grid.populate(&mut pool, target, &mut rng);
            prop_assert_eq!(placed, target.min(ROW_CAPACITY * rows));

            let per_row = grid.occupied_per_row();
            let base = target / rows;
            let extra = target % rows;
            for (r, count) in per_row.iter().enumerate() {
                prop_assert!(*count <= ROW_CAPACITY);
                let expected = (base + usize::from(r < extra)).min(ROW_CAPACITY);
                prop_assert_eq!(*count, expected);
            }
        }

        #[test]
        fn prop_repopulate_never_leaks(targets in prop::collection::vec(0usize..10, 1..12), seed in any::<u64>()) {
            let mut grid = grid(4, 3);
            let mut pool = pool();
            let mut rng = Pcg32::seed_from_u64(seed);

            for target in targets {
                let placed = grid.populate(&mut pool, target, &mut rng);
                let stats = pool.stats();
                // Everything handed out is either in a slot or back in the pool
                prop_assert_eq!((stats.acquired - stats.released) as usize, placed);
                prop_assert_eq!(grid.occupied_count(), placed);
                prop_assert_eq!(pool.live_count(), stats.created as usize);
            }
        }
    }
}
