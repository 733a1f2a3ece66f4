//! Reusable instance pool for obstacles and collectibles
//!
//! Instances live in a generational arena, so a handle to an instance that
//! was destroyed out-of-band simply stops resolving. Each prefab owns a FIFO
//! queue of inactive instances ready for reuse.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::grid::SlotRef;

slotmap::new_key_type! {
    /// Handle to a pooled or free-floating instance
    pub struct InstanceId;
}

/// Index of a registered prefab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefabId(u32);

/// Pool category a prefab is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Obstacle,
    Collectible,
}

impl Category {
    /// Orientation applied when an instance leaves the pool.
    /// Obstacles face back toward the player.
    pub fn default_rotation(self) -> Quat {
        match self {
            Category::Obstacle => Quat::from_rotation_y(std::f32::consts::PI),
            Category::Collectible => Quat::IDENTITY,
        }
    }

    fn slot(self) -> usize {
        match self {
            Category::Obstacle => 0,
            Category::Collectible => 1,
        }
    }
}

/// Where an instance currently is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Inactive, owned by its prefab's free queue
    InPool,
    /// Active, parented to a road slot
    Slot(SlotRef),
    /// Active, world-space position
    Free(Vec3),
}

#[derive(Debug, Clone)]
pub struct Instance {
    /// `None` for instances the pool does not manage
    pub prefab: Option<PrefabId>,
    pub placement: Placement,
    pub rotation: Quat,
    /// Offset from the parent slot (zero once attached)
    pub local_position: Vec3,
}

impl Instance {
    pub fn is_active(&self) -> bool {
        self.placement != Placement::InPool
    }
}

#[derive(Debug, Clone)]
struct Prefab {
    name: String,
    category: Category,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub acquired: u64,
    pub released: u64,
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub struct ObjectPool {
    prefabs: Vec<Prefab>,
    by_category: [Vec<PrefabId>; 2],
    free: Vec<VecDeque<InstanceId>>,
    instances: SlotMap<InstanceId, Instance>,
    stats: PoolStats,
    warned_empty: [bool; 2],
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool with the given obstacle and collectible prefab names registered
    pub fn with_prefabs(obstacles: &[String], collectibles: &[String]) -> Self {
        let mut pool = Self::new();
        for name in obstacles {
            pool.register(Category::Obstacle, name);
        }
        for name in collectibles {
            pool.register(Category::Collectible, name);
        }
        pool
    }

    pub fn register(&mut self, category: Category, name: &str) -> PrefabId {
        let id = PrefabId(self.prefabs.len() as u32);
        self.prefabs.push(Prefab {
            name: name.to_string(),
            category,
        });
        self.free.push(VecDeque::new());
        self.by_category[category.slot()].push(id);
        id
    }

    pub fn prefab_count(&self, category: Category) -> usize {
        self.by_category[category.slot()].len()
    }

    pub fn prefab_name(&self, prefab: PrefabId) -> Option<&str> {
        self.prefabs.get(prefab.0 as usize).map(|p| p.name.as_str())
    }

    pub fn category_of(&self, prefab: PrefabId) -> Option<Category> {
        self.prefabs.get(prefab.0 as usize).map(|p| p.category)
    }

    /// Take an instance of a random prefab from `category`.
    ///
    /// Returns `None` when the category has no registered prefabs.
    pub fn acquire<R: Rng>(&mut self, category: Category, rng: &mut R) -> Option<InstanceId> {
        let candidates = &self.by_category[category.slot()];
        if candidates.is_empty() {
            let warned = &mut self.warned_empty[category.slot()];
            if !*warned {
                log::warn!("ObjectPool: no {:?} prefabs registered", category);
                *warned = true;
            }
            return None;
        }
        let prefab = candidates[rng.random_range(0..candidates.len())];
        self.acquire_prefab(prefab)
    }

    /// Take an instance of a specific prefab, creating one on first demand
    pub fn acquire_prefab(&mut self, prefab: PrefabId) -> Option<InstanceId> {
        let category = self.category_of(prefab)?;
        let queue = &mut self.free[prefab.0 as usize];

        // Skip entries destroyed while waiting in the queue
        let mut reused = None;
        while let Some(id) = queue.pop_front() {
            if self.instances.contains_key(id) {
                reused = Some(id);
                break;
            }
        }

        let id = match reused {
            Some(id) => id,
            None => {
                self.stats.created += 1;
                self.instances.insert(Instance {
                    prefab: Some(prefab),
                    placement: Placement::InPool,
                    rotation: Quat::IDENTITY,
                    local_position: Vec3::ZERO,
                })
            }
        };

        let instance = self.instances.get_mut(id)?;
        instance.placement = Placement::Free(Vec3::ZERO);
        instance.rotation = category.default_rotation();
        instance.local_position = Vec3::ZERO;
        self.stats.acquired += 1;
        Some(id)
    }

    /// Return an instance to its prefab queue, or discard it if unmanaged.
    ///
    /// Destroyed handles and instances already in the pool are ignored.
    pub fn release(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get_mut(id) else {
            log::debug!("ObjectPool: release of a destroyed instance ignored");
            return;
        };
        let prefab = instance.prefab;
        match prefab {
            Some(prefab) => {
                if instance.placement == Placement::InPool {
                    return;
                }
                instance.placement = Placement::InPool;
                self.free[prefab.0 as usize].push_back(id);
                self.stats.released += 1;
            }
            None => {
                self.instances.remove(id);
                self.stats.discarded += 1;
            }
        }
    }

    /// Create an instance the pool does not manage
    pub fn spawn_unmanaged(&mut self, position: Vec3) -> InstanceId {
        self.instances.insert(Instance {
            prefab: None,
            placement: Placement::Free(position),
            rotation: Quat::IDENTITY,
            local_position: Vec3::ZERO,
        })
    }

    /// Stop managing an instance; its next release discards it
    pub fn disown(&mut self, id: InstanceId) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) if instance.is_active() => {
                instance.prefab = None;
                true
            }
            _ => false,
        }
    }

    /// Destroy an instance outside the normal release path.
    /// Every outstanding handle to it becomes stale.
    pub fn destroy(&mut self, id: InstanceId) -> bool {
        self.instances.remove(id).is_some()
    }

    /// Parent an active instance to a slot at local origin, identity rotation
    pub fn attach(&mut self, id: InstanceId, slot: SlotRef) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) if instance.is_active() => {
                instance.placement = Placement::Slot(slot);
                instance.local_position = Vec3::ZERO;
                instance.rotation = Quat::IDENTITY;
                true
            }
            _ => false,
        }
    }

    /// Move an active instance to a world-space position
    pub fn place_free(&mut self, id: InstanceId, position: Vec3) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) if instance.is_active() => {
                instance.placement = Placement::Free(position);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn prefab_of(&self, id: InstanceId) -> Option<PrefabId> {
        self.instances.get(id).and_then(|i| i.prefab)
    }

    /// Active instances of `prefab`
    pub fn active_count(&self, prefab: PrefabId) -> usize {
        self.instances
            .values()
            .filter(|i| i.prefab == Some(prefab) && i.is_active())
            .count()
    }

    /// Live instances waiting in `prefab`'s queue
    pub fn available_count(&self, prefab: PrefabId) -> usize {
        self.free
            .get(prefab.0 as usize)
            .map(|q| q.iter().filter(|id| self.instances.contains_key(**id)).count())
            .unwrap_or(0)
    }

    /// Every live instance, pooled or not
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Destroy everything (scene teardown)
    pub fn teardown(&mut self) {
        self.instances.clear();
        for queue in &mut self.free {
            queue.clear();
        }
    }
}
