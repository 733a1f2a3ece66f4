//! Collectibles dropped by wrecked obstacles
//!
//! A pickup falls in place for a short settle delay, then slides toward the
//! player slightly faster than the road. Pickups left far enough behind go
//! back to the pool.

use glam::Vec3;
use rand::Rng;

use super::bank::ResourceBank;
use super::pool::{Category, InstanceId, ObjectPool};

#[derive(Debug, Clone, Copy)]
struct Pickup {
    id: InstanceId,
    position: Vec3,
    /// Seconds left before it starts moving
    settle: f32,
}

#[derive(Debug, Clone)]
pub struct PickupField {
    items: Vec<Pickup>,
    speed_factor: f32,
    settle_delay: f32,
    despawn_back: f32,
}

impl PickupField {
    pub fn new(speed_factor: f32, settle_delay: f32, despawn_back: f32) -> Self {
        Self {
            items: Vec::new(),
            speed_factor,
            settle_delay,
            despawn_back,
        }
    }

    /// Spawn a collectible at `position`. `None` if no collectible prefab exists.
    pub fn drop_at<R: Rng>(&mut self, position: Vec3, pool: &mut ObjectPool, rng: &mut R) -> Option<InstanceId> {
        let id = pool.acquire(Category::Collectible, rng)?;
        pool.place_free(id, position);
        self.items.push(Pickup {
            id,
            position,
            settle: self.settle_delay,
        });
        Some(id)
    }

    /// Move settled pickups by `road_speed * speed_factor`; release the ones
    /// left behind. Returns how many were released.
    pub fn advance(&mut self, dt: f32, road_speed: f32, player: Vec3, pool: &mut ObjectPool) -> usize {
        let step = road_speed * self.speed_factor * dt;
        let limit = player.z - self.despawn_back;
        let before = self.items.len();

        self.items.retain_mut(|item| {
            // Stale pickups were destroyed elsewhere
            if !pool.is_alive(item.id) {
                return false;
            }
            if item.settle > 0.0 {
                item.settle -= dt;
            } else {
                item.position.z -= step;
                pool.place_free(item.id, item.position);
            }
            if item.position.z < limit {
                pool.release(item.id);
                return false;
            }
            true
        });
        before - self.items.len()
    }

    /// Player touched a pickup: return it to the pool and bank one unit.
    /// Unknown or already collected ids are ignored.
    pub fn collect(&mut self, id: InstanceId, pool: &mut ObjectPool, bank: &mut ResourceBank) -> bool {
        let Some(index) = self.items.iter().position(|p| p.id == id) else {
            return false;
        };
        self.items.swap_remove(index);
        pool.release(id);
        bank.add(1);
        true
    }

    pub fn positions(&self) -> impl Iterator<Item = (InstanceId, Vec3)> + '_ {
        self.items.iter().map(|p| (p.id, p.position))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self, pool: &mut ObjectPool) {
        for item in self.items.drain(..) {
            pool.release(item.id);
        }
    }
}
