//! The pursuing ambulance and the contagion projectiles fired at it

use glam::Vec3;
use slotmap::SlotMap;

use super::events::Observers;
use super::phase::Phase;

/// Ambulance health. Reaching zero starts a death delay; the defeat is
/// reported once that delay runs out.
#[derive(Debug)]
pub struct EnemyHealth {
    current: u32,
    max: u32,
    death_delay: f32,
    death_timer: Option<f32>,
    defeated: bool,
    /// Receives `(current, max)` after every hit
    pub on_changed: Observers<(u32, u32)>,
}

impl EnemyHealth {
    pub fn new(max: u32, death_delay: f32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            death_delay,
            death_timer: None,
            defeated: false,
            on_changed: Observers::new(),
        }
    }

    /// Send `(current, max)` without taking damage
    pub fn notify_current(&mut self) {
        self.on_changed.notify(&(self.current, self.max));
    }

    /// Apply damage. Hits on a dead enemy are ignored.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.is_dead() || amount == 0 {
            return false;
        }
        self.current = self.current.saturating_sub(amount);
        self.on_changed.notify(&(self.current, self.max));
        if self.current == 0 {
            log::info!("EnemyHealth: ambulance down");
            self.death_timer = Some(self.death_delay);
        }
        true
    }

    /// Count down the death delay; true on the single tick the enemy is defeated
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(timer) = self.death_timer.as_mut() else {
            return false;
        };
        *timer -= dt;
        if *timer > 0.0 {
            return false;
        }
        self.death_timer = None;
        self.defeated = true;
        true
    }

    pub fn is_dead(&self) -> bool {
        self.current == 0
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        self.current as f32 / self.max as f32
    }

    /// The bar only appears for the final encounter
    pub fn health_bar_visible(&self, phase: Phase) -> bool {
        phase == Phase::End && !self.defeated
    }
}

slotmap::new_key_type! {
    pub struct ProjectileId;
}

#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left before it expires
    pub lifetime: f32,
}

/// In-flight projectiles. Hits are reported by the host's collision layer.
#[derive(Debug, Default)]
pub struct Projectiles {
    live: SlotMap<ProjectileId, Projectile>,
    speed: f32,
    lifetime: f32,
}

impl Projectiles {
    pub fn new(speed: f32, lifetime: f32) -> Self {
        Self {
            live: SlotMap::with_key(),
            speed,
            lifetime,
        }
    }

    /// Fire from `origin` toward `target`
    pub fn spawn(&mut self, origin: Vec3, target: Vec3) -> ProjectileId {
        let direction = (target - origin).try_normalize().unwrap_or(Vec3::Z);
        self.live.insert(Projectile {
            position: origin,
            velocity: direction * self.speed,
            lifetime: self.lifetime,
        })
    }

    /// Move projectiles and drop expired ones
    pub fn advance(&mut self, dt: f32) {
        self.live.retain(|_, p| {
            p.position += p.velocity * dt;
            p.lifetime -= dt;
            p.lifetime > 0.0
        });
    }

    /// Remove a projectile that hit something. False if it already expired.
    pub fn consume(&mut self, id: ProjectileId) -> bool {
        self.live.remove(id).is_some()
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.live.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProjectileId, &Projectile)> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_defeat_after_death_delay() {
        let mut enemy = EnemyHealth::new(2, 1.0);
        assert!(enemy.take_damage(1));
        assert!(!enemy.advance(5.0));
        assert!(enemy.take_damage(1));
        assert!(enemy.is_dead());
        assert!(!enemy.take_damage(1));

        assert!(!enemy.advance(0.5));
        assert!(enemy.advance(0.5));
        assert!(enemy.is_defeated());
        assert!(!enemy.advance(0.5));
    }

    #[test]
    fn test_health_notifies_current_and_max() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut enemy = EnemyHealth::new(5, 1.0);
        let s = Rc::clone(&seen);
        enemy.on_changed.subscribe(move |v| s.borrow_mut().push(*v));

        enemy.notify_current();
        enemy.take_damage(1);
        enemy.take_damage(3);
        assert_eq!(*seen.borrow(), vec![(5, 5), (4, 5), (1, 5)]);
    }

    #[test]
    fn test_health_bar_only_in_end() {
        let enemy = EnemyHealth::new(5, 1.0);
        assert!(!enemy.health_bar_visible(Phase::Phase3));
        assert!(enemy.health_bar_visible(Phase::End));
    }

    #[test]
    fn test_projectile_moves_and_expires() {
        let mut shots = Projectiles::new(20.0, 5.0);
        let id = shots.spawn(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
        shots.advance(1.0);
        assert!((shots.get(id).unwrap().position.z - 20.0).abs() < 1e-4);

        shots.advance(4.0);
        assert!(shots.is_empty());
        assert!(!shots.consume(id));
    }

    #[test]
    fn test_consume_once() {
        let mut shots = Projectiles::new(20.0, 5.0);
        let id = shots.spawn(Vec3::ZERO, Vec3::ZERO);
        assert!(shots.consume(id));
        assert!(!shots.consume(id));
    }
}
