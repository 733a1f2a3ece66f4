//! Per-frame simulation step
//!
//! Advances a `GameState` by a host-supplied timestep. Order matters: the
//! phase machine runs before the streamers so a phase's new density is in
//! place before any tile recycled this frame reads it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ability::{Ability, Rejection};
use super::enemy::ProjectileId;
use super::events::GameEvent;
use super::pool::{InstanceId, Placement};
use super::state::{GameState, Wreck};

/// Who ran into an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contact {
    Player,
    /// The pursuing ambulance ploughs through traffic too
    Enemy,
}

/// Host reports for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pause toggle
    pub pause: bool,
    /// Current player position, if it moved
    pub player_position: Option<Vec3>,
    /// Ability buttons pressed (indices 1, 2, 3)
    pub activate: Vec<u8>,
    /// Pickups the player touched
    pub collected: Vec<InstanceId>,
    /// Obstacles something collided with
    pub obstacle_contacts: Vec<(InstanceId, Contact)>,
    /// Projectiles that hit the ambulance
    pub projectile_hits: Vec<ProjectileId>,
    /// Player fell off the road
    pub fell: bool,
}

/// Advance the game by one timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        state.paused = !state.paused;
        log::info!("tick: {}", if state.paused { "paused" } else { "resumed" });
    }
    // Paused: no timer, ramp, tile or effect moves
    if state.paused {
        return;
    }

    state.time += dt;
    if let Some(position) = input.player_position {
        state.player_position = position;
    }
    let player = state.player_position;

    // Phase first so recycles below see the new density
    if state.phases.tick(dt, &mut state.road).is_some() {
        state.announce_phase();
    }

    for &index in &input.activate {
        activate_ability(state, index);
    }
    for ability in state.abilities.advance(dt) {
        state.events.push(GameEvent::AbilityEnded(ability));
    }
    state.phase_banner.advance(dt);

    state.road.tick(dt, player, &mut state.pool, &mut state.rng);
    if let Some(scenery) = state.scenery.as_mut() {
        scenery.tick(dt, player, &mut state.pool, &mut state.rng);
    }

    for &(id, contact) in &input.obstacle_contacts {
        handle_contact(state, id, contact);
    }
    if input.fell {
        state.kill_player();
    }
    advance_wrecks(state, dt);

    for &id in &input.collected {
        if state.pickups.collect(id, &mut state.pool, &mut state.bank) {
            state.events.push(GameEvent::CollectiblePicked);
        }
    }
    let road_speed = state.speed.get();
    state.pickups.advance(dt, road_speed, player, &mut state.pool);

    state.projectiles.advance(dt);
    for &id in &input.projectile_hits {
        if state.projectiles.consume(id) {
            state.enemy.take_damage(1);
        }
    }
    if state.enemy.advance(dt) {
        log::info!("tick: ambulance defeated");
        state.events.push(GameEvent::EnemyDefeated);
    }

    state.distance_score += state.speed.get() * state.settings.score.multiplier * dt;
}

fn activate_ability(state: &mut GameState, index: u8) {
    let result = if state.is_alive() {
        let phase = state.phases.current();
        state.abilities.activate(index, phase, &mut state.bank)
    } else {
        Err(Rejection::PlayerDown)
    };

    match result {
        Ok(ability) => {
            if ability == Ability::ContagionSpray {
                // Fired forward at the ambulance ahead of the player
                let origin = state.player_position;
                state.projectiles.spawn(origin, origin + Vec3::Z);
            }
            state.events.push(GameEvent::AbilityActivated(ability));
        }
        Err(reason) => {
            if let Rejection::UnknownAbility(i) = reason {
                log::warn!("tick: unknown ability index {}", i);
            }
            state.events.push(GameEvent::AbilityRejected { index, reason });
        }
    }
}

fn handle_contact(state: &mut GameState, id: InstanceId, contact: Contact) {
    // Destroyed, or already a wreck
    if !state.pool.is_alive(id) || state.wrecks.iter().any(|w| w.id == id) {
        return;
    }
    let Some(position) = state.instance_position(id) else {
        return;
    };

    let by_player = contact == Contact::Player;
    if by_player && !state.abilities.invulnerable() {
        state.kill_player();
    }

    // The wreck leaves pool ownership and is destroyed on its own timer
    state.pool.disown(id);
    state.wrecks.push(Wreck {
        id,
        timer: state.settings.world.wreck_destroy_delay,
    });
    state.events.push(GameEvent::ObstacleExploded { by_player });

    if state
        .pickups
        .drop_at(position, &mut state.pool, &mut state.rng)
        .is_some()
    {
        state.events.push(GameEvent::CollectibleDropped);
    }
}

fn advance_wrecks(state: &mut GameState, dt: f32) {
    let pool = &mut state.pool;
    let road = &mut state.road;
    state.wrecks.retain_mut(|wreck| {
        // Discarded when its tile was recycled
        let Some(instance) = pool.get(wreck.id) else {
            return false;
        };
        wreck.timer -= dt;
        if wreck.timer > 0.0 {
            return true;
        }
        if let Placement::Slot(slot) = instance.placement {
            road.vacate(slot, wreck.id);
        }
        pool.destroy(wreck.id);
        false
    });
}
