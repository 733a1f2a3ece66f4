//! Game session state
//!
//! `GameState` owns every service of a run and wires them together at
//! construction. Nothing in the simulation reaches for a global; the tick
//! borrows what it needs from here.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ability::AbilityController;
use super::bank::ResourceBank;
use super::effect::{PulseRoutine, Retrigger};
use super::enemy::{EnemyHealth, Projectiles};
use super::events::{EventQueue, GameEvent, SubscriptionId};
use super::phase::{Phase, PhaseMachine};
use super::pickup::PickupField;
use super::pool::{InstanceId, ObjectPool, Placement};
use super::streamer::{SpeedRamp, StreamerConfig, WorldStreamer};
use super::tile::{ScrollSpeed, TileTemplate};
use crate::settings::Settings;

/// Whether the runner is still in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Alive,
    Dead,
}

/// An exploded obstacle waiting to be destroyed
#[derive(Debug, Clone, Copy)]
pub struct Wreck {
    pub id: InstanceId,
    /// Seconds until it is destroyed
    pub timer: f32,
}

/// Complete state of one run
#[derive(Debug)]
pub struct GameState {
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: Settings,

    pub pool: ObjectPool,
    pub speed: ScrollSpeed,
    pub road: WorldStreamer,
    /// Buildings beside the road, if enabled
    pub scenery: Option<WorldStreamer>,

    pub bank: ResourceBank,
    pub phases: PhaseMachine,
    pub abilities: AbilityController,
    pub pickups: PickupField,
    pub enemy: EnemyHealth,
    pub projectiles: Projectiles,

    pub player: PlayerStatus,
    pub player_position: Vec3,
    pub wrecks: Vec<Wreck>,
    /// "Mutating" banner shown on every phase entry
    pub phase_banner: PulseRoutine,

    pub paused: bool,
    /// Simulated seconds, excluding paused time
    pub time: f32,
    /// Unfloored distance score
    pub distance_score: f32,

    pub events: EventQueue,
    subscriptions: Subscriptions,
}

/// Forwarders from each publisher into the event queue
#[derive(Debug, Clone, Copy)]
struct Subscriptions {
    bank: SubscriptionId,
    phases: SubscriptionId,
    enemy: SubscriptionId,
}

impl GameState {
    /// New run with default settings
    pub fn new(seed: u64) -> Self {
        Self::with_settings(Settings::with_seed(seed))
    }

    /// Build every service in dependency order and enter Phase1
    pub fn with_settings(mut settings: Settings) -> Self {
        settings.validate();
        let seed = settings.seed;
        let mut rng = Pcg32::seed_from_u64(seed);
        let world = &settings.world;

        let mut pool = ObjectPool::with_prefabs(&world.obstacle_prefabs, &settings.pickups.prefabs);
        let speed = ScrollSpeed::new(world.base_speed);

        let mut road = WorldStreamer::new(
            StreamerConfig {
                window: world.tiles_on_screen,
                despawn_back: world.despawn_back,
                delay_distance: world.obstacle_delay_distance,
                lateral_offset: 0.0,
                ramp: Some(Self::ramp_from(&settings)),
            },
            TileTemplate::road(world.tile_length, world.tile_width, world.rows_per_segment, &world.lanes),
            speed.clone(),
        );
        let mut scenery = settings.scenery.enabled.then(|| {
            let s = &settings.scenery;
            WorldStreamer::scenery(
                s.tiles_on_screen,
                s.despawn_back,
                s.lateral_offset,
                TileTemplate::scenery(s.tile_length, 6.0),
                speed.clone(),
            )
        });

        let events = EventQueue::new();
        let mut bank = ResourceBank::with_count(settings.bank.initial, settings.bank.max);
        let mut phases = PhaseMachine::new(settings.phases.durations, settings.phases.densities);
        let mut enemy = EnemyHealth::new(settings.enemy.max_hp, settings.enemy.death_delay);

        let q = events.clone();
        let max = bank.max();
        let bank_sub = bank
            .on_changed
            .subscribe(move |count| q.push(GameEvent::ResourceChanged { count: *count, max }));
        let q = events.clone();
        let phases_sub = phases
            .on_changed
            .subscribe(move |phase| q.push(GameEvent::PhaseChanged(*phase)));
        let q = events.clone();
        let enemy_sub = enemy.on_changed.subscribe(move |(current, max)| {
            q.push(GameEvent::EnemyHealthChanged {
                current: *current,
                max: *max,
            })
        });
        let subscriptions = Subscriptions {
            bank: bank_sub,
            phases: phases_sub,
            enemy: enemy_sub,
        };
        // HUD starts from the initial count and full health
        bank.notify_current();
        enemy.notify_current();

        let a = &settings.abilities;
        let abilities = AbilityController::new(
            a.cell_phase,
            a.viral_overclock,
            a.contagion_cooldown,
            a.jump_multiplier,
            a.gravity_multiplier,
        );
        let pickups = PickupField::new(
            settings.pickups.speed_factor,
            settings.pickups.settle_delay,
            settings.pickups.despawn_back,
        );
        let projectiles = Projectiles::new(settings.enemy.projectile_speed, settings.enemy.projectile_lifetime);
        let phase_banner = PulseRoutine::new(settings.phases.banner, Retrigger::Restart);

        // Density must be in place before the first tiles are populated
        phases.start(&mut road);
        let player_position = Vec3::ZERO;
        road.spawn_initial(player_position, &mut pool, &mut rng);
        if let Some(scenery) = scenery.as_mut() {
            scenery.spawn_initial(player_position, &mut pool, &mut rng);
        }

        let mut state = Self {
            seed,
            rng,
            settings,
            pool,
            speed,
            road,
            scenery,
            bank,
            phases,
            abilities,
            pickups,
            enemy,
            projectiles,
            player: PlayerStatus::Alive,
            player_position,
            wrecks: Vec::new(),
            phase_banner,
            paused: false,
            time: 0.0,
            distance_score: 0.0,
            events,
            subscriptions,
        };
        state.announce_phase();
        log::info!("GameState: run started with seed {}", seed);
        state
    }

    fn ramp_from(settings: &Settings) -> SpeedRamp {
        SpeedRamp {
            base: settings.world.base_speed,
            rate: settings.world.speed_ramp,
            max: settings.world.max_world_speed,
        }
    }

    /// Show the phase banner for the phase just entered
    pub(crate) fn announce_phase(&mut self) {
        self.phase_banner.trigger();
        self.events
            .push(GameEvent::PhaseMessage(self.settings.phases.message.clone()));
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phases.current()
    }

    pub fn is_alive(&self) -> bool {
        self.player == PlayerStatus::Alive
    }

    /// Jump height the host's controller should use this frame
    pub fn jump_height(&self) -> f32 {
        self.settings.player.jump_height * self.abilities.jump_multiplier()
    }

    /// Gravity the host's controller should use this frame
    pub fn gravity(&self) -> f32 {
        self.settings.player.gravity * self.abilities.gravity_multiplier()
    }

    /// Floored distance score
    pub fn score(&self) -> u64 {
        self.distance_score.max(0.0).floor() as u64
    }

    /// Everything published since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// World position of an active instance, resolving slot parents
    pub fn instance_position(&self, id: InstanceId) -> Option<Vec3> {
        let instance = self.pool.get(id)?;
        match instance.placement {
            Placement::InPool => None,
            Placement::Free(position) => Some(position),
            Placement::Slot(slot) => {
                let tile = self.road.tile(slot.tile)?;
                let local = tile.grid().slot(slot.row, slot.index)?.local_position;
                Some(tile.position() + local + instance.local_position)
            }
        }
    }

    /// Candidate waypoints for the ambulance's pathing
    pub fn free_slot_positions(&self) -> Vec<Vec3> {
        self.road.free_slot_positions()
    }

    /// Rebuild the world around the player and reset the speed ramp
    pub fn reinitialize_world(&mut self) {
        let ramp = Self::ramp_from(&self.settings);
        self.road
            .reinitialize(ramp, self.player_position, &mut self.pool, &mut self.rng);
        if let Some(scenery) = self.scenery.as_mut() {
            scenery.reinitialize(ramp, self.player_position, &mut self.pool, &mut self.rng);
        }
    }

    /// Stop the world for good
    pub(crate) fn kill_player(&mut self) {
        if self.player == PlayerStatus::Dead {
            return;
        }
        self.player = PlayerStatus::Dead;
        self.road.halt();
        log::info!("GameState: player died at score {}", self.score());
        self.events.push(GameEvent::PlayerDied);
    }

    /// Unsubscribe every observer and return all instances
    pub fn teardown(&mut self) {
        let subs = self.subscriptions;
        self.bank.on_changed.unsubscribe(subs.bank);
        self.phases.on_changed.unsubscribe(subs.phases);
        self.enemy.on_changed.unsubscribe(subs.enemy);
        self.pickups.clear(&mut self.pool);
        self.projectiles.clear();
        self.road.teardown(&mut self.pool);
        if let Some(scenery) = self.scenery.as_mut() {
            scenery.teardown(&mut self.pool);
        }
        self.wrecks.clear();
        self.pool.teardown();
    }
}
