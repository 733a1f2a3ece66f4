//! Viral Run headless driver
//!
//! Runs the simulation with a scripted player and logs the event stream.
//! Usage: `viral-run [settings.json] [seconds]`

use viral_run::Settings;
use viral_run::consts::*;
use viral_run::sim::{Ability, Contact, GameEvent, GameState, TickInput, tick};

/// Frame times the driver cycles through, to exercise the accumulator
const FRAME_TIMES: [f32; 4] = [1.0 / 60.0, 1.0 / 45.0, 1.0 / 90.0, 1.0 / 30.0];

/// Scripted stand-in for a human player
#[derive(Default)]
struct DemoPlayer {
    /// Seconds until the next spray hit is reported
    pending_hit: Option<f32>,
}

impl DemoPlayer {
    /// Decide this step's input from the current state
    fn input(&mut self, state: &GameState, dt: f32) -> TickInput {
        let mut input = TickInput::default();

        // Grab every pickup that has settled in reach
        input.collected = state
            .pickups
            .positions()
            .filter(|(_, pos)| (pos.z - state.player_position.z).abs() < 2.0)
            .map(|(id, _)| id)
            .collect();

        // The ambulance rams whatever traffic draws level with the player
        input.obstacle_contacts = state
            .road
            .tiles()
            .flat_map(|t| t.grid().occupants().collect::<Vec<_>>())
            .filter(|id| !state.wrecks.iter().any(|w| w.id == *id))
            .filter(|id| {
                state
                    .instance_position(*id)
                    .is_some_and(|pos| (pos.z - state.player_position.z).abs() < 0.5)
            })
            .map(|id| (id, Contact::Enemy))
            .collect();

        for button in state.abilities.button_states(state.phase(), &state.bank) {
            if button.interactable && !state.abilities.is_active(button.ability) {
                input.activate.push(button.ability.index());
            }
        }

        // Projectiles reach the ambulance after a short flight
        if let Some(timer) = self.pending_hit.as_mut() {
            *timer -= dt;
            if *timer <= 0.0 {
                input.projectile_hits = state.projectiles.iter().map(|(id, _)| id).take(1).collect();
                self.pending_hit = None;
            }
        }
        if self.pending_hit.is_none() && !state.projectiles.is_empty() {
            self.pending_hit = Some(0.5);
        }
        input
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(300.0);

    log::info!("Viral Run (headless) starting, seed {}", settings.seed);
    let mut state = GameState::with_settings(settings);
    let mut demo = DemoPlayer::default();

    let mut accumulator = 0.0;
    let mut elapsed = 0.0;
    let mut frame = 0usize;
    while elapsed < seconds && state.is_alive() && !state.enemy.is_defeated() {
        let frame_dt = FRAME_TIMES[frame % FRAME_TIMES.len()];
        frame += 1;
        elapsed += frame_dt;
        accumulator += frame_dt;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = demo.input(&state, SIM_DT);
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }
        // Spiral-of-death guard: drop time we could not simulate
        if substeps == MAX_SUBSTEPS {
            accumulator = 0.0;
        }

        for event in state.drain_events() {
            log_event(&state, &event);
        }
    }

    log::info!(
        "Run over after {:.1}s: phase {}, score {}, {} recycles",
        state.time,
        state.phase().label(),
        state.score(),
        state.road.recycles()
    );
    println!("score: {}", state.score());
    state.teardown();
}

fn log_event(state: &GameState, event: &GameEvent) {
    match event {
        GameEvent::PhaseChanged(phase) => {
            log::info!("[{:6.1}s] phase -> {}", state.time, phase.label())
        }
        GameEvent::AbilityActivated(Ability::ContagionSpray) => {
            log::debug!("[{:6.1}s] spray fired", state.time)
        }
        GameEvent::AbilityActivated(ability) => {
            log::info!("[{:6.1}s] ability {:?} activated", state.time, ability)
        }
        GameEvent::EnemyHealthChanged { current, max } => {
            log::info!("[{:6.1}s] ambulance {}/{}", state.time, current, max)
        }
        GameEvent::PlayerDied => log::info!("[{:6.1}s] player died", state.time),
        GameEvent::EnemyDefeated => log::info!("[{:6.1}s] the end", state.time),
        other => log::debug!("[{:6.1}s] {:?}", state.time, other),
    }
}
