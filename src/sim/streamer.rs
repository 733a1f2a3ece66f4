//! Sliding window of road tiles
//!
//! The streamer owns a fixed number of tiles laid end to end along +Z. Every
//! tick it ramps the shared scroll speed, moves the tiles toward the player,
//! and recycles the lead tile once it has fallen far enough behind.

use std::collections::VecDeque;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::SlotRef;
use super::pool::{InstanceId, ObjectPool};
use super::tile::{ScrollSpeed, Tile, TileId, TileTemplate};
use crate::consts::MAX_OBSTACLES_PER_SEGMENT;

/// Scroll speed growth toward a cap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRamp {
    pub base: f32,
    /// Units per second gained each second
    pub rate: f32,
    pub max: f32,
}

impl SpeedRamp {
    pub fn step(&self, current: f32, dt: f32) -> f32 {
        (current + self.rate * dt).min(self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Tiles in the window
    pub window: usize,
    /// Trailing edge distance behind the player that triggers a recycle
    pub despawn_back: f32,
    /// Tiles whose center is closer than this to the player get no obstacles
    pub delay_distance: f32,
    /// X offset of every tile (scenery rows sit beside the road)
    pub lateral_offset: f32,
    /// `None` for streamers that follow a speed ramped elsewhere
    pub ramp: Option<SpeedRamp>,
}

#[derive(Debug)]
pub struct WorldStreamer {
    tiles: VecDeque<Tile>,
    speed: ScrollSpeed,
    config: StreamerConfig,
    template: TileTemplate,
    target_density: usize,
    recycles: u64,
}

impl WorldStreamer {
    /// Streamer with no tiles yet; call `spawn_initial` to fill the window
    pub fn new(config: StreamerConfig, template: TileTemplate, speed: ScrollSpeed) -> Self {
        if let Some(ramp) = config.ramp {
            speed.set(ramp.base);
        }
        Self {
            tiles: VecDeque::with_capacity(config.window),
            speed,
            config,
            template,
            target_density: 0,
            recycles: 0,
        }
    }

    /// Decorative streamer: empty grids, no ramp of its own
    pub fn scenery(window: usize, despawn_back: f32, lateral_offset: f32, template: TileTemplate, speed: ScrollSpeed) -> Self {
        Self::new(
            StreamerConfig {
                window,
                despawn_back,
                delay_distance: 0.0,
                lateral_offset,
                ramp: None,
            },
            template,
            speed,
        )
    }

    /// Lay out the window starting at the player, populating every tile
    pub fn spawn_initial<R: Rng>(&mut self, player: Vec3, pool: &mut ObjectPool, rng: &mut R) {
        self.teardown(pool);
        let mut prev_trailing = None;
        for i in 0..self.config.window {
            let mut tile = self.template.instantiate(TileId(i as u32), self.speed.clone());
            let half = tile.length() * 0.5;
            let z = match prev_trailing {
                None => player.z - half,
                Some(trailing) => trailing + half,
            };
            tile.set_position(Vec3::new(self.config.lateral_offset, 0.0, z));
            prev_trailing = Some(tile.trailing_edge());
            self.setup_segment(&mut tile, player, pool, rng);
            self.tiles.push_back(tile);
        }
        log::debug!("WorldStreamer: spawned {} tiles", self.tiles.len());
    }

    /// Advance one frame. Returns how many tiles were recycled.
    pub fn tick<R: Rng>(&mut self, dt: f32, player: Vec3, pool: &mut ObjectPool, rng: &mut R) -> usize {
        if self.tiles.is_empty() {
            return 0;
        }
        if let Some(ramp) = self.config.ramp {
            self.speed.set(ramp.step(self.speed.get(), dt));
        }
        let delta = Vec3::new(0.0, 0.0, -self.speed.get() * dt);
        for tile in &mut self.tiles {
            tile.translate(delta);
        }

        let threshold = player.z - self.config.despawn_back;
        let mut recycled = 0;
        // Bounded so a tile window shorter than the threshold gap cannot spin
        while recycled < self.tiles.len() {
            match self.tiles.front() {
                Some(lead) if lead.trailing_edge() <= threshold => {
                    self.recycle_first(player, pool, rng);
                    recycled += 1;
                }
                _ => break,
            }
        }
        recycled
    }

    /// Move the lead tile behind the tail and repopulate it
    pub fn recycle_first<R: Rng>(&mut self, player: Vec3, pool: &mut ObjectPool, rng: &mut R) {
        let Some(mut tile) = self.tiles.pop_front() else {
            return;
        };
        // Out of play until it is repositioned and repopulated
        tile.set_active(false);
        // With a window of one the tile follows itself
        let tail_edge = self.tiles.back().map_or(tile.trailing_edge(), Tile::trailing_edge);
        let mut position = tile.position();
        position.z = tail_edge + tile.length() * 0.5;
        tile.set_position(position);

        self.setup_segment(&mut tile, player, pool, rng);
        tile.set_active(true);
        log::debug!(
            "WorldStreamer: recycled tile {} to z={:.2}",
            tile.id().0,
            tile.position().z
        );
        self.tiles.push_back(tile);
        self.recycles += 1;
    }

    fn setup_segment<R: Rng>(&self, tile: &mut Tile, player: Vec3, pool: &mut ObjectPool, rng: &mut R) {
        let target = if tile.position().z - player.z < self.config.delay_distance {
            0
        } else {
            self.target_density
        };
        tile.grid_mut().populate(pool, target, rng);
    }

    /// Obstacles per segment for tiles populated from now on
    pub fn set_target_density(&mut self, density: usize) {
        if density > MAX_OBSTACLES_PER_SEGMENT {
            log::warn!(
                "WorldStreamer: density {} capped to {}",
                density,
                MAX_OBSTACLES_PER_SEGMENT
            );
        }
        self.target_density = density.min(MAX_OBSTACLES_PER_SEGMENT);
    }

    pub fn target_density(&self) -> usize {
        self.target_density
    }

    /// Stop scrolling for good (player death)
    pub fn halt(&mut self) {
        self.speed.set(0.0);
        if let Some(ramp) = self.config.ramp.as_mut() {
            ramp.base = 0.0;
            ramp.rate = 0.0;
            ramp.max = 0.0;
        }
    }

    /// Reset speed to the ramp base and rebuild the window around the player
    pub fn reinitialize<R: Rng>(&mut self, ramp: SpeedRamp, player: Vec3, pool: &mut ObjectPool, rng: &mut R) {
        if self.config.ramp.is_some() {
            self.config.ramp = Some(ramp);
            self.speed.set(ramp.base);
        }
        self.recycles = 0;
        self.spawn_initial(player, pool, rng);
    }

    /// World positions of every free slot across active tiles
    pub fn free_slot_positions(&self) -> Vec<Vec3> {
        self.tiles
            .iter()
            .filter(|t| t.is_active())
            .flat_map(|t| t.grid().free_slot_positions(t.position()))
            .collect()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id() == id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.id() == id)
    }

    /// Drop a destroyed instance from the slot that still names it
    pub fn vacate(&mut self, slot: SlotRef, id: InstanceId) -> bool {
        self.tile_mut(slot.tile)
            .is_some_and(|tile| tile.grid_mut().vacate(slot.row, slot.index, id))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn speed(&self) -> f32 {
        self.speed.get()
    }

    pub fn recycles(&self) -> u64 {
        self.recycles
    }

    /// Return every occupant to the pool and drop all tiles
    pub fn teardown(&mut self, pool: &mut ObjectPool) {
        for tile in &mut self.tiles {
            tile.set_active(false);
            tile.grid_mut().clear(pool);
        }
        self.tiles.clear();
    }
}
