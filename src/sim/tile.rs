//! Road tiles and the shared scroll speed
//!
//! A tile is one fixed-length segment of the scrolling road. Its position is
//! the tile center; the travel axis is +Z (tiles scroll toward -Z).

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::grid::SlotGrid;

/// Fallback length for a tile with no visual content
pub const DEFAULT_TILE_LENGTH: f32 = 1.0;

/// Stable index of a tile within its streamer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// Axis-aligned box of a piece of visual content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box of the given size centered on `center`
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow to also cover `other`
    pub fn encapsulate(&mut self, other: &Bounds) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Process-wide scroll speed shared by every tile and pickup.
///
/// Cloning the handle shares the value; the simulation is single-threaded.
#[derive(Debug, Clone, Default)]
pub struct ScrollSpeed(Rc<Cell<f32>>);

impl ScrollSpeed {
    pub fn new(speed: f32) -> Self {
        Self(Rc::new(Cell::new(speed)))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, speed: f32) {
        self.0.set(speed);
    }
}

/// One segment of the road with its obstacle slot grid
#[derive(Debug)]
pub struct Tile {
    id: TileId,
    length: f32,
    position: Vec3,
    active: bool,
    grid: SlotGrid,
    speed: ScrollSpeed,
}

impl Tile {
    /// Build a tile, measuring its length once from its content bounds.
    ///
    /// Length is the Z extent of all content; empty content falls back to
    /// `DEFAULT_TILE_LENGTH`.
    pub fn initialize(id: TileId, content: &[Bounds], mut grid: SlotGrid, speed: ScrollSpeed) -> Self {
        let length = match content.split_first() {
            Some((first, rest)) => {
                let mut bounds = *first;
                for b in rest {
                    bounds.encapsulate(b);
                }
                bounds.size().z
            }
            None => DEFAULT_TILE_LENGTH,
        };
        grid.set_owner(id);

        Self {
            id,
            length,
            position: Vec3::ZERO,
            active: true,
            grid,
            speed,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    /// Length along the travel axis (immutable after initialization)
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Edge nearest the player (smallest Z)
    #[inline]
    pub fn leading_edge(&self) -> f32 {
        self.position.z - self.length * 0.5
    }

    /// Edge farthest from the player (largest Z)
    #[inline]
    pub fn trailing_edge(&self) -> f32 {
        self.position.z + self.length * 0.5
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut SlotGrid {
        &mut self.grid
    }

    /// Current global scroll speed
    pub fn global_speed(&self) -> f32 {
        self.speed.get()
    }

    pub fn set_global_speed(&self, speed: f32) {
        self.speed.set(speed);
    }
}

/// Blueprint shared by every tile of a streamer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileTemplate {
    /// Visual content boxes, measured for the tile length
    pub content: Vec<Bounds>,
    /// Slot local positions, one inner list per row
    pub rows: Vec<Vec<Vec3>>,
}

impl TileTemplate {
    /// Road tile: `row_count` evenly spaced rows, one slot per lane offset
    pub fn road(length: f32, width: f32, row_count: usize, lanes: &[f32]) -> Self {
        let step = length / row_count.max(1) as f32;
        let rows = (0..row_count)
            .map(|r| {
                let z = -length * 0.5 + (r as f32 + 0.5) * step;
                lanes.iter().map(|&x| Vec3::new(x, 0.0, z)).collect()
            })
            .collect();

        Self {
            content: vec![Bounds::from_center_size(Vec3::ZERO, Vec3::new(width, 0.2, length))],
            rows,
        }
    }

    /// Decorative tile with no slots
    pub fn scenery(length: f32, width: f32) -> Self {
        Self {
            content: vec![Bounds::from_center_size(Vec3::ZERO, Vec3::new(width, width, length))],
            rows: Vec::new(),
        }
    }

    pub fn instantiate(&self, id: TileId, speed: ScrollSpeed) -> Tile {
        Tile::initialize(id, &self.content, SlotGrid::from_rows(self.rows.clone()), speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_measured_from_content() {
        let content = [
            Bounds::new(Vec3::new(-1.0, 0.0, -4.0), Vec3::new(1.0, 1.0, 2.0)),
            Bounds::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.5, 3.0, 6.0)),
        ];
        let tile = Tile::initialize(TileId(0), &content, SlotGrid::empty(), ScrollSpeed::new(8.0));
        assert!((tile.length() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_content_defaults_length() {
        let tile = Tile::initialize(TileId(0), &[], SlotGrid::empty(), ScrollSpeed::new(8.0));
        assert_eq!(tile.length(), DEFAULT_TILE_LENGTH);
    }

    #[test]
    fn test_edges_around_center() {
        let mut tile = TileTemplate::road(20.0, 9.0, 4, &[-3.0, 0.0, 3.0])
            .instantiate(TileId(1), ScrollSpeed::new(8.0));
        tile.set_position(Vec3::new(0.0, 0.0, 50.0));
        assert!((tile.leading_edge() - 40.0).abs() < 1e-5);
        assert!((tile.trailing_edge() - 60.0).abs() < 1e-5);
        assert_eq!(tile.grid().row_count(), 4);
    }

    #[test]
    fn test_speed_is_shared_between_tiles() {
        let speed = ScrollSpeed::new(8.0);
        let template = TileTemplate::scenery(20.0, 4.0);
        let a = template.instantiate(TileId(0), speed.clone());
        let b = template.instantiate(TileId(1), speed.clone());

        a.set_global_speed(12.5);
        assert_eq!(b.global_speed(), 12.5);
        assert_eq!(speed.get(), 12.5);
    }
}
