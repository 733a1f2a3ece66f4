//! Bounded collectible counter that pays for abilities

use super::events::Observers;

/// Collectibles held by the player, `0 <= count <= max`
#[derive(Debug)]
pub struct ResourceBank {
    count: u32,
    max: u32,
    /// Receives the new count after every change
    pub on_changed: Observers<u32>,
}

impl ResourceBank {
    pub fn new(max: u32) -> Self {
        Self::with_count(0, max)
    }

    pub fn with_count(count: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            count: count.min(max),
            max,
            on_changed: Observers::new(),
        }
    }

    /// Send the current count to subscribers, so a late HUD starts in sync
    pub fn notify_current(&mut self) {
        self.on_changed.notify(&self.count);
    }

    /// Add collectibles, saturating at `max`
    pub fn add(&mut self, amount: u32) {
        self.count = self.count.saturating_add(amount).min(self.max);
        self.on_changed.notify(&self.count);
    }

    /// Take `amount` out of the bank. Fails without side effects if short.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.count < amount {
            return false;
        }
        self.count -= amount;
        self.on_changed.notify(&self.count);
        true
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.count == self.max
    }

    /// Fill level in [0, 1] for the HUD bar
    pub fn fill_fraction(&self) -> f32 {
        self.count as f32 / self.max as f32
    }
}
