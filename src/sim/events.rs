//! Observer registry and the per-frame event stream
//!
//! Publishers own an `Observers<T>`; subscribers register a callback and keep
//! the returned `SubscriptionId` so they can unsubscribe on teardown.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::ability::{Ability, Rejection};
use super::phase::Phase;

/// Handle returned by `Observers::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

/// Ordered list of subscriber callbacks for one kind of notification
pub struct Observers<T> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; notifications arrive in subscription order
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if the id was unknown or already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn notify(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drop every subscriber (scene teardown)
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

/// Notifications produced by a tick, drained by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged(Phase),
    /// Banner text to show for the phase-change message
    PhaseMessage(String),
    ResourceChanged { count: u32, max: u32 },
    AbilityActivated(Ability),
    AbilityRejected { index: u8, reason: Rejection },
    AbilityEnded(Ability),
    ObstacleExploded { by_player: bool },
    CollectibleDropped,
    CollectiblePicked,
    EnemyHealthChanged { current: u32, max: u32 },
    /// Enemy reached zero health and its death delay elapsed
    EnemyDefeated,
    PlayerDied,
}

/// Shared FIFO of events. Observer callbacks hold a clone and push into it;
/// the session drains it once per frame.
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<Vec<GameEvent>>>);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: GameEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Take every queued event, oldest first
    pub fn drain(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::<u32>::new();

        let a = Rc::clone(&log);
        observers.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&log);
        observers.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        observers.notify(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let hits = Rc::new(RefCell::new(0));
        let mut observers = Observers::<()>::new();

        let h = Rc::clone(&hits);
        let id = observers.subscribe(move |_| *h.borrow_mut() += 1);
        observers.notify(&());
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&());

        assert_eq!(*hits.borrow(), 1);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_queue_fed_by_observer() {
        let queue = EventQueue::new();
        let mut observers = Observers::<u32>::new();
        let q = queue.clone();
        observers.subscribe(move |count| q.push(GameEvent::ResourceChanged { count: *count, max: 10 }));

        observers.notify(&3);
        observers.notify(&4);
        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], GameEvent::ResourceChanged { count: 4, max: 10 });
        assert!(queue.is_empty());
    }
}
