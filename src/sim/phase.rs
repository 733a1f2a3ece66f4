//! Timed game phases
//!
//! Phase1 -> Phase2 -> Phase3 -> End, one step each time the phase timer
//! runs out. End is terminal. Every entry pushes the phase's obstacle density
//! to the road streamer before subscribers hear about it.

use serde::{Deserialize, Serialize};

use super::events::Observers;
use super::streamer::WorldStreamer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Phase1,
    Phase2,
    Phase3,
    /// Final encounter with the ambulance
    End,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Phase1, Phase::Phase2, Phase::Phase3, Phase::End];

    /// Following phase; End stays End
    pub fn next(self) -> Phase {
        match self {
            Phase::Phase1 => Phase::Phase2,
            Phase::Phase2 => Phase::Phase3,
            Phase::Phase3 | Phase::End => Phase::End,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Phase1 => "Phase 1",
            Phase::Phase2 => "Phase 2",
            Phase::Phase3 => "Phase 3",
            Phase::End => "End",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::End
    }
}

#[derive(Debug)]
pub struct PhaseMachine {
    current: Phase,
    /// Seconds left in the current phase
    timer: f32,
    durations: [f32; 3],
    densities: [usize; 4],
    pub on_changed: Observers<Phase>,
}

impl PhaseMachine {
    /// `durations` for Phase1..Phase3, `densities` for Phase1..End
    pub fn new(durations: [f32; 3], densities: [usize; 4]) -> Self {
        Self {
            current: Phase::Phase1,
            timer: durations[0],
            durations,
            densities,
            on_changed: Observers::new(),
        }
    }

    /// Enter Phase1. Call once after subscribers are wired.
    pub fn start(&mut self, streamer: &mut WorldStreamer) {
        self.enter(Phase::Phase1, streamer);
    }

    /// Count the timer down; returns the phase entered, if any
    pub fn tick(&mut self, dt: f32, streamer: &mut WorldStreamer) -> Option<Phase> {
        if self.current.is_terminal() {
            return None;
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        let next = self.current.next();
        self.enter(next, streamer);
        Some(next)
    }

    fn enter(&mut self, phase: Phase, streamer: &mut WorldStreamer) {
        self.current = phase;
        // No carry-over: each phase runs its full duration
        self.timer = self.duration_of(phase).unwrap_or(0.0);
        streamer.set_target_density(self.density_for(phase));
        log::info!("PhaseMachine: entered {}", phase.label());
        self.on_changed.notify(&phase);
    }

    #[inline]
    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn time_remaining(&self) -> f32 {
        self.timer.max(0.0)
    }

    pub fn density_for(&self, phase: Phase) -> usize {
        self.densities[phase.index()]
    }

    /// `None` for End, which has no timer
    pub fn duration_of(&self, phase: Phase) -> Option<f32> {
        self.durations.get(phase.index()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::streamer::StreamerConfig;
    use crate::sim::tile::{ScrollSpeed, TileTemplate};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn streamer() -> WorldStreamer {
        WorldStreamer::new(
            StreamerConfig {
                window: 2,
                despawn_back: 40.0,
                delay_distance: 10.0,
                lateral_offset: 0.0,
                ramp: None,
            },
            TileTemplate::road(20.0, 9.0, 4, &[-3.0, 0.0, 3.0]),
            ScrollSpeed::new(8.0),
        )
    }

    #[test]
    fn test_start_notifies_and_sets_density() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut machine = PhaseMachine::new([60.0; 3], [1, 2, 3, 7]);
        let s = Rc::clone(&seen);
        machine.on_changed.subscribe(move |p| s.borrow_mut().push(*p));
        let mut road = streamer();

        machine.start(&mut road);
        assert_eq!(*seen.borrow(), vec![Phase::Phase1]);
        assert_eq!(road.target_density(), 1);
    }

    #[test]
    fn test_advances_once_per_duration() {
        let mut machine = PhaseMachine::new([1.0, 2.0, 1.0], [1, 2, 3, 7]);
        let mut road = streamer();
        machine.start(&mut road);

        assert_eq!(machine.tick(0.5, &mut road), None);
        assert_eq!(machine.tick(0.5, &mut road), Some(Phase::Phase2));
        assert_eq!(road.target_density(), 2);
        // Timer reset to the full Phase2 duration
        assert_eq!(machine.tick(1.5, &mut road), None);
        assert_eq!(machine.tick(0.5, &mut road), Some(Phase::Phase3));
        assert_eq!(machine.tick(5.0, &mut road), Some(Phase::End));
        assert_eq!(road.target_density(), 7);
        assert_eq!(machine.tick(1000.0, &mut road), None);
        assert_eq!(machine.current(), Phase::End);
    }

    #[test]
    fn test_long_frame_advances_one_step() {
        let mut machine = PhaseMachine::new([1.0; 3], [0, 0, 0, 0]);
        let mut road = streamer();
        machine.start(&mut road);
        assert_eq!(machine.tick(10.0, &mut road), Some(Phase::Phase2));
        assert_eq!(machine.current(), Phase::Phase2);
    }

    proptest! {
        #[test]
        fn prop_phase_monotonic(steps in prop::collection::vec(0.0f32..5.0, 0..200)) {
            let mut machine = PhaseMachine::new([3.0, 4.0, 5.0], [1, 2, 3, 7]);
            let mut road = streamer();
            machine.start(&mut road);
            let mut last = machine.current();
            let mut last_density = road.target_density();

            for dt in steps {
                let entered = machine.tick(dt, &mut road);
                let now = machine.current();
                prop_assert!(now >= last);
                if let Some(phase) = entered {
                    prop_assert_eq!(phase, last.next());
                }
                prop_assert!(road.target_density() >= last_density);
                last = now;
                last_density = road.target_density();
            }
        }
    }
}
