//! Staged timed effects
//!
//! Multi-frame sequences are explicit state machines advanced once per tick
//! by the host timestep. A routine ramps its scale from `min_scale` up to
//! `peak_scale`, pulses around the peak, then ramps back down.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::lerp;

/// Shape of a ramp-pulse-ramp effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseEnvelope {
    /// Total seconds from trigger to idle
    pub duration: f32,
    /// Seconds spent on each ramp
    pub ramp_time: f32,
    pub min_scale: f32,
    pub peak_scale: f32,
    /// Pulse cycles per second
    pub frequency: f32,
    /// Pulse swing as a fraction of the peak
    pub amplitude: f32,
}

impl PulseEnvelope {
    /// Seconds spent pulsing between the two ramps
    pub fn hold_time(&self) -> f32 {
        (self.duration - 2.0 * self.ramp_time).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    RampUp,
    Pulse,
    RampDown,
}

/// What a trigger does while the routine is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retrigger {
    Ignore,
    Restart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseRoutine {
    envelope: PulseEnvelope,
    policy: Retrigger,
    stage: Stage,
    /// Seconds spent in the current stage
    elapsed: f32,
    /// Seconds since the pulse stage began, drives the sine
    pulse_clock: f32,
}

impl PulseRoutine {
    pub fn new(envelope: PulseEnvelope, policy: Retrigger) -> Self {
        Self {
            envelope,
            policy,
            stage: Stage::Idle,
            elapsed: 0.0,
            pulse_clock: 0.0,
        }
    }

    /// Start the routine. Returns false if the trigger was ignored.
    pub fn trigger(&mut self) -> bool {
        if self.is_running() && self.policy == Retrigger::Ignore {
            return false;
        }
        self.stage = Stage::RampUp;
        self.elapsed = 0.0;
        self.pulse_clock = 0.0;
        true
    }

    /// Drop back to idle without finishing
    pub fn cancel(&mut self) {
        self.stage = Stage::Idle;
        self.elapsed = 0.0;
        self.pulse_clock = 0.0;
    }

    /// Advance by `dt`. Returns true on the tick the routine finishes.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.stage == Stage::Idle {
            return false;
        }
        self.elapsed += dt;
        if self.stage == Stage::Pulse {
            self.pulse_clock += dt;
        }

        // Carry leftover time through zero-length stages
        loop {
            let limit = match self.stage {
                Stage::Idle => return true,
                Stage::RampUp | Stage::RampDown => self.envelope.ramp_time,
                Stage::Pulse => self.envelope.hold_time(),
            };
            if self.elapsed < limit {
                return false;
            }
            self.elapsed -= limit;
            self.stage = match self.stage {
                Stage::RampUp => Stage::Pulse,
                Stage::Pulse => Stage::RampDown,
                Stage::RampDown | Stage::Idle => Stage::Idle,
            };
            if self.stage == Stage::Pulse {
                self.pulse_clock = self.elapsed;
            }
            if self.stage == Stage::Idle {
                self.elapsed = 0.0;
                self.pulse_clock = 0.0;
            }
        }
    }

    /// Current visual scale
    pub fn scale(&self) -> f32 {
        let env = &self.envelope;
        let ramp_t = if env.ramp_time > 0.0 {
            self.elapsed / env.ramp_time
        } else {
            1.0
        };
        match self.stage {
            Stage::Idle => env.min_scale,
            Stage::RampUp => lerp(env.min_scale, env.peak_scale, ramp_t),
            Stage::Pulse => {
                env.peak_scale + (self.pulse_clock * TAU * env.frequency).sin() * env.peak_scale * env.amplitude
            }
            Stage::RampDown => lerp(env.peak_scale, env.min_scale, ramp_t),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn envelope(&self) -> &PulseEnvelope {
        &self.envelope
    }
}

/// Countdown that blocks an action until it elapses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    duration: f32,
    remaining: f32,
}

impl Cooldown {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            remaining: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.duration;
    }

    pub fn advance(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}
