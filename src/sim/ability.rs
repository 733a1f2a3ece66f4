//! Player abilities: unlock gating, resource costs and timed effects

use serde::{Deserialize, Serialize};

use super::bank::ResourceBank;
use super::effect::{Cooldown, PulseEnvelope, PulseRoutine, Retrigger};
use super::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Tier 1: temporary invulnerability
    CellPhase,
    /// Tier 2: higher jumps, lower gravity
    ViralOverclock,
    /// Tier 3: projectile fired at the ambulance
    ContagionSpray,
}

/// How an ability draws on the resource bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendPolicy {
    /// Bank must be exactly full; spends all of it
    FullDrain,
    Flat(u32),
}

impl Ability {
    pub const ALL: [Ability; 3] = [Ability::CellPhase, Ability::ViralOverclock, Ability::ContagionSpray];

    /// Map a HUD button index (1, 2, 3)
    pub fn from_index(index: u8) -> Option<Ability> {
        match index {
            1 => Some(Ability::CellPhase),
            2 => Some(Ability::ViralOverclock),
            3 => Some(Ability::ContagionSpray),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Ability::CellPhase => 1,
            Ability::ViralOverclock => 2,
            Ability::ContagionSpray => 3,
        }
    }

    /// First phase in which the ability can be used
    pub fn unlock_phase(self) -> Phase {
        match self {
            Ability::CellPhase => Phase::Phase2,
            Ability::ViralOverclock => Phase::Phase3,
            Ability::ContagionSpray => Phase::End,
        }
    }

    pub fn is_unlocked(self, phase: Phase) -> bool {
        phase >= self.unlock_phase()
    }

    pub fn spend_policy(self) -> SpendPolicy {
        match self {
            Ability::CellPhase | Ability::ViralOverclock => SpendPolicy::FullDrain,
            Ability::ContagionSpray => SpendPolicy::Flat(1),
        }
    }
}

/// Why an activation request was refused
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    #[error("no ability with index {0}")]
    UnknownAbility(u8),
    #[error("ability not unlocked in this phase")]
    Locked,
    #[error("not enough collectibles")]
    InsufficientResource,
    #[error("ability is cooling down")]
    CoolingDown,
    #[error("ability effect already running")]
    AlreadyRunning,
    #[error("player is down")]
    PlayerDown,
}

/// HUD view of one ability button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonState {
    pub ability: Ability,
    pub visible: bool,
    pub interactable: bool,
}

#[derive(Debug, Clone)]
pub struct AbilityController {
    cell_phase: PulseRoutine,
    overclock: PulseRoutine,
    spray: Cooldown,
    jump_multiplier: f32,
    gravity_multiplier: f32,
}

impl AbilityController {
    pub fn new(
        cell_phase: PulseEnvelope,
        overclock: PulseEnvelope,
        spray_cooldown: f32,
        jump_multiplier: f32,
        gravity_multiplier: f32,
    ) -> Self {
        Self {
            cell_phase: PulseRoutine::new(cell_phase, Retrigger::Ignore),
            overclock: PulseRoutine::new(overclock, Retrigger::Ignore),
            spray: Cooldown::new(spray_cooldown),
            jump_multiplier,
            gravity_multiplier,
        }
    }

    /// Try to fire ability `index`. Affordability is checked before the
    /// ability's own state; the bank is only charged once every check passed.
    pub fn activate(&mut self, index: u8, phase: Phase, bank: &mut ResourceBank) -> Result<Ability, Rejection> {
        let ability = Ability::from_index(index).ok_or(Rejection::UnknownAbility(index))?;
        if !ability.is_unlocked(phase) {
            return Err(Rejection::Locked);
        }
        if !Self::affordable(ability, bank) {
            return Err(Rejection::InsufficientResource);
        }
        self.check_ready(ability)?;

        let paid = match ability.spend_policy() {
            SpendPolicy::FullDrain => bank.spend(bank.max()),
            SpendPolicy::Flat(cost) => bank.spend(cost),
        };
        if !paid {
            return Err(Rejection::InsufficientResource);
        }

        match ability {
            Ability::CellPhase => {
                self.cell_phase.trigger();
            }
            Ability::ViralOverclock => {
                self.overclock.trigger();
            }
            Ability::ContagionSpray => self.spray.start(),
        }
        Ok(ability)
    }

    fn affordable(ability: Ability, bank: &ResourceBank) -> bool {
        match ability.spend_policy() {
            SpendPolicy::FullDrain => bank.is_full(),
            SpendPolicy::Flat(cost) => bank.count() >= cost,
        }
    }

    fn check_ready(&self, ability: Ability) -> Result<(), Rejection> {
        match ability {
            Ability::CellPhase if self.cell_phase.is_running() => Err(Rejection::AlreadyRunning),
            Ability::ViralOverclock if self.overclock.is_running() => Err(Rejection::AlreadyRunning),
            Ability::ContagionSpray if !self.spray.is_ready() => Err(Rejection::CoolingDown),
            _ => Ok(()),
        }
    }

    /// Advance running effects; returns the abilities whose effect just ended
    pub fn advance(&mut self, dt: f32) -> Vec<Ability> {
        let mut ended = Vec::new();
        if self.cell_phase.advance(dt) {
            ended.push(Ability::CellPhase);
        }
        if self.overclock.advance(dt) {
            ended.push(Ability::ViralOverclock);
        }
        self.spray.advance(dt);
        ended
    }

    pub fn is_active(&self, ability: Ability) -> bool {
        match ability {
            Ability::CellPhase => self.cell_phase.is_running(),
            Ability::ViralOverclock => self.overclock.is_running(),
            Ability::ContagionSpray => !self.spray.is_ready(),
        }
    }

    pub fn invulnerable(&self) -> bool {
        self.cell_phase.is_running()
    }

    /// Multiplier on the host's jump height
    pub fn jump_multiplier(&self) -> f32 {
        if self.overclock.is_running() {
            self.jump_multiplier
        } else {
            1.0
        }
    }

    /// Multiplier on the host's gravity
    pub fn gravity_multiplier(&self) -> f32 {
        if self.overclock.is_running() {
            self.gravity_multiplier
        } else {
            1.0
        }
    }

    /// Vignette scale of the Cell Phase effect
    pub fn cell_phase_scale(&self) -> f32 {
        self.cell_phase.scale()
    }

    pub fn overclock_scale(&self) -> f32 {
        self.overclock.scale()
    }

    pub fn button_states(&self, phase: Phase, bank: &ResourceBank) -> [ButtonState; 3] {
        Ability::ALL.map(|ability| {
            let visible = ability.is_unlocked(phase);
            ButtonState {
                ability,
                visible,
                interactable: visible && Self::affordable(ability, bank) && self.check_ready(ability).is_ok(),
            }
        })
    }

    /// Stop every effect and cooldown
    pub fn reset(&mut self) {
        self.cell_phase.cancel();
        self.overclock.cancel();
        self.spray = Cooldown::new(self.spray.duration());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AbilitySettings;

    fn controller() -> AbilityController {
        let s = AbilitySettings::default();
        AbilityController::new(
            s.cell_phase,
            s.viral_overclock,
            s.contagion_cooldown,
            s.jump_multiplier,
            s.gravity_multiplier,
        )
    }

    #[test]
    fn test_full_bank_drains_then_rejects() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(10, 10);

        assert_eq!(abilities.activate(1, Phase::Phase2, &mut bank), Ok(Ability::CellPhase));
        assert_eq!(bank.count(), 0);
        assert_eq!(
            abilities.activate(1, Phase::Phase2, &mut bank),
            Err(Rejection::InsufficientResource)
        );
        abilities.advance(20.0);
        assert_eq!(
            abilities.activate(1, Phase::Phase2, &mut bank),
            Err(Rejection::InsufficientResource)
        );
        assert_eq!(bank.count(), 0);
    }

    #[test]
    fn test_refilled_bank_still_waits_for_running_effect() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(10, 10);
        abilities.activate(1, Phase::Phase2, &mut bank).unwrap();

        bank.add(10);
        assert_eq!(
            abilities.activate(1, Phase::Phase2, &mut bank),
            Err(Rejection::AlreadyRunning)
        );
        assert_eq!(bank.count(), 10);
    }

    #[test]
    fn test_partial_bank_is_not_enough_for_drain_tiers() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(9, 10);
        assert_eq!(
            abilities.activate(2, Phase::Phase3, &mut bank),
            Err(Rejection::InsufficientResource)
        );
        assert_eq!(bank.count(), 9);
    }

    #[test]
    fn test_locked_before_unlock_phase() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(10, 10);
        assert_eq!(abilities.activate(1, Phase::Phase1, &mut bank), Err(Rejection::Locked));
        assert_eq!(abilities.activate(2, Phase::Phase2, &mut bank), Err(Rejection::Locked));
        assert_eq!(abilities.activate(3, Phase::Phase3, &mut bank), Err(Rejection::Locked));
        assert_eq!(bank.count(), 10);
    }

    #[test]
    fn test_unknown_index() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(10, 10);
        assert_eq!(
            abilities.activate(7, Phase::End, &mut bank),
            Err(Rejection::UnknownAbility(7))
        );
    }

    #[test]
    fn test_spray_costs_one_and_cools_down() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(3, 10);

        assert_eq!(abilities.activate(3, Phase::End, &mut bank), Ok(Ability::ContagionSpray));
        assert_eq!(bank.count(), 2);
        assert_eq!(abilities.activate(3, Phase::End, &mut bank), Err(Rejection::CoolingDown));
        assert_eq!(bank.count(), 2);

        abilities.advance(2.0);
        assert!(abilities.activate(3, Phase::End, &mut bank).is_ok());
        assert_eq!(bank.count(), 1);
    }

    #[test]
    fn test_overclock_modifiers_while_running() {
        let mut abilities = controller();
        let mut bank = ResourceBank::with_count(10, 10);
        assert_eq!(abilities.jump_multiplier(), 1.0);

        abilities.activate(2, Phase::End, &mut bank).unwrap();
        assert_eq!(abilities.jump_multiplier(), 3.0);
        assert_eq!(abilities.gravity_multiplier(), 0.5);

        let mut ended = Vec::new();
        for _ in 0..700 {
            ended.extend(abilities.advance(1.0 / 60.0));
        }
        assert_eq!(ended, vec![Ability::ViralOverclock]);
        assert_eq!(abilities.jump_multiplier(), 1.0);
    }

    #[test]
    fn test_button_states_follow_phase_and_bank() {
        let abilities = controller();
        let bank = ResourceBank::with_count(4, 10);

        let buttons = abilities.button_states(Phase::Phase2, &bank);
        assert!(buttons[0].visible && !buttons[0].interactable);
        assert!(!buttons[1].visible);
        assert!(!buttons[2].visible);

        let buttons = abilities.button_states(Phase::End, &bank);
        assert!(buttons.iter().all(|b| b.visible));
        assert!(buttons[2].interactable);
    }
}
