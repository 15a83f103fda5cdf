//! Pure admit/reject decisions for state-changing actions.
//!
//! Every function here is deterministic and side-effect-free: given the
//! current [`EntityState`] and the tuning constants it either returns the
//! resulting state or `None` for a rejection. The same code runs on the
//! authority, in observer-side optimistic prediction, and for AI-issued
//! attacks, so none of it may know which context it is called from. The one
//! external fact a decision needs, whether headroom above a crouching
//! character is obstructed, is passed in as a boolean.

use crate::state::EntityState;
use crate::wire::ActionKind;
use crate::{
    ANGULAR_SPEED, ATTACK_RANGE, JUMP_DURATION, JUMP_STAMINA_COST, ROLL_DURATION,
    ROLL_STAMINA_COST, SCAN_FREQUENCY, SIGHT_RANGE, SPRINT_DRAIN_RATE,
};

/// Static tunables shared by the authority and every observer. Both sides
/// must agree on these for prediction to match authoritative results.
#[derive(Debug, Clone)]
pub struct ActionTuning {
    pub jump_stamina_cost: f32,
    pub roll_stamina_cost: f32,
    pub jump_duration: f32,
    pub roll_duration: f32,
    pub jump_recovery_delay: f32,
    pub roll_recovery_delay: f32,
    /// Squared movement-intent magnitude below which sprint cannot engage.
    pub sprint_min_input_sq: f32,
    pub sprint_drain_rate: f32,
    pub sprint_speed_multiplier: f32,
    pub crouch_speed_multiplier: f32,
    /// Minimum current speed that lets a roll start without movement intent.
    pub roll_min_speed: f32,
    /// When false, sprinting in strafe mode requires mostly forward motion.
    pub strafe_walk_by_default: bool,
    pub attack_range: f32,
    pub sight_range: f32,
    pub scan_frequency: f32,
    /// Degrees per second for target-facing rotation.
    pub angular_speed: f32,
}

impl Default for ActionTuning {
    fn default() -> Self {
        Self {
            jump_stamina_cost: JUMP_STAMINA_COST,
            roll_stamina_cost: ROLL_STAMINA_COST,
            jump_duration: JUMP_DURATION,
            roll_duration: ROLL_DURATION,
            jump_recovery_delay: 1.0,
            roll_recovery_delay: 2.0,
            sprint_min_input_sq: 0.1,
            sprint_drain_rate: SPRINT_DRAIN_RATE,
            sprint_speed_multiplier: 1.5,
            crouch_speed_multiplier: 0.5,
            roll_min_speed: 0.25,
            strafe_walk_by_default: false,
            attack_range: ATTACK_RANGE,
            sight_range: SIGHT_RANGE,
            scan_frequency: SCAN_FREQUENCY,
            angular_speed: ANGULAR_SPEED,
        }
    }
}

/// Everything a validation needs beyond the entity record itself.
pub struct ValidationContext<'a> {
    pub tuning: &'a ActionTuning,
    /// Result of the headroom clearance probe, relevant only to crouch-exit.
    pub crouch_blocked: bool,
}

/// Dispatches to the per-kind decision function. Dead actors reject
/// everything.
pub fn validate(
    state: &EntityState,
    kind: ActionKind,
    consume_stamina: bool,
    ctx: &ValidationContext,
) -> Option<EntityState> {
    if state.is_dead {
        return None;
    }
    match kind {
        ActionKind::Jump => try_jump(state, consume_stamina, ctx.tuning),
        ActionKind::Roll => try_roll(state, ctx.tuning),
        ActionKind::Sprint(value) => try_sprint(state, value, ctx.tuning),
        ActionKind::Crouch => try_crouch(state, ctx.crouch_blocked),
        ActionKind::Strafe => try_strafe(state),
        ActionKind::Attack => try_attack(state),
    }
}

pub fn try_jump(
    state: &EntityState,
    consume_stamina: bool,
    tuning: &ActionTuning,
) -> Option<EntityState> {
    if state.custom_action {
        return None;
    }
    let stamina_ok = state.current_stamina > tuning.jump_stamina_cost;
    let jump_ok =
        !state.is_crouching && state.is_grounded && !state.actions && stamina_ok && !state.is_jumping;
    if !jump_ok {
        return None;
    }

    let mut next = state.clone();
    next.is_jumping = true;
    next.jump_timer = tuning.jump_duration;
    if consume_stamina {
        next.reduce_stamina(tuning.jump_stamina_cost);
        next.stamina_recovery_delay = tuning.jump_recovery_delay;
    }
    Some(next)
}

pub fn try_roll(state: &EntityState, tuning: &ActionTuning) -> Option<EntityState> {
    let stamina_ok = state.current_stamina > tuning.roll_stamina_cost;
    // A roll may cancel a quick stop, but no other exclusive action.
    let actions_ok = !state.actions || state.quick_stop;
    let moving = !state.input.is_zero() || state.speed > tuning.roll_min_speed;
    let roll_ok = moving && actions_ok && state.is_grounded && stamina_ok && !state.is_jumping;
    if !roll_ok || state.is_rolling {
        return None;
    }

    let mut next = state.clone();
    next.is_rolling = true;
    next.actions = true;
    next.quick_stop = false;
    next.roll_timer = tuning.roll_duration;
    next.reduce_stamina(tuning.roll_stamina_cost);
    next.stamina_recovery_delay = tuning.roll_recovery_delay;
    Some(next)
}

pub fn try_sprint(state: &EntityState, value: bool, tuning: &ActionTuning) -> Option<EntityState> {
    if value {
        if state.is_sprinting {
            return None;
        }
        let sprint_ok = state.is_grounded
            && !state.is_crouching
            && state.current_stamina > 0.0
            && state.input.magnitude_squared() > tuning.sprint_min_input_sq;
        if !sprint_ok {
            return None;
        }
        let mut next = state.clone();
        next.is_sprinting = true;
        Some(next)
    } else {
        if !state.is_sprinting {
            return None;
        }
        let strafe_stall = state.is_strafing
            && !tuning.strafe_walk_by_default
            && (state.direction >= 0.5 || state.direction <= -0.5 || state.speed <= 0.0);
        let must_stop = state.current_stamina <= 0.0
            || state.input.magnitude_squared() < tuning.sprint_min_input_sq
            || state.is_crouching
            || !state.is_grounded
            || state.actions
            || strafe_stall;
        if !must_stop {
            return None;
        }
        let mut next = state.clone();
        next.is_sprinting = false;
        Some(next)
    }
}

pub fn try_crouch(state: &EntityState, crouch_blocked: bool) -> Option<EntityState> {
    if !state.is_grounded || state.actions {
        return None;
    }
    let mut next = state.clone();
    if state.is_crouching {
        // Standing up needs headroom; under a low ceiling the toggle
        // re-asserts the crouch.
        next.is_crouching = crouch_blocked;
    } else {
        next.is_crouching = true;
        next.is_sprinting = false;
    }
    Some(next)
}

pub fn try_strafe(state: &EntityState) -> Option<EntityState> {
    let mut next = state.clone();
    next.is_strafing = !state.is_strafing;
    Some(next)
}

/// The AI attack pseudo-action. Carries no state delta; an accepted result
/// exists so the attack trigger travels the same path as every other action.
pub fn try_attack(state: &EntityState) -> Option<EntityState> {
    if state.custom_action || state.is_jumping || state.is_rolling {
        return None;
    }
    Some(state.clone())
}

/// Per-tick simulation of the record: timer countdowns, sprint drain,
/// stamina recovery, derived locomotion speed. Runs identically on the
/// authority and on observer replicas.
pub fn advance(state: &mut EntityState, dt: f32, tuning: &ActionTuning) {
    if state.is_dead {
        return;
    }

    if state.is_jumping {
        state.jump_timer -= dt;
        if state.jump_timer <= 0.0 {
            state.jump_timer = 0.0;
            state.is_jumping = false;
        }
    }
    if state.is_rolling {
        state.roll_timer -= dt;
        if state.roll_timer <= 0.0 {
            state.roll_timer = 0.0;
            state.is_rolling = false;
            state.actions = state.custom_action;
        }
    }

    if state.is_sprinting {
        state.reduce_stamina(tuning.sprint_drain_rate * dt);
        // Invariant: sprint requires ground, standing and stamina.
        if state.current_stamina <= 0.0 || !state.is_grounded || state.is_crouching {
            state.is_sprinting = false;
        }
    } else {
        state.recover_stamina(dt);
    }

    let intent = state.input.magnitude().min(1.0);
    let multiplier = if state.is_sprinting {
        tuning.sprint_speed_multiplier
    } else if state.is_crouching {
        tuning.crouch_speed_multiplier
    } else {
        1.0
    };
    state.speed = intent * multiplier;
    state.direction = if state.is_strafing {
        state.input.x.clamp(-1.0, 1.0)
    } else {
        0.0
    };
}
