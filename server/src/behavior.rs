//! The autonomous-agent state machine: Wander -> Chase -> Attack, with a
//! terminal Dead. Runs on the authority only. The machine consumes the
//! agent's threat registry and candidate views, and emits directives:
//! a movement destination for the navigation collaborator, an attack to
//! route through the same submit path human actions use, and a facing yaw.

use log::debug;
use shared::{EntityState, Vec3};

use crate::perception::{Candidate, ThreatRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Wander,
    Chase,
    Attack,
    Dead,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub attack_range: f32,
    pub sight_range: f32,
    pub scan_frequency: f32,
    /// Degrees per second when slewing toward the target.
    pub angular_speed: f32,
    pub move_speed: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            attack_range: shared::ATTACK_RANGE,
            sight_range: shared::SIGHT_RANGE,
            scan_frequency: shared::SCAN_FREQUENCY,
            angular_speed: shared::ANGULAR_SPEED,
            move_speed: 2.0,
        }
    }
}

/// What one behavior tick wants the outside world to do.
#[derive(Debug, Default, PartialEq)]
pub struct AgentDirective {
    pub destination: Option<Vec3>,
    pub attack: bool,
    pub yaw: Option<f32>,
    /// The agent died; the caller tears it down.
    pub despawn: bool,
}

pub struct AgentBehavior {
    mood: Mood,
    target: Option<u32>,
    attack_range_override: Option<f32>,
    registry: ThreatRegistry,
    rally_point: Option<u32>,
    config: AgentConfig,
    /// Cleared when a required collaborator is missing; a disabled agent is
    /// never ticked.
    pub enabled: bool,
}

impl AgentBehavior {
    pub fn new(config: AgentConfig, rally_point: Option<u32>) -> Self {
        Self {
            mood: Mood::Wander,
            target: None,
            attack_range_override: None,
            registry: ThreatRegistry::new(config.scan_frequency),
            rally_point,
            config,
            enabled: true,
        }
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// One evaluation: scan refresh (cadence-gated), then mood processing.
    pub fn tick(
        &mut self,
        now: f32,
        dt: f32,
        self_state: &EntityState,
        candidates: &[Candidate],
    ) -> AgentDirective {
        if self_state.is_dead {
            self.transition(self_state.id, Mood::Dead);
            return AgentDirective {
                despawn: true,
                ..AgentDirective::default()
            };
        }

        if self.registry.due(now) {
            self.registry.scan(
                now,
                self_state.position,
                candidates,
                self.config.sight_range,
            );
        }

        match self.mood {
            Mood::Wander => self.wander(self_state, candidates),
            Mood::Chase => self.chase(self_state, candidates, dt),
            Mood::Attack => self.attack(self_state, candidates, dt),
            Mood::Dead => AgentDirective {
                despawn: true,
                ..AgentDirective::default()
            },
        }
    }

    fn wander(&mut self, self_state: &EntityState, candidates: &[Candidate]) -> AgentDirective {
        self.select_target(self_state.position, candidates);
        if self.live_target(candidates).is_some() {
            self.transition(self_state.id, Mood::Chase);
        }
        // No candidates and no rally point: idle, no destination updates.
        AgentDirective::default()
    }

    fn chase(
        &mut self,
        self_state: &EntityState,
        candidates: &[Candidate],
        dt: f32,
    ) -> AgentDirective {
        self.select_target(self_state.position, candidates);

        let Some(target) = self.live_target(candidates) else {
            self.transition(self_state.id, Mood::Wander);
            return AgentDirective::default();
        };

        let mut directive = AgentDirective {
            destination: Some(target.position),
            ..AgentDirective::default()
        };

        if self.in_attack_range(self_state.position, target.position) {
            self.transition(self_state.id, Mood::Attack);
            directive.yaw = Some(self.face_target(self_state, target.position, dt));
            directive.attack = true;
            directive.destination = None;
        }
        directive
    }

    fn attack(
        &mut self,
        self_state: &EntityState,
        candidates: &[Candidate],
        dt: f32,
    ) -> AgentDirective {
        let Some(target) = self.live_target(candidates) else {
            // Target died or despawned mid-tick: run the fallback rule and
            // drop back to Chase.
            self.select_target(self_state.position, candidates);
            self.transition(self_state.id, Mood::Chase);
            return AgentDirective::default();
        };

        if self.in_attack_range(self_state.position, target.position) {
            AgentDirective {
                yaw: Some(self.face_target(self_state, target.position, dt)),
                attack: true,
                ..AgentDirective::default()
            }
        } else {
            self.transition(self_state.id, Mood::Chase);
            AgentDirective::default()
        }
    }

    /// Target tie-break, preserved from the source behavior: the *farthest*
    /// live candidate wins, and the held target is only replaced by a
    /// strictly farther one. When the held target has died and no
    /// replacement was found this pass, fall back to the rally point.
    fn select_target(&mut self, origin: Vec3, candidates: &[Candidate]) {
        let mut farthest = -1.0f32;
        let mut replacement_found = false;

        for &id in self.registry.threats() {
            let Some(candidate) = candidates.iter().find(|c| c.id == id) else {
                continue;
            };
            let distance_sq = origin.flat_distance_squared(&candidate.position);
            if distance_sq > farthest {
                farthest = distance_sq;
                if self.target != Some(id) && !candidate.is_dead {
                    self.target = Some(id);
                    self.attack_range_override = candidate.attack_range;
                    replacement_found = true;
                }
            }
        }

        let held_gone = match self.target {
            Some(id) => candidates
                .iter()
                .find(|c| c.id == id)
                .map_or(true, |c| c.is_dead),
            None => true,
        };
        if held_gone && !replacement_found {
            self.target = self.rally_point;
            self.attack_range_override = None;
        }
    }

    fn live_target<'a>(&self, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let id = self.target?;
        candidates.iter().find(|c| c.id == id && !c.is_dead)
    }

    fn in_attack_range(&self, origin: Vec3, target: Vec3) -> bool {
        let range = self.attack_range_override.unwrap_or(self.config.attack_range);
        origin.flat_distance_squared(&target) <= range * range
    }

    /// Slews the agent's yaw toward the ground-projected bearing of the
    /// target, bounded by the angular speed. Returns the new yaw in degrees.
    fn face_target(&self, self_state: &EntityState, target: Vec3, dt: f32) -> f32 {
        let dx = target.x - self_state.position.x;
        let dz = target.z - self_state.position.z;
        if dx == 0.0 && dz == 0.0 {
            return self_state.rotation.y;
        }
        let bearing = dx.atan2(dz).to_degrees();
        let current = self_state.rotation.y;

        let mut delta = (bearing - current) % 360.0;
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta < -180.0 {
            delta += 360.0;
        }

        let max_step = self.config.angular_speed * dt;
        current + delta.clamp(-max_step, max_step)
    }

    fn transition(&mut self, agent_id: u32, mood: Mood) {
        if self.mood != mood {
            debug!("agent {}: {:?} -> {:?}", agent_id, self.mood, mood);
            self.mood = mood;
        }
    }
}
