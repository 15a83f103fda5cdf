//! Roster of autonomous agents on the authority. Each tick it feeds every
//! enabled agent its candidate view, applies the resulting directives
//! (destinations to the navigator, facing to the store, attacks through
//! the same submit path as human actions) and steers positions.

use std::collections::HashMap;

use log::{info, warn};
use shared::{ActionKind, ActionRequest, ActionResult, Vec3};

use crate::authority::WorldAuthority;
use crate::behavior::{AgentBehavior, AgentConfig};
use crate::nav::Navigator;
use crate::perception::Candidate;

pub struct AgentRoster {
    agents: HashMap<u32, AgentBehavior>,
    /// Per-agent sequence counter for AI-issued attack requests.
    attack_sequences: HashMap<u32, u32>,
    /// Per-entity attack range overrides carried by special targets.
    range_overrides: HashMap<u32, f32>,
    /// Simulation clock driving scan cadence, seconds.
    clock: f32,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
            attack_sequences: HashMap::new(),
            range_overrides: HashMap::new(),
            clock: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent(&self, agent_id: &u32) -> Option<&AgentBehavior> {
        self.agents.get(agent_id)
    }

    pub fn is_agent(&self, entity_id: &u32) -> bool {
        self.agents.contains_key(entity_id)
    }

    /// Marks an entity as carrying a per-target attack range, the way a
    /// large stationary objective widens the reach of its attackers.
    pub fn set_range_override(&mut self, entity_id: u32, range: f32) {
        self.range_overrides.insert(entity_id, range);
    }

    /// Registers an agent. Without a navigator the agent cannot act on its
    /// decisions, so it disables itself instead of failing the world.
    pub fn spawn(
        &mut self,
        agent_id: u32,
        config: AgentConfig,
        rally_point: Option<u32>,
        navigator: Option<&mut dyn Navigator>,
    ) {
        let mut behavior = AgentBehavior::new(config, rally_point);
        match navigator {
            Some(_) => info!("Agent {} activated", agent_id),
            None => {
                warn!("Agent {} has no navigator; disabling", agent_id);
                behavior.enabled = false;
            }
        }
        self.agents.insert(agent_id, behavior);
        self.attack_sequences.insert(agent_id, 0);
    }

    pub fn despawn(&mut self, agent_id: &u32, navigator: &mut dyn Navigator) {
        self.agents.remove(agent_id);
        self.attack_sequences.remove(agent_id);
        navigator.clear_destination(*agent_id);
    }

    /// Drives every enabled agent one step and steers positions. Accepted
    /// AI actions come back as results for the network layer to broadcast.
    pub fn tick(
        &mut self,
        dt: f32,
        authority: &mut WorldAuthority,
        navigator: &mut dyn Navigator,
    ) -> Vec<ActionResult> {
        self.clock += dt;
        let mut results = Vec::new();
        let mut torn_down = Vec::new();

        let agent_ids: Vec<u32> = self.agents.keys().copied().collect();
        for agent_id in &agent_ids {
            let Some(state) = authority.entity(agent_id).cloned() else {
                torn_down.push(*agent_id);
                continue;
            };
            let candidates: Vec<Candidate> = authority
                .entities()
                .filter(|e| e.id != *agent_id && !agent_ids.contains(&e.id))
                .map(|e| Candidate {
                    id: e.id,
                    position: e.position,
                    is_dead: e.is_dead,
                    attack_range: self.range_overrides.get(&e.id).copied(),
                })
                .collect();

            let Some(behavior) = self.agents.get_mut(agent_id) else {
                continue;
            };
            if !behavior.enabled {
                continue;
            }

            let directive = behavior.tick(self.clock, dt, &state, &candidates);

            if directive.despawn {
                torn_down.push(*agent_id);
                continue;
            }
            match directive.destination {
                Some(destination) => navigator.set_destination(*agent_id, destination),
                None => navigator.clear_destination(*agent_id),
            }
            if let Some(yaw) = directive.yaw {
                authority.set_yaw(*agent_id, yaw);
            }
            if directive.attack {
                let sequence = self
                    .attack_sequences
                    .entry(*agent_id)
                    .and_modify(|s| *s += 1)
                    .or_insert(1);
                let request = ActionRequest {
                    actor_id: *agent_id,
                    kind: ActionKind::Attack,
                    consume_stamina: false,
                    sequence: *sequence,
                };
                if let Some(result) = authority.submit(&request) {
                    results.push(result);
                }
            }
        }

        for agent_id in torn_down {
            info!("Agent {} torn down", agent_id);
            self.despawn(&agent_id, navigator);
        }

        let positions = authority.positions();
        for (agent_id, position) in navigator.steer(&positions, dt) {
            authority.set_position(agent_id, position);
        }

        results
    }
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::new()
    }
}
