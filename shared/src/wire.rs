use serde::{Deserialize, Serialize};

use crate::state::{EntityState, Vec2};

/// The action vocabulary. `Attack` is only ever issued by the AI layer but
/// travels the same request path as everything else.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum ActionKind {
    Jump,
    Roll,
    Sprint(bool),
    Crouch,
    Strafe,
    Attack,
}

/// A state-changing request from any participant. `sequence` is monotonic
/// per actor; the authority uses it to drop duplicates and stale replays.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActionRequest {
    pub actor_id: u32,
    pub kind: ActionKind,
    pub consume_stamina: bool,
    pub sequence: u32,
}

/// The authoritative outcome of an accepted request. Carries the full
/// resulting record so applying it is a plain set: delivering the same
/// result twice leaves a replica exactly where one delivery would.
/// Rejected requests never produce one of these.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActionResult {
    pub actor_id: u32,
    pub kind: ActionKind,
    pub accepted: bool,
    pub sequence: u32,
    pub state: EntityState,
}

/// Everything that crosses the wire, bincode-encoded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Connected {
        client_id: u32,
    },
    Action(ActionRequest),
    /// Movement intent is continuous state, not an action; it is applied
    /// directly by the authority without validation.
    MoveIntent {
        sequence: u32,
        input: Vec2,
    },
    ActionResult(ActionResult),
    /// Periodic full snapshot. Observers overwrite their replicas
    /// unconditionally, which also heals any optimistic prediction whose
    /// request was silently rejected.
    WorldState {
        tick: u32,
        timestamp: u64,
        entities: Vec<EntityState>,
    },
    Disconnect,
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Vec3;

    #[test]
    fn action_request_roundtrip() {
        let request = ActionRequest {
            actor_id: 3,
            kind: ActionKind::Sprint(true),
            consume_stamina: false,
            sequence: 17,
        };
        let bytes = bincode::serialize(&Packet::Action(request.clone())).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::Action(decoded) => assert_eq!(decoded, request),
            other => panic!("wrong packet type: {:?}", other),
        }
    }

    #[test]
    fn action_result_roundtrip_preserves_state() {
        let mut state = EntityState::new(9, Vec3::new(4.0, 0.0, -2.0));
        state.is_jumping = true;
        state.current_stamina = 61.5;

        let result = ActionResult {
            actor_id: 9,
            kind: ActionKind::Jump,
            accepted: true,
            sequence: 8,
            state: state.clone(),
        };
        let bytes = bincode::serialize(&Packet::ActionResult(result)).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::ActionResult(decoded) => {
                assert!(decoded.accepted);
                assert_eq!(decoded.state, state);
            }
            other => panic!("wrong packet type: {:?}", other),
        }
    }

    #[test]
    fn world_state_roundtrip() {
        let entities = vec![
            EntityState::new(1, Vec3::default()),
            EntityState::new(2, Vec3::new(1.0, 0.0, 1.0)),
        ];
        let packet = Packet::WorldState {
            tick: 42,
            timestamp: 123456789,
            entities: entities.clone(),
        };
        let bytes = bincode::serialize(&packet).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::WorldState {
                tick,
                timestamp,
                entities: decoded,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(timestamp, 123456789);
                assert_eq!(decoded, entities);
            }
            other => panic!("wrong packet type: {:?}", other),
        }
    }
}
