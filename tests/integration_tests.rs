//! Integration tests for the action-authority pipeline
//!
//! These tests validate cross-crate interactions and real network behavior.

use bincode::{deserialize, serialize};
use client::game::ObserverWorld;
use server::agents::AgentRoster;
use server::authority::WorldAuthority;
use server::behavior::AgentConfig;
use server::nav::DirectNavigator;
use server::probe::{FixedHeadroom, OpenHeadroom};
use shared::{
    ActionKind, ActionRequest, ActionTuning, EntityState, NullAnimationSink, Packet, Vec2, Vec3,
    MAX_STAMINA, PROTOCOL_VERSION,
};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;
use tokio::time::sleep;

fn authority() -> WorldAuthority {
    WorldAuthority::new(
        ActionTuning::default(),
        Box::new(NullAnimationSink),
        Box::new(OpenHeadroom),
    )
}

fn request(actor_id: u32, kind: ActionKind, sequence: u32) -> ActionRequest {
    ActionRequest {
        actor_id,
        kind,
        consume_stamina: matches!(kind, ActionKind::Jump | ActionKind::Roll),
        sequence,
    }
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for network protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
            },
            Packet::Action(request(3, ActionKind::Sprint(true), 9)),
            Packet::MoveIntent {
                sequence: 12,
                input: Vec2::new(0.5, -1.0),
            },
            Packet::Connected { client_id: 42 },
            Packet::WorldState {
                tick: 77,
                timestamp: 123456789,
                entities: vec![EntityState::new(1, Vec3::new(2.0, 0.0, -8.0))],
            },
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Connect { .. }, Packet::Connect { .. }) => {}
                (Packet::Action(a), Packet::Action(b)) => {
                    assert_eq!(a.sequence, b.sequence);
                    assert_eq!(a.kind, b.kind);
                }
                (Packet::MoveIntent { .. }, Packet::MoveIntent { .. }) => {}
                (Packet::Connected { .. }, Packet::Connected { .. }) => {}
                (Packet::WorldState { entities: a, .. }, Packet::WorldState { entities: b, .. }) => {
                    assert_eq!(a.len(), b.len());
                }
                (Packet::Disconnected { .. }, Packet::Disconnected { .. }) => {}
                _ => panic!("Packet type mismatch after serialization"),
            }
        }
    }

    /// Tests real UDP socket communication
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; 1024];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let test_packet = Packet::Action(request(1, ActionKind::Jump, 1));
        let serialized = serialize(&test_packet).unwrap();

        client_socket.send_to(&serialized, server_addr).unwrap();

        let mut buf = [0; 1024];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received_packet: Packet = deserialize(&buf[..size]).unwrap();

        match received_packet {
            Packet::Action(req) => assert_eq!(req.kind, ActionKind::Jump),
            _ => panic!("Wrong packet type received"),
        }
    }

    /// Tests malformed packet handling
    #[test]
    fn malformed_packet_handling() {
        let valid_packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        let valid_data = serialize(&valid_packet).unwrap();

        // Truncated packet
        let truncated_data = &valid_data[..valid_data.len() / 2];
        let result: Result<Packet, _> = deserialize(truncated_data);
        assert!(
            result.is_err(),
            "Should fail to deserialize truncated packet"
        );

        // Corrupted discriminant
        let mut corrupted_data = valid_data.clone();
        corrupted_data[0] = 0xFF;
        let result: Result<Packet, _> = deserialize(&corrupted_data);
        assert!(
            result.is_err(),
            "Should fail to deserialize corrupted packet"
        );

        let empty_data = vec![];
        let result: Result<Packet, _> = deserialize(&empty_data);
        assert!(result.is_err(), "Should fail to deserialize empty packet");
    }
}

/// AUTHORITY / OBSERVER INTEGRATION TESTS
mod authority_observer_tests {
    use super::*;

    /// An accepted result applied by the observer leaves it holding exactly
    /// the authority's state for that entity.
    #[test]
    fn broadcast_result_converges_observer() {
        let mut world = authority();
        world.spawn(1, Vec3::default());

        let mut observer = ObserverWorld::new(Box::new(NullAnimationSink));
        observer.set_client_id(1);
        observer.apply_snapshot(0, 0, world.snapshot());

        // Observer predicts, authority judges, result comes back.
        observer.predict(ActionKind::Jump, true);
        let result = world.submit(&request(1, ActionKind::Jump, 1)).unwrap();
        assert!(result.accepted);
        observer.apply_action_result(&result);

        let authoritative = world.entity(&1).unwrap();
        let observed = observer.confirmed.get(&1).unwrap();
        assert_eq!(observed.current_stamina, authoritative.current_stamina);
        assert_eq!(observed.is_jumping, authoritative.is_jumping);
    }

    /// A prediction the authority disagrees with is overwritten by the
    /// authoritative result, not negotiated.
    #[test]
    fn diverging_prediction_heals() {
        // The authority knows about an obstruction the observer does not.
        let mut blocked_world = WorldAuthority::new(
            ActionTuning::default(),
            Box::new(NullAnimationSink),
            Box::new(FixedHeadroom(true)),
        );
        blocked_world.spawn(1, Vec3::default());
        let crouch = blocked_world
            .submit(&request(1, ActionKind::Crouch, 1))
            .unwrap();
        assert!(crouch.accepted);

        let mut observer = ObserverWorld::new(Box::new(NullAnimationSink));
        observer.set_client_id(1);
        observer.apply_snapshot(0, 0, blocked_world.snapshot());

        // Observer predicts standing up; the authority re-asserts the
        // crouch because there is no headroom.
        observer.predict(ActionKind::Crouch, false);
        assert!(!observer.predicted.as_ref().unwrap().is_crouching);

        let stand = blocked_world
            .submit(&request(1, ActionKind::Crouch, 2))
            .unwrap();
        assert!(stand.accepted);
        assert!(stand.state.is_crouching);

        observer.apply_action_result(&stand);
        assert!(observer.predicted.as_ref().unwrap().is_crouching);
        assert_eq!(
            observer.confirmed.get(&1).unwrap().is_crouching,
            blocked_world.entity(&1).unwrap().is_crouching
        );
    }

    /// Duplicated and reordered results are harmless: the final state is
    /// whichever result was applied last, and duplicates change nothing.
    #[test]
    fn duplicate_and_reordered_results_are_idempotent() {
        let mut world = authority();
        world.spawn(1, Vec3::default());
        world.set_input(1, Vec2::new(0.0, 1.0));

        let first = world.submit(&request(1, ActionKind::Sprint(true), 1)).unwrap();
        let second = world.submit(&request(1, ActionKind::Sprint(false), 2)).unwrap();

        let mut observer = ObserverWorld::new(Box::new(NullAnimationSink));
        observer.apply_snapshot(0, 0, vec![EntityState::new(1, Vec3::default())]);

        observer.apply_action_result(&first);
        observer.apply_action_result(&second);
        observer.apply_action_result(&second);
        // A late duplicate of the first overwrites; the next snapshot
        // restores the newest state.
        observer.apply_action_result(&first);
        observer.apply_snapshot(1, 1, world.snapshot());

        assert_eq!(
            observer.confirmed.get(&1).unwrap().is_sprinting,
            world.entity(&1).unwrap().is_sprinting
        );
    }

    /// The same validator runs on both sides, so a locally-declined
    /// action is also declined by the authority given the same state.
    #[test]
    fn validator_is_deterministic_across_sides() {
        let mut world = authority();
        world.spawn(1, Vec3::default());
        world.set_input(1, Vec2::new(0.0, 1.0));
        let roll = world.submit(&request(1, ActionKind::Roll, 1)).unwrap();
        assert!(roll.accepted);

        let mut observer = ObserverWorld::new(Box::new(NullAnimationSink));
        observer.set_client_id(1);
        observer.apply_snapshot(0, 0, world.snapshot());

        // Rolling is exclusive; both sides refuse a jump mid-roll.
        observer.predict(ActionKind::Jump, true);
        assert!(!observer.predicted.as_ref().unwrap().is_jumping);
        assert!(world.submit(&request(1, ActionKind::Jump, 2)).is_none());
    }
}

/// AI INTEGRATION TESTS
mod agent_tests {
    use super::*;

    /// An agent hunts a participant entity through the full stack and its
    /// attack comes out as an ordinary broadcastable result.
    #[test]
    fn agent_attacks_participant_through_validator() {
        let mut world = authority();
        world.spawn(1, Vec3::new(3.0, 0.0, 0.0));

        let mut navigator = DirectNavigator::new();
        let mut roster = AgentRoster::new();
        let agent_id = 10_000;
        world.spawn(agent_id, Vec3::default());
        navigator.register_agent(agent_id, 2.0);
        roster.spawn(
            agent_id,
            AgentConfig {
                scan_frequency: 0.0,
                ..AgentConfig::default()
            },
            None,
            Some(&mut navigator),
        );

        let mut results = Vec::new();
        for _ in 0..200 {
            results.extend(roster.tick(0.05, &mut world, &mut navigator));
            world.tick(0.05);
        }

        let attack = results
            .iter()
            .find(|r| r.actor_id == agent_id && r.kind == ActionKind::Attack)
            .expect("agent should have attacked");
        assert!(attack.accepted);

        // The victim's stamina is untouched; attacks carry no state delta.
        assert_eq!(world.entity(&1).unwrap().current_stamina, MAX_STAMINA);
    }

    /// Observers learn about AI actions the same way they learn about
    /// other participants' actions.
    #[test]
    fn observer_sees_agent_results() {
        let mut world = authority();
        world.spawn(1, Vec3::new(1.5, 0.0, 0.0));
        let agent_id = 10_000;
        world.spawn(agent_id, Vec3::default());

        let mut navigator = DirectNavigator::new();
        let mut roster = AgentRoster::new();
        navigator.register_agent(agent_id, 2.0);
        roster.spawn(
            agent_id,
            AgentConfig {
                scan_frequency: 0.0,
                ..AgentConfig::default()
            },
            None,
            Some(&mut navigator),
        );

        let mut observer = ObserverWorld::new(Box::new(NullAnimationSink));
        observer.set_client_id(1);
        observer.apply_snapshot(0, 0, world.snapshot());

        for _ in 0..100 {
            for result in roster.tick(0.05, &mut world, &mut navigator) {
                observer.apply_action_result(&result);
            }
            world.tick(0.05);
        }
        observer.apply_snapshot(1, 1, world.snapshot());

        let seen = observer.confirmed.get(&agent_id).expect("agent visible");
        assert_eq!(seen.position.x, world.entity(&agent_id).unwrap().position.x);
    }
}
