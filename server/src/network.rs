//! UDP authority process: socket plumbing, packet handling and the tick
//! loop that serializes all authoritative work.

use crate::agents::AgentRoster;
use crate::authority::WorldAuthority;
use crate::behavior::AgentConfig;
use crate::client_manager::ClientManager;
use crate::nav::DirectNavigator;
use crate::probe::OpenHeadroom;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ActionTuning, LogAnimationSink, Packet, Vec3, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Participant ids live below this; AI-controlled entities above it.
pub const NPC_ID_BASE: u32 = 10_000;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages sent from network tasks to the main loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// The authority: owns the canonical world, all agents, and the socket.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    authority: WorldAuthority,
    roster: AgentRoster,
    navigator: DirectNavigator,
    rally_point: Option<u32>,
    next_npc_id: u32,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Authority listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients, CLIENT_TIMEOUT))),
            authority: WorldAuthority::new(
                ActionTuning::default(),
                Box::new(LogAnimationSink),
                Box::new(OpenHeadroom),
            ),
            roster: AgentRoster::new(),
            navigator: DirectNavigator::new(),
            rally_point: None,
            next_npc_id: NPC_ID_BASE,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the fixed fallback objective agents converge on when their
    /// held target dies with no replacement in sight.
    pub fn spawn_rally_point(&mut self, position: Vec3, attack_range: f32) -> u32 {
        let id = self.next_npc_id;
        self.next_npc_id += 1;
        self.authority.spawn(id, position);
        self.roster.set_range_override(id, attack_range);
        self.rally_point = Some(id);
        id
    }

    pub fn spawn_agent(&mut self, position: Vec3, config: AgentConfig) -> u32 {
        let id = self.next_npc_id;
        self.next_npc_id += 1;
        self.authority.spawn(id, position);
        self.navigator.register_agent(id, config.move_speed);
        self.roster
            .spawn(id, config, self.rally_point, Some(&mut self.navigator));
        id
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to participant {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that sweeps out silent participants
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues a packet for every connected observer. Requesters receive
    /// their own results too; application is idempotent so the overlap
    /// with their prediction is harmless.
    async fn broadcast_packet(&self, packet: &Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Participant connecting from {} (version: {})",
                    addr, client_version
                );
                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                    return;
                }

                // Drop any stale session from the same address
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };
                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing participant {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.authority.despawn(&existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    let spawn = Vec3::new(client_id as f32 * 2.0, 0.0, -8.0);
                    self.authority.spawn(client_id, spawn);
                    let response = Packet::Connected { client_id };
                    self.send_packet(&response, addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::Action(request) => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    // A participant may only act on its own entity.
                    let mut request = request;
                    if request.actor_id != client_id {
                        warn!(
                            "Participant {} tried to act as {}",
                            client_id, request.actor_id
                        );
                        request.actor_id = client_id;
                    }
                    let mut clients = self.clients.write().await;
                    clients.add_request(client_id, request);
                }
            }

            Packet::MoveIntent { sequence, input } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.record_intent(client_id, sequence, input);
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    info!("Participant {} disconnected", client_id);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.authority.despawn(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from {}", addr);
            }
        }
    }

    /// One authoritative tick: apply movement intents, judge queued action
    /// requests in per-actor sequence order, advance the simulation, run
    /// the agents, then snapshot.
    async fn process_tick(&mut self, dt: f32) {
        let (requests, intents) = {
            let mut clients = self.clients.write().await;
            (clients.take_requests(), clients.take_intents())
        };

        for (client_id, input) in intents {
            self.authority.set_input(client_id, input);
        }

        for (_, request) in requests {
            if let Some(result) = self.authority.submit(&request) {
                self.broadcast_packet(&Packet::ActionResult(result)).await;
            }
            // Rejections are silent: no negative ack. The requester's
            // optimistic prediction self-heals on the next snapshot.
        }

        self.authority.tick(dt);

        let ai_results = self
            .roster
            .tick(dt, &mut self.authority, &mut self.navigator);
        for result in ai_results {
            self.broadcast_packet(&Packet::ActionResult(result)).await;
        }

        self.broadcast_world_state().await;
    }

    async fn broadcast_world_state(&mut self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };
        if client_count == 0 {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        let packet = Packet::WorldState {
            tick: self.authority.tick,
            timestamp: timestamp_safe,
            entities: self.authority.snapshot(),
        };
        self.broadcast_packet(&packet).await;
    }

    /// Main loop coordinating network events and the simulation tick
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Authority started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Participant {} timed out", client_id);
                            self.authority.despawn(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Authority shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.process_tick(dt).await;

                    if self.authority.tick % 300 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        debug!(
                            "Tick {}: {} participants, {} agents, {:.1}Hz",
                            self.authority.tick, client_count,
                            self.roster.len(), 1.0 / dt.max(f32::EPSILON)
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActionKind, ActionResult, EntityState};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn server_message_carries_packet_and_addr() {
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Connect { client_version } => {
                        assert_eq!(client_version, PROTOCOL_VERSION);
                    }
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn broadcast_message_wraps_action_result() {
        let result = ActionResult {
            actor_id: 5,
            kind: ActionKind::Roll,
            accepted: true,
            sequence: 12,
            state: EntityState::new(5, Vec3::default()),
        };
        let msg = GameMessage::BroadcastPacket {
            packet: Packet::ActionResult(result),
        };

        match msg {
            GameMessage::BroadcastPacket {
                packet: Packet::ActionResult(r),
            } => {
                assert_eq!(r.actor_id, 5);
                assert_eq!(r.sequence, 12);
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let msg = ServerMessage::ClientTimeout { client_id: 42 };

        assert!(tx.send(msg).is_ok());
        match rx.try_recv() {
            Ok(ServerMessage::ClientTimeout { client_id }) => assert_eq!(client_id, 42),
            _ => panic!("Unexpected message"),
        }
    }

    #[test]
    fn npc_ids_never_collide_with_participants() {
        // Participant ids are assigned from 1 upward.
        assert!(NPC_ID_BASE > 1024);
    }

    #[test]
    fn address_validation() {
        let valid_addrs = vec!["127.0.0.1:8080", "0.0.0.0:0", "[::1]:8080"];
        for addr_str in valid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_ok(), "{}", addr_str);
        }

        let invalid_addrs = vec!["invalid", "127.0.0.1:99999", ""];
        for addr_str in invalid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_err(), "{}", addr_str);
        }
    }
}
