use crate::game::ObserverWorld;
use crate::input::{parse_command, Command, Sequencer, HELP_TEXT};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{LogAnimationSink, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    connected: bool,

    world: ObserverWorld,
    sequencer: Sequencer,

    ping_ms: u64,
    fake_ping_ms: u64,
    prediction_enabled: bool,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        prediction_enabled: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            connected: false,
            world: ObserverWorld::new(Box::new(LogAnimationSink)),
            sequencer: Sequencer::new(),
            ping_ms: 0,
            fake_ping_ms,
            prediction_enabled,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to authority...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.world.set_client_id(client_id);
                self.connected = true;
            }

            Packet::ActionResult(result) => {
                self.world.apply_action_result(&result);
            }

            Packet::WorldState {
                tick,
                timestamp,
                entities,
            } => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_millis() as u64;

                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }

                self.world.apply_snapshot(tick, timestamp, entities);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Reacts to one parsed console command. `Ok(false)` means quit.
    async fn handle_command(&mut self, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
        match parse_command(line) {
            Command::Action {
                kind,
                consume_stamina,
            } => {
                let Some(client_id) = self.world.client_id else {
                    warn!("Not connected yet");
                    return Ok(true);
                };
                let request = self.sequencer.request(client_id, kind, consume_stamina);
                self.send_packet(&Packet::Action(request)).await?;

                // Optimistic application; the broadcast result or the next
                // snapshot corrects it if the authority disagrees.
                if self.prediction_enabled {
                    self.world.predict(kind, consume_stamina);
                }
            }
            Command::Move(input) => {
                if self.world.client_id.is_some() {
                    let sequence = self.sequencer.next();
                    self.send_packet(&Packet::MoveIntent { sequence, input })
                        .await?;
                    if self.prediction_enabled {
                        self.world.set_predicted_input(input);
                    }
                }
            }
            Command::Status => {
                println!("{} | ping {}ms", self.world.hud_line(), self.ping_ms);
                for entity in self.world.visible_entities() {
                    println!(
                        "  #{:<5} at ({:>6.1}, {:>6.1}) stamina {:>5.1}{}",
                        entity.id,
                        entity.position.x,
                        entity.position.z,
                        entity.current_stamina,
                        if entity.is_dead { " [dead]" } else { "" }
                    );
                }
            }
            Command::Help => println!("{}", HELP_TEXT),
            Command::Quit => return Ok(false),
            Command::Unknown(text) => {
                if !text.is_empty() {
                    println!("unknown command: {} ({})", text, HELP_TEXT);
                }
            }
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
        let mut prediction_interval = interval(Duration::from_millis(16));
        let mut last_step = Instant::now();

        let mut buffer = [0u8; 2048];

        println!("{}", HELP_TEXT);

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = stdin_lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_command(&line).await? {
                                break;
                            }
                        },
                        None => break,
                    }
                },

                _ = prediction_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_step).as_secs_f32();
                    last_step = now;
                    self.world.step_prediction(dt);
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
