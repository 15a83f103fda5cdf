use clap::Parser;
use log::info;
use rand::Rng;
use server::behavior::AgentConfig;
use server::network::Server;
use shared::Vec3;
use tokio::time::Duration;

/// Authoritative server for the action protocol.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Maximum simultaneous participants
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Number of AI agents to spawn
    #[clap(short, long, default_value = "4")]
    agents: u32,
    /// Attack range granted against the rally point
    #[clap(long, default_value = "2.5")]
    rally_range: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate as f32);

    let mut server = Server::new(&address, tick_duration, args.max_clients).await?;

    let rally = server.spawn_rally_point(Vec3::new(0.0, 0.0, 0.0), args.rally_range);
    info!("Rally point {} placed at origin", rally);

    let mut rng = rand::thread_rng();
    for i in 0..args.agents {
        let angle = (i as f32 / args.agents.max(1) as f32) * std::f32::consts::TAU;
        let position = Vec3::new(angle.cos() * 20.0, 0.0, angle.sin() * 20.0);
        let config = AgentConfig {
            move_speed: rng.gen_range(1.3..3.0),
            ..AgentConfig::default()
        };
        let id = server.spawn_agent(position, config);
        info!("Agent {} spawned at ({:.1}, {:.1})", id, position.x, position.z);
    }

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
