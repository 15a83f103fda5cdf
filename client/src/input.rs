//! Line-based command input with per-actor sequencing.
//!
//! The observer runs headless; commands arrive as text lines and become
//! sequenced action requests or movement intents.

use shared::{ActionKind, ActionRequest, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action { kind: ActionKind, consume_stamina: bool },
    Move(Vec2),
    Status,
    Quit,
    Help,
    Unknown(String),
}

/// Parses one input line. Mode toggles take an optional on/off argument;
/// `sprint` with no argument re-asserts on.
pub fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Command::Unknown(String::new());
    };

    match word.to_ascii_lowercase().as_str() {
        "jump" | "j" => Command::Action {
            kind: ActionKind::Jump,
            consume_stamina: true,
        },
        "roll" | "r" => Command::Action {
            kind: ActionKind::Roll,
            consume_stamina: true,
        },
        "sprint" | "sp" => {
            let on = !matches!(parts.next(), Some("off"));
            Command::Action {
                kind: ActionKind::Sprint(on),
                consume_stamina: false,
            }
        }
        "crouch" | "c" => Command::Action {
            kind: ActionKind::Crouch,
            consume_stamina: false,
        },
        "strafe" | "st" => Command::Action {
            kind: ActionKind::Strafe,
            consume_stamina: false,
        },
        "move" | "m" => {
            let x = parts.next().and_then(|v| v.parse::<f32>().ok());
            let z = parts.next().and_then(|v| v.parse::<f32>().ok());
            match (x, z) {
                (Some(x), Some(z)) => Command::Move(Vec2::new(x, z)),
                _ => Command::Unknown(line.to_string()),
            }
        }
        "stop" => Command::Move(Vec2::default()),
        "status" | "hud" => Command::Status,
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" => Command::Help,
        _ => Command::Unknown(line.to_string()),
    }
}

pub const HELP_TEXT: &str = "commands: jump, roll, sprint [on|off], crouch, strafe, \
move <x> <z>, stop, status, help, quit";

/// Stamps outgoing requests and intents with a monotonically increasing
/// per-session sequence. The authority uses it to drop duplicates and
/// stale retransmissions.
pub struct Sequencer {
    next_sequence: u32,
}

impl Sequencer {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    pub fn next(&mut self) -> u32 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    pub fn request(&mut self, actor_id: u32, kind: ActionKind, consume_stamina: bool) -> ActionRequest {
        ActionRequest {
            actor_id,
            kind,
            consume_stamina,
            sequence: self.next(),
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
