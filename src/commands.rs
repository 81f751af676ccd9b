use std::fmt;

use bulkstore_core::{BlockPos, NamespacedKey};
use bulkstore_world::ClickAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCommand {
    Help,
    /// Place a fresh unit item of a tier.
    Place {
        tier: String,
        pos: BlockPos,
    },
    /// Place a previously collected drop (by index).
    Replace {
        drop: usize,
        pos: BlockPos,
    },
    /// Move items into the unit's input buffer.
    Insert {
        pos: BlockPos,
        item: NamespacedKey,
        count: u32,
    },
    /// Put items into the player inventory.
    Give {
        item: NamespacedKey,
        count: u32,
    },
    Click {
        pos: BlockPos,
        action: ClickAction,
    },
    Break {
        pos: BlockPos,
    },
    Unload {
        pos: BlockPos,
    },
    Reload {
        pos: BlockPos,
    },
    /// Overwrite the recorded instance id, as an admin edit would.
    SetId {
        pos: BlockPos,
        id: String,
    },
    Status {
        pos: Option<BlockPos>,
    },
}

pub const HELP_TEXT: &str = "Commands: /place <tier> <x> <y> <z>, /replace <drop> <x> <y> <z>, \
/insert <x> <y> <z> <item> [count], /give <item> [count], \
/click <x> <y> <z> <left|right|shift_left|shift_right>, /break <x> <y> <z>, \
/unload <x> <y> <z>, /reload <x> <y> <z>, /setid <x> <y> <z> <id>, /status [x y z]";

pub fn parse_command(input: &str) -> Result<StorageCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    if input.is_empty() {
        return Ok(StorageCommand::Help);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandError::new("Missing command"))?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "help" | "?" => Ok(StorageCommand::Help),
        "place" => {
            if args.len() != 4 {
                return Err(CommandError::new("Usage: /place <tier> <x> <y> <z>"));
            }
            Ok(StorageCommand::Place {
                tier: args[0].to_uppercase(),
                pos: parse_pos(&args[1..4])?,
            })
        }
        "replace" => {
            if args.len() != 4 {
                return Err(CommandError::new("Usage: /replace <drop> <x> <y> <z>"));
            }
            let drop = args[0]
                .parse::<usize>()
                .map_err(|_| CommandError::new(format!("Invalid drop index: {}", args[0])))?;
            Ok(StorageCommand::Replace {
                drop,
                pos: parse_pos(&args[1..4])?,
            })
        }
        "insert" => {
            if !(4..=5).contains(&args.len()) {
                return Err(CommandError::new(
                    "Usage: /insert <x> <y> <z> <item> [count]",
                ));
            }
            Ok(StorageCommand::Insert {
                pos: parse_pos(&args[0..3])?,
                item: parse_item(args[3])?,
                count: parse_count(args.get(4).copied())?,
            })
        }
        "give" => {
            if !(1..=2).contains(&args.len()) {
                return Err(CommandError::new("Usage: /give <item> [count]"));
            }
            Ok(StorageCommand::Give {
                item: parse_item(args[0])?,
                count: parse_count(args.get(1).copied())?,
            })
        }
        "click" => {
            if args.len() != 4 {
                return Err(CommandError::new(
                    "Usage: /click <x> <y> <z> <left|right|shift_left|shift_right>",
                ));
            }
            let action = ClickAction::parse(args[3])
                .ok_or_else(|| CommandError::new(format!("Unknown click: {}", args[3])))?;
            Ok(StorageCommand::Click {
                pos: parse_pos(&args[0..3])?,
                action,
            })
        }
        "break" => Ok(StorageCommand::Break {
            pos: parse_only_pos(&args, "/break")?,
        }),
        "unload" => Ok(StorageCommand::Unload {
            pos: parse_only_pos(&args, "/unload")?,
        }),
        "reload" => Ok(StorageCommand::Reload {
            pos: parse_only_pos(&args, "/reload")?,
        }),
        "setid" => {
            if args.len() != 4 {
                return Err(CommandError::new("Usage: /setid <x> <y> <z> <id>"));
            }
            Ok(StorageCommand::SetId {
                pos: parse_pos(&args[0..3])?,
                id: args[3].to_string(),
            })
        }
        "status" => match args.len() {
            0 => Ok(StorageCommand::Status { pos: None }),
            3 => Ok(StorageCommand::Status {
                pos: Some(parse_pos(&args)?),
            }),
            _ => Err(CommandError::new("Usage: /status [x y z]")),
        },
        _ => Err(CommandError::new(format!(
            "Unknown command: {cmd}. Try /help"
        ))),
    }
}

fn parse_only_pos(args: &[&str], name: &str) -> Result<BlockPos, CommandError> {
    if args.len() != 3 {
        return Err(CommandError::new(format!("Usage: {name} <x> <y> <z>")));
    }
    parse_pos(args)
}

fn parse_pos(args: &[&str]) -> Result<BlockPos, CommandError> {
    let coord = |s: &str| {
        s.parse::<i32>()
            .map_err(|_| CommandError::new(format!("Invalid block coordinate: {s}")))
    };
    match args {
        [x, y, z] => Ok(BlockPos::new(coord(*x)?, coord(*y)?, coord(*z)?)),
        _ => Err(CommandError::new("Expected <x> <y> <z>")),
    }
}

fn parse_item(token: &str) -> Result<NamespacedKey, CommandError> {
    NamespacedKey::parse(&token.to_ascii_lowercase())
        .map_err(|err| CommandError::new(format!("Invalid item {token}: {err}")))
}

fn parse_count(token: Option<&str>) -> Result<u32, CommandError> {
    let Some(token) = token else {
        return Ok(1);
    };
    match token.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(CommandError::new(format!("Invalid count: {token}"))),
    }
}
