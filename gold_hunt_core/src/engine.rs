use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    map::{GridMap, Tile},
    view::LocalView,
};

/// The closed set of protocol commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Hello,
    Gold,
    Look,
    Move(Direction),
    Pickup,
    Quit,
}

/// A command line that is not part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unrecognized command: {0:?}")]
    Unrecognized(String),
}

/// Why a `MOVE` left the mover where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("destination {destination} is blocked")]
    Blocked { destination: Position },
    #[error("destination {destination} is out of bounds")]
    OutOfBounds { destination: Position },
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parses one protocol line. Case and surrounding whitespace are ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let normalized = line.trim().to_ascii_uppercase();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let command = match tokens.as_slice() {
            ["HELLO"] => Command::Hello,
            ["GOLD"] => Command::Gold,
            ["LOOK"] => Command::Look,
            ["PICKUP"] => Command::Pickup,
            ["QUIT"] => Command::Quit,
            ["MOVE", dir] => {
                let mut chars = dir.chars();
                match (chars.next().and_then(Direction::from_symbol), chars.next()) {
                    (Some(direction), None) => Command::Move(direction),
                    _ => return Err(CommandError::Unrecognized(line.to_string())),
                }
            }
            _ => return Err(CommandError::Unrecognized(line.to_string())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Hello => f.write_str("HELLO"),
            Command::Gold => f.write_str("GOLD"),
            Command::Look => f.write_str("LOOK"),
            Command::Move(direction) => write!(f, "MOVE {}", direction.symbol()),
            Command::Pickup => f.write_str("PICKUP"),
            Command::Quit => f.write_str("QUIT"),
        }
    }
}

/// Result of processing one command. `Display` yields the wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Hello { gold_required: u32 },
    Gold { owned: u32 },
    Look(LocalView),
    Moved,
    MoveRejected(MoveError),
    PickedUp { owned: u32 },
    NothingToPickUp { owned: u32 },
    Win(Tile),
    Lose,
    Invalid(CommandError),
}

impl Response {
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            Response::MoveRejected(_)
                | Response::NothingToPickUp { .. }
                | Response::Lose
                | Response::Invalid(_)
        )
    }

    /// `QUIT` ends the game whichever way it goes.
    pub fn ends_game(&self) -> bool {
        matches!(self, Response::Win(_) | Response::Lose)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Hello { gold_required } => write!(f, "Gold to win: {gold_required}"),
            Response::Gold { owned } => write!(f, "Gold owned: {owned}"),
            Response::Look(view) => write!(f, "{view}"),
            Response::Moved => f.write_str("Success"),
            Response::MoveRejected(_) => f.write_str("Fail"),
            Response::PickedUp { owned } => write!(f, "Success. Gold owned: {owned}"),
            Response::NothingToPickUp { owned } => write!(f, "Fail. Gold owned: {owned}"),
            Response::Win(symbol) => write!(f, "WIN for {symbol}"),
            Response::Lose => f.write_str("LOSE"),
            Response::Invalid(_) => f.write_str("Invalid command"),
        }
    }
}

/// A participant on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub position: Position,
    pub symbol: Tile,
    gold_owned: u32,
}

impl Entity {
    pub fn new(position: Position, symbol: Tile) -> Self {
        Entity {
            position,
            symbol,
            gold_owned: 0,
        }
    }

    pub fn gold_owned(&self) -> u32 {
        self.gold_owned
    }

    fn increment_gold(&mut self) -> u32 {
        self.gold_owned += 1;
        self.gold_owned
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Player {} at {} owns {} gold",
            self.symbol, self.position, self.gold_owned
        )
    }
}

/// Parses `line` and executes it; an unparsable line yields
/// [`Response::Invalid`] and changes nothing.
pub fn execute_line(
    map: &mut GridMap,
    caller: &mut Entity,
    opponent: &Entity,
    line: &str,
) -> Response {
    match line.parse::<Command>() {
        Ok(command) => execute(map, caller, opponent, command),
        Err(err) => {
            tracing::warn!("{} sent {}", caller.symbol, err);
            Response::Invalid(err)
        }
    }
}

/// Applies one command for `caller` against the board.
///
/// Only `MOVE` changes the caller's position and only a successful
/// `PICKUP` changes the map.
pub fn execute(
    map: &mut GridMap,
    caller: &mut Entity,
    opponent: &Entity,
    command: Command,
) -> Response {
    let response = match command {
        Command::Hello => Response::Hello {
            gold_required: map.gold_required(),
        },
        Command::Gold => Response::Gold {
            owned: caller.gold_owned,
        },
        Command::Look => Response::Look(LocalView::capture(
            map,
            caller.position,
            caller.symbol,
            Some((opponent.position, opponent.symbol)),
        )),
        Command::Move(direction) => {
            let destination = caller.position.step(direction);
            match map.tile_at(destination) {
                Some(tile) if tile.is_walkable() => {
                    caller.position = destination;
                    Response::Moved
                }
                Some(_) => Response::MoveRejected(MoveError::Blocked { destination }),
                None => Response::MoveRejected(MoveError::OutOfBounds { destination }),
            }
        }
        Command::Pickup => {
            if map.tile_at(caller.position) == Some(Tile::Gold)
                && map.set_tile(caller.position, Tile::Space).is_ok()
            {
                Response::PickedUp {
                    owned: caller.increment_gold(),
                }
            } else {
                Response::NothingToPickUp {
                    owned: caller.gold_owned,
                }
            }
        }
        Command::Quit => {
            if map.tile_at(caller.position) == Some(Tile::Exit)
                && caller.gold_owned >= map.gold_required()
            {
                Response::Win(caller.symbol)
            } else {
                Response::Lose
            }
        }
    };
    tracing::trace!(
        "{} {} at {} -> {}",
        caller.symbol,
        command,
        caller.position,
        response.to_string().replace('\n', "/")
    );
    response
}
