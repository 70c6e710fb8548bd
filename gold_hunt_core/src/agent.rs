use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    engine::{Command, Response},
    map::Tile,
    view::LocalView,
};

/// Trait defining an autonomous participant.
///
/// The game asks for one command per turn and hands back the engine's
/// response before asking again, so an agent always sees the answer to the
/// command it just issued.
pub trait Agent {
    /// Determines the command the agent wants processed this turn.
    fn issue_command(&mut self) -> Command;

    /// Consumes the response to the last issued command.
    fn handle_response(&mut self, response: &Response);
}

/// What the bot is currently trying to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[default]
    None,
    SeekGold,
    SeekExit,
    ChaseOpponent,
}

/// Whether the bot has learnt the gold-to-win value yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    AwaitingIntro,
    Active,
}

/// The computer-controlled hunter.
///
/// It starts by asking `HELLO`, then alternates between `LOOK` and acting on
/// a plan derived from the last window it saw. Plans come from a greedy
/// stepper that never backtracks, so an obstacle between the bot and its
/// destination leaves it with a partial route.
#[derive(Debug)]
pub struct BotAgent {
    symbol: Tile,
    required_gold: Option<u32>,
    gold_owned: u32,
    goal: Goal,
    queued_moves: VecDeque<Direction>,
    rng: StdRng,
}

impl BotAgent {
    pub fn new(symbol: Tile, seed: u64) -> Self {
        Self::with_rng(symbol, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(symbol: Tile, rng: StdRng) -> Self {
        Self {
            symbol,
            required_gold: None,
            gold_owned: 0,
            goal: Goal::None,
            queued_moves: VecDeque::new(),
            rng,
        }
    }

    pub fn state(&self) -> BotState {
        match self.required_gold {
            None => BotState::AwaitingIntro,
            Some(_) => BotState::Active,
        }
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn required_gold(&self) -> Option<u32> {
        self.required_gold
    }

    pub fn queued_moves(&self) -> impl Iterator<Item = Direction> + '_ {
        self.queued_moves.iter().copied()
    }

    fn has_enough_gold(&self) -> bool {
        self.required_gold
            .is_some_and(|required| self.gold_owned >= required)
    }

    /// Replaces the goal and move queue from a fresh window.
    fn replan(&mut self, view: &LocalView) {
        self.queued_moves.clear();
        let sighting = Sighting::scan(view, self.symbol);
        tracing::debug!(
            "{} sees gold={:?} opponent={:?} exit={:?}",
            self.symbol,
            sighting.gold,
            sighting.opponent,
            sighting.exit
        );

        let target = match sighting {
            Sighting {
                exit: Some(exit), ..
            } if self.has_enough_gold() => Some((Goal::SeekExit, exit)),
            Sighting {
                opponent: Some(opponent),
                ..
            } => Some((Goal::ChaseOpponent, opponent)),
            Sighting {
                gold: Some(gold), ..
            } => Some((Goal::SeekGold, gold)),
            _ => None,
        };

        match target {
            Some((goal, destination)) => {
                self.goal = goal;
                self.queued_moves = plan_path(view, destination);
            }
            None => {
                self.goal = Goal::None;
                self.queued_moves.extend(random_move(view, &mut self.rng));
            }
        }
        tracing::debug!(
            "{} goal {:?}, {} queued moves",
            self.symbol,
            self.goal,
            self.queued_moves.len()
        );
    }
}

impl Agent for BotAgent {
    fn issue_command(&mut self) -> Command {
        if self.required_gold.is_none() {
            return Command::Hello;
        }
        if let Some(direction) = self.queued_moves.pop_front() {
            return Command::Move(direction);
        }
        match self.goal {
            Goal::SeekGold => {
                self.goal = Goal::None;
                Command::Pickup
            }
            Goal::SeekExit => {
                self.goal = Goal::None;
                Command::Quit
            }
            Goal::None | Goal::ChaseOpponent => Command::Look,
        }
    }

    fn handle_response(&mut self, response: &Response) {
        match response {
            Response::Hello { gold_required } => {
                tracing::debug!("{} requires {} gold", self.symbol, gold_required);
                self.required_gold = Some(*gold_required);
            }
            Response::Gold { owned }
            | Response::PickedUp { owned }
            | Response::NothingToPickUp { owned } => self.gold_owned = *owned,
            Response::Look(view) => self.replan(view),
            _ => {}
        }
    }
}

/// Interesting cells found in one scan of a window, in local coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Sighting {
    gold: Option<Position>,
    opponent: Option<Position>,
    exit: Option<Position>,
}

impl Sighting {
    fn scan(view: &LocalView, own_symbol: Tile) -> Self {
        let mut sighting = Sighting::default();
        let mut nearest_gold = usize::MAX;
        for (position, tile) in view.enumerate() {
            if position == LocalView::CENTER {
                continue;
            }
            match tile {
                Tile::Gold => {
                    // first of equally near candidates is kept
                    let steps = position.manhattan_distance(LocalView::CENTER);
                    if steps < nearest_gold {
                        nearest_gold = steps;
                        sighting.gold = Some(position);
                    }
                }
                Tile::Exit => sighting.exit = Some(position),
                marker if marker.is_marker() && marker != own_symbol => {
                    sighting.opponent = Some(position)
                }
                _ => {}
            }
        }
        sighting
    }
}

/// Moves from the window centre towards `destination`, closing the row gap
/// before the column gap and stopping as soon as neither axis can advance.
pub fn plan_path(view: &LocalView, destination: Position) -> VecDeque<Direction> {
    let mut moves = VecDeque::new();
    let mut current = LocalView::CENTER;
    while let Some(direction) = next_step(view, current, destination) {
        current = current.step(direction);
        moves.push_back(direction);
    }
    moves
}

fn next_step(view: &LocalView, current: Position, destination: Position) -> Option<Direction> {
    let candidates = [
        (current.row > destination.row, Direction::North),
        (current.row < destination.row, Direction::South),
        (current.column > destination.column, Direction::West),
        (current.column < destination.column, Direction::East),
    ];
    candidates
        .into_iter()
        .find(|(wanted, direction)| *wanted && view.is_move_valid(current, *direction))
        .map(|(_, direction)| direction)
}

/// A uniformly chosen direction that does not walk into a wall.
///
/// Returns `None` only when the centre is walled in on all four sides.
pub fn random_move<R: Rng + ?Sized>(view: &LocalView, rng: &mut R) -> Option<Direction> {
    let legal: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|direction| view.is_move_valid(LocalView::CENTER, *direction))
        .collect();
    if legal.is_empty() {
        return None;
    }
    Some(legal[rng.random_range(0..legal.len())])
}

/// Replays a fixed list of commands, then keeps looking.
#[derive(Debug, Default, Clone)]
pub struct ScriptedAgent {
    script: VecDeque<Command>,
    responses: Vec<Response>,
}

impl ScriptedAgent {
    pub fn new(script: impl IntoIterator<Item = Command>) -> Self {
        Self {
            script: script.into_iter().collect(),
            responses: Vec::new(),
        }
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }
}

impl Agent for ScriptedAgent {
    fn issue_command(&mut self) -> Command {
        self.script.pop_front().unwrap_or(Command::Look)
    }

    fn handle_response(&mut self, response: &Response) {
        self.responses.push(response.clone());
    }
}
