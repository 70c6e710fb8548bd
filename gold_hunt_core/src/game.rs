//! Turn alternation, terminal conditions and start-up placement.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    agent::{Agent, BotAgent},
    engine::{Entity, Response, execute, execute_line},
    map::{GridMap, Tile},
};

/// Which seats take turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// The human acts, then the bot, every round.
    #[default]
    PlayerAndBot,
    /// Only the bot acts; the human stays put as a target.
    BotTest,
}

/// Core-side game configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub mode: GameMode,
    /// Seed for start placement and the bot's fallback moves. `None` draws
    /// one from the operating system.
    pub seed: Option<u64>,
}

/// The two seats at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Player,
    Bot,
}

/// Who decides a seat's commands.
pub enum Controller {
    /// Commands arrive from outside, one line per turn.
    Human,
    /// Commands come from an agent, which also receives every response.
    Bot(Box<dyn Agent>),
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Controller::Human => f.write_str("Human"),
            Controller::Bot(_) => f.write_str("Bot(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("the game is already over")]
    Finished,
    #[error("{0:?} is human-controlled and needs a command")]
    MissingInput(Actor),
}

/// How the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// A `QUIT` on the exit with enough gold.
    Win(Tile),
    /// Any other `QUIT`; carries the quitter's symbol.
    Lose(Tile),
    /// Both entities ended a turn on the same cell.
    Captured { moves: u32 },
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Win(symbol) => write!(f, "WIN for {symbol}"),
            GameOutcome::Lose(_) => f.write_str("LOSE"),
            GameOutcome::Captured { moves } => {
                write!(f, "Bot has caught player in {moves} moves!")
            }
        }
    }
}

/// One processed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEvent {
    pub actor: Actor,
    /// The command as issued; raw input for human seats.
    pub command: String,
    pub response: Response,
}

/// Everything that happened during one call to [`Game::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub events: Vec<TurnEvent>,
    pub outcome: Option<GameOutcome>,
}

/// Final summary of a game, suitable for writing out as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameReport {
    pub map_name: String,
    pub gold_required: u32,
    pub mode: GameMode,
    pub outcome: Option<GameOutcome>,
    pub player: Entity,
    pub bot: Entity,
    pub bot_moves: u32,
}

#[derive(Debug)]
struct Seat {
    entity: Entity,
    controller: Controller,
    commands_issued: u32,
}

impl Seat {
    fn new(entity: Entity, controller: Controller) -> Self {
        Seat {
            entity,
            controller,
            commands_issued: 0,
        }
    }
}

/// Owns the board and both seats and runs them in strict alternation.
#[derive(Debug)]
pub struct Game {
    map: GridMap,
    mode: GameMode,
    player: Seat,
    bot: Seat,
    outcome: Option<GameOutcome>,
}

impl Game {
    /// Places a human player and the bot on random distinct start cells.
    pub fn new(map: GridMap, config: GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let player_start = map.random_start_position(None, &mut rng);
        let bot_start = map.random_start_position(Some(player_start), &mut rng);
        let bot = BotAgent::new(Tile::Bot, rng.random());
        Self::with_seats(
            map,
            config.mode,
            (player_start, Controller::Human),
            (bot_start, Controller::Bot(Box::new(bot))),
        )
    }

    /// Builds a game with explicit start positions and controllers.
    pub fn with_seats(
        map: GridMap,
        mode: GameMode,
        player: (Position, Controller),
        bot: (Position, Controller),
    ) -> Self {
        tracing::info!(
            "New game on {:?}: player at {}, bot at {}, {:?}",
            map.name(),
            player.0,
            bot.0,
            mode
        );
        Game {
            map,
            mode,
            player: Seat::new(Entity::new(player.0, Tile::Player), player.1),
            bot: Seat::new(Entity::new(bot.0, Tile::Bot), bot.1),
            outcome: None,
        }
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn player(&self) -> &Entity {
        &self.player.entity
    }

    pub fn bot(&self) -> &Entity {
        &self.bot.entity
    }

    /// Commands the bot seat has issued so far.
    pub fn bot_moves(&self) -> u32 {
        self.bot.commands_issued
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Board with both entities drawn on it.
    pub fn render(&self) -> String {
        self.map.render(&[
            (self.player.entity.position, self.player.entity.symbol),
            (self.bot.entity.position, self.bot.entity.symbol),
        ])
    }

    /// Plays one round: the player seat (unless in bot-test mode), then the
    /// bot seat. `human_input` is the line typed for a human seat.
    ///
    /// The round stops early on `QUIT` or capture.
    pub fn step(&mut self, human_input: Option<&str>) -> Result<TurnReport, GameError> {
        if self.is_over() {
            return Err(GameError::Finished);
        }
        let mut report = TurnReport::default();
        if self.mode == GameMode::PlayerAndBot {
            report.events.push(self.take_turn(Actor::Player, human_input)?);
        }
        if !self.is_over() {
            report.events.push(self.take_turn(Actor::Bot, None)?);
        }
        report.outcome = self.outcome;
        Ok(report)
    }

    /// Processes a single command for `actor` and applies the terminal checks.
    pub fn take_turn(
        &mut self,
        actor: Actor,
        input: Option<&str>,
    ) -> Result<TurnEvent, GameError> {
        if self.is_over() {
            return Err(GameError::Finished);
        }
        let Game {
            map, player, bot, ..
        } = self;
        let (caller, other) = match actor {
            Actor::Player => (player, &*bot),
            Actor::Bot => (bot, &*player),
        };

        let (command, response) = match &mut caller.controller {
            Controller::Human => {
                let line = input.ok_or(GameError::MissingInput(actor))?;
                let response = execute_line(map, &mut caller.entity, &other.entity, line);
                (line.trim().to_ascii_uppercase(), response)
            }
            Controller::Bot(agent) => {
                let command = agent.issue_command();
                let response = execute(map, &mut caller.entity, &other.entity, command);
                agent.handle_response(&response);
                (command.to_string(), response)
            }
        };
        caller.commands_issued += 1;

        match response {
            Response::Win(symbol) => self.outcome = Some(GameOutcome::Win(symbol)),
            Response::Lose => {
                let symbol = match actor {
                    Actor::Player => self.player.entity.symbol,
                    Actor::Bot => self.bot.entity.symbol,
                };
                self.outcome = Some(GameOutcome::Lose(symbol));
            }
            _ => {}
        }
        if self.player.entity.position == self.bot.entity.position {
            self.outcome = Some(GameOutcome::Captured {
                moves: self.bot.commands_issued,
            });
        }
        if let Some(outcome) = self.outcome {
            tracing::info!("Game over after {:?} sent {}: {}", actor, command, outcome);
        }

        Ok(TurnEvent {
            actor,
            command,
            response,
        })
    }

    pub fn report(&self) -> GameReport {
        GameReport {
            map_name: self.map.name().to_string(),
            gold_required: self.map.gold_required(),
            mode: self.mode,
            outcome: self.outcome,
            player: self.player.entity.clone(),
            bot: self.bot.entity.clone(),
            bot_moves: self.bot.commands_issued,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, agent::ScriptedAgent, engine::Command};

    const MAP: &str = "name t\nwin 1\n#######\n#.....#\n#..G..#\n#E....#\n#######\n";

    fn scripted(commands: impl IntoIterator<Item = Command>) -> Controller {
        Controller::Bot(Box::new(ScriptedAgent::new(commands)))
    }

    #[test]
    fn new_game_places_entities_on_distinct_open_cells() {
        for seed in 0..20 {
            let game = Game::new(
                GridMap::parse(MAP).unwrap(),
                GameConfig {
                    mode: GameMode::PlayerAndBot,
                    seed: Some(seed),
                },
            );
            assert_ne!(game.player().position, game.bot().position);
            for entity in [game.player(), game.bot()] {
                assert!(matches!(
                    game.map().tile_at(entity.position),
                    Some(Tile::Space | Tile::Exit)
                ));
            }
        }
    }

    #[test]
    fn same_seed_same_placement() {
        let config = GameConfig {
            mode: GameMode::BotTest,
            seed: Some(42),
        };
        let a = Game::new(GridMap::parse(MAP).unwrap(), config);
        let b = Game::new(GridMap::parse(MAP).unwrap(), config);
        assert_eq!(a.player(), b.player());
        assert_eq!(a.bot(), b.bot());
    }

    #[test]
    fn human_then_bot_each_round() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([Command::Hello])),
        );
        let report = game.step(Some("move e")).unwrap();
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.events[0].actor, Actor::Player);
        assert_eq!(report.events[0].command, "MOVE E");
        assert_eq!(report.events[0].response, Response::Moved);
        assert_eq!(report.events[1].command, "HELLO");
        assert_eq!(report.events[1].response.to_string(), "Gold to win: 1");
        assert_eq!(game.player().position, Position::new(1, 2));
        assert_eq!(game.bot_moves(), 1);
    }

    #[test]
    fn human_seat_requires_input() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([])),
        );
        assert_eq!(
            game.step(None),
            Err(GameError::MissingInput(Actor::Player))
        );
    }

    #[test]
    fn invalid_human_command_is_not_fatal() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([])),
        );
        let report = game.step(Some("fly")).unwrap();
        assert_eq!(report.events[0].response.to_string(), "Invalid command");
        assert!(!game.is_over());
    }

    #[test]
    fn bot_test_mode_skips_the_human() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::BotTest,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([Command::Look])),
        );
        let report = game.step(None).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].actor, Actor::Bot);
    }

    #[test]
    fn quit_ends_the_game_and_blocks_further_steps() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(3, 1), Controller::Human),
            (Position::new(1, 5), scripted([])),
        );
        let report = game.step(Some("QUIT")).unwrap();
        // not enough gold, even on the exit
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.outcome, Some(GameOutcome::Lose(Tile::Player)));
        assert_eq!(game.outcome().unwrap().to_string(), "LOSE");
        assert_eq!(game.step(Some("LOOK")), Err(GameError::Finished));
    }

    #[test]
    fn capture_ends_the_game_with_bot_move_count() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (
                Position::new(1, 3),
                scripted([
                    Command::Move(Direction::West),
                    Command::Move(Direction::West),
                ]),
            ),
        );
        assert!(game.step(Some("GOLD")).unwrap().outcome.is_none());
        let report = game.step(Some("GOLD")).unwrap();
        assert_eq!(report.outcome, Some(GameOutcome::Captured { moves: 2 }));
        assert_eq!(
            report.outcome.unwrap().to_string(),
            "Bot has caught player in 2 moves!"
        );
    }

    #[test]
    fn human_walking_into_the_bot_is_a_capture() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 2), scripted([])),
        );
        let report = game.step(Some("MOVE E")).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.outcome, Some(GameOutcome::Captured { moves: 0 }));
    }

    #[test]
    fn render_overlays_both_entities() {
        let game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([])),
        );
        assert!(game.render().contains("#P...B#"));
    }

    #[test]
    fn report_summarises_the_game() {
        let mut game = Game::with_seats(
            GridMap::parse(MAP).unwrap(),
            GameMode::BotTest,
            (Position::new(1, 1), Controller::Human),
            (Position::new(1, 5), scripted([Command::Hello])),
        );
        game.step(None).unwrap();
        let report = game.report();
        assert_eq!(report.map_name, "t");
        assert_eq!(report.bot_moves, 1);
        assert_eq!(report.outcome, None);
        assert_eq!(report.player.position, Position::new(1, 1));
    }
}
