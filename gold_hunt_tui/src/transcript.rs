use gold_hunt_core::{Actor, GameOutcome, TurnReport};

/// Console lines for one round.
///
/// The human always sees its own responses and the bot's command. The bot's
/// responses only show with `trace`, except a `QUIT` result, which everyone
/// sees. A capture is announced last.
pub fn transcript(report: &TurnReport, trace: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for event in &report.events {
        match event.actor {
            Actor::Player => lines.extend(event.response.to_string().lines().map(String::from)),
            Actor::Bot => {
                lines.push(format!("Bots command: {}", event.command));
                if trace || event.response.ends_game() {
                    lines.extend(event.response.to_string().lines().map(String::from));
                }
            }
        }
    }
    if let Some(outcome @ GameOutcome::Captured { .. }) = report.outcome {
        lines.push(outcome.to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use gold_hunt_core::{
        Controller, Game, GameMode, GridMap, Position, ScriptedAgent,
        engine::Command,
    };

    use super::*;

    fn game(script: Vec<Command>) -> Game {
        Game::with_seats(
            GridMap::parse("name t\nwin 0\n#######\n#E....#\n#######\n").unwrap(),
            GameMode::PlayerAndBot,
            (Position::new(1, 1), Controller::Human),
            (
                Position::new(1, 4),
                Controller::Bot(Box::new(ScriptedAgent::new(script))),
            ),
        )
    }

    #[test]
    fn bot_responses_need_trace() {
        let mut quiet = game(vec![Command::Hello]);
        let report = quiet.step(Some("GOLD")).unwrap();
        assert_eq!(
            transcript(&report, false),
            ["Gold owned: 0", "Bots command: HELLO"]
        );

        let mut traced = game(vec![Command::Hello]);
        let report = traced.step(Some("GOLD")).unwrap();
        assert_eq!(
            transcript(&report, true),
            ["Gold owned: 0", "Bots command: HELLO", "Gold to win: 0"]
        );
    }

    #[test]
    fn capture_is_announced() {
        let mut game = game(vec![
            Command::Move(gold_hunt_core::Direction::West),
            Command::Move(gold_hunt_core::Direction::West),
        ]);
        game.step(Some("LOOK")).unwrap();
        let report = game.step(Some("MOVE E")).unwrap();
        assert_eq!(
            transcript(&report, false),
            [
                "Success",
                "Bots command: MOVE W",
                "Bot has caught player in 2 moves!"
            ]
        );
    }
}
