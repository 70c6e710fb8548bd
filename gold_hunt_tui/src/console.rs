//! Line-oriented front end: one command per stdin line, responses on stdout.
//! Suitable for piping a prepared script of commands into the game.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use gold_hunt_core::{Game, GameMode};

use crate::transcript::transcript;

pub fn run(game: &mut Game, trace: bool, max_rounds: Option<u64>) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock().lines();
    let mut out = io::stdout().lock();

    if trace {
        write!(out, "{}", game.render())?;
        writeln!(out, "{}", game.player())?;
        writeln!(out, "{}", game.bot())?;
    }

    let mut rounds = 0u64;
    while !game.is_over() {
        if max_rounds.is_some_and(|max| rounds >= max) {
            tracing::info!("Stopping after {} rounds", rounds);
            break;
        }
        rounds += 1;

        let line = match game.mode() {
            GameMode::PlayerAndBot => {
                writeln!(out, "Enter command:")?;
                out.flush()?;
                match input.next() {
                    Some(line) => Some(line?),
                    None => {
                        tracing::info!("Input closed, leaving the game");
                        break;
                    }
                }
            }
            GameMode::BotTest => None,
        };

        let report = game.step(line.as_deref())?;
        for text in transcript(&report, trace) {
            writeln!(out, "{text}")?;
        }
        if trace && !game.is_over() {
            write!(out, "{}", game.render())?;
        }
    }
    out.flush()?;
    Ok(())
}
