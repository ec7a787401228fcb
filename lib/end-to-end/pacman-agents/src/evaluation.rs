/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

//! Play many games with one kind of pacman and count the wins.

use std::rc::Rc;

use intelligent_agents::{Agent, Simulation};
use pacman_logic::{Action, EndState, Float, Game, GameState, World};
use rayon::prelude::*;

pub type PacmanAgent = Box<dyn Agent<Action = Action, Percept = GameState>>;

/// A game ready to be played, with the agent that plays pacman in it.
pub struct Match {
    pub game: Game,
    pub pacman: PacmanAgent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRecord {
    /// Seed the game was set up with.
    pub seed: u64,
    pub end: EndState,
    pub score: Float,
    pub ticks: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSummary {
    /// One record per game, in game order.
    pub records: Vec<GameRecord>,
}

impl EvaluationSummary {
    pub fn games(&self) -> usize {
        self.records.len()
    }

    pub fn wins(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.end == EndState::Win)
            .count()
    }

    pub fn mean_score(&self) -> Float {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().map(|record| record.score).sum::<Float>() / self.games() as Float
    }

    /// `self` followed by `other`.
    pub fn merge(mut self, other: EvaluationSummary) -> EvaluationSummary {
        self.records.extend(other.records);
        self
    }
}

impl From<GameRecord> for EvaluationSummary {
    fn from(record: GameRecord) -> Self {
        Self {
            records: vec![record],
        }
    }
}

/// Play `game` until it ends or `max_ticks` ticks have passed.
pub fn play(game: Match, seed: u64, max_ticks: usize) -> GameRecord {
    let mut simulation = Simulation::new(game.game, game.pacman, max_ticks);
    let episode = simulation.run();
    let end = simulation.environment().end_state();
    tracing::debug!(seed, ?end, score = episode.score, ticks = episode.steps, "game over");
    GameRecord {
        seed,
        end,
        score: episode.score,
        ticks: episode.steps,
    }
}

/// Play `games` games one after the other. Game `i` is set up by `setup(world, seed + i)`.
pub fn evaluate<_Setup, _Error>(
    world: &World,
    games: usize,
    seed: u64,
    max_ticks: usize,
    mut setup: _Setup,
) -> Result<EvaluationSummary, _Error>
where
    _Setup: FnMut(Rc<World>, u64) -> Result<Match, _Error>,
{
    let world = Rc::new(world.clone());
    let mut summary = EvaluationSummary::default();
    for game in 0..games {
        let game_seed = seed.wrapping_add(game as u64);
        let prepared = setup(Rc::clone(&world), game_seed)?;
        summary.records.push(play(prepared, game_seed, max_ticks));
    }
    tracing::info!(games, wins = summary.wins(), mean_score = summary.mean_score(), "evaluation done");
    Ok(summary)
}

/// Same as [`evaluate`], with games spread over the rayon thread pool.
///
/// Agents and ghosts are not thread safe, so every game gets its own copy of `world` and is set
/// up, played and summarised on the worker that picks it. Records come back in game order.
pub fn evaluate_parallel<_Setup, _Error>(
    world: &World,
    games: usize,
    seed: u64,
    max_ticks: usize,
    setup: _Setup,
) -> Result<EvaluationSummary, _Error>
where
    _Setup: Fn(Rc<World>, u64) -> Result<Match, _Error> + Sync,
    _Error: Send,
{
    let summary = (0..games)
        .into_par_iter()
        .map(|game| {
            let game_seed = seed.wrapping_add(game as u64);
            let prepared = setup(Rc::new(world.clone()), game_seed)?;
            Ok(EvaluationSummary::from(play(prepared, game_seed, max_ticks)))
        })
        .reduce(
            || Ok(EvaluationSummary::default()),
            |left, right| Ok(left?.merge(right?)),
        )?;
    tracing::info!(games, wins = summary.wins(), mean_score = summary.mean_score(), "evaluation done");
    Ok(summary)
}
