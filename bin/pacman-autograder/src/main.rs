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

//! Headless grader: plays a batch of games per question and prints how many pacman won.
//!
//! * q1: value iteration agent in the small world.
//! * q2: policy iteration agent in the small world.
//! * q3: approximate Q-learning agent in the large world.
//!
//! Every question plays against stochastic ghosts that chase 80% of the time.

use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use approximate_q_learning::LearnerConfig;
use dotenv::dotenv;
use pacman_agents::{
    evaluate_parallel, AgentError, EvaluationSummary, LearningAgent, LearningAgentConfig, Match,
    MdpAgent, MdpAgentConfig, Planner,
};
use pacman_logic::{layouts, Game, GhostAgent, GhostTransitionTable, Rng, StochasticGhost, World};
use rand::SeedableRng;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Games that run longer than this are scored as they stand.
const MAX_TICKS: usize = 1000;

struct Settings {
    question: String,
    games: usize,
    seed: u64,
    training_seed: u64,
    model_dir: PathBuf,
    episodes: usize,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            question: env::var("PACMAN_QUESTION").unwrap_or_else(|_| "all".to_string()),
            games: get_env_var("PACMAN_GAMES").unwrap_or(10),
            seed: get_env_var("PACMAN_SEED").unwrap_or(42),
            training_seed: get_env_var("PACMAN_TRAINING_SEED")
                .unwrap_or(LearningAgentConfig::default().training_seed),
            model_dir: env::var("PACMAN_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            episodes: get_env_var("PACMAN_EPISODES").unwrap_or(LearnerConfig::default().episodes),
        }
    }
}

fn get_env_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pacman_autograder=info,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

fn random_ghosts(world: &Rc<World>, seed: u64) -> Vec<GhostAgent> {
    let rng = Rc::new(RefCell::new(Rng::seed_from_u64(seed)));
    (0..world.start().ghosts.len())
        .map(|index| {
            Box::new(StochasticGhost::new(
                index,
                Rc::clone(world),
                GhostTransitionTable::default(),
                Rc::clone(&rng),
            )) as GhostAgent
        })
        .collect()
}

fn planning_question(
    planner: Planner,
    settings: &Settings,
) -> Result<EvaluationSummary, AgentError> {
    let world = layouts::value_iteration_world()?;
    let file = match planner {
        Planner::Value => "value_iteration_policy.json",
        Planner::Policy => "policy_iteration_policy.json",
    };
    let config = MdpAgentConfig {
        planner,
        policy_path: Some(settings.model_dir.join(file)),
        ..MdpAgentConfig::default()
    };

    // Solve once up front so that every game finds the cached policy.
    let planned = MdpAgent::new(Rc::new(world.clone()), &config)?;
    if let Some(report) = planned.report() {
        tracing::info!(
            ?planner,
            iterations = report.iterations,
            converged = report.converged,
            "solved"
        );
    }

    evaluate_parallel(&world, settings.games, settings.seed, MAX_TICKS, |world, seed| {
        let pacman = MdpAgent::new(Rc::clone(&world), &config)?;
        let ghosts = random_ghosts(&world, seed);
        Ok(Match {
            game: Game::new(world, ghosts),
            pacman: Box::new(pacman),
        })
    })
}

fn learning_question(settings: &Settings) -> Result<EvaluationSummary, AgentError> {
    let world = layouts::learning_world()?;
    let path = settings.model_dir.join("learning_weights.json");
    let config = LearningAgentConfig {
        learner: LearnerConfig {
            episodes: settings.episodes,
            ..LearnerConfig::default()
        },
        training_seed: settings.training_seed,
        weights_path: Some(path.clone()),
        ..LearningAgentConfig::default()
    };

    let rng = Rc::new(RefCell::new(Rng::seed_from_u64(settings.seed)));
    let trained = LearningAgent::new(Rc::new(world.clone()), &config, rng);
    if let Some(report) = trained.report() {
        tracing::info!(
            episodes = report.episodes,
            steps = report.steps,
            capped = report.capped_episodes,
            "trained"
        );
    }

    evaluate_parallel(&world, settings.games, settings.seed, MAX_TICKS, |world, seed| {
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(seed)));
        let pacman = LearningAgent::load(Rc::clone(&world), &path, &config, rng)?;
        let ghosts = random_ghosts(&world, seed);
        Ok(Match {
            game: Game::new(world, ghosts),
            pacman: Box::new(pacman),
        })
    })
}

fn print_score(wins: usize, games: usize, question: &str) {
    println!("For {}:", question);
    println!("Your score is {}/{}.", wins, games);
}

fn report(summary: &EvaluationSummary, question: &str) {
    for (game, record) in summary.records.iter().enumerate() {
        println!("Game {} score: {:.1}", game + 1, record.score);
    }
    print_score(summary.wins(), summary.games(), question);
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging()?;

    let settings = Settings::from_env();
    tracing::info!(
        question = %settings.question,
        games = settings.games,
        seed = settings.seed,
        training_seed = settings.training_seed,
        model_dir = %settings.model_dir.display(),
        "starting"
    );

    let questions: &[&str] = match settings.question.as_str() {
        "all" => &["q1", "q2", "q3"],
        "q1" => &["q1"],
        "q2" => &["q2"],
        "q3" => &["q3"],
        other => return Err(format!("no such question: {}", other).into()),
    };

    let mut wins = 0;
    let mut games = 0;
    for question in questions {
        let (summary, name) = match *question {
            "q1" => (planning_question(Planner::Value, &settings)?, "question 1"),
            "q2" => (planning_question(Planner::Policy, &settings)?, "question 2"),
            _ => (learning_question(&settings)?, "question 3"),
        };
        report(&summary, name);
        wins += summary.wins();
        games += summary.games();
    }
    print_score(wins, games, "all the questions");
    Ok(())
}
