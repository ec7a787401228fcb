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

//! Pacman agents built on the book crates.
//!
//! [`MdpAgent`] plans offline with value or policy iteration over the enumerated world and then
//! looks its action up every tick. [`LearningAgent`] trains a linear Q-function against a
//! stochastic ghost and acts greedily on it. Both are plain [`intelligent_agents::Agent`]s, so the
//! evaluation harness can play either one.

mod evaluation;
mod learning;
mod mdp;
mod mdp_agent;

pub use evaluation::{
    evaluate, evaluate_parallel, play, EvaluationSummary, GameRecord, Match, PacmanAgent,
};
pub use learning::{LearningAgent, LearningAgentConfig, LearningGame};
pub use mdp::PacmanMdp;
pub use mdp_agent::{MdpAgent, MdpAgentConfig, Planner};

pub use pacman_logic::{Float, Rng};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Layout(#[from] pacman_logic::LayoutError),

    #[error(transparent)]
    Mdp(#[from] markov_decision_process::MdpError),

    #[error(transparent)]
    Learning(#[from] approximate_q_learning::LearningError),
}
