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

use std::rc::Rc;

use intelligent_agents::Environment;

use crate::{Action, EndState, Float, GameState, GhostAgent, SimulationKind, World};

/// A running game: one mutable state plus the agents driving the ghosts.
///
/// Each tick moves pacman and eats, checks for the end of the game, moves every ghost, checks
/// again and finally applies the world's time penalty if the game goes on.
pub struct Game {
    world: Rc<World>,
    state: GameState,
    ghosts: Vec<GhostAgent>,
    ticks: usize,
}

impl Game {
    /// New game at the world's start state. `ghosts[i]` drives `state.ghosts[i]`.
    pub fn new(world: Rc<World>, ghosts: Vec<GhostAgent>) -> Self {
        let state = world.start().clone();
        Self {
            world,
            state,
            ghosts,
            ticks: 0,
        }
    }

    /// The rules this game is played by.
    pub fn world(&self) -> &Rc<World> {
        &self.world
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Whether, and how, the game has ended.
    pub fn end_state(&self) -> EndState {
        self.world.end_state(&self.state)
    }

    /// Ticks played since the last reset.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Go back to the world's start state. Ghost agents keep their internal state.
    pub fn reset(&mut self) {
        self.state = self.world.start().clone();
        self.ticks = 0;
    }

    /// Play one tick with pacman taking `action`. Does nothing once the game has ended.
    pub fn tick(&mut self, action: Action) -> EndState {
        if self.end_state().is_terminal() {
            return self.end_state();
        }
        self.ticks += 1;
        self.state = self
            .world
            .simulate(SimulationKind::PacmanMove(action), &self.state);
        if self.end_state().is_terminal() {
            return self.end_state();
        }
        let next = self
            .world
            .simulate(SimulationKind::GhostResponse(&mut self.ghosts), &self.state);
        self.state = next;
        self.end_state()
    }
}

impl Environment for Game {
    type Action = Action;
    type Percept = GameState;
    type Score = Float;

    fn percept(&self) -> GameState {
        self.state.clone()
    }

    fn execute_action(&mut self, action: &Action) {
        self.tick(*action);
    }

    fn score(&self) -> Float {
        self.state.score
    }

    fn is_terminal(&self) -> bool {
        self.end_state().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use intelligent_agents::{Agent, Simulation};

    use super::*;
    use crate::{AStarGhost, Position, CAPTURE_PENALTY, FOOD_REWARD, WIN_BONUS};

    fn ring() -> Rc<World> {
        Rc::new(
            World::from_rows(&[
                "######", //
                "#P .G#", //
                "# ## #", //
                "#    #", //
                "######",
            ])
            .unwrap(),
        )
    }

    /// Plays a fixed list of actions, then stops.
    struct Script(Vec<Action>);

    impl Agent for Script {
        type Action = Action;
        type Percept = GameState;

        fn act(&mut self, _state: &GameState) -> Action {
            if self.0.is_empty() {
                Action::Stop
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn test_standing_still_gets_caught() {
        let world = ring();
        let ghosts: Vec<GhostAgent> = vec![Box::new(AStarGhost::new(0, world.clone()))];
        let mut game = Game::new(world, ghosts);
        let mut ticks = 0;
        while game.tick(Action::Stop) == EndState::NotEnded {
            ticks += 1;
            assert!(ticks < 10);
        }
        assert_eq!(game.end_state(), EndState::Lose);
        assert_abs_diff_eq!(game.state().score, -CAPTURE_PENALTY);
        assert_eq!(game.state().ghosts[0], Position::of_cell(1, 1));
    }

    #[test]
    fn test_pacman_moves_before_ghosts() {
        let world = Rc::new(World::from_rows(&["#####", "#P.G#", "#####"]).unwrap());
        let ghosts: Vec<GhostAgent> = vec![Box::new(AStarGhost::new(0, world.clone()))];
        let mut game = Game::new(world, ghosts);
        // Pacman eats the last food and wins before the ghost can step onto that cell.
        assert_eq!(game.tick(Action::Right), EndState::Win);
        assert_abs_diff_eq!(game.state().score, FOOD_REWARD + WIN_BONUS);
        assert_eq!(game.state().ghosts[0], Position::of_cell(3, 1));
        assert_eq!(game.tick(Action::Left), EndState::Win);
        assert_eq!(game.ticks(), 1);
    }

    #[test]
    fn test_reset_restores_start() {
        let world = ring();
        let ghosts: Vec<GhostAgent> = vec![Box::new(AStarGhost::new(0, world.clone()))];
        let mut game = Game::new(world.clone(), ghosts);
        game.tick(Action::Right);
        assert_ne!(game.state(), world.start());
        game.reset();
        assert_eq!(game.state(), world.start());
        assert_eq!(game.ticks(), 0);
    }

    #[test]
    fn test_time_penalty_per_tick() {
        let world = Rc::new(
            World::from_rows(&["######", "#P  .#", "######", "#G   #", "######"])
                .unwrap()
                .with_time_penalty(0.1),
        );
        let ghosts: Vec<GhostAgent> = vec![Box::new(AStarGhost::new(0, world.clone()))];
        let mut game = Game::new(world, ghosts);
        game.tick(Action::Right);
        game.tick(Action::Right);
        assert_eq!(game.state().score, -0.2);
        assert_eq!(game.tick(Action::Right), EndState::Win);
        assert_abs_diff_eq!(game.state().score, -0.2 + FOOD_REWARD + WIN_BONUS);
    }

    #[test]
    fn test_simulation_runs_game_to_the_end() {
        let world = ring();
        let ghosts: Vec<GhostAgent> = vec![Box::new(AStarGhost::new(0, world.clone()))];
        let game = Game::new(world, ghosts);
        let mut simulation = Simulation::new(game, Script(vec![Action::Down]), 50);
        let episode = simulation.run();
        assert!(episode.terminated);
        assert_eq!(simulation.environment().end_state(), EndState::Lose);
    }
}
