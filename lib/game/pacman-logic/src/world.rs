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

use std::collections::{BTreeMap, VecDeque};

use intelligent_agents::Agent;
use serde::{Deserialize, Serialize};

use crate::{
    chase_distance, nearest_food_distance, Action, EndState, Float, FoodSet, GameState, GhostAgent,
    Grid, HashSet, Int, Layout, LayoutError, MoveSet, Position, StateKey, CELL_WIDTH,
};

/// Score for eating one food.
pub const FOOD_REWARD: Float = 1.0;

/// Score added when the last food is eaten.
pub const WIN_BONUS: Float = 100.0;

/// Score removed when a ghost catches pacman.
pub const CAPTURE_PENALTY: Float = 200.0;

/// A ghost catches pacman once their distance is below one cell.
const CAPTURE_DISTANCE: Float = CELL_WIDTH as Float;

/// Named inputs of the linear Q-function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    /// Always 1.
    Bias,
    /// BFS distance to the nearest food, divided by the number of grid cells.
    ClosestFood,
    /// 1 if the move eats food and no ghost is near.
    EatsFood,
    /// Share of ghosts at most two steps away.
    GhostsNear,
}

impl Feature {
    /// Every feature, in a fixed order.
    pub const ALL: [Feature; 4] = [
        Feature::Bias,
        Feature::ClosestFood,
        Feature::EatsFood,
        Feature::GhostsNear,
    ];
}

/// What to simulate from a state.
pub enum SimulationKind<'a> {
    /// Pacman takes an action and eats the food it lands on.
    PacmanMove(Action),
    /// Every ghost takes the given action, in ghost order.
    GhostMoves(&'a [Action]),
    /// Every ghost takes the action its agent picks for the state.
    GhostResponse(&'a mut [GhostAgent]),
}

/// The fixed part of a game: walls, start state, move set and scoring rules.
///
/// Every agent in a world moves with the world's [`MoveSet`], so a world whose move set covers a
/// whole cell per action has a finite state space that [`World::all_states`] can enumerate.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    grid: Grid,
    start: GameState,
    moves: MoveSet,
    time_penalty: Float,
}

impl World {
    /// World with whole-cell moves and no time penalty.
    pub fn new(layout: Layout) -> Self {
        Self {
            grid: layout.grid,
            start: GameState {
                pacman: layout.pacman,
                ghosts: layout.ghosts,
                food: layout.food,
                score: 0.0,
            },
            moves: MoveSet::WHOLE_CELL,
            time_penalty: 0.0,
        }
    }

    /// Parse a layout and build a world from it.
    pub fn from_rows(rows: &[&str]) -> Result<Self, LayoutError> {
        Ok(Self::new(Layout::parse(rows)?))
    }

    /// Score removed after every full tick that does not end the game.
    pub fn with_time_penalty(mut self, time_penalty: Float) -> Self {
        self.time_penalty = time_penalty;
        self
    }

    /// Replace the move set of every agent in this world.
    pub fn with_moves(mut self, moves: MoveSet) -> Self {
        self.moves = moves;
        self
    }

    /// Walls.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// State every game starts from.
    pub fn start(&self) -> &GameState {
        &self.start
    }

    /// Move set shared by every agent.
    pub fn moves(&self) -> &MoveSet {
        &self.moves
    }

    /// Per-tick time penalty.
    pub fn time_penalty(&self) -> Float {
        self.time_penalty
    }

    /// True if an agent fits at `position`.
    pub fn is_valid(&self, position: &Position) -> bool {
        self.grid.is_valid(position)
    }

    /// Valid non-stop actions from `position`, in enumeration order.
    pub fn legal_actions(&self, position: &Position) -> Vec<Action> {
        Action::MOVES
            .into_iter()
            .filter(|action| self.is_valid(&(*position + self.moves.displacement(*action))))
            .collect()
    }

    /// What each ghost may do from `state`: its legal actions, or only [`Action::Stop`] when it
    /// is boxed in.
    pub fn ghost_choices(&self, state: &GameState) -> Vec<Vec<Action>> {
        state
            .ghosts
            .iter()
            .map(|ghost| {
                let actions = self.legal_actions(ghost);
                if actions.is_empty() {
                    vec![Action::Stop]
                } else {
                    actions
                }
            })
            .collect()
    }

    /// Lose if any ghost is within capture distance, otherwise win if no food is left. Losing
    /// takes precedence.
    pub fn end_state(&self, state: &GameState) -> EndState {
        let caught = state
            .ghosts
            .iter()
            .any(|ghost| ghost.distance(&state.pacman) < CAPTURE_DISTANCE);
        if caught {
            EndState::Lose
        } else if state.food.is_empty() {
            EndState::Win
        } else {
            EndState::NotEnded
        }
    }

    /// Canonical key of `state`.
    pub fn key(&self, state: &GameState) -> StateKey {
        StateKey {
            pacman: state.pacman.cell(),
            ghosts: state.ghosts.iter().map(Position::cell).collect(),
            food: state.food.iter().copied().collect(),
        }
    }

    /// Return the state that follows `state` under `kind`. The input is never modified, and a
    /// state that has already ended is returned unchanged.
    pub fn simulate(&self, kind: SimulationKind<'_>, state: &GameState) -> GameState {
        let mut next = state.clone();
        if self.end_state(state).is_terminal() {
            return next;
        }
        match kind {
            SimulationKind::PacmanMove(action) => {
                self.move_agent(&mut next.pacman, action);
                if let Some(index) = self.grid.index_of(&next.pacman) {
                    if next.food.remove(&index) {
                        next.score += FOOD_REWARD;
                    }
                }
                self.settle(&mut next);
            }
            SimulationKind::GhostMoves(actions) => {
                self.move_ghosts(&mut next, actions);
            }
            SimulationKind::GhostResponse(agents) => {
                let actions: Vec<Action> = agents.iter_mut().map(|agent| agent.act(state)).collect();
                self.move_ghosts(&mut next, &actions);
            }
        }
        next
    }

    fn move_agent(&self, position: &mut Position, action: Action) {
        let target = *position + self.moves.displacement(action);
        if self.is_valid(&target) {
            *position = target;
        }
    }

    fn move_ghosts(&self, next: &mut GameState, actions: &[Action]) {
        for (ghost, action) in next.ghosts.iter_mut().zip(actions) {
            self.move_agent(ghost, *action);
        }
        if self.settle(next) == EndState::NotEnded && self.time_penalty != 0.0 {
            next.score = ((next.score - self.time_penalty) * 10.0).round() / 10.0;
        }
    }

    /// Apply the end-of-game bonus or penalty, if the game just ended.
    fn settle(&self, next: &mut GameState) -> EndState {
        let end = self.end_state(next);
        match end {
            EndState::Lose => next.score -= CAPTURE_PENALTY,
            EndState::Win => next.score += WIN_BONUS,
            EndState::NotEnded => {}
        }
        end
    }

    /// Every combination of ghost actions from `state`, and the state each one leads to.
    pub fn ghost_outcomes(&self, state: &GameState) -> Vec<(Vec<Action>, GameState)> {
        let mut combinations: Vec<Vec<Action>> = vec![Vec::new()];
        for choices in self.ghost_choices(state) {
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    choices.iter().map(move |action| {
                        let mut combination = prefix.clone();
                        combination.push(*action);
                        combination
                    })
                })
                .collect();
        }
        combinations
            .into_iter()
            .map(|actions| {
                let next = self.simulate(SimulationKind::GhostMoves(&actions), state);
                (actions, next)
            })
            .collect()
    }

    /// Every state reachable from the start, first the start itself and then in breadth-first
    /// discovery order.
    ///
    /// From a running state, pacman takes each legal action; if that ends the game the ended
    /// state is reachable, otherwise every combination of ghost actions is. Ended states are not
    /// expanded.
    pub fn all_states(&self) -> Vec<GameState> {
        let mut visited: HashSet<StateKey> = HashSet::default();
        let mut frontier: VecDeque<GameState> = VecDeque::new();
        let mut states = Vec::new();
        visited.insert(self.key(&self.start));
        frontier.push_back(self.start.clone());

        while let Some(state) = frontier.pop_front() {
            if !self.end_state(&state).is_terminal() {
                for action in self.legal_actions(&state.pacman) {
                    let moved = self.simulate(SimulationKind::PacmanMove(action), &state);
                    let successors = if self.end_state(&moved).is_terminal() {
                        vec![moved]
                    } else {
                        self.ghost_outcomes(&moved)
                            .into_iter()
                            .map(|(_, next)| next)
                            .collect()
                    };
                    for next in successors {
                        if visited.insert(self.key(&next)) {
                            frontier.push_back(next);
                        }
                    }
                }
            }
            states.push(state);
        }
        tracing::debug!(states = states.len(), "enumerated world states");
        states
    }

    /// Features of taking `action` in `state`, evaluated at pacman's position after the move.
    pub fn features(&self, state: &GameState, action: Action) -> BTreeMap<Feature, Float> {
        let moved = state.pacman + self.moves.displacement(action);
        let near = state
            .ghosts
            .iter()
            .filter(|ghost| {
                chase_distance(self, &self.moves, moved, **ghost).map_or(false, |steps| steps <= 2)
            })
            .count();
        let ghosts_near = if state.ghosts.is_empty() {
            0.0
        } else {
            near as Float / state.ghosts.len() as Float
        };
        let closest_food = nearest_food_distance(self, &self.moves, moved, &state.food) as Float
            / self.grid.cell_count() as Float;
        let eats_food = near == 0 && self.holds_food(&state.food, &moved);

        BTreeMap::from([
            (Feature::Bias, 1.0),
            (Feature::ClosestFood, closest_food),
            (Feature::EatsFood, if eats_food { 1.0 } else { 0.0 }),
            (Feature::GhostsNear, ghosts_near),
        ])
    }

    fn holds_food(&self, food: &FoodSet, position: &Position) -> bool {
        self.grid
            .index_of(position)
            .map_or(false, |index| food.contains(&index))
    }

    /// Open cells nearest to the four grid corners: top-left, bottom-left, top-right,
    /// bottom-right. Ghost `i` scatters to corner `i % 4`.
    pub fn corners(&self) -> [Position; 4] {
        let right = self.grid.width() as Int - 1;
        let bottom = self.grid.height() as Int - 1;
        let open = self.grid.open_cells();
        [(0, 0), (0, bottom), (right, 0), (right, bottom)].map(|(column, row)| {
            open.iter()
                .map(|index| self.grid.position_of(*index))
                .min_by_key(|position| {
                    let (x, y) = position.cell();
                    (x - column).pow(2) + (y - row).pow(2)
                })
                .unwrap_or(self.start.pacman)
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    fn corridor() -> World {
        World::from_rows(&[
            "#######", //
            "#P . G#", //
            "#######",
        ])
        .unwrap()
    }

    #[test]
    fn test_legal_actions_exclude_walls_and_stop() {
        let world = corridor();
        assert_eq!(
            world.legal_actions(&world.start().pacman),
            vec![Action::Right]
        );
        assert_eq!(
            world.legal_actions(&Position::of_cell(3, 1)),
            vec![Action::Left, Action::Right]
        );
    }

    #[test]
    fn test_eating_the_last_food_wins() {
        let world = corridor();
        let start = world.start().clone();
        let first = world.simulate(SimulationKind::PacmanMove(Action::Right), &start);
        assert_eq!(first.pacman, Position::of_cell(2, 1));
        assert_abs_diff_eq!(first.score, 0.0);
        let second = world.simulate(SimulationKind::PacmanMove(Action::Right), &first);
        assert_eq!(second.food_remaining(), 0);
        assert_eq!(world.end_state(&second), EndState::Win);
        assert_abs_diff_eq!(second.score, FOOD_REWARD + WIN_BONUS);
        // The input state is untouched.
        assert_eq!(start, *world.start());
    }

    #[test]
    fn test_invalid_move_stays_in_place() {
        let world = corridor();
        let next = world.simulate(SimulationKind::PacmanMove(Action::Up), world.start());
        assert_eq!(next.pacman, world.start().pacman);
    }

    #[test]
    fn test_walking_into_ghost_loses_even_on_last_food() {
        let world = World::from_rows(&["#####", "#P.G#", "#####"]).unwrap();
        let mut state = world.start().clone();
        state.ghosts[0] = Position::of_cell(2, 1);
        let next = world.simulate(SimulationKind::PacmanMove(Action::Right), &state);
        assert_eq!(world.end_state(&next), EndState::Lose);
        assert_abs_diff_eq!(next.score, FOOD_REWARD - CAPTURE_PENALTY);
    }

    #[test]
    fn test_ghost_catching_pacman_loses() {
        let world = World::from_rows(&["####", "#PG#", "#.##", "####"]).unwrap();
        let next = world.simulate(SimulationKind::GhostMoves(&[Action::Left]), world.start());
        assert_eq!(next.ghosts[0], Position::of_cell(1, 1));
        assert_eq!(world.end_state(&next), EndState::Lose);
        assert_abs_diff_eq!(next.score, -CAPTURE_PENALTY);
    }

    #[test]
    fn test_ended_state_is_not_simulated_further() {
        let world = World::from_rows(&["####", "#PG#", "#.##", "####"]).unwrap();
        let lost = world.simulate(SimulationKind::GhostMoves(&[Action::Left]), world.start());
        let again = world.simulate(SimulationKind::GhostMoves(&[Action::Right]), &lost);
        assert_eq!(again, lost);
    }

    #[test]
    fn test_time_penalty_is_rounded() {
        let world = World::from_rows(&["#######", "#P .  #", "#    G#", "#######"])
            .unwrap()
            .with_time_penalty(0.1);
        let mut state = world.start().clone();
        for _ in 0..3 {
            state = world.simulate(SimulationKind::GhostMoves(&[Action::Stop]), &state);
        }
        assert_eq!(state.score, -0.3);
    }

    #[test]
    fn test_boxed_in_ghost_can_only_stop() {
        let world = World::from_rows(&["#####", "#P.##", "#####", "##G##", "#####"]).unwrap();
        assert_eq!(world.ghost_choices(world.start()), vec![vec![Action::Stop]]);
    }

    #[test]
    fn test_key_ignores_score_and_food_order() {
        let world = corridor();
        let mut state = world.start().clone();
        let key = world.key(&state);
        state.score = 42.0;
        assert_eq!(world.key(&state), key);
        assert_eq!(key.pacman, (1, 1));
        assert_eq!(key.ghosts, vec![(5, 1)]);
        assert_eq!(key.food, vec![10]);
    }

    #[test]
    fn test_all_states_starts_with_start_and_has_unique_keys() {
        let world = World::from_rows(&["######", "#P .G#", "# ## #", "#    #", "######"]).unwrap();
        let states = world.all_states();
        assert_eq!(world.key(&states[0]), world.key(world.start()));
        let keys: HashSet<StateKey> = states.iter().map(|state| world.key(state)).collect();
        assert_eq!(keys.len(), states.len());
        assert!(states
            .iter()
            .any(|state| world.end_state(state) == EndState::Lose));
        assert!(states
            .iter()
            .any(|state| world.end_state(state) == EndState::Win));
    }

    #[test]
    fn test_all_states_is_closed_under_both_half_steps() {
        let world = World::from_rows(&["#####", "#P  #", "# # #", "#. G#", "#####"]).unwrap();
        let states = world.all_states();
        let keys: HashSet<StateKey> = states.iter().map(|state| world.key(state)).collect();
        for state in &states {
            if world.end_state(state).is_terminal() {
                continue;
            }
            for action in world.legal_actions(&state.pacman) {
                let moved = world.simulate(SimulationKind::PacmanMove(action), state);
                if world.end_state(&moved).is_terminal() {
                    assert!(keys.contains(&world.key(&moved)));
                    continue;
                }
                for (_, next) in world.ghost_outcomes(&moved) {
                    assert!(keys.contains(&world.key(&next)));
                }
            }
        }
    }

    #[test]
    fn test_features_of_eating_move() {
        let world = World::from_rows(&["########", "#P.   G#", "########"]).unwrap();
        let features = world.features(world.start(), Action::Right);
        assert_abs_diff_eq!(features[&Feature::Bias], 1.0);
        assert_abs_diff_eq!(features[&Feature::EatsFood], 1.0);
        assert_abs_diff_eq!(features[&Feature::GhostsNear], 0.0);
        assert_abs_diff_eq!(features[&Feature::ClosestFood], 0.0);
    }

    #[test]
    fn test_features_with_ghost_near() {
        let world = World::from_rows(&["#######", "#P.G  #", "#######"]).unwrap();
        let features = world.features(world.start(), Action::Right);
        assert_abs_diff_eq!(features[&Feature::GhostsNear], 1.0);
        assert_abs_diff_eq!(features[&Feature::EatsFood], 0.0);
        // From the food cell itself the nearest food is zero steps away.
        assert_abs_diff_eq!(features[&Feature::ClosestFood], 0.0);
    }

    #[test]
    fn test_closest_food_is_normalized_by_cell_count() {
        let world = World::from_rows(&["######", "#P  .#", "######"]).unwrap();
        let features = world.features(world.start(), Action::Right);
        // One step to (2, 1), then two more to the food at (4, 1).
        assert_abs_diff_eq!(features[&Feature::ClosestFood], 2.0 / 18.0);
        assert_abs_diff_eq!(features[&Feature::GhostsNear], 0.0);
    }

    #[test]
    fn test_corners_are_open_cells() {
        let world = corridor();
        let corners = world.corners();
        assert_eq!(corners[0], Position::of_cell(1, 1));
        assert_eq!(corners[2], Position::of_cell(5, 1));
        for corner in corners {
            assert!(world.is_valid(&corner));
        }
    }

    proptest! {
        #[test]
        fn test_simulation_never_leaves_valid_positions(actions in prop::collection::vec(0..5usize, 0..30)) {
            let world = World::from_rows(&["######", "#P .G#", "# ## #", "#.   #", "######"]).unwrap();
            let mut state = world.start().clone();
            for index in actions {
                let action = Action::ALL[index];
                state = world.simulate(SimulationKind::PacmanMove(action), &state);
                prop_assert!(world.is_valid(&state.pacman));
                state = world.simulate(SimulationKind::GhostMoves(&[Action::ALL[(index + 1) % 5]]), &state);
                prop_assert!(world.is_valid(&state.ghosts[0]));
            }
        }
    }
}
