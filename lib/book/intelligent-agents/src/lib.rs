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

// PEAS - Performance, Environment, Action, Sensing
//
// See:
// -  Chapter 2: Intelligent Agents, page 40

/// An Agent maps the Percept it receives to an Action.
///
/// Whether the Agent plans offline, searches every tick or learns as it goes is hidden behind
/// this one method, so callers pick a variant at construction and never look at it again.
pub trait Agent {
    type Action;
    type Percept;

    fn act(&mut self, percept: &Self::Percept) -> Self::Action;
}

impl<_Action, _Percept> Agent for Box<dyn Agent<Action = _Action, Percept = _Percept>> {
    type Action = _Action;
    type Percept = _Percept;

    fn act(&mut self, percept: &Self::Percept) -> Self::Action {
        self.as_mut().act(percept)
    }
}

/// An Environment that one Agent acts in. Everything else in the world, e.g. adversaries, lives
/// inside the Environment.
pub trait Environment {
    type Action;
    type Percept;
    type Score: num_traits::NumAssign + Copy;

    fn percept(&self) -> Self::Percept;
    fn execute_action(&mut self, action: &Self::Action);

    /// Score of the Environment in its current state. This is not cumulative.
    fn score(&self) -> Self::Score;

    /// True once no further action can change the Environment.
    fn is_terminal(&self) -> bool;
}

/// Result of one Simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Episode<_Score> {
    pub steps: usize,
    /// False when the step cap cut the episode short.
    pub terminated: bool,
    pub score: _Score,
}

/// Runs a single Agent in an Environment until the Environment is terminal or `max_steps` PEAS
/// cycles have passed.
pub struct Simulation<_Environment, _Agent>
where
    _Environment: Environment,
    _Agent: Agent<Action = _Environment::Action, Percept = _Environment::Percept>,
{
    environment: _Environment,
    agent: _Agent,
    max_steps: usize,
}

impl<_Environment, _Agent> Simulation<_Environment, _Agent>
where
    _Environment: Environment,
    _Agent: Agent<Action = _Environment::Action, Percept = _Environment::Percept>,
{
    pub fn new(environment: _Environment, agent: _Agent, max_steps: usize) -> Self {
        Self {
            environment,
            agent,
            max_steps,
        }
    }

    pub fn run(&mut self) -> Episode<_Environment::Score> {
        let mut steps = 0;
        while steps < self.max_steps && !self.environment.is_terminal() {
            let percept = self.environment.percept();
            let action = self.agent.act(&percept);
            self.environment.execute_action(&action);
            steps += 1;
        }
        let terminated = self.environment.is_terminal();
        if !terminated {
            tracing::warn!(steps, "simulation stopped at the step cap");
        }
        Episode {
            steps,
            terminated,
            score: self.environment.score(),
        }
    }

    pub fn environment(&self) -> &_Environment {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A counter that ends once it reaches `goal`.
    struct Counter {
        value: i32,
        goal: i32,
    }

    impl Environment for Counter {
        type Action = i32;
        type Percept = i32;
        type Score = i32;

        fn percept(&self) -> i32 {
            self.value
        }

        fn execute_action(&mut self, action: &i32) {
            self.value += action;
        }

        fn score(&self) -> i32 {
            self.value
        }

        fn is_terminal(&self) -> bool {
            self.value >= self.goal
        }
    }

    struct AddOne;

    impl Agent for AddOne {
        type Action = i32;
        type Percept = i32;

        fn act(&mut self, _percept: &i32) -> i32 {
            1
        }
    }

    #[test]
    fn test_simulation_stops_at_terminal() {
        let mut simulation = Simulation::new(Counter { value: 0, goal: 3 }, AddOne, 100);
        let episode = simulation.run();
        assert_eq!(
            episode,
            Episode {
                steps: 3,
                terminated: true,
                score: 3
            }
        );
    }

    #[test]
    fn test_simulation_stops_at_step_cap() {
        let mut simulation = Simulation::new(Counter { value: 0, goal: 10 }, AddOne, 4);
        let episode = simulation.run();
        assert_eq!(episode.steps, 4);
        assert!(!episode.terminated);
        assert_eq!(simulation.environment().value, 4);
    }

    #[test]
    fn test_boxed_agent_delegates() {
        let agent: Box<dyn Agent<Action = i32, Percept = i32>> = Box::new(AddOne);
        let mut simulation = Simulation::new(Counter { value: 0, goal: 2 }, agent, 10);
        assert_eq!(simulation.run().score, 2);
    }
}
