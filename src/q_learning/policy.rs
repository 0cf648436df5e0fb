//! ε-greedy action selection with per-episode exponential decay

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    grid::{Action, Cell},
    q_learning::QTable,
};

/// ε-greedy exploration policy
///
/// With probability ε the policy returns a uniformly random action;
/// otherwise it returns the greedy action from the agent's Q-table.
/// Selection itself has no side effects; ε decays only through
/// [`EpsilonGreedy::decay`], called once per completed episode, and never
/// drops below the configured minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    epsilon: f64,
    epsilon_decay: f64,
    min_epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64, epsilon_decay: f64, min_epsilon: f64) -> Self {
        Self {
            epsilon,
            epsilon_decay,
            min_epsilon,
        }
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Select an action for the given state
    pub fn select_action<R: Rng>(
        &self,
        rng: &mut R,
        table: &QTable,
        position: Cell,
        goal: Cell,
    ) -> Action {
        if rng.random::<f64>() < self.epsilon {
            // Explore: uniformly random action
            Action::from_index(rng.random_range(0..Action::COUNT)).expect("index in range")
        } else {
            // Exploit: greedy action based on Q-values
            table.greedy_action(position, goal)
        }
    }

    /// Decay ε after an episode: ε ← max(ε · decay, ε_min)
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.min_epsilon);
    }
}
