//! Single-agent step execution with shaped rewards and the Q-update

use serde::{Deserialize, Serialize};

use crate::{
    grid::{Action, Cell, GridWorld},
    q_learning::QTable,
    roster::Roster,
};

/// Reward shaping parameters
///
/// Defaults reproduce the reference tuning: a harsh wall penalty, a goal
/// bonus that dominates every per-step penalty, and an anticipatory
/// proximity penalty that scales with how crowded the destination cell is
/// with oppositely-routed agents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Added when a move is rejected for leaving the grid
    pub wall_penalty: f64,
    /// Added when the resulting cell equals the agent's goal
    pub goal_reward: f64,
    /// Efficiency bonus cap K: bonus = max(0, K - manhattan(old, goal))
    pub efficiency_bonus_cap: f64,
    /// Price per proximity unit, subtracted from the step reward
    pub proximity_penalty: f64,
    /// Units contributed by each opposite-goal agent sharing the cell
    pub same_cell_units: usize,
    /// Units contributed by each opposite-goal agent one step away
    pub adjacent_units: usize,
    /// Flat amount subtracted from all four actions of each colliding
    /// agent's pre-tick state row
    pub collision_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            wall_penalty: -2.0,
            goal_reward: 20.0,
            efficiency_bonus_cap: 5.0,
            proximity_penalty: 1.0,
            same_cell_units: 3,
            adjacent_units: 1,
            collision_penalty: 1.0,
        }
    }
}

/// Result of executing one agent's action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Position after the move (unchanged if the move was rejected)
    pub position: Cell,
    /// Whether the resulting cell is the agent's goal
    pub reached_goal: bool,
    /// Final combined shaped reward fed to the Q-update
    pub reward: f64,
}

/// Applies one agent's chosen action: move, shaped reward, Q-update
///
/// Reward components accumulate additively in a fixed order: wall penalty,
/// goal bonus plus efficiency bonus, proximity penalty. The combined value
/// is what enters the Q-learning update and the reward history. The only
/// side effect is on the acting agent's own Q-table.
pub struct StepExecutor<'a> {
    world: &'a GridWorld,
    rewards: &'a RewardConfig,
}

impl<'a> StepExecutor<'a> {
    pub fn new(world: &'a GridWorld, rewards: &'a RewardConfig) -> Self {
        Self { world, rewards }
    }

    /// Execute `action` for `agent`, mutating that agent's Q-table
    ///
    /// The roster is read-only here; the caller commits the returned
    /// position once the step is accepted.
    pub fn execute(
        &self,
        roster: &Roster,
        agent: usize,
        action: Action,
        table: &mut QTable,
    ) -> StepOutcome {
        let position = roster.position(agent);
        let goal = roster.goal(agent);

        let (next, mut reward) = match self.world.step(position, action) {
            Some(next) => (next, 0.0),
            None => (position, self.rewards.wall_penalty),
        };

        let reached_goal = next == goal;
        if reached_goal {
            reward += self.rewards.goal_reward;
            let distance = position.manhattan_distance(goal) as f64;
            reward += (self.rewards.efficiency_bonus_cap - distance).max(0.0);
        }

        let nearby = roster.opposing_neighbors(agent, next);
        let units = nearby.same_cell * self.rewards.same_cell_units
            + nearby.adjacent * self.rewards.adjacent_units;
        reward -= self.rewards.proximity_penalty * units as f64;

        table.q_learning_update(position, goal, action, reward, next);

        StepOutcome {
            position: next,
            reached_goal,
            reward,
        }
    }
}
