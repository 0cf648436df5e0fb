//! Q-table implementation for temporal difference learning

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    grid::{Action, Cell},
};

/// Q-table mapping (position, goal, action) triples to Q-values
///
/// Stored as a dense array indexed by integer coordinates rather than a
/// hash map: the state space is small and fully enumerable, and the hot
/// loop reads it on every step. Each agent owns exactly one table; values
/// persist and accumulate across episodes for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTable {
    grid_size: usize,
    /// Learning rate α
    learning_rate: f64,
    /// Discount factor γ
    discount_factor: f64,
    /// Flattened [row, col, goal_row, goal_col, action] array, zero-initialized
    values: Vec<f64>,
}

impl QTable {
    /// Create a zero-initialized Q-table for the given grid size
    ///
    /// # Errors
    ///
    /// Returns an error if the grid size cannot host distinct waypoints or
    /// either learning parameter lies outside [0, 1].
    pub fn new(grid_size: usize, learning_rate: f64, discount_factor: f64) -> Result<Self> {
        if grid_size < 2 {
            return Err(Error::InvalidConfiguration {
                message: format!("Q-table grid size must be at least 2, got {grid_size}"),
            });
        }
        if !(0.0..=1.0).contains(&learning_rate) {
            return Err(Error::InvalidConfiguration {
                message: format!("learning rate must be within [0, 1], got {learning_rate}"),
            });
        }
        if !(0.0..=1.0).contains(&discount_factor) {
            return Err(Error::InvalidConfiguration {
                message: format!("discount factor must be within [0, 1], got {discount_factor}"),
            });
        }
        let cells = grid_size * grid_size;
        Ok(Self {
            grid_size,
            learning_rate,
            discount_factor,
            values: vec![0.0; cells * cells * Action::COUNT],
        })
    }

    fn index(&self, position: Cell, goal: Cell, action: Action) -> usize {
        debug_assert!(position.row < self.grid_size && position.col < self.grid_size);
        debug_assert!(goal.row < self.grid_size && goal.col < self.grid_size);
        let n = self.grid_size;
        (((position.row * n + position.col) * n + goal.row) * n + goal.col) * Action::COUNT
            + action.index()
    }

    /// Get the Q-value for a (position, goal, action) triple
    pub fn get(&self, position: Cell, goal: Cell, action: Action) -> f64 {
        self.values[self.index(position, goal, action)]
    }

    /// Set the Q-value for a (position, goal, action) triple
    pub fn set(&mut self, position: Cell, goal: Cell, action: Action, value: f64) {
        let index = self.index(position, goal, action);
        self.values[index] = value;
    }

    /// Maximum Q-value over all actions in a state
    pub fn max_q(&self, position: Cell, goal: Cell) -> f64 {
        Action::ALL
            .iter()
            .map(|&action| self.get(position, goal, action))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Greedy action for a state, ties broken by first-max index order
    pub fn greedy_action(&self, position: Cell, goal: Cell) -> Action {
        let mut best = Action::ALL[0];
        let mut best_q = self.get(position, goal, best);
        for &action in &Action::ALL[1..] {
            let q = self.get(position, goal, action);
            if q > best_q {
                best = action;
                best_q = q;
            }
        }
        best
    }

    /// Q-learning update: off-policy TD control
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]
    pub fn q_learning_update(
        &mut self,
        position: Cell,
        goal: Cell,
        action: Action,
        reward: f64,
        next_position: Cell,
    ) {
        let current_q = self.get(position, goal, action);
        let max_next_q = self.max_q(next_position, goal);
        let td_target = reward + self.discount_factor * max_next_q;
        let td_error = td_target - current_q;
        let new_q = current_q + self.learning_rate * td_error;
        self.set(position, goal, action, new_q);
    }

    /// Subtract a flat penalty from every action of a state's row
    ///
    /// Used after a detected head-on collision to punish the state that led
    /// into it, independent of which action was actually taken.
    pub fn penalize_state(&mut self, position: Cell, goal: Cell, penalty: f64) {
        for action in Action::ALL {
            let index = self.index(position, goal, action);
            self.values[index] -= penalty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> QTable {
        QTable::new(3, 0.5, 0.99).unwrap()
    }

    #[test]
    fn new_table_is_zero_initialized() {
        let table = table();
        for row in 0..3 {
            for col in 0..3 {
                for action in Action::ALL {
                    assert_eq!(
                        table.get(Cell::new(row, col), Cell::new(2, 2), action),
                        0.0
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(QTable::new(1, 0.5, 0.99).is_err());
        assert!(QTable::new(3, 1.5, 0.99).is_err());
        assert!(QTable::new(3, 0.5, -0.1).is_err());
        assert!(QTable::new(3, 0.0, 1.0).is_ok());
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut table = table();
        let state = Cell::new(1, 2);
        let goal = Cell::new(0, 0);
        table.set(state, goal, Action::East, 1.5);
        assert_eq!(table.get(state, goal, Action::East), 1.5);
        // Entries for other goals stay untouched.
        assert_eq!(table.get(state, Cell::new(2, 2), Action::East), 0.0);
    }

    #[test]
    fn max_q_picks_largest_action_value() {
        let mut table = table();
        let state = Cell::new(1, 1);
        let goal = Cell::new(2, 2);
        table.set(state, goal, Action::North, 0.5);
        table.set(state, goal, Action::South, 1.5);
        table.set(state, goal, Action::West, 0.8);
        assert_eq!(table.max_q(state, goal), 1.5);
    }

    #[test]
    fn greedy_action_breaks_ties_by_first_max() {
        let mut table = table();
        let state = Cell::new(0, 1);
        let goal = Cell::new(2, 0);
        table.set(state, goal, Action::South, 2.0);
        table.set(state, goal, Action::East, 2.0);
        assert_eq!(table.greedy_action(state, goal), Action::South);
    }

    #[test]
    fn greedy_action_defaults_to_first_on_uniform_row() {
        let table = table();
        assert_eq!(
            table.greedy_action(Cell::new(1, 1), Cell::new(0, 0)),
            Action::North
        );
    }

    #[test]
    fn q_learning_update_moves_toward_td_target() {
        let mut table = table();
        let state = Cell::new(0, 0);
        let next = Cell::new(0, 1);
        let goal = Cell::new(2, 2);

        table.set(next, goal, Action::South, 1.0);
        table.set(next, goal, Action::East, 2.0);

        table.q_learning_update(state, goal, Action::East, 0.0, next);

        // Q(s,a) = 0.0 + 0.5 * (0.0 + 0.99 * 2.0 - 0.0) = 0.99
        let updated = table.get(state, goal, Action::East);
        assert!((updated - 0.99).abs() < 1e-9);
    }

    #[test]
    fn penalize_state_hits_all_four_actions() {
        let mut table = table();
        let state = Cell::new(1, 0);
        let goal = Cell::new(2, 2);
        table.set(state, goal, Action::North, 0.25);

        table.penalize_state(state, goal, 1.0);

        assert_eq!(table.get(state, goal, Action::North), -0.75);
        assert_eq!(table.get(state, goal, Action::South), -1.0);
        assert_eq!(table.get(state, goal, Action::West), -1.0);
        assert_eq!(table.get(state, goal, Action::East), -1.0);
        // Other states are untouched.
        assert_eq!(table.get(Cell::new(0, 0), goal, Action::North), 0.0);
    }
}
