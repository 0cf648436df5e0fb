//! Agent roster: per-episode positions and goals
//!
//! Agents are created fresh for every episode. Each starts at one of the two
//! episode waypoints, chosen uniformly, and its goal is the opposite
//! waypoint. The only state that outlives an episode is the Q-value store.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Waypoints};

/// One agent's episode state: where it is and where it is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Cell,
    pub goal: Cell,
}

/// Count of opposite-goal agents near a candidate cell
///
/// Same-cell presence is tracked separately from adjacency because the
/// reward shaping weighs the two differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpposingNeighbors {
    pub same_cell: usize,
    pub adjacent: usize,
}

/// The fixed set of agents moving through one episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    agents: Vec<Agent>,
}

impl Roster {
    /// Assign a fresh roster for an episode: each agent starts at waypoint
    /// A or B uniformly at random, goal set to the opposite waypoint
    pub fn assign<R: Rng>(num_agents: usize, waypoints: &Waypoints, rng: &mut R) -> Self {
        let endpoints = [waypoints.a, waypoints.b];
        let agents = (0..num_agents)
            .map(|_| {
                let start = *endpoints.choose(rng).expect("two endpoints");
                Agent {
                    position: start,
                    goal: waypoints.opposite(start),
                }
            })
            .collect();
        Self { agents }
    }

    /// Build a roster from explicit agents (deterministic scenarios)
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn position(&self, agent: usize) -> Cell {
        self.agents[agent].position
    }

    pub fn goal(&self, agent: usize) -> Cell {
        self.agents[agent].goal
    }

    pub fn set_position(&mut self, agent: usize, position: Cell) {
        self.agents[agent].position = position;
    }

    /// Snapshot of all current positions, in agent order
    pub fn positions(&self) -> Vec<Cell> {
        self.agents.iter().map(|a| a.position).collect()
    }

    /// Snapshot of all goals, in agent order
    pub fn goals(&self) -> Vec<Cell> {
        self.agents.iter().map(|a| a.goal).collect()
    }

    /// Count agents routed the other way that sit on or next to `at`
    ///
    /// Only agents whose goal differs from `agent`'s goal are counted; an
    /// agent never counts itself. This is the anticipatory signal feeding
    /// the proximity penalty, evaluated even when no collision occurs.
    pub fn opposing_neighbors(&self, agent: usize, at: Cell) -> OpposingNeighbors {
        let my_goal = self.agents[agent].goal;
        let mut counts = OpposingNeighbors::default();
        for (other, state) in self.agents.iter().enumerate() {
            if other == agent || state.goal == my_goal {
                continue;
            }
            match state.position.manhattan_distance(at) {
                0 => counts.same_cell += 1,
                1 => counts.adjacent += 1,
                _ => {}
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::grid::GridWorld;

    fn waypoints() -> Waypoints {
        Waypoints::new(Cell::new(0, 0), Cell::new(2, 2)).unwrap()
    }

    #[test]
    fn assignment_pairs_start_with_opposite_goal() {
        let world = GridWorld::new(3).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let waypoints = world.sample_waypoints(&mut rng);
            let roster = Roster::assign(4, &waypoints, &mut rng);
            assert_eq!(roster.len(), 4);
            for i in 0..roster.len() {
                let start = roster.position(i);
                let goal = roster.goal(i);
                assert!(start == waypoints.a || start == waypoints.b);
                assert_eq!(goal, waypoints.opposite(start));
                assert_ne!(start, goal);
            }
        }
    }

    #[test]
    fn both_endpoints_are_used_as_starts() {
        let mut rng = StdRng::seed_from_u64(3);
        let waypoints = waypoints();
        let roster = Roster::assign(32, &waypoints, &mut rng);
        let starts_at_a = (0..roster.len())
            .filter(|&i| roster.position(i) == waypoints.a)
            .count();
        assert!(starts_at_a > 0 && starts_at_a < roster.len());
    }

    #[test]
    fn opposing_neighbors_ignores_same_goal_agents() {
        let goal_a = Cell::new(0, 0);
        let goal_b = Cell::new(2, 2);
        let roster = Roster::from_agents(vec![
            Agent {
                position: Cell::new(1, 1),
                goal: goal_b,
            },
            Agent {
                position: Cell::new(1, 1),
                goal: goal_b,
            },
            Agent {
                position: Cell::new(1, 2),
                goal: goal_a,
            },
            Agent {
                position: Cell::new(1, 1),
                goal: goal_a,
            },
        ]);

        let counts = roster.opposing_neighbors(0, Cell::new(1, 1));
        // Agent 1 shares the goal and is skipped; agent 2 is adjacent,
        // agent 3 shares the cell.
        assert_eq!(
            counts,
            OpposingNeighbors {
                same_cell: 1,
                adjacent: 1,
            }
        );
    }

    #[test]
    fn opposing_neighbors_excludes_self() {
        let roster = Roster::from_agents(vec![Agent {
            position: Cell::new(0, 0),
            goal: Cell::new(1, 1),
        }]);
        assert_eq!(
            roster.opposing_neighbors(0, Cell::new(0, 0)),
            OpposingNeighbors::default()
        );
    }
}
