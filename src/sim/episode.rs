//! Episode controller: one bounded simulation run from waypoint sampling
//! to termination

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    grid::{Cell, GridWorld, Waypoints},
    q_learning::{EpsilonGreedy, QTable},
    roster::Roster,
    sim::{
        collision::detect_head_on_swaps,
        step::{RewardConfig, StepExecutor},
    },
};

/// What happened in one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    /// The episode's sampled (or supplied) waypoint pair
    pub waypoints: Waypoints,
    /// Ticks executed before termination
    pub ticks: usize,
    /// Head-on collisions detected across all ticks
    pub collisions: usize,
    /// Per-agent goal attainment, in agent order
    pub reached: Vec<bool>,
    /// Final combined reward of every agent-step, in execution order
    pub step_rewards: Vec<f64>,
    /// Agent positions when the episode ended
    pub final_positions: Vec<Cell>,
}

impl EpisodeOutcome {
    /// Number of agents that reached their goal this episode
    pub fn successes(&self) -> usize {
        self.reached.iter().filter(|&&r| r).count()
    }
}

/// Plain-data placement snapshot for external rendering
///
/// The core never renders; reporting collaborators turn this into text or
/// plots as they see fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub grid_size: usize,
    pub waypoints: Waypoints,
    /// Agent positions in agent order
    pub positions: Vec<Cell>,
}

impl GridSnapshot {
    pub fn from_outcome(world: &GridWorld, outcome: &EpisodeOutcome) -> Self {
        Self {
            grid_size: world.size(),
            waypoints: outcome.waypoints,
            positions: outcome.final_positions.clone(),
        }
    }
}

/// Runs single episodes: init, randomized sequential tick loop, end
///
/// Each tick draws a fresh random permutation of agent indices and runs the
/// unfinished agents one at a time in that order. Sequential execution with
/// shuffled order deliberately breaks symmetric ties over contested cells;
/// the collision detector still sees the net effect of the whole tick.
#[derive(Debug, Clone)]
pub struct EpisodeController {
    world: GridWorld,
    rewards: RewardConfig,
    max_ticks: usize,
}

impl EpisodeController {
    pub fn new(world: GridWorld, rewards: RewardConfig, max_ticks: usize) -> Self {
        Self {
            world,
            rewards,
            max_ticks,
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Run one episode with sampled waypoints and a random start assignment
    ///
    /// One Q-table per agent; the roster size follows the table count.
    pub fn run<R: Rng>(
        &self,
        tables: &mut [QTable],
        policy: &mut EpsilonGreedy,
        rng: &mut R,
    ) -> EpisodeOutcome {
        let waypoints = self.world.sample_waypoints(rng);
        let mut roster = Roster::assign(tables.len(), &waypoints, rng);
        self.run_assigned(&mut roster, &waypoints, tables, policy, rng)
    }

    /// Run one episode with a pre-assigned roster and fixed waypoints
    ///
    /// This is the deterministic entry point scenario tests drive directly;
    /// [`EpisodeController::run`] layers the random sampling on top.
    pub fn run_assigned<R: Rng>(
        &self,
        roster: &mut Roster,
        waypoints: &Waypoints,
        tables: &mut [QTable],
        policy: &mut EpsilonGreedy,
        rng: &mut R,
    ) -> EpisodeOutcome {
        debug_assert_eq!(roster.len(), tables.len());

        let executor = StepExecutor::new(&self.world, &self.rewards);
        let num_agents = roster.len();
        let goals = roster.goals();

        let mut reached = vec![false; num_agents];
        let mut step_rewards = Vec::new();
        let mut collisions = 0;
        let mut ticks = 0;
        let mut before = roster.positions();
        let mut order: Vec<usize> = (0..num_agents).collect();

        while ticks < self.max_ticks && reached.iter().any(|&r| !r) {
            order.shuffle(rng);

            for &agent in &order {
                if reached[agent] {
                    continue;
                }
                let action = policy.select_action(
                    rng,
                    &tables[agent],
                    roster.position(agent),
                    roster.goal(agent),
                );
                let step = executor.execute(roster, agent, action, &mut tables[agent]);
                roster.set_position(agent, step.position);
                step_rewards.push(step.reward);
                if step.reached_goal {
                    reached[agent] = true;
                }
            }

            let after = roster.positions();
            let pairs = detect_head_on_swaps(&before, &after, &goals, waypoints);
            collisions += pairs.len();
            for &(i, j) in &pairs {
                tables[i].penalize_state(before[i], goals[i], self.rewards.collision_penalty);
                tables[j].penalize_state(before[j], goals[j], self.rewards.collision_penalty);
            }

            before = after;
            ticks += 1;
        }

        policy.decay();

        EpisodeOutcome {
            waypoints: *waypoints,
            ticks,
            collisions,
            reached,
            step_rewards,
            final_positions: roster.positions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::grid::Action;

    fn controller(grid_size: usize, max_ticks: usize) -> EpisodeController {
        EpisodeController::new(
            GridWorld::new(grid_size).unwrap(),
            RewardConfig::default(),
            max_ticks,
        )
    }

    fn tables(grid_size: usize, count: usize) -> Vec<QTable> {
        (0..count)
            .map(|_| QTable::new(grid_size, 0.08, 0.95).unwrap())
            .collect()
    }

    #[test]
    fn episode_respects_tick_cap_and_bounds() {
        let controller = controller(4, 25);
        let mut tables = tables(4, 3);
        let mut policy = EpsilonGreedy::new(1.0, 0.9999, 0.01);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            let outcome = controller.run(&mut tables, &mut policy, &mut rng);
            assert!(outcome.ticks <= 25);
            for position in &outcome.final_positions {
                assert!(controller.world().contains(*position));
            }
            // Every agent-step belongs to an unfinished agent; an upper
            // bound is agents * ticks.
            assert!(outcome.step_rewards.len() <= 3 * outcome.ticks);
        }
    }

    #[test]
    fn finished_agents_stop_acting() {
        // One agent, one step from its goal, greedy policy that walks
        // straight in: the episode ends after a single tick with a single
        // step taken.
        let controller = controller(3, 25);
        let mut table = vec![QTable::new(3, 0.08, 0.95).unwrap()];
        table[0].set(Cell::new(0, 1), Cell::new(0, 0), Action::West, 1.0);
        let mut policy = EpsilonGreedy::new(0.0, 0.9999, 0.0);
        let mut rng = StdRng::seed_from_u64(1);

        let waypoints = Waypoints::new(Cell::new(0, 1), Cell::new(0, 0)).unwrap();
        let mut roster = Roster::from_agents(vec![crate::roster::Agent {
            position: Cell::new(0, 1),
            goal: Cell::new(0, 0),
        }]);

        let outcome =
            controller.run_assigned(&mut roster, &waypoints, &mut table, &mut policy, &mut rng);

        assert_eq!(outcome.ticks, 1);
        assert_eq!(outcome.step_rewards.len(), 1);
        assert_eq!(outcome.successes(), 1);
    }

    #[test]
    fn epsilon_decays_exactly_once_per_episode() {
        let controller = controller(3, 5);
        let mut tables = tables(3, 2);
        let mut policy = EpsilonGreedy::new(1.0, 0.5, 0.01);
        let mut rng = StdRng::seed_from_u64(2);

        controller.run(&mut tables, &mut policy, &mut rng);
        assert_eq!(policy.epsilon(), 0.5);
        controller.run(&mut tables, &mut policy, &mut rng);
        assert_eq!(policy.epsilon(), 0.25);
    }

    #[test]
    fn same_seed_reproduces_the_episode() {
        let controller = controller(4, 25);
        let mut policy_a = EpsilonGreedy::new(1.0, 0.9999, 0.01);
        let mut policy_b = EpsilonGreedy::new(1.0, 0.9999, 0.01);
        let mut tables_a = tables(4, 4);
        let mut tables_b = tables(4, 4);

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        let outcome_a = controller.run(&mut tables_a, &mut policy_a, &mut rng_a);
        let outcome_b = controller.run(&mut tables_b, &mut policy_b, &mut rng_b);

        assert_eq!(outcome_a, outcome_b);
    }
}
