//! End-to-end scenarios for the episode controller and training loop

use std::sync::{Arc, Mutex};

use gridshuttle::{
    Action, Agent, Cell, EpisodeController, EpsilonGreedy, GridWorld, QTable, Roster, StopReason,
    Trainer, TrainingConfig, Waypoints,
    pipeline::MetricsObserver,
    ports::Observer,
    sim::RewardConfig,
};
use rand::{SeedableRng, rngs::StdRng};

/// Delegating observer so tests can read the collected series after the
/// trainer consumed the boxed observer
struct SharedMetrics {
    inner: Arc<Mutex<MetricsObserver>>,
}

impl Observer for SharedMetrics {
    fn on_episode_end(
        &mut self,
        episode: usize,
        outcome: &gridshuttle::EpisodeOutcome,
        epsilon: f64,
    ) -> gridshuttle::Result<()> {
        self.inner
            .lock()
            .unwrap()
            .on_episode_end(episode, outcome, epsilon)
    }
}

#[test]
fn pretrained_agent_walks_the_shortest_path() {
    // Scenario: 3x3 grid, waypoints fixed at the opposite corners, a single
    // agent with zero exploration and a table that prefers the shortest
    // path. Manhattan distance is 4, so the goal must fall within 4 ticks.
    let world = GridWorld::new(3).unwrap();
    let waypoints = Waypoints::new(Cell::new(0, 0), Cell::new(2, 2)).unwrap();
    let goal = waypoints.b;

    let mut table = QTable::new(3, 0.08, 0.95).unwrap();
    for row in 0..3 {
        for col in 0..3 {
            let cell = Cell::new(row, col);
            if cell == goal {
                continue;
            }
            let preferred = if row < 2 { Action::South } else { Action::East };
            table.set(cell, goal, preferred, 1.0);
        }
    }

    let controller = EpisodeController::new(world, RewardConfig::default(), 25);
    let mut tables = vec![table];
    let mut policy = EpsilonGreedy::new(0.0, 0.9999, 0.0);
    let mut rng = StdRng::seed_from_u64(0);
    let mut roster = Roster::from_agents(vec![Agent {
        position: waypoints.a,
        goal,
    }]);

    let outcome = controller.run_assigned(&mut roster, &waypoints, &mut tables, &mut policy, &mut rng);

    assert_eq!(outcome.successes(), 1);
    assert!(outcome.ticks <= 4, "took {} ticks", outcome.ticks);
    assert_eq!(outcome.collisions, 0);
    assert_eq!(outcome.final_positions, vec![goal]);
    // The arrival step pays the goal bonus plus the efficiency bonus for
    // a distance-1 approach.
    assert_eq!(outcome.step_rewards.last().copied(), Some(24.0));
}

#[test]
fn forced_head_on_course_costs_both_agents() {
    // Scenario: adjacent waypoints, two agents routed straight at each
    // other with zero exploration. The tick must register exactly one
    // collision and both pre-tick state rows must drop by the penalty on
    // all four actions.
    let world = GridWorld::new(2).unwrap();
    let waypoints = Waypoints::new(Cell::new(0, 0), Cell::new(0, 1)).unwrap();

    // A zero learning rate isolates the collision penalty from the
    // Q-learning update made by the step itself.
    let mut east_bound = QTable::new(2, 0.0, 0.95).unwrap();
    east_bound.set(waypoints.a, waypoints.b, Action::East, 1.0);
    let mut west_bound = QTable::new(2, 0.0, 0.95).unwrap();
    west_bound.set(waypoints.b, waypoints.a, Action::West, 1.0);

    let controller = EpisodeController::new(world, RewardConfig::default(), 25);
    let mut tables = vec![east_bound, west_bound];
    let mut policy = EpsilonGreedy::new(0.0, 0.9999, 0.0);
    let mut rng = StdRng::seed_from_u64(0);
    let mut roster = Roster::from_agents(vec![
        Agent {
            position: waypoints.a,
            goal: waypoints.b,
        },
        Agent {
            position: waypoints.b,
            goal: waypoints.a,
        },
    ]);

    let outcome = controller.run_assigned(&mut roster, &waypoints, &mut tables, &mut policy, &mut rng);

    assert_eq!(outcome.ticks, 1);
    assert_eq!(outcome.collisions, 1);
    assert_eq!(outcome.successes(), 2);

    // Agent 0's pre-tick row at (A, goal B): East held 1.0, the other
    // three actions held 0.0; all four must drop by exactly 1.0.
    assert_eq!(tables[0].get(waypoints.a, waypoints.b, Action::East), 0.0);
    for action in [Action::North, Action::South, Action::West] {
        assert_eq!(tables[0].get(waypoints.a, waypoints.b, action), -1.0);
    }

    // Same for agent 1's pre-tick row at (B, goal A).
    assert_eq!(tables[1].get(waypoints.b, waypoints.a, Action::West), 0.0);
    for action in [Action::North, Action::South, Action::East] {
        assert_eq!(tables[1].get(waypoints.b, waypoints.a, action), -1.0);
    }
}

#[test]
fn zero_collision_budget_stops_after_first_episode() {
    let mut config = TrainingConfig {
        grid_size: 3,
        num_agents: 4,
        max_episodes: 100,
        seed: Some(7),
        ..TrainingConfig::default()
    };
    config.budgets.max_collisions = 0;

    let mut trainer = Trainer::new(config).unwrap();
    let result = trainer.run().unwrap();

    assert_eq!(result.episodes, 1);
    assert_eq!(result.stop_reason, StopReason::CollisionBudget);
    assert!(!result.collision_budget_met);
}

#[test]
fn same_seed_reproduces_full_runs() {
    let config = TrainingConfig {
        grid_size: 4,
        num_agents: 4,
        max_episodes: 200,
        seed: Some(1234),
        ..TrainingConfig::default()
    };

    let mut result_a = Trainer::new(config.clone()).unwrap().run().unwrap();
    let mut result_b = Trainer::new(config).unwrap().run().unwrap();

    // Wall-clock time is the only field allowed to differ.
    result_a.elapsed_seconds = 0.0;
    result_b.elapsed_seconds = 0.0;
    assert_eq!(result_a, result_b);
}

#[test]
fn epsilon_series_is_monotone_and_floored() {
    let mut config = TrainingConfig {
        grid_size: 3,
        num_agents: 2,
        max_episodes: 100,
        seed: Some(5),
        ..TrainingConfig::default()
    };
    config.exploration.epsilon_decay = 0.9;
    config.exploration.min_epsilon = 0.05;

    let metrics = Arc::new(Mutex::new(MetricsObserver::new()));
    let mut trainer = Trainer::new(config)
        .unwrap()
        .with_observer(Box::new(SharedMetrics {
            inner: Arc::clone(&metrics),
        }));
    trainer.run().unwrap();

    let metrics = metrics.lock().unwrap();
    let history = metrics.epsilon_history();
    assert_eq!(history.len(), 100);
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0]);
        assert!(pair[1] >= 0.05);
    }
    // 0.9^n decays past the floor well within 100 episodes.
    assert_eq!(history.last().copied(), Some(0.05));
}

#[test]
fn reward_history_records_one_value_per_agent_step() {
    let config = TrainingConfig {
        grid_size: 3,
        num_agents: 2,
        max_episodes: 20,
        seed: Some(9),
        ..TrainingConfig::default()
    };

    let metrics = Arc::new(Mutex::new(MetricsObserver::new()));
    let mut trainer = Trainer::new(config)
        .unwrap()
        .with_observer(Box::new(SharedMetrics {
            inner: Arc::clone(&metrics),
        }));
    let result = trainer.run().unwrap();

    let metrics = metrics.lock().unwrap();
    // Every tick moves at most two agents, and each episode has at least
    // one tick with at least one acting agent.
    let steps = metrics.reward_history().len() as u64;
    assert!(steps >= result.total_steps);
    assert!(steps <= result.total_steps * 2);
}

#[test]
fn invalid_configurations_fail_before_training() {
    let degenerate_grid = TrainingConfig {
        grid_size: 1,
        ..TrainingConfig::default()
    };
    assert!(Trainer::new(degenerate_grid).is_err());

    let mut zero_time = TrainingConfig::default();
    zero_time.budgets.max_seconds = 0.0;
    assert!(Trainer::new(zero_time).is_err());

    let no_agents = TrainingConfig {
        num_agents: 0,
        ..TrainingConfig::default()
    };
    assert!(Trainer::new(no_agents).is_err());
}
