//! Budget-governed training loop over simulation episodes

use std::time::Instant;

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    grid::GridWorld,
    ports::Observer,
    q_learning::{EpsilonGreedy, QTable},
    sim::{EpisodeController, GridSnapshot, RewardConfig},
};

/// Q-learning update parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Learning rate α
    pub learning_rate: f64,
    /// Discount factor γ
    pub discount_factor: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.08,
            discount_factor: 0.95,
        }
    }
}

/// ε-greedy exploration parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplorationConfig {
    pub initial_epsilon: f64,
    /// Multiplicative decay applied once per completed episode
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial_epsilon: 1.0,
            epsilon_decay: 0.9999,
            min_epsilon: 0.01,
        }
    }
}

/// Hard caps that force training termination between episodes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum ticks across all episodes
    pub max_steps: u64,
    /// Maximum head-on collisions; zero is legal and trips after the first
    /// episode
    pub max_collisions: usize,
    /// Maximum wall-clock seconds
    pub max_seconds: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_500_000,
            max_collisions: 4_000,
            max_seconds: 600.0,
        }
    }
}

/// Early-stopping criterion evaluated between episodes after a warm-up
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EarlyStopConfig {
    /// Episodes to complete before the criterion is considered
    pub warmup_episodes: usize,
    /// Mean per-agent success rate that triggers the stop
    pub success_threshold: f64,
    /// Rate the final result record is judged against
    pub target_success_rate: f64,
}

impl Default for EarlyStopConfig {
    fn default() -> Self {
        Self {
            warmup_episodes: 20_000,
            success_threshold: 0.85,
            target_success_rate: 0.75,
        }
    }
}

/// Full configuration of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Side length of the shared grid
    pub grid_size: usize,

    /// Number of agents in the roster
    pub num_agents: usize,

    /// Episode cap when no budget or early stop triggers first
    pub max_episodes: usize,

    /// Tick cap per episode
    pub max_ticks: usize,

    /// Emit a progress report every this many episodes
    pub report_interval: usize,

    /// Random seed; `None` draws one from system entropy
    pub seed: Option<u64>,

    pub learning: LearningConfig,
    pub exploration: ExplorationConfig,
    pub rewards: RewardConfig,
    pub budgets: BudgetConfig,
    pub early_stop: EarlyStopConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            num_agents: 4,
            max_episodes: 50_000,
            max_ticks: 25,
            report_interval: 3_000,
            seed: None,
            learning: LearningConfig::default(),
            exploration: ExplorationConfig::default(),
            rewards: RewardConfig::default(),
            budgets: BudgetConfig::default(),
            early_stop: EarlyStopConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration before any episode runs
    ///
    /// Learning-rate and discount bounds are enforced by Q-table
    /// construction; everything else is checked here.
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: String) -> Error {
            Error::InvalidConfiguration { message }
        }

        if self.grid_size < 2 {
            return Err(invalid(format!(
                "grid size must be at least 2 so distinct waypoints exist, got {}",
                self.grid_size
            )));
        }
        if self.num_agents == 0 {
            return Err(invalid("at least one agent is required".to_string()));
        }
        if self.max_episodes == 0 {
            return Err(invalid("episode cap must be positive".to_string()));
        }
        if self.max_ticks == 0 {
            return Err(invalid("tick cap must be positive".to_string()));
        }
        if self.report_interval == 0 {
            return Err(invalid("report interval must be positive".to_string()));
        }
        if self.budgets.max_steps == 0 {
            return Err(invalid("step budget must be positive".to_string()));
        }
        if !(self.budgets.max_seconds > 0.0) {
            return Err(invalid(format!(
                "time budget must be positive, got {}",
                self.budgets.max_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration.initial_epsilon) {
            return Err(invalid(format!(
                "initial epsilon must be within [0, 1], got {}",
                self.exploration.initial_epsilon
            )));
        }
        if !(self.exploration.epsilon_decay > 0.0 && self.exploration.epsilon_decay <= 1.0) {
            return Err(invalid(format!(
                "epsilon decay must be within (0, 1], got {}",
                self.exploration.epsilon_decay
            )));
        }
        if self.exploration.min_epsilon < 0.0
            || self.exploration.min_epsilon > self.exploration.initial_epsilon
        {
            return Err(invalid(format!(
                "minimum epsilon must be within [0, initial], got {}",
                self.exploration.min_epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.early_stop.success_threshold) {
            return Err(invalid(format!(
                "early-stop success threshold must be within [0, 1], got {}",
                self.early_stop.success_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.early_stop.target_success_rate) {
            return Err(invalid(format!(
                "target success rate must be within [0, 1], got {}",
                self.early_stop.target_success_rate
            )));
        }
        Ok(())
    }
}

/// Why a training run terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Post-warm-up mean success rate cleared the threshold within the
    /// collision budget
    EarlySuccess,
    /// Step budget reached
    StepBudget,
    /// Collision budget reached
    CollisionBudget,
    /// Wall-clock budget elapsed
    TimeBudget,
    /// Episode cap reached without any other trigger
    EpisodeCap,
}

impl StopReason {
    pub fn label(self) -> &'static str {
        match self {
            StopReason::EarlySuccess => "early success",
            StopReason::StepBudget => "step budget",
            StopReason::CollisionBudget => "collision budget",
            StopReason::TimeBudget => "time budget",
            StopReason::EpisodeCap => "episode cap",
        }
    }
}

/// Aggregate counters reported on the periodic cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Episodes completed so far
    pub episodes: usize,
    pub total_steps: u64,
    pub total_collisions: usize,
    pub average_success_rate: f64,
    pub elapsed_seconds: f64,
    pub epsilon: f64,
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Episodes completed
    pub episodes: usize,

    /// Wall-clock duration of the run
    pub elapsed_seconds: f64,

    /// Ticks executed across all episodes
    pub total_steps: u64,

    /// Head-on collisions detected across all episodes
    pub total_collisions: usize,

    /// Successful deliveries per agent
    pub success_counts: Vec<usize>,

    /// Mean per-agent success rate over the whole run
    pub average_success_rate: f64,

    /// Whether the average success rate reached the configured target
    pub success_rate_met: bool,

    /// Whether the run stayed within the step budget
    pub step_budget_met: bool,

    /// Whether the run stayed strictly under the collision budget
    pub collision_budget_met: bool,

    /// Whether the run stayed within the time budget
    pub time_budget_met: bool,

    /// Which condition ended the run
    pub stop_reason: StopReason,
}

impl TrainingResult {
    /// Save result to JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load result from JSON file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let result = serde_json::from_reader(file)?;
        Ok(result)
    }
}

/// Cumulative run counters; the only cross-episode state besides Q-tables
#[derive(Debug, Clone)]
struct Counters {
    total_steps: u64,
    total_collisions: usize,
    success_counts: Vec<usize>,
}

impl Counters {
    fn new(num_agents: usize) -> Self {
        Self {
            total_steps: 0,
            total_collisions: 0,
            success_counts: vec![0; num_agents],
        }
    }

    /// Mean of per-agent success rates after `episodes` episodes
    fn average_success_rate(&self, episodes: usize) -> f64 {
        if episodes == 0 || self.success_counts.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .success_counts
            .iter()
            .map(|&count| count as f64 / episodes as f64)
            .sum();
        total / self.success_counts.len() as f64
    }
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Stop decision evaluated strictly between episodes
///
/// Early success is checked before the budgets, mirroring the reference
/// behavior; the relative order of the budget checks determines which
/// reason is recorded when several trip at once.
fn stop_reason(
    config: &TrainingConfig,
    episodes: usize,
    counters: &Counters,
    elapsed_seconds: f64,
) -> Option<StopReason> {
    if episodes >= config.early_stop.warmup_episodes {
        let average = counters.average_success_rate(episodes);
        if average >= config.early_stop.success_threshold
            && counters.total_collisions <= config.budgets.max_collisions
        {
            return Some(StopReason::EarlySuccess);
        }
    }
    if elapsed_seconds > config.budgets.max_seconds {
        return Some(StopReason::TimeBudget);
    }
    if counters.total_steps >= config.budgets.max_steps {
        return Some(StopReason::StepBudget);
    }
    if counters.total_collisions >= config.budgets.max_collisions {
        return Some(StopReason::CollisionBudget);
    }
    None
}

fn build_result(
    config: &TrainingConfig,
    episodes: usize,
    counters: &Counters,
    elapsed_seconds: f64,
    stop: StopReason,
) -> TrainingResult {
    let average_success_rate = counters.average_success_rate(episodes);
    TrainingResult {
        episodes,
        elapsed_seconds,
        total_steps: counters.total_steps,
        total_collisions: counters.total_collisions,
        success_counts: counters.success_counts.clone(),
        average_success_rate,
        success_rate_met: average_success_rate >= config.early_stop.target_success_rate,
        step_budget_met: counters.total_steps <= config.budgets.max_steps,
        collision_budget_met: counters.total_collisions < config.budgets.max_collisions,
        time_budget_met: elapsed_seconds <= config.budgets.max_seconds,
        stop_reason: stop,
    }
}

/// Runs episodes until a budget, the early-success criterion, or the
/// episode cap ends the run
///
/// All randomness in a run flows through one seedable generator, so a
/// fixed seed reproduces the exact episode sequence.
pub struct Trainer {
    config: TrainingConfig,
    observers: Vec<Box<dyn Observer>>,
}

impl Trainer {
    /// Create a trainer, failing fast on an invalid configuration
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            observers: Vec::new(),
        })
    }

    /// Add an observer to the run
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run training to completion and return the final result record
    pub fn run(&mut self) -> Result<TrainingResult> {
        let config = self.config.clone();
        let world = GridWorld::new(config.grid_size)?;
        let controller = EpisodeController::new(world, config.rewards, config.max_ticks);
        let mut tables = (0..config.num_agents)
            .map(|_| {
                QTable::new(
                    config.grid_size,
                    config.learning.learning_rate,
                    config.learning.discount_factor,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let mut policy = EpsilonGreedy::new(
            config.exploration.initial_epsilon,
            config.exploration.epsilon_decay,
            config.exploration.min_epsilon,
        );
        let mut rng = build_rng(config.seed);

        for observer in &mut self.observers {
            observer.on_training_start(config.max_episodes)?;
        }

        let started = Instant::now();
        let mut counters = Counters::new(config.num_agents);
        let mut episodes = 0;
        let mut stop = StopReason::EpisodeCap;
        let mut last_snapshot: Option<GridSnapshot> = None;

        for episode in 0..config.max_episodes {
            let outcome = controller.run(&mut tables, &mut policy, &mut rng);

            counters.total_steps += outcome.ticks as u64;
            counters.total_collisions += outcome.collisions;
            for (agent, &reached) in outcome.reached.iter().enumerate() {
                if reached {
                    counters.success_counts[agent] += 1;
                }
            }
            episodes = episode + 1;

            for observer in &mut self.observers {
                observer.on_episode_end(episode, &outcome, policy.epsilon())?;
            }

            let snapshot = GridSnapshot::from_outcome(controller.world(), &outcome);
            if episodes.is_multiple_of(config.report_interval) {
                let report = ProgressReport {
                    episodes,
                    total_steps: counters.total_steps,
                    total_collisions: counters.total_collisions,
                    average_success_rate: counters.average_success_rate(episodes),
                    elapsed_seconds: started.elapsed().as_secs_f64(),
                    epsilon: policy.epsilon(),
                };
                for observer in &mut self.observers {
                    observer.on_progress(&report, &snapshot)?;
                }
            }
            last_snapshot = Some(snapshot);

            // The stop decision runs strictly between episodes; never
            // mid-episode.
            if let Some(reason) =
                stop_reason(&config, episodes, &counters, started.elapsed().as_secs_f64())
            {
                stop = reason;
                break;
            }
        }

        // Final report: observers get the closing snapshot and counters
        // even when the last episode missed the periodic cadence.
        if !episodes.is_multiple_of(config.report_interval)
            && let Some(snapshot) = &last_snapshot
        {
            let report = ProgressReport {
                episodes,
                total_steps: counters.total_steps,
                total_collisions: counters.total_collisions,
                average_success_rate: counters.average_success_rate(episodes),
                elapsed_seconds: started.elapsed().as_secs_f64(),
                epsilon: policy.epsilon(),
            };
            for observer in &mut self.observers {
                observer.on_progress(&report, snapshot)?;
            }
        }

        let result = build_result(
            &config,
            episodes,
            &counters,
            started.elapsed().as_secs_f64(),
            stop,
        );

        for observer in &mut self.observers {
            observer.on_training_end(&result)?;
        }

        Ok(result)
    }
}
