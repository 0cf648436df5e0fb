//! Train command - run the multi-agent Q-learning loop

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::{
    cli::output,
    export::MetricsCsvExporter,
    pipeline::{
        BudgetConfig, EarlyStopConfig, ExplorationConfig, LearningConfig, MetricsObserver,
        ProgressObserver, ProgressReport, Trainer, TrainingConfig, TrainingResult,
    },
    ports::Observer,
    sim::{GridSnapshot, RewardConfig},
};

#[derive(Parser, Debug)]
#[command(about = "Train shuttle agents", allow_negative_numbers = true)]
pub struct TrainArgs {
    /// Side length of the shared grid
    #[arg(long, short = 'g', default_value_t = 5)]
    pub grid_size: usize,

    /// Number of agents in the roster
    #[arg(long, short = 'a', default_value_t = 4)]
    pub agents: usize,

    /// Maximum number of training episodes
    #[arg(long, short = 'e', default_value_t = 50_000)]
    pub episodes: usize,

    /// Tick cap per episode
    #[arg(long, default_value_t = 25)]
    pub max_ticks: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Q-learning learning rate α (0.0-1.0)
    #[arg(long, default_value_t = 0.08)]
    pub alpha: f64,

    /// Q-learning discount factor γ (0.0-1.0)
    #[arg(long, default_value_t = 0.95)]
    pub gamma: f64,

    /// Initial epsilon (exploration rate)
    #[arg(long, default_value_t = 1.0)]
    pub epsilon: f64,

    /// Epsilon decay per episode
    #[arg(long, default_value_t = 0.9999)]
    pub epsilon_decay: f64,

    /// Minimum epsilon
    #[arg(long, default_value_t = 0.01)]
    pub min_epsilon: f64,

    /// Step budget across all episodes
    #[arg(long, default_value_t = 1_500_000)]
    pub max_steps: u64,

    /// Head-on collision budget
    #[arg(long, default_value_t = 4_000)]
    pub max_collisions: usize,

    /// Wall-clock budget in seconds
    #[arg(long, default_value_t = 600.0)]
    pub max_seconds: f64,

    /// Emit progress every this many episodes
    #[arg(long, default_value_t = 3_000)]
    pub report_interval: usize,

    /// Episodes before the early-success criterion applies
    #[arg(long, default_value_t = 20_000)]
    pub warmup: usize,

    /// Mean success rate that stops training early
    #[arg(long, default_value_t = 0.85)]
    pub early_stop_rate: f64,

    /// Target success rate judged in the final report
    #[arg(long, default_value_t = 0.75)]
    pub target_rate: f64,

    /// Show progress bar
    #[arg(long, default_value_t = true)]
    pub progress: bool,

    /// Print the grid snapshot at each progress report
    #[arg(long, default_value_t = false)]
    pub show_grid: bool,

    /// Optional path for writing a summary JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Optional CSV path for the epsilon-per-episode series
    #[arg(long)]
    pub epsilon_csv: Option<PathBuf>,

    /// Optional CSV path for the reward-per-step series
    #[arg(long)]
    pub reward_csv: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SummaryMetadata {
    grid_size: usize,
    agents: usize,
    episodes_requested: usize,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TrainingSummaryFile {
    result: TrainingResult,
    metadata: SummaryMetadata,
}

fn sanitize_summary_path(raw: &Path) -> PathBuf {
    let mut normalized = raw.to_path_buf();
    let raw_str = raw.as_os_str().to_string_lossy();

    // Treat trailing separators or missing filename as a directory target.
    if raw_str.ends_with(std::path::MAIN_SEPARATOR) || normalized.file_name().is_none() {
        normalized.push("training_summary.json");
        return normalized;
    }

    match normalized.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => normalized,
        _ => {
            normalized.set_extension("json");
            normalized
        }
    }
}

/// Delegating wrapper so the metrics series can be read back after the
/// trainer consumed the boxed observer
struct SharedMetrics {
    inner: Arc<Mutex<MetricsObserver>>,
}

impl Observer for SharedMetrics {
    fn on_episode_end(
        &mut self,
        episode: usize,
        outcome: &crate::sim::EpisodeOutcome,
        epsilon: f64,
    ) -> crate::Result<()> {
        self.inner
            .lock()
            .expect("metrics observer lock")
            .on_episode_end(episode, outcome, epsilon)
    }
}

/// Prints the grid diagram and headline counters on the report cadence
struct SnapshotReporter;

impl Observer for SnapshotReporter {
    fn on_progress(
        &mut self,
        progress: &ProgressReport,
        snapshot: &GridSnapshot,
    ) -> crate::Result<()> {
        output::print_subsection(&format!("Agent positions at episode {}", progress.episodes));
        print!("{}", output::render_snapshot(snapshot));
        println!(
            "Episode {}: SR={:.3}, Collisions={}, Steps={}, Time={:.1}s, Eps={:.4}",
            progress.episodes,
            progress.average_success_rate,
            progress.total_collisions,
            progress.total_steps,
            progress.elapsed_seconds,
            progress.epsilon
        );
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}

fn print_final_report(result: &TrainingResult, max_collisions: usize, target_rate: f64) {
    output::print_section("FINAL RESULTS");

    output::print_kv("Episodes completed", &output::format_number(result.episodes));
    output::print_kv(
        "Training time",
        &format!("{:.1} seconds", result.elapsed_seconds),
    );
    output::print_kv(
        "Total steps",
        &output::format_number(result.total_steps as usize),
    );
    output::print_kv(
        "Head-on collisions",
        &output::format_number(result.total_collisions),
    );
    output::print_kv(
        "Collision budget left",
        &output::format_number(max_collisions.saturating_sub(result.total_collisions)),
    );
    output::print_kv("Stop reason", result.stop_reason.label());
    println!();

    for (agent, &count) in result.success_counts.iter().enumerate() {
        let rate = if result.episodes > 0 {
            count as f64 / result.episodes as f64
        } else {
            0.0
        };
        println!(
            "  Agent {agent} success rate: {count}/{} = {rate:.3}",
            result.episodes
        );
    }

    println!(
        "\nOverall success rate: {:.3}",
        result.average_success_rate
    );
    println!("Target success rate: {target_rate:.2}");
    println!("Success rate met: {}", yes_no(result.success_rate_met));
    println!(
        "Collision budget met: {}",
        yes_no(result.collision_budget_met)
    );
    println!("Step budget met: {}", yes_no(result.step_budget_met));
    println!("Time budget met: {}", yes_no(result.time_budget_met));
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let config = TrainingConfig {
        grid_size: args.grid_size,
        num_agents: args.agents,
        max_episodes: args.episodes,
        max_ticks: args.max_ticks,
        report_interval: args.report_interval,
        seed: args.seed,
        learning: LearningConfig {
            learning_rate: args.alpha,
            discount_factor: args.gamma,
        },
        exploration: ExplorationConfig {
            initial_epsilon: args.epsilon,
            epsilon_decay: args.epsilon_decay,
            min_epsilon: args.min_epsilon,
        },
        rewards: RewardConfig::default(),
        budgets: BudgetConfig {
            max_steps: args.max_steps,
            max_collisions: args.max_collisions,
            max_seconds: args.max_seconds,
        },
        early_stop: EarlyStopConfig {
            warmup_episodes: args.warmup,
            success_threshold: args.early_stop_rate,
            target_success_rate: args.target_rate,
        },
    };

    let summary_spec = args.summary.as_ref().map(|raw| {
        let sanitized = sanitize_summary_path(raw);
        let normalized = sanitized != *raw;
        (sanitized, normalized)
    });

    let metrics = Arc::new(Mutex::new(MetricsObserver::new()));

    let mut trainer = Trainer::new(config)?;
    if args.progress {
        trainer = trainer.with_observer(Box::new(ProgressObserver::new()));
    }
    trainer = trainer.with_observer(Box::new(SharedMetrics {
        inner: Arc::clone(&metrics),
    }));
    if args.show_grid {
        trainer = trainer.with_observer(Box::new(SnapshotReporter));
    }

    let result = trainer.run()?;

    print_final_report(&result, args.max_collisions, args.target_rate);

    if let Some((summary_path, normalized)) = summary_spec {
        if normalized {
            println!(
                "\nNormalizing summary path to {}",
                summary_path.display()
            );
        }

        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let summary = TrainingSummaryFile {
            result: result.clone(),
            metadata: SummaryMetadata {
                grid_size: args.grid_size,
                agents: args.agents,
                episodes_requested: args.episodes,
                seed: args.seed,
            },
        };

        let file = std::fs::File::create(&summary_path)?;
        to_writer_pretty(file, &summary)?;
        println!("\nSummary written to {}", summary_path.display());
    }

    let metrics = metrics.lock().expect("metrics observer lock");
    if let Some(path) = &args.epsilon_csv {
        MetricsCsvExporter::write_epsilon_series(path, metrics.epsilon_history())?;
        println!("Epsilon series written to {}", path.display());
    }
    if let Some(path) = &args.reward_csv {
        MetricsCsvExporter::write_reward_series(path, metrics.reward_history())?;
        println!("Reward series written to {}", path.display());
    }

    Ok(())
}
