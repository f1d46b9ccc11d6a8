//! Refine calculator CLI.
//!
//! Usage:
//!   refine table                                 # Rate tables
//!   refine steps weapon 4 8                      # Per-step odds
//!   refine attempt weapon 6 -d 1 --seed 3        # One roll
//!   refine session weapon 4 8 -d 2               # Roll until done
//!   refine simulate weapon 4 8 -d 2 -n 100000    # Monte Carlo
//!   refine exact weapon 4 8 -d 2                 # Exact odds
//!   refine calc weapon 4 8 -d 2                  # Everything

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use refine_calc::build_info::VERSION_LINE;
use refine_calc::calculator::{calculate, steps_table};
use refine_calc::refine::{
    format_level, load_rules, load_rules_from, save_rules, save_rules_to, simulate_attempt,
    step_probabilities, ItemCategory, RefineInput, RefineLevel, RefineRules, RefineSession,
};
use refine_calc::simulator::{run_monte_carlo, SimConfig};
use refine_calc::solver::{ExactSolver, SolverConfig, DEFAULT_MAX_ROUNDS};
use refine_calc::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refine", version = VERSION_LINE, about = "Refine odds calculator")]
struct Cli {
    /// Rules file (defaults to ~/.refine/rules.json, then built-in game data)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the success-rate tables
    Table,
    /// Per-step odds between two levels
    Steps(RefineArgs),
    /// Roll a single attempt
    Attempt {
        category: ItemCategory,
        level: RefineLevel,
        #[arg(short, long, default_value_t = 0)]
        durability: u32,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Roll attempts one by one until the target is reached or the item breaks
    Session {
        #[command(flatten)]
        refine: RefineArgs,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Monte Carlo estimate
    Simulate {
        #[command(flatten)]
        refine: RefineArgs,
        #[command(flatten)]
        sim: SimArgs,
        /// Save a JSON report next to the current directory
        #[arg(long)]
        json: bool,
    },
    /// Exact odds from the forward sweep
    Exact {
        #[command(flatten)]
        refine: RefineArgs,
        #[command(flatten)]
        solver: SolverArgs,
        /// Skip the one-level shortcut and model retries at the current durability
        #[arg(long)]
        sweep: bool,
    },
    /// Headline rate, exact odds, Monte Carlo and step table
    Calc {
        #[command(flatten)]
        refine: RefineArgs,
        #[command(flatten)]
        sim: SimArgs,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Write the built-in rules as JSON for editing
    InitRules {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RefineArgs {
    category: ItemCategory,
    from: RefineLevel,
    to: RefineLevel,
    #[arg(short, long, default_value_t = 0)]
    durability: u32,
}

impl RefineArgs {
    fn input(&self) -> RefineInput {
        RefineInput::new(self.category, self.from, self.to, self.durability)
    }
}

#[derive(Args)]
struct SimArgs {
    /// Number of simulated refines
    #[arg(short = 'n', long, default_value_t = SimConfig::default().iterations)]
    iterations: u32,
    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,
    /// Attempts per run before it counts as capped
    #[arg(long, default_value_t = SimConfig::default().max_attempts_per_run)]
    max_attempts: u32,
    /// Spread iterations across all cores
    #[arg(long)]
    parallel: bool,
}

impl SimArgs {
    fn config(&self) -> SimConfig {
        SimConfig {
            iterations: self.iterations,
            seed: self.seed,
            max_attempts_per_run: self.max_attempts,
            parallel: self.parallel,
        }
    }
}

#[derive(Args)]
struct SolverArgs {
    /// Sweep rounds before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
}

impl SolverArgs {
    fn config(&self) -> SolverConfig {
        SolverConfig {
            max_rounds: self.max_rounds,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let rules = match &cli.rules {
        Some(path) => load_rules_from(path)?,
        None => load_rules(),
    };

    match cli.command {
        Command::Table => print_table(&rules),
        Command::Steps(args) => {
            let input = args.input();
            input.validate(&rules)?;
            let steps = step_probabilities(
                &rules,
                input.category,
                input.current_level,
                input.target_level,
            );
            print!("{}", steps_table(&steps));
        }
        Command::Attempt {
            category,
            level,
            durability,
            seed,
        } => {
            let mut rng = make_rng(seed);
            let result = simulate_attempt(&rules, category, level, durability, &mut rng)?;
            println!(
                "{} {} -> {}, durability {} -> {}{}",
                if result.success { "SUCCESS" } else { "FAIL" },
                format_level(level),
                format_level(result.new_level),
                durability,
                result.new_durability,
                if result.destroyed { " (item destroyed)" } else { "" }
            );
        }
        Command::Session { refine, seed } => {
            let mut rng = make_rng(seed);
            let mut session = RefineSession::new(&rules, refine.input())?;
            while !session.is_finished() {
                if session.one_fail_from_destruction(&rules) {
                    println!("  ⚠️  durability 0: the next failure destroys the item");
                }
                let result = session.attempt(&rules, &mut rng)?;
                println!(
                    "  #{:<4} {:<4} {:>3}  durability {}",
                    session.attempts(),
                    if result.success { "✓" } else { "✗" },
                    format_level(result.new_level),
                    result.new_durability
                );
            }
            if session.is_destroyed() {
                println!(
                    "Destroyed at {} after {} attempts",
                    format_level(session.state().level),
                    session.attempts()
                );
            } else {
                println!(
                    "Reached {} after {} attempts, durability {} left",
                    format_level(session.state().level),
                    session.attempts(),
                    session.state().durability
                );
            }
        }
        Command::Simulate { refine, sim, json } => {
            let input = refine.input();
            let config = sim.config();
            println!("Running {} simulations...", config.iterations);
            let result = run_monte_carlo(&rules, &input, &config)?;
            println!("{}", result.to_text());

            if json {
                let filename = format!(
                    "refine_report_{}.json",
                    chrono::Utc::now().format("%Y%m%d_%H%M%S")
                );
                std::fs::write(&filename, result.to_json())?;
                println!("JSON report saved to: {}", filename);
            }
        }
        Command::Exact {
            refine,
            solver,
            sweep,
        } => {
            let input = refine.input();
            let solver = ExactSolver::new(&rules, solver.config());
            let exact = if sweep {
                solver.sweep(&input)?
            } else {
                solver.solve(&input)?
            };
            println!("Success:      {:.4}%", exact.success_probability * 100.0);
            println!("Destruction:  {:.4}%", exact.destruction_probability * 100.0);
            if exact.single_step {
                println!("Failed intact:{:.4}%", exact.unresolved_probability * 100.0);
            } else if !exact.converged {
                println!("Unresolved:   {:.4}%", exact.unresolved_probability * 100.0);
            }
            println!("Exp. attempts {:.2}", exact.expected_attempts);
            println!(
                "Rounds:       {}{}",
                exact.rounds,
                if exact.single_step { " (rate table)" } else { "" }
            );
        }
        Command::Calc {
            refine,
            sim,
            solver,
        } => {
            let report = calculate(&rules, &refine.input(), &sim.config(), &solver.config())?;
            print!("{}", report.to_text());
        }
        Command::InitRules { path } => {
            let rules = RefineRules::default();
            let path = match path {
                Some(p) => {
                    save_rules_to(&p, &rules)?;
                    p
                }
                None => save_rules(&rules)?,
            };
            println!("Wrote default rules to {}", path.display());
        }
    }

    Ok(())
}

fn print_table(rules: &RefineRules) {
    println!("  Step         Weapon    Armor");
    println!("  ──────────   ──────    ──────");
    let max = ItemCategory::ALL
        .iter()
        .map(|&c| rules.max_level(c))
        .max()
        .unwrap_or(0);
    for from in 0..max {
        let to = from + 1;
        println!(
            "  {:>3} -> {:<3}  {:>5.0}%    {:>5.0}%{}",
            format_level(from),
            format_level(to),
            rules.rates.success_rate(ItemCategory::Weapon, from, to) * 100.0,
            rules.rates.success_rate(ItemCategory::Armor, from, to) * 100.0,
            if rules.is_safe(from) { "   safe" } else { "" }
        );
    }
}
