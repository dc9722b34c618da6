//! Ember MUD - Development Tools

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mud_core::config::EngineConfig;
use mud_core::data::SpellCatalog;
use mud_tools::duel::{run_duel, DuelConfig};
use mud_tools::{inspect, validate, Result};

#[derive(Parser)]
#[command(name = "mud-tools")]
#[command(about = "Development tools for Ember MUD")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },

    /// List spells, or show one in full
    Inspect {
        /// Spell catalog to read
        #[arg(long, default_value = "assets/data/spells.ron")]
        catalog: PathBuf,

        /// Spell name or id; omit to list everything
        spell: Option<String>,

        /// Only list spells of this circle
        #[arg(long)]
        circle: Option<u8>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a seeded duel and print its outcome and state hash
    Duel {
        /// Spell catalog to read
        #[arg(long, default_value = "assets/data/spells.ron")]
        catalog: PathBuf,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Spell to cast every round
        #[arg(long, default_value = "magic missile")]
        spell: String,

        /// Caster class
        #[arg(long, default_value = "Sorcerer")]
        class: String,

        /// Caster level
        #[arg(long, default_value = "30")]
        level: i32,

        /// Casting proficiency
        #[arg(long, default_value = "60")]
        power: i32,

        /// Opponent hit points
        #[arg(long, default_value = "300")]
        opponent_hit: i32,

        /// Round limit
        #[arg(long, default_value = "50")]
        rounds: u32,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            let report = validate::validate_data_directory(&path)?;
            if report.is_ok() {
                tracing::info!(spells = report.spells, "Validation passed");
            } else {
                for problem in &report.problems {
                    tracing::error!("{problem}");
                }
                tracing::error!("Validation failed with {} problem(s)", report.problems.len());
                std::process::exit(1);
            }
        }
        Commands::Inspect {
            catalog,
            spell,
            circle,
            json,
        } => {
            let catalog = SpellCatalog::load(&catalog)?;
            match spell {
                Some(query) => {
                    let data = inspect::find(&catalog, &query)?;
                    println!("{}", inspect::render_spell(data, json)?);
                }
                None => {
                    let spells = inspect::list(&catalog, circle);
                    if json {
                        println!("{}", serde_json::to_string_pretty(&spells)?);
                    } else {
                        print!("{}", inspect::render_list(&spells));
                    }
                }
            }
        }
        Commands::Duel {
            catalog,
            seed,
            spell,
            class,
            level,
            power,
            opponent_hit,
            rounds,
            json,
        } => {
            let catalog = Arc::new(SpellCatalog::load(&catalog)?);
            let config = DuelConfig {
                engine: EngineConfig {
                    seed,
                    ..EngineConfig::default()
                },
                spell,
                class,
                caster_level: level,
                power,
                opponent_hit,
                max_rounds: rounds,
                ..DuelConfig::default()
            };
            let report = run_duel(catalog, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "seed {} | {} round(s) | {} landed | {} damage | killed: {} | state hash {:016x}",
                    report.seed,
                    report.rounds,
                    report.landed,
                    report.damage_dealt,
                    report.opponent_killed,
                    report.state_hash
                );
            }
        }
    }
    Ok(())
}
