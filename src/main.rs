//! Smelting Calculator
//!
//! Works out mineral mixes for metals and alloys from a stock of ores.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use smelting_calculator::calculation::{CalculationService, FlagValues, SearchMode, SmeltingResult};
use smelting_calculator::models::{Inventory, SmeltingComponent};
use smelting_calculator::{catalog, db, parse, summary};

#[derive(Parser)]
#[command(name = "smelt")]
#[command(about = "Metal and alloy smelting mix calculator")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, env = "SMELT_DB", default_value = "smelt.db", global = true)]
    database: PathBuf,

    /// Data set to use, as <type>/<id>/<version>
    #[arg(long, env = "SMELT_DATASET", global = true)]
    dataset: Option<String>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every data set found under a data root
    Import {
        /// Directory holding <type>/<id>/<version>/ data sets
        root: PathBuf,

        /// Drop all imported catalog data first (stock is kept)
        #[arg(long)]
        clear: bool,
    },

    /// List imported data sets
    Datasets,

    /// List metals and alloys of the data set
    Outputs,

    /// Show the minerals usable for an output
    Minerals {
        /// Output name (e.g. "Bronze")
        output: String,
    },

    /// Manage recorded stock
    #[command(subcommand)]
    Stock(StockCommand),

    /// Calculate a mix for an output from recorded stock
    Calc {
        /// Output name (e.g. "Bronze")
        output: String,

        /// Amount to produce in mB
        #[arg(allow_negative_numbers = true)]
        target_mb: i64,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Calculate a mix from components and pieces given on the command line
    Solve {
        /// Amount to produce in mB
        #[arg(allow_negative_numbers = true)]
        target_mb: i64,

        /// Component window as mineral:min-max (e.g. copper:88-92)
        #[arg(short, long = "component")]
        components: Vec<String>,

        /// Available pieces as mineral:yieldxquantity[@name] (e.g. tin:16x3)
        #[arg(short, long = "piece")]
        pieces: Vec<String>,

        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Subcommand)]
enum StockCommand {
    /// Record how many of a mineral are on hand (0 removes it)
    Set { mineral: String, quantity: u32 },

    /// Show recorded stock
    List,

    /// Forget all recorded stock
    Clear,
}

#[derive(Args)]
struct SearchArgs {
    /// Fall back to the closest smaller amount when the target is not reachable
    #[arg(long)]
    closest: bool,

    /// Step between fallback amounts in mB
    #[arg(long, allow_negative_numbers = true)]
    interval_mb: Option<i64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn mode(&self) -> SearchMode {
        if self.closest {
            SearchMode::ClosestAlternative
        } else {
            SearchMode::Exact
        }
    }

    fn values(&self) -> FlagValues {
        FlagValues {
            interval_mb: self.interval_mb,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,smelting_calculator=info",
        1 => "info,smelting_calculator=debug",
        2 => "debug,smelting_calculator=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs the command; `Ok(false)` means a calculation without a plan
fn run(cli: &Cli) -> Result<bool> {
    if let Commands::Solve {
        target_mb,
        components,
        pieces,
        search,
    } = &cli.command
    {
        let components = components
            .iter()
            .map(|text| parse::parse_component(text))
            .collect::<Result<Vec<_>, _>>()?;
        let inventory = pieces
            .iter()
            .map(|text| parse::parse_piece(text))
            .collect::<Result<Inventory, _>>()?;
        return Ok(calculate("Custom mix", *target_mb, &components, &inventory, search));
    }

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;
    db::init_schema(&conn)?;
    run_with_database(cli, &conn)
}

fn run_with_database(cli: &Cli, conn: &Connection) -> Result<bool> {
    match &cli.command {
        Commands::Import { root, clear } => {
            if *clear {
                println!("Clearing imported data sets...");
                for dataset in db::list_datasets(conn)? {
                    db::clear_dataset(conn, &dataset)?;
                }
            }

            let stats = catalog::import_to_database(conn, root)
                .with_context(|| format!("Failed to import from {}", root.display()))?;
            println!("{stats}");
        }

        Commands::Datasets => {
            let datasets = db::list_datasets(conn)?;
            if datasets.is_empty() {
                println!("No data sets in database. Run 'import' first.");
            } else {
                println!("Data sets:");
                for dataset in datasets {
                    println!("  {dataset}");
                }
            }
        }

        Commands::Outputs => {
            let dataset = db::resolve_dataset(conn, cli.dataset.as_deref())?;
            let outputs = db::list_outputs(conn, &dataset)?;

            println!("{:<20} {:<6} {:<10} Components", "Output", "Kind", "Producible");
            println!("{}", "-".repeat(60));
            for output in outputs {
                let components: Vec<String> = output
                    .components
                    .iter()
                    .map(|c| format!("{} {}-{}%", c.mineral, c.min, c.max))
                    .collect();
                println!(
                    "{:<20} {:<6} {:<10} {}",
                    output.name,
                    output.kind.as_str(),
                    if output.producible { "yes" } else { "no" },
                    components.join(", ")
                );
            }
        }

        Commands::Minerals { output } => {
            let dataset = db::resolve_dataset(conn, cli.dataset.as_deref())?;
            let output = db::get_output(conn, &dataset, output)?;

            println!("Minerals for {}:", output.name);
            for (key, minerals) in db::minerals_for_output(conn, &dataset, &output)? {
                println!("  {key}:");
                for mineral in minerals {
                    println!("    {:<30} {:>4} mB", mineral.name, mineral.yield_mb);
                }
            }
        }

        Commands::Stock(command) => {
            let dataset = db::resolve_dataset(conn, cli.dataset.as_deref())?;
            match command {
                StockCommand::Set { mineral, quantity } => {
                    let name = db::set_stock(conn, &dataset, mineral, *quantity)?;
                    println!("{name}: {quantity}");
                }
                StockCommand::List => {
                    let stock = db::list_stock(conn, &dataset)?;
                    if stock.is_empty() {
                        println!("No stock recorded.");
                    }
                    for entry in stock {
                        println!("  {:>5}x {}", entry.quantity, entry.mineral);
                    }
                }
                StockCommand::Clear => {
                    let removed = db::clear_stock(conn, &dataset)?;
                    println!("Removed {removed} stock entries.");
                }
            }
        }

        Commands::Calc {
            output,
            target_mb,
            search,
        } => {
            let dataset = db::resolve_dataset(conn, cli.dataset.as_deref())?;
            let output = db::get_output(conn, &dataset, output)?;
            if !output.producible {
                tracing::warn!(output = %output.name, "output is marked as not producible");
            }
            let inventory = db::load_inventory(conn, &dataset, &output)?;
            return Ok(calculate(&output.name, *target_mb, &output.components, &inventory, search));
        }

        Commands::Solve { .. } => {}
    }

    Ok(true)
}

fn calculate(
    name: &str,
    target_mb: i64,
    components: &[SmeltingComponent],
    inventory: &Inventory,
    search: &SearchArgs,
) -> bool {
    let service: CalculationService = CalculationService::default();
    let values = search.values();
    let result = service.calculate_smelting_output(
        target_mb,
        components,
        inventory,
        Some(search.mode()),
        Some(&values),
    );

    if search.json {
        match serde_json::to_string_pretty(&result.report()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    } else {
        println!("{}", summary::summarize(name, target_mb, components, &result));
    }

    matches!(result, SmeltingResult::Success(_))
}
