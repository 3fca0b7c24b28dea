//! pinalloc CLI - microcontroller pin allocation from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pinalloc::model::CapabilityModel;
use pinalloc::{
    parse_mcu, AllocationOptions, AllocationResult, PeripheralType, PinAllocCore, PinAllocError,
    SignalPolicy, SolverConfig,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_OK: i32 = 0;
const EXIT_INPUT: i32 = 1;
const EXIT_INFEASIBLE: i32 = 2;
const EXIT_INDETERMINATE: i32 = 3;

#[derive(Parser)]
#[command(name = "pinalloc")]
#[command(about = "Microcontroller pin allocation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging (debug level) on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign feature requests to physical pins
    Solve {
        /// Path to the MCU hardware document (CubeMX XML)
        #[arg(long, value_name = "XML")]
        mcu: PathBuf,

        /// Path to the feature declaration file
        #[arg(long, value_name = "TXT")]
        features: PathBuf,

        /// What to do with unrecognized signals and declarations
        #[arg(long, value_enum)]
        unknown: UnknownPolicy,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Give up after this many search decisions
        #[arg(long, value_name = "N")]
        max_decisions: Option<u64>,

        /// Give up after this many milliseconds of search
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Skip the presolve infeasibility checks
        #[arg(long)]
        no_presolve: bool,
    },

    /// Show the pin capability table read from an MCU document
    Pins {
        /// Path to the MCU hardware document (CubeMX XML)
        #[arg(long, value_name = "XML")]
        mcu: PathBuf,

        /// What to do with unrecognized signals
        #[arg(long, value_enum)]
        unknown: UnknownPolicy,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List peripheral types and their channel names
    Peripherals {
        /// Show the channel vocabulary of each type
        #[arg(short, long)]
        channels: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum UnknownPolicy {
    /// Fail on the first unrecognized entry
    Strict,
    /// Drop unrecognized entries with a warning
    Lenient,
}

impl From<UnknownPolicy> for SignalPolicy {
    fn from(policy: UnknownPolicy) -> Self {
        match policy {
            UnknownPolicy::Strict => SignalPolicy::Strict,
            UnknownPolicy::Lenient => SignalPolicy::Lenient,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for tooling
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Solve {
            mcu,
            features,
            unknown,
            format,
            max_decisions,
            timeout_ms,
            no_presolve,
        } => {
            let mut options = AllocationOptions::new(unknown.into()).with_solver(SolverConfig {
                max_decisions,
                time_limit: timeout_ms.map(Duration::from_millis),
            });
            if no_presolve {
                options = options.without_presolve();
            }
            handle_solve(&mcu, &features, &options, &format)
        }
        Commands::Pins {
            mcu,
            unknown,
            format,
        } => handle_pins(&mcu, unknown.into(), &format),
        Commands::Peripherals { channels } => {
            handle_peripherals(channels);
            EXIT_OK
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(error: &PinAllocError) -> i32 {
    match error {
        PinAllocError::Infeasible(_) => EXIT_INFEASIBLE,
        PinAllocError::Indeterminate(_) => EXIT_INDETERMINATE,
        PinAllocError::Ingestion(_)
        | PinAllocError::Request(_)
        | PinAllocError::Decode(_)
        | PinAllocError::InvalidSolution(_) => EXIT_INPUT,
    }
}

fn handle_solve(mcu: &Path, features: &Path, options: &AllocationOptions, format: &OutputFormat) -> i32 {
    let result = match PinAllocCore::allocate_files(mcu, features, options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let PinAllocError::InvalidSolution(violations) = &e {
                for violation in violations {
                    eprintln!("  - {}", violation);
                }
            }
            return exit_code(&e);
        }
    };
    tracing::info!(
        "{} bindings, {} decisions, {} backtracks in {:?}",
        result.binding_count(),
        result.stats.decisions,
        result.stats.backtracks,
        result.stats.elapsed
    );

    let printed = match format {
        OutputFormat::Human => {
            output_human(&result);
            Ok(())
        }
        OutputFormat::Json => output_json(&result),
    };
    match printed {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_INPUT
        }
    }
}

fn output_human(result: &AllocationResult) {
    for feature in &result.features {
        println!("{} ({})", feature.name, feature.instance_label());
        for binding in &feature.bindings {
            println!("  {} = {}", binding.label, binding.pin);
        }
    }
}

fn output_json(result: &AllocationResult) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "mcu": result.mcu.display_name(),
        "generated_at": result.generated_at.to_rfc3339(),
        "features": result.features.iter().map(|f| {
            serde_json::json!({
                "name": f.name,
                "peripheral": f.peripheral,
                "instance": f.instance_label(),
                "bindings": f.bindings.iter().map(|b| {
                    serde_json::json!({
                        "label": b.label,
                        "pin": b.pin,
                        "position": b.position,
                        "signal": b.signal,
                    })
                }).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "stats": {
            "decisions": result.stats.decisions,
            "backtracks": result.stats.backtracks,
            "elapsed_ms": result.stats.elapsed.as_millis() as u64,
            "dropped_signals": result.stats.dropped_signals,
            "skipped_declarations": result.stats.skipped_declarations,
        }
    });
    let text = serde_json::to_string_pretty(&output).context("Failed to serialize allocation")?;
    println!("{}", text);
    Ok(())
}

fn handle_pins(mcu: &Path, policy: SignalPolicy, format: &OutputFormat) -> i32 {
    let model = match parse_mcu(mcu, policy) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    let printed = match format {
        OutputFormat::Human => {
            output_pins_human(&model);
            Ok(())
        }
        OutputFormat::Json => serde_json::to_string_pretty(&model)
            .context("Failed to serialize pin table")
            .map(|text| println!("{}", text)),
    };
    match printed {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_INPUT
        }
    }
}

fn output_pins_human(model: &CapabilityModel) {
    println!("{} ({} I/O pins)", model.mcu.display_name(), model.pins.len());
    println!("{}", "─".repeat(60));

    for pin in &model.pins {
        let signals: Vec<&str> = pin.signals.iter().map(|s| s.raw_name.as_str()).collect();
        println!("  {:>4}  {:<14} {}", pin.position, pin.name, signals.join(" "));
    }

    if !model.dropped.is_empty() {
        println!("\n  Dropped signals:");
        for dropped in &model.dropped {
            println!("    - {} on {}: {}", dropped.raw_name, dropped.pin, dropped.reason);
        }
    }
}

fn handle_peripherals(channels: bool) {
    println!("Peripheral types:\n");

    for peripheral in PeripheralType::ALL {
        let sharing = if peripheral.in_exclusivity_set() {
            "instances shared between features"
        } else {
            "one instance per feature"
        };
        println!("  {:<6} {}", peripheral.name(), sharing);

        if channels {
            match peripheral.vocabulary() {
                Some(symbols) => {
                    let names: Vec<&str> = symbols.iter().map(|s| s.name()).collect();
                    println!("         channels: {}", names.join(", "));
                }
                None => println!("         channels: numbered, request by count"),
            }
        }
    }
}
