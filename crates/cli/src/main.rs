// iocross CLI - headless PLC-to-IO-List crosscheck
// Parses the tag export and IO List, runs the engine, renders reports.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use iocross_engine::model::CrosscheckInput;
use iocross_engine::{CrosscheckConfig, CrosscheckError};

use iocross_cli::exit_codes::{EXIT_CONFLICTS, EXIT_SUCCESS};
use iocross_cli::{parse, report, CliError};

#[derive(Parser)]
#[command(name = "iocross")]
#[command(about = "Deterministic PLC-to-IO-List device crosscheck")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crosscheck and render reports
    #[command(after_help = "\
Examples:
  iocross run plc_export.csv io_list.csv
  iocross run plc_export.csv io_list.csv --json
  iocross run plc_export.csv io_list.csv --xlsx report.xlsx --output result.json
  iocross run plc_export.csv io_list.csv --layout rack_layouts.csv --config site.toml")]
    Run {
        /// RSLogix 5000 CSV tag export
        plc_export: PathBuf,

        /// IO List CSV
        io_list: PathBuf,

        /// Optional rack layout CSV (supporting annotation only)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Engine config TOML (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tag export encoding
        #[arg(long, default_value = "latin-1")]
        encoding: String,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the XLSX report to a file
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// Validate an engine config without running
    #[command(after_help = "\
Examples:
  iocross validate site.toml")]
    Validate {
        /// Engine config TOML
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            plc_export,
            io_list,
            layout,
            config,
            encoding,
            json,
            output,
            xlsx,
        } => cmd_run(plc_export, io_list, layout, config, encoding, json, output, xlsx),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message }) => {
            eprintln!("error: {}", message);
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// run
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    plc_export: PathBuf,
    io_list: PathBuf,
    layout: Option<PathBuf>,
    config_path: Option<PathBuf>,
    encoding: String,
    json: bool,
    output: Option<PathBuf>,
    xlsx: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;

    let plc_bytes = std::fs::read(&plc_export)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", plc_export.display())))?;
    let tags = parse::plc_export::parse_plc_export(&plc_bytes, &encoding)?;
    eprintln!("parsed {} PLC records from {}", tags.len(), plc_export.display());

    let io_text = std::fs::read_to_string(&io_list)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", io_list.display())))?;
    let devices = parse::io_list::parse_io_list(&io_text)?;
    eprintln!("parsed {} IO List rows from {}", devices.len(), io_list.display());

    let layout_rows = match &layout {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            parse::rack_layout::parse_rack_layout(&text)?
        }
        None => Vec::new(),
    };

    let input = CrosscheckInput {
        tags,
        devices,
        layout: layout_rows,
    };

    let result = iocross_engine::run(&config, &input).map_err(|e| match e {
        CrosscheckError::InternalInvariant(_) => CliError::internal(e.to_string()),
        _ => CliError::config(e.to_string()),
    })?;

    let report = report::build_report(&input, &result);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::internal(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = xlsx {
        report::write_xlsx(&report, path)?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        println!("{json_str}");
    }

    report::print_summary(&result);

    if !result.conflicts.is_empty() {
        return Err(CliError {
            code: EXIT_CONFLICTS,
            message: format!("{} conflict(s) require human review", result.conflicts.len()),
        });
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<CrosscheckConfig, CliError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            CrosscheckConfig::from_toml(&text).map_err(|e| CliError::config(e.to_string()))
        }
        None => Ok(CrosscheckConfig::default()),
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", config_path.display())))?;

    match CrosscheckConfig::from_toml(&text) {
        Ok(config) => {
            eprintln!(
                "valid: {} strip suffixes, {} ENet prefixes, {} program datatypes",
                config.normalize.strip_suffixes.len(),
                config.normalize.enet_prefixes.len(),
                config.classify.program_datatypes.len(),
            );
            Ok(())
        }
        Err(e) => Err(CliError::config(e.to_string())),
    }
}
