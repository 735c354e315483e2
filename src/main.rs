//! rowbind CLI - bind tabular files against declarative profiles.
//!
//! ```bash
//! rowbind parse input.csv                    # File -> dataset JSON
//! rowbind check input.xlsx -p profile.json   # Bind and report per-line diagnostics
//! rowbind export input.xlsx out.csv          # Re-export as delimited text
//! rowbind example-profile                    # Show a worked profile
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rowbind::{
    read_tabular_file, write_csv_file, BindProfile, CsvReadOptions, ExcelReadOptions,
    ModelBinder, NoValidation, TabularDataset,
};

#[derive(Parser)]
#[command(name = "rowbind")]
#[command(about = "Bind tabular data files to structured records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV/Excel file and output the dataset as JSON
    Parse {
        /// Input file (.csv, .tsv, .txt, .xlsx, .xls)
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Rows to skip before the header row (Excel)
        #[arg(long, default_value_t = 0)]
        header_row: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bind a file against a profile and report per-line diagnostics
    Check {
        /// Input file
        input: PathBuf,

        /// Bind profile JSON
        #[arg(short, long)]
        profile: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Rows to skip before the header row (Excel)
        #[arg(long, default_value_t = 0)]
        header_row: usize,

        /// Write valid records as JSON to this file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of invalid lines to print
        #[arg(long, default_value_t = 10)]
        max_errors: usize,
    },

    /// Re-export a tabular file as delimited text
    Export {
        /// Input file
        input: PathBuf,

        /// Output CSV file
        output: PathBuf,

        /// Input CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output delimiter
        #[arg(long, default_value_t = ';')]
        out_delimiter: char,

        /// Rows to skip before the header row (Excel)
        #[arg(long, default_value_t = 0)]
        header_row: usize,
    },

    /// Show a worked example bind profile
    ExampleProfile,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            header_row,
            output,
        } => cmd_parse(&input, delimiter, header_row, output.as_deref()),

        Commands::Check {
            input,
            profile,
            delimiter,
            header_row,
            output,
            max_errors,
        } => cmd_check(
            &input,
            &profile,
            delimiter,
            header_row,
            output.as_deref(),
            max_errors,
        ),

        Commands::Export {
            input,
            output,
            delimiter,
            out_delimiter,
            header_row,
        } => cmd_export(&input, &output, delimiter, out_delimiter, header_row),

        Commands::ExampleProfile => cmd_example_profile(),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn read_input(
    input: &Path,
    delimiter: Option<char>,
    header_row: usize,
) -> Result<TabularDataset, Box<dyn std::error::Error>> {
    let csv_options = CsvReadOptions {
        delimiter,
        encoding: None,
    };
    let excel_options = ExcelReadOptions { header_row };
    Ok(read_tabular_file(input, &csv_options, &excel_options)?)
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    header_row: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("parsing {}", input.display());

    let data = read_input(input, delimiter, header_row)?;
    eprintln!("  columns: {}", data.headers.join(", "));
    eprintln!("  rows: {}", data.row_count());

    let json = serde_json::to_string_pretty(&data)?;
    write_output(&json, output)
}

fn cmd_check(
    input: &Path,
    profile_path: &Path,
    delimiter: Option<char>,
    header_row: usize,
    output: Option<&Path>,
    max_errors: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = BindProfile::from_file(profile_path)?;
    eprintln!("checking {} against profile '{}'", input.display(), profile.name);

    let data = read_input(input, delimiter, header_row)?;

    let missing = profile.missing_headers(&data.headers);
    if !missing.is_empty() {
        eprintln!("  missing columns: {}", missing.join(", "));
    }

    let mapper = Arc::new(profile.header_map()?);
    let binder = ModelBinder::new(mapper, NoValidation, profile.convert_config());
    let result = binder.bind(&data);

    if !result.batch_errors.is_empty() {
        eprintln!("  nothing to bind: {}", result.batch_errors[0]);
        return Ok(());
    }

    eprintln!("  {}", result.summary());
    let mut printed = 0;
    for line in result.line_results.iter().filter(|r| !r.is_valid()) {
        if printed >= max_errors {
            eprintln!(
                "  ... {} more invalid lines",
                result.invalid_count() - printed
            );
            break;
        }
        printed += 1;
        for error in &line.field_errors {
            eprintln!("  {}", error.message);
        }
        for failure in &line.validation_failures {
            eprintln!("  line {}: {}", line.line_number, failure);
        }
    }

    let json = serde_json::to_string_pretty(&result.valid_models)?;
    write_output(&json, output)?;

    if result.invalid_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_export(
    input: &Path,
    output: &Path,
    delimiter: Option<char>,
    out_delimiter: char,
    header_row: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(input, delimiter, header_row)?;
    write_csv_file(&data, output, out_delimiter)?;
    eprintln!(
        "exported {} rows to {}",
        data.row_count(),
        output.display()
    );
    Ok(())
}

fn cmd_example_profile() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", rowbind::example_profile().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("  written to {}", p.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
