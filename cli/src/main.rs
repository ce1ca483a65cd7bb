//! unsheet CLI - Excel workbook structure extraction tool
//!
//! A command-line tool for decoding XLSX workbooks into compact JSON.

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use unsheet::render::JsonFormat;
use unsheet::{DecodeOptions, DrawingObject, Workbook};

/// Excel workbook structure extraction to JSON
#[derive(Parser)]
#[command(
    name = "unsheet",
    author = "iyulab",
    version,
    about = "Decode the structure of Excel workbooks",
    long_about = "unsheet - Structural decoder for Excel (.xlsx) workbooks.\n\n\
                  Extracts cells, formulas, styles, validations, conditional formats,\n\
                  charts and pivot tables into compact JSON."
)]
struct Cli {
    /// Log decoding progress (sets the log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a workbook to JSON
    Json {
        /// Input file path
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,

        /// Keep empty cells and sheets
        #[arg(long)]
        no_prune: bool,

        /// Decode sheets one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Show a summary of the workbook structure
    Info {
        /// Input file path
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Send library log records to stderr, filtered by `RUST_LOG`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Json {
            input,
            output,
            compact,
            no_prune,
            sequential,
        } => {
            let pb = create_spinner("Decoding workbook...");

            let options = DecodeOptions::new()
                .with_prune(!no_prune)
                .with_parallel(!sequential);
            let workbook = unsheet::parse_file_with_options(&input, options)?;
            pb.set_message("Rendering to JSON...");

            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            let json = unsheet::render::to_json(&workbook, format)?;

            pb.finish_and_clear();
            write_output(output.as_ref(), &json)?;

            if let Some(path) = output {
                println!(
                    "{} Converted to JSON: {}",
                    "✓".green().bold(),
                    path.display()
                );
            }
        }

        Commands::Info { input } => {
            let pb = create_spinner("Analyzing workbook...");
            let workbook = unsheet::parse_file(&input)?;
            pb.finish_and_clear();

            print_info(&input, &workbook);
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

/// Counts of drawing objects on one sheet.
#[derive(Debug, Default, PartialEq, Eq)]
struct ObjectCounts {
    shapes: usize,
    charts: usize,
    pivots: usize,
    degraded: usize,
}

fn count_objects(objects: &[DrawingObject]) -> ObjectCounts {
    let mut counts = ObjectCounts::default();
    for object in objects {
        match object {
            DrawingObject::Shape { .. } | DrawingObject::Connector { .. } => counts.shapes += 1,
            DrawingObject::Chart { details, .. } => {
                counts.charts += 1;
                counts.degraded += usize::from(details.is_degraded());
            }
            DrawingObject::PivotTable { details, .. } => {
                counts.pivots += 1;
                counts.degraded += usize::from(details.is_degraded());
            }
            DrawingObject::DrawingRef { .. } => counts.degraded += 1,
            DrawingObject::LegacyDrawingRef { .. } => {}
        }
    }
    counts
}

fn print_info(input: &std::path::Path, workbook: &Workbook) {
    println!("{}", "Workbook Information".cyan().bold());
    println!("{}", "─".repeat(40));
    println!(
        "{}: {}",
        "File".bold(),
        input.file_name().unwrap_or_default().to_string_lossy()
    );
    println!("{}: {}", "Sheets".bold(), workbook.sheets.len());
    println!("{}: {}", "Cells".bold(), workbook.cell_count());
    println!("{}: {}", "Defined names".bold(), workbook.defined_names.len());

    for (name, sheet) in &workbook.sheets {
        let meta = &sheet.metadata;
        let counts = count_objects(&meta.drawings);

        println!("\n{}", name.cyan().bold());
        println!("{}", "─".repeat(40));
        println!("{}: {}", "Cells".bold(), sheet.cells.len());
        println!(
            "{}: {}",
            "Formulas".bold(),
            sheet.cells.values().filter(|c| c.formula.is_some()).count()
        );
        println!("{}: {}", "Merged ranges".bold(), meta.merge_cells.len());
        println!("{}: {}", "Validations".bold(), meta.validations.len());
        println!(
            "{}: {}",
            "Conditional formats".bold(),
            meta.conditional_formats.len()
        );
        println!("{}: {}", "Sparkline groups".bold(), meta.sparkline_groups.len());
        println!("{}: {}", "Shapes".bold(), counts.shapes);
        println!("{}: {}", "Charts".bold(), counts.charts);
        println!("{}: {}", "Pivot tables".bold(), counts.pivots);

        if counts.degraded > 0 {
            println!(
                "{} {} object(s) could not be fully decoded",
                "!".yellow().bold(),
                counts.degraded
            );
        }
        if let Some(ref error) = sheet.error {
            println!("{} {}", "!".yellow().bold(), error);
        }
    }
}

fn print_version() {
    println!("{} {}", "unsheet".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Structural decoder for Excel workbooks");
    println!();
    println!("Supported formats: XLSX, XLSM");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log::debug!("wrote {} bytes to {}", content.len(), p.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", content)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use unsheet::Decoded;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_json_flags() {
        let cli = Cli::try_parse_from([
            "unsheet",
            "-v",
            "json",
            "book.xlsx",
            "--compact",
            "--no-prune",
            "--sequential",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Json {
                input,
                output,
                compact,
                no_prune,
                sequential,
            } => {
                assert_eq!(input, PathBuf::from("book.xlsx"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert!(compact && no_prune && sequential);
            }
            _ => panic!("expected json command"),
        }
    }

    #[test]
    fn test_count_objects() {
        let objects = vec![
            DrawingObject::Shape {
                name: "TextBox 1".to_string(),
            },
            DrawingObject::Chart {
                relationship_id: "rId1".to_string(),
                details: Decoded::Failed {
                    error: "bad".to_string(),
                },
            },
            DrawingObject::DrawingRef {
                relationship_id: "rId3".to_string(),
                path: None,
                error: None,
            },
            DrawingObject::LegacyDrawingRef {
                relationship_id: "rId4".to_string(),
            },
        ];
        assert_eq!(
            count_objects(&objects),
            ObjectCounts {
                shapes: 1,
                charts: 1,
                pivots: 0,
                degraded: 2,
            }
        );
    }
}
