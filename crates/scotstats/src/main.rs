use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets, Table};
use scotstats_core::report::render_text;
use scotstats_core::{Pipeline, PipelineConfig, YearRange};
use scotstats_parser::{reader_for, SheetSelector, SourceDescriptor, TextEncoding};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scottish economic and demographic time-series analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the analysis, print the report and write the chart
    Run(RunArgs),
    /// Print the sheets and first rows of a source file
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML configuration; built-in sources are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory the source paths are resolved against
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// First year of the analysis window
    #[arg(long)]
    start: Option<i32>,
    /// Last year of the analysis window (inclusive)
    #[arg(long)]
    end: Option<i32>,
    /// Output image; `.svg` selects vector output
    #[arg(long)]
    chart: Option<PathBuf>,
    /// Add the historical and current CPI workbooks
    #[arg(long)]
    with_cpi: bool,
    /// Skip writing the chart
    #[arg(long)]
    no_chart: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    file: PathBuf,
    /// Metadata rows above the header
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,
    /// Sheet name, `all`, or `#N` for a zero-based index
    #[arg(long)]
    sheet: Option<String>,
    /// Rows to print per table
    #[arg(long, default_value_t = 10)]
    rows: usize,
    /// Decode delimited text as Latin-1
    #[arg(long)]
    latin1: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.start.is_some() || args.end.is_some() {
        config.year_range = YearRange::new(
            args.start.unwrap_or(config.year_range.start),
            args.end.unwrap_or(config.year_range.end),
        );
    }
    if let Some(chart) = &args.chart {
        config.chart_path = chart.clone();
    }
    if args.with_cpi {
        config = config.with_cpi();
    }
    Ok(config)
}

fn handle_run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;

    println!("Creating Economic and Demographic Analysis for Scotland");
    let output = pipeline.run().context("analysis pipeline failed")?;
    print!("{}", render_text(&output.report));

    if args.no_chart {
        info!("Skipping chart at user request");
        println!("\nAnalysis complete.");
    } else {
        let path = pipeline
            .render_chart(&output)
            .context("failed to render chart")?;
        println!("\nAnalysis complete. Chart saved as '{}'", path.display());
    }

    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let mut descriptor = SourceDescriptor::from_path(&args.file)
        .with_context(|| format!("cannot inspect {}", args.file.display()))?
        .with_skip_rows(args.skip_rows)
        .with_sheet(
            args.sheet
                .as_deref()
                .map(SheetSelector::parse)
                .unwrap_or(SheetSelector::All),
        );
    if args.latin1 {
        descriptor = descriptor.with_encoding(TextEncoding::Latin1);
    }

    let reader = reader_for(descriptor.format);
    println!("Reader: {}", reader.name());

    let sheets = reader
        .sheet_names(&descriptor)
        .with_context(|| format!("failed to list sheets of {}", args.file.display()))?;
    if !sheets.is_empty() {
        println!("Available sheets: {sheets:?}");
    }

    let tables = reader
        .read(&descriptor)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    for table in tables {
        println!("\n--- {} ({} rows) ---", table.label(), table.height());

        let mut grid = Table::new();
        grid.load_preset(presets::ASCII_MARKDOWN);
        grid.set_header(table.header());
        for row in 0..table.height().min(args.rows) {
            let cells: Vec<String> = (0..table.width())
                .map(|col| table.cell(row, col).unwrap_or("").to_string())
                .collect();
            grid.add_row(cells);
        }
        println!("{grid}");
    }

    Ok(())
}
