//! Harmonizer CLI - BDCHM variable harmonization tools
//!
//! # Commands
//!
//! ```bash
//! harmonizer docs                          # Variable documentation page from the mapping sheet
//! harmonizer qaqc                          # Pre-harmonized QA/QC report
//! harmonizer transform height.yaml         # Priority variables -> class derivations
//! harmonizer transform in/ out/ --batch    # ... for a whole directory
//! harmonizer conditions a.yaml -o out.yaml --lookup visits.csv
//! harmonizer validate                      # Check ingest YAML files parse
//! ```

use clap::{Parser, Subcommand};
use harmonizer::error::{CommandResult, TransformError};
use harmonizer::phv::COHORT_FILES;
use harmonizer::validate::DEFAULT_ROOT;
use harmonizer::{
    build_report, default_sources, discover_ingest_files, init_logging, load_observations,
    looks_like_priority_file, render_variable_documentation, transform_directory,
    transform_priority_file, validate_files, variable_documentation_projection, write_document,
    write_report_csv, ConditionTransformer, DeriveOptions, IngestFilter, LinkTemplates, Settings,
    SheetSource, ValidPhvs, VisitLookup,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "harmonizer")]
#[command(about = "Data-wrangling tools for BDCHM variable harmonization", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the variable documentation page from the mapping spreadsheet
    Docs {
        /// Output Markdown file
        #[arg(short, long, default_value = "VARIABLE_DOCUMENTATION.md")]
        output: PathBuf,

        /// Spreadsheet name
        #[arg(long, default_value = "BDCHM Variable Mapping")]
        spreadsheet: String,

        /// Worksheet name
        #[arg(long, default_value = "BDCHM Harmonized Variables V1")]
        worksheet: String,
    },

    /// Build the pre-harmonized QA/QC report
    Qaqc {
        /// Directory holding the per-cohort valid PHV lists
        #[arg(long, default_value = "valid-phvs")]
        valid_phvs: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "preharmonized_qaqc_report.csv")]
        output: PathBuf,
    },

    /// Transform priority-variable files into class derivations
    Transform {
        /// Input file (or directory with --batch)
        input: PathBuf,

        /// Output file (default: stdout), or directory with --batch
        output: Option<PathBuf>,

        /// Transform every YAML file in the input directory
        #[arg(short, long)]
        batch: bool,

        /// Report skipped and transformed files
        #[arg(long)]
        verbose: bool,

        /// Source cohort written as populated_from
        #[arg(long, default_value = harmonizer::derive::DEFAULT_COHORT)]
        cohort: String,
    },

    /// Transform Condition variables using a visit lookup table
    Conditions {
        /// Input YAML files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file, or output directory for several inputs
        #[arg(short, long)]
        output: PathBuf,

        /// CSV mapping pht to participant phv and visit
        #[arg(short, long)]
        lookup: PathBuf,

        /// Source cohort written as populated_from
        #[arg(long, default_value = harmonizer::derive::DEFAULT_COHORT)]
        cohort: String,
    },

    /// Check that every ingest YAML file parses
    Validate {
        /// Directory to search
        #[arg(long, default_value = DEFAULT_ROOT)]
        root: PathBuf,

        /// Path component marking ingest directories
        #[arg(long, default_value = "-ingest")]
        marker: String,

        /// File extension to validate
        #[arg(long, default_value = "yaml")]
        extension: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        Commands::Docs {
            output,
            spreadsheet,
            worksheet,
        } => cmd_docs(&output, &spreadsheet, &worksheet).await,

        Commands::Qaqc { valid_phvs, output } => cmd_qaqc(&valid_phvs, &output).await,

        Commands::Transform {
            input,
            output,
            batch,
            verbose,
            cohort,
        } => {
            let options = DeriveOptions { cohort };
            if batch {
                cmd_transform_batch(&input, output.as_deref(), verbose, &options)
            } else {
                cmd_transform(&input, output.as_deref(), &options)
            }
        }

        Commands::Conditions {
            inputs,
            output,
            lookup,
            cohort,
        } => cmd_conditions(&inputs, &output, &lookup, DeriveOptions { cohort }),

        Commands::Validate {
            root,
            marker,
            extension,
        } => cmd_validate(&root, IngestFilter { marker, extension }),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_docs(output: &Path, spreadsheet: &str, worksheet: &str) -> CommandResult<i32> {
    let settings = Settings::from_env();
    eprintln!("📄 Loading: {} / {}", spreadsheet, worksheet);

    let source = SheetSource::from_settings(&settings)?;
    let table = source.load(spreadsheet, worksheet).await?;
    eprintln!("   Rows: {}", table.len());

    let projected = variable_documentation_projection().apply(&table)?;
    eprintln!("   Documented variables: {}", projected.len());

    let doc = render_variable_documentation(&projected, &LinkTemplates::from_settings(&settings))?;
    if !doc.flagged.is_empty() {
        eprintln!("⚠️  {} identifiers are not CURIEs:", doc.flagged.len());
        for (label, value) in &doc.flagged {
            eprintln!("   - {}: {}", label, value);
        }
    }

    write_document(output, &doc)?;
    eprintln!("💾 Output written to: {}", output.display());
    Ok(0)
}

async fn cmd_qaqc(valid_dir: &Path, output: &Path) -> CommandResult<i32> {
    let settings = Settings::from_env();
    eprintln!("📋 Loading valid PHVs from: {}", valid_dir.display());
    let valid = ValidPhvs::load(valid_dir, &COHORT_FILES);

    let source = SheetSource::from_settings(&settings)?;
    let observations = load_observations(&source, &default_sources()).await?;
    eprintln!("   Observations: {}", observations.len());

    let report = build_report(&observations, &valid);
    write_report_csv(output, &report)?;
    eprintln!("💾 Report written to: {} ({} variables)", output.display(), report.variables.len());

    println!();
    for line in report.coverage.summary_lines() {
        println!("{}", line);
    }
    Ok(0)
}

fn cmd_transform(input: &Path, output: Option<&Path>, options: &DeriveOptions) -> CommandResult<i32> {
    if !input.exists() {
        return Err(TransformError::MissingInput(input.to_path_buf()).into());
    }
    let content = fs::read_to_string(input)?;
    if !looks_like_priority_file(&content) {
        eprintln!(
            "⚠️  {} has no priority_variable: entries; output may be empty",
            input.display()
        );
    }

    let transformed = transform_priority_file(&content, options)?;
    match output {
        Some(path) => {
            fs::write(path, &transformed)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => print!("{}", transformed),
    }
    Ok(0)
}

fn cmd_transform_batch(
    input_dir: &Path,
    output_dir: Option<&Path>,
    verbose: bool,
    options: &DeriveOptions,
) -> CommandResult<i32> {
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_dir.join("transformed"));

    let summary = transform_directory(input_dir, &output_dir, options)?;

    if verbose {
        eprintln!("📂 Found {} YAML files in {}", summary.found, input_dir.display());
        for path in &summary.skipped {
            eprintln!("   ⏭️  Skipped (no priority_variable:): {}", path.display());
        }
        for (input, output) in &summary.transformed {
            eprintln!("   ✅ {} -> {}", input.display(), output.display());
        }
    }
    for (path, e) in &summary.failed {
        eprintln!("   ❌ {}: {}", path.display(), e);
    }

    eprintln!(
        "✨ Transformed {} of {} files into {}",
        summary.transformed.len(),
        summary.found,
        output_dir.display()
    );
    Ok(if summary.has_failures() { 1 } else { 0 })
}

fn cmd_conditions(
    inputs: &[PathBuf],
    output: &Path,
    lookup: &Path,
    options: DeriveOptions,
) -> CommandResult<i32> {
    let lookup = VisitLookup::load(lookup)?;
    eprintln!("📋 Visit lookup: {} tables", lookup.len());
    let transformer = ConditionTransformer::new(lookup, options);

    if let [input] = inputs {
        if !output.is_dir() {
            let run = transformer.transform_file(input, output)?;
            eprintln!("✅ {} conditions -> {}", run.transformed, run.output.display());
            eprintln!("📊 Summary: {}", run.summary.display());
            return Ok(0);
        }
    }

    let mut failed = 0;
    for result in transformer.transform_batch(inputs, output)? {
        match result {
            Ok(run) => eprintln!(
                "✅ {}: {} conditions -> {}",
                run.input.display(),
                run.transformed,
                run.output.display()
            ),
            Err((path, e)) => {
                failed += 1;
                eprintln!("❌ {}: {}", path.display(), e);
            }
        }
    }
    Ok(if failed > 0 { 1 } else { 0 })
}

fn cmd_validate(root: &Path, filter: IngestFilter) -> CommandResult<i32> {
    let files = discover_ingest_files(root, &filter)?;
    if files.is_empty() {
        println!(
            "No {} files in directories with '{}' found under {}",
            filter.extension.to_uppercase(),
            filter.marker,
            root.display()
        );
        return Ok(2);
    }

    let summary = validate_files(&files);
    for line in summary.report_lines() {
        println!("{}", line);
    }
    Ok(summary.exit_code())
}
