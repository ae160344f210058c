//! catpload CLI - Convert product catalog spreadsheets to CATP JSON and back
//!
//! # Commands
//!
//! ```bash
//! catpload convert catalogo.xlsx              # Spreadsheet → JSON (create payloads)
//! catpload convert catalogo.xlsx -m update    # PUT payloads with leading codigo
//! catpload check catalogo.xlsx                # Validate only, no output
//! catpload to-sheet export.json -o edit.xlsx  # JSON → editable spreadsheet
//! catpload validate payload.json              # Check a JSON file against the schemas
//! catpload attributes                         # Known attribute codes
//! ```
//!
//! Defaults can come from the environment (or a `.env` file):
//! `CATP_DEFAULT_CNPJ`, `CATP_DEFAULT_MODALIDADE`, `CATP_DEFAULT_ORIGIN_COUNTRY`,
//! `CATP_ATTRIBUTE_TABLE`.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use catpload::{
    attribute_label, check_file, convert_file, json_to_sheet, validate_json_file, AttributeTable,
    ConversionError, ConvertOptions, Field, FieldDefaults, OutputMode, ATTRIBUTE_LABELS,
};

#[derive(Parser)]
#[command(name = "catpload")]
#[command(about = "Convert product catalog spreadsheets to Siscomex CATP JSON and back", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a spreadsheet (XLSX or CSV) to CATP JSON
    Convert {
        /// Input spreadsheet
        input: PathBuf,

        /// Output file (default: <input>_<MODE>_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Payload shape: create, update or full-export
        #[arg(short, long, default_value = "create")]
        mode: OutputMode,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,

        /// Skip the output schema check
        #[arg(long)]
        no_validate: bool,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Validate a spreadsheet without writing JSON
    Check {
        /// Input spreadsheet
        input: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Flatten a CATP JSON file into an editable spreadsheet
    ToSheet {
        /// Input JSON file (one product or an array)
        input: PathBuf,

        /// Output file, .xlsx or .csv (default: <input>_CATALOGO_EDITAVEL.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a JSON file against the CATP payload schemas
    Validate {
        /// Input JSON file
        input: PathBuf,

        /// Force a shape instead of detecting it per item
        #[arg(short, long)]
        mode: Option<OutputMode>,
    },

    /// List known attribute codes, or the rules for one NCM
    Attributes {
        /// NCM to look up in the attribute table
        #[arg(long)]
        ncm: Option<String>,

        /// Official per-NCM attribute table (JSON)
        #[arg(long, env = "CATP_ATTRIBUTE_TABLE")]
        attribute_table: Option<PathBuf>,
    },
}

/// Options shared by `convert` and `check`
#[derive(Args)]
struct SheetArgs {
    /// CNPJ root used when the sheet has no cpfCnpjRaiz column
    #[arg(long, env = "CATP_DEFAULT_CNPJ")]
    cnpj: Option<String>,

    /// IMPORTACAO or EXPORTACAO, used when the sheet has no modalidade column
    #[arg(long, env = "CATP_DEFAULT_MODALIDADE")]
    modalidade: Option<String>,

    /// Other defaults, as field=value (e.g. situacao=Ativado)
    #[arg(long = "default", value_parser = parse_default)]
    defaults: Vec<(Field, String)>,

    /// Country of origin (ATT_14545) added to products that lack it
    #[arg(long, env = "CATP_DEFAULT_ORIGIN_COUNTRY")]
    origin_country: Option<String>,

    /// Official per-NCM attribute table (JSON) used to filter attributes
    #[arg(long, env = "CATP_ATTRIBUTE_TABLE")]
    attribute_table: Option<PathBuf>,

    /// Truncate over-long denominacao/descricao instead of rejecting the row
    #[arg(long)]
    truncate: bool,
}

impl SheetArgs {
    fn to_options(&self) -> ConvertOptions {
        let mut defaults = FieldDefaults::new();
        for (field, value) in &self.defaults {
            defaults.set(*field, value.as_str());
        }
        if let Some(cnpj) = &self.cnpj {
            defaults.set(Field::OwnerTaxId, cnpj.as_str());
        }
        if let Some(modalidade) = &self.modalidade {
            defaults.set(Field::OperationMode, modalidade.as_str());
        }

        ConvertOptions {
            defaults,
            truncate_long_text: self.truncate,
            attribute_table: self.attribute_table.clone(),
            default_origin_country: self
                .origin_country
                .clone()
                .filter(|c| !c.trim().is_empty()),
            ..ConvertOptions::default()
        }
    }
}

fn parse_default(raw: &str) -> Result<(Field, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
    let field =
        Field::from_wire_name(name.trim()).ok_or_else(|| format!("unknown field '{}'", name.trim()))?;
    Ok((field, value.trim().to_string()))
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            mode,
            compact,
            no_validate,
            sheet,
        } => {
            let options = ConvertOptions {
                output,
                mode,
                pretty: !compact,
                skip_validation: no_validate,
                ..sheet.to_options()
            };
            cmd_convert(&input, &options)
        }

        Commands::Check { input, sheet } => cmd_check(&input, &sheet.to_options()),

        Commands::ToSheet { input, output } => cmd_to_sheet(&input, output),

        Commands::Validate { input, mode } => cmd_validate(&input, mode),

        Commands::Attributes {
            ncm,
            attribute_table,
        } => cmd_attributes(ncm.as_deref(), attribute_table.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("catpload={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn cmd_convert(input: &Path, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Converting: {} (mode {})", input.display(), options.mode);

    match convert_file(input, options) {
        Ok(summary) => {
            eprintln!("\n✅ JSON generated");
            eprintln!("   File: {}", summary.output_path.display());
            eprintln!("   Products: {}", summary.record_count);
            eprintln!("   Size: {:.1} KB", summary.size_bytes as f64 / 1024.0);
            if !summary.warnings.is_empty() {
                eprintln!("   Warnings: {}", summary.warnings.len());
            }
            Ok(())
        }
        Err(ConversionError::Rejected(diagnostics)) => {
            eprintln!("\n❌ {} error(s), nothing was written:", diagnostics.errors.len());
            for issue in &diagnostics.errors {
                eprintln!("   - {}", issue);
            }
            if !diagnostics.warnings.is_empty() {
                eprintln!("\n⚠️  {} warning(s):", diagnostics.warnings.len());
                for issue in &diagnostics.warnings {
                    eprintln!("   - {}", issue);
                }
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_check(input: &Path, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", input.display());

    let report = check_file(input, options)?;

    for issue in &report.errors {
        eprintln!("   ❌ {}", issue);
    }
    for issue in &report.warnings {
        eprintln!("   ⚠️  {}", issue);
    }

    eprintln!(
        "\n📊 Results: {} row(s) read, {} valid product(s), {} error(s), {} warning(s)",
        report.rows_read,
        report.record_count,
        report.errors.len(),
        report.warnings.len()
    );

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_to_sheet(input: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Flattening: {}", input.display());

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("catalogo");
        input.with_file_name(format!("{}_CATALOGO_EDITAVEL.xlsx", stem))
    });

    let count = json_to_sheet(input, &output)?;
    eprintln!("✅ {} product(s) → {}", count, output.display());
    Ok(())
}

fn cmd_validate(input: &Path, mode: Option<OutputMode>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let issues = validate_json_file(input, mode)?;

    for item in issues.iter().take(5) {
        eprintln!("\n❌ Product {} invalid ({}):", item.index, item.mode);
        for err in item.errors.iter().take(3) {
            eprintln!("   - {}", err);
        }
    }

    if issues.is_empty() {
        eprintln!("\n📊 All products valid");
        Ok(())
    } else {
        eprintln!("\n📊 {} invalid product(s)", issues.len());
        std::process::exit(1);
    }
}

fn cmd_attributes(
    ncm: Option<&str>,
    attribute_table: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(ncm) = ncm else {
        eprintln!("📋 Known attributes ({}):\n", ATTRIBUTE_LABELS.len());
        for (code, label) in ATTRIBUTE_LABELS {
            println!("  {:<10} {}", code, label);
        }
        return Ok(());
    };

    let path = attribute_table
        .ok_or("--ncm needs an attribute table (--attribute-table or CATP_ATTRIBUTE_TABLE)")?;
    let table = AttributeTable::load(path)?;
    let key: String = ncm.chars().filter(|c| c.is_ascii_digit()).collect();

    let rules = table
        .rules(&key)
        .ok_or_else(|| format!("NCM {} not found in {}", ncm, path.display()))?;

    eprintln!("📋 Attributes for NCM {} ({}):\n", key, rules.len());
    for (code, rule) in rules {
        let mut flags = Vec::new();
        if rule.mandatory {
            flags.push("mandatory");
        }
        if rule.multi_valued {
            flags.push("multi");
        }
        println!(
            "  {:<10} {:<28} {}",
            code,
            attribute_label(code).unwrap_or("-"),
            flags.join(", ")
        );
    }
    Ok(())
}
