//! Cuesheet CLI - Import, check and export broadcast cue sheets
//!
//! # Commands
//!
//! ```bash
//! cuesheet serve                      # Start HTTP server (port from CUESHEET_PORT or 3000)
//! cuesheet parse playlist.xlsx        # Parse a CSV/XLSX file to JSON
//! cuesheet map playlist.csv           # Show the automatic column mapping
//! cuesheet validate playlist.csv      # Import and validate, exit 1 on errors
//! cuesheet export playlist.csv        # Import and write the export CSV
//! ```

use clap::{Parser, Subcommand};
use cuesheet::{
    check_import_mapping_complete, check_mapping_complete, export_csv, import::read_file,
    validate_all_rows, Config, ExportError, Field, ImportSession, RowStore,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cuesheet")]
#[command(about = "Import, validate and export broadcast cue sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV or XLSX file and output JSON
    Parse {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how the file's columns map to cue sheet fields
    Map {
        /// Input file (.csv or .xlsx)
        input: PathBuf,
    },

    /// Import a file and validate every row
    Validate {
        /// Input file (.csv or .xlsx)
        input: PathBuf,
    },

    /// Import a file and write it in the export format
    Export {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Session name used for the output file name
        #[arg(short, long)]
        name: Option<String>,

        /// Directory for the exported file
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides CUESHEET_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()).await,
        Commands::Map { input } => cmd_map(&input).await,
        Commands::Validate { input } => cmd_validate(&input).await,
        Commands::Export {
            input,
            name,
            output_dir,
        } => cmd_export(&input, name.as_deref(), &output_dir).await,
        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let table = read_file(input).await?;

    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", table.rows.len());

    let json = serde_json::to_string_pretty(&table)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_map(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ImportSession::new();
    let staged = session.load_file(input).await?;

    println!("\n🗺️  Column mapping:");
    for field in Field::ALL {
        match staged.mapping.get(field) {
            Some(header) => println!("   {:<10} ← {}", field.label(), header),
            None => println!("   {:<10} ✗ not mapped", field.label()),
        }
    }

    let export_ready = check_mapping_complete(&staged.mapping);
    let import_ready = check_import_mapping_complete(&staged.mapping);
    println!();
    println!("   Import ready: {}", if import_ready.complete { "yes" } else { "no" });
    println!("   Export ready: {}", if export_ready.complete { "yes" } else { "no" });
    if !export_ready.complete {
        let missing: Vec<&str> = export_ready.missing.iter().map(|f| f.key()).collect();
        println!("   Missing for export: {}", missing.join(", "));
    }

    Ok(())
}

/// Import a file into a fresh store with the automatic mapping.
async fn import_into_store(input: &Path) -> Result<RowStore, Box<dyn std::error::Error>> {
    let mut session = ImportSession::new();
    let mut store = RowStore::new();
    session.load_file(input).await?;
    session.commit(&mut store)?;
    Ok(store)
}

async fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = import_into_store(input).await?;
    let report = validate_all_rows(store.rows());

    if report.valid {
        eprintln!("\n✅ All {} rows valid", store.row_count());
        return Ok(());
    }

    for error in report.errors.iter().take(20) {
        eprintln!("   Row {:>3} {:<10} {}", error.row_num, error.field.label(), error.message);
    }
    if report.errors.len() > 20 {
        eprintln!("   ... and {} more", report.errors.len() - 20);
    }
    eprintln!(
        "\n📊 Results: {} errors in {} of {} rows",
        report.errors.len(),
        report.invalid_rows(),
        store.row_count()
    );

    std::process::exit(1);
}

async fn cmd_export(
    input: &Path,
    name: Option<&str>,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = import_into_store(input).await?;

    let session_name = match name {
        Some(name) => name.to_string(),
        None => input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    store.set_file_name(&session_name);

    let file = match export_csv(&mut store) {
        Ok(file) => file,
        Err(ExportError::Invalid { report }) => {
            for error in report.errors.iter().take(10) {
                eprintln!("   Row {:>3} {:<10} {}", error.row_num, error.field.label(), error.message);
            }
            return Err(ExportError::Invalid { report }.into());
        }
        Err(e) => return Err(e.into()),
    };

    let path = output_dir.join(&file.filename);
    fs::write(&path, &file.content)?;
    eprintln!("💾 Exported {} rows to {}", file.row_count, path.display());

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    cuesheet::server::start_server(config).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
