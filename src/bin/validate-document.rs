use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use sachstand::infra::schema_validator::check_document_file;

/// Validate a Sachstand JSON file against the Sachstand v1 schema.
#[derive(Parser, Debug)]
#[command(name = "validate-document", version, about = "Validate Sachstand JSON against schema")]
struct Cli {
    /// Path to the Sachstand JSON file to validate
    path: PathBuf,

    /// Optional path to a schema file (defaults to the bundled sachstand.v1.json)
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let violations = check_document_file(&args.path, args.schema.as_deref())
        .with_context(|| format!("Failed to check {}", args.path.display()))?;
    if violations.is_empty() {
        println!("valid");
        return Ok(());
    }

    eprintln!("invalid:");
    for violation in &violations {
        eprintln!("- {}", violation);
    }
    bail!("{} schema violation(s) in {}", violations.len(), args.path.display())
}
