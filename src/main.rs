use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use sachstand::app::pipeline_use_case::PipelineUseCase;
use sachstand::app::ports::DocumentOutputPort;
use sachstand::config::Config;
use sachstand::infra::document_output_adapter::{FileDocumentOutputAdapter, StdoutDocumentOutputAdapter};
use sachstand::infra::http_url_verifier::ReqwestUrlVerifier;
use sachstand::infra::schema_validator::{check_document_file, JsonSchemaEntityValidator};
use sachstand::logging;
use sachstand::pipeline::{AgentOutput, CompletionSignal, EntityValidator};

#[derive(Parser)]
#[command(name = "sachstand")]
#[command(about = "Turn research-agent output into a validated, deduplicated Sachstand")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SACHSTAND_CONFIG or config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, validate, deduplicate and assemble one agent output
    Process {
        /// Agent output file, or - for stdin
        #[arg(long)]
        input: String,
        /// Research topic, used as the document name
        #[arg(long)]
        topic: String,
        /// How the research run ended: finished, budget_exhausted or aborted
        #[arg(long, default_value = "finished")]
        signal: CompletionSignal,
        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Run live HEAD checks on source URLs
        #[arg(long)]
        verify_urls: bool,
        /// Skip the advisory per-entity schema check
        #[arg(long)]
        no_schema_check: bool,
    },
    /// Check a Sachstand file against the document JSON Schema
    ValidateDocument {
        path: PathBuf,
        /// Schema file (defaults to the bundled sachstand.v1.json)
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read agent output from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _log_guard = logging::init_logging(&config.logging.dir);
    sachstand::metrics::init_metrics();

    match cli.command {
        Commands::Process {
            input,
            topic,
            signal,
            output,
            verify_urls,
            no_schema_check,
        } => {
            let text = read_input(&input)?;

            let mut use_case = PipelineUseCase::new(EntityValidator::new(config.validator.clone()));
            if verify_urls || config.url_check.enabled {
                let verifier = ReqwestUrlVerifier::new(&config.url_check)?;
                use_case = use_case.with_url_verifier(Arc::new(verifier));
            }
            if config.schema_check.enabled && !no_schema_check {
                let validator = match &config.schema_check.schema_path {
                    Some(path) => JsonSchemaEntityValidator::from_path(path)?,
                    None => JsonSchemaEntityValidator::bundled()?,
                };
                use_case = use_case.with_schema_validator(
                    Arc::new(validator),
                    Duration::from_secs(config.schema_check.timeout_secs),
                );
            }
            let output_port: Arc<dyn DocumentOutputPort> = match output {
                Some(path) => Arc::new(FileDocumentOutputAdapter::new(path)),
                None => Arc::new(StdoutDocumentOutputAdapter),
            };
            use_case = use_case.with_output(output_port);

            let result = use_case.run(AgentOutput::Text(&text), &topic, signal).await;

            if let Some(warning) = &result.warning {
                warn!(reason = warning.reason.as_str(), "Agent output yielded no entities");
            }
            info!(
                status = %result.document.completion_status,
                entities = result.document.has_part.len(),
                digest = %result.document.digest()?,
                "Sachstand ready"
            );
            Ok(())
        }
        Commands::ValidateDocument { path, schema } => {
            let violations = check_document_file(&path, schema.as_deref())
                .with_context(|| format!("Failed to check {}", path.display()))?;
            if violations.is_empty() {
                println!("valid");
                return Ok(());
            }
            eprintln!("invalid:");
            for violation in &violations {
                eprintln!("- {}", violation);
            }
            // Return instead of exiting so the log guard flushes
            bail!("{} schema violation(s) in {}", violations.len(), path.display())
        }
    }
}
