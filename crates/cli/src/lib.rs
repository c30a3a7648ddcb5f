use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use flags::{EmbedMode, PolicyFlag, SchemaArtifact};
use sopcheck_completion::HttpCompletionClient;
use sopcheck_indexer::{open_blob_store, FileParser, IndexStats, Normalizer, ReferenceIndexer};
use sopcheck_vector_store::Embedder;
use sopcheck_verifier::{
    render_summary, write_gap_report, Adjudicator, VerificationEngine, DEFAULT_SUMMARY_LIMIT,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod flags;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "sopcheck")]
#[command(about = "Reverse-check SOPs against regulatory reference requirements", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// API key for the completion and embedding services
    #[arg(long, global = true, env = "SOPCHECK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the embedding backend
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the reference index from regulatory documents
    Ingest(IngestArgs),

    /// Verify an SOP against the reference index and write a gap report
    Verify(VerifyArgs),

    /// Print the JSON Schema of a persisted artifact
    Schema {
        #[arg(value_enum)]
        artifact: SchemaArtifact,
    },
}

#[derive(Args)]
struct StorageArgs {
    /// Bucket holding the index ("local" for the filesystem)
    #[arg(long)]
    bucket: Option<String>,

    /// Object-store region
    #[arg(long)]
    region: Option<String>,

    /// Key of the reference index blob
    #[arg(long)]
    index_key: Option<String>,
}

#[derive(Args)]
struct IngestArgs {
    /// Reference documents (PDF, DOCX, text or markdown)
    #[arg(long, num_args = 1.., required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args)]
struct VerifyArgs {
    /// SOP document to audit
    #[arg(long)]
    sop: PathBuf,

    #[command(flatten)]
    storage: StorageArgs,

    /// Where to write the gap report
    #[arg(long, default_value = "gap_report.json")]
    output: PathBuf,

    /// Decision policy for strong matches
    #[arg(long, value_enum)]
    policy: Option<PolicyFlag>,

    /// Best scores below this are MISSING without adjudication
    #[arg(long)]
    low_threshold: Option<f32>,

    /// Auto-pass threshold (auto-pass policy only)
    #[arg(long)]
    high_threshold: Option<f32>,

    /// Gaps listed in the printed summary
    #[arg(long, default_value_t = DEFAULT_SUMMARY_LIMIT)]
    summary_limit: usize,
}

impl StorageArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bucket) = &self.bucket {
            config.storage.bucket_name = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.storage.region = region.clone();
        }
        if let Some(key) = &self.index_key {
            config.storage.index_key = key.clone();
        }
    }
}

impl VerifyArgs {
    fn apply(&self, config: &mut AppConfig) {
        self.storage.apply(config);
        if let Some(policy) = self.policy {
            config.verifier.policy = policy.as_domain();
        }
        if let Some(low) = self.low_threshold {
            config.verifier.low_threshold = low;
        }
        if let Some(high) = self.high_threshold {
            config.verifier.high_threshold = high;
        }
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper are chatty at debug
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Schema { artifact } = &cli.command {
        let schema = serde_json::to_string_pretty(&artifact.schema())?;
        return print_stdout(&schema);
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_api_key(cli.api_key.as_deref());
    if let Some(mode) = cli.embed_mode {
        config.embedding.backend = mode.as_domain();
    }

    match cli.command {
        Commands::Ingest(args) => {
            args.storage.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            run_ingest(&config, &args.files).await
        }
        Commands::Verify(args) => {
            args.apply(&mut config);
            config.validate().context("Invalid configuration")?;
            run_verify(&config, &args).await
        }
        Commands::Schema { .. } => Ok(()),
    }
}

fn completion_client(config: &AppConfig) -> Result<Arc<HttpCompletionClient>> {
    let client = HttpCompletionClient::new(config.completion.clone())
        .context("Failed to configure completion service")?;
    log::debug!("Completion model: {}", client.model());
    Ok(Arc::new(client))
}

async fn run_ingest(config: &AppConfig, files: &[PathBuf]) -> Result<()> {
    let store = open_blob_store(&config.storage).context("Failed to open storage")?;
    let embedder =
        Embedder::from_config(&config.embedding).context("Failed to configure embedder")?;
    let normalizer = Normalizer::new(
        completion_client(config)?,
        config.retry.clone(),
        config.normalizer.clone(),
    );
    let indexer = ReferenceIndexer::new(Arc::new(FileParser::new()), normalizer, embedder);

    let stats = indexer
        .build_and_persist(files, store.as_ref(), &config.storage.index_key)
        .await
        .context("Ingestion failed")?;
    print_stdout(&render_ingest_stats(&stats, &store.describe(&config.storage.index_key)))
}

fn render_ingest_stats(stats: &IndexStats, location: &str) -> String {
    let mut out = format!(
        "Indexed {} requirements from {} file(s) ({} passages) in {} ms\nSaved to {location}",
        stats.requirements, stats.files, stats.passages, stats.time_ms
    );
    if stats.decomposition_failures > 0 {
        out.push_str(&format!(
            "\nWarning: {} passage(s) could not be decomposed; verification will refuse this index until they are fixed",
            stats.decomposition_failures
        ));
    }
    if stats.embedding_failures > 0 {
        out.push_str(&format!(
            "\nWarning: {} requirement(s) have no embedding and cannot be matched",
            stats.embedding_failures
        ));
    }
    for error in &stats.errors {
        out.push_str(&format!("\nSkipped {error}"));
    }
    out
}

async fn run_verify(config: &AppConfig, args: &VerifyArgs) -> Result<()> {
    let store = open_blob_store(&config.storage).context("Failed to open storage")?;
    let embedder =
        Embedder::from_config(&config.embedding).context("Failed to configure embedder")?;
    let adjudicator = Adjudicator::new(completion_client(config)?, config.retry.clone());
    let engine = VerificationEngine::new(
        config.verifier.clone(),
        Arc::new(FileParser::new()),
        embedder,
        adjudicator,
    )?;

    let engine = engine
        .load_index(store.as_ref(), &config.storage.index_key)
        .await
        .context("Cannot start verification")?;
    let engine = engine
        .ingest_target(&args.sop)
        .await
        .with_context(|| format!("Failed to ingest SOP {}", args.sop.display()))?;
    let done = engine.verify().await;

    let report = done.report();
    write_gap_report(&args.output, &report.gaps)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    print_stdout(&render_summary(report, args.summary_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verify_flags_override_config() {
        let cli = Cli::try_parse_from([
            "sopcheck",
            "verify",
            "--sop",
            "sop.pdf",
            "--bucket",
            "audits",
            "--policy",
            "auto-pass",
            "--low-threshold",
            "0.5",
        ])
        .unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.storage.bucket_name, "audits");
        assert_eq!(
            config.verifier.policy,
            sopcheck_verifier::DecisionPolicy::AutoPass
        );
        assert_eq!(config.verifier.low_threshold, 0.5);
        assert_eq!(config.verifier.high_threshold, 0.90);
        assert_eq!(args.output, PathBuf::from("gap_report.json"));
    }

    #[test]
    fn ingest_requires_files() {
        assert!(Cli::try_parse_from(["sopcheck", "ingest", "--bucket", "local"]).is_err());
    }

    #[test]
    fn ingest_stats_mention_skipped_files() {
        let stats = IndexStats {
            files: 1,
            failed_files: 1,
            requirements: 3,
            decomposition_failures: 1,
            errors: vec!["gone.pdf: File not found: gone.pdf".to_string()],
            ..IndexStats::default()
        };
        let text = render_ingest_stats(&stats, "./reference_index.json");
        assert!(text.starts_with("Indexed 3 requirements from 1 file(s)"));
        assert!(text.contains("could not be decomposed"));
        assert!(text.contains("Skipped gone.pdf"));
    }
}
