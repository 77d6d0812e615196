use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use futures::stream::{self, StreamExt};
use pitchcast::commentary::{
    fallback, prompts, CommentaryLine, CommentaryRequest, CommentaryService, CommentarySource,
    CommentaryStyle, ReconcilePolicy,
};
use pitchcast::config::{Config, Overrides};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "pitchcast",
    about = "Generate football match commentary from event data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call the model and print one commentary report per request file
    Generate(GenerateArgs),
    /// Print the prompts a request would send, without calling the model
    Prompt(PromptArgs),
    /// Print the fallback commentary for a request
    Fallback(FallbackArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Request files: {"style", "matchInfo", "rawData"}
    #[arg(required = true)]
    requests: Vec<PathBuf>,
    /// Commentary style (CASTER, ANALYST, FRIEND); overrides the file
    #[arg(long)]
    style: Option<CommentaryStyle>,
    /// API key (defaults to RUNPOD_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
    /// Chat-completions URL (defaults to RUNPOD_ENDPOINT_URL)
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Requests in flight at once
    #[arg(long, default_value_t = 2)]
    concurrency: usize,
    /// Return the model batch as decoded, without aligning it to the input
    #[arg(long)]
    no_reconcile: bool,
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct PromptArgs {
    request: PathBuf,
    #[arg(long)]
    style: Option<CommentaryStyle>,
}

#[derive(Args, Debug)]
struct FallbackArgs {
    request: PathBuf,
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    request_id: Uuid,
    file: String,
    style: CommentaryStyle,
    generated_at: String,
    source: CommentarySource,
    lines: Vec<CommentaryLine>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Prompt(args) => run_prompt(args).await,
        Commands::Fallback(args) => run_fallback(args).await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pitchcast=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_request(path: &Path) -> Result<CommentaryRequest> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    CommentaryRequest::from_json(&text)
        .with_context(|| format!("invalid request file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let overrides = Overrides {
        api_key: args.api_key,
        endpoint_url: args.endpoint,
        model: args.model,
        timeout_secs: args.timeout,
        reconcile: args.no_reconcile.then_some(ReconcilePolicy::Trust),
    };
    let config = Config::load().resolve(overrides)?;
    info!(endpoint = %config.endpoint_url, model = %config.model, "configuration resolved");

    let service = CommentaryService::new(&config)?;
    let timeout = service.default_timeout();
    let style = args.style;
    let total = args.requests.len();

    let mut results = std::pin::pin!(stream::iter(args.requests.iter())
        .map(|path| {
            let service = service.clone();
            async move { (path, generate_file(&service, path, style, timeout).await) }
        })
        .buffer_unordered(args.concurrency.max(1)));

    let mut failures = 0usize;
    while let Some((path, result)) = results.next().await {
        match result {
            Ok(report) => print_json(&report, args.pretty)?,
            Err(err) => {
                failures += 1;
                error!(file = %path.display(), error = %format!("{:#}", err), "generation failed");
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} requests failed", failures, total);
    }
    Ok(())
}

async fn generate_file(
    service: &CommentaryService,
    path: &Path,
    style: Option<CommentaryStyle>,
    timeout: Duration,
) -> Result<Report> {
    let request = read_request(path).await?;
    let style = request.style(style)?;
    let generated = service
        .generate(style, &request.match_info, &request.raw_data, timeout)
        .await
        .with_context(|| format!("commentary for {} failed", path.display()))?;

    Ok(Report {
        request_id: generated.request_id,
        file: path.display().to_string(),
        style,
        generated_at: Utc::now().to_rfc3339(),
        source: generated.source,
        lines: generated.lines,
    })
}

async fn run_prompt(args: PromptArgs) -> Result<()> {
    let request = read_request(&args.request).await?;
    let style = request.style(args.style)?;
    let prompt = prompts::assemble(style, &request.match_info, &request.raw_data);
    println!("## System\n\n{}\n\n## User\n\n{}", prompt.system, prompt.user);
    Ok(())
}

async fn run_fallback(args: FallbackArgs) -> Result<()> {
    let request = read_request(&args.request).await?;
    print_json(&fallback::synthesize(&request.raw_data), args.pretty)
}
