//! CLI binary for plancoach.
//!
//! `plancoach serve` runs the HTTP service; `plancoach suggest` runs one
//! plan through the pipeline and prints the actions. Both map flags onto
//! `CoachConfig` and leave the work to the library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use plancoach::pipeline::input::{resolve_pdf_source, PDF_MIME};
use plancoach::{
    generate, generate_from_pdf, serve, CoachConfig, GenerationOutput, LabelSet, ServerConfig,
};
use std::io::{self, IsTerminal, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the web service on port 3000 (serves ./public as well)
  plancoach serve

  # Different port, stricter rate limit
  plancoach serve --port 8080 --rate-limit 5 --rate-burst 2

  # One-off suggestions for a typed plan
  plancoach suggest "Jeg vil lære at holde bedre præsentationer ..."

  # From a text file, a PDF, or a PDF URL
  plancoach suggest --file plan.txt
  plancoach suggest --pdf laeringsplan.pdf --json
  plancoach suggest --pdf https://example.com/plan.pdf

  # Read the plan from stdin
  cat plan.txt | plancoach suggest

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  OPENAI_MODEL            Model ID (default: gpt-4o-mini)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PORT                    Port for `serve`

  Variables are also read from a .env file in the working directory.
"#;

/// Turn a learning plan into concrete, rated actions using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "plancoach",
    version,
    about = "Turn a learning plan into concrete, rated actions using an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    llm: LlmArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PLANCOACH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PLANCOACH_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Generate suggestions for one plan and print them.
    Suggest(SuggestArgs),
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PLANCOACH_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "PLANCOACH_MAX_TOKENS", default_value_t = 1500)]
    max_tokens: usize,

    /// Retries on LLM failure (capped at 10).
    #[arg(long, global = true, env = "PLANCOACH_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "PLANCOACH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Vocabulary for impact/effort ratings.
    #[arg(long, global = true, env = "PLANCOACH_LABELS", value_enum, default_value = "english")]
    labels: LabelsArg,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, global = true, env = "PLANCOACH_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "PLANCOACH_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Directory with the browser front-end.
    #[arg(long, env = "PLANCOACH_STATIC_DIR", default_value = "public")]
    static_dir: PathBuf,

    /// Do not serve static files, only the API.
    #[arg(long)]
    no_static: bool,

    /// Sustained requests per minute per client on the API routes.
    #[arg(long, env = "PLANCOACH_RATE_LIMIT", default_value_t = 10)]
    rate_limit: u32,

    /// Back-to-back requests allowed before the rate limit applies.
    #[arg(long, env = "PLANCOACH_RATE_BURST", default_value_t = 5)]
    rate_burst: u32,

    /// LLM calls allowed in flight at once.
    #[arg(short, long, env = "PLANCOACH_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,
}

#[derive(Args, Debug)]
struct SuggestArgs {
    /// Plan text. Read from stdin when neither this, --file nor --pdf is given.
    #[arg(conflicts_with_all = ["file", "pdf"])]
    text: Option<String>,

    /// Read the plan from a UTF-8 text file.
    #[arg(long, conflicts_with = "pdf")]
    file: Option<PathBuf>,

    /// Read the plan from a PDF file path or HTTP/HTTPS URL.
    #[arg(long)]
    pdf: Option<String>,

    /// Output the actions as JSON instead of formatted text.
    #[arg(long, env = "PLANCOACH_JSON")]
    json: bool,

    /// HTTP download timeout in seconds (for --pdf URLs).
    #[arg(long, env = "PLANCOACH_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LabelsArg {
    /// Low / Medium / High
    English,
    /// Lav / Medium / Høj
    DanishMedium,
    /// Lav / Middel / Høj
    DanishMiddel,
}

impl From<LabelsArg> for LabelSet {
    fn from(v: LabelsArg) -> Self {
        match v {
            LabelsArg::English => LabelSet::English,
            LabelsArg::DanishMedium => LabelSet::DanishMedium,
            LabelsArg::DanishMiddel => LabelSet::DanishMiddel,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; real environment variables still apply.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // `suggest` shows a spinner, so library INFO logs are noise there.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || matches!(cli.command, Command::Suggest(_)) {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(ref args) => run_serve(&cli.llm, args).await,
        Command::Suggest(ref args) => {
            let config = build_config(&cli.llm, Some(args.download_timeout)).await?;
            run_suggest(args, &config, cli.quiet).await
        }
    }
}

async fn run_serve(llm: &LlmArgs, args: &ServeArgs) -> Result<()> {
    let config = build_config(llm, None).await?;
    let server = ServerConfig {
        addr: SocketAddr::new(args.host, args.port),
        static_dir: (!args.no_static).then(|| args.static_dir.clone()),
        max_concurrent_requests: args.concurrency,
        rate_limit_per_minute: args.rate_limit,
        rate_limit_burst: args.rate_burst,
    };

    serve(config, server).await.context("Server failed")
}

async fn run_suggest(args: &SuggestArgs, config: &CoachConfig, quiet: bool) -> Result<()> {
    let spinner = (!quiet && io::stderr().is_terminal()).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });
    let set_message = |msg: &'static str| {
        if let Some(ref bar) = spinner {
            bar.set_message(msg);
        }
    };

    let result = if let Some(ref source) = args.pdf {
        set_message("Reading PDF…");
        let pdf = resolve_pdf_source(source, config.max_upload_bytes, config.download_timeout_secs)
            .await
            .with_context(|| format!("Failed to load '{}'", source))?;
        set_message("Generating suggestions…");
        generate_from_pdf(&pdf, Some(PDF_MIME), config).await
    } else {
        let text = read_plan_text(args).await?;
        set_message("Generating suggestions…");
        generate(&text, config).await
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Generation failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output.suggestions.to_json(config.labels))
            .context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_actions(&output, config.labels);
    }

    if !quiet {
        eprintln!(
            "{} {} action(s)  {}",
            green("✔"),
            output.suggestions.len(),
            dim(&format!(
                "{} tokens in / {} out, {}ms",
                output.stats.input_tokens, output.stats.output_tokens, output.stats.total_duration_ms
            )),
        );
        if output.stats.plan_truncated {
            eprintln!(
                "  {}",
                dim(&format!(
                    "plan was cut to {} characters",
                    output.stats.plan_chars
                ))
            );
        }
    }

    Ok(())
}

async fn read_plan_text(args: &SuggestArgs) -> Result<String> {
    if let Some(ref text) = args.text {
        return Ok(text.clone());
    }
    if let Some(ref path) = args.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read plan from {:?}", path));
    }

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read plan from stdin")?;
    Ok(text)
}

fn print_actions(output: &GenerationOutput, labels: LabelSet) {
    for (i, action) in output.suggestions.actions.iter().enumerate() {
        println!("{}", bold(&format!("{}. {}", i + 1, action.title)));
        println!(
            "   {}",
            dim(&format!(
                "Impact: {}  ·  Effort: {}",
                labels.label(action.impact),
                labels.label(action.effort)
            ))
        );
        if !action.description.is_empty() {
            println!("   {}", action.description);
        }
        for step in &action.steps {
            println!("   - {step}");
        }
        println!();
    }
}

/// Map CLI args to `CoachConfig`.
async fn build_config(llm: &LlmArgs, download_timeout: Option<u64>) -> Result<CoachConfig> {
    let system_prompt = if let Some(ref path) = llm.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = CoachConfig::builder()
        .temperature(llm.temperature)
        .max_tokens(llm.max_tokens)
        .max_retries(llm.max_retries)
        .api_timeout_secs(llm.api_timeout)
        .labels(llm.labels.into());

    if let Some(ref model) = llm.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = llm.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(secs) = download_timeout {
        builder = builder.download_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}
