//! HTTP server binary for docdistill.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DistillConfig` / `ServerConfig` and serves the API.

use anyhow::{Context, Result};
use clap::Parser;
use docdistill::server::{AppState, Profile, Server, ServerConfig};
use docdistill::{resolve_provider, DistillConfig, Distiller};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (0.0.0.0:5678)
  docdistill-server

  # Production profile with a single allowed origin
  docdistill-server --profile production --cors-origin https://app.example.com

  # Use a specific model
  docdistill-server --provider openai --model gpt-4.1-mini

  # Summarise a PDF
  curl -F file=@lecture.pdf http://localhost:5678/api/v1/summarize

  # Ten questions, 300-word chunks
  curl -F file=@lecture.pdf 'http://localhost:5678/api/v1/generate-questions?max_questions=10&max_words=300'

  # Answer a scanned question paper
  curl -F file=@paper.jpg http://localhost:5678/api/v1/academic-assistant

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose
"#;

/// Summaries, exam questions and answers from uploaded documents.
#[derive(Parser, Debug)]
#[command(
    name = "docdistill-server",
    version,
    about = "Serve document summaries, exam questions and academic answers over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DISTILL_BIND", default_value = "0.0.0.0:5678")]
    bind: SocketAddr,

    /// Deployment profile: development, testing or production.
    #[arg(long, env = "DISTILL_PROFILE", value_enum, default_value = "development")]
    profile: ProfileArg,

    /// Allowed CORS origin ("*" for any).
    #[arg(long, env = "CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Word budget per chunk.
    #[arg(long, env = "DISTILL_MAX_WORDS", default_value_t = 400)]
    max_words: usize,

    /// Concurrent model calls per request.
    #[arg(short, long, env = "DISTILL_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Reduction passes before giving up.
    #[arg(long, env = "DISTILL_MAX_PASSES", default_value_t = 10)]
    max_passes: usize,

    /// Attempts per model call when the answer is empty (1–10).
    #[arg(long, env = "DISTILL_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    max_attempts: u32,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "DISTILL_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Upload size limit in MiB.
    #[arg(long, env = "DISTILL_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    /// Directory for staged uploads (default: system temp directory).
    #[arg(long, env = "DISTILL_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Leave PDF pages without a text layer blank instead of transcribing them.
    #[arg(long, env = "DISTILL_NO_OCR")]
    no_ocr: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DISTILL_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProfileArg {
    Development,
    Testing,
    Production,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Development => Profile::Development,
            ProfileArg::Testing => Profile::Testing,
            ProfileArg::Production => Profile::Production,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = DistillConfig::builder()
        .max_words(cli.max_words)
        .concurrency(cli.concurrency)
        .max_passes(cli.max_passes)
        .max_attempts(cli.max_attempts)
        .api_timeout_secs(cli.api_timeout)
        .ocr_fallback(!cli.no_ocr)
        .build()
        .context("Invalid configuration")?;

    let (provider, label) = resolve_provider(cli.provider.as_deref(), cli.model.as_deref())
        .context("Failed to initialise LLM provider")?;
    info!("Using LLM provider {}", label);

    let mut distiller = Distiller::from_provider(provider, label, config);
    if let Some(path) = cli.pdfium_lib {
        distiller = distiller.with_pdfium_library(path);
    }

    let mut server_config = ServerConfig::new(cli.bind)
        .with_profile(cli.profile.into())
        .with_max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));
    if let Some(origin) = cli.cors_origin {
        server_config = server_config.with_cors_origin(origin);
    }
    if let Some(dir) = cli.upload_dir {
        server_config = server_config.with_upload_dir(dir);
    }

    Server::new(AppState::new(distiller, server_config))
        .run()
        .await
        .context("Server failed")?;

    Ok(())
}
