use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::LazyLock;

static VERSION_INFO: LazyLock<String> = LazyLock::new(|| {
    let version = env!("CARGO_PKG_VERSION");

    let commit = option_env!("VERGEN_GIT_SHA")
        .map(|s| s.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "unknown".to_string());
    let dirty = match option_env!("VERGEN_GIT_DIRTY") {
        Some("true") => "-dirty",
        _ => "",
    };

    let built = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown");
    let host = option_env!("VERGEN_RUSTC_HOST_TRIPLE").unwrap_or("unknown");
    let rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown");

    format!("{version}\ncommit: {commit}{dirty}\nbuilt: {built}\nhost: {host}\nrustc: {rustc}")
});

pub fn version_info() -> &'static str {
    &VERSION_INFO
}

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "cinedex")]
#[command(
    author,
    version = version_info(),
    about = "Classify a video catalog by genre with a generative-AI oracle"
)]
#[command(after_help = "Examples:
  cinedex enrich > genres.json
  cinedex enrich --catalog archive --concurrency 5 --report
  cinedex group --field language
  cinedex tropes \"Nosferatu\" https://example.org/Nosferatu.webm
  cinedex translate \"Search\" --lang hi
  cinedex subtitles 42 --lang hi --output nosferatu.hi.vtt

Pipeline tuning can also come from CINEDEX_CONCURRENCY, CINEDEX_CALL_TIMEOUT_SECS,
CINEDEX_MAX_ATTEMPTS, CINEDEX_MAX_BACKOFF_SECS and CINEDEX_JITTER.")]
pub struct Config {
    /// Base URL of the PostgREST (Supabase) project holding the catalog
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    /// API key for the catalog project
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true, global = true)]
    pub supabase_key: Option<String>,

    /// Google Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = cinedex_client::gemini::DEFAULT_MODEL, global = true)]
    pub gemini_model: String,

    /// Use a named catalog from catalogs.toml. Without it, SUPABASE_URL is used,
    /// then the first enabled catalog
    #[arg(long, value_name = "NAME", global = true)]
    pub catalog: Option<String>,

    /// Custom path to catalogs.toml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every catalog item and print the category index as JSON
    #[command(after_help = "Examples:
  cinedex enrich                         # Index to stdout
  cinedex enrich --output genres.json    # Index to a file
  cinedex enrich --report                # Full report with stats and dropped items
  cinedex enrich --max-attempts 3 --call-timeout 10")]
    Enrich {
        /// Write the JSON to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Print the full report (stats, unclassified items) instead of the bare index
        #[arg(long)]
        report: bool,

        /// Maximum number of oracle calls in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Deadline for each oracle call, in seconds
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        call_timeout: Option<u64>,

        /// Oracle attempts per item before giving up
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Group stored catalog rows by an existing column
    #[command(after_help = "Example: cinedex group --field director --filter murnau")]
    Group {
        /// Column to group by (genre, language, director, year, ...)
        #[arg(short, long, default_value = "genre")]
        field: String,

        /// Keep only rows whose field contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Analyse the narrative tropes of one film
    Tropes {
        /// Film title
        title: String,
        /// URL of the film
        url: String,
        /// Hide tropes below this confidence
        #[arg(long, default_value = "0.0")]
        min_confidence: f64,
    },
    /// Look up a UI string in the translation cache
    #[command(after_help = "Without TEXT, prints every cached string for --lang as JSON.")]
    Translate {
        /// English source text
        text: Option<String>,
        /// Target language code
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Path to the translation cache
        #[arg(long, value_name = "PATH", default_value = cinedex_core::i18n::CACHE_FILE_NAME)]
        cache: PathBuf,
    },
    /// Fetch the stored subtitle track of a video as WebVTT
    Subtitles {
        /// Video id in the catalog
        video_id: String,
        /// Subtitle language code
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Print the stored SubRip text unchanged
        #[arg(long)]
        srt: bool,
        /// Write the track to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
