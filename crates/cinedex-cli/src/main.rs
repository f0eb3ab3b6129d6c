use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cinedex_client::{GeminiClient, PostgrestCatalogClient};
use cinedex_core::grouping::{STANDARD_FIELDS, filter_by_field, group_by_field};
use cinedex_core::i18n::language_name;
use cinedex_core::traits::CatalogSource;
use cinedex_core::{
    BoundedAnnotator, CatalogRecord, EnrichmentReport, EnrichmentService, PermitPool,
    PipelineConfig, TracingReporter, TranslationCache, Trope, TropeAnalysis, WorkItem,
    load_catalogs_config, srt_to_vtt,
};

mod config;

use config::{Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::parse();

    match &config.command {
        Command::Enrich {
            output,
            report,
            concurrency,
            call_timeout,
            max_attempts,
        } => {
            let pipeline = pipeline_config(*concurrency, *call_timeout, *max_attempts)?;
            let catalog = build_catalog(&config)?;
            let oracle = build_oracle(&config)?;
            let service = EnrichmentService::with_config(catalog, oracle, pipeline)?;
            enrich(&service, output.as_deref(), *report).await?;
        }
        Command::Group { field, filter } => {
            let catalog = build_catalog(&config)?;
            group(&catalog, field, filter.as_deref()).await?;
        }
        Command::Tropes {
            title,
            url,
            min_confidence,
        } => {
            let pipeline = PipelineConfig::from_env()?;
            let annotator = BoundedAnnotator::new(
                build_oracle(&config)?,
                PermitPool::new(pipeline.concurrency)?,
            )
            .with_retry_policy(pipeline.retry)
            .with_call_timeout(pipeline.call_timeout);
            let item = WorkItem::new(title.as_str(), url.as_str());
            let analysis = annotator
                .analyze_tropes_with_progress(&item, &TracingReporter)
                .await;
            print_tropes(&analysis, *min_confidence);
        }
        Command::Translate { text, lang, cache } => {
            translate(cache, text.as_deref(), lang)?;
        }
        Command::Subtitles {
            video_id,
            lang,
            srt,
            output,
        } => {
            let catalog = build_catalog(&config)?;
            subtitles(&catalog, video_id, lang, *srt, output.as_deref()).await?;
        }
    }

    Ok(())
}

/// Resolves the catalog from `--catalog`, then `SUPABASE_URL`, then the
/// first enabled entry of `catalogs.toml`.
fn build_catalog(config: &Config) -> anyhow::Result<PostgrestCatalogClient> {
    let key = config
        .supabase_key
        .as_deref()
        .context("SUPABASE_KEY is not set")?;

    if let (None, Some(url)) = (&config.catalog, config.supabase_url.as_deref()) {
        return Ok(PostgrestCatalogClient::new(url, key)?);
    }

    let catalogs = load_catalogs_config(config.config.clone())?.ok_or_else(|| {
        anyhow::anyhow!(
            "SUPABASE_URL is not set and no configuration file was found. \
             Create ~/.config/cinedex/catalogs.toml or use --config"
        )
    })?;

    let entry = match &config.catalog {
        Some(name) => {
            let entry = catalogs
                .find_by_name(name)
                .ok_or_else(|| anyhow::anyhow!("Catalog '{}' not found in configuration", name))?;
            if !entry.enabled {
                info!("Note: catalog '{}' is marked as disabled in configuration", name);
            }
            entry
        }
        None => catalogs
            .enabled_catalogs()
            .into_iter()
            .next()
            .context("No enabled catalogs in configuration")?,
    };

    info!(catalog = %entry.name, table = %entry.table, "Using configured catalog");
    Ok(PostgrestCatalogClient::from_entry(entry, key)?)
}

fn build_oracle(config: &Config) -> anyhow::Result<GeminiClient> {
    let key = config
        .gemini_api_key
        .as_deref()
        .context("GEMINI_API_KEY is not set")?;
    Ok(GeminiClient::new(key)?.with_model(config.gemini_model.as_str()))
}

/// Environment defaults overridden by explicit flags.
fn pipeline_config(
    concurrency: Option<usize>,
    call_timeout: Option<u64>,
    max_attempts: Option<u32>,
) -> anyhow::Result<PipelineConfig> {
    let mut pipeline = PipelineConfig::from_env()?;
    if let Some(n) = concurrency {
        pipeline = pipeline.with_concurrency(n);
    }
    if let Some(secs) = call_timeout {
        pipeline = pipeline.with_call_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = max_attempts {
        let retry = pipeline.retry.clone().with_max_attempts(n);
        pipeline = pipeline.with_retry(retry);
    }
    Ok(pipeline)
}

async fn enrich(
    service: &EnrichmentService<PostgrestCatalogClient, GeminiClient>,
    output: Option<&Path>,
    full_report: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping with partial results");
            on_interrupt.cancel();
        }
    });

    info!(
        concurrency = service.annotator().permits().capacity(),
        max_attempts = service.annotator().retry_policy().max_attempts,
        "Starting enrichment"
    );

    let report = match service.run_cancellable(&TracingReporter, cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let json = if full_report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.index)?
    };
    write_output(output, &json)?;
    print_enrichment_summary(&report);
    Ok(())
}

async fn group(
    catalog: &PostgrestCatalogClient,
    field: &str,
    filter: Option<&str>,
) -> anyhow::Result<()> {
    if !STANDARD_FIELDS.contains(&field) {
        info!(
            field,
            standard = ?STANDARD_FIELDS,
            "Grouping by a column outside the standard browsing fields"
        );
    }

    let records = catalog.list_records().await?;
    info!(rows = records.len(), field, "Grouping catalog rows");

    let index = match filter {
        Some(needle) => {
            let selected: Vec<CatalogRecord> = filter_by_field(&records, field, needle)
                .into_iter()
                .cloned()
                .collect();
            group_by_field(&selected, field)
        }
        None => group_by_field(&records, field),
    };

    if index.is_empty() {
        eprintln!("No rows have a value for '{}'.", field);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&index)?);
    Ok(())
}

fn translate(cache_path: &Path, text: Option<&str>, lang: &str) -> anyhow::Result<()> {
    if language_name(lang).is_none() {
        warn!(lang, "Language is not one of the supported interface languages");
    }

    let cache = TranslationCache::load(cache_path)?;
    let available = cache.available_languages();
    if !available.contains(&lang) {
        warn!(lang, available = ?available, "Language has no entries in the translation cache");
    }

    let Some(text) = text else {
        let table: BTreeMap<String, String> = cache.for_language(lang).into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    };

    if !cache.is_available(text, lang) {
        info!(lang, "No cached translation, using fallback");
    }
    println!("{}", cache.translate(text, lang));
    Ok(())
}

async fn subtitles(
    catalog: &PostgrestCatalogClient,
    video_id: &str,
    lang: &str,
    keep_srt: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let Some(track) = catalog.fetch_subtitles(video_id, lang).await? else {
        anyhow::bail!("No '{}' subtitles stored for video {}", lang, video_id);
    };

    let text = if keep_srt { track } else { srt_to_vtt(&track) };
    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), video_id, lang, "Wrote subtitles");
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn write_output(output: Option<&Path>, json: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote enrichment output");
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Print a summary of an enrichment run.
fn print_enrichment_summary(report: &EnrichmentReport) {
    let stats = &report.stats;
    info!("");
    info!("═══════════════════════════════════════════════════════");
    if report.cancelled {
        info!("ENRICHMENT CANCELLED (partial results)");
    } else {
        info!("ENRICHMENT COMPLETE");
    }
    info!("═══════════════════════════════════════════════════════");
    info!("  Categories:          {}", report.index.len());
    info!("  ✓ Classified:        {}", stats.classified);
    info!("  ? Unparseable:       {}", stats.unparseable);
    info!("  ⧖ Timed out:         {}", stats.timed_out);
    info!("  ✗ Failed:            {}", stats.failed);
    info!("───────────────────────────────────────────────────────");
    info!("  Total processed:     {}", stats.total());
    info!("  Dropped:             {}", stats.dropped());
    if let Some(elapsed) = report.elapsed() {
        info!("  Duration:            {}s", elapsed.num_seconds());
    }
    info!("═══════════════════════════════════════════════════════");

    for item in report.unclassified.iter().take(10) {
        warn!("  - {} ({})", item.title, item.status);
    }
    if report.unclassified.len() > 10 {
        warn!("  ... and {} more", report.unclassified.len() - 10);
    }
}

fn print_tropes(analysis: &TropeAnalysis, min_confidence: f64) {
    println!("\n🎭 {}\n", analysis.film_title);
    println!("{}\n", analysis.analysis_summary);
    if analysis.is_error() {
        return;
    }

    let tropes = analysis.confident_tropes(min_confidence);
    if tropes.is_empty() {
        println!("No tropes above {:.0}% confidence.", min_confidence * 100.0);
        return;
    }
    for (i, trope) in tropes.iter().enumerate() {
        println!("{}", format_trope(i + 1, trope));
        if !trope.description.is_empty() {
            println!("   {}", truncate_text(&trope.description, 160));
        }
        println!();
    }
}

fn format_trope(position: usize, trope: &Trope) -> String {
    match trope.confidence_score {
        Some(score) => format!(
            "{}. {} [{:.0}%] {}",
            position,
            create_confidence_bar(score),
            score * 100.0,
            trope.trope_name
        ),
        None => format!("{}. {}", position, trope.trope_name),
    }
}

// floor() so a 5% score does not show a filled cell.
fn create_confidence_bar(score: f64) -> String {
    let filled = ((score * 10.0).floor() as isize).clamp(0, 10) as usize;
    let empty = 10 - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn truncate_text(text: &str, max_len: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() <= max_len {
        cleaned
    } else {
        let truncated: String = cleaned.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}
