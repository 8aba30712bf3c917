//! CLI binary for caselens.
//!
//! A thin shim over the library crate: maps flags to `GatewayConfig`,
//! drives a `Pipeline` through its stages and writes the exports.

use anyhow::{bail, Context, Result};
use caselens::demo::{demo_deck, demo_sections};
use caselens::export::file_stem;
use caselens::gateway::input::is_url;
use caselens::{
    export_deck, export_word, Deck, DocumentSection, GatewayConfig, LlmGateway, Pipeline,
    PipelineObserver, Source, Stage,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Stage spinner ────────────────────────────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Renders stage transitions and slide image events on a spinner.
struct CliObserver {
    bar: ProgressBar,
    started: Instant,
    image_failures: AtomicUsize,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            started: Instant::now(),
            image_failures: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Validating => "Checking the sources describe a case…",
        Stage::ExtractingText => "Extracting text…",
        Stage::TextReady => "Text ready",
        Stage::AnalyzingDocument => "Writing the dossier…",
        Stage::DocumentReady => "Dossier ready",
        Stage::GeneratingDeck => "Designing the deck…",
        Stage::DeckReady => "Deck ready",
        Stage::ValidationFailed => "Sources rejected",
        Stage::Error => "Failed",
        Stage::Idle => "Idle",
    }
}

impl PipelineObserver for CliObserver {
    fn on_stage_change(&self, _from: Stage, to: Stage) {
        if matches!(
            to,
            Stage::TextReady | Stage::DocumentReady | Stage::DeckReady
        ) {
            self.bar.println(format!(
                "  {} {:<14} {}",
                green("✓"),
                stage_message(to),
                dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
            ));
        }
        self.bar.set_prefix(to.as_str());
        self.bar.set_message(stage_message(to));
    }

    fn on_error(&self, stage: Stage, message: &str) {
        self.bar
            .println(format!("  {} {}: {}", red("✗"), stage.as_str(), red(message)));
    }

    fn on_image_start(&self, slide_index: usize) {
        self.bar.set_prefix("IMAGES");
        self.bar.set_message(format!("slide {}", slide_index + 1));
    }

    fn on_image_complete(&self, slide_index: usize) {
        self.bar
            .println(format!("  {} Image for slide {}", green("✓"), slide_index + 1));
    }

    fn on_image_error(&self, slide_index: usize, error: &str) {
        self.image_failures.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Image for slide {}  {}",
            red("✗"),
            slide_index + 1,
            red(&msg)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a published decision, write the dossier and the deck to ./out
  caselens https://www.dataprotection.ie/en/news-media/press-releases/... -o out

  # Several sources at once: a PDF decision plus notes
  caselens decision.pdf notes.txt -o out

  # Stop after extraction and save the text
  caselens --stop-after text decision.pdf

  # Dossier only, as JSON
  caselens --stop-after document --json decision.pdf > dossier.json

  # Illustrate every slide (needs an image endpoint key)
  caselens --images decision.pdf -o out

  # Try the exporters without any API key
  caselens --demo -o out

OUTPUT FILES:
  <title>.doc          Word-compatible dossier (HTML with Office namespaces)
  <title>_deck.pptx    16:9 presentation
  <title>_text.md      extracted text (--stop-after text)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (chat and images)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  CASELENS_IMAGE_API_KEY  Key for the image endpoint, defaults to OPENAI_API_KEY
  PDFIUM_DYNAMIC_LIB_PATH Directory holding libpdfium when it is not on the system path
"#;

/// How far the pipeline should run.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StopAfter {
    Text,
    Document,
    Deck,
}

/// Analyse legal case material into a dossier and a slide deck.
#[derive(Parser, Debug)]
#[command(
    name = "caselens",
    version,
    about = "Analyse legal case decisions into a dossier and a slide deck using LLMs",
    long_about = "Validate case material (URLs, PDFs, text, images), extract its text, write a \
five-section analysis dossier and design an executive slide deck. Exports a Word-compatible \
.doc and a .pptx. Supports every provider edgequake-llm supports.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source URLs (http/https) or local files.
    #[arg(required_unless_present = "demo")]
    sources: Vec<String>,

    /// Directory for the exported files.
    #[arg(short, long = "output-dir", env = "CASELENS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Title used for file names; defaults to the deck title.
    #[arg(long, env = "CASELENS_TITLE")]
    title: Option<String>,

    /// Stop after this stage.
    #[arg(long, env = "CASELENS_STOP_AFTER", value_enum, default_value = "deck")]
    stop_after: StopAfter,

    /// Generate an illustration for every slide.
    #[arg(long, env = "CASELENS_IMAGES")]
    images: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Image model for --images.
    #[arg(long, env = "CASELENS_IMAGE_MODEL")]
    image_model: Option<String>,

    /// PDF user password for encrypted decisions.
    #[arg(long, env = "CASELENS_PDF_PASSWORD")]
    password: Option<String>,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "CASELENS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Max PDF pages transcribed per source.
    #[arg(long, env = "CASELENS_MAX_PAGES", default_value_t = 30)]
    max_pages: usize,

    /// Print the result as JSON on stdout instead of writing files.
    #[arg(long, env = "CASELENS_JSON")]
    json: bool,

    /// Export the built-in sample analysis; no provider needed.
    #[arg(long)]
    demo: bool,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "CASELENS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CASELENS_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CASELENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CASELENS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The spinner gives all the feedback that matters; keep library logs
    // at error level while it is shown.
    let show_progress = !cli.quiet && !cli.json && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    if cli.demo {
        return run_demo(&cli);
    }

    let sources = load_sources(&cli.sources).await?;
    let config = build_config(&cli)?;
    let gateway = LlmGateway::new(config).context("Failed to set up the LLM provider")?;

    let observer = show_progress.then(CliObserver::new);
    let mut pipeline = Pipeline::new(gateway);
    if let Some(ref o) = observer {
        pipeline = pipeline.with_observer(o.clone());
    }

    let result = run(&cli, &mut pipeline, sources).await;
    if let Some(ref o) = observer {
        o.finish();
        let failures = o.image_failures.load(Ordering::SeqCst);
        if failures > 0 {
            eprintln!("{} {} slide image(s) failed", red("⚠"), failures);
        }
    }
    result
}

async fn run(cli: &Cli, pipeline: &mut Pipeline<LlmGateway>, sources: Vec<Source>) -> Result<()> {
    pipeline.submit_sources(sources)?;

    let stage = pipeline
        .start_analysis()
        .await
        .context("Text extraction failed")?;
    if stage == Stage::ValidationFailed {
        bail!("The sources do not look like a legal or regulatory case decision");
    }

    if cli.stop_after == StopAfter::Text {
        let text = pipeline.extracted_text().unwrap_or_default();
        if cli.json {
            println!("{}", serde_json::json!({ "text": text }));
        } else {
            let stem = file_stem(cli.title.as_deref().unwrap_or_default());
            let path = cli.output_dir.join(format!("{stem}_text.md"));
            write_text(&path, text)?;
            report(cli, &[path]);
        }
        return Ok(());
    }

    let sections = pipeline
        .proceed_to_analysis()
        .await
        .context("Dossier generation failed")?
        .to_vec();

    if cli.stop_after == StopAfter::Document {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&sections).context("Failed to serialise dossier")?
            );
        } else {
            let title = cli.title.clone().unwrap_or_else(|| section_title(&sections));
            let path = export_word(&sections, &title, &cli.output_dir)?;
            report(cli, &[path]);
        }
        return Ok(());
    }

    let slide_count = pipeline
        .generate_deck()
        .await
        .context("Deck generation failed")?
        .slides
        .len();

    if cli.images {
        // Slide-level failures are reported by the observer and do not
        // stop the run.
        for index in 0..slide_count {
            if let Err(e) = pipeline.regenerate_slide_image(index).await {
                tracing::warn!("Slide {}: {}", index + 1, e);
            }
        }
    }

    let deck = pipeline
        .deck()
        .cloned()
        .context("Deck missing after generation")?;
    finish(cli, pipeline.sections(), &deck)
}

/// Export (or print) the dossier and the deck.
fn finish(cli: &Cli, sections: &[DocumentSection], deck: &Deck) -> Result<()> {
    if cli.json {
        let out = serde_json::json!({ "sections": sections, "deck": deck });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
        return Ok(());
    }

    let mut deck = deck.clone();
    if let Some(ref title) = cli.title {
        deck.presentation_title = title.clone();
    }
    let doc = export_word(sections, &deck.presentation_title, &cli.output_dir)
        .context("Failed to export the dossier")?;
    let pptx = export_deck(&deck, &cli.output_dir).context("Failed to export the deck")?;
    report(cli, &[doc, pptx]);
    Ok(())
}

fn run_demo(cli: &Cli) -> Result<()> {
    finish(cli, &demo_sections(), &demo_deck())
}

fn report(cli: &Cli, paths: &[PathBuf]) {
    if cli.quiet {
        return;
    }
    for path in paths {
        eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
    }
}

fn section_title(sections: &[DocumentSection]) -> String {
    sections
        .first()
        .map(|s| s.title.clone())
        .unwrap_or_default()
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Turn CLI arguments into sources: http(s) arguments are URLs, everything
/// else is read from disk.
async fn load_sources(args: &[String]) -> Result<Vec<Source>> {
    let mut sources = Vec::with_capacity(args.len());
    for arg in args {
        if is_url(arg) {
            sources.push(Source::url(arg.as_str()));
            continue;
        }
        let path = Path::new(arg);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read source file {arg}"))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| arg.clone());
        sources.push(Source::from_file_bytes(name, &bytes));
    }
    Ok(sources)
}

/// Map CLI args to `GatewayConfig`.
fn build_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut builder = GatewayConfig::builder()
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_pdf_pages(cli.max_pages)
        .dpi(cli.dpi);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.image_model {
        builder = builder.image_model(model);
    }
    if let Some(ref password) = cli.password {
        builder = builder.pdf_password(password);
    }
    if let Ok(key) = std::env::var("CASELENS_IMAGE_API_KEY") {
        if !key.is_empty() {
            builder = builder.image_api_key(key);
        }
    }

    builder.build().context("Invalid configuration")
}
