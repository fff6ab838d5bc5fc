//! CLI binary for pdf2png.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2png::{
    convert, inspect, ConversionOutput, ConversionProgressCallback, ConversionResult,
    ConversionStats, ConverterConfig, Mode, Payload, ProgressCallback, RenderPolicy,
    SourceDescriptor, Stage,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that names the stage currently running.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        let (prefix, msg) = match stage {
            Stage::Idle => ("Preparing", ""),
            Stage::Normalizing => ("Input", "writing workspace…"),
            Stage::Counting => ("Counting", "asking Ghostscript for the page count…"),
            Stage::Rendering => ("Rendering", "rasterising pages…"),
            Stage::Collecting => ("Collecting", "reading pages back…"),
            Stage::Done | Stage::Failed => return,
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_page_count(&self, pages: u32) {
        self.bar
            .println(format!("  {} {} pages", green("✓"), bold(&pages.to_string())));
    }

    fn on_pages_rendered(&self, pages: usize) {
        self.bar
            .println(format!("  {} rendered {} pages", green("✓"), pages));
    }

    fn on_failed(&self, stage: Stage, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {} failed: {}", red("✘"), stage, red(first_line));
    }

    fn on_complete(&self, stats: &ConversionStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages  {}",
            green("✔"),
            bold(&stats.rendered_pages.to_string()),
            dim(&format!("{}ms", stats.total_duration_ms)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page, print the PNG paths
  pdf2png document.pdf

  # Copy the pages somewhere permanent and drop the scratch workspace
  pdf2png document.pdf -o pages/ --cleanup

  # Page count only
  pdf2png --count-only document.pdf

  # PDF on stdin, pages as base64 JSON
  cat document.pdf | pdf2png - --output-mode base64 --json

  # Base64-encoded PDF in a file
  pdf2png --input-mode base64 document.b64

  # Higher resolution, keep pages even if Ghostscript complains
  pdf2png --dpi 300 --lenient scanned.pdf

MODES:
  raw-bytes   raw byte sequence
  base64      base64 text
  buffer      binary buffer (same bytes as raw-bytes)
  file        file path (default)

ENVIRONMENT VARIABLES:
  GS_PATH               Ghostscript executable to use
  PDF2PNG_SCRATCH_DIR   Directory for per-call workspaces

SETUP:
  Install Ghostscript (apt install ghostscript, brew install ghostscript,
  or the Windows installer). pdf2png finds it through GS_PATH, a gs/
  directory next to the binary, or PATH.
"#;

/// Rasterise PDF documents to PNG pages through Ghostscript.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2png",
    version,
    about = "Rasterise PDF documents to PNG pages through Ghostscript",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file path, or `-` to read the document from stdin.
    input: String,

    /// How the input is encoded: raw-bytes, base64, buffer or file.
    /// Default: file, or raw-bytes when reading stdin.
    #[arg(long, env = "PDF2PNG_INPUT_MODE", value_parser = parse_mode)]
    input_mode: Option<Mode>,

    /// Representation of the rendered pages: raw-bytes, base64, buffer or file.
    #[arg(long, env = "PDF2PNG_OUTPUT_MODE", value_parser = parse_mode, default_value = "file")]
    output_mode: Mode,

    /// Copy the rendered pages into this directory.
    #[arg(short, long, env = "PDF2PNG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Ghostscript executable.
    #[arg(long, env = "GS_PATH")]
    engine: Option<PathBuf>,

    /// Directory for per-call workspaces.
    #[arg(long, env = "PDF2PNG_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Rendering resolution (36–1200).
    #[arg(long, env = "PDF2PNG_DPI", default_value_t = 144,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// Ghostscript output device.
    #[arg(long, env = "PDF2PNG_DEVICE", default_value = "png16m")]
    device: String,

    /// Return the pages Ghostscript wrote even if it reported errors.
    #[arg(long, env = "PDF2PNG_LENIENT")]
    lenient: bool,

    /// Do not require the rendered page total to match the page count.
    #[arg(long)]
    no_verify: bool,

    /// Skip the page-count query.
    #[arg(long, conflicts_with = "count_only")]
    no_count: bool,

    /// Print the page count and exit.
    #[arg(long)]
    count_only: bool,

    /// Remove the workspace before exiting.
    #[arg(long)]
    cleanup: bool,

    /// Print the result envelope as JSON.
    #[arg(long, env = "PDF2PNG_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2PNG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PNG_QUIET")]
    quiet: bool,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
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

    let source = read_source(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.count_only {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Count-only mode ──────────────────────────────────────────────────
    if cli.count_only {
        let result = inspect(source, &config).await;
        if cli.json {
            print_json(&ConversionResult::from(result))?;
            return Ok(());
        }
        let pages = result.context("Failed to count pages")?;
        println!("{pages}");
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert(source, &config).await;

    if cli.json {
        let envelope = ConversionResult::from(result);
        print_json(&envelope)?;
        if let (true, Some(output)) = (cli.cleanup, envelope.data()) {
            output.workspace.clone().cleanup().ok();
        }
        if !envelope.success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let output = result.context("Conversion failed")?;

    if let Some(ref dir) = cli.output_dir {
        let copied = copy_pages(&output.pages, dir)?;
        if !cli.quiet {
            eprintln!(
                "Copied {} pages to {}",
                copied.len(),
                bold(&dir.display().to_string())
            );
        }
    }

    print_payloads(&output)?;

    if cli.cleanup {
        if cli.output_mode == Mode::FilePath && cli.output_dir.is_none() && !cli.quiet {
            eprintln!("note: --cleanup removed the files listed above; pass -o to keep them");
        }
        output
            .workspace
            .cleanup()
            .context("Failed to remove workspace")?;
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Rendered {} pages in {}ms",
            output.stats.rendered_pages, output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .dpi(cli.dpi)
        .device(cli.device.clone())
        .render_policy(if cli.lenient {
            RenderPolicy::Lenient
        } else {
            RenderPolicy::Strict
        })
        .count_pages(!cli.no_count)
        .verify_page_count(!cli.no_verify)
        .output_mode(cli.output_mode);

    if let Some(ref engine) = cli.engine {
        builder = builder.engine(engine.clone());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_root(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Turn the positional input into a `SourceDescriptor`.
fn read_source(cli: &Cli) -> Result<SourceDescriptor> {
    let from_stdin = cli.input == "-";
    let mode = cli
        .input_mode
        .unwrap_or(if from_stdin { Mode::RawBytes } else { Mode::FilePath });

    if mode == Mode::FilePath {
        if from_stdin {
            anyhow::bail!("--input-mode file needs a path, not stdin");
        }
        return Ok(SourceDescriptor::FilePath(PathBuf::from(&cli.input)));
    }

    let bytes = if from_stdin {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("Failed to read PDF from stdin")?;
        buf
    } else {
        std::fs::read(&cli.input).with_context(|| format!("Failed to read {:?}", cli.input))?
    };

    SourceDescriptor::from_parts(mode, bytes).context("Invalid input")
}

/// Copy page files into `dir`, keeping their names.
fn copy_pages(pages: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    pages
        .iter()
        .map(|page| -> Result<PathBuf> {
            let name = page
                .file_name()
                .with_context(|| format!("Page path has no file name: {:?}", page))?;
            let to = dir.join(name);
            std::fs::copy(page, &to)
                .with_context(|| format!("Failed to copy {:?} to {:?}", page, to))?;
            Ok(to)
        })
        .collect()
}

/// Print one line per page: the path, the base64 text, or the byte size.
fn print_payloads(output: &ConversionOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for (i, payload) in output.payloads.iter().enumerate() {
        let line = match payload {
            Payload::FilePath(p) => p.display().to_string(),
            Payload::Base64Text(b64) => b64.clone(),
            Payload::RawBytes(b) | Payload::BinaryBuffer(b) => {
                format!("page {}: {} bytes", i + 1, b.len())
            }
        };
        writeln!(handle, "{line}").context("Failed to write to stdout")?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
