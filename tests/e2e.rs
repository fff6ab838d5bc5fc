//! End-to-end integration tests for pdf2png.
//!
//! Most tests drive a stub engine: a small POSIX shell script that honours
//! the two Ghostscript command shapes (it prints a page count for the query
//! and writes `file-<n>.png` files for the render). They run everywhere a
//! `/bin/sh` exists and need no Ghostscript install.
//!
//! Tests against a real Ghostscript are gated behind `E2E_ENABLED`:
//!
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

#![cfg(unix)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use pdf2png::{
    convert, convert_batch, convert_sync, ConversionProgressCallback, ConversionResult,
    Converter, ConverterConfig, ErrorKind, Mode, Payload, Pdf2PngError, RenderPolicy,
    SourceDescriptor, Stage,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const FIXTURE_PAGES: usize = 14;

/// A minimal but well-formed PDF with `pages` pages, each with one stroke.
fn fixture_pdf(pages: usize) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages
    ));
    for i in 0..pages {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] /Contents {} 0 R >>",
            4 + 2 * i
        ));
        let stream = format!("0 0 0 RG 4 w 10 10 m {} 190 l S", 10 + i * 12);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Stub engine template. `@COUNT@` is the page count it reports,
/// `@RENDER@` the number of page files it writes, `@NOISE@` a line it
/// prints while rendering (empty for a clean run).
const STUB_TEMPLATE: &str = r#"#!/bin/sh
mode=render
pdf=
pattern=
prev=
last=
for a in "$@"; do
  case "$a" in
    -dNODISPLAY) mode=count ;;
    --permit-file-read=*) pdf="${a#--permit-file-read=}" ;;
  esac
  if [ "$prev" = "-o" ]; then pattern="$a"; fi
  prev="$a"
  last="$a"
done
if [ "$mode" = render ]; then pdf="$last"; fi
if [ "$(head -c 4 "$pdf" 2>/dev/null)" != "%PDF" ]; then
  if [ "$mode" = count ]; then
    echo "   **** Error: Cannot find a 'startxref' anywhere in the file."
    exit 0
  fi
  echo "Error: /undefined in --runpdfbegin--"
  exit 1
fi
if [ "$mode" = count ]; then
  echo @COUNT@
  exit 0
fi
noise='@NOISE@'
if [ -n "$noise" ]; then echo "$noise"; fi
i=1
while [ "$i" -le @RENDER@ ]; do
  out=$(printf '%s' "$pattern" | sed "s/%d/$i/")
  printf 'stub-png page %d\n' "$i" > "$out"
  i=$((i + 1))
done
"#;

struct StubEngines {
    _dir: TempDir,
    clean: PathBuf,
    noisy: PathBuf,
    noisy_empty: PathBuf,
    short: PathBuf,
}

/// Stubs are written once so no test execs a script another test is still
/// writing.
static STUBS: Lazy<StubEngines> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("stub dir");
    let write = |name: &str, count: usize, render: usize, noise: &str| {
        let path = dir.path().join(name);
        let script = STUB_TEMPLATE
            .replace("@COUNT@", &count.to_string())
            .replace("@RENDER@", &render.to_string())
            .replace("@NOISE@", noise);
        std::fs::write(&path, script).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        path
    };
    StubEngines {
        clean: write("gs-clean", FIXTURE_PAGES, FIXTURE_PAGES, ""),
        noisy: write(
            "gs-noisy",
            FIXTURE_PAGES,
            FIXTURE_PAGES,
            "**** Warning: page 3 has an invalid content stream",
        ),
        noisy_empty: write("gs-noisy-empty", FIXTURE_PAGES, 0, "**** Error: rendering aborted"),
        short: write("gs-short", FIXTURE_PAGES, FIXTURE_PAGES - 1, ""),
        _dir: dir,
    }
});

/// Route library logs through the test harness; `RUST_LOG` raises the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn config_for(engine: &Path, scratch: &Path) -> ConverterConfig {
    init_tracing();
    ConverterConfig::builder()
        .engine(engine)
        .scratch_root(scratch)
        .build()
        .expect("valid config")
}

fn stub_converter(scratch: &Path) -> Converter {
    Converter::new(config_for(&STUBS.clean, scratch))
}

fn write_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, fixture_pdf(FIXTURE_PAGES)).unwrap();
    path
}

fn page_number(path: &Path) -> u32 {
    let name = path.file_name().unwrap().to_str().unwrap();
    name.trim_start_matches("file-")
        .trim_end_matches(".png")
        .parse()
        .unwrap()
}

// ── writeFile ────────────────────────────────────────────────────────────────

#[test]
fn write_file_materialises_every_mode() {
    let scratch = tempfile::tempdir().unwrap();
    let fixtures = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let pdf = fixture_pdf(FIXTURE_PAGES);
    let original = write_fixture(fixtures.path(), "Test1.pdf");

    for source in [
        SourceDescriptor::RawBytes(pdf.clone()),
        SourceDescriptor::Base64Text(STANDARD.encode(&pdf)),
        SourceDescriptor::BinaryBuffer(pdf.clone()),
    ] {
        let mode = source.mode();
        let path = converter.write_file(&source).unwrap();
        assert!(path.exists(), "[{mode}] {} missing", path.display());
        assert!(
            path.to_string_lossy().ends_with(".pdf"),
            "[{mode}] {}",
            path.display()
        );
        assert_eq!(std::fs::read(&path).unwrap(), pdf, "[{mode}] content differs");
    }

    let copied = converter
        .write_file(&SourceDescriptor::FilePath(original.clone()))
        .unwrap();
    assert!(copied.exists());
    assert_eq!(copied.file_name(), original.file_name());
    assert!(copied.starts_with(scratch.path()));
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_file_name_survives_count_and_render() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let scratch = tempfile::tempdir().unwrap();
    let fixtures = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let name = OsStr::from_bytes(b"r\xe9sum\xe9.pdf");
    let original = fixtures.path().join(name);
    std::fs::write(&original, fixture_pdf(FIXTURE_PAGES)).unwrap();

    let pdf = converter
        .write_file(&SourceDescriptor::FilePath(original))
        .unwrap();
    assert_eq!(pdf.file_name(), Some(name));
    assert_eq!(converter.get_page_count(&pdf).unwrap(), 14);
    assert_eq!(converter.convert_pages(&pdf).unwrap().len(), 14);
}

#[test]
fn concurrent_writes_of_identical_bytes_never_collide() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let source = SourceDescriptor::RawBytes(fixture_pdf(2));

    let paths: Vec<PathBuf> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| converter.write_file(&source).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut dirs: Vec<_> = paths.iter().map(|p| p.parent().unwrap().to_path_buf()).collect();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), paths.len(), "workspaces collided: {dirs:?}");
    for p in &paths {
        assert!(p.exists());
    }
}

// ── getPageCount ─────────────────────────────────────────────────────────────

#[test]
fn page_count_of_fixture_is_fourteen() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();
    assert_eq!(converter.get_page_count(&pdf).unwrap(), 14);
}

#[test]
fn page_count_of_non_pdf_carries_engine_diagnostic() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let bogus = converter
        .write_file(&SourceDescriptor::RawBytes(b"this is not a pdf".to_vec()))
        .unwrap();

    let result: ConversionResult<u32> = converter.get_page_count(&bogus).into();
    assert!(!result.success());
    assert!(result.data().is_none());
    let message = result.message().unwrap();
    assert!(message.contains("startxref"), "got: {message}");
    assert!(message.trim().parse::<u32>().is_err());
    assert_eq!(result.kind(), Some(ErrorKind::Validation));
}

// ── convertPages ─────────────────────────────────────────────────────────────

#[test]
fn convert_pages_returns_fourteen_ordered_pages() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();

    let pages = converter.convert_pages(&pdf).unwrap();
    assert_eq!(pages.len(), 14);
    let numbers: Vec<u32> = pages.iter().map(|p| page_number(p)).collect();
    assert_eq!(numbers, (1..=14).collect::<Vec<_>>());
    for p in &pages {
        assert!(p.exists(), "{} missing", p.display());
        assert_eq!(p.parent(), pdf.parent());
    }
}

#[test]
fn convert_pages_is_idempotent_across_workspaces() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let source = SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES));

    let first = converter
        .convert_pages(converter.write_file(&source).unwrap())
        .unwrap();
    let second = converter
        .convert_pages(converter.write_file(&source).unwrap())
        .unwrap();

    assert_eq!(first.len(), second.len());
    assert_ne!(first[0].parent(), second[0].parent());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}

#[test]
fn strict_policy_fails_on_engine_output() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = Converter::new(config_for(&STUBS.noisy, scratch.path()));
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();

    let err = converter.convert_pages(&pdf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineInvocation);
    assert!(err.to_string().contains("invalid content stream"));
}

#[test]
fn lenient_policy_returns_pages_despite_engine_output() {
    let scratch = tempfile::tempdir().unwrap();
    init_tracing();
    let config = ConverterConfig::builder()
        .engine(&STUBS.noisy)
        .scratch_root(scratch.path())
        .render_policy(RenderPolicy::Lenient)
        .build()
        .unwrap();
    let converter = Converter::new(config);
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();

    let pages = converter.convert_pages(&pdf).unwrap();
    assert_eq!(pages.len(), 14);
}

#[test]
fn lenient_policy_still_fails_when_nothing_was_written() {
    let scratch = tempfile::tempdir().unwrap();
    init_tracing();
    let config = ConverterConfig::builder()
        .engine(&STUBS.noisy_empty)
        .scratch_root(scratch.path())
        .render_policy(RenderPolicy::Lenient)
        .build()
        .unwrap();
    let converter = Converter::new(config);
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();

    let err = converter.convert_pages(&pdf).unwrap_err();
    assert!(err.to_string().contains("rendering aborted"));
}

#[test]
fn render_of_non_pdf_is_engine_error() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let bogus = converter
        .write_file(&SourceDescriptor::RawBytes(b"GIF89a".to_vec()))
        .unwrap();
    let err = converter.convert_pages(&bogus).unwrap_err();
    assert!(matches!(err, Pdf2PngError::EngineFailed { status: Some(1), .. }));
    assert!(err.to_string().contains("runpdfbegin"));
}

#[test]
fn checked_render_detects_missing_pages() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = Converter::new(config_for(&STUBS.short, scratch.path()));
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();

    let count = converter.get_page_count(&pdf).unwrap();
    let err = converter.convert_pages_checked(&pdf, count).unwrap_err();
    assert!(matches!(
        err,
        Pdf2PngError::PageCountMismatch {
            expected: 14,
            rendered: 13
        }
    ));
}

// ── getData ──────────────────────────────────────────────────────────────────

#[test]
fn get_data_matches_direct_reads_for_buffer_modes() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();
    let pages = converter.convert_pages(&pdf).unwrap();
    let direct: Vec<Vec<u8>> = pages.iter().map(|p| std::fs::read(p).unwrap()).collect();

    let raw = converter.get_data(&pages, Mode::RawBytes).unwrap();
    let b64 = converter.get_data(&pages, Mode::Base64Text).unwrap();
    let buf = converter.get_data(&pages, Mode::BinaryBuffer).unwrap();

    for (i, expected) in direct.iter().enumerate() {
        assert_eq!(raw[i], Payload::RawBytes(expected.clone()));
        assert_eq!(buf[i], Payload::BinaryBuffer(expected.clone()));
        match &b64[i] {
            Payload::Base64Text(text) => assert_eq!(&STANDARD.decode(text).unwrap(), expected),
            other => panic!("expected base64 payload, got {other:?}"),
        }
    }
}

#[test]
fn get_data_file_mode_returns_paths_without_reading() {
    let scratch = tempfile::tempdir().unwrap();
    let converter = stub_converter(scratch.path());
    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();
    let pages = converter.convert_pages(&pdf).unwrap();

    // Remove the files: any read would now fail.
    for p in &pages {
        std::fs::remove_file(p).unwrap();
    }

    let out = converter.get_data(&pages, Mode::FilePath).unwrap();
    let paths: Vec<PathBuf> = out
        .into_iter()
        .map(|p| match p {
            Payload::FilePath(path) => path,
            other => panic!("expected path payload, got {other:?}"),
        })
        .collect();
    assert_eq!(paths, pages);

    let err = converter.get_data(&pages, Mode::RawBytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filesystem);
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct StageLog(Mutex<Vec<Stage>>);

impl ConversionProgressCallback for StageLog {
    fn on_stage(&self, stage: Stage) {
        self.0.lock().unwrap().push(stage);
    }
}

#[tokio::test]
async fn convert_runs_every_stage_in_order() {
    let scratch = tempfile::tempdir().unwrap();
    let log = Arc::new(StageLog::default());
    init_tracing();
    let config = ConverterConfig::builder()
        .engine(&STUBS.clean)
        .scratch_root(scratch.path())
        .output_mode(Mode::Base64Text)
        .progress_callback(log.clone())
        .build()
        .unwrap();

    let output = convert(
        SourceDescriptor::Base64Text(STANDARD.encode(fixture_pdf(FIXTURE_PAGES))),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(output.page_count, Some(14));
    assert_eq!(output.pages.len(), 14);
    assert_eq!(output.payloads.len(), 14);
    assert_eq!(output.stats.rendered_pages, 14);
    assert!(output.payloads.iter().all(|p| p.mode() == Mode::Base64Text));
    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            Stage::Normalizing,
            Stage::Counting,
            Stage::Rendering,
            Stage::Collecting,
            Stage::Done
        ]
    );

    let ws = output.workspace.path().to_path_buf();
    assert!(ws.exists());
    output.workspace.cleanup().unwrap();
    assert!(!ws.exists());
}

#[test]
fn convert_sync_fails_on_page_count_mismatch() {
    let scratch = tempfile::tempdir().unwrap();
    let log = Arc::new(StageLog::default());
    init_tracing();
    let config = ConverterConfig::builder()
        .engine(&STUBS.short)
        .scratch_root(scratch.path())
        .progress_callback(log.clone())
        .build()
        .unwrap();

    let err = convert_sync(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)), &config)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(log.0.lock().unwrap().last(), Some(&Stage::Failed));
}

#[test]
fn convert_sync_without_verification_accepts_short_render() {
    let scratch = tempfile::tempdir().unwrap();
    init_tracing();
    let config = ConverterConfig::builder()
        .engine(&STUBS.short)
        .scratch_root(scratch.path())
        .verify_page_count(false)
        .build()
        .unwrap();

    let output =
        convert_sync(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)), &config).unwrap();
    assert_eq!(output.page_count, Some(14));
    assert_eq!(output.pages.len(), 13);
}

#[tokio::test]
async fn batch_results_follow_input_order() {
    let scratch = tempfile::tempdir().unwrap();
    let config = config_for(&STUBS.clean, scratch.path());
    let sources = vec![
        SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)),
        SourceDescriptor::RawBytes(b"not a pdf".to_vec()),
        SourceDescriptor::BinaryBuffer(fixture_pdf(FIXTURE_PAGES)),
    ];

    let results = convert_batch(sources, &config, 3).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].success());
    assert!(!results[1].success());
    assert!(results[2].success());

    let a = results[0].data().unwrap();
    let c = results[2].data().unwrap();
    assert_ne!(a.workspace, c.workspace);

    let json = serde_json::to_value(&results[1]).unwrap();
    assert_eq!(json["success"], false);
    assert!(json.get("data").is_none());
    assert!(json["message"].as_str().unwrap().contains("startxref"));
}

// ── Real Ghostscript (gated) ─────────────────────────────────────────────────

/// Skip unless E2E_ENABLED is set and Ghostscript is installed.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match gs_engine() {
            Some(gs) => gs,
            None => {
                println!("SKIP: Ghostscript not found (set GS_PATH)");
                return;
            }
        }
    }};
}

fn gs_engine() -> Option<PathBuf> {
    gs_locate::locate_engine().ok()
}

#[test]
fn ghostscript_counts_and_renders_fixture() {
    let gs = e2e_skip_unless_ready!();
    let scratch = tempfile::tempdir().unwrap();
    let converter = Converter::new(config_for(&gs, scratch.path()));

    let pdf = converter
        .write_file(&SourceDescriptor::RawBytes(fixture_pdf(FIXTURE_PAGES)))
        .unwrap();
    let count = converter.get_page_count(&pdf).unwrap();
    assert_eq!(count, 14);

    let pages = converter.convert_pages_checked(&pdf, count).unwrap();
    assert_eq!(pages.len(), 14);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page_number(page), i as u32 + 1);
        let bytes = std::fs::read(page).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n", "{} is not a PNG", page.display());
    }
    println!("Rendered {} pages into {}", pages.len(), pdf.parent().unwrap().display());
}

#[test]
fn ghostscript_rejects_garbage() {
    let gs = e2e_skip_unless_ready!();
    let scratch = tempfile::tempdir().unwrap();
    let converter = Converter::new(config_for(&gs, scratch.path()));

    let bogus = converter
        .write_file(&SourceDescriptor::RawBytes(b"definitely not a pdf".to_vec()))
        .unwrap();
    let result: ConversionResult<u32> = converter.get_page_count(&bogus).into();
    assert!(!result.success());
    assert!(!result.message().unwrap_or("").trim().is_empty());
    println!("Ghostscript said: {:?}", result.message());
}
