//! fwstatus library crate
//!
//! This crate provides the core functionality for the `fwstatus` CLI, a native
//! rendition of a web-flasher status page. It is organized into small modules:
//! `page` (element tree), `capability` (serial detection), `manifest`
//! (lenient manifest model), `source` (HTTP/file fetch), `clipboard`
//! (cross-platform clipboard helper), `copy_button` (the copy-steps button),
//! `controller` (the page controller) and `compare` (`.8xp` comparison). The
//! binary `src/main.rs` calls `fwstatus_lib::run()` to execute the CLI.
//!
//! Public API
//!
//! - `run()`: CLI entrypoint used by the binary.
//!
//! See each module for detailed documentation on functions and behavior.

pub mod capability;
pub mod clipboard;
pub mod compare;
pub mod controller;
pub mod copy_button;
pub mod error;
pub mod manifest;
pub mod page;
pub mod source;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::capability::{Capabilities, SerialSupport};
use crate::clipboard::SystemClipboard;
use crate::controller::{LoadOutcome, PageController};
use crate::copy_button::{CopyConfig, CopyStepsButton, RevertPolicy};
use crate::page::{ElementId, Page};
use crate::source::{FileSource, HttpSource, MANIFEST_PATH, ManifestSource, SourceConfig};

/// Top-level CLI types and runner. Keep `main.rs` thin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the manifest and render the status page
    Status(StatusArgs),
    /// Copy the bootloader steps to the clipboard
    CopySteps {
        /// Delay before the button label reverts
        #[arg(long = "revert-ms", default_value_t = 2000u64)]
        revert_ms: u64,

        /// How overlapping reverts interact
        #[arg(long = "revert-policy", value_enum, default_value_t = RevertPolicy::LastWins)]
        revert_policy: RevertPolicy,
    },
    /// Compare two .8xp files, ignoring the comment field
    #[command(name = "compare-8xp")]
    Compare8xp { left: PathBuf, right: PathBuf },
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[command(flatten)]
    location: Location,

    /// Manifest path relative to the base URL
    #[arg(long = "manifest-path", default_value = MANIFEST_PATH)]
    manifest_path: String,

    /// Serial capability: auto, present, absent
    #[arg(long = "serial", value_enum, default_value_t = SerialSupport::Auto)]
    serial: SerialSupport,

    /// Give up on the fetch after this many seconds (no timeout by default)
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Also print manifest name and flash parts
    #[arg(long = "details", action = ArgAction::SetTrue)]
    details: bool,

    /// Print the page as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Location {
    /// Page URL the manifest is resolved against
    #[arg(long = "base-url")]
    base_url: Option<Url>,

    /// Read the manifest from a local file instead
    #[arg(long = "file")]
    file: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the fwstatus CLI.
///
/// Parses CLI arguments and dispatches to module functions. Errors are printed
/// to stderr and mapped to a non-zero exit code.
///
/// Behavior summary:
/// - `status`: detect serial support, load the manifest and print the page.
///   Exits 1 when the page shows "Manifest missing".
/// - `copy-steps`: click the copy button once and print each label.
/// - `compare-8xp`: exit 0 on match, 1 on mismatch, 2 on unreadable input.
///
/// Example:
///
/// ```no_run
/// # async fn demo() {
/// let code = fwstatus_lib::run().await; // called from src/main.rs
/// # }
/// ```
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut out = std::io::stdout();
    let result = match cli.command {
        Commands::Status(args) => status(args, &mut out).await,
        Commands::CopySteps {
            revert_ms,
            revert_policy,
        } => {
            let config = CopyConfig {
                revert_delay: Duration::from_millis(revert_ms),
                revert_policy,
            };
            copy_steps(config, &mut out).await
        }
        Commands::Compare8xp { left, right } => compare_8xp(&left, &right, &mut out),
    };
    exit_with(result)
}

/// 0 on success, 1 when the command ran but reports failure, 2 on error.
fn exit_status(result: &anyhow::Result<bool>) -> u8 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

fn exit_with(result: anyhow::Result<bool>) -> ExitCode {
    if let Err(e) = &result {
        eprintln!("error: {:#}", e);
    }
    ExitCode::from(exit_status(&result))
}

async fn status(args: StatusArgs, out: &mut impl Write) -> anyhow::Result<bool> {
    let capabilities = Capabilities::detect(args.serial);
    match (args.location.base_url, args.location.file) {
        (Some(base_url), _) => {
            let config = SourceConfig {
                base_url,
                manifest_path: args.manifest_path,
                timeout: args.timeout_secs.map(Duration::from_secs),
            };
            let source = HttpSource::new(&config)?;
            render_status(source, capabilities, args.details, args.json, out).await
        }
        (None, Some(path)) => {
            let source = FileSource::new(path);
            render_status(source, capabilities, args.details, args.json, out).await
        }
        (None, None) => Err(anyhow::anyhow!("either --base-url or --file is required")),
    }
}

async fn render_status<S: ManifestSource>(
    source: S,
    capabilities: Capabilities,
    details: bool,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    debug!(source = %source.describe(), "rendering status page");
    let controller = PageController::attach(
        Page::standard(),
        source,
        SystemClipboard::new(),
        capabilities,
        CopyConfig::default(),
    )?;
    let outcome = controller.start().await;
    let snapshot = controller.page().snapshot();

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
    } else {
        write!(out, "{}", snapshot)?;
    }

    if details && let LoadOutcome::Loaded(summary) = &outcome {
        if let Some(name) = &summary.name {
            writeln!(out, "name             {}", name)?;
        }
        for part in &summary.parts {
            match part.offset {
                Some(offset) => writeln!(out, "part             {} @ 0x{:x}", part.path, offset)?,
                None => writeln!(out, "part             {}", part.path)?,
            }
        }
    }

    Ok(outcome.is_loaded())
}

async fn copy_steps(config: CopyConfig, out: &mut impl Write) -> anyhow::Result<bool> {
    let page = Page::standard();
    let Some(button) = CopyStepsButton::attach(&page, SystemClipboard::new(), config) else {
        return Ok(false);
    };
    let label = || {
        page.element(ElementId::CopySteps)
            .map(|el| el.text)
            .unwrap_or_default()
    };

    let outcome = button.click().await;
    writeln!(out, "{}", label())?;
    // The button owns the clipboard; it must outlive the revert.
    outcome.revert.await?;
    writeln!(out, "{}", label())?;
    Ok(outcome.copied)
}

fn compare_8xp(left: &Path, right: &Path, out: &mut impl Write) -> anyhow::Result<bool> {
    let (comparison, left_len, right_len) =
        compare::compare_files(left, right).context("both files must exist")?;
    writeln!(out, "{}", comparison)?;
    if !comparison.is_match() {
        writeln!(out, "len1={} len2={}", left_len, right_len)?;
    }
    Ok(comparison.is_match())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("fwstatus-cli-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn args(location: Location) -> StatusArgs {
        StatusArgs {
            location,
            manifest_path: MANIFEST_PATH.to_string(),
            serial: SerialSupport::Present,
            timeout_secs: None,
            details: false,
            json: false,
        }
    }

    fn file_args(path: PathBuf) -> StatusArgs {
        args(Location {
            base_url: None,
            file: Some(path),
        })
    }

    fn url_args(base_url: &str) -> StatusArgs {
        args(Location {
            base_url: Some(Url::parse(base_url).unwrap()),
            file: None,
        })
    }

    async fn run_status(args: StatusArgs) -> (anyhow::Result<bool>, String) {
        let mut out = Vec::new();
        let result = status(args, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    const MANIFEST: &[u8] = br#"{
        "name": "Calculator Bridge",
        "version": "1.2.0",
        "builds": [{
            "chipFamily": "ESP32-S3",
            "parts": [{ "path": "firmware.bin", "offset": 65536 }, { "path": "extra.bin" }]
        }]
    }"#;

    #[test]
    fn exit_codes() {
        assert_eq!(exit_status(&Ok(true)), 0);
        assert_eq!(exit_status(&Ok(false)), 1);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("boom"))), 2);
    }

    #[test]
    fn status_needs_exactly_one_location() {
        let cli =
            Cli::try_parse_from(["fwstatus", "status", "--file", "m.json", "--serial", "absent"])
                .unwrap();
        let Commands::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.location.file, Some(PathBuf::from("m.json")));
        assert_eq!(args.serial, SerialSupport::Absent);

        assert!(Cli::try_parse_from(["fwstatus", "status"]).is_err());
        assert!(
            Cli::try_parse_from(["fwstatus", "status", "--file", "m.json", "--base-url", "http://x/"])
                .is_err()
        );
    }

    #[tokio::test]
    async fn status_from_file_succeeds() {
        let path = temp_file("ok.json", MANIFEST);
        let (result, out) = run_status(file_args(path.clone())).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(exit_status(&result), 0);
        assert!(out.contains("fw-version       1.2.0"));
        assert!(out.contains("fw-chip          ESP32-S3"));
        assert!(out.contains("fw-status        Ready"));
        assert!(!out.contains("name "));
    }

    #[tokio::test]
    async fn status_details_lists_name_and_parts() {
        let path = temp_file("details.json", MANIFEST);
        let mut args = file_args(path.clone());
        args.details = true;
        let (result, out) = run_status(args).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(exit_status(&result), 0);
        assert!(out.contains("name             Calculator Bridge"));
        assert!(out.contains("part             firmware.bin @ 0x10000"));
        assert!(out.contains("part             extra.bin\n"));
    }

    #[tokio::test]
    async fn status_json_is_keyed_by_dom_id() {
        let path = temp_file("json.json", MANIFEST);
        let mut args = file_args(path.clone());
        args.json = true;
        args.serial = SerialSupport::Absent;
        let (result, out) = run_status(args).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(exit_status(&result), 0);
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["elements"]["fw-status"]["text"], "Browser unsupported");
        assert_eq!(json["elements"]["browser-warning"]["display"], "block");
    }

    #[tokio::test]
    async fn missing_manifest_file_exits_one() {
        let (result, out) = run_status(file_args("/definitely/not/here/manifest.json".into())).await;
        assert_eq!(exit_status(&result), 1);
        assert!(out.contains("fw-status        Manifest missing [#b45309]"));
    }

    #[tokio::test]
    async fn unusable_base_url_exits_two() {
        // Nothing can be joined onto a cannot-be-a-base URL.
        let (result, out) = run_status(url_args("mailto:flasher@example.com")).await;
        assert_eq!(exit_status(&result), 2);
        assert!(out.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn hung_server_times_out() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/manifest.json")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(b"{}")
            })
            .create_async()
            .await;

        let mut args = url_args(&format!("{}/", server.url()));
        args.timeout_secs = Some(1);
        let (result, out) = run_status(args).await;

        assert_eq!(exit_status(&result), 1);
        assert!(out.contains("Manifest missing"));
    }

    #[test]
    fn compare_exit_codes() {
        let mut program = vec![0u8; 80];
        program[20] = b'A';
        let left = temp_file("left.8xp", &program);
        program[20] = b'B';
        let differs = temp_file("differs.8xp", &program);
        program.truncate(70);
        let shorter = temp_file("shorter.8xp", &program);

        let mut out = Vec::new();
        let result = compare_8xp(&left, &left, &mut out);
        assert_eq!(exit_status(&result), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "MATCH (comment bytes ignored)\n");

        let mut out = Vec::new();
        let result = compare_8xp(&left, &shorter, &mut out);
        assert_eq!(exit_status(&result), 1);
        assert!(String::from_utf8(out).unwrap().ends_with("len1=80 len2=70\n"));

        // Offset 20 lies inside the comment field, so these match.
        let mut out = Vec::new();
        assert_eq!(exit_status(&compare_8xp(&left, &differs, &mut out)), 0);

        program.resize(80, 0);
        program[60] = 0xff;
        let body_differs = temp_file("body.8xp", &program);
        let mut out = Vec::new();
        let result = compare_8xp(&left, &body_differs, &mut out);
        assert_eq!(exit_status(&result), 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "MISMATCH at offset 60: 0x00 vs 0xff\nlen1=80 len2=80\n"
        );

        let mut out = Vec::new();
        let result = compare_8xp(&left, Path::new("/definitely/not/here.8xp"), &mut out);
        assert_eq!(exit_status(&result), 2);
        assert!(out.is_empty());

        for path in [left, differs, shorter, body_differs] {
            std::fs::remove_file(path).unwrap();
        }
    }
}
