//! StickerPack CLI - Inspect a pack directory the way a consumer sees it
//!
//! Commands: validate, query, asset, mime
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when packs are rejected or a request fails

use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use stickerpack_core::{sha256_hex, AssetRouter, DirStore, RouterConfig};

#[derive(Parser)]
#[command(name = "stickerpack-cli")]
#[command(about = "StickerPack CLI - manifest validation and asset routing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the manifest and one subdirectory per pack
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Router config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the manifest and report accepted and rejected packs
    Validate,

    /// Run a metadata or sticker query
    Query { uri: String },

    /// Read an asset and print it base64-encoded
    Asset { uri: String },

    /// Print the MIME type a URI resolves to
    Mime { uri: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn initialize_tracing(log_level: LogLevel) {
    // RUST_LOG wins over the flag when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn failure(error: impl std::fmt::Display) -> ExitCode {
    print_json(&serde_json::json!({
        "success": false,
        "error": error.to_string(),
    }));
    ExitCode::from(2)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_tracing(cli.log_level);

    let config = match &cli.config {
        Some(path) => match RouterConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load config: {}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => RouterConfig::default(),
    };

    let store = DirStore::new(&cli.root).with_manifest_file(config.manifest_file.clone());
    let router = AssetRouter::new(config, store);

    let report = match router.reload() {
        Ok(r) => r,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to load manifest: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Validate => {
            match serde_json::to_value(&report) {
                Ok(value) => print_json(&value),
                Err(e) => return failure(e),
            }
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Query { uri } => match router.query(&uri) {
            Ok(rows) => match serde_json::to_value(&rows) {
                Ok(value) => {
                    print_json(&value);
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e),
            },
            Err(e) => failure(e),
        },

        Commands::Asset { uri } => {
            let mut stream = match router.open_asset(&uri) {
                Ok(s) => s,
                Err(e) => return failure(e),
            };
            let mut data = Vec::new();
            if let Err(e) = stream.read_to_end(&mut data) {
                return failure(e);
            }
            print_json(&serde_json::json!({
                "uri": uri,
                "mime": stream.mime_type(),
                "size": data.len(),
                "sha256": sha256_hex(&data),
                "data_base64": base64::engine::general_purpose::STANDARD.encode(&data),
            }));
            ExitCode::SUCCESS
        }

        Commands::Mime { uri } => match router.mime_type(&uri) {
            Ok(mime) => {
                print_json(&serde_json::json!({ "uri": uri, "mime": mime }));
                ExitCode::SUCCESS
            }
            Err(e) => failure(e),
        },
    }
}
