use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use magick_wand::config::env::EnvOverrides;
use magick_wand::config::merged::LoaderConfig;
use magick_wand::config::settings::Settings;
use magick_wand::resource::limits::ResourceLimits;
use magick_wand::version::{self, VersionReport};
use magick_wand::{Result, WandError};

const USAGE: &str = "\
Usage: magick_wand [--config <settings.yaml>] [--formats [PATTERN]] [--limits] [--json]
  Load the MagickWand library and report its version, build and limits.

Environment:
  MAGICK_HOME                 ImageMagick install root searched first
  WAND_MAGICK_LIBRARY_SUFFIX  extra library name suffixes, ';'-separated
  MAGICK_WAND_SETTINGS        settings file used when --config is not given
  RUST_LOG                    log filter (default: warn)";

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    formats: Option<String>,
    limits: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> std::result::Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config requires a path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--formats" => {
                let pattern = iter.next_if(|next| !next.starts_with("--"));
                options.formats = Some(pattern.cloned().unwrap_or_else(|| "*".to_string()));
            }
            "--limits" => options.limits = true,
            "--json" => options.json = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(options)
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct Report {
    library: Option<String>,
    #[serde(flatten)]
    version: VersionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    formats: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<BTreeMap<&'static str, u64>>,
}

fn loader_config(options: &Options) -> Result<LoaderConfig> {
    let env = EnvOverrides::from_process_env();
    let settings = match &options.config {
        Some(path) => Settings::from_file(path).map_err(|e| {
            WandError::config(format!("Failed to load settings from {}: {e}", path.display()))
        })?,
        None => magick_wand::config::load_settings(&env)?,
    };
    Ok(LoaderConfig::new(&settings, &env))
}

fn collect(options: &Options) -> Result<Report> {
    let state = magick_wand::initialize(loader_config(options)?)?;

    let formats = match &options.formats {
        Some(pattern) => Some(version::formats(&state, pattern)?),
        None => None,
    };
    let limits = if options.limits {
        let limits = ResourceLimits::new(&state)?;
        Some(limits.all().into_iter().map(|(l, v)| (l.name(), v)).collect())
    } else {
        None
    };

    Ok(Report {
        library: state.library_path().map(str::to_string),
        version: VersionReport::query(&state)?,
        formats,
        limits,
    })
}

fn print_text(report: &Report) {
    let v = &report.version;
    println!("Version:      {}", v.version.text);
    println!("Library:      {}", report.library.as_deref().unwrap_or("<in-process>"));
    println!("Release date: {}", v.release_date);
    println!("Quantum:      Q{} (range {})", v.quantum_depth, v.quantum_range);
    println!("Features:     {}", v.features.join(" "));
    println!("Delegates:    {}", v.delegates.join(" "));
    println!("Capabilities: {}", v.capabilities.join(" "));
    if let Some(formats) = &report.formats {
        println!("Formats:      {}", formats.join(" "));
    }
    if let Some(limits) = &report.limits {
        println!("Limits:");
        for (name, value) in limits {
            println!("  {name:<12} {value}");
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("magick_wand {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let options = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("ERROR: {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    init_logging();

    let report = match collect(&options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("ERROR: Failed to serialize report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_text(&report);
    }

    ExitCode::SUCCESS
}
