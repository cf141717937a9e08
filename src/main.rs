use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

use pkgspec::{ConditionSet, ResolutionConfig, ResolutionHost, resolve, resolve_format};

const METADATA_CACHE_SIZE: u64 = 1024;

#[derive(Parser, Debug)]
#[command(name = "pkgspec")]
#[command(version, about = "Resolves a module specifier the way a package-aware loader would")]
struct Cli {
    /// The specifier to resolve (`pkg/sub`, `#alias`, `./file.js`...)
    specifier: String,

    /// The importing file, as a path or a URL
    importer: String,

    /// Active condition; may be repeated, order matters with caller priority
    #[arg(short = 'C', long = "condition", value_name = "NAME")]
    conditions: Vec<String>,

    /// JSON file holding resolution options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also print how the resolved module should be loaded
    #[arg(long)]
    format: bool,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn importer_url(importer: &str) -> Result<Url, String> {
    if let Ok(url) = Url::parse(importer) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    // Single-letter schemes are Windows drive letters
    let path = std::path::absolute(importer)
        .map_err(|err| format!("Invalid importer path {importer}: {err}"))?;

    Url::from_file_path(&path)
        .map_err(|()| format!("Invalid importer path {}", path.display()))
}

fn load_config(path: Option<&PathBuf>) -> Result<ResolutionConfig, String> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;

            ResolutionConfig::from_json_str(&content)
                .map_err(|err| format!("Invalid config {}: {err}", path.display()))?
        }
        None => ResolutionConfig::default(),
    };

    config.host = ResolutionHost::cached(METADATA_CACHE_SIZE);

    Ok(config)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_ref())?;
    let importer = importer_url(&cli.importer)?;
    let conditions = ConditionSet::new(cli.conditions.iter().cloned());

    let resolved = resolve(&cli.specifier, &importer, &conditions, &config)
        .map_err(|err| format!("{}: {err}", err.kind()))?;

    println!("{resolved}");

    if cli.format {
        let format = resolve_format(&resolved, &config)
            .map_err(|err| format!("{}: {err}", err.kind()))?;

        println!("format: {format}");
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
