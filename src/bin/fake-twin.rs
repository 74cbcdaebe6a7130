//! Command-line interface for fake-twin
//! Reads a stream, flips `k` and `l` in randomly chosen blocks of reflections and
//! writes the result to standard output.
//!
//! Usage:
//!   fake-twin < input.stream > output.stream
//!   fake-twin input.stream --seed 42 > output.stream
//!   fake-twin input.stream --force-flip true --index-parsing strict

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use fake_twin::twin::{self, StepOptions};
use fake_twin_config::{ConfigError, Loader, TwinConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal};
use tracing_subscriber::EnvFilter;

const LOCAL_CONFIG: &str = "fake-twin.toml";

fn main() {
    let matches = Command::new("fake-twin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fakes twinned data by swapping k and l in randomly chosen blocks of reflections")
        .arg(
            Arg::new("input")
                .help("Stream to read (default: standard input, also '-')")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the defaults and ./fake-twin.toml"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the per-block coin, for reproducible output")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("force-flip")
                .long("force-flip")
                .help("Decide every block the same way instead of tossing a coin")
                .value_parser(value_parser!(bool)),
        )
        .arg(
            Arg::new("malformed-lines")
                .long("malformed-lines")
                .help("Lines in a flipped block without a usable h k l")
                .value_parser(["error", "pass-through", "zero-fill"]),
        )
        .arg(
            Arg::new("index-parsing")
                .long("index-parsing")
                .help("How h k l tokens are read")
                .value_parser(["lenient", "strict"]),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more to standard error (repeat for more detail)")
                .action(ArgAction::Count),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    let options = StepOptions::try_from(&config).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    let input = matches.get_one::<String>("input").map(String::as_str);
    let reader = open_input(input).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", input.unwrap_or("-"), e);
        std::process::exit(1);
    });

    let coin = twin::coin::from_config(&config.coin);
    let stdout = io::stdout();
    let writer = BufWriter::new(stdout.lock());
    if let Err(e) = twin::run(reader, writer, coin, options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Honour `RUST_LOG` when set, otherwise map `-v` counts onto a level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Defaults, then `fake-twin.toml` in the working directory if present, then
/// `--config`, then individual flags.
fn load_config(matches: &ArgMatches) -> Result<TwinConfig, ConfigError> {
    let mut loader = Loader::new().with_optional_file(LOCAL_CONFIG);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        loader = loader.set_override("coin.seed", *seed)?;
    }
    if let Some(force) = matches.get_one::<bool>("force-flip") {
        loader = loader.set_override("coin.force", *force)?;
    }
    if let Some(policy) = matches.get_one::<String>("malformed-lines") {
        loader = loader.set_override("transform.malformed_lines", policy.as_str())?;
    }
    if let Some(parsing) = matches.get_one::<String>("index-parsing") {
        loader = loader.set_override("transform.index_parsing", parsing.as_str())?;
    }
    loader.build()
}

fn open_input(path: Option<&str>) -> io::Result<Box<dyn BufRead>> {
    match path {
        None | Some("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
    }
}
