//! Payroll Engine CLI
//!
//! Replays a CSV file of payroll commands against an engine wired to a
//! simulated market and prints the final employee ledger (or the event
//! journal with `--events`).
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > ledger.csv
//! cargo run -- commands.csv --price 2500 --fill 99 --events > events.csv
//! ```
//!
//! # Options
//!
//! - `--hr <addr>`: HR authority address (default 1)
//! - `--price <decimal>`: accounting-unit price of one native unit (default 2000)
//! - `--fill <percent>`: exchange fill relative to the oracle price (default 100)
//! - `--treasury <decimal>`: stable funds available for payouts (default 1000000000)
//! - `--events`: print the event journal instead of the ledger
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use payroll_engine::decimal::{parse_units, STABLE_DECIMALS};
use payroll_engine::{Address, EngineConfig, EngineError, PayrollEngine, Result, SimulatedMarket};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

/// Decimal places of the simulated price feed.
const FEED_DECIMALS: u32 = 8;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Parsed command-line options.
struct Options {
    input_path: String,
    hr: Address,
    price: u128,
    fill_percent: u32,
    treasury_funds: u128,
    events: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut input_path = None;
    let mut options = Options {
        input_path: String::new(),
        hr: Address(1),
        price: 2_000 * 10u128.pow(FEED_DECIMALS),
        fill_percent: 100,
        treasury_funds: 1_000_000_000 * 10u128.pow(STABLE_DECIMALS),
        events: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--events" => options.events = true,
            "--hr" | "--price" | "--fill" | "--treasury" => {
                let value = iter
                    .next()
                    .ok_or_else(|| EngineError::InvalidArgument(format!("{} needs a value", arg)))?;
                let invalid = || EngineError::InvalidArgument(format!("{} {}", arg, value));
                match arg.as_str() {
                    "--hr" => options.hr = Address(value.parse().map_err(|_| invalid())?),
                    "--price" => {
                        options.price = parse_units(value, FEED_DECIMALS)
                            .filter(|p| *p > 0)
                            .ok_or_else(invalid)?
                    }
                    "--fill" => options.fill_percent = value.parse().map_err(|_| invalid())?,
                    _ => {
                        options.treasury_funds =
                            parse_units(value, STABLE_DECIMALS).ok_or_else(invalid)?
                    }
                }
            }
            flag if flag.starts_with("--") => {
                return Err(EngineError::InvalidArgument(flag.to_string()));
            }
            path => input_path = Some(path.to_string()),
        }
    }

    options.input_path = input_path.ok_or(EngineError::MissingArgument)?;
    Ok(options)
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(&args)?;

    let file = File::open(&options.input_path)?;
    let reader = BufReader::new(file);

    let config = EngineConfig::with_hr(options.hr);
    let price = i128::try_from(options.price)
        .map_err(|_| EngineError::InvalidArgument("--price out of range".to_string()))?;
    let market = SimulatedMarket::new(config.treasury, price, FEED_DECIMALS);
    market.fund_stable(config.treasury, options.treasury_funds);
    market.set_fill_percent(options.fill_percent);

    let engine = PayrollEngine::new(config, market.collaborators());
    engine.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if options.events {
        engine.write_events(handle)?;
    } else {
        engine.write_output(handle)?;
    }

    Ok(())
}
