mod calculator;
mod chain;
mod config;
mod price;
mod report;

use anyhow::Result;
use clap::Parser;
use colored::*;
use log::{debug, info};

use calculator::{period_bounds, resolve_period, PaymentCalculator, PaymentParams};
use chain::ChainClient;
use config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "franchise-calc",
    version,
    about = "Franchise payment calculator for PPS mining contracts",
    long_about = "Computes the franchise payment per GH/s for one completed \
difficulty period, netting estimated electricity expenses against 100%-PPS \
mining income. Block data comes from a local bitcoind; the BTC/USD rate is \
fetched from bitcoincharts unless supplied."
)]
struct Cli {
    /// PPS rate in percent
    #[arg(short = 'p', long = "pps-rate")]
    pps_rate: Option<f64>,

    /// Difficulty period index (default: last completed period)
    #[arg(short = 'c', long = "cycle", allow_negative_numbers = true)]
    cycle: Option<i64>,

    /// Capacity in GH/s
    #[arg(short = 'g', long = "ghps")]
    ghps: Option<f64>,

    /// Expense factor in USD per second per GH/s
    #[arg(short = 'e', long = "expense-factor")]
    expense_factor: Option<f64>,

    /// BTC/USD exchange rate (0 = fetch from the price feed)
    #[arg(short = 'y', long = "exchange-rate", allow_negative_numbers = true)]
    exchange_rate: Option<f64>,

    /// JSON settings file; flags given here override it
    #[arg(long)]
    config: Option<String>,

    /// bitcoind JSON-RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// RPC basic-auth user
    #[arg(long)]
    rpc_user: Option<String>,

    /// RPC basic-auth password
    #[arg(long)]
    rpc_pass: Option<String>,

    /// Weighted-prices feed URL
    #[arg(long)]
    price_url: Option<String>,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Quiet mode (warnings only)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // getopt-style usage behavior: help and bad input both exit 2
        Err(err) => {
            let _ = err.print();
            std::process::exit(2);
        }
    };

    if cli.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else if cli.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Warn)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), err);
            eprintln!("run with --help for usage");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&settings) {
        eprintln!("{} {:#}", "error:".bright_red().bold(), err);
        std::process::exit(1);
    }
}

/// Settings file (if any) under CLI flags, then validation.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    if let Some(pps_rate) = cli.pps_rate {
        settings.pps_rate = pps_rate;
    }
    if let Some(cycle) = cli.cycle {
        settings.period = Some(cycle);
    }
    if let Some(ghps) = cli.ghps {
        settings.ghps = ghps;
    }
    if let Some(expense_factor) = cli.expense_factor {
        settings.expense_factor = expense_factor;
    }
    if let Some(exchange_rate) = cli.exchange_rate {
        settings.exchange_rate = exchange_rate;
    }
    if let Some(rpc_url) = &cli.rpc_url {
        settings.rpc_url = rpc_url.clone();
    }
    if let Some(rpc_user) = &cli.rpc_user {
        settings.rpc_user = Some(rpc_user.clone());
    }
    if let Some(rpc_pass) = &cli.rpc_pass {
        settings.rpc_pass = Some(rpc_pass.clone());
    }
    if let Some(price_url) = &cli.price_url {
        settings.price_url = price_url.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn run(settings: &Settings) -> Result<()> {
    debug!("settings: {:?}", settings);

    info!("connecting to node at {}", settings.rpc_url);
    let chain = ChainClient::connect(
        &settings.rpc_url,
        settings.rpc_user.as_deref(),
        settings.rpc_pass.as_deref(),
    )?;

    let tip = chain.block_count()?;
    let latest = {
        let hash = chain.block_hash(tip as i64)?;
        chain.block_by_hash(&hash)?
    };
    info!("chain tip {} ({})", tip, latest.hash);

    let exchange_rate = if settings.exchange_rate > 0.0 {
        settings.exchange_rate
    } else {
        price::fetch_weighted_prices(&settings.price_url)?.exchange_rate()
    };
    info!("exchange rate {:.3} USD/BTC", exchange_rate);

    let calculator = PaymentCalculator::new(PaymentParams {
        pps_rate: settings.pps_rate,
        ghps: settings.ghps,
        expense_factor: settings.expense_factor,
        exchange_rate,
    })?;

    let period = resolve_period(settings.period, tip);
    let (start, end) = period_bounds(period);
    debug!("evaluating period {} (blocks {}-{})", period, start, end);

    let block0 = chain.block_at_height(start, tip, &latest)?;
    let block1 = chain.block_at_height(end, tip, &latest)?;

    let period_report = calculator.compute_payment(period, &block0, &block1)?;
    report::print_report(&period_report);
    Ok(())
}
