//! Report rendering.

use chrono::{LocalResult, TimeZone, Utc};
use colored::*;

use crate::calculator::PeriodReport;

fn utc(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0) {
        LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("@{}", ts),
    }
}

fn row(label: &str, value: String) {
    println!("  {:<36} {}", label.bright_black(), value);
}

/// Print the multi-line payment report to stdout.
pub fn print_report(r: &PeriodReport) {
    println!();
    println!(
        "{} {} {} {}",
        "Difficulty period".bright_white().bold(),
        r.period.to_string().bright_cyan().bold(),
        format!("({}-{})", r.start_height, r.end_height).white(),
        format!("@ difficulty={:.0}", r.difficulty).bright_black(),
    );
    println!(
        "{} {} {}",
        "Duration".bright_white().bold(),
        format!("{} seconds", r.duration_secs).white(),
        format!(
            "(from {} [{}] to {} [{}])",
            r.start_time,
            utc(r.start_time),
            r.end_time,
            utc(r.end_time)
        )
        .bright_black(),
    );
    println!();

    row(
        "Gross mining income 100PPS per GH:",
        format!("{:>14.8} BTC", r.gross_income_btc).white().to_string(),
    );
    row(
        &format!("Expenses at e={:.2e} in USD per GH:", r.expense_factor),
        format!("{:>14.8} USD", r.expenses_usd).white().to_string(),
    );
    row(
        "Exchange rate USD/BTC:",
        format!("{:>9.3}", r.exchange_rate).white().to_string(),
    );
    row(
        "Expenses in BTC per GH:",
        format!("{:>14.8} BTC", r.expenses_btc).white().to_string(),
    );
    row(
        "Net earnings 100PPS per GH:",
        format!("{:>14.8} BTC", r.net_income_btc).white().to_string(),
    );
    row(
        &format!("Franchise earnings {:>3.0}PPS per GH:", r.pps_rate),
        format!("{:>14.8} BTC", r.payment_per_gh_btc).white().to_string(),
    );

    let total = format!("{:>10.4} BTC", r.payment_total_btc);
    let total = if r.payment_total_btc < 0.0 {
        total.bright_red().bold()
    } else {
        total.bright_green().bold()
    };
    row(
        &format!("Franchise payment for {:.0} GH:", r.ghps),
        total.to_string(),
    );
    println!();
}
