//! brickprice - cached catalog lookups and price summaries
//!
//! Loads the on-disk cache, answers one command through the marketplace API
//! where the cache cannot, and saves the cache again before exiting.

use std::error::Error;
use std::fs;
use std::time::Duration;

use clap::Parser;

use brickprice::cache::CacheManager;
use brickprice::catalog::Catalog;
use brickprice::cli::{Action, Cli, RunConfig};
use brickprice::data::{CatalogSource, Condition, HttpSource, PriceSummary, QuoteType, Throttle};
use brickprice::ids::parse_id_list;
use brickprice::pricing::PriceAggregator;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = RunConfig::from_cli(&cli)?;

    let mut cache = match &config.cache_dir {
        Some(dir) => CacheManager::with_dir(dir.clone(), config.cache.clone()),
        None => CacheManager::new(config.cache.clone())
            .ok_or("could not determine a cache directory")?,
    };
    log::debug!("Using cache directory {}", cache.cache_dir().display());
    cache.load_all_stores();

    let mut source = HttpSource::new(config.base_url.as_str())
        .with_throttle(Throttle::new(config.max_delay))
        .with_timeout(REQUEST_TIMEOUT);
    if let Some(token) = &config.token {
        source = source.with_token(token.as_str());
    }

    let mut catalog = Catalog::new(cache, source, PriceAggregator::new(config.min_samples));
    let outcome = execute(&mut catalog, &config.action);

    // Save whatever was fetched, even when the command failed
    catalog.close()?;
    outcome
}

fn execute<S: CatalogSource>(
    catalog: &mut Catalog<S>,
    action: &Action,
) -> Result<(), Box<dyn Error>> {
    match action {
        Action::Set(id) => {
            let report = catalog.set_report(id)?;
            print!("{}", report);
        }
        Action::Price { kind, id, color } => {
            let summary = catalog.price_summary(*kind, id, *color)?;
            print_summary(&summary);
        }
        Action::Batch { file, dedup } => {
            let text = fs::read_to_string(file)?;
            run_batch(catalog, &text, *dedup);
        }
        Action::Msrp { id, price } => {
            catalog.record_msrp(id, *price);
            println!("{}: MSRP {}", id, price);
        }
    }
    Ok(())
}

/// Prints one tab-separated row per set, skipping sets that fail
fn run_batch<S: CatalogSource>(catalog: &mut Catalog<S>, text: &str, dedup: bool) {
    let ids = parse_id_list(text, dedup);
    let mut header_printed = false;
    let mut failed = 0;

    for id in &ids {
        match catalog.set_report(id) {
            Ok(report) => {
                let record = report.to_record();
                if !header_printed {
                    let names: Vec<&str> = record.iter().map(|(name, _)| *name).collect();
                    println!("{}", names.join("\t"));
                    header_printed = true;
                }
                let values: Vec<String> = record.into_iter().map(|(_, value)| value).collect();
                println!("{}", values.join("\t"));
            }
            Err(e) if e.is_rate_limit() => {
                log::error!("Stopping batch at {}: {}", id, e);
                break;
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        log::warn!("{} of {} sets could not be reported", failed, ids.len());
    }
}

fn print_summary(summary: &PriceSummary) {
    println!("{:<5} {:<6} {:>12} {:>6} {:>12}", "cond", "type", "avg", "qty", "median");
    for condition in [Condition::New, Condition::Used] {
        for quote_type in [QuoteType::Sold, QuoteType::Stock] {
            let stats = summary.stats(condition, quote_type);
            let median = stats
                .median_price
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<5} {:<6} {:>12} {:>6} {:>12}",
                condition.code(),
                quote_type.as_str(),
                stats.avg_price.to_string(),
                stats.quantity,
                median
            );
        }
    }
}
