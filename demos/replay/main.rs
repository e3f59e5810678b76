mod utils;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use lp_range_simulation::{
    optimize::range_search::{
        average_best_width, search_ranges, RangeSearchConfig, DEFAULT_MAX_STEPS,
    },
    protocol::{state::ProtocolSim, uniswap_v3::replay::replay},
    scenario::Scenario,
};

#[derive(Parser)]
struct Cli {
    /// Scenario JSON with pool snapshot, ticks and events
    #[arg(short, long, env = "SCENARIO_PATH", default_value = "demos/replay/scenario.json")]
    scenario: PathBuf,
    /// Where to write the range search outcomes
    #[arg(short, long, env = "RESULTS_PATH", default_value = "range_results.json")]
    results: PathBuf,
    /// Token1 deposit for the range search in whole tokens, e.g. "1.5"; overrides the scenario
    #[arg(short, long, env = "DEPOSIT")]
    deposit: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    utils::setup_tracing();
    // Parse command-line arguments into a Cli struct
    let cli = Cli::parse();

    let scenario = Scenario::from_file(&cli.scenario)
        .with_context(|| format!("loading {}", cli.scenario.display()))?;
    let initial = scenario.build_state()?;
    let events = scenario.decode_events()?;

    let mut state = initial.clone();
    let summary = replay(&mut state, &events)?;

    println!(
        "Replayed {} events ({} mints, {} burns, {} swaps, {} diverging from chain)",
        events.len(),
        summary.mints,
        summary.burns,
        summary.swaps,
        summary.divergent_swaps
    );
    println!(
        "Final state: sqrt_price={} tick={} liquidity={}",
        state.sqrt_price(),
        state.tick(),
        state.liquidity()
    );
    if let (Some(token0), Some(token1)) = (&scenario.token0, &scenario.token1) {
        println!(
            "Spot price {}/{}: {}",
            token0.symbol,
            token1.symbol,
            state.spot_price(token0, token1)?
        );
        println!(
            "Fees charged: {} {} / {} {}",
            token0.from_base_units(summary.fees_0)?,
            token0.symbol,
            token1.from_base_units(summary.fees_1)?,
            token1.symbol
        );
    }
    for (index, fees) in state.fee_ledger().iter() {
        if !fees.fee_growth_0_inside.is_zero() || !fees.fee_growth_1_inside.is_zero() {
            println!(
                "tick {index:>8}: fee growth 0 = {}, fee growth 1 = {}",
                fees.fee_growth_0_inside, fees.fee_growth_1_inside
            );
        }
    }

    let mut range_search = scenario.range_search.clone();
    if let Some(deposit) = &cli.deposit {
        let token1 = scenario
            .token1
            .as_ref()
            .context("a deposit in whole tokens requires token1 in the scenario")?;
        let amount1 = token1.to_base_units(deposit)?;
        range_search = Some(match range_search {
            Some(config) => RangeSearchConfig { amount1, ..config },
            None => RangeSearchConfig { amount1, max_steps: DEFAULT_MAX_STEPS },
        });
    }

    if let Some(config) = &range_search {
        let result = search_ranges(Arc::new(initial), Arc::new(events), config).await?;
        if let Some(best) = result.best() {
            println!(
                "Best range [{}, {}] (width {}): {:.4}% vs holding",
                best.tick_lower, best.tick_upper, best.width, best.value_change_pct
            );
        }
        if let Some(width) = average_best_width(std::slice::from_ref(&result)) {
            println!("Average best width: {width}");
        }
        fs::write(&cli.results, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("writing {}", cli.results.display()))?;
        println!("Range outcomes written to {}", cli.results.display());
    }
    Ok(())
}
