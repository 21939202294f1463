use dotenv::dotenv;
use fixture_crawler::{RunOutcome, config::CrawlConfig, run_season_job};

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = CrawlConfig::new().inspect_err(|e| error!("Bad configuration: {e:#}"))?;
    // Each completed season is followed by a fresh run against the previous one.
    loop {
        let outcome = run_season_job(&config)
            .await
            .inspect_err(|e| error!("Crawl aborted: {e:#}"))?;
        match outcome {
            RunOutcome::Restart => info!("Starting the next season..."),
            RunOutcome::Finished => {
                info!("Terminal season complete. Nothing left to crawl.");
                break;
            }
            RunOutcome::Paused => {
                info!("Paused until the scheduled run.");
                break;
            }
            RunOutcome::Halted => {
                warn!("Season did not roll over; the next run will retry.");
                break;
            }
        }
    }
    Ok(())
}
