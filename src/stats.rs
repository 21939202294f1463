use std::time::Duration;

use log::{info, warn};

use crate::{
    config::CrawlTuning,
    error::CrawlResult,
    page::{PageAdapter, Role},
    record::StatLine,
};

/// Panels of the statistics widget, each holding a different group of metrics.
pub const STATS_TABS: u8 = 5;

/// Opens the statistics view of the focused detail tab and reads every panel.
/// A panel that never renders is logged and contributes nothing.
pub async fn collect_stats<P: PageAdapter>(
    page: &mut P,
    tuning: &CrawlTuning,
) -> CrawlResult<Vec<StatLine>> {
    info!("Opening statistics...");
    let button = page.locate(Role::StatsButton, tuning.element_wait).await?;
    page.click(&button).await?;
    page.locate(Role::StatsWidget, tuning.element_wait).await?;

    let mut lines = Vec::new();
    for position in 1..=STATS_TABS {
        match read_tab(page, position, tuning.tab_wait).await {
            Ok(tab) => lines.extend(tab),
            Err(e) => warn!("Statistics tab {position} unavailable: {e}"),
        }
    }
    Ok(lines)
}

async fn read_tab<P: PageAdapter>(
    page: &mut P,
    position: u8,
    wait: Duration,
) -> CrawlResult<Vec<StatLine>> {
    let tab = page.locate(Role::StatsTab(position), wait).await?;
    page.click(&tab).await?;
    let table = page.locate(Role::StatsTable, wait).await?;

    let mut labels = Vec::new();
    for element in page.locate_within(&table, Role::StatLabel).await? {
        labels.push(page.text(&element).await?);
    }
    let mut values = Vec::new();
    for element in page.locate_within(&table, Role::StatValue).await? {
        values.push(page.text(&element).await?);
    }
    Ok(pair_cells(&labels, &values))
}

/// Each non-empty label takes the next two value cells: home first, then away.
pub fn pair_cells(labels: &[String], values: &[String]) -> Vec<StatLine> {
    let mut lines = Vec::new();
    let mut cells = values.chunks_exact(2);
    for label in labels.iter().map(|label| label.trim()) {
        if label.is_empty() {
            continue;
        }
        let Some([home, away]) = cells.next() else {
            break;
        };
        lines.push(StatLine {
            label: label.to_string(),
            home: home.trim().to_string(),
            away: away.trim().to_string(),
        });
    }
    lines
}
