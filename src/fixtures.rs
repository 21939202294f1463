use std::time::Duration;

use log::info;

use crate::{
    error::CrawlResult,
    page::{ElementId, PageAdapter, Role},
};

/// One entry of the rendered fixture list. Its position in the list is the
/// only thing that survives a reload; the element itself must be re-resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureHandle {
    pub element: ElementId,
}

/// Fixture entries of the loaded competition page, in document order.
pub async fn list_fixtures<P: PageAdapter>(
    page: &mut P,
    wait: Duration,
) -> CrawlResult<Vec<FixtureHandle>> {
    info!("Looking for fixtures...");
    let elements = page.locate_all(Role::FixtureStatus, wait).await?;
    info!("Found {} fixtures", elements.len());
    Ok(elements
        .into_iter()
        .map(|element| FixtureHandle { element })
        .collect())
}
