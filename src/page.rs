use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::{
    error::{CrawlError, CrawlResult},
    webdriver::{Locator, WebDriverSession},
};

/// How often a bounded wait re-checks the remote page.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Remote reference to a located element. Only valid within the page load
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowId(pub String);

/// Every place on the fixture list or the detail view the crawler reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    FixtureStatus,
    HomeTeam,
    AwayTeam,
    MatchDate,
    HomeFullTime,
    AwayFullTime,
    HalfTime,
    StatsButton,
    StatsWidget,
    /// One of the statistic panels, numbered from 1.
    StatsTab(u8),
    StatsTable,
    StatLabel,
    StatValue,
}

/// Selector table for the live site. Layout drift is fixed here and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct SiteLayout;

const HEADER: &str = "body > div.page-container.page-container--legacy-link-banner-visible \
                      > div.above-content.clearfix > div.p0c-soccer-match-details-header > div";
const SCORE_BOX: &str = "/html/body/div[4]/div[1]/div[1]/div/div[2]/div[2]";
const STATS_WIDGET: &str = "#widget-match-live-stats-1";

impl SiteLayout {
    pub fn locator(&self, role: Role) -> Locator {
        match role {
            Role::FixtureStatus => Locator::css(".p0c-competition-match-list__status"),
            Role::HomeTeam => Locator::css(format!(
                "{HEADER} > div.p0c-soccer-match-details-header__row > \
                 a.p0c-soccer-match-details-header__team-name.p0c-soccer-match-details-header__team-name--home"
            )),
            Role::AwayTeam => Locator::css(format!(
                "{HEADER} > div.p0c-soccer-match-details-header__row > \
                 a.p0c-soccer-match-details-header__team-name.p0c-soccer-match-details-header__team-name--away"
            )),
            Role::MatchDate => Locator::css(format!(
                "{HEADER} > div.p0c-soccer-match-details-header__info-container > p:nth-child(2) > span"
            )),
            Role::HomeFullTime => Locator::xpath(format!("{SCORE_BOX}/div[1]/span[1]")),
            Role::AwayFullTime => Locator::xpath(format!("{SCORE_BOX}/div[1]/span[2]")),
            Role::HalfTime => Locator::xpath(format!("{SCORE_BOX}/div[2]")),
            Role::StatsButton => Locator::css(
                "body > div.page-container.page-container--legacy-link-banner-visible \
                 > div.above-content.clearfix > div.widget-match-detail-submenu > div \
                 > a.widget-match-detail-submenu__icon.widget-match-detail-submenu__icon--stats",
            ),
            Role::StatsWidget => Locator::css(STATS_WIDGET),
            Role::StatsTab(position) => Locator::xpath(format!(
                "//*[@id=\"widget-match-live-stats-1\"]/div/div/div/div/ul/li[{position}]/a"
            )),
            Role::StatsTable => Locator::css(format!(
                "{STATS_WIDGET} > div > div > div > ul > li.Opta-On > div > table"
            )),
            Role::StatLabel => Locator::css(".Opta-Stats-Bars-Text"),
            Role::StatValue => Locator::css(".Opta-Outer"),
        }
    }
}

/// What the crawler is allowed to do with a browsing session. Waits are
/// bounded; a role that never shows up is a [`CrawlError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait PageAdapter {
    async fn navigate(&mut self, url: &str) -> CrawlResult<()>;

    async fn locate(&mut self, role: Role, wait: Duration) -> CrawlResult<ElementId>;

    /// All matches for `role` in document order; waits until at least one exists.
    async fn locate_all(&mut self, role: Role, wait: Duration) -> CrawlResult<Vec<ElementId>>;

    /// Matches for `role` under `parent`, without waiting.
    async fn locate_within(&mut self, parent: &ElementId, role: Role) -> CrawlResult<Vec<ElementId>>;

    async fn click(&mut self, element: &ElementId) -> CrawlResult<()>;

    async fn text(&mut self, element: &ElementId) -> CrawlResult<String>;

    async fn current_window(&mut self) -> CrawlResult<WindowId>;

    async fn window_handles(&mut self) -> CrawlResult<Vec<WindowId>>;

    async fn switch_to_window(&mut self, window: &WindowId) -> CrawlResult<()>;

    /// Closes the focused tab.
    async fn close_window(&mut self) -> CrawlResult<()>;

    async fn delete_cookies(&mut self) -> CrawlResult<()>;

    async fn quit(self) -> CrawlResult<()>
    where
        Self: Sized;

    async fn read_text(&mut self, role: Role, wait: Duration) -> CrawlResult<String> {
        let element = self.locate(role, wait).await?;
        Ok(self.text(&element).await?.trim().to_string())
    }

    /// Waits for a tab other than `known` and returns it.
    async fn wait_for_new_window(
        &mut self,
        known: &WindowId,
        wait: Duration,
    ) -> CrawlResult<Option<WindowId>> {
        let deadline = Instant::now() + wait;
        loop {
            let handles = self.window_handles().await?;
            if handles.len() > 1 {
                if let Some(window) = handles.into_iter().find(|handle| handle != known) {
                    return Ok(Some(window));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// [`PageAdapter`] over a live WebDriver session.
pub struct SitePage {
    session: WebDriverSession,
    layout: SiteLayout,
}

impl SitePage {
    pub fn new(session: WebDriverSession, layout: SiteLayout) -> Self {
        Self { session, layout }
    }
}

impl PageAdapter for SitePage {
    async fn navigate(&mut self, url: &str) -> CrawlResult<()> {
        self.session.navigate(url).await
    }

    async fn locate(&mut self, role: Role, wait: Duration) -> CrawlResult<ElementId> {
        self.session
            .wait_for_element(&self.layout.locator(role), wait)
            .await?
            .ok_or(CrawlError::NotFound { role })
    }

    async fn locate_all(&mut self, role: Role, wait: Duration) -> CrawlResult<Vec<ElementId>> {
        let elements = self
            .session
            .wait_for_elements(&self.layout.locator(role), wait)
            .await?;
        if elements.is_empty() {
            return Err(CrawlError::NotFound { role });
        }
        Ok(elements)
    }

    async fn locate_within(&mut self, parent: &ElementId, role: Role) -> CrawlResult<Vec<ElementId>> {
        self.session
            .find_elements_from(parent, &self.layout.locator(role))
            .await
    }

    async fn click(&mut self, element: &ElementId) -> CrawlResult<()> {
        self.session.click(element).await
    }

    async fn text(&mut self, element: &ElementId) -> CrawlResult<String> {
        self.session.text(element).await
    }

    async fn current_window(&mut self) -> CrawlResult<WindowId> {
        self.session.window().await
    }

    async fn window_handles(&mut self) -> CrawlResult<Vec<WindowId>> {
        self.session.window_handles().await
    }

    async fn switch_to_window(&mut self, window: &WindowId) -> CrawlResult<()> {
        self.session.switch_to_window(window).await
    }

    async fn close_window(&mut self) -> CrawlResult<()> {
        self.session.close_window().await
    }

    async fn delete_cookies(&mut self) -> CrawlResult<()> {
        self.session.delete_all_cookies().await
    }

    async fn quit(self) -> CrawlResult<()> {
        self.session.quit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_tabs_are_numbered_from_one() {
        let layout = SiteLayout;
        let first = layout.locator(Role::StatsTab(1));
        assert_eq!(first.using, "xpath");
        assert!(first.value.ends_with("/ul/li[1]/a"));
        assert!(layout.locator(Role::StatsTab(5)).value.ends_with("/ul/li[5]/a"));
    }

    #[test]
    fn team_names_share_the_header_prefix() {
        let layout = SiteLayout;
        let home = layout.locator(Role::HomeTeam);
        let away = layout.locator(Role::AwayTeam);
        assert_eq!(home.using, "css selector");
        assert!(home.value.starts_with("body > div.page-container"));
        assert!(home.value.ends_with("team-name--home"));
        assert!(away.value.ends_with("team-name--away"));
    }

    #[test]
    fn score_roles_are_xpaths_into_the_score_box() {
        let layout = SiteLayout;
        assert_eq!(
            layout.locator(Role::HalfTime).value,
            "/html/body/div[4]/div[1]/div[1]/div/div[2]/div[2]/div[2]"
        );
        assert_eq!(
            layout.locator(Role::AwayFullTime).value,
            "/html/body/div[4]/div[1]/div[1]/div/div[2]/div[2]/div[1]/span[2]"
        );
    }
}
