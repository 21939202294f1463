use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use log::warn;

use crate::{
    error::CrawlResult,
    text_manipulators::{parse_goals, split_half_time},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueRole {
    Home,
    Away,
}

impl fmt::Display for VenueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VenueRole::Home => "Home",
            VenueRole::Away => "Away",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchResult::Win => "Win",
            MatchResult::Loss => "Loss",
            MatchResult::Draw => "Draw",
        })
    }
}

/// Home and away results from the full-time score.
pub fn derive_result(home_goals: u32, away_goals: u32) -> (MatchResult, MatchResult) {
    match home_goals.cmp(&away_goals) {
        std::cmp::Ordering::Greater => (MatchResult::Win, MatchResult::Loss),
        std::cmp::Ordering::Less => (MatchResult::Loss, MatchResult::Win),
        std::cmp::Ordering::Equal => (MatchResult::Draw, MatchResult::Draw),
    }
}

macro_rules! metrics {
    ($($variant:ident => $column:literal, $label:literal;)+) => {
        /// Closed set of statistics kept per fixture side.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Metric {
            $($variant,)+
        }

        impl Metric {
            pub const ALL: &'static [Metric] = &[$(Metric::$variant,)+];

            pub fn column(self) -> &'static str {
                match self {
                    $(Metric::$variant => $column,)+
                }
            }

            /// Label the statistics widget shows for this metric.
            pub fn site_label(self) -> &'static str {
                match self {
                    $(Metric::$variant => $label,)+
                }
            }

            pub fn from_site_label(label: &str) -> Option<Metric> {
                match label {
                    $($label => Some(Metric::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

metrics! {
    Possession => "possession", "Topla Oynama";
    DuelsWon => "duels_won", "İkili Mücadele Kazanma";
    AerialsWon => "aerials_won", "Hava Topu Kazanma";
    Interceptions => "interceptions", "Pas Arası";
    Offsides => "offsides", "Ofsayt";
    Corners => "corners", "Korner";
    TotalPasses => "total_passes", "Toplam Pas";
    AccuratePasses => "accurate_passes", "İsabetli Pas";
    PassAccuracy => "pass_accuracy", "Pas İsabeti %";
    TotalCrosses => "total_crosses", "Toplam Orta";
    AccurateCrosses => "accurate_crosses", "İsabetli Orta";
    TotalShots => "total_shots", "Toplam Şut";
    ShotsOnTarget => "shots_on_target", "İsabetli Şut";
    ShotsOffTarget => "shots_off_target", "İsabetsiz Şut";
    BlockedShots => "blocked_shots", "Engellenen Şut";
    HitWoodwork => "hit_woodwork", "Direkten Dönen Şut";
    ExpectedGoals => "expected_goals", "Gol Beklentisi (xG)";
    TouchesInOppositionBox => "touches_in_opposition_box", "Rakip Ceza Sahasında Topla Buluşma";
    Clearances => "clearances", "Uzaklaştırma";
    Fouls => "fouls", "Faul";
    YellowCards => "yellow_cards", "Sarı Kart";
    SecondYellowRedCards => "second_yellow_red_cards", "İkinci Sarıdan Kırmızı Kart";
    RedCards => "red_cards", "Kırmızı Kart";
}

/// Full-time goals are authoritative; half-time comes from the digit heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoreline {
    pub home_full_time: u32,
    pub away_full_time: u32,
    pub home_half_time: u32,
    pub away_half_time: u32,
}

impl Scoreline {
    pub fn from_text(home_full_time: &str, away_full_time: &str, half_time: &str) -> CrawlResult<Self> {
        let (home_ht, away_ht) = split_half_time(half_time);
        let score = Self {
            home_full_time: parse_goals(home_full_time)?,
            away_full_time: parse_goals(away_full_time)?,
            home_half_time: home_ht.to_digit(10).unwrap_or(0),
            away_half_time: away_ht.to_digit(10).unwrap_or(0),
        };
        if score.half_time_exceeds_full_time() {
            warn!(
                "Half-time {:?} does not fit full-time {}-{}",
                half_time, score.home_full_time, score.away_full_time
            );
        }
        Ok(score)
    }

    pub fn half_time_exceeds_full_time(&self) -> bool {
        self.home_half_time > self.home_full_time || self.away_half_time > self.away_full_time
    }
}

/// Home and away values for one statistic label, as read off the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    pub label: String,
    pub home: String,
    pub away: String,
}

/// One team's side of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub opponent: String,
    pub venue: VenueRole,
    pub full_time_goals_for: u32,
    pub half_time_goals_for: u32,
    pub full_time_goals_against: u32,
    pub half_time_goals_against: u32,
    pub result: MatchResult,
    /// Values keyed by widget label. May hold labels outside [`Metric`].
    pub metrics: BTreeMap<String, String>,
}

impl MatchRecord {
    /// Builds the home and away records of a fixture, each paired with its team name.
    pub fn pair(
        home_team: &str,
        away_team: &str,
        date: NaiveDate,
        score: &Scoreline,
        stats: &[StatLine],
    ) -> [(String, MatchRecord); 2] {
        let (home_result, away_result) = derive_result(score.home_full_time, score.away_full_time);
        let mut home_metrics = BTreeMap::new();
        let mut away_metrics = BTreeMap::new();
        for line in stats {
            home_metrics.insert(line.label.clone(), line.home.clone());
            away_metrics.insert(line.label.clone(), line.away.clone());
        }
        let home = MatchRecord {
            date,
            opponent: away_team.to_string(),
            venue: VenueRole::Home,
            full_time_goals_for: score.home_full_time,
            half_time_goals_for: score.home_half_time,
            full_time_goals_against: score.away_full_time,
            half_time_goals_against: score.away_half_time,
            result: home_result,
            metrics: home_metrics,
        };
        let away = MatchRecord {
            date,
            opponent: home_team.to_string(),
            venue: VenueRole::Away,
            full_time_goals_for: score.away_full_time,
            half_time_goals_for: score.away_half_time,
            full_time_goals_against: score.home_full_time,
            half_time_goals_against: score.home_half_time,
            result: away_result,
            metrics: away_metrics,
        };
        [(home_team.to_string(), home), (away_team.to_string(), away)]
    }

    pub fn metric(&self, metric: Metric) -> &str {
        self.metrics
            .get(metric.site_label())
            .map(String::as_str)
            .unwrap_or("0")
    }

    /// Labels that have no column in the schema.
    pub fn unknown_metrics(&self) -> impl Iterator<Item = &str> {
        self.metrics
            .keys()
            .map(String::as_str)
            .filter(|label| Metric::from_site_label(label).is_none())
    }
}
