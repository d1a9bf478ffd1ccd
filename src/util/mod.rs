use crate::models::EpisodeSummary;
use std::cmp::Ordering;

/// Episodes of one season, in episode-number order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SeasonGroup {
    /// `None` collects episodes without a season.
    pub season: Option<String>,
    pub episodes: Vec<EpisodeSummary>,
}

impl SeasonGroup {
    pub fn label(&self) -> String {
        match &self.season {
            Some(s) => format!("Season {s}"),
            None => "No season".to_string(),
        }
    }
}

/// Numeric when both sides parse, numbers before text, else lexicographic.
pub(crate) fn cmp_loose_number(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn season_key(ep: &EpisodeSummary) -> Option<String> {
    ep.season
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Group the episode list by season: seasons ascending, the no-season group
/// last, episodes sorted by number within each group.
pub(crate) fn group_by_season(episodes: &[EpisodeSummary]) -> Vec<SeasonGroup> {
    let mut groups: Vec<SeasonGroup> = Vec::new();
    for ep in episodes {
        let key = season_key(ep);
        match groups.iter_mut().find(|g| g.season == key) {
            Some(g) => g.episodes.push(ep.clone()),
            None => groups.push(SeasonGroup {
                season: key,
                episodes: vec![ep.clone()],
            }),
        }
    }

    groups.sort_by(|a, b| match (&a.season, &b.season) {
        (Some(x), Some(y)) => cmp_loose_number(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    for g in &mut groups {
        g.episodes.sort_by(|a, b| {
            cmp_loose_number(&a.episode_number, &b.episode_number)
                .then_with(|| a.episode_name.cmp(&b.episode_name))
        });
    }
    groups
}
