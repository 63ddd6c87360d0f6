// Keeper analysis over imported auction history: who was kept, how their
// salaries moved, what each team spent, and which names need a human.

use std::collections::{BTreeMap, HashMap};

use keeperbook_core::model::{
    CanonicalPlayer, CanonicalTeam, HistoricalObservation, PlayerId, TeamId,
};
use keeperbook_core::store::{CanonicalStore, StoreError};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A player bought by the same team in more than one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeeperCandidate {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub first_year: i32,
    pub last_year: i32,
    pub years: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryChange {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_name: String,
    pub first_year: i32,
    pub first_salary: u32,
    pub last_year: i32,
    pub last_salary: u32,
    pub change: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSpending {
    pub year: i32,
    pub players: usize,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSpending {
    pub team_id: TeamId,
    pub team_name: String,
    /// One entry per season, ascending.
    pub years: Vec<YearSpending>,
}

/// A display name shared by several canonical players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateName {
    pub name: String,
    pub player_ids: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub keeper_candidates: Vec<KeeperCandidate>,
    pub salary_changes: Vec<SalaryChange>,
    pub duplicate_names: Vec<DuplicateName>,
    pub team_spending: Vec<TeamSpending>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Names<'a> {
    players: HashMap<PlayerId, &'a str>,
    teams: HashMap<TeamId, &'a str>,
}

impl<'a> Names<'a> {
    fn new(players: &'a [CanonicalPlayer], teams: &'a [CanonicalTeam]) -> Self {
        Self {
            players: players.iter().map(|p| (p.id, p.display_name.as_str())).collect(),
            teams: teams.iter().map(|t| (t.id, t.name.as_str())).collect(),
        }
    }

    fn player(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("player #{id}"))
    }

    fn team(&self, id: TeamId) -> String {
        self.teams
            .get(&id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("team #{id}"))
    }
}

/// (year, salary) history per (player, team), each sorted by year.
fn stints(observations: &[HistoricalObservation]) -> BTreeMap<(PlayerId, TeamId), Vec<(i32, u32)>> {
    let mut grouped: BTreeMap<(PlayerId, TeamId), Vec<(i32, u32)>> = BTreeMap::new();
    for obs in observations {
        grouped
            .entry((obs.player_id, obs.team_id))
            .or_default()
            .push((obs.year, obs.salary));
    }
    for history in grouped.values_mut() {
        history.sort_unstable();
    }
    grouped
}

// ---------------------------------------------------------------------------
// Analyses
// ---------------------------------------------------------------------------

/// (player, team) pairs seen in more than one season, most seasons first.
pub fn keeper_candidates(
    observations: &[HistoricalObservation],
    players: &[CanonicalPlayer],
    teams: &[CanonicalTeam],
) -> Vec<KeeperCandidate> {
    let names = Names::new(players, teams);
    let mut keepers: Vec<KeeperCandidate> = stints(observations)
        .into_iter()
        .filter(|(_, history)| history.len() > 1)
        .map(|((player_id, team_id), history)| KeeperCandidate {
            player_id,
            player_name: names.player(player_id),
            team_id,
            team_name: names.team(team_id),
            first_year: history[0].0,
            last_year: history[history.len() - 1].0,
            years: history.len(),
        })
        .collect();
    // Stable sort keeps (player, team) order among equal counts.
    keepers.sort_by(|a, b| b.years.cmp(&a.years));
    keepers
}

/// Keepers whose first and last salary with a team differ, largest move
/// first.
pub fn salary_changes(
    observations: &[HistoricalObservation],
    players: &[CanonicalPlayer],
    teams: &[CanonicalTeam],
) -> Vec<SalaryChange> {
    let names = Names::new(players, teams);
    let mut changes: Vec<SalaryChange> = stints(observations)
        .into_iter()
        .filter(|(_, history)| history.len() > 1)
        .filter_map(|((player_id, team_id), history)| {
            let (first_year, first_salary) = history[0];
            let (last_year, last_salary) = history[history.len() - 1];
            (first_salary != last_salary).then(|| SalaryChange {
                player_id,
                player_name: names.player(player_id),
                team_name: names.team(team_id),
                first_year,
                first_salary,
                last_year,
                last_salary,
                change: i64::from(last_salary) - i64::from(first_salary),
            })
        })
        .collect();
    changes.sort_by(|a, b| b.change.abs().cmp(&a.change.abs()));
    changes
}

/// Per-team player counts and salary totals by season, teams by name.
pub fn team_spending(
    observations: &[HistoricalObservation],
    teams: &[CanonicalTeam],
) -> Vec<TeamSpending> {
    let mut by_team: HashMap<TeamId, BTreeMap<i32, YearSpending>> = HashMap::new();
    for obs in observations {
        let year = by_team
            .entry(obs.team_id)
            .or_default()
            .entry(obs.year)
            .or_insert(YearSpending {
                year: obs.year,
                players: 0,
                total: 0,
            });
        year.players += 1;
        year.total += u64::from(obs.salary);
    }

    let mut sorted: Vec<&CanonicalTeam> = teams.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
        .into_iter()
        .map(|team| TeamSpending {
            team_id: team.id,
            team_name: team.name.clone(),
            years: by_team
                .remove(&team.id)
                .map(|years| years.into_values().collect())
                .unwrap_or_default(),
        })
        .collect()
}

/// Display names held by more than one canonical player, alphabetically.
pub fn duplicate_names(players: &[CanonicalPlayer]) -> Vec<DuplicateName> {
    let mut by_name: BTreeMap<&str, Vec<PlayerId>> = BTreeMap::new();
    for player in players {
        by_name
            .entry(player.display_name.as_str())
            .or_default()
            .push(player.id);
    }
    by_name
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, mut player_ids)| {
            player_ids.sort_unstable();
            DuplicateName {
                name: name.to_string(),
                player_ids,
            }
        })
        .collect()
}

/// Run every analysis against the store's current contents.
pub fn analyze<S: CanonicalStore>(store: &S) -> Result<AnalysisReport, StoreError> {
    let observations = store.observations()?;
    let players = store.players()?;
    let teams = store.teams()?;

    Ok(AnalysisReport {
        keeper_candidates: keeper_candidates(&observations, &players, &teams),
        salary_changes: salary_changes(&observations, &players, &teams),
        duplicate_names: duplicate_names(&players),
        team_spending: team_spending(&observations, &teams),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
