// Roster and budget accounting over a team's committed contracts.

use std::collections::BTreeMap;

use keeperbook_core::model::{CanonicalTeam, Contract, RosteredContract, TeamId};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddValidation {
    pub valid: bool,
    /// Every failed check, in check order. Empty when valid.
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerLine {
    pub name: String,
    pub position: Option<String>,
    pub salary: u32,
    pub contract_type: String,
    pub years_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamInfo {
    pub team_name: String,
    pub owner: String,
    pub total_salary: u64,
    /// Negative when the team is over budget.
    pub remaining_budget: i64,
    pub budget_percentage_used: f64,
    pub roster_size: usize,
    /// Contract counts keyed by contract-type label.
    pub contract_breakdown: BTreeMap<String, usize>,
    pub players: Vec<PlayerLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuctionBudget {
    pub total_budget: u32,
    pub committed_salary: u64,
    pub remaining_budget: i64,
    pub can_bid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub player_name: String,
    pub salary: u32,
    pub years_remaining: u32,
    pub expires_year: i64,
    pub contract_type: String,
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

/// Budget checks against one league-wide auction budget.
#[derive(Debug, Clone, Copy)]
pub struct RosterAccountant {
    league_budget: u32,
}

fn committed<'a>(salaries: impl IntoIterator<Item = &'a Contract>) -> u64 {
    salaries.into_iter().map(|c| u64::from(c.salary)).sum()
}

impl RosterAccountant {
    pub fn new(league_budget: u32) -> Self {
        Self { league_budget }
    }

    pub fn league_budget(&self) -> u32 {
        self.league_budget
    }

    fn remaining(&self, committed: u64) -> i64 {
        i64::from(self.league_budget) - committed as i64
    }

    /// Check whether `adding_team` may sign a player at `proposed_salary`.
    ///
    /// `player_roster` is the team currently holding the player, if any.
    /// Both the budget and the roster check always run; a total equal to the
    /// budget is allowed.
    pub fn validate_add(
        &self,
        existing_contracts: &[Contract],
        adding_team: TeamId,
        player_roster: Option<&CanonicalTeam>,
        proposed_salary: u32,
    ) -> AddValidation {
        let mut reasons = Vec::new();

        let total = committed(existing_contracts) + u64::from(proposed_salary);
        if total > u64::from(self.league_budget) {
            reasons.push(format!(
                "Would exceed budget: ${} > ${}",
                total, self.league_budget
            ));
        }

        if let Some(holder) = player_roster {
            if holder.id != adding_team {
                reasons.push(format!("Player is on {}'s roster", holder.name));
            }
        }

        AddValidation {
            valid: reasons.is_empty(),
            reasons,
        }
    }

    pub fn calculate_team_info(
        &self,
        team: &CanonicalTeam,
        contracts: &[RosteredContract],
    ) -> TeamInfo {
        let total_salary = committed(contracts.iter().map(|c| &c.contract));

        let mut contract_breakdown = BTreeMap::new();
        for line in contracts {
            *contract_breakdown
                .entry(line.contract.contract_type.clone())
                .or_insert(0) += 1;
        }

        let players = contracts
            .iter()
            .map(|line| PlayerLine {
                name: line.player_name.clone(),
                position: line.position.clone(),
                salary: line.contract.salary,
                contract_type: line.contract.contract_type.clone(),
                years_remaining: line.contract.years_remaining,
            })
            .collect();

        TeamInfo {
            team_name: team.name.clone(),
            owner: team.owner.clone(),
            total_salary,
            remaining_budget: self.remaining(total_salary),
            budget_percentage_used: total_salary as f64 / f64::from(self.league_budget) * 100.0,
            roster_size: contracts.len(),
            contract_breakdown,
            players,
        }
    }

    pub fn remaining_auction_budget(&self, contracts: &[Contract]) -> AuctionBudget {
        let committed_salary = committed(contracts);
        let remaining_budget = self.remaining(committed_salary);
        AuctionBudget {
            total_budget: self.league_budget,
            committed_salary,
            remaining_budget,
            can_bid: remaining_budget > 0,
        }
    }
}

/// Contracts ordered by the season they expire (`year + years_remaining`).
/// Ties keep their input order.
pub fn contract_timeline(contracts: &[RosteredContract]) -> Vec<TimelineEntry> {
    let mut timeline: Vec<TimelineEntry> = contracts
        .iter()
        .map(|line| TimelineEntry {
            player_name: line.player_name.clone(),
            salary: line.contract.salary,
            years_remaining: line.contract.years_remaining,
            expires_year: i64::from(line.contract.year) + i64::from(line.contract.years_remaining),
            contract_type: line.contract.contract_type.clone(),
        })
        .collect();
    timeline.sort_by_key(|entry| entry.expires_year);
    timeline
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
