// Domain records shared by the import pipeline, the valuation engine and the
// roster accountant.

use serde::{Deserialize, Serialize};

pub type PlayerId = i64;
pub type TeamId = i64;

/// Owner assigned to teams created by an import. Someone has to fix it by hand.
pub const PLACEHOLDER_OWNER: &str = "TBD";

/// MLB team recorded for players first seen in an auction sheet.
pub const UNKNOWN_MLB_TEAM: &str = "UNK";

/// One (team, position, player, salary) tuple pulled out of a wide-format
/// auction sheet. Carries no identity beyond its place in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAuctionEntry {
    pub year: i32,
    pub team_label: String,
    pub position: String,
    pub player_label: String,
    pub salary: u32,
}

/// A real baseball player. Created once, never deleted; only the optional
/// fields get enriched later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPlayer {
    /// Assigned by the store on creation. Ascending ids follow creation order.
    pub id: PlayerId,
    pub display_name: String,
    pub position: Option<String>,
    pub mlb_team: Option<String>,
    /// Team currently holding the player on its roster, if any.
    #[serde(default)]
    pub roster_team_id: Option<TeamId>,
}

/// Fields needed to create a [`CanonicalPlayer`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    /// Stored as given. Imports pass the sheet label trimmed and with internal
    /// whitespace collapsed, not the raw cell text.
    pub display_name: String,
    pub position: Option<String>,
    pub mlb_team: Option<String>,
}

/// A fantasy team in the league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTeam {
    pub id: TeamId,
    pub name: String,
    pub owner: String,
}

impl CanonicalTeam {
    /// Whether the owner is still the import placeholder.
    pub fn needs_owner(&self) -> bool {
        self.owner == PLACEHOLDER_OWNER
    }
}

/// Salary paid for a player by a team in one season's auction.
///
/// Keyed by (player_id, team_id, year); stores keep at most one per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub year: i32,
    pub salary: u32,
    pub contract_type: String,
}

/// What an observation upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationWrite {
    Created,
    Updated,
}

/// A sheet entry whose player reference matched several canonical players.
/// Held back for a human to decide; never written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityRecord {
    pub year: i32,
    pub team_label: String,
    pub raw_name: String,
    pub position: String,
    pub salary: u32,
    /// Matching players in creation order. Always two or more.
    pub candidate_player_ids: Vec<PlayerId>,
}

/// A committed contract on a team's current roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub salary: u32,
    /// Free-form label such as `auction_keeper`, `in_season` or `rotation`.
    pub contract_type: String,
    pub year: i32,
    pub years_remaining: u32,
    #[serde(default)]
    pub rotation_round: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A contract joined with the player it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosteredContract {
    pub player_name: String,
    pub position: Option<String>,
    pub contract: Contract,
}

/// A projected auction value supplied from an outside source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedValue {
    pub player_id: PlayerId,
    pub year: i32,
    pub value: f64,
    pub source: String,
}

/// A bid recorded during a live auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBid {
    pub id: i64,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub amount: u32,
    pub is_winning: bool,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_owner_flags_team() {
        let team = CanonicalTeam {
            id: 1,
            name: "Mudcats".into(),
            owner: PLACEHOLDER_OWNER.into(),
        };
        assert!(team.needs_owner());

        let owned = CanonicalTeam {
            owner: "Pat".into(),
            ..team
        };
        assert!(!owned.needs_owner());
    }

    #[test]
    fn player_deserializes_without_roster_team() {
        let json = r#"{"id":3,"display_name":"Mike Trout","position":"OF","mlb_team":"LAA"}"#;
        let player: CanonicalPlayer = serde_json::from_str(json).unwrap();
        assert_eq!(player.id, 3);
        assert!(player.roster_team_id.is_none());
    }
}
