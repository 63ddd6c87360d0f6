// Auction bid recommendation: blend a player's historical auction salaries
// with an externally supplied projected dollar value.

use keeperbook_core::model::PlayerId;
use keeperbook_core::store::{CanonicalStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Weight of the historical baseline in a blended bid, in tenths.
const HISTORY_WEIGHT_TENTHS: f64 = 6.0;
/// Weight of the projected value in a blended bid, in tenths.
const PROJECTION_WEIGHT_TENTHS: f64 = 4.0;

/// Sample size at which history alone earns high confidence.
const HIGH_CONFIDENCE_SAMPLES: usize = 3;

/// Suggested range bounds as percentages of the recommended bid.
const RANGE_LOW_PERCENT: u64 = 85;
const RANGE_HIGH_PERCENT: u64 = 115;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Summary statistics of past auction salaries. All zero without history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoricalRange {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuggestedRange {
    pub low: u32,
    pub high: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub recommended_bid: u32,
    pub sample_size: usize,
    pub range: HistoricalRange,
    pub suggested_range: SuggestedRange,
    pub confidence: Confidence,
    /// Explanation lines: history first, then projection.
    pub reasoning: Vec<String>,
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

fn summarize(salaries: &[u32]) -> Option<HistoricalRange> {
    let min = *salaries.iter().min()?;
    let max = *salaries.iter().max()?;
    let n = salaries.len();
    let mean = salaries.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;

    let mut sorted = salaries.to_vec();
    sorted.sort_unstable();
    let median = if n % 2 == 1 {
        f64::from(sorted[n / 2])
    } else {
        (f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0
    };

    Some(HistoricalRange {
        min,
        max,
        mean,
        median,
    })
}

/// Floor a dollar amount into a bid. Negative values bid nothing.
fn to_bid(value: f64) -> u32 {
    // `as` saturates at u32::MAX.
    value.floor().max(0.0) as u32
}

fn suggested_range(bid: u32) -> SuggestedRange {
    let bid = u64::from(bid);
    SuggestedRange {
        low: (bid * RANGE_LOW_PERCENT / 100) as u32,
        high: (bid * RANGE_HIGH_PERCENT / 100).min(u64::from(u32::MAX)) as u32,
    }
}

/// Recommend a bid from past salaries and an optional projected value.
///
/// The historical baseline is the median truncated to whole dollars. With a
/// projection the bid is `floor(0.6 * baseline + 0.4 * projected)`; with only
/// a projection it is `floor(projected)` at medium confidence. A non-finite
/// projection is ignored.
pub fn recommend(historical_salaries: &[u32], projected_value: Option<f64>) -> ValuationResult {
    let projected = match projected_value {
        Some(v) if !v.is_finite() => {
            warn!("ignoring non-finite projected value {}", v);
            None
        }
        other => other,
    };

    let mut reasoning = Vec::new();
    let history = summarize(historical_salaries);

    let (mut bid, mut confidence) = match &history {
        Some(range) => {
            reasoning.push(format!(
                "Based on {} historical auction(s): ${}-${} (avg: ${:.0})",
                historical_salaries.len(),
                range.min,
                range.max,
                range.mean
            ));
            let confidence = if historical_salaries.len() >= HIGH_CONFIDENCE_SAMPLES {
                Confidence::High
            } else {
                Confidence::Medium
            };
            (range.median.trunc(), confidence)
        }
        None => {
            reasoning.push("No historical auction data available".to_string());
            (0.0, Confidence::Low)
        }
    };

    if let Some(pv) = projected {
        if history.is_some() {
            bid = (HISTORY_WEIGHT_TENTHS * bid + PROJECTION_WEIGHT_TENTHS * pv) / 10.0;
        } else {
            bid = pv;
            confidence = Confidence::Medium;
        }
        reasoning.push(format!("Projected value: ${:.0}", pv));
    }

    let recommended_bid = to_bid(bid);
    ValuationResult {
        recommended_bid,
        sample_size: historical_salaries.len(),
        range: history.unwrap_or_default(),
        suggested_range: suggested_range(recommended_bid),
        confidence,
        reasoning,
    }
}

/// Recommend a bid for a stored player from every salary recorded for them.
pub fn recommend_for_player<S: CanonicalStore>(
    store: &S,
    player_id: PlayerId,
    projected_value: Option<f64>,
) -> Result<ValuationResult, StoreError> {
    let salaries: Vec<u32> = store
        .observations_for_player(player_id)?
        .iter()
        .map(|o| o.salary)
        .collect();
    Ok(recommend(&salaries, projected_value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use keeperbook_core::model::{HistoricalObservation, NewPlayer};
    use keeperbook_core::store::MemoryStore;

    #[test]
    fn blends_history_with_projection() {
        let result = recommend(&[10, 20, 30], Some(50.0));
        assert_eq!(result.recommended_bid, 32);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.suggested_range, SuggestedRange { low: 27, high: 36 });
        assert_eq!(
            result.reasoning,
            vec![
                "Based on 3 historical auction(s): $10-$30 (avg: $20)".to_string(),
                "Projected value: $50".to_string(),
            ]
        );
    }

    #[test]
    fn no_data_bids_zero() {
        let result = recommend(&[], None);
        assert_eq!(result.recommended_bid, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.suggested_range, SuggestedRange { low: 0, high: 0 });
        assert_eq!(result.range, HistoricalRange::default());
        assert_eq!(result.reasoning, vec!["No historical auction data available"]);
    }

    #[test]
    fn history_only_uses_truncated_median() {
        let result = recommend(&[7, 4], None);
        // median 5.5 truncates to 5
        assert_eq!(result.range.median, 5.5);
        assert_eq!(result.recommended_bid, 5);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.suggested_range, SuggestedRange { low: 4, high: 5 });
    }

    #[test]
    fn median_resists_outlier() {
        let result = recommend(&[3, 4, 60, 5], None);
        assert_eq!(result.range.median, 4.5);
        assert_eq!(result.range.min, 3);
        assert_eq!(result.range.max, 60);
        assert_eq!(result.recommended_bid, 4);
    }

    #[test]
    fn projection_only_is_medium_confidence() {
        let result = recommend(&[], Some(18.9));
        assert_eq!(result.recommended_bid, 18);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.reasoning.len(), 2);
        assert_eq!(result.reasoning[0], "No historical auction data available");
        assert_eq!(result.reasoning[1], "Projected value: $19");
    }

    #[test]
    fn negative_projection_clamps_to_zero() {
        let result = recommend(&[], Some(-4.0));
        assert_eq!(result.recommended_bid, 0);
        assert_eq!(result.suggested_range, SuggestedRange { low: 0, high: 0 });
    }

    #[test]
    fn non_finite_projection_is_ignored() {
        let result = recommend(&[10], Some(f64::NAN));
        assert_eq!(result.recommended_bid, 10);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.reasoning.len(), 1);
    }

    #[test]
    fn confidence_serializes_lowercase() {
        let json = serde_json::to_string(&Confidence::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn recommend_for_player_reads_store_history() {
        let mut store = MemoryStore::new();
        let player = store
            .create_player(NewPlayer {
                display_name: "Aaron Judge".into(),
                position: None,
                mlb_team: None,
            })
            .unwrap();
        let team = store.create_team("Mudcats", "Pat").unwrap();
        for (year, salary) in [(2022, 10), (2023, 20), (2024, 30)] {
            store
                .upsert_observation(&HistoricalObservation {
                    player_id: player.id,
                    team_id: team.id,
                    year,
                    salary,
                    contract_type: "auction".into(),
                })
                .unwrap();
        }

        let result = recommend_for_player(&store, player.id, Some(50.0)).unwrap();
        assert_eq!(result.recommended_bid, 32);
        assert_eq!(result.sample_size, 3);
    }
}
