// Entity resolution: match a surname key against the canonical players.

use keeperbook_core::config::MatcherKind;
use keeperbook_core::model::CanonicalPlayer;

/// Decides whether a canonical player's display name matches a surname key.
pub trait NameMatcher {
    fn matches(&self, surname_key: &str, display_name: &str) -> bool;
}

/// Case-insensitive substring match. "Smith" catches both "Will Smith" and
/// "Dominic Smith".
#[derive(Debug, Clone, Copy, Default)]
pub struct SurnameSubstring;

impl NameMatcher for SurnameSubstring {
    fn matches(&self, surname_key: &str, display_name: &str) -> bool {
        display_name
            .to_lowercase()
            .contains(&surname_key.to_lowercase())
    }
}

/// Case-insensitive equality with one whitespace- or comma-delimited token of
/// the display name. "Cruz" no longer matches "Cruzado".
#[derive(Debug, Clone, Copy, Default)]
pub struct SurnameToken;

impl NameMatcher for SurnameToken {
    fn matches(&self, surname_key: &str, display_name: &str) -> bool {
        let key = surname_key.to_lowercase();
        // Multi-word keys ("De La Cruz") compare against the whole
        // comma-free name instead of single tokens.
        if key.contains(char::is_whitespace) {
            let collapsed = display_name
                .replace(',', " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            return collapsed.contains(&key);
        }
        display_name
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .any(|token| token.to_lowercase() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(CanonicalPlayer),
    /// Two or more candidates in creation order.
    Ambiguous(Vec<CanonicalPlayer>),
    NotFound,
}

/// Stateless resolver over a caller-supplied player snapshot.
pub struct Resolver {
    matcher: Box<dyn NameMatcher + Send + Sync>,
}

impl Resolver {
    pub fn new(matcher: Box<dyn NameMatcher + Send + Sync>) -> Self {
        Self { matcher }
    }

    pub fn from_kind(kind: MatcherKind) -> Self {
        match kind {
            MatcherKind::Substring => Self::new(Box::new(SurnameSubstring)),
            MatcherKind::Token => Self::new(Box::new(SurnameToken)),
        }
    }

    /// Classify `surname_key` against `players`. Never picks among several
    /// candidates.
    pub fn resolve(&self, surname_key: &str, players: &[CanonicalPlayer]) -> Resolution {
        let mut candidates: Vec<CanonicalPlayer> = players
            .iter()
            .filter(|p| self.matcher.matches(surname_key, &p.display_name))
            .cloned()
            .collect();
        candidates.sort_by_key(|p| p.id);

        match candidates.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Unique(candidates.remove(0)),
            _ => Resolution::Ambiguous(candidates),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::from_kind(MatcherKind::default())
    }
}
