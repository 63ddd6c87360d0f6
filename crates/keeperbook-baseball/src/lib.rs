// Library root: auction-sheet import, bid valuation, roster accounting and
// keeper analysis over a keeperbook canonical store.

pub mod analysis;
pub mod import;
pub mod roster;
pub mod valuation;
