// Valuation engine: bid recommendations from auction history and projections.

pub mod bid;
