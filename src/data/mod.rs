/// Data layer: fetching, parsing, and aggregation.
///
/// Architecture:
/// ```text
///   catalog page ──► catalog  ──► RangeCatalog (label → CSV URL)
///                                      │
///   traffic CSV  ──► loader   ──► TrafficTable
///                                      │ distinct Trecho codes
///   roads CSV    ──► roads    ──► RoadCatalog (label → code)
///                                      │
///                    filter   ──► AggregatedTable (per interval)
/// ```
///
/// Every download goes through the [`fetch::Fetch`] trait.

pub mod catalog;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
pub mod roads;
