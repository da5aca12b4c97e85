//! Sprint burndown: per-day series merging, reconciliation and caching.
//!
//! [`BurndownSeriesBuilder`] reads day-indexed histories through the
//! collaborator traits, [`MergedSeries`] aligns and reconciles them into
//! [`DayRecord`]s, and [`Burndown`] holds the resulting curves. Results are
//! cached per [`BurndownKey`].

pub mod builder;
pub mod cache;
pub mod series;

pub use builder::BurndownSeriesBuilder;
pub use cache::{BurndownCache, BurndownKey, EvictionPolicy, MemoryBurndownCache};
pub use series::{Burndown, DayRecord, DaySample, MergedSeries};
