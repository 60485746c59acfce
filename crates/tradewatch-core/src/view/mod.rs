//! Derived view-model builders.
//!
//! Pure functions from cached query data and store state to display-ready
//! values. Missing fields fall back to documented defaults.

mod leaderboard;
mod merge;
mod order;
mod series;
pub mod units;

pub use leaderboard::{LeaderboardRow, favourites_first, leaderboard_rows};
pub use merge::{InstrumentMultiplier, collect_overrides, merge_multiplier_overrides, setting_multipliers};
pub use order::{ordered_copy_wallets, reorder_by_reference};
pub use series::{ChartPoint, cumulative_points, pnl_points, time_series_points};
pub use units::{Units, UnitsError};
