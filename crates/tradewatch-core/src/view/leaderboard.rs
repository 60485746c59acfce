// ── Leaderboard rows ──

use serde::Serialize;

use tradewatch_api::models::{Page, Protocol, TraderSummary};
use tradewatch_api::traders::TraderRef;

use super::order::reorder_by_reference;

/// Display-ready leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// 1-based position in the full leaderboard (page offset included).
    pub rank: u64,
    pub account: String,
    pub protocol: Protocol,
    pub pnl: f64,
    pub roi: f64,
    pub win_rate: f64,
    pub total_trade: u32,
    pub is_favourite: bool,
}

impl LeaderboardRow {
    pub fn trader(&self) -> TraderRef {
        TraderRef {
            protocol: self.protocol,
            account: self.account.clone(),
        }
    }
}

/// Build rows for one leaderboard page, flagging favourites.
pub fn leaderboard_rows(page: &Page<TraderSummary>, favourites: &[TraderRef]) -> Vec<LeaderboardRow> {
    let offset = u64::from(page.meta.offset);
    page.data
        .iter()
        .zip(1..)
        .map(|(summary, position)| {
            let trader = TraderRef {
                protocol: summary.protocol,
                account: summary.account.clone(),
            };
            LeaderboardRow {
                rank: offset + position,
                account: summary.account.clone(),
                protocol: summary.protocol,
                pnl: summary.pnl,
                roi: summary.roi,
                win_rate: summary.win_rate.unwrap_or(0.0),
                total_trade: summary.total_trade,
                is_favourite: favourites.contains(&trader),
            }
        })
        .collect()
}

/// Move favourites to the top, in the order they were favourited.
pub fn favourites_first(rows: Vec<LeaderboardRow>, favourites: &[TraderRef]) -> Vec<LeaderboardRow> {
    reorder_by_reference(rows, favourites, LeaderboardRow::trader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tradewatch_api::models::PageMeta;

    fn summary(account: &str, pnl: f64) -> TraderSummary {
        TraderSummary {
            account: account.into(),
            protocol: Protocol::Gmx,
            pnl,
            roi: 0.0,
            win_rate: None,
            total_trade: 1,
            total_volume: 0.0,
            last_trade_at: None,
        }
    }

    fn page() -> Page<TraderSummary> {
        Page {
            data: vec![summary("0x1", 30.0), summary("0x2", 20.0), summary("0x3", 10.0)],
            meta: PageMeta {
                total: 100,
                limit: 3,
                offset: 20,
            },
        }
    }

    fn fav(account: &str) -> TraderRef {
        TraderRef {
            protocol: Protocol::Gmx,
            account: account.into(),
        }
    }

    #[test]
    fn ranks_include_page_offset() {
        let rows = leaderboard_rows(&page(), &[]);
        let ranks: Vec<u64> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![21, 22, 23]);
        assert!(rows.iter().all(|r| r.win_rate.abs() < f64::EPSILON));
    }

    #[test]
    fn favourites_are_flagged_and_pinned() {
        let favourites = [fav("0x3"), fav("0x9")];
        let rows = favourites_first(leaderboard_rows(&page(), &favourites), &favourites);
        let accounts: Vec<&str> = rows.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(accounts, vec!["0x3", "0x1", "0x2"]);
        assert!(rows[0].is_favourite);
        assert_eq!(rows[0].rank, 23);
        assert!(!rows[1].is_favourite);
    }

    #[test]
    fn favourites_match_protocol_too() {
        let other = TraderRef {
            protocol: Protocol::Kwenta,
            account: "0x1".into(),
        };
        let rows = leaderboard_rows(&page(), &[other]);
        assert!(rows.iter().all(|r| !r.is_favourite));
    }
}
