// Trader analytics endpoints
//
// Leaderboards, trader profiles, position history and PnL charts.
// All are read-only and keyed by protocol + account.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::endpoint::{Endpoint, Method};
use crate::error::Error;
use crate::models::{
    Page, PnlSeries, Position, PositionStatus, Protocol, TimeFrame, TraderProfile, TraderSummary,
};

// ── Params ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub protocol: Protocol,
    pub time_frame: TimeFrame,
    /// Field to sort by (`"pnl"`, `"roi"`, `"winRate"`).
    pub sort_by: String,
    pub limit: u32,
    pub offset: u32,
}

impl Default for LeaderboardParams {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            time_frame: TimeFrame::default(),
            sort_by: "pnl".into(),
            limit: 20,
            offset: 0,
        }
    }
}

/// A trader on one protocol. Also used for favourites in local state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraderRef {
    pub protocol: Protocol,
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionsParams {
    pub protocol: Protocol,
    pub account: String,
    pub status: PositionStatus,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlParams {
    pub protocol: Protocol,
    pub account: String,
    pub time_frame: TimeFrame,
}

// ── Endpoints ────────────────────────────────────────────────────────

pub struct Leaderboard;

impl Endpoint for Leaderboard {
    const NAME: &'static str = "trader.leaderboard";
    const METHOD: Method = Method::Get;
    type Params = LeaderboardParams;
    type Output = Page<TraderSummary>;

    fn path(params: &Self::Params) -> String {
        format!("leaderboards/{}", params.protocol)
    }

    fn query(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("timeFrame", params.time_frame.to_string()),
            ("sortBy", params.sort_by.clone()),
            ("limit", params.limit.to_string()),
            ("offset", params.offset.to_string()),
        ]
    }
}

pub struct TraderDetail;

impl Endpoint for TraderDetail {
    const NAME: &'static str = "trader.detail";
    const METHOD: Method = Method::Get;
    type Params = TraderRef;
    type Output = TraderProfile;

    fn path(params: &Self::Params) -> String {
        format!("traders/{}/{}", params.protocol, params.account)
    }
}

pub struct TraderPositions;

impl Endpoint for TraderPositions {
    const NAME: &'static str = "trader.positions";
    const METHOD: Method = Method::Get;
    type Params = PositionsParams;
    type Output = Page<Position>;

    fn path(params: &Self::Params) -> String {
        format!("traders/{}/{}/positions", params.protocol, params.account)
    }

    fn query(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![
            ("status", params.status.to_string()),
            ("limit", params.limit.to_string()),
            ("offset", params.offset.to_string()),
        ]
    }
}

pub struct TraderPnl;

impl Endpoint for TraderPnl {
    const NAME: &'static str = "trader.pnl";
    const METHOD: Method = Method::Get;
    type Params = PnlParams;
    type Output = PnlSeries;

    fn path(params: &Self::Params) -> String {
        format!("traders/{}/{}/pnl", params.protocol, params.account)
    }

    fn query(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![("timeFrame", params.time_frame.to_string())]
    }
}

// ── Convenience methods ──────────────────────────────────────────────

impl ApiClient {
    /// `GET /leaderboards/{protocol}`
    pub async fn leaderboard(
        &self,
        params: &LeaderboardParams,
    ) -> Result<Page<TraderSummary>, Error> {
        self.call::<Leaderboard>(params).await
    }

    /// `GET /traders/{protocol}/{account}`
    pub async fn trader(&self, trader: &TraderRef) -> Result<TraderProfile, Error> {
        self.call::<TraderDetail>(trader).await
    }

    /// `GET /traders/{protocol}/{account}/positions`
    pub async fn trader_positions(
        &self,
        params: &PositionsParams,
    ) -> Result<Page<Position>, Error> {
        self.call::<TraderPositions>(params).await
    }

    /// `GET /traders/{protocol}/{account}/pnl`
    pub async fn trader_pnl(&self, params: &PnlParams) -> Result<PnlSeries, Error> {
        self.call::<TraderPnl>(params).await
    }
}
