// Wire types
//
// Response and request shapes of the tradewatch backend. The backend is
// inconsistent about optional fields across protocols, so fields use
// `#[serde(default)]` liberally; decoding still fails loudly on type
// mismatches, which surfaces as `Error::Decode`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Shared ───────────────────────────────────────────────────────────

/// Perpetual DEX a trader is active on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    #[default]
    Gmx,
    GmxV2,
    Kwenta,
    Polynomial,
    Synthetix,
    Hyperliquid,
}

/// Aggregation window for leaderboard and PnL statistics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum TimeFrame {
    #[serde(rename = "D7")]
    #[strum(serialize = "D7")]
    Week,
    #[default]
    #[serde(rename = "D30")]
    #[strum(serialize = "D30")]
    Month,
    #[serde(rename = "D60")]
    #[strum(serialize = "D60")]
    TwoMonths,
}

/// Paginated list envelope: `{ "data": [...], "meta": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

// ── Traders ──────────────────────────────────────────────────────────

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderSummary {
    pub account: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub roi: f64,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub total_trade: u32,
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default)]
    pub last_trade_at: Option<DateTime<Utc>>,
}

/// Aggregated statistics for a single trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderProfile {
    pub account: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub stats: HashMap<String, TraderStats>,
    #[serde(default)]
    pub copy_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderStats {
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub roi: f64,
    #[serde(default)]
    pub total_win: u32,
    #[serde(default)]
    pub total_lose: u32,
    #[serde(default)]
    pub max_drawdown: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Close,
    Liquidate,
}

/// A single opened or closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub account: String,
    pub index_token: String,
    #[serde(default)]
    pub is_long: bool,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub collateral: f64,
    #[serde(default)]
    pub leverage: f64,
    #[serde(default)]
    pub average_price: f64,
    #[serde(default)]
    pub realised_pnl: f64,
    pub status: PositionStatus,
    #[serde(default)]
    pub open_block_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_block_time: Option<DateTime<Utc>>,
}

/// Parallel arrays as emitted by the PnL chart endpoint. Timestamps can
/// be `null` for gaps the backend could not resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlSeries {
    #[serde(default)]
    pub dates: Vec<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub values: Vec<Option<f64>>,
}

// ── Copy trading ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyWallet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub smart_wallet_address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCopyWalletRequest {
    pub name: String,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCopyWalletRequest {
    pub id: String,
    pub name: String,
}

/// A copy-trade configuration: follow `account` on `protocol` with the
/// given base sizing, optionally overridden per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyTradeSetting {
    pub id: String,
    pub copy_wallet_id: String,
    pub account: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub volume: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub token_addresses: Vec<String>,
    /// Per-instrument multiplier overrides keyed by token address.
    #[serde(default)]
    pub multipliers: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub enabled: bool,
}

fn default_leverage() -> f64 {
    1.0
}

// ── Account ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub plan: Option<PlanTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
    Vip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub tier: PlanTier,
    #[serde(default)]
    pub price_usd: f64,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub max_copy_trades: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub tier: PlanTier,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    pub referral_code: String,
    #[serde(default)]
    pub total_referee: u32,
    #[serde(default)]
    pub total_rewards: f64,
    #[serde(default)]
    pub claimable_rewards: f64,
}

// ── Vaults ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tvl: f64,
    #[serde(default)]
    pub apr: Option<f64>,
    #[serde(default)]
    pub manager: Option<String>,
    /// Raw deposit-token amount as a decimal integer string.
    #[serde(default)]
    pub total_deposit_raw: Option<String>,
    #[serde(default = "default_decimals")]
    pub deposit_decimals: u8,
}

fn default_decimals() -> u8 {
    6
}
