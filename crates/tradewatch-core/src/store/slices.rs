// ── Concrete state slices ──
//
// Profile and protocol selection survive restarts; modal visibility does
// not. The auth token lives in the profile slice but is never written to
// storage.

use std::collections::BTreeSet;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use tradewatch_api::models::{PlanTier, Protocol, TimeFrame};
use tradewatch_api::traders::TraderRef;

use super::slice::Persist;

// ── Profile ──────────────────────────────────────────────────────────

/// Signed-in user and local preferences.
#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    pub wallet_address: Option<String>,
    pub display_name: Option<String>,
    /// Last plan reported by the backend. Not persisted.
    pub plan: PlanTier,
    /// Bearer token for the current sign-in. Not persisted.
    pub auth_token: Option<Arc<SecretString>>,
    pub favourite_traders: Vec<TraderRef>,
    /// User-chosen display order of copy wallets, by id.
    pub copy_wallet_order: Vec<String>,
}

impl ProfileState {
    pub fn is_signed_in(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn sign_in(&mut self, wallet_address: impl Into<String>, token: SecretString) {
        self.wallet_address = Some(wallet_address.into());
        self.auth_token = Some(Arc::new(token));
    }

    /// Clear identity and credentials. Favourites are kept.
    pub fn sign_out(&mut self) {
        self.wallet_address = None;
        self.display_name = None;
        self.plan = PlanTier::default();
        self.auth_token = None;
        self.copy_wallet_order.clear();
    }

    pub fn is_favourite(&self, trader: &TraderRef) -> bool {
        self.favourite_traders.contains(trader)
    }

    /// Add or remove `trader`. Returns whether it is now a favourite.
    pub fn toggle_favourite(&mut self, trader: TraderRef) -> bool {
        if let Some(pos) = self.favourite_traders.iter().position(|t| *t == trader) {
            self.favourite_traders.remove(pos);
            false
        } else {
            self.favourite_traders.push(trader);
            true
        }
    }
}

/// Persisted subset of [`ProfileState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub favourite_traders: Vec<TraderRef>,
    #[serde(default)]
    pub copy_wallet_order: Vec<String>,
}

impl Persist for ProfileState {
    type Snapshot = ProfileSnapshot;
    const VERSION: u32 = 1;

    fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            wallet_address: self.wallet_address.clone(),
            display_name: self.display_name.clone(),
            favourite_traders: self.favourite_traders.clone(),
            copy_wallet_order: self.copy_wallet_order.clone(),
        }
    }

    fn restore(default: Self, snapshot: ProfileSnapshot) -> Self {
        Self {
            wallet_address: snapshot.wallet_address,
            display_name: snapshot.display_name,
            favourite_traders: snapshot.favourite_traders,
            copy_wallet_order: snapshot.copy_wallet_order,
            ..default
        }
    }
}

// ── Protocol selection ───────────────────────────────────────────────

/// Protocol and time frame the explorer views are scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolState {
    pub protocol: Protocol,
    #[serde(default)]
    pub time_frame: TimeFrame,
}

impl Persist for ProtocolState {
    type Snapshot = Self;

    fn snapshot(&self) -> Self {
        *self
    }

    fn restore(_default: Self, snapshot: Self) -> Self {
        snapshot
    }
}

// ── Modals ───────────────────────────────────────────────────────────

/// Dialogs the presentation layer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ModalKind {
    ConnectWallet,
    CreateCopyWallet,
    EditCopyWallet,
    CopyTrader,
    Subscribe,
    VaultDeposit,
}

/// Which modals are open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    open: BTreeSet<ModalKind>,
}

impl ModalState {
    pub fn is_open(&self, modal: ModalKind) -> bool {
        self.open.contains(&modal)
    }

    pub fn open(&mut self, modal: ModalKind) {
        self.open.insert(modal);
    }

    pub fn close(&mut self, modal: ModalKind) {
        self.open.remove(&modal);
    }

    /// Flip `modal`. Returns whether it is now open.
    pub fn toggle(&mut self, modal: ModalKind) -> bool {
        if self.open.remove(&modal) {
            false
        } else {
            self.open.insert(modal);
            true
        }
    }

    pub fn close_all(&mut self) {
        self.open.clear();
    }

    pub fn open_modals(&self) -> impl Iterator<Item = ModalKind> + '_ {
        self.open.iter().copied()
    }
}
