// ── Session facade ──
//
// Owns the gateway client, the query cache and the store slices for one
// signed-in (or anonymous) user. Consumers hold a cloned `Session` instead
// of reaching for globals.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, info, warn};
use url::Url;

use tradewatch_api::account::{Me, MySubscription, Referrals, SubscriptionPlans};
use tradewatch_api::copy_trade::{CopySettingsParams, ListCopySettings, ListCopyWallets};
use tradewatch_api::models::{
    CopyTradeSetting, CopyWallet, CreateCopyWalletRequest, Page, PnlSeries, Position, Protocol,
    ReferralStats, SubscriptionPlan, TimeFrame, TraderProfile, TraderSummary,
    UpdateCopyWalletRequest, UpdateProfileRequest, UserProfile, UserSubscription, Vault,
};
use tradewatch_api::traders::{
    Leaderboard, LeaderboardParams, PnlParams, PositionsParams, TraderDetail, TraderPnl,
    TraderPositions, TraderRef,
};
use tradewatch_api::vaults::ListVaults;
use tradewatch_api::{ApiClient, Endpoint, TransportConfig};

use crate::config::{SessionConfig, StorageBackend};
use crate::error::CoreError;
use crate::query::{KeyFilter, MutationOptions, QueryClient, QueryKey, QueryObserver, QueryOptions};
use crate::store::{
    FileStorage, MemoryStorage, ModalState, ProfileState, ProtocolState, Storage, Store,
};
use crate::view::{self, LeaderboardRow};

/// Operation prefixes whose data belongs to the signed-in user.
const USER_SCOPES: [&str; 2] = ["account", "copy"];

fn is_user_scoped(key: &QueryKey) -> bool {
    key.op()
        .split('.')
        .next()
        .is_some_and(|head| USER_SCOPES.contains(&head))
}

struct Gateway {
    client: ApiClient,
    authenticated: bool,
}

type SharedGateway = Arc<RwLock<Gateway>>;

fn current_client(gateway: &SharedGateway) -> ApiClient {
    gateway
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .client
        .clone()
}

fn build_client(
    base_url: &Url,
    timeout: Duration,
    token: Option<SecretString>,
) -> Result<ApiClient, CoreError> {
    let transport = TransportConfig {
        timeout,
        bearer_token: token,
    };
    Ok(ApiClient::new(base_url.as_str(), &transport)?)
}

struct SessionInner {
    config: SessionConfig,
    gateway: SharedGateway,
    queries: QueryClient,
    profile: Store<ProfileState>,
    protocol: Store<ProtocolState>,
    modals: Store<ModalState>,
}

/// One user's view of the backend: gateway, query cache and local state.
///
/// Cheaply cloneable; clones share everything.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .field("queries", &self.inner.queries.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from configuration. Does no I/O besides reading
    /// persisted store slices.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let client = build_client(&config.base_url, config.timeout, config.token.clone())?;
        Ok(Self::with_client(config, client))
    }

    /// Build a session around an existing gateway client.
    pub fn with_client(config: SessionConfig, client: ApiClient) -> Self {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::Directory(dir) => Arc::new(FileStorage::new(dir.clone())),
        };
        let authenticated = config.token.is_some();
        let queries = QueryClient::new(config.cache.client_config());
        let profile = Store::persisted("profile", Arc::clone(&storage), ProfileState::default());
        let protocol = Store::persisted("protocol", storage, ProtocolState::default());
        let modals = Store::volatile("modals", ModalState::default());

        info!(
            base_url = %config.base_url,
            storage = ?config.storage,
            authenticated,
            "session ready"
        );

        Self {
            inner: Arc::new(SessionInner {
                gateway: Arc::new(RwLock::new(Gateway {
                    client,
                    authenticated,
                })),
                config,
                queries,
                profile,
                protocol,
                modals,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The gateway client currently in use.
    pub fn api(&self) -> ApiClient {
        current_client(&self.inner.gateway)
    }

    pub fn queries(&self) -> &QueryClient {
        &self.inner.queries
    }

    pub fn profile(&self) -> &Store<ProfileState> {
        &self.inner.profile
    }

    pub fn protocol(&self) -> &Store<ProtocolState> {
        &self.inner.protocol
    }

    pub fn modals(&self) -> &Store<ModalState> {
        &self.inner.modals
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .gateway
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .authenticated
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Switch to `token` for all further requests and refetch
    /// user-scoped queries.
    pub fn sign_in(&self, wallet_address: impl Into<String>, token: SecretString) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let client = build_client(&config.base_url, config.timeout, Some(token.clone()))?;
        *self.inner.gateway.write().unwrap_or_else(PoisonError::into_inner) = Gateway {
            client,
            authenticated: true,
        };

        let wallet_address = wallet_address.into();
        info!(wallet = %wallet_address, "signed in");
        self.inner.profile.update(|p| p.sign_in(wallet_address, token));
        drop(self.inner.queries.invalidate(&KeyFilter::predicate(is_user_scoped)));
        Ok(())
    }

    /// Drop credentials and every cached user-scoped query.
    pub fn sign_out(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let client = build_client(&config.base_url, config.timeout, None)?;
        *self.inner.gateway.write().unwrap_or_else(PoisonError::into_inner) = Gateway {
            client,
            authenticated: false,
        };

        self.inner.profile.update(ProfileState::sign_out);
        let removed = self.inner.queries.remove(&KeyFilter::predicate(is_user_scoped));
        info!(removed, "signed out");
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn query_options(&self) -> QueryOptions {
        self.inner.config.cache.query_options()
    }

    /// Options for queries that need a signed-in user.
    fn user_query_options(&self) -> QueryOptions {
        self.query_options().enabled(self.is_authenticated())
    }

    fn observe<E>(
        &self,
        params: E::Params,
        options: QueryOptions,
    ) -> Result<QueryObserver<E::Output>, CoreError>
    where
        E: Endpoint + 'static,
        E::Params: Clone + 'static,
        E::Output: Sync,
    {
        let key = QueryKey::for_endpoint::<E>(&params);
        let gateway = Arc::clone(&self.inner.gateway);
        self.inner.queries.observe(key, options, move || {
            let client = current_client(&gateway);
            let params = params.clone();
            async move { client.call::<E>(&params).await }
        })
    }

    pub fn leaderboard(
        &self,
        params: LeaderboardParams,
    ) -> Result<QueryObserver<Page<TraderSummary>>, CoreError> {
        self.observe::<Leaderboard>(params, self.query_options())
    }

    /// Leaderboard for the protocol and time frame currently selected.
    pub fn current_leaderboard(&self) -> Result<QueryObserver<Page<TraderSummary>>, CoreError> {
        let selection = *self.inner.protocol.get_state();
        self.leaderboard(LeaderboardParams {
            protocol: selection.protocol,
            time_frame: selection.time_frame,
            ..LeaderboardParams::default()
        })
    }

    pub fn trader(&self, trader: TraderRef) -> Result<QueryObserver<TraderProfile>, CoreError> {
        self.observe::<TraderDetail>(trader, self.query_options())
    }

    pub fn positions(&self, params: PositionsParams) -> Result<QueryObserver<Page<Position>>, CoreError> {
        self.observe::<TraderPositions>(params, self.query_options())
    }

    pub fn pnl_series(&self, params: PnlParams) -> Result<QueryObserver<PnlSeries>, CoreError> {
        self.observe::<TraderPnl>(params, self.query_options())
    }

    pub fn subscription_plans(&self) -> Result<QueryObserver<Vec<SubscriptionPlan>>, CoreError> {
        self.observe::<SubscriptionPlans>((), self.query_options())
    }

    pub fn vaults(&self) -> Result<QueryObserver<Vec<Vault>>, CoreError> {
        self.observe::<ListVaults>((), self.query_options())
    }

    pub fn me(&self) -> Result<QueryObserver<UserProfile>, CoreError> {
        self.observe::<Me>((), self.user_query_options())
    }

    pub fn subscription(&self) -> Result<QueryObserver<Option<UserSubscription>>, CoreError> {
        self.observe::<MySubscription>((), self.user_query_options())
    }

    pub fn copy_wallets(&self) -> Result<QueryObserver<Vec<CopyWallet>>, CoreError> {
        self.observe::<ListCopyWallets>((), self.user_query_options())
    }

    pub fn copy_settings(
        &self,
        copy_wallet_id: impl Into<String>,
    ) -> Result<QueryObserver<Vec<CopyTradeSetting>>, CoreError> {
        let params = CopySettingsParams {
            copy_wallet_id: copy_wallet_id.into(),
        };
        self.observe::<ListCopySettings>(params, self.user_query_options())
    }

    pub fn referral_stats(&self) -> Result<QueryObserver<ReferralStats>, CoreError> {
        self.observe::<Referrals>((), self.user_query_options())
    }

    // ── Mutations ────────────────────────────────────────────────────

    fn invalidating(&self, scopes: &[&str]) -> MutationOptions {
        scopes.iter().fold(
            MutationOptions::default().delay(self.inner.config.cache.invalidation_delay),
            |options, scope| options.invalidates(KeyFilter::prefix(*scope)),
        )
    }

    /// Refetch `key` from the server after a failed optimistic write.
    fn roll_back<T>(&self, key: &QueryKey, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(ref e) = result {
            warn!(key = %key, error = %e, "mutation failed, restoring server state");
            drop(self.inner.queries.invalidate(&KeyFilter::exact(key.clone())));
        }
        result
    }

    pub async fn create_copy_wallet(
        &self,
        request: CreateCopyWalletRequest,
    ) -> Result<CopyWallet, CoreError> {
        let client = self.api();
        let wallet = self
            .inner
            .queries
            .mutate(
                async move { client.create_copy_wallet(&request).await },
                self.invalidating(&["copy"]),
            )
            .await?;
        info!(id = %wallet.id, "copy wallet created");
        Ok(wallet)
    }

    /// Rename a copy wallet, showing the new name immediately.
    pub async fn update_copy_wallet(
        &self,
        request: UpdateCopyWalletRequest,
    ) -> Result<CopyWallet, CoreError> {
        let key = QueryKey::for_endpoint::<ListCopyWallets>(&());
        self.inner
            .queries
            .update_data::<Vec<CopyWallet>, _>(&key, |wallets| {
                wallets
                    .iter()
                    .cloned()
                    .map(|mut w| {
                        if w.id == request.id {
                            w.name.clone_from(&request.name);
                        }
                        w
                    })
                    .collect()
            })?;

        let client = self.api();
        let result = self
            .inner
            .queries
            .mutate(
                async move { client.update_copy_wallet(&request).await },
                self.invalidating(&["copy"]),
            )
            .await;
        self.roll_back(&key, result)
    }

    /// Delete a copy wallet, removing it from the cached list immediately.
    pub async fn delete_copy_wallet(&self, id: &str) -> Result<(), CoreError> {
        let key = QueryKey::for_endpoint::<ListCopyWallets>(&());
        let removed = self
            .inner
            .queries
            .update_data::<Vec<CopyWallet>, _>(&key, |wallets| {
                wallets.iter().filter(|w| w.id != id).cloned().collect()
            })?;
        debug!(id, optimistic = removed, "deleting copy wallet");

        let client = self.api();
        let owned_id = id.to_owned();
        let result = self
            .inner
            .queries
            .mutate(
                async move { client.delete_copy_wallet(&owned_id).await },
                self.invalidating(&["copy"]),
            )
            .await;
        self.roll_back(&key, result)?;

        self.inner.profile.update(|p| p.copy_wallet_order.retain(|w| w != id));
        info!(id, "copy wallet deleted");
        Ok(())
    }

    /// Update the user's profile and mirror the new name locally.
    pub async fn update_profile(&self, request: UpdateProfileRequest) -> Result<UserProfile, CoreError> {
        let client = self.api();
        let profile = self
            .inner
            .queries
            .mutate(
                async move { client.update_me(&request).await },
                self.invalidating(&["account"]),
            )
            .await?;

        self.inner
            .queries
            .set_data(QueryKey::for_endpoint::<Me>(&()), profile.clone())?;
        self.apply_profile(&profile);
        Ok(profile)
    }

    // ── Local state ──────────────────────────────────────────────────

    /// Mirror the backend's view of the user into the profile slice.
    pub fn apply_profile(&self, profile: &UserProfile) {
        self.inner.profile.update(|p| {
            p.display_name.clone_from(&profile.username);
            p.plan = profile.plan.unwrap_or_default();
        });
    }

    /// Add or remove a favourite trader. Returns whether it is now a favourite.
    pub fn toggle_favourite(&self, trader: TraderRef) -> bool {
        let mut favourite = false;
        self.inner
            .profile
            .update(|p| favourite = p.toggle_favourite(trader));
        favourite
    }

    pub fn select_protocol(&self, protocol: Protocol) {
        self.inner.protocol.update(|s| s.protocol = protocol);
    }

    pub fn select_time_frame(&self, time_frame: TimeFrame) {
        self.inner.protocol.update(|s| s.time_frame = time_frame);
    }

    pub fn set_copy_wallet_order(&self, order: Vec<String>) {
        self.inner.profile.update(|p| p.copy_wallet_order = order);
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Leaderboard rows with favourites flagged and pinned to the top.
    pub fn leaderboard_view(&self, page: &Page<TraderSummary>) -> Vec<LeaderboardRow> {
        let profile = self.inner.profile.get_state();
        let rows = view::leaderboard_rows(page, &profile.favourite_traders);
        view::favourites_first(rows, &profile.favourite_traders)
    }

    /// Copy wallets in the user's saved order.
    pub fn copy_wallets_view(&self, wallets: &[CopyWallet]) -> Vec<CopyWallet> {
        view::ordered_copy_wallets(wallets, &self.inner.profile.get_state().copy_wallet_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_scope_matches_first_segment() {
        assert!(is_user_scoped(&QueryKey::new("copy.wallets")));
        assert!(is_user_scoped(&QueryKey::new("account.me")));
        assert!(!is_user_scoped(&QueryKey::new("trader.leaderboard")));
        assert!(!is_user_scoped(&QueryKey::new("accounts")));
    }
}
