// Copy-trade wallet and setting endpoints
//
// Wallet writes are eventually consistent on the backend: a freshly
// created wallet may not show up in the list for a short while.

use serde::Serialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::endpoint::{Endpoint, Method};
use crate::error::Error;
use crate::models::{CopyTradeSetting, CopyWallet, CreateCopyWalletRequest, UpdateCopyWalletRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySettingsParams {
    pub copy_wallet_id: String,
}

pub struct ListCopyWallets;

impl Endpoint for ListCopyWallets {
    const NAME: &'static str = "copy.wallets";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = Vec<CopyWallet>;

    fn path(_: &Self::Params) -> String {
        "copy-wallets".into()
    }
}

pub struct CreateCopyWallet;

impl Endpoint for CreateCopyWallet {
    const NAME: &'static str = "copy.wallets.create";
    const METHOD: Method = Method::Post;
    type Params = CreateCopyWalletRequest;
    type Output = CopyWallet;

    fn path(_: &Self::Params) -> String {
        "copy-wallets".into()
    }

    fn body(params: &Self::Params) -> Option<serde_json::Value> {
        serde_json::to_value(params).ok()
    }
}

pub struct UpdateCopyWallet;

impl Endpoint for UpdateCopyWallet {
    const NAME: &'static str = "copy.wallets.update";
    const METHOD: Method = Method::Put;
    type Params = UpdateCopyWalletRequest;
    type Output = CopyWallet;

    fn path(params: &Self::Params) -> String {
        format!("copy-wallets/{}", params.id)
    }

    fn body(params: &Self::Params) -> Option<serde_json::Value> {
        Some(json!({ "name": params.name }))
    }
}

pub struct DeleteCopyWallet;

impl Endpoint for DeleteCopyWallet {
    const NAME: &'static str = "copy.wallets.delete";
    const METHOD: Method = Method::Delete;
    type Params = String;
    type Output = ();

    fn path(id: &Self::Params) -> String {
        format!("copy-wallets/{id}")
    }
}

pub struct ListCopySettings;

impl Endpoint for ListCopySettings {
    const NAME: &'static str = "copy.settings";
    const METHOD: Method = Method::Get;
    type Params = CopySettingsParams;
    type Output = Vec<CopyTradeSetting>;

    fn path(_: &Self::Params) -> String {
        "copy-settings".into()
    }

    fn query(params: &Self::Params) -> Vec<(&'static str, String)> {
        vec![("copyWalletId", params.copy_wallet_id.clone())]
    }
}

impl ApiClient {
    /// `GET /copy-wallets`
    pub async fn copy_wallets(&self) -> Result<Vec<CopyWallet>, Error> {
        self.call::<ListCopyWallets>(&()).await
    }

    /// `POST /copy-wallets`
    pub async fn create_copy_wallet(
        &self,
        request: &CreateCopyWalletRequest,
    ) -> Result<CopyWallet, Error> {
        self.call::<CreateCopyWallet>(request).await
    }

    /// `PUT /copy-wallets/{id}`
    pub async fn update_copy_wallet(
        &self,
        request: &UpdateCopyWalletRequest,
    ) -> Result<CopyWallet, Error> {
        self.call::<UpdateCopyWallet>(request).await
    }

    /// `DELETE /copy-wallets/{id}`
    pub async fn delete_copy_wallet(&self, id: &str) -> Result<(), Error> {
        self.call::<DeleteCopyWallet>(&id.to_owned()).await
    }

    /// `GET /copy-settings?copyWalletId=`
    pub async fn copy_settings(
        &self,
        params: &CopySettingsParams,
    ) -> Result<Vec<CopyTradeSetting>, Error> {
        self.call::<ListCopySettings>(params).await
    }
}
