// Vault listing endpoint.

use crate::client::ApiClient;
use crate::endpoint::{Endpoint, Method};
use crate::error::Error;
use crate::models::Vault;

pub struct ListVaults;

impl Endpoint for ListVaults {
    const NAME: &'static str = "vault.list";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = Vec<Vault>;

    fn path(_: &Self::Params) -> String {
        "vaults".into()
    }
}

impl ApiClient {
    /// `GET /vaults`
    pub async fn vaults(&self) -> Result<Vec<Vault>, Error> {
        self.call::<ListVaults>(&()).await
    }
}
