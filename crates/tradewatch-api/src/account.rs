// Account endpoints: profile, subscriptions and referrals.

use crate::client::ApiClient;
use crate::endpoint::{Endpoint, Method};
use crate::error::Error;
use crate::models::{ReferralStats, SubscriptionPlan, UpdateProfileRequest, UserProfile, UserSubscription};

pub struct Me;

impl Endpoint for Me {
    const NAME: &'static str = "account.me";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = UserProfile;

    fn path(_: &Self::Params) -> String {
        "me".into()
    }
}

pub struct UpdateMe;

impl Endpoint for UpdateMe {
    const NAME: &'static str = "account.me.update";
    const METHOD: Method = Method::Put;
    type Params = UpdateProfileRequest;
    type Output = UserProfile;

    fn path(_: &Self::Params) -> String {
        "me".into()
    }

    fn body(params: &Self::Params) -> Option<serde_json::Value> {
        serde_json::to_value(params).ok()
    }
}

pub struct SubscriptionPlans;

impl Endpoint for SubscriptionPlans {
    const NAME: &'static str = "account.subscription.plans";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = Vec<SubscriptionPlan>;

    fn path(_: &Self::Params) -> String {
        "subscriptions/plans".into()
    }
}

pub struct MySubscription;

impl Endpoint for MySubscription {
    const NAME: &'static str = "account.subscription";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = Option<UserSubscription>;

    fn path(_: &Self::Params) -> String {
        "subscriptions/me".into()
    }
}

pub struct Referrals;

impl Endpoint for Referrals {
    const NAME: &'static str = "account.referrals";
    const METHOD: Method = Method::Get;
    type Params = ();
    type Output = ReferralStats;

    fn path(_: &Self::Params) -> String {
        "referrals/stats".into()
    }
}

impl ApiClient {
    /// `GET /me`
    pub async fn me(&self) -> Result<UserProfile, Error> {
        self.call::<Me>(&()).await
    }

    /// `PUT /me`
    pub async fn update_me(&self, request: &UpdateProfileRequest) -> Result<UserProfile, Error> {
        self.call::<UpdateMe>(request).await
    }

    /// `GET /subscriptions/plans`
    pub async fn subscription_plans(&self) -> Result<Vec<SubscriptionPlan>, Error> {
        self.call::<SubscriptionPlans>(&()).await
    }

    /// `GET /subscriptions/me`. `None` when the user has no active plan.
    pub async fn my_subscription(&self) -> Result<Option<UserSubscription>, Error> {
        self.call::<MySubscription>(&()).await
    }

    /// `GET /referrals/stats`
    pub async fn referral_stats(&self) -> Result<ReferralStats, Error> {
        self.call::<Referrals>(&()).await
    }
}
