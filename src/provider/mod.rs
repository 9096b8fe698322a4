pub mod mock;
pub mod stripe;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One checkout session as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_link: Option<String>,
    pub payment_status: String,
    /// Unix seconds.
    pub created: i64,
    /// Minor currency units (cents).
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A single page of a session listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub data: Vec<CheckoutSession>,
    #[serde(default)]
    pub has_more: bool,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Lists sessions created through `payment_link`, newest first, starting
    /// after the session with id `starting_after` when given.
    async fn list_sessions(
        &self,
        payment_link: &str,
        starting_after: Option<&str>,
        limit: u32,
    ) -> Result<SessionPage>;
}
