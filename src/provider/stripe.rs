use super::{CheckoutProvider, SessionPage};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripeProvider {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
}

impl StripeProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_api_base(api_key, DEFAULT_API_BASE.to_string())
    }

    pub fn with_api_base(api_key: String, api_base: String) -> Self {
        Self {
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.api_base)
    }
}

#[async_trait]
impl CheckoutProvider for StripeProvider {
    fn name(&self) -> &str {
        "Stripe"
    }

    async fn list_sessions(
        &self,
        payment_link: &str,
        starting_after: Option<&str>,
        limit: u32,
    ) -> Result<SessionPage> {
        let mut query = vec![
            ("limit", limit.to_string()),
            ("payment_link", payment_link.to_string()),
        ];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor.to_string()));
        }

        let resp = self.client
            .get(self.sessions_url())
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message);
            match detail {
                Some(message) => anyhow::bail!("Stripe API error: {}: {}", status, message),
                None => anyhow::bail!("Stripe API error: {}", status),
            }
        }

        let page: SessionPage = resp.json().await?;
        Ok(page)
    }
}
