use super::{CheckoutProvider, CheckoutSession, CustomerDetails, SessionPage};
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ada Lovelace", "ada@example.com"),
    ("Grace Hopper", "grace@example.com"),
    ("Alan Turing", "alan@example.com"),
];

/// Produces a small random page of fresh sessions on every call.
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckoutProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn list_sessions(
        &self,
        payment_link: &str,
        _starting_after: Option<&str>,
        limit: u32,
    ) -> Result<SessionPage> {
        let mut rng = rand::thread_rng();
        let now = chrono::Utc::now();
        let count = rng.gen_range(0..=3u32).min(limit);

        let data = (0..count)
            .map(|i| {
                let (name, email) = CUSTOMERS[rng.gen_range(0..CUSTOMERS.len())];
                let paid = rng.gen_bool(0.8);
                CheckoutSession {
                    id: format!("cs_mock_{}_{}", now.timestamp_nanos_opt().unwrap_or(0), i),
                    payment_link: Some(payment_link.to_string()),
                    payment_status: if paid { "paid" } else { "unpaid" }.to_string(),
                    created: now.timestamp(),
                    amount_total: Some(rng.gen_range(2..=15i64) * 100),
                    currency: Some("eur".to_string()),
                    customer_details: Some(CustomerDetails {
                        email: Some(email.to_string()),
                        name: Some(name.to_string()),
                    }),
                }
            })
            .collect();

        Ok(SessionPage { data, has_more: false })
    }
}
