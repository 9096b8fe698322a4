use chrono::{DateTime, Local, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::provider::CheckoutSession;

pub const PAID_STATUS: &str = "paid";
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A paid checkout session in the exported schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidSession {
    #[serde(rename = "payment_link_id")]
    pub resource_id: String,
    /// Major currency units.
    #[serde(rename = "amount_total", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Upper-case ISO-4217 code.
    pub currency: String,
    pub customer_email: Option<String>,
    #[serde(rename = "name")]
    pub customer_name: Option<String>,
    /// Local time, minute precision.
    pub created: String,
}

/// Keeps `session` only if it is paid and strictly newer than `since`,
/// rendering its creation time in the local timezone.
pub fn normalize(session: &CheckoutSession, link: &str, since: i64) -> Option<PaidSession> {
    normalize_in(session, link, since, &Local)
}

pub fn normalize_in<Tz>(session: &CheckoutSession, link: &str, since: i64, tz: &Tz) -> Option<PaidSession>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if session.payment_status != PAID_STATUS || session.created <= since {
        return None;
    }

    let customer = session.customer_details.as_ref();
    Some(PaidSession {
        resource_id: session.payment_link.clone().unwrap_or_else(|| link.to_string()),
        amount: Decimal::new(session.amount_total.unwrap_or(0), 2),
        currency: session.currency.as_deref().unwrap_or_default().to_uppercase(),
        customer_email: customer.and_then(|c| c.email.clone()),
        customer_name: customer.and_then(|c| c.name.clone()),
        created: format_created(session.created, tz),
    })
}

fn format_created<Tz>(unix: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::<Utc>::from_timestamp(unix, 0).unwrap_or_default();
    utc.with_timezone(tz).format(CREATED_FORMAT).to_string()
}
