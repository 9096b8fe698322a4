use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::provider::{CheckoutProvider, CheckoutSession};

/// Largest page the provider accepts.
pub const PAGE_SIZE: u32 = 100;

/// Walks every page of one payment link's session history.
///
/// Pages are requested lazily, one per [`SessionPager::next_page`] call, each
/// continuing after the last session of the previous page. Once the provider
/// reports no further pages, or any request fails, the pager is exhausted and
/// keeps returning `Ok(None)`.
pub struct SessionPager<'a> {
    provider: &'a dyn CheckoutProvider,
    link: String,
    cursor: Option<String>,
    done: bool,
}

impl<'a> SessionPager<'a> {
    pub fn new(provider: &'a dyn CheckoutProvider, link: impl Into<String>) -> Self {
        Self {
            provider,
            link: link.into(),
            cursor: None,
            done: false,
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<CheckoutSession>>> {
        if self.done {
            return Ok(None);
        }

        let page = match self
            .provider
            .list_sessions(&self.link, self.cursor.as_deref(), PAGE_SIZE)
            .await
        {
            Ok(page) => page,
            Err(source) => {
                self.done = true;
                return Err(SyncError::Fetch { link: self.link.clone(), source });
            }
        };

        debug!(
            link = %self.link,
            cursor = ?self.cursor,
            sessions = page.data.len(),
            has_more = page.has_more,
            "fetched session page"
        );

        if page.has_more {
            match page.data.last() {
                Some(last) => self.cursor = Some(last.id.clone()),
                None => {
                    warn!(link = %self.link, "provider reported more pages after an empty page; stopping");
                    self.done = true;
                }
            }
        } else {
            self.done = true;
        }

        Ok(Some(page.data))
    }

    /// Drains the remaining pages into one sequence in provider order.
    pub async fn collect_all(mut self) -> Result<Vec<CheckoutSession>> {
        let mut sessions = Vec::new();
        while let Some(page) = self.next_page().await? {
            sessions.extend(page);
        }
        Ok(sessions)
    }
}
