//! Paginated bucket listing.

use async_stream::try_stream;
use futures::Stream;
use sm_error::{ListingError, Result, SmError};
use std::sync::Arc;
use tracing::debug;

use crate::store::{ObjectPage, ObjectStore};

/// Walks a bucket listing one page at a time.
pub struct ListingPager {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ListingPager {
    /// Create a pager over `bucket`.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fetch the page following `token`, or the first page if `token` is `None`.
    ///
    /// Returns the page and whether it is the last one. A page whose listing
    /// claims more data but carries no token is treated as the last page.
    pub async fn next_page(
        &self,
        token: Option<&str>,
    ) -> std::result::Result<(ObjectPage, bool), ListingError> {
        let page = self.store.list_page(&self.bucket, token).await?;
        let done = page.next_token.is_none();

        debug!(
            bucket = %self.bucket,
            objects = page.len(),
            done,
            "Listed page"
        );

        Ok((page, done))
    }

    /// Stream every page of the listing, starting from the beginning.
    ///
    /// The stream ends after the last page, or after yielding the first
    /// listing error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::{StreamExt, pin_mut};
    ///
    /// let pages = pager.pages();
    /// pin_mut!(pages);
    ///
    /// while let Some(page) = pages.next().await {
    ///     let page = page?;
    ///     println!("{} objects", page.len());
    /// }
    /// ```
    pub fn pages(&self) -> impl Stream<Item = Result<ObjectPage>> + '_ {
        try_stream! {
            let mut continuation_token: Option<String> = None;

            loop {
                let (page, done) = self
                    .next_page(continuation_token.as_deref())
                    .await
                    .map_err(SmError::from)?;
                continuation_token = page.next_token.clone();

                yield page;

                if done {
                    break;
                }
            }
        }
    }
}
