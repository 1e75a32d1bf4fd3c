//! Page-by-page walk over the post feed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mediashare_protocol::Post;

use crate::ws_client::ClientError;

/// Boxed future returned by [`PostFeed::fetch_page`].
pub type FeedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Post>, ClientError>> + Send + 'a>>;

/// Anything that can serve a slice of the feed.
pub trait PostFeed: Send + Sync {
    fn fetch_page(&self, start: u64, count: u64) -> FeedFuture<'_>;
}

/// Cursor over fixed-size feed pages.
///
/// A page shorter than the page size, or an empty one, marks the end of the
/// feed; `next_page` then returns `None` until the pager is reset or moved
/// back.
pub struct FeedPager<F: ?Sized> {
    feed: Arc<F>,
    page_size: u64,
    offset: u64,
    loaded: bool,
    at_end: bool,
}

impl<F: PostFeed + ?Sized> FeedPager<F> {
    /// Creates a pager. A page size of 0 is treated as 1.
    pub fn new(feed: Arc<F>, page_size: u64) -> Self {
        Self {
            feed,
            page_size: page_size.max(1),
            offset: 0,
            loaded: false,
            at_end: false,
        }
    }

    /// Fetches the page after the current one.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Post>>, ClientError> {
        if self.at_end {
            return Ok(None);
        }

        let start = if self.loaded {
            self.offset + self.page_size
        } else {
            0
        };
        let page = self.feed.fetch_page(start, self.page_size).await?;

        if page.is_empty() {
            // Stay on the last non-empty page.
            self.at_end = true;
            return Ok(None);
        }

        self.offset = start;
        self.loaded = true;
        self.at_end = (page.len() as u64) < self.page_size;
        Ok(Some(page))
    }

    /// Fetches the page before the current one, or `None` on the first page.
    pub async fn previous_page(&mut self) -> Result<Option<Vec<Post>>, ClientError> {
        if !self.loaded || self.offset == 0 {
            return Ok(None);
        }

        let start = self.offset.saturating_sub(self.page_size);
        let page = self.feed.fetch_page(start, self.page_size).await?;

        self.offset = start;
        self.at_end = false;
        Ok(Some(page))
    }

    /// Returns to before the first page.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.loaded = false;
        self.at_end = false;
    }

    /// 0-based index of the current page.
    pub fn page_index(&self) -> u64 {
        self.offset / self.page_size
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn is_at_end(&self) -> bool {
        self.at_end
    }
}
