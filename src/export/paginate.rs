//! Cursor pagination shared by chat discovery and message history.

use std::future::Future;

use tracing::debug;

use crate::error::Error;
use crate::models::Page;
use crate::Result;

/// A pagination run that failed part-way through.
///
/// `items` holds everything accumulated from the pages fetched before the
/// failing one, in order.
#[derive(Debug)]
pub struct PartialPages<T> {
    pub items: Vec<T>,
    pub error: Error,
}

impl<T> PartialPages<T> {
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl<T> From<PartialPages<T>> for Error {
    fn from(partial: PartialPages<T>) -> Self {
        partial.error
    }
}

/// Fetch every page from `fetch_page` and concatenate the items.
///
/// `fetch_page` is called with the page token (empty for the first page) and
/// `page_size`. The loop continues while the platform reports `has_more` and
/// forwards the exact token it returned. `has_more` with a missing or empty
/// token is a protocol violation. There is no bound on the number of pages;
/// every item is held in memory until the listing ends.
pub async fn fetch_all<T, F, Fut>(
    page_size: u32,
    mut fetch_page: F,
) -> std::result::Result<Vec<T>, PartialPages<T>>
where
    F: FnMut(String, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_token = String::new();
    let mut pages = 0usize;

    loop {
        let page = match fetch_page(page_token.clone(), page_size).await {
            Ok(page) => page,
            Err(error) => return Err(PartialPages { items, error }),
        };
        pages += 1;
        items.extend(page.items);

        if !page.has_more {
            break;
        }

        match page.page_token.filter(|t| !t.is_empty()) {
            Some(next) => page_token = next,
            None => {
                return Err(PartialPages {
                    items,
                    error: Error::Protocol(format!(
                        "page {} reported has_more without a page_token",
                        pages
                    )),
                })
            }
        }
    }

    debug!(pages, items = items.len(), "Pagination finished");
    Ok(items)
}
