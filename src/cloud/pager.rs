use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::CancellationToken;
use crate::error::{Result, ReviewError};

/// One page of a listing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation for the next request; `None` on the last page.
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }
}

/// Drain a paged listing, concatenating items in the order the API
/// returns them.
///
/// The token is checked before every request, so a cancelled run stops
/// issuing new calls and returns [`ReviewError::Cancelled`].
pub fn collect_pages<T, F>(cancel: &CancellationToken, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut next_link: Option<String> = None;
    let mut seen = HashSet::new();

    loop {
        cancel.check()?;
        let page = fetch(next_link.as_deref())?;
        items.extend(page.items);

        match page.next_link {
            Some(link) if !seen.insert(link.clone()) => {
                return Err(ReviewError::Internal(format!(
                    "pager returned the same next link twice: {link}"
                )));
            }
            Some(link) => next_link = Some(link),
            None => return Ok(items),
        }
    }
}
