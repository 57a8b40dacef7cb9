//! Pagination over the API's own cursors.
//!
//! Timelines page backwards with `max_id`; user lists page with an opaque
//! `cursor`. Both collectors stop at `limit` items and never ask for more
//! than one page past what is needed.

use std::future::Future;

use tracing::debug;

use crate::error::TwitterResult;

/// Largest page the v1.1 timeline and list endpoints hand out.
pub const MAX_PAGE_SIZE: usize = 200;

/// Cursor value that asks for the first page of a cursored endpoint.
pub const FIRST_CURSOR: i64 = -1;

/// One page from a `cursor`-paginated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPage<T> {
    /// Items in the page.
    pub items: Vec<T>,
    /// Cursor for the next page; zero means exhausted.
    pub next_cursor: i64,
}

/// Page size to request when `collected` of `limit` items are already in hand.
#[must_use]
pub fn page_size(limit: usize, collected: usize) -> usize {
    limit.saturating_sub(collected).min(MAX_PAGE_SIZE)
}

/// `max_id` for the page following one whose smallest id is `oldest`.
#[must_use]
pub const fn next_max_id(oldest: u64) -> Option<u64> {
    oldest.checked_sub(1)
}

/// Collect up to `limit` items from a `max_id`-paginated timeline.
///
/// `fetch_page(max_id, page_size)` returns one page, newest first. `id_of`
/// extracts the id used to position the next page.
pub async fn paginate_max_id<T, F, Fut, I>(
    limit: usize,
    mut fetch_page: F,
    id_of: I,
) -> TwitterResult<Vec<T>>
where
    F: FnMut(Option<u64>, usize) -> Fut,
    Fut: Future<Output = TwitterResult<Vec<T>>>,
    I: Fn(&T) -> u64,
{
    let mut out = Vec::new();
    let mut max_id: Option<u64> = None;

    while out.len() < limit {
        let page = fetch_page(max_id, page_size(limit, out.len())).await?;
        debug!(
            page_len = page.len(),
            collected = out.len(),
            ?max_id,
            "Fetched timeline page"
        );

        let Some(oldest) = page.iter().map(&id_of).min() else {
            break;
        };

        // A page that does not move the window would repeat forever
        if max_id.is_some_and(|current| oldest > current) {
            break;
        }

        let remaining = limit - out.len();
        out.extend(page.into_iter().take(remaining));

        match next_max_id(oldest) {
            Some(next) => max_id = Some(next),
            None => break,
        }
    }

    Ok(out)
}

/// Collect up to `limit` items from a `cursor`-paginated endpoint.
pub async fn paginate_cursor<T, F, Fut>(limit: usize, mut fetch_page: F) -> TwitterResult<Vec<T>>
where
    F: FnMut(i64, usize) -> Fut,
    Fut: Future<Output = TwitterResult<CursorPage<T>>>,
{
    let mut out = Vec::new();
    let mut cursor = FIRST_CURSOR;

    while out.len() < limit {
        let page = fetch_page(cursor, page_size(limit, out.len())).await?;
        debug!(
            page_len = page.items.len(),
            collected = out.len(),
            cursor,
            next_cursor = page.next_cursor,
            "Fetched cursored page"
        );

        if page.items.is_empty() {
            break;
        }

        let remaining = limit - out.len();
        out.extend(page.items.into_iter().take(remaining));

        if page.next_cursor == 0 {
            break;
        }
        cursor = page.next_cursor;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::TwitterError;

    /// Ids 1000, 999, ..., newest first, served in pages like the timeline API.
    fn timeline(len: u64) -> Vec<u64> {
        (0..len).map(|i| 1000 - i).collect()
    }

    fn serve(all: &[u64], max_id: Option<u64>, size: usize) -> Vec<u64> {
        all.iter()
            .copied()
            .filter(|id| max_id.map_or(true, |max| *id <= max))
            .take(size)
            .collect()
    }

    #[test]
    fn page_size_is_capped() {
        assert_eq!(page_size(1000, 0), MAX_PAGE_SIZE);
        assert_eq!(page_size(1000, 900), 100);
        assert_eq!(page_size(3, 0), 3);
        assert_eq!(page_size(3, 3), 0);
    }

    #[test]
    fn next_max_id_handles_zero() {
        assert_eq!(next_max_id(10), Some(9));
        assert_eq!(next_max_id(0), None);
    }

    #[tokio::test]
    async fn max_id_stops_at_limit() {
        let all = timeline(5);
        let calls = RefCell::new(Vec::new());

        let got = paginate_max_id(
            3,
            |max_id, size| {
                calls.borrow_mut().push((max_id, size));
                let page = serve(&all, max_id, size);
                async move { Ok(page) }
            },
            |id| *id,
        )
        .await
        .unwrap();

        assert_eq!(got, vec![1000, 999, 998]);
        assert_eq!(calls.into_inner(), vec![(None, 3)]);
    }

    #[tokio::test]
    async fn max_id_walks_backwards_across_pages() {
        let all = timeline(450);

        let calls = RefCell::new(Vec::new());

        let got = paginate_max_id(
            450,
            |max_id, size| {
                calls.borrow_mut().push((max_id, size));
                let page = serve(&all, max_id, size);
                async move { Ok(page) }
            },
            |id| *id,
        )
        .await
        .unwrap();

        assert_eq!(got, all);
        assert_eq!(
            calls.into_inner(),
            vec![(None, 200), (Some(800), 200), (Some(600), 50)]
        );
    }

    #[tokio::test]
    async fn max_id_stops_on_empty_page() {
        let all = timeline(4);

        let got = paginate_max_id(
            10,
            |max_id, size| {
                let page = serve(&all, max_id, size.min(2));
                async move { Ok(page) }
            },
            |id| *id,
        )
        .await
        .unwrap();

        assert_eq!(got, vec![1000, 999, 998, 997]);
    }

    #[tokio::test]
    async fn max_id_zero_limit_makes_no_request() {
        let got: Vec<u64> = paginate_max_id(
            0,
            |_, _| async { Err(TwitterError::Config("should not be called".into())) },
            |id| *id,
        )
        .await
        .unwrap();

        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn max_id_propagates_errors() {
        let result: TwitterResult<Vec<u64>> = paginate_max_id(
            5,
            |_, _| async {
                Err(TwitterError::Api {
                    status: 401,
                    message: "Could not authenticate you.".into(),
                    error_code: Some(32),
                })
            },
            |id| *id,
        )
        .await;

        assert!(matches!(result, Err(TwitterError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn cursor_follows_next_cursor_until_zero() {
        let pages = [
            CursorPage {
                items: vec!["a", "b"],
                next_cursor: 11,
            },
            CursorPage {
                items: vec!["c"],
                next_cursor: 0,
            },
        ];
        let seen = RefCell::new(Vec::new());

        let got = paginate_cursor(10, |cursor, _| {
            seen.borrow_mut().push(cursor);
            let page = if cursor == FIRST_CURSOR {
                pages[0].clone()
            } else {
                pages[1].clone()
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(got, vec!["a", "b", "c"]);
        assert_eq!(seen.into_inner(), vec![FIRST_CURSOR, 11]);
    }

    #[tokio::test]
    async fn cursor_truncates_to_limit() {
        let got = paginate_cursor(2, |_, _| async {
            Ok(CursorPage {
                items: vec![1, 2, 3],
                next_cursor: 5,
            })
        })
        .await
        .unwrap();

        assert_eq!(got, vec![1, 2]);
    }
}
