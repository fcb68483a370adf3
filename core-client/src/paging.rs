//! Pagination / continuation engine.
//!
//! One loop serves all three provider strategies (offset+total, opaque
//! cursor, next-link URL). The binding parses each page into a
//! [`PageChunk`]; the engine decides whether and how to fetch the next page,
//! strictly sequentially so accumulated ordering is prior-pages-first.
//!
//! Offset arithmetic tracks items SEEN (the server's count), never items
//! kept after parent filtering — see `PageChunk::raw_count`.

use bridge_traits::http::{HttpRequest, HttpTransport};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::binding::{PageAdvance, PageChunk, PageRequest};
use crate::error::{CloudError, Result};
use crate::model::{CloudEntry, CloudFolder};

/// Accumulate a complete listing across pages.
///
/// * `make_request` builds the provider request for a given page position.
/// * `parse` turns a response body into entries plus a continuation signal.
/// * `parent_filter` — when listing a folder, entries whose declared parent
///   does not match are dropped (several providers leak unrelated entries
///   into flat listings). Search passes `None`.
/// * `cancel` — checked between pages; cancellation aborts the accumulation
///   with [`CloudError::Cancelled`] without issuing further requests.
///
/// Returns `Ok(None)` when the accumulated listing is empty — the explicit
/// "succeeded, zero results" outcome.
pub(crate) async fn accumulate_pages<R, P>(
    http: &dyn HttpTransport,
    mut make_request: R,
    mut parse: P,
    parent_filter: Option<&CloudFolder>,
    cancel: &CancellationToken,
) -> Result<Option<Vec<CloudEntry>>>
where
    R: FnMut(&PageRequest) -> Result<HttpRequest>,
    P: FnMut(&[u8]) -> Result<PageChunk>,
{
    let mut page = PageRequest::First;
    let mut seen: u64 = 0;
    let mut collected: Vec<CloudEntry> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            debug!("listing accumulation cancelled after {} entries", collected.len());
            return Err(CloudError::Cancelled);
        }

        let request = make_request(&page)?;
        let response = http
            .execute(request)
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(CloudError::from_status(response.status, &response.body));
        }

        let chunk = parse(&response.body)?;
        seen += chunk.raw_count;

        for listed in chunk.entries {
            if let Some(folder) = parent_filter {
                if let Some(parent) = &listed.parent {
                    if !parent.matches(&folder.locator) {
                        debug!(
                            entry = listed.entry.name(),
                            "dropping entry with mismatched parent"
                        );
                        continue;
                    }
                }
            }
            collected.push(listed.entry);
        }

        match chunk.advance {
            PageAdvance::Done => break,
            PageAdvance::OffsetTotal { total } => {
                if seen < total {
                    page = PageRequest::Offset { offset: seen };
                } else {
                    break;
                }
            }
            PageAdvance::Cursor(cursor) => page = PageRequest::Cursor(cursor),
            PageAdvance::NextUrl(url) => page = PageRequest::Url(url),
        }
    }

    if collected.is_empty() {
        Ok(None)
    } else {
        Ok(Some(collected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ListedEntry;
    use crate::model::{CloudFile, EntryLocator};
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpMethod, HttpResponse};
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingTransport {
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl CountingTransport {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(request.url.clone());
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        }
    }

    fn file_entry(name: &str) -> ListedEntry {
        ListedEntry::new(CloudEntry::File(CloudFile {
            locator: EntryLocator::by_id(name),
            name: name.to_string(),
            size: None,
            created: None,
            modified: None,
        }))
    }

    fn entries(prefix: &str, count: usize) -> Vec<ListedEntry> {
        (0..count)
            .map(|i| file_entry(&format!("{}-{}", prefix, i)))
            .collect()
    }

    #[tokio::test]
    async fn test_offset_accumulation_spans_pages() {
        // Server pages of [500, 500, 37], total 1037.
        let transport = CountingTransport::new();
        let pages = Mutex::new(vec![
            (500usize, 1037u64),
            (500, 1037),
            (37, 1037),
        ]);
        let offsets = Mutex::new(Vec::new());

        let result = accumulate_pages(
            &transport,
            |page| {
                let offset = match page {
                    PageRequest::First => 0,
                    PageRequest::Offset { offset } => *offset,
                    other => panic!("unexpected page request: {other:?}"),
                };
                offsets.lock().unwrap().push(offset);
                Ok(HttpRequest::new(
                    HttpMethod::Get,
                    format!("https://api.example/items?offset={}", offset),
                ))
            },
            |_body| {
                let (size, total) = pages.lock().unwrap().remove(0);
                Ok(PageChunk {
                    entries: entries("item", size),
                    raw_count: size as u64,
                    advance: PageAdvance::OffsetTotal { total },
                })
            },
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let items = result.unwrap();
        assert_eq!(items.len(), 1037);
        // Page order preserved
        assert_eq!(items[0].name(), "item-0");
        assert_eq!(items[500].name(), "item-0");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 500, 1000]);
    }

    #[tokio::test]
    async fn test_cursor_accumulation_two_requests() {
        let transport = CountingTransport::new();
        let responses = Mutex::new(vec![
            PageChunk {
                entries: entries("a", 2),
                raw_count: 2,
                advance: PageAdvance::Cursor("cursor-1".into()),
            },
            PageChunk {
                entries: entries("b", 1),
                raw_count: 1,
                advance: PageAdvance::Done,
            },
        ]);
        let cursors = Mutex::new(Vec::new());

        let result = accumulate_pages(
            &transport,
            |page| {
                if let PageRequest::Cursor(cursor) = page {
                    cursors.lock().unwrap().push(cursor.clone());
                }
                Ok(HttpRequest::new(HttpMethod::Post, "https://api.example/list"))
            },
            |_body| Ok(responses.lock().unwrap().remove(0)),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let items = result.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items.iter().map(|e| e.name()).collect::<Vec<_>>(),
            vec!["a-0", "a-1", "b-0"]
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cursors.lock().unwrap(), vec!["cursor-1"]);
    }

    #[tokio::test]
    async fn test_next_link_accumulation() {
        let transport = CountingTransport::new();
        let responses = Mutex::new(vec![
            PageChunk {
                entries: entries("p1", 2),
                raw_count: 2,
                advance: PageAdvance::NextUrl("https://api.example/items?skip=2".into()),
            },
            PageChunk {
                entries: entries("p2", 2),
                raw_count: 2,
                advance: PageAdvance::Done,
            },
        ]);

        let result = accumulate_pages(
            &transport,
            |page| match page {
                PageRequest::First => {
                    Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/items"))
                }
                PageRequest::Url(url) => Ok(HttpRequest::new(HttpMethod::Get, url.clone())),
                other => panic!("unexpected page request: {other:?}"),
            },
            |_body| Ok(responses.lock().unwrap().remove(0)),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.unwrap().len(), 4);
        assert_eq!(
            transport.urls.lock().unwrap()[1],
            "https://api.example/items?skip=2"
        );
    }

    #[tokio::test]
    async fn test_parent_mismatch_filtered_but_offset_tracks_seen() {
        let transport = CountingTransport::new();
        let folder = CloudFolder::root(EntryLocator::by_id("folder-1"), "/");

        // Two pages; each page returns 3 raw items of which one belongs to a
        // different parent. Total 6 raw items.
        let responses = Mutex::new(vec![
            PageChunk {
                entries: vec![
                    ListedEntry::with_parent(
                        file_entry("keep-1").entry,
                        EntryLocator::by_id("folder-1"),
                    ),
                    ListedEntry::with_parent(
                        file_entry("stray-1").entry,
                        EntryLocator::by_id("other"),
                    ),
                    ListedEntry::with_parent(
                        file_entry("keep-2").entry,
                        EntryLocator::by_id("folder-1"),
                    ),
                ],
                raw_count: 3,
                advance: PageAdvance::OffsetTotal { total: 6 },
            },
            PageChunk {
                entries: vec![
                    ListedEntry::with_parent(
                        file_entry("keep-3").entry,
                        EntryLocator::by_id("folder-1"),
                    ),
                    ListedEntry::with_parent(
                        file_entry("stray-2").entry,
                        EntryLocator::by_id("other"),
                    ),
                    ListedEntry::with_parent(
                        file_entry("keep-4").entry,
                        EntryLocator::by_id("folder-1"),
                    ),
                ],
                raw_count: 3,
                advance: PageAdvance::OffsetTotal { total: 6 },
            },
        ]);
        let offsets = Mutex::new(Vec::new());

        let result = accumulate_pages(
            &transport,
            |page| {
                let offset = match page {
                    PageRequest::First => 0,
                    PageRequest::Offset { offset } => *offset,
                    other => panic!("unexpected page request: {other:?}"),
                };
                offsets.lock().unwrap().push(offset);
                Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/items"))
            },
            |_body| Ok(responses.lock().unwrap().remove(0)),
            Some(&folder),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let items = result.unwrap();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|e| e.name().starts_with("keep")));
        // The second offset is 3 (items seen), not 2 (items kept).
        assert_eq!(*offsets.lock().unwrap(), vec![0, 3]);
    }

    #[tokio::test]
    async fn test_empty_listing_is_none() {
        let transport = CountingTransport::new();

        let result = accumulate_pages(
            &transport,
            |_page| Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/items")),
            |_body| {
                Ok(PageChunk {
                    entries: vec![],
                    raw_count: 0,
                    advance: PageAdvance::Done,
                })
            },
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_page_fetches() {
        let transport = CountingTransport::new();
        let cancel = CancellationToken::new();
        let cancel_in_parse = cancel.clone();

        let result = accumulate_pages(
            &transport,
            |_page| Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/items")),
            |_body| {
                // Caller navigates away while the first page is parsing.
                cancel_in_parse.cancel();
                Ok(PageChunk {
                    entries: entries("x", 2),
                    raw_count: 2,
                    advance: PageAdvance::Cursor("next".into()),
                })
            },
            None,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(CloudError::Cancelled)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_error_propagates() {
        mockall::mock! {
            Transport {}

            #[async_trait]
            impl HttpTransport for Transport {
                async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            }
        }

        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 503,
                headers: HashMap::new(),
                body: Bytes::from_static(b"{\"message\":\"maintenance\"}"),
            })
        });

        let result = accumulate_pages(
            &transport,
            |_page| Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/items")),
            |_body| unreachable!("parse should not run on a failed response"),
            None,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(CloudError::Remote { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
