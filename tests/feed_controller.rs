//! Integration tests for the pagination core: controller, record set and
//! scroll trigger driven together against a scripted page source.
//!
//! The scripted fetcher answers from a per-(context, page) queue and records
//! every call, so tests can assert both what was merged and what was asked.

use novella::feed::{
    Completion, FeedController, FeedStatus, FetchError, PageFetcher, QueryContext, Record,
    RecordSet, ScrollTrigger, ViewportMetrics,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: u32,
}

impl Record for Item {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

fn items(ids: &[u32]) -> Vec<Item> {
    ids.iter().map(|&id| Item { id }).collect()
}

fn ids(controller: &FeedController<Item>) -> Vec<u32> {
    controller.records().ids().collect()
}

type Reply = Result<Vec<Item>, FetchError>;

#[derive(Default)]
struct ScriptedFetcher {
    replies: Mutex<HashMap<(QueryContext, u32), VecDeque<Reply>>>,
    calls: Mutex<Vec<(QueryContext, u32)>>,
}

impl ScriptedFetcher {
    fn reply(self, context: &QueryContext, page: u32, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry((context.clone(), page))
            .or_default()
            .push_back(reply);
        self
    }

    fn calls(&self) -> Vec<(QueryContext, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageFetcher<Item> for ScriptedFetcher {
    async fn fetch_page(&self, context: &QueryContext, page: u32) -> Result<Vec<Item>, FetchError> {
        self.calls.lock().unwrap().push((context.clone(), page));
        self.replies
            .lock()
            .unwrap()
            .get_mut(&(context.clone(), page))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A viewport scrolled to the very end of `len` rows.
fn at_bottom(len: usize) -> ViewportMetrics {
    let len = len as u32;
    ViewportMetrics::new(len.saturating_sub(10), 10, len)
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn test_overlapping_pages_merge_then_exhaust() {
    let catalog = QueryContext::Catalog;
    let fetcher = ScriptedFetcher::default()
        .reply(&catalog, 1, Ok(items(&[1, 2])))
        .reply(&catalog, 2, Ok(items(&[2, 3])))
        .reply(&catalog, 3, Ok(vec![]));

    let mut controller: FeedController<Item> = FeedController::new();
    let mut trigger = ScrollTrigger::new(5);

    let first = controller.set_query_context(catalog.clone()).unwrap();
    assert_eq!(
        controller.fulfil(&fetcher, first).await,
        Completion::Merged { page: 1, added: 2 }
    );

    // Scroll events drive the remaining pages
    while trigger.should_fire(at_bottom(controller.records().len()), &controller) {
        let request = controller.request_next_page().unwrap();
        controller.fulfil(&fetcher, request).await;
    }

    assert_eq!(ids(&controller), vec![1, 2, 3]);
    assert_eq!(controller.status(), FeedStatus::Exhausted);
    assert!(!controller.has_more());
    assert_eq!(controller.page(), 3);

    // Further scroll events and explicit requests issue nothing
    for _ in 0..3 {
        assert!(!trigger.should_fire(at_bottom(3), &controller));
        assert!(controller.request_next_page().is_none());
    }
    assert_eq!(
        fetcher.calls(),
        vec![
            (catalog.clone(), 1),
            (catalog.clone(), 2),
            (catalog.clone(), 3)
        ]
    );
}

#[tokio::test]
async fn test_transient_error_then_retry_loses_nothing() {
    let catalog = QueryContext::Catalog;
    let fetcher = ScriptedFetcher::default()
        .reply(&catalog, 1, Ok(items(&[1, 2])))
        .reply(&catalog, 2, Err(FetchError::Transport("reset".to_string())))
        .reply(&catalog, 2, Ok(items(&[3, 4])));

    let mut controller: FeedController<Item> = FeedController::new();
    let first = controller.set_query_context(catalog.clone()).unwrap();
    controller.fulfil(&fetcher, first).await;

    let second = controller.request_next_page().unwrap();
    let completion = controller.fulfil(&fetcher, second).await;
    assert!(matches!(completion, Completion::Failed(FetchError::Transport(_))));
    assert_eq!(controller.page(), 2);
    assert_eq!(ids(&controller), vec![1, 2]);

    // The trigger never fires from Error; only an explicit retry does
    let mut trigger = ScrollTrigger::default();
    assert!(!trigger.should_fire(at_bottom(2), &controller));

    let retry = controller.retry().unwrap();
    assert_eq!(retry.page, 2);
    controller.fulfil(&fetcher, retry).await;

    assert_eq!(ids(&controller), vec![1, 2, 3, 4]);
    assert_eq!(controller.page(), 3);
    assert_eq!(controller.status(), FeedStatus::Idle);
}

#[tokio::test]
async fn test_context_switch_mid_flight_discards_old_results() {
    let catalog = QueryContext::Catalog;
    let fantasy = QueryContext::type_filter("판타지");
    let fetcher = ScriptedFetcher::default()
        .reply(&catalog, 1, Ok(items(&[1, 2, 3])))
        .reply(&fantasy, 1, Ok(items(&[10, 11])));

    let mut controller: FeedController<Item> = FeedController::new();
    let old = controller.set_query_context(catalog.clone()).unwrap();
    let new = controller.set_query_context(fantasy.clone()).unwrap();
    assert_eq!(new.page, 1);
    assert_eq!(new.context, fantasy);

    // Old response resolves after the switch
    let old_result = old.run::<Item, _>(&fetcher).await;
    assert_eq!(controller.complete(&old, old_result), Completion::Stale);
    assert!(controller.records().is_empty());
    assert_eq!(controller.status(), FeedStatus::Loading);

    controller.fulfil(&fetcher, new).await;
    assert_eq!(ids(&controller), vec![10, 11]);
    assert_eq!(controller.context(), Some(&fantasy));
}

#[tokio::test]
async fn test_search_exhausts_after_single_page() {
    let search = QueryContext::search("  Sword ");
    assert_eq!(search, QueryContext::SearchTerm("sword".to_string()));
    let fetcher = ScriptedFetcher::default().reply(&search, 1, Ok(items(&[5])));

    let mut controller: FeedController<Item> = FeedController::new();
    let first = controller.set_query_context(search.clone()).unwrap();
    controller.fulfil(&fetcher, first).await;
    let second = controller.request_next_page().unwrap();
    assert_eq!(
        controller.fulfil(&fetcher, second).await,
        Completion::Exhausted { page: 2 }
    );
    assert_eq!(ids(&controller), vec![5]);
}

#[tokio::test]
async fn test_exhausted_context_reopens_after_switching_back() {
    let catalog = QueryContext::Catalog;
    let romance = QueryContext::type_filter("로맨스");
    let fetcher = ScriptedFetcher::default()
        .reply(&catalog, 1, Ok(vec![]))
        .reply(&romance, 1, Ok(items(&[1])))
        .reply(&catalog, 1, Ok(items(&[7])));

    let mut controller: FeedController<Item> = FeedController::new();
    let request = controller.set_query_context(catalog.clone()).unwrap();
    controller.fulfil(&fetcher, request).await;
    assert_eq!(controller.status(), FeedStatus::Exhausted);
    assert!(controller.view().items.is_empty());

    let request = controller.set_query_context(romance).unwrap();
    controller.fulfil(&fetcher, request).await;
    let request = controller.set_query_context(catalog).unwrap();
    controller.fulfil(&fetcher, request).await;

    assert_eq!(ids(&controller), vec![7]);
    assert_eq!(controller.status(), FeedStatus::Idle);
}

// ============================================================================
// Properties
// ============================================================================

fn page_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..40, 0..12)
}

proptest! {
    #[test]
    fn merge_is_idempotent(page in page_strategy()) {
        let mut once = RecordSet::new();
        once.merge(items(&page));
        let mut twice = once.clone();
        let added = twice.merge(items(&page));

        prop_assert_eq!(added, 0);
        prop_assert_eq!(once.ids().collect::<Vec<_>>(), twice.ids().collect::<Vec<_>>());
    }

    #[test]
    fn merge_never_duplicates_and_keeps_first_seen_order(
        pages in prop::collection::vec(page_strategy(), 0..6)
    ) {
        let mut set = RecordSet::new();
        for page in &pages {
            set.merge(items(page));
        }

        let mut expected = Vec::new();
        for id in pages.iter().flatten() {
            if !expected.contains(id) {
                expected.push(*id);
            }
        }
        prop_assert_eq!(set.ids().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn context_switch_always_resets(
        first in page_strategy(),
        fail in any::<bool>(),
    ) {
        let mut controller: FeedController<Item> = FeedController::new();
        let request = controller.set_query_context(QueryContext::Catalog).unwrap();
        let result = if fail {
            Err(FetchError::Server(500))
        } else {
            Ok(items(&first))
        };
        controller.complete(&request, result);

        let request = controller
            .set_query_context(QueryContext::search("anything"))
            .unwrap();
        prop_assert_eq!(request.page, 1);
        prop_assert_eq!(controller.page(), 1);
        prop_assert!(controller.records().is_empty());
        prop_assert_eq!(controller.status(), FeedStatus::Loading);
        prop_assert!(controller.last_error().is_none());
    }
}
