#![cfg(test)]
use crate::{
    client::{throttle::Throttle, PageRequest, RequestClient, Transport, TransportResponse},
    cursor::{EndReason, PageCursor, WalkerConfig},
    error::{FetchErrorKind, TransportError},
    extractor_config::ScraperConfig,
    pipeline::{PipelineState, SearchPipeline},
};
use futures::StreamExt;
use pinscrape_common::{
    pin::{kind::PinKind, PinRecord},
    query::{SearchFilter, SearchQuery},
    serde_json::{json, Value},
};
use tokio::{
    sync::mpsc::unbounded_channel,
    time::{Duration, Instant},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Reply = Result<TransportResponse, TransportError>;

/// Transport that answers from a fixed script and records every request.
///
/// Once the script runs out it answers with an empty result page.
#[derive(Clone, Default)]
struct Scripted {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
}

impl Scripted {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn bookmarks_sent(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.cursor.token.clone())
            .collect()
    }
}

impl Transport for Scripted {
    async fn get(&self, request: &PageRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| page(vec![], None))
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn status(code: u16) -> Reply {
    Ok(TransportResponse {
        status: code,
        body: String::new(),
    })
}

fn page(entries: Vec<Value>, bookmark: Option<&str>) -> Reply {
    let body = json!({
        "resource_response": {
            "status": "success",
            "data": {"results": entries},
            "bookmark": bookmark
        }
    });
    Ok(TransportResponse {
        status: 200,
        body: body.to_string(),
    })
}

fn full_entry() -> Value {
    json!({
        "id": "159314905561864531",
        "type": "pin",
        "grid_title": "Purple sky wallpaper",
        "created_at": "Mon, 19 Aug 2024 07:32:11 +0000",
        "pinner": {
            "id": "159315042980347393",
            "username": "celee722",
            "full_name": "celee",
            "image_small_url": "https://i.pinimg.com/30x30_RS/9c/1d/4e/9c1d4e.jpg",
            "follower_count": 1289
        },
        "images": {
            "236x": {"url": "https://i.pinimg.com/236x/5e/a1/77/5ea177.jpg"},
            "orig": {"url": "https://i.pinimg.com/originals/5e/a1/77/5ea177.jpg"}
        }
    })
}

fn entry(id: &str) -> Value {
    json!({
        "id": id,
        "title": format!("pin {id}"),
        "created_at": "Tue, 20 Aug 2024 12:00:00 +0000",
        "pinner": {"id": "1", "username": "someone"},
        "images": {"orig": {"url": format!("https://i.pinimg.com/originals/{id}.jpg")}}
    })
}

fn test_config() -> ScraperConfig {
    ScraperConfig {
        throttle_interval_ms: 0,
        ..ScraperConfig::default()
    }
}

fn pipeline(
    transport: &Scripted,
    query: &str,
    limit: usize,
    config: &ScraperConfig,
) -> SearchPipeline<Scripted> {
    let query = SearchQuery::new(query, SearchFilter::All, limit).unwrap();
    let client = RequestClient::with_transport(transport.clone(), config).unwrap();
    SearchPipeline::with_client(query, client, config.walker)
}

async fn drain(pipeline: &mut SearchPipeline<Scripted>) -> Vec<PinRecord> {
    let mut records = Vec::new();
    while let Some(item) = pipeline.next_record().await {
        records.push(item.unwrap());
    }
    records
}

#[tokio::test(start_paused = true)]
async fn single_full_entry_is_mapped() {
    init_logger();
    let transport = Scripted::new(vec![page(vec![full_entry()], Some("more-results"))]);
    let mut search = pipeline(&transport, "wallpapers", 1, &test_config());

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, "159314905561864531");
    assert_eq!(record.title.as_deref(), Some("Purple sky wallpaper"));
    assert_eq!(record.pinner.username.as_deref(), Some("celee722"));
    assert_eq!(record.pinner.full_name.as_deref(), Some("celee"));
    assert_eq!(record.pinner.followers, Some(1289));
    assert_eq!(record.date.formatted, "2024-08-19");
    assert_eq!(
        record.date.initial.as_deref(),
        Some("Mon, 19 Aug 2024 07:32:11 +0000")
    );
    assert_eq!(record.kind, PinKind::Pin);
    assert_eq!(
        record.image_url,
        "https://i.pinimg.com/originals/5e/a1/77/5ea177.jpg"
    );

    assert_eq!(
        search.state(),
        PipelineState::Exhausted(EndReason::LimitReached)
    );
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_avatar_is_explicitly_empty() {
    init_logger();
    let mut without_avatar = full_entry();
    without_avatar["pinner"]
        .as_object_mut()
        .unwrap()
        .remove("image_small_url");
    let transport = Scripted::new(vec![page(vec![without_avatar], None)]);
    let mut search = pipeline(&transport, "wallpapers", 5, &test_config());

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pinner.avatar_url, None);
    let value = serde_json::to_value(&records[0]).unwrap();
    assert!(value["pinner"]["avatarURL"].is_null());
    assert_eq!(search.summary().end, Some(EndReason::NoProgress));
}

#[tokio::test(start_paused = true)]
async fn repeated_page_ends_the_walk() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1")], Some("page-2")),
        page(vec![entry("1")], Some("page-3")),
        page(vec![entry("1")], Some("page-4")),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 1);
    assert_eq!(transport.calls(), 2);
    let summary = search.summary();
    assert_eq!(summary.duplicates_dropped, 1);
    assert_eq!(summary.end, Some(EndReason::DuplicateLoop));
}

#[tokio::test(start_paused = true)]
async fn looping_bookmarks_stop_at_the_duplicate_threshold() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("a")),
        page(vec![entry("1")], Some("b")),
        page(vec![entry("2")], Some("c")),
        page(vec![entry("3")], Some("d")),
    ]);
    let config = ScraperConfig {
        walker: WalkerConfig {
            duplicate_page_threshold: 2,
            max_pages: None,
        },
        ..test_config()
    };
    let mut search = pipeline(&transport, "wallpapers", 50, &config);

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 2);
    assert_eq!(transport.calls(), 3);
    assert_eq!(search.summary().end, Some(EndReason::DuplicateLoop));
}

#[tokio::test(start_paused = true)]
async fn rate_limits_back_off_on_schedule() {
    init_logger();
    let transport = Scripted::new(vec![status(429), status(429), page(vec![entry("1")], None)]);
    let config = test_config();
    let mut search = pipeline(&transport, "wallpapers", 1, &config);
    let start = Instant::now();

    let records = drain(&mut search).await;

    let expected = config
        .retry
        .delay_for(FetchErrorKind::RateLimited, 1)
        + config.retry.delay_for(FetchErrorKind::RateLimited, 2);
    assert_eq!(expected, Duration::from_millis(3_000));

    let elapsed = start.elapsed();
    assert!(elapsed >= expected, "waited only {elapsed:?}");
    assert!(elapsed < expected + Duration::from_millis(10), "waited {elapsed:?}");

    assert_eq!(records.len(), 1);
    assert_eq!(transport.calls(), 3);
    assert_eq!(
        search.state(),
        PipelineState::Exhausted(EndReason::LimitReached)
    );
}

#[tokio::test(start_paused = true)]
async fn blocked_first_page_fails_the_run() {
    init_logger();
    let transport = Scripted::new(vec![status(403)]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());

    let failure = search.next_record().await.unwrap().unwrap_err();

    assert_eq!(failure.kind, FetchErrorKind::Blocked);
    assert_eq!(failure.emitted, 0);
    assert_eq!(failure.page_index, 0);
    assert_eq!(failure.cursor, None);
    assert_eq!(failure.attempts, 1);
    assert_eq!(search.state(), PipelineState::Failed);
    assert!(search.next_record().await.is_none());
    assert_eq!(transport.calls(), 1);
    assert_eq!(search.summary().end, None);
}

#[tokio::test(start_paused = true)]
async fn failure_mid_run_reports_progress() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("page-2")),
        status(502),
        status(502),
        status(502),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());

    assert!(search.next_record().await.unwrap().is_ok());
    assert!(search.next_record().await.unwrap().is_ok());
    let failure = search.next_record().await.unwrap().unwrap_err();

    assert_eq!(failure.kind, FetchErrorKind::Network);
    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.emitted, 2);
    assert_eq!(failure.page_index, 1);
    assert_eq!(failure.cursor.as_deref(), Some("page-2"));
    assert_eq!(search.resume_cursor(), Some(&PageCursor::first()));
}

#[tokio::test(start_paused = true)]
async fn limit_spans_several_pages() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("p2")),
        page(vec![entry("3"), entry("4")], Some("p3")),
        page(vec![entry("5"), entry("6")], Some("p4")),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 5, &test_config());

    let records = drain(&mut search).await;

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3", "4", "5"]);
    assert_eq!(transport.calls(), 3);
    assert_eq!(
        transport.bookmarks_sent(),
        [None, Some("p2".to_string()), Some("p3".to_string())]
    );
    assert_eq!(search.resume_cursor(), Some(&PageCursor::resume("p3", 2)));
}

#[tokio::test(start_paused = true)]
async fn fewer_unique_pins_than_limit() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2"), entry("1")], Some("p2")),
        page(vec![entry("2"), entry("3")], Some(crate::cursor::END_BOOKMARK)),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 100, &test_config());

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 3);
    let summary = search.summary();
    assert_eq!(summary.emitted, 3);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.candidates_seen, 5);
    assert_eq!(summary.duplicates_dropped, 2);
    assert_eq!(summary.end, Some(EndReason::NoProgress));
}

#[tokio::test(start_paused = true)]
async fn empty_page_means_no_more_requests() {
    init_logger();
    let transport = Scripted::new(vec![page(vec![], Some("still-a-bookmark"))]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());

    assert!(drain(&mut search).await.is_empty());
    assert!(search.next_record().await.is_none());
    assert_eq!(transport.calls(), 1);
    assert_eq!(search.summary().end, Some(EndReason::NoEntries));
}

#[tokio::test(start_paused = true)]
async fn malformed_entries_do_not_stop_the_page() {
    init_logger();
    let transport = Scripted::new(vec![page(
        vec![json!({"id": "x"}), json!("junk"), entry("1"), json!({"images": {}})],
        None,
    )]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 1);
    assert_eq!(search.summary().skipped_entries, 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_between_records() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("p2")),
        page(vec![entry("3")], None),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config());
    let cancel = search.cancel_handle();

    let first = search.next_record().await.unwrap().unwrap();
    assert_eq!(first.id, "1");

    cancel.cancel();
    assert!(search.next_record().await.is_none());
    assert_eq!(
        search.state(),
        PipelineState::Exhausted(EndReason::Cancelled)
    );
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_yields_records_lazily() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("p2")),
        page(vec![entry("3")], None),
    ]);
    let search = pipeline(&transport, "wallpapers", 10, &test_config());
    let mut stream = Box::pin(search.into_stream());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.id, "1");
    assert_eq!(transport.calls(), 1);

    let rest: Vec<PinRecord> = stream.map(Result::unwrap).collect().await;
    assert_eq!(rest.len(), 2);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn fetch_thread_sends_through_channel() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("p2")),
        page(vec![entry("3"), entry("4")], None),
    ]);
    let search = pipeline(&transport, "wallpapers", 3, &test_config());
    let (sender, mut receiver) = unbounded_channel();

    let handle = search.setup_fetch_thread(sender);

    let mut received = Vec::new();
    while let Some(record) = receiver.recv().await {
        received.push(record);
    }

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(received.len(), 3);
    assert_eq!(summary.emitted, 3);
    assert_eq!(summary.end, Some(EndReason::LimitReached));
}

#[tokio::test(start_paused = true)]
async fn dropped_receiver_cancels_the_thread() {
    init_logger();
    let transport = Scripted::new(vec![
        page(vec![entry("1"), entry("2")], Some("p2")),
        page(vec![entry("3")], None),
    ]);
    let search = pipeline(&transport, "wallpapers", 10, &test_config());
    let (sender, receiver) = unbounded_channel();
    drop(receiver);

    let summary = search.setup_fetch_thread(sender).await.unwrap().unwrap();

    assert_eq!(summary.end, Some(EndReason::Cancelled));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_throttle_spaces_independent_runs() {
    init_logger();
    let config = ScraperConfig {
        throttle_interval_ms: 1_000,
        ..ScraperConfig::default()
    };
    let first_transport = Scripted::new(vec![page(vec![entry("1")], None)]);
    let second_transport = Scripted::new(vec![page(vec![entry("1")], None)]);

    let throttle = Throttle::new(config.throttle_interval());

    let mut first = SearchPipeline::with_client(
        SearchQuery::new("cats", SearchFilter::All, 5).unwrap(),
        RequestClient::with_transport(first_transport.clone(), &config)
            .unwrap()
            .with_throttle(throttle.clone()),
        config.walker,
    );
    let mut second = SearchPipeline::with_client(
        SearchQuery::new("dogs", SearchFilter::Videos, 5).unwrap(),
        RequestClient::with_transport(second_transport.clone(), &config)
            .unwrap()
            .with_throttle(throttle),
        config.walker,
    );

    let start = Instant::now();
    let (a, b) = tokio::join!(drain(&mut first), drain(&mut second));

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert!(start.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn resumes_from_persisted_cursor() {
    init_logger();
    let transport = Scripted::new(vec![page(vec![entry("40")], None)]);
    let mut search = pipeline(&transport, "wallpapers", 10, &test_config())
        .with_start_cursor(PageCursor::resume("persisted", 7));

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 1);
    assert_eq!(transport.bookmarks_sent(), [Some("persisted".to_string())]);
    assert_eq!(
        search.resume_cursor(),
        Some(&PageCursor::resume("persisted", 7))
    );
}

#[tokio::test(start_paused = true)]
async fn page_cap_limits_the_walk() {
    init_logger();
    let config = ScraperConfig {
        throttle_interval_ms: 0,
        walker: WalkerConfig {
            duplicate_page_threshold: 2,
            max_pages: Some(1),
        },
        ..ScraperConfig::default()
    };
    let transport = Scripted::new(vec![
        page(vec![entry("1")], Some("p2")),
        page(vec![entry("2")], Some("p3")),
        page(vec![entry("3")], Some("p4")),
    ]);
    let mut search = pipeline(&transport, "wallpapers", 10, &config);

    let records = drain(&mut search).await;

    assert_eq!(records.len(), 2);
    assert_eq!(transport.calls(), 2);
    assert_eq!(search.summary().end, Some(EndReason::PageCap));
}
