use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::DateTime;
use livechat_core::{ChatMessage, FetchOptions, ListenerConfig, Segment};
use livechat_engine::{
    ChatListener, ChatObserver, FailureKind, FetchError, ListenerError, ObserverError,
    SnapshotSource,
};
use pretty_assertions::assert_eq;

type Snapshot = Result<Vec<ChatMessage>, FetchError>;

/// Replays scripted snapshots, then keeps returning empty ones.
#[derive(Default)]
struct ScriptedSource {
    script: Mutex<VecDeque<Snapshot>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedSource {
    fn new(script: Vec<Snapshot>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    fn slow(delay: Duration, script: Vec<Snapshot>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_messages(
        &self,
        resource_id: &str,
        _options: &FetchOptions,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        assert_eq!(resource_id, "video-1");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn msg(id: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        text: format!("text {id}"),
        author: "viewer".to_string(),
        author_channel_id: "UCviewer".to_string(),
        author_photos: Vec::new(),
        badges: Vec::new(),
        author_roles: Vec::new(),
        timestamp: DateTime::UNIX_EPOCH,
        segments: vec![Segment::Text {
            text: format!("text {id}"),
        }],
        purchase_amount: None,
    }
}

fn parse_failure() -> FetchError {
    FetchError::new(FailureKind::MalformedJson, "truncated body")
}

fn recorder(listener: &ChatListener) -> Arc<Mutex<Vec<String>>> {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    listener.on_message(Arc::new(
        move |message: &ChatMessage| -> Result<(), ObserverError> {
            sink.lock().unwrap().push(message.id.clone());
            Ok(())
        },
    ));
    delivered
}

fn dynamic(max_stored_ids: usize) -> ListenerConfig {
    ListenerConfig {
        dynamic_polling: true,
        max_stored_ids,
        ..ListenerConfig::default()
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn three_tick_scenario_delivers_and_paces() {
    let source = ScriptedSource::new(vec![
        Ok(vec![msg("msg1")]),
        Ok(Vec::new()),
        Ok(vec![msg("msg1"), msg("msg2")]),
    ]);
    let listener = ChatListener::new("video-1", dynamic(100), source.clone());
    let delivered = recorder(&listener);

    listener.start();
    advance(10).await;
    assert_eq!(*delivered.lock().unwrap(), vec!["msg1"]);
    assert_eq!(listener.current_interval(), Duration::from_millis(1000));

    advance(1000).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(*delivered.lock().unwrap(), vec!["msg1"]);
    assert_eq!(listener.current_interval(), Duration::from_millis(1500));

    advance(1500).await;
    assert_eq!(source.calls(), 3);
    assert_eq!(*delivered.lock().unwrap(), vec!["msg1", "msg2"]);
    assert_eq!(listener.current_interval(), Duration::from_millis(1000));

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn empty_ticks_back_off_to_cap() {
    let source = ScriptedSource::new(Vec::new());
    let listener = ChatListener::new("video-1", dynamic(100), source.clone());

    listener.start();
    let mut intervals = Vec::new();
    for _ in 0..5 {
        advance(1).await;
        let interval = listener.current_interval();
        intervals.push(interval.as_millis());
        tokio::time::sleep(interval).await;
    }
    assert_eq!(intervals, vec![1500, 2250, 3375, 5000, 5000]);
    assert_eq!(source.calls(), 6);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn static_pacing_polls_at_base_rate() {
    let source = ScriptedSource::new(vec![Ok(vec![msg("a")])]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());

    listener.start();
    advance(4500).await;
    assert_eq!(source.calls(), 5);
    assert_eq!(listener.current_interval(), Duration::from_millis(1000));

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn evicted_ids_are_redelivered() {
    let source = ScriptedSource::new(vec![
        Ok(vec![msg("A")]),
        Ok(vec![msg("B")]),
        Ok(vec![msg("C")]),
        Ok(vec![msg("A")]),
    ]);
    let config = ListenerConfig {
        max_stored_ids: 2,
        ..ListenerConfig::default()
    };
    let listener = ChatListener::new("video-1", config, source.clone());
    let delivered = recorder(&listener);

    listener.start();
    advance(3500).await;
    assert_eq!(*delivered.lock().unwrap(), vec!["A", "B", "C", "A"]);
    assert_eq!(listener.seen_count(), 2);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_prevents_further_fetches() {
    let source = ScriptedSource::new(Vec::new());
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());

    listener.start();
    listener.start();
    advance(10).await;
    assert!(listener.is_running());
    assert_eq!(source.calls(), 1);

    listener.stop().await;
    assert!(!listener.is_running());
    advance(10_000).await;
    assert_eq!(source.calls(), 1);

    listener.stop().await;
    assert!(!listener.is_running());
}

#[tokio::test(start_paused = true)]
async fn seen_ids_survive_restart() {
    let source = ScriptedSource::new(vec![
        Ok(vec![msg("a")]),
        Ok(vec![msg("a"), msg("b")]),
    ]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());
    let delivered = recorder(&listener);

    listener.start();
    advance(10).await;
    listener.stop().await;

    listener.start();
    advance(10).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(*delivered.lock().unwrap(), vec!["a", "b"]);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn in_flight_fetch_is_abandoned_on_stop() {
    let source = ScriptedSource::slow(Duration::from_secs(5), vec![Ok(vec![msg("late")])]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());
    let delivered = recorder(&listener);

    listener.start();
    advance(10).await;
    assert_eq!(source.calls(), 1);
    listener.stop().await;

    advance(10_000).await;
    assert!(delivered.lock().unwrap().is_empty());
    assert_eq!(listener.seen_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_observer_does_not_block_others() {
    chat_logging::initialize_for_tests();
    let source = ScriptedSource::new(vec![Ok(vec![msg("a"), msg("b")]), Ok(vec![msg("c")])]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());

    let failing: Arc<dyn ChatObserver> =
        Arc::new(|message: &ChatMessage| -> Result<(), ObserverError> {
            Err(ObserverError::new(format!("cannot handle {}", message.id)))
        });
    listener.on_message(failing);
    let delivered = recorder(&listener);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    listener.on_error(move |err: &ListenerError| error_sink.lock().unwrap().push(err.clone()));

    listener.start();
    advance(1010).await;

    assert_eq!(*delivered.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(source.calls(), 2);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 3);
    assert_eq!(
        errors[0],
        ListenerError::Observer {
            message_id: "a".into(),
            reason: "cannot handle a".into(),
        }
    );

    drop(errors);
    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_is_reported_and_counts_as_empty() {
    chat_logging::initialize_for_tests();
    let source = ScriptedSource::new(vec![Err(parse_failure()), Ok(vec![msg("a")])]);
    let listener = ChatListener::new("video-1", dynamic(100), source.clone());
    let delivered = recorder(&listener);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let error_sink = errors.clone();
    listener.on_error(move |err: &ListenerError| error_sink.lock().unwrap().push(err.clone()));

    listener.start();
    advance(10).await;
    assert!(listener.is_running());
    assert_eq!(listener.current_interval(), Duration::from_millis(1500));
    assert_eq!(
        *errors.lock().unwrap(),
        vec![ListenerError::Fetch(parse_failure())]
    );

    advance(1500).await;
    assert_eq!(*delivered.lock().unwrap(), vec!["a"]);
    assert_eq!(listener.current_interval(), Duration::from_millis(1000));

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn toggling_dynamic_polling_resets_interval() {
    let source = ScriptedSource::new(Vec::new());
    let listener = ChatListener::new("video-1", dynamic(100), source.clone());

    listener.start();
    advance(1510).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(listener.current_interval(), Duration::from_millis(2250));

    listener.set_dynamic_polling(false);
    assert_eq!(listener.current_interval(), Duration::from_millis(1000));

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_messages_from_source_are_filtered() {
    let mut no_author = msg("x");
    no_author.author.clear();
    let source = ScriptedSource::new(vec![Ok(vec![no_author, msg("ok")])]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());
    let delivered = recorder(&listener);

    listener.start();
    advance(10).await;
    assert_eq!(*delivered.lock().unwrap(), vec!["ok"]);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn removed_observer_receives_nothing_more() {
    let source = ScriptedSource::new(vec![Ok(vec![msg("a")]), Ok(vec![msg("b")])]);
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    let observer: Arc<dyn ChatObserver> =
        Arc::new(move |message: &ChatMessage| -> Result<(), ObserverError> {
            sink.lock().unwrap().push(message.id.clone());
            Ok(())
        });
    assert!(listener.on_message(observer.clone()));
    assert!(!listener.on_message(observer.clone()));

    listener.start();
    advance(10).await;
    assert!(listener.remove_observer(&observer));
    advance(1000).await;

    assert_eq!(source.calls(), 2);
    assert_eq!(*delivered.lock().unwrap(), vec!["a"]);

    listener.stop().await;
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 3s");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn restart_during_stop_never_overlaps_ticks() {
    let source = ScriptedSource::new(vec![Ok(vec![msg("a")]), Ok(vec![msg("b")])]);
    let listener = Arc::new(ChatListener::new(
        "video-1",
        ListenerConfig::default(),
        source.clone(),
    ));

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(Mutex::new(Vec::new()));
    {
        let active = active.clone();
        let peak = peak.clone();
        let delivered = delivered.clone();
        listener.on_message(Arc::new(
            move |message: &ChatMessage| -> Result<(), ObserverError> {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(400));
                delivered.lock().unwrap().push(message.id.clone());
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
        ));
    }

    assert!(listener.start());
    wait_for(|| active.load(Ordering::SeqCst) == 1).await;

    let stopping = listener.clone();
    let stopper = tokio::spawn(async move { stopping.stop().await });
    wait_for(|| !listener.is_running()).await;
    assert_eq!(active.load(Ordering::SeqCst), 1);

    assert!(listener.start());
    stopper.await.unwrap();
    wait_for(|| delivered.lock().unwrap().len() == 2).await;

    assert_eq!(*delivered.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(source.calls(), 2);

    listener.stop().await;
}

#[tokio::test(start_paused = true)]
async fn observers_see_ids_recorded_one_at_a_time() {
    let source = ScriptedSource::new(vec![Ok(vec![msg("a"), msg("b"), msg("a"), msg("c")])]);
    let listener = Arc::new(ChatListener::new(
        "video-1",
        ListenerConfig::default(),
        source.clone(),
    ));

    let counts = Arc::new(Mutex::new(Vec::new()));
    let sink = counts.clone();
    let weak = Arc::downgrade(&listener);
    listener.on_message(Arc::new(
        move |_: &ChatMessage| -> Result<(), ObserverError> {
            if let Some(listener) = weak.upgrade() {
                sink.lock().unwrap().push(listener.seen_count());
            }
            Ok(())
        },
    ));

    listener.start();
    advance(10).await;
    assert_eq!(*counts.lock().unwrap(), vec![1, 2, 3]);

    listener.stop().await;
}

#[test]
fn start_outside_runtime_is_refused() {
    let source = ScriptedSource::new(Vec::new());
    let listener = ChatListener::new("video-1", ListenerConfig::default(), source.clone());

    assert!(!listener.start());
    assert!(!listener.is_running());
    assert_eq!(source.calls(), 0);
}
