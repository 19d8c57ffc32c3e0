//! Integration tests for the source request flow.

use futures::FutureExt;
use parking_lot::Mutex;
use relay_data::{DataError, Query, QueryExpression, Record, RecordOperation, Transform};
use relay_source::{
    EventName, MemorySource, PatchResult, Pushable, QueryResult, Queryable, Request, Source,
    SourceConfig, SourceError, SourceEvent, SourceResult, Syncable, Updatable, Verb,
};
use relay_testkit::{earth, init_tracing, moon, planet, solar_system};
use serde_json::json;
use std::sync::Arc;

/// Wraps a memory source, recording each capability call and yielding
/// before doing the work.
#[derive(Default)]
struct Recorder {
    cache: MemorySource,
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn with_records(records: Vec<Record>) -> Self {
        Self {
            cache: MemorySource::with_records(records),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn enter(&self, call: String) {
        self.calls.lock().push(call);
        tokio::task::yield_now().await;
    }
}

impl Queryable for Recorder {
    async fn query(&self, query: &Query) -> SourceResult<QueryResult> {
        self.enter(format!("query {}", query.id)).await;
        self.cache.query(query).await
    }
}

impl Pushable for Recorder {
    async fn push(&self, transform: &Transform) -> SourceResult<Vec<Transform>> {
        self.enter(format!("push {}", transform.id)).await;
        self.cache.push(transform).await
    }
}

impl Updatable for Recorder {
    async fn update(&self, transform: &Transform) -> SourceResult<PatchResult> {
        self.enter(format!("update {}", transform.id)).await;
        self.cache.update(transform).await
    }
}

impl Syncable for Recorder {
    async fn sync(&self, transform: &Transform) -> SourceResult<()> {
        self.enter(format!("sync {}", transform.id)).await;
        self.cache.sync(transform).await
    }
}

/// A source whose every update fails with a network error.
struct Offline;

impl Updatable for Offline {
    async fn update(&self, _transform: &Transform) -> SourceResult<PatchResult> {
        Err(DataError::network("offline").into())
    }
}

fn rename_earth(id: &str, name: &str) -> Transform {
    Transform::new(vec![RecordOperation::replace_attribute(
        planet("earth"),
        "name",
        name,
    )])
    .with_id(id)
}

fn add_planet(id: &str, planet_id: &str) -> Transform {
    Transform::new(vec![RecordOperation::add_record(Record::new(planet(planet_id)))]).with_id(id)
}

fn event_label(event: &SourceEvent<'_>) -> String {
    let id = match event {
        SourceEvent::Before { request, .. }
        | SourceEvent::Settled { request, .. }
        | SourceEvent::Failed { request, .. } => request.id().to_string(),
        SourceEvent::Transform(transform) => transform.id.clone(),
    };
    format!("{}:{id}", event.name())
}

/// Records every event named in `names` as `name:id`.
fn watch<H>(source: &Source<H>, names: &[EventName]) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for &name in names {
        let seen = Arc::clone(&seen);
        source.on(name, move |event| {
            seen.lock().push(event_label(event));
            async { Ok(()) }.boxed_local()
        });
    }
    seen
}

fn update_events() -> [EventName; 4] {
    [
        EventName::Before(Verb::Update),
        EventName::Transform,
        EventName::Settled(Verb::Update),
        EventName::Failed(Verb::Update),
    ]
}

#[tokio::test]
async fn update_runs_full_flow() {
    init_tracing();
    let source = Source::new(
        SourceConfig::new("memory"),
        MemorySource::with_records(solar_system()),
    );
    let seen = watch(&source, &update_events());

    let result = source.update(rename_earth("t1", "Terra")).await.unwrap();

    assert_eq!(result.data.len(), 1);
    assert_eq!(
        result.inverse,
        vec![RecordOperation::replace_attribute(planet("earth"), "name", "Earth")]
    );
    assert!(source.transform_log().contains("t1"));
    assert_eq!(
        source
            .handler()
            .record(&planet("earth"))
            .and_then(|r| r.attribute("name").cloned()),
        Some(json!("Terra"))
    );
    assert_eq!(
        *seen.lock(),
        vec!["beforeUpdate:t1", "transform:t1", "update:t1"]
    );
}

#[tokio::test]
async fn replayed_transform_is_skipped_without_events() {
    let source = Source::new(SourceConfig::new("memory"), Recorder::default());
    let t = add_planet("t1", "mars");

    source.update(t.clone()).await.unwrap();
    let seen = watch(&source, &update_events());
    let replay = source.update(t).await.unwrap();

    assert_eq!(replay, PatchResult::default());
    assert_eq!(source.handler().calls(), vec!["update t1"]);
    assert!(seen.lock().is_empty());
    assert_eq!(source.request_queue().processed(), 1);
}

#[tokio::test]
async fn concurrent_replays_apply_once() {
    let source = Source::new(SourceConfig::new("memory"), Recorder::default());
    let seen = watch(&source, &update_events());
    let t = add_planet("t1", "mars");

    let (first, second) = tokio::join!(source.update(t.clone()), source.update(t.clone()));

    assert_eq!(first.unwrap().data.len(), 1);
    assert_eq!(second.unwrap(), PatchResult::default());
    assert_eq!(source.handler().calls(), vec!["update t1"]);
    assert_eq!(source.transform_log().entries(), vec!["t1".to_string()]);
    assert_eq!(
        *seen.lock(),
        vec!["beforeUpdate:t1", "transform:t1", "update:t1"]
    );
}

#[tokio::test]
async fn queued_duplicate_is_not_vetoed() {
    let source = Source::new(SourceConfig::new("memory"), Recorder::default());
    let vetoes = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&vetoes);
    source.on(EventName::Before(Verb::Update), move |event| {
        let mut count = counter.lock();
        *count += 1;
        let result = if *count > 1 {
            Err(SourceError::listener(event.name(), "already seen"))
        } else {
            Ok(())
        };
        async move { result }.boxed_local()
    });
    let failures = watch(&source, &[EventName::Failed(Verb::Update)]);

    let t = add_planet("t1", "mars");
    let (first, second) = tokio::join!(source.update(t.clone()), source.update(t));

    assert!(first.is_ok());
    assert_eq!(second.unwrap(), PatchResult::default());
    assert_eq!(*vetoes.lock(), 1);
    assert!(failures.lock().is_empty());
}

#[tokio::test]
async fn replayed_push_runs_handler_once() {
    let source = Source::new(SourceConfig::new("remote"), Recorder::default());
    let seen = watch(
        &source,
        &[EventName::Before(Verb::Push), EventName::Settled(Verb::Push)],
    );
    let t = add_planet("t1", "mars");

    let (first, second) = tokio::join!(source.push(t.clone()), source.push(t.clone()));
    let third = source.push(t).await.unwrap();

    assert_eq!(first.unwrap().len(), 1);
    assert!(second.unwrap().is_empty());
    assert!(third.is_empty());
    assert_eq!(source.handler().calls(), vec!["push t1"]);
    assert_eq!(*seen.lock(), vec!["beforePush:t1", "push:t1"]);
}

#[tokio::test]
async fn replayed_sync_runs_handler_once() {
    let source = Source::new(SourceConfig::new("store"), Recorder::default());
    let seen = watch(&source, &[EventName::Before(Verb::Sync)]);
    let t = add_planet("t1", "mars");

    let (first, second) = tokio::join!(source.sync(t.clone()), source.sync(t.clone()));
    source.sync(t).await.unwrap();

    first.unwrap();
    second.unwrap();
    assert_eq!(source.handler().calls(), vec!["sync t1"]);
    assert_eq!(*seen.lock(), vec!["beforeSync:t1"]);
    assert_eq!(source.sync_queue().processed(), 2);
}

#[tokio::test]
async fn requests_complete_in_issue_order() {
    let source = Source::new(SourceConfig::new("remote"), Recorder::default());

    let (a, b, c) = tokio::join!(
        source.push(add_planet("t1", "mercury")),
        source.push(add_planet("t2", "venus")),
        source.push(add_planet("t3", "mars")),
    );

    assert_eq!(a.unwrap()[0].id, "t1");
    assert_eq!(b.unwrap()[0].id, "t2");
    assert_eq!(c.unwrap()[0].id, "t3");
    assert_eq!(source.handler().calls(), vec!["push t1", "push t2", "push t3"]);
    assert_eq!(
        source.transform_log().entries(),
        vec!["t1".to_string(), "t2".to_string(), "t3".to_string()]
    );
}

#[tokio::test]
async fn failure_raises_fail_event_and_returns_error_unchanged() {
    let source = Source::new(SourceConfig::new("remote"), Offline);
    let seen = watch(&source, &update_events());

    let err = source.update(rename_earth("t1", "Terra")).await.unwrap_err();

    assert_eq!(err, SourceError::from(DataError::network("offline")));
    assert!(!source.transform_log().contains("t1"));
    assert_eq!(*seen.lock(), vec!["beforeUpdate:t1", "updateFail:t1"]);
}

#[tokio::test]
async fn fail_listener_rejection_does_not_replace_error() {
    let source = Source::new(SourceConfig::new("remote"), Offline);
    source.on(EventName::Failed(Verb::Update), |event| {
        let rejection = SourceError::listener(event.name(), "ignored");
        async move { Err(rejection) }.boxed_local()
    });

    let err = source.update(rename_earth("t1", "Terra")).await.unwrap_err();

    assert_eq!(err.as_data(), Some(&DataError::network("offline")));
}

#[tokio::test]
async fn before_listener_can_veto() {
    let source = Source::new(
        SourceConfig::new("memory"),
        Recorder::with_records(solar_system()),
    );
    source.on(EventName::Before(Verb::Update), |event| {
        let rejection = SourceError::listener(event.name(), "read only");
        async move { Err(rejection) }.boxed_local()
    });
    let seen = watch(&source, &update_events());

    let err = source.update(rename_earth("t1", "Terra")).await.unwrap_err();

    assert_eq!(err, SourceError::listener("beforeUpdate", "read only"));
    assert!(source.handler().calls().is_empty());
    assert!(!source.transform_log().contains("t1"));
    assert_eq!(*seen.lock(), vec!["updateFail:t1"]);
}

#[tokio::test]
async fn transform_applied_by_listener_is_skipped() {
    let source = Arc::new(Source::new(
        SourceConfig::new("memory"),
        Recorder::with_records(solar_system()),
    ));

    let weak = Arc::downgrade(&source);
    source.on(EventName::Before(Verb::Update), move |event| {
        let source = weak.clone();
        let transform = match event {
            SourceEvent::Before {
                request: Request::Transform(transform),
                ..
            } => Some((*transform).clone()),
            _ => None,
        };
        async move {
            if let (Some(source), Some(transform)) = (source.upgrade(), transform) {
                source.transformed(&[transform]).await;
            }
            Ok(())
        }
        .boxed_local()
    });
    let seen = watch(&source, &[EventName::Settled(Verb::Update)]);

    let result = source.update(rename_earth("t1", "Terra")).await.unwrap();

    assert_eq!(result, PatchResult::default());
    assert!(source.handler().calls().is_empty());
    assert!(source.transform_log().contains("t1"));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn transformed_announces_each_transform_once() {
    let source = Source::new(SourceConfig::new("memory"), MemorySource::new());
    let seen = watch(&source, &[EventName::Transform]);

    let t1 = add_planet("t1", "mars");
    let t2 = add_planet("t2", "venus");
    source.transformed(&[t1.clone(), t2.clone()]).await;
    source.transformed(&[t1.clone()]).await;

    assert_eq!(*seen.lock(), vec!["transform:t1", "transform:t2"]);
    assert_eq!(source.update(t1).await.unwrap(), PatchResult::default());
    assert!(source.handler().is_empty());
}

#[tokio::test]
async fn sync_runs_on_its_own_queue() {
    let source = Source::new(
        SourceConfig::new("store"),
        MemorySource::with_records(solar_system()),
    );
    let seen = watch(
        &source,
        &[
            EventName::Before(Verb::Sync),
            EventName::Transform,
            EventName::Settled(Verb::Sync),
        ],
    );

    source.sync(rename_earth("t1", "Terra")).await.unwrap();

    assert_eq!(source.sync_queue().processed(), 1);
    assert_eq!(source.request_queue().processed(), 0);
    assert_eq!(source.sync_queue().name(), "store-sync");
    assert_eq!(
        *seen.lock(),
        vec!["beforeSync:t1", "transform:t1", "sync:t1"]
    );
}

#[tokio::test]
async fn transform_listener_replicates_to_another_source() {
    init_tracing();
    let store = Arc::new(Source::new(
        SourceConfig::new("store"),
        MemorySource::with_records(solar_system()),
    ));
    let remote = Source::new(
        SourceConfig::new("remote"),
        MemorySource::with_records(solar_system()),
    );

    let replica = Arc::clone(&store);
    remote.on(EventName::Transform, move |event| {
        let store = Arc::clone(&replica);
        let transform = match event {
            SourceEvent::Transform(transform) => Some((*transform).clone()),
            _ => None,
        };
        async move {
            match transform {
                Some(transform) => store.sync(transform).await,
                None => Ok(()),
            }
        }
        .boxed_local()
    });

    let t = add_planet("t1", "mars");
    let pushed = remote.push(t.clone()).await.unwrap();

    assert_eq!(pushed, vec![t.clone()]);
    assert!(store.transform_log().contains("t1"));
    assert!(store.handler().contains(&planet("mars")));

    // Replaying the sync would fail on the duplicate add if it ran.
    store.sync(t).await.unwrap();
    assert_eq!(store.sync_queue().processed(), 1);
}

#[tokio::test]
async fn queries_are_never_deduplicated() {
    let source = Source::new(
        SourceConfig::new("memory"),
        Recorder::with_records(solar_system()),
    );
    let query = Query::new(QueryExpression::FindRecord {
        record: planet("earth"),
    })
    .with_id("q1");

    let first = source.query(query.clone()).await.unwrap();
    let second = source.query(query).await.unwrap();

    assert_eq!(first, QueryResult::Record(Some(earth())));
    assert_eq!(first, second);
    assert_eq!(source.handler().calls(), vec!["query q1", "query q1"]);
    assert!(source.transform_log().is_empty());
}

#[tokio::test]
async fn query_errors_raise_query_fail() {
    let source = Source::new(SourceConfig::new("memory"), MemorySource::new());
    let seen = watch(&source, &[EventName::Failed(Verb::Query)]);

    let err = source
        .query_expression(
            QueryExpression::FindRecord {
                record: moon("phobos"),
            },
            None,
            Some("q1".into()),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.as_data(),
        Some(&DataError::RecordNotFound {
            record: moon("phobos")
        })
    );
    assert_eq!(*seen.lock(), vec!["queryFail:q1"]);
}

#[tokio::test]
async fn pull_logs_returned_transforms() {
    let source = Source::new(
        SourceConfig::new("remote"),
        MemorySource::with_records(solar_system()),
    );

    let transforms = source
        .pull(QueryExpression::FindRecords {
            record_type: "planet".into(),
        })
        .await
        .unwrap();

    assert_eq!(transforms.len(), 1);
    assert_eq!(
        transforms[0].operations,
        vec![RecordOperation::replace_record(earth())]
    );
    assert!(source.transform_log().contains(&transforms[0].id));
}

#[tokio::test]
async fn update_operations_builds_transform() {
    let source = Source::new(
        SourceConfig::new("memory"),
        MemorySource::with_records(solar_system()),
    );

    source
        .update_operations(
            RecordOperation::replace_key(planet("earth"), "remoteId", "p4"),
            Some(json!({"label": "rekey"})),
            Some("t9".into()),
        )
        .await
        .unwrap();

    assert_eq!(source.transform_log().head(), Some("t9".to_string()));
    assert_eq!(
        source
            .handler()
            .record(&planet("earth"))
            .and_then(|r| r.key("remoteId").map(str::to_string)),
        Some("p4".to_string())
    );
}

#[tokio::test]
async fn rejected_patch_leaves_source_unchanged() {
    let source = Source::new(
        SourceConfig::new("memory"),
        MemorySource::with_records(solar_system()),
    );
    let before = source.handler().records();

    let err = source
        .update(vec![
            RecordOperation::replace_attribute(planet("earth"), "name", "Terra"),
            RecordOperation::add_record(earth()),
        ])
        .await
        .unwrap_err();

    assert_eq!(
        err.as_data(),
        Some(&DataError::RecordAlreadyExists {
            record: planet("earth")
        })
    );
    assert_eq!(source.handler().records(), before);
    assert!(source.transform_log().is_empty());
}

#[tokio::test]
async fn unsubscribed_listener_is_not_called() {
    let source = Source::new(SourceConfig::new("memory"), MemorySource::new());
    let seen = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&seen);
    let subscription = source.on(EventName::Transform, move |_| {
        *counter.lock() += 1;
        async { Ok(()) }.boxed_local()
    });

    source.update(add_planet("t1", "mars")).await.unwrap();
    assert!(subscription.unsubscribe());
    source.update(add_planet("t2", "venus")).await.unwrap();

    assert_eq!(*seen.lock(), 1);
    assert_eq!(source.events().listener_count(EventName::Transform), 0);
}

#[tokio::test]
async fn operation_forms_use_given_ids() {
    let remote = Source::new(
        SourceConfig::new("remote"),
        MemorySource::with_records(solar_system()),
    );

    let pushed = remote
        .push_operations(
            vec![RecordOperation::add_record(Record::new(planet("mars")))],
            None,
            Some("p1".into()),
        )
        .await
        .unwrap();
    remote
        .sync_operations(
            RecordOperation::replace_attribute(planet("mars"), "name", "Mars"),
            None,
            Some("s1".into()),
        )
        .await
        .unwrap();
    let pulled = remote
        .pull_expression(
            QueryExpression::FindRecord {
                record: planet("mars"),
            },
            None,
            Some("q1".into()),
        )
        .await
        .unwrap();

    assert_eq!(pushed[0].id, "p1");
    assert_eq!(
        remote.transform_log().after("p1"),
        Some(vec!["s1".to_string(), pulled[0].id.clone()])
    );
    assert_eq!(
        pulled[0].operations,
        vec![RecordOperation::replace_record(
            Record::new(planet("mars")).with_attribute("name", "Mars")
        )]
    );
}
