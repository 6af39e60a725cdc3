// captain-client/tests/cache_scenarios.rs
// End-to-end behaviour of the stale-while-revalidate cache

use async_trait::async_trait;
use captain_client::cache::NO_SESSION;
use captain_client::{
    CacheEntry, CachedClient, ClientError, ClientResult, KvStore, LoginSession, MemoryStore,
    RequestOptions, StoreError, StoreResult, Transport, cache_key,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport answering from a queue and recording what the UI had seen
/// when each call started
#[derive(Default)]
struct FakeTransport {
    responses: Mutex<VecDeque<ClientResult<Value>>>,
    seen_updates: Arc<Mutex<Vec<Value>>>,
    updates_at_call: Mutex<Vec<usize>>,
}

impl FakeTransport {
    fn new(seen_updates: Arc<Mutex<Vec<Value>>>) -> Self {
        Self {
            seen_updates,
            ..Default::default()
        }
    }

    fn respond(&self, response: ClientResult<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> usize {
        self.updates_at_call.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post(&self, _: &str, _: &Value, _: &RequestOptions) -> ClientResult<Value> {
        let seen = self.seen_updates.lock().unwrap().len();
        self.updates_at_call.lock().unwrap().push(seen);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

/// Store whose every operation fails
struct BrokenStore;

fn broken() -> StoreError {
    StoreError::Serialization(serde_json::from_str::<Value>("{").unwrap_err())
}

#[async_trait]
impl KvStore for BrokenStore {
    async fn get(&self, _: &str) -> StoreResult<Option<String>> {
        Err(broken())
    }
    async fn set(&self, _: &str, _: &str) -> StoreResult<()> {
        Err(broken())
    }
    async fn remove(&self, _: &str) -> StoreResult<()> {
        Err(broken())
    }
    async fn all_keys(&self) -> StoreResult<Vec<String>> {
        Err(broken())
    }
    async fn multi_remove(&self, _: &[String]) -> StoreResult<()> {
        Err(broken())
    }
}

struct Harness {
    client: CachedClient,
    store: Arc<MemoryStore>,
    transport: Arc<FakeTransport>,
    updates: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
    fn new() -> Self {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(FakeTransport::new(updates.clone()));
        let store = Arc::new(MemoryStore::new());
        let client = CachedClient::new(transport.clone(), store.clone());
        Self {
            client,
            store,
            transport,
            updates,
        }
    }

    async fn call(&self, endpoint: &str, payload: &Value) -> ClientResult<Value> {
        let updates = self.updates.clone();
        self.client
            .request(endpoint, payload, &RequestOptions::default(), move |v| {
                updates.lock().unwrap().push(v.clone())
            })
            .await
    }

    fn updates(&self) -> Vec<Value> {
        self.updates.lock().unwrap().clone()
    }

    async fn seed(&self, key: &str, data: Value, age_ms: i64) {
        let entry = CacheEntry {
            data,
            timestamp: shared::util::now_millis() - age_ms,
        };
        self.store
            .set(key, &serde_json::to_string(&entry).unwrap())
            .await
            .unwrap();
    }

    async fn stored(&self, key: &str) -> Option<CacheEntry> {
        let raw = self.store.get(key).await.unwrap()?;
        Some(serde_json::from_str(&raw).unwrap())
    }
}

fn login(device: &str) -> LoginSession {
    LoginSession {
        device_token: device.to_string(),
        access_token: "access".to_string(),
        refresh_token: None,
        user_id: "1".to_string(),
        owner_data: None,
    }
}

const MINUTE_MS: i64 = 60 * 1000;

#[tokio::test]
async fn test_empty_storage_placeholder_then_fresh_body() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    let body = json!({"st": 1, "lists": [{"id": 1}]});
    h.transport.respond(Ok(body.clone()));

    let before = shared::util::now_millis();
    let result = h.call("/order_listview", &payload).await.unwrap();
    let after = shared::util::now_millis();

    assert_eq!(result, body);
    assert_eq!(h.updates(), vec![json!({"st": 1, "lists": []}), body.clone()]);

    let entry = h
        .stored(&cache_key("/order_listview", &payload, NO_SESSION))
        .await
        .unwrap();
    assert_eq!(entry.data, body);
    assert!(entry.timestamp >= before && entry.timestamp <= after);
}

#[tokio::test]
async fn test_placeholder_delivered_before_network_call() {
    let h = Harness::new();
    h.transport.respond(Ok(json!({"st": 1, "data": [1]})));

    h.call("/table_view", &json!({})).await.unwrap();

    assert_eq!(*h.transport.updates_at_call.lock().unwrap(), vec![1]);
    assert_eq!(h.updates()[0], json!({"st": 1, "data": []}));
}

#[tokio::test]
async fn test_network_failure_falls_back_to_cache_and_rejects() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    let cached = json!({"st": 1, "data": [{"menu": "Dal"}]});
    h.seed(&cache_key("/menu_view", &payload, NO_SESSION), cached.clone(), MINUTE_MS)
        .await;
    h.transport
        .respond(Err(ClientError::from_status(502, "gateway down".to_string())));

    let err = h.call("/menu_view", &payload).await.unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 502, ref body } if body == "gateway down"));
    assert_eq!(h.updates(), vec![cached.clone(), cached]);
}

#[tokio::test]
async fn test_network_failure_without_cache_only_shows_placeholder() {
    let h = Harness::new();
    h.transport.respond(Err(ClientError::Unauthorized));

    let err = h.call("/menu_view", &json!({})).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(h.updates(), vec![json!({"st": 1, "data": []})]);
}

#[tokio::test]
async fn test_stale_realtime_entry_always_refreshed() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    let body = json!({"st": 1, "lists": [{"id": 9}]});
    h.seed(
        &cache_key("/order_listview", &payload, NO_SESSION),
        body.clone(),
        6 * MINUTE_MS,
    )
    .await;
    h.transport.respond(Ok(body.clone()));

    h.call("/order_listview", &payload).await.unwrap();

    // Identical body is still re-delivered for realtime endpoints
    assert_eq!(h.transport.calls(), 1);
    assert_eq!(h.updates(), vec![body.clone(), body]);
}

#[tokio::test]
async fn test_fresh_entry_still_hits_network() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    let key = cache_key("/get_outlet", &payload, NO_SESSION);
    h.seed(&key, json!({"st": 1, "data": {"name": "Old"}}), MINUTE_MS)
        .await;
    h.transport
        .respond(Ok(json!({"st": 1, "data": {"name": "New"}})));

    h.call("/get_outlet", &payload).await.unwrap();

    assert_eq!(h.transport.calls(), 1);
    assert_eq!(
        h.updates(),
        vec![
            json!({"st": 1, "data": {"name": "Old"}}),
            json!({"st": 1, "data": {"name": "New"}})
        ]
    );
    assert_eq!(
        h.stored(&key).await.unwrap().data,
        json!({"st": 1, "data": {"name": "New"}})
    );
}

#[tokio::test]
async fn test_unchanged_body_skips_second_update() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    let cached: Value = serde_json::from_str(r#"{"st":1,"data":{"a":1,"b":2}}"#).unwrap();
    h.seed(&cache_key("/get_outlet", &payload, NO_SESSION), cached.clone(), MINUTE_MS)
        .await;
    // Same structure, different key order on the wire
    let fresh: Value = serde_json::from_str(r#"{"data":{"b":2,"a":1},"st":1}"#).unwrap();
    h.transport.respond(Ok(fresh));

    h.call("/get_outlet", &payload).await.unwrap();

    assert_eq!(h.updates(), vec![cached]);
}

#[tokio::test]
async fn test_empty_body_with_cache_keeps_cached_view() {
    let h = Harness::new();
    let payload = json!({});
    let key = cache_key("/get_outlet", &payload, NO_SESSION);
    let cached = json!({"st": 1, "data": {"name": "Cached"}});
    h.seed(&key, cached.clone(), MINUTE_MS).await;
    h.transport.respond(Ok(Value::Null));

    let result = h.call("/get_outlet", &payload).await.unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(h.updates(), vec![cached.clone()]);
    assert_eq!(h.stored(&key).await.unwrap().data, cached);
}

#[tokio::test]
async fn test_empty_body_without_cache_is_delivered() {
    let h = Harness::new();
    h.transport.respond(Ok(Value::Null));

    h.call("/get_outlet", &json!({})).await.unwrap();

    assert_eq!(h.updates(), vec![json!({"st": 1, "data": []}), Value::Null]);
    assert!(
        h.stored(&cache_key("/get_outlet", &json!({}), NO_SESSION))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_sessions_never_share_entries() {
    let h = Harness::new();
    let payload = json!({"outlet_id": 7});
    h.client.session().begin_session(&login("dev-a")).await.unwrap();
    h.seed(
        &cache_key("/menu_view", &payload, "dev-a"),
        json!({"st": 1, "data": ["from a"]}),
        MINUTE_MS,
    )
    .await;
    // Seed without purging: simulates an entry written under another id
    h.store.set("device_token", "dev-b").await.unwrap();
    h.transport.respond(Err(ClientError::Timeout));

    let _ = h.call("/menu_view", &payload).await;

    assert_eq!(h.updates(), vec![json!({"st": 1, "data": []})]);
}

#[tokio::test]
async fn test_clear_all_cache_on_new_session_removes_everything() {
    let h = Harness::new();
    let keys = [
        cache_key("/menu_view", &json!({}), "dev-a"),
        cache_key("/menu_view", &json!({}), "dev-b"),
        cache_key("/order_listview", &json!({"outlet_id": 1}), NO_SESSION),
    ];
    for key in &keys {
        h.seed(key, json!({"st": 1}), 0).await;
    }
    h.store.set("outlet_id", "1").await.unwrap();

    let removed = h.client.clear_all_cache_on_new_session().await;

    assert_eq!(removed, 3);
    for key in &keys {
        assert!(h.store.get(key).await.unwrap().is_none());
    }
    assert_eq!(h.store.get("outlet_id").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn test_clear_all_cache_scoped_to_current_session() {
    let h = Harness::new();
    h.client.session().begin_session(&login("dev-a")).await.unwrap();
    let mine = cache_key("/menu_view", &json!({}), "dev-a");
    let theirs = cache_key("/menu_view", &json!({}), "dev-b");
    h.seed(&mine, json!({"st": 1}), 0).await;
    h.seed(&theirs, json!({"st": 1}), 0).await;

    assert_eq!(h.client.clear_all_cache().await, 1);
    assert!(h.store.get(&mine).await.unwrap().is_none());
    assert!(h.store.get(&theirs).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clear_all_cache_ignores_sessions_sharing_a_suffix() {
    let h = Harness::new();
    h.client.session().begin_session(&login("b")).await.unwrap();
    let mine = cache_key("/menu_view", &json!({"outlet_id": 1}), "b");
    let theirs = cache_key("/menu_view", &json!({"outlet_id": 1}), "tab_b");
    h.seed(&mine, json!({"st": 1}), 0).await;
    h.seed(&theirs, json!({"st": 1}), 0).await;

    assert_eq!(h.client.clear_all_cache().await, 1);
    assert!(h.store.get(&mine).await.unwrap().is_none());
    assert!(h.store.get(&theirs).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clear_cache_single_entry() {
    let h = Harness::new();
    let a = cache_key("/menu_view", &json!({"outlet_id": 1}), NO_SESSION);
    let b = cache_key("/menu_view", &json!({"outlet_id": 2}), NO_SESSION);
    h.seed(&a, json!({"st": 1}), 0).await;
    h.seed(&b, json!({"st": 1}), 0).await;

    h.client.clear_cache("/menu_view", &json!({"outlet_id": 1})).await;

    assert!(h.store.get(&a).await.unwrap().is_none());
    assert!(h.store.get(&b).await.unwrap().is_some());
}

#[tokio::test]
async fn test_storage_failure_never_blocks_network() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let transport = Arc::new(FakeTransport::new(updates.clone()));
    let body = json!({"st": 1, "data": [1, 2, 3]});
    transport.respond(Ok(body.clone()));
    let client = CachedClient::new(transport.clone(), Arc::new(BrokenStore));

    let sink = updates.clone();
    let result = client
        .request("/menu_view", &json!({}), &RequestOptions::default(), move |v| {
            sink.lock().unwrap().push(v.clone())
        })
        .await
        .unwrap();

    assert_eq!(result, body);
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        *updates.lock().unwrap(),
        vec![json!({"st": 1, "data": []}), body]
    );
    assert_eq!(client.clear_all_cache_on_new_session().await, 0);
}
