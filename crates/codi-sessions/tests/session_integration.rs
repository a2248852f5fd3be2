use codi_core::Role;
use codi_sessions::{CreateSessionInput, FileSessionStore, SessionManager, SessionManagerConfig, SessionStatus, SessionStore};
use std::time::Duration;
use uuid::Uuid;

async fn temp_store() -> (FileSessionStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(tmp.path().join("sessions")).await.unwrap();
    (store, tmp)
}

#[tokio::test]
async fn create_and_get_session() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;

    store.create(&session).await.unwrap();
    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.messages.len(), 0);
}

#[tokio::test]
async fn get_nonexistent_returns_none() {
    let (store, _tmp) = temp_store().await;
    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_and_update_persists_appended_message() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;
    store.create(&session).await.unwrap();

    manager.add_message(session.id, Role::User, "Hello!", None, Vec::new()).await.unwrap();
    let updated = manager.get(session.id).await.unwrap();
    store.update(&updated).await.unwrap();

    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.messages.len(), 1);
    assert_eq!(loaded.messages[0].content, "Hello!");
}

#[tokio::test]
async fn delete_session_removes_it() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;

    store.create(&session).await.unwrap();
    assert!(store.get(session.id).await.unwrap().is_some());

    store.delete(session.id).await.unwrap();
    assert!(store.get(session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_nonexistent_is_ok() {
    let (store, _tmp) = temp_store().await;
    store.delete(Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn list_returns_every_persisted_session() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let s1 = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;
    let s2 = manager.create(CreateSessionInput { agent: "scribe".to_string(), ..Default::default() }).await;
    let s3 = manager.create(CreateSessionInput { agent: "analyst".to_string(), ..Default::default() }).await;

    store.create(&s1).await.unwrap();
    store.create(&s2).await.unwrap();
    store.create(&s3).await.unwrap();

    let ids = store.list().await.unwrap();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&s1.id));
    assert!(ids.contains(&s2.id));
    assert!(ids.contains(&s3.id));
}

#[tokio::test]
async fn list_empty_store_is_empty() {
    let (store, _tmp) = temp_store().await;
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn session_preserves_message_order_through_persistence() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;

    manager.add_message(session.id, Role::User, "Question 1", None, Vec::new()).await.unwrap();
    manager.add_message(session.id, Role::Assistant, "Answer 1", None, Vec::new()).await.unwrap();
    manager.add_message(session.id, Role::User, "Question 2", None, Vec::new()).await.unwrap();
    manager.add_message(session.id, Role::Assistant, "Answer 2", None, Vec::new()).await.unwrap();

    let session = manager.get(session.id).await.unwrap();
    store.create(&session).await.unwrap();

    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.messages.len(), 4);
    assert_eq!(loaded.messages[0].content, "Question 1");
    assert_eq!(loaded.messages[1].content, "Answer 1");
    assert_eq!(loaded.messages[2].content, "Question 2");
    assert_eq!(loaded.messages[3].content, "Answer 2");
}

#[tokio::test]
async fn session_metadata_persists_across_store_roundtrip() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let mut session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;

    session.metadata.insert("channel".to_string(), serde_json::json!("telegram"));
    session.metadata.insert("user_id".to_string(), serde_json::json!(12345));

    store.create(&session).await.unwrap();
    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.metadata["channel"], "telegram");
    assert_eq!(loaded.metadata["user_id"], 12345);
}

#[tokio::test]
async fn session_active_skills_persist() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let mut session = manager
        .create(CreateSessionInput {
            agent: "sage".to_string(),
            active_skills: vec!["shell".to_string(), "http_fetch".to_string()],
            ..Default::default()
        })
        .await;
    session.active_skills.push("http_fetch".to_string());
    session.active_skills.dedup();

    store.create(&session).await.unwrap();
    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert!(loaded.active_skills.contains(&"shell".to_string()));
    assert!(loaded.active_skills.contains(&"http_fetch".to_string()));
}

#[tokio::test]
async fn create_after_delete_works() {
    let (store, _tmp) = temp_store().await;
    let manager = SessionManager::new();
    let session = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;

    store.create(&session).await.unwrap();
    store.delete(session.id).await.unwrap();
    assert!(store.get(session.id).await.unwrap().is_none());

    store.create(&session).await.unwrap();
    assert!(store.get(session.id).await.unwrap().is_some());
}

#[tokio::test]
async fn prune_stale_sessions_respects_ttl_and_status() {
    let manager = SessionManager::with_config(SessionManagerConfig { ttl: Duration::from_millis(40), max_messages: 50 });
    let active = manager.create(CreateSessionInput { agent: "sage".to_string(), ..Default::default() }).await;
    let idle = manager.create(CreateSessionInput { agent: "scribe".to_string(), ..Default::default() }).await;
    manager.update_status(idle.id, SessionStatus::Idle).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    let pruned = manager.prune_stale_sessions().await;

    assert_eq!(pruned, 1);
    assert!(manager.get(active.id).await.is_some());
    assert!(manager.get(idle.id).await.is_none());
}
