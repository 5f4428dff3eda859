use control_plane::error::AppError;
use control_plane::models::{CheckStatus, LogLevel, ServerDraft, TransportType};
use control_plane::test_utils::test_helpers;

fn draft(name: &str, endpoint: &str, transport: &str, token: Option<&str>) -> ServerDraft {
    ServerDraft {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        transport: transport.to_string(),
        auth_token: token.map(str::to_string),
    }
}

#[tokio::test]
async fn create_then_list_contains_the_record() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.transport, TransportType::Http);
    assert!(created.last_check_status.is_none());

    let servers = registry.list().await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].id, created.id);
    assert_eq!(servers[0].name, "Weather");
    assert_eq!(servers[0].endpoint, "https://x/mcp");
    assert!(!servers[0].auth_configured);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let blank_name = registry
        .create(&draft("   ", "https://x/mcp", "http", None))
        .await;
    assert!(matches!(blank_name, Err(AppError::Validation(_))));

    let blank_endpoint = registry.create(&draft("Weather", "", "http", None)).await;
    assert!(matches!(blank_endpoint, Err(AppError::Validation(_))));

    let bad_transport = registry
        .create(&draft("Weather", "https://x/mcp", "websocket", None))
        .await;
    assert!(matches!(bad_transport, Err(AppError::Validation(_))));

    assert!(registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_appends_initial_log_entry() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();

    let logs = registry.activity_log().entries(&created.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, LogLevel::Info);
    assert_eq!(logs[0].message, "Server Weather added (http).");
}

#[tokio::test]
async fn blank_token_on_update_preserves_the_stored_secret() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", Some("abc")))
        .await
        .unwrap();
    assert!(created.auth_configured);

    // Blank token keeps the existing secret.
    registry
        .update(&created.id, &draft("Weather", "https://x/mcp", "http", Some("  ")))
        .await
        .unwrap();
    let token = registry.token(&created.id).await.unwrap().unwrap();
    assert_eq!(token.expose(), "abc");

    // Omitted token keeps it too.
    registry
        .update(&created.id, &draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();
    let token = registry.token(&created.id).await.unwrap().unwrap();
    assert_eq!(token.expose(), "abc");

    // Non-blank token replaces it.
    registry
        .update(&created.id, &draft("Weather", "https://x/mcp", "http", Some("xyz")))
        .await
        .unwrap();
    let token = registry.token(&created.id).await.unwrap().unwrap();
    assert_eq!(token.expose(), "xyz");
}

#[tokio::test]
async fn auth_configured_flips_when_a_token_is_set_via_update() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();
    assert!(!created.auth_configured);
    assert!(registry.token(&created.id).await.unwrap().is_none());

    let updated = registry
        .update(
            &created.id,
            &draft("Weather", "https://x/mcp", "http", Some("tok123")),
        )
        .await
        .unwrap();
    assert!(updated.auth_configured);

    let token = registry.token(&created.id).await.unwrap().unwrap();
    assert_eq!(token.expose(), "tok123");
}

#[tokio::test]
async fn update_replaces_fields_without_touching_check_state() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();

    registry
        .record_check_result(&created.id, CheckStatus::Healthy, Some(42), "ok")
        .await
        .unwrap();

    let updated = registry
        .update(&created.id, &draft("Climate", "https://y/mcp", "sse", None))
        .await
        .unwrap();

    assert_eq!(updated.name, "Climate");
    assert_eq!(updated.endpoint, "https://y/mcp");
    assert_eq!(updated.transport, TransportType::Sse);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.last_check_status, Some(CheckStatus::Healthy));
    assert_eq!(updated.last_check_latency_ms, Some(42));
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let result = registry
        .update("nope", &draft("Weather", "https://x/mcp", "http", None))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_removes_record_credential_and_logs() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", Some("abc")))
        .await
        .unwrap();

    assert!(registry.delete(&created.id).await.unwrap());

    assert!(registry.list().await.unwrap().is_empty());
    assert!(matches!(
        registry.token(&created.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(registry
        .activity_log()
        .entries(&created.id)
        .await
        .unwrap()
        .is_empty());

    // Deleting again is a no-op, not an error.
    assert!(!registry.delete(&created.id).await.unwrap());
}

#[tokio::test]
async fn record_check_result_updates_fields_and_appends_log() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();

    registry
        .record_check_result(
            &created.id,
            CheckStatus::Unreachable,
            Some(5000),
            "Connection failed",
        )
        .await
        .unwrap();

    let record = registry.get(&created.id).await.unwrap().unwrap();
    assert_eq!(record.last_check_status, Some(CheckStatus::Unreachable));
    assert_eq!(record.last_check_latency_ms, Some(5000));
    assert_eq!(record.last_check_detail.as_deref(), Some("Connection failed"));
    assert!(record.last_check_at.is_some());

    let logs = registry.activity_log().entries(&created.id).await.unwrap();
    assert_eq!(logs[0].level, LogLevel::Error);
    assert!(logs[0].message.contains("unreachable"));
    assert!(logs[0].message.contains("Connection failed"));
}

#[tokio::test]
async fn record_check_result_for_deleted_server_is_a_silent_noop() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();
    registry.delete(&created.id).await.unwrap();

    // Simulates a check finishing after its server was deleted.
    registry
        .record_check_result(&created.id, CheckStatus::Healthy, Some(10), "ok")
        .await
        .unwrap();

    assert!(registry
        .activity_log()
        .entries(&created.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn concurrent_update_and_delete_leave_a_consistent_final_state() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let registry = test_helpers::build_registry(&pool);

    let created = registry
        .create(&draft("Weather", "https://x/mcp", "http", None))
        .await
        .unwrap();

    let update_draft = draft("Climate", "https://y/mcp", "http", None);
    let update = registry.update(&created.id, &update_draft);
    let delete = registry.delete(&created.id);
    let (update_result, delete_result) = tokio::join!(update, delete);

    // Either ordering is fine; the record is never half-written.
    match registry.get(&created.id).await.unwrap() {
        Some(record) => {
            assert!(update_result.is_ok());
            assert_eq!(record.name, "Climate");
            assert_eq!(record.endpoint, "https://y/mcp");
        }
        None => {
            assert!(delete_result.unwrap());
        }
    }
}
