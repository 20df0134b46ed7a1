//! Admin surface integration tests: catalog, balances, settings, stats.

mod common;

use common::TestHarness;
use serde_json::json;

fn key(harness: &TestHarness) -> &str {
    harness.service_api_key.as_str()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn admin_routes_reject_bad_or_missing_key() {
    let harness = TestHarness::new();

    harness.server.get("/v1/products").await.assert_status_unauthorized();

    harness
        .server
        .get("/v1/stats")
        .add_header("x-api-key", "wrong-key")
        .await
        .assert_status_unauthorized();

    // Health stays public.
    harness.server.get("/health").await.assert_status_ok();
}

// ============================================================================
// Product catalog
// ============================================================================

#[tokio::test]
async fn product_crud_lifecycle() {
    let harness = TestHarness::new();

    // Create
    let created: serde_json::Value = harness
        .server
        .post("/v1/products")
        .add_header("x-api-key", key(&harness))
        .json(&json!({
            "category": "Streaming",
            "name": "Netflix",
            "price": 25_000,
            "description": "1 month"
        }))
        .await
        .json();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["stock"], 0);

    // Duplicate name is refused
    harness
        .server
        .post("/v1/products")
        .add_header("x-api-key", key(&harness))
        .json(&json!({
            "category": "Streaming",
            "name": "Netflix",
            "price": 30_000,
            "description": "dup"
        }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);

    // Edit the closed field set
    let updated: serde_json::Value = harness
        .server
        .patch(&format!("/v1/products/{id}"))
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "name": "Netflix Premium", "price": 28_000 }))
        .await
        .json();
    assert_eq!(updated["name"], "Netflix Premium");
    assert_eq!(updated["price"], 28_000);

    // Old name is free again, new name resolves
    let listed: serde_json::Value = harness
        .server
        .get("/v1/products")
        .add_header("x-api-key", key(&harness))
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Netflix Premium");

    // Delete
    harness
        .server
        .delete(&format!("/v1/products/{id}"))
        .add_header("x-api-key", key(&harness))
        .await
        .assert_status_ok();
    harness
        .server
        .get(&format!("/v1/products/{id}"))
        .add_header("x-api-key", key(&harness))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn product_validation_rejects_bad_input() {
    let harness = TestHarness::new();

    for body in [
        json!({ "category": "X", "name": "", "price": 100, "description": "" }),
        json!({ "category": "X", "name": "ok", "price": 0, "description": "" }),
        json!({ "category": "X", "name": "ok", "price": -5, "description": "" }),
    ] {
        harness
            .server
            .post("/v1/products")
            .add_header("x-api-key", key(&harness))
            .json(&body)
            .await
            .assert_status_bad_request();
    }
}

#[tokio::test]
async fn restock_appends_and_keeps_counter_in_sync() {
    let harness = TestHarness::new();

    let created: serde_json::Value = harness
        .server
        .post("/v1/products")
        .add_header("x-api-key", key(&harness))
        .json(&json!({
            "category": "VPN",
            "name": "NordVPN",
            "price": 10_000,
            "description": "30 days"
        }))
        .await
        .json();
    let id = created["id"].as_str().unwrap().to_string();

    let restocked: serde_json::Value = harness
        .server
        .post(&format!("/v1/products/{id}/stock"))
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "items": ["key-1", "  key-2  ", "", "key-3"] }))
        .await
        .json();
    // Blank entries are dropped, the rest trimmed.
    assert_eq!(restocked["stock"], 3);

    // Appending again grows the same queue.
    let again: serde_json::Value = harness
        .server
        .post(&format!("/v1/products/{id}/stock"))
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "items": ["key-4"] }))
        .await
        .json();
    assert_eq!(again["stock"], 4);

    // An all-blank restock is rejected.
    harness
        .server
        .post(&format!("/v1/products/{id}/stock"))
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "items": ["", "   "] }))
        .await
        .assert_status_bad_request();
}

// ============================================================================
// Buyers and balances
// ============================================================================

#[tokio::test]
async fn ensure_user_refreshes_display_name() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/users")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "user_id": 42, "display_name": "Old Name" }))
        .await
        .assert_status_ok();

    let refreshed: serde_json::Value = harness
        .server
        .post("/v1/users")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "user_id": 42, "display_name": "New Name" }))
        .await
        .json();
    assert_eq!(refreshed["display_name"], "New Name");
    assert_eq!(refreshed["balance"], 0);

    let ids: serde_json::Value = harness
        .server
        .get("/v1/users")
        .add_header("x-api-key", key(&harness))
        .await
        .json();
    assert_eq!(ids["user_ids"], json!([42]));
}

#[tokio::test]
async fn balance_adjustment_cannot_go_negative() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/users")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "user_id": 50, "display_name": "Kim" }))
        .await
        .assert_status_ok();

    let credited: serde_json::Value = harness
        .server
        .post("/v1/users/50/balance")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "delta": 10_000 }))
        .await
        .json();
    assert_eq!(credited["balance"], 10_000);

    harness
        .server
        .post("/v1/users/50/balance")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "delta": -20_000 }))
        .await
        .assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);

    // A zero delta is a validation error.
    harness
        .server
        .post("/v1/users/50/balance")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "delta": 0 }))
        .await
        .assert_status_bad_request();

    let user: serde_json::Value = harness
        .server
        .get("/v1/users/50")
        .add_header("x-api-key", key(&harness))
        .await
        .json();
    assert_eq!(user["balance"], 10_000);
}

#[tokio::test]
async fn unknown_user_is_404() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/users/990000")
        .add_header("x-api-key", key(&harness))
        .await
        .assert_status_not_found();

    harness
        .server
        .post("/v1/users/990000/balance")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "delta": 100 }))
        .await
        .assert_status_not_found();
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn settings_roundtrip() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/settings/success_sticker_id")
        .add_header("x-api-key", key(&harness))
        .await
        .assert_status_not_found();

    harness
        .server
        .put("/v1/settings/success_sticker_id")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "value": "CAACAgUAAxkBAAE" }))
        .await
        .assert_status_ok();

    let setting: serde_json::Value = harness
        .server
        .get("/v1/settings/success_sticker_id")
        .add_header("x-api-key", key(&harness))
        .await
        .json();
    assert_eq!(setting["value"], "CAACAgUAAxkBAAE");
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn stats_reflect_ledger_counts() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/users")
        .add_header("x-api-key", key(&harness))
        .json(&json!({ "user_id": 60, "display_name": "Lee" }))
        .await
        .assert_status_ok();
    harness
        .server
        .post("/v1/products")
        .add_header("x-api-key", key(&harness))
        .json(&json!({
            "category": "Music",
            "name": "Spotify",
            "price": 15_000,
            "description": "1 month"
        }))
        .await
        .assert_status_ok();

    let stats: serde_json::Value = harness
        .server
        .get("/v1/stats")
        .add_header("x-api-key", key(&harness))
        .await
        .json();
    assert_eq!(stats["users"], 1);
    assert_eq!(stats["products"], 1);
    assert_eq!(stats["transactions"], 0);
    assert_eq!(stats["gateway_enabled"], false);
}
