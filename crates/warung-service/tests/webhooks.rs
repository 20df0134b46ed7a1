//! Gateway webhook integration tests.
//!
//! Pending intents are seeded directly through the store; the callbacks
//! under test arrive over HTTP like the gateway's would, with the client
//! address carried in `x-forwarded-for`.

mod common;

use common::{TestHarness, GATEWAY_IP};
use futures::future::join_all;
use serde_json::json;

use warung_core::{ItemSnapshot, Product, RefId, RefKind, Transaction, TxStatus, UserId};
use warung_store::Store;

fn pending_topup(harness: &TestHarness, user_id: i64, amount: i64) -> RefId {
    let user = UserId::new(user_id);
    harness.store.ensure_user(user, "Buyer").unwrap();
    let ref_id = RefId::generate(RefKind::TopUp, user);
    let tx =
        Transaction::pending_gateway(user, ref_id.clone(), ItemSnapshot::of_topup(amount), amount);
    harness.store.insert_pending(&tx).unwrap();
    ref_id
}

fn pending_product(harness: &TestHarness, user_id: i64, items: &[&str]) -> (RefId, Product) {
    let user = UserId::new(user_id);
    harness.store.ensure_user(user, "Buyer").unwrap();

    let product = Product::new("Streaming", "Netflix", 20_000, "1 month");
    harness.store.create_product(&product).unwrap();
    let items: Vec<String> = items.iter().map(ToString::to_string).collect();
    harness.store.append_stock(&product.id, &items).unwrap();
    let product = harness.store.get_product(&product.id).unwrap().unwrap();

    let ref_id = RefId::generate(RefKind::Product, user);
    let tx = Transaction::pending_gateway(
        user,
        ref_id.clone(),
        ItemSnapshot::of_product(&product),
        product.price,
    );
    harness.store.insert_pending(&tx).unwrap();
    (ref_id, product)
}

async fn post_callback(
    harness: &TestHarness,
    ref_id: &str,
    status: &str,
    signature: Option<&str>,
    source_ip: &str,
) -> serde_json::Value {
    let mut body = json!({ "ref_kode": ref_id, "status": status });
    if let Some(sig) = signature {
        body["signature"] = json!(sig);
    }
    let response = harness
        .server
        .post("/webhooks/qris")
        .add_header("x-forwarded-for", source_ip)
        .json(&body)
        .await;
    // The webhook acks everything with the same body.
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn signed_success_credits_topup() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 100, 40_000);

    let ack = post_callback(
        &harness,
        ref_id.as_str(),
        "success",
        Some(&harness.sign_callback(ref_id.as_str())),
        "198.51.100.1",
    )
    .await;
    assert_eq!(ack["status"], true);

    let user = harness.store.get_user(UserId::new(100)).unwrap().unwrap();
    assert_eq!(user.balance, 40_000);
    assert_eq!(user.total_transactions, 1);
    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Success
    );
}

#[tokio::test]
async fn signed_success_dispenses_product() {
    let harness = TestHarness::new();
    let (ref_id, product) = pending_product(&harness, 101, &["acct-1", "acct-2"]);

    post_callback(
        &harness,
        ref_id.as_str(),
        "success",
        Some(&harness.sign_callback(ref_id.as_str())),
        "198.51.100.1",
    )
    .await;

    let after = harness.store.get_product(&product.id).unwrap().unwrap();
    assert_eq!(after.stock, 1);
    assert_eq!(after.contents, vec!["acct-2".to_string()]);
    assert_eq!(after.total_sold, 1);
}

#[tokio::test]
async fn replayed_success_credits_exactly_once() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 102, 25_000);
    let signature = harness.sign_callback(ref_id.as_str());

    for _ in 0..3 {
        post_callback(
            &harness,
            ref_id.as_str(),
            "success",
            Some(&signature),
            "198.51.100.1",
        )
        .await;
    }

    let user = harness.store.get_user(UserId::new(102)).unwrap().unwrap();
    assert_eq!(user.balance, 25_000);
    assert_eq!(user.total_transactions, 1);
}

#[tokio::test]
async fn bad_signature_acks_but_does_not_settle() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 103, 10_000);

    let ack = post_callback(
        &harness,
        ref_id.as_str(),
        "success",
        Some("0000000000000000000000000000000000000000000000000000000000000000"),
        GATEWAY_IP,
    )
    .await;
    assert_eq!(ack["status"], true);

    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Pending
    );
    assert_eq!(harness.store.get_user(UserId::new(103)).unwrap().unwrap().balance, 0);
}

#[tokio::test]
async fn unsigned_callback_honored_only_from_allowed_ip() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 104, 30_000);

    // From an arbitrary address: acked, not settled.
    post_callback(&harness, ref_id.as_str(), "success", None, "203.0.113.9").await;
    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Pending
    );

    // From the gateway's egress address: settled.
    post_callback(&harness, ref_id.as_str(), "success", None, GATEWAY_IP).await;
    assert_eq!(harness.store.get_user(UserId::new(104)).unwrap().unwrap().balance, 30_000);
}

#[tokio::test]
async fn expired_is_terminal_and_blocks_late_success() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 105, 15_000);
    let signature = harness.sign_callback(ref_id.as_str());

    post_callback(&harness, ref_id.as_str(), "expired", Some(&signature), GATEWAY_IP).await;
    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Expired
    );

    // The late SUCCESS is acked but changes nothing.
    post_callback(&harness, ref_id.as_str(), "success", Some(&signature), GATEWAY_IP).await;
    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Expired
    );
    assert_eq!(harness.store.get_user(UserId::new(105)).unwrap().unwrap().balance, 0);
}

#[tokio::test]
async fn failed_closes_the_intent() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 106, 5_000);

    post_callback(
        &harness,
        ref_id.as_str(),
        "failed",
        Some(&harness.sign_callback(ref_id.as_str())),
        GATEWAY_IP,
    )
    .await;

    assert_eq!(
        harness.store.get_transaction(&ref_id).unwrap().unwrap().status,
        TxStatus::Failed
    );
}

#[tokio::test]
async fn cancelled_intent_callback_is_acked_noop() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 107, 20_000);
    harness.store.cancel_pending(&ref_id, UserId::new(107)).unwrap();

    let ack = post_callback(
        &harness,
        ref_id.as_str(),
        "success",
        Some(&harness.sign_callback(ref_id.as_str())),
        GATEWAY_IP,
    )
    .await;
    assert_eq!(ack["status"], true);

    assert!(harness.store.get_transaction(&ref_id).unwrap().is_none());
    assert_eq!(harness.store.get_user(UserId::new(107)).unwrap().unwrap().balance, 0);
}

#[tokio::test]
async fn unrecognized_payloads_are_acked() {
    let harness = TestHarness::new();

    // Unknown prefix, missing ref, and undecodable body all ack.
    for body in [
        json!({ "ref_kode": "BAL-1-1700000000000", "status": "success" }),
        json!({ "status": "success" }),
        json!({ "ref_kode": 42 }),
    ] {
        let response = harness
            .server
            .post("/webhooks/qris")
            .add_header("x-forwarded-for", GATEWAY_IP)
            .json(&body)
            .await;
        response.assert_status_ok();
        let ack: serde_json::Value = response.json();
        assert_eq!(ack["status"], true);
    }
}

#[tokio::test]
async fn legacy_ref_field_and_header_signature_are_accepted() {
    let harness = TestHarness::new();
    let ref_id = pending_topup(&harness, 108, 8_000);

    let response = harness
        .server
        .post("/webhooks/qris")
        .add_header("x-callback-signature", harness.sign_callback(ref_id.as_str()).as_str())
        .json(&json!({ "ref": ref_id.as_str(), "status": "SUCCESS" }))
        .await;
    response.assert_status_ok();

    assert_eq!(harness.store.get_user(UserId::new(108)).unwrap().unwrap().balance, 8_000);
}

#[tokio::test]
async fn concurrent_topup_callbacks_sum_exactly() {
    let harness = TestHarness::new();
    let amounts = [10_000_i64, 20_000, 30_000, 40_000, 50_000];

    let mut refs = Vec::new();
    for (i, amount) in amounts.iter().enumerate() {
        // Distinct creation millis keep the reference ids unique.
        let user = UserId::new(200);
        harness.store.ensure_user(user, "Buyer").unwrap();
        let ref_id = RefId::parse(&format!("TOPUP-200-{}", 1_700_000_000_000_i64 + i as i64))
            .unwrap()
            .0;
        let tx = Transaction::pending_gateway(
            user,
            ref_id.clone(),
            ItemSnapshot::of_topup(*amount),
            *amount,
        );
        harness.store.insert_pending(&tx).unwrap();
        refs.push(ref_id);
    }

    // Fire every callback twice, concurrently and unordered.
    let calls = refs
        .iter()
        .flat_map(|ref_id| [ref_id.clone(), ref_id.clone()])
        .map(|ref_id| {
            let signature = harness.sign_callback(ref_id.as_str());
            let harness = &harness;
            async move {
                post_callback(harness, ref_id.as_str(), "success", Some(&signature), GATEWAY_IP)
                    .await
            }
        });
    join_all(calls).await;

    let user = harness.store.get_user(UserId::new(200)).unwrap().unwrap();
    assert_eq!(user.balance, amounts.iter().sum::<i64>());
    assert_eq!(user.total_transactions, amounts.len() as u64);
}
