//! Asynchronous gateway settlement via webhook callbacks.
//!
//! Callbacks are untrusted input: authenticity is established per event by
//! an HMAC signature over the reference id, or for unsigned events by the
//! source-address allowlist. Replays and races are absorbed by the store's
//! conditional status transition, which refuses to touch a terminal row.

use warung_core::signature::{callback_signature, constant_time_eq};
use warung_core::{EngineError, ItemKind, RefId, Transaction, TxStatus};
use warung_store::StoreError;

use super::checkout::Delivery;
use super::{map_store_err, Engine};

/// A gateway callback, as decoded by the HTTP layer.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// The reference id named by the callback.
    pub ref_id: String,
    /// The gateway-reported status string (`SUCCESS`, `FAILED`, `EXPIRED`).
    pub status: String,
    /// The HMAC signature, if the gateway sent one.
    pub signature: Option<String>,
    /// The source address the event arrived from, if known.
    pub source_ip: Option<String>,
}

/// What the engine did with a callback.
///
/// The HTTP handler acknowledges the gateway identically in every case;
/// this type exists for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// The transaction moved to SUCCESS and its effect was applied.
    Settled {
        /// The settled reference id.
        ref_id: RefId,
        /// What was delivered.
        delivery: Delivery,
    },
    /// The transaction moved to FAILED or EXPIRED.
    Closed {
        /// The closed reference id.
        ref_id: RefId,
        /// The terminal status applied.
        status: TxStatus,
    },
    /// The callback had no effect.
    Ignored {
        /// Why it was dropped.
        reason: &'static str,
    },
}

impl Engine {
    /// Process one gateway callback.
    ///
    /// The checks run in a fixed order: reference-id shape and prefix,
    /// transaction lookup, duplicate guard, authenticity, then the status
    /// transition and its business effect. Inauthentic, unknown, and
    /// replayed events all come back as [`CallbackDisposition::Ignored`];
    /// the caller acknowledges the gateway regardless.
    ///
    /// # Errors
    ///
    /// Only ledger faults surface as errors. Every business condition is a
    /// disposition, not an error.
    pub async fn handle_callback(
        &self,
        event: &CallbackEvent,
    ) -> Result<CallbackDisposition, EngineError> {
        let Ok((ref_id, kind)) = RefId::parse(&event.ref_id) else {
            tracing::warn!(ref_id = %event.ref_id, "Callback with malformed reference id");
            return Ok(CallbackDisposition::Ignored {
                reason: "malformed reference id",
            });
        };
        if !kind.settles_via_gateway() {
            tracing::warn!(ref_id = %ref_id, "Callback for a non-gateway reference id");
            return Ok(CallbackDisposition::Ignored {
                reason: "reference id does not settle via gateway",
            });
        }

        let Some(tx) = self.store().get_transaction(&ref_id).map_err(map_store_err)? else {
            tracing::warn!(ref_id = %ref_id, "Callback for an unknown transaction");
            return Ok(CallbackDisposition::Ignored {
                reason: "unknown transaction",
            });
        };

        // Duplicate guard before the authenticity check: replays of settled
        // events are routine and must not spam the logs as auth failures.
        if tx.status.is_terminal() {
            tracing::info!(ref_id = %ref_id, status = ?tx.status, "Replayed callback ignored");
            return Ok(CallbackDisposition::Ignored {
                reason: "transaction already terminal",
            });
        }

        if !self.callback_is_authentic(&ref_id, event) {
            tracing::warn!(
                ref_id = %ref_id,
                source_ip = event.source_ip.as_deref().unwrap_or("unknown"),
                "Inauthentic callback rejected"
            );
            return Ok(CallbackDisposition::Ignored {
                reason: "authenticity check failed",
            });
        }

        match event.status.as_str() {
            "SUCCESS" => self.settle_callback(&ref_id, &tx, event).await,
            "FAILED" => self.close_callback(&ref_id, TxStatus::Failed).await,
            "EXPIRED" => self.close_callback(&ref_id, TxStatus::Expired).await,
            other => {
                tracing::warn!(ref_id = %ref_id, status = other, "Callback with unknown status");
                Ok(CallbackDisposition::Ignored {
                    reason: "unknown status",
                })
            }
        }
    }

    /// Signed events must carry a valid HMAC over the reference id; unsigned
    /// events fall back to the source-address allowlist.
    fn callback_is_authentic(&self, ref_id: &RefId, event: &CallbackEvent) -> bool {
        match &event.signature {
            Some(signature) => {
                let Some(key) = self.policy().hmac_key.as_deref() else {
                    return false;
                };
                let expected = callback_signature(key, ref_id.as_str());
                constant_time_eq(signature, &expected)
            }
            None => event
                .source_ip
                .as_deref()
                .is_some_and(|ip| self.policy().allowed_ips.contains(ip)),
        }
    }

    /// Flip the row to SUCCESS, then apply its effect: credit a top-up or
    /// dispense one unit of the purchased product.
    async fn settle_callback(
        &self,
        ref_id: &RefId,
        tx: &Transaction,
        event: &CallbackEvent,
    ) -> Result<CallbackDisposition, EngineError> {
        // The conditional transition is the idempotency boundary: the losing
        // side of a concurrent race sees AlreadySettled here.
        match self.store().mark_success(ref_id, event.signature.as_deref()) {
            Ok(_) => {}
            Err(StoreError::AlreadySettled { .. }) => {
                tracing::info!(ref_id = %ref_id, "Lost settlement race, callback ignored");
                return Ok(CallbackDisposition::Ignored {
                    reason: "transaction already terminal",
                });
            }
            Err(other) => return Err(map_store_err(other)),
        }

        let delivery = match tx.item.kind {
            ItemKind::Topup => self.apply_topup(ref_id, tx).await?,
            ItemKind::Product => self.dispense_for(ref_id, tx).await?,
        };

        tracing::info!(ref_id = %ref_id, user_id = %tx.user_id, "Gateway settlement applied");

        Ok(CallbackDisposition::Settled {
            ref_id: ref_id.clone(),
            delivery,
        })
    }

    async fn apply_topup(
        &self,
        ref_id: &RefId,
        tx: &Transaction,
    ) -> Result<Delivery, EngineError> {
        let new_balance = self
            .store()
            .credit_topup(tx.user_id, tx.amount)
            .map_err(map_store_err)?;
        self.notify_user(
            tx.user_id,
            &format!(
                "Top-up of {} received. Your balance is now {new_balance}.",
                tx.amount
            ),
        )
        .await;
        self.send_success_sticker(tx.user_id).await;
        Ok(Delivery::TopupApplied { new_balance })
    }

    /// Dispense against the live catalog, resolved by the snapshotted name.
    /// A product deleted or emptied since intent creation is not an error:
    /// the payment already settled, so an operator is alerted instead.
    async fn dispense_for(
        &self,
        ref_id: &RefId,
        tx: &Transaction,
    ) -> Result<Delivery, EngineError> {
        let name = &tx.item.product_name;
        let product = self.store().get_product_by_name(name).map_err(map_store_err)?;

        let dispensed = match product {
            Some(product) => match self.store().dispense(&product.id) {
                Ok(d) => Some((d, product)),
                Err(StoreError::OutOfStock { .. } | StoreError::NotFound { .. }) => None,
                Err(other) => return Err(map_store_err(other)),
            },
            None => None,
        };

        let Some((dispensed, product)) = dispensed else {
            tracing::error!(ref_id = %ref_id, product = %name, "Paid but nothing to dispense");
            self.notify_admin(&format!(
                "MANUAL DELIVERY NEEDED: {ref_id} paid for {name} but the queue was empty"
            ))
            .await;
            self.notify_user(
                tx.user_id,
                "Payment received. Your item is out of stock; an operator will deliver it shortly.",
            )
            .await;
            return Ok(Delivery::Undelivered);
        };

        self.notify_user(
            tx.user_id,
            &format!("Payment received: {}\n\n{}", product.name, dispensed.content),
        )
        .await;
        self.send_success_sticker(tx.user_id).await;
        self.notify_channel(&format!(
            "{} sold for {} (QRIS), {} left in stock",
            product.name, tx.amount, dispensed.remaining_stock
        ))
        .await;

        Ok(Delivery::Content {
            content: dispensed.content,
        })
    }

    async fn close_callback(
        &self,
        ref_id: &RefId,
        status: TxStatus,
    ) -> Result<CallbackDisposition, EngineError> {
        match self.store().mark_terminal(ref_id, status) {
            Ok(tx) => {
                tracing::info!(ref_id = %ref_id, status = ?status, "Gateway closed intent");
                let verdict = if status == TxStatus::Expired {
                    "expired"
                } else {
                    "failed"
                };
                self.notify_user(
                    tx.user_id,
                    &format!("Your payment {ref_id} {verdict}. No funds were taken."),
                )
                .await;
                Ok(CallbackDisposition::Closed {
                    ref_id: ref_id.clone(),
                    status,
                })
            }
            Err(StoreError::AlreadySettled { .. }) => Ok(CallbackDisposition::Ignored {
                reason: "transaction already terminal",
            }),
            Err(other) => Err(map_store_err(other)),
        }
    }
}

impl CallbackDisposition {
    /// A terse description for structured logs.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Settled { .. } => "settled",
            Self::Closed { .. } => "closed",
            Self::Ignored { .. } => "ignored",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tempfile::TempDir;
    use warung_core::{ItemSnapshot, Product, RefKind, UserId};
    use warung_store::{RocksStore, Store};

    use super::*;
    use crate::engine::WebhookPolicy;
    use crate::notify::NoopNotifier;

    const API_KEY: &str = "merchant-api-key";
    const GATEWAY_IP: &str = "202.155.132.37";

    fn test_engine() -> (Engine, Arc<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let policy = WebhookPolicy {
            hmac_key: Some(API_KEY.to_string()),
            allowed_ips: HashSet::from([GATEWAY_IP.to_string()]),
        };
        let engine = Engine::new(store.clone(), None, Arc::new(NoopNotifier), policy, None);
        (engine, store, dir)
    }

    fn pending_topup(store: &RocksStore, user: UserId, amount: i64) -> RefId {
        store.ensure_user(user, "Buyer").unwrap();
        let ref_id = RefId::generate(RefKind::TopUp, user);
        let tx = Transaction::pending_gateway(
            user,
            ref_id.clone(),
            ItemSnapshot::of_topup(amount),
            amount,
        );
        store.insert_pending(&tx).unwrap();
        ref_id
    }

    fn pending_product(store: &RocksStore, user: UserId, items: &[&str]) -> (RefId, Product) {
        store.ensure_user(user, "Buyer").unwrap();
        let product = Product::new("Streaming", "Netflix", 20_000, "1 month");
        store.create_product(&product).unwrap();
        let items: Vec<String> = items.iter().map(ToString::to_string).collect();
        if !items.is_empty() {
            store.append_stock(&product.id, &items).unwrap();
        }
        let product = store.get_product(&product.id).unwrap().unwrap();

        let ref_id = RefId::generate(RefKind::Product, user);
        let tx = Transaction::pending_gateway(
            user,
            ref_id.clone(),
            ItemSnapshot::of_product(&product),
            product.price,
        );
        store.insert_pending(&tx).unwrap();
        (ref_id, product)
    }

    fn signed_event(ref_id: &RefId, status: &str) -> CallbackEvent {
        CallbackEvent {
            ref_id: ref_id.to_string(),
            status: status.to_string(),
            signature: Some(callback_signature(API_KEY, ref_id.as_str())),
            source_ip: Some("198.51.100.1".to_string()),
        }
    }

    #[tokio::test]
    async fn signed_success_settles_topup() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(500);
        let ref_id = pending_topup(&store, user, 40_000);

        let disposition = engine
            .handle_callback(&signed_event(&ref_id, "SUCCESS"))
            .await
            .unwrap();

        assert_eq!(
            disposition,
            CallbackDisposition::Settled {
                ref_id: ref_id.clone(),
                delivery: Delivery::TopupApplied { new_balance: 40_000 },
            }
        );
        assert_eq!(store.get_user(user).unwrap().unwrap().balance, 40_000);
        assert_eq!(
            store.get_transaction(&ref_id).unwrap().unwrap().status,
            TxStatus::Success
        );
    }

    #[tokio::test]
    async fn signed_success_dispenses_product() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(501);
        let (ref_id, product) = pending_product(&store, user, &["acct-1", "acct-2"]);

        let disposition = engine
            .handle_callback(&signed_event(&ref_id, "SUCCESS"))
            .await
            .unwrap();

        assert_eq!(
            disposition,
            CallbackDisposition::Settled {
                ref_id,
                delivery: Delivery::Content {
                    content: "acct-1".to_string()
                },
            }
        );
        assert_eq!(store.get_product(&product.id).unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn replayed_success_is_ignored_and_credits_once() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(502);
        let ref_id = pending_topup(&store, user, 25_000);
        let event = signed_event(&ref_id, "SUCCESS");

        engine.handle_callback(&event).await.unwrap();
        let second = engine.handle_callback(&event).await.unwrap();

        assert!(matches!(second, CallbackDisposition::Ignored { .. }));
        assert_eq!(store.get_user(user).unwrap().unwrap().balance, 25_000);
    }

    #[tokio::test]
    async fn bad_signature_leaves_transaction_pending() {
        let (engine, store, _dir) = test_engine();
        let ref_id = pending_topup(&store, UserId::new(503), 10_000);

        let event = CallbackEvent {
            ref_id: ref_id.to_string(),
            status: "SUCCESS".to_string(),
            signature: Some("deadbeef".to_string()),
            source_ip: Some(GATEWAY_IP.to_string()),
        };

        let disposition = engine.handle_callback(&event).await.unwrap();
        assert!(matches!(disposition, CallbackDisposition::Ignored { .. }));
        assert_eq!(
            store.get_transaction(&ref_id).unwrap().unwrap().status,
            TxStatus::Pending
        );
    }

    #[tokio::test]
    async fn unsigned_callback_trusted_only_from_allowed_ip() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(504);
        let ref_id = pending_topup(&store, user, 30_000);

        let from_stranger = CallbackEvent {
            ref_id: ref_id.to_string(),
            status: "SUCCESS".to_string(),
            signature: None,
            source_ip: Some("203.0.113.9".to_string()),
        };
        let rejected = engine.handle_callback(&from_stranger).await.unwrap();
        assert!(matches!(rejected, CallbackDisposition::Ignored { .. }));

        let from_gateway = CallbackEvent {
            source_ip: Some(GATEWAY_IP.to_string()),
            ..from_stranger
        };
        let settled = engine.handle_callback(&from_gateway).await.unwrap();
        assert!(matches!(settled, CallbackDisposition::Settled { .. }));
        assert_eq!(store.get_user(user).unwrap().unwrap().balance, 30_000);
    }

    #[tokio::test]
    async fn expired_then_success_cannot_resurrect() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(505);
        let ref_id = pending_topup(&store, user, 15_000);

        let closed = engine
            .handle_callback(&signed_event(&ref_id, "EXPIRED"))
            .await
            .unwrap();
        assert_eq!(
            closed,
            CallbackDisposition::Closed {
                ref_id: ref_id.clone(),
                status: TxStatus::Expired,
            }
        );

        // A late SUCCESS for the same id must not settle.
        let late = engine
            .handle_callback(&signed_event(&ref_id, "SUCCESS"))
            .await
            .unwrap();
        assert!(matches!(late, CallbackDisposition::Ignored { .. }));
        assert_eq!(store.get_user(user).unwrap().unwrap().balance, 0);
        assert_eq!(
            store.get_transaction(&ref_id).unwrap().unwrap().status,
            TxStatus::Expired
        );
    }

    #[tokio::test]
    async fn failed_marks_terminal() {
        let (engine, store, _dir) = test_engine();
        let ref_id = pending_topup(&store, UserId::new(506), 5_000);

        let disposition = engine
            .handle_callback(&signed_event(&ref_id, "FAILED"))
            .await
            .unwrap();
        assert!(matches!(
            disposition,
            CallbackDisposition::Closed {
                status: TxStatus::Failed,
                ..
            }
        ));
        assert_eq!(
            store.get_transaction(&ref_id).unwrap().unwrap().status,
            TxStatus::Failed
        );
    }

    #[tokio::test]
    async fn balance_prefix_and_garbage_are_ignored() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(507);
        store.ensure_user(user, "Buyer").unwrap();

        for raw in ["BAL-507-1700000000000", "garbage", "PROD-abc-1"] {
            let event = CallbackEvent {
                ref_id: raw.to_string(),
                status: "SUCCESS".to_string(),
                signature: None,
                source_ip: Some(GATEWAY_IP.to_string()),
            };
            let disposition = engine.handle_callback(&event).await.unwrap();
            assert!(matches!(disposition, CallbackDisposition::Ignored { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn unknown_transaction_is_ignored() {
        let (engine, _store, _dir) = test_engine();
        let event = CallbackEvent {
            ref_id: "TOPUP-999-1700000000000".to_string(),
            status: "SUCCESS".to_string(),
            signature: None,
            source_ip: Some(GATEWAY_IP.to_string()),
        };
        let disposition = engine.handle_callback(&event).await.unwrap();
        assert_eq!(
            disposition,
            CallbackDisposition::Ignored {
                reason: "unknown transaction"
            }
        );
    }

    #[tokio::test]
    async fn deleted_product_settles_as_undelivered() {
        let (engine, store, _dir) = test_engine();
        let user = UserId::new(508);
        let (ref_id, product) = pending_product(&store, user, &["acct-1"]);
        store.delete_product(&product.id).unwrap();

        let disposition = engine
            .handle_callback(&signed_event(&ref_id, "SUCCESS"))
            .await
            .unwrap();

        assert_eq!(
            disposition,
            CallbackDisposition::Settled {
                ref_id: ref_id.clone(),
                delivery: Delivery::Undelivered,
            }
        );
        // The row is terminal even though delivery needs an operator.
        assert_eq!(
            store.get_transaction(&ref_id).unwrap().unwrap().status,
            TxStatus::Success
        );
    }
}
