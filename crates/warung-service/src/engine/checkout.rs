//! Intent creation, synchronous balance settlement, and cancellation.

use warung_core::{
    EngineError, ItemSnapshot, Product, ProductId, RefId, RefKind, Transaction, UserId,
};
use warung_gateway::GatewayError;
use warung_store::StoreError;

use super::{map_store_err, Engine};

/// What the buyer is checking out.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurchaseDescriptor {
    /// One unit of a catalog product.
    Product {
        /// The product to purchase.
        id: ProductId,
    },
    /// A balance top-up of the given amount.
    TopUp {
        /// Amount in integer currency units.
        amount: i64,
    },
}

/// How the buyer wants to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMethod {
    /// Synchronous debit against the internal balance.
    Balance,
    /// Asynchronous QRIS gateway payment.
    Gateway,
}

/// What the buyer received from a settled purchase.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// One content item popped from the product queue.
    Content {
        /// The delivered content string.
        content: String,
    },
    /// The top-up amount was credited.
    TopupApplied {
        /// Balance after the credit.
        new_balance: i64,
    },
    /// Payment settled but the queue was empty; an operator must deliver
    /// manually.
    Undelivered,
}

/// The result of a checkout call.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// The purchase settled synchronously against the balance.
    BalanceSettled {
        /// The SUCCESS ledger row.
        transaction: Transaction,
        /// Balance after the debit.
        new_balance: i64,
        /// What was delivered.
        delivery: Delivery,
    },
    /// A PENDING gateway intent was opened; settlement arrives by webhook.
    GatewayOffer {
        /// The PENDING ledger row.
        transaction: Transaction,
        /// URL of the QR image the buyer scans.
        qr_url: String,
        /// Hosted checkout page link.
        checkout_url: String,
        /// When the offer expires.
        expires_at: chrono::DateTime<chrono::Utc>,
    },
}

impl Engine {
    /// Run a checkout: validate the descriptor, then settle synchronously
    /// (balance) or open a PENDING gateway intent (QRIS).
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for non-positive top-up amounts or a
    ///   top-up paid from balance.
    /// - [`EngineError::NotFound`] / [`EngineError::OutOfStock`] when the
    ///   product is absent or its queue empty at intent creation.
    /// - [`EngineError::InsufficientFunds`] on the balance path; nothing is
    ///   applied.
    /// - [`EngineError::Gateway`] when the gateway is unconfigured, declines,
    ///   or fails; the provisional PENDING row is removed.
    pub async fn checkout(
        &self,
        user_id: UserId,
        display_name: &str,
        descriptor: &PurchaseDescriptor,
        method: CheckoutMethod,
    ) -> Result<CheckoutOutcome, EngineError> {
        let user = self
            .store()
            .ensure_user(user_id, display_name)
            .map_err(map_store_err)?;

        match (descriptor, method) {
            (PurchaseDescriptor::Product { id }, CheckoutMethod::Balance) => {
                let product = self.require_stocked_product(id)?;
                self.settle_product_with_balance(user_id, &product).await
            }
            (PurchaseDescriptor::Product { id }, CheckoutMethod::Gateway) => {
                let product = self.require_stocked_product(id)?;
                let ref_id = RefId::generate(RefKind::Product, user_id);
                let item = ItemSnapshot::of_product(&product);
                let tx = Transaction::pending_gateway(user_id, ref_id, item, product.price);
                self.open_gateway_intent(tx, &user.display_name, &product.name)
                    .await
            }
            (PurchaseDescriptor::TopUp { amount }, CheckoutMethod::Gateway) => {
                let amount = *amount;
                if amount <= 0 {
                    return Err(EngineError::Validation(
                        "top-up amount must be positive".to_string(),
                    ));
                }
                let ref_id = RefId::generate(RefKind::TopUp, user_id);
                let item = ItemSnapshot::of_topup(amount);
                let tx = Transaction::pending_gateway(user_id, ref_id, item, amount);
                self.open_gateway_intent(tx, &user.display_name, "Balance top-up")
                    .await
            }
            (PurchaseDescriptor::TopUp { .. }, CheckoutMethod::Balance) => {
                Err(EngineError::Validation(
                    "a top-up cannot be paid from balance".to_string(),
                ))
            }
        }
    }

    /// Look up a transaction by reference id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no such row exists.
    pub fn transaction_status(&self, ref_id: &RefId) -> Result<Transaction, EngineError> {
        self.store()
            .get_transaction(ref_id)
            .map_err(map_store_err)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "transaction",
                id: ref_id.to_string(),
            })
    }

    /// Cancel a still-PENDING intent owned by the caller. The row is removed
    /// outright; a later webhook for it finds nothing and is ignored.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if no such row exists.
    /// - [`EngineError::NotCancelable`] if the row is terminal or owned by a
    ///   different buyer.
    pub fn cancel(&self, ref_id: &RefId, user_id: UserId) -> Result<Transaction, EngineError> {
        let removed = match self.store().cancel_pending(ref_id, user_id) {
            Ok(tx) => tx,
            Err(StoreError::NotCancelable { .. }) => {
                return Err(EngineError::NotCancelable(ref_id.clone()))
            }
            Err(other) => return Err(map_store_err(other)),
        };
        tracing::info!(ref_id = %ref_id, user_id = %user_id, "Pending intent cancelled");
        Ok(removed)
    }

    fn require_stocked_product(&self, id: &ProductId) -> Result<Product, EngineError> {
        let product = self
            .store()
            .get_product(id)
            .map_err(map_store_err)?
            .ok_or_else(|| EngineError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        if product.stock == 0 {
            return Err(EngineError::OutOfStock {
                product: product.name,
            });
        }
        Ok(product)
    }

    /// Debit the balance and append the SUCCESS row atomically, then dispense.
    ///
    /// If the queue raced to empty between the stock check and the dispense,
    /// the payment stands and the outcome is [`Delivery::Undelivered`]; an
    /// operator is alerted to deliver manually.
    async fn settle_product_with_balance(
        &self,
        user_id: UserId,
        product: &Product,
    ) -> Result<CheckoutOutcome, EngineError> {
        let ref_id = RefId::generate(RefKind::Balance, user_id);
        let item = ItemSnapshot::of_product(product);
        let tx = Transaction::settled_balance(user_id, ref_id.clone(), item, product.price);

        let new_balance = self
            .store()
            .settle_balance_purchase(&tx)
            .map_err(map_store_err)?;

        let delivery = match self.store().dispense(&product.id) {
            Ok(dispensed) => {
                self.notify_user(
                    user_id,
                    &format!(
                        "Purchase complete: {}\n\n{}",
                        product.name, dispensed.content
                    ),
                )
                .await;
                self.send_success_sticker(user_id).await;
                self.notify_channel(&format!(
                    "{} sold for {} (balance), {} left in stock",
                    product.name, product.price, dispensed.remaining_stock
                ))
                .await;
                Delivery::Content {
                    content: dispensed.content,
                }
            }
            Err(StoreError::OutOfStock { .. } | StoreError::NotFound { .. }) => {
                tracing::error!(
                    ref_id = %ref_id,
                    product = %product.name,
                    "Balance debited but nothing to dispense"
                );
                self.notify_admin(&format!(
                    "MANUAL DELIVERY NEEDED: {ref_id} paid for {} but the queue was empty",
                    product.name
                ))
                .await;
                Delivery::Undelivered
            }
            Err(other) => return Err(map_store_err(other)),
        };

        tracing::info!(ref_id = %ref_id, user_id = %user_id, new_balance, "Balance purchase settled");

        Ok(CheckoutOutcome::BalanceSettled {
            transaction: tx,
            new_balance,
            delivery,
        })
    }

    /// Insert the PENDING row, then ask the gateway for a checkout offer.
    ///
    /// Order matters: the row must exist before the offer is live, otherwise
    /// an instant-paying buyer's webhook would find nothing to settle. If the
    /// gateway call fails, the provisional row is removed again.
    async fn open_gateway_intent(
        &self,
        tx: Transaction,
        customer_name: &str,
        description: &str,
    ) -> Result<CheckoutOutcome, EngineError> {
        let gateway = self.gateway().ok_or_else(|| {
            EngineError::Gateway("gateway payments are not configured".to_string())
        })?;

        match self.store().insert_pending(&tx) {
            Ok(()) => {}
            Err(StoreError::DuplicateRef { .. }) => {
                return Err(EngineError::Duplicate(tx.ref_id.clone()))
            }
            Err(other) => return Err(map_store_err(other)),
        }

        let artifact = match gateway
            .create_payment(&tx.ref_id, tx.amount, customer_name, description)
            .await
        {
            Ok(artifact) => artifact,
            Err(err) => {
                if let Err(del) = self.store().delete_transaction(&tx.ref_id) {
                    tracing::error!(ref_id = %tx.ref_id, error = %del, "Failed to roll back provisional intent");
                }
                return Err(map_gateway_err(err));
            }
        };

        tracing::info!(ref_id = %tx.ref_id, amount = tx.amount, "Gateway intent opened");

        Ok(CheckoutOutcome::GatewayOffer {
            transaction: tx,
            qr_url: artifact.qr_url,
            checkout_url: artifact.checkout_url,
            expires_at: artifact.expires_at,
        })
    }
}

fn map_gateway_err(err: GatewayError) -> EngineError {
    EngineError::Gateway(err.to_string())
}
