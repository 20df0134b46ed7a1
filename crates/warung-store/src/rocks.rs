//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use warung_core::{
    Product, ProductId, ProductPatch, RefId, Setting, Transaction, TxStatus, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Dispensed, LedgerCounts, Store};

/// RocksDB-backed ledger store.
///
/// `RocksDB` gives per-batch atomicity; the `write_lock` gives isolation for
/// the compound read-modify-write operations, so a fresh read inside a
/// locked section cannot be invalidated by a concurrent writer before its
/// batch commits.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // Poisoning only happens if a writer panicked mid-section; the data
        // itself is still consistent because batches commit atomically.
        self.write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_user(&self, user_id: UserId) -> Result<Option<User>> {
        let cf = self.cf(cf::USERS)?;
        self.db
            .get_cf(&cf, keys::user_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write_user(&self, batch: &mut WriteBatch, user: &User) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        batch.put_cf(&cf, keys::user_key(user.user_id), Self::serialize(user)?);
        Ok(())
    }

    fn read_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;
        self.db
            .get_cf(&cf, keys::product_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn read_transaction(&self, ref_id: &RefId) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        self.db
            .get_cf(&cf, keys::transaction_key(ref_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage a transaction row plus its per-user index entry.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        batch.put_cf(&cf_tx, keys::transaction_key(&tx.ref_id), Self::serialize(tx)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_transaction_key(tx.user_id, tx.created_at, &tx.ref_id),
            [],
        );
        Ok(())
    }

    fn stage_transaction_removal(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        batch.delete_cf(&cf_tx, keys::transaction_key(&tx.ref_id));
        batch.delete_cf(
            &cf_by_user,
            keys::user_transaction_key(tx.user_id, tx.created_at, &tx.ref_id),
        );
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn count_cf(&self, name: &str) -> Result<u64> {
        let cf = self.cf(name)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn ensure_user(&self, user_id: UserId, display_name: &str) -> Result<User> {
        let _guard = self.lock();

        let user = match self.read_user(user_id)? {
            Some(mut user) => {
                if user.display_name == display_name {
                    return Ok(user);
                }
                user.display_name = display_name.to_string();
                user
            }
            None => User::new(user_id, display_name),
        };

        let mut batch = WriteBatch::default();
        self.write_user(&mut batch, &user)?;
        self.commit(batch)?;
        Ok(user)
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.read_user(user_id)
    }

    fn adjust_balance(&self, user_id: UserId, delta: i64) -> Result<i64> {
        let _guard = self.lock();

        let mut user = self.read_user(user_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

        let new_balance = user.balance + delta;
        if new_balance < 0 {
            return Err(StoreError::InsufficientFunds {
                balance: user.balance,
                required: delta.abs(),
            });
        }
        user.balance = new_balance;

        let mut batch = WriteBatch::default();
        self.write_user(&mut batch, &user)?;
        self.commit(batch)?;
        Ok(user.balance)
    }

    fn credit_topup(&self, user_id: UserId, amount: i64) -> Result<i64> {
        let _guard = self.lock();

        let mut user = self.read_user(user_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

        user.balance += amount;
        user.total_transactions += 1;

        let mut batch = WriteBatch::default();
        self.write_user(&mut batch, &user)?;
        self.commit(batch)?;
        Ok(user.balance)
    }

    fn list_user_ids(&self) -> Result<Vec<UserId>> {
        let cf = self.cf(cf::USERS)?;
        let mut ids = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if key.len() == 8 {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&key);
                ids.push(UserId::new(i64::from_be_bytes(buf)));
            }
        }
        Ok(ids)
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    fn create_product(&self, product: &Product) -> Result<()> {
        let _guard = self.lock();

        if self.get_product_by_name(&product.name)?.is_some() {
            return Err(StoreError::NameTaken {
                name: product.name.clone(),
            });
        }

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_names = self.cf(cf::PRODUCTS_BY_NAME)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_products, keys::product_key(&product.id), Self::serialize(product)?);
        batch.put_cf(
            &cf_names,
            keys::product_name_key(&product.name),
            product.id.to_bytes(),
        );
        self.commit(batch)
    }

    fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        self.read_product(id)
    }

    fn get_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let cf_names = self.cf(cf::PRODUCTS_BY_NAME)?;
        let Some(id_bytes) = self
            .db
            .get_cf(&cf_names, keys::product_name_key(name))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        if id_bytes.len() != 16 {
            return Err(StoreError::Database("corrupt product name index".into()));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&id_bytes);
        self.read_product(&ProductId::from_bytes(buf))
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;
        let mut products = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            products.push(Self::deserialize::<Product>(&value)?);
        }
        products.sort_by(|a, b| a.category.cmp(&b.category).then(a.price.cmp(&b.price)));
        Ok(products)
    }

    fn update_product(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product> {
        let _guard = self.lock();

        let mut product = self.read_product(id)?.ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        let mut batch = WriteBatch::default();
        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_names = self.cf(cf::PRODUCTS_BY_NAME)?;

        if let Some(name) = &patch.name {
            if *name != product.name {
                if self.get_product_by_name(name)?.is_some() {
                    return Err(StoreError::NameTaken { name: name.clone() });
                }
                batch.delete_cf(&cf_names, keys::product_name_key(&product.name));
                batch.put_cf(&cf_names, keys::product_name_key(name), product.id.to_bytes());
                product.name = name.clone();
            }
        }
        if let Some(category) = &patch.category {
            product.category = category.clone();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(description) = &patch.description {
            product.description = description.clone();
        }

        batch.put_cf(&cf_products, keys::product_key(id), Self::serialize(&product)?);
        self.commit(batch)?;
        Ok(product)
    }

    fn delete_product(&self, id: &ProductId) -> Result<()> {
        let _guard = self.lock();

        let product = self.read_product(id)?.ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_names = self.cf(cf::PRODUCTS_BY_NAME)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_products, keys::product_key(id));
        batch.delete_cf(&cf_names, keys::product_name_key(&product.name));
        self.commit(batch)
    }

    fn append_stock(&self, id: &ProductId, items: &[String]) -> Result<u32> {
        let _guard = self.lock();

        let mut product = self.read_product(id)?.ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        product.contents.extend(items.iter().cloned());
        product.stock = u32::try_from(product.contents.len())
            .map_err(|_| StoreError::Database("stock overflow".into()))?;

        let cf = self.cf(cf::PRODUCTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, keys::product_key(id), Self::serialize(&product)?);
        self.commit(batch)?;
        Ok(product.stock)
    }

    fn dispense(&self, id: &ProductId) -> Result<Dispensed> {
        let _guard = self.lock();

        let mut product = self.read_product(id)?.ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        if product.contents.is_empty() {
            return Err(StoreError::OutOfStock {
                product: product.name,
            });
        }

        // FIFO: oldest content first. Queue, counter, and sold total move in
        // one batch so `stock == contents.len()` at every observable instant.
        let content = product.contents.remove(0);
        product.stock -= 1;
        product.total_sold += 1;

        let cf = self.cf(cf::PRODUCTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, keys::product_key(id), Self::serialize(&product)?);
        self.commit(batch)?;

        Ok(Dispensed {
            content,
            remaining_stock: product.stock,
            total_sold: product.total_sold,
        })
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn insert_pending(&self, tx: &Transaction) -> Result<()> {
        let _guard = self.lock();

        if self.read_transaction(&tx.ref_id)?.is_some() {
            return Err(StoreError::DuplicateRef {
                ref_id: tx.ref_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, tx)?;
        self.commit(batch)
    }

    fn get_transaction(&self, ref_id: &RefId) -> Result<Option<Transaction>> {
        self.read_transaction(ref_id)
    }

    fn delete_transaction(&self, ref_id: &RefId) -> Result<()> {
        let _guard = self.lock();

        let tx = self.read_transaction(ref_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "transaction",
            id: ref_id.to_string(),
        })?;

        let mut batch = WriteBatch::default();
        self.stage_transaction_removal(&mut batch, &tx)?;
        self.commit(batch)
    }

    fn cancel_pending(&self, ref_id: &RefId, user_id: UserId) -> Result<Transaction> {
        let _guard = self.lock();

        let tx = self.read_transaction(ref_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "transaction",
            id: ref_id.to_string(),
        })?;

        if tx.user_id != user_id || tx.status != TxStatus::Pending {
            return Err(StoreError::NotCancelable {
                ref_id: ref_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        self.stage_transaction_removal(&mut batch, &tx)?;
        self.commit(batch)?;
        Ok(tx)
    }

    fn list_transactions_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Forward scan yields chronological order; collect then reverse for
        // newest first.
        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut all_refs: Vec<String> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            if let Some(ref_id) = keys::ref_id_from_user_key(&key) {
                all_refs.push(ref_id.to_string());
            }
        }
        all_refs.reverse();

        let mut transactions = Vec::new();
        for ref_str in all_refs.into_iter().skip(offset).take(limit) {
            let (ref_id, _) = RefId::parse(&ref_str)
                .map_err(|_| StoreError::Database("corrupt transaction index".into()))?;
            if let Some(tx) = self.read_transaction(&ref_id)? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    fn mark_success(&self, ref_id: &RefId, signature: Option<&str>) -> Result<Transaction> {
        let _guard = self.lock();

        let mut tx = self.read_transaction(ref_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "transaction",
            id: ref_id.to_string(),
        })?;

        if tx.status.is_terminal() {
            return Err(StoreError::AlreadySettled {
                ref_id: ref_id.to_string(),
                status: tx.status,
            });
        }

        tx.status = TxStatus::Success;
        tx.gateway_signature = signature.map(String::from);

        let cf = self.cf(cf::TRANSACTIONS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, keys::transaction_key(ref_id), Self::serialize(&tx)?);
        self.commit(batch)?;
        Ok(tx)
    }

    fn mark_terminal(&self, ref_id: &RefId, status: TxStatus) -> Result<Transaction> {
        debug_assert!(matches!(status, TxStatus::Failed | TxStatus::Expired));
        let _guard = self.lock();

        let mut tx = self.read_transaction(ref_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "transaction",
            id: ref_id.to_string(),
        })?;

        if tx.status.is_terminal() {
            return Err(StoreError::AlreadySettled {
                ref_id: ref_id.to_string(),
                status: tx.status,
            });
        }

        tx.status = status;

        let cf = self.cf(cf::TRANSACTIONS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, keys::transaction_key(ref_id), Self::serialize(&tx)?);
        self.commit(batch)?;
        Ok(tx)
    }

    // =========================================================================
    // Compound Settlement
    // =========================================================================

    fn settle_balance_purchase(&self, tx: &Transaction) -> Result<i64> {
        let _guard = self.lock();

        let mut user = self.read_user(tx.user_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: tx.user_id.to_string(),
        })?;

        if user.balance < tx.amount {
            return Err(StoreError::InsufficientFunds {
                balance: user.balance,
                required: tx.amount,
            });
        }

        if self.read_transaction(&tx.ref_id)?.is_some() {
            return Err(StoreError::DuplicateRef {
                ref_id: tx.ref_id.to_string(),
            });
        }

        user.balance -= tx.amount;
        user.total_transactions += 1;

        // Debit and ledger row commit together: there is never a SUCCESS row
        // without its applied debit, and never a debit without its row.
        let mut batch = WriteBatch::default();
        self.write_user(&mut batch, &user)?;
        self.stage_transaction(&mut batch, tx)?;
        self.commit(batch)?;

        Ok(user.balance)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let cf = self.cf(cf::SETTINGS)?;
        self.db
            .get_cf(&cf, keys::setting_key(key))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_setting(&self, setting: &Setting) -> Result<()> {
        let cf = self.cf(cf::SETTINGS)?;
        self.db
            .put_cf(&cf, keys::setting_key(&setting.key), Self::serialize(setting)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Stats
    // =========================================================================

    fn counts(&self) -> Result<LedgerCounts> {
        let mut counts = LedgerCounts {
            users: self.count_cf(cf::USERS)?,
            products: self.count_cf(cf::PRODUCTS)?,
            ..LedgerCounts::default()
        };

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        for item in self.db.iterator_cf(&cf_tx, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let tx: Transaction = Self::deserialize(&value)?;
            counts.transactions += 1;
            match tx.status {
                TxStatus::Success => counts.success += 1,
                TxStatus::Pending => counts.pending += 1,
                TxStatus::Failed | TxStatus::Expired => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
