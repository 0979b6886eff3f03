// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key-value storage capability consumed by the entity store
//!
//! The durable driver used in production deployments is injected at boot.
//! This module defines the contract it must satisfy plus [`MemKv`], an
//! in-process implementation backed by in-memory maps, used by tests and
//! local development.
//!
//! Items are stored as JSON documents under a composite key (partition key
//! plus optional sort key).  The members table additionally carries an
//! attribute that the driver must index so that "which groups does this
//! principal belong to?" is a single index query rather than a scan.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::Mutex;

/// Logical tables used by the entity store
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Table {
    Accounts,
    Admins,
    Groups,
    Members,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Accounts => "authz-accounts",
            Table::Admins => "authz-admins",
            Table::Groups => "authz-groups",
            Table::Members => "authz-group-members",
        }
    }
}

/// Composite key for a stored item
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Key {
    pub partition: String,
    pub sort: Option<String>,
}

impl Key {
    pub fn partition(partition: &str) -> Key {
        Key { partition: partition.to_owned(), sort: None }
    }

    pub fn composite(partition: &str, sort: &str) -> Key {
        Key { partition: partition.to_owned(), sort: Some(sort.to_owned()) }
    }
}

/// Write behavior for [`Kv::put`]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PutMode {
    /// Unconditional write (idempotent on repeat)
    Overwrite,
    /// Write only if no item exists under the key
    IfAbsent,
}

/// Errors surfaced by a key-value driver
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// A conditional put found an existing item under the key
    #[error("item already exists")]
    AlreadyExists,
    /// The store itself failed (network, timeout, driver error)
    #[error("key-value store error: {0}")]
    Store(String),
}

/// Single-item key-value storage capability
///
/// Every operation is a request/response pair; there are no ambient
/// transactions.  Cross-entity integrity is enforced by the layers above.
#[async_trait]
pub trait Kv: Send + Sync + 'static {
    /// Write one item, optionally conditional on key absence
    async fn put(
        &self,
        table: Table,
        key: Key,
        item: Value,
        mode: PutMode,
    ) -> Result<(), KvError>;

    /// Fetch one item.  "Found", "not found", and "error" are three
    /// distinct results.
    async fn get(&self, table: Table, key: &Key)
        -> Result<Option<Value>, KvError>;

    /// Remove one item.  Removing an absent item is not an error.
    async fn delete(&self, table: Table, key: &Key) -> Result<(), KvError>;

    /// Fetch all items under a partition key, optionally restricted to
    /// sort keys with the given prefix
    async fn query(
        &self,
        table: Table,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> Result<Vec<Value>, KvError>;

    /// Fetch all items whose indexed attribute equals the given value
    async fn query_index(
        &self,
        table: Table,
        attr: &str,
        value: &str,
    ) -> Result<Vec<Value>, KvError>;

    /// Fetch every item in a table
    async fn scan(&self, table: Table) -> Result<Vec<Value>, KvError>;
}

/// In-memory key-value store
///
/// All the data lives in the `data` field, protected by one big lock.  The
/// methods exposed here reflect what we expect from the durable driver, so
/// tests exercise the same access patterns production does.
pub struct MemKv {
    data: Mutex<BTreeMap<(&'static str, String, String), Value>>,
}

impl MemKv {
    pub fn new() -> MemKv {
        MemKv { data: Mutex::new(BTreeMap::new()) }
    }

    fn full_key(table: Table, key: &Key) -> (&'static str, String, String) {
        (
            table.name(),
            key.partition.clone(),
            key.sort.clone().unwrap_or_default(),
        )
    }
}

impl Default for MemKv {
    fn default() -> Self {
        MemKv::new()
    }
}

#[async_trait]
impl Kv for MemKv {
    async fn put(
        &self,
        table: Table,
        key: Key,
        item: Value,
        mode: PutMode,
    ) -> Result<(), KvError> {
        let mut data = self.data.lock().await;
        let full_key = MemKv::full_key(table, &key);
        if mode == PutMode::IfAbsent && data.contains_key(&full_key) {
            return Err(KvError::AlreadyExists);
        }
        data.insert(full_key, item);
        Ok(())
    }

    async fn get(
        &self,
        table: Table,
        key: &Key,
    ) -> Result<Option<Value>, KvError> {
        let data = self.data.lock().await;
        Ok(data.get(&MemKv::full_key(table, key)).cloned())
    }

    async fn delete(&self, table: Table, key: &Key) -> Result<(), KvError> {
        let mut data = self.data.lock().await;
        data.remove(&MemKv::full_key(table, key));
        Ok(())
    }

    async fn query(
        &self,
        table: Table,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> Result<Vec<Value>, KvError> {
        let data = self.data.lock().await;
        let start = (table.name(), partition.to_owned(), String::new());
        let items = data
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|((t, p, _), _)| *t == table.name() && p == partition)
            .filter(|((_, _, sort), _)| match sort_prefix {
                Some(prefix) => sort.starts_with(prefix),
                None => true,
            })
            .map(|(_, item)| item.clone())
            .collect();
        Ok(items)
    }

    async fn query_index(
        &self,
        table: Table,
        attr: &str,
        value: &str,
    ) -> Result<Vec<Value>, KvError> {
        // The durable driver satisfies this from a secondary index.  The
        // in-memory store just filters the table.
        let data = self.data.lock().await;
        let items = data
            .iter()
            .filter(|((t, _, _), _)| *t == table.name())
            .filter(|(_, item)| {
                item.get(attr).and_then(Value::as_str) == Some(value)
            })
            .map(|(_, item)| item.clone())
            .collect();
        Ok(items)
    }

    async fn scan(&self, table: Table) -> Result<Vec<Value>, KvError> {
        let data = self.data.lock().await;
        let items = data
            .iter()
            .filter(|((t, _, _), _)| *t == table.name())
            .map(|(_, item)| item.clone())
            .collect();
        Ok(items)
    }
}
