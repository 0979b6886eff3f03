// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Durable storage of accounts, administrators, groups, and memberships
//!
//! All entities are scoped by tenant account.  The [`DataStore`] provides
//! typed operations over an injected [`kv::Kv`] capability, which is the
//! only thing a deployment has to supply: a single-item key-value store
//! with conditional puts, partition queries, and one secondary index.

pub mod datastore;
pub mod kv;
pub mod model;

pub use datastore::DataStore;
pub use kv::Kv;
pub use kv::MemKv;
