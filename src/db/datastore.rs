// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed entity-store operations over the key-value capability
//!
//! Uniqueness is enforced here with single-item conditional puts.
//! Cross-entity integrity (group deletion cascading through member
//! removal) is orchestrated by the management layer, not here.

use super::kv::Key;
use super::kv::Kv;
use super::kv::KvError;
use super::kv::PutMode;
use super::kv::Table;
use super::model::Account;
use super::model::Admin;
use super::model::Group;
use super::model::GroupMember;
use super::model::MEMBER_GROUPS_INDEX;
use crate::api_error::Error;
use crate::api_error::ResourceType;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::info;
use slog::Logger;
use std::sync::Arc;
use uuid::Uuid;

/// Entity store for accounts, admins, groups, and group memberships
pub struct DataStore {
    log: Logger,
    kv: Arc<dyn Kv>,
}

impl DataStore {
    pub fn new(log: Logger, kv: Arc<dyn Kv>) -> DataStore {
        DataStore { log, kv }
    }

    /*
     * Accounts
     */

    /// Write a new account record.  Fails with `AlreadyExists` if a record
    /// for the account id is present.
    pub async fn account_create(&self, account: &Account) -> Result<(), Error> {
        self.kv
            .put(
                Table::Accounts,
                Key::partition(&account.account_id),
                encode(account)?,
                PutMode::IfAbsent,
            )
            .await
            .map_err(|error| match error {
                KvError::AlreadyExists => Error::already_exists(
                    ResourceType::Account,
                    &account.account_id,
                ),
                other => store_error(other),
            })?;
        info!(self.log, "account created";
            "account_id" => &account.account_id,
            "privileged" => account.privileged,
        );
        Ok(())
    }

    /// Fetch an account.  "Found" and "not found" are distinct non-error
    /// results.
    pub async fn account_fetch(
        &self,
        account_id: &str,
    ) -> Result<Option<Account>, Error> {
        let item = self
            .kv
            .get(Table::Accounts, &Key::partition(account_id))
            .await
            .map_err(store_error)?;
        item.map(decode).transpose()
    }

    pub async fn account_delete(&self, account_id: &str) -> Result<(), Error> {
        self.kv
            .delete(Table::Accounts, &Key::partition(account_id))
            .await
            .map_err(store_error)?;
        info!(self.log, "account deleted"; "account_id" => account_id);
        Ok(())
    }

    pub async fn accounts_list(&self) -> Result<Vec<Account>, Error> {
        let items =
            self.kv.scan(Table::Accounts).await.map_err(store_error)?;
        items.into_iter().map(decode).collect()
    }

    /// Whether the account exists and is flagged privileged
    pub async fn account_is_privileged(
        &self,
        account_id: &str,
    ) -> Result<bool, Error> {
        Ok(self
            .account_fetch(account_id)
            .await?
            .map(|account| account.privileged)
            .unwrap_or(false))
    }

    /*
     * Admins
     */

    pub async fn admin_add(&self, admin: &Admin) -> Result<(), Error> {
        self.kv
            .put(
                Table::Admins,
                Key::composite(&admin.account_id, &admin.principal_arn),
                encode(admin)?,
                PutMode::IfAbsent,
            )
            .await
            .map_err(|error| match error {
                KvError::AlreadyExists => Error::already_exists(
                    ResourceType::Admin,
                    &admin.principal_arn,
                ),
                other => store_error(other),
            })?;
        info!(self.log, "admin added";
            "account_id" => &admin.account_id,
            "principal_arn" => &admin.principal_arn,
        );
        Ok(())
    }

    /// Remove an admin.  Removing an absent admin is a no-op.
    pub async fn admin_remove(
        &self,
        account_id: &str,
        principal_arn: &str,
    ) -> Result<(), Error> {
        self.kv
            .delete(Table::Admins, &Key::composite(account_id, principal_arn))
            .await
            .map_err(store_error)?;
        info!(self.log, "admin removed";
            "account_id" => account_id,
            "principal_arn" => principal_arn,
        );
        Ok(())
    }

    pub async fn admin_is(
        &self,
        account_id: &str,
        principal_arn: &str,
    ) -> Result<bool, Error> {
        let item = self
            .kv
            .get(Table::Admins, &Key::composite(account_id, principal_arn))
            .await
            .map_err(store_error)?;
        Ok(item.is_some())
    }

    /// List the principal ARNs of all admins of an account
    pub async fn admins_list(
        &self,
        account_id: &str,
    ) -> Result<Vec<String>, Error> {
        let items = self
            .kv
            .query(Table::Admins, account_id, None)
            .await
            .map_err(store_error)?;
        items
            .into_iter()
            .map(|item| decode::<Admin>(item).map(|admin| admin.principal_arn))
            .collect()
    }

    /*
     * Groups
     */

    /// Create a group with a fresh server-generated id
    pub async fn group_create(
        &self,
        account_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Group, Error> {
        let group = Group {
            account_id: account_id.to_owned(),
            group_id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            description: description.to_owned(),
            created_at: Utc::now(),
        };
        self.kv
            .put(
                Table::Groups,
                Key::composite(account_id, &group.group_id),
                encode(&group)?,
                PutMode::Overwrite,
            )
            .await
            .map_err(store_error)?;
        info!(self.log, "group created";
            "account_id" => account_id,
            "group_id" => &group.group_id,
            "name" => name,
        );
        Ok(group)
    }

    pub async fn group_fetch(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<Option<Group>, Error> {
        let item = self
            .kv
            .get(Table::Groups, &Key::composite(account_id, group_id))
            .await
            .map_err(store_error)?;
        item.map(decode).transpose()
    }

    pub async fn group_delete(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<(), Error> {
        self.kv
            .delete(Table::Groups, &Key::composite(account_id, group_id))
            .await
            .map_err(store_error)?;
        info!(self.log, "group deleted";
            "account_id" => account_id,
            "group_id" => group_id,
        );
        Ok(())
    }

    pub async fn groups_list(
        &self,
        account_id: &str,
    ) -> Result<Vec<Group>, Error> {
        let items = self
            .kv
            .query(Table::Groups, account_id, None)
            .await
            .map_err(store_error)?;
        items.into_iter().map(decode).collect()
    }

    /*
     * Group members
     */

    /// Add a member to a group.  Idempotent on repeat.
    pub async fn member_add(
        &self,
        account_id: &str,
        group_id: &str,
        member_arn: &str,
    ) -> Result<(), Error> {
        let member = GroupMember::new(account_id, group_id, member_arn);
        self.kv
            .put(
                Table::Members,
                Key::composite(account_id, &member.group_member_sort),
                encode(&member)?,
                PutMode::Overwrite,
            )
            .await
            .map_err(store_error)?;
        info!(self.log, "member added to group";
            "account_id" => account_id,
            "group_id" => group_id,
            "member_arn" => member_arn,
        );
        Ok(())
    }

    /// Remove a member from a group.  Removing an absent member is a no-op.
    pub async fn member_remove(
        &self,
        account_id: &str,
        group_id: &str,
        member_arn: &str,
    ) -> Result<(), Error> {
        let sort = format!("{}#{}", group_id, member_arn);
        self.kv
            .delete(Table::Members, &Key::composite(account_id, &sort))
            .await
            .map_err(store_error)?;
        info!(self.log, "member removed from group";
            "account_id" => account_id,
            "group_id" => group_id,
            "member_arn" => member_arn,
        );
        Ok(())
    }

    pub async fn group_members_list(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<Vec<String>, Error> {
        let prefix = format!("{}#", group_id);
        let items = self
            .kv
            .query(Table::Members, account_id, Some(&prefix))
            .await
            .map_err(store_error)?;
        items
            .into_iter()
            .map(|item| {
                decode::<GroupMember>(item).map(|member| member.member_arn)
            })
            .collect()
    }

    /// List the group ids a principal belongs to, via the secondary index
    pub async fn user_groups_list(
        &self,
        account_id: &str,
        member_arn: &str,
    ) -> Result<Vec<String>, Error> {
        let index_value = format!("{}#{}", account_id, member_arn);
        let items = self
            .kv
            .query_index(Table::Members, MEMBER_GROUPS_INDEX, &index_value)
            .await
            .map_err(store_error)?;
        items
            .into_iter()
            .map(|item| {
                decode::<GroupMember>(item).map(|member| member.group_id)
            })
            .collect()
    }
}

fn encode<T: Serialize>(entity: &T) -> Result<serde_json::Value, Error> {
    serde_json::to_value(entity).map_err(|error| {
        Error::internal_error(&format!("serializing entity: {}", error))
    })
}

fn decode<T: DeserializeOwned>(item: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(item).map_err(|error| {
        Error::internal_error(&format!("deserializing stored item: {}", error))
    })
}

fn store_error(error: KvError) -> Error {
    Error::upstream(&format!("entity store: {}", error))
}

#[cfg(test)]
mod test {
    use super::DataStore;
    use crate::api_error::Error;
    use crate::db::model::Account;
    use crate::db::MemKv;
    use chrono::Utc;
    use slog::o;
    use slog::Discard;
    use slog::Logger;
    use std::sync::Arc;

    fn datastore() -> DataStore {
        DataStore::new(Logger::root(Discard, o!()), Arc::new(MemKv::new()))
    }

    fn account(account_id: &str, privileged: bool) -> Account {
        Account {
            account_id: account_id.to_owned(),
            policy_store_id: if privileged {
                String::new()
            } else {
                String::from("ps-1")
            },
            privileged,
            created_at: Utc::now(),
            created_by: String::from("arn:aws:iam::0:user/boot"),
        }
    }

    #[tokio::test]
    async fn test_account_conditional_create() {
        let datastore = datastore();
        datastore.account_create(&account("111111111111", false)).await.unwrap();

        let error = datastore
            .account_create(&account("111111111111", false))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ObjectAlreadyExists { .. }));

        let fetched =
            datastore.account_fetch("111111111111").await.unwrap().unwrap();
        assert_eq!("ps-1", fetched.policy_store_id);
        assert!(datastore.account_fetch("000000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_is_privileged() {
        let datastore = datastore();
        datastore.account_create(&account("000000000000", true)).await.unwrap();
        datastore.account_create(&account("111111111111", false)).await.unwrap();

        assert!(datastore.account_is_privileged("000000000000").await.unwrap());
        assert!(!datastore.account_is_privileged("111111111111").await.unwrap());
        // Absent accounts are simply not privileged.
        assert!(!datastore.account_is_privileged("999999999999").await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_round_trip() {
        let datastore = datastore();
        let group =
            datastore.group_create("111111111111", "ops", "").await.unwrap();
        let arn = "arn:aws:iam::111111111111:user/u";

        datastore
            .member_add("111111111111", &group.group_id, arn)
            .await
            .unwrap();
        // Idempotent on repeat.
        datastore
            .member_add("111111111111", &group.group_id, arn)
            .await
            .unwrap();

        let members = datastore
            .group_members_list("111111111111", &group.group_id)
            .await
            .unwrap();
        assert_eq!(vec![arn.to_owned()], members);

        let groups =
            datastore.user_groups_list("111111111111", arn).await.unwrap();
        assert_eq!(vec![group.group_id.clone()], groups);

        // Reverse lookup is tenant-scoped.
        let groups =
            datastore.user_groups_list("222222222222", arn).await.unwrap();
        assert!(groups.is_empty());

        datastore
            .member_remove("111111111111", &group.group_id, arn)
            .await
            .unwrap();
        // Removing an absent member is a no-op.
        datastore
            .member_remove("111111111111", &group.group_id, arn)
            .await
            .unwrap();
        assert!(datastore
            .group_members_list("111111111111", &group.group_id)
            .await
            .unwrap()
            .is_empty());
        assert!(datastore
            .user_groups_list("111111111111", arn)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_admins() {
        let datastore = datastore();
        let admin = crate::db::model::Admin {
            account_id: String::from("111111111111"),
            principal_arn: String::from("arn:aws:iam::111111111111:user/a"),
            created_at: Utc::now(),
            created_by: String::from("arn:aws:iam::0:user/boot"),
        };
        datastore.admin_add(&admin).await.unwrap();
        let error = datastore.admin_add(&admin).await.unwrap_err();
        assert!(matches!(error, Error::ObjectAlreadyExists { .. }));

        assert!(datastore
            .admin_is("111111111111", &admin.principal_arn)
            .await
            .unwrap());
        // The admin check is per-tenant.
        assert!(!datastore
            .admin_is("222222222222", &admin.principal_arn)
            .await
            .unwrap());

        assert_eq!(
            vec![admin.principal_arn.clone()],
            datastore.admins_list("111111111111").await.unwrap()
        );

        datastore
            .admin_remove("111111111111", &admin.principal_arn)
            .await
            .unwrap();
        assert!(!datastore
            .admin_is("111111111111", &admin.principal_arn)
            .await
            .unwrap());
    }
}
