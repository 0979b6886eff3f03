// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Group and membership management

use super::Platform;
use crate::api_error::Error;
use crate::api_error::ResourceType;
use crate::db::model::Group;
use slog::info;

impl Platform {
    pub async fn group_create(
        &self,
        account_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Group, Error> {
        if name.is_empty() {
            return Err(Error::invalid_argument("name is required"));
        }
        self.datastore.group_create(account_id, name, description).await
    }

    pub async fn group_fetch(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<Group, Error> {
        self.datastore.group_fetch(account_id, group_id).await?.ok_or_else(
            || Error::not_found_by_id(ResourceType::Group, group_id),
        )
    }

    /// Delete a group, cascading through member removal first
    ///
    /// The cascade is not atomic.  A member added concurrently with the
    /// deletion can leave an orphan membership row; it is unobservable
    /// through the API (the group lookup fails first) and cannot match in
    /// the engine because the deleted group has no attachments.
    pub async fn group_delete(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<(), Error> {
        self.group_fetch(account_id, group_id).await?;

        let members =
            self.datastore.group_members_list(account_id, group_id).await?;
        for member_arn in &members {
            self.datastore
                .member_remove(account_id, group_id, member_arn)
                .await?;
        }
        self.datastore.group_delete(account_id, group_id).await?;

        info!(self.log, "group deleted with members";
            "account_id" => account_id,
            "group_id" => group_id,
            "members_removed" => members.len(),
        );
        Ok(())
    }

    pub async fn groups_list(
        &self,
        account_id: &str,
    ) -> Result<Vec<Group>, Error> {
        self.datastore.groups_list(account_id).await
    }

    pub async fn group_member_add(
        &self,
        account_id: &str,
        group_id: &str,
        member_arn: &str,
    ) -> Result<(), Error> {
        self.group_fetch(account_id, group_id).await?;
        self.datastore.member_add(account_id, group_id, member_arn).await
    }

    pub async fn group_member_remove(
        &self,
        account_id: &str,
        group_id: &str,
        member_arn: &str,
    ) -> Result<(), Error> {
        self.group_fetch(account_id, group_id).await?;
        self.datastore.member_remove(account_id, group_id, member_arn).await
    }

    pub async fn group_members_list(
        &self,
        account_id: &str,
        group_id: &str,
    ) -> Result<Vec<String>, Error> {
        self.group_fetch(account_id, group_id).await?;
        self.datastore.group_members_list(account_id, group_id).await
    }

    /// List the groups a principal belongs to
    pub async fn user_groups_list(
        &self,
        account_id: &str,
        member_arn: &str,
    ) -> Result<Vec<String>, Error> {
        self.datastore.user_groups_list(account_id, member_arn).await
    }
}
