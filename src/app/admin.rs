// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Administrator management
//!
//! Nothing here prevents an admin from removing themselves or the last
//! admin of an account.  An account with no admins can only be recovered
//! by a privileged caller; that is documented operator behavior, not a
//! constraint we enforce.

use super::Platform;
use crate::api_error::Error;
use crate::db::model::Admin;
use chrono::Utc;

impl Platform {
    pub async fn admin_add(
        &self,
        account_id: &str,
        principal_arn: &str,
        created_by: &str,
    ) -> Result<Admin, Error> {
        if principal_arn.is_empty() {
            return Err(Error::invalid_argument("principalArn is required"));
        }
        let admin = Admin {
            account_id: account_id.to_owned(),
            principal_arn: principal_arn.to_owned(),
            created_at: Utc::now(),
            created_by: created_by.to_owned(),
        };
        self.datastore.admin_add(&admin).await?;
        Ok(admin)
    }

    pub async fn admin_remove(
        &self,
        account_id: &str,
        principal_arn: &str,
    ) -> Result<(), Error> {
        self.datastore.admin_remove(account_id, principal_arn).await
    }

    pub async fn admins_list(
        &self,
        account_id: &str,
    ) -> Result<Vec<String>, Error> {
        self.datastore.admins_list(account_id).await
    }
}
