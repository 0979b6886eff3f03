// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Caller identity facilities
//!
//! Every operation in the platform API has an associated identity context
//! that describes on whose behalf the operation runs.  This module provides
//! the HTTP-agnostic representation of that identity; the [`external`]
//! submodule lifts it out of per-request metadata stamped by the
//! authenticating edge.
//!
//! Extraction never rejects a request: a request with no identity metadata
//! simply produces an empty [`Context`].  Gates downstream decide which
//! fields they require and reject with the appropriate error when a field
//! is absent.

pub mod external;

use crate::api_error::Error;

/// Describes the caller identity of the current operation
///
/// This is HTTP-agnostic.  Subsystems could create contexts for purposes
/// unrelated to HTTP (e.g., background jobs or tests).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Context {
    /// the tenant account on whose behalf the request is made
    account_id: Option<String>,
    /// the calling principal
    caller_arn: Option<String>,
    /// opaque correlation handle stamped by the edge
    request_id: Option<String>,
}

impl Context {
    /// Returns an identity context with no caller information
    pub fn unauthenticated() -> Context {
        Context::default()
    }

    /// Returns an identity context built from the given parts
    pub fn for_parts(
        account_id: Option<String>,
        caller_arn: Option<String>,
        request_id: Option<String>,
    ) -> Context {
        Context { account_id, caller_arn, request_id }
    }

    /// Returns an identity context for a specific tenant caller
    ///
    /// Not marked `#[cfg(test)]` so that integration tests can construct
    /// identities outside a Dropshot request.
    pub fn for_caller(account_id: &str, caller_arn: &str) -> Context {
        Context {
            account_id: Some(account_id.to_owned()),
            caller_arn: Some(caller_arn.to_owned()),
            request_id: None,
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn caller_arn(&self) -> Option<&str> {
        self.caller_arn.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the tenant account id or a `MissingAccountId` error
    pub fn account_id_required(&self) -> Result<&str, Error> {
        self.account_id.as_deref().ok_or(Error::MissingAccountId)
    }

    /// Returns the calling principal or a `MissingCallerArn` error
    pub fn caller_arn_required(&self) -> Result<&str, Error> {
        self.caller_arn.as_deref().ok_or(Error::MissingCallerArn)
    }
}
