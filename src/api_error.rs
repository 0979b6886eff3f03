// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the platform API
//!
//! For HTTP-level error handling, see Dropshot.

use dropshot::HttpError;
use serde::Deserialize;
use serde::Serialize;

/// An error that can be generated within the platform API
///
/// These may be generated while handling a client request or as part of a
/// background operation.  When generated as part of an HTTP request, an
/// `Error` will be converted into an HTTP error as one of the last steps in
/// processing the request.  This allows most of the system to remain agnostic
/// to the transport with which the system communicates with clients.
///
/// Where possible, we reuse existing variants rather than inventing new ones
/// to distinguish cases that no programmatic consumer needs to distinguish.
/// The variant determines both the HTTP status code and the stable error
/// code reported to clients.
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
pub enum Error {
    /// An object needed as part of this operation was not found.
    #[error("Object (of type {type_name:?}) not found: {lookup_type:?}")]
    ObjectNotFound { type_name: ResourceType, lookup_type: LookupType },
    /// An object already exists with the specified identifier.
    #[error("Object (of type {type_name:?}) already exists: {object_name}")]
    ObjectAlreadyExists { type_name: ResourceType, object_name: String },
    /// The specified input field is not valid.
    #[error("Invalid Request: {message}")]
    InvalidArgument { message: String },
    /// The request did not carry the tenant account id.
    #[error("request has no account id")]
    MissingAccountId,
    /// The request did not carry the calling principal.
    #[error("request has no caller principal")]
    MissingCallerArn,
    /// The tenant account has not been enabled by a privileged caller.
    #[error("account not provisioned: {account_id}")]
    AccountNotProvisioned { account_id: String },
    /// The caller is not an administrator of the tenant account.
    #[error("caller is not an administrator of account {account_id}")]
    NotAdmin { account_id: String },
    /// The operation requires a privileged account.
    #[error("this operation requires a privileged account")]
    NotPrivileged,
    /// The policy decision was Deny.
    #[error("not authorized to perform this action")]
    AccessDenied,
    /// A policy template still has attachments referencing it.
    #[error("cannot delete policy with existing attachments")]
    PolicyInUse,
    /// The entity store or the policy engine failed.
    #[error("upstream dependency failed: {message}")]
    UpstreamFailure { message: String },
    /// The authorization pipeline failed in an unexpected way.
    #[error("authorization failed: {internal_message}")]
    AuthorizationError { internal_message: String },
    /// The system encountered an unhandled operational error.
    #[error("Internal Error: {internal_message}")]
    InternalError { internal_message: String },
}

/// Identifies a kind of API object (for error reporting)
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum ResourceType {
    Account,
    Admin,
    Group,
    GroupMember,
    Policy,
    PolicyStore,
    Attachment,
    Cluster,
    NodePool,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceType::Account => "account",
            ResourceType::Admin => "admin",
            ResourceType::Group => "group",
            ResourceType::GroupMember => "group member",
            ResourceType::Policy => "policy",
            ResourceType::PolicyStore => "policy store",
            ResourceType::Attachment => "attachment",
            ResourceType::Cluster => "cluster",
            ResourceType::NodePool => "node pool",
        })
    }
}

/// Indicates how an object was looked up (for an `ObjectNotFound` error)
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum LookupType {
    /// a specific id was requested
    ById(String),
    /// some other lookup type was used
    Other(String),
}

impl Error {
    /// Returns whether the error is likely transient and could reasonably be
    /// retried
    pub fn retryable(&self) -> bool {
        match self {
            Error::UpstreamFailure { .. } => true,

            Error::ObjectNotFound { .. }
            | Error::ObjectAlreadyExists { .. }
            | Error::InvalidArgument { .. }
            | Error::MissingAccountId
            | Error::MissingCallerArn
            | Error::AccountNotProvisioned { .. }
            | Error::NotAdmin { .. }
            | Error::NotPrivileged
            | Error::AccessDenied
            | Error::PolicyInUse
            | Error::AuthorizationError { .. }
            | Error::InternalError { .. } => false,
        }
    }

    /// Generates an [`Error::ObjectNotFound`] error for a lookup by id.
    pub fn not_found_by_id(type_name: ResourceType, id: &str) -> Error {
        Error::ObjectNotFound {
            type_name,
            lookup_type: LookupType::ById(id.to_owned()),
        }
    }

    /// Generates an [`Error::ObjectNotFound`] error for some other kind of
    /// lookup.
    pub fn not_found_other(type_name: ResourceType, message: String) -> Error {
        Error::ObjectNotFound {
            type_name,
            lookup_type: LookupType::Other(message),
        }
    }

    /// Generates an [`Error::ObjectAlreadyExists`] error.
    pub fn already_exists(type_name: ResourceType, object_name: &str) -> Error {
        Error::ObjectAlreadyExists {
            type_name,
            object_name: object_name.to_owned(),
        }
    }

    /// Generates an [`Error::InvalidArgument`] error with the given message.
    pub fn invalid_argument(message: &str) -> Error {
        Error::InvalidArgument { message: message.to_owned() }
    }

    /// Generates an [`Error::UpstreamFailure`] error with the given message
    ///
    /// This is used for failures of the entity store or the policy engine.
    /// These are transient from the API's point of view: the caller can be
    /// expected to retry.
    pub fn upstream(message: &str) -> Error {
        Error::UpstreamFailure { message: message.to_owned() }
    }

    /// Generates an [`Error::InternalError`] error with the given message
    ///
    /// InternalError should be used for operational conditions that should
    /// not happen but that we cannot reasonably handle at runtime.
    pub fn internal_error(internal_message: &str) -> Error {
        Error::InternalError { internal_message: internal_message.to_owned() }
    }

    /// Returns the stable error code reported to clients for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::ObjectNotFound { .. } => "NotFound",
            Error::ObjectAlreadyExists { .. } => "AlreadyExists",
            Error::InvalidArgument { .. } => "InvalidArgument",
            Error::MissingAccountId => "MissingAccountId",
            Error::MissingCallerArn => "MissingCallerArn",
            Error::AccountNotProvisioned { .. } => "AccountNotProvisioned",
            Error::NotAdmin { .. } => "NotAdmin",
            Error::NotPrivileged => "NotPrivileged",
            Error::AccessDenied => "AccessDenied",
            Error::PolicyInUse => "PolicyInUse",
            Error::UpstreamFailure { .. } => "UpstreamFailure",
            Error::AuthorizationError { .. } => "AuthorizationError",
            Error::InternalError { .. } => "InternalError",
        }
    }
}

impl From<Error> for HttpError {
    /// Converts an `Error` into an `HttpError`.  This defines how errors
    /// that are represented internally are ultimately exposed to clients
    /// over HTTP.
    fn from(error: Error) -> HttpError {
        let code = String::from(error.code());
        match error {
            Error::ObjectNotFound { type_name: t, lookup_type: lt } => {
                let message = match lt {
                    LookupType::ById(id) => {
                        format!("not found: {} with id \"{}\"", t, id)
                    }
                    LookupType::Other(message) => message,
                };
                HttpError::for_client_error(
                    Some(code),
                    http::StatusCode::NOT_FOUND,
                    message,
                )
            }

            Error::ObjectAlreadyExists { type_name: t, object_name: n } => {
                HttpError::for_client_error(
                    Some(code),
                    http::StatusCode::CONFLICT,
                    format!("already exists: {} \"{}\"", t, n),
                )
            }

            Error::PolicyInUse => HttpError::for_client_error(
                Some(code),
                http::StatusCode::CONFLICT,
                String::from("cannot delete policy with existing attachments"),
            ),

            Error::InvalidArgument { message } => {
                HttpError::for_bad_request(Some(code), message)
            }

            Error::MissingAccountId => HttpError::for_client_error(
                Some(code),
                http::StatusCode::FORBIDDEN,
                String::from("Account ID header is required"),
            ),

            Error::MissingCallerArn => HttpError::for_client_error(
                Some(code),
                http::StatusCode::FORBIDDEN,
                String::from("Caller ARN header is required"),
            ),

            Error::AccountNotProvisioned { account_id } => {
                HttpError::for_client_error(
                    Some(code),
                    http::StatusCode::FORBIDDEN,
                    format!(
                        "account {} is not provisioned for authorization",
                        account_id
                    ),
                )
            }

            Error::NotAdmin { .. } => HttpError::for_client_error(
                Some(code),
                http::StatusCode::FORBIDDEN,
                String::from("this operation requires admin privileges"),
            ),

            Error::NotPrivileged => HttpError::for_client_error(
                Some(code),
                http::StatusCode::FORBIDDEN,
                String::from("this operation requires a privileged account"),
            ),

            Error::AccessDenied => HttpError::for_client_error(
                Some(code),
                http::StatusCode::FORBIDDEN,
                String::from(
                    "you do not have permission to perform this action",
                ),
            ),

            Error::UpstreamFailure { message } => HttpError {
                status_code: http::StatusCode::BAD_GATEWAY,
                error_code: Some(code),
                internal_message: message.clone(),
                external_message: message,
            },

            Error::AuthorizationError { internal_message }
            | Error::InternalError { internal_message } => {
                HttpError::for_internal_error(internal_message)
            }
        }
    }
}
