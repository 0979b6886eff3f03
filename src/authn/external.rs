// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity extraction for requests to the external HTTP API
//!
//! The reference deployment sits behind an authenticating edge that stamps
//! the caller's identity into trusted request headers.  We blindly lift
//! those headers into the request scope; there is nothing to verify here
//! because the edge has already done the verification and untrusted clients
//! cannot reach this server directly.

use super::Context;
use http::HeaderMap;

/// Header carrying the tenant account id
pub const HTTP_HEADER_ACCOUNT_ID: &str = "x-amz-account-id";
/// Header carrying the calling principal ARN
pub const HTTP_HEADER_CALLER_ARN: &str = "x-amz-caller-arn";
/// Header carrying the edge-assigned request id
pub const HTTP_HEADER_REQUEST_ID: &str = "x-amz-request-id";

/// Lifts caller identity out of the request headers
///
/// This never fails: a missing or malformed (non-UTF-8) header is treated
/// as absent.  Gates downstream reject requests that are missing fields
/// they require.
pub fn identity_from_headers(headers: &HeaderMap) -> Context {
    Context::for_parts(
        header_string(headers, HTTP_HEADER_ACCOUNT_ID),
        header_string(headers, HTTP_HEADER_CALLER_ARN),
        header_string(headers, HTTP_HEADER_REQUEST_ID),
    )
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
}
