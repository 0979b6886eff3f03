// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derivation of the action and resource for a protected request
//!
//! The HTTP verb yields the action prefix, the URL path segments yield the
//! resource type, and the path's trailing identifier (when present) is
//! assembled into the canonical resource string.  These are pure functions
//! so the mapping is easy to audit and test.

use http::Method;

/// What a path refers to: the innermost collection and, if present, the
/// identifier within it
#[derive(Clone, Debug, Eq, PartialEq)]
struct PathTarget {
    /// Engine-facing resource type (e.g. `Cluster`)
    type_name: &'static str,
    /// Resource-string type segment (e.g. `cluster`)
    arn_type: &'static str,
    id: Option<String>,
}

fn parse_path(path: &str) -> PathTarget {
    let mut target = PathTarget {
        type_name: "Resource",
        arn_type: "resource",
        id: None,
    };
    let mut expecting_id = false;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let collection = match segment {
            "clusters" => Some(("Cluster", "cluster")),
            "nodepools" => Some(("NodePool", "nodepool")),
            "access_entries" => Some(("AccessEntry", "accessentry")),
            _ => None,
        };
        match collection {
            Some((type_name, arn_type)) => {
                target.type_name = type_name;
                target.arn_type = arn_type;
                target.id = None;
                expecting_id = true;
            }
            None if expecting_id => {
                target.id = Some(segment.to_owned());
                expecting_id = false;
            }
            None => {}
        }
    }
    target
}

/// Derive the action name for a request
///
/// `Create`/`Update`/`Delete` follow the verb; GET is `Describe` when the
/// path carries an identifier and `List` (with the resource type
/// pluralized) when it does not.
pub fn derive_action(method: &Method, path: &str) -> String {
    let target = parse_path(path);
    match *method {
        Method::POST => format!("Create{}", target.type_name),
        Method::PUT | Method::PATCH => format!("Update{}", target.type_name),
        Method::DELETE => format!("Delete{}", target.type_name),
        Method::GET => {
            if target.id.is_some() {
                format!("Describe{}", target.type_name)
            } else {
                format!("List{}s", target.type_name)
            }
        }
        _ => format!("Unknown{}", target.type_name),
    }
}

/// Derive the canonical resource string for a request
///
/// A path with an identifier yields
/// `arn:aws:rosa:<region>:<accountId>:<type>/<id>`; a collection path
/// yields the wildcard `*`.
pub fn derive_resource(path: &str, region: &str, account_id: &str) -> String {
    let target = parse_path(path);
    match target.id {
        Some(id) => format!(
            "arn:aws:rosa:{}:{}:{}/{}",
            region, account_id, target.arn_type, id
        ),
        None => String::from("*"),
    }
}
