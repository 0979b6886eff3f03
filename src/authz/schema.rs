// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Embedded Cedar schema installed into every fresh policy store
//!
//! The schema names the entity types of the evaluation vocabulary
//! (`Principal`, `Group`, `Resource` and its refinements) and enumerates
//! the action set.  It is carried in the binary so that account
//! provisioning does not depend on any external artifact.

/// JSON representation of the Cedar schema
pub const CEDAR_SCHEMA_JSON: &str = include_str!("platform.cedarschema.json");

#[cfg(test)]
mod test {
    use super::CEDAR_SCHEMA_JSON;

    #[test]
    fn test_schema_parses() {
        let schema: serde_json::Value =
            serde_json::from_str(CEDAR_SCHEMA_JSON).unwrap();
        let root = schema.as_object().unwrap();
        // The vocabulary is unnamespaced.
        let namespace = root.get("").unwrap();
        let entity_types =
            namespace.get("entityTypes").unwrap().as_object().unwrap();
        for required in ["Principal", "Group", "Resource"] {
            assert!(
                entity_types.contains_key(required),
                "schema is missing entity type {}",
                required
            );
        }
        let actions = namespace.get("actions").unwrap().as_object().unwrap();
        for required in
            ["CreateCluster", "DescribeCluster", "ListClusters", "TagResource"]
        {
            assert!(
                actions.contains_key(required),
                "schema is missing action {}",
                required
            );
        }
    }
}
