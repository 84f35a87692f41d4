//! Shape-detecting normalizer for the external dependency-tree enumerator's
//! JSON output (§4.2).

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::version::parse_version;
use crate::core::{normalize_name, parse_specifier_set, DependencyMap, NormalizeError, PackageNode};

/// Builds a canonical [`DependencyMap`] from the enumerator's JSON array.
///
/// Detects the nested-vs-flat shape independently for every element, so a
/// mixed-shape input (produced by an environment with packages discovered
/// across enumerator versions) is tolerated. Malformed elements are skipped
/// with a warning; this function never aborts the pass.
pub fn build_dependency_map(tree: &Value) -> Result<DependencyMap, NormalizeError> {
    let elements = tree
        .as_array()
        .ok_or_else(|| NormalizeError::InvalidRoot("expected a top-level JSON array".to_string()))?;

    let mut map = DependencyMap::new();
    for element in elements {
        match normalize_element(element) {
            Ok(node) => map.upsert(node),
            Err(e) => warn!("skipping malformed tree element: {}", e),
        }
    }

    debug!("normalized {} tree elements into {} nodes", elements.len(), map.len());
    Ok(map)
}

/// Extracts a `"key"` or `"package_name"` string field.
fn extract_name(v: &Value) -> Option<String> {
    v.get("key")
        .or_else(|| v.get("package_name"))
        .and_then(Value::as_str)
        .map(normalize_name)
}

fn extract_installed_version(v: &Value) -> Option<String> {
    v.get("installed_version").and_then(Value::as_str).map(str::to_string)
}

/// Strips a trailing `; marker expression` clause (§9: the marker is
/// dropped, never evaluated, matching the original's naive handling).
fn strip_marker(raw: &str) -> &str {
    raw.split(';').next().unwrap_or(raw).trim()
}

fn normalize_element(element: &Value) -> Result<PackageNode, NormalizeError> {
    if let Some(package) = element.get("package") {
        normalize_nested(package, element)
    } else if extract_name(element).is_some() {
        normalize_flat(element)
    } else {
        Err(NormalizeError::MalformedElement(format!(
            "element has neither a 'package' object nor a top-level 'key'/'package_name': {}",
            element
        )))
    }
}

/// Nested shape: `{ "package": { key, installed_version }, "dependencies": [{ "package": {...}, "required_version" }] }`.
fn normalize_nested(package: &Value, element: &Value) -> Result<PackageNode, NormalizeError> {
    let name = extract_name(package).ok_or_else(|| {
        NormalizeError::MalformedElement("nested element's 'package' is missing key/package_name".to_string())
    })?;
    let installed_raw = extract_installed_version(package).ok_or_else(|| {
        NormalizeError::MalformedElement(format!("package '{}' has no installed_version", name))
    })?;

    let mut node = PackageNode::new(name, parse_version(&installed_raw));

    if let Some(deps) = element.get("dependencies").and_then(Value::as_array) {
        for dep in deps {
            let Some(dep_package) = dep.get("package") else {
                warn!("dependency entry missing 'package' object, skipping");
                continue;
            };
            let Some(dep_name) = extract_name(dep_package) else {
                warn!("dependency 'package' object missing key/package_name, skipping");
                continue;
            };
            insert_dependency(&mut node, &dep_name, dep.get("required_version"));
        }
    }

    Ok(node)
}

/// Flat shape: `{ key, installed_version, "dependencies": [{ key, required_version }] }`.
fn normalize_flat(element: &Value) -> Result<PackageNode, NormalizeError> {
    let name = extract_name(element)
        .ok_or_else(|| NormalizeError::MalformedElement("flat element missing key/package_name".to_string()))?;
    let installed_raw = extract_installed_version(element)
        .ok_or_else(|| NormalizeError::MalformedElement(format!("package '{}' has no installed_version", name)))?;

    let mut node = PackageNode::new(name, parse_version(&installed_raw));

    if let Some(deps) = element.get("dependencies").and_then(Value::as_array) {
        for dep in deps {
            let Some(dep_name) = extract_name(dep) else {
                warn!("flat dependency entry missing key/package_name, skipping");
                continue;
            };
            insert_dependency(&mut node, &dep_name, dep.get("required_version"));
        }
    }

    Ok(node)
}

/// Filters the `Any`/empty wildcard sentinel, strips a marker clause, and
/// merges the resulting specifier set into `node`'s dependency entries.
fn insert_dependency(node: &mut PackageNode, dep_name: &str, required_version: Option<&Value>) {
    let raw = required_version.and_then(Value::as_str).unwrap_or("");
    let stripped = strip_marker(raw);
    let spec = parse_specifier_set(stripped);

    node.dependencies
        .entry(dep_name.to_string())
        .and_modify(|existing| *existing = existing.intersect(&spec))
        .or_insert(spec);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_nested_shape() {
        let tree = json!([
            {
                "package": { "key": "requests", "installed_version": "2.26.0" },
                "dependencies": [
                    { "package": { "key": "urllib3" }, "required_version": ">=1.21.1,<1.27" }
                ]
            }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        let node = map.get("requests").unwrap();
        assert_eq!(node.dependencies.len(), 1);
        assert!(node.dependencies.contains_key("urllib3"));
    }

    #[test]
    fn normalizes_flat_shape() {
        let tree = json!([
            {
                "package_name": "Flask",
                "installed_version": "2.0.0",
                "dependencies": [
                    { "package_name": "Werkzeug", "required_version": ">=2.0" }
                ]
            }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        let node = map.get("flask").unwrap();
        assert!(node.dependencies.contains_key("werkzeug"));
    }

    #[test]
    fn tolerates_mixed_shapes_in_one_document() {
        let tree = json!([
            { "package": { "key": "a", "installed_version": "1.0.0" }, "dependencies": [] },
            { "package_name": "b", "installed_version": "2.0.0", "dependencies": [] }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn any_and_empty_required_version_produce_no_specifier() {
        let tree = json!([
            {
                "package_name": "app",
                "installed_version": "1.0.0",
                "dependencies": [
                    { "package_name": "dep-any", "required_version": "Any" },
                    { "package_name": "dep-empty", "required_version": "" }
                ]
            }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        let node = map.get("app").unwrap();
        assert!(node.dependencies.get("dep-any").unwrap().is_empty());
        assert!(node.dependencies.get("dep-empty").unwrap().is_empty());
    }

    #[test]
    fn marker_clause_is_stripped_not_evaluated() {
        let tree = json!([
            {
                "package_name": "app",
                "installed_version": "1.0.0",
                "dependencies": [
                    { "package_name": "dep", "required_version": ">=2.0; python_version<'3.10'" }
                ]
            }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        let node = map.get("app").unwrap();
        let spec = node.dependencies.get("dep").unwrap();
        assert_eq!(spec.to_raw_string(), ">=2.0");
    }

    #[test]
    fn malformed_element_is_skipped_not_fatal() {
        let tree = json!([
            { "nonsense": true },
            { "package_name": "ok", "installed_version": "1.0.0", "dependencies": [] }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get("ok").is_some());
    }

    #[test]
    fn duplicate_names_collapse_with_first_seen_version() {
        let tree = json!([
            { "package_name": "Image_Utils", "installed_version": "1.1.7", "dependencies": [] },
            { "package_name": "image-utils", "installed_version": "9.0.0", "dependencies": [] },
            { "package_name": "IMAGE.UTILS", "installed_version": "9.5.0", "dependencies": [] }
        ]);

        let map = build_dependency_map(&tree).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("image-utils").unwrap().installed_version.as_str(), "1.1.7");
    }

    #[test]
    fn non_array_root_is_rejected() {
        let tree = json!({ "not": "an array" });
        assert!(build_dependency_map(&tree).is_err());
    }
}
