//! Descriptor validation
//!
//! Validation is pure: it inspects a [`RawDescriptor`] and either produces a
//! trusted [`PluginDescriptor`] or the full list of problems found. It never
//! touches storage and never logs.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::descriptor::{PluginCategory, PluginDescriptor, RawDescriptor};

static ROUTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-z0-9-]+(/[a-z0-9-]+)*$").expect("route pattern"));

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.)?(\d+\.)?(\*|\d+)$").expect("version pattern"));

/// A single problem found while validating a descriptor candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    /// A required field is absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The route is not `/`-prefixed lowercase-kebab segments.
    #[error("malformed route (expected /lowercase-kebab/segments): {0}")]
    InvalidRoute(String),

    /// The version does not look like `MAJOR.MINOR.(PATCH|*)`.
    #[error("malformed version (expected MAJOR.MINOR.PATCH or MAJOR.MINOR.*): {0}")]
    InvalidVersion(String),

    /// The category is not in the fixed category set.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Validate a descriptor candidate.
///
/// Every problem is reported, not just the first: a candidate missing three
/// fields comes back with three [`ValidationIssue::MissingField`] entries.
pub fn validate(raw: &RawDescriptor) -> Result<PluginDescriptor, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let name = required(&raw.name, "name", &mut issues);
    let version = required(&raw.version, "version", &mut issues);
    let description = required(&raw.description, "description", &mut issues);
    let route = required(&raw.route, "route", &mut issues);
    let category_str = required(&raw.category, "category", &mut issues);

    if let Some(route) = &route
        && !ROUTE_PATTERN.is_match(route)
    {
        issues.push(ValidationIssue::InvalidRoute(route.clone()));
    }

    if let Some(version) = &version
        && !VERSION_PATTERN.is_match(version)
    {
        issues.push(ValidationIssue::InvalidVersion(version.clone()));
    }

    let category = category_str.as_deref().and_then(|value| {
        let parsed = PluginCategory::parse(value);
        if parsed.is_none() {
            issues.push(ValidationIssue::UnknownCategory(value.to_string()));
        }
        parsed
    });

    if !issues.is_empty() {
        return Err(issues);
    }

    // All five are Some here: a None would have pushed a MissingField issue.
    let (Some(name), Some(version), Some(description), Some(route), Some(category)) =
        (name, version, description, route, category)
    else {
        return Err(vec![ValidationIssue::MissingField("descriptor")]);
    };

    Ok(PluginDescriptor {
        name,
        version,
        description,
        route,
        category,
        active: raw.active.unwrap_or(true),
        featured: raw.featured.unwrap_or(false),
        dependencies: raw.dependencies.clone(),
        tags: raw.tags.clone(),
        config: raw.config.clone(),
        settings: raw.settings.clone(),
        metadata: raw.metadata.clone(),
        installed_at: None,
        last_updated: None,
        has_view: false,
    })
}

/// Whether a string satisfies the route grammar on its own.
///
/// Used by callers that patch a single field without re-validating a whole
/// descriptor.
pub fn route_is_valid(route: &str) -> bool {
    ROUTE_PATTERN.is_match(route)
}

fn required(
    value: &Option<String>,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v.clone()),
        _ => {
            issues.push(ValidationIssue::MissingField(field));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawDescriptor {
        RawDescriptor {
            name: Some("Alpha".to_string()),
            version: Some("1.0.0".to_string()),
            description: Some("A test plugin".to_string()),
            route: Some("/alpha".to_string()),
            category: Some("utility".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_candidate_passes() {
        let descriptor = validate(&valid_raw()).expect("valid");
        assert_eq!(descriptor.name, "Alpha");
        assert_eq!(descriptor.category, PluginCategory::Utility);
        assert!(descriptor.active);
        assert!(descriptor.installed_at.is_none());
    }

    #[test]
    fn test_all_missing_fields_reported_together() {
        let issues = validate(&RawDescriptor::default()).unwrap_err();
        let missing: Vec<_> = issues
            .iter()
            .filter_map(|i| match i {
                ValidationIssue::MissingField(f) => Some(*f),
                _ => None,
            })
            .collect();
        assert_eq!(
            missing,
            vec!["name", "version", "description", "route", "category"]
        );
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let mut raw = valid_raw();
        raw.description = Some(String::new());
        let issues = validate(&raw).unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::MissingField("description")]);
    }

    #[test]
    fn test_route_must_start_with_slash() {
        let mut raw = valid_raw();
        raw.route = Some("alpha".to_string());
        let issues = validate(&raw).unwrap_err();
        assert!(matches!(issues[0], ValidationIssue::InvalidRoute(_)));
    }

    #[test]
    fn test_route_rejects_uppercase_and_underscores() {
        for route in ["/Alpha", "/alpha_beta", "/alpha/", "/alpha//beta", "/"] {
            let mut raw = valid_raw();
            raw.route = Some(route.to_string());
            let issues = validate(&raw).unwrap_err();
            assert!(
                issues
                    .iter()
                    .any(|i| matches!(i, ValidationIssue::InvalidRoute(_))),
                "route {route} should be rejected"
            );
        }
    }

    #[test]
    fn test_route_accepts_nested_kebab_segments() {
        let mut raw = valid_raw();
        raw.route = Some("/reports/monthly-summary/v2".to_string());
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_version_wildcard_patch_accepted() {
        for version in ["1.0.0", "2.1.*", "0.9", "3", "*"] {
            let mut raw = valid_raw();
            raw.version = Some(version.to_string());
            assert!(validate(&raw).is_ok(), "version {version} should pass");
        }
    }

    #[test]
    fn test_version_garbage_rejected() {
        for version in ["v1.0.0", "1.0.0-beta", "1..0", "one.two.three"] {
            let mut raw = valid_raw();
            raw.version = Some(version.to_string());
            let issues = validate(&raw).unwrap_err();
            assert!(
                issues
                    .iter()
                    .any(|i| matches!(i, ValidationIssue::InvalidVersion(_))),
                "version {version} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut raw = valid_raw();
        raw.category = Some("gadgets".to_string());
        let issues = validate(&raw).unwrap_err();
        assert_eq!(
            issues,
            vec![ValidationIssue::UnknownCategory("gadgets".to_string())]
        );
    }

    #[test]
    fn test_missing_and_malformed_reported_together() {
        let raw = RawDescriptor {
            name: Some("Alpha".to_string()),
            route: Some("NotARoute".to_string()),
            version: Some("abc".to_string()),
            ..Default::default()
        };
        let issues = validate(&raw).unwrap_err();
        assert!(issues.contains(&ValidationIssue::MissingField("description")));
        assert!(issues.contains(&ValidationIssue::MissingField("category")));
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, ValidationIssue::InvalidRoute(_)))
        );
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, ValidationIssue::InvalidVersion(_)))
        );
    }

    #[test]
    fn test_route_is_valid_helper() {
        assert!(route_is_valid("/alpha"));
        assert!(route_is_valid("/alpha/beta-2"));
        assert!(!route_is_valid("alpha"));
        assert!(!route_is_valid("/Alpha"));
    }

    #[test]
    fn test_opaque_maps_carried_through() {
        let mut raw = valid_raw();
        raw.config.insert("greeting".into(), "hello".into());
        let descriptor = validate(&raw).expect("valid");
        assert_eq!(
            descriptor.config.get("greeting").and_then(|v| v.as_str()),
            Some("hello")
        );
        assert!(descriptor.settings.is_empty());
    }
}
