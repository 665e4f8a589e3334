//! Configuration validation
//!
//! One shared module checks uniqueness, requirements, and incompatibilities
//! for a wanted extension set. Interactive front-ends use it for early
//! feedback and the submission path uses it for authoritative enforcement,
//! so the two can never disagree.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::extension::{Catalog, Extension};

/// One missing direct requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRequirement {
    /// Name of the extension that is required but not selected
    pub name: String,
    /// Name of the selected extension that requires it
    pub required_by: String,
}

/// One incompatibility between two selected extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// The selected extension declaring the incompatibility
    pub extension: String,
    /// The selected extension it conflicts with
    pub incompatible_with: String,
}

/// A requirement that does not exist in the catalog at all
///
/// The depending extension itself is invalid: it depends on something that
/// cannot be selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRequirement {
    /// The selected extension with the dangling requirement
    pub extension: String,
    /// The requirement name missing from the catalog
    pub requirement: String,
}

/// Outcome of validating a wanted extension set
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Number of extensions in the wanted set
    pub selected: usize,

    /// Names selected more than once (two versions of one component)
    pub duplicates: Vec<String>,

    /// Requirements present in the catalog but absent from the wanted set
    pub missing: Vec<MissingRequirement>,

    /// Requirements that are unresolvable in the catalog
    pub unresolved: Vec<UnresolvedRequirement>,

    /// Mutually exclusive selections
    pub conflicts: Vec<Conflict>,
}

impl ValidationReport {
    /// Whether the wanted set may be submitted for a build
    pub fn is_valid(&self) -> bool {
        self.selected > 0
            && self.duplicates.is_empty()
            && self.missing.is_empty()
            && self.unresolved.is_empty()
            && self.conflicts.is_empty()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.selected == 0 {
            return write!(f, "nothing selected");
        }
        let mut parts = Vec::new();
        for name in &self.duplicates {
            parts.push(format!("'{name}' selected more than once"));
        }
        for m in &self.missing {
            parts.push(format!("'{}' requires '{}'", m.required_by, m.name));
        }
        for u in &self.unresolved {
            parts.push(format!(
                "'{}' depends on unknown extension '{}'",
                u.extension, u.requirement
            ));
        }
        for c in &self.conflicts {
            parts.push(format!(
                "'{}' is incompatible with '{}'",
                c.extension, c.incompatible_with
            ));
        }
        if parts.is_empty() {
            write!(f, "ok")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

/// Validate a wanted extension set against the catalog
///
/// Pure function. Identifiers in `required_extensions` and
/// `incompatible_extensions` are extension names; any selected version of a
/// name satisfies a requirement on it, and conflicts flag both sides.
pub fn validate(wanted: &[Extension], catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport {
        selected: wanted.len(),
        ..ValidationReport::default()
    };

    let selected_names: Vec<&str> = wanted.iter().map(|e| e.name.as_str()).collect();

    let mut seen = BTreeSet::new();
    let mut conflict_pairs = BTreeSet::new();

    for extension in wanted {
        if !seen.insert(extension.name.as_str()) {
            if !report.duplicates.contains(&extension.name) {
                report.duplicates.push(extension.name.clone());
            }
            continue;
        }

        for requirement in &extension.required_extensions {
            if selected_names.contains(&requirement.as_str()) {
                continue;
            }
            if catalog.contains_name(requirement) {
                report.missing.push(MissingRequirement {
                    name: requirement.clone(),
                    required_by: extension.name.clone(),
                });
            } else {
                report.unresolved.push(UnresolvedRequirement {
                    extension: extension.name.clone(),
                    requirement: requirement.clone(),
                });
            }
        }

        for incompatible in &extension.incompatible_extensions {
            if !selected_names.contains(&incompatible.as_str()) {
                continue;
            }
            // Flag both directions once, whichever side declared it
            let pair = if extension.name < *incompatible {
                (extension.name.clone(), incompatible.clone())
            } else {
                (incompatible.clone(), extension.name.clone())
            };
            if conflict_pairs.insert(pair) {
                report.conflicts.push(Conflict {
                    extension: extension.name.clone(),
                    incompatible_with: incompatible.clone(),
                });
                report.conflicts.push(Conflict {
                    extension: incompatible.clone(),
                    incompatible_with: extension.name.clone(),
                });
            }
        }
    }

    report
}

/// One-level requirement closure helper
///
/// Returns the names of catalog extensions that are directly required by
/// the wanted set but not selected. This is the full extent of automatic
/// resolution: requirements of requirements are not chased.
pub fn direct_requirements(wanted: &[Extension], catalog: &Catalog) -> Vec<String> {
    let selected: BTreeSet<&str> = wanted.iter().map(|e| e.name.as_str()).collect();
    let mut needed = BTreeSet::new();

    for extension in wanted {
        for requirement in &extension.required_extensions {
            if !selected.contains(requirement.as_str()) && catalog.contains_name(requirement) {
                needed.insert(requirement.clone());
            }
        }
    }

    needed.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extension::ExtensionGroup;

    fn ext(name: &str, requires: &[&str], incompatible: &[&str]) -> Extension {
        let group = if name.starts_with("frontend") {
            ExtensionGroup::Frontend
        } else {
            ExtensionGroup::Backend
        };
        Extension {
            name: name.to_string(),
            version: "master".to_string(),
            group,
            repository: format!("https://example.com/{name}"),
            required_extensions: requires.iter().map(ToString::to_string).collect(),
            incompatible_extensions: incompatible.iter().map(ToString::to_string).collect(),
            img_src: None,
            description: None,
            active: true,
            is_base: name == "frontend" || name == "backend",
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            frontend: vec![
                ext("frontend", &["backend"], &[]),
                ext("frontend-extension-vr", &["backend", "frontend", "backend-extension-vr"], &[]),
                ext(
                    "frontend-extension-new-vr",
                    &["backend", "frontend", "backend-extension-new-vr"],
                    &["frontend-extension-vr"],
                ),
            ],
            backend: vec![
                ext("backend", &["frontend"], &[]),
                ext("backend-extension-vr", &["backend", "frontend", "frontend-extension-vr"], &[]),
                ext(
                    "backend-extension-new-vr",
                    &["backend", "frontend", "frontend-extension-new-vr"],
                    &["backend-extension-vr"],
                ),
            ],
        }
    }

    #[test]
    fn test_valid_base_pair() {
        let wanted = vec![ext("frontend", &["backend"], &[]), ext("backend", &["frontend"], &[])];
        let report = validate(&wanted, &catalog());
        assert!(report.is_valid(), "unexpected violations: {report}");
    }

    #[test]
    fn test_empty_set_invalid() {
        let report = validate(&[], &catalog());
        assert!(!report.is_valid());
        assert_eq!(report.selected, 0);
    }

    #[test]
    fn test_missing_requirement_reported() {
        // vr backend extension requires its frontend counterpart
        let wanted = vec![
            ext("frontend", &["backend"], &[]),
            ext("backend", &["frontend"], &[]),
            ext("backend-extension-vr", &["backend", "frontend", "frontend-extension-vr"], &[]),
        ];
        let report = validate(&wanted, &catalog());
        assert!(!report.is_valid());
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].name, "frontend-extension-vr");
        assert_eq!(report.missing[0].required_by, "backend-extension-vr");
    }

    #[test]
    fn test_incompatibility_flags_both_sides() {
        let wanted = vec![
            ext("frontend", &["backend"], &[]),
            ext("backend", &["frontend"], &[]),
            ext("frontend-extension-vr", &["backend", "frontend"], &[]),
            ext(
                "frontend-extension-new-vr",
                &["backend", "frontend"],
                &["frontend-extension-vr"],
            ),
        ];
        let report = validate(&wanted, &catalog());
        assert!(!report.is_valid());
        let flagged: Vec<&str> = report.conflicts.iter().map(|c| c.extension.as_str()).collect();
        assert!(flagged.contains(&"frontend-extension-vr"));
        assert!(flagged.contains(&"frontend-extension-new-vr"));
    }

    #[test]
    fn test_uniqueness_violation() {
        // Two versions of the frontend base selected at once
        let mut second = ext("frontend", &["backend"], &[]);
        second.version = "v1.5.0".to_string();
        let wanted = vec![
            ext("frontend", &["backend"], &[]),
            second,
            ext("backend", &["frontend"], &[]),
        ];
        let report = validate(&wanted, &catalog());
        assert!(!report.is_valid());
        assert_eq!(report.duplicates, vec!["frontend".to_string()]);
    }

    #[test]
    fn test_unresolvable_requirement_marks_extension() {
        let wanted = vec![
            ext("frontend", &["backend"], &[]),
            ext("backend", &["frontend"], &[]),
            ext("backend-extension-vr", &["no-such-extension"], &[]),
        ];
        let report = validate(&wanted, &catalog());
        assert!(!report.is_valid());
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].extension, "backend-extension-vr");
        assert_eq!(report.unresolved[0].requirement, "no-such-extension");
        assert!(report.missing.is_empty(), "unresolvable must not count as missing");
    }

    #[test]
    fn test_direct_requirements_one_level_only() {
        // vr frontend extension pulls in its backend counterpart and the
        // bases, but nothing beyond one level
        let wanted = vec![ext(
            "frontend-extension-vr",
            &["backend", "frontend", "backend-extension-vr"],
            &[],
        )];
        let needed = direct_requirements(&wanted, &catalog());
        assert_eq!(
            needed,
            vec![
                "backend".to_string(),
                "backend-extension-vr".to_string(),
                "frontend".to_string(),
            ]
        );
    }
}
