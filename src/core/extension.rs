//! Extension catalog data model
//!
//! An extension is one selectable component of a bundle, belonging to
//! either the frontend or the backend group. The catalog is assembled by
//! the registry client and persisted as JSON; the core never mutates it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Component family an extension belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionGroup {
    /// Browser-side components, installed into the frontend checkout
    Frontend,
    /// Server-side components, assembled as separate modules
    Backend,
}

impl std::fmt::Display for ExtensionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frontend => write!(f, "frontend"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

/// One selectable extension at one version
///
/// `required_extensions` and `incompatible_extensions` reference extension
/// *names*; resolution to concrete records happens by catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    /// Stable logical identifier, unique within its group
    pub name: String,

    /// Requested ref: a branch name or a release tag
    pub version: String,

    /// Component group
    pub group: ExtensionGroup,

    /// Source repository URL
    pub repository: String,

    /// Names of extensions that must also be selected
    #[serde(default)]
    pub required_extensions: Vec<String>,

    /// Names of extensions that must not be selected alongside this one
    #[serde(default)]
    pub incompatible_extensions: Vec<String>,

    /// Logo image source, relative or absolute
    #[serde(default)]
    pub img_src: Option<String>,

    /// Human-readable description pulled from the repository README
    #[serde(default)]
    pub description: Option<String>,

    /// Whether this extension/version is currently buildable
    #[serde(default = "default_active")]
    pub active: bool,

    /// True exactly for the two root components every bundle includes
    #[serde(default)]
    pub is_base: bool,
}

fn default_active() -> bool {
    true
}

/// Extension identity submitted by a caller
///
/// Group and repository always come from the catalog, never from the
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    /// Extension name
    pub name: String,
    /// Requested version (branch or release tag)
    pub version: String,
}

/// Extension with its version resolved to an immutable commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExtension {
    /// Extension name
    pub name: String,
    /// Requested ref the commit was resolved from
    pub version: String,
    /// Immutable revision; the only version input to the identity hash
    pub commit: String,
    /// Component group
    pub group: ExtensionGroup,
    /// Source repository URL
    pub repository: String,
    /// Whether this is the group's root component
    pub is_base: bool,
}

/// An unordered set of resolved extensions submitted for one build
///
/// Two configurations are equal iff their (name, commit) multisets match;
/// submission order carries no meaning.
#[derive(Debug, Clone)]
pub struct Configuration {
    extensions: Vec<ResolvedExtension>,
}

impl Configuration {
    /// Create a configuration from resolved extensions
    pub fn new(extensions: Vec<ResolvedExtension>) -> Self {
        Self { extensions }
    }

    /// The extensions driving this build
    pub fn extensions(&self) -> &[ResolvedExtension] {
        &self.extensions
    }

    /// Canonical identity of this configuration
    pub fn id(&self) -> crate::core::identity::ConfigId {
        crate::core::identity::configuration_id(&self.extensions)
    }

    /// Extensions of one group, excluding the group's base component
    pub fn group_extensions(
        &self,
        group: ExtensionGroup,
    ) -> impl Iterator<Item = &ResolvedExtension> {
        self.extensions
            .iter()
            .filter(move |e| e.group == group && !e.is_base)
    }

    /// The base component of a group, if the configuration carries one
    pub fn base(&self, group: ExtensionGroup) -> Option<&ResolvedExtension> {
        self.extensions
            .iter()
            .find(|e| e.group == group && e.is_base)
    }
}

/// The full extension catalog, partitioned by group
///
/// Mirrors the persisted JSON shape: `{"frontend": [...], "backend": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Frontend extensions, base first
    #[serde(default)]
    pub frontend: Vec<Extension>,

    /// Backend extensions, base first
    #[serde(default)]
    pub backend: Vec<Extension>,
}

impl Catalog {
    /// Iterate over all catalog entries
    pub fn all(&self) -> impl Iterator<Item = &Extension> {
        self.frontend.iter().chain(self.backend.iter())
    }

    /// Look up one concrete extension by name and version
    pub fn lookup(&self, name: &str, version: &str) -> Option<&Extension> {
        self.all().find(|e| e.name == name && e.version == version)
    }

    /// Whether any version of `name` exists in the catalog
    pub fn contains_name(&self, name: &str) -> bool {
        self.all().any(|e| e.name == name)
    }

    /// Parse from JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load the catalog from its persisted file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| CatalogError::ParseFailed {
            url: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Persist the catalog to disk
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let content = self.to_json().map_err(|e| CatalogError::ParseFailed {
            url: path.display().to_string(),
            error: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| CatalogError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

/// A build plan file: the set of extensions a user wants bundled
///
/// ```toml
/// [[extension]]
/// name = "backend"
/// version = "master"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundlePlan {
    /// Requested extensions
    #[serde(default, rename = "extension")]
    pub extensions: Vec<ExtensionRequest>,
}

impl BundlePlan {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(name: &str, version: &str, group: ExtensionGroup) -> Extension {
        Extension {
            name: name.to_string(),
            version: version.to_string(),
            group,
            repository: format!("https://example.com/{name}"),
            required_extensions: vec![],
            incompatible_extensions: vec![],
            img_src: None,
            description: None,
            active: true,
            is_base: false,
        }
    }

    #[test]
    fn test_catalog_lookup_by_name_and_version() {
        let catalog = Catalog {
            frontend: vec![
                ext("frontend", "master", ExtensionGroup::Frontend),
                ext("frontend-extension-vr", "1.0", ExtensionGroup::Frontend),
                ext("frontend-extension-vr", "1.1", ExtensionGroup::Frontend),
            ],
            backend: vec![ext("backend", "master", ExtensionGroup::Backend)],
        };

        assert!(catalog.lookup("frontend-extension-vr", "1.1").is_some());
        assert!(catalog.lookup("frontend-extension-vr", "2.0").is_none());
        assert!(catalog.contains_name("backend"));
        assert!(!catalog.contains_name("backend-extension-vr"));
    }

    #[test]
    fn test_catalog_json_roundtrip() {
        let catalog = Catalog {
            frontend: vec![ext("frontend", "master", ExtensionGroup::Frontend)],
            backend: vec![ext("backend", "master", ExtensionGroup::Backend)],
        };

        let json = catalog.to_json().unwrap();
        let parsed = Catalog::from_json(&json).unwrap();
        assert_eq!(parsed.frontend, catalog.frontend);
        assert_eq!(parsed.backend, catalog.backend);
    }

    #[test]
    fn test_catalog_json_defaults_missing_fields() {
        // Entries written by older catalog versions omit the flags
        let json = r#"{
            "frontend": [{
                "name": "frontend",
                "version": "master",
                "group": "frontend",
                "repository": "https://example.com/frontend"
            }],
            "backend": []
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert!(catalog.frontend[0].active);
        assert!(!catalog.frontend[0].is_base);
        assert!(catalog.frontend[0].required_extensions.is_empty());
    }

    #[test]
    fn test_bundle_plan_parse() {
        let plan = BundlePlan::from_toml(
            r#"
[[extension]]
name = "backend"
version = "master"

[[extension]]
name = "frontend"
version = "v1.5.0"
"#,
        )
        .unwrap();
        assert_eq!(plan.extensions.len(), 2);
        assert_eq!(plan.extensions[1].name, "frontend");
        assert_eq!(plan.extensions[1].version, "v1.5.0");
    }
}
