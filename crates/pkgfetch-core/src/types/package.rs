//! Package identifier types.
//!
//! Defines package names (optionally `@scope/`-prefixed) and the `name@selector`
//! references handed to the package manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker that starts a scoped package name
pub const SCOPE_MARKER: char = '@';

/// Separator between scope and name in `@scope/name`
pub const SCOPE_SEPARATOR: char = '/';

/// Package name as published in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

/// Reference to a package plus an optional version, tag or range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    pub name: PackageName,
    pub selector: Option<String>,
}

impl PackageName {
    /// Wrap a package name without validating it
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is an `@scope/name` package
    pub fn is_scoped(&self) -> bool {
        self.0.starts_with(SCOPE_MARKER)
    }

    /// Scope without the leading marker, for scoped packages
    pub fn scope(&self) -> Option<&str> {
        if !self.is_scoped() {
            return None;
        }
        self.0[1..].split(SCOPE_SEPARATOR).next()
    }

    /// File-system safe form: `@scope/pkg` becomes `scope-pkg`
    pub fn flattened(&self) -> String {
        match self.0.strip_prefix(SCOPE_MARKER) {
            Some(rest) => rest.replacen(SCOPE_SEPARATOR, "-", 1),
            None => self.0.clone(),
        }
    }

    /// Output file name for a downloaded tarball: `<flattened>-<version>.tgz`
    pub fn tarball_file_name(&self, version: &str) -> String {
        format!("{}-{}.tgz", self.flattened(), version)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PackageSpec {
    /// Parse `name`, `name@selector`, `@scope/name` or `@scope/name@selector`
    pub fn parse(spec: &str) -> Self {
        // A leading '@' is the scope marker, never a selector separator
        let search_from = usize::from(spec.starts_with(SCOPE_MARKER));
        match spec[search_from..].rfind(SCOPE_MARKER) {
            Some(at) => {
                let at = at + search_from;
                let selector = &spec[at + 1..];
                Self {
                    name: PackageName::new(&spec[..at]),
                    selector: (!selector.is_empty()).then(|| selector.to_string()),
                }
            },
            None => Self {
                name: PackageName::new(spec),
                selector: None,
            },
        }
    }

    /// Reference to one exact version
    pub fn exact(name: impl Into<PackageName>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: Some(version.into()),
        }
    }

    /// Selector, or the `latest` dist-tag when none was given
    pub fn selector_or_latest(&self) -> &str {
        self.selector.as_deref().unwrap_or("latest")
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Some(selector) => write!(f, "{}@{}", self.name, selector),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unscoped_name() {
        let name = PackageName::new("bower");
        assert!(!name.is_scoped());
        assert_eq!(name.scope(), None);
        assert_eq!(name.flattened(), "bower");
        assert_eq!(name.tarball_file_name("1.7.7"), "bower-1.7.7.tgz");
    }

    #[test]
    fn test_scoped_name() {
        let name = PackageName::new("@scope/pkg");
        assert!(name.is_scoped());
        assert_eq!(name.scope(), Some("scope"));
        assert_eq!(name.flattened(), "scope-pkg");
        assert_eq!(name.tarball_file_name("2.0.0"), "scope-pkg-2.0.0.tgz");
    }

    #[test]
    fn test_parse_spec() {
        let spec = PackageSpec::parse("bower@1.7.7");
        assert_eq!(spec.name.as_str(), "bower");
        assert_eq!(spec.selector.as_deref(), Some("1.7.7"));

        let spec = PackageSpec::parse("@types/node@^20");
        assert_eq!(spec.name.as_str(), "@types/node");
        assert_eq!(spec.selector.as_deref(), Some("^20"));

        let spec = PackageSpec::parse("@types/node");
        assert_eq!(spec.name.as_str(), "@types/node");
        assert_eq!(spec.selector, None);
        assert_eq!(spec.selector_or_latest(), "latest");

        let spec = PackageSpec::parse("lodash@");
        assert_eq!(spec.name.as_str(), "lodash");
        assert_eq!(spec.selector, None);
    }

    #[test]
    fn test_spec_display() {
        assert_eq!(PackageSpec::exact("bower", "1.7.7").to_string(), "bower@1.7.7");
        assert_eq!(PackageSpec::parse("@scope/pkg").to_string(), "@scope/pkg");
    }

    #[test]
    fn test_name_serializes_as_plain_string() {
        let name = PackageName::new("@scope/pkg");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"@scope/pkg\"");

        let parsed: PackageName = serde_json::from_str("\"bower\"").unwrap();
        assert_eq!(parsed, PackageName::from("bower"));
    }

    proptest! {
        #[test]
        fn flattened_scoped_names_have_no_marker_or_separator(
            scope in "[a-z][a-z0-9-]{0,12}",
            pkg in "[a-z][a-z0-9.-]{0,12}",
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let name = PackageName::new(format!("@{}/{}", scope, pkg));
            let file_name = name.tarball_file_name(&version);
            prop_assert!(!file_name.contains('@'));
            prop_assert!(!file_name.contains('/'));
            prop_assert_eq!(file_name, format!("{}-{}-{}.tgz", scope, pkg, version));
        }

        #[test]
        fn spec_display_round_trips(
            pkg in "(@[a-z]{1,8}/)?[a-z][a-z0-9-]{0,12}",
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let spec = PackageSpec::exact(PackageName::new(pkg.clone()), version.clone());
            let parsed = PackageSpec::parse(&spec.to_string());
            prop_assert_eq!(parsed.name.as_str(), pkg.as_str());
            prop_assert_eq!(parsed.selector.as_deref(), Some(version.as_str()));
        }
    }
}
