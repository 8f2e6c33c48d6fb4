//! Published version lookup and version bump policy
//!
//! The registry answers whether a package version is already published and
//! which post-release comes next. [`VersionPolicy`] turns those answers into
//! the version a package is built with, or `None` to skip it.

use sdk_stubs_builder_common::{BuilderError, RegistryFailurePolicy, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Source of published package versions
#[cfg_attr(test, mockall::automock)]
pub trait VersionRegistry: Send + Sync {
    /// Whether `version` of `pypi_name` is already published
    fn has_version(&self, pypi_name: &str, version: &str) -> Result<bool>;

    /// First unpublished post-release of `version`
    fn get_next_version(&self, pypi_name: &str, version: &str) -> Result<String>;
}

/// Registry backed by a JSON snapshot: `{"mypy-boto3-s3": ["1.34.0", ...]}`
#[derive(Debug, Clone, Default)]
pub struct PublishedVersions {
    versions: HashMap<String, Vec<String>>,
}

impl PublishedVersions {
    /// Registry where nothing is published
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a snapshot file
    ///
    /// An unreadable or malformed file means the registry is unavailable.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BuilderError::VersionRegistryUnavailable(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let versions = serde_json::from_str(json).map_err(|e| {
            BuilderError::VersionRegistryUnavailable(format!(
                "Failed to parse published versions: {}",
                e
            ))
        })?;
        Ok(Self { versions })
    }

    fn published(&self, pypi_name: &str) -> &[String] {
        self.versions
            .get(pypi_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl VersionRegistry for PublishedVersions {
    fn has_version(&self, pypi_name: &str, version: &str) -> Result<bool> {
        Ok(self.published(pypi_name).iter().any(|v| v == version))
    }

    fn get_next_version(&self, pypi_name: &str, version: &str) -> Result<String> {
        Ok(next_post_release(self.published(pypi_name), version))
    }
}

/// `X` -> `X.post1` -> `X.post2` ... skipping published post-releases
pub fn next_post_release(published: &[String], version: &str) -> String {
    let prefix = format!("{}.post", version);
    let last = published
        .iter()
        .filter_map(|v| v.strip_prefix(&prefix))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{}", prefix, last + 1)
}

/// How requested versions are turned into build versions
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionPolicy {
    /// Skip packages whose requested version is already published
    pub skip_published: bool,
    /// Reuse a published version instead of bumping to a post-release
    pub disable_smart_version: bool,
    pub on_unavailable: RegistryFailurePolicy,
}

impl VersionPolicy {
    /// Version to build `pypi_name` with; `None` means skip the package
    pub fn package_version(
        &self,
        registry: &dyn VersionRegistry,
        pypi_name: &str,
        version: &str,
    ) -> Result<Option<String>> {
        let published = match registry.has_version(pypi_name, version) {
            Ok(published) => published,
            Err(err) => return self.recover(err, version),
        };

        if !published {
            return Ok(Some(version.to_string()));
        }
        if self.skip_published {
            return Ok(None);
        }
        if self.disable_smart_version {
            return Ok(Some(version.to_string()));
        }

        match registry.get_next_version(pypi_name, version) {
            Ok(next) => Ok(Some(next)),
            Err(err) => self.recover(err, version),
        }
    }

    fn recover(&self, err: BuilderError, version: &str) -> Result<Option<String>> {
        match (&err, self.on_unavailable) {
            (BuilderError::VersionRegistryUnavailable(_), RegistryFailurePolicy::Optimistic) => {
                warn!(error = %err, version, "Assuming version is unpublished");
                Ok(Some(version.to_string()))
            }
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_post_release() {
        let published = vec!["1.0.0".to_string()];
        assert_eq!(next_post_release(&published, "1.0.0"), "1.0.0.post1");

        let published = vec![
            "1.0.0".to_string(),
            "1.0.0.post1".to_string(),
            "1.0.0.post2".to_string(),
            "1.0.1".to_string(),
        ];
        assert_eq!(next_post_release(&published, "1.0.0"), "1.0.0.post3");
        assert_eq!(next_post_release(&published, "1.0.1"), "1.0.1.post1");
    }

    #[test]
    fn test_published_versions_from_json() {
        let registry =
            PublishedVersions::from_json(r#"{"mypy-boto3-s3": ["1.34.0", "1.34.0.post1"]}"#)
                .unwrap();

        assert!(registry.has_version("mypy-boto3-s3", "1.34.0").unwrap());
        assert!(!registry.has_version("mypy-boto3-s3", "1.34.1").unwrap());
        assert!(!registry.has_version("mypy-boto3-ec2", "1.34.0").unwrap());
        assert_eq!(
            registry.get_next_version("mypy-boto3-s3", "1.34.0").unwrap(),
            "1.34.0.post2"
        );
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let result = PublishedVersions::load("/nonexistent/versions.json");
        assert!(matches!(
            result,
            Err(BuilderError::VersionRegistryUnavailable(_))
        ));
    }

    #[test]
    fn test_policy_bumps_published_version() {
        let mut registry = MockVersionRegistry::new();
        registry
            .expect_has_version()
            .withf(|name, version| name == "mypy-boto3-s3" && version == "1.34.0")
            .returning(|_, _| Ok(true));
        registry
            .expect_get_next_version()
            .returning(|_, v| Ok(format!("{}.post1", v)));

        let version = VersionPolicy::default()
            .package_version(&registry, "mypy-boto3-s3", "1.34.0")
            .unwrap();
        assert_eq!(version.as_deref(), Some("1.34.0.post1"));
    }

    #[test]
    fn test_policy_skip_and_reuse() {
        let mut registry = MockVersionRegistry::new();
        registry.expect_has_version().returning(|_, _| Ok(true));
        registry.expect_get_next_version().never();

        let skip = VersionPolicy {
            skip_published: true,
            ..Default::default()
        };
        assert_eq!(
            skip.package_version(&registry, "mypy-boto3-s3", "1.34.0")
                .unwrap(),
            None
        );

        let reuse = VersionPolicy {
            disable_smart_version: true,
            ..Default::default()
        };
        assert_eq!(
            reuse
                .package_version(&registry, "mypy-boto3-s3", "1.34.0")
                .unwrap()
                .as_deref(),
            Some("1.34.0")
        );
    }

    #[test]
    fn test_policy_unavailable_registry() {
        let mut registry = MockVersionRegistry::new();
        registry.expect_has_version().returning(|_, _| {
            Err(BuilderError::VersionRegistryUnavailable(
                "connection refused".to_string(),
            ))
        });

        let optimistic = VersionPolicy::default();
        assert_eq!(
            optimistic
                .package_version(&registry, "mypy-boto3-s3", "1.34.0")
                .unwrap()
                .as_deref(),
            Some("1.34.0")
        );

        let abort = VersionPolicy {
            on_unavailable: RegistryFailurePolicy::Abort,
            ..Default::default()
        };
        assert!(matches!(
            abort.package_version(&registry, "mypy-boto3-s3", "1.34.0"),
            Err(BuilderError::VersionRegistryUnavailable(_))
        ));
    }
}
