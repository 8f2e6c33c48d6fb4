//! Service names and the service name registry
//!
//! [`ServiceNameCatalog`] is an explicit, append-only registry passed to the
//! components that need name resolution. Adding a name that is already
//! registered returns the existing handle, so handles from one catalog can be
//! compared by identity with [`ServiceName::is_same`].

use dashmap::DashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Python keywords that cannot be used as module names
const RESERVED_NAMES: &[&str] = &["lambda", "import", "class", "def", "global", "pass"];

/// Library a product is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductLibrary {
    Boto3,
    AioBotocore,
}

impl ProductLibrary {
    /// Runtime library name
    pub fn library_name(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "boto3",
            ProductLibrary::AioBotocore => "aiobotocore",
        }
    }

    /// Prefix of per-service distribution names
    pub fn pypi_prefix(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "mypy-boto3",
            ProductLibrary::AioBotocore => "types-aiobotocore",
        }
    }

    /// Prefix of per-service module names
    pub fn module_prefix(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "mypy_boto3",
            ProductLibrary::AioBotocore => "types_aiobotocore",
        }
    }

    /// Aggregate stubs distribution name
    pub fn stubs_pypi_name(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "boto3-stubs",
            ProductLibrary::AioBotocore => "types-aiobotocore",
        }
    }

    /// Aggregate stubs module name
    pub fn stubs_module_name(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "boto3-stubs",
            ProductLibrary::AioBotocore => "aiobotocore-stubs",
        }
    }

    /// Lightweight stubs distribution name
    pub fn lite_pypi_name(self) -> &'static str {
        match self {
            ProductLibrary::Boto3 => "boto3-stubs-lite",
            ProductLibrary::AioBotocore => "types-aiobotocore-lite",
        }
    }
}

impl fmt::Display for ProductLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.library_name())
    }
}

#[derive(Debug)]
struct ServiceNameData {
    name: String,
    class_name: String,
    sdk_version: String,
}

/// Cloud service identifier
///
/// Cheap to clone. Equality and ordering use the short name.
#[derive(Debug, Clone)]
pub struct ServiceName(Arc<ServiceNameData>);

impl ServiceName {
    /// Selector for every available service
    pub const ALL: &'static str = "all";
    /// Selector for services changed in the current SDK release
    pub const UPDATED: &'static str = "updated";
    /// Version tag for names created outside a catalog
    pub const LATEST: &'static str = "latest";

    /// Create a standalone name not owned by any catalog
    pub fn new(name: &str, class_name: &str) -> Self {
        Self::with_version(name, class_name, Self::LATEST)
    }

    fn with_version(name: &str, class_name: &str, sdk_version: &str) -> Self {
        Self(Arc::new(ServiceNameData {
            name: name.to_string(),
            class_name: class_name.to_string(),
            sdk_version: sdk_version.to_string(),
        }))
    }

    /// Short name, e.g. `ec2`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Class name, e.g. `EC2`
    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    /// SDK version the name was discovered in
    pub fn sdk_version(&self) -> &str {
        &self.0.sdk_version
    }

    /// Python-safe name, e.g. `lambda_` for `lambda`
    pub fn module_name(&self) -> String {
        let name = self.0.name.replace('-', "_");
        if RESERVED_NAMES.contains(&name.as_str()) {
            format!("{}_", name)
        } else {
            name
        }
    }

    /// Distribution name for a product library, e.g. `mypy-boto3-ec2`
    pub fn pypi_name(&self, library: ProductLibrary) -> String {
        format!("{}-{}", library.pypi_prefix(), self.0.name)
    }

    /// Module name for a product library, e.g. `mypy_boto3_ec2`
    pub fn package_module_name(&self, library: ProductLibrary) -> String {
        format!("{}_{}", library.module_prefix(), self.0.name.replace('-', "_"))
    }

    /// Client class name, e.g. `EC2Client`
    pub fn client_name(&self) -> String {
        format!("{}Client", self.0.class_name)
    }

    /// Identity comparison
    pub fn is_same(&self, other: &ServiceName) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ServiceName {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for ServiceName {}

impl Hash for ServiceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl PartialOrd for ServiceName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.name.cmp(&other.0.name)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Thread-safe, append-only registry of service names
#[derive(Debug)]
pub struct ServiceNameCatalog {
    sdk_version: String,
    inner: DashMap<String, ServiceName>,
}

impl ServiceNameCatalog {
    /// Create an empty catalog for one SDK version
    pub fn new(sdk_version: &str) -> Self {
        Self {
            sdk_version: sdk_version.to_string(),
            inner: DashMap::new(),
        }
    }

    /// Register a service name if absent and return the catalog's handle
    pub fn add(&self, name: &str, class_name: &str) -> ServiceName {
        self.inner
            .entry(name.to_string())
            .or_insert_with(|| ServiceName::with_version(name, class_name, &self.sdk_version))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<ServiceName> {
        self.inner.get(name).map(|entry| entry.clone())
    }

    /// All registered names sorted by short name
    pub fn all(&self) -> Vec<ServiceName> {
        let mut names: Vec<ServiceName> = self.inner.iter().map(|e| e.value().clone()).collect();
        names.sort();
        names
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
