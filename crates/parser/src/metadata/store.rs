//! Metadata store implementations
//!
//! The builder never reads files directly. It queries a [`MetadataStore`],
//! which can be backed by JSON strings (tests, embedding) or by a botocore
//! data directory laid out as `<root>/<service>/<api-version>/service-2.json`.

use super::types::{
    OperationDescriptor, PaginatorsDocument, ServiceMetadata, ServiceModel, ShapeDescriptor,
    WaitersDocument,
};
use dashmap::DashMap;
use sdk_stubs_builder_common::{BuilderError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SERVICE_FILE: &str = "service-2.json";
const PAGINATORS_FILE: &str = "paginators-1.json";
const WAITERS_FILE: &str = "waiters-2.json";
const ENDPOINTS_FILE: &str = "endpoints.json";

/// Everything known about one service
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub model: ServiceModel,
    pub paginators: PaginatorsDocument,
    pub waiters: WaitersDocument,
}

impl ServiceEntry {
    pub fn new(model: ServiceModel) -> Self {
        Self {
            model,
            paginators: PaginatorsDocument::default(),
            waiters: WaitersDocument::default(),
        }
    }
}

/// Read access to service metadata
///
/// Implementations must be shareable between the worker threads that build
/// services in parallel.
pub trait MetadataStore: Send + Sync {
    /// Service names in the store, sorted
    fn available_services(&self) -> Result<Vec<String>>;

    /// Full entry for one service
    fn service(&self, service: &str) -> Result<Arc<ServiceEntry>>;

    fn service_metadata(&self, service: &str) -> Result<ServiceMetadata> {
        Ok(self.service(service)?.model.metadata.clone())
    }

    /// Operation names in declaration order
    fn list_operations(&self, service: &str) -> Result<Vec<String>> {
        Ok(self.service(service)?.model.operations.keys().cloned().collect())
    }

    fn get_operation(&self, service: &str, name: &str) -> Result<OperationDescriptor> {
        self.service(service)?
            .model
            .operations
            .get(name)
            .cloned()
            .ok_or_else(|| {
                BuilderError::Metadata(format!("Operation {} not found in {}", name, service))
            })
    }

    fn get_shape(&self, service: &str, name: &str) -> Result<ShapeDescriptor> {
        self.service(service)?
            .model
            .shapes
            .get(name)
            .cloned()
            .ok_or_else(|| {
                BuilderError::Metadata(format!("Shape {} not found in {}", name, service))
            })
    }

    fn paginators(&self, service: &str) -> Result<PaginatorsDocument> {
        Ok(self.service(service)?.paginators.clone())
    }

    fn waiters(&self, service: &str) -> Result<WaitersDocument> {
        Ok(self.service(service)?.waiters.clone())
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| BuilderError::Parse(format!("Failed to parse {}: {}", what, e)))
}

/// Store backed by in-memory documents
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    services: DashMap<String, Arc<ServiceEntry>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a service model
    pub fn add_service(&self, service: &str, model: ServiceModel) {
        self.services
            .insert(service.to_string(), Arc::new(ServiceEntry::new(model)));
    }

    /// Add a service from `service-2.json` content
    pub fn add_service_json(&self, service: &str, json: &str) -> Result<()> {
        let model: ServiceModel = parse_json(json, &format!("{} service JSON", service))?;
        self.add_service(service, model);
        Ok(())
    }

    /// Attach `paginators-1.json` content to a service added earlier
    pub fn set_paginators_json(&self, service: &str, json: &str) -> Result<()> {
        let paginators: PaginatorsDocument =
            parse_json(json, &format!("{} paginators JSON", service))?;
        self.update(service, |entry| entry.paginators = paginators)
    }

    /// Attach `waiters-2.json` content to a service added earlier
    pub fn set_waiters_json(&self, service: &str, json: &str) -> Result<()> {
        let waiters: WaitersDocument = parse_json(json, &format!("{} waiters JSON", service))?;
        self.update(service, |entry| entry.waiters = waiters)
    }

    /// Set the regions a service is available in
    pub fn set_regions(&self, service: &str, regions: Vec<String>) -> Result<()> {
        self.update(service, |entry| entry.model.metadata.regions = regions)
    }

    fn update(&self, service: &str, f: impl FnOnce(&mut ServiceEntry)) -> Result<()> {
        let mut slot = self.services.get_mut(service).ok_or_else(|| {
            BuilderError::Metadata(format!("Service {} has not been added", service))
        })?;
        f(Arc::make_mut(slot.value_mut()));
        Ok(())
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn available_services(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn service(&self, service: &str) -> Result<Arc<ServiceEntry>> {
        self.services
            .get(service)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BuilderError::Metadata(format!("Service {} not found", service)))
    }
}

/// Store reading a botocore data directory
///
/// Files are loaded on first access and cached. When a service has several
/// API versions, the lexically greatest (latest date) wins.
#[derive(Debug)]
pub struct DirectoryMetadataStore {
    root: PathBuf,
    cache: DashMap<String, Arc<ServiceEntry>>,
}

impl DirectoryMetadataStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(BuilderError::Metadata(format!(
                "Metadata directory {} does not exist",
                root.display()
            )));
        }

        Ok(Self {
            root,
            cache: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn latest_version_dir(&self, service: &str) -> Result<PathBuf> {
        let service_dir = self.root.join(service);
        let entries = fs::read_dir(&service_dir).map_err(|e| {
            BuilderError::Metadata(format!(
                "Failed to read service directory {}: {}",
                service_dir.display(),
                e
            ))
        })?;

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(SERVICE_FILE).is_file())
            .max()
            .ok_or_else(|| {
                BuilderError::Metadata(format!(
                    "No {} found under {}",
                    SERVICE_FILE,
                    service_dir.display()
                ))
            })
    }

    fn load(&self, service: &str) -> Result<ServiceEntry> {
        let dir = self.latest_version_dir(service)?;
        tracing::debug!(service, path = %dir.display(), "Loading service metadata");

        let mut model: ServiceModel = read_json(&dir.join(SERVICE_FILE))?;
        model.metadata.regions = self.regions(service)?;

        let paginators_path = dir.join(PAGINATORS_FILE);
        let paginators = if paginators_path.is_file() {
            read_json(&paginators_path)?
        } else {
            PaginatorsDocument::default()
        };

        let waiters_path = dir.join(WAITERS_FILE);
        let waiters = if waiters_path.is_file() {
            read_json(&waiters_path)?
        } else {
            WaitersDocument::default()
        };

        Ok(ServiceEntry {
            model,
            paginators,
            waiters,
        })
    }

    /// Regions listed for a service in `endpoints.json`, in first-seen order
    fn regions(&self, service: &str) -> Result<Vec<String>> {
        let path = self.root.join(ENDPOINTS_FILE);
        if !path.is_file() {
            return Ok(Vec::new());
        }

        let endpoints: serde_json::Value = read_json(&path)?;
        let mut regions: Vec<String> = Vec::new();
        let partitions = endpoints
            .get("partitions")
            .and_then(|p| p.as_array())
            .into_iter()
            .flatten();

        for partition in partitions {
            let service_endpoints = partition
                .get("services")
                .and_then(|s| s.get(service))
                .and_then(|s| s.get("endpoints"))
                .and_then(|e| e.as_object());

            for region in service_endpoints.into_iter().flat_map(|e| e.keys()) {
                if !regions.contains(region) {
                    regions.push(region.clone());
                }
            }
        }

        Ok(regions)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        BuilderError::Parse(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_json(&content, &path.display().to_string())
}

impl MetadataStore for DirectoryMetadataStore {
    fn available_services(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            BuilderError::Metadata(format!(
                "Failed to read metadata directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| self.latest_version_dir(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }

    fn service(&self, service: &str) -> Result<Arc<ServiceEntry>> {
        if let Some(entry) = self.cache.get(service) {
            return Ok(Arc::clone(entry.value()));
        }

        let loaded = Arc::new(self.load(service)?);
        let entry = self
            .cache
            .entry(service.to_string())
            .or_insert(loaded)
            .clone();
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_JSON: &str = r#"{
        "version": "2.0",
        "metadata": {
            "apiVersion": "2016-11-15",
            "serviceAbbreviation": "Amazon EC2",
            "serviceFullName": "Amazon Elastic Compute Cloud",
            "protocol": "ec2"
        },
        "operations": {
            "DescribeInstances": {
                "name": "DescribeInstances",
                "input": {"shape": "DescribeInstancesRequest"}
            }
        },
        "shapes": {
            "DescribeInstancesRequest": {"type": "structure", "members": {}}
        }
    }"#;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryMetadataStore::new();
        store.add_service_json("ec2", SERVICE_JSON).unwrap();

        assert_eq!(store.available_services().unwrap(), vec!["ec2"]);
        assert_eq!(
            store.list_operations("ec2").unwrap(),
            vec!["DescribeInstances"]
        );
        let shape = store.get_shape("ec2", "DescribeInstancesRequest").unwrap();
        assert_eq!(shape.type_name, "structure");
        assert!(matches!(
            store.get_shape("ec2", "Missing"),
            Err(BuilderError::Metadata(_))
        ));
    }

    #[test]
    fn test_in_memory_store_rejects_bad_json() {
        let store = InMemoryMetadataStore::new();
        let result = store.add_service_json("ec2", "{not json");
        assert!(matches!(result, Err(BuilderError::Parse(_))));
    }

    #[test]
    fn test_setters_require_service() {
        let store = InMemoryMetadataStore::new();
        let result = store.set_regions("ec2", vec!["us-east-1".to_string()]);
        assert!(matches!(result, Err(BuilderError::Metadata(_))));
    }

    #[test]
    fn test_directory_store_picks_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("ec2").join("2014-10-01");
        let new = dir.path().join("ec2").join("2016-11-15");
        fs::create_dir_all(&old).unwrap();
        fs::create_dir_all(&new).unwrap();
        fs::write(
            old.join(SERVICE_FILE),
            SERVICE_JSON.replace("DescribeInstances\"", "OldOperation\""),
        )
        .unwrap();
        fs::write(new.join(SERVICE_FILE), SERVICE_JSON).unwrap();
        fs::write(
            new.join(WAITERS_FILE),
            r#"{"version": 2, "waiters": {"InstanceRunning": {
                "operation": "DescribeInstances", "delay": 15, "maxAttempts": 40
            }}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(ENDPOINTS_FILE),
            r#"{"partitions": [{"services": {"ec2": {"endpoints": {
                "us-east-1": {}, "eu-west-1": {}
            }}}}]}"#,
        )
        .unwrap();

        let store = DirectoryMetadataStore::new(dir.path()).unwrap();
        assert_eq!(store.available_services().unwrap(), vec!["ec2"]);

        assert_eq!(
            store.list_operations("ec2").unwrap(),
            vec!["DescribeInstances"]
        );
        let metadata = store.service_metadata("ec2").unwrap();
        assert_eq!(metadata.regions, vec!["us-east-1", "eu-west-1"]);

        let waiters = store.waiters("ec2").unwrap();
        assert_eq!(waiters.waiters["InstanceRunning"].max_attempts, 40);
        assert!(store.paginators("ec2").unwrap().pagination.is_empty());
    }

    #[test]
    fn test_directory_store_missing_root() {
        let result = DirectoryMetadataStore::new("/nonexistent/botocore/data");
        assert!(matches!(result, Err(BuilderError::Metadata(_))));
    }
}
