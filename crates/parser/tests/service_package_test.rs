//! Integration tests for the full service package pipeline

use sdk_stubs_builder_common::{
    BuilderConfig, LiteralDecision, ProductLibrary, ServiceNameCatalog,
};
use sdk_stubs_builder_parser::{
    assemble_master_package, parse_service_package, register_services, InMemoryMetadataStore,
};

const S3_JSON: &str = r#"{
    "version": "2.0",
    "metadata": {
        "apiVersion": "2006-03-01",
        "serviceAbbreviation": "Amazon S3",
        "serviceFullName": "Amazon Simple Storage Service"
    },
    "operations": {
        "PutObject": {
            "name": "PutObject",
            "input": {"shape": "PutObjectRequest"},
            "output": {"shape": "PutObjectOutput"}
        },
        "ListObjectsV2": {
            "name": "ListObjectsV2",
            "input": {"shape": "ListObjectsV2Request"},
            "output": {"shape": "ListObjectsV2Output"},
            "errors": [{"shape": "NoSuchBucket"}]
        },
        "HeadBucket": {
            "name": "HeadBucket",
            "input": {"shape": "HeadBucketRequest"},
            "errors": [{"shape": "NoSuchBucket"}]
        }
    },
    "shapes": {
        "PutObjectRequest": {
            "type": "structure",
            "required": ["Bucket", "Key"],
            "members": {
                "Bucket": {"shape": "BucketName"},
                "Key": {"shape": "ObjectKey"},
                "ServerSideEncryption": {"shape": "ServerSideEncryption"},
                "SSEKMSKeyId": {"shape": "SSEKMSKeyId"}
            }
        },
        "PutObjectOutput": {
            "type": "structure",
            "members": {
                "ETag": {"shape": "ETag"},
                "ServerSideEncryption": {"shape": "ServerSideEncryption"}
            }
        },
        "ListObjectsV2Request": {
            "type": "structure",
            "required": ["Bucket"],
            "members": {
                "Bucket": {"shape": "BucketName"},
                "ContinuationToken": {"shape": "Token"},
                "MaxKeys": {"shape": "MaxKeys"}
            }
        },
        "ListObjectsV2Output": {
            "type": "structure",
            "members": {
                "Contents": {"shape": "ObjectList"},
                "NextContinuationToken": {"shape": "Token"}
            }
        },
        "HeadBucketRequest": {
            "type": "structure",
            "required": ["Bucket"],
            "members": {"Bucket": {"shape": "BucketName"}}
        },
        "ObjectList": {"type": "list", "member": {"shape": "Object"}},
        "Object": {
            "type": "structure",
            "members": {
                "Key": {"shape": "ObjectKey"},
                "Size": {"shape": "Size"}
            }
        },
        "NoSuchBucket": {
            "type": "structure",
            "members": {},
            "exception": true
        },
        "ServerSideEncryption": {
            "type": "string",
            "enum": ["AES256", "aws:kms"]
        },
        "BucketName": {"type": "string"},
        "ObjectKey": {"type": "string"},
        "SSEKMSKeyId": {"type": "string"},
        "ETag": {"type": "string"},
        "Token": {"type": "string"},
        "MaxKeys": {"type": "integer"},
        "Size": {"type": "long"}
    }
}"#;

const S3_PAGINATORS_JSON: &str = r#"{
    "pagination": {
        "ListObjectsV2": {
            "input_token": "ContinuationToken",
            "output_token": "NextContinuationToken",
            "limit_key": "MaxKeys",
            "result_key": "Contents"
        }
    }
}"#;

const S3_WAITERS_JSON: &str = r#"{
    "version": 2,
    "waiters": {
        "BucketExists": {
            "operation": "HeadBucket",
            "delay": 5,
            "maxAttempts": 20,
            "acceptors": [{"expected": 200, "matcher": "status", "state": "success"}]
        }
    }
}"#;

fn s3_store() -> InMemoryMetadataStore {
    let store = InMemoryMetadataStore::new();
    store.add_service_json("s3", S3_JSON).unwrap();
    store.set_paginators_json("s3", S3_PAGINATORS_JSON).unwrap();
    store.set_waiters_json("s3", S3_WAITERS_JSON).unwrap();
    store
        .set_regions("s3", vec!["us-east-1".to_string(), "eu-west-1".to_string()])
        .unwrap();
    store
}

#[test]
fn test_put_object_overloads() {
    let store = s3_store();
    let catalog = ServiceNameCatalog::new("1.34.0");
    register_services(&store, &catalog).unwrap();
    let s3 = catalog.get("s3").unwrap();

    let package = parse_service_package(
        &store,
        &s3,
        &BuilderConfig::with_builtin_rules(),
        ProductLibrary::Boto3,
        "1.34.0",
        &catalog.all(),
    )
    .unwrap();

    let put_object = package.operation("PutObject").unwrap();
    assert_eq!(put_object.overloads.len(), 3);

    let values: Vec<Option<&str>> = put_object
        .overloads
        .iter()
        .map(|s| s.discriminator.as_ref().map(|d| d.value.as_str()))
        .collect();
    assert_eq!(values, vec![Some("AES256"), Some("aws:kms"), None]);

    let base = &put_object.overloads[2];
    assert!(base
        .arguments
        .iter()
        .all(|a| a.name != "ServerSideEncryption"));

    let kms = &put_object.overloads[1];
    let sse = kms
        .arguments
        .iter()
        .find(|a| a.name == "ServerSideEncryption")
        .unwrap();
    assert!(sse.required);
    assert_eq!(sse.narrowed_to.as_deref(), Some("aws:kms"));

    // Operations without a rule keep one signature
    assert_eq!(package.operation("HeadBucket").unwrap().overloads.len(), 1);
}

#[test]
fn test_service_package_contents() {
    let store = s3_store();
    let catalog = ServiceNameCatalog::new("1.34.0");
    register_services(&store, &catalog).unwrap();
    let s3 = catalog.get("s3").unwrap();

    let package = parse_service_package(
        &store,
        &s3,
        &BuilderConfig::default(),
        ProductLibrary::Boto3,
        "1.34.0",
        &catalog.all(),
    )
    .unwrap();

    assert_eq!(package.metadata().pypi_name, "mypy-boto3-s3");
    assert_eq!(package.metadata().module_name, "mypy_boto3_s3");
    assert_eq!(package.client().name, "S3Client");

    // NoSuchBucket is raised by two operations but declared once
    assert_eq!(package.client().exceptions.len(), 1);

    assert_eq!(package.paginators().len(), 1);
    assert_eq!(package.paginators()[0].name, "ListObjectsV2Paginator");
    assert_eq!(package.paginators()[0].info.limit_key.as_deref(), Some("MaxKeys"));
    assert_eq!(package.waiters()[0].name, "BucketExists");

    let typed_dicts: Vec<&str> = package
        .typed_dicts()
        .iter()
        .map(|id| package.shapes().get(*id).name())
        .collect();
    assert!(typed_dicts.contains(&"PutObjectRequest"));
    assert!(typed_dicts.contains(&"Object"));
    assert!(!typed_dicts.contains(&"NoSuchBucket"));

    assert!(package.literal("ServerSideEncryptionType").unwrap().is_literal());
    assert_eq!(
        package.literal("PaginatorName").unwrap().values,
        vec!["list_objects_v2"]
    );
    assert_eq!(
        package.literal("WaiterName").unwrap().values,
        vec!["bucket_exists"]
    );
    assert_eq!(
        package.literal("RegionName").unwrap().values,
        vec!["us-east-1", "eu-west-1"]
    );
    assert_eq!(package.literal("ServiceName").unwrap().values, vec!["s3"]);
    assert!(package.validate_closed().is_ok());
}

#[test]
fn test_literal_cap_applies_to_service_literals() {
    let store = s3_store();
    let catalog = ServiceNameCatalog::new("1.34.0");
    register_services(&store, &catalog).unwrap();
    let s3 = catalog.get("s3").unwrap();

    let mut config = BuilderConfig::default();
    config.literals.max_cardinality = 1;

    let package = parse_service_package(
        &store,
        &s3,
        &config,
        ProductLibrary::Boto3,
        "1.34.0",
        &catalog.all(),
    )
    .unwrap();

    let regions = package.literal("RegionName").unwrap();
    assert_eq!(regions.decision, LiteralDecision::StringFallback);
    assert_eq!(regions.values.len(), 2);
}

#[test]
fn test_master_package_references_services_by_name() {
    let store = s3_store();
    let catalog = ServiceNameCatalog::new("1.34.0");
    register_services(&store, &catalog).unwrap();
    let s3 = catalog.get("s3").unwrap();

    let package = parse_service_package(
        &store,
        &s3,
        &BuilderConfig::default(),
        ProductLibrary::Boto3,
        "1.34.0",
        &catalog.all(),
    )
    .unwrap();

    let master = assemble_master_package(&[package], ProductLibrary::Boto3, "1.34.0");

    assert_eq!(master.metadata.pypi_name, "mypy-boto3");
    assert_eq!(master.services.len(), 1);
    assert_eq!(master.services[0].pypi_name, "mypy-boto3-s3");
    assert_eq!(master.services[0].version, "1.34.0");
    assert!(master
        .exports
        .iter()
        .any(|e| e.name == "S3Client" && e.module_name == "mypy_boto3_s3"));
    assert_eq!(master.shared.exceptions, vec!["BotocoreClientError"]);
}

#[test]
fn test_package_assembly_is_deterministic() {
    let store = s3_store();
    let catalog = ServiceNameCatalog::new("1.34.0");
    register_services(&store, &catalog).unwrap();
    let s3 = catalog.get("s3").unwrap();

    let assemble = || {
        parse_service_package(
            &store,
            &s3,
            &BuilderConfig::with_builtin_rules(),
            ProductLibrary::Boto3,
            "1.34.0",
            &catalog.all(),
        )
        .unwrap()
    };

    let first = assemble();
    let second = assemble();
    assert_eq!(first.surface(), second.surface());
    assert_eq!(first.client(), second.client());
}
