//! Service selection and changelog parsing

use sdk_stubs_builder_common::ServiceName;
use std::collections::HashSet;
use tracing::info;

/// Resolve `--services` selectors against the available services
///
/// `all` selects every available service. `updated` is replaced by the
/// services changed in the current release. Unknown names are logged and
/// skipped.
pub fn get_selected_service_names(
    selected: &[String],
    available: &[ServiceName],
    updated: &[String],
) -> Vec<ServiceName> {
    if selected.iter().any(|s| s == ServiceName::ALL) {
        return available.to_vec();
    }

    let mut names: Vec<&str> = selected
        .iter()
        .map(String::as_str)
        .filter(|s| *s != ServiceName::UPDATED)
        .collect();
    if selected.iter().any(|s| s == ServiceName::UPDATED) {
        names.extend(updated.iter().map(String::as_str));
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for name in names {
        if !seen.insert(name) {
            continue;
        }
        match available.iter().find(|s| s.name() == name) {
            Some(service_name) => result.push(service_name.clone()),
            None => info!("Service {} is not provided by the SDK, skipping", name),
        }
    }
    result
}

/// Services with an `api-change` entry in one release of a boto3 changelog
///
/// ```text
/// 1.34.1
/// ======
///
/// * api-change:``s3``: [``botocore``] Update s3 client to latest version
/// ```
pub fn updated_services(changelog: &str, version: &str) -> Vec<String> {
    let lines: Vec<&str> = changelog.lines().collect();
    let mut services = Vec::new();
    let mut in_section = false;

    for (index, line) in lines.iter().enumerate() {
        let is_header = lines
            .get(index + 1)
            .is_some_and(|next| !next.is_empty() && next.chars().all(|c| c == '='));
        if is_header {
            if in_section {
                break;
            }
            in_section = line.trim() == version;
            continue;
        }
        if !in_section {
            continue;
        }

        if let Some(rest) = line.trim_start_matches("* ").strip_prefix("api-change:``") {
            if let Some((service, _)) = rest.split_once("``") {
                if !services.iter().any(|s| s == service) {
                    services.push(service.to_string());
                }
            }
        }
    }

    services
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = "\
CHANGELOG
=========

1.34.1
======

* api-change:``s3``: [``botocore``] Update s3 client to latest version
* api-change:``ec2``: [``botocore``] Update ec2 client to latest version
* api-change:``s3``: [``botocore``] Another s3 change
* enhancement:Session: [``botocore``] Not a service change

1.34.0
======

* api-change:``sqs``: [``botocore``] Update sqs client to latest version
";

    fn available() -> Vec<ServiceName> {
        vec![
            ServiceName::new("ec2", "EC2"),
            ServiceName::new("s3", "S3"),
            ServiceName::new("sqs", "SQS"),
        ]
    }

    fn names(services: &[ServiceName]) -> Vec<&str> {
        services.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_updated_services() {
        assert_eq!(updated_services(CHANGELOG, "1.34.1"), vec!["s3", "ec2"]);
        assert_eq!(updated_services(CHANGELOG, "1.34.0"), vec!["sqs"]);
        assert!(updated_services(CHANGELOG, "1.33.0").is_empty());
    }

    #[test]
    fn test_select_all() {
        let selected = get_selected_service_names(&["all".to_string()], &available(), &[]);
        assert_eq!(names(&selected), vec!["ec2", "s3", "sqs"]);
    }

    #[test]
    fn test_select_updated_and_explicit() {
        let updated = vec!["s3".to_string(), "unknown".to_string()];
        let selected = get_selected_service_names(
            &["sqs".to_string(), "updated".to_string(), "s3".to_string()],
            &available(),
            &updated,
        );
        assert_eq!(names(&selected), vec!["sqs", "s3"]);
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let selected = get_selected_service_names(
            &["nope".to_string(), "ec2".to_string()],
            &available(),
            &[],
        );
        assert_eq!(names(&selected), vec!["ec2"]);
    }
}
