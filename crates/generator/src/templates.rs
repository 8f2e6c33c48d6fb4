//! Template loading and management

use sdk_stubs_builder_common::{to_snake_case, BuilderError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

const TEMPLATES: &[(&str, &str)] = &[
    (
        "pyproject.toml",
        include_str!("../templates/pyproject.toml.tera"),
    ),
    (
        "service/__init__.pyi",
        include_str!("../templates/service/__init__.pyi.tera"),
    ),
    (
        "service/client.pyi",
        include_str!("../templates/service/client.pyi.tera"),
    ),
    (
        "service/literals.pyi",
        include_str!("../templates/service/literals.pyi.tera"),
    ),
    (
        "service/paginator.pyi",
        include_str!("../templates/service/paginator.pyi.tera"),
    ),
    (
        "service/type_defs.pyi",
        include_str!("../templates/service/type_defs.pyi.tera"),
    ),
    (
        "service/waiter.pyi",
        include_str!("../templates/service/waiter.pyi.tera"),
    ),
    (
        "stubs/__init__.pyi",
        include_str!("../templates/stubs/__init__.pyi.tera"),
    ),
    (
        "stubs/literals.pyi",
        include_str!("../templates/stubs/literals.pyi.tera"),
    ),
    (
        "stubs/session.pyi",
        include_str!("../templates/stubs/session.pyi.tera"),
    ),
    (
        "master/__init__.pyi",
        include_str!("../templates/master/__init__.pyi.tera"),
    ),
    (
        "master/service.pyi",
        include_str!("../templates/master/service.pyi.tera"),
    ),
    (
        "botocore/__init__.pyi",
        include_str!("../templates/botocore/__init__.pyi.tera"),
    ),
    (
        "botocore/module.pyi",
        include_str!("../templates/botocore/module.pyi.tera"),
    ),
];

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("quote", quote_filter);
    tera.register_filter("snake_case", snake_case_filter);

    for (name, content) in TEMPLATES {
        tera.add_raw_template(name, content).map_err(|e| {
            BuilderError::Generation(format!("Failed to load {} template: {}", name, e))
        })?;
    }

    Ok(tera)
}

/// Filter to render a Python string literal
fn quote_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("quote filter expects a string"))?;

    Ok(Value::String(crate::types::quote(s)))
}

/// Filter to convert PascalCase names to snake_case
fn snake_case_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("snake_case filter expects a string"))?;

    Ok(Value::String(to_snake_case(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_templates() {
        let tera = load_templates().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        assert!(names.contains(&"service/client.pyi"));
        assert!(names.contains(&"stubs/session.pyi"));
    }

    #[test]
    fn test_filters() {
        let args = HashMap::new();
        let quoted = quote_filter(&Value::String("aws:kms".to_string()), &args).unwrap();
        assert_eq!(quoted, Value::String("\"aws:kms\"".to_string()));

        let snake = snake_case_filter(&Value::String("BucketExists".to_string()), &args).unwrap();
        assert_eq!(snake, Value::String("bucket_exists".to_string()));

        assert!(quote_filter(&Value::Bool(true), &args).is_err());
    }
}
