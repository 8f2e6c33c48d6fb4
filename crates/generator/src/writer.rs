//! Package writer
//!
//! Renders assembled packages into `.pyi` stubs. With `generate_setup` the
//! package is written as an installable distribution
//! (`<output>/<pypi_name>/pyproject.toml` plus the module directory);
//! without it only the module directory is written to `<output>/`.

use crate::templates;
use crate::types::TypeRenderer;
use sdk_stubs_builder_common::{
    to_snake_case, Argument, BotocoreStubsPackage, BuilderError, LiteralUnion, MasterPackage,
    OverloadSignature, PackageMetadata, Result, ServicePackage, SharedDeclarations, StubsPackage,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::debug;

/// Templates skipped for the lite stubs variant
const LITE_EXCLUDED_TEMPLATES: &[&str] = &["stubs/__init__.pyi", "stubs/session.pyi"];

#[derive(Debug, Serialize)]
struct PackageContext {
    pypi_name: String,
    module_name: String,
    version: String,
    library_name: String,
    library_version: String,
    description: String,
    dependencies: Vec<String>,
    extras: Vec<ExtraContext>,
}

#[derive(Debug, Serialize)]
struct ExtraContext {
    name: String,
    requirement: String,
}

#[derive(Debug, Serialize)]
struct ArgumentContext {
    name: String,
    annotation: String,
    required: bool,
}

#[derive(Debug, Serialize)]
struct SignatureContext {
    arguments: Vec<ArgumentContext>,
    return_type: String,
}

#[derive(Debug, Serialize)]
struct MethodContext {
    name: String,
    documentation: Option<String>,
    signatures: Vec<SignatureContext>,
}

#[derive(Debug, Serialize)]
struct FieldContext {
    name: String,
    annotation: String,
    required: bool,
}

#[derive(Debug, Serialize)]
struct TypedDictContext {
    name: String,
    documentation: Option<String>,
    fields: Vec<FieldContext>,
}

#[derive(Debug, Serialize)]
struct PaginatorContext {
    name: String,
    method_name: String,
    operation_name: String,
    signature: SignatureContext,
}

#[derive(Debug, Serialize)]
struct WaiterContext {
    name: String,
    class_name: String,
    operation_name: String,
    delay: u32,
    max_attempts: u32,
    signature: SignatureContext,
}

#[derive(Debug, Serialize)]
struct SessionOverloadContext {
    argument: String,
    value: String,
    module_name: String,
    return_type: String,
}

#[derive(Debug, Serialize)]
struct MasterServiceContext {
    name: String,
    pypi_name: String,
    module_name: String,
    version: String,
    exports: Vec<String>,
}

/// Writes packages to an output directory
pub struct PackageWriter {
    output_path: PathBuf,
    generate_setup: bool,
    tera: Tera,
}

impl PackageWriter {
    pub fn new<P: AsRef<Path>>(output_path: P, generate_setup: bool) -> Result<Self> {
        Ok(Self {
            output_path: output_path.as_ref().to_path_buf(),
            generate_setup,
            tera: templates::load_templates()?,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write a per-service package and return the written files
    pub fn write_service_package(&self, package: &ServicePackage) -> Result<Vec<PathBuf>> {
        let renderer = TypeRenderer::new(package);
        let metadata = package.metadata();

        let mut context = Context::new();
        context.insert(
            "package",
            &package_context(metadata, "Type annotations for one service", vec![], vec![]),
        );
        context.insert("service_name", package.service_name().name());
        context.insert("client_name", &package.client().name);
        context.insert("methods", &method_contexts(package, &renderer));
        context.insert("typed_dicts", &typed_dict_contexts(package, &renderer));
        context.insert("literals", &literal_contexts(package));
        context.insert("paginators", &paginator_contexts(package, &renderer));
        context.insert("waiters", &waiter_contexts(package, &renderer));
        context.insert(
            "exceptions",
            &package
                .client()
                .exceptions
                .iter()
                .map(|id| package.shapes().get(*id).name().to_string())
                .collect::<Vec<_>>(),
        );

        let mut templates = vec![
            "service/__init__.pyi",
            "service/client.pyi",
            "service/literals.pyi",
            "service/type_defs.pyi",
        ];
        if !package.paginators().is_empty() {
            templates.push("service/paginator.pyi");
        }
        if !package.waiters().is_empty() {
            templates.push("service/waiter.pyi");
        }

        self.write_package(metadata, &context, &templates)
    }

    /// Write the aggregate stubs package, or its lite variant
    pub fn write_stubs_package(&self, package: &StubsPackage) -> Result<Vec<PathBuf>> {
        let extras = package
            .services
            .iter()
            .zip(&package.service_names)
            .map(|(reference, name)| ExtraContext {
                name: name.name().to_string(),
                requirement: format!("{}=={}", reference.pypi_name, reference.version),
            })
            .collect();
        let dependencies = vec![
            format!("botocore-stubs>={}", package.metadata.min_library_version),
            "typing-extensions>=4.1.0; python_version<'3.11'".to_string(),
        ];

        let mut context = Context::new();
        context.insert(
            "package",
            &package_context(
                &package.metadata,
                "Type annotations for the SDK session and clients",
                dependencies,
                extras,
            ),
        );
        context.insert("shared", &shared_context(&package.shared));
        context.insert(
            "service_literal",
            &LiteralContext::from_union(&package.service_literal),
        );
        context.insert(
            "session_overloads",
            &package
                .session_overloads
                .iter()
                .map(|o| SessionOverloadContext {
                    argument: o.discriminator.argument.clone(),
                    value: o.discriminator.value.clone(),
                    module_name: o.module_name.clone(),
                    return_type: o.return_type.clone(),
                })
                .collect::<Vec<_>>(),
        );

        let templates: Vec<&str> = ["stubs/__init__.pyi", "stubs/literals.pyi", "stubs/session.pyi"]
            .into_iter()
            .filter(|t| !(package.lite && LITE_EXCLUDED_TEMPLATES.contains(t)))
            .collect();

        self.write_package(&package.metadata, &context, &templates)
    }

    /// Write the master package with one re-export module per service
    pub fn write_master_package(&self, package: &MasterPackage) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}_", package.metadata.module_name);
        let services: Vec<MasterServiceContext> = package
            .services
            .iter()
            .map(|reference| MasterServiceContext {
                name: reference
                    .module_name
                    .strip_prefix(&prefix)
                    .unwrap_or(&reference.module_name)
                    .to_string(),
                pypi_name: reference.pypi_name.clone(),
                module_name: reference.module_name.clone(),
                version: reference.version.clone(),
                exports: package
                    .exports
                    .iter()
                    .filter(|e| e.module_name == reference.module_name)
                    .map(|e| e.name.clone())
                    .collect(),
            })
            .collect();

        let dependencies = package
            .services
            .iter()
            .map(|s| format!("{}=={}", s.pypi_name, s.version))
            .collect();

        let mut context = Context::new();
        context.insert(
            "package",
            &package_context(
                &package.metadata,
                "Type annotations for every service",
                dependencies,
                vec![],
            ),
        );
        context.insert("shared", &shared_context(&package.shared));
        context.insert("services", &services);

        let mut written = self.write_package(&package.metadata, &context, &["master/__init__.pyi"])?;
        let module_dir = self.module_dir(&package.metadata);
        for service in &services {
            let mut service_context = context.clone();
            service_context.insert("service", service);
            let path = module_dir.join(format!("{}.pyi", service.name));
            self.render_to("master/service.pyi", &service_context, &path)?;
            written.push(path);
        }

        Ok(written)
    }

    /// Write the transport library stubs
    pub fn write_botocore_stubs_package(
        &self,
        package: &BotocoreStubsPackage,
    ) -> Result<Vec<PathBuf>> {
        let mut context = Context::new();
        context.insert(
            "package",
            &package_context(
                &package.metadata,
                "Type annotations for botocore",
                vec!["types-awscrt".to_string()],
                vec![],
            ),
        );
        context.insert("modules", &package.modules);

        let mut written =
            self.write_package(&package.metadata, &context, &["botocore/__init__.pyi"])?;
        let module_dir = self.module_dir(&package.metadata);
        for module in &package.modules {
            let mut module_context = context.clone();
            module_context.insert("module", module);
            let path = module_dir.join(format!("{}.pyi", module));
            self.render_to("botocore/module.pyi", &module_context, &path)?;
            written.push(path);
        }

        Ok(written)
    }

    fn package_root(&self, metadata: &PackageMetadata) -> PathBuf {
        if self.generate_setup {
            self.output_path.join(&metadata.pypi_name)
        } else {
            self.output_path.clone()
        }
    }

    fn module_dir(&self, metadata: &PackageMetadata) -> PathBuf {
        self.package_root(metadata).join(&metadata.module_name)
    }

    /// Render `templates` into the module directory; `<dir>/__init__.pyi`
    /// style names map to the part after the last `/`
    fn write_package(
        &self,
        metadata: &PackageMetadata,
        context: &Context,
        templates: &[&str],
    ) -> Result<Vec<PathBuf>> {
        let module_dir = self.module_dir(metadata);
        fs::create_dir_all(&module_dir).map_err(|e| {
            BuilderError::Generation(format!(
                "Failed to create module directory {}: {}",
                module_dir.display(),
                e
            ))
        })?;

        let mut written = Vec::new();
        for template in templates {
            let file_name = template.rsplit('/').next().unwrap_or(template);
            let path = module_dir.join(file_name);
            self.render_to(template, context, &path)?;
            written.push(path);
        }

        let marker = module_dir.join("py.typed");
        fs::write(&marker, "partial\n").map_err(|e| {
            BuilderError::Generation(format!("Failed to write {}: {}", marker.display(), e))
        })?;
        written.push(marker);

        if self.generate_setup {
            let path = self.package_root(metadata).join("pyproject.toml");
            self.render_to("pyproject.toml", context, &path)?;
            written.push(path);
        }

        debug!(
            package = %metadata.pypi_name,
            files = written.len(),
            path = %module_dir.display(),
            "Wrote package"
        );
        Ok(written)
    }

    fn render_to(&self, template: &str, context: &Context, path: &Path) -> Result<()> {
        let rendered = self.tera.render(template, context).map_err(|e| {
            BuilderError::Generation(format!("Template error in {}: {:?}", template, e))
        })?;

        fs::write(path, rendered).map_err(|e| {
            BuilderError::Generation(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

fn package_context(
    metadata: &PackageMetadata,
    description: &str,
    dependencies: Vec<String>,
    extras: Vec<ExtraContext>,
) -> PackageContext {
    let mut dependencies = dependencies;
    if dependencies.is_empty() {
        dependencies.push("typing-extensions>=4.1.0; python_version<'3.11'".to_string());
    }

    PackageContext {
        pypi_name: metadata.pypi_name.clone(),
        module_name: metadata.module_name.clone(),
        version: metadata.version.clone(),
        library_name: metadata.library_name.clone(),
        library_version: metadata.library_version.clone(),
        description: format!(
            "{} ({} {})",
            description, metadata.library_name, metadata.library_version
        ),
        dependencies,
        extras,
    }
}

#[derive(Debug, Serialize)]
struct SharedContext<'a> {
    exceptions: &'a [String],
    session: &'a str,
}

fn shared_context(shared: &SharedDeclarations) -> SharedContext<'_> {
    SharedContext {
        exceptions: &shared.exceptions,
        session: &shared.session,
    }
}

#[derive(Debug, Serialize)]
struct LiteralContext {
    name: String,
    values: Vec<String>,
    is_literal: bool,
}

impl LiteralContext {
    fn from_union(union: &LiteralUnion) -> Self {
        Self {
            name: union.name.clone(),
            values: union.values.clone(),
            is_literal: union.is_literal(),
        }
    }
}

fn literal_contexts(package: &ServicePackage) -> Vec<LiteralContext> {
    package
        .literals()
        .iter()
        .map(LiteralContext::from_union)
        .collect()
}

fn argument_contexts(arguments: &[Argument], renderer: &TypeRenderer<'_>) -> Vec<ArgumentContext> {
    arguments
        .iter()
        .map(|arg| ArgumentContext {
            name: arg.name.clone(),
            annotation: match &arg.narrowed_to {
                Some(value) => renderer.narrowed_annotation(arg.shape, value),
                None => renderer.annotation(arg.shape),
            },
            required: arg.required,
        })
        .collect()
}

fn signature_context(signature: &OverloadSignature, renderer: &TypeRenderer<'_>) -> SignatureContext {
    SignatureContext {
        arguments: argument_contexts(&signature.arguments, renderer),
        return_type: renderer.return_annotation(signature.output),
    }
}

fn method_contexts(package: &ServicePackage, renderer: &TypeRenderer<'_>) -> Vec<MethodContext> {
    package
        .client()
        .methods
        .iter()
        .map(|op| {
            let signatures = if op.overloads.is_empty() {
                vec![signature_context(&op.base_signature(), renderer)]
            } else {
                op.overloads
                    .iter()
                    .map(|s| signature_context(s, renderer))
                    .collect()
            };

            MethodContext {
                name: op.method_name.clone(),
                documentation: op.documentation.as_deref().and_then(docstring),
                signatures,
            }
        })
        .collect()
}

fn typed_dict_contexts(
    package: &ServicePackage,
    renderer: &TypeRenderer<'_>,
) -> Vec<TypedDictContext> {
    renderer
        .typed_dict_order()
        .into_iter()
        .filter_map(|id| {
            let shape = package.shapes().get(id);
            let structure = shape.as_structure()?;
            Some(TypedDictContext {
                name: renderer.typed_dict_name(id),
                documentation: shape.documentation().and_then(docstring),
                fields: structure
                    .fields
                    .iter()
                    .map(|field| FieldContext {
                        name: field.name.clone(),
                        annotation: renderer.field_annotation(field),
                        required: field.required,
                    })
                    .collect(),
            })
        })
        .collect()
}

fn paginator_contexts(
    package: &ServicePackage,
    renderer: &TypeRenderer<'_>,
) -> Vec<PaginatorContext> {
    package
        .paginators()
        .iter()
        .filter_map(|paginator| {
            let operation = package.operation(&paginator.operation_name)?;
            let arguments: Vec<Argument> = operation
                .arguments
                .iter()
                .filter(|a| !paginator.info.input_token.contains(&a.name))
                .filter(|a| paginator.info.limit_key.as_deref() != Some(a.name.as_str()))
                .cloned()
                .collect();

            Some(PaginatorContext {
                name: paginator.name.clone(),
                method_name: operation.method_name.clone(),
                operation_name: operation.name.clone(),
                signature: SignatureContext {
                    arguments: argument_contexts(&arguments, renderer),
                    return_type: renderer.return_annotation(operation.output),
                },
            })
        })
        .collect()
}

fn waiter_contexts(package: &ServicePackage, renderer: &TypeRenderer<'_>) -> Vec<WaiterContext> {
    package
        .waiters()
        .iter()
        .filter_map(|waiter| {
            let operation = package.operation(&waiter.operation)?;
            Some(WaiterContext {
                name: waiter.name.clone(),
                class_name: format!("{}Waiter", waiter.name),
                operation_name: to_snake_case(&operation.name),
                delay: waiter.delay,
                max_attempts: waiter.max_attempts,
                signature: SignatureContext {
                    arguments: argument_contexts(&operation.arguments, renderer),
                    return_type: "None".to_string(),
                },
            })
        })
        .collect()
}

/// First paragraph of an HTML documentation string as plain text
fn docstring(html: &str) -> Option<String> {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\\', "\\\\")
        .replace("\"\"\"", "'''");
    let text = text.trim().trim_end_matches('"').to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
