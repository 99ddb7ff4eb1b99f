//! `$Reference` handling: building references and reading the documents
//! they point at.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::edm::{Include, IncludeAnnotations, Reference};
use crate::error::CsdlError;
use crate::loader::{read_text, resolve_uri_to_path};
use crate::reader::{expect_object, read_document, Context};
use crate::type_ref::read_string;
use crate::types::{child_path, json_type_name};

/// Vocabularies shipped with the crate, matched by substring of the reference URI.
const BUNDLED_VOCABULARIES: &[(&str, &str)] = &[
    (
        "Org.OData.Core.V1",
        include_str!("../vocabularies/Org.OData.Core.V1.json"),
    ),
    (
        "Org.OData.Measures.V1",
        include_str!("../vocabularies/Org.OData.Measures.V1.json"),
    ),
];

/// Bundled vocabulary text for a reference URI, if any.
pub fn bundled_vocabulary(uri: &str) -> Option<&'static str> {
    BUNDLED_VOCABULARIES
        .iter()
        .find(|(name, _)| uri.contains(name))
        .map(|(_, text)| *text)
}

/// Source of referenced document text.
pub trait ReferenceResolver {
    /// Text of the document at `uri`, or `None` when this source has none.
    fn resolve(&self, uri: &str) -> Option<String>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, uri: &str) -> Option<String> {
        self(uri)
    }
}

/// Resolves nothing; only the bundled vocabularies apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ReferenceResolver for NoResolver {
    fn resolve(&self, _uri: &str) -> Option<String> {
        None
    }
}

/// Resolves reference URIs to local files.
///
/// Relative URIs are joined to `base_dir`. With [`FileResolver::url_mapping`],
/// URIs starting with `remote_base` have that prefix replaced by `local_base`.
///
/// ```text
/// remote_base = "https://example.com/odata"
/// local_base  = "vocab"
/// uri         = "https://example.com/odata/Sales.json" -> "vocab/Sales.json"
/// ```
#[derive(Debug, Clone)]
pub struct FileResolver {
    base_dir: PathBuf,
    local_base: Option<PathBuf>,
    remote_base: Option<String>,
}

impl FileResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            local_base: None,
            remote_base: None,
        }
    }

    /// Map URIs under `remote_base` into `local_base`.
    pub fn url_mapping(
        mut self,
        local_base: impl Into<PathBuf>,
        remote_base: impl Into<String>,
    ) -> Self {
        self.local_base = Some(local_base.into());
        self.remote_base = Some(remote_base.into());
        self
    }

    pub fn path_for(&self, uri: &str) -> PathBuf {
        resolve_uri_to_path(
            uri,
            &self.base_dir,
            self.local_base.as_deref(),
            self.remote_base.as_deref(),
        )
    }
}

impl ReferenceResolver for FileResolver {
    fn resolve(&self, uri: &str) -> Option<String> {
        let path = self.path_for(uri);
        match read_text(&path) {
            Ok(text) => Some(text),
            Err(CsdlError::FileNotFound { .. }) => None,
            Err(e) => {
                tracing::warn!(uri, error = %e, "cannot read referenced document");
                None
            }
        }
    }
}

/// Fetches reference URIs over HTTP. Non-HTTP URIs resolve to nothing.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpResolver;

#[cfg(feature = "remote")]
impl ReferenceResolver for HttpResolver {
    fn resolve(&self, uri: &str) -> Option<String> {
        if !crate::loader::is_url(uri) {
            return None;
        }
        match crate::loader::fetch_text(uri) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(uri, error = %e, "cannot fetch referenced document");
                None
            }
        }
    }
}

/// Tries each resolver in turn.
pub struct ChainResolver<'a> {
    resolvers: Vec<Box<dyn ReferenceResolver + 'a>>,
}

impl<'a> ChainResolver<'a> {
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    pub fn with(mut self, resolver: impl ReferenceResolver + 'a) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl Default for ChainResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver for ChainResolver<'_> {
    fn resolve(&self, uri: &str) -> Option<String> {
        self.resolvers.iter().find_map(|r| r.resolve(uri))
    }
}

/// A resolver reading files next to `document`, for documents read from disk.
pub fn sibling_resolver(document: &Path) -> FileResolver {
    FileResolver::new(document.parent().unwrap_or(Path::new(".")))
}

/// Build the `$Reference` list and read every referenced document that
/// includes something.
pub(crate) fn read_references(
    cx: &mut Context<'_>,
    value: &Value,
    path: &str,
) -> Result<Vec<Reference>, CsdlError> {
    let obj = expect_object(value, path)?;
    let mut references = Vec::with_capacity(obj.len());

    for (uri, body) in obj {
        let reference_path = child_path(path, uri);
        let reference = build_reference(cx, uri, body, &reference_path)?;
        if !reference.is_empty() {
            load_reference(cx, uri, &reference_path)?;
        }
        references.push(reference);
    }

    Ok(references)
}

fn build_reference(
    cx: &mut Context<'_>,
    uri: &str,
    body: &Value,
    path: &str,
) -> Result<Reference, CsdlError> {
    let obj = expect_object(body, path)?;
    let mut reference = Reference {
        uri: uri.to_string(),
        includes: Vec::new(),
        include_annotations: Vec::new(),
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Include" => {
                for (i, item) in expect_array(value, &member_path)?.iter().enumerate() {
                    let item_path = child_path(&member_path, &i.to_string());
                    let item = expect_object(item, &item_path)?;
                    let namespace = read_string(item, "$Namespace", &item_path)?
                        .ok_or_else(|| CsdlError::missing(&item_path, "$Namespace"))?;
                    reference.includes.push(Include {
                        namespace,
                        alias: read_string(item, "$Alias", &item_path)?,
                    });
                }
            }
            "$IncludeAnnotations" => {
                for (i, item) in expect_array(value, &member_path)?.iter().enumerate() {
                    let item_path = child_path(&member_path, &i.to_string());
                    let item = expect_object(item, &item_path)?;
                    let term_namespace = read_string(item, "$TermNamespace", &item_path)?
                        .ok_or_else(|| CsdlError::missing(&item_path, "$TermNamespace"))?;
                    reference.include_annotations.push(IncludeAnnotations {
                        term_namespace,
                        qualifier: read_string(item, "$Qualifier", &item_path)?,
                        target_namespace: read_string(item, "$TargetNamespace", &item_path)?,
                    });
                }
            }
            _ => {
                if !cx.annotation_member(key, value, path, &mut reference.annotations, None)? {
                    cx.unknown(path, key);
                }
            }
        }
    }

    Ok(reference)
}

/// Read the document behind `uri` into the shared referenced-model set.
///
/// A URI is fetched at most once per read, which also ends reference cycles.
fn load_reference(cx: &mut Context<'_>, uri: &str, path: &str) -> Result<(), CsdlError> {
    if !cx.loaded.insert(uri.to_string()) {
        tracing::debug!(uri, "reference already loaded");
        return Ok(());
    }

    let text = cx
        .resolver
        .resolve(uri)
        .or_else(|| bundled_vocabulary(uri).map(String::from))
        .ok_or_else(|| CsdlError::MissingReferencedDocument {
            uri: uri.to_string(),
        })?;
    tracing::debug!(uri, "reading referenced document");

    let document: Value =
        serde_json::from_str(&text).map_err(|source| CsdlError::InvalidJson { source })?;
    if !document.is_object() {
        return Err(CsdlError::shape(path, "object", json_type_name(&document)));
    }

    let model = read_document(cx, &document, uri)?;
    cx.referenced.insert(uri.to_string(), model);
    Ok(())
}

fn expect_array<'v>(value: &'v Value, path: &str) -> Result<&'v Vec<Value>, CsdlError> {
    value
        .as_array()
        .ok_or_else(|| CsdlError::shape(path, "array", json_type_name(value)))
}
