//! Document reader: turns a CSDL JSON document into a [`Model`].
//!
//! The reader walks the document once. `$Reference` entries are fetched
//! through a [`ReferenceResolver`] and read with the same reader; every model
//! read that way lands in the main model's
//! [`referenced_models`](Model::referenced_models), keyed by URI.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::annotation::{build_annotation, MemberName, PendingAnnotations};
use crate::edm::{Annotation, Model};
use crate::error::{CsdlError, UnknownMember};
use crate::loader::load_document_str;
use crate::reference::{read_references, NoResolver, ReferenceResolver};
use crate::schema::build_schema;
use crate::types::{child_path, json_type_name, EdmVersion};

/// Receives members the reader skips.
pub trait Reporter {
    fn unknown_member(&mut self, member: UnknownMember);
}

/// Logs unknown members with `tracing`. The default reporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn unknown_member(&mut self, member: UnknownMember) {
        tracing::warn!(path = %member.path, member = %member.member, "unknown member");
    }
}

impl Reporter for Vec<UnknownMember> {
    fn unknown_member(&mut self, member: UnknownMember) {
        self.push(member);
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn unknown_member(&mut self, member: UnknownMember) {
        (**self).unknown_member(member);
    }
}

/// Reads CSDL JSON documents.
///
/// ```
/// use odata_csdl::CsdlReader;
/// use serde_json::json;
///
/// let document = json!({
///     "$Version": "4.01",
///     "Sales": {
///         "Customer": {
///             "$Kind": "EntityType",
///             "$Key": ["ID"],
///             "ID": { "$Type": "Edm.Int32" },
///             "Name": { "$Nullable": true }
///         }
///     }
/// });
///
/// let model = CsdlReader::new().read(&document).unwrap();
/// let customer = model.find_structured_type("Sales.Customer").unwrap();
/// assert_eq!(customer.ty.properties.len(), 2);
/// ```
pub struct CsdlReader<'a> {
    resolver: Box<dyn ReferenceResolver + 'a>,
    reporter: Box<dyn Reporter + 'a>,
}

impl Default for CsdlReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CsdlReader<'a> {
    /// A reader that only knows the bundled vocabularies and logs unknown members.
    pub fn new() -> Self {
        Self {
            resolver: Box::new(NoResolver),
            reporter: Box::new(TracingReporter),
        }
    }

    /// Set the source of referenced documents.
    ///
    /// The bundled vocabularies are still consulted when it yields nothing.
    pub fn resolver(mut self, resolver: impl ReferenceResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Set the receiver of unknown members.
    pub fn reporter(mut self, reporter: impl Reporter + 'a) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Read a parsed document.
    ///
    /// # Errors
    ///
    /// Any [`CsdlError`] rejects the whole document.
    pub fn read(&mut self, document: &Value) -> Result<Model, CsdlError> {
        let mut cx = Context::new(&*self.resolver, &mut *self.reporter);
        let mut model = read_document(&mut cx, document, "")?;
        model.referenced_models = cx.referenced;
        Ok(model)
    }

    /// Parse and read a document from JSON text.
    pub fn read_str(&mut self, text: &str) -> Result<Model, CsdlError> {
        let document = load_document_str(text)?;
        self.read(&document)
    }
}

/// Read a document with the default reader.
pub fn read_csdl(document: &Value) -> Result<Model, CsdlError> {
    CsdlReader::new().read(document)
}

/// State shared by every builder during one read, including reads of
/// referenced documents.
pub(crate) struct Context<'a> {
    pub(crate) resolver: &'a dyn ReferenceResolver,
    reporter: &'a mut dyn Reporter,
    /// Reference URIs already fetched, or being fetched.
    pub(crate) loaded: HashSet<String>,
    pub(crate) referenced: BTreeMap<String, Model>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(resolver: &'a dyn ReferenceResolver, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            resolver,
            reporter,
            loaded: HashSet::new(),
            referenced: BTreeMap::new(),
        }
    }

    pub(crate) fn unknown(&mut self, path: &str, member: &str) {
        self.reporter.unknown_member(UnknownMember {
            path: path.to_string(),
            member: member.to_string(),
        });
    }

    /// Handle an `@` member of an element object.
    ///
    /// Own annotations go to `own`; annotations on a sibling member go to
    /// `pending`, or are reported unknown when the object has no members
    /// that can carry them. Returns false for plain member names.
    pub(crate) fn annotation_member(
        &mut self,
        key: &str,
        value: &Value,
        path: &str,
        own: &mut Vec<Annotation>,
        pending: Option<&mut PendingAnnotations>,
    ) -> Result<bool, CsdlError> {
        let member_path = child_path(path, key);
        match MemberName::parse(key) {
            MemberName::Plain(_) => Ok(false),
            MemberName::Nested(_) => {
                self.unknown(path, key);
                Ok(true)
            }
            MemberName::Annotation {
                target: None,
                term,
                qualifier,
            } => {
                own.push(build_annotation(term, qualifier, value, &member_path)?);
                Ok(true)
            }
            MemberName::Annotation {
                target: Some(target),
                term,
                qualifier,
            } => {
                match pending {
                    Some(pending) => {
                        let annotation = build_annotation(term, qualifier, value, &member_path)?;
                        pending.push(target, &member_path, annotation);
                    }
                    None => self.unknown(path, key),
                }
                Ok(true)
            }
        }
    }
}

pub(crate) fn expect_object<'v>(
    value: &'v Value,
    path: &str,
) -> Result<&'v Map<String, Value>, CsdlError> {
    value
        .as_object()
        .ok_or_else(|| CsdlError::shape(path, "object", json_type_name(value)))
}

/// Read one document; referenced documents are read into `cx.referenced`.
pub(crate) fn read_document(
    cx: &mut Context<'_>,
    document: &Value,
    path: &str,
) -> Result<Model, CsdlError> {
    let obj = expect_object(document, path)?;

    let version = match obj.get("$Version") {
        Some(Value::String(s)) => EdmVersion::parse(s),
        _ => None,
    }
    .ok_or_else(|| CsdlError::missing(path, "$Version"))?;

    tracing::debug!(version = %version, path, "reading CSDL document");
    let mut model = Model::new(version);

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Version" => {}
            "$EntityContainer" => {
                let Value::String(name) = value else {
                    return Err(CsdlError::shape(&member_path, "string", json_type_name(value)));
                };
                model.entity_container = Some(name.clone());
            }
            "$Reference" => {
                model.references = read_references(cx, value, &member_path)?;
            }
            _ if key.starts_with('$') || key.contains('@') => cx.unknown(path, key),
            namespace => {
                let schema = build_schema(cx, namespace, value, version, &member_path)?;
                model.schemas.push(schema);
            }
        }
    }

    Ok(model)
}
