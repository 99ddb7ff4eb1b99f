//! OData CSDL JSON reader
//!
//! Reads OData CSDL JSON documents into an in-memory Entity Data Model and
//! binds `$select` / `$expand` paths against it.
//!
//! # Example
//!
//! ```
//! use odata_csdl::{CsdlReader, MemberRef};
//! use serde_json::json;
//!
//! let document = json!({
//!     "$Version": "4.01",
//!     "$Reference": {
//!         "https://oasis-tcs.github.io/odata-vocabularies/vocabularies/Org.OData.Core.V1.json": {
//!             "$Include": [{ "$Namespace": "Org.OData.Core.V1", "$Alias": "Core" }]
//!         }
//!     },
//!     "Sales": {
//!         "Customer": {
//!             "$Kind": "EntityType",
//!             "$Key": ["ID"],
//!             "ID": { "$Type": "Edm.Int32" },
//!             "Name@Core.Description": "Display name",
//!             "Name": { "$MaxLength": 80 }
//!         }
//!     }
//! });
//!
//! let model = CsdlReader::new().read(&document).unwrap();
//!
//! // The Core vocabulary is bundled, so the reference resolves offline
//! assert_eq!(model.referenced_models.len(), 1);
//!
//! let customer = model.find_structured_type("Sales.Customer").unwrap();
//! let Some(MemberRef::Property(name)) = model.find_member(customer, "Name") else {
//!     panic!("Name is a property");
//! };
//! assert_eq!(name.annotations[0].term, "Core.Description");
//! ```
//!
//! # Errors
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Structural problem (missing `$Version`, wrong JSON kind, ...) | [`CsdlError`], document rejected |
//! | Annotation naming a member that does not exist | [`CsdlError::AnnotationTargetNotFound`] |
//! | Member the reader does not know | [`UnknownMember`] sent to the [`Reporter`], member skipped |
//! | Invalid `$select` / `$expand` path | [`SelectExpandError`], path rejected |
//!
//! # References
//!
//! `$Reference` entries that include something are read through a
//! [`ReferenceResolver`]; the bundled `Org.OData.Core.V1` and
//! `Org.OData.Measures.V1` vocabularies answer when the resolver does not.
//! Each URI is read once per document.

mod annotation;
mod container;
mod edm;
mod error;
mod linter;
mod loader;
mod operation;
mod reader;
mod reference;
mod schema;
mod select_expand;
mod structured;
mod type_ref;
mod types;

pub use annotation::{build_annotation, build_expression, MemberName};
pub use edm::{
    Annotation, AnnotationGroup, ConstantKind, EntityContainer, EntitySet, EnumMember, EnumType,
    Expression, Include, IncludeAnnotations, MemberRef, Model, NavigationProperty,
    NavigationPropertyBinding, OnDeleteAction, Operation, OperationImport, OperationImportKind,
    OperationKind, Parameter, PathKind, Property, PropertyRef, PropertyValue, Reference,
    ReferentialConstraint, ReturnType, Schema, Singleton, StructuredKind, StructuredType, Term,
    TypeDefinition, TypeHandle,
};
pub use error::{CsdlError, SelectExpandError, UnknownMember};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use reader::{read_csdl, CsdlReader, Reporter, TracingReporter};
pub use reference::{
    bundled_vocabulary, sibling_resolver, ChainResolver, FileResolver, NoResolver,
    ReferenceResolver,
};
pub use select_expand::{
    ExpandedNavigationSelectItem, ODataPath, PathSegment, PathSegmentToken, SelectExpandBinder,
    SelectExpandClause, SelectItem, DEFAULT_MAX_DEPTH,
};
pub use type_ref::{
    read_type_reference, resolve_type_reference, Facets, MaxLength, PrimitiveKind, Scale,
    SpatialKind, Srid, TemporalKind, TypeReference,
};
pub use types::{EdmVersion, DEFAULT_TYPE};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
#[cfg(feature = "remote")]
pub use reference::HttpResolver;
