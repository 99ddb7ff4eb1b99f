//! Entity Data Model produced by the reader.
//!
//! Everything here is plain owned data; the builders in the sibling modules
//! fill it in and [`Model`] offers the name lookups the binder needs.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::type_ref::TypeReference;
use crate::types::EdmVersion;

/// Root of a read document.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub version: EdmVersion,
    /// Qualified name from `$EntityContainer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_container: Option<String>,
    pub references: Vec<Reference>,
    pub schemas: Vec<Schema>,
    /// Models read from `$Reference` documents, keyed by reference URI.
    ///
    /// Only the main model fills this; referenced models leave theirs empty.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub referenced_models: BTreeMap<String, Model>,
}

/// One namespace of a document.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub version: EdmVersion,
    pub structured_types: Vec<StructuredType>,
    pub enum_types: Vec<EnumType>,
    pub type_definitions: Vec<TypeDefinition>,
    pub terms: Vec<Term>,
    pub operations: Vec<Operation>,
    pub entity_containers: Vec<EntityContainer>,
    /// Annotations on the schema itself.
    pub annotations: Vec<Annotation>,
    /// Out-of-line annotations from `$Annotations`.
    pub annotation_groups: Vec<AnnotationGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructuredKind {
    Entity,
    Complex,
}

impl StructuredKind {
    /// The `$Kind` value of this kind of type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StructuredKind::Entity => "EntityType",
            StructuredKind::Complex => "ComplexType",
        }
    }
}

/// Entity or complex type.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredType {
    pub kind: StructuredKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// Entities only.
    pub has_stream: bool,
    /// Entities only; empty when inherited from the base type.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<PropertyRef>,
    pub properties: Vec<Property>,
    pub navigation_properties: Vec<NavigationProperty>,
    pub annotations: Vec<Annotation>,
}

impl StructuredType {
    pub fn new(kind: StructuredKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            base_type: None,
            is_abstract: false,
            is_open: false,
            has_stream: false,
            key: Vec::new(),
            properties: Vec::new(),
            navigation_properties: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn navigation_property(&self, name: &str) -> Option<&NavigationProperty> {
        self.navigation_properties.iter().find(|p| p.name == name)
    }
}

/// One `$Key` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRef {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OnDeleteAction {
    Cascade,
    None,
    SetNull,
    SetDefault,
}

impl OnDeleteAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Cascade" => Some(OnDeleteAction::Cascade),
            "None" => Some(OnDeleteAction::None),
            "SetNull" => Some(OnDeleteAction::SetNull),
            "SetDefault" => Some(OnDeleteAction::SetDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the target entity type, without collection wrapper.
    pub type_name: String,
    pub is_collection: bool,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    pub contains_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<OnDeleteAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_delete_annotations: Vec<Annotation>,
    pub referential_constraints: Vec<ReferentialConstraint>,
    pub annotations: Vec<Annotation>,
}

impl NavigationProperty {
    /// Target type as written in CSDL, e.g. `Collection(Sales.Order)`.
    pub fn target(&self) -> String {
        if self.is_collection {
            format!("Collection({})", self.type_name)
        } else {
            self.type_name.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferentialConstraint {
    pub property: String,
    pub referenced_property: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlying_type: Option<String>,
    pub is_flags: bool,
    pub members: Vec<EnumMember>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    pub underlying_type: TypeReference,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Term {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_term: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum OperationKind {
    Action,
    Function { is_composable: bool },
}

/// One overload of an action or function.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub name: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    pub is_bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_set_path: Option<String>,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub nullable: bool,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnType {
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub nullable: bool,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityContainer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    pub entity_sets: Vec<EntitySet>,
    pub singletons: Vec<Singleton>,
    pub operation_imports: Vec<OperationImport>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigationPropertyBinding {
    pub path: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: String,
    pub include_in_service_document: bool,
    pub navigation_property_bindings: Vec<NavigationPropertyBinding>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Singleton {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    pub navigation_property_bindings: Vec<NavigationPropertyBinding>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationImportKind {
    Action,
    Function,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationImport {
    pub kind: OperationImportKind,
    pub name: String,
    /// Qualified name of the imported action or function.
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_set: Option<String>,
    /// Function imports only.
    pub include_in_service_document: bool,
    pub annotations: Vec<Annotation>,
}

/// A `$Reference` entry.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    pub uri: String,
    pub includes: Vec<Include>,
    pub include_annotations: Vec<IncludeAnnotations>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Reference {
    /// True when the reference names nothing to pull in.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.include_annotations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Include {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeAnnotations {
    pub term_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
}

/// Annotations applied from `$Annotations` to an external target path.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationGroup {
    pub target: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub value: Expression,
    /// Path of the member the annotation was read from.
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantKind {
    Null,
    Boolean,
    Integer,
    Floating,
    Decimal,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathKind {
    Path,
    AnnotationPath,
    NavigationPropertyPath,
    PropertyPath,
    ModelElementPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValue {
    pub name: String,
    pub value: Expression,
}

/// Annotation value expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "expression")]
pub enum Expression {
    Constant {
        kind: ConstantKind,
        text: String,
    },
    Path {
        kind: PathKind,
        path: String,
    },
    Apply {
        #[serde(skip_serializing_if = "Option::is_none")]
        function: Option<String>,
        arguments: Vec<Expression>,
    },
    Cast {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        operand: Box<Expression>,
    },
    If {
        test: Box<Expression>,
        if_true: Box<Expression>,
        #[serde(skip_serializing_if = "Option::is_none")]
        if_false: Option<Box<Expression>>,
    },
    IsOfType {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        operand: Box<Expression>,
    },
    LabeledElement {
        name: String,
        operand: Box<Expression>,
    },
    LabeledElementReference {
        name: String,
    },
    UrlRef {
        operand: Box<Expression>,
    },
    Record {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        type_ref: Option<TypeReference>,
        properties: Vec<PropertyValue>,
    },
    Collection {
        items: Vec<Expression>,
    },
}

impl Expression {
    pub fn constant(kind: ConstantKind, text: impl Into<String>) -> Self {
        Expression::Constant {
            kind,
            text: text.into(),
        }
    }
}

/// A structured type located in a model, with its qualified name.
#[derive(Debug, Clone, Copy)]
pub struct TypeHandle<'m> {
    pub namespace: &'m str,
    pub ty: &'m StructuredType,
}

impl<'m> TypeHandle<'m> {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.ty.name)
    }
}

/// A member of a structured type, found directly or through `$BaseType`.
#[derive(Debug, Clone, Copy)]
pub enum MemberRef<'m> {
    Property(&'m Property),
    Navigation(&'m NavigationProperty),
}

impl Model {
    pub fn new(version: EdmVersion) -> Self {
        Self {
            version,
            entity_container: None,
            references: Vec::new(),
            schemas: Vec::new(),
            referenced_models: BTreeMap::new(),
        }
    }

    pub fn schema(&self, namespace: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.namespace == namespace)
    }

    /// Map a namespace or alias to a namespace, looking at schema aliases and
    /// `$Include` aliases.
    fn namespace_of<'a>(&'a self, qualifier: &'a str) -> &'a str {
        for schema in &self.schemas {
            if schema.alias.as_deref() == Some(qualifier) {
                return &schema.namespace;
            }
        }
        for reference in &self.references {
            for include in &reference.includes {
                if include.alias.as_deref() == Some(qualifier) {
                    return &include.namespace;
                }
            }
        }
        qualifier
    }

    /// Every model visible from this one: itself, then referenced models.
    fn visible_models(&self) -> impl Iterator<Item = &Model> {
        std::iter::once(self).chain(self.referenced_models.values())
    }

    /// Find an entity or complex type by namespace- or alias-qualified name.
    pub fn find_structured_type(&self, qualified_name: &str) -> Option<TypeHandle<'_>> {
        let (qualifier, name) = qualified_name.rsplit_once('.')?;
        let namespace = self.namespace_of(qualifier);
        self.visible_models().find_map(|model| {
            let schema = model
                .schema(namespace)
                .or_else(|| model.schema(model.namespace_of(qualifier)))?;
            let ty = schema.structured_types.iter().find(|t| t.name == name)?;
            Some(TypeHandle {
                namespace: &schema.namespace,
                ty,
            })
        })
    }

    /// Find an entity container by qualified name, here or in a referenced document.
    pub fn find_entity_container(&self, qualified_name: &str) -> Option<&EntityContainer> {
        let (qualifier, name) = qualified_name.rsplit_once('.')?;
        let namespace = self.namespace_of(qualifier);
        self.visible_models().find_map(|model| {
            let schema = model
                .schema(namespace)
                .or_else(|| model.schema(model.namespace_of(qualifier)))?;
            schema.entity_containers.iter().find(|c| c.name == name)
        })
    }

    /// Find a declared or inherited member of a structured type.
    ///
    /// Walks `$BaseType` links; a cyclic chain ends the walk.
    pub fn find_member<'m>(&'m self, start: TypeHandle<'m>, name: &str) -> Option<MemberRef<'m>> {
        let mut seen = HashSet::new();
        let mut current = Some(start);
        while let Some(handle) = current {
            if !seen.insert(handle.qualified_name()) {
                break;
            }
            if let Some(property) = handle.ty.property(name) {
                return Some(MemberRef::Property(property));
            }
            if let Some(navigation) = handle.ty.navigation_property(name) {
                return Some(MemberRef::Navigation(navigation));
            }
            current = handle
                .ty
                .base_type
                .as_deref()
                .and_then(|base| self.find_structured_type(base));
        }
        None
    }
}
