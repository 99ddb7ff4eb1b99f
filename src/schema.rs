//! Schema namespace members: dispatch on `$Kind`, plus the small element
//! builders (enum types, type definitions, terms).

use serde_json::{Map, Value};

use crate::annotation::{build_annotation, MemberName, PendingAnnotations};
use crate::container::build_entity_container;
use crate::edm::{
    AnnotationGroup, EnumMember, EnumType, Schema, StructuredKind, Term, TypeDefinition,
};
use crate::error::CsdlError;
use crate::operation::build_operations;
use crate::reader::{expect_object, Context};
use crate::structured::build_structured_type;
use crate::type_ref::{
    read_bool, read_string, read_type_reference, resolve_type_reference, Facets, TYPE_MEMBERS,
};
use crate::types::{child_path, json_type_name, EdmVersion, ELEMENT_KINDS};

/// Build one schema from a namespace member of the document.
pub(crate) fn build_schema(
    cx: &mut Context<'_>,
    namespace: &str,
    value: &Value,
    version: EdmVersion,
    path: &str,
) -> Result<Schema, CsdlError> {
    let obj = expect_object(value, path)?;
    let mut schema = Schema {
        namespace: namespace.to_string(),
        alias: None,
        version,
        structured_types: Vec::new(),
        enum_types: Vec::new(),
        type_definitions: Vec::new(),
        terms: Vec::new(),
        operations: Vec::new(),
        entity_containers: Vec::new(),
        annotations: Vec::new(),
        annotation_groups: Vec::new(),
    };

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Alias" => schema.alias = read_string(obj, "$Alias", path)?,
            "$Annotations" => {
                schema.annotation_groups = build_annotation_groups(cx, value, &member_path)?;
            }
            _ if key.starts_with('$') => cx.unknown(path, key),
            _ if cx.annotation_member(key, value, path, &mut schema.annotations, None)? => {}
            name => match value {
                Value::Array(overloads) => {
                    let operations = build_operations(cx, name, overloads, &member_path)?;
                    schema.operations.extend(operations);
                }
                Value::Object(element) => {
                    build_element(cx, &mut schema, name, element, &member_path)?;
                }
                other => {
                    return Err(CsdlError::shape(
                        &member_path,
                        "object or array",
                        json_type_name(other),
                    ))
                }
            },
        }
    }

    Ok(schema)
}

/// Route an element object to its builder by `$Kind`.
fn build_element(
    cx: &mut Context<'_>,
    schema: &mut Schema,
    name: &str,
    element: &Map<String, Value>,
    path: &str,
) -> Result<(), CsdlError> {
    let kind = match element.get("$Kind") {
        Some(Value::String(kind)) if ELEMENT_KINDS.contains(&kind.as_str()) => kind.as_str(),
        _ => {
            let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
            cx.unknown(parent, name);
            return Ok(());
        }
    };

    match kind {
        "EntityType" => schema.structured_types.push(build_structured_type(
            cx,
            name,
            element,
            StructuredKind::Entity,
            path,
        )?),
        "ComplexType" => schema.structured_types.push(build_structured_type(
            cx,
            name,
            element,
            StructuredKind::Complex,
            path,
        )?),
        "EnumType" => schema.enum_types.push(build_enum_type(cx, name, element, path)?),
        "TypeDefinition" => schema
            .type_definitions
            .push(build_type_definition(cx, name, element, path)?),
        "Term" => schema.terms.push(build_term(cx, name, element, path)?),
        _ => schema
            .entity_containers
            .push(build_entity_container(cx, name, element, path)?),
    }
    Ok(())
}

/// `$Annotations`: target path → object of `@Term` members.
fn build_annotation_groups(
    cx: &mut Context<'_>,
    value: &Value,
    path: &str,
) -> Result<Vec<AnnotationGroup>, CsdlError> {
    let obj = expect_object(value, path)?;
    let mut groups = Vec::with_capacity(obj.len());

    for (target, annotations) in obj {
        let target_path = child_path(path, target);
        let members = expect_object(annotations, &target_path)?;
        let mut group = AnnotationGroup {
            target: target.clone(),
            annotations: Vec::new(),
        };
        for (key, value) in members {
            match MemberName::parse(key) {
                MemberName::Annotation {
                    target: None,
                    term,
                    qualifier,
                } => {
                    let annotation_path = child_path(&target_path, key);
                    group
                        .annotations
                        .push(build_annotation(term, qualifier, value, &annotation_path)?);
                }
                _ => cx.unknown(&target_path, key),
            }
        }
        groups.push(group);
    }

    Ok(groups)
}

fn build_enum_type(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<EnumType, CsdlError> {
    let mut enum_type = EnumType {
        name: name.to_string(),
        underlying_type: None,
        is_flags: false,
        members: Vec::new(),
        annotations: Vec::new(),
    };
    let mut pending = PendingAnnotations::default();

    for (key, value) in obj {
        match key.as_str() {
            "$Kind" => {}
            "$UnderlyingType" => enum_type.underlying_type = read_string(obj, key, path)?,
            "$IsFlags" => enum_type.is_flags = read_bool(obj, key, path)?.unwrap_or(false),
            _ if key.starts_with('$') => cx.unknown(path, key),
            _ if cx.annotation_member(
                key,
                value,
                path,
                &mut enum_type.annotations,
                Some(&mut pending),
            )? => {}
            member => {
                let value = value.as_i64().ok_or_else(|| {
                    CsdlError::shape(&child_path(path, member), "integer", json_type_name(value))
                })?;
                enum_type.members.push(EnumMember {
                    name: member.to_string(),
                    value,
                    annotations: Vec::new(),
                });
            }
        }
    }

    pending.resolve(|target, annotation| {
        match enum_type.members.iter_mut().find(|m| m.name == target) {
            Some(member) => {
                member.annotations.push(annotation);
                true
            }
            None => false,
        }
    })?;

    Ok(enum_type)
}

fn build_type_definition(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<TypeDefinition, CsdlError> {
    let underlying = read_string(obj, "$UnderlyingType", path)?
        .ok_or_else(|| CsdlError::missing(path, "$UnderlyingType"))?;
    let facets = Facets::read(obj, path)?;
    let mut definition = TypeDefinition {
        name: name.to_string(),
        underlying_type: resolve_type_reference(&underlying, &facets),
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            "$Kind" | "$UnderlyingType" | "$MaxLength" | "$Precision" | "$Scale" | "$Unicode"
            | "$SRID" => {}
            _ if cx.annotation_member(key, value, path, &mut definition.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(definition)
}

fn build_term(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Term, CsdlError> {
    let (type_ref, facets) = read_type_reference(obj, path)?;
    let mut term = Term {
        name: name.to_string(),
        type_ref,
        nullable: facets.nullable,
        base_term: read_string(obj, "$BaseTerm", path)?,
        applies_to: Vec::new(),
        default_value: None,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Kind" | "$BaseTerm" => {}
            k if TYPE_MEMBERS.contains(&k) => {}
            "$AppliesTo" => {
                let Value::Array(items) = value else {
                    return Err(CsdlError::shape(&member_path, "array", json_type_name(value)));
                };
                for item in items {
                    let Value::String(target) = item else {
                        return Err(CsdlError::shape(
                            &member_path,
                            "array of strings",
                            json_type_name(item),
                        ));
                    };
                    term.applies_to.push(target.clone());
                }
            }
            "$DefaultValue" => term.default_value = Some(default_value_text(value)),
            _ if cx.annotation_member(key, value, path, &mut term.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(term)
}

/// `$DefaultValue` as its literal text; strings lose their quotes.
pub(crate) fn default_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::{ConstantKind, Expression, Model};
    use crate::error::UnknownMember;
    use crate::reader::CsdlReader;
    use crate::type_ref::{MaxLength, TypeReference};
    use serde_json::json;

    fn read(document: Value) -> (Model, Vec<UnknownMember>) {
        let mut unknown = Vec::new();
        let model = CsdlReader::new()
            .reporter(&mut unknown)
            .read(&document)
            .unwrap();
        (model, unknown)
    }

    #[test]
    fn alias_and_schema_annotations() {
        let (model, unknown) = read(json!({
            "$Version": "4.01",
            "Sales.Model": {
                "$Alias": "Sales",
                "@Core.Description": "Sales model"
            }
        }));
        let schema = &model.schemas[0];
        assert_eq!(schema.namespace, "Sales.Model");
        assert_eq!(schema.alias.as_deref(), Some("Sales"));
        assert_eq!(schema.annotations[0].term, "Core.Description");
        assert!(unknown.is_empty());
    }

    #[test]
    fn element_without_known_kind_is_dropped() {
        let (model, unknown) = read(json!({
            "$Version": "4.01",
            "NS": {
                "NoKind": {"Name": {}},
                "OddKind": {"$Kind": "Hologram"},
                "Color": {"$Kind": "EnumType", "Red": 0}
            }
        }));
        let schema = &model.schemas[0];
        assert_eq!(schema.enum_types.len(), 1);
        let names: Vec<_> = unknown.iter().map(|u| u.member.as_str()).collect();
        assert_eq!(names, ["NoKind", "OddKind"]);
        assert_eq!(unknown[0].path, "/NS");
    }

    #[test]
    fn scalar_element_is_rejected() {
        let result = CsdlReader::new().read(&json!({"$Version": "4.01", "NS": {"X": 5}}));
        assert!(matches!(result, Err(CsdlError::UnexpectedShape { .. })));
    }

    #[test]
    fn schema_must_be_object() {
        let result = CsdlReader::new().read(&json!({"$Version": "4.01", "NS": []}));
        assert!(matches!(result, Err(CsdlError::UnexpectedShape { .. })));
    }

    #[test]
    fn enum_members_and_member_annotations() {
        let (model, _) = read(json!({
            "$Version": "4.01",
            "NS": {
                "Access": {
                    "$Kind": "EnumType",
                    "$UnderlyingType": "Edm.Byte",
                    "$IsFlags": true,
                    "Read@Core.Description": "may read",
                    "Read": 1,
                    "Write": 2
                }
            }
        }));
        let access = &model.schemas[0].enum_types[0];
        assert!(access.is_flags);
        assert_eq!(access.underlying_type.as_deref(), Some("Edm.Byte"));
        assert_eq!(access.members.len(), 2);
        assert_eq!(access.members[0].annotations.len(), 1);
        assert_eq!(access.members[1].value, 2);
    }

    #[test]
    fn enum_annotation_without_member_is_fatal() {
        let result = CsdlReader::new().read(&json!({
            "$Version": "4.01",
            "NS": {"E": {"$Kind": "EnumType", "A": 0, "B@Core.Description": "x"}}
        }));
        assert!(matches!(result, Err(CsdlError::AnnotationTargetNotFound { .. })));
    }

    #[test]
    fn type_definition_facets() {
        let (model, _) = read(json!({
            "$Version": "4.01",
            "NS": {
                "Code": {
                    "$Kind": "TypeDefinition",
                    "$UnderlyingType": "Edm.String",
                    "$MaxLength": 3
                }
            }
        }));
        assert_eq!(
            model.schemas[0].type_definitions[0].underlying_type,
            TypeReference::String {
                max_length: Some(MaxLength::Bounded(3)),
                unicode: true
            }
        );
    }

    #[test]
    fn term_members() {
        let (model, _) = read(json!({
            "$Version": "4.01",
            "NS": {
                "Label": {
                    "$Kind": "Term",
                    "$AppliesTo": ["Property", "EntityType"],
                    "$DefaultValue": "none",
                    "$Nullable": true,
                    "@Core.Description": "A label"
                }
            }
        }));
        let term = &model.schemas[0].terms[0];
        assert!(term.nullable);
        assert_eq!(term.applies_to, ["Property", "EntityType"]);
        assert_eq!(term.default_value.as_deref(), Some("none"));
        assert_eq!(
            term.annotations[0].value,
            Expression::constant(ConstantKind::String, "A label")
        );
    }

    #[test]
    fn out_of_line_annotations() {
        let (model, unknown) = read(json!({
            "$Version": "4.01",
            "NS": {
                "$Annotations": {
                    "Other.Customer/Name": {
                        "@Core.Description": "Customer name",
                        "@UI.Label#Short": "Name",
                        "NotAnAnnotation": 1
                    }
                }
            }
        }));
        let group = &model.schemas[0].annotation_groups[0];
        assert_eq!(group.target, "Other.Customer/Name");
        assert_eq!(group.annotations.len(), 2);
        assert_eq!(group.annotations[1].qualifier.as_deref(), Some("Short"));
        assert_eq!(unknown.len(), 1);
    }
}
