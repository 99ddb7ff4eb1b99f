//! Entity and complex types.
//!
//! Member names of a type object follow three forms: `$`-prefixed control
//! members, `@Term` annotations on the type, and `Member` / `Member@Term`
//! for properties and their annotations. Annotations naming a member are
//! held back until every member is built, then attached by name.

use serde_json::{Map, Value};

use crate::annotation::PendingAnnotations;
use crate::edm::{
    Annotation, NavigationProperty, OnDeleteAction, Property, PropertyRef, ReferentialConstraint,
    StructuredKind, StructuredType,
};
use crate::error::CsdlError;
use crate::reader::{expect_object, Context};
use crate::schema::default_value_text;
use crate::type_ref::{read_bool, read_string, read_type_name, read_type_reference, TYPE_MEMBERS};
use crate::types::{child_path, json_type_name};

/// Build an entity or complex type from its object.
///
/// # Errors
///
/// `UnexpectedShape` when `$Kind` does not match `kind`;
/// `AnnotationTargetNotFound` when `Member@Term` names no property or
/// navigation property of the type.
pub(crate) fn build_structured_type(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    kind: StructuredKind,
    path: &str,
) -> Result<StructuredType, CsdlError> {
    match obj.get("$Kind") {
        Some(Value::String(k)) if k == kind.kind_name() => {}
        Some(Value::String(k)) => {
            return Err(CsdlError::shape(
                &child_path(path, "$Kind"),
                kind.kind_name(),
                format!("\"{}\"", k),
            ))
        }
        Some(other) => {
            return Err(CsdlError::shape(
                &child_path(path, "$Kind"),
                kind.kind_name(),
                json_type_name(other),
            ))
        }
        None => return Err(CsdlError::missing(path, "$Kind")),
    }

    let mut ty = StructuredType::new(kind, name);
    let mut pending = PendingAnnotations::default();

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Kind" => {}
            "$BaseType" => ty.base_type = read_string(obj, key, path)?,
            "$Abstract" => ty.is_abstract = read_bool(obj, key, path)?.unwrap_or(false),
            "$OpenType" => ty.is_open = read_bool(obj, key, path)?.unwrap_or(false),
            "$HasStream" if kind == StructuredKind::Entity => {
                ty.has_stream = read_bool(obj, key, path)?.unwrap_or(false);
            }
            "$Key" if kind == StructuredKind::Entity => {
                ty.key = build_key(value, &member_path)?;
            }
            _ if key.starts_with('$') => cx.unknown(path, key),
            _ if cx.annotation_member(key, value, path, &mut ty.annotations, Some(&mut pending))? => {}
            member => {
                let member_obj = expect_object(value, &member_path)?;
                if is_navigation_property(member_obj) {
                    let navigation = build_navigation_property(cx, member, member_obj, &member_path)?;
                    ty.navigation_properties.push(navigation);
                } else {
                    let property = build_property(cx, member, member_obj, &member_path)?;
                    ty.properties.push(property);
                }
            }
        }
    }

    pending.resolve(|target, annotation| attach_to_member(&mut ty, target, annotation))?;

    Ok(ty)
}

fn attach_to_member(ty: &mut StructuredType, target: &str, annotation: Annotation) -> bool {
    if let Some(property) = ty.properties.iter_mut().find(|p| p.name == target) {
        property.annotations.push(annotation);
        return true;
    }
    if let Some(navigation) = ty.navigation_properties.iter_mut().find(|p| p.name == target) {
        navigation.annotations.push(annotation);
        return true;
    }
    false
}

fn is_navigation_property(obj: &Map<String, Value>) -> bool {
    obj.get("$Kind").and_then(Value::as_str) == Some("NavigationProperty")
}

/// `$Key`: property paths, each a string or a one-member `{alias: path}` object.
fn build_key(value: &Value, path: &str) -> Result<Vec<PropertyRef>, CsdlError> {
    let Value::Array(items) = value else {
        return Err(CsdlError::shape(path, "array", json_type_name(value)));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = child_path(path, &i.to_string());
            match item {
                Value::String(property) => Ok(PropertyRef {
                    path: property.clone(),
                    alias: None,
                }),
                Value::Object(aliased) if aliased.len() == 1 => {
                    let (alias, target) = aliased
                        .iter()
                        .next()
                        .ok_or_else(|| CsdlError::missing(&item_path, "alias"))?;
                    let Value::String(target) = target else {
                        return Err(CsdlError::shape(
                            &child_path(&item_path, alias),
                            "string",
                            json_type_name(target),
                        ));
                    };
                    Ok(PropertyRef {
                        path: target.clone(),
                        alias: Some(alias.clone()),
                    })
                }
                other => Err(CsdlError::shape(
                    &item_path,
                    "string or single-member object",
                    json_type_name(other),
                )),
            }
        })
        .collect()
}

fn build_property(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Property, CsdlError> {
    let (type_ref, facets) = read_type_reference(obj, path)?;
    let mut property = Property {
        name: name.to_string(),
        type_ref,
        nullable: facets.nullable,
        default_value: None,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            k if TYPE_MEMBERS.contains(&k) => {}
            "$Kind" => {
                if value.as_str() != Some("Property") {
                    cx.unknown(path, key);
                }
            }
            "$DefaultValue" => property.default_value = Some(default_value_text(value)),
            _ if cx.annotation_member(key, value, path, &mut property.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(property)
}

fn build_navigation_property(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<NavigationProperty, CsdlError> {
    let type_name = match obj.get("$Type") {
        Some(_) => read_type_name(obj, path)?.to_string(),
        None => return Err(CsdlError::missing(path, "$Type")),
    };

    let mut navigation = NavigationProperty {
        name: name.to_string(),
        type_name,
        is_collection: read_bool(obj, "$Collection", path)?.unwrap_or(false),
        nullable: read_bool(obj, "$Nullable", path)?.unwrap_or(false),
        partner: read_string(obj, "$Partner", path)?,
        contains_target: read_bool(obj, "$ContainsTarget", path)?.unwrap_or(false),
        on_delete: None,
        on_delete_annotations: Vec::new(),
        referential_constraints: Vec::new(),
        annotations: Vec::new(),
    };
    let mut pending = PendingAnnotations::default();

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Kind" | "$Type" | "$Collection" | "$Nullable" | "$Partner" | "$ContainsTarget" => {}
            "$OnDelete" => {
                let Value::String(action) = value else {
                    return Err(CsdlError::shape(&member_path, "string", json_type_name(value)));
                };
                let action = OnDeleteAction::parse(action).ok_or_else(|| {
                    CsdlError::shape(
                        &member_path,
                        "Cascade, None, SetNull or SetDefault",
                        format!("\"{}\"", action),
                    )
                })?;
                navigation.on_delete = Some(action);
            }
            "$ReferentialConstraint" => {
                navigation.referential_constraints =
                    build_referential_constraints(cx, value, &member_path)?;
            }
            _ if key.starts_with('$') && !key.contains('@') => cx.unknown(path, key),
            _ if cx.annotation_member(
                key,
                value,
                path,
                &mut navigation.annotations,
                Some(&mut pending),
            )? => {}
            _ => cx.unknown(path, key),
        }
    }

    // `$OnDelete@Term` is the only sibling annotation a navigation property object holds
    let on_delete = &mut navigation.on_delete_annotations;
    let has_on_delete = navigation.on_delete.is_some();
    pending.resolve(|target, annotation| {
        if target == "$OnDelete" && has_on_delete {
            on_delete.push(annotation);
            true
        } else {
            false
        }
    })?;

    Ok(navigation)
}

/// `$ReferentialConstraint`: dependent property → principal property, with
/// `Dependent@Term` annotations.
fn build_referential_constraints(
    cx: &mut Context<'_>,
    value: &Value,
    path: &str,
) -> Result<Vec<ReferentialConstraint>, CsdlError> {
    let obj = expect_object(value, path)?;
    let mut constraints: Vec<ReferentialConstraint> = Vec::new();
    let mut pending = PendingAnnotations::default();
    let mut ignored = Vec::new();

    for (key, value) in obj {
        if cx.annotation_member(key, value, path, &mut ignored, Some(&mut pending))? {
            continue;
        }
        let Value::String(principal) = value else {
            return Err(CsdlError::shape(
                &child_path(path, key),
                "string",
                json_type_name(value),
            ));
        };
        constraints.push(ReferentialConstraint {
            property: key.clone(),
            referenced_property: principal.clone(),
            annotations: Vec::new(),
        });
    }

    for annotation in ignored {
        cx.unknown(path, &format!("@{}", annotation.term));
    }

    pending.resolve(|target, annotation| {
        match constraints.iter_mut().find(|c| c.property == target) {
            Some(constraint) => {
                constraint.annotations.push(annotation);
                true
            }
            None => false,
        }
    })?;

    Ok(constraints)
}
