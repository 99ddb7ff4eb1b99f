//! Entity containers.
//!
//! Container members carry no `$Kind`; they are classified by shape:
//! `$Collection: true` is an entity set, `$Action` an action import,
//! `$Function` a function import, and anything else a singleton.

use serde_json::{Map, Value};

use crate::annotation::PendingAnnotations;
use crate::edm::{
    Annotation, EntityContainer, EntitySet, NavigationPropertyBinding, OperationImport,
    OperationImportKind, Singleton,
};
use crate::error::CsdlError;
use crate::reader::{expect_object, Context};
use crate::type_ref::{read_bool, read_string};
use crate::types::{child_path, json_type_name};

pub(crate) fn build_entity_container(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<EntityContainer, CsdlError> {
    let mut container = EntityContainer {
        name: name.to_string(),
        extends: None,
        entity_sets: Vec::new(),
        singletons: Vec::new(),
        operation_imports: Vec::new(),
        annotations: Vec::new(),
    };
    let mut pending = PendingAnnotations::default();

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Kind" => {}
            "$Extends" => container.extends = read_string(obj, key, path)?,
            _ if key.starts_with('$') => cx.unknown(path, key),
            _ if cx.annotation_member(
                key,
                value,
                path,
                &mut container.annotations,
                Some(&mut pending),
            )? => {}
            member => {
                let member_obj = expect_object(value, &member_path)?;
                if read_bool(member_obj, "$Collection", &member_path)? == Some(true) {
                    let set = build_entity_set(cx, member, member_obj, &member_path)?;
                    container.entity_sets.push(set);
                } else if member_obj.contains_key("$Action") {
                    let import = build_operation_import(
                        cx,
                        member,
                        member_obj,
                        OperationImportKind::Action,
                        &member_path,
                    )?;
                    container.operation_imports.push(import);
                } else if member_obj.contains_key("$Function") {
                    let import = build_operation_import(
                        cx,
                        member,
                        member_obj,
                        OperationImportKind::Function,
                        &member_path,
                    )?;
                    container.operation_imports.push(import);
                } else {
                    let singleton = build_singleton(cx, member, member_obj, &member_path)?;
                    container.singletons.push(singleton);
                }
            }
        }
    }

    pending.resolve(|target, annotation| attach_to_child(&mut container, target, annotation))?;

    Ok(container)
}

fn attach_to_child(container: &mut EntityContainer, target: &str, annotation: Annotation) -> bool {
    let slot = if let Some(set) = container.entity_sets.iter_mut().find(|s| s.name == target) {
        &mut set.annotations
    } else if let Some(singleton) = container.singletons.iter_mut().find(|s| s.name == target) {
        &mut singleton.annotations
    } else if let Some(import) = container
        .operation_imports
        .iter_mut()
        .find(|i| i.name == target)
    {
        &mut import.annotations
    } else {
        return false;
    };
    slot.push(annotation);
    true
}

fn required_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, CsdlError> {
    read_string(obj, key, path)?.ok_or_else(|| CsdlError::missing(path, key))
}

fn build_entity_set(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<EntitySet, CsdlError> {
    let mut set = EntitySet {
        name: name.to_string(),
        entity_type: required_string(obj, "$Type", path)?,
        include_in_service_document: read_bool(obj, "$IncludeInServiceDocument", path)?
            .unwrap_or(true),
        navigation_property_bindings: Vec::new(),
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            "$Collection" | "$Type" | "$IncludeInServiceDocument" => {}
            "$NavigationPropertyBinding" => {
                set.navigation_property_bindings =
                    build_bindings(value, &child_path(path, key))?;
            }
            _ if cx.annotation_member(key, value, path, &mut set.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(set)
}

fn build_singleton(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Singleton, CsdlError> {
    let mut singleton = Singleton {
        name: name.to_string(),
        type_name: required_string(obj, "$Type", path)?,
        nullable: read_bool(obj, "$Nullable", path)?.unwrap_or(false),
        navigation_property_bindings: Vec::new(),
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            "$Type" | "$Nullable" | "$Collection" => {}
            "$NavigationPropertyBinding" => {
                singleton.navigation_property_bindings =
                    build_bindings(value, &child_path(path, key))?;
            }
            _ if cx.annotation_member(key, value, path, &mut singleton.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(singleton)
}

fn build_operation_import(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    kind: OperationImportKind,
    path: &str,
) -> Result<OperationImport, CsdlError> {
    let operation_member = match kind {
        OperationImportKind::Action => "$Action",
        OperationImportKind::Function => "$Function",
    };

    let mut import = OperationImport {
        kind,
        name: name.to_string(),
        operation: required_string(obj, operation_member, path)?,
        entity_set: read_string(obj, "$EntitySet", path)?,
        include_in_service_document: false,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            k if k == operation_member => {}
            "$EntitySet" => {}
            "$IncludeInServiceDocument" if kind == OperationImportKind::Function => {
                import.include_in_service_document = read_bool(obj, key, path)?.unwrap_or(false);
            }
            _ if cx.annotation_member(key, value, path, &mut import.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(import)
}

/// `$NavigationPropertyBinding`: binding path → target navigation source.
fn build_bindings(value: &Value, path: &str) -> Result<Vec<NavigationPropertyBinding>, CsdlError> {
    expect_object(value, path)?
        .iter()
        .map(|(binding_path, target)| match target {
            Value::String(target) => Ok(NavigationPropertyBinding {
                path: binding_path.clone(),
                target: target.clone(),
            }),
            other => Err(CsdlError::shape(
                &child_path(path, binding_path),
                "string",
                json_type_name(other),
            )),
        })
        .collect()
}
