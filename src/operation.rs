//! Actions and functions: one [`Operation`] per overload object.

use serde_json::{Map, Value};

use crate::edm::{Operation, OperationKind, Parameter, ReturnType};
use crate::error::CsdlError;
use crate::reader::{expect_object, Context};
use crate::type_ref::{read_bool, read_string, read_type_reference, TYPE_MEMBERS};
use crate::types::{child_path, json_type_name, OPERATION_KINDS};

/// Build every overload of the schema member `name`.
///
/// # Errors
///
/// An overload that is not an object, or whose `$Kind` is not `Action` or
/// `Function`, rejects the document.
pub(crate) fn build_operations(
    cx: &mut Context<'_>,
    name: &str,
    overloads: &[Value],
    path: &str,
) -> Result<Vec<Operation>, CsdlError> {
    overloads
        .iter()
        .enumerate()
        .map(|(i, overload)| {
            let overload_path = child_path(path, &i.to_string());
            let obj = expect_object(overload, &overload_path)?;
            build_operation(cx, name, obj, &overload_path)
        })
        .collect()
}

fn build_operation(
    cx: &mut Context<'_>,
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Operation, CsdlError> {
    let kind = match obj.get("$Kind") {
        Some(Value::String(k)) if k == "Action" => OperationKind::Action,
        Some(Value::String(k)) if k == "Function" => OperationKind::Function {
            is_composable: read_bool(obj, "$IsComposable", path)?.unwrap_or(false),
        },
        Some(other) => {
            return Err(CsdlError::shape(
                &child_path(path, "$Kind"),
                &OPERATION_KINDS.join(" or "),
                match other {
                    Value::String(s) => format!("\"{}\"", s),
                    v => json_type_name(v).to_string(),
                },
            ))
        }
        None => return Err(CsdlError::missing(path, "$Kind")),
    };

    let mut operation = Operation {
        name: name.to_string(),
        kind,
        is_bound: read_bool(obj, "$IsBound", path)?.unwrap_or(false),
        entity_set_path: read_string(obj, "$EntitySetPath", path)?,
        parameters: Vec::new(),
        return_type: None,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        let member_path = child_path(path, key);
        match key.as_str() {
            "$Kind" | "$IsBound" | "$EntitySetPath" => {}
            "$IsComposable" if matches!(kind, OperationKind::Function { .. }) => {}
            "$Parameter" => {
                let Value::Array(parameters) = value else {
                    return Err(CsdlError::shape(&member_path, "array", json_type_name(value)));
                };
                operation.parameters = parameters
                    .iter()
                    .enumerate()
                    .map(|(i, parameter)| {
                        build_parameter(cx, parameter, &child_path(&member_path, &i.to_string()))
                    })
                    .collect::<Result<_, _>>()?;
            }
            "$ReturnType" => {
                operation.return_type = Some(build_return_type(cx, value, &member_path)?);
            }
            _ if cx.annotation_member(key, value, path, &mut operation.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(operation)
}

fn build_parameter(cx: &mut Context<'_>, value: &Value, path: &str) -> Result<Parameter, CsdlError> {
    let obj = expect_object(value, path)?;
    let name = read_string(obj, "$Name", path)?.ok_or_else(|| CsdlError::missing(path, "$Name"))?;
    let (type_ref, facets) = read_type_reference(obj, path)?;

    let mut parameter = Parameter {
        name,
        type_ref,
        nullable: facets.nullable,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            "$Name" => {}
            k if TYPE_MEMBERS.contains(&k) => {}
            _ if cx.annotation_member(key, value, path, &mut parameter.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(parameter)
}

fn build_return_type(cx: &mut Context<'_>, value: &Value, path: &str) -> Result<ReturnType, CsdlError> {
    let obj = expect_object(value, path)?;
    let (type_ref, facets) = read_type_reference(obj, path)?;

    let mut return_type = ReturnType {
        type_ref,
        nullable: facets.nullable,
        annotations: Vec::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            k if TYPE_MEMBERS.contains(&k) => {}
            _ if cx.annotation_member(key, value, path, &mut return_type.annotations, None)? => {}
            _ => cx.unknown(path, key),
        }
    }

    Ok(return_type)
}
