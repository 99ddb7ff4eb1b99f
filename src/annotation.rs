//! Annotation member names and annotation value expressions.
//!
//! # Member names
//!
//! | Member name | Meaning |
//! |-------------|---------|
//! | `Name` | plain member |
//! | `@Term` / `@Term#Q` | annotation on the enclosing object |
//! | `Name@Term` / `Name@Term#Q` | annotation on the sibling member `Name` |
//!
//! # Expressions
//!
//! JSON scalars are constants, arrays are collections, and objects are
//! dispatched on the first discriminator member found, in the order of
//! [`EXPRESSION_DISCRIMINATORS`]. Objects without one are records.

use serde_json::{Map, Number, Value};

use crate::edm::{Annotation, ConstantKind, Expression, PathKind, PropertyValue};
use crate::error::CsdlError;
use crate::type_ref::{read_type_reference, resolve_type_reference, Facets};
use crate::types::{child_path, json_type_name};

/// Object members that turn an object into a non-record expression, by priority.
pub const EXPRESSION_DISCRIMINATORS: &[&str] = &[
    "$Path",
    "$Apply",
    "$Cast",
    "$If",
    "$IsOf",
    "$LabeledElement",
    "$LabeledElementReference",
    "$AnnotationPath",
    "$NavigationPropertyPath",
    "$PropertyPath",
    "$ModelElementPath",
    "$UrlRef",
];

/// A member name split on its `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberName<'a> {
    Plain(&'a str),
    Annotation {
        /// Sibling member the annotation applies to; `None` for the enclosing object.
        target: Option<&'a str>,
        term: &'a str,
        qualifier: Option<&'a str>,
    },
    /// `Name@Term@Other`: an annotation of an annotation.
    Nested(&'a str),
}

impl<'a> MemberName<'a> {
    pub fn parse(name: &'a str) -> Self {
        let Some(at) = name.find('@') else {
            return MemberName::Plain(name);
        };
        let target = (at > 0).then(|| &name[..at]);
        let rest = &name[at + 1..];
        if rest.contains('@') {
            return MemberName::Nested(name);
        }
        let (term, qualifier) = match rest.rsplit_once('#') {
            Some((term, qualifier)) => (term, Some(qualifier)),
            None => (rest, None),
        };
        MemberName::Annotation {
            target,
            term,
            qualifier,
        }
    }
}

/// Build an annotation from a term, qualifier and JSON value.
pub fn build_annotation(
    term: &str,
    qualifier: Option<&str>,
    value: &Value,
    path: &str,
) -> Result<Annotation, CsdlError> {
    Ok(Annotation {
        term: term.to_string(),
        qualifier: qualifier.map(String::from),
        value: build_expression(value, path)?,
        location: path.to_string(),
    })
}

/// Annotations waiting for their sibling target member to be built.
///
/// Member order in a document is free, so `Name@Term` can come before `Name`.
#[derive(Debug, Default)]
pub(crate) struct PendingAnnotations {
    entries: Vec<(String, String, Annotation)>,
}

impl PendingAnnotations {
    pub(crate) fn push(&mut self, target: &str, path: &str, annotation: Annotation) {
        self.entries
            .push((target.to_string(), path.to_string(), annotation));
    }

    /// Attach every pending annotation through `attach`, which returns false
    /// when no member with that name exists.
    pub(crate) fn resolve<F>(self, mut attach: F) -> Result<(), CsdlError>
    where
        F: FnMut(&str, Annotation) -> bool,
    {
        for (target, path, annotation) in self.entries {
            if !attach(&target, annotation) {
                return Err(CsdlError::AnnotationTargetNotFound { path, target });
            }
        }
        Ok(())
    }
}

/// Build an expression from a JSON value.
pub fn build_expression(value: &Value, path: &str) -> Result<Expression, CsdlError> {
    match value {
        Value::Null => Ok(Expression::constant(ConstantKind::Null, "null")),
        Value::Bool(b) => Ok(Expression::constant(ConstantKind::Boolean, b.to_string())),
        Value::Number(n) => Ok(number_constant(n)),
        Value::String(s) => Ok(Expression::constant(ConstantKind::String, s.clone())),
        Value::Array(items) => Ok(Expression::Collection {
            items: build_items(items, path)?,
        }),
        Value::Object(obj) => build_object_expression(obj, path),
    }
}

/// Numbers keep their source text; the kind follows its shape.
fn number_constant(n: &Number) -> Expression {
    let text = n.to_string();
    let kind = if text.contains(['e', 'E']) {
        ConstantKind::Floating
    } else if text.contains('.') {
        ConstantKind::Decimal
    } else {
        ConstantKind::Integer
    };
    Expression::constant(kind, text)
}

fn build_items(items: &[Value], path: &str) -> Result<Vec<Expression>, CsdlError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| build_expression(item, &child_path(path, &i.to_string())))
        .collect()
}

fn build_object_expression(obj: &Map<String, Value>, path: &str) -> Result<Expression, CsdlError> {
    let Some(&key) = EXPRESSION_DISCRIMINATORS
        .iter()
        .find(|key| obj.contains_key(**key))
    else {
        return build_record(obj, path);
    };
    let value = &obj[key];
    let value_path = child_path(path, key);

    match key {
        "$Path" => path_expression(PathKind::Path, value, &value_path),
        "$AnnotationPath" => path_expression(PathKind::AnnotationPath, value, &value_path),
        "$NavigationPropertyPath" => {
            path_expression(PathKind::NavigationPropertyPath, value, &value_path)
        }
        "$PropertyPath" => path_expression(PathKind::PropertyPath, value, &value_path),
        "$ModelElementPath" => path_expression(PathKind::ModelElementPath, value, &value_path),
        "$Apply" => {
            let Value::Array(args) = value else {
                return Err(CsdlError::shape(&value_path, "array", json_type_name(value)));
            };
            let function = match obj.get("$Function") {
                None => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    return Err(CsdlError::shape(
                        &child_path(path, "$Function"),
                        "string",
                        json_type_name(other),
                    ))
                }
            };
            Ok(Expression::Apply {
                function,
                arguments: build_items(args, &value_path)?,
            })
        }
        "$Cast" => Ok(Expression::Cast {
            type_ref: read_type_reference(obj, path)?.0,
            operand: Box::new(build_expression(value, &value_path)?),
        }),
        "$IsOf" => Ok(Expression::IsOfType {
            type_ref: read_type_reference(obj, path)?.0,
            operand: Box::new(build_expression(value, &value_path)?),
        }),
        "$If" => {
            let Value::Array(branches) = value else {
                return Err(CsdlError::shape(&value_path, "array", json_type_name(value)));
            };
            if branches.len() < 2 || branches.len() > 3 {
                return Err(CsdlError::shape(
                    &value_path,
                    "array of 2 or 3 expressions",
                    format!("array of {}", branches.len()),
                ));
            }
            let branch = |i: usize| {
                build_expression(&branches[i], &child_path(&value_path, &i.to_string()))
            };
            Ok(Expression::If {
                test: Box::new(branch(0)?),
                if_true: Box::new(branch(1)?),
                if_false: if branches.len() == 3 {
                    Some(Box::new(branch(2)?))
                } else {
                    None
                },
            })
        }
        "$LabeledElement" => {
            let name = match obj.get("$Name") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(CsdlError::shape(
                        &child_path(path, "$Name"),
                        "string",
                        json_type_name(other),
                    ))
                }
                None => return Err(CsdlError::missing(path, "$Name")),
            };
            Ok(Expression::LabeledElement {
                name,
                operand: Box::new(build_expression(value, &value_path)?),
            })
        }
        "$LabeledElementReference" => match value {
            Value::String(s) => Ok(Expression::LabeledElementReference { name: s.clone() }),
            other => Err(CsdlError::shape(&value_path, "string", json_type_name(other))),
        },
        "$UrlRef" => Ok(Expression::UrlRef {
            operand: Box::new(build_expression(value, &value_path)?),
        }),
        _ => build_record(obj, path),
    }
}

fn path_expression(kind: PathKind, value: &Value, path: &str) -> Result<Expression, CsdlError> {
    match value {
        Value::String(s) => Ok(Expression::Path {
            kind,
            path: s.clone(),
        }),
        other => Err(CsdlError::shape(path, "string", json_type_name(other))),
    }
}

fn build_record(obj: &Map<String, Value>, path: &str) -> Result<Expression, CsdlError> {
    let mut type_ref = None;
    let mut properties = Vec::new();

    for (key, value) in obj {
        let value_path = child_path(path, key);
        if key == "@type" || key == "@odata.type" {
            let Value::String(raw) = value else {
                return Err(CsdlError::shape(&value_path, "string", json_type_name(value)));
            };
            let name = raw.rsplit_once('#').map_or(raw.as_str(), |(_, name)| name);
            type_ref = Some(resolve_type_reference(name, &Facets::default()));
            continue;
        }
        if key.contains('@') {
            // annotations inside records are not modelled
            tracing::debug!(path = %value_path, "skipping record annotation");
            continue;
        }
        properties.push(PropertyValue {
            name: key.clone(),
            value: build_expression(value, &value_path)?,
        });
    }

    Ok(Expression::Record {
        type_ref,
        properties,
    })
}
