//! Type references: a qualified type name plus facets, classified into the
//! primitive type families of the EDM.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CsdlError;
use crate::types::{child_path, json_type_name, DEFAULT_TYPE};

/// Members of a typed object that feed [`Facets`] and the type name.
pub const TYPE_MEMBERS: &[&str] = &[
    "$Type",
    "$Collection",
    "$Nullable",
    "$MaxLength",
    "$Precision",
    "$Scale",
    "$Unicode",
    "$SRID",
];

/// Reserved name of the untyped type.
pub const UNTYPED: &str = "Edm.Untyped";

/// Primitive types without facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Guid,
    Stream,
    Date,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
}

/// Primitive types with a precision facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemporalKind {
    DateTimeOffset,
    Duration,
    TimeOfDay,
}

/// Geography and geometry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpatialKind {
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
}

const PRIMITIVES: &[(&str, PrimitiveKind)] = &[
    ("Edm.Boolean", PrimitiveKind::Boolean),
    ("Edm.Byte", PrimitiveKind::Byte),
    ("Edm.Guid", PrimitiveKind::Guid),
    ("Edm.Stream", PrimitiveKind::Stream),
    ("Edm.Date", PrimitiveKind::Date),
    ("Edm.SByte", PrimitiveKind::SByte),
    ("Edm.Int16", PrimitiveKind::Int16),
    ("Edm.Int32", PrimitiveKind::Int32),
    ("Edm.Int64", PrimitiveKind::Int64),
    ("Edm.Single", PrimitiveKind::Single),
    ("Edm.Double", PrimitiveKind::Double),
];

const TEMPORALS: &[(&str, TemporalKind)] = &[
    ("Edm.DateTimeOffset", TemporalKind::DateTimeOffset),
    ("Edm.Duration", TemporalKind::Duration),
    ("Edm.TimeOfDay", TemporalKind::TimeOfDay),
];

const SPATIALS: &[(&str, SpatialKind)] = &[
    ("Edm.Geography", SpatialKind::Geography),
    ("Edm.GeographyPoint", SpatialKind::GeographyPoint),
    ("Edm.GeographyLineString", SpatialKind::GeographyLineString),
    ("Edm.GeographyPolygon", SpatialKind::GeographyPolygon),
    ("Edm.GeographyMultiPoint", SpatialKind::GeographyMultiPoint),
    ("Edm.GeographyMultiLineString", SpatialKind::GeographyMultiLineString),
    ("Edm.GeographyMultiPolygon", SpatialKind::GeographyMultiPolygon),
    ("Edm.GeographyCollection", SpatialKind::GeographyCollection),
    ("Edm.Geometry", SpatialKind::Geometry),
    ("Edm.GeometryPoint", SpatialKind::GeometryPoint),
    ("Edm.GeometryLineString", SpatialKind::GeometryLineString),
    ("Edm.GeometryPolygon", SpatialKind::GeometryPolygon),
    ("Edm.GeometryMultiPoint", SpatialKind::GeometryMultiPoint),
    ("Edm.GeometryMultiLineString", SpatialKind::GeometryMultiLineString),
    ("Edm.GeometryMultiPolygon", SpatialKind::GeometryMultiPolygon),
    ("Edm.GeometryCollection", SpatialKind::GeometryCollection),
];

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| *n == name).map(|(_, kind)| *kind)
}

/// `$MaxLength` facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxLength {
    Bounded(u64),
    /// Symbolic `max`: no upper bound.
    Max,
}

/// `$Scale` facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Fixed(u32),
    Variable,
    Floating,
}

/// `$SRID` facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Srid {
    Fixed(u32),
    Variable,
}

/// Facet bag read from a typed object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<MaxLength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srid: Option<Srid>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub collection: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Facets {
    /// Read facets from the members of a typed object.
    ///
    /// Absent facets stay unset; `$Collection` and `$Nullable` default to false.
    pub fn read(obj: &Map<String, Value>, path: &str) -> Result<Self, CsdlError> {
        Ok(Self {
            max_length: read_max_length(obj, path)?,
            precision: read_u32(obj, "$Precision", path)?,
            scale: read_scale(obj, path)?,
            unicode: read_bool(obj, "$Unicode", path)?,
            srid: read_srid(obj, path)?,
            collection: read_bool(obj, "$Collection", path)?.unwrap_or(false),
            nullable: read_bool(obj, "$Nullable", path)?.unwrap_or(false),
        })
    }
}

/// A classified type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeReference {
    Primitive {
        primitive: PrimitiveKind,
    },
    Binary {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<MaxLength>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<MaxLength>,
        unicode: bool,
    },
    Temporal {
        temporal: TemporalKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    Decimal {
        #[serde(skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        scale: Option<Scale>,
    },
    Spatial {
        spatial: SpatialKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        srid: Option<Srid>,
    },
    Untyped,
    /// Enum, complex, entity or type definition; resolved against the model later.
    Named {
        name: String,
        facets: Facets,
    },
    Collection {
        element: Box<TypeReference>,
    },
}

impl TypeReference {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeReference::Primitive { primitive: kind }
    }

    pub fn collection(element: TypeReference) -> Self {
        TypeReference::Collection {
            element: Box::new(element),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeReference::Collection { .. })
    }

    /// The element type of a collection, or the type itself.
    pub fn element(&self) -> &TypeReference {
        match self {
            TypeReference::Collection { element } => element,
            other => other,
        }
    }

    /// Qualified name of a [`TypeReference::Named`] element type.
    pub fn named_type(&self) -> Option<&str> {
        match self.element() {
            TypeReference::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Classify a bare type name and its facets.
///
/// The collection flag wraps the element type, which is itself resolved
/// without the flag.
pub fn resolve_type_reference(name: &str, facets: &Facets) -> TypeReference {
    if facets.collection {
        let element = Facets {
            collection: false,
            ..facets.clone()
        };
        return TypeReference::collection(resolve_type_reference(name, &element));
    }

    if let Some(kind) = lookup(PRIMITIVES, name) {
        return TypeReference::primitive(kind);
    }
    if let Some(kind) = lookup(TEMPORALS, name) {
        return TypeReference::Temporal {
            temporal: kind,
            precision: facets.precision,
        };
    }
    if let Some(kind) = lookup(SPATIALS, name) {
        return TypeReference::Spatial {
            spatial: kind,
            srid: facets.srid,
        };
    }

    match name {
        "Edm.Binary" => TypeReference::Binary {
            max_length: facets.max_length,
        },
        "Edm.String" => TypeReference::String {
            max_length: facets.max_length,
            unicode: facets.unicode.unwrap_or(true),
        },
        "Edm.Decimal" => TypeReference::Decimal {
            precision: facets.precision,
            scale: facets.scale,
        },
        UNTYPED => TypeReference::Untyped,
        _ => TypeReference::Named {
            name: name.to_string(),
            facets: facets.clone(),
        },
    }
}

/// Read `$Type` and facets from a typed object and classify them.
///
/// An absent `$Type` means `Edm.String`.
pub fn read_type_reference(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<(TypeReference, Facets), CsdlError> {
    let name = read_type_name(obj, path)?;
    let facets = Facets::read(obj, path)?;
    Ok((resolve_type_reference(name, &facets), facets))
}

pub(crate) fn read_type_name<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
) -> Result<&'a str, CsdlError> {
    match obj.get("$Type") {
        None => Ok(DEFAULT_TYPE),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(CsdlError::shape(
            &child_path(path, "$Type"),
            "string",
            json_type_name(other),
        )),
    }
}

pub(crate) fn read_bool(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<bool>, CsdlError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(CsdlError::shape(
            &child_path(path, key),
            "boolean",
            json_type_name(other),
        )),
    }
}

pub(crate) fn read_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, CsdlError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CsdlError::shape(
            &child_path(path, key),
            "string",
            json_type_name(other),
        )),
    }
}

fn read_u32(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<u32>, CsdlError> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => as_u32(value).map(Some).ok_or_else(|| {
            CsdlError::shape(&child_path(path, key), "non-negative integer", describe(value))
        }),
    }
}

fn read_max_length(obj: &Map<String, Value>, path: &str) -> Result<Option<MaxLength>, CsdlError> {
    match obj.get("$MaxLength") {
        None => Ok(None),
        Some(Value::String(s)) if s == "max" => Ok(Some(MaxLength::Max)),
        Some(value) => value
            .as_u64()
            .map(|n| Some(MaxLength::Bounded(n)))
            .ok_or_else(|| {
                CsdlError::shape(
                    &child_path(path, "$MaxLength"),
                    "non-negative integer or \"max\"",
                    describe(value),
                )
            }),
    }
}

fn read_scale(obj: &Map<String, Value>, path: &str) -> Result<Option<Scale>, CsdlError> {
    match obj.get("$Scale") {
        None => Ok(None),
        Some(Value::String(s)) if s == "variable" => Ok(Some(Scale::Variable)),
        Some(Value::String(s)) if s == "floating" => Ok(Some(Scale::Floating)),
        Some(value) => as_u32(value).map(|n| Some(Scale::Fixed(n))).ok_or_else(|| {
            CsdlError::shape(
                &child_path(path, "$Scale"),
                "non-negative integer, \"variable\" or \"floating\"",
                describe(value),
            )
        }),
    }
}

fn read_srid(obj: &Map<String, Value>, path: &str) -> Result<Option<Srid>, CsdlError> {
    match obj.get("$SRID") {
        None => Ok(None),
        Some(Value::String(s)) if s == "variable" => Ok(Some(Srid::Variable)),
        Some(value) => as_u32(value).map(|n| Some(Srid::Fixed(n))).ok_or_else(|| {
            CsdlError::shape(
                &child_path(path, "$SRID"),
                "non-negative integer or \"variable\"",
                describe(value),
            )
        }),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => json_type_name(other).to_string(),
    }
}
