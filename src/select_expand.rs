//! `$select` / `$expand` path binding.
//!
//! A path arrives as a chain of [`PathSegmentToken`]s. The binder resolves
//! each token against the structured type in scope, then merges the result
//! into a [`SelectExpandClause`] owned by the caller.
//!
//! ```
//! use odata_csdl::{read_csdl, PathSegmentToken, SelectExpandBinder, SelectExpandClause};
//! use serde_json::json;
//!
//! let model = read_csdl(&json!({
//!     "$Version": "4.01",
//!     "Sales": {
//!         "Customer": {
//!             "$Kind": "EntityType",
//!             "Name": {},
//!             "Orders": {"$Kind": "NavigationProperty", "$Type": "Sales.Order", "$Collection": true}
//!         },
//!         "Order": {"$Kind": "EntityType", "Total": {"$Type": "Edm.Decimal"}}
//!     }
//! }))
//! .unwrap();
//!
//! let binder = SelectExpandBinder::new(&model);
//! let mut clause = SelectExpandClause::new(false);
//! binder
//!     .expand(&PathSegmentToken::from_path("Orders").unwrap(), "Sales.Customer", &mut clause)
//!     .unwrap();
//! binder
//!     .select(&PathSegmentToken::from_path("Orders/Total").unwrap(), "Sales.Customer", &mut clause)
//!     .unwrap();
//! assert_eq!(clause.items.len(), 1);
//! ```

use serde::Serialize;

use crate::edm::{MemberRef, Model, TypeHandle};
use crate::error::SelectExpandError;
use crate::type_ref::TypeReference;

/// Default bound on type-cast prefixes and nested path depth.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// One lexed segment of a select or expand path, linked to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegmentToken {
    pub identifier: String,
    pub next: Option<Box<PathSegmentToken>>,
}

impl PathSegmentToken {
    pub fn new(identifier: impl Into<String>, next: Option<PathSegmentToken>) -> Self {
        Self {
            identifier: identifier.into(),
            next: next.map(Box::new),
        }
    }

    /// Split a `/`-separated path into a token chain.
    ///
    /// Only splits; it does not understand nested query options.
    pub fn from_path(path: &str) -> Result<Self, SelectExpandError> {
        let mut next = None;
        for identifier in path.trim().rsplit('/') {
            if identifier.is_empty() {
                return Err(SelectExpandError::syntax(format!(
                    "empty segment in path \"{}\"",
                    path
                )));
            }
            next = Some(PathSegmentToken::new(identifier, next));
        }
        next.ok_or_else(|| SelectExpandError::syntax("empty path"))
    }

    /// `$`-prefixed tokens such as `$count` or `$ref`.
    pub fn is_system(&self) -> bool {
        self.identifier.starts_with('$')
    }

    pub fn is_wildcard(&self) -> bool {
        self.identifier == "*"
    }

    /// Namespace-qualified names are type casts.
    pub fn is_type_cast(&self) -> bool {
        self.identifier.contains('.')
    }

    pub fn next(&self) -> Option<&PathSegmentToken> {
        self.next.as_deref()
    }
}

/// A resolved path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "segment", rename_all = "camelCase")]
pub enum PathSegment {
    TypeCast {
        type_name: String,
    },
    /// A structural property: primitive, complex, enum, or a collection of those.
    Property {
        name: String,
        owning_type: String,
        #[serde(rename = "type")]
        type_ref: TypeReference,
    },
    NavigationProperty {
        name: String,
        owning_type: String,
        target_type: String,
        is_collection: bool,
    },
}

impl PathSegment {
    pub fn name(&self) -> &str {
        match self {
            PathSegment::TypeCast { type_name } => type_name,
            PathSegment::Property { name, .. } | PathSegment::NavigationProperty { name, .. } => {
                name
            }
        }
    }
}

/// Type casts followed by one property or navigation property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ODataPath(pub Vec<PathSegment>);

impl ODataPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }
}

impl std::fmt::Display for ODataPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(PathSegment::name).collect();
        f.write_str(&names.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedNavigationSelectItem {
    pub path: ODataPath,
    pub clause: SelectExpandClause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "item", rename_all = "camelCase")]
pub enum SelectItem {
    Path { path: ODataPath },
    Expanded(ExpandedNavigationSelectItem),
    Wildcard,
}

/// The selection at one level of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectExpandClause {
    pub all_selected: bool,
    pub items: Vec<SelectItem>,
}

impl SelectExpandClause {
    pub fn new(all_selected: bool) -> Self {
        Self {
            all_selected,
            items: Vec::new(),
        }
    }

    /// The expansion whose path is exactly `path`.
    pub fn expansion(&self, path: &ODataPath) -> Option<&ExpandedNavigationSelectItem> {
        self.items.iter().find_map(|item| match item {
            SelectItem::Expanded(expanded) if expanded.path == *path => Some(expanded),
            _ => None,
        })
    }

    fn expansion_mut(&mut self, path: &ODataPath) -> Option<&mut ExpandedNavigationSelectItem> {
        self.items.iter_mut().find_map(|item| match item {
            SelectItem::Expanded(expanded) if expanded.path == *path => Some(expanded),
            _ => None,
        })
    }

    /// An expansion of the same navigation property reached through other casts.
    fn has_other_expansion(&self, path: &ODataPath) -> bool {
        let name = path.last().map(PathSegment::name);
        self.items.iter().any(|item| match item {
            SelectItem::Expanded(expanded) => {
                expanded.path != *path && expanded.path.last().map(PathSegment::name) == name
            }
            _ => false,
        })
    }

    fn add_unique(&mut self, item: SelectItem) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }
}

/// Binds select and expand paths against a model.
#[derive(Debug, Clone, Copy)]
pub struct SelectExpandBinder<'m> {
    model: &'m Model,
    max_depth: usize,
}

/// A path whose casts and final member are resolved.
struct Resolved<'m> {
    path: ODataPath,
    member: MemberRef<'m>,
}

impl<'m> SelectExpandBinder<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound the cast prefix length and the nesting depth of one path.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bind a `$select` path starting at the structured type `type_name`.
    ///
    /// # Errors
    ///
    /// Any [`SelectExpandError`] rejects the path and leaves `clause` unchanged.
    pub fn select(
        &self,
        token: &PathSegmentToken,
        type_name: &str,
        clause: &mut SelectExpandClause,
    ) -> Result<(), SelectExpandError> {
        let ty = self.structured_type(type_name)?;
        self.select_at(token, ty, clause, 0)
    }

    /// Bind an `$expand` path starting at the structured type `type_name`.
    ///
    /// A failed path leaves `clause` unchanged.
    pub fn expand(
        &self,
        token: &PathSegmentToken,
        type_name: &str,
        clause: &mut SelectExpandClause,
    ) -> Result<(), SelectExpandError> {
        let ty = self.structured_type(type_name)?;
        let mut scratch = clause.clone();
        self.expand_at(token, ty, &mut scratch, 0)?;
        *clause = scratch;
        Ok(())
    }

    fn structured_type(&self, type_name: &str) -> Result<TypeHandle<'m>, SelectExpandError> {
        self.model
            .find_structured_type(type_name)
            .ok_or_else(|| SelectExpandError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    fn check_depth(&self, depth: usize) -> Result<(), SelectExpandError> {
        if depth >= self.max_depth {
            return Err(SelectExpandError::syntax(format!(
                "path is nested deeper than {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn select_at(
        &self,
        token: &PathSegmentToken,
        ty: TypeHandle<'m>,
        clause: &mut SelectExpandClause,
        depth: usize,
    ) -> Result<(), SelectExpandError> {
        self.check_depth(depth)?;
        if token.is_system() {
            return Err(system_token(token));
        }
        if token.is_wildcard() {
            if token.next.is_some() {
                return Err(SelectExpandError::syntax("\"*\" must end a select path"));
            }
            clause.add_unique(SelectItem::Wildcard);
            return Ok(());
        }

        let (resolved, next) = self.resolve(token, ty)?;
        match resolved.member {
            MemberRef::Navigation(navigation) => {
                if let Some(expanded) = clause.expansion_mut(&resolved.path) {
                    return match next {
                        None => {
                            expanded.clause.all_selected = true;
                            Ok(())
                        }
                        Some(next) => {
                            let target = self.structured_type(&navigation.type_name)?;
                            self.select_at(next, target, &mut expanded.clause, depth + 1)
                        }
                    };
                }
                if clause.has_other_expansion(&resolved.path) {
                    return Err(SelectExpandError::AmbiguousExpansion {
                        navigation: navigation.name.clone(),
                    });
                }
                if next.is_some() {
                    return Err(SelectExpandError::SelectWithoutExpand {
                        navigation: navigation.name.clone(),
                    });
                }
            }
            MemberRef::Property(property) => {
                if next.is_some() {
                    return Err(SelectExpandError::NonNavigationPath {
                        segment: property.name.clone(),
                    });
                }
            }
        }

        clause.add_unique(SelectItem::Path {
            path: resolved.path,
        });
        Ok(())
    }

    fn expand_at(
        &self,
        token: &PathSegmentToken,
        ty: TypeHandle<'m>,
        clause: &mut SelectExpandClause,
        depth: usize,
    ) -> Result<(), SelectExpandError> {
        self.check_depth(depth)?;
        if token.is_system() {
            return Err(system_token(token));
        }
        if token.is_wildcard() {
            return Err(SelectExpandError::syntax("\"*\" is not supported in expand paths"));
        }

        let (resolved, next) = self.resolve(token, ty)?;
        let navigation = match resolved.member {
            MemberRef::Navigation(navigation) => navigation,
            MemberRef::Property(property) => {
                return Err(SelectExpandError::NonNavigationPath {
                    segment: property.name.clone(),
                })
            }
        };

        if clause.expansion(&resolved.path).is_none() {
            clause.items.push(SelectItem::Expanded(ExpandedNavigationSelectItem {
                path: resolved.path.clone(),
                clause: SelectExpandClause::new(false),
            }));
        }

        match (next, clause.expansion_mut(&resolved.path)) {
            (Some(next), Some(expanded)) => {
                let target = self.structured_type(&navigation.type_name)?;
                self.expand_at(next, target, &mut expanded.clause, depth + 1)
            }
            _ => Ok(()),
        }
    }

    /// Consume the cast prefix and the member token.
    ///
    /// Returns the resolved path and the token after the member, if any.
    fn resolve<'t>(
        &self,
        token: &'t PathSegmentToken,
        ty: TypeHandle<'m>,
    ) -> Result<(Resolved<'m>, Option<&'t PathSegmentToken>), SelectExpandError> {
        let mut segments = Vec::new();
        let mut ty = ty;
        let mut current = token;

        while current.is_type_cast() {
            if segments.len() >= self.max_depth {
                return Err(SelectExpandError::syntax(format!(
                    "more than {} type casts in a path",
                    self.max_depth
                )));
            }
            ty = self
                .model
                .find_structured_type(&current.identifier)
                .ok_or_else(|| SelectExpandError::UnknownType {
                    type_name: current.identifier.clone(),
                })?;
            segments.push(PathSegment::TypeCast {
                type_name: ty.qualified_name(),
            });
            current = current.next().ok_or_else(|| {
                SelectExpandError::syntax(format!(
                    "path ends with type cast \"{}\"",
                    current.identifier
                ))
            })?;
        }

        if current.is_system() {
            return Err(system_token(current));
        }
        if current.is_wildcard() {
            return Err(SelectExpandError::syntax("\"*\" cannot follow a type cast"));
        }

        let member = self
            .model
            .find_member(ty, &current.identifier)
            .ok_or_else(|| SelectExpandError::UnknownPathSegment {
                segment: current.identifier.clone(),
                type_name: ty.qualified_name(),
            })?;

        segments.push(match member {
            MemberRef::Property(property) => PathSegment::Property {
                name: property.name.clone(),
                owning_type: ty.qualified_name(),
                type_ref: property.type_ref.clone(),
            },
            MemberRef::Navigation(navigation) => PathSegment::NavigationProperty {
                name: navigation.name.clone(),
                owning_type: ty.qualified_name(),
                target_type: self
                    .model
                    .find_structured_type(&navigation.type_name)
                    .map_or_else(|| navigation.type_name.clone(), |t| t.qualified_name()),
                is_collection: navigation.is_collection,
            },
        });

        Ok((
            Resolved {
                path: ODataPath(segments),
                member,
            },
            current.next(),
        ))
    }
}

fn system_token(token: &PathSegmentToken) -> SelectExpandError {
    SelectExpandError::syntax(format!(
        "system token \"{}\" where a property was expected",
        token.identifier
    ))
}
