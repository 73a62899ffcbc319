//! Queryable schema model.
//!
//! Named types are a closed sum (`TypeDef`) so every consumer matches them
//! exhaustively. Type references keep the GraphQL wrapping structure.
pub mod introspection;
pub mod sdl;

use std::fmt;
use std::path::Path;

use async_graphql_parser::types::{BaseType, Type};
use indexmap::IndexMap;

use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    /// Never wraps another `NonNull`; build it through [`TypeRef::non_null`].
    NonNull(Box<TypeRef>),
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Enum(EnumDef),
    Object(ObjectDef),
    Interface(ObjectDef),
    InputObject(InputObjectDef),
    Union(UnionDef),
}

#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

/// Shared by object and interface types.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub fields: IndexMap<String, FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct InputObjectDef {
    pub name: String,
    pub fields: IndexMap<String, FieldDef>,
}

#[derive(Debug, Clone)]
pub struct UnionDef {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: IndexMap<String, TypeDef>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        match inner {
            TypeRef::NonNull(_) => inner,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    /// Converts a parsed variable/field type.
    pub fn from_ast(ty: &Type) -> Self {
        let base = match &ty.base {
            BaseType::Named(name) => TypeRef::Named(name.to_string()),
            BaseType::List(inner) => TypeRef::list(TypeRef::from_ast(inner)),
        };
        if ty.nullable { base } else { TypeRef::non_null(base) }
    }

    /// The named type under every list and non-null modifier.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Strips one outer `NonNull`.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(def) => &def.name,
            TypeDef::Enum(def) => &def.name,
            TypeDef::Object(def) | TypeDef::Interface(def) => &def.name,
            TypeDef::InputObject(def) => &def.name,
            TypeDef::Union(def) => &def.name,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDef::Scalar(_) | TypeDef::Enum(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDef::Object(_) | TypeDef::Interface(_) | TypeDef::Union(_)
        )
    }

    /// Fields of object, interface and input object types.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            TypeDef::Object(def) | TypeDef::Interface(def) => Some(&def.fields),
            TypeDef::InputObject(def) => Some(&def.fields),
            TypeDef::Scalar(_) | TypeDef::Enum(_) | TypeDef::Union(_) => None,
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        let mut schema = Self::default();
        for name in BUILTIN_SCALARS {
            schema.insert(TypeDef::Scalar(ScalarDef { name: name.to_string() }));
        }
        schema
    }

    /// Loads `.json` files as introspection results and anything else as SDL.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_introspection_json(&source)
        } else {
            Self::from_sdl(&source)
        }
    }

    pub fn from_introspection_json(source: &str) -> Result<Self, SchemaError> {
        introspection::build_schema(source)
    }

    pub fn from_sdl(source: &str) -> Result<Self, SchemaError> {
        sdl::build_schema(source)
    }

    pub fn insert(&mut self, def: TypeDef) {
        self.types.insert(def.name().to_string(), def);
    }

    pub fn set_roots(
        &mut self,
        query: Option<String>,
        mutation: Option<String>,
        subscription: Option<String>,
    ) {
        self.query_type = query;
        self.mutation_type = mutation;
        self.subscription_type = subscription;
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    pub fn query_type(&self) -> Option<&str> {
        self.query_type.as_deref()
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Type of `field` on an object or interface type.
    pub fn field_type(&self, parent: &str, field: &str) -> Option<&TypeRef> {
        match self.get(parent)? {
            TypeDef::Object(def) | TypeDef::Interface(def) => {
                def.fields.get(field).map(|field| &field.ty)
            }
            _ => None,
        }
    }

    /// Fills in conventional root names when the schema did not declare them.
    pub(crate) fn infer_roots(&mut self) -> Result<(), SchemaError> {
        let exists = |schema: &Schema, name: &str| {
            matches!(schema.get(name), Some(TypeDef::Object(_)))
        };
        if self.query_type.is_none() && exists(self, "Query") {
            self.query_type = Some("Query".to_string());
        }
        if self.mutation_type.is_none() && exists(self, "Mutation") {
            self.mutation_type = Some("Mutation".to_string());
        }
        if self.subscription_type.is_none() && exists(self, "Subscription") {
            self.subscription_type = Some("Subscription".to_string());
        }
        if self.query_type.is_none() {
            return Err(SchemaError::MissingQueryType);
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
