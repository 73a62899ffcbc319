// Type model for generated code. Decoupled from both the schema and Elm syntax.

use crate::schema::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Float,
    Bool,
    String,
    Posix, // milliseconds since epoch
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Scalar(Scalar),
    Enum(String),            // enum declared once per document
    Named(String),           // reference to a declared alias
    List(Box<Ty>),
    Optional(Box<Ty>),       // never directly wraps another Optional
    Record {
        fields: Vec<Field>,  // declaration order
        row: Option<String>, // extensible record variable (`{ a | … }`)
    },
    Union {
        name: String,
        variants: Vec<Variant>, // one per schema member, member order
    },
    Extend {
        fragment: String,    // fragment's open alias applied to `base`
        base: Box<Ty>,
    },
    App {
        constructor: String, // external application, e.g. `Decoder`, `Response`
        args: Vec<Ty>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub member: String,      // schema type name, also the `__typename` tag
    pub ty: Ty,
}

/// One layer of wrapping, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Optional,
    List,
}

/// The Optional/List layers implied by a schema type reference.
///
/// Every layer that is not directly under `NonNull` is Optional:
/// `[Int!]!` is `[List]`, `[Int]` is `[Optional, List, Optional]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wrapping(Vec<Wrap>);

impl Wrapping {
    pub fn of(ty: &TypeRef) -> Self {
        let mut layers = Vec::new();
        let mut current = ty;
        loop {
            let inner = match current {
                TypeRef::NonNull(inner) => inner.as_ref(),
                other => {
                    layers.push(Wrap::Optional);
                    other
                }
            };
            match inner {
                TypeRef::List(element) => {
                    layers.push(Wrap::List);
                    current = element;
                }
                TypeRef::Named(_) => break,
                // collapsed by `TypeRef::non_null`
                TypeRef::NonNull(_) => break,
            }
        }
        Wrapping(layers)
    }

    /// Prepends an Optional unless the outer layer already is one.
    pub fn optional(mut self) -> Self {
        if !self.is_optional() {
            self.0.insert(0, Wrap::Optional);
        }
        self
    }

    /// Drops an outer Optional.
    pub fn required(mut self) -> Self {
        if self.is_optional() {
            self.0.remove(0);
        }
        self
    }

    pub fn is_optional(&self) -> bool {
        self.0.first() == Some(&Wrap::Optional)
    }

    pub fn layers(&self) -> &[Wrap] {
        &self.0
    }

    /// Applies the layers around `inner`, building inside out.
    pub fn apply<T>(&self, inner: T, mut wrap: impl FnMut(Wrap, T) -> T) -> T {
        self.0.iter().rev().fold(inner, |acc, layer| wrap(*layer, acc))
    }

    pub fn apply_ty(&self, inner: Ty) -> Ty {
        self.apply(inner, |layer, ty| match layer {
            Wrap::Optional => Ty::Optional(Box::new(ty)),
            Wrap::List => Ty::List(Box::new(ty)),
        })
    }
}

impl Ty {
    pub fn record(fields: Vec<Field>) -> Self {
        Ty::Record { fields, row: None }
    }

    pub fn empty_record() -> Self {
        Ty::record(Vec::new())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Ty::Named(name.into())
    }

    pub fn app(constructor: impl Into<String>, args: Vec<Ty>) -> Self {
        Ty::App {
            constructor: constructor.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeRef {
        TypeRef::named("Int")
    }

    #[test]
    fn non_null_list_of_non_null_has_no_optional() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(int())));
        let wrapping = Wrapping::of(&ty);
        assert_eq!(wrapping.layers(), &[Wrap::List]);
        assert_eq!(
            wrapping.apply_ty(Ty::Scalar(Scalar::Int)),
            Ty::List(Box::new(Ty::Scalar(Scalar::Int)))
        );
    }

    #[test]
    fn nullable_list_of_nullable_is_optional_twice() {
        let ty = TypeRef::list(int());
        let wrapping = Wrapping::of(&ty);
        assert_eq!(
            wrapping.layers(),
            &[Wrap::Optional, Wrap::List, Wrap::Optional]
        );
    }

    #[test]
    fn optional_is_never_doubled() {
        let wrapping = Wrapping::of(&int()).optional().optional();
        assert_eq!(wrapping.layers(), &[Wrap::Optional]);
        assert_eq!(
            Wrapping::of(&TypeRef::non_null(int())).optional().layers(),
            &[Wrap::Optional]
        );
    }
}
