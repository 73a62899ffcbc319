//! Decoder expression trees.
//!
//! Built from the same walker plans as the type model, so each decoder node
//! lines up with the type node it produces. Evaluated by `runtime` and
//! rendered by `codegen`.
use crate::ir::{Scalar, Wrap};
use crate::naming::union_constructor;
use crate::walker::{FieldKind, FieldPlan, SelectionPlan, UnionPlan};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoder {
    Scalar(Scalar),
    Enum(String),                                   // schema enum name
    Field { wire: String, decoder: Box<Decoder> },  // reads one key of an object
    Optional(Box<Decoder>),                         // soft: failure, null or absence
    List(Box<Decoder>),
    Record(RecordDecoder),
    Union(UnionDecoder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constructor {
    Alias(String),   // record alias used as a function
    Anonymous,       // `\a_ b_ -> { a = a_, b = b_ }`
    Tagged(String),  // union constructor around an anonymous record
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDecoder {
    pub constructor: Constructor,
    pub fields: Vec<FieldDecoder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecoder {
    pub name: String,
    pub decoder: Decoder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDecoder {
    pub union_name: String,
    pub cases: Vec<UnionCase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionCase {
    /// `__typename` value.
    pub tag: String,
    pub decoder: RecordDecoder,
}

/// Key read to dispatch union variants.
pub const TYPENAME: &str = "__typename";

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Top-level decoder of an operation. Spreads make the result an extensible
/// alias, which has no record constructor, so those use a lambda.
pub fn operation_decoder(result_type: &str, plan: &SelectionPlan) -> Decoder {
    let constructor = if plan.spreads.is_empty() {
        Constructor::Alias(result_type.to_string())
    } else {
        Constructor::Anonymous
    };
    Decoder::Record(record_decoder(plan, constructor))
}

pub fn record_decoder(plan: &SelectionPlan, constructor: Constructor) -> RecordDecoder {
    RecordDecoder {
        constructor,
        fields: plan.fields.iter().map(field_decoder).collect(),
    }
}

pub fn union_decoder(plan: &UnionPlan) -> UnionDecoder {
    UnionDecoder {
        union_name: plan.union_name.clone(),
        cases: plan
            .variants
            .iter()
            .map(|variant| UnionCase {
                tag: variant.member.clone(),
                decoder: record_decoder(
                    &variant.plan,
                    Constructor::Tagged(union_constructor(&plan.union_name, &variant.member)),
                ),
            })
            .collect(),
    }
}

/// A nullable field is `Optional(Field(..))` so a missing key is soft too.
fn field_decoder(field: &FieldPlan) -> FieldDecoder {
    let inner = match &field.kind {
        FieldKind::Leaf(scalar) => Decoder::Scalar(*scalar),
        FieldKind::Enum(name) => Decoder::Enum(name.clone()),
        FieldKind::Object(plan) => Decoder::Record(record_decoder(plan, Constructor::Anonymous)),
        FieldKind::Union(plan) => Decoder::Union(union_decoder(plan)),
    };
    let nullable = field.wrapping.is_optional();
    let value = field
        .wrapping
        .clone()
        .required()
        .apply(inner, |layer, decoder| match layer {
            Wrap::Optional => Decoder::Optional(Box::new(decoder)),
            Wrap::List => Decoder::List(Box::new(decoder)),
        });
    let read = Decoder::Field {
        wire: field.wire.clone(),
        decoder: Box::new(value),
    };
    FieldDecoder {
        name: field.name.clone(),
        decoder: if nullable {
            Decoder::Optional(Box::new(read))
        } else {
            read
        },
    }
}

impl Decoder {
    pub fn field(wire: impl Into<String>, decoder: Decoder) -> Self {
        Decoder::Field {
            wire: wire.into(),
            decoder: Box::new(decoder),
        }
    }

    pub fn optional(decoder: Decoder) -> Self {
        Decoder::Optional(Box::new(decoder))
    }

    pub fn list(decoder: Decoder) -> Self {
        Decoder::List(Box::new(decoder))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
