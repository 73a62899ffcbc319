//! Structural shapes of types, decoders and encoders.
//!
//! A decoder must produce exactly the type it is declared with, and an
//! encoder must consume exactly its parameter type. Projecting all three to a
//! [`Shape`] makes that checkable: fragment extensions and aliases are
//! expanded, record fields compare by name, union variants by member.
use std::collections::BTreeMap;

use crate::decoder::{Decoder, RecordDecoder};
use crate::emit::Module;
use crate::encoder::Encoder;
use crate::ir::{Scalar, Ty};
use crate::naming::capitalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Scalar(Scalar),
    Enum(String),
    List(Box<Shape>),
    Optional(Box<Shape>),
    Record(BTreeMap<String, Shape>),
    /// Only variants with at least one field; the others carry no data.
    Union {
        name: String,
        variants: BTreeMap<String, Shape>,
    },
    /// A declared type not expanded further, e.g. a recursive input.
    Opaque(String),
}

pub fn of_ty(ty: &Ty, module: &Module) -> Shape {
    match ty {
        Ty::Scalar(scalar) => Shape::Scalar(*scalar),
        Ty::Enum(name) => Shape::Enum(name.clone()),
        Ty::Named(name) => match module.alias(name) {
            Some(aliased) => of_ty(aliased, module),
            None => Shape::Opaque(name.clone()),
        },
        Ty::List(inner) => Shape::List(Box::new(of_ty(inner, module))),
        Ty::Optional(inner) => Shape::Optional(Box::new(of_ty(inner, module))),
        Ty::Record { fields, .. } => Shape::Record(
            fields
                .iter()
                .map(|field| (field.name.clone(), of_ty(&field.ty, module)))
                .collect(),
        ),
        Ty::Union { name, variants } => Shape::Union {
            name: name.clone(),
            variants: variants
                .iter()
                .map(|variant| (variant.member.clone(), of_ty(&variant.ty, module)))
                .filter(|(_, shape)| !is_empty_record(shape))
                .collect(),
        },
        Ty::Extend { fragment, base } => {
            let name = capitalize(fragment);
            let fragment_ty = module
                .fragments()
                .find(|decl| decl.name == name)
                .map(|decl| of_ty(&decl.ty, module));
            match (fragment_ty, of_ty(base, module)) {
                (Some(Shape::Record(mut fields)), Shape::Record(own)) => {
                    fields.extend(own);
                    Shape::Record(fields)
                }
                (_, base) => base,
            }
        }
        Ty::App { constructor, .. } => Shape::Opaque(constructor.clone()),
    }
}

pub fn of_decoder(decoder: &Decoder) -> Shape {
    match decoder {
        Decoder::Scalar(scalar) => Shape::Scalar(*scalar),
        Decoder::Enum(name) => Shape::Enum(name.clone()),
        Decoder::Field { decoder, .. } => of_decoder(decoder),
        Decoder::Optional(inner) => Shape::Optional(Box::new(of_decoder(inner))),
        Decoder::List(inner) => Shape::List(Box::new(of_decoder(inner))),
        Decoder::Record(record) => of_record(record),
        Decoder::Union(union) => Shape::Union {
            name: union.union_name.clone(),
            variants: union
                .cases
                .iter()
                .map(|case| (case.tag.clone(), of_record(&case.decoder)))
                .filter(|(_, shape)| !is_empty_record(shape))
                .collect(),
        },
    }
}

pub fn of_encoder(encoder: &Encoder) -> Shape {
    match encoder {
        Encoder::Scalar(scalar) => Shape::Scalar(*scalar),
        Encoder::Enum(name) => Shape::Enum(name.clone()),
        Encoder::Object(fields) => Shape::Record(
            fields
                .iter()
                .map(|field| (field.name.clone(), of_encoder(&field.encoder)))
                .collect(),
        ),
        Encoder::List(inner) => Shape::List(Box::new(of_encoder(inner))),
        Encoder::Optional(inner) => Shape::Optional(Box::new(of_encoder(inner))),
        Encoder::Named(input) => Shape::Opaque(capitalize(input)),
    }
}

fn of_record(record: &RecordDecoder) -> Shape {
    Shape::Record(
        record
            .fields
            .iter()
            .map(|field| (field.name.clone(), of_decoder(&field.decoder)))
            .collect(),
    )
}

fn is_empty_record(shape: &Shape) -> bool {
    matches!(shape, Shape::Record(fields) if fields.is_empty())
}
