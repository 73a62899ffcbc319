//! Interpreter for decoder and encoder trees.
//!
//! Evaluates the trees of an emitted [`Module`] against JSON the same way the
//! generated Elm does, so the behavior of a generated module can be checked
//! without an Elm toolchain.
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::{Map, Number, Value};

use crate::collect::EnumDecl;
use crate::decoder::{Constructor, Decoder, RecordDecoder, UnionDecoder, TYPENAME};
use crate::emit::{Declaration, Module};
use crate::encoder::Encoder;
use crate::error::{DecodeError, EncodeError};
use crate::ir::Scalar;
use crate::naming::capitalize;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// An Elm value as produced by a decoder or consumed by an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElmValue {
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    String(String),
    Posix(DateTime<Utc>),
    /// Enum constructor.
    Tag(String),
    Maybe(Option<Box<ElmValue>>),
    List(Vec<ElmValue>),
    Record(IndexMap<String, ElmValue>),
    /// Union variant or recursive input wrapper.
    Variant {
        constructor: String,
        payload: Box<ElmValue>,
    },
}

pub struct Runtime<'m> {
    module: &'m Module,
    enums: HashMap<&'m str, &'m EnumDecl>,
    encoders: HashMap<&'m str, &'m Encoder>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ElmValue {
    pub fn just(value: ElmValue) -> Self {
        ElmValue::Maybe(Some(Box::new(value)))
    }

    pub fn nothing() -> Self {
        ElmValue::Maybe(None)
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, ElmValue)>) -> Self {
        ElmValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn variant(constructor: impl Into<String>, payload: ElmValue) -> Self {
        ElmValue::Variant {
            constructor: constructor.into(),
            payload: Box::new(payload),
        }
    }

    /// Field of a record, looking through a variant payload.
    pub fn get(&self, field: &str) -> Option<&ElmValue> {
        match self {
            ElmValue::Record(fields) => fields.get(field),
            ElmValue::Variant { payload, .. } => payload.get(field),
            _ => None,
        }
    }

    fn kind(&self) -> String {
        match self {
            ElmValue::Int(_) => "Int".to_string(),
            ElmValue::Float(_) => "Float".to_string(),
            ElmValue::Bool(_) => "Bool".to_string(),
            ElmValue::String(_) => "String".to_string(),
            ElmValue::Posix(_) => "Time.Posix".to_string(),
            ElmValue::Tag(tag) => tag.clone(),
            ElmValue::Maybe(_) => "Maybe".to_string(),
            ElmValue::List(_) => "List".to_string(),
            ElmValue::Record(_) => "record".to_string(),
            ElmValue::Variant { constructor, .. } => constructor.clone(),
        }
    }

    fn is_atomic(&self) -> bool {
        match self {
            ElmValue::Maybe(Some(_)) | ElmValue::Posix(_) | ElmValue::Variant { .. } => false,
            ElmValue::Int(n) => *n >= 0,
            ElmValue::Float(f) => f.0 >= 0.0,
            _ => true,
        }
    }
}

impl fmt::Display for ElmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElmValue::Int(n) => write!(f, "{n}"),
            ElmValue::Float(x) => write!(f, "{:?}", x.0),
            ElmValue::Bool(true) => write!(f, "True"),
            ElmValue::Bool(false) => write!(f, "False"),
            ElmValue::String(s) => write!(f, "{s:?}"),
            ElmValue::Posix(time) => {
                write!(f, "Time.millisToPosix {}", time.timestamp_millis())
            }
            ElmValue::Tag(tag) => write!(f, "{tag}"),
            ElmValue::Maybe(None) => write!(f, "Nothing"),
            ElmValue::Maybe(Some(inner)) => write!(f, "Just {}", Atom(inner)),
            ElmValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ElmValue::Record(fields) if fields.is_empty() => write!(f, "{{}}"),
            ElmValue::Record(fields) => {
                write!(f, "{{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                write!(f, " }}")
            }
            ElmValue::Variant {
                constructor,
                payload,
            } => write!(f, "{constructor} {}", Atom(payload)),
        }
    }
}

/// Parenthesizes values that are applications.
struct Atom<'v>(&'v ElmValue);

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_atomic() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl<'m> Runtime<'m> {
    pub fn new(module: &'m Module) -> Self {
        let mut enums = HashMap::new();
        let mut encoders = HashMap::new();
        for declaration in &module.declarations {
            match declaration {
                Declaration::EnumDecoder(decl) => {
                    enums.insert(decl.name.as_str(), decl);
                }
                Declaration::Encoder { input, encoder } => {
                    encoders.insert(input.as_str(), encoder);
                }
                _ => {}
            }
        }
        Self {
            module,
            enums,
            encoders,
        }
    }

    /// Runs the decoder of the named operation over the response data.
    pub fn decode_response(&self, operation: &str, data: &Value) -> Result<ElmValue, DecodeError> {
        let decoder = self
            .module
            .request(operation)
            .and_then(|op| self.module.decoder(&op.decoder_name))
            .ok_or_else(|| DecodeError::UnknownDecoder(operation.to_string()))?;
        self.decode(decoder, data)
    }

    /// The `graphQLParams` object the request function sends.
    pub fn encode_variables(&self, operation: &str, params: &ElmValue) -> Result<Value, EncodeError> {
        let op = self
            .module
            .request(operation)
            .ok_or_else(|| EncodeError::UnknownOperation(operation.to_string()))?;
        let mut object = Map::new();
        for param in &op.params {
            let value = params
                .get(&param.name)
                .ok_or_else(|| EncodeError::MissingField(param.name.clone()))?;
            object.insert(param.wire.clone(), self.encode(&param.encoder, value)?);
        }
        Ok(Value::Object(object))
    }

    pub fn decode(&self, decoder: &Decoder, value: &Value) -> Result<ElmValue, DecodeError> {
        match decoder {
            Decoder::Scalar(scalar) => decode_scalar(*scalar, value),
            Decoder::Enum(name) => {
                let wire = value
                    .as_str()
                    .ok_or_else(|| expected("a STRING", value))?;
                self.enums
                    .get(name.as_str())
                    .and_then(|decl| decl.cases.iter().find(|case| case.wire == wire))
                    .map(|case| ElmValue::Tag(case.constructor.clone()))
                    .ok_or_else(|| DecodeError::UnknownEnumValue {
                        enum_name: name.clone(),
                        value: wire.to_string(),
                    })
            }
            Decoder::Field { wire, decoder } => {
                let object = value
                    .as_object()
                    .ok_or_else(|| expected("an OBJECT", value))?;
                let inner = object
                    .get(wire)
                    .ok_or_else(|| DecodeError::MissingField(wire.clone()))?;
                self.decode(decoder, inner)
                    .map_err(|source| DecodeError::InField {
                        field: wire.clone(),
                        source: Box::new(source),
                    })
            }
            Decoder::Optional(inner) => Ok(ElmValue::Maybe(
                self.decode(inner, value).ok().map(Box::new),
            )),
            Decoder::List(inner) => {
                let items = value.as_array().ok_or_else(|| expected("a LIST", value))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.decode(inner, item)
                            .map_err(|source| DecodeError::AtIndex {
                                index,
                                source: Box::new(source),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(ElmValue::List)
            }
            Decoder::Record(record) => self.decode_record(record, value),
            Decoder::Union(union) => self.decode_union(union, value),
        }
    }

    fn decode_record(&self, record: &RecordDecoder, value: &Value) -> Result<ElmValue, DecodeError> {
        let mut fields = IndexMap::new();
        for field in &record.fields {
            fields.insert(field.name.clone(), self.decode(&field.decoder, value)?);
        }
        let record_value = ElmValue::Record(fields);
        Ok(match &record.constructor {
            Constructor::Alias(_) | Constructor::Anonymous => record_value,
            Constructor::Tagged(tag) => ElmValue::variant(tag.clone(), record_value),
        })
    }

    fn decode_union(&self, union: &UnionDecoder, value: &Value) -> Result<ElmValue, DecodeError> {
        let tag = match self.decode(
            &Decoder::field(TYPENAME, Decoder::Scalar(Scalar::String)),
            value,
        )? {
            ElmValue::String(tag) => tag,
            other => return Err(DecodeError::UnexpectedUnionType(other.to_string())),
        };
        let case = union
            .cases
            .iter()
            .find(|case| case.tag == tag)
            .ok_or(DecodeError::UnexpectedUnionType(tag))?;
        self.decode_record(&case.decoder, value)
    }

    pub fn encode(&self, encoder: &Encoder, value: &ElmValue) -> Result<Value, EncodeError> {
        match (encoder, value) {
            (Encoder::Scalar(Scalar::Int), ElmValue::Int(n)) => Ok(Value::from(*n)),
            (Encoder::Scalar(Scalar::Float), ElmValue::Float(x)) => Number::from_f64(x.0)
                .map(Value::Number)
                .ok_or_else(|| mismatch("Float", value)),
            (Encoder::Scalar(Scalar::Bool), ElmValue::Bool(b)) => Ok(Value::Bool(*b)),
            (Encoder::Scalar(Scalar::String), ElmValue::String(s)) => Ok(Value::String(s.clone())),
            (Encoder::Scalar(Scalar::Posix), ElmValue::Posix(time)) => {
                Ok(Value::from(time.timestamp_millis()))
            }
            (Encoder::Scalar(scalar), _) => Err(mismatch(scalar_label(*scalar), value)),
            (Encoder::Enum(name), ElmValue::Tag(constructor)) => {
                // unknown constructors encode as the empty string
                let wire = self
                    .enums
                    .get(name.as_str())
                    .and_then(|decl| decl.cases.iter().find(|case| &case.constructor == constructor))
                    .map(|case| case.wire.clone())
                    .unwrap_or_default();
                Ok(Value::String(wire))
            }
            (Encoder::Enum(_), _) => Err(mismatch("an enum constructor", value)),
            (Encoder::Object(fields), ElmValue::Record(record)) => {
                let mut object = Map::new();
                for field in fields {
                    let inner = record
                        .get(&field.name)
                        .ok_or_else(|| EncodeError::MissingField(field.name.clone()))?;
                    object.insert(field.wire.clone(), self.encode(&field.encoder, inner)?);
                }
                Ok(Value::Object(object))
            }
            (Encoder::Object(_), _) => Err(mismatch("a record", value)),
            (Encoder::List(inner), ElmValue::List(items)) => items
                .iter()
                .map(|item| self.encode(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Encoder::List(_), _) => Err(mismatch("List", value)),
            (Encoder::Optional(_), ElmValue::Maybe(None)) => Ok(Value::Null),
            (Encoder::Optional(inner), ElmValue::Maybe(Some(item))) => self.encode(inner, item),
            (Encoder::Optional(_), _) => Err(mismatch("Maybe", value)),
            (
                Encoder::Named(input),
                ElmValue::Variant {
                    constructor,
                    payload,
                },
            ) if *constructor == capitalize(input) => {
                let encoder = self
                    .encoders
                    .get(input.as_str())
                    .ok_or_else(|| EncodeError::UnknownEncoder(input.clone()))?;
                self.encode(encoder, payload)
            }
            (Encoder::Named(input), _) => Err(EncodeError::Mismatch {
                expected: "a recursive input wrapper",
                found: format!("{} for {input}", value.kind()),
            }),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn decode_scalar(scalar: Scalar, value: &Value) -> Result<ElmValue, DecodeError> {
    match scalar {
        Scalar::Int => integer(value).map(ElmValue::Int).ok_or_else(|| expected("an INT", value)),
        Scalar::Float => value
            .as_f64()
            .map(|x| ElmValue::Float(OrderedFloat(x)))
            .ok_or_else(|| expected("a FLOAT", value)),
        Scalar::Bool => value
            .as_bool()
            .map(ElmValue::Bool)
            .ok_or_else(|| expected("a BOOL", value)),
        Scalar::String => value
            .as_str()
            .map(|s| ElmValue::String(s.to_string()))
            .ok_or_else(|| expected("a STRING", value)),
        // wire value is seconds
        Scalar::Posix => integer(value)
            .and_then(|seconds| seconds.checked_mul(1000))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(ElmValue::Posix)
            .ok_or_else(|| expected("an INT", value)),
    }
}

fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|x| x.fract() == 0.0 && x.abs() < i64::MAX as f64)
            .map(|x| x as i64)
    })
}

fn expected(expected: &'static str, found: &Value) -> DecodeError {
    DecodeError::Expected {
        expected,
        found: found.to_string(),
    }
}

fn mismatch(expected: &'static str, found: &ElmValue) -> EncodeError {
    EncodeError::Mismatch {
        expected,
        found: found.kind(),
    }
}

fn scalar_label(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Int => "Int",
        Scalar::Float => "Float",
        Scalar::Bool => "Bool",
        Scalar::String => "String",
        Scalar::Posix => "Time.Posix",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::EnumCase;
    use crate::decoder::{FieldDecoder, UnionCase};
    use crate::encoder::ObjectField;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn module() -> Module {
        Module {
            name: "Test".into(),
            exposing: Vec::new(),
            imports: Vec::new(),
            declarations: vec![
                Declaration::EnumDecoder(EnumDecl {
                    name: "Episode".into(),
                    type_name: "Episode".into(),
                    cases: vec![
                        EnumCase {
                            wire: "NEWHOPE".into(),
                            constructor: "Episode_Newhope".into(),
                        },
                        EnumCase {
                            wire: "JEDI".into(),
                            constructor: "Episode_Jedi".into(),
                        },
                    ],
                }),
                Declaration::Encoder {
                    input: "Filter".into(),
                    encoder: Encoder::Object(vec![
                        ObjectField {
                            name: "name".into(),
                            wire: "name".into(),
                            encoder: Encoder::Optional(Box::new(Encoder::Scalar(Scalar::String))),
                        },
                        ObjectField {
                            name: "and".into(),
                            wire: "and".into(),
                            encoder: Encoder::Optional(Box::new(Encoder::List(Box::new(
                                Encoder::Named("Filter".into()),
                            )))),
                        },
                    ]),
                },
            ],
        }
    }

    #[test]
    fn optional_fields_are_soft() {
        let module = module();
        let runtime = Runtime::new(&module);
        let decoder = Decoder::optional(Decoder::field("age", Decoder::Scalar(Scalar::Int)));
        assert_eq!(runtime.decode(&decoder, &json!({})), Ok(ElmValue::nothing()));
        assert_eq!(runtime.decode(&decoder, &json!({"age": null})), Ok(ElmValue::nothing()));
        assert_eq!(
            runtime.decode(&decoder, &json!({"age": 7})),
            Ok(ElmValue::just(ElmValue::Int(7)))
        );
    }

    #[test]
    fn required_fields_fail_when_missing() {
        let module = module();
        let runtime = Runtime::new(&module);
        let decoder = Decoder::field("name", Decoder::Scalar(Scalar::String));
        assert_eq!(
            runtime.decode(&decoder, &json!({})),
            Err(DecodeError::MissingField("name".into()))
        );
    }

    #[test]
    fn timestamps_are_scaled_to_milliseconds() {
        let module = module();
        let runtime = Runtime::new(&module);
        let decoded = runtime
            .decode(&Decoder::Scalar(Scalar::Posix), &json!(1_500_000_000))
            .expect("decodes");
        assert_eq!(decoded.to_string(), "Time.millisToPosix 1500000000000");
        assert_eq!(
            runtime.encode(&Encoder::Scalar(Scalar::Posix), &decoded),
            Ok(json!(1_500_000_000_000_i64))
        );
    }

    #[test]
    fn enums_round_trip_and_unknown_constructors_encode_empty() {
        let module = module();
        let runtime = Runtime::new(&module);
        for wire in ["NEWHOPE", "JEDI"] {
            let decoded = runtime
                .decode(&Decoder::Enum("Episode".into()), &json!(wire))
                .expect("decodes");
            assert_eq!(
                runtime.encode(&Encoder::Enum("Episode".into()), &decoded),
                Ok(json!(wire))
            );
        }
        assert_eq!(
            runtime.decode(&Decoder::Enum("Episode".into()), &json!("EMPIRE")),
            Err(DecodeError::UnknownEnumValue {
                enum_name: "Episode".into(),
                value: "EMPIRE".into()
            })
        );
        assert_eq!(
            runtime.encode(
                &Encoder::Enum("Episode".into()),
                &ElmValue::Tag("Episode_Empire".into())
            ),
            Ok(json!(""))
        );
    }

    #[test]
    fn unions_dispatch_on_typename() {
        let module = module();
        let runtime = Runtime::new(&module);
        let decoder = Decoder::Union(UnionDecoder {
            union_name: "Pet".into(),
            cases: vec![UnionCase {
                tag: "Dog".into(),
                decoder: RecordDecoder {
                    constructor: Constructor::Tagged("Pet_Dog".into()),
                    fields: vec![FieldDecoder {
                        name: "name".into(),
                        decoder: Decoder::field("name", Decoder::Scalar(Scalar::String)),
                    }],
                },
            }],
        });
        let dog = runtime
            .decode(&decoder, &json!({"__typename": "Dog", "name": "Rex"}))
            .expect("decodes");
        assert_eq!(dog.to_string(), r#"Pet_Dog { name = "Rex" }"#);
        assert_eq!(
            runtime.decode(&decoder, &json!({"__typename": "Fish"})),
            Err(DecodeError::UnexpectedUnionType("Fish".into()))
        );
    }

    #[test]
    fn recursive_inputs_encode_through_their_wrapper() {
        let module = module();
        let runtime = Runtime::new(&module);
        let inner = ElmValue::variant(
            "Filter",
            ElmValue::record([
                ("name", ElmValue::just(ElmValue::String("b".into()))),
                ("and", ElmValue::nothing()),
            ]),
        );
        let outer = ElmValue::variant(
            "Filter",
            ElmValue::record([
                ("name", ElmValue::nothing()),
                ("and", ElmValue::just(ElmValue::List(vec![inner]))),
            ]),
        );
        assert_eq!(
            runtime.encode(&Encoder::Named("Filter".into()), &outer),
            Ok(json!({"name": null, "and": [{"name": "b", "and": null}]}))
        );
    }

    #[test]
    fn values_display_in_elm_syntax() {
        let value = ElmValue::record([
            ("hero", ElmValue::just(ElmValue::record([("name", ElmValue::String("Luke".into()))]))),
            ("scores", ElmValue::List(vec![ElmValue::Int(1), ElmValue::Int(-2)])),
            ("ok", ElmValue::Bool(true)),
        ]);
        assert_eq!(
            value.to_string(),
            r#"{ hero = Just { name = "Luke" }, scores = [1,-2], ok = True }"#
        );
        assert_eq!(ElmValue::just(ElmValue::Int(-1)).to_string(), "Just (-1)");
    }
}
