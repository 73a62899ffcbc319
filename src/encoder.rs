//! Encoder expression trees for operation variables.
use std::collections::{HashMap, HashSet};

use async_graphql_parser::types::VariableDefinition;

use crate::ir::{Scalar, Wrap, Wrapping};
use crate::lower::scalar_for;
use crate::naming::elm_safe_name;
use crate::schema::{Schema, TypeDef, TypeRef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoder {
    Scalar(Scalar),
    Enum(String),               // reverse table keyed by constructor
    Object(Vec<ObjectField>),   // every declared input field
    List(Box<Encoder>),
    Optional(Box<Encoder>),     // `Nothing` encodes as null
    Named(String),              // declared encoder of a recursive input type
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectField {
    /// Elm record field.
    pub name: String,
    /// JSON key.
    pub wire: String,
    pub encoder: Encoder,
}

/// Encoder of one operation variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEncoder {
    pub name: String,
    pub wire: String,
    pub encoder: Encoder,
    /// Nullable with a default value: encoded through an explicit
    /// `Just` / `Nothing` branch at the call site.
    pub defaulted: bool,
}

/// Builds encoders from schema types. Cuts recursion the same way as
/// [`crate::lower::TypeMapper`], so both agree on which types are `Named`.
pub struct EncoderGenerator<'s> {
    schema: &'s Schema,
    in_progress: HashSet<String>,
    done: HashMap<String, Encoder>,
    cycles: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'s> EncoderGenerator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            in_progress: HashSet::new(),
            done: HashMap::new(),
            cycles: Vec::new(),
        }
    }

    pub fn param(&mut self, variable: &VariableDefinition) -> ParamEncoder {
        let ty = TypeRef::from_ast(&variable.var_type.node);
        let wire = variable.name.node.to_string();
        ParamEncoder {
            name: elm_safe_name(&wire),
            wire,
            encoder: self.encoder(&ty),
            defaulted: variable.default_value.is_some() && !ty.is_non_null(),
        }
    }

    pub fn encoder(&mut self, ty: &TypeRef) -> Encoder {
        let inner = self.named(ty.named_type());
        Wrapping::of(ty).apply(inner, |layer, encoder| match layer {
            Wrap::Optional => Encoder::Optional(Box::new(encoder)),
            Wrap::List => Encoder::List(Box::new(encoder)),
        })
    }

    pub fn cycles(&self) -> &[String] {
        &self.cycles
    }

    /// Full object encoder of an input type already visited.
    pub fn declared(&self, name: &str) -> Option<&Encoder> {
        self.done.get(name)
    }

    fn named(&mut self, name: &str) -> Encoder {
        let schema = self.schema;
        match schema.get(name) {
            Some(TypeDef::Enum(def)) => Encoder::Enum(def.name.clone()),
            Some(def @ (TypeDef::InputObject(_) | TypeDef::Object(_) | TypeDef::Interface(_))) => {
                if let Some(done) = self.done.get(name) {
                    return done.clone();
                }
                if !self.in_progress.insert(name.to_string()) {
                    if !self.cycles.iter().any(|c| c == name) {
                        self.cycles.push(name.to_string());
                    }
                    return Encoder::Named(name.to_string());
                }
                let fields: Vec<_> = def
                    .fields()
                    .map(|fields| fields.values().cloned().collect())
                    .unwrap_or_default();
                let object = Encoder::Object(
                    fields
                        .iter()
                        .map(|field| ObjectField {
                            name: elm_safe_name(&field.name),
                            wire: field.name.clone(),
                            encoder: self.encoder(&field.ty),
                        })
                        .collect(),
                );
                self.in_progress.remove(name);
                self.done.insert(name.to_string(), object.clone());
                object
            }
            Some(TypeDef::Scalar(_) | TypeDef::Union(_)) | None => Encoder::Scalar(scalar_for(name)),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::TypeMapper;
    use async_graphql_parser::parse_query;

    fn schema() -> Schema {
        Schema::from_sdl(
            "type Query { a: Int }
             scalar UnixTimestamp
             enum Size { SMALL }
             input Filter { type: Size and: [Filter!] since: UnixTimestamp }",
        )
        .expect("valid sdl")
    }

    fn params(query: &str) -> Vec<ParamEncoder> {
        let schema = schema();
        let doc = parse_query(query).expect("valid query");
        let (_, op) = doc.operations.iter().next().expect("one operation");
        let mut generator = EncoderGenerator::new(&schema);
        op.node
            .variable_definitions
            .iter()
            .map(|variable| generator.param(&variable.node))
            .collect()
    }

    #[test]
    fn defaults_only_matter_for_nullable_variables() {
        let params = params("query Q($a: Int = 1, $b: Int! = 2, $c: Int) { a }");
        let defaulted: Vec<_> = params.iter().map(|p| p.defaulted).collect();
        assert_eq!(defaulted, [true, false, false]);
        assert_eq!(params[1].encoder, Encoder::Scalar(Scalar::Int));
        assert_eq!(
            params[2].encoder,
            Encoder::Optional(Box::new(Encoder::Scalar(Scalar::Int)))
        );
    }

    #[test]
    fn recursive_inputs_become_named() {
        let params = params("query Q($filter: Filter!) { a }");
        let Encoder::Object(fields) = &params[0].encoder else {
            panic!("expected an object encoder");
        };
        assert_eq!(fields[0].name, "type_");
        assert_eq!(fields[0].wire, "type");
        assert_eq!(
            fields[1].encoder,
            Encoder::Optional(Box::new(Encoder::List(Box::new(Encoder::Named(
                "Filter".into()
            )))))
        );
        assert_eq!(
            fields[2].encoder,
            Encoder::Optional(Box::new(Encoder::Scalar(Scalar::Posix)))
        );
    }

    #[test]
    fn cuts_match_the_type_mapper() {
        let schema = schema();
        let ty = TypeRef::named("Filter");
        let mut generator = EncoderGenerator::new(&schema);
        let mut mapper = TypeMapper::new(&schema);
        generator.encoder(&ty);
        mapper.map(&ty);
        assert_eq!(generator.cycles(), mapper.cycles());
        assert!(generator.declared("Filter").is_some());
    }
}
