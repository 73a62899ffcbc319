//! Schema model from GraphQL SDL.
use async_graphql_parser::parse_schema;
use async_graphql_parser::types::{
    FieldDefinition, InputValueDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::Positioned;
use indexmap::IndexMap;

use super::{
    EnumDef, FieldDef, InputObjectDef, ObjectDef, ScalarDef, Schema, TypeDef, TypeRef, UnionDef,
};
use crate::error::SchemaError;

pub fn build_schema(source: &str) -> Result<Schema, SchemaError> {
    let document = parse_schema(source)?;
    let mut schema = Schema::new();
    let mut roots = (None, None, None);

    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Schema(schema_def) => {
                let schema_def = schema_def.node;
                let name = |n: Option<Positioned<async_graphql_value::Name>>| {
                    n.map(|n| n.node.to_string())
                };
                roots = (
                    name(schema_def.query).or(roots.0),
                    name(schema_def.mutation).or(roots.1),
                    name(schema_def.subscription).or(roots.2),
                );
            }
            TypeSystemDefinition::Type(type_def) => {
                let type_def = type_def.node;
                let name = type_def.name.node.to_string();
                let def = match type_def.kind {
                    TypeKind::Scalar => TypeDef::Scalar(ScalarDef { name }),
                    TypeKind::Object(object) => TypeDef::Object(ObjectDef {
                        name,
                        fields: output_fields(&object.fields),
                    }),
                    TypeKind::Interface(interface) => TypeDef::Interface(ObjectDef {
                        name,
                        fields: output_fields(&interface.fields),
                    }),
                    TypeKind::Union(union) => TypeDef::Union(UnionDef {
                        name,
                        members: union.members.iter().map(|m| m.node.to_string()).collect(),
                    }),
                    TypeKind::Enum(enum_type) => TypeDef::Enum(EnumDef {
                        name,
                        values: enum_type
                            .values
                            .iter()
                            .map(|v| v.node.value.node.to_string())
                            .collect(),
                    }),
                    TypeKind::InputObject(input) => TypeDef::InputObject(InputObjectDef {
                        name,
                        fields: input_fields(&input.fields),
                    }),
                };
                if type_def.extend {
                    extend(&mut schema, def);
                } else {
                    schema.insert(def);
                }
            }
            TypeSystemDefinition::Directive(_) => {}
        }
    }

    schema.set_roots(roots.0, roots.1, roots.2);
    schema.infer_roots()?;
    Ok(schema)
}

fn output_fields(fields: &[Positioned<FieldDefinition>]) -> IndexMap<String, FieldDef> {
    fields
        .iter()
        .map(|field| {
            let name = field.node.name.node.to_string();
            let ty = TypeRef::from_ast(&field.node.ty.node);
            (name.clone(), FieldDef { name, ty })
        })
        .collect()
}

fn input_fields(fields: &[Positioned<InputValueDefinition>]) -> IndexMap<String, FieldDef> {
    fields
        .iter()
        .map(|field| {
            let name = field.node.name.node.to_string();
            let ty = TypeRef::from_ast(&field.node.ty.node);
            (name.clone(), FieldDef { name, ty })
        })
        .collect()
}

/// `extend type` / `extend enum` / … merge into an existing definition.
fn extend(schema: &mut Schema, extension: TypeDef) {
    let merged = match (schema.get(extension.name()).cloned(), extension) {
        (Some(TypeDef::Object(mut base)), TypeDef::Object(ext)) => {
            base.fields.extend(ext.fields);
            TypeDef::Object(base)
        }
        (Some(TypeDef::Interface(mut base)), TypeDef::Interface(ext)) => {
            base.fields.extend(ext.fields);
            TypeDef::Interface(base)
        }
        (Some(TypeDef::InputObject(mut base)), TypeDef::InputObject(ext)) => {
            base.fields.extend(ext.fields);
            TypeDef::InputObject(base)
        }
        (Some(TypeDef::Enum(mut base)), TypeDef::Enum(ext)) => {
            base.values.extend(ext.values);
            TypeDef::Enum(base)
        }
        (Some(TypeDef::Union(mut base)), TypeDef::Union(ext)) => {
            base.members.extend(ext.members);
            TypeDef::Union(base)
        }
        (_, ext) => ext,
    };
    schema.insert(merged);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scalars_and_default_roots() {
        let schema = build_schema(
            "type Query { hero(id: ID!): Character }
             type Mutation { like(id: ID!): Int! }
             interface Character { id: ID! name: String }
             enum Episode { NEWHOPE EMPIRE }",
        )
        .expect("valid sdl");
        assert_eq!(schema.query_type(), Some("Query"));
        assert_eq!(schema.mutation_type(), Some("Mutation"));
        assert!(matches!(schema.get("Int"), Some(TypeDef::Scalar(_))));
        assert!(matches!(schema.get("Character"), Some(TypeDef::Interface(_))));
        assert_eq!(
            schema.field_type("Character", "id").map(ToString::to_string),
            Some("ID!".to_string())
        );
    }

    #[test]
    fn explicit_schema_roots_win() {
        let schema = build_schema(
            "schema { query: Root }
             type Root { ok: Boolean }
             extend type Root { more: Int }",
        )
        .expect("valid sdl");
        assert_eq!(schema.query_type(), Some("Root"));
        assert!(schema.field_type("Root", "more").is_some());
        assert!(schema.field_type("Root", "ok").is_some());
    }

    #[test]
    fn missing_query_root_is_an_error() {
        let err = build_schema("type Thing { id: ID }").expect_err("no query root");
        assert!(matches!(err, SchemaError::MissingQueryType));
    }
}
