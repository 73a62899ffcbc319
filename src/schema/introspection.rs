//! Schema model from an introspection query result.
//!
//! Accepts both the full response (`{"data": {"__schema": …}}`) and the bare
//! `{"__schema": …}` object.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use super::{
    EnumDef, FieldDef, InputObjectDef, ObjectDef, ScalarDef, Schema, TypeDef, TypeRef, UnionDef,
};
use crate::error::SchemaError;
use crate::path_de::from_value_with_path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    query_type: Option<NamedRef>,
    #[serde(default)]
    mutation_type: Option<NamedRef>,
    #[serde(default)]
    subscription_type: Option<NamedRef>,
    types: Vec<FullType>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullType {
    kind: String,
    name: String,
    #[serde(default)]
    fields: Option<Vec<IntrospectionField>>,
    #[serde(default)]
    input_fields: Option<Vec<IntrospectionField>>,
    #[serde(default)]
    enum_values: Option<Vec<NamedRef>>,
    #[serde(default)]
    possible_types: Option<Vec<NamedRef>>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionField {
    name: String,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    of_type: Option<Box<IntrospectionTypeRef>>,
}

pub fn build_schema(source: &str) -> Result<Schema, SchemaError> {
    let root: Value = crate::path_de::from_str_with_path(source)?;
    let schema_value = root
        .pointer("/data/__schema")
        .or_else(|| root.pointer("/__schema"))
        .unwrap_or(&root);
    let raw: IntrospectionSchema = from_value_with_path(schema_value)?;

    let mut schema = Schema::new();
    for full in &raw.types {
        schema.insert(convert_type(full)?);
    }
    schema.set_roots(
        raw.query_type.map(|r| r.name),
        raw.mutation_type.map(|r| r.name),
        raw.subscription_type.map(|r| r.name),
    );
    schema.infer_roots()?;
    Ok(schema)
}

fn convert_type(full: &FullType) -> Result<TypeDef, SchemaError> {
    let name = full.name.clone();
    let def = match full.kind.as_str() {
        "SCALAR" => TypeDef::Scalar(ScalarDef { name }),
        "ENUM" => TypeDef::Enum(EnumDef {
            name,
            values: full
                .enum_values
                .iter()
                .flatten()
                .map(|value| value.name.clone())
                .collect(),
        }),
        "OBJECT" => TypeDef::Object(ObjectDef {
            fields: convert_fields(&full.name, full.fields.as_deref())?,
            name,
        }),
        "INTERFACE" => TypeDef::Interface(ObjectDef {
            fields: convert_fields(&full.name, full.fields.as_deref())?,
            name,
        }),
        "INPUT_OBJECT" => TypeDef::InputObject(InputObjectDef {
            fields: convert_fields(&full.name, full.input_fields.as_deref())?,
            name,
        }),
        "UNION" => TypeDef::Union(UnionDef {
            name,
            members: full
                .possible_types
                .iter()
                .flatten()
                .map(|member| member.name.clone())
                .collect(),
        }),
        other => {
            return Err(SchemaError::UnsupportedKind {
                kind: other.to_string(),
                name,
            });
        }
    };
    Ok(def)
}

fn convert_fields(
    owner: &str,
    fields: Option<&[IntrospectionField]>,
) -> Result<IndexMap<String, FieldDef>, SchemaError> {
    let mut out = IndexMap::new();
    for field in fields.unwrap_or_default() {
        let ty = convert_type_ref(&field.ty)
            .ok_or_else(|| SchemaError::MalformedTypeRef(format!("{owner}.{}", field.name)))?;
        out.insert(
            field.name.clone(),
            FieldDef {
                name: field.name.clone(),
                ty,
            },
        );
    }
    Ok(out)
}

fn convert_type_ref(ty: &IntrospectionTypeRef) -> Option<TypeRef> {
    match ty.kind.as_str() {
        "NON_NULL" => Some(TypeRef::non_null(convert_type_ref(ty.of_type.as_deref()?)?)),
        "LIST" => Some(TypeRef::list(convert_type_ref(ty.of_type.as_deref()?)?)),
        _ => ty.name.clone().map(TypeRef::Named),
    }
}
