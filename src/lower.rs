use std::collections::{HashMap, HashSet};

use crate::ir::{Field, Scalar, Ty, Variant, Wrapping};
use crate::naming::{capitalize, elm_safe_name};
use crate::schema::{Schema, TypeDef, TypeRef};

/// Timestamp scalar carried as milliseconds since epoch.
pub const TIMESTAMP_SCALAR: &str = "UnixTimestamp";

/// Fixed classification of scalar names; unknown scalars are strings.
pub fn scalar_for(name: &str) -> Scalar {
    match name {
        "Int" => Scalar::Int,
        "Float" => Scalar::Float,
        "Boolean" => Scalar::Bool,
        "ID" | "String" | "DateTime" => Scalar::String,
        TIMESTAMP_SCALAR => Scalar::Posix,
        _ => Scalar::String,
    }
}

/// Maps schema type references to type model nodes.
///
/// Composite types are memoized by name. A type reached again while its own
/// record is still being built becomes `Ty::Named`, which terminates
/// self-referential schemas.
pub struct TypeMapper<'s> {
    schema: &'s Schema,
    in_progress: HashSet<String>,
    done: HashMap<String, Ty>,
    cycles: Vec<String>,
}

impl<'s> TypeMapper<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            in_progress: HashSet::new(),
            done: HashMap::new(),
            cycles: Vec::new(),
        }
    }

    pub fn map(&mut self, ty: &TypeRef) -> Ty {
        let inner = self.map_named(ty.named_type());
        Wrapping::of(ty).apply_ty(inner)
    }

    /// Names that were cut into `Ty::Named` references, in discovery order.
    pub fn cycles(&self) -> &[String] {
        &self.cycles
    }

    /// Full record of a type already mapped, for declaring cycle targets.
    pub fn mapped(&self, name: &str) -> Option<&Ty> {
        self.done.get(name)
    }

    fn map_named(&mut self, name: &str) -> Ty {
        let schema = self.schema;
        let Some(def) = schema.get(name) else {
            return Ty::Scalar(scalar_for(name));
        };
        match def {
            TypeDef::Scalar(_) => Ty::Scalar(scalar_for(name)),
            TypeDef::Enum(_) => Ty::Enum(name.to_string()),
            TypeDef::Union(union) => Ty::Union {
                name: union.name.clone(),
                variants: union
                    .members
                    .iter()
                    .map(|member| Variant {
                        member: member.clone(),
                        ty: Ty::named(capitalize(member)),
                    })
                    .collect(),
            },
            TypeDef::Object(_) | TypeDef::Interface(_) | TypeDef::InputObject(_) => {
                if let Some(done) = self.done.get(name) {
                    return done.clone();
                }
                if !self.in_progress.insert(name.to_string()) {
                    if !self.cycles.iter().any(|c| c == name) {
                        self.cycles.push(name.to_string());
                    }
                    return Ty::named(capitalize(name));
                }
                let fields = def
                    .fields()
                    .map(|fields| fields.values().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                let record = Ty::record(
                    fields
                        .iter()
                        .map(|field| Field {
                            name: elm_safe_name(&field.name),
                            ty: self.map(&field.ty),
                        })
                        .collect(),
                );
                self.in_progress.remove(name);
                self.done.insert(name.to_string(), record.clone());
                record
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Scalar;

    fn schema() -> Schema {
        Schema::from_sdl(
            "type Query { a: Int }
             input Filter { name: String and: [Filter!] stamp: UnixTimestamp! }
             scalar UnixTimestamp
             enum Color { RED }",
        )
        .expect("valid sdl")
    }

    #[test]
    fn scalars_follow_the_fixed_table() {
        assert_eq!(scalar_for("Boolean"), Scalar::Bool);
        assert_eq!(scalar_for("DateTime"), Scalar::String);
        assert_eq!(scalar_for("UnixTimestamp"), Scalar::Posix);
        assert_eq!(scalar_for("Json"), Scalar::String);
    }

    #[test]
    fn list_nullability_composes() {
        let schema = schema();
        let mut mapper = TypeMapper::new(&schema);
        let strict = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("Int"))));
        assert_eq!(mapper.map(&strict), Ty::List(Box::new(Ty::Scalar(Scalar::Int))));

        let loose = TypeRef::list(TypeRef::named("Int"));
        assert_eq!(
            mapper.map(&loose),
            Ty::Optional(Box::new(Ty::List(Box::new(Ty::Optional(Box::new(
                Ty::Scalar(Scalar::Int)
            ))))))
        );
    }

    #[test]
    fn recursive_input_objects_terminate() {
        let schema = schema();
        let mut mapper = TypeMapper::new(&schema);
        let ty = mapper.map(&TypeRef::non_null(TypeRef::named("Filter")));
        let Ty::Record { fields, .. } = ty else {
            panic!("expected a record, got {ty:?}");
        };
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "and", "stamp"]);
        assert_eq!(
            fields[1].ty,
            Ty::Optional(Box::new(Ty::List(Box::new(Ty::named("Filter")))))
        );
        assert_eq!(fields[2].ty, Ty::Scalar(Scalar::Posix));
        assert_eq!(mapper.cycles(), ["Filter".to_string()]);
    }

    #[test]
    fn enums_map_to_references() {
        let schema = schema();
        let mut mapper = TypeMapper::new(&schema);
        assert_eq!(
            mapper.map(&TypeRef::named("Color")),
            Ty::Optional(Box::new(Ty::Enum("Color".into())))
        );
    }
}
