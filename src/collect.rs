//! Document-wide discovery of the enums, unions and fragments that need a
//! declaration in the generated module.
//!
//! The registry is keyed by schema name so each declaration is emitted once,
//! in the order it was first reached.
use std::collections::HashSet;

use async_graphql_parser::types::{
    ExecutableDocument, FragmentDefinition, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql_parser::{Pos, Positioned};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::TranslateError;
use crate::naming::{capitalize, enum_constructor};
use crate::navigator::TypeNavigator;
use crate::schema::{Schema, TypeDef, TypeRef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub const ANONYMOUS_OPERATION: &str = "AnonymousQuery";

/// One operation of the document, named.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'d> {
    pub name: &'d str,
    pub definition: &'d Positioned<OperationDefinition>,
}

/// The schema plus everything the document defines, in source order.
#[derive(Debug)]
pub struct DocumentContext<'d> {
    pub schema: &'d Schema,
    operations: Vec<OperationRef<'d>>,
    fragments: IndexMap<&'d str, &'d Positioned<FragmentDefinition>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCase {
    /// Value as it appears on the wire.
    pub wire: String,
    pub constructor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub type_name: String,
    pub cases: Vec<EnumCase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDecl {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    pub enums: IndexMap<String, EnumDecl>,
    pub unions: IndexMap<String, UnionDecl>,
    /// Every spread fragment, transitively.
    pub fragments: IndexSet<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'d> DocumentContext<'d> {
    /// Operations and fragments are kept in source order.
    pub fn new(schema: &'d Schema, document: &'d ExecutableDocument) -> Result<Self, TranslateError> {
        let mut operations: Vec<OperationRef<'d>> = document
            .operations
            .iter()
            .map(|(name, definition)| OperationRef {
                name: name.map(|name| name.as_str()).unwrap_or(ANONYMOUS_OPERATION),
                definition,
            })
            .collect();
        operations.sort_by_key(|op| (op.definition.pos.line, op.definition.pos.column));
        if let Some(op) = operations
            .iter()
            .find(|op| op.definition.node.ty == OperationType::Subscription)
        {
            return Err(TranslateError::UnsupportedOperation(
                OperationType::Subscription.to_string(),
                op.definition.pos,
            ));
        }

        let mut fragments: Vec<_> = document
            .fragments
            .iter()
            .map(|(name, fragment)| (name.as_str(), fragment))
            .collect();
        fragments.sort_by_key(|(_, fragment)| (fragment.pos.line, fragment.pos.column));

        Ok(Self {
            schema,
            operations,
            fragments: fragments.into_iter().collect(),
        })
    }

    pub fn operations(&self) -> &[OperationRef<'d>] {
        &self.operations
    }

    pub fn fragment(
        &self,
        name: &str,
        pos: Pos,
    ) -> Result<&'d Positioned<FragmentDefinition>, TranslateError> {
        self.fragments
            .get(name)
            .copied()
            .ok_or_else(|| TranslateError::UnknownFragment(name.to_string(), pos))
    }
}

/// Walks every operation once, following spreads into each fragment once.
pub fn collect(ctx: &DocumentContext<'_>) -> Result<Registry, TranslateError> {
    let mut collector = Collector {
        ctx,
        nav: TypeNavigator::new(ctx.schema),
        registry: Registry::default(),
        seen_types: HashSet::new(),
        visited_fragments: HashSet::new(),
    };
    for op in ctx.operations() {
        collector.operation(*op)?;
    }
    debug!(
        enums = collector.registry.enums.len(),
        unions = collector.registry.unions.len(),
        fragments = collector.registry.fragments.len(),
        "collected declarations"
    );
    Ok(collector.registry)
}

struct Collector<'a, 'd> {
    ctx: &'a DocumentContext<'d>,
    nav: TypeNavigator<'d>,
    registry: Registry,
    seen_types: HashSet<String>,
    visited_fragments: HashSet<String>,
}

impl<'a, 'd> Collector<'a, 'd> {
    fn operation(&mut self, op: OperationRef<'d>) -> Result<(), TranslateError> {
        let definition = &op.definition.node;
        for variable in &definition.variable_definitions {
            let ty = TypeRef::from_ast(&variable.node.var_type.node);
            self.enums_for_type(&ty);
        }
        self.nav.enter_operation(definition.ty, op.name, op.definition.pos)?;
        self.selection_set(&definition.selection_set)?;
        self.nav.leave();
        Ok(())
    }

    fn selection_set(&mut self, set: &'d Positioned<SelectionSet>) -> Result<(), TranslateError> {
        self.nav.enter_selection_set();
        if let Some(TypeDef::Union(union)) = self.nav.current_def() {
            self.registry
                .unions
                .entry(union.name.clone())
                .or_insert_with(|| UnionDecl {
                    name: union.name.clone(),
                    members: union.members.clone(),
                });
        }
        for item in &set.node.items {
            match &item.node {
                Selection::Field(field) => {
                    self.nav.enter_field(field)?;
                    if let Some(ty) = self.nav.current_type().cloned() {
                        self.enums_for_type(&ty);
                    }
                    if !field.node.selection_set.node.items.is_empty() {
                        self.selection_set(&field.node.selection_set)?;
                    }
                    self.nav.leave();
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    self.registry.fragments.insert(name.to_string());
                    if self.visited_fragments.insert(name.to_string()) {
                        let fragment = self.ctx.fragment(name, spread.pos)?;
                        self.nav.enter_fragment(fragment)?;
                        self.selection_set(&fragment.node.selection_set)?;
                        self.nav.leave();
                    }
                }
                Selection::InlineFragment(inline) => {
                    self.nav.enter_inline_fragment(inline)?;
                    self.selection_set(&inline.node.selection_set)?;
                    self.nav.leave();
                }
            }
        }
        self.nav.leave();
        Ok(())
    }

    /// Enums reachable from `ty`, through every field of composite types.
    fn enums_for_type(&mut self, ty: &TypeRef) {
        let name = ty.named_type();
        let Some(def) = self.ctx.schema.get(name) else {
            return;
        };
        match def {
            TypeDef::Enum(def) => {
                self.registry
                    .enums
                    .entry(def.name.clone())
                    .or_insert_with(|| EnumDecl {
                        name: def.name.clone(),
                        type_name: capitalize(&def.name),
                        cases: def
                            .values
                            .iter()
                            .map(|value| EnumCase {
                                wire: value.clone(),
                                constructor: enum_constructor(&def.name, value),
                            })
                            .collect(),
                    });
            }
            TypeDef::Object(_) | TypeDef::Interface(_) | TypeDef::InputObject(_) => {
                if !self.seen_types.insert(name.to_string()) {
                    return;
                }
                let field_types: Vec<TypeRef> = def
                    .fields()
                    .map(|fields| fields.values().map(|field| field.ty.clone()).collect())
                    .unwrap_or_default();
                for field_ty in &field_types {
                    self.enums_for_type(field_ty);
                }
            }
            TypeDef::Scalar(_) | TypeDef::Union(_) => {}
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_parser::parse_query;

    fn schema() -> Schema {
        Schema::from_sdl(
            "type Query { hero(episode: Episode): Character pets: [Pet!]! search(filter: Filter): [Character] }
             type Character { name: String appearsIn: [Episode] mood: Mood }
             type Dog { name: String! }
             type Cat { lives: Int }
             union Pet = Dog | Cat
             input Filter { size: Size }
             enum Episode { NEWHOPE EMPIRE JEDI }
             enum Mood { HAPPY }
             enum Size { SMALL LARGE }",
        )
        .expect("valid sdl")
    }

    const QUERY: &str = "
        query Search($filter: Filter) { search(filter: $filter) { ...Named } }
        query Pets { pets { __typename ... on Dog { name } } hero { ...Named } }
        fragment Named on Character { name appearsIn }
    ";

    #[test]
    fn finds_enums_unions_and_fragments_once() {
        let schema = schema();
        let doc = parse_query(QUERY).expect("valid query");
        let ctx = DocumentContext::new(&schema, &doc).expect("context");
        let registry = collect(&ctx).expect("collects");

        let enums: Vec<_> = registry.enums.keys().map(String::as_str).collect();
        assert_eq!(enums, ["Size", "Episode", "Mood"]);
        assert_eq!(registry.enums["Episode"].cases[0].constructor, "Episode_Newhope");
        assert_eq!(registry.unions.keys().collect::<Vec<_>>(), ["Pet"]);
        assert_eq!(registry.unions["Pet"].members, ["Dog", "Cat"]);
        assert_eq!(registry.fragments.iter().collect::<Vec<_>>(), ["Named"]);
    }

    #[test]
    fn collecting_twice_is_idempotent() {
        let schema = schema();
        let doc = parse_query(QUERY).expect("valid query");
        let ctx = DocumentContext::new(&schema, &doc).expect("context");
        let first = collect(&ctx).expect("collects");
        let second = collect(&ctx).expect("collects");
        assert_eq!(first, second);
    }

    #[test]
    fn operations_keep_source_order() {
        let schema = schema();
        let doc = parse_query(QUERY).expect("valid query");
        let ctx = DocumentContext::new(&schema, &doc).expect("context");
        let names: Vec<_> = ctx.operations().iter().map(|op| op.name).collect();
        assert_eq!(names, ["Search", "Pets"]);
    }

    #[test]
    fn subscriptions_are_rejected() {
        let schema = schema();
        let doc = parse_query("subscription Live { hero { name } }").expect("valid query");
        let err = DocumentContext::new(&schema, &doc).expect_err("unsupported");
        assert!(matches!(err, TranslateError::UnsupportedOperation(kind, _) if kind == "subscription"));
    }

    #[test]
    fn unknown_fragment_is_reported() {
        let schema = schema();
        let doc = parse_query("{ hero { ...Missing } }").expect("valid query");
        let ctx = DocumentContext::new(&schema, &doc).expect("context");
        let err = collect(&ctx).expect_err("missing fragment");
        assert!(matches!(err, TranslateError::UnknownFragment(name, _) if name == "Missing"));
    }
}
