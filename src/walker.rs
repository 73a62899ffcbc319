//! Selection-set walker.
//!
//! Turns a selection set into a plan: the deduplicated list of fields with
//! their wrapping and leaf classification, the fragment spreads used as type
//! extensions, and for union contexts the variant per member. The type model
//! and the decoder are both derived from the same plan, which keeps them in
//! step.
use std::collections::HashSet;

use async_graphql_parser::types::{Field, Selection, SelectionSet};
use async_graphql_parser::{Pos, Positioned};
use async_graphql_value::Value;

use crate::collect::{DocumentContext, OperationRef};
use crate::error::TranslateError;
use crate::ir::{self, Scalar, Ty, Wrapping};
use crate::lower::scalar_for;
use crate::naming::elm_safe_name;
use crate::navigator::TypeNavigator;
use crate::schema::{TypeDef, TypeRef, UnionDef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    /// Elm-safe output name.
    pub name: String,
    /// Response key: the alias, else the field name.
    pub wire: String,
    pub wrapping: Wrapping,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Leaf(Scalar),
    Enum(String),
    Object(SelectionPlan),
    Union(UnionPlan),
}

/// A selection set in record context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPlan {
    /// Flattened fields including those inlined from spreads. A name some
    /// spread provides carries the first such spread's version, matching the
    /// `Extend` rows of `record_ty`; otherwise the first selection wins.
    pub fields: Vec<FieldPlan>,
    /// Fragments spread directly into this set, in order.
    pub spreads: Vec<String>,
    direct: HashSet<String>,
    from_spreads: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionPlan {
    pub union_name: String,
    /// Every schema member, in member order.
    pub members: Vec<String>,
    /// Selected members; repeated selections on a member are merged.
    pub variants: Vec<VariantPlan>,
    has_typename: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPlan {
    pub member: String,
    pub plan: SelectionPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionShape {
    Record(SelectionPlan),
    Union(UnionPlan),
}

pub struct Walker<'a, 'd> {
    ctx: &'a DocumentContext<'d>,
    nav: TypeNavigator<'d>,
    /// Fragments currently being expanded.
    active: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SelectionPlan {
    pub fn field(&self, name: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields selected directly and not provided by any spread.
    pub fn own_fields(&self) -> impl Iterator<Item = &FieldPlan> {
        self.fields.iter().filter(|field| {
            self.direct.contains(&field.name) && !self.from_spreads.contains(&field.name)
        })
    }

    /// `Frag_ { own }` for each spread, innermost first.
    pub fn record_ty(&self, row: Option<String>) -> Ty {
        let own = Ty::Record {
            fields: self
                .own_fields()
                .map(|field| ir::Field {
                    name: field.name.clone(),
                    ty: field.ty(),
                })
                .collect(),
            row,
        };
        self.spreads.iter().fold(own, |base, spread| Ty::Extend {
            fragment: spread.clone(),
            base: Box::new(base),
        })
    }

    fn push(&mut self, field: FieldPlan) {
        self.direct.insert(field.name.clone());
        if self.field(&field.name).is_none() {
            self.fields.push(field);
        }
    }

    /// A field provided by a spread replaces a direct one of the same name.
    fn provide(&mut self, field: FieldPlan) {
        if !self.from_spreads.insert(field.name.clone()) {
            return;
        }
        match self.fields.iter().position(|own| own.name == field.name) {
            Some(index) => self.fields[index] = field,
            None => self.fields.push(field),
        }
    }

    fn push_spread(&mut self, name: &str, fragment: SelectionPlan) {
        if !self.spreads.iter().any(|spread| spread == name) {
            self.spreads.push(name.to_string());
        }
        for field in fragment.fields {
            self.provide(field);
        }
    }

    /// Merges a later selection set on the same object into this one.
    fn absorb(&mut self, other: SelectionPlan) {
        let SelectionPlan {
            fields,
            spreads,
            from_spreads,
            ..
        } = other;
        for spread in spreads {
            if !self.spreads.contains(&spread) {
                self.spreads.push(spread);
            }
        }
        for field in fields {
            if from_spreads.contains(&field.name) {
                self.provide(field);
            } else {
                self.push(field);
            }
        }
    }
}

impl UnionPlan {
    fn new(union: &UnionDef) -> Self {
        Self {
            union_name: union.name.clone(),
            members: union.members.clone(),
            variants: Vec::new(),
            has_typename: false,
        }
    }

    pub fn variant(&self, member: &str) -> Option<&VariantPlan> {
        self.variants.iter().find(|variant| variant.member == member)
    }

    /// One type argument per member; unselected members are `{}`.
    pub fn ty(&self) -> Ty {
        Ty::Union {
            name: self.union_name.clone(),
            variants: self
                .members
                .iter()
                .map(|member| ir::Variant {
                    member: member.clone(),
                    ty: self
                        .variant(member)
                        .map(|variant| variant.plan.record_ty(None))
                        .unwrap_or_else(Ty::empty_record),
                })
                .collect(),
        }
    }

    fn add(&mut self, member: &str, plan: SelectionPlan) {
        match self.variants.iter_mut().find(|variant| variant.member == member) {
            Some(variant) => variant.plan.absorb(plan),
            None => self.variants.push(VariantPlan {
                member: member.to_string(),
                plan,
            }),
        }
    }
}

impl FieldPlan {
    pub fn ty(&self) -> Ty {
        let inner = match &self.kind {
            FieldKind::Leaf(scalar) => Ty::Scalar(*scalar),
            FieldKind::Enum(name) => Ty::Enum(name.clone()),
            FieldKind::Object(plan) => plan.record_ty(None),
            FieldKind::Union(plan) => plan.ty(),
        };
        self.wrapping.apply_ty(inner)
    }
}

impl SelectionShape {
    pub fn ty(&self, row: Option<String>) -> Ty {
        match self {
            SelectionShape::Record(plan) => plan.record_ty(row),
            SelectionShape::Union(plan) => plan.ty(),
        }
    }
}

impl<'a, 'd> Walker<'a, 'd> {
    pub fn new(ctx: &'a DocumentContext<'d>) -> Self {
        Self {
            ctx,
            nav: TypeNavigator::new(ctx.schema),
            active: Vec::new(),
        }
    }

    pub fn walk_operation(&mut self, op: OperationRef<'d>) -> Result<SelectionPlan, TranslateError> {
        let definition = &op.definition.node;
        self.nav.enter_operation(definition.ty, op.name, op.definition.pos)?;
        let mut plan = SelectionPlan::default();
        self.record_block(&definition.selection_set, &mut plan)?;
        self.nav.leave();
        Ok(plan)
    }

    pub fn walk_fragment(&mut self, name: &str, pos: Pos) -> Result<SelectionShape, TranslateError> {
        let fragment = self.ctx.fragment(name, pos)?;
        self.enter_spread(name, pos)?;
        self.nav.enter_fragment(fragment)?;
        let shape = self.selection(&fragment.node.selection_set)?;
        self.nav.leave();
        self.active.pop();
        Ok(shape)
    }

    fn selection(&mut self, set: &'d Positioned<SelectionSet>) -> Result<SelectionShape, TranslateError> {
        let union = match self.nav.current_def() {
            Some(TypeDef::Union(union)) => Some(union),
            _ => None,
        };
        match union {
            Some(union) => {
                let mut plan = UnionPlan::new(union);
                self.nav.enter_selection_set();
                self.union_items(union, set, &mut plan)?;
                self.nav.leave();
                if !plan.has_typename {
                    return Err(TranslateError::MissingTypename {
                        union: union.name.clone(),
                        pos: set.pos,
                    });
                }
                Ok(SelectionShape::Union(plan))
            }
            None => {
                let mut plan = SelectionPlan::default();
                self.record_block(set, &mut plan)?;
                Ok(SelectionShape::Record(plan))
            }
        }
    }

    fn record_block(
        &mut self,
        set: &'d Positioned<SelectionSet>,
        plan: &mut SelectionPlan,
    ) -> Result<(), TranslateError> {
        self.nav.enter_selection_set();
        for item in &set.node.items {
            match &item.node {
                Selection::Field(field) => {
                    let field = self.field(field)?;
                    plan.push(field);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    let fragment = self.spread_plan(name, spread.pos)?;
                    plan.push_spread(name, fragment);
                }
                Selection::InlineFragment(inline) => {
                    let type_condition = inline
                        .node
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.to_string())
                        .or_else(|| self.nav.parent_type().map(str::to_string))
                        .unwrap_or_default();
                    return Err(TranslateError::InlineFragmentOutsideUnion {
                        type_condition,
                        pos: inline.pos,
                    });
                }
            }
        }
        self.nav.leave();
        Ok(())
    }

    /// The fragment's own plan, as it is declared.
    fn spread_plan(&mut self, name: &str, pos: Pos) -> Result<SelectionPlan, TranslateError> {
        let fragment = self.ctx.fragment(name, pos)?;
        self.enter_spread(name, pos)?;
        self.nav.enter_fragment(fragment)?;
        let mut plan = SelectionPlan::default();
        self.record_block(&fragment.node.selection_set, &mut plan)?;
        self.nav.leave();
        self.active.pop();
        Ok(plan)
    }

    fn union_items(
        &mut self,
        union: &UnionDef,
        set: &'d Positioned<SelectionSet>,
        plan: &mut UnionPlan,
    ) -> Result<(), TranslateError> {
        for item in &set.node.items {
            match &item.node {
                Selection::Field(field) => {
                    let name = field.node.name.node.as_str();
                    if name != "__typename" {
                        return Err(TranslateError::UnexpectedUnionField {
                            field: name.to_string(),
                            union: union.name.clone(),
                            pos: field.pos,
                        });
                    }
                    plan.has_typename = true;
                }
                Selection::InlineFragment(inline) => {
                    let Some(condition) = &inline.node.type_condition else {
                        return Err(TranslateError::UntypedInlineFragment {
                            union: union.name.clone(),
                            pos: inline.pos,
                        });
                    };
                    let member = condition.node.on.node.as_str();
                    ensure_member(union, member, condition.pos)?;
                    self.nav.enter_inline_fragment(inline)?;
                    let mut variant = SelectionPlan::default();
                    self.record_block(&inline.node.selection_set, &mut variant)?;
                    self.nav.leave();
                    plan.add(member, variant);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    let fragment = self.ctx.fragment(name, spread.pos)?;
                    let condition = &fragment.node.type_condition.node.on;
                    let member = condition.node.as_str();
                    if member == union.name {
                        self.enter_spread(name, spread.pos)?;
                        self.nav.enter_fragment(fragment)?;
                        self.nav.enter_selection_set();
                        self.union_items(union, &fragment.node.selection_set, plan)?;
                        self.nav.leave();
                        self.nav.leave();
                        self.active.pop();
                    } else {
                        ensure_member(union, member, condition.pos)?;
                        let fragment = self.spread_plan(name, spread.pos)?;
                        let mut variant = SelectionPlan::default();
                        variant.push_spread(name, fragment);
                        plan.add(member, variant);
                    }
                }
            }
        }
        Ok(())
    }

    fn field(&mut self, field: &'d Positioned<Field>) -> Result<FieldPlan, TranslateError> {
        self.nav.enter_field(field)?;
        let ty = self
            .nav
            .current_type()
            .cloned()
            .unwrap_or_else(|| TypeRef::named("String"));
        let wire = field.node.response_key().node.to_string();
        let mut wrapping = Wrapping::of(&ty);
        if is_conditional(&field.node) {
            wrapping = wrapping.optional();
        }

        let type_name = ty.named_type();
        let has_selection = !field.node.selection_set.node.items.is_empty();
        let kind = match self.ctx.schema.get(type_name) {
            None | Some(TypeDef::Scalar(_)) | Some(TypeDef::Enum(_)) if has_selection => {
                return Err(TranslateError::UnexpectedSelectionSet {
                    field: wire,
                    type_name: type_name.to_string(),
                    pos: field.pos,
                });
            }
            Some(TypeDef::Enum(def)) => FieldKind::Enum(def.name.clone()),
            None | Some(TypeDef::Scalar(_)) => FieldKind::Leaf(scalar_for(type_name)),
            Some(_) if !has_selection => {
                return Err(TranslateError::MissingSelectionSet {
                    field: wire,
                    type_name: type_name.to_string(),
                    pos: field.pos,
                });
            }
            Some(_) => match self.selection(&field.node.selection_set)? {
                SelectionShape::Record(plan) => FieldKind::Object(plan),
                SelectionShape::Union(plan) => FieldKind::Union(plan),
            },
        };
        self.nav.leave();

        Ok(FieldPlan {
            name: elm_safe_name(&wire),
            wire,
            wrapping,
            kind,
        })
    }

    fn enter_spread(&mut self, name: &str, pos: Pos) -> Result<(), TranslateError> {
        if self.active.iter().any(|active| active == name) {
            return Err(TranslateError::FragmentCycle(name.to_string(), pos));
        }
        self.active.push(name.to_string());
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn ensure_member(union: &UnionDef, member: &str, pos: Pos) -> Result<(), TranslateError> {
    if union.members.iter().any(|m| m == member) {
        Ok(())
    } else {
        Err(TranslateError::NotAUnionMember {
            type_condition: member.to_string(),
            union: union.name.clone(),
            pos,
        })
    }
}

/// `@skip` unless literally `false`, `@include` unless literally `true`.
fn is_conditional(field: &Field) -> bool {
    field.directives.iter().any(|directive| {
        let literal = directive
            .node
            .get_argument("if")
            .map(|value| &value.node);
        match directive.node.name.node.as_str() {
            "skip" => !matches!(literal, Some(Value::Boolean(false))),
            "include" => !matches!(literal, Some(Value::Boolean(true))),
            _ => false,
        }
    })
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Wrap;
    use crate::schema::Schema;
    use async_graphql_parser::parse_query;

    fn schema() -> Schema {
        Schema::from_sdl(
            "type Query { hero: Character! pets: [Pet] me: Character }
             type Character { id: ID! name: String friends: [Character!] }
             type Dog { name: String! barks: Boolean }
             type Cat { lives: Int }
             type Bird { wings: Int }
             union Pet = Dog | Cat | Bird",
        )
        .expect("valid sdl")
    }

    fn walk(schema: &Schema, query: &str) -> Result<SelectionPlan, TranslateError> {
        let doc = parse_query(query).expect("valid query");
        let ctx = DocumentContext::new(schema, &doc)?;
        let op = ctx.operations()[0];
        Walker::new(&ctx).walk_operation(op)
    }

    fn names(plan: &SelectionPlan) -> Vec<&str> {
        plan.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn object(plan: &SelectionPlan, name: &str) -> SelectionPlan {
        match &plan.field(name).expect("field").kind {
            FieldKind::Object(plan) => plan.clone(),
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn aliases_win_and_first_occurrence_is_kept() {
        let schema = schema();
        let plan = walk(&schema, "{ hero { name name other: name type: id } }").expect("walks");
        let hero = object(&plan, "hero");
        assert_eq!(names(&hero), ["name", "other", "type_"]);
        assert_eq!(hero.fields[2].wire, "type");
    }

    #[test]
    fn spreads_extend_the_own_record() {
        let schema = schema();
        let plan = walk(
            &schema,
            "{ hero { id ...Named } } fragment Named on Character { name id }",
        )
        .expect("walks");
        let hero = object(&plan, "hero");
        assert_eq!(names(&hero), ["id", "name"]);
        assert_eq!(hero.spreads, ["Named"]);
        assert_eq!(hero.own_fields().count(), 0);
        assert_eq!(
            hero.record_ty(None),
            Ty::Extend {
                fragment: "Named".into(),
                base: Box::new(Ty::empty_record()),
            }
        );
    }

    #[test]
    fn spread_fields_replace_direct_fields_of_the_same_name() {
        let schema = schema();
        let plan = walk(
            &schema,
            "query Q($v: Boolean!) { hero { id @include(if: $v) friends { id } ...Parts } }
             fragment Parts on Character { id friends { name } }",
        )
        .expect("walks");
        let hero = object(&plan, "hero");
        assert_eq!(names(&hero), ["id", "friends"]);
        assert!(hero.fields[0].wrapping.layers().is_empty());
        assert_eq!(names(&object(&hero, "friends")), ["name"]);
    }

    #[test]
    fn nested_spreads_take_precedence_inside_fragments() {
        let schema = schema();
        let plan = walk(
            &schema,
            "{ hero { ...Outer } }
             fragment Outer on Character { friends { id } ...Inner }
             fragment Inner on Character { friends { name } }",
        )
        .expect("walks");
        let hero = object(&plan, "hero");
        assert_eq!(names(&object(&hero, "friends")), ["name"]);
    }

    #[test]
    fn conditional_fields_become_optional() {
        let schema = schema();
        let plan = walk(
            &schema,
            "query Q($v: Boolean!) { hero { id @include(if: $v) name @skip(if: false) } }",
        )
        .expect("walks");
        let hero = object(&plan, "hero");
        assert_eq!(hero.fields[0].wrapping.layers(), &[Wrap::Optional]);
        assert_eq!(hero.fields[1].wrapping.layers(), &[Wrap::Optional]);

        let plan = walk(&schema, "{ hero { id @skip(if: false) } }").expect("walks");
        assert!(object(&plan, "hero").fields[0].wrapping.layers().is_empty());
    }

    #[test]
    fn union_variants_follow_member_order() {
        let schema = schema();
        let plan = walk(
            &schema,
            "{ pets { __typename ... on Cat { lives } ...DogParts } }
             fragment DogParts on Dog { name }",
        )
        .expect("walks");
        let FieldKind::Union(pets) = &plan.fields[0].kind else {
            panic!("expected a union");
        };
        let members: Vec<_> = pets.variants.iter().map(|v| v.member.as_str()).collect();
        assert_eq!(members, ["Cat", "Dog"]);
        let Ty::Union { variants, .. } = pets.ty() else {
            panic!("expected a union type");
        };
        let order: Vec<_> = variants.iter().map(|v| v.member.as_str()).collect();
        assert_eq!(order, ["Dog", "Cat", "Bird"]);
        assert_eq!(variants[2].ty, Ty::empty_record());
    }

    #[test]
    fn repeated_member_selections_are_merged() {
        let schema = schema();
        let plan = walk(
            &schema,
            "{ pets { __typename ... on Dog { name } ... on Dog { barks name } } }",
        )
        .expect("walks");
        let FieldKind::Union(pets) = &plan.fields[0].kind else {
            panic!("expected a union");
        };
        assert_eq!(pets.variants.len(), 1);
        let dog = pets.variant("Dog").expect("dog variant");
        assert_eq!(names(&dog.plan), ["name", "barks"]);
    }

    #[test]
    fn union_without_typename_is_rejected() {
        let schema = schema();
        let err = walk(&schema, "{ pets { ... on Cat { lives } } }").expect_err("no typename");
        assert!(matches!(err, TranslateError::MissingTypename { union, .. } if union == "Pet"));
    }

    #[test]
    fn union_members_are_checked() {
        let schema = schema();
        let err = walk(&schema, "{ pets { __typename ... on Character { id } } }")
            .expect_err("not a member");
        assert!(matches!(err, TranslateError::NotAUnionMember { type_condition, .. } if type_condition == "Character"));
    }

    #[test]
    fn inline_fragments_outside_unions_are_not_implemented() {
        let schema = schema();
        let err = walk(&schema, "{ hero { ... on Character { id } } }").expect_err("inline");
        assert_eq!(
            err.to_string().split(" at ").next(),
            Some("not implemented: InlineFragment on Character")
        );
    }

    #[test]
    fn leaf_and_composite_selection_rules() {
        let schema = schema();
        let err = walk(&schema, "{ hero { id { x } } }").expect_err("leaf with selection");
        assert!(matches!(err, TranslateError::UnexpectedSelectionSet { .. }));
        let err = walk(&schema, "{ hero }").expect_err("composite without selection");
        assert!(matches!(err, TranslateError::MissingSelectionSet { .. }));
    }

    #[test]
    fn spread_cycles_are_reported() {
        let schema = schema();
        let err = walk(
            &schema,
            "{ hero { ...A } }
             fragment A on Character { friends { ...B } }
             fragment B on Character { friends { ...A } }",
        )
        .expect_err("cycle");
        assert!(matches!(err, TranslateError::FragmentCycle(name, _) if name == "A"));
    }

    #[test]
    fn list_of_non_null_objects_is_optional_list() {
        let schema = schema();
        let plan = walk(&schema, "{ me { friends { id } } }").expect("walks");
        assert_eq!(plan.fields[0].wrapping.layers(), &[Wrap::Optional]);
        let me = object(&plan, "me");
        assert_eq!(
            me.fields[0].wrapping.layers(),
            &[Wrap::Optional, Wrap::List]
        );
    }
}
