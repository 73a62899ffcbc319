//! Tracks the schema type of the AST node being visited.
//!
//! Every `enter_*` pushes one frame and must be paired with one `leave`.
use async_graphql_parser::types::{
    Field, FragmentDefinition, InlineFragment, OperationType,
};
use async_graphql_parser::{Pos, Positioned};

use crate::error::TranslateError;
use crate::schema::{Schema, TypeDef, TypeRef};

#[derive(Debug, Clone)]
struct Frame {
    /// Output type of the node.
    ty: Option<TypeRef>,
    /// Named composite type whose fields are being selected.
    parent: Option<String>,
}

#[derive(Debug)]
pub struct TypeNavigator<'s> {
    schema: &'s Schema,
    stack: Vec<Frame>,
}

impl<'s> TypeNavigator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            stack: Vec::new(),
        }
    }

    pub fn enter_operation(
        &mut self,
        kind: OperationType,
        name: &str,
        pos: Pos,
    ) -> Result<(), TranslateError> {
        let root = match kind {
            OperationType::Query => self.schema.query_type(),
            OperationType::Mutation => self.schema.mutation_type(),
            OperationType::Subscription => self.schema.subscription_type(),
        };
        let root = root.ok_or_else(|| TranslateError::UnknownOperation {
            operation: kind.to_string(),
            name: name.to_string(),
            pos,
        })?;
        self.push(Some(TypeRef::named(root)), None);
        Ok(())
    }

    pub fn enter_fragment(
        &mut self,
        fragment: &Positioned<FragmentDefinition>,
    ) -> Result<(), TranslateError> {
        let condition = &fragment.node.type_condition.node.on;
        let ty = self.type_condition(condition.node.as_str(), condition.pos)?;
        self.push(Some(ty), None);
        Ok(())
    }

    pub fn enter_inline_fragment(
        &mut self,
        fragment: &Positioned<InlineFragment>,
    ) -> Result<(), TranslateError> {
        let ty = match &fragment.node.type_condition {
            Some(condition) => {
                let on = &condition.node.on;
                Some(self.type_condition(on.node.as_str(), on.pos)?)
            }
            None => self.parent_type().map(TypeRef::named),
        };
        self.push(ty, None);
        Ok(())
    }

    /// The parent for the selections is the named type of the current node.
    pub fn enter_selection_set(&mut self) {
        let ty = self.current_type().cloned();
        let parent = ty.as_ref().map(|ty| ty.named_type().to_string());
        self.push(ty, parent);
    }

    pub fn enter_field(&mut self, field: &Positioned<Field>) -> Result<(), TranslateError> {
        let name = field.node.name.node.as_str();
        let parent = self.parent_type().unwrap_or_default().to_string();
        let ty = if name == "__typename" {
            TypeRef::non_null(TypeRef::named("String"))
        } else {
            self.schema
                .field_type(&parent, name)
                .cloned()
                .ok_or_else(|| TranslateError::UnknownField {
                    field: name.to_string(),
                    parent_type: parent.clone(),
                    pos: field.pos,
                })?
        };
        self.push(Some(ty), Some(parent));
        Ok(())
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    pub fn current_type(&self) -> Option<&TypeRef> {
        self.stack.last().and_then(|frame| frame.ty.as_ref())
    }

    pub fn current_def(&self) -> Option<&'s TypeDef> {
        self.current_type()
            .and_then(|ty| self.schema.get(ty.named_type()))
    }

    pub fn parent_type(&self) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| frame.parent.as_deref())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn type_condition(&self, name: &str, pos: Pos) -> Result<TypeRef, TranslateError> {
        match self.schema.get(name) {
            Some(def) if def.is_composite() => Ok(TypeRef::named(name)),
            _ => Err(TranslateError::UnknownType(name.to_string(), pos)),
        }
    }

    fn push(&mut self, ty: Option<TypeRef>, parent: Option<String>) {
        self.stack.push(Frame { ty, parent });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_parser::parse_query;
    use async_graphql_parser::types::{DocumentOperations, Selection};

    fn schema() -> Schema {
        Schema::from_sdl(
            "type Query { hero: Character! }
             type Character { name: String friends: [Character] }",
        )
        .expect("valid sdl")
    }

    #[test]
    fn follows_field_nesting() {
        let schema = schema();
        let doc = parse_query("{ hero { friends { name } } }").expect("valid query");
        let DocumentOperations::Single(op) = &doc.operations else {
            panic!("expected an anonymous operation");
        };
        let mut nav = TypeNavigator::new(&schema);
        nav.enter_operation(op.node.ty, "AnonymousQuery", op.pos).unwrap();
        nav.enter_selection_set();
        let Selection::Field(hero) = &op.node.selection_set.node.items[0].node else {
            panic!("expected a field");
        };
        nav.enter_field(hero).unwrap();
        assert_eq!(nav.current_type().map(ToString::to_string), Some("Character!".into()));
        nav.enter_selection_set();
        assert_eq!(nav.parent_type(), Some("Character"));
        let Selection::Field(friends) = &hero.node.selection_set.node.items[0].node else {
            panic!("expected a field");
        };
        nav.enter_field(friends).unwrap();
        assert_eq!(nav.current_type().map(ToString::to_string), Some("[Character]".into()));
        nav.leave();
        nav.leave();
        nav.leave();
        assert_eq!(nav.parent_type(), Some("Query"));
        nav.leave();
        nav.leave();
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn unknown_field_names_field_and_parent() {
        let schema = schema();
        let doc = parse_query("{ villain }").expect("valid query");
        let DocumentOperations::Single(op) = &doc.operations else {
            panic!("expected an anonymous operation");
        };
        let mut nav = TypeNavigator::new(&schema);
        nav.enter_operation(op.node.ty, "AnonymousQuery", op.pos).unwrap();
        nav.enter_selection_set();
        let Selection::Field(villain) = &op.node.selection_set.node.items[0].node else {
            panic!("expected a field");
        };
        match nav.enter_field(villain) {
            Err(TranslateError::UnknownField { field, parent_type, .. }) => {
                assert_eq!(field, "villain");
                assert_eq!(parent_type, "Query");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }
}
