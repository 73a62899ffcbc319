//! GraphQL text embedded in the generated request functions.
use std::fmt::Write;

use async_graphql_parser::types::{
    Directive, FragmentDefinition, OperationType, Selection, SelectionSet, VariableDefinition,
};
use async_graphql_parser::Positioned;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::collect::{DocumentContext, OperationRef, ANONYMOUS_OPERATION};
use crate::error::TranslateError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// The fragments the operation reaches, then the operation, on one line.
pub fn operation_text(ctx: &DocumentContext<'_>, op: OperationRef<'_>) -> Result<String, TranslateError> {
    let mut fragments = IndexMap::new();
    used_fragments(ctx, &op.definition.node.selection_set, &mut fragments)?;

    let mut out = String::new();
    for (name, fragment) in &fragments {
        print_fragment(&mut out, name, fragment);
        out.push(' ');
    }
    print_operation(&mut out, op);
    Ok(collapse_whitespace(&out))
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Pre-order: a fragment is listed before the fragments it spreads.
fn used_fragments<'d>(
    ctx: &DocumentContext<'d>,
    set: &Positioned<SelectionSet>,
    out: &mut IndexMap<String, &'d FragmentDefinition>,
) -> Result<(), TranslateError> {
    for item in &set.node.items {
        match &item.node {
            Selection::Field(field) => used_fragments(ctx, &field.node.selection_set, out)?,
            Selection::InlineFragment(inline) => {
                used_fragments(ctx, &inline.node.selection_set, out)?
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                if out.contains_key(name) {
                    continue;
                }
                let fragment = ctx.fragment(name, spread.pos)?;
                out.insert(name.to_string(), &fragment.node);
                used_fragments(ctx, &fragment.node.selection_set, out)?;
            }
        }
    }
    Ok(())
}

fn print_operation(out: &mut String, op: OperationRef<'_>) {
    let definition = &op.definition.node;
    let bare = op.name == ANONYMOUS_OPERATION
        && definition.ty == OperationType::Query
        && definition.variable_definitions.is_empty()
        && definition.directives.is_empty();
    if !bare {
        let _ = write!(out, "{}", definition.ty);
        if op.name != ANONYMOUS_OPERATION {
            let _ = write!(out, " {}", op.name);
        }
        print_variables(out, &definition.variable_definitions);
        print_directives(out, &definition.directives);
        out.push(' ');
    }
    print_selection_set(out, &definition.selection_set);
}

fn print_fragment(out: &mut String, name: &str, fragment: &FragmentDefinition) {
    let _ = write!(out, "fragment {name} on {}", fragment.type_condition.node.on.node);
    print_directives(out, &fragment.directives);
    out.push(' ');
    print_selection_set(out, &fragment.selection_set);
}

fn print_variables(out: &mut String, variables: &[Positioned<VariableDefinition>]) {
    if variables.is_empty() {
        return;
    }
    let rendered: Vec<String> = variables
        .iter()
        .map(|variable| {
            let variable = &variable.node;
            let mut text = format!("${}: {}", variable.name.node, variable.var_type.node);
            if let Some(default) = &variable.default_value {
                let _ = write!(text, " = {}", default.node);
            }
            text
        })
        .collect();
    let _ = write!(out, "({})", rendered.join(", "));
}

fn print_directives(out: &mut String, directives: &[Positioned<Directive>]) {
    for directive in directives {
        let _ = write!(out, " @{}", directive.node.name.node);
        if !directive.node.arguments.is_empty() {
            let arguments: Vec<String> = directive
                .node
                .arguments
                .iter()
                .map(|(name, value)| format!("{}: {}", name.node, value.node))
                .collect();
            let _ = write!(out, "({})", arguments.join(", "));
        }
    }
}

fn print_selection_set(out: &mut String, set: &Positioned<SelectionSet>) {
    out.push_str("{ ");
    for item in &set.node.items {
        match &item.node {
            Selection::Field(field) => {
                let field = &field.node;
                if let Some(alias) = &field.alias {
                    let _ = write!(out, "{}: ", alias.node);
                }
                out.push_str(field.name.node.as_str());
                if !field.arguments.is_empty() {
                    let arguments: Vec<String> = field
                        .arguments
                        .iter()
                        .map(|(name, value)| format!("{}: {}", name.node, value.node))
                        .collect();
                    let _ = write!(out, "({})", arguments.join(", "));
                }
                print_directives(out, &field.directives);
                if !field.selection_set.node.items.is_empty() {
                    out.push(' ');
                    print_selection_set(out, &field.selection_set);
                }
            }
            Selection::FragmentSpread(spread) => {
                let _ = write!(out, "...{}", spread.node.fragment_name.node);
                print_directives(out, &spread.node.directives);
            }
            Selection::InlineFragment(inline) => {
                out.push_str("...");
                if let Some(condition) = &inline.node.type_condition {
                    let _ = write!(out, " on {}", condition.node.on.node);
                }
                print_directives(out, &inline.node.directives);
                out.push(' ');
                print_selection_set(out, &inline.node.selection_set);
            }
        }
        out.push(' ');
    }
    out.push('}');
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
