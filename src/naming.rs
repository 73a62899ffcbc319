//! Elm identifiers derived from GraphQL names.
use std::collections::HashMap;
use std::path::{Component, Path};

use once_cell::sync::Lazy;

static RESERVED: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("__typename", "typename_"),
        ("type", "type_"),
        ("alias", "alias_"),
        ("as", "as_"),
        ("case", "case_"),
        ("else", "else_"),
        ("exposing", "exposing_"),
        ("if", "if_"),
        ("import", "import_"),
        ("in", "in_"),
        ("let", "let_"),
        ("module", "module_"),
        ("of", "of_"),
        ("port", "port_"),
        ("then", "then_"),
        ("where", "where_"),
        ("Task", "Task_"),
        ("List", "List_"),
        ("Http", "Http_"),
        ("GraphQL", "GraphQL_"),
        ("Maybe", "Maybe_"),
        ("String", "String_"),
    ])
});

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

pub fn elm_safe_name(name: &str) -> String {
    RESERVED
        .get(name)
        .map(|safe| (*safe).to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Episode` + `NEW_HOPE` → `Episode_New_hope`.
pub fn enum_constructor(enum_name: &str, value: &str) -> String {
    let lowered = value.to_lowercase();
    format!("{}_{}", capitalize(enum_name), capitalize(&lowered))
}

pub fn enum_decoder_name(enum_name: &str) -> String {
    format!("{}Decoder", enum_name.to_lowercase())
}

pub fn union_constructor(union_name: &str, member: &str) -> String {
    elm_safe_name(&format!("{union_name}_{member}"))
}

pub fn fragment_open_alias(fragment: &str) -> String {
    format!("{}_", capitalize(fragment))
}

pub fn decoder_name(type_name: &str) -> String {
    format!("{}Decoder", decapitalize(type_name))
}

pub fn encoder_name(type_name: &str) -> String {
    format!("encode{}", capitalize(type_name))
}

/// Type parameter for the `index`-th union member: `a`…`z`, then `a26`, `a27`…
pub fn type_param(index: usize) -> String {
    match ALPHABET.get(index) {
        Some(letter) => (*letter as char).to_string(),
        None => format!("a{index}"),
    }
}

/// `src/Queries/star_wars.graphql` → `Queries.Star_wars`.
///
/// Segments after the last `src` directory are capitalized and joined with
/// dots; without a `src` directory every normal segment is used.
pub fn module_name_for(path: &Path) -> String {
    let segments: Vec<String> = path
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    let start = segments
        .iter()
        .rposition(|segment| segment == "src")
        .map(|index| index + 1)
        .unwrap_or(0);
    segments[start..]
        .iter()
        .map(|segment| capitalize(segment))
        .collect::<Vec<_>>()
        .join(".")
}
