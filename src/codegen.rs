//! Elm source for an emitted [`Module`].
//!
//! Output follows elm-format layout closely enough to be stable under it.
//! Multi-line expressions (`case` in union and enum decoders, defaulted
//! variables) are indented relative to the line they start on, which keeps
//! them valid under Elm's layout rule wherever they nest.
use std::collections::HashMap;

use crate::collect::EnumDecl;
use crate::decoder::{Constructor, Decoder, RecordDecoder, UnionDecoder, TYPENAME};
use crate::emit::{Declaration, FragmentDecl, Module, OperationDecl};
use crate::encoder::{Encoder, ParamEncoder};
use crate::ir::{Scalar, Ty};
use crate::naming::{capitalize, encoder_name, enum_decoder_name, fragment_open_alias};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
    /// Enum wire tables by schema name, for inline enum encoders.
    enums: HashMap<String, EnumDecl>,
}

const STEP: usize = 4;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Renders a whole module.
pub fn render(module: &Module) -> String {
    let mut cg = Codegen::new();
    cg.emit(module);
    cg.into_string()
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        self.out
    }

    pub fn emit(&mut self, module: &Module) {
        self.enums = module
            .declarations
            .iter()
            .filter_map(|decl| match decl {
                Declaration::EnumDecoder(decl) => Some((decl.name.clone(), decl.clone())),
                _ => None,
            })
            .collect();

        self.header(module);
        for declaration in &module.declarations {
            self.out.push_str("\n\n");
            let rendered = self.declaration(declaration);
            self.out.push_str(&rendered);
            self.out.push('\n');
        }
    }

    fn header(&mut self, module: &Module) {
        if module.exposing.is_empty() {
            self.out.push_str(&format!("module {} exposing (..)\n", module.name));
        } else {
            self.out.push_str(&format!("module {} exposing\n", module.name));
            for (i, name) in module.exposing.iter().enumerate() {
                let lead = if i == 0 { '(' } else { ',' };
                self.out.push_str(&format!("    {lead} {name}\n"));
            }
            self.out.push_str("    )\n");
        }
        self.out.push('\n');
        for import in &module.imports {
            self.out.push_str(&format!("import {import}\n"));
        }
    }

    fn declaration(&self, declaration: &Declaration) -> String {
        match declaration {
            Declaration::Constant { name, ty, value } => {
                format!("{name} : {}\n{name} =\n    {}", ty_text(ty), elm_string(value))
            }
            Declaration::TypeAlias { name, params, ty } => {
                format!("type alias {} =\n    {}", with_params(name, params), top_ty(ty))
            }
            Declaration::CustomType {
                name,
                params,
                constructors,
            } => {
                let mut text = format!("type {}", with_params(name, params));
                for (i, (constructor, args)) in constructors.iter().enumerate() {
                    let lead = if i == 0 { '=' } else { '|' };
                    text.push_str(&format!("\n    {lead} {constructor}"));
                    for arg in args {
                        text.push(' ');
                        text.push_str(&atom_ty(arg));
                    }
                }
                text
            }
            Declaration::Fragment(fragment) => fragment_aliases(fragment),
            Declaration::Request(op) => self.request(op),
            Declaration::Decoder {
                name,
                result,
                decoder,
            } => {
                let signature = Ty::app("Decoder", vec![result.clone()]);
                format!(
                    "{name} : {}\n{name} =\n    {}",
                    ty_text(&signature),
                    self.top_decoder(decoder)
                )
            }
            Declaration::Encoder { input, encoder } => {
                let name = encoder_name(input);
                let type_name = capitalize(input);
                format!(
                    "{name} : {type_name} -> Json.Encode.Value\n{name} ({type_name} value) =\n    {}",
                    self.encoder_expr(encoder, "value", 0)
                )
            }
            Declaration::EnumDecoder(decl) => enum_decoder(decl),
        }
    }

    fn request(&self, op: &OperationDecl) -> String {
        let name = &op.function_name;
        let response = Ty::app("Http.Request", vec![op.response.clone()]);
        let (signature, head) = match &op.params_type {
            Some(params) => (
                format!("{name} : {params} -> {}", ty_text(&response)),
                format!("{name} params ="),
            ),
            None => (format!("{name} : {}", ty_text(&response)), format!("{name} =")),
        };

        let mut text = format!("{signature}\n{head}\n    let\n        graphQLQuery =\n");
        text.push_str(&format!(
            "            \"\"\"{}\"\"\"\n\n",
            op.query_text.replace('\\', "\\\\")
        ));
        text.push_str("        graphQLParams =\n            Json.Encode.object\n");
        if op.params.is_empty() {
            text.push_str("                []\n");
        } else {
            for (i, param) in op.params.iter().enumerate() {
                let lead = if i == 0 { '[' } else { ',' };
                text.push_str(&format!("                {lead} {}\n", self.param(param, 16)));
            }
            text.push_str("                ]\n");
        }
        let verb = op
            .method
            .map(|method| format!("\"{method}\" "))
            .unwrap_or_default();
        text.push_str(&format!(
            "    in\n    {} {verb}endpointUrl graphQLQuery {} graphQLParams {}",
            op.kind,
            elm_string(&op.operation_name),
            op.decoder_name
        ));
        text
    }

    /// One `( "name", encoder )` entry, starting at column `indent`.
    fn param(&self, param: &ParamEncoder, indent: usize) -> String {
        let value = format!("params.{}", param.name);
        match (&param.encoder, param.defaulted) {
            (Encoder::Optional(inner), true) => {
                let pad = " ".repeat(indent + 2);
                let branch = " ".repeat(indent + 2 + STEP * 2);
                let body = " ".repeat(indent + 2 + STEP * 3);
                format!(
                    "( {wire}\n{pad}, case {value} of\n{branch}Just val ->\n{body}{just}\n\n{branch}Nothing ->\n{body}Json.Encode.null\n{pad})",
                    wire = elm_string(&param.wire),
                    just = self.encoder_expr(inner, "val", 0),
                )
            }
            (encoder, _) => format!(
                "( {}, {} )",
                elm_string(&param.wire),
                self.encoder_expr(encoder, &value, 0)
            ),
        }
    }

    fn encoder_expr(&self, encoder: &Encoder, value: &str, depth: usize) -> String {
        match encoder {
            Encoder::Scalar(Scalar::Int) => format!("Json.Encode.int {value}"),
            Encoder::Scalar(Scalar::Float) => format!("Json.Encode.float {value}"),
            Encoder::Scalar(Scalar::Bool) => format!("Json.Encode.bool {value}"),
            Encoder::Scalar(Scalar::String) => format!("Json.Encode.string {value}"),
            Encoder::Scalar(Scalar::Posix) => {
                format!("Json.Encode.int (Time.posixToMillis {value})")
            }
            Encoder::Enum(name) => {
                let table: Vec<String> = self
                    .enums
                    .get(name)
                    .map(|decl| {
                        decl.cases
                            .iter()
                            .map(|case| {
                                format!(
                                    "( {}, {} )",
                                    elm_string(&case.constructor),
                                    elm_string(&case.wire)
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                format!(
                    "Json.Encode.string <| Maybe.withDefault \"\" <| Maybe.map Tuple.second <| List.head <| List.filter (Tuple.first >> (==) (Debug.toString {value})) [ {} ]",
                    table.join(", ")
                )
            }
            Encoder::Object(fields) => {
                let entries: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        format!(
                            "( {}, {} )",
                            elm_string(&field.wire),
                            self.encoder_expr(
                                &field.encoder,
                                &format!("{value}.{}", field.name),
                                depth + 1
                            )
                        )
                    })
                    .collect();
                if entries.is_empty() {
                    "Json.Encode.object []".to_string()
                } else {
                    format!("Json.Encode.object [ {} ]", entries.join(", "))
                }
            }
            Encoder::List(inner) => format!(
                "Json.Encode.list (\\x{depth} -> {}) {value}",
                self.encoder_expr(inner, &format!("x{depth}"), depth + 1)
            ),
            Encoder::Optional(inner) => format!(
                "maybeEncode (\\o{depth} -> {}) {value}",
                self.encoder_expr(inner, &format!("o{depth}"), depth + 1)
            ),
            Encoder::Named(input) => format!("{} {value}", encoder_name(input)),
        }
    }

    /// Body of a named decoder function, one `apply` per line.
    fn top_decoder(&self, decoder: &Decoder) -> String {
        let indent = STEP * 2;
        match decoder {
            Decoder::Record(record) if !record.fields.is_empty() => {
                let mut text = format!("map {}", constructor_fn(record));
                for (i, field) in record.fields.iter().enumerate() {
                    let arg = self.decoder_atom(&field.decoder, indent);
                    if i == 0 {
                        text.push_str(&format!("\n{}{arg}", " ".repeat(indent)));
                    } else {
                        text.push_str(&format!("\n{}|> apply {arg}", " ".repeat(indent)));
                    }
                }
                text
            }
            other => self.decoder_atom(other, STEP),
        }
    }

    /// A decoder expression safe in argument position.
    fn decoder_atom(&self, decoder: &Decoder, indent: usize) -> String {
        match decoder {
            Decoder::Scalar(Scalar::Int) => "int".to_string(),
            Decoder::Scalar(Scalar::Float) => "float".to_string(),
            Decoder::Scalar(Scalar::Bool) => "bool".to_string(),
            Decoder::Scalar(Scalar::String) => "string".to_string(),
            Decoder::Scalar(Scalar::Posix) => {
                "(map ((*) 1000 >> Time.millisToPosix) int)".to_string()
            }
            Decoder::Enum(name) => enum_decoder_name(name),
            Decoder::Field { wire, decoder } => format!(
                "(field {} {})",
                elm_string(wire),
                self.decoder_atom(decoder, indent)
            ),
            Decoder::Optional(inner) => format!("(maybe {})", self.decoder_atom(inner, indent)),
            Decoder::List(inner) => format!("(list {})", self.decoder_atom(inner, indent)),
            Decoder::Record(record) => format!("({})", self.record_expr(record, indent)),
            Decoder::Union(union) => format!("({})", self.union_expr(union, indent)),
        }
    }

    fn record_expr(&self, record: &RecordDecoder, indent: usize) -> String {
        let constructor = constructor_fn(record);
        let mut fields = record.fields.iter();
        let Some(first) = fields.next() else {
            return format!("succeed {}", empty_value(&record.constructor));
        };
        let mut text = format!(
            "map {constructor} {}",
            self.decoder_atom(&first.decoder, indent)
        );
        for field in fields {
            text.push_str(&format!(" |> apply {}", self.decoder_atom(&field.decoder, indent)));
        }
        text
    }

    fn union_expr(&self, union: &UnionDecoder, indent: usize) -> String {
        let at = |n: usize| " ".repeat(indent + STEP * n);
        let mut text = format!(
            "field {} string\n{}|> andThen\n{}(\\typename ->\n{}case typename of",
            elm_string(TYPENAME),
            at(1),
            at(2),
            at(3)
        );
        for case in &union.cases {
            text.push_str(&format!(
                "\n{}{} ->\n{}{}\n",
                at(4),
                elm_string(&case.tag),
                at(5),
                self.record_expr(&case.decoder, indent + STEP * 5)
            ));
        }
        text.push_str(&format!(
            "\n{}_ ->\n{}fail \"Unexpected union type\"\n{})",
            at(4),
            at(5),
            at(2)
        ));
        text
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn with_params(name: &str, params: &[String]) -> String {
    std::iter::once(name.to_string())
        .chain(params.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn fragment_aliases(fragment: &FragmentDecl) -> String {
    if !fragment.open {
        return format!("type alias {} =\n    {}", fragment.name, ty_text(&fragment.ty));
    }
    let open = fragment_open_alias(&fragment.name);
    format!(
        "type alias {open} a =\n    {}\n\n\ntype alias {} =\n    {open} {{}}",
        ty_text(&fragment.ty),
        fragment.name
    )
}

fn enum_decoder(decl: &EnumDecl) -> String {
    let name = enum_decoder_name(&decl.name);
    let mut text = format!(
        "{name} : Decoder {}\n{name} =\n    string\n        |> andThen\n            (\\s ->\n                case s of",
        decl.type_name
    );
    for case in &decl.cases {
        text.push_str(&format!(
            "\n                    {} ->\n                        succeed {}\n",
            elm_string(&case.wire),
            case.constructor
        ));
    }
    text.push_str(&format!(
        "\n                    _ ->\n                        fail {}\n            )",
        elm_string(&format!("Unknown {}", decl.name))
    ));
    text
}

fn constructor_fn(record: &RecordDecoder) -> String {
    let binders: Vec<String> = record.fields.iter().map(|f| format!("{}_", f.name)).collect();
    let assignments: Vec<String> = record
        .fields
        .iter()
        .map(|f| format!("{} = {}_", f.name, f.name))
        .collect();
    let value = format!("{{ {} }}", assignments.join(", "));
    match &record.constructor {
        Constructor::Alias(name) => name.clone(),
        Constructor::Anonymous => format!("(\\{} -> {value})", binders.join(" ")),
        Constructor::Tagged(tag) => format!("(\\{} -> {tag} {value})", binders.join(" ")),
    }
}

fn empty_value(constructor: &Constructor) -> String {
    match constructor {
        Constructor::Alias(_) | Constructor::Anonymous => "{}".to_string(),
        Constructor::Tagged(tag) => format!("({tag} {{}})"),
    }
}

/// Top-level record aliases get one field per line.
fn top_ty(ty: &Ty) -> String {
    match ty {
        Ty::Record { fields, row: None } if !fields.is_empty() => {
            let mut text = String::new();
            for (i, field) in fields.iter().enumerate() {
                let lead = if i == 0 { "{" } else { "\n    ," };
                text.push_str(&format!("{lead} {} : {}", field.name, ty_text(&field.ty)));
            }
            text.push_str("\n    }");
            text
        }
        other => ty_text(other),
    }
}

pub fn ty_text(ty: &Ty) -> String {
    match ty {
        Ty::Scalar(scalar) => scalar_name(*scalar).to_string(),
        Ty::Enum(name) => capitalize(name),
        Ty::Named(name) => name.clone(),
        Ty::List(inner) => format!("List {}", atom_ty(inner)),
        Ty::Optional(inner) => format!("Maybe {}", atom_ty(inner)),
        Ty::Record { fields, row } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|field| format!("{} : {}", field.name, ty_text(&field.ty)))
                .collect();
            match (row, fields.is_empty()) {
                (Some(row), true) => row.clone(),
                (None, true) => "{}".to_string(),
                (Some(row), false) => format!("{{ {row} | {} }}", fields.join(", ")),
                (None, false) => format!("{{ {} }}", fields.join(", ")),
            }
        }
        Ty::Union { name, variants } => std::iter::once(name.clone())
            .chain(variants.iter().map(|variant| atom_ty(&variant.ty)))
            .collect::<Vec<_>>()
            .join(" "),
        Ty::Extend { fragment, base } => {
            format!("{} {}", fragment_open_alias(fragment), atom_ty(base))
        }
        Ty::App { constructor, args } => std::iter::once(constructor.clone())
            .chain(args.iter().map(atom_ty))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn atom_ty(ty: &Ty) -> String {
    let text = ty_text(ty);
    let atomic = match ty {
        Ty::List(_) | Ty::Optional(_) | Ty::Union { .. } | Ty::Extend { .. } => false,
        Ty::App { args, .. } => args.is_empty(),
        Ty::Scalar(_) | Ty::Enum(_) | Ty::Named(_) | Ty::Record { .. } => true,
    };
    if atomic { text } else { format!("({text})") }
}

fn scalar_name(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Int => "Int",
        Scalar::Float => "Float",
        Scalar::Bool => "Bool",
        Scalar::String => "String",
        Scalar::Posix => "Time.Posix",
    }
}

fn elm_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
