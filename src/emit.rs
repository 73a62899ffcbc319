//! Declaration emitter: assembles one Elm module per document.
//!
//! Sections are filled independently and concatenated in a fixed order by
//! [`ModuleBuilder::finish`]: union types, enum types, the endpoint constant,
//! fragment aliases, per-operation declarations, recursive input types with
//! their encoders, enum decoders.
use std::fmt;

use crate::collect::{EnumDecl, UnionDecl};
use crate::decoder::Decoder;
use crate::encoder::{Encoder, ParamEncoder};
use crate::ir::{Field, Scalar, Ty};
use crate::naming::{capitalize, fragment_open_alias, type_param, union_constructor};
use crate::walker::SelectionShape;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub module_name: String,
    pub endpoint_url: String,
    pub method: HttpMethod,
    /// Responses are wrapped in `GraphQLSpec.Response`.
    pub error_spec: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub exposing: Vec<String>,
    pub imports: Vec<String>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Constant {
        name: String,
        ty: Ty,
        value: String,
    },
    TypeAlias {
        name: String,
        params: Vec<String>,
        ty: Ty,
    },
    CustomType {
        name: String,
        params: Vec<String>,
        constructors: Vec<(String, Vec<Ty>)>,
    },
    Fragment(FragmentDecl),
    Request(OperationDecl),
    Decoder {
        name: String,
        result: Ty,
        decoder: Decoder,
    },
    /// Named encoder of a recursive input type.
    Encoder {
        input: String,
        encoder: Encoder,
    },
    EnumDecoder(EnumDecl),
}

/// A fragment on an object or interface is declared as the open alias
/// `Name_ a` plus `Name = Name_ {}`. A fragment on a union only has `Name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDecl {
    pub name: String,
    pub ty: Ty,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDecl {
    pub function_name: String,
    pub kind: OperationKind,
    /// Verb passed to `query`; `None` for mutations.
    pub method: Option<HttpMethod>,
    pub operation_name: String,
    pub query_text: String,
    /// `Result_Input` when the operation declares variables.
    pub params_type: Option<String>,
    pub params: Vec<ParamEncoder>,
    /// `Http.Request` argument.
    pub response: Ty,
    pub decoder_name: String,
}

/// Everything one operation contributes to the module.
#[derive(Debug, Clone)]
pub struct OperationParts {
    pub result_type: String,
    pub result: Ty,
    /// `Result_Input_Var` aliases for non-scalar variables.
    pub inputs: Vec<(String, Ty)>,
    pub param_fields: Vec<Field>,
    pub request: OperationDecl,
    pub decoder: Decoder,
}

pub const ROW_VARIABLE: &str = "a";

#[derive(Debug)]
pub struct ModuleBuilder<'o> {
    options: &'o GenerateOptions,
    unions: Vec<Declaration>,
    enums: Vec<Declaration>,
    fragments: Vec<Declaration>,
    operations: Vec<Declaration>,
    recursive: Vec<Declaration>,
    enum_decoders: Vec<Declaration>,
    expose_operations: Vec<String>,
    expose_fragments: Vec<String>,
    expose_enums: Vec<String>,
    expose_unions: Vec<String>,
    expose_recursive: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
        }
    }
}

impl GenerateOptions {
    pub fn new(module_name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            endpoint_url: endpoint_url.into(),
            method: HttpMethod::default(),
            error_spec: false,
        }
    }

    /// Only queries pass the verb; mutations always post.
    pub fn method_for(&self, kind: OperationKind) -> Option<HttpMethod> {
        match kind {
            OperationKind::Query => Some(self.method),
            OperationKind::Mutation => None,
        }
    }

    pub fn response_ty(&self, result_type: &str) -> Ty {
        let result = Ty::named(result_type);
        if self.error_spec {
            Ty::app("Response", vec![result])
        } else {
            result
        }
    }

    fn imports(&self) -> Vec<String> {
        let graphql = if self.error_spec {
            "GraphQLSpec exposing (Response, apply, maybeEncode, query, mutation)"
        } else {
            "GraphQL exposing (apply, maybeEncode, query, mutation)"
        };
        [
            "Json.Decode exposing (..)",
            "Json.Encode exposing (encode)",
            "Time",
            "Http",
            graphql,
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

impl Module {
    pub fn request(&self, operation_name: &str) -> Option<&OperationDecl> {
        self.declarations.iter().find_map(|decl| match decl {
            Declaration::Request(op) if op.operation_name == operation_name => Some(op),
            _ => None,
        })
    }

    pub fn requests(&self) -> impl Iterator<Item = &OperationDecl> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Request(op) => Some(op),
            _ => None,
        })
    }

    pub fn decoder(&self, name: &str) -> Option<&Decoder> {
        self.declarations.iter().find_map(|decl| match decl {
            Declaration::Decoder { name: n, decoder, .. } if n == name => Some(decoder),
            _ => None,
        })
    }

    /// Type of a declared alias, by Elm name.
    pub fn alias(&self, name: &str) -> Option<&Ty> {
        self.declarations.iter().find_map(|decl| match decl {
            Declaration::TypeAlias { name: n, ty, .. } if n == name => Some(ty),
            _ => None,
        })
    }

    pub fn fragments(&self) -> impl Iterator<Item = &FragmentDecl> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Fragment(fragment) => Some(fragment),
            _ => None,
        })
    }
}

impl<'o> ModuleBuilder<'o> {
    pub fn new(options: &'o GenerateOptions) -> Self {
        Self {
            options,
            unions: Vec::new(),
            enums: Vec::new(),
            fragments: Vec::new(),
            operations: Vec::new(),
            recursive: Vec::new(),
            enum_decoders: Vec::new(),
            expose_operations: Vec::new(),
            expose_fragments: Vec::new(),
            expose_enums: Vec::new(),
            expose_unions: Vec::new(),
            expose_recursive: Vec::new(),
        }
    }

    /// `type Pet a b = Pet_Dog a | Pet_Cat b`.
    pub fn add_union(&mut self, union: &UnionDecl) {
        let params: Vec<String> = (0..union.members.len()).map(type_param).collect();
        let constructors = union
            .members
            .iter()
            .zip(&params)
            .map(|(member, param)| {
                (
                    union_constructor(&union.name, member),
                    vec![Ty::named(param.clone())],
                )
            })
            .collect();
        self.unions.push(Declaration::CustomType {
            name: union.name.clone(),
            params,
            constructors,
        });
        self.expose_unions.push(format!("{}(..)", union.name));
    }

    pub fn add_enum(&mut self, decl: &EnumDecl) {
        self.enums.push(Declaration::CustomType {
            name: decl.type_name.clone(),
            params: Vec::new(),
            constructors: decl
                .cases
                .iter()
                .map(|case| (case.constructor.clone(), Vec::new()))
                .collect(),
        });
        self.enum_decoders.push(Declaration::EnumDecoder(decl.clone()));
        self.expose_enums.push(format!("{}(..)", decl.type_name));
    }

    pub fn add_fragment(&mut self, name: &str, shape: &SelectionShape) {
        let type_name = capitalize(name);
        match shape {
            SelectionShape::Record(plan) => {
                self.fragments.push(Declaration::Fragment(FragmentDecl {
                    name: type_name.clone(),
                    ty: plan.record_ty(Some(ROW_VARIABLE.to_string())),
                    open: true,
                }));
                self.expose_fragments.push(type_name);
                self.expose_fragments.push(fragment_open_alias(name));
            }
            SelectionShape::Union(plan) => {
                self.fragments.push(Declaration::Fragment(FragmentDecl {
                    name: type_name.clone(),
                    ty: plan.ty(),
                    open: false,
                }));
                self.expose_fragments.push(type_name);
            }
        }
    }

    pub fn add_operation(&mut self, parts: OperationParts) {
        let OperationParts {
            result_type,
            result,
            inputs,
            param_fields,
            request,
            decoder,
        } = parts;

        self.expose_operations.push(request.function_name.clone());
        self.expose_operations.push(result_type.clone());
        self.operations.push(Declaration::TypeAlias {
            name: result_type.clone(),
            params: Vec::new(),
            ty: result,
        });
        for (name, ty) in inputs {
            self.expose_operations.push(name.clone());
            self.operations.push(Declaration::TypeAlias {
                name,
                params: Vec::new(),
                ty,
            });
        }
        if let Some(params_type) = &request.params_type {
            self.expose_operations.push(params_type.clone());
            self.operations.push(Declaration::TypeAlias {
                name: params_type.clone(),
                params: Vec::new(),
                ty: Ty::record(param_fields),
            });
        }
        let decoder_name = request.decoder_name.clone();
        self.operations.push(Declaration::Request(request));
        self.operations.push(Declaration::Decoder {
            name: decoder_name,
            result: Ty::named(result_type),
            decoder,
        });
    }

    /// `type Filter = Filter { … }` plus its named encoder.
    pub fn add_recursive_input(&mut self, input: &str, record: Ty, encoder: Encoder) {
        let type_name = capitalize(input);
        self.recursive.push(Declaration::CustomType {
            name: type_name.clone(),
            params: Vec::new(),
            constructors: vec![(type_name.clone(), vec![record])],
        });
        self.recursive.push(Declaration::Encoder {
            input: input.to_string(),
            encoder,
        });
        self.expose_recursive.push(format!("{type_name}(..)"));
    }

    pub fn finish(self) -> Module {
        let endpoint = Declaration::Constant {
            name: "endpointUrl".to_string(),
            ty: Ty::Scalar(Scalar::String),
            value: self.options.endpoint_url.clone(),
        };
        let declarations = self
            .unions
            .into_iter()
            .chain(self.enums)
            .chain(std::iter::once(endpoint))
            .chain(self.fragments)
            .chain(self.operations)
            .chain(self.recursive)
            .chain(self.enum_decoders)
            .collect();
        let exposing = self
            .expose_operations
            .into_iter()
            .chain(self.expose_fragments)
            .chain(self.expose_enums)
            .chain(self.expose_unions)
            .chain(self.expose_recursive)
            .collect();
        Module {
            name: self.options.module_name.clone(),
            exposing,
            imports: self.options.imports(),
            declarations,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::EnumCase;

    #[test]
    fn sections_come_out_in_fixed_order() {
        let options = GenerateOptions::new("Queries", "http://localhost/graphql");
        let mut builder = ModuleBuilder::new(&options);
        builder.add_enum(&EnumDecl {
            name: "Episode".into(),
            type_name: "Episode".into(),
            cases: vec![EnumCase {
                wire: "JEDI".into(),
                constructor: "Episode_Jedi".into(),
            }],
        });
        builder.add_union(&UnionDecl {
            name: "Pet".into(),
            members: vec!["Dog".into(), "Cat".into()],
        });
        let module = builder.finish();

        let kinds: Vec<&str> = module
            .declarations
            .iter()
            .map(|decl| match decl {
                Declaration::CustomType { name, .. } => name.as_str(),
                Declaration::Constant { name, .. } => name.as_str(),
                Declaration::EnumDecoder(_) => "decoder",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["Pet", "Episode", "endpointUrl", "decoder"]);
        assert_eq!(module.exposing, ["Episode(..)", "Pet(..)"]);
        assert_eq!(
            module.imports.last().map(String::as_str),
            Some("GraphQL exposing (apply, maybeEncode, query, mutation)")
        );
    }

    #[test]
    fn union_types_take_one_parameter_per_member() {
        let options = GenerateOptions::new("Queries", "/graphql");
        let mut builder = ModuleBuilder::new(&options);
        builder.add_union(&UnionDecl {
            name: "Pet".into(),
            members: vec!["Dog".into(), "Cat".into()],
        });
        let module = builder.finish();
        let Declaration::CustomType { params, constructors, .. } = &module.declarations[0] else {
            panic!("expected the union type first");
        };
        assert_eq!(params, &["a", "b"]);
        assert_eq!(constructors[1], ("Pet_Cat".to_string(), vec![Ty::named("b")]));
    }

    #[test]
    fn error_spec_wraps_the_response() {
        let mut options = GenerateOptions::new("Queries", "/graphql");
        options.error_spec = true;
        assert_eq!(
            options.response_ty("Hero"),
            Ty::app("Response", vec![Ty::named("Hero")])
        );
        assert!(options.imports()[4].starts_with("GraphQLSpec exposing (Response"));
        assert_eq!(options.method_for(OperationKind::Mutation), None);
        assert_eq!(options.method_for(OperationKind::Query), Some(HttpMethod::Get));
    }
}
