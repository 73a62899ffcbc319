//! Document translation: one GraphQL document in, one Elm module out.
use async_graphql_parser::{parse_query, Pos};
use async_graphql_parser::types::{ExecutableDocument, OperationType};
use tracing::{debug, instrument};

use crate::codegen;
use crate::collect::{collect, DocumentContext, OperationRef};
use crate::decoder::operation_decoder;
use crate::encoder::{Encoder, EncoderGenerator};
use crate::error::TranslateError;
use crate::ir::{Field, Ty};
use crate::lower::TypeMapper;
use crate::naming::{capitalize, decapitalize, decoder_name, elm_safe_name};
use crate::printer::operation_text;
use crate::schema::{Schema, TypeDef, TypeRef};
use crate::walker::Walker;

pub use crate::emit::{
    GenerateOptions, HttpMethod, Module, ModuleBuilder, OperationDecl, OperationKind, OperationParts,
};

/// Parses `source` and renders the Elm module for it.
#[instrument(skip_all, fields(module = %options.module_name))]
pub fn query_to_elm(
    source: &str,
    schema: &Schema,
    options: &GenerateOptions,
) -> Result<String, TranslateError> {
    let document = parse_query(source)?;
    let module = translate_document(schema, &document, options)?;
    Ok(codegen::render(&module))
}

#[instrument(skip_all, fields(module = %options.module_name))]
pub fn translate_document(
    schema: &Schema,
    document: &ExecutableDocument,
    options: &GenerateOptions,
) -> Result<Module, TranslateError> {
    let ctx = DocumentContext::new(schema, document)?;
    let registry = collect(&ctx)?;
    let mut builder = ModuleBuilder::new(options);

    for union in registry.unions.values() {
        builder.add_union(union);
    }
    for decl in registry.enums.values() {
        builder.add_enum(decl);
    }

    let mut walker = Walker::new(&ctx);
    for name in &registry.fragments {
        let fragment = ctx.fragment(name, Pos::default())?;
        let shape = walker.walk_fragment(name, fragment.pos)?;
        debug!(fragment = %name, "declared fragment");
        builder.add_fragment(name, &shape);
    }

    let mut translator = OperationTranslator {
        ctx: &ctx,
        options,
        mapper: TypeMapper::new(schema),
        encoders: EncoderGenerator::new(schema),
    };
    for op in ctx.operations() {
        let parts = translator.operation(&mut walker, *op)?;
        debug!(operation = %op.name, "declared operation");
        builder.add_operation(parts);
    }

    let OperationTranslator {
        mapper, encoders, ..
    } = translator;
    for name in mapper.cycles() {
        let record = mapper.mapped(name).cloned().unwrap_or_else(Ty::empty_record);
        let encoder = encoders
            .declared(name)
            .cloned()
            .unwrap_or_else(|| Encoder::Object(Vec::new()));
        debug!(input = %name, "declared recursive input");
        builder.add_recursive_input(name, record, encoder);
    }

    Ok(builder.finish())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Variable types are mapped and encoded with one mapper and one encoder
/// generator per document, so recursive inputs are declared once.
struct OperationTranslator<'c, 'd> {
    ctx: &'c DocumentContext<'d>,
    options: &'c GenerateOptions,
    mapper: TypeMapper<'d>,
    encoders: EncoderGenerator<'d>,
}

impl<'c, 'd> OperationTranslator<'c, 'd> {
    fn operation(
        &mut self,
        walker: &mut Walker<'_, 'd>,
        op: OperationRef<'d>,
    ) -> Result<OperationParts, TranslateError> {
        let definition = &op.definition.node;
        let kind = match definition.ty {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => {
                return Err(TranslateError::UnsupportedOperation(
                    definition.ty.to_string(),
                    op.definition.pos,
                ));
            }
        };

        let result_type = capitalize(op.name);
        let plan = walker.walk_operation(op)?;
        let result = plan.record_ty(None);
        let decoder = operation_decoder(&result_type, &plan);

        let mut inputs = Vec::new();
        let mut param_fields = Vec::new();
        let mut params = Vec::new();
        for variable in &definition.variable_definitions {
            let variable = &variable.node;
            let type_ref = TypeRef::from_ast(&variable.var_type.node);
            let wire = variable.name.node.to_string();
            let ty = self.mapper.map(&type_ref);
            let ty = match self.ctx.schema.get(type_ref.named_type()) {
                None | Some(TypeDef::Scalar(_)) => ty,
                Some(_) => {
                    let alias = format!("{result_type}_Input_{}", capitalize(&wire));
                    inputs.push((alias.clone(), ty));
                    Ty::named(alias)
                }
            };
            param_fields.push(Field {
                name: elm_safe_name(&wire),
                ty,
            });
            params.push(self.encoders.param(variable));
        }

        let request = OperationDecl {
            function_name: decapitalize(op.name),
            kind,
            method: self.options.method_for(kind),
            operation_name: op.name.to_string(),
            query_text: operation_text(self.ctx, op)?,
            params_type: (!params.is_empty()).then(|| format!("{result_type}_Input")),
            params,
            response: self.options.response_ty(&result_type),
            decoder_name: decoder_name(&result_type),
        };

        Ok(OperationParts {
            result_type,
            result,
            inputs,
            param_fields,
            request,
            decoder,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
