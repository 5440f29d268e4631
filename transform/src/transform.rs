//! Call-site extraction and rewriting
//!
//! Single pass per source file: scan top-level imports for configured
//! specifiers, walk the program for macro calls, build one synthetic
//! evaluation module carrying every call's argument nodes, evaluate it
//! through the module registry, then hand each call its computed values
//! (positionally, in AST-discovery order) so its handler can edit the
//! source buffer.
//!
//! Files that never mention a configured module name skip parsing entirely.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, info};
use parser::expression_to_code;
use parser::js_ast::*;
use parser::parse_program;
use parser::visit::{walk_expression, Visit};
use source_map::{EditBuffer, RenderedSourceMap};
use wd40_runtime::Value;

use crate::assets::replace_assets_with_imports;
use crate::constants::{ASSET_PREFIX, EVALUATION_EXPORT};
use crate::error::TransformError;
use crate::module_service::ModuleService;

/// Context handed to every specifier handler
pub struct TransformContext {
    pub filename: String,
    pub project_root: String,
}

/// Source-editing utilities available to handlers
pub struct TransformUtils {
    pending_imports: Vec<String>,
    css_text: String,
    replacement: Option<Expression>,
    named_import_counter: usize,
    default_import_counter: usize,
}

impl TransformUtils {
    fn new() -> Self {
        Self {
            pending_imports: Vec::new(),
            css_text: String::new(),
            replacement: None,
            named_import_counter: 0,
            default_import_counter: 0,
        }
    }

    /// Add `import { <export_name> as <generated> } from "<module_path>";`
    /// and return the generated local name
    pub fn add_named_import(&mut self, module_path: &str, export_name: &str) -> String {
        let local = format!("_{}{}", export_name, self.named_import_counter);
        self.named_import_counter += 1;
        self.pending_imports.push(format!(
            "import {{ {} as {} }} from {};\n",
            export_name,
            local,
            parser::codegen::quote_string(module_path)
        ));
        local
    }

    /// Add `import <generated> from "<module_path>";` and return the
    /// generated local name. Every call allocates a fresh identifier.
    pub fn add_default_import(&mut self, hint: &str, module_path: &str) -> String {
        self.default_import_counter += 1;
        let local = format!("_{}{}", hint, self.default_import_counter);
        self.pending_imports.push(format!(
            "import {} from {};\n",
            local,
            parser::codegen::quote_string(module_path)
        ));
        local
    }

    /// Replace the matched call expression with new AST
    pub fn replace_with(&mut self, expression: Expression) {
        self.replacement = Some(expression);
    }

    /// Append to the auxiliary CSS text accumulator
    pub fn append_css_text(&mut self, text: &str) {
        self.css_text.push_str(text);
    }
}

/// Everything a handler receives for one matched call
pub struct HandlerInput<'a> {
    pub context: &'a TransformContext,
    /// The matched callee identifier node
    pub callee: &'a Expression,
    /// The whole call expression
    pub call: &'a CallExpression,
    /// Computed values for the call's arguments, in argument order
    pub params: &'a [serde_json::Value],
    pub utils: &'a mut TransformUtils,
}

/// Callback that turns computed macro-argument values into source edits
pub type ModuleSpecifierHandler = Rc<dyn Fn(HandlerInput<'_>) -> Result<(), TransformError>>;

/// Which imports to intercept: a module name plus handled export names
pub struct ModuleConfig {
    pub module_name: String,
    pub specifiers: Vec<(String, ModuleSpecifierHandler)>,
}

impl ModuleConfig {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self { module_name: module_name.into(), specifiers: Vec::new() }
    }

    pub fn with_specifier(
        mut self,
        export_name: impl Into<String>,
        handler: ModuleSpecifierHandler,
    ) -> Self {
        self.specifiers.push((export_name.into(), handler));
        self
    }
}

pub struct TransformParams<'a> {
    pub source_code: &'a str,
    pub filename: &'a str,
    pub project_root: &'a str,
    pub module_config: &'a [ModuleConfig],
    pub module_service: &'a ModuleService,
}

#[derive(Debug)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<RenderedSourceMap>,
    pub css_text: String,
}

/// One matched macro call awaiting its computed values
struct Evaluation {
    callee: Expression,
    call: CallExpression,
    handler: ModuleSpecifierHandler,
}

struct CallCollector<'a> {
    handlers: &'a IndexMap<String, ModuleSpecifierHandler>,
    evaluations: Vec<Evaluation>,
}

impl Visit for CallCollector<'_> {
    fn visit_expression(&mut self, expression: &Expression) {
        if let Expression::Call(call) = expression {
            if let Expression::Identifier(id) = call.callee.as_ref() {
                if let Some(handler) = self.handlers.get(&id.name) {
                    self.evaluations.push(Evaluation {
                        callee: (*call.callee).clone(),
                        call: call.clone(),
                        handler: Rc::clone(handler),
                    });
                }
            }
        }
        walk_expression(self, expression);
    }
}

/// Transform one source file
pub async fn transform(params: TransformParams<'_>) -> Result<TransformResult, TransformError> {
    let TransformParams { source_code, filename, project_root, module_config, module_service } =
        params;

    // Cheap negative check before any parsing
    if !module_config
        .iter()
        .any(|config| source_code.contains(&config.module_name))
    {
        return Ok(unchanged(source_code));
    }

    info!("transforming {}", filename);
    let program = parse_program(filename, source_code)?;

    // local binding name → handler, from top-level imports
    let mut handlers: IndexMap<String, ModuleSpecifierHandler> = IndexMap::new();
    for statement in &program.body {
        let Statement::Import(import) = statement else { continue };
        if import.type_only {
            continue;
        }
        let Some(config) = module_config
            .iter()
            .find(|config| config.module_name == import.source.value)
        else {
            continue;
        };

        for specifier in &import.specifiers {
            if let ImportSpecifierKind::Named { imported } = &specifier.kind {
                if let Some((_, handler)) = config
                    .specifiers
                    .iter()
                    .find(|(name, _)| *name == imported.name)
                {
                    handlers.insert(specifier.local.name.clone(), Rc::clone(handler));
                }
            }
        }
    }
    if handlers.is_empty() {
        return Ok(unchanged(source_code));
    }

    // Discovery order here fixes the positional slicing below
    let mut collector = CallCollector { handlers: &handlers, evaluations: Vec::new() };
    collector.visit_program(&program);
    let evaluations = collector.evaluations;
    if evaluations.is_empty() {
        return Ok(unchanged(source_code));
    }
    debug!("{}: {} macro call(s) found", filename, evaluations.len());

    // Synthetic evaluation module: the original module's statements plus a
    // trailing export of every argument node, in discovery order
    let mut code_to_evaluate = String::with_capacity(source_code.len() + 128);
    code_to_evaluate.push_str(source_code);
    code_to_evaluate.push_str("\nexport const ");
    code_to_evaluate.push_str(EVALUATION_EXPORT);
    code_to_evaluate.push_str(" = [");
    let mut first = true;
    for evaluation in &evaluations {
        for argument in &evaluation.call.arguments {
            if !first {
                code_to_evaluate.push_str(", ");
            }
            first = false;
            let span = argument.span();
            code_to_evaluate.push_str(&source_code[span.start..span.end]);
        }
    }
    code_to_evaluate.push_str("];\n");

    let exports = module_service
        .evaluate_root_module(&code_to_evaluate, filename, &[EVALUATION_EXPORT.to_string()])
        .await?;

    let results: Vec<serde_json::Value> = match &exports {
        Value::Object(exports) => match exports.borrow().get(EVALUATION_EXPORT) {
            Some(Value::Array(elements)) => elements.borrow().iter().map(Value::to_json).collect(),
            _ => {
                return Err(TransformError::SandboxExecution {
                    module: filename.to_string(),
                    message: format!("evaluation did not produce '{}'", EVALUATION_EXPORT),
                })
            }
        },
        other => {
            return Err(TransformError::SandboxExecution {
                module: filename.to_string(),
                message: format!("evaluation produced {} instead of exports", other.type_of()),
            })
        }
    };

    let context = TransformContext {
        filename: filename.to_string(),
        project_root: project_root.to_string(),
    };
    let mut edit = EditBuffer::new(source_code);
    let mut utils = TransformUtils::new();

    // Positional slicing: call i consumes exactly its own argument count,
    // at the running offset, in the discovery order recorded above
    let mut offset = 0;
    for evaluation in &evaluations {
        let count = evaluation.call.arguments.len();
        if offset + count > results.len() {
            return Err(TransformError::SandboxExecution {
                module: filename.to_string(),
                message: "evaluation produced fewer values than call arguments".to_string(),
            });
        }
        let params = &results[offset..offset + count];
        offset += count;

        (evaluation.handler)(HandlerInput {
            context: &context,
            callee: &evaluation.callee,
            call: &evaluation.call,
            params,
            utils: &mut utils,
        })?;

        if let Some(mut replacement) = utils.replacement.take() {
            replace_assets_with_imports(project_root, filename, &mut replacement, &mut |hint,
                                                                                        path| {
                utils.add_default_import(hint, path)
            });

            let text = expression_to_code(&replacement);
            if text.contains(ASSET_PREFIX) {
                return Err(TransformError::AssetNotResolved { marker: text });
            }
            edit.update(evaluation.call.span.start, evaluation.call.span.end, &text);
        }
    }

    for import_line in &utils.pending_imports {
        edit.prepend(import_line);
    }

    let code = edit.render();
    let map = edit.render_map(filename);

    Ok(TransformResult { code, map: Some(map), css_text: utils.css_text })
}

fn unchanged(source_code: &str) -> TransformResult {
    TransformResult {
        code: source_code.to_string(),
        map: None,
        css_text: String::new(),
    }
}
