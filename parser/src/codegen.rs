//! Code emission
//!
//! [`CodeEmitter`] owns the complete dispatch table over the statement and
//! expression sum types and renders a program back to JavaScript text. The
//! output must re-parse with this crate's own parser: rewritten modules are
//! emitted here, concatenated, and parsed again inside the sandbox.
//!
//! Parenthesisation is conservative: compound operands are wrapped even
//! where precedence would allow omitting the parentheses.

use crate::js_ast::*;

/// Name of the module-registration function in the wrapped wire format:
/// `__wd40_module("<path>", function (module, exports, require, export_star) { … });`
pub const MODULE_WRAPPER_FN: &str = "__wd40_module";

/// Render a whole program to JavaScript text
pub fn program_to_code(program: &Program) -> String {
    let mut emitter = CodeEmitter::new();
    emitter.emit_program(program);
    emitter.finish()
}

/// Render a single expression to JavaScript text
pub fn expression_to_code(expression: &Expression) -> String {
    let mut emitter = CodeEmitter::new();
    emitter.emit_expression(expression);
    emitter.finish()
}

/// Render a string as a double-quoted JavaScript string literal
pub fn quote_string(value: &str) -> String {
    let mut emitter = CodeEmitter::new();
    emitter.emit_string(value);
    emitter.finish()
}

/// JavaScript code emitter with explicit indentation tracking
pub struct CodeEmitter {
    out: String,
    indent: usize,
}

impl CodeEmitter {
    pub fn new() -> Self {
        Self { out: String::new(), indent: 0 }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    pub fn emit_program(&mut self, program: &Program) {
        for (i, statement) in program.body.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.emit_statement(statement);
        }
        self.out.push('\n');
    }

    pub fn emit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Import(import) => self.emit_import(import),
            Statement::ExportNamed(export) => self.emit_export_named(export),
            Statement::ExportDefault(export) => {
                self.write("export default ");
                self.emit_expression(&export.expression);
                self.write(";");
            }
            Statement::ExportAll(export) => {
                self.write("export * from ");
                self.emit_string(&export.source.value);
                self.write(";");
            }
            Statement::Variable(declaration) => {
                self.emit_variable_declaration(declaration);
                self.write(";");
            }
            Statement::Function(declaration) => self.emit_function(&declaration.function, true),
            Statement::Expression(statement) => {
                let needs_parens = matches!(
                    statement.expression,
                    Expression::Object(_) | Expression::Function(_) | Expression::Arrow(_)
                );
                if needs_parens {
                    self.write("(");
                }
                self.emit_expression(&statement.expression);
                if needs_parens {
                    self.write(")");
                }
                self.write(";");
            }
            Statement::Return(statement) => {
                self.write("return");
                if let Some(argument) = &statement.argument {
                    self.write(" ");
                    self.emit_expression(argument);
                }
                self.write(";");
            }
            Statement::If(statement) => {
                self.write("if (");
                self.emit_expression(&statement.test);
                self.write(") ");
                self.emit_nested_statement(&statement.consequent);
                if let Some(alternate) = &statement.alternate {
                    self.write(" else ");
                    self.emit_nested_statement(alternate);
                }
            }
            Statement::While(statement) => {
                self.write("while (");
                self.emit_expression(&statement.test);
                self.write(") ");
                self.emit_nested_statement(&statement.body);
            }
            Statement::For(statement) => {
                self.write("for (");
                match &statement.init {
                    Some(ForInit::Declaration(declaration)) => {
                        self.emit_variable_declaration(declaration)
                    }
                    Some(ForInit::Expression(expression)) => self.emit_expression(expression),
                    None => {}
                }
                self.write("; ");
                if let Some(test) = &statement.test {
                    self.emit_expression(test);
                }
                self.write("; ");
                if let Some(update) = &statement.update {
                    self.emit_expression(update);
                }
                self.write(") ");
                self.emit_nested_statement(&statement.body);
            }
            Statement::ForOf(statement) => {
                self.write("for (");
                self.write(&statement.kind.to_string());
                self.write(" ");
                self.emit_pattern(&statement.left);
                self.write(" of ");
                self.emit_expression(&statement.right);
                self.write(") ");
                self.emit_nested_statement(&statement.body);
            }
            Statement::Throw(statement) => {
                self.write("throw ");
                self.emit_expression(&statement.argument);
                self.write(";");
            }
            Statement::Block(block) => self.emit_block(block),
            Statement::Break(_) => self.write("break;"),
            Statement::Continue(_) => self.write("continue;"),
            // TypeScript declarations are erased from output
            Statement::TypeAlias(_) | Statement::Interface(_) => {}
            Statement::Empty(_) => self.write(";"),
            Statement::Raw(raw) => self.write(&raw.text),
            Statement::ModuleWrapper(wrapper) => self.emit_module_wrapper(wrapper),
        }
    }

    fn emit_nested_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.emit_block(block),
            other => {
                self.indent += 1;
                self.newline();
                self.emit_statement(other);
                self.indent -= 1;
            }
        }
    }

    fn emit_block(&mut self, block: &BlockStatement) {
        self.write("{");
        self.indent += 1;
        for statement in &block.body {
            self.newline();
            self.emit_statement(statement);
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    fn emit_module_wrapper(&mut self, wrapper: &ModuleWrapper) {
        self.write(MODULE_WRAPPER_FN);
        self.write("(");
        self.emit_string(&wrapper.filename);
        self.write(", function (module, exports, require, export_star) {");
        self.indent += 1;
        for statement in &wrapper.body {
            self.newline();
            self.emit_statement(statement);
        }
        self.indent -= 1;
        self.newline();
        self.write("});");
    }

    fn emit_import(&mut self, import: &ImportDeclaration) {
        if import.type_only {
            return;
        }

        self.write("import ");

        if import.specifiers.is_empty() {
            self.emit_string(&import.source.value);
            self.write(";");
            return;
        }

        let mut first = true;
        let mut in_braces = false;
        for specifier in &import.specifiers {
            match &specifier.kind {
                ImportSpecifierKind::Default => {
                    if !first {
                        self.write(", ");
                    }
                    self.write(&specifier.local.name);
                }
                ImportSpecifierKind::Namespace => {
                    if !first {
                        self.write(", ");
                    }
                    self.write("* as ");
                    self.write(&specifier.local.name);
                }
                ImportSpecifierKind::Named { imported } => {
                    if !in_braces {
                        if !first {
                            self.write(", ");
                        }
                        self.write("{ ");
                        in_braces = true;
                    } else {
                        self.write(", ");
                    }
                    if imported.name == specifier.local.name {
                        self.write(&imported.name);
                    } else {
                        self.write(&imported.name);
                        self.write(" as ");
                        self.write(&specifier.local.name);
                    }
                }
            }
            first = false;
        }
        if in_braces {
            self.write(" }");
        }

        self.write(" from ");
        self.emit_string(&import.source.value);
        self.write(";");
    }

    fn emit_export_named(&mut self, export: &ExportNamedDeclaration) {
        if let Some(declaration) = &export.declaration {
            self.write("export ");
            self.emit_statement(declaration);
            return;
        }

        self.write("export { ");
        for (i, specifier) in export.specifiers.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if specifier.local.name == specifier.exported.name {
                self.write(&specifier.local.name);
            } else {
                self.write(&specifier.local.name);
                self.write(" as ");
                self.write(&specifier.exported.name);
            }
        }
        self.write(" }");
        if let Some(source) = &export.source {
            self.write(" from ");
            self.emit_string(&source.value);
        }
        self.write(";");
    }

    fn emit_variable_declaration(&mut self, declaration: &VariableDeclaration) {
        self.write(&declaration.kind.to_string());
        self.write(" ");
        for (i, declarator) in declaration.declarations.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_pattern(&declarator.id);
            if let Some(init) = &declarator.init {
                self.write(" = ");
                self.emit_expression(init);
            }
        }
    }

    pub fn emit_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Identifier(id) => self.write(&id.name),
            Pattern::Object(object) => {
                self.write("{ ");
                let mut first = true;
                for property in &object.properties {
                    if !first {
                        self.write(", ");
                    }
                    first = false;
                    if property.shorthand {
                        self.emit_pattern(&property.value);
                    } else {
                        self.emit_property_key(&property.key);
                        self.write(": ");
                        self.emit_pattern(&property.value);
                    }
                    if let Some(default) = &property.default {
                        self.write(" = ");
                        self.emit_expression(default);
                    }
                }
                if let Some(rest) = &object.rest {
                    if !first {
                        self.write(", ");
                    }
                    self.write("...");
                    self.write(&rest.name);
                }
                self.write(" }");
            }
            Pattern::Array(array) => {
                self.write("[");
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(element) = element {
                        self.emit_pattern(element);
                    }
                }
                self.write("]");
            }
        }
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Identifier(id) => self.write(&id.name),
            PropertyKey::String(string) => self.emit_string(&string.value),
            PropertyKey::Number(number) => self.emit_number(number.value),
            PropertyKey::Computed(expression) => {
                self.write("[");
                self.emit_expression(expression);
                self.write("]");
            }
        }
    }

    pub fn emit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(id) => self.write(&id.name),
            Expression::String(string) => self.emit_string(&string.value),
            Expression::Number(number) => self.emit_number(number.value),
            Expression::Boolean(boolean) => {
                self.write(if boolean.value { "true" } else { "false" })
            }
            Expression::Null(_) => self.write("null"),
            Expression::Template(template) => self.emit_template(template),
            Expression::Object(object) => self.emit_object(object),
            Expression::Array(array) => {
                self.write("[");
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expression(element);
                }
                self.write("]");
            }
            Expression::Call(call) => {
                self.emit_callee(&call.callee);
                if call.optional {
                    self.write("?.");
                }
                self.write("(");
                for (i, argument) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expression(argument);
                }
                self.write(")");
            }
            Expression::New(new) => {
                self.write("new ");
                self.emit_callee(&new.callee);
                self.write("(");
                for (i, argument) in new.arguments.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expression(argument);
                }
                self.write(")");
            }
            Expression::Member(member) => {
                self.emit_callee(&member.object);
                match &member.property {
                    MemberProperty::Identifier(id) => {
                        self.write(if member.optional { "?." } else { "." });
                        self.write(&id.name);
                    }
                    MemberProperty::Computed(property) => {
                        if member.optional {
                            self.write("?.");
                        }
                        self.write("[");
                        self.emit_expression(property);
                        self.write("]");
                    }
                }
            }
            Expression::Arrow(arrow) => {
                self.write("(");
                for (i, param) in arrow.params.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_param(param);
                }
                self.write(") => ");
                match &arrow.body {
                    ArrowBody::Expression(expr) => {
                        // An object body must be parenthesised
                        if matches!(**expr, Expression::Object(_)) {
                            self.write("(");
                            self.emit_expression(expr);
                            self.write(")");
                        } else {
                            self.emit_operand(expr);
                        }
                    }
                    ArrowBody::Block(block) => self.emit_block(block),
                }
            }
            Expression::Function(function) => self.emit_function(&function.function, false),
            Expression::Unary(unary) => {
                self.write(unary.op.as_str());
                match unary.op {
                    UnaryOp::TypeOf | UnaryOp::Void => self.write(" "),
                    _ => {}
                }
                self.emit_operand(&unary.argument);
            }
            Expression::Binary(binary) => {
                self.emit_operand(&binary.left);
                self.write(" ");
                self.write(binary.op.as_str());
                self.write(" ");
                self.emit_operand(&binary.right);
            }
            Expression::Logical(logical) => {
                self.emit_operand(&logical.left);
                self.write(" ");
                self.write(logical.op.as_str());
                self.write(" ");
                self.emit_operand(&logical.right);
            }
            Expression::Conditional(conditional) => {
                self.emit_operand(&conditional.test);
                self.write(" ? ");
                self.emit_operand(&conditional.consequent);
                self.write(" : ");
                self.emit_operand(&conditional.alternate);
            }
            Expression::Assignment(assignment) => {
                self.emit_expression(&assignment.target);
                self.write(" ");
                self.write(assignment.op.as_str());
                self.write(" ");
                self.emit_expression(&assignment.value);
            }
            Expression::Spread(spread) => {
                self.write("...");
                self.emit_expression(&spread.argument);
            }
            Expression::Paren(paren) => {
                self.write("(");
                self.emit_expression(&paren.expression);
                self.write(")");
            }
        }
    }

    /// Emit an operand of a compound expression, parenthesising nested
    /// compounds conservatively
    fn emit_operand(&mut self, expression: &Expression) {
        let needs_parens = matches!(
            expression,
            Expression::Binary(_)
                | Expression::Logical(_)
                | Expression::Conditional(_)
                | Expression::Assignment(_)
                | Expression::Arrow(_)
        );
        if needs_parens {
            self.write("(");
        }
        self.emit_expression(expression);
        if needs_parens {
            self.write(")");
        }
    }

    /// Emit a callee or member object, parenthesising anything that could
    /// swallow the following `(` or `.`
    fn emit_callee(&mut self, expression: &Expression) {
        let needs_parens = matches!(
            expression,
            Expression::Function(_)
                | Expression::Arrow(_)
                | Expression::Object(_)
                | Expression::Number(_)
                | Expression::Binary(_)
                | Expression::Logical(_)
                | Expression::Conditional(_)
                | Expression::Assignment(_)
        );
        if needs_parens {
            self.write("(");
        }
        self.emit_expression(expression);
        if needs_parens {
            self.write(")");
        }
    }

    fn emit_param(&mut self, param: &FunctionParam) {
        if param.rest {
            self.write("...");
        }
        self.emit_pattern(&param.pattern);
        if let Some(default) = &param.default {
            self.write(" = ");
            self.emit_expression(default);
        }
    }

    fn emit_function(&mut self, function: &Function, _declaration: bool) {
        self.write("function");
        if let Some(name) = &function.name {
            self.write(" ");
            self.write(&name.name);
        }
        self.write("(");
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_param(param);
        }
        self.write(") ");
        self.emit_block(&function.body);
    }

    fn emit_object(&mut self, object: &ObjectExpression) {
        if object.properties.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.indent += 1;
        for (i, member) in object.properties.iter().enumerate() {
            if i > 0 {
                self.write(",");
            }
            self.newline();
            match member {
                ObjectMember::Property(property) => {
                    if property.shorthand {
                        if let PropertyKey::Identifier(id) = &property.key {
                            self.write(&id.name);
                            continue;
                        }
                    }
                    self.emit_property_key(&property.key);
                    self.write(": ");
                    self.emit_expression(&property.value);
                }
                ObjectMember::Spread(spread) => {
                    self.write("...");
                    self.emit_expression(&spread.argument);
                }
            }
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    fn emit_template(&mut self, template: &TemplateLiteral) {
        self.write("`");
        for (i, quasi) in template.quasis.iter().enumerate() {
            self.write(&quasi.raw);
            if i < template.expressions.len() {
                self.write("${");
                self.emit_expression(&template.expressions[i]);
                self.write("}");
            }
        }
        self.write("`");
    }

    fn emit_number(&mut self, value: f64) {
        if value.fract() == 0.0 && value.is_finite() && value.abs() < 9_007_199_254_740_992.0 {
            self.write(&format!("{}", value as i64));
        } else {
            self.write(&format!("{}", value));
        }
    }

    fn emit_string(&mut self, value: &str) {
        self.write("\"");
        for c in value.chars() {
            match c {
                '"' => self.write("\\\""),
                '\\' => self.write("\\\\"),
                '\n' => self.write("\\n"),
                '\r' => self.write("\\r"),
                '\t' => self.write("\\t"),
                c if (c as u32) < 0x20 => {
                    self.write(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
        }
        self.write("\"");
    }
}

impl Default for CodeEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js_parser::parse_program;

    fn roundtrip(source: &str) -> String {
        let program = parse_program("test.ts", source).expect("source should parse");
        program_to_code(&program)
    }

    #[test]
    fn test_emit_variable_declaration() {
        assert_eq!(roundtrip("const a = 1;"), "const a = 1;\n");
    }

    #[test]
    fn test_emit_string_escapes() {
        assert_eq!(roundtrip("const s = 'a\\nb';"), "const s = \"a\\nb\";\n");
    }

    #[test]
    fn test_emit_object_literal() {
        let out = roundtrip("const o = { root: { color: 'red' } };");
        assert!(out.contains("root"));
        assert!(out.contains("color: \"red\""));
    }

    #[test]
    fn test_emit_import_named_alias() {
        assert_eq!(
            roundtrip("import { makeStyles as ms } from '@griffel/core';"),
            "import { makeStyles as ms } from \"@griffel/core\";\n"
        );
    }

    #[test]
    fn test_emit_export_star() {
        assert_eq!(roundtrip("export * from './other';"), "export * from \"./other\";\n");
    }

    #[test]
    fn test_emit_template_literal() {
        let out = roundtrip("const s = `url(${asset})`;");
        assert_eq!(out, "const s = `url(${asset})`;\n");
    }

    #[test]
    fn test_emit_module_wrapper() {
        let program = Program {
            body: vec![Statement::ModuleWrapper(ModuleWrapper {
                filename: "/src/a.ts".to_string(),
                body: vec![Statement::Raw(RawStatement::new("exports.a = 1;"))],
                span: Span::default(),
            })],
            span: Span::default(),
        };

        let code = program_to_code(&program);
        assert!(code.starts_with(
            "__wd40_module(\"/src/a.ts\", function (module, exports, require, export_star) {"
        ));
        assert!(code.contains("exports.a = 1;"));
        assert!(code.trim_end().ends_with("});"));
    }

    #[test]
    fn test_reparse_emitted_wrapper() {
        let program = Program {
            body: vec![Statement::ModuleWrapper(ModuleWrapper {
                filename: "/src/a.ts".to_string(),
                body: vec![Statement::Raw(RawStatement::new(
                    "const { b } = require(\"/src/b.ts\");",
                ))],
                span: Span::default(),
            })],
            span: Span::default(),
        };

        let code = program_to_code(&program);
        let reparsed = parse_program("wrapped.js", &code).expect("emitted wrapper should parse");
        assert_eq!(reparsed.body.len(), 1);
    }

    #[test]
    fn test_emit_arrow_with_object_body() {
        let out = roundtrip("const f = (rule) => ({ color: 'red', ...rule });");
        assert!(out.contains("=> ({"));
        assert!(out.contains("...rule"));
    }
}
