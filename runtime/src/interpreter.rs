//! Tree-walking interpreter for sandboxed module code
//!
//! Evaluates the parser's AST directly, producing [`Value`] results. The
//! interpreter handles literals, variables, destructuring, control flow,
//! closures, member access and the built-in functions installed by
//! `builtins`. Module code is expected to be synchronous and
//! side-effect-light; there is no event loop.

use std::fmt;
use std::rc::Rc;

use parser::js_ast::*;

use crate::builtins;
use crate::environment::{self, Scope, ScopeRef};
use crate::value::{FunctionBody, JsFunction, JsObject, NativeFunction, Value};

/// Maximum call depth for interpreted function calls
const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Runtime error raised by evaluated code or the interpreter itself
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Statement execution outcome
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// The sandbox interpreter
pub struct Interpreter {
    global: ScopeRef,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        let global = Scope::root();
        builtins::install_globals(&global);
        Self {
            global,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn global_scope(&self) -> ScopeRef {
        Rc::clone(&self.global)
    }

    /// Define a binding in the global scope
    pub fn define_global(&self, name: &str, value: Value) {
        environment::define(&self.global, name, value);
    }

    /// Execute a whole program in the global scope
    pub fn run_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let scope = self.global_scope();
        for statement in &program.body {
            match self.exec_statement(statement, &scope)? {
                Flow::Normal => {}
                _ => {
                    return Err(RuntimeError::new(
                        "illegal control-flow statement at module top level",
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn exec_statement(
        &mut self,
        statement: &Statement,
        scope: &ScopeRef,
    ) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Variable(declaration) => {
                for declarator in &declaration.declarations {
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(&declarator.id, value, scope)?;
                }
                Ok(Flow::Normal)
            }
            Statement::Function(declaration) => {
                let function = &declaration.function;
                let name = function
                    .name
                    .as_ref()
                    .map(|id| id.name.clone())
                    .unwrap_or_default();
                let value = Value::Function(Rc::new(JsFunction {
                    name: Some(name.clone()),
                    params: function.params.clone(),
                    body: FunctionBody::Block(function.body.clone()),
                    closure: Rc::clone(scope),
                }));
                environment::define(scope, &name, value);
                Ok(Flow::Normal)
            }
            Statement::Expression(statement) => {
                self.eval(&statement.expression, scope)?;
                Ok(Flow::Normal)
            }
            Statement::Return(statement) => {
                let value = match &statement.argument {
                    Some(argument) => self.eval(argument, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Statement::If(statement) => {
                if self.eval(&statement.test, scope)?.is_truthy() {
                    self.exec_statement(&statement.consequent, scope)
                } else if let Some(alternate) = &statement.alternate {
                    self.exec_statement(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While(statement) => {
                while self.eval(&statement.test, scope)?.is_truthy() {
                    match self.exec_statement(&statement.body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::For(statement) => {
                let loop_scope = Scope::child(scope);
                match &statement.init {
                    Some(ForInit::Declaration(declaration)) => {
                        for declarator in &declaration.declarations {
                            let value = match &declarator.init {
                                Some(init) => self.eval(init, &loop_scope)?,
                                None => Value::Undefined,
                            };
                            self.bind_pattern(&declarator.id, value, &loop_scope)?;
                        }
                    }
                    Some(ForInit::Expression(expression)) => {
                        self.eval(expression, &loop_scope)?;
                    }
                    None => {}
                }

                loop {
                    if let Some(test) = &statement.test {
                        if !self.eval(test, &loop_scope)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec_statement(&statement.body, &loop_scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(update) = &statement.update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::ForOf(statement) => {
                let iterable = self.eval(&statement.right, scope)?;
                let items: Vec<Value> = match &iterable {
                    Value::Array(elements) => elements.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    other => {
                        return Err(RuntimeError::new(format!(
                            "{} is not iterable",
                            other.type_of()
                        )))
                    }
                };

                for item in items {
                    let iteration_scope = Scope::child(scope);
                    self.bind_pattern(&statement.left, item, &iteration_scope)?;
                    match self.exec_statement(&statement.body, &iteration_scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Throw(statement) => {
                let value = self.eval(&statement.argument, scope)?;
                Err(RuntimeError::new(thrown_message(&value)))
            }
            Statement::Block(block) => {
                let block_scope = Scope::child(scope);
                for statement in &block.body {
                    match self.exec_statement(statement, &block_scope)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
            Statement::Empty(_) | Statement::TypeAlias(_) | Statement::Interface(_) => {
                Ok(Flow::Normal)
            }
            Statement::Import(_)
            | Statement::ExportNamed(_)
            | Statement::ExportDefault(_)
            | Statement::ExportAll(_)
            | Statement::Raw(_)
            | Statement::ModuleWrapper(_) => Err(RuntimeError::new(
                "module declarations cannot be executed in the sandbox",
            )),
        }
    }

    pub fn eval(&mut self, expression: &Expression, scope: &ScopeRef) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Identifier(id) => environment::lookup(scope, &id.name)
                .ok_or_else(|| RuntimeError::new(format!("{} is not defined", id.name))),
            Expression::String(string) => Ok(Value::string(string.value.clone())),
            Expression::Number(number) => Ok(Value::Number(number.value)),
            Expression::Boolean(boolean) => Ok(Value::Bool(boolean.value)),
            Expression::Null(_) => Ok(Value::Null),
            Expression::Template(template) => {
                let mut out = String::new();
                for (i, quasi) in template.quasis.iter().enumerate() {
                    out.push_str(&quasi.cooked);
                    if i < template.expressions.len() {
                        let value = self.eval(&template.expressions[i], scope)?;
                        out.push_str(&value.to_display_string());
                    }
                }
                Ok(Value::string(out))
            }
            Expression::Object(object) => {
                let mut result = JsObject::new();
                for member in &object.properties {
                    match member {
                        ObjectMember::Property(property) => {
                            let key = self.property_key_string(&property.key, scope)?;
                            let value = self.eval(&property.value, scope)?;
                            result.insert(key, value);
                        }
                        ObjectMember::Spread(spread) => {
                            let source = self.eval(&spread.argument, scope)?;
                            match source {
                                Value::Object(source) => {
                                    let source = source.borrow();
                                    for key in source.keys() {
                                        if let Some(value) = source.get(&key) {
                                            result.insert(key, value);
                                        }
                                    }
                                }
                                Value::Undefined | Value::Null => {}
                                other => {
                                    return Err(RuntimeError::new(format!(
                                        "cannot spread {} into an object",
                                        other.type_of()
                                    )))
                                }
                            }
                        }
                    }
                }
                Ok(Value::object(result))
            }
            Expression::Array(array) => {
                let mut elements = Vec::new();
                for element in &array.elements {
                    match element {
                        Expression::Spread(spread) => {
                            let source = self.eval(&spread.argument, scope)?;
                            match source {
                                Value::Array(source) => elements.extend(source.borrow().clone()),
                                other => {
                                    return Err(RuntimeError::new(format!(
                                        "cannot spread {} into an array",
                                        other.type_of()
                                    )))
                                }
                            }
                        }
                        other => elements.push(self.eval(other, scope)?),
                    }
                }
                Ok(Value::array(elements))
            }
            Expression::Call(call) => {
                let callee = self.eval(&call.callee, scope)?;
                if call.optional && matches!(callee, Value::Undefined | Value::Null) {
                    return Ok(Value::Undefined);
                }

                let mut args = Vec::new();
                for argument in &call.arguments {
                    match argument {
                        Expression::Spread(spread) => {
                            let source = self.eval(&spread.argument, scope)?;
                            match source {
                                Value::Array(source) => args.extend(source.borrow().clone()),
                                other => {
                                    return Err(RuntimeError::new(format!(
                                        "cannot spread {} into arguments",
                                        other.type_of()
                                    )))
                                }
                            }
                        }
                        other => args.push(self.eval(other, scope)?),
                    }
                }

                self.call_value(&callee, args)
            }
            Expression::New(new) => {
                let callee = self.eval(&new.callee, scope)?;
                let mut args = Vec::new();
                for argument in &new.arguments {
                    args.push(self.eval(argument, scope)?);
                }
                let result = self.call_value(&callee, args)?;
                match result {
                    value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
                    _ => Ok(Value::object(JsObject::new())),
                }
            }
            Expression::Member(member) => {
                let object = self.eval(&member.object, scope)?;
                if member.optional && matches!(object, Value::Undefined | Value::Null) {
                    return Ok(Value::Undefined);
                }

                match &member.property {
                    MemberProperty::Identifier(id) => self.get_member(&object, &id.name),
                    MemberProperty::Computed(property) => {
                        let key = self.eval(property, scope)?;
                        if let (Value::Array(elements), Value::Number(index)) = (&object, &key) {
                            let elements = elements.borrow();
                            let index = *index as usize;
                            return Ok(elements.get(index).cloned().unwrap_or(Value::Undefined));
                        }
                        self.get_member(&object, &key.to_display_string())
                    }
                }
            }
            Expression::Arrow(arrow) => Ok(Value::Function(Rc::new(JsFunction {
                name: None,
                params: arrow.params.clone(),
                body: arrow.body.clone().into(),
                closure: Rc::clone(scope),
            }))),
            Expression::Function(function) => {
                let shape = &function.function;
                Ok(Value::Function(Rc::new(JsFunction {
                    name: shape.name.as_ref().map(|id| id.name.clone()),
                    params: shape.params.clone(),
                    body: FunctionBody::Block(shape.body.clone()),
                    closure: Rc::clone(scope),
                })))
            }
            Expression::Unary(unary) => {
                // `typeof missing` must not throw on undeclared identifiers
                if unary.op == UnaryOp::TypeOf {
                    if let Expression::Identifier(id) = unary.argument.as_ref() {
                        return match environment::lookup(scope, &id.name) {
                            Some(value) => Ok(Value::string(value.type_of())),
                            None => Ok(Value::string("undefined")),
                        };
                    }
                }

                let value = self.eval(&unary.argument, scope)?;
                match unary.op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Minus => Ok(Value::Number(-value.to_number())),
                    UnaryOp::Plus => Ok(Value::Number(value.to_number())),
                    UnaryOp::TypeOf => Ok(Value::string(value.type_of())),
                    UnaryOp::Void => Ok(Value::Undefined),
                }
            }
            Expression::Binary(binary) => {
                let left = self.eval(&binary.left, scope)?;
                let right = self.eval(&binary.right, scope)?;
                self.binary_op(binary.op, &left, &right)
            }
            Expression::Logical(logical) => {
                let left = self.eval(&logical.left, scope)?;
                match logical.op {
                    LogicalOp::And => {
                        if left.is_truthy() {
                            self.eval(&logical.right, scope)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOp::Or => {
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.eval(&logical.right, scope)
                        }
                    }
                    LogicalOp::Nullish => {
                        if matches!(left, Value::Undefined | Value::Null) {
                            self.eval(&logical.right, scope)
                        } else {
                            Ok(left)
                        }
                    }
                }
            }
            Expression::Conditional(conditional) => {
                if self.eval(&conditional.test, scope)?.is_truthy() {
                    self.eval(&conditional.consequent, scope)
                } else {
                    self.eval(&conditional.alternate, scope)
                }
            }
            Expression::Assignment(assignment) => {
                let value = self.eval(&assignment.value, scope)?;
                let value = match assignment.op {
                    AssignOp::Assign => value,
                    AssignOp::AddAssign => {
                        let current = self.eval(&assignment.target, scope)?;
                        self.binary_op(BinaryOp::Add, &current, &value)?
                    }
                };

                match assignment.target.as_ref() {
                    Expression::Identifier(id) => {
                        if !environment::assign(scope, &id.name, value.clone()) {
                            return Err(RuntimeError::new(format!(
                                "{} is not defined",
                                id.name
                            )));
                        }
                        Ok(value)
                    }
                    Expression::Member(member) => {
                        let object = self.eval(&member.object, scope)?;
                        let key = match &member.property {
                            MemberProperty::Identifier(id) => id.name.clone(),
                            MemberProperty::Computed(property) => {
                                self.eval(property, scope)?.to_display_string()
                            }
                        };
                        self.set_member(&object, &key, value.clone())?;
                        Ok(value)
                    }
                    _ => Err(RuntimeError::new("invalid assignment target")),
                }
            }
            Expression::Spread(_) => {
                Err(RuntimeError::new("spread is only valid in calls, arrays and objects"))
            }
            Expression::Paren(paren) => self.eval(&paren.expression, scope),
        }
    }

    fn property_key_string(
        &mut self,
        key: &PropertyKey,
        scope: &ScopeRef,
    ) -> Result<String, RuntimeError> {
        match key {
            PropertyKey::Identifier(id) => Ok(id.name.clone()),
            PropertyKey::String(string) => Ok(string.value.clone()),
            PropertyKey::Number(number) => Ok(crate::value::format_number(number.value)),
            PropertyKey::Computed(expression) => {
                Ok(self.eval(expression, scope)?.to_display_string())
            }
        }
    }

    fn binary_op(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::Add => {
                if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                    Ok(Value::string(format!(
                        "{}{}",
                        left.to_display_string(),
                        right.to_display_string()
                    )))
                } else {
                    Ok(Value::Number(left.to_number() + right.to_number()))
                }
            }
            BinaryOp::Sub => Ok(Value::Number(left.to_number() - right.to_number())),
            BinaryOp::Mul => Ok(Value::Number(left.to_number() * right.to_number())),
            BinaryOp::Div => Ok(Value::Number(left.to_number() / right.to_number())),
            BinaryOp::Mod => Ok(Value::Number(left.to_number() % right.to_number())),
            BinaryOp::Eq => Ok(Value::Bool(left.loose_equals(right))),
            BinaryOp::NotEq => Ok(Value::Bool(!left.loose_equals(right))),
            BinaryOp::StrictEq => Ok(Value::Bool(left.strict_equals(right))),
            BinaryOp::StrictNotEq => Ok(Value::Bool(!left.strict_equals(right))),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                let result = match (left, right) {
                    (Value::Str(a), Value::Str(b)) => match op {
                        BinaryOp::Lt => a < b,
                        BinaryOp::Gt => a > b,
                        BinaryOp::LtEq => a <= b,
                        _ => a >= b,
                    },
                    _ => {
                        let a = left.to_number();
                        let b = right.to_number();
                        match op {
                            BinaryOp::Lt => a < b,
                            BinaryOp::Gt => a > b,
                            BinaryOp::LtEq => a <= b,
                            _ => a >= b,
                        }
                    }
                };
                Ok(Value::Bool(result))
            }
        }
    }

    /// Call a function value with the given arguments
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Native(native) => {
                let func = Rc::clone(&native.func);
                func(self, &args)
            }
            Value::Function(function) => {
                if self.call_depth >= self.max_call_depth {
                    return Err(RuntimeError::new(format!(
                        "maximum call depth of {} exceeded",
                        self.max_call_depth
                    )));
                }
                self.call_depth += 1;
                let result = self.call_function(function, args);
                self.call_depth -= 1;
                result
            }
            other => Err(RuntimeError::new(format!("{} is not a function", other.type_of()))),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<JsFunction>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let scope = Scope::child(&function.closure);

        let mut args_iter = args.into_iter();
        for param in &function.params {
            if param.rest {
                let rest: Vec<Value> = args_iter.by_ref().collect();
                self.bind_pattern(&param.pattern, Value::array(rest), &scope)?;
                break;
            }

            let mut value = args_iter.next().unwrap_or(Value::Undefined);
            if matches!(value, Value::Undefined) {
                if let Some(default) = &param.default {
                    value = self.eval(default, &scope)?;
                }
            }
            self.bind_pattern(&param.pattern, value, &scope)?;
        }

        match &function.body {
            FunctionBody::Expression(expression) => self.eval(expression, &scope),
            FunctionBody::Block(block) => {
                for statement in &block.body {
                    match self.exec_statement(statement, &scope)? {
                        Flow::Normal => {}
                        Flow::Return(value) => return Ok(value),
                        Flow::Break | Flow::Continue => {
                            return Err(RuntimeError::new(
                                "illegal control-flow statement in function body",
                            ))
                        }
                    }
                }
                Ok(Value::Undefined)
            }
        }
    }

    /// Bind a declaration pattern against a value
    pub fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        scope: &ScopeRef,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Identifier(id) => {
                environment::define(scope, &id.name, value);
                Ok(())
            }
            Pattern::Object(object) => {
                if matches!(value, Value::Undefined | Value::Null) {
                    return Err(RuntimeError::new("cannot destructure undefined"));
                }

                let mut taken = Vec::new();
                for property in &object.properties {
                    let key = self.property_key_string(&property.key, scope)?;
                    let mut extracted = self.get_member(&value, &key)?;
                    if matches!(extracted, Value::Undefined) {
                        if let Some(default) = &property.default {
                            extracted = self.eval(default, scope)?;
                        }
                    }
                    self.bind_pattern(&property.value, extracted, scope)?;
                    taken.push(key);
                }

                if let Some(rest) = &object.rest {
                    let mut remaining = JsObject::new();
                    if let Value::Object(source) = &value {
                        let source = source.borrow();
                        for key in source.keys() {
                            if !taken.contains(&key) {
                                if let Some(v) = source.get(&key) {
                                    remaining.insert(key, v);
                                }
                            }
                        }
                    }
                    environment::define(scope, &rest.name, Value::object(remaining));
                }
                Ok(())
            }
            Pattern::Array(array) => {
                let elements: Vec<Value> = match &value {
                    Value::Array(elements) => elements.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    _ => return Err(RuntimeError::new("cannot destructure non-iterable value")),
                };

                for (i, slot) in array.elements.iter().enumerate() {
                    if let Some(slot) = slot {
                        let element = elements.get(i).cloned().unwrap_or(Value::Undefined);
                        self.bind_pattern(slot, element, scope)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Property access with method fallback
    pub fn get_member(&mut self, object: &Value, key: &str) -> Result<Value, RuntimeError> {
        match object {
            Value::Object(obj) => {
                if let Some(value) = obj.borrow().get(key) {
                    return Ok(value);
                }
                Ok(builtins::member_method(object, key).unwrap_or(Value::Undefined))
            }
            Value::Array(elements) => {
                if key == "length" {
                    return Ok(Value::Number(elements.borrow().len() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(elements.borrow().get(index).cloned().unwrap_or(Value::Undefined));
                }
                Ok(builtins::member_method(object, key).unwrap_or(Value::Undefined))
            }
            Value::Str(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                Ok(builtins::member_method(object, key).unwrap_or(Value::Undefined))
            }
            Value::Undefined | Value::Null => Err(RuntimeError::new(format!(
                "cannot read properties of {} (reading '{}')",
                object.to_display_string(),
                key
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    /// Property assignment
    pub fn set_member(&mut self, object: &Value, key: &str, value: Value) -> Result<(), RuntimeError> {
        match object {
            Value::Object(obj) => {
                obj.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(elements) => {
                if let Ok(index) = key.parse::<usize>() {
                    let mut elements = elements.borrow_mut();
                    if index >= elements.len() {
                        elements.resize(index + 1, Value::Undefined);
                    }
                    elements[index] = value;
                    return Ok(());
                }
                Err(RuntimeError::new(format!("cannot set property '{}' on array", key)))
            }
            other => Err(RuntimeError::new(format!(
                "cannot set properties of {} (setting '{}')",
                other.type_of(),
                key
            ))),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Error message for a thrown value
fn thrown_message(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            let object = object.borrow();
            let name = object
                .get("name")
                .map(|v| v.to_display_string())
                .unwrap_or_else(|| "Error".to_string());
            let message = object
                .get("message")
                .map(|v| v.to_display_string())
                .unwrap_or_default();
            format!("{}: {}", name, message)
        }
        other => other.to_display_string(),
    }
}

/// Make a native function value
pub fn native(
    name: &'static str,
    func: impl Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
) -> Value {
    Value::Native(NativeFunction::new(name, func))
}
