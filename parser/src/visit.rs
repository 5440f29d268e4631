//! AST traversal
//!
//! [`Visit`] walks a program in source order with overridable hooks per node
//! family; [`VisitMut`] is the mutating counterpart used by rewrite passes.
//! Walk order is deterministic preorder: statements in body order, callees
//! before arguments, object members in declaration order.

use crate::js_ast::*;

/// Read-only preorder traversal
pub trait Visit {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }
}

pub fn walk_program<V: Visit + ?Sized>(visitor: &mut V, program: &Program) {
    for statement in &program.body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visit + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Import(_) => {}
        Statement::ExportNamed(export) => {
            if let Some(declaration) = &export.declaration {
                visitor.visit_statement(declaration);
            }
        }
        Statement::ExportDefault(export) => visitor.visit_expression(&export.expression),
        Statement::ExportAll(_) => {}
        Statement::Variable(declaration) => {
            for declarator in &declaration.declarations {
                visitor.visit_pattern(&declarator.id);
                if let Some(init) = &declarator.init {
                    visitor.visit_expression(init);
                }
            }
        }
        Statement::Function(declaration) => {
            walk_function(visitor, &declaration.function);
        }
        Statement::Expression(statement) => visitor.visit_expression(&statement.expression),
        Statement::Return(statement) => {
            if let Some(argument) = &statement.argument {
                visitor.visit_expression(argument);
            }
        }
        Statement::If(statement) => {
            visitor.visit_expression(&statement.test);
            visitor.visit_statement(&statement.consequent);
            if let Some(alternate) = &statement.alternate {
                visitor.visit_statement(alternate);
            }
        }
        Statement::While(statement) => {
            visitor.visit_expression(&statement.test);
            visitor.visit_statement(&statement.body);
        }
        Statement::For(statement) => {
            match &statement.init {
                Some(ForInit::Declaration(declaration)) => {
                    for declarator in &declaration.declarations {
                        visitor.visit_pattern(&declarator.id);
                        if let Some(init) = &declarator.init {
                            visitor.visit_expression(init);
                        }
                    }
                }
                Some(ForInit::Expression(expression)) => visitor.visit_expression(expression),
                None => {}
            }
            if let Some(test) = &statement.test {
                visitor.visit_expression(test);
            }
            if let Some(update) = &statement.update {
                visitor.visit_expression(update);
            }
            visitor.visit_statement(&statement.body);
        }
        Statement::ForOf(statement) => {
            visitor.visit_pattern(&statement.left);
            visitor.visit_expression(&statement.right);
            visitor.visit_statement(&statement.body);
        }
        Statement::Throw(statement) => visitor.visit_expression(&statement.argument),
        Statement::Block(block) => {
            for statement in &block.body {
                visitor.visit_statement(statement);
            }
        }
        Statement::Break(_) | Statement::Continue(_) => {}
        Statement::TypeAlias(_) | Statement::Interface(_) | Statement::Empty(_) => {}
        Statement::Raw(_) => {}
        Statement::ModuleWrapper(wrapper) => {
            for statement in &wrapper.body {
                visitor.visit_statement(statement);
            }
        }
    }
}

fn walk_function<V: Visit + ?Sized>(visitor: &mut V, function: &Function) {
    for param in &function.params {
        visitor.visit_pattern(&param.pattern);
        if let Some(default) = &param.default {
            visitor.visit_expression(default);
        }
    }
    for statement in &function.body.body {
        visitor.visit_statement(statement);
    }
}

pub fn walk_expression<V: Visit + ?Sized>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::Identifier(_)
        | Expression::String(_)
        | Expression::Number(_)
        | Expression::Boolean(_)
        | Expression::Null(_) => {}
        Expression::Template(template) => {
            for expr in &template.expressions {
                visitor.visit_expression(expr);
            }
        }
        Expression::Object(object) => {
            for member in &object.properties {
                match member {
                    ObjectMember::Property(property) => {
                        if let PropertyKey::Computed(key) = &property.key {
                            visitor.visit_expression(key);
                        }
                        visitor.visit_expression(&property.value);
                    }
                    ObjectMember::Spread(spread) => visitor.visit_expression(&spread.argument),
                }
            }
        }
        Expression::Array(array) => {
            for element in &array.elements {
                visitor.visit_expression(element);
            }
        }
        Expression::Call(call) => {
            visitor.visit_expression(&call.callee);
            for argument in &call.arguments {
                visitor.visit_expression(argument);
            }
        }
        Expression::New(new) => {
            visitor.visit_expression(&new.callee);
            for argument in &new.arguments {
                visitor.visit_expression(argument);
            }
        }
        Expression::Member(member) => {
            visitor.visit_expression(&member.object);
            if let MemberProperty::Computed(property) = &member.property {
                visitor.visit_expression(property);
            }
        }
        Expression::Arrow(arrow) => {
            for param in &arrow.params {
                visitor.visit_pattern(&param.pattern);
                if let Some(default) = &param.default {
                    visitor.visit_expression(default);
                }
            }
            match &arrow.body {
                ArrowBody::Expression(expr) => visitor.visit_expression(expr),
                ArrowBody::Block(block) => {
                    for statement in &block.body {
                        visitor.visit_statement(statement);
                    }
                }
            }
        }
        Expression::Function(function) => walk_function(visitor, &function.function),
        Expression::Unary(unary) => visitor.visit_expression(&unary.argument),
        Expression::Binary(binary) => {
            visitor.visit_expression(&binary.left);
            visitor.visit_expression(&binary.right);
        }
        Expression::Logical(logical) => {
            visitor.visit_expression(&logical.left);
            visitor.visit_expression(&logical.right);
        }
        Expression::Conditional(conditional) => {
            visitor.visit_expression(&conditional.test);
            visitor.visit_expression(&conditional.consequent);
            visitor.visit_expression(&conditional.alternate);
        }
        Expression::Assignment(assignment) => {
            visitor.visit_expression(&assignment.target);
            visitor.visit_expression(&assignment.value);
        }
        Expression::Spread(spread) => visitor.visit_expression(&spread.argument),
        Expression::Paren(paren) => visitor.visit_expression(&paren.expression),
    }
}

pub fn walk_pattern<V: Visit + ?Sized>(visitor: &mut V, pattern: &Pattern) {
    match pattern {
        Pattern::Identifier(_) => {}
        Pattern::Object(object) => {
            for property in &object.properties {
                if let PropertyKey::Computed(key) = &property.key {
                    visitor.visit_expression(key);
                }
                visitor.visit_pattern(&property.value);
                if let Some(default) = &property.default {
                    visitor.visit_expression(default);
                }
            }
        }
        Pattern::Array(array) => {
            for element in array.elements.iter().flatten() {
                visitor.visit_pattern(element);
            }
        }
    }
}

/// Mutating preorder traversal
pub trait VisitMut {
    fn visit_expression_mut(&mut self, expression: &mut Expression) {
        walk_expression_mut(self, expression);
    }

    fn visit_statement_mut(&mut self, statement: &mut Statement) {
        walk_statement_mut(self, statement);
    }
}

pub fn walk_statement_mut<V: VisitMut + ?Sized>(visitor: &mut V, statement: &mut Statement) {
    match statement {
        Statement::Import(_) => {}
        Statement::ExportNamed(export) => {
            if let Some(declaration) = &mut export.declaration {
                visitor.visit_statement_mut(declaration);
            }
        }
        Statement::ExportDefault(export) => visitor.visit_expression_mut(&mut export.expression),
        Statement::ExportAll(_) => {}
        Statement::Variable(declaration) => {
            for declarator in &mut declaration.declarations {
                if let Some(init) = &mut declarator.init {
                    visitor.visit_expression_mut(init);
                }
            }
        }
        Statement::Function(declaration) => {
            for statement in &mut declaration.function.body.body {
                visitor.visit_statement_mut(statement);
            }
        }
        Statement::Expression(statement) => visitor.visit_expression_mut(&mut statement.expression),
        Statement::Return(statement) => {
            if let Some(argument) = &mut statement.argument {
                visitor.visit_expression_mut(argument);
            }
        }
        Statement::If(statement) => {
            visitor.visit_expression_mut(&mut statement.test);
            visitor.visit_statement_mut(&mut statement.consequent);
            if let Some(alternate) = &mut statement.alternate {
                visitor.visit_statement_mut(alternate);
            }
        }
        Statement::While(statement) => {
            visitor.visit_expression_mut(&mut statement.test);
            visitor.visit_statement_mut(&mut statement.body);
        }
        Statement::For(statement) => {
            match &mut statement.init {
                Some(ForInit::Declaration(declaration)) => {
                    for declarator in &mut declaration.declarations {
                        if let Some(init) = &mut declarator.init {
                            visitor.visit_expression_mut(init);
                        }
                    }
                }
                Some(ForInit::Expression(expression)) => visitor.visit_expression_mut(expression),
                None => {}
            }
            if let Some(test) = &mut statement.test {
                visitor.visit_expression_mut(test);
            }
            if let Some(update) = &mut statement.update {
                visitor.visit_expression_mut(update);
            }
            visitor.visit_statement_mut(&mut statement.body);
        }
        Statement::ForOf(statement) => {
            visitor.visit_expression_mut(&mut statement.right);
            visitor.visit_statement_mut(&mut statement.body);
        }
        Statement::Throw(statement) => visitor.visit_expression_mut(&mut statement.argument),
        Statement::Block(block) => {
            for statement in &mut block.body {
                visitor.visit_statement_mut(statement);
            }
        }
        Statement::Break(_) | Statement::Continue(_) => {}
        Statement::TypeAlias(_) | Statement::Interface(_) | Statement::Empty(_) => {}
        Statement::Raw(_) => {}
        Statement::ModuleWrapper(wrapper) => {
            for statement in &mut wrapper.body {
                visitor.visit_statement_mut(statement);
            }
        }
    }
}

pub fn walk_expression_mut<V: VisitMut + ?Sized>(visitor: &mut V, expression: &mut Expression) {
    match expression {
        Expression::Identifier(_)
        | Expression::String(_)
        | Expression::Number(_)
        | Expression::Boolean(_)
        | Expression::Null(_) => {}
        Expression::Template(template) => {
            for expr in &mut template.expressions {
                visitor.visit_expression_mut(expr);
            }
        }
        Expression::Object(object) => {
            for member in &mut object.properties {
                match member {
                    ObjectMember::Property(property) => {
                        if let PropertyKey::Computed(key) = &mut property.key {
                            visitor.visit_expression_mut(key);
                        }
                        visitor.visit_expression_mut(&mut property.value);
                    }
                    ObjectMember::Spread(spread) => {
                        visitor.visit_expression_mut(&mut spread.argument)
                    }
                }
            }
        }
        Expression::Array(array) => {
            for element in &mut array.elements {
                visitor.visit_expression_mut(element);
            }
        }
        Expression::Call(call) => {
            visitor.visit_expression_mut(&mut call.callee);
            for argument in &mut call.arguments {
                visitor.visit_expression_mut(argument);
            }
        }
        Expression::New(new) => {
            visitor.visit_expression_mut(&mut new.callee);
            for argument in &mut new.arguments {
                visitor.visit_expression_mut(argument);
            }
        }
        Expression::Member(member) => {
            visitor.visit_expression_mut(&mut member.object);
            if let MemberProperty::Computed(property) = &mut member.property {
                visitor.visit_expression_mut(property);
            }
        }
        Expression::Arrow(arrow) => {
            for param in &mut arrow.params {
                if let Some(default) = &mut param.default {
                    visitor.visit_expression_mut(default);
                }
            }
            match &mut arrow.body {
                ArrowBody::Expression(expr) => visitor.visit_expression_mut(expr),
                ArrowBody::Block(block) => {
                    for statement in &mut block.body {
                        visitor.visit_statement_mut(statement);
                    }
                }
            }
        }
        Expression::Function(function) => {
            for statement in &mut function.function.body.body {
                visitor.visit_statement_mut(statement);
            }
        }
        Expression::Unary(unary) => visitor.visit_expression_mut(&mut unary.argument),
        Expression::Binary(binary) => {
            visitor.visit_expression_mut(&mut binary.left);
            visitor.visit_expression_mut(&mut binary.right);
        }
        Expression::Logical(logical) => {
            visitor.visit_expression_mut(&mut logical.left);
            visitor.visit_expression_mut(&mut logical.right);
        }
        Expression::Conditional(conditional) => {
            visitor.visit_expression_mut(&mut conditional.test);
            visitor.visit_expression_mut(&mut conditional.consequent);
            visitor.visit_expression_mut(&mut conditional.alternate);
        }
        Expression::Assignment(assignment) => {
            visitor.visit_expression_mut(&mut assignment.target);
            visitor.visit_expression_mut(&mut assignment.value);
        }
        Expression::Spread(spread) => visitor.visit_expression_mut(&mut spread.argument),
        Expression::Paren(paren) => visitor.visit_expression_mut(&mut paren.expression),
    }
}
