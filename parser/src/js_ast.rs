//! JavaScript/TypeScript module AST with byte-span tracking
//!
//! The shape follows the estree family of trees, restricted to the module
//! surface the build-time evaluator works with: import/export declarations,
//! variable and function declarations, the common statement forms, and the
//! expression grammar up to arrow functions, templates and spreads.
//! TypeScript-only constructs (type annotations, `type`/`interface`
//! declarations) are parsed far enough to be dropped.
//!
//! Two synthetic statement kinds exist only in rewritten programs, never in
//! parsed source: [`Statement::Raw`] carries pre-rendered statement text and
//! [`Statement::ModuleWrapper`] is the self-registering function form a
//! module takes before sandbox execution.

use std::fmt;

/// Source location information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the start (inclusive)
    pub start: usize,
    /// Byte offset of the end (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A complete module source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
    pub span: Span,
}

/// An identifier with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), span: Span::default() }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Top-level and nested statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Import(ImportDeclaration),
    ExportNamed(ExportNamedDeclaration),
    ExportDefault(ExportDefaultDeclaration),
    ExportAll(ExportAllDeclaration),
    Variable(VariableDeclaration),
    Function(FunctionDeclaration),
    Expression(ExpressionStatement),
    Return(ReturnStatement),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    ForOf(ForOfStatement),
    Throw(ThrowStatement),
    Block(BlockStatement),
    Break(Span),
    Continue(Span),
    /// TypeScript `type X = …` / `export type X = …` (dropped at rewrite)
    TypeAlias(TypeAliasDeclaration),
    /// TypeScript `interface X { … }` (dropped at rewrite)
    Interface(InterfaceDeclaration),
    Empty(Span),
    /// Pre-rendered statement text (synthetic, rewriter output only)
    Raw(RawStatement),
    /// Self-registering wrapped module (synthetic, rewriter output only)
    ModuleWrapper(ModuleWrapper),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Import(s) => s.span,
            Statement::ExportNamed(s) => s.span,
            Statement::ExportDefault(s) => s.span,
            Statement::ExportAll(s) => s.span,
            Statement::Variable(s) => s.span,
            Statement::Function(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::For(s) => s.span,
            Statement::ForOf(s) => s.span,
            Statement::Throw(s) => s.span,
            Statement::Block(s) => s.span,
            Statement::Break(span) | Statement::Continue(span) => *span,
            Statement::TypeAlias(s) => s.span,
            Statement::Interface(s) => s.span,
            Statement::Empty(span) => *span,
            Statement::Raw(s) => s.span,
            Statement::ModuleWrapper(s) => s.span,
        }
    }
}

/// Import declaration: `import d, { a as b } from 'mod';`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: StringLiteral,
    /// `import type { … }`, erased by the analyzer and the rewriter
    pub type_only: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub kind: ImportSpecifierKind,
    pub local: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifierKind {
    /// `import { imported as local }`
    Named { imported: Identifier },
    /// `import local`
    Default,
    /// `import * as local`
    Namespace,
}

/// `export { a as b };`, `export { a } from 'mod';`, `export const x = …;`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportNamedDeclaration {
    pub declaration: Option<Box<Statement>>,
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<StringLiteral>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: Identifier,
    pub exported: Identifier,
    pub span: Span,
}

/// `export default <expression>;`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefaultDeclaration {
    pub expression: Expression,
    pub span: Span,
}

/// `export * from 'mod';`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportAllDeclaration {
    pub source: StringLiteral,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Var => write!(f, "var"),
            VariableKind::Let => write!(f, "let"),
            VariableKind::Const => write!(f, "const"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub id: Pattern,
    pub init: Option<Expression>,
    pub span: Span,
}

/// Binding patterns for declarations and parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Identifier(Identifier),
    Object(ObjectPattern),
    Array(ArrayPattern),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Object(p) => p.span,
            Pattern::Array(p) => p.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternProperty>,
    pub rest: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: PropertyKey,
    pub value: Pattern,
    pub shorthand: bool,
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    pub elements: Vec<Option<Pattern>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub function: Function,
    pub span: Span,
}

/// Shared function shape for declarations and function expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Identifier>,
    pub params: Vec<FunctionParam>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParam {
    pub pattern: Pattern,
    pub default: Option<Expression>,
    pub rest: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub argument: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration(VariableDeclaration),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForOfStatement {
    pub kind: VariableKind,
    pub left: Pattern,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub argument: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDeclaration {
    pub name: Identifier,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDeclaration {
    pub name: Identifier,
    pub exported: bool,
    pub span: Span,
}

/// Pre-rendered statement text spliced verbatim by the emitter
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement {
    pub text: String,
    pub span: Span,
}

impl RawStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), span: Span::default() }
    }
}

/// `__wd40_module("<filename>", function (module, exports, require, export_star) { … });`
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWrapper {
    pub filename: String,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    String(StringLiteral),
    Number(NumberLiteral),
    Boolean(BooleanLiteral),
    Null(Span),
    Template(TemplateLiteral),
    Object(ObjectExpression),
    Array(ArrayExpression),
    Call(CallExpression),
    New(NewExpression),
    Member(MemberExpression),
    Arrow(ArrowFunctionExpression),
    Function(FunctionExpression),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Conditional(ConditionalExpression),
    Assignment(AssignmentExpression),
    Spread(SpreadElement),
    Paren(ParenExpression),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(e) => e.span,
            Expression::String(e) => e.span,
            Expression::Number(e) => e.span,
            Expression::Boolean(e) => e.span,
            Expression::Null(span) => *span,
            Expression::Template(e) => e.span,
            Expression::Object(e) => e.span,
            Expression::Array(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::New(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Arrow(e) => e.span,
            Expression::Function(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Logical(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Assignment(e) => e.span,
            Expression::Spread(e) => e.span,
            Expression::Paren(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    /// Decoded value (escape sequences resolved)
    pub value: String,
    pub span: Span,
}

impl StringLiteral {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), span: Span::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanLiteral {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    /// Always `expressions.len() + 1` elements
    pub quasis: Vec<TemplateElement>,
    pub expressions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Raw text as written in the source
    pub raw: String,
    /// Decoded text
    pub cooked: String,
    pub tail: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property(Property),
    Spread(SpreadElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expression,
    pub shorthand: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Identifier(Identifier),
    String(StringLiteral),
    Number(NumberLiteral),
    Computed(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    pub elements: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub optional: bool,
    pub span: Span,
}

/// `new Callee(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: MemberProperty,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Identifier(Identifier),
    Computed(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunctionExpression {
    pub params: Vec<FunctionParam>,
    pub body: ArrowBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(BlockStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub function: Function,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    TypeOf,
    Void,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub op: LogicalOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub op: AssignOp,
    pub target: Box<Expression>,
    pub value: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadElement {
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpression {
    pub expression: Box<Expression>,
    pub span: Span,
}
