//! AST for declaration modules and snippets.

use crate::source::Span;

/// A parsed module: the items of one declaration file or snippet.
#[derive(Debug, Clone)]
pub struct Module {
    pub items: Vec<Item>,
}

/// A top-level item.
#[derive(Debug, Clone)]
pub enum Item {
    Import(ImportItem),
    Interface(InterfaceItem),
    Const(ConstItem),
    Fn(FnItem),
    Stmt(Stmt),
}

/// `import { a, b } from "events";`
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub names: Vec<Ident>,
    pub specifier: SpannedStr,
}

/// An identifier with its span.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// A string literal with its span.
#[derive(Debug, Clone)]
pub struct SpannedStr {
    pub value: String,
    pub span: Span,
}

/// `export? interface Name { entries }`
#[derive(Debug, Clone)]
pub struct InterfaceItem {
    pub exported: bool,
    pub name: Ident,
    pub entries: Vec<Entry>,
}

/// One `key: Type` entry of an interface or record type.
///
/// Keys from identifier and string-literal syntax are normalized to the
/// same form; `"e:user.login"` and `token` are both just names.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: Ident,
    pub ty: TypeExpr,
}

/// `export? const name: Type;` or `const name = expr;`
#[derive(Debug, Clone)]
pub struct ConstItem {
    pub exported: bool,
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}

/// `export? fn name(params) -> Type;`
#[derive(Debug, Clone)]
pub struct FnItem {
    pub exported: bool,
    pub name: Ident,
    pub params: Vec<(Ident, TypeExpr)>,
    pub ret: Option<TypeExpr>,
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    Let { name: Ident, init: Expr },
    Expr(Expr),
}

/// A type expression.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// A named type: builtin or interface reference.
    Name(Ident),
    /// A generic application, e.g. `Emitter<M>`.
    Generic {
        name: Ident,
        arg: Box<TypeExpr>,
        span: Span,
    },
    /// A string-literal type.
    Lit(SpannedStr),
    /// A record type: `{ field: Type, ... }`.
    Record { entries: Vec<Entry>, span: Span },
    /// A function type: `(params) -> Type`.
    Func {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
        span: Span,
    },
    /// `A & B`
    Intersect { lhs: Box<TypeExpr>, rhs: Box<TypeExpr> },
    /// `A | B`
    Union { lhs: Box<TypeExpr>, rhs: Box<TypeExpr> },
}

impl TypeExpr {
    /// The span covering this type expression.
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Name(ident) => ident.span.clone(),
            TypeExpr::Generic { span, .. } => span.clone(),
            TypeExpr::Lit(lit) => lit.span.clone(),
            TypeExpr::Record { span, .. } => span.clone(),
            TypeExpr::Func { span, .. } => span.clone(),
            TypeExpr::Intersect { lhs, rhs } | TypeExpr::Union { lhs, rhs } => {
                lhs.span().to(&rhs.span())
            }
        }
    }
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Str(SpannedStr),
    Num(SpannedStr),
    Member {
        object: Box<Expr>,
        prop: Ident,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Lambda {
        params: Vec<Ident>,
        body: LambdaBody,
        span: Span,
    },
    Record {
        fields: Vec<(Ident, Expr)>,
        span: Span,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
}

/// The body of a lambda: a single expression or a block of statements.
#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

impl Expr {
    /// The span covering this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(ident) => ident.span.clone(),
            Expr::Str(lit) | Expr::Num(lit) => lit.span.clone(),
            Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Record { span, .. }
            | Expr::Assign { span, .. } => span.clone(),
        }
    }
}
