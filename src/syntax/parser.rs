//! Recursive-descent parser.
//!
//! Errors are recorded as diagnostics and recovery happens at statement
//! boundaries, so one bad item does not hide the rest of the module.

use crate::diagnostic::{Category, Diagnostic};
use crate::source::{FileName, Span};
use crate::syntax::ast::{
    ConstItem, Entry, Expr, FnItem, Ident, ImportItem, InterfaceItem, Item, LambdaBody, Module,
    SpannedStr, Stmt, TypeExpr,
};
use crate::syntax::lexer::lex;
use crate::syntax::token::{Token, TokenKind};

/// Parse a module from source text.
///
/// Lex and parse diagnostics come back together, in emission order.
pub fn parse(file: FileName, text: &str) -> (Module, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = lex(file, text);
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        diagnostics: Vec::new(),
    };
    let module = parser.module();
    diagnostics.append(&mut parser.diagnostics);
    (module, diagnostics)
}

type ParseResult<T> = Result<T, ()>;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser<'_> {
    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    fn module(&mut self) -> Module {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Semi => {
                    self.bump();
                }
                _ => match self.item() {
                    Ok(item) => items.push(item),
                    Err(()) => self.synchronize(),
                },
            }
        }
        Module { items }
    }

    fn item(&mut self) -> ParseResult<Item> {
        match self.peek() {
            TokenKind::Import => self.import_item().map(Item::Import),
            TokenKind::Export => {
                self.bump();
                match self.peek() {
                    TokenKind::Interface => self.interface_item(true).map(Item::Interface),
                    TokenKind::Const => self.const_item(true).map(Item::Const),
                    TokenKind::Fn => self.fn_item(true).map(Item::Fn),
                    _ => self.unexpected("`interface`, `const`, or `fn` after `export`"),
                }
            }
            TokenKind::Interface => self.interface_item(false).map(Item::Interface),
            TokenKind::Const => self.const_item(false).map(Item::Const),
            TokenKind::Fn => self.fn_item(false).map(Item::Fn),
            TokenKind::Let => self.let_stmt().map(Item::Stmt),
            _ => {
                let expr = self.expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(Item::Stmt(Stmt::Expr(expr)))
            }
        }
    }

    /// Skip tokens until a likely item boundary.
    fn synchronize(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Semi => {
                    self.bump();
                    break;
                }
                TokenKind::Import
                | TokenKind::Export
                | TokenKind::Interface
                | TokenKind::Const
                | TokenKind::Fn
                | TokenKind::Let => break,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn import_item(&mut self) -> ParseResult<ImportItem> {
        self.bump(); // `import`
        self.expect(TokenKind::LBrace, "`{`")?;

        let mut names = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::RBrace) {
                self.bump();
                break;
            }
            names.push(self.ident()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                _ => return self.unexpected("`,` or `}`"),
            }
        }

        self.expect(TokenKind::From, "`from`")?;
        let specifier = self.string_lit()?;
        self.expect(TokenKind::Semi, "`;`")?;

        Ok(ImportItem { names, specifier })
    }

    fn interface_item(&mut self, exported: bool) -> ParseResult<InterfaceItem> {
        self.bump(); // `interface`
        let name = self.ident()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let entries = self.entries()?;
        Ok(InterfaceItem {
            exported,
            name,
            entries,
        })
    }

    /// Parse `key: Type` entries up to and including the closing `}`.
    ///
    /// Entries may be terminated by `;` or `,`.
    fn entries(&mut self) -> ParseResult<Vec<Entry>> {
        let mut entries = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::RBrace) {
                self.bump();
                return Ok(entries);
            }
            let key = self.key()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.type_expr()?;
            entries.push(Entry { key, ty });
            match self.peek() {
                TokenKind::Semi | TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {}
                _ => return self.unexpected("`;`, `,`, or `}`"),
            }
        }
    }

    fn const_item(&mut self, exported: bool) -> ParseResult<ConstItem> {
        self.bump(); // `const`
        let name = self.ident()?;

        let ty = if matches!(self.peek(), TokenKind::Colon) {
            self.bump();
            Some(self.type_expr()?)
        } else {
            None
        };
        let init = if matches!(self.peek(), TokenKind::Eq) {
            self.bump();
            Some(self.expr()?)
        } else {
            None
        };
        if ty.is_none() && init.is_none() {
            return self.unexpected("`:` or `=`");
        }
        self.expect(TokenKind::Semi, "`;`")?;

        Ok(ConstItem {
            exported,
            name,
            ty,
            init,
        })
    }

    fn fn_item(&mut self, exported: bool) -> ParseResult<FnItem> {
        self.bump(); // `fn`
        let name = self.ident()?;
        self.expect(TokenKind::LParen, "`(`")?;

        let mut params = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::RParen) {
                self.bump();
                break;
            }
            let param = self.ident()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.type_expr()?;
            params.push((param, ty));
            match self.peek() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RParen => {
                    self.bump();
                    break;
                }
                _ => return self.unexpected("`,` or `)`"),
            }
        }

        let ret = if matches!(self.peek(), TokenKind::ThinArrow) {
            self.bump();
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "`;`")?;

        Ok(FnItem {
            exported,
            name,
            params,
            ret,
        })
    }

    fn let_stmt(&mut self) -> ParseResult<Stmt> {
        self.bump(); // `let`
        let name = self.ident()?;
        self.expect(TokenKind::Eq, "`=`")?;
        let init = self.expr()?;
        self.expect(TokenKind::Semi, "`;`")?;
        Ok(Stmt::Let { name, init })
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn type_expr(&mut self) -> ParseResult<TypeExpr> {
        let mut ty = self.isect_type()?;
        while matches!(self.peek(), TokenKind::Pipe) {
            self.bump();
            let rhs = self.isect_type()?;
            ty = TypeExpr::Union {
                lhs: Box::new(ty),
                rhs: Box::new(rhs),
            };
        }
        Ok(ty)
    }

    fn isect_type(&mut self) -> ParseResult<TypeExpr> {
        let mut ty = self.primary_type()?;
        while matches!(self.peek(), TokenKind::Amp) {
            self.bump();
            let rhs = self.primary_type()?;
            ty = TypeExpr::Intersect {
                lhs: Box::new(ty),
                rhs: Box::new(rhs),
            };
        }
        Ok(ty)
    }

    fn primary_type(&mut self) -> ParseResult<TypeExpr> {
        match self.peek().clone() {
            TokenKind::Ident(_) => {
                let name = self.ident()?;
                if matches!(self.peek(), TokenKind::Lt) {
                    self.bump();
                    let arg = self.type_expr()?;
                    self.expect(TokenKind::Gt, "`>`")?;
                    let span = name.span.to(&self.prev_span());
                    Ok(TypeExpr::Generic {
                        name,
                        arg: Box::new(arg),
                        span,
                    })
                } else {
                    Ok(TypeExpr::Name(name))
                }
            }
            TokenKind::Str(_) => Ok(TypeExpr::Lit(self.string_lit()?)),
            TokenKind::LBrace => {
                let start = self.bump().span;
                let entries = self.entries()?;
                let span = start.to(&self.prev_span());
                Ok(TypeExpr::Record { entries, span })
            }
            TokenKind::LParen => {
                let start = self.bump().span;
                let mut params = Vec::new();
                loop {
                    if matches!(self.peek(), TokenKind::RParen) {
                        self.bump();
                        break;
                    }
                    // Optional `name:` prefix on function-type parameters.
                    if matches!(self.peek(), TokenKind::Ident(_))
                        && matches!(self.peek_at(1), TokenKind::Colon)
                    {
                        self.bump();
                        self.bump();
                    }
                    params.push(self.type_expr()?);
                    match self.peek() {
                        TokenKind::Comma => {
                            self.bump();
                        }
                        TokenKind::RParen => {
                            self.bump();
                            break;
                        }
                        _ => return self.unexpected("`,` or `)`"),
                    }
                }
                self.expect(TokenKind::ThinArrow, "`->`")?;
                let ret = self.type_expr()?;
                let span = start.to(&ret.span());
                Ok(TypeExpr::Func {
                    params,
                    ret: Box::new(ret),
                    span,
                })
            }
            _ => self.unexpected("a type"),
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr(&mut self) -> ParseResult<Expr> {
        let lhs = self.postfix_expr()?;
        if matches!(self.peek(), TokenKind::Eq) {
            self.bump();
            let value = self.expr()?;
            let span = lhs.span().to(&value.span());
            if !matches!(lhs, Expr::Ident(_) | Expr::Member { .. }) {
                self.diagnostics.push(Diagnostic::error(
                    Category::Syntax,
                    lhs.span(),
                    "invalid assignment target",
                ));
            }
            return Ok(Expr::Assign {
                target: Box::new(lhs),
                value: Box::new(value),
                span,
            });
        }
        Ok(lhs)
    }

    fn postfix_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let prop = self.ident()?;
                    let span = expr.span().to(&prop.span);
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop,
                        span,
                    };
                }
                TokenKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    loop {
                        if matches!(self.peek(), TokenKind::RParen) {
                            self.bump();
                            break;
                        }
                        args.push(self.expr()?);
                        match self.peek() {
                            TokenKind::Comma => {
                                self.bump();
                            }
                            TokenKind::RParen => {
                                self.bump();
                                break;
                            }
                            _ => return self.unexpected("`,` or `)`"),
                        }
                    }
                    let span = expr.span().to(&self.prev_span());
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> ParseResult<Expr> {
        match self.peek().clone() {
            TokenKind::Ident(_) if matches!(self.peek_at(1), TokenKind::FatArrow) => {
                let param = self.ident()?;
                self.bump(); // `=>`
                let body = self.lambda_body()?;
                let span = param.span.to(&self.prev_span());
                Ok(Expr::Lambda {
                    params: vec![param],
                    body,
                    span,
                })
            }
            TokenKind::Ident(_) => Ok(Expr::Ident(self.ident()?)),
            TokenKind::Str(_) => Ok(Expr::Str(self.string_lit()?)),
            TokenKind::Num(value) => {
                let span = self.bump().span;
                Ok(Expr::Num(SpannedStr { value, span }))
            }
            TokenKind::LParen if self.lambda_ahead() => {
                let start = self.bump().span;
                let mut params = Vec::new();
                loop {
                    if matches!(self.peek(), TokenKind::RParen) {
                        self.bump();
                        break;
                    }
                    params.push(self.ident()?);
                    match self.peek() {
                        TokenKind::Comma => {
                            self.bump();
                        }
                        TokenKind::RParen => {
                            self.bump();
                            break;
                        }
                        _ => return self.unexpected("`,` or `)`"),
                    }
                }
                self.expect(TokenKind::FatArrow, "`=>`")?;
                let body = self.lambda_body()?;
                let span = start.to(&self.prev_span());
                Ok(Expr::Lambda { params, body, span })
            }
            TokenKind::LParen => {
                self.bump();
                let expr = self.expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            TokenKind::LBrace => {
                let start = self.bump().span;
                let mut fields = Vec::new();
                loop {
                    if matches!(self.peek(), TokenKind::RBrace) {
                        self.bump();
                        break;
                    }
                    let key = self.key()?;
                    self.expect(TokenKind::Colon, "`:`")?;
                    let value = self.expr()?;
                    fields.push((key, value));
                    match self.peek() {
                        TokenKind::Comma => {
                            self.bump();
                        }
                        TokenKind::RBrace => {
                            self.bump();
                            break;
                        }
                        _ => return self.unexpected("`,` or `}`"),
                    }
                }
                let span = start.to(&self.prev_span());
                Ok(Expr::Record { fields, span })
            }
            _ => self.unexpected("an expression"),
        }
    }

    fn lambda_body(&mut self) -> ParseResult<LambdaBody> {
        if matches!(self.peek(), TokenKind::LBrace) {
            self.bump();
            let mut stmts = Vec::new();
            loop {
                match self.peek() {
                    TokenKind::RBrace => {
                        self.bump();
                        break;
                    }
                    TokenKind::Eof => return self.unexpected("`}`"),
                    TokenKind::Semi => {
                        self.bump();
                    }
                    TokenKind::Let => stmts.push(self.let_stmt()?),
                    _ => {
                        let expr = self.expr()?;
                        self.expect(TokenKind::Semi, "`;`")?;
                        stmts.push(Stmt::Expr(expr));
                    }
                }
            }
            Ok(LambdaBody::Block(stmts))
        } else {
            Ok(LambdaBody::Expr(Box::new(self.expr()?)))
        }
    }

    /// Whether the `(` at the cursor opens a lambda parameter list.
    ///
    /// Scans to the matching `)` and checks for a following `=>`.
    fn lambda_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::LParen) => depth += 1,
                Some(TokenKind::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::FatArrow)
                        );
                    }
                }
                Some(TokenKind::Eof) | None => return false,
                _ => {}
            }
            i += 1;
        }
    }

    // -------------------------------------------------------------------------
    // Token helpers
    // -------------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn here_span(&self) -> Span {
        self.tokens[self.pos].span.clone()
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span.clone()
    }

    fn ident(&mut self) -> ParseResult<Ident> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.bump().span;
                Ok(Ident { name, span })
            }
            _ => self.unexpected("an identifier"),
        }
    }

    /// An entry key: identifier or string literal.
    fn key(&mut self) -> ParseResult<Ident> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.bump().span;
                Ok(Ident { name, span })
            }
            TokenKind::Str(value) => {
                let name = value.clone();
                let span = self.bump().span;
                Ok(Ident { name, span })
            }
            _ => self.unexpected("an entry key"),
        }
    }

    fn string_lit(&mut self) -> ParseResult<SpannedStr> {
        match self.peek() {
            TokenKind::Str(value) => {
                let value = value.clone();
                let span = self.bump().span;
                Ok(SpannedStr { value, span })
            }
            _ => self.unexpected("a string literal"),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.peek() == &kind {
            Ok(self.bump())
        } else {
            self.unexpected(what)
        }
    }

    fn unexpected<T>(&mut self, what: &str) -> ParseResult<T> {
        let found = self.peek().describe();
        let span = self.here_span();
        self.diagnostics.push(Diagnostic::error(
            Category::Syntax,
            span,
            format!("expected {what}, found {found}"),
        ));
        Err(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Module {
        let (module, diags) = parse(FileName::from("t.decl"), text);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        module
    }

    #[test]
    fn test_parse_import() {
        let module = parse_ok(r#"import { api, btns } from "awesome-app";"#);
        assert_eq!(module.items.len(), 1);
        let Item::Import(import) = &module.items[0] else {
            panic!("expected import");
        };
        assert_eq!(import.names.len(), 2);
        assert_eq!(import.names[0].name, "api");
        assert_eq!(import.specifier.value, "awesome-app");
    }

    #[test]
    fn test_parse_interface_with_string_keys() {
        let module = parse_ok(
            r#"
export interface UserEvents {
  "e:user.login": { token: string };
  "e:user.logout": { user: { firstName: string } };
}
"#,
        );
        let Item::Interface(interface) = &module.items[0] else {
            panic!("expected interface");
        };
        assert!(interface.exported);
        assert_eq!(interface.entries.len(), 2);
        assert_eq!(interface.entries[0].key.name, "e:user.login");
    }

    #[test]
    fn test_parse_const_with_generic_type() {
        let module = parse_ok("const hub: Emitter<UserEvents & AdminEvents>;");
        let Item::Const(item) = &module.items[0] else {
            panic!("expected const");
        };
        assert!(matches!(
            item.ty,
            Some(TypeExpr::Generic { ref name, .. }) if name.name == "Emitter"
        ));
    }

    #[test]
    fn test_parse_fn_and_function_type() {
        let module = parse_ok(
            "export fn on(key: string, handler: (data: { token: string }) -> void) -> bool;",
        );
        let Item::Fn(item) = &module.items[0] else {
            panic!("expected fn");
        };
        assert!(item.exported);
        assert_eq!(item.params.len(), 2);
        assert!(matches!(item.params[1].1, TypeExpr::Func { .. }));
    }

    #[test]
    fn test_parse_lambda_forms() {
        let module = parse_ok("hub.on(\"e\", data => data.token);\nf((a, b) => { let x = a; });");
        assert_eq!(module.items.len(), 2);
        let Item::Stmt(Stmt::Expr(Expr::Call { args, .. })) = &module.items[0] else {
            panic!("expected call statement");
        };
        assert!(matches!(
            args[1],
            Expr::Lambda { ref params, body: LambdaBody::Expr(_), .. } if params.len() == 1
        ));
    }

    #[test]
    fn test_parse_record_literal_vs_block() {
        let module = parse_ok("emit(\"e\", {});\nemit(\"e\", { user: { firstName: \"a\" } });");
        let Item::Stmt(Stmt::Expr(Expr::Call { args, .. })) = &module.items[0] else {
            panic!("expected call");
        };
        assert!(matches!(args[1], Expr::Record { ref fields, .. } if fields.is_empty()));
    }

    #[test]
    fn test_parse_assignment() {
        let module = parse_ok("btns.logout.onclick = () => { };");
        let Item::Stmt(Stmt::Expr(Expr::Assign { target, value, .. })) = &module.items[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(**target, Expr::Member { .. }));
        assert!(matches!(**value, Expr::Lambda { .. }));
    }

    #[test]
    fn test_parse_union_type() {
        let module = parse_ok(r#"const k: "a" | "b" | "c";"#);
        let Item::Const(item) = &module.items[0] else {
            panic!("expected const");
        };
        assert!(matches!(item.ty, Some(TypeExpr::Union { .. })));
    }

    #[test]
    fn test_parse_recovers_after_error() {
        let (module, diags) = parse(
            FileName::from("t.decl"),
            "const = broken;\nlet ok = fine;",
        );
        assert!(!diags.is_empty());
        // The second statement still parses.
        assert!(
            module
                .items
                .iter()
                .any(|i| matches!(i, Item::Stmt(Stmt::Let { name, .. }) if name.name == "ok"))
        );
    }

    #[test]
    fn test_parse_const_requires_type_or_init() {
        let (_, diags) = parse(FileName::from("t.decl"), "const x;");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("expected `:` or `=`"));
    }
}
