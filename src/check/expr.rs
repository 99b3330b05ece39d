//! Expression and statement checking.
//!
//! Each check function returns the expression's type; problems are
//! pushed onto the shared diagnostic sink and poison the result with
//! [`Ty::Err`], which silences all downstream checks on that value.

use rustc_hash::FxHashMap;

use crate::diagnostic::{Category, Diagnostic};
use crate::source::Span;
use crate::syntax::ast::{Expr, Ident, LambdaBody, Stmt};

use super::suggest::nearest;
use super::types::{assignable, Ty};

/// Checks expressions against an immutable set of module-level bindings.
///
/// Lambda bodies push fresh scopes; module-level `let`s are handled by
/// the driver so they can extend the global map between statements.
pub(crate) struct ExprChecker<'a> {
    globals: &'a FxHashMap<String, Ty>,
    scopes: Vec<FxHashMap<String, Ty>>,
    diags: &'a mut Vec<Diagnostic>,
}

impl<'a> ExprChecker<'a> {
    pub(crate) fn new(globals: &'a FxHashMap<String, Ty>, diags: &'a mut Vec<Diagnostic>) -> Self {
        Self {
            globals,
            scopes: Vec::new(),
            diags,
        }
    }

    /// Check a statement inside a lambda body.
    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, init } => {
                let ty = self.check_expr(init);
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.name.clone(), ty);
                }
            }
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    /// Check an expression and return its type.
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Str(lit) => Ty::Lit(lit.value.clone()),
            Expr::Num(_) => Ty::Num,
            Expr::Ident(ident) => self.check_ident(ident),
            Expr::Record { fields, .. } => {
                let mut record: Vec<(String, Ty)> = Vec::new();
                for (key, value) in fields {
                    let ty = self.check_expr(value);
                    if let Some(slot) = record.iter_mut().find(|(k, _)| *k == key.name) {
                        slot.1 = ty;
                    } else {
                        record.push((key.name.clone(), ty));
                    }
                }
                Ty::Record(record)
            }
            Expr::Member { object, prop, .. } => {
                let object_ty = self.check_expr(object);
                self.member_ty(object_ty, prop)
            }
            Expr::Call { callee, args, span } => self.check_call(callee, args, span),
            Expr::Lambda { .. } => self.check_lambda(expr, None),
            Expr::Assign { target, value, .. } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr_expecting(value, Some(&target_ty));
                if !assignable(&value_ty, &target_ty) {
                    self.diags.push(Diagnostic::error(
                        Category::Check,
                        value.span(),
                        format!("type `{value_ty}` is not assignable to type `{target_ty}`"),
                    ));
                }
                value_ty
            }
        }
    }

    /// Check an expression with an optional contextual type.
    ///
    /// The context only matters for lambdas, whose parameters have no
    /// annotations of their own.
    pub(crate) fn check_expr_expecting(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        if matches!(expr, Expr::Lambda { .. }) {
            self.check_lambda(expr, expected)
        } else {
            self.check_expr(expr)
        }
    }

    fn check_ident(&mut self, ident: &Ident) -> Ty {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(&ident.name) {
                return ty.clone();
            }
        }
        if let Some(ty) = self.globals.get(&ident.name) {
            return ty.clone();
        }

        let mut diag = Diagnostic::error(
            Category::Check,
            ident.span.clone(),
            format!("cannot find name `{}`", ident.name),
        );
        let candidates = self
            .scopes
            .iter()
            .flat_map(|s| s.keys())
            .chain(self.globals.keys())
            .map(String::as_str);
        if let Some(suggestion) = nearest(&ident.name, candidates) {
            diag = diag.with_hint(format!("did you mean `{suggestion}`?"));
        }
        self.diags.push(diag);
        Ty::Err
    }

    /// Resolve a member access on an already-checked object type.
    fn member_ty(&mut self, object_ty: Ty, prop: &Ident) -> Ty {
        match object_ty {
            Ty::Err => Ty::Err,
            Ty::Record(fields) => {
                if let Some((_, ty)) = fields.iter().find(|(k, _)| *k == prop.name) {
                    return ty.clone();
                }
                let suggestion = nearest(&prop.name, fields.iter().map(|(k, _)| k.as_str()))
                    .map(str::to_owned);
                let record = Ty::Record(fields);
                let mut diag = Diagnostic::error(
                    Category::Check,
                    prop.span.clone(),
                    format!(
                        "property `{}` does not exist on type `{record}`",
                        prop.name
                    ),
                );
                if let Some(suggestion) = suggestion {
                    diag = diag.with_hint(format!("did you mean `{suggestion}`?"));
                }
                self.diags.push(diag);
                Ty::Err
            }
            Ty::Emitter(map) => match prop.name.as_str() {
                // Standalone method references get an approximate type;
                // precise per-key payload typing happens at the call site.
                "on" => Ty::Func {
                    params: vec![
                        map.event_key_union(),
                        Ty::Func {
                            params: vec![Ty::Err],
                            ret: Box::new(Ty::Void),
                        },
                    ],
                    ret: Box::new(Ty::Emitter(map)),
                },
                "emit" => Ty::Func {
                    params: vec![map.event_key_union(), Ty::Err],
                    ret: Box::new(Ty::Bool),
                },
                _ => {
                    let mut diag = Diagnostic::error(
                        Category::Check,
                        prop.span.clone(),
                        format!(
                            "property `{}` does not exist on type `{}`",
                            prop.name,
                            Ty::Emitter(map)
                        ),
                    );
                    if let Some(suggestion) = nearest(&prop.name, ["on", "emit"]) {
                        diag = diag.with_hint(format!("did you mean `{suggestion}`?"));
                    }
                    self.diags.push(diag);
                    Ty::Err
                }
            },
            other => {
                self.diags.push(Diagnostic::error(
                    Category::Check,
                    prop.span.clone(),
                    format!("property `{}` does not exist on type `{other}`", prop.name),
                ));
                Ty::Err
            }
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: &Span) -> Ty {
        // Emitter method calls get bespoke checking so the handler's
        // parameter can be typed from the event key.
        if let Expr::Member { object, prop, .. } = callee {
            let object_ty = self.check_expr(object);
            if let Ty::Emitter(map) = object_ty {
                return self.check_emitter_call(map, prop, args, span);
            }
            let callee_ty = self.member_ty(object_ty, prop);
            return self.check_plain_call(callee_ty, args, span);
        }

        let callee_ty = self.check_expr(callee);
        self.check_plain_call(callee_ty, args, span)
    }

    fn check_plain_call(&mut self, callee_ty: Ty, args: &[Expr], span: &Span) -> Ty {
        match callee_ty {
            Ty::Err => {
                for arg in args {
                    self.check_expr_expecting(arg, None);
                }
                Ty::Err
            }
            Ty::Func { params, ret } => {
                if args.len() != params.len() {
                    self.diags.push(Diagnostic::error(
                        Category::Check,
                        span.clone(),
                        format!(
                            "expected {} argument{}, but got {}",
                            params.len(),
                            if params.len() == 1 { "" } else { "s" },
                            args.len()
                        ),
                    ));
                }
                for (i, arg) in args.iter().enumerate() {
                    let expected = params.get(i);
                    let actual = self.check_expr_expecting(arg, expected);
                    if let Some(expected) = expected {
                        if !assignable(&actual, expected) {
                            self.diags.push(Diagnostic::error(
                                Category::Check,
                                arg.span(),
                                format!(
                                    "argument of type `{actual}` is not assignable to \
                                     parameter of type `{expected}`"
                                ),
                            ));
                        }
                    }
                }
                *ret
            }
            other => {
                self.diags.push(Diagnostic::error(
                    Category::Check,
                    span.clone(),
                    format!("type `{other}` is not callable"),
                ));
                for arg in args {
                    self.check_expr_expecting(arg, None);
                }
                Ty::Err
            }
        }
    }

    /// Check `emitter.on(key, handler)` / `emitter.emit(key, payload)`.
    fn check_emitter_call(&mut self, map: Box<Ty>, prop: &Ident, args: &[Expr], span: &Span) -> Ty {
        let method = prop.name.as_str();
        if method != "on" && method != "emit" {
            let callee_ty = self.member_ty(Ty::Emitter(map), prop);
            return self.check_plain_call(callee_ty, args, span);
        }

        if args.len() != 2 {
            self.diags.push(Diagnostic::error(
                Category::Check,
                span.clone(),
                format!("expected 2 arguments, but got {}", args.len()),
            ));
        }

        let key_union = map.event_key_union();

        // The event key selects the payload type for the second argument.
        let mut payload = Ty::Err;
        if let Some(key_arg) = args.first() {
            let key_ty = self.check_expr(key_arg);
            if !assignable(&key_ty, &key_union) {
                self.diags.push(Diagnostic::error(
                    Category::Check,
                    key_arg.span(),
                    format!(
                        "argument of type `{key_ty}` is not assignable to \
                         parameter of type `{key_union}`"
                    ),
                ));
            } else if let Ty::Lit(key) = &key_ty {
                if let Some(ty) = map.field(key) {
                    payload = ty.clone();
                }
            }
        }

        if method == "on" {
            if let Some(handler) = args.get(1) {
                let expected = Ty::Func {
                    params: vec![payload],
                    ret: Box::new(Ty::Void),
                };
                let actual = self.check_expr_expecting(handler, Some(&expected));
                if !assignable(&actual, &expected) {
                    self.diags.push(Diagnostic::error(
                        Category::Check,
                        handler.span(),
                        format!(
                            "argument of type `{actual}` is not assignable to \
                             parameter of type `{expected}`"
                        ),
                    ));
                }
            }
            for arg in args.iter().skip(2) {
                self.check_expr_expecting(arg, None);
            }
            Ty::Emitter(map)
        } else {
            if let Some(payload_arg) = args.get(1) {
                let actual = self.check_expr_expecting(payload_arg, Some(&payload));
                if !assignable(&actual, &payload) {
                    self.diags.push(Diagnostic::error(
                        Category::Check,
                        payload_arg.span(),
                        format!(
                            "argument of type `{actual}` is not assignable to \
                             parameter of type `{payload}`"
                        ),
                    ));
                }
            }
            for arg in args.iter().skip(2) {
                self.check_expr_expecting(arg, None);
            }
            Ty::Bool
        }
    }

    fn check_lambda(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        let Expr::Lambda { params, body, span } = expr else {
            return Ty::Err;
        };

        let expected_params: Option<&[Ty]> = match expected {
            Some(Ty::Func { params, .. }) => Some(params.as_slice()),
            _ => None,
        };

        if let Some(expected_params) = expected_params {
            if params.len() > expected_params.len() {
                self.diags.push(Diagnostic::error(
                    Category::Check,
                    span.clone(),
                    format!(
                        "lambda has {} parameters, but expected at most {}",
                        params.len(),
                        expected_params.len()
                    ),
                ));
            }
        }

        let mut scope = FxHashMap::default();
        let mut param_tys = Vec::new();
        for (i, param) in params.iter().enumerate() {
            // Parameters are contextually typed; without a context they
            // poison rather than cascade.
            let ty = expected_params
                .and_then(|expected_params| expected_params.get(i).cloned())
                .unwrap_or(Ty::Err);
            scope.insert(param.name.clone(), ty.clone());
            param_tys.push(ty);
        }

        self.scopes.push(scope);
        let ret = match body {
            LambdaBody::Expr(expr) => self.check_expr(expr),
            LambdaBody::Block(stmts) => {
                for stmt in stmts {
                    self.check_stmt(stmt);
                }
                Ty::Void
            }
        };
        self.scopes.pop();

        Ty::Func {
            params: param_tys,
            ret: Box::new(ret),
        }
    }
}
