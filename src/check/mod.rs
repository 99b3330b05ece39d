//! The checking pass: module graph resolution and type checking.
//!
//! The checker consumes the provider through exactly two hooks
//! (`is_loadable_file`, then `load_file`) and produces diagnostics in
//! emission order. An import that cannot be resolved is a diagnostic;
//! a file the index claims is loadable but cannot be read is a fatal
//! [`LoadError`] that aborts the compile.

pub(crate) mod expr;
pub(crate) mod suggest;
pub(crate) mod types;

use rustc_hash::FxHashMap;

use crate::diagnostic::{Category, Diagnostic};
use crate::provider::{FileProvider, LoadError, DECL_SUFFIX};
use crate::source::{FileName, Source, SourceMap, Span};
use crate::syntax::ast::{
    ConstItem, Entry, FnItem, ImportItem, InterfaceItem, Item, Module, Stmt, TypeExpr,
};
use crate::syntax::parse;

use self::expr::ExprChecker;
use self::suggest::nearest;
use self::types::{assignable, intersect, Ty};

/// Builtin type names, also offered as suggestion candidates.
const BUILTIN_TYPES: [&str; 4] = ["string", "number", "bool", "void"];

/// The lowered public surface of a checked module.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModuleExports {
    types: FxHashMap<String, Ty>,
    values: FxHashMap<String, Ty>,
}

/// Per-compile checking state.
///
/// One `Checker` lives for exactly one [`crate::compile::compile`] call;
/// nothing leaks across calls, which is what keeps compilation
/// deterministic. The provider's content cache is the only state shared
/// between runs, and it only affects performance.
pub(crate) struct Checker<'p> {
    provider: &'p FileProvider,
    /// Modules already checked this run, by logical file name.
    modules: FxHashMap<String, ModuleExports>,
    /// Module names currently being checked, for cycle detection.
    loading: Vec<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) sources: SourceMap,
    pub(crate) loaded_modules: Vec<String>,
}

/// Per-module state: hoisted interfaces plus the growing environments.
struct ModuleState<'m> {
    interfaces: FxHashMap<&'m str, &'m InterfaceItem>,
    /// Interface names currently being lowered, for cycle detection.
    lowering: Vec<String>,
    /// Memoized lowerings of this module's own interfaces.
    lowered: FxHashMap<String, Ty>,
    /// Imported types.
    types: FxHashMap<String, Ty>,
    /// Value bindings: imports, consts, fns, and top-level lets.
    values: FxHashMap<String, Ty>,
}

impl<'m> ModuleState<'m> {
    fn new(module: &'m Module) -> Self {
        let mut interfaces = FxHashMap::default();
        for item in &module.items {
            if let Item::Interface(interface) = item {
                interfaces.insert(interface.name.name.as_str(), interface);
            }
        }
        Self {
            interfaces,
            lowering: Vec::new(),
            lowered: FxHashMap::default(),
            types: FxHashMap::default(),
            values: FxHashMap::default(),
        }
    }
}

impl<'p> Checker<'p> {
    pub(crate) fn new(provider: &'p FileProvider) -> Self {
        Self {
            provider,
            modules: FxHashMap::default(),
            loading: Vec::new(),
            diagnostics: Vec::new(),
            sources: SourceMap::new(),
            loaded_modules: Vec::new(),
        }
    }

    /// Check an in-memory snippet as the entry module.
    pub(crate) fn check_snippet(&mut self, name: &str, text: &str) -> Result<(), LoadError> {
        self.check_module(FileName::from(name), text)?;
        Ok(())
    }

    /// Parse and check one module, returning its exports.
    fn check_module(&mut self, file: FileName, text: &str) -> Result<ModuleExports, LoadError> {
        self.sources.insert(Source::new(file.clone(), text));
        let (module, parse_diags) = parse(file, text);
        self.diagnostics.extend(parse_diags);

        let mut st = ModuleState::new(&module);

        for item in &module.items {
            match item {
                Item::Import(import) => self.check_import(import, &mut st)?,
                // Interfaces are hoisted and lowered on demand.
                Item::Interface(_) => {}
                Item::Const(item) => self.check_const(item, &mut st),
                Item::Fn(item) => self.check_fn(item, &mut st),
                Item::Stmt(stmt) => self.check_top_stmt(stmt, &mut st),
            }
        }

        // Interfaces nothing referenced still get lowered, so their own
        // problems surface and the export surface is complete.
        for item in &module.items {
            if let Item::Interface(interface) = item {
                self.lower_interface(&interface.name.name, &mut st);
            }
        }

        let mut exports = ModuleExports::default();
        for item in &module.items {
            match item {
                Item::Interface(interface) if interface.exported => {
                    if let Some(ty) = st.lowered.get(interface.name.name.as_str()) {
                        exports.types.insert(interface.name.name.clone(), ty.clone());
                    }
                }
                Item::Const(item) if item.exported => {
                    if let Some(ty) = st.values.get(item.name.name.as_str()) {
                        exports.values.insert(item.name.name.clone(), ty.clone());
                    }
                }
                Item::Fn(item) if item.exported => {
                    if let Some(ty) = st.values.get(item.name.name.as_str()) {
                        exports.values.insert(item.name.name.clone(), ty.clone());
                    }
                }
                _ => {}
            }
        }
        Ok(exports)
    }

    // -------------------------------------------------------------------------
    // Imports
    // -------------------------------------------------------------------------

    fn check_import(
        &mut self,
        import: &ImportItem,
        st: &mut ModuleState<'_>,
    ) -> Result<(), LoadError> {
        let module_name = resolve_specifier(&import.specifier.value);

        let Some(exports) = self.load_module(&module_name, &import.specifier.span)? else {
            self.diagnostics.push(Diagnostic::error(
                Category::Resolution,
                import.specifier.span.clone(),
                format!("cannot resolve module `\"{}\"`", import.specifier.value),
            ));
            // Poison the imported names so nothing downstream cascades.
            for name in &import.names {
                st.values.insert(name.name.clone(), Ty::Err);
                st.types.insert(name.name.clone(), Ty::Err);
            }
            return Ok(());
        };

        for name in &import.names {
            let mut found = false;
            if let Some(ty) = exports.values.get(&name.name) {
                st.values.insert(name.name.clone(), ty.clone());
                found = true;
            }
            if let Some(ty) = exports.types.get(&name.name) {
                st.types.insert(name.name.clone(), ty.clone());
                found = true;
            }
            if !found {
                let mut diag = Diagnostic::error(
                    Category::Check,
                    name.span.clone(),
                    format!(
                        "module `\"{}\"` has no exported member `{}`",
                        import.specifier.value, name.name
                    ),
                );
                let candidates = exports
                    .values
                    .keys()
                    .chain(exports.types.keys())
                    .map(String::as_str);
                if let Some(suggestion) = nearest(&name.name, candidates) {
                    diag = diag.with_hint(format!("did you mean `{suggestion}`?"));
                }
                self.diagnostics.push(diag);
                st.values.insert(name.name.clone(), Ty::Err);
                st.types.insert(name.name.clone(), Ty::Err);
            }
        }
        Ok(())
    }

    /// Resolve a module by logical file name through the provider.
    ///
    /// `Ok(None)` means the provider cannot resolve the name (the caller
    /// reports it); a load failure on a resolvable name is fatal.
    fn load_module(
        &mut self,
        name: &str,
        span: &Span,
    ) -> Result<Option<ModuleExports>, LoadError> {
        if let Some(exports) = self.modules.get(name) {
            return Ok(Some(exports.clone()));
        }
        if self.loading.iter().any(|n| n == name) {
            self.diagnostics.push(Diagnostic::error(
                Category::Resolution,
                span.clone(),
                format!("circular import of `\"{name}\"`"),
            ));
            return Ok(Some(ModuleExports::default()));
        }
        if !self.provider.is_loadable_file(name) {
            return Ok(None);
        }

        let text = self.provider.load_file(name)?;
        self.loaded_modules.push(name.to_owned());
        self.loading.push(name.to_owned());
        let exports = self.check_module(FileName::from(name), &text)?;
        self.loading.pop();
        self.modules.insert(name.to_owned(), exports.clone());
        Ok(Some(exports))
    }

    // -------------------------------------------------------------------------
    // Values and statements
    // -------------------------------------------------------------------------

    fn check_const(&mut self, item: &ConstItem, st: &mut ModuleState<'_>) {
        let ty = match (&item.ty, &item.init) {
            (Some(annotation), None) => self.lower_type(annotation, st),
            (None, Some(init)) => {
                let mut checker = ExprChecker::new(&st.values, &mut self.diagnostics);
                checker.check_expr(init)
            }
            (Some(annotation), Some(init)) => {
                let annotated = self.lower_type(annotation, st);
                let actual = {
                    let mut checker = ExprChecker::new(&st.values, &mut self.diagnostics);
                    checker.check_expr_expecting(init, Some(&annotated))
                };
                if !assignable(&actual, &annotated) {
                    self.diagnostics.push(Diagnostic::error(
                        Category::Check,
                        init.span(),
                        format!("type `{actual}` is not assignable to type `{annotated}`"),
                    ));
                }
                annotated
            }
            // The parser already reported this form.
            (None, None) => Ty::Err,
        };
        st.values.insert(item.name.name.clone(), ty);
    }

    fn check_fn(&mut self, item: &FnItem, st: &mut ModuleState<'_>) {
        let params = item
            .params
            .iter()
            .map(|(_, ty)| self.lower_type(ty, st))
            .collect();
        let ret = item
            .ret
            .as_ref()
            .map_or(Ty::Void, |ty| self.lower_type(ty, st));
        st.values.insert(
            item.name.name.clone(),
            Ty::Func {
                params,
                ret: Box::new(ret),
            },
        );
    }

    fn check_top_stmt(&mut self, stmt: &Stmt, st: &mut ModuleState<'_>) {
        match stmt {
            Stmt::Let { name, init } => {
                let ty = {
                    let mut checker = ExprChecker::new(&st.values, &mut self.diagnostics);
                    checker.check_expr(init)
                };
                st.values.insert(name.name.clone(), ty);
            }
            Stmt::Expr(expr) => {
                let mut checker = ExprChecker::new(&st.values, &mut self.diagnostics);
                checker.check_expr(expr);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Type lowering
    // -------------------------------------------------------------------------

    fn lower_type(&mut self, ty: &TypeExpr, st: &mut ModuleState<'_>) -> Ty {
        match ty {
            TypeExpr::Name(name) => self.lower_name(name, st),
            TypeExpr::Lit(lit) => Ty::Lit(lit.value.clone()),
            TypeExpr::Record { entries, .. } => self.lower_record(entries, st),
            TypeExpr::Func { params, ret, .. } => {
                let params = params.iter().map(|p| self.lower_type(p, st)).collect();
                let ret = self.lower_type(ret, st);
                Ty::Func {
                    params,
                    ret: Box::new(ret),
                }
            }
            TypeExpr::Intersect { lhs, rhs } => {
                let lhs = self.lower_type(lhs, st);
                let rhs = self.lower_type(rhs, st);
                intersect(lhs, rhs)
            }
            TypeExpr::Union { lhs, rhs } => {
                let lhs = self.lower_type(lhs, st);
                let rhs = self.lower_type(rhs, st);
                Ty::union_of(lhs, rhs)
            }
            TypeExpr::Generic { name, arg, .. } => {
                if name.name != "Emitter" {
                    self.diagnostics.push(Diagnostic::error(
                        Category::Check,
                        name.span.clone(),
                        format!("cannot find generic type `{}`", name.name),
                    ));
                    return Ty::Err;
                }
                let inner = self.lower_type(arg, st);
                match inner {
                    Ty::Err => Ty::Err,
                    Ty::Record(_) => Ty::Emitter(Box::new(inner)),
                    other => {
                        self.diagnostics.push(Diagnostic::error(
                            Category::Check,
                            arg.span(),
                            format!(
                                "type argument of `Emitter` must be an event map, \
                                 found `{other}`"
                            ),
                        ));
                        Ty::Err
                    }
                }
            }
        }
    }

    fn lower_name(&mut self, name: &crate::syntax::ast::Ident, st: &mut ModuleState<'_>) -> Ty {
        match name.name.as_str() {
            "string" => return Ty::Str,
            "number" => return Ty::Num,
            "bool" => return Ty::Bool,
            "void" => return Ty::Void,
            _ => {}
        }

        // A local interface wins over an imported type of the same name.
        if st.interfaces.contains_key(name.name.as_str()) {
            return self.lower_interface(&name.name, st);
        }
        if let Some(ty) = st.types.get(&name.name) {
            return ty.clone();
        }

        if name.name == "Emitter" {
            self.diagnostics.push(Diagnostic::error(
                Category::Check,
                name.span.clone(),
                "missing type argument for `Emitter`",
            ));
            return Ty::Err;
        }

        let mut diag = Diagnostic::error(
            Category::Check,
            name.span.clone(),
            format!("cannot find type `{}`", name.name),
        );
        let candidates = BUILTIN_TYPES
            .into_iter()
            .chain(st.interfaces.keys().copied())
            .chain(st.types.keys().map(String::as_str));
        if let Some(suggestion) = nearest(&name.name, candidates) {
            diag = diag.with_hint(format!("did you mean `{suggestion}`?"));
        }
        self.diagnostics.push(diag);
        Ty::Err
    }

    fn lower_interface(&mut self, name: &str, st: &mut ModuleState<'_>) -> Ty {
        if let Some(ty) = st.lowered.get(name) {
            return ty.clone();
        }
        let Some(&interface) = st.interfaces.get(name) else {
            return Ty::Err;
        };
        if st.lowering.iter().any(|n| n == name) {
            self.diagnostics.push(Diagnostic::error(
                Category::Check,
                interface.name.span.clone(),
                format!("circular type reference in interface `{name}`"),
            ));
            return Ty::Err;
        }

        st.lowering.push(name.to_owned());
        let ty = self.lower_record(&interface.entries, st);
        st.lowering.pop();
        st.lowered.insert(name.to_owned(), ty.clone());
        ty
    }

    fn lower_record(&mut self, entries: &[Entry], st: &mut ModuleState<'_>) -> Ty {
        let mut fields: Vec<(String, Ty)> = Vec::new();
        for entry in entries {
            let ty = self.lower_type(&entry.ty, st);
            if let Some(slot) = fields.iter_mut().find(|(k, _)| *k == entry.key.name) {
                slot.1 = ty;
            } else {
                fields.push((entry.key.name.clone(), ty));
            }
        }
        Ty::Record(fields)
    }
}

/// Map an import specifier to the logical file name the provider knows.
///
/// Extensionless specifiers get the declaration suffix appended, so
/// `import ... from "events"` resolves against `events.decl`.
fn resolve_specifier(specifier: &str) -> String {
    if specifier.ends_with(DECL_SUFFIX) {
        specifier.to_owned()
    } else {
        format!("{specifier}{DECL_SUFFIX}")
    }
}

// =============================================================================
// Tests
// =============================================================================
