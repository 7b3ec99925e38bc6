//! The constraint-generating AST visitor (component D).
//!
//! [`Walker::visit`] mirrors the original `walker()` dispatch: it assigns a
//! symbol to every declaration, assignment, call, and frame-narrowing `if`
//! it finds, and asserts a labeled constraint into the per-TU solver for
//! each one. [`Walker::type_expr`] is the matching expression-typing
//! half — it never asserts anything itself except for the handful of
//! cases (binary `*`/`/`, frame narrowing) that need an intermediate fact
//! asserted to stay sound.

use std::collections::{HashMap, HashSet};

use clang::{Entity, EntityKind};
use z3::ast::{Ast, Bool, Datatype};
use z3::Solver;

use crate::algebra::TypeSystem;
use crate::ast::{self, WalkResult};
use crate::context::{self, AnalysisContext, FnContext};
use crate::frames::Frames;
use crate::units_table;

/// Running counters and per-function state for one translation unit's
/// walk. Reset per TU; [`AnalysisContext`]'s maps persist across TUs
/// within a worker.
pub struct Walker<'a, 'z> {
    sys: &'a TypeSystem<'z>,
    solver: &'a Solver<'z>,
    analysis: &'a mut AnalysisContext<'z>,
    fnctx: FnContext,
    /// `FQ object name -> Frames` narrowed by an enclosing `if`.
    active_constraints: HashMap<String, Datatype<'z>>,
    /// `{file}_{line}_{column}_{usr}` dedup keys already visited.
    seen: HashSet<String>,
    /// Count of constructs skipped because they couldn't be typed.
    pub ignored: u64,
    /// Count of `type_expr` invocations, for diagnostics.
    pub num_exprs: u64,
    ignore_locations: &'a [(String, u32)],
}

impl<'a, 'z> Walker<'a, 'z> {
    /// A fresh walker for one translation unit.
    pub fn new(
        sys: &'a TypeSystem<'z>,
        solver: &'a Solver<'z>,
        analysis: &'a mut AnalysisContext<'z>,
        ignore_locations: &'a [(String, u32)],
    ) -> Self {
        Walker {
            sys,
            solver,
            analysis,
            fnctx: FnContext::new(),
            active_constraints: HashMap::new(),
            seen: HashSet::new(),
            ignored: 0,
            num_exprs: 0,
            ignore_locations,
        }
    }

    /// Walks every child of `tu_root` (the translation unit cursor),
    /// generating and asserting constraints.
    pub fn walk_translation_unit(&mut self, tu_root: Entity<'_>) {
        for child in tu_root.get_children() {
            self.visit(child);
        }
    }

    fn is_ignored_location(&self, entity: Entity<'_>) -> bool {
        let Some(loc) = entity.get_location().map(|l| l.get_file_location()) else { return false };
        let Some(file) = loc.file.as_ref().map(|f| f.get_path()) else { return false };
        self.ignore_locations.iter().any(|(f, l)| file.to_string_lossy() == *f && loc.line == *l)
    }

    fn dedup_key(entity: Entity<'_>) -> String {
        let loc = entity.get_location().map(|l| l.get_file_location());
        let (file, line, col) = loc
            .map(|l| {
                (
                    l.file.map(|f| f.get_path().display().to_string()).unwrap_or_default(),
                    l.line,
                    l.column,
                )
            })
            .unwrap_or_default();
        format!("{file}_{line}_{col}_{:?}", entity.get_usr())
    }

    fn in_analysis_scope(entity: Entity<'_>) -> bool {
        let Some(loc) = entity.get_location().map(|l| l.get_file_location()) else { return true };
        let Some(file) = loc.file.map(|f| f.get_path()) else { return true };
        let file = file.to_string_lossy();
        let home = std::env::var("HOME").unwrap_or_default();
        if !file.starts_with(home.as_str()) && !file.starts_with("/src/") {
            return false;
        }
        let dirname = std::path::Path::new(file.as_ref())
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        !context::is_ignored_dir(&dirname)
    }

    /// Dispatches on `entity`'s kind, following the same shape as the
    /// original `walker()` cursor-kind `match`.
    fn visit(&mut self, entity: Entity<'_>) {
        if self.is_ignored_location(entity) {
            return;
        }
        if !Self::in_analysis_scope(entity) {
            return;
        }
        let key = Self::dedup_key(entity);
        if !self.seen.insert(key) {
            return;
        }

        match entity.get_kind() {
            EntityKind::FunctionDecl | EntityKind::Method => {
                self.fnctx.enter(ast::get_fq_name(entity));
                for child in entity.get_children() {
                    self.visit(child);
                }
            }
            EntityKind::ParmDecl => {
                let next_id = self.fnctx.param_name_to_index.len() as u32;
                if let Some(name) = entity.get_name() {
                    self.fnctx.param_name_to_index.insert(name, next_id);
                }
            }
            EntityKind::VarDecl => self.visit_var_decl(entity),
            EntityKind::BinaryOperator if ast::is_assignment_operator(entity) => {
                self.visit_assignment(entity)
            }
            EntityKind::CallExpr => self.visit_call(entity),
            EntityKind::IfStmt => self.visit_if_stmt(entity),
            _ => {
                for child in entity.get_children() {
                    self.visit(child);
                }
            }
        }
    }

    fn visit_var_decl(&mut self, entity: Entity<'_>) {
        // An uninitialized variable has no children; skip it for now.
        if entity.get_children().is_empty() {
            return;
        }
        // The first child under a VAR_DECL is the initializer expression;
        // `get_lhs` finds the first non-wrapper node within it.
        let Some(rhs) = ast::get_lhs(entity) else { return };
        let Some(rhs_type) = self.type_expr(rhs) else { return };

        let lhs_name = format!("{}_type", ast::get_fq_name(entity));
        let lhs = self
            .analysis
            .var_name_to_type
            .entry(lhs_name.clone())
            .or_insert_with(|| self.sys.named_type(&lhs_name))
            .clone();

        let n = self.analysis.next_counter();
        let spelling = entity.get_name().unwrap_or_default();
        let (file, line) = self.location_text(entity);
        self.analysis.assert_and_check(
            self.sys,
            self.solver,
            &lhs._eq(&rhs_type),
            format!("Variable {spelling} declared in {file} on line {line} ({n})"),
        );
    }

    fn visit_assignment(&mut self, entity: Entity<'_>) {
        let Some(lhs_entity) = ast::get_lhs(entity) else { return };
        let Some(rhs_entity) = ast::get_rhs(entity) else { return };
        if lhs_entity.get_name().as_deref() == Some("operator[]") {
            self.ignored += 1;
            return;
        }

        let Some(lhs_type) = self.type_expr(lhs_entity) else {
            self.ignored += 1;
            tracing::warn!("unrecognized lhs type");
            return;
        };
        let Some(rhs_type) = self.type_expr(rhs_entity) else {
            self.ignored += 1;
            tracing::warn!("unrecognized rhs type");
            return;
        };

        let types_equal = self.sys.types_equal(&lhs_type, &rhs_type);
        let both_dimensionless = Bool::and(
            self.sys.ctx(),
            &[&self.sys.is_dimensionless(&lhs_type), &self.sys.is_dimensionless(&rhs_type)],
        );
        let ok = Bool::or(self.sys.ctx(), &[&types_equal, &both_dimensionless]);

        let n = self.analysis.next_counter();
        let spelling = lhs_entity.get_name().unwrap_or_default();
        let (file, line) = self.location_text(entity);
        let col = entity.get_location().map(|l| l.get_file_location().column).unwrap_or(0);
        self.analysis.assert_and_check(
            self.sys,
            self.solver,
            &ok,
            format!("Assignment to {spelling} in {file} on line {line} column {col} ({n})"),
        );
    }

    /// Asserts one argument-type constraint per recognized call argument,
    /// then always recurses into the call's children — a nested call
    /// expression still needs its own arguments checked.
    fn visit_call(&mut self, entity: Entity<'_>) {
        let Some(referenced) = entity.get_reference() else {
            for child in entity.get_children() {
                self.visit(child);
            }
            return;
        };
        let fq_fn_name = ast::get_fq_name(referenced);
        if context::is_ignored_function(&fq_fn_name) {
            self.ignored += 1;
            return;
        }

        for (arg_no, arg) in ast::get_arguments(entity).into_iter().enumerate() {
            let Some(arg) = arg else {
                self.ignored += 1;
                tracing::warn!("no argument cursor found");
                continue;
            };
            let Some(arg_type) = self.type_expr(arg) else {
                self.ignored += 1;
                tracing::warn!("unknown argument type");
                break;
            };
            let expected = self.arg_type(&fq_fn_name, arg_no as i32);
            let n = self.analysis.next_counter();
            let (file, line) = self.location_text(entity);
            let col = entity.get_location().map(|l| l.get_file_location().column).unwrap_or(0);
            self.analysis.assert_and_check(
                self.sys,
                self.solver,
                &arg_type._eq(&expected),
                format!("Call to {fq_fn_name} in {file} on line {line} column {col} ({n})"),
            );
        }

        for child in entity.get_children() {
            self.visit(child);
        }
    }

    fn visit_if_stmt(&mut self, entity: Entity<'_>) {
        let Some((object_name, frame)) = self.extract_conditional_constraints(entity) else {
            for child in entity.get_children() {
                self.visit(child);
            }
            return;
        };

        self.active_constraints.insert(object_name.clone(), frame.clone());
        for child in entity.get_children() {
            self.visit(child);
        }

        if self.has_return_statement(entity) {
            let (inverted, constraint) = self.sys.invert_frame(&frame);
            let n = self.analysis.next_counter();
            self.analysis.assert_and_check(
                self.sys,
                self.solver,
                &constraint,
                format!("frame inverted {n}"),
            );
            self.active_constraints.insert(object_name, inverted);
        } else {
            self.active_constraints.remove(&object_name);
        }
    }

    /// A named `Type` constant for `ArgType(fn_name, arg_no)`, matching the
    /// original's single uninterpreted `ArgType` function by giving each
    /// `(fn_name, arg_no)` pair a stable symbol name instead.
    fn arg_type(&self, fq_fn_name: &str, arg_no: i32) -> Datatype<'z> {
        self.sys.named_type(&format!("{fq_fn_name}#arg{arg_no}"))
    }

    fn location_text(&self, entity: Entity<'_>) -> (String, u32) {
        let Some(loc) = entity.get_location().map(|l| l.get_file_location()) else {
            return (String::new(), 0);
        };
        let file = loc.file.map(|f| f.get_path().display().to_string()).unwrap_or_default();
        (file, loc.line)
    }

    /// The typing half of the visitor: computes (and, for `*`/`/` and
    /// frame-narrowed member accesses, asserts intermediate facts for) the
    /// `Type` of an arbitrary expression.
    pub fn type_expr(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        self.num_exprs += 1;
        match entity.get_kind() {
            EntityKind::CallExpr => self.type_expr_call(entity),
            EntityKind::DeclRefExpr => self.type_expr_decl_ref(entity),
            EntityKind::BinaryOperator => self.type_expr_binary(entity),
            EntityKind::IntegerLiteral => self.type_expr_integer_literal(entity),
            EntityKind::FloatingLiteral => self.type_expr_float_literal(entity),
            EntityKind::MemberRefExpr | EntityKind::ArraySubscriptExpr => self.type_expr_member(entity),
            EntityKind::UnaryOperator => match ast::get_unary_op(entity).as_str() {
                "-" | "&" => ast::get_lhs(entity).and_then(|e| self.type_expr(e)),
                _ => None,
            },
            EntityKind::ParenExpr | EntityKind::CStyleCastExpr => {
                ast::get_lhs(entity).and_then(|e| self.type_expr(e))
            }
            EntityKind::UnexposedExpr => {
                tracing::warn!("calling type_expr on UNEXPOSED_EXPR");
                None
            }
            _ => None,
        }
    }

    fn type_expr_call(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        let referenced = entity.get_reference()?;
        let fq_fn_name = ast::get_fq_name(referenced);
        if context::is_ignored_function(&fq_fn_name) {
            self.ignored += 1;
            return None;
        }

        let reference_typename = format!("{fq_fn_name}_return_type");
        if !self.analysis.fn_name_to_return_type.contains_key(&reference_typename) {
            let t = self.sys.named_type(&reference_typename);
            let not_constant = self.sys.type_is_constant(&t).not();
            self.analysis.assert_and_check(
                self.sys,
                self.solver,
                &not_constant,
                "return type is not a constant".to_string(),
            );
            self.analysis.fn_name_to_return_type.insert(reference_typename.clone(), t);
        }

        for (arg_no, arg) in ast::get_arguments(entity).into_iter().enumerate() {
            let Some(arg) = arg else {
                self.ignored += 1;
                tracing::warn!("no argument cursor found");
                continue;
            };
            let Some(arg_type) = self.type_expr(arg) else {
                self.ignored += 1;
                tracing::warn!("unknown argument type");
                break;
            };
            let expected = self.arg_type(&fq_fn_name, arg_no as i32);
            let n = self.analysis.next_counter();
            let (file, line) = self.location_text(entity);
            self.analysis.assert_and_check(
                self.sys,
                self.solver,
                &arg_type._eq(&expected),
                format!("Call to {fq_fn_name} in {file} on line {line} ({n})"),
            );
        }

        self.analysis.fn_name_to_return_type.get(&reference_typename).cloned()
    }

    fn type_expr_decl_ref(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        if let Some(name) = entity.get_name() {
            if let Some(&arg_no) = self.fnctx.param_name_to_index.get(&name) {
                if let Some(fq) = self.fnctx.current_fn.clone() {
                    return Some(self.arg_type(&fq, arg_no as i32));
                }
            }
        }
        let referenced = entity.get_reference()?;
        let var_typename = format!("{}_type", ast::get_fq_name(referenced));
        let t = self
            .analysis
            .var_name_to_type
            .entry(var_typename.clone())
            .or_insert_with(|| self.sys.named_type(&var_typename))
            .clone();
        Some(t)
    }

    fn type_expr_binary(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        let operator = ast::get_binary_op(entity);
        let lhs_entity = ast::get_lhs(entity)?;
        let rhs_entity = ast::get_rhs(entity)?;
        match operator.as_str() {
            "+" | "-" => {
                let lhs_type = self.type_expr(lhs_entity)?;
                let rhs_type = self.type_expr(rhs_entity)?;
                let same = lhs_type._eq(&rhs_type);
                let both_dimensionless = Bool::and(
                    self.sys.ctx(),
                    &[&self.sys.is_dimensionless(&lhs_type), &self.sys.is_dimensionless(&rhs_type)],
                );
                let ok = Bool::or(self.sys.ctx(), &[&same, &both_dimensionless]);
                let n = self.analysis.next_counter();
                let (file, line) = self.location_text(entity);
                self.analysis.assert_and_check(
                    self.sys,
                    self.solver,
                    &ok,
                    format!("Applied {operator} with incompatible types @ {file} line {line} ({n})"),
                );
                Some(lhs_type)
            }
            "*" | "/" => {
                let lhs_type = self.type_expr(lhs_entity)?;
                let rhs_type = self.type_expr(rhs_entity)?;
                let frames_agree = self.sys.type_frame(&lhs_type)._eq(&self.sys.type_frame(&rhs_type));
                let n = self.analysis.next_counter();
                let (file, line) = self.location_text(entity);
                self.analysis.assert_and_check(
                    self.sys,
                    self.solver,
                    &frames_agree,
                    format!("Frames must agree in operator {operator} applied in {file} on line {line} ({n})"),
                );

                let lhs_unit = self.sys.unit_of(&lhs_type);
                let rhs_unit = self.sys.unit_of(&rhs_type);
                let lhs_scalar = self.sys.get_scalar(&lhs_unit);
                let rhs_scalar = self.sys.get_scalar(&rhs_unit);
                let multiply = operator == "*";
                let scalar = if multiply {
                    self.sys.scalar_multiply(&lhs_scalar, &rhs_scalar)
                } else {
                    self.sys.scalar_divide(&lhs_scalar, &rhs_scalar)
                };
                let exponents: Vec<z3::ast::Int<'z>> = (0..crate::NUM_BASE_UNITS)
                    .map(|i| {
                        let a = self.sys.unit_base_exponent(&lhs_unit, i);
                        let b = self.sys.unit_base_exponent(&rhs_unit, i);
                        if multiply {
                            a + b
                        } else {
                            a - b
                        }
                    })
                    .collect();
                let exponents: [z3::ast::Int<'z>; crate::NUM_BASE_UNITS] =
                    exponents.try_into().unwrap_or_else(|_| unreachable!());
                let unit = self.sys.unit_from_terms(&scalar, exponents);
                let frame = self.sys.frame_of(&lhs_type);
                let constancy = Bool::and(
                    self.sys.ctx(),
                    &[&self.sys.type_is_constant(&lhs_type), &self.sys.type_is_constant(&rhs_type)],
                );
                Some(self.sys.create_type_dyn(&unit, &frame, &constancy))
            }
            _ => None,
        }
    }

    fn type_expr_integer_literal(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        let value = ast::get_integer_literal(entity)?;
        Some(self.literal_type(value as f64))
    }

    fn type_expr_float_literal(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        let value = ast::get_floating_literal(entity)?;
        Some(self.literal_type(value))
    }

    fn literal_type(&self, value: f64) -> Datatype<'z> {
        let scalar = if value != 0.0 {
            self.sys.scalar_from_pair(1, value.abs().max(1.0) as i64)
        } else {
            self.sys.scalar_one()
        };
        let unit = self.sys.create_unit(&scalar, units_table::base_unit_vector(units_table::LITERAL_UNIT));
        let frame = self.sys.fresh_frames("literal_frames");
        self.sys.create_type(&unit, &frame, true)
    }

    fn type_expr_member(&mut self, entity: Entity<'_>) -> Option<Datatype<'z>> {
        let mut frame_constraint = None;
        if entity.get_kind() == EntityKind::MemberRefExpr {
            if let Some(accessed_object) = self.next_decl_ref_expr(entity) {
                let obj_name = ast::get_fq_name(accessed_object);
                frame_constraint = self.active_constraints.get(&obj_name).cloned();
            }
        }

        let expr_repr = ast::get_fq_member_expr(entity);
        if let Some((struct_name, field)) = expr_repr.split_once('.') {
            if context::is_ignored_member(struct_name, field) {
                self.ignored += 1;
                return None;
            }
        }

        if self.active_constraints.is_empty() {
            let expr_repr_type = expr_repr.split('.').next().unwrap_or_default();
            if self.analysis.member_frame_accesses.iter().any(|access| {
                access.split('.').next().unwrap_or_default() == expr_repr_type
            }) {
                tracing::error!(%expr_repr, "no constraints active for member access");
            }
        }

        let t = self
            .analysis
            .member_access_to_type
            .entry(expr_repr)
            .or_insert_with(|| self.sys.fresh_type("member_accessed"))
            .clone();

        if let Some(frame) = frame_constraint {
            let unit = self.sys.unit_of(&t);
            return Some(self.sys.create_type(&unit, &frame, false));
        }
        Some(t)
    }

    /// Finds the nearest `DECL_REF_EXPR` within `entity`'s member-access
    /// subtree — the base object a chained `a.b.c` expression ultimately
    /// refers to.
    fn next_decl_ref_expr(&self, entity: Entity<'_>) -> Option<Entity<'_>> {
        let mut result = None;
        ast::walk_ast(entity, &mut result, &mut |child, result| {
            if result.is_some() {
                return WalkResult::Break;
            }
            if child.get_kind() == EntityKind::DeclRefExpr {
                *result = Some(child);
                WalkResult::Break
            } else {
                WalkResult::Recurse
            }
        });
        result
    }

    /// True if `if_stmt`'s then-branch contains a `RETURN_STMT` anywhere in
    /// its subtree — used to decide whether the narrowed frame should be
    /// inverted for fall-through code, or simply dropped.
    fn has_return_statement(&self, if_stmt: Entity<'_>) -> bool {
        fn contains_return(entity: Entity<'_>) -> bool {
            entity.get_kind() == EntityKind::ReturnStmt
                || entity.get_children().into_iter().any(contains_return)
        }
        if_stmt.get_children().into_iter().any(contains_return)
    }

    /// Recognizes `if (<member-access> == <frame>)` / `!=` and returns the
    /// constrained object's fully qualified name plus the narrowed
    /// `Frames` value, or `None` if the condition isn't frame-shaped.
    fn extract_conditional_constraints(&mut self, if_stmt: Entity<'_>) -> Option<(String, Datatype<'z>)> {
        let body_expr = ast::get_lhs(if_stmt)?;
        let operator = ast::get_binary_op(body_expr);
        if operator != "==" && operator != "!=" {
            return None;
        }

        let lhs = ast::get_lhs(body_expr)?;
        let accessed_object = self.next_decl_ref_expr(lhs)?;
        let expr_repr = ast::get_fq_member_expr(lhs);
        if !self.analysis.member_frame_accesses.contains(&expr_repr) {
            return None;
        }
        let object_name = ast::get_fq_name(accessed_object);

        let rhs = ast::get_rhs(body_expr)?;
        let literal = self.constraint_literal(rhs)?;
        if literal as usize > crate::frames::NUM_FRAMES {
            tracing::warn!(literal, "unrecognized frame");
            return None;
        }

        let mask = if operator == "==" {
            Frames::single(literal)
        } else {
            Frames::single(literal).invert()
        };
        Some((object_name, self.sys.create_frames(mask)))
    }

    /// Resolves the right-hand side of a `msg.frame == X` comparison to a
    /// frame id, whether `X` is a bare integer literal or a named
    /// `MAV_FRAME_*` constant.
    fn constraint_literal(&self, entity: Entity<'_>) -> Option<u32> {
        if let Some(v) = ast::get_integer_literal(entity) {
            return Some(v as u32);
        }
        entity.get_name().and_then(|name| crate::frames::frame_id(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use clang::{Clang, Index};
    use std::io::Write;
    use z3::SatResult;

    fn with_parsed<R>(src: &str, f: impl FnOnce(Entity<'_>) -> R) -> R {
        let clang = Clang::new().expect("libclang not available");
        let index = Index::new(&clang, false, false);
        let mut file = tempfile::Builder::new().suffix(".cpp").tempfile().expect("tempfile");
        write!(file, "{src}").expect("write source");
        let tu = index.parser(file.path()).arguments(&["-std=c++14"]).parse().expect("parse");
        f(tu.get_entity())
    }

    fn find_first(root: Entity<'_>, kind: EntityKind) -> Option<Entity<'_>> {
        if root.get_kind() == kind {
            return Some(root);
        }
        root.get_children().into_iter().find_map(|child| find_first(child, kind))
    }

    #[test]
    fn literal_type_is_always_constant() {
        with_parsed("void foo() { int x = 42; }", |root| {
            let lit = find_first(root, EntityKind::IntegerLiteral).expect("integer literal");

            let config = AnalysisConfig::new();
            let z3_config = z3::Config::new();
            let ctx = z3::Context::new(&z3_config);
            let sys = TypeSystem::new(&ctx, &config);
            let solver = Solver::new(sys.ctx());
            let mut analysis = AnalysisContext::new();
            let ignore_locations = Vec::new();
            let mut walker = Walker::new(&sys, &solver, &mut analysis, &ignore_locations);

            let t = walker.type_expr(lit).expect("literal should type");
            let is_const = sys.type_is_constant(&t);
            solver.push();
            solver.assert(&is_const.not());
            assert_eq!(solver.check(), SatResult::Unsat);
            solver.pop(1);
        });
    }

    #[test]
    fn has_return_statement_detects_nested_return() {
        with_parsed(
            "void foo(int x) { if (x) { if (x) { return; } } }",
            |root| {
                let if_stmt = find_first(root, EntityKind::IfStmt).expect("if stmt");

                let config = AnalysisConfig::new();
                let z3_config = z3::Config::new();
                let ctx = z3::Context::new(&z3_config);
                let sys = TypeSystem::new(&ctx, &config);
                let solver = Solver::new(sys.ctx());
                let mut analysis = AnalysisContext::new();
                let ignore_locations = Vec::new();
                let walker = Walker::new(&sys, &solver, &mut analysis, &ignore_locations);

                assert!(walker.has_return_statement(if_stmt));
            },
        );
    }

    #[test]
    fn has_return_statement_is_false_without_one() {
        with_parsed("void foo(int x) { if (x) { int y = x; } }", |root| {
            let if_stmt = find_first(root, EntityKind::IfStmt).expect("if stmt");

            let config = AnalysisConfig::new();
            let z3_config = z3::Config::new();
            let ctx = z3::Context::new(&z3_config);
            let sys = TypeSystem::new(&ctx, &config);
            let solver = Solver::new(sys.ctx());
            let mut analysis = AnalysisContext::new();
            let ignore_locations = Vec::new();
            let walker = Walker::new(&sys, &solver, &mut analysis, &ignore_locations);

            assert!(!walker.has_return_statement(if_stmt));
        });
    }

    #[test]
    fn constraint_literal_resolves_integer_and_named_frame() {
        with_parsed(
            "enum MAV_FRAME { MAV_FRAME_BODY_FRD };\nvoid foo() { int a = 3; int b = MAV_FRAME_BODY_FRD; }",
            |root| {
                let config = AnalysisConfig::new();
                let z3_config = z3::Config::new();
                let ctx = z3::Context::new(&z3_config);
                let sys = TypeSystem::new(&ctx, &config);
                let solver = Solver::new(sys.ctx());
                let mut analysis = AnalysisContext::new();
                let ignore_locations = Vec::new();
                let walker = Walker::new(&sys, &solver, &mut analysis, &ignore_locations);

                let lit = find_first(root, EntityKind::IntegerLiteral).expect("integer literal");
                assert_eq!(walker.constraint_literal(lit), Some(3));

                let frame_ref = find_first(root, EntityKind::DeclRefExpr).expect("decl ref");
                assert_eq!(walker.constraint_literal(frame_ref), crate::frames::frame_id("MAV_FRAME_BODY_FRD"));
            },
        );
    }

    #[test]
    fn next_decl_ref_expr_finds_base_object() {
        with_parsed(
            "struct S { int frame; }; void foo(S s) { int x = s.frame; }",
            |root| {
                let member = find_first(root, EntityKind::MemberRefExpr).expect("member ref");

                let config = AnalysisConfig::new();
                let z3_config = z3::Config::new();
                let ctx = z3::Context::new(&z3_config);
                let sys = TypeSystem::new(&ctx, &config);
                let solver = Solver::new(sys.ctx());
                let mut analysis = AnalysisContext::new();
                let ignore_locations = Vec::new();
                let walker = Walker::new(&sys, &solver, &mut analysis, &ignore_locations);

                let found = walker.next_decl_ref_expr(member).expect("base object");
                assert_eq!(found.get_kind(), EntityKind::DeclRefExpr);
            },
        );
    }
}

