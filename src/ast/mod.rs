//! A thin helper facade over the [`clang`] crate's cursor API.
//!
//! This module never builds Z3 terms itself — it only reconstructs the
//! same fully-qualified names, binary/unary operator spellings, and
//! literal values the original walker derived from `libclang`, so
//! [`crate::walker`] can stay focused on type algebra.

use clang::{Entity, EntityKind, Type, TypeKind};

/// Comment marker that suppresses analysis of the line it annotates, e.g.
/// `x_m = raw_cm; // flightcheck-ignore`.
const IGNORE_LINE_MARKER: &str = "flightcheck-ignore";

/// Scans every comment token in the translation unit for
/// [`IGNORE_LINE_MARKER`] and returns the `(file, line)` pairs it
/// annotates, for [`crate::walker::Walker::is_ignored_location`] to skip.
pub fn get_ignore_lines(tu_root: Entity<'_>) -> Vec<(String, u32)> {
    let Some(range) = tu_root.get_range() else { return Vec::new() };
    range
        .tokenize()
        .into_iter()
        .filter(|t| t.get_kind() == clang::TokenKind::Comment && t.get_spelling().contains(IGNORE_LINE_MARKER))
        .filter_map(|t| {
            let loc = t.get_location().get_file_location();
            let file = loc.file?.get_path().to_string_lossy().into_owned();
            Some((file, loc.line))
        })
        .collect()
}

/// What a [`walk_ast`] callback wants to happen to the rest of the subtree
/// rooted at the node it was just called with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkResult {
    /// Stop walking entirely.
    Break,
    /// Don't visit this node's children, but keep walking its siblings.
    Continue,
    /// Visit this node's children before moving to its siblings.
    Recurse,
}

/// Depth-first pre-order walk of `entity`'s children, calling `callback` on
/// each and following its [`WalkResult`].
pub fn walk_ast<'tu, D>(entity: Entity<'tu>, data: &mut D, callback: &mut dyn FnMut(Entity<'tu>, &mut D) -> WalkResult) {
    for child in entity.get_children() {
        match callback(child, data) {
            WalkResult::Break => break,
            WalkResult::Recurse => walk_ast(child, data, callback),
            WalkResult::Continue => {}
        }
    }
}

/// The fully qualified name of a `VAR_DECL` with no linkage: its spelling
/// suffixed by file and line (so two same-named locals in different
/// functions never collide), prefixed by every enclosing lexical scope's
/// spelling.
fn fq_varname(entity: Entity<'_>) -> String {
    let mut fq_name = if entity.get_linkage() == Some(clang::Linkage::NoLinkage) {
        let loc = entity
            .get_location()
            .map(|l| l.get_file_location())
            .map(|fl| format!("{:?}_{}", fl.file.map(|f| f.get_path()), fl.line))
            .unwrap_or_default();
        format!("{}_{loc}", entity.get_name().unwrap_or_default())
    } else {
        entity.get_name().unwrap_or_default()
    };

    let mut parent = entity.get_lexical_parent();
    while let Some(p) = parent {
        if p.get_kind() == EntityKind::TranslationUnit {
            break;
        }
        fq_name = format!("{}_{fq_name}", p.get_name().unwrap_or_default());
        parent = p.get_lexical_parent();
    }
    fq_name
}

/// The fully qualified name of `entity`: for a `VAR_DECL`, its scope-suffixed
/// spelling (see [`fq_varname`]); for anything else, its semantic-parent
/// chain joined with `::`, matching the display name libclang would give a
/// member function (`Struct::method`).
pub fn get_fq_name(entity: Entity<'_>) -> String {
    if entity.get_kind() == EntityKind::VarDecl {
        return fq_varname(entity);
    }

    let mut fq_method_name = entity.get_name().unwrap_or_default();
    let mut prev = entity;
    let mut parent = entity.get_semantic_parent();
    while let Some(p) = parent {
        if p.get_kind() == EntityKind::TranslationUnit || p == prev {
            break;
        }
        fq_method_name = format!("{}::{fq_method_name}", p.get_name().unwrap_or_default());
        prev = p;
        parent = p.get_semantic_parent();
    }
    fq_method_name
}

fn token_spellings(entity: Entity<'_>) -> Vec<String> {
    entity
        .get_range()
        .map(|range| range.tokenize().into_iter().map(|t| t.get_spelling()).collect())
        .unwrap_or_default()
}

/// The spelling of a `BINARY_OPERATOR` node's operator token (`"="`,
/// `"+"`, `"=="`, ...), found by skipping past the left operand's own
/// tokens. Empty string if it can't be determined (matches the original's
/// broad `except Exception: return ''`).
pub fn get_binary_op(entity: Entity<'_>) -> String {
    let children: Vec<_> = entity.get_children();
    let Some(left) = children.first() else { return String::new() };
    let left_token_count = token_spellings(*left).len();
    token_spellings(entity).get(left_token_count).cloned().unwrap_or_default()
}

/// The spelling of a `UNARY_OPERATOR` node's first token.
pub fn get_unary_op(entity: Entity<'_>) -> String {
    token_spellings(entity).first().cloned().unwrap_or_default()
}

/// True if `entity` is an assignment: a `BINARY_OPERATOR` whose operator is
/// `=`, or a `CALL_EXPR` to an overloaded `operator=`.
pub fn is_assignment_operator(entity: Entity<'_>) -> bool {
    (entity.get_kind() == EntityKind::BinaryOperator && get_binary_op(entity) == "=")
        || (entity.get_kind() == EntityKind::CallExpr && entity.get_name().as_deref() == Some("="))
}

/// Skips past any `UNEXPOSED_EXPR` wrapper nodes to find the real left
/// operand of an assignment/binary expression.
pub fn get_lhs(entity: Entity<'_>) -> Option<Entity<'_>> {
    let mut result = None;
    walk_ast(entity, &mut result, &mut |child, result| {
        if result.is_some() {
            return WalkResult::Break;
        }
        if child.get_kind() != EntityKind::UnexposedExpr {
            *result = Some(child);
            WalkResult::Break
        } else {
            WalkResult::Recurse
        }
    });
    result
}

/// Like [`get_lhs`], but skips the first real child (the left operand)
/// before looking for the right operand.
pub fn get_rhs(entity: Entity<'_>) -> Option<Entity<'_>> {
    let mut visited_first = false;
    let mut result = None;
    walk_ast(entity, &mut result, &mut |child, result| {
        if !visited_first {
            visited_first = true;
            return WalkResult::Continue;
        }
        if child.get_kind() != EntityKind::UnexposedExpr {
            *result = Some(child);
            WalkResult::Break
        } else {
            WalkResult::Recurse
        }
    });
    result
}

/// Evaluates an `INTEGER_LITERAL`/`CHARACTER_LITERAL` node to its constant
/// integer value. `None` for any other entity kind, so callers that don't
/// already know the kind (e.g. [`crate::walker::Walker::constraint_literal`],
/// which tries a literal before falling back to a named constant) can call
/// this speculatively.
pub fn get_integer_literal(entity: Entity<'_>) -> Option<i64> {
    if !matches!(entity.get_kind(), EntityKind::IntegerLiteral | EntityKind::CharacterLiteral) {
        return None;
    }
    match entity.evaluate()? {
        clang::EvaluationResult::SignedInteger(v) => Some(v),
        clang::EvaluationResult::UnsignedInteger(v) => Some(v as i64),
        _ => None,
    }
}

/// Evaluates a `FLOATING_LITERAL` node to its constant value. `None` for
/// any other entity kind.
pub fn get_floating_literal(entity: Entity<'_>) -> Option<f64> {
    if entity.get_kind() != EntityKind::FloatingLiteral {
        return None;
    }
    match entity.evaluate()? {
        clang::EvaluationResult::Float(v) => Some(v),
        _ => None,
    }
}

/// Resolves each actual-argument expression of a `CALL_EXPR`, skipping any
/// `UNEXPOSED_EXPR` wrapper, matching positionally with the callee's
/// parameters (`None` where no concrete expression could be found).
pub fn get_arguments<'tu>(entity: Entity<'tu>) -> Vec<Option<Entity<'tu>>> {
    entity
        .get_arguments()
        .unwrap_or_default()
        .into_iter()
        .map(|child| {
            if child.get_kind() != EntityKind::UnexposedExpr {
                Some(child)
            } else {
                let mut result = None;
                walk_ast(child, &mut result, &mut |grandchild, result| {
                    if grandchild.get_kind() != EntityKind::UnexposedExpr && result.is_none() {
                        *result = Some(grandchild);
                        WalkResult::Break
                    } else {
                        WalkResult::Recurse
                    }
                });
                result
            }
        })
        .collect()
}

/// Strips pointer indirection and cv-qualification down to the named
/// underlying type, e.g. `const float *` → `float`.
pub fn plain_type(ty: Type<'_>) -> Type<'_> {
    let mut t = ty;
    while t.get_kind() == TypeKind::Pointer {
        if let Some(pointee) = t.get_pointee_type() {
            t = pointee;
        } else {
            break;
        }
    }
    t
}

/// Reconstructs a `Struct.field[.field...]` dotted access path from a
/// `MEMBER_REF_EXPR`/`DECL_REF_EXPR`/`ARRAY_SUBSCRIPT_EXPR` chain, the same
/// way the walker reconstructs a prior-knowledge lookup key.
pub fn get_fq_member_expr(entity: Entity<'_>) -> String {
    let mut data = (entity.get_name().unwrap_or_default(), false);
    walk_ast(entity, &mut data, &mut |child, (acc, seen)| {
        match child.get_kind() {
            EntityKind::DeclRefExpr => {
                let ty = child.get_type();
                if ty.map(|t| t.get_kind()) == Some(TypeKind::ConstantArray) {
                    *acc = format!("{}{acc}", child.get_name().unwrap_or_default());
                    return WalkResult::Recurse;
                }
                let mut typename = ty.map(plain_type).and_then(|t| t.get_display_name()).unwrap_or_default();
                if typename.starts_with("struct ") {
                    typename = typename[7..].to_string();
                }
                *acc = format!("{typename}.{acc}");
                *seen = true;
                WalkResult::Recurse
            }
            EntityKind::MemberRefExpr => {
                *acc = format!("{}.{acc}", child.get_name().unwrap_or_default());
                *seen = true;
                WalkResult::Recurse
            }
            EntityKind::ArraySubscriptExpr => {
                *acc = format!("{}.{acc}", child.get_name().unwrap_or_default());
                WalkResult::Recurse
            }
            _ => WalkResult::Recurse,
        }
    });
    let (mut path, seen_dot) = data;

    if !path.contains('.') && !seen_dot {
        if let Some(referenced) = entity.get_reference().and_then(|r| r.get_semantic_parent()) {
            path = format!("{}.{path}", referenced.get_name().unwrap_or_default());
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use clang::{Clang, Index};
    use std::io::Write;

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

    fn find_all<'tu>(root: Entity<'tu>, kind: EntityKind, out: &mut Vec<Entity<'tu>>) {
        if root.get_kind() == kind {
            out.push(root);
        }
        for child in root.get_children() {
            find_all(child, kind, out);
        }
    }

    #[test]
    fn fq_name_joins_enclosing_scopes_for_a_method() {
        with_parsed("struct Foo { void bar(); };", |root| {
            let method = find_first(root, EntityKind::Method).expect("method decl");
            assert_eq!(get_fq_name(method), "Foo::bar");
        });
    }

    #[test]
    fn binary_op_and_assignment_detection() {
        with_parsed("void foo() { int a = 1; int b = 2; int c = a + b; a = b; }", |root| {
            let mut ops = Vec::new();
            find_all(root, EntityKind::BinaryOperator, &mut ops);
            let assign = ops.iter().find(|e| get_binary_op(**e) == "=").expect("assignment op");
            assert!(is_assignment_operator(*assign));
            let add = ops.iter().find(|e| get_binary_op(**e) == "+").expect("addition op");
            assert!(!is_assignment_operator(*add));
        });
    }

    #[test]
    fn integer_literal_evaluates_to_its_value() {
        with_parsed("void foo() { int x = 42; }", |root| {
            let lit = find_first(root, EntityKind::IntegerLiteral).expect("integer literal");
            assert_eq!(get_integer_literal(lit), Some(42));
        });
    }

    #[test]
    fn integer_literal_is_none_for_other_entity_kinds() {
        with_parsed("void foo() {}", |root| {
            let decl = find_first(root, EntityKind::FunctionDecl).expect("function decl");
            assert_eq!(get_integer_literal(decl), None);
        });
    }

    #[test]
    fn ignore_lines_finds_the_marker_comment() {
        with_parsed("void foo() {\n  int a = 5; // flightcheck-ignore\n  int b = 6;\n}\n", |root| {
            let lines = get_ignore_lines(root);
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].1, 2);
        });
    }

    #[test]
    fn ignore_lines_is_empty_without_the_marker() {
        with_parsed("void foo() { int a = 5; }", |root| {
            assert!(get_ignore_lines(root).is_empty());
        });
    }
}
