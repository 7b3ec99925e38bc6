//! Global-solver configuration and unsat-core reporting (component F).
//!
//! Every [`crate::cache::SerializedTu`] the pipeline produces — whether a
//! fresh analysis or a cache hit — gets folded in here: its SMT-LIB 2 text
//! is parsed back into the global [`Context`], its assertions are merged
//! into the global [`Solver`], and its assumption labels become the boolean
//! constants the final `check_assumptions` call runs against.

use z3::ast::{Ast, Bool};
use z3::{Context, SatResult, Solver};

use crate::cache::SerializedTu;
use crate::error::SolveError;

/// Five minutes, matching the original's `solver.set(timeout=5*60*1000)`.
const CHECK_TIMEOUT_MS: u32 = 5 * 60 * 1000;

/// Number of solver threads the final check is allowed to use.
const SOLVER_THREADS: u32 = 4;

/// Builds the global solver, configured for unsat-core tracking with a
/// bounded timeout and thread count.
pub fn build_global_solver(ctx: &Context) -> Solver<'_> {
    let solver = Solver::new(ctx);
    let params = z3::Params::new(ctx);
    params.set_bool("unsat_core", true);
    params.set_u32("timeout", CHECK_TIMEOUT_MS);
    params.set_u32("threads", SOLVER_THREADS);
    solver.set_params(&params);
    solver
}

/// Parses `stu.solver`'s SMT-LIB 2 text back into `global_ctx`, adding its
/// assertions to `global_solver`, and returns one assumption `Bool` const
/// per label in `stu.assertions` — built fresh in `global_ctx` so they
/// unify with whatever the serialized text itself referenced by name.
pub fn merge_serialized_tu<'ctx>(global_ctx: &'ctx Context, global_solver: &Solver<'ctx>, stu: &SerializedTu) -> Vec<Bool<'ctx>> {
    let tmp_solver = Solver::new(global_ctx);
    tmp_solver.from_string(&stu.solver);
    for assertion in tmp_solver.get_assertions() {
        global_solver.assert(&assertion);
    }
    stu.assertions.iter().map(|label| Bool::new_const(global_ctx, label.as_str())).collect()
}

/// The outcome of a single `check_assumptions` call: either every
/// assumption is jointly satisfiable, or the unsat core, rendered back to
/// human-readable labels via `labels`.
pub enum CheckOutcome {
    Sat,
    Unsat(Vec<String>),
}

/// Runs `global_solver.check_assumptions(assumptions)` and, on a non-`sat`
/// result, decodes the unsat core back to each assumption's original label
/// text (an assumption constant's name *is* its label — see
/// [`crate::context::AnalysisContext::assert_and_check`] — so no separate
/// lookup table is needed, only undoing Z3's own bar-quoting of names that
/// contain spaces or punctuation).
pub fn check<'ctx>(global_solver: &Solver<'ctx>, assumptions: &[Bool<'ctx>]) -> Result<CheckOutcome, SolveError> {
    let refs: Vec<&Bool<'ctx>> = assumptions.iter().collect();
    match global_solver.check_assumptions(&refs) {
        SatResult::Sat => Ok(CheckOutcome::Sat),
        SatResult::Unsat => {
            let core = global_solver.get_unsat_core().iter().map(|c| unquote_symbol(&c.to_string())).collect();
            Ok(CheckOutcome::Unsat(core))
        }
        SatResult::Unknown => Err(SolveError::Unknown),
    }
}

/// Strips the `|...|` quoting Z3's SMT-LIB printer adds around a symbol
/// name containing characters that aren't plain identifier characters.
fn unquote_symbol(s: &str) -> String {
    s.strip_prefix('|').and_then(|s| s.strip_suffix('|')).unwrap_or(s).to_string()
}

/// Prints the unsat core exactly as the original does: one `ERROR!` banner,
/// then one label per line, each indented by two spaces.
pub fn report_unsat(core: &[String]) {
    println!("ERROR!");
    for label in core {
        println!("  {label}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SerializedTu;
    use z3::Config;

    #[test]
    fn merge_recovers_labels_from_serialized_text() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let global_solver = build_global_solver(&ctx);

        let tmp_ctx = Context::new(&Config::new());
        let tmp_solver = Solver::new(&tmp_ctx);
        let label = Bool::new_const(&tmp_ctx, "example label 0");
        let fact = Bool::from_bool(&tmp_ctx, true);
        tmp_solver.assert_and_track(&fact, &label);
        let smt2 = tmp_solver.to_smt2();

        let stu = SerializedTu::new("x.cpp".to_string(), smt2, vec!["example label 0".to_string()]);
        let assumptions = merge_serialized_tu(&ctx, &global_solver, &stu);
        assert_eq!(assumptions.len(), 1);

        let outcome = check(&global_solver, &assumptions).unwrap();
        assert!(matches!(outcome, CheckOutcome::Sat));
    }

    #[test]
    fn unquote_symbol_strips_bars_only_when_present() {
        assert_eq!(unquote_symbol("|a label|"), "a label");
        assert_eq!(unquote_symbol("plain"), "plain");
    }
}
