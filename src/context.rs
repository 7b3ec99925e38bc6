//! Per-worker analysis state: the maps that give every fully qualified
//! variable, function, and struct-member path a stable symbol, plus the
//! per-translation-unit assertion bookkeeping the solver needs to report
//! labeled, file/line/column-addressable findings.

use std::collections::{HashMap, HashSet};

use z3::ast::{Ast, Bool, Datatype};
use z3::Solver;

use crate::algebra::TypeSystem;

/// Fully qualified function names the walker never visits or type-checks,
/// matched against the demangled/qualified spelling libclang reports.
pub const IGNORE_FUNCS: &[&str] = &[
    "AP_Logger_Backend::Write_Message",
    "AP_Proximity_Backend::database_push",
    "AP_Proximity_Backend::ignore_reading",
    "calloc",
    "::::_MAV_RETURN_uint8_t",
    "::::_MAV_RETURN_uint16_t",
    "::::_MAV_RETURN_uint32_t",
    "::::_MAV_RETURN_uint64_t",
    "malloc",
    "::::mav_array_memcpy",
    "::::::memcpy",
    "operator[]",
    "printf",
    "puts",
    "::px4_usleep",
    "is_zero",
    "is_positive",
];

/// `Struct.field` member assignments known to be unit-agnostic raw byte
/// fields, excluded from constraint generation entirely.
pub const IGNORE_MEMBERS: &[&str] = &[
    "mavlink_mission_item_t.param1",
    "mavlink_mission_item_t.param2",
    "mavlink_mission_item_t.param3",
    "mavlink_mission_item_t.param4",
    "mavlink_mission_item_t.x",
    "mavlink_mission_item_t.y",
    "mavlink_mission_item_t.z",
];

/// Source directory basenames never descended into when enumerating a
/// compilation database's entries.
pub const IGNORE_DIRS: &[&str] = &[".", "conversion", "matrix", "v2.0"];

/// True if `fq_name` (as reconstructed by [`crate::ast`]) names a function
/// the walker must skip.
pub fn is_ignored_function(fq_name: &str) -> bool {
    IGNORE_FUNCS.contains(&fq_name)
}

/// True if `struct_name.field` names a member assignment the walker must
/// skip.
pub fn is_ignored_member(struct_name: &str, field: &str) -> bool {
    IGNORE_MEMBERS.iter().any(|m| {
        m.split_once('.')
            .map(|(s, f)| s == struct_name && f == field)
            .unwrap_or(false)
    })
}

/// True if `dir` is a path component the pipeline must not walk into.
pub fn is_ignored_dir(dir: &str) -> bool {
    IGNORE_DIRS.contains(&dir)
}

/// The maps a single worker accumulates across every translation unit it
/// processes, plus the one active TU's assertion list. One instance lives
/// per worker thread, tied to that thread's own [`z3::Context`].
pub struct AnalysisContext<'ctx> {
    /// Return type symbol per fully qualified function name.
    pub fn_name_to_return_type: HashMap<String, Datatype<'ctx>>,
    /// Type symbol per fully qualified variable name.
    pub var_name_to_type: HashMap<String, Datatype<'ctx>>,
    /// Type symbol per `Struct.field` static member-access path.
    pub member_access_to_type: HashMap<String, Datatype<'ctx>>,
    /// Member-access paths seeded from a prior-types description; these are
    /// never re-derived from a plain assignment.
    pub member_access_with_prior_types: HashSet<String>,
    /// Member-access paths known to carry coordinate-frame information,
    /// i.e. eligible for the `if (msg.frame == X)` refinement in
    /// [`crate::walker`].
    pub member_frame_accesses: HashSet<String>,
    /// Monotonically increasing counter for synthesizing unique assertion
    /// labels (`"frame inverted 12"`, etc.) within one TU.
    counter: u64,
    /// The running list of boolean guard constants passed to
    /// `assert_and_check`, threaded back in for unsat-core reporting.
    pub tu_assertions: Vec<Bool<'ctx>>,
    /// Maps each guard constant's label back to the label string, so an
    /// unsat core (a list of guard constants) can be rendered back to
    /// human-readable text.
    pub labels: HashMap<String, String>,
}

impl<'ctx> AnalysisContext<'ctx> {
    /// An empty context with no accumulated symbols.
    pub fn new() -> Self {
        AnalysisContext {
            fn_name_to_return_type: HashMap::new(),
            var_name_to_type: HashMap::new(),
            member_access_to_type: HashMap::new(),
            member_access_with_prior_types: HashSet::new(),
            member_frame_accesses: HashSet::new(),
            counter: 0,
            tu_assertions: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// The next unique suffix for an assertion label, e.g. for `invert_frame`
    /// calls within the same TU (`"frame inverted {n}"`).
    pub fn next_counter(&mut self) -> u64 {
        let n = self.counter;
        self.counter += 1;
        n
    }

    /// Adds `Implies(label_const, stmt)` to `solver` and records
    /// `label_const` both in `tu_assertions` (for the final `check` call)
    /// and in `labels` (so the eventual unsat core can be rendered back to
    /// `msg`). Mirrors the original's `assert_and_check`.
    pub fn assert_and_check(&mut self, sys: &TypeSystem<'ctx>, solver: &Solver<'ctx>, stmt: &Bool<'ctx>, msg: String) {
        let label = Bool::new_const(sys.ctx(), msg.clone());
        solver.assert_and_track(stmt, &label);
        self.tu_assertions.push(label.clone());
        self.labels.insert(label.to_string(), msg);
    }

    /// Drains the assertion labels accumulated since the last call (i.e.
    /// since the start of the current translation unit) and returns their
    /// plain message text — not `Bool::to_string()` — so a later
    /// `Bool::new_const` built from the same text reproduces the identical
    /// symbol name the label was originally created with, in whatever
    /// context reads it back. Leaves the shared symbol maps and the
    /// `labels` lookup table untouched. Called once per TU right before
    /// serialization.
    pub fn take_tu_assertions(&mut self) -> Vec<String> {
        std::mem::take(&mut self.tu_assertions)
            .iter()
            .map(|label| self.labels.get(&label.to_string()).cloned().unwrap_or_else(|| label.to_string()))
            .collect()
    }
}

impl<'ctx> Default for AnalysisContext<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-function walk state, reset at the start of every `FUNCTION_DECL`.
/// Distinct from [`AnalysisContext`] because parameter names are only
/// meaningful within the function currently being walked.
#[derive(Default)]
pub struct FnContext {
    /// The fully qualified name of the function currently being walked.
    pub current_fn: Option<String>,
    /// Maps a parameter's source name to its position for `ArgType` lookups.
    pub param_name_to_index: HashMap<String, u32>,
}

impl FnContext {
    /// A fresh, empty per-function context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all fields for the start of a new function.
    pub fn enter(&mut self, fq_name: String) {
        self.current_fn = Some(fq_name);
        self.param_name_to_index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_function_lookup() {
        assert!(is_ignored_function("malloc"));
        assert!(!is_ignored_function("AP_Baro::read"));
    }

    #[test]
    fn ignored_member_lookup_respects_both_parts() {
        assert!(is_ignored_member("mavlink_mission_item_t", "param1"));
        assert!(!is_ignored_member("mavlink_mission_item_t", "seq"));
        assert!(!is_ignored_member("other_t", "param1"));
    }

    #[test]
    fn counter_is_monotonic_and_unique_per_context() {
        let mut ctx = AnalysisContext::new();
        let a = ctx.next_counter();
        let b = ctx.next_counter();
        assert_ne!(a, b);
        assert_eq!(b, a + 1);
    }
}
