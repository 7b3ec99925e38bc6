//! Crate root: public surface and crate-wide invariants.
//!
//! This crate implements a static analyzer for unit-of-measure and
//! coordinate-frame errors in C/C++ autopilot source. It walks translation
//! units, assigns every typed program entity a symbolic *physical type*
//! (a scalar prefix, a seven-dimensional SI base-unit vector, a bitmask over
//! coordinate frames, and a constant-literal flag), emits first-order
//! constraints over those symbols into an SMT solver, and reports the
//! unsatisfiable core — a set of human-readable labels, each pointing at the
//! assignment, call, or arithmetic expression whose units or frames disagree.
//!
//! ## Invariants
//!
//! - **One symbol per referent.** Every occurrence of the same fully
//!   qualified variable, function (return type and per-argument type), or
//!   struct-member path maps to the same [`z3`] constant — see
//!   [`context::AnalysisContext`].
//! - **Literals are universally compatible.** A `Type` built from an integer
//!   or floating literal carries `is_constant = true` and is accepted on
//!   either side of `+`, `-`, or `=` regardless of its (fabricated) unit —
//!   see [`algebra::types_equal`].
//! - **Workers are isolated.** Each translation unit is analyzed against its
//!   own [`z3::Context`] and its own [`context::AnalysisContext`]; nothing
//!   is shared across worker threads except read-only compile-command data
//!   and the bounded channels in [`pipeline`].
//! - **Never panics out of the walk.** Unresolvable expressions are logged
//!   at `WARNING` and the containing statement is skipped; a worker thread
//!   that *does* panic is caught at the join boundary in [`pipeline`] and
//!   reported as a per-TU failure rather than tearing down the run.
//!
//! These invariants are enforced by construction in the modules below; a
//! violation would be a bug, not a reportable finding.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Configuration threaded through every component (scalar mode, ignore
/// lists, cache directory).
pub mod config;
/// Typed error enums, one family per component.
pub mod error;
/// Coordinate-frame bitmask and the fixed frame-name table.
pub mod frames;
/// Unit-name → base-unit-vector / scalar tables.
pub mod units_table;
/// Symbolic physical-type algebra (Scalar, Unit, Frames, Type datatypes).
pub mod algebra;
/// Per-worker analysis context (the re-architected global maps).
pub mod context;
/// Prior-types JSON loader.
pub mod prior_types;
/// Protocol/message-definition loaders (MAVLink, CMASI, LMCP/HTTP).
pub mod protocol;
/// Thin AST helper facade over the host C/C++ parser.
pub mod ast;
/// The constraint-generating AST visitor.
pub mod walker;
/// Per-translation-unit serialization and on/off-disk memoization.
pub mod cache;
/// Worker-thread pool driving the per-TU pipeline.
pub mod pipeline;
/// Global-solver configuration and unsat-core reporting.
pub mod solve;
/// Signal-gated daemon re-run loop.
pub mod daemon;

/// Number of SI base dimensions tracked by a [`algebra::Unit`]: meter,
/// second, mole, ampere, kelvin, candela, kilogram, in that order.
pub const NUM_BASE_UNITS: usize = 7;

/// Number of distinct coordinate frames tracked by a [`frames::Frames`]
/// bitmask.
pub const NUM_FRAMES: usize = frames::NUM_FRAMES;
