//! The symbolic physical-type algebra: the Z3 datatypes that represent a
//! scalar prefix, a unit vector, a frame bitmask, and the `Type` that
//! bundles them, plus the operators the walker needs to combine them.
//!
//! Everything here is parameterized by [`crate::config::AnalysisConfig`] at
//! construction time (`scalar_mode`, `enable_scalar_prefixes`) rather than
//! read from a global, so a pipeline worker can build one [`TypeSystem`] per
//! [`z3::Context`] without any cross-thread state.

use z3::ast::{Ast, Bool, Datatype, Dynamic, Int};
use z3::{Context, DatatypeAccessor, DatatypeBuilder, DatatypeSort};

use crate::config::{AnalysisConfig, ScalarMode};
use crate::frames::NUM_FRAMES;
use crate::NUM_BASE_UNITS;

/// An opaque scalar term: an `Int` in power-of-ten mode, or a `Rational`
/// datatype application (`numerator`/`denominator` pair) otherwise. Callers
/// never branch on the representation directly; they go through
/// [`TypeSystem`]'s methods.
pub type Scalar<'ctx> = Dynamic<'ctx>;

/// The declared sorts for one analysis run, tied to a single [`Context`].
/// Built once per worker and threaded through [`crate::walker`].
pub struct TypeSystem<'ctx> {
    ctx: &'ctx Context,
    mode: ScalarMode,
    enable_scalar_prefixes: bool,
    rational: Option<DatatypeSort<'ctx>>,
    unit: DatatypeSort<'ctx>,
    frames: DatatypeSort<'ctx>,
    typ: DatatypeSort<'ctx>,
}

impl<'ctx> TypeSystem<'ctx> {
    /// Declares `Rational` (if rational mode), `Unit`, `Frames`, and `Type`
    /// against `ctx`, following `config`'s scalar mode and scalar-prefix
    /// toggle.
    pub fn new(ctx: &'ctx Context, config: &AnalysisConfig) -> Self {
        let rational = match config.scalar_mode {
            ScalarMode::PowerOfTen => None,
            ScalarMode::Rational => Some(
                DatatypeBuilder::new(ctx, "Rational")
                    .variant(
                        "rational",
                        vec![
                            ("numerator", DatatypeAccessor::Sort(z3::Sort::int(ctx))),
                            ("denominator", DatatypeAccessor::Sort(z3::Sort::int(ctx))),
                        ],
                    )
                    .finish(),
            ),
        };

        let scalar_sort = match (&rational, config.scalar_mode) {
            (Some(r), ScalarMode::Rational) => r.sort.clone(),
            _ => z3::Sort::int(ctx),
        };

        let mut unit_fields: Vec<(&str, DatatypeAccessor<'_>)> = Vec::new();
        if config.enable_scalar_prefixes {
            unit_fields.push(("scalar", DatatypeAccessor::Sort(scalar_sort)));
        }
        let base_unit_names: Vec<String> =
            (0..NUM_BASE_UNITS).map(|i| format!("si_base_unit_{i}")).collect();
        for name in &base_unit_names {
            unit_fields.push((name.as_str(), DatatypeAccessor::Sort(z3::Sort::int(ctx))));
        }
        let unit = DatatypeBuilder::new(ctx, "Unit").variant("unit", unit_fields).finish();

        let frame_names: Vec<String> = (0..NUM_FRAMES).map(|i| format!("frame_{i}")).collect();
        let frame_fields: Vec<(&str, DatatypeAccessor<'_>)> = frame_names
            .iter()
            .map(|name| (name.as_str(), DatatypeAccessor::Sort(z3::Sort::bool(ctx))))
            .collect();
        let frames = DatatypeBuilder::new(ctx, "Frames").variant("frames", frame_fields).finish();

        let typ = DatatypeBuilder::new(ctx, "Type")
            .variant(
                "type",
                vec![
                    ("unit", DatatypeAccessor::Sort(unit.sort.clone())),
                    ("frame", DatatypeAccessor::Sort(frames.sort.clone())),
                    ("is_constant", DatatypeAccessor::Sort(z3::Sort::bool(ctx))),
                ],
            )
            .finish();

        TypeSystem {
            ctx,
            mode: config.scalar_mode,
            enable_scalar_prefixes: config.enable_scalar_prefixes,
            rational,
            unit,
            frames,
            typ,
        }
    }

    /// The `Context` this type system was declared against.
    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    fn rational(&self) -> &DatatypeSort<'ctx> {
        self.rational.as_ref().expect("rational scalar requested outside rational mode")
    }

    fn rational_numerator(&self, r: &Dynamic<'ctx>) -> Int<'ctx> {
        self.rational().variants[0].accessors[0].apply(&[r]).as_int().unwrap()
    }

    fn rational_denominator(&self, r: &Dynamic<'ctx>) -> Int<'ctx> {
        self.rational().variants[0].accessors[1].apply(&[r]).as_int().unwrap()
    }

    fn rational_of(&self, num: &Int<'ctx>, den: &Int<'ctx>) -> Dynamic<'ctx> {
        self.rational().variants[0].constructor.apply(&[num, den])
    }

    /// A fresh scalar constant from a `(numerator, denominator)` pair (or,
    /// in power-of-ten mode, `log10(num) - log10(den)` truncated to an
    /// integer exponent).
    pub fn scalar_from_pair(&self, num: i64, den: i64) -> Scalar<'ctx> {
        match self.mode {
            ScalarMode::Rational => self.rational_of(&Int::from_i64(self.ctx, num), &Int::from_i64(self.ctx, den)),
            ScalarMode::PowerOfTen => {
                let exponent = (num as f64 / den as f64).log10().round() as i64;
                Dynamic::from_ast(&Int::from_i64(self.ctx, exponent))
            }
        }
    }

    /// The multiplicative identity scalar (used when scalar prefixes are
    /// disabled entirely, or as the default unit for a bare dimension).
    pub fn scalar_one(&self) -> Scalar<'ctx> {
        self.scalar_from_pair(1, 1)
    }

    /// `s1 * s2`: in power-of-ten mode this is exponent addition; in
    /// rational mode it's the usual fraction product.
    pub fn scalar_multiply(&self, s1: &Scalar<'ctx>, s2: &Scalar<'ctx>) -> Scalar<'ctx> {
        match self.mode {
            ScalarMode::PowerOfTen => {
                let a = s1.as_int().expect("scalar must be Int in power-of-ten mode");
                let b = s2.as_int().expect("scalar must be Int in power-of-ten mode");
                Dynamic::from_ast(&(a + b))
            }
            ScalarMode::Rational => {
                let num = self.rational_numerator(s1) * self.rational_numerator(s2);
                let den = self.rational_denominator(s1) * self.rational_denominator(s2);
                self.rational_of(&num, &den)
            }
        }
    }

    /// `s1 / s2`: exponent subtraction, or cross-multiplied fraction
    /// division.
    pub fn scalar_divide(&self, s1: &Scalar<'ctx>, s2: &Scalar<'ctx>) -> Scalar<'ctx> {
        match self.mode {
            ScalarMode::PowerOfTen => {
                let a = s1.as_int().expect("scalar must be Int in power-of-ten mode");
                let b = s2.as_int().expect("scalar must be Int in power-of-ten mode");
                Dynamic::from_ast(&(a - b))
            }
            ScalarMode::Rational => {
                let num = self.rational_numerator(s1) * self.rational_denominator(s2);
                let den = self.rational_denominator(s1) * self.rational_numerator(s2);
                self.rational_of(&num, &den)
            }
        }
    }

    /// The scalar field of a `Unit`, or the identity if scalar prefixes are
    /// disabled for this run.
    pub fn get_scalar(&self, unit: &Datatype<'ctx>) -> Scalar<'ctx> {
        if self.enable_scalar_prefixes {
            self.unit.variants[0].accessors[0].apply(&[unit])
        } else {
            self.scalar_one()
        }
    }

    /// Builds a `Unit` value from a scalar prefix and the seven base-unit
    /// exponents, in `[meter, second, mole, ampere, kelvin, candela,
    /// kilogram]` order. The scalar argument is ignored (and may be
    /// omitted by callers that pass [`TypeSystem::scalar_one`]) when scalar
    /// prefixes are disabled.
    pub fn create_unit(&self, scalar: &Scalar<'ctx>, base_vector: [i32; NUM_BASE_UNITS]) -> Datatype<'ctx> {
        let exponents: Vec<Int<'ctx>> =
            base_vector.iter().map(|e| Int::from_i64(self.ctx, *e as i64)).collect();
        let ctor = &self.unit.variants[0].constructor;
        if self.enable_scalar_prefixes {
            let mut args: Vec<&dyn Ast<'ctx>> = vec![scalar];
            for e in &exponents {
                args.push(e);
            }
            ctor.apply(&args).as_datatype().unwrap()
        } else {
            let args: Vec<&dyn Ast<'ctx>> = exponents.iter().map(|e| e as &dyn Ast<'ctx>).collect();
            ctor.apply(&args).as_datatype().unwrap()
        }
    }

    fn base_unit_offset(&self) -> usize {
        if self.enable_scalar_prefixes {
            1
        } else {
            0
        }
    }

    /// The `i`th base-unit exponent (`si_base_unit_i`) of a `Unit` value,
    /// as a symbolic `Int` rather than a concrete literal — needed when
    /// combining two already-symbolic units under `*`/`/`.
    pub fn unit_base_exponent(&self, unit: &Datatype<'ctx>, i: usize) -> Int<'ctx> {
        self.unit.variants[0].accessors[self.base_unit_offset() + i].apply(&[unit]).as_int().unwrap()
    }

    /// Builds a `Unit` from a scalar prefix and seven already-symbolic
    /// base-unit exponent terms, e.g. the pairwise sum/difference of two
    /// operands' exponents in a `*`/`/` expression.
    pub fn unit_from_terms(&self, scalar: &Scalar<'ctx>, exponents: [Int<'ctx>; NUM_BASE_UNITS]) -> Datatype<'ctx> {
        let ctor = &self.unit.variants[0].constructor;
        if self.enable_scalar_prefixes {
            let mut args: Vec<&dyn Ast<'ctx>> = vec![scalar];
            for e in &exponents {
                args.push(e);
            }
            ctor.apply(&args).as_datatype().unwrap()
        } else {
            let args: Vec<&dyn Ast<'ctx>> = exponents.iter().map(|e| e as &dyn Ast<'ctx>).collect();
            ctor.apply(&args).as_datatype().unwrap()
        }
    }

    /// The `Unit` field of a `Type`.
    pub fn unit_of(&self, typ: &Datatype<'ctx>) -> Datatype<'ctx> {
        self.type_unit(typ).as_datatype().unwrap()
    }

    /// `True` iff every base-unit exponent in `typ`'s unit is zero.
    pub fn is_dimensionless(&self, typ: &Datatype<'ctx>) -> Bool<'ctx> {
        let unit = self.type_unit(typ);
        let base_offset = self.base_unit_offset();
        let zero = Int::from_i64(self.ctx, 0);
        let mut conjuncts = Vec::with_capacity(NUM_BASE_UNITS);
        for i in 0..NUM_BASE_UNITS {
            let exponent = self.unit.variants[0].accessors[base_offset + i].apply(&[&unit]);
            conjuncts.push(exponent._eq(&Dynamic::from_ast(&zero)));
        }
        let refs: Vec<&Bool<'ctx>> = conjuncts.iter().collect();
        Bool::and(self.ctx, &refs)
    }

    /// Builds a `Frames` value from the set of frame ids a value is known
    /// to inhabit.
    pub fn create_frames(&self, mask: crate::frames::Frames) -> Datatype<'ctx> {
        let bits: Vec<Bool<'ctx>> = (0..NUM_FRAMES)
            .map(|i| Bool::from_bool(self.ctx, mask.contains(i as u32)))
            .collect();
        let args: Vec<&dyn Ast<'ctx>> = bits.iter().map(|b| b as &dyn Ast<'ctx>).collect();
        self.frames.variants[0].constructor.apply(&args).as_datatype().unwrap()
    }

    /// A fresh, otherwise-unconstrained `Frames` constant, used as the
    /// (irrelevant) frame field of a literal's `Type`.
    pub fn fresh_frames(&self, prefix: &str) -> Datatype<'ctx> {
        Datatype::fresh_const(self.ctx, prefix, &self.frames.sort)
    }

    /// A fresh frame constant known only to disagree with `frame` in at
    /// least one bit, and the constraint asserting that — used to refine
    /// the `else` branch of `if (x.frame == F)` without committing to a
    /// concrete complementary frame set. The caller asserts the returned
    /// constraint itself (via `AnalysisContext::assert_and_check`) so it
    /// carries a label back to the `if` statement that produced it.
    pub fn invert_frame(&self, frame: &Datatype<'ctx>) -> (Datatype<'ctx>, Bool<'ctx>) {
        let fresh = Datatype::fresh_const(self.ctx, "inverted_frame", &self.frames.sort);
        let mut disagreements = Vec::with_capacity(NUM_FRAMES);
        for i in 0..NUM_FRAMES {
            let accessor = &self.frames.variants[0].accessors[i];
            let lhs = accessor.apply(&[&fresh]);
            let rhs = accessor.apply(&[frame]);
            disagreements.push(lhs._eq(&rhs).not());
        }
        let refs: Vec<&Bool<'ctx>> = disagreements.iter().collect();
        let constraint = Bool::and(self.ctx, &refs);
        (fresh, constraint)
    }

    fn type_unit(&self, typ: &Datatype<'ctx>) -> Dynamic<'ctx> {
        self.typ.variants[0].accessors[0].apply(&[typ])
    }

    /// The `Frames` field of a `Type`.
    pub fn type_frame(&self, typ: &Datatype<'ctx>) -> Dynamic<'ctx> {
        self.typ.variants[0].accessors[1].apply(&[typ])
    }

    /// The `Frames` field of a `Type`, downcast to `Datatype`.
    pub fn frame_of(&self, typ: &Datatype<'ctx>) -> Datatype<'ctx> {
        self.type_frame(typ).as_datatype().unwrap()
    }

    /// The `is_constant` field of a `Type`.
    pub fn type_is_constant(&self, typ: &Datatype<'ctx>) -> Bool<'ctx> {
        self.typ.variants[0].accessors[2].apply(&[typ]).as_bool().unwrap()
    }

    /// Builds a `Type` from a unit, a frame mask, and a constancy flag.
    pub fn create_type(
        &self,
        unit: &Datatype<'ctx>,
        frame: &Datatype<'ctx>,
        is_constant: bool,
    ) -> Datatype<'ctx> {
        let is_constant = Bool::from_bool(self.ctx, is_constant);
        self.create_type_dyn(unit, frame, &is_constant)
    }

    /// Like [`TypeSystem::create_type`], but `is_constant` is an arbitrary
    /// boolean term rather than a literal — needed when it's itself the
    /// conjunction of two operands' constancy, as in `*`/`/`.
    pub fn create_type_dyn(&self, unit: &Datatype<'ctx>, frame: &Datatype<'ctx>, is_constant: &Bool<'ctx>) -> Datatype<'ctx> {
        self.typ.variants[0]
            .constructor
            .apply(&[unit, frame, is_constant])
            .as_datatype()
            .unwrap()
    }

    /// `t1 == t2` up to `is_constant`: two types with matching unit and
    /// frame are equal outright, and a literal-sourced type (`is_constant`)
    /// is compatible with anything on the other side of an assignment or
    /// arithmetic operator.
    pub fn types_equal(&self, t1: &Datatype<'ctx>, t2: &Datatype<'ctx>) -> Bool<'ctx> {
        let units_match = self.type_unit(t1)._eq(&self.type_unit(t2));
        let frames_match = self.type_frame(t1)._eq(&self.type_frame(t2));
        let both_match = Bool::and(self.ctx, &[&units_match, &frames_match]);
        let c1 = self.type_is_constant(t1);
        let c2 = self.type_is_constant(t2);
        Bool::or(self.ctx, &[&both_match, &c1, &c2])
    }

    /// A fresh unique constant of sort `Type`, used when the walker needs a
    /// symbol for an expression with no other natural name (an anonymous
    /// intermediate in a chained binary expression, for instance).
    pub fn fresh_type(&self, prefix: &str) -> Datatype<'ctx> {
        Datatype::fresh_const(self.ctx, prefix, &self.typ.sort)
    }

    /// A named constant of sort `Type`, used for the stable per-referent
    /// symbols tracked in [`crate::context::AnalysisContext`].
    pub fn named_type(&self, name: &str) -> Datatype<'ctx> {
        Datatype::new_const(self.ctx, name, &self.typ.sort)
    }

    /// A named constant of sort `Unit`.
    pub fn named_unit(&self, name: &str) -> Datatype<'ctx> {
        Datatype::new_const(self.ctx, name, &self.unit.sort)
    }

    /// A named constant of sort `Frames`.
    pub fn named_frames(&self, name: &str) -> Datatype<'ctx> {
        Datatype::new_const(self.ctx, name, &self.frames.sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::Config;

    #[test]
    fn rational_multiply_combines_numerator_and_denominator() {
        let config = AnalysisConfig::new();
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let sys = TypeSystem::new(&ctx, &config);
        let cm = sys.scalar_from_pair(1, 100);
        let m = sys.scalar_one();
        let product = sys.scalar_multiply(&cm, &m);
        // 1/100 * 1/1 should be representable, not panic on downcast.
        let _ = product.as_datatype().unwrap();
    }

    #[test]
    fn power_of_ten_multiply_is_addition_of_exponents() {
        let mut config = AnalysisConfig::new();
        config.scalar_mode = ScalarMode::PowerOfTen;
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let sys = TypeSystem::new(&ctx, &config);
        let a = sys.scalar_from_pair(1, 100);
        let b = sys.scalar_from_pair(1, 10);
        let product = sys.scalar_multiply(&a, &b);
        let _ = product.as_int().unwrap();
    }

    #[test]
    fn types_equal_accepts_constant_regardless_of_unit() {
        let config = AnalysisConfig::new();
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let sys = TypeSystem::new(&ctx, &config);
        let meters = sys.create_unit(&sys.scalar_one(), crate::units_table::base_unit_vector("m"));
        let seconds = sys.create_unit(&sys.scalar_one(), crate::units_table::base_unit_vector("s"));
        let frame = sys.create_frames(crate::frames::Frames::NONE);
        let literal = sys.create_type(&seconds, &frame, true);
        let meter_type = sys.create_type(&meters, &frame, false);
        // This only checks the formula builds without panicking; actual
        // satisfiability is exercised by the solver in integration tests.
        let _ = sys.types_equal(&literal, &meter_type);
    }
}
