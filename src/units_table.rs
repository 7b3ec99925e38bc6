//! Fixed tables mapping a unit's source-level name (as written in a
//! message-definition's `Units` annotation) to its base-unit vector and
//! scalar multiplier.

use std::collections::HashMap;
use std::sync::OnceLock;

/// `[meter, second, mole, ampere, kelvin, candela, kilogram]` exponents.
pub type BaseUnitVector = [i32; crate::NUM_BASE_UNITS];

fn base_unit_vectors() -> &'static HashMap<&'static str, BaseUnitVector> {
    static TABLE: OnceLock<HashMap<&'static str, BaseUnitVector>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("centimeter", [1, 0, 0, 0, 0, 0, 0]),
            ("cm", [1, 0, 0, 0, 0, 0, 0]),
            ("cm/s", [1, -1, 0, 0, 0, 0, 0]),
            ("cm^2", [2, 0, 0, 0, 0, 0, 0]),
            ("gauss", [0, -2, 0, -1, 0, 0, 1]),
            ("literal", [0, 0, 0, 0, 0, 0, 0]),
            ("m", [1, 0, 0, 0, 0, 0, 0]),
            ("mgauss", [0, -2, 0, -1, 0, 0, 1]),
            ("meter", [1, 0, 0, 0, 0, 0, 0]),
            ("meter/sec", [1, -1, 0, 0, 0, 0, 0]),
            ("meter/sec/sec", [1, -2, 0, 0, 0, 0, 0]),
            ("millisecond", [0, 1, 0, 0, 0, 0, 0]),
            ("milliseconds", [0, 1, 0, 0, 0, 0, 0]),
            ("mm", [1, 0, 0, 0, 0, 0, 0]),
            ("ms", [0, 1, 0, 0, 0, 0, 0]),
            ("m/s", [1, -1, 0, 0, 0, 0, 0]),
            ("m/s/s", [1, -2, 0, 0, 0, 0, 0]),
            ("s", [0, 1, 0, 0, 0, 0, 0]),
            ("sec", [0, 1, 0, 0, 0, 0, 0]),
            ("us", [0, 1, 0, 0, 0, 0, 0]),
        ])
    })
}

/// `(numerator, denominator)`, e.g. `cm` is `1/100` of its base unit (`m`).
fn scalars() -> &'static HashMap<&'static str, (i64, i64)> {
    static TABLE: OnceLock<HashMap<&'static str, (i64, i64)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("centimeter", (1, 100)),
            ("cm", (1, 100)),
            ("cm/s", (1, 100)),
            ("cm^2", (1, 10000)),
            ("gauss", (1, 1000)),
            ("meter", (1, 1)),
            ("meter/sec", (1, 1)),
            ("meter/sec/sec", (1, 1)),
            ("millisecond", (1, 1000)),
            ("milliseconds", (1, 1000)),
            ("m", (1, 1)),
            ("mgauss", (1, 10000000)),
            ("mm", (1, 1000)),
            ("ms", (1, 1000)),
            ("m/s", (1, 1)),
            ("m/s/s", (1, 1)),
            ("s", (1, 1)),
            ("sec", (1, 1)),
            ("us", (1, 1000000)),
        ])
    })
}

/// The unit name used for integer/floating literals: dimensionless, with a
/// multiplier of 1/1.
pub const LITERAL_UNIT: &str = "literal";

/// Look up a unit's base-dimension vector. Unknown unit names (free-form
/// text in a message definition that isn't one of the recognized physical
/// units) fall back to dimensionless, matching the original's tolerant
/// handling of `KeyError` on this table.
pub fn base_unit_vector(name: &str) -> BaseUnitVector {
    base_unit_vectors().get(name).copied().unwrap_or([0; crate::NUM_BASE_UNITS])
}

/// Look up a unit's scalar multiplier, defaulting to `1/1` if unknown.
pub fn scalar(name: &str) -> (i64, i64) {
    scalars().get(name).copied().unwrap_or((1, 1))
}

/// True if `name` appears in either table, i.e. is a unit this analyzer
/// actually has dimensional data for.
pub fn is_known_unit(name: &str) -> bool {
    base_unit_vectors().contains_key(name) || scalars().contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_and_centimeter_share_dimension_but_differ_in_scalar() {
        assert_eq!(base_unit_vector("m"), base_unit_vector("cm"));
        assert_ne!(scalar("m"), scalar("cm"));
        assert_eq!(scalar("cm"), (1, 100));
    }

    #[test]
    fn unknown_unit_is_dimensionless_with_unit_scalar() {
        assert_eq!(base_unit_vector("furlong"), [0; crate::NUM_BASE_UNITS]);
        assert_eq!(scalar("furlong"), (1, 1));
        assert!(!is_known_unit("furlong"));
    }

    #[test]
    fn literal_unit_is_dimensionless() {
        assert_eq!(base_unit_vector(LITERAL_UNIT), [0; crate::NUM_BASE_UNITS]);
    }
}
