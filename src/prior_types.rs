//! Loader for the prior-types JSON file: a list of variable descriptions
//! that seed known units and coordinate frames before any source is
//! walked, so member accesses into third-party structs (which the walker
//! never sees a definition for) still get a type.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use z3::ast::{Ast, Bool};
use z3::Solver;

use crate::algebra::TypeSystem;
use crate::context::AnalysisContext;
use crate::error::PriorTypesError;
use crate::frames::Frames;
use crate::units_table;

/// One entry of the prior-types JSON array.
#[derive(Debug, Deserialize)]
pub struct VariableDescription {
    #[serde(rename = "VariableName")]
    pub variable_name: String,
    #[serde(rename = "SemanticInfo")]
    pub semantic_info: SemanticInfo,
}

#[derive(Debug, Deserialize)]
pub struct SemanticInfo {
    #[serde(rename = "Units")]
    pub units: Vec<String>,
    #[serde(rename = "CoordinateFrames")]
    pub coordinate_frames: Vec<String>,
}

/// Reads and parses the prior-types JSON file at `path`.
pub fn load(path: &Path) -> Result<Vec<VariableDescription>, PriorTypesError> {
    let mut text = String::new();
    std::fs::File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(|source| PriorTypesError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| PriorTypesError::Parse { path: path.to_path_buf(), source })
}

/// Seeds `ctx`/`solver` with every description in `descriptions`, following
/// [`parse_variable_description`]. Descriptions whose unit name isn't in
/// [`units_table`] are silently skipped, matching the original's tolerant
/// handling of an unrecognized `Units[0]` entry.
pub fn apply_all<'z>(
    descriptions: &[VariableDescription],
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) {
    for description in descriptions {
        parse_variable_description(description, sys, solver, ctx);
    }
}

/// Seeds a single variable description: builds its `Unit`/`Frames`/`Type`
/// from the first listed unit name and the set of coordinate frames, and
/// records the result in `ctx.member_access_to_type` under the
/// `::`-to-`.`-normalized name.
fn parse_variable_description<'z>(
    description: &VariableDescription,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) {
    let name = description.variable_name.replace("::", ".");
    ctx.member_access_with_prior_types.insert(name.clone());

    let Some(unit_name) = description.semantic_info.units.first() else {
        return;
    };
    if !units_table::is_known_unit(unit_name) {
        return;
    }

    let frame_ids = description
        .semantic_info
        .coordinate_frames
        .iter()
        .filter_map(|frame_name| crate::frames::frame_id(frame_name))
        .collect::<Vec<_>>();
    let frames_mask = Frames::from_ids(frame_ids);

    let (num, den) = units_table::scalar(unit_name);
    let scalar = sys.scalar_from_pair(num, den);
    let unit = sys.create_unit(&scalar, units_table::base_unit_vector(unit_name));
    let frames = sys.create_frames(frames_mask);

    // Three named constants, so any later reference built by name (rather
    // than through `ctx.member_access_to_type`) still unifies with these.
    let named_unit = sys.named_unit(&format!("{name}_units"));
    let named_frames = sys.named_frames(&format!("{name}_frames"));
    let named_type = sys.named_type(&format!("{name}_type"));

    ctx.assert_and_check(sys, solver, &named_unit._eq(&unit), format!("{name} unit known from prior type file"));
    ctx.assert_and_check(sys, solver, &named_frames._eq(&frames), format!("{name} frames known from prior type file"));
    let var_type = sys.create_type(&named_unit, &named_frames, false);
    ctx.assert_and_check(sys, solver, &named_type._eq(&var_type), format!("{name} known from prior type file"));

    ctx.var_name_to_type.insert(name.clone(), named_type.clone());
    ctx.member_access_to_type.insert(name, named_type);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn parses_minimal_description_list() {
        let json = r#"[
            {
                "VariableName": "AP_Baro::altitude",
                "SemanticInfo": {
                    "Units": ["m"],
                    "CoordinateFrames": ["MAV_FRAME_GLOBAL"]
                }
            }
        ]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let descriptions = load(file.path()).unwrap();
        assert_eq!(descriptions.len(), 1);
        assert_eq!(descriptions[0].variable_name, "AP_Baro::altitude");
        assert_eq!(descriptions[0].semantic_info.units[0], "m");
    }

    #[test]
    fn unknown_path_is_a_read_error() {
        let err = load(Path::new("/nonexistent/prior_types.json")).unwrap_err();
        assert!(matches!(err, PriorTypesError::Read { .. }));
    }
}
