//! CMASI ("MDM") XML struct-definition parsing.
//!
//! Each field of a `<Struct>` becomes a synthetic getter
//! (`afrl::cmasi::<Struct>::get<Field>`) whose return type the walker can
//! look up the same way it looks up any other function's return type.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use z3::ast::Ast;
use z3::Solver;

use crate::algebra::TypeSystem;
use crate::context::AnalysisContext;
use crate::units_table;

/// Parses a CMASI `<MDM>...</MDM>` document, asserting one `return unit`
/// and one `return type` constraint per recognized field into `solver`.
pub fn parse<'z>(
    xml: &str,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current_struct: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                if name == "Struct" {
                    current_struct = attr(&tag, "Name");
                } else if let Some(struct_name) = current_struct.clone() {
                    seed_field(&tag, &struct_name, sys, solver, ctx);
                }
            }
            Event::End(tag) if tag.name().as_ref() == b"Struct" => current_struct = None,
            _ => {}
        }
    }
    Ok(())
}

fn seed_field<'z>(
    field: &BytesStart<'_>,
    struct_name: &str,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) {
    let Some(unit_name) = attr(field, "Units") else { return };
    if unit_name.eq_ignore_ascii_case("none") {
        return;
    }
    if !units_table::is_known_unit(&unit_name) {
        tracing::warn!(%unit_name, "unrecognized unit");
        return;
    }
    let Some(field_name) = attr(field, "Name") else { return };
    let getter_name = format!("afrl::cmasi::{struct_name}::get{}", capitalize(&field_name));

    let (num, den) = units_table::scalar(&unit_name);
    let scalar = sys.scalar_from_pair(num, den);
    let unit = sys.create_unit(&scalar, units_table::base_unit_vector(&unit_name));
    let return_unit = sys.named_unit(&format!("{getter_name}_units"));
    let return_frames = sys.named_frames(&format!("{getter_name}_frames"));
    let return_type = sys.named_type(&format!("{getter_name}_return_type"));

    ctx.assert_and_check(
        sys,
        solver,
        &return_unit._eq(&unit),
        format!("{getter_name} return unit known from CMASI definition"),
    );
    let expected_type = sys.create_type(&return_unit, &return_frames, false);
    ctx.assert_and_check(
        sys,
        solver,
        &return_type._eq(&expected_type),
        format!("{getter_name} known from CMASI definition"),
    );

    ctx.fn_name_to_return_type.insert(getter_name, return_type);
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn attr(tag: &BytesStart<'_>, key: &str) -> Option<String> {
    tag.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use z3::{Config, Context};

    #[test]
    fn struct_field_produces_a_getter_return_type() {
        let xml = r#"
            <MDM>
              <StructList>
                <Struct Name="AirVehicleState">
                  <Field Name="altitude" Units="m"/>
                  <Field Name="heading" Units="none"/>
                </Struct>
              </StructList>
            </MDM>
        "#;
        let config = AnalysisConfig::new();
        let ctx3 = Context::new(&Config::new());
        let sys = TypeSystem::new(&ctx3, &config);
        let solver = Solver::new(&ctx3);
        let mut ctx = AnalysisContext::new();
        parse(xml, &sys, &solver, &mut ctx).unwrap();
        assert!(ctx.fn_name_to_return_type.contains_key("afrl::cmasi::AirVehicleState::getAltitude"));
        assert!(!ctx.fn_name_to_return_type.contains_key("afrl::cmasi::AirVehicleState::getHeading"));
    }

    #[test]
    fn capitalize_handles_first_char_only() {
        assert_eq!(capitalize("altitude"), "Altitude");
        assert_eq!(capitalize(""), "");
    }
}
