//! MAVLink XML message-definition parsing.
//!
//! Unlike the CMASI loader, MAVLink fields map directly onto a struct
//! member (`mavlink_<msg>_t.<field>`) rather than a getter function, so
//! the type goes straight into `ctx.member_access_to_type` with no solver
//! assertion needed — there's nothing to unify against yet.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::algebra::TypeSystem;
use crate::context::AnalysisContext;
use crate::frames::{Frames, NUM_FRAMES};
use crate::units_table;

/// Parses a MAVLink `<mavlink>...</mavlink>` document and seeds `ctx` with
/// one entry per unit-bearing field, plus the set of fields that are
/// themselves a `MAV_FRAME` discriminant (eligible for the walker's
/// `if (msg.frame == X)` refinement).
pub fn parse<'z>(xml: &str, sys: &TypeSystem<'z>, ctx: &mut AnalysisContext<'z>) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current_typename: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                if name == "message" {
                    let msg_name = attr(&tag, "name").unwrap_or_default();
                    current_typename = Some(format!("mavlink_{}_t", msg_name.to_lowercase()));
                } else if name == "field" {
                    let Some(typename) = current_typename.clone() else { continue };
                    let Some(field_name) = attr(&tag, "name") else { continue };
                    let access = format!("{typename}.{field_name}");

                    let unit_name = attr(&tag, "units");
                    match unit_name {
                        None => {
                            if attr(&tag, "enum").as_deref() == Some("MAV_FRAME") {
                                ctx.member_frame_accesses.insert(access);
                            }
                        }
                        Some(unit_name) if units_table::is_known_unit(&unit_name) => {
                            ctx.member_access_with_prior_types.insert(access.clone());
                            let (num, den) = units_table::scalar(&unit_name);
                            let scalar = sys.scalar_from_pair(num, den);
                            let unit = sys.create_unit(&scalar, units_table::base_unit_vector(&unit_name));
                            // MAVLink doesn't annotate a field's frame, so
                            // it's compatible with every frame until a
                            // conditional narrows it.
                            let frames = sys.create_frames(Frames::from_ids(0..NUM_FRAMES as u32));
                            let var_type = sys.create_type(&unit, &frames, false);
                            ctx.member_access_to_type.insert(access, var_type);
                        }
                        Some(unit_name) => {
                            tracing::warn!(%unit_name, "unrecognized unit");
                        }
                    }
                }
            }
            Event::End(tag) if tag.name().as_ref() == b"message" => current_typename = None,
            _ => {}
        }
    }
    Ok(())
}

fn attr(tag: &quick_xml::events::BytesStart<'_>, key: &str) -> Option<String> {
    tag.attributes().filter_map(Result::ok).find(|a| a.key.as_ref() == key.as_bytes()).map(|a| {
        String::from_utf8_lossy(&a.value).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use z3::{Config, Context};

    #[test]
    fn field_with_known_unit_is_recorded() {
        let xml = r#"
            <mavlink>
              <messages>
                <message name="GLOBAL_POSITION_INT">
                  <field name="alt" units="mm">Altitude</field>
                  <field name="time_boot_ms" units="ms">Timestamp</field>
                </message>
              </messages>
            </mavlink>
        "#;
        let config = AnalysisConfig::new();
        let ctx3 = Context::new(&Config::new());
        let sys = TypeSystem::new(&ctx3, &config);
        let mut ctx = AnalysisContext::new();
        parse(xml, &sys, &mut ctx).unwrap();
        assert!(ctx.member_access_to_type.contains_key("mavlink_global_position_int_t.alt"));
        assert!(ctx.member_access_to_type.contains_key("mavlink_global_position_int_t.time_boot_ms"));
    }

    #[test]
    fn frame_discriminant_field_is_recorded_separately() {
        let xml = r#"
            <mavlink>
              <messages>
                <message name="SET_POSITION_TARGET_LOCAL_NED">
                  <field name="coordinate_frame" enum="MAV_FRAME">Frame</field>
                </message>
              </messages>
            </mavlink>
        "#;
        let config = AnalysisConfig::new();
        let ctx3 = Context::new(&Config::new());
        let sys = TypeSystem::new(&ctx3, &config);
        let mut ctx = AnalysisContext::new();
        parse(xml, &sys, &mut ctx).unwrap();
        assert!(ctx
            .member_frame_accesses
            .contains("mavlink_set_position_target_local_ned_t.coordinate_frame"));
    }
}
