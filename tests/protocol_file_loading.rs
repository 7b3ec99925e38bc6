//! Black-box integration test for the root-element sniffing that picks
//! between the MAVLink and CMASI loaders, exercised against a real file on
//! disk the way the CLI binary hands it a `--message-definition` path.

use std::io::Write;

use flightcheck::algebra::TypeSystem;
use flightcheck::config::AnalysisConfig;
use flightcheck::context::AnalysisContext;
use flightcheck::protocol::{load_message_definitions, ProtocolDefinitionSource};
use z3::{Config, Context, Solver};

#[tokio::test]
async fn mavlink_file_is_sniffed_and_loaded() {
    let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    write!(
        file,
        r#"<?xml version="1.0"?>
           <mavlink>
             <messages>
               <message name="GLOBAL_POSITION_INT">
                 <field name="alt" units="mm">Altitude</field>
               </message>
             </messages>
           </mavlink>"#
    )
    .unwrap();

    let config = AnalysisConfig::new();
    let ctx3 = Context::new(&Config::new());
    let sys = TypeSystem::new(&ctx3, &config);
    let solver = Solver::new(&ctx3);
    let mut ctx = AnalysisContext::new();

    let src = ProtocolDefinitionSource::from_location(file.path().to_string_lossy().into_owned());
    load_message_definitions(&src, &sys, &solver, &mut ctx).await.expect("mavlink file should load");

    assert!(ctx.member_access_to_type.contains_key("mavlink_global_position_int_t.alt"));
}

#[tokio::test]
async fn unrecognized_root_element_is_an_error() {
    let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    write!(file, "<not_a_protocol_root></not_a_protocol_root>").unwrap();

    let config = AnalysisConfig::new();
    let ctx3 = Context::new(&Config::new());
    let sys = TypeSystem::new(&ctx3, &config);
    let solver = Solver::new(&ctx3);
    let mut ctx = AnalysisContext::new();

    let src = ProtocolDefinitionSource::from_location(file.path().to_string_lossy().into_owned());
    let result = load_message_definitions(&src, &sys, &solver, &mut ctx).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let config = AnalysisConfig::new();
    let ctx3 = Context::new(&Config::new());
    let sys = TypeSystem::new(&ctx3, &config);
    let solver = Solver::new(&ctx3);
    let mut ctx = AnalysisContext::new();

    let src = ProtocolDefinitionSource::from_location("/nonexistent/definitions.xml".to_string());
    let result = load_message_definitions(&src, &sys, &solver, &mut ctx).await;
    assert!(result.is_err());
}
