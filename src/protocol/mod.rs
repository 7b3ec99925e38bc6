//! Message/struct definition sources: either a local MAVLink or CMASI XML
//! file, or a remote "flex module" HTTP API serving the same information
//! for protocols generated from an IDL (currently only OpenUxAS LMCP).

pub mod cmasi;
pub mod lmcp;
pub mod mavlink;

use std::path::Path;

use z3::Solver;

use crate::algebra::TypeSystem;
use crate::context::AnalysisContext;
use crate::error::ProtocolLoadError;

/// Which kind of source a [`ProtocolDefinitionSource`] points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolDefinitionSourceKind {
    /// A local XML file (MAVLink or CMASI/MDM format).
    ProtocolFile,
    /// A flex-module API base URL.
    FlexModuleApi,
}

/// A message-definition source, resolved from a single CLI-supplied
/// string: a bare path is a local file, an `http(s)://` URL is a
/// flex-module API.
#[derive(Clone, Debug)]
pub struct ProtocolDefinitionSource {
    pub kind: ProtocolDefinitionSourceKind,
    pub location: String,
}

impl ProtocolDefinitionSource {
    /// Classifies `location` by its scheme.
    pub fn from_location(location: impl Into<String>) -> Self {
        let location = location.into();
        let kind = if location.starts_with("http://") || location.starts_with("https://") {
            ProtocolDefinitionSourceKind::FlexModuleApi
        } else {
            ProtocolDefinitionSourceKind::ProtocolFile
        };
        ProtocolDefinitionSource { kind, location }
    }
}

/// Loads `src`, seeding `ctx` with return-type constraints (for CMASI-style
/// getters) and member-access types (for MAVLink-style fields), asserting
/// each against `solver` via `ctx.assert_and_check`.
pub async fn load_message_definitions<'z>(
    src: &ProtocolDefinitionSource,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) -> Result<(), ProtocolLoadError> {
    match src.kind {
        ProtocolDefinitionSourceKind::ProtocolFile => load_from_file(Path::new(&src.location), sys, solver, ctx),
        ProtocolDefinitionSourceKind::FlexModuleApi => {
            lmcp::load_from_flex_module_api(&src.location, sys, solver, ctx).await
        }
    }
}

fn load_from_file<'z>(
    path: &Path,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) -> Result<(), ProtocolLoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ProtocolLoadError::Read { path: path.to_path_buf(), source })?;
    let root_name = root_element_name(&text);

    match root_name.as_deref() {
        Some("MDM") => cmasi::parse(&text, sys, solver, ctx)
            .map_err(|source| ProtocolLoadError::Xml { path: path.to_path_buf(), source }),
        Some("mavlink") => mavlink::parse(&text, sys, ctx)
            .map_err(|source| ProtocolLoadError::Xml { path: path.to_path_buf(), source }),
        other => Err(ProtocolLoadError::UnsupportedRoot(other.unwrap_or("<empty>").to_string())),
    }
}

/// The document's root element name, skipping the `<?xml ... ?>` prolog and
/// any leading text/comments/processing instructions — matching
/// `ET.fromstring(data).tag`'s tolerance of a prolog the stdlib XML parser
/// just steps over.
fn root_element_name(text: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(text);
    loop {
        match reader.read_event().ok()? {
            quick_xml::events::Event::Start(tag) | quick_xml::events::Event::Empty(tag) => {
                return Some(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
            }
            quick_xml::events::Event::Decl(_)
            | quick_xml::events::Event::Text(_)
            | quick_xml::events::Event::Comment(_)
            | quick_xml::events::Event::PI(_) => continue,
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_url_vs_path() {
        let http = ProtocolDefinitionSource::from_location("http://flex.example/api");
        assert_eq!(http.kind, ProtocolDefinitionSourceKind::FlexModuleApi);
        let https = ProtocolDefinitionSource::from_location("https://flex.example/api");
        assert_eq!(https.kind, ProtocolDefinitionSourceKind::FlexModuleApi);
        let file = ProtocolDefinitionSource::from_location("./definitions/cmasi.xml");
        assert_eq!(file.kind, ProtocolDefinitionSourceKind::ProtocolFile);
    }

    #[test]
    fn root_element_name_skips_the_xml_prolog() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- generated -->\n<mavlink><messages/></mavlink>";
        assert_eq!(root_element_name(xml).as_deref(), Some("mavlink"));
    }

    #[test]
    fn root_element_name_works_without_a_prolog() {
        assert_eq!(root_element_name("<MDM></MDM>").as_deref(), Some("MDM"));
    }
}
