//! Flex-module API client: downloads struct definitions for a protocol
//! package (currently only OpenUxAS LMCP v3) over HTTP and seeds return
//! types exactly as the CMASI file loader does.

use serde::Deserialize;
use z3::ast::Ast;
use z3::Solver;

use crate::algebra::TypeSystem;
use crate::context::AnalysisContext;
use crate::error::ProtocolLoadError;
use crate::units_table;

const UNITS_ANNOTATION_NAME: &str = "tangram::flex::helpers::v1.annotations.Units";

/// A protocol package the flex-module API can serve definitions for.
#[derive(Clone, Copy, Debug)]
pub enum Package {
    Mavlink23,
    OpenUxasLmcpV3,
}

impl Package {
    fn as_path_segment(self) -> &'static str {
        match self {
            Package::Mavlink23 => "MAVLink::v23",
            Package::OpenUxasLmcpV3 => "OpenUxAS::LMCP::v3",
        }
    }
}

#[derive(Debug)]
struct Message {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StructResponse {
    name: String,
    fields: Vec<FieldResponse>,
}

#[derive(Debug, Deserialize)]
struct FieldResponse {
    name: String,
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    name: String,
    values: Vec<String>,
}

fn unit_name_in_annotations(annotations: &[Annotation]) -> Option<String> {
    annotations
        .iter()
        .find(|a| a.name == UNITS_ANNOTATION_NAME && !a.values.is_empty())
        .map(|a| a.values[0].clone())
}

#[derive(Clone)]
struct FlexApi {
    client: reqwest::Client,
    api_url: String,
}

impl FlexApi {
    fn new(api_url: impl Into<String>) -> Self {
        FlexApi { client: reqwest::Client::new(), api_url: api_url.into() }
    }

    fn message_url(&self, package: Package) -> String {
        format!("{}/v1/package/{}/messages", self.api_url, package.as_path_segment())
    }

    fn struct_url(&self, package: Package, struct_name: &str) -> String {
        format!("{}/v1/package/{}/struct/{struct_name}", self.api_url, package.as_path_segment())
    }

    async fn download_messages(&self, package: Package) -> Result<Vec<Message>, ProtocolLoadError> {
        let url = self.message_url(package);
        let names: Vec<String> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ProtocolLoadError::Http { url: url.clone(), source })?
            .json()
            .await
            .map_err(|source| ProtocolLoadError::Http { url: url.clone(), source })?;
        Ok(names
            .into_iter()
            .map(|name| {
                let url = self.struct_url(package, &name);
                Message { name, url }
            })
            .collect())
    }

    async fn download_struct(&self, url: &str) -> Result<StructResponse, ProtocolLoadError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|source| ProtocolLoadError::Http { url: url.to_string(), source })?
            .json()
            .await
            .map_err(|source| ProtocolLoadError::Http { url: url.to_string(), source })
    }
}

/// Downloads every LMCP message struct from `api_url` and seeds `ctx` with
/// one getter return-type constraint per recognized field, matching the
/// CMASI loader's naming (`afrl::cmasi::<Struct>::get<Field>`).
pub async fn load_from_flex_module_api<'z>(
    api_url: &str,
    sys: &TypeSystem<'z>,
    solver: &Solver<'z>,
    ctx: &mut AnalysisContext<'z>,
) -> Result<(), ProtocolLoadError> {
    let api = FlexApi::new(api_url);
    let messages = api.download_messages(Package::OpenUxasLmcpV3).await?;
    let structs = download_structs_concurrently(&api, &messages).await;

    for struct_def in structs {
        let struct_def = struct_def?;
        for field in &struct_def.fields {
            let Some(unit_name) = unit_name_in_annotations(&field.annotations) else { continue };
            if unit_name.eq_ignore_ascii_case("none") {
                continue;
            }
            if !units_table::is_known_unit(&unit_name) {
                tracing::warn!(%unit_name, "unrecognized unit. Skipping.");
                continue;
            }
            let field_name = capitalize(&field.name);
            let getter_name = format!("afrl::cmasi::{}::get{field_name}", struct_def.name);

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
                format!("{getter_name} return unit known from LMCP definition"),
            );
            let expected_type = sys.create_type(&return_unit, &return_frames, false);
            ctx.assert_and_check(
                sys,
                solver,
                &return_type._eq(&expected_type),
                format!("{getter_name} known from LMCP definition"),
            );
            ctx.fn_name_to_return_type.insert(getter_name, return_type);
        }
    }
    Ok(())
}

/// Spawns one task per struct download so they all progress concurrently —
/// matching the original's `asyncio.as_completed` fan-out — then awaits
/// them in request order (irrelevant for correctness, since each field is
/// looked up by name downstream, but keeps output deterministic for tests).
async fn download_structs_concurrently(api: &FlexApi, messages: &[Message]) -> Vec<Result<StructResponse, ProtocolLoadError>> {
    let handles: Vec<_> = messages
        .iter()
        .map(|msg| {
            let api = api.clone();
            let url = msg.url.clone();
            tokio::spawn(async move { api.download_struct(&url).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (msg, handle) in messages.iter().zip(handles) {
        results.push(match handle.await {
            Ok(result) => result,
            Err(source) => Err(ProtocolLoadError::TaskJoin { url: msg.url.clone(), source }),
        });
    }
    results
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_upcases_only_the_first_character() {
        assert_eq!(capitalize("altitude"), "Altitude");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("X"), "X");
    }

    #[test]
    fn message_and_struct_urls_are_scoped_to_the_package() {
        let api = FlexApi::new("http://flex.example");
        assert_eq!(
            api.message_url(Package::OpenUxasLmcpV3),
            "http://flex.example/v1/package/OpenUxAS::LMCP::v3/messages"
        );
        assert_eq!(
            api.struct_url(Package::Mavlink23, "GlobalPositionInt"),
            "http://flex.example/v1/package/MAVLink::v23/struct/GlobalPositionInt"
        );
    }

    #[test]
    fn unit_annotation_is_found_by_name() {
        let annotations = vec![
            Annotation { name: "other".to_string(), values: vec!["ignored".to_string()] },
            Annotation { name: UNITS_ANNOTATION_NAME.to_string(), values: vec!["m/s".to_string()] },
        ];
        assert_eq!(unit_name_in_annotations(&annotations), Some("m/s".to_string()));
    }

    #[test]
    fn unit_annotation_missing_or_empty_yields_none() {
        assert_eq!(unit_name_in_annotations(&[]), None);
        let empty_values = vec![Annotation { name: UNITS_ANNOTATION_NAME.to_string(), values: vec![] }];
        assert_eq!(unit_name_in_annotations(&empty_values), None);
    }

}
