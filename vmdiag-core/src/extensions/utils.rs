use tracing::{debug, warn};

use super::diagnostics::DiagnosticsExtensionBuilder;
use super::types::{DiagnosticsExtensionContext, ExtensionReference};
use crate::config::DIAGNOSTICS_EXTENSION;
use crate::types::Result;
use crate::xml::to_xml_string;

/// Read a JSON array of extension references, as stored on a VM role
pub fn parse_reference_list(json: &str) -> Result<Vec<ExtensionReference>> {
    Ok(serde_json::from_str(json)?)
}

/// Extract the diagnostics configuration document from an extension reference
pub fn extract_diagnostics_config(reference: &ExtensionReference) -> Option<&str> {
    reference.parameter(DIAGNOSTICS_EXTENSION.parameter_key)
}

/// Describe every diagnostics extension attached through `references`
///
/// References to other extensions are skipped. A diagnostics reference without
/// a configuration parameter is reported as disabled.
pub fn find_diagnostics_extensions(
    references: &[ExtensionReference],
) -> Result<Vec<DiagnosticsExtensionContext>> {
    let mut contexts = Vec::new();

    for reference in references
        .iter()
        .filter(|r| r.is_extension(&DIAGNOSTICS_EXTENSION))
    {
        let builder = match extract_diagnostics_config(reference) {
            Some(document) => Some(DiagnosticsExtensionBuilder::parse(document)?),
            None => {
                warn!(
                    "Extension reference '{}' has no {} parameter",
                    reference.reference_name, DIAGNOSTICS_EXTENSION.parameter_key
                );
                None
            }
        };

        let diagnostics_configuration = builder
            .as_ref()
            .and_then(DiagnosticsExtensionBuilder::diagnostics_configuration)
            .map(to_xml_string)
            .transpose()?;

        contexts.push(DiagnosticsExtensionContext {
            name: reference.name.clone(),
            publisher: reference.publisher.clone(),
            reference_name: reference.reference_name.clone(),
            version: reference.version.clone(),
            enabled: builder.as_ref().is_some_and(DiagnosticsExtensionBuilder::is_enabled),
            storage_account_name: builder
                .as_ref()
                .and_then(DiagnosticsExtensionBuilder::storage_account_name)
                .unwrap_or_default()
                .to_string(),
            diagnostics_configuration,
        });
    }

    debug!("Found {} diagnostics extension reference(s)", contexts.len());
    Ok(contexts)
}
