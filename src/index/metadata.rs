//! Metadata extraction from form documents.

use crate::error::FormError;
use crate::index::models::FormMetadata;

/// Name of the element holding a form's descriptive fields.
const METADATA_ELEMENT: &str = "metadata";

/// Pulls the embedded metadata block out of a form document.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Parse `raw` as XML and extract the fixed metadata field set.
    ///
    /// The metadata block is found structurally at any depth; the first one
    /// in document order wins. Repeated fields keep their first value, and a
    /// field wrapping nested markup contributes only its own text.
    pub fn extract(raw: &[u8]) -> Result<FormMetadata, FormError> {
        let text = std::str::from_utf8(raw).map_err(|e| FormError::Parse(e.to_string()))?;
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| FormError::Parse(e.to_string()))?;

        let block = document
            .descendants()
            .find(|node| node.is_element() && node.tag_name().name() == METADATA_ELEMENT)
            .ok_or(FormError::MetadataMissing)?;

        let mut metadata = FormMetadata::default();
        for field in block.children().filter(|node| node.is_element()) {
            let Some(slot) = metadata.slot_mut(field.tag_name().name()) else {
                continue;
            };
            if slot.is_none() {
                *slot = scalar_value(field);
            }
        }

        Ok(metadata)
    }
}

/// Text carried directly by `node`, exactly as written.
///
/// Returns `None` for an element that holds only nested elements (and
/// whitespace between them), since it has no scalar value.
fn scalar_value(node: roxmltree::Node<'_, '_>) -> Option<String> {
    let mut text = String::new();
    let mut has_elements = false;
    for child in node.children() {
        if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        } else if child.is_element() {
            has_elements = true;
        }
    }

    if has_elements && text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
