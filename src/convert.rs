//! JSON to dynamic message conversion using the protobuf JSON mapping.

use crate::error::{Json2PbError, Result};
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Skip JSON keys that do not name a field instead of failing.
    pub ignore_unknown_fields: bool,
}

/// Build a message of type `descriptor` from `json`.
///
/// Field names may use either the lowerCamelCase JSON name or the original
/// schema name. Enums accept names or numbers, bytes are base64, and a field
/// with explicit presence that is set to its zero value stays set.
pub fn json_to_message(
    descriptor: MessageDescriptor,
    json: &str,
    options: ConvertOptions,
) -> Result<DynamicMessage> {
    if json.trim().is_empty() {
        return Err(Json2PbError::EmptyJson);
    }

    let type_name = descriptor.full_name().to_string();
    let parse_error = |source: serde_json::Error| Json2PbError::JsonParse {
        type_name: type_name.clone(),
        source,
    };

    let deserialize_options =
        DeserializeOptions::new().deny_unknown_fields(!options.ignore_unknown_fields);
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let message =
        DynamicMessage::deserialize_with_options(descriptor, &mut deserializer, &deserialize_options)
            .map_err(parse_error)?;
    deserializer.end().map_err(parse_error)?;

    Ok(message)
}
