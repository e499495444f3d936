use crate::error::{Json2PbError, Result};
use prost::Message;
use prost_reflect::DynamicMessage;
use std::io::Write;

/// Canonical binary encoding of `message`.
///
/// Map fields are encoded in iteration order, so byte output is not stable
/// across runs for messages carrying more than one map entry.
pub fn encode(message: &DynamicMessage) -> Vec<u8> {
    message.encode_to_vec()
}

/// Write the encoded message to `writer` and flush it.
pub fn emit_to<W: Write>(message: &DynamicMessage, mut writer: W) -> Result<()> {
    let bytes = encode(message);
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| Json2PbError::io("<stdout>", e))?;
    tracing::debug!(bytes = bytes.len(), "message written");
    Ok(())
}
