// src/cert/codec.rs
use crate::error::{Error, Result};
use pem::{EncodeConfig, LineEnding, Pem};

pub fn encode(block_type: &str, der: &[u8]) -> String {
    let block = Pem::new(block_type, der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Returns the type tag and DER contents of the first PEM block in `text`.
pub fn decode(text: &[u8]) -> Result<(String, Vec<u8>)> {
    let block = pem::parse(text).map_err(|e| Error::MalformedInput(e.to_string()))?;
    Ok((block.tag().to_string(), block.contents().to_vec()))
}

/// Like [`decode`], but also insists on the block type.
pub fn decode_expecting(text: &[u8], block_type: &str) -> Result<Vec<u8>> {
    let (tag, der) = decode(text)?;
    if tag != block_type {
        return Err(Error::MalformedInput(format!(
            "expected a {} block, found {}",
            block_type, tag
        )));
    }
    Ok(der)
}
