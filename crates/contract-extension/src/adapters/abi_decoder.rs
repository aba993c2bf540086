//! # ABI Event Decoder
//!
//! Decodes the non-indexed arguments of
//! `NewContractExtensionContractCreated(address,string,address)`.
//!
//! Layout: three head words (address, offset of the string, address),
//! then the string tail as a length word followed by the padded bytes.

use shared_types::Address;

use crate::domain::{ExtensionError, ExtensionResult, NewExtensionEvent};
use crate::ports::ExtensionEventDecoder;

const WORD: usize = 32;

/// Decoder for ABI-encoded creation events.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbiEventDecoder;

impl AbiEventDecoder {
    /// Create a decoder.
    pub fn new() -> Self {
        Self
    }

    /// ABI-encode creation event arguments the way the management contract
    /// emits them.
    pub fn encode(event: &NewExtensionEvent) -> Vec<u8> {
        let key = event.recipient_ptm_key.as_bytes();
        let padded = key.len().div_ceil(WORD) * WORD;

        let mut out = Vec::with_capacity(WORD * 4 + padded);
        out.extend_from_slice(&address_word(&event.to_extend));
        out.extend_from_slice(&usize_word(WORD * 3));
        out.extend_from_slice(&address_word(&event.recipient_address));
        out.extend_from_slice(&usize_word(key.len()));
        out.extend_from_slice(key);
        out.resize(WORD * 4 + padded, 0);
        out
    }
}

impl ExtensionEventDecoder for AbiEventDecoder {
    fn decode_creation_event(&self, data: &[u8]) -> ExtensionResult<NewExtensionEvent> {
        let to_extend = read_address(data, 0)?;
        let offset = read_usize(data, WORD)?;
        let recipient_address = read_address(data, WORD * 2)?;

        let len = read_usize(data, offset)?;
        let start = offset + WORD;
        let bytes = start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .ok_or_else(|| decode_error(format!("string of {len} bytes overruns data")))?;
        let recipient_ptm_key = String::from_utf8(bytes.to_vec())
            .map_err(|e| decode_error(format!("recipient key is not UTF-8: {e}")))?;

        Ok(NewExtensionEvent {
            to_extend,
            recipient_ptm_key,
            recipient_address,
        })
    }
}

fn decode_error(reason: String) -> ExtensionError {
    ExtensionError::Decode(reason)
}

fn word(data: &[u8], at: usize) -> ExtensionResult<&[u8]> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| decode_error(format!("no 32-byte word at offset {at} of {}", data.len())))
}

fn read_address(data: &[u8], at: usize) -> ExtensionResult<Address> {
    let word = word(data, at)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(decode_error(format!("dirty address padding at offset {at}")));
    }
    Address::from_slice(&word[12..]).map_err(|e| decode_error(e.to_string()))
}

fn read_usize(data: &[u8], at: usize) -> ExtensionResult<usize> {
    let word = word(data, at)?;
    let (high, low) = word.split_at(WORD - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(decode_error(format!("integer at offset {at} out of range")));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| decode_error(format!("integer at offset {at} out of range")))
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(key: &str) -> NewExtensionEvent {
        NewExtensionEvent {
            to_extend: Address([0xaa; 20]),
            recipient_ptm_key: key.to_string(),
            recipient_address: Address([0xbb; 20]),
        }
    }

    #[test]
    fn test_decode_encoded_event() {
        let original = event("BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=");
        let data = AbiEventDecoder::encode(&original);

        assert_eq!(data.len() % WORD, 0);
        assert_eq!(AbiEventDecoder.decode_creation_event(&data).unwrap(), original);
    }

    #[test]
    fn test_decode_empty_key() {
        let data = AbiEventDecoder::encode(&event(""));
        assert_eq!(data.len(), WORD * 4);
        assert_eq!(
            AbiEventDecoder.decode_creation_event(&data).unwrap().recipient_ptm_key,
            ""
        );
    }

    #[test]
    fn test_short_data_rejected() {
        let data = AbiEventDecoder::encode(&event("key"));
        let result = AbiEventDecoder.decode_creation_event(&data[..WORD * 2]);
        assert!(matches!(result, Err(ExtensionError::Decode(_))));
    }

    #[test]
    fn test_truncated_string_rejected() {
        let mut data = AbiEventDecoder::encode(&event("key"));
        data[WORD * 4 - 1] = 200;
        assert!(matches!(
            AbiEventDecoder.decode_creation_event(&data),
            Err(ExtensionError::Decode(_))
        ));
    }

    #[test]
    fn test_dirty_address_padding_rejected() {
        let mut data = AbiEventDecoder::encode(&event("key"));
        data[0] = 1;
        assert!(AbiEventDecoder.decode_creation_event(&data).is_err());
    }
}
