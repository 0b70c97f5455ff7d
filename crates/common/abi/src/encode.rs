//! Head/tail encoders for the handful of contract argument shapes the planner emits.
//!
//! Dynamic values are laid out the standard way: the head holds either the value itself
//! (static types) or an offset into the tail, and every offset is relative to the first
//! byte of the enclosing head.

use alloy_primitives::{Address, U256};

use crate::errors::EncodingError;

pub const ADDRESS_LENGTH: usize = 20;
pub const WORD_SIZE: usize = 32;

pub type Word = [u8; WORD_SIZE];

/// A single top-level argument, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Static(Word),
    Dynamic(Vec<u8>),
}

pub fn encode_uint256(value: U256) -> Word {
    value.to_be_bytes::<WORD_SIZE>()
}

pub fn encode_u64(value: u64) -> Word {
    encode_uint256(U256::from(value))
}

pub fn encode_usize(value: usize) -> Word {
    encode_uint256(U256::from(value))
}

/// Left-pads the 20 address bytes into a word.
pub fn encode_address(address: Address) -> Word {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - ADDRESS_LENGTH..].copy_from_slice(address.as_slice());
    word
}

/// Encodes a `bytes32` value. Shorter input is right-padded with zeros, longer input is
/// rejected rather than silently truncated.
pub fn encode_bytes32(data: &[u8]) -> Result<Word, EncodingError> {
    if data.len() > WORD_SIZE {
        return Err(EncodingError::ValueTooWide {
            len: data.len(),
            width: WORD_SIZE,
        });
    }
    let mut word = [0u8; WORD_SIZE];
    word[..data.len()].copy_from_slice(data);
    Ok(word)
}

/// Number of zero bytes needed to bring `len` up to a word boundary.
pub fn padding_for(len: usize) -> usize {
    (WORD_SIZE - len % WORD_SIZE) % WORD_SIZE
}

/// Length word followed by the data, zero-padded to a word boundary.
pub fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(WORD_SIZE + data.len() + padding_for(data.len()));
    encoded.extend_from_slice(&encode_usize(data.len()));
    encoded.extend_from_slice(data);
    encoded.resize(encoded.len() + padding_for(data.len()), 0);
    encoded
}

/// Array of statically sized elements: length word, then one word per element.
pub fn encode_static_array<T>(items: &[T], encode_element: impl Fn(&T) -> Word) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(WORD_SIZE * (items.len() + 1));
    encoded.extend_from_slice(&encode_usize(items.len()));
    for item in items {
        encoded.extend_from_slice(&encode_element(item));
    }
    encoded
}

/// Array of dynamically sized elements: length word, one offset word per element, then
/// each element's own encoding. Offsets are measured from the first offset word, i.e.
/// the start of the array's data section after the length.
pub fn encode_array<T>(items: &[T], encode_element: impl Fn(&T) -> Vec<u8>) -> Vec<u8> {
    let tails = items.iter().map(encode_element).collect::<Vec<_>>();

    let mut encoded = Vec::with_capacity(
        WORD_SIZE * (items.len() + 1) + tails.iter().map(Vec::len).sum::<usize>(),
    );
    encoded.extend_from_slice(&encode_usize(items.len()));

    let mut offset = items.len() * WORD_SIZE;
    for tail in &tails {
        encoded.extend_from_slice(&encode_usize(offset));
        offset += tail.len();
    }
    for tail in tails {
        encoded.extend_from_slice(&tail);
    }
    encoded
}

pub fn encode_uint256_array(values: &[U256]) -> Vec<u8> {
    encode_static_array(values, |value| encode_uint256(*value))
}

pub fn encode_address_array(addresses: &[Address]) -> Vec<u8> {
    encode_static_array(addresses, |address| encode_address(*address))
}

pub fn encode_bytes_array<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    encode_array(items, |item| encode_dynamic_bytes(item.as_ref()))
}

/// Encodes a tuple made only of dynamic members: one offset word per member followed by
/// the members' encodings. Offsets are relative to the start of the tuple.
pub fn encode_dynamic_tuple(members: &[Vec<u8>]) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut offset = members.len() * WORD_SIZE;
    for member in members {
        encoded.extend_from_slice(&encode_usize(offset));
        offset += member.len();
    }
    for member in members {
        encoded.extend_from_slice(member);
    }
    encoded
}

/// `(bytes srcPubkey, bytes targetPubkey)[]`.
pub fn encode_consolidation_requests<S: AsRef<[u8]>, T: AsRef<[u8]>>(
    requests: &[(S, T)],
) -> Vec<u8> {
    encode_array(requests, |(source, target)| {
        encode_dynamic_tuple(&[
            encode_dynamic_bytes(source.as_ref()),
            encode_dynamic_bytes(target.as_ref()),
        ])
    })
}

/// Top-level argument list: static values inline, dynamic values referenced by an offset
/// measured from the first argument word.
pub fn encode_arguments(arguments: &[AbiValue]) -> Vec<u8> {
    let mut head = Vec::with_capacity(arguments.len() * WORD_SIZE);
    let mut tail = Vec::new();
    let head_size = arguments.len() * WORD_SIZE;

    for argument in arguments {
        match argument {
            AbiValue::Static(word) => head.extend_from_slice(word),
            AbiValue::Dynamic(encoded) => {
                head.extend_from_slice(&encode_usize(head_size + tail.len()));
                tail.extend_from_slice(encoded);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], arguments: &[AbiValue]) -> Vec<u8> {
    let mut calldata = selector.to_vec();
    calldata.extend_from_slice(&encode_arguments(arguments));
    calldata
}
