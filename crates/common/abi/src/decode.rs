use alloy_primitives::{Address, U256, hex};

use crate::{
    encode::{ADDRESS_LENGTH, WORD_SIZE, Word, padding_for},
    errors::EncodingError,
    selector::Selector,
};

/// Bounds-checked reader over an encoded argument section.
///
/// Every `offset` passed in is absolute within the wrapped slice; `base` arguments
/// name the head an embedded offset is relative to.
#[derive(Debug, Clone, Copy)]
pub struct AbiDecoder<'a> {
    data: &'a [u8],
}

impl<'a> AbiDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Strips and checks the 4-byte selector of a full calldata blob.
    pub fn from_calldata(calldata: &'a [u8], expected: Selector) -> Result<Self, EncodingError> {
        let found = calldata.get(..4).ok_or(EncodingError::OutOfBounds {
            offset: 0,
            needed: 4,
            available: calldata.len(),
        })?;
        if found != expected {
            return Err(EncodingError::SelectorMismatch {
                expected: hex::encode_prefixed(expected),
                found: hex::encode_prefixed(found),
            });
        }
        Ok(Self::new(&calldata[4..]))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice(&self, offset: usize, needed: usize) -> Result<&'a [u8], EncodingError> {
        offset
            .checked_add(needed)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(EncodingError::OutOfBounds {
                offset,
                needed,
                available: self.data.len(),
            })
    }

    /// `offset` moved forward by `words` words and `bytes` bytes.
    fn advance(offset: usize, words: usize, bytes: usize) -> Result<usize, EncodingError> {
        words
            .checked_mul(WORD_SIZE)
            .and_then(|skip| skip.checked_add(bytes))
            .and_then(|skip| offset.checked_add(skip))
            .ok_or(EncodingError::Overflow(offset))
    }

    pub fn word(&self, offset: usize) -> Result<Word, EncodingError> {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(self.slice(offset, WORD_SIZE)?);
        Ok(word)
    }

    pub fn uint256(&self, offset: usize) -> Result<U256, EncodingError> {
        Ok(U256::from_be_bytes(self.word(offset)?))
    }

    /// Reads a word that must fit in a `usize` (lengths and offsets).
    pub fn usize(&self, offset: usize) -> Result<usize, EncodingError> {
        let word = self.word(offset)?;
        if word[..WORD_SIZE - 8].iter().any(|byte| *byte != 0) {
            return Err(EncodingError::Overflow(offset));
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&word[WORD_SIZE - 8..]);
        usize::try_from(u64::from_be_bytes(low)).map_err(|_| EncodingError::Overflow(offset))
    }

    pub fn address(&self, offset: usize) -> Result<Address, EncodingError> {
        let word = self.word(offset)?;
        Ok(Address::from_slice(&word[WORD_SIZE - ADDRESS_LENGTH..]))
    }

    /// Follows the offset stored at `head_offset`, relative to `base`.
    pub fn follow(&self, base: usize, head_offset: usize) -> Result<usize, EncodingError> {
        let relative = self.usize(head_offset)?;
        base.checked_add(relative)
            .ok_or(EncodingError::Overflow(head_offset))
    }

    /// Reads a length-prefixed byte string starting at `offset`.
    pub fn dynamic_bytes(&self, offset: usize) -> Result<Vec<u8>, EncodingError> {
        let len = self.usize(offset)?;
        let data = self.slice(Self::advance(offset, 1, 0)?, len)?;
        self.slice(Self::advance(offset, 1, len)?, padding_for(len))?;
        Ok(data.to_vec())
    }

    pub fn uint256_array(&self, offset: usize) -> Result<Vec<U256>, EncodingError> {
        let len = self.usize(offset)?;
        (0..len)
            .map(|index| self.uint256(Self::advance(offset, index + 1, 0)?))
            .collect()
    }

    pub fn address_array(&self, offset: usize) -> Result<Vec<Address>, EncodingError> {
        let len = self.usize(offset)?;
        (0..len)
            .map(|index| self.address(Self::advance(offset, index + 1, 0)?))
            .collect()
    }

    /// Walks a dynamic array, yielding the absolute start of each element.
    pub fn array_elements(&self, offset: usize) -> Result<Vec<usize>, EncodingError> {
        let len = self.usize(offset)?;
        let base = Self::advance(offset, 1, 0)?;
        (0..len)
            .map(|index| self.follow(base, Self::advance(base, index, 0)?))
            .collect()
    }

    pub fn bytes_array(&self, offset: usize) -> Result<Vec<Vec<u8>>, EncodingError> {
        self.array_elements(offset)?
            .into_iter()
            .map(|element| self.dynamic_bytes(element))
            .collect()
    }

    /// Decodes a `(bytes,bytes)[]` array into `(source, target)` pairs.
    pub fn consolidation_requests(
        &self,
        offset: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EncodingError> {
        self.array_elements(offset)?
            .into_iter()
            .map(|tuple| {
                let source = self.dynamic_bytes(self.follow(tuple, tuple)?)?;
                let target = self.dynamic_bytes(self.follow(tuple, Self::advance(tuple, 1, 0)?)?)?;
                Ok((source, target))
            })
            .collect()
    }

    /// Resolves the `index`th top-level argument as a dynamic value and returns its start.
    pub fn argument(&self, index: usize) -> Result<usize, EncodingError> {
        self.follow(0, Self::advance(0, index, 0)?)
    }
}
