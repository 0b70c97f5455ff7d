use alloy_primitives::keccak256;

pub type Selector = [u8; 4];

/// First four bytes of the keccak-256 hash of a canonical function signature.
pub fn function_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
