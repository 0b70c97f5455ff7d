pub const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;
pub const COMPOUNDING_WITHDRAWAL_PREFIX: u8 = 0x02;
pub const ETH1_ADDRESS_WITHDRAWAL_PREFIX: u8 = 0x01;

pub const GWEI_PER_ETH: u64 = 1_000_000_000;
pub const MAX_EFFECTIVE_BALANCE_ELECTRA: u64 = 2_048_000_000_000;
pub const MIN_ACTIVATION_BALANCE: u64 = 32_000_000_000;
pub const DEFAULT_MAX_TARGET_BALANCE: u64 = 1_900_000_000_000;
/// Lowest ceiling that still leaves room for a target plus one source.
pub const MIN_MAX_TARGET_BALANCE: u64 = 2 * MIN_ACTIVATION_BALANCE;

/// Withdrawals swept per slot, so also validators advanced by the sweep per slot.
pub const MAX_WITHDRAWALS_PER_PAYLOAD: u64 = 16;
pub const SECONDS_PER_SLOT: u64 = 12;
pub const SECONDS_PER_HOUR: u64 = 3600;
pub const DEFAULT_BUCKET_HOURS: u64 = 6;

pub const PUBKEY_LENGTH: usize = 48;
pub const PUBKEY_HEX_LENGTH: usize = 2 * PUBKEY_LENGTH;
pub const WITHDRAWAL_CREDENTIALS_HEX_LENGTH: usize = 66;
pub const ADDRESS_HEX_LENGTH: usize = 42;
