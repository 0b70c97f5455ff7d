use crate::{
    constants::{GWEI_PER_ETH, MIN_ACTIVATION_BALANCE},
    errors::BalanceError,
    validator::ValidatorRecord,
};

pub type Gwei = u64;

/// Converts an ETH amount to gwei, rounding to the nearest unit. Negative and non-finite
/// amounts have no gwei representation.
pub fn eth_to_gwei(eth: f64) -> Option<Gwei> {
    if !eth.is_finite() || eth < 0.0 {
        return None;
    }
    Some((eth * GWEI_PER_ETH as f64).round() as Gwei)
}

pub fn gwei_to_eth(gwei: Gwei) -> f64 {
    gwei as f64 / GWEI_PER_ETH as f64
}

/// Balance used for planning.
///
/// Ordinary sources without a reported balance are assumed to sit at the activation
/// balance. Existing 0x02 targets must carry a real balance, otherwise their headroom is
/// unknown and the run has to stop.
pub fn resolve_balance(record: &ValidatorRecord) -> Result<Gwei, BalanceError> {
    match record.balance_eth.and_then(eth_to_gwei) {
        Some(balance) => Ok(balance),
        None if record.is_existing_target => Err(BalanceError::MissingBalance {
            pubkey: record.short_pubkey(),
        }),
        None => Ok(MIN_ACTIVATION_BALANCE),
    }
}

/// How many sources of `source_balance` fit on top of `target_balance` without passing
/// `max_target_balance`.
pub fn consolidation_capacity(
    target_balance: Gwei,
    max_target_balance: Gwei,
    source_balance: Gwei,
) -> u64 {
    max_target_balance
        .saturating_sub(target_balance)
        .checked_div(source_balance)
        .unwrap_or(0)
}
