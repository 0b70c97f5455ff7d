use alloy_primitives::{Address, address};

/// Contract accepting consolidation requests and legacy validator links.
pub const NODES_MANAGER: Address = address!("0x8B71140AD2e5d1E7018d2a7f8a288BD3CD38916F");
/// Safe that proposes timelock batches.
pub const OPERATING_ADMIN: Address = address!("0x2aCA71020De61bb532008049e1Bd41E451aE8AdC");
pub const OPERATING_TIMELOCK: Address = address!("0xcD425f44758a08BaAB3C4908f3e3dE5776e45d7a");

pub const DEFAULT_CHAIN_ID: u64 = 1;
/// Consolidation requests per transaction when encoding an existing plan.
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_CONSOLIDATION_FEE_WEI: u64 = 1;
/// Eight hours.
pub const MIN_DELAY_OPERATING_TIMELOCK: u64 = 28_800;

pub const TX_BUILDER_VERSION: &str = "1.16.5";
pub const LINKING_SALT_TAG: &str = "link-legacy-validators-consolidation";
