use alloy_primitives::hex;
use coalesce_abi::selector::Selector;

pub const REQUEST_CONSOLIDATION_SIGNATURE: &str = "requestConsolidation((bytes,bytes)[])";
pub const LINK_LEGACY_VALIDATOR_IDS_SIGNATURE: &str = "linkLegacyValidatorIds(uint256[],bytes[])";
pub const SCHEDULE_BATCH_SIGNATURE: &str =
    "scheduleBatch(address[],uint256[],bytes[],bytes32,bytes32,uint256)";
pub const EXECUTE_BATCH_SIGNATURE: &str =
    "executeBatch(address[],uint256[],bytes[],bytes32,bytes32)";
pub const QUEUE_ETH_WITHDRAWAL_SIGNATURE: &str = "queueETHWithdrawal(address,uint256)";

pub const REQUEST_CONSOLIDATION: Selector = hex!("6691954e");
pub const LINK_LEGACY_VALIDATOR_IDS: Selector = hex!("83294396");
pub const SCHEDULE_BATCH: Selector = hex!("8f2a0bb0");
pub const EXECUTE_BATCH: Selector = hex!("e38335e5");
pub const QUEUE_ETH_WITHDRAWAL: Selector = hex!("03f49be8");
