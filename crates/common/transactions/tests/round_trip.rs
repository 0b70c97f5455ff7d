use alloy_primitives::{Address, U256};
use coalesce_abi::{AbiDecoder, decode_hex};
use coalesce_consensus::{
    credentials::format_full_credentials, sweep::SweepState, validator::ValidatorRecord,
};
use coalesce_planner::{config::PlannerConfig, output::ConsolidationData, plan::Planner};
use coalesce_transactions::{
    calldata::normalize_pubkey,
    consolidation::consolidation_transactions,
    constants::{NODES_MANAGER, OPERATING_ADMIN},
    linking::{collect_linking_candidates, linking_transactions},
    selectors,
};

fn consolidation_data() -> anyhow::Result<ConsolidationData> {
    let records = (0..130u64)
        .map(|id| {
            let pod = Address::with_last_byte(1 + (id % 2) as u8);
            ValidatorRecord::new(id, format!("0x{:096x}", 0xbeef_0000 + id), format_full_credentials(&pod, 1))
                .with_beacon_index(id * 1_000)
                .with_balance_eth(32.0)
        })
        .collect::<Vec<_>>();
    let plan = Planner::new(PlannerConfig::default())?.plan(records, &SweepState::new(0, 200_000)?)?;

    // The encoder reads the document back from disk, so go through JSON.
    let json = serde_json::to_string_pretty(&ConsolidationData::from_plan(&plan))?;
    Ok(serde_json::from_str(&json)?)
}

#[test]
fn test_consolidation_calldata_recovers_plan() -> anyhow::Result<()> {
    let data = consolidation_data()?;
    let transactions = consolidation_transactions(&data, NODES_MANAGER, 1, 50)?;

    let mut decoded = Vec::new();
    let mut total_value = 0u64;
    for transaction in &transactions {
        assert_eq!(transaction.transaction.to, NODES_MANAGER.to_checksum(None));
        total_value += transaction.transaction.value.parse::<u64>()?;

        let calldata = decode_hex(&transaction.transaction.data)?;
        let decoder = AbiDecoder::from_calldata(&calldata, selectors::REQUEST_CONSOLIDATION)?;
        let requests = decoder.consolidation_requests(decoder.argument(0)?)?;
        assert!(requests.len() <= 50);
        assert_eq!(requests.len(), transaction.num_validators);
        decoded.extend(requests);
    }

    let expected = data
        .consolidations
        .iter()
        .flat_map(|entry| {
            let target = entry.target.pubkey.clone();
            entry
                .sources
                .iter()
                .map(move |source| (source.pubkey.clone(), target.clone()))
        })
        .map(|(source, target)| -> anyhow::Result<_> {
            Ok((normalize_pubkey(&source)?.to_vec(), normalize_pubkey(&target)?.to_vec()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(decoded, expected);
    assert_eq!(total_value, expected.len() as u64);
    Ok(())
}

#[test]
fn test_linking_calldata_round_trip() -> anyhow::Result<()> {
    let data = consolidation_data()?;
    let candidates = collect_linking_candidates(&data, 50)?;
    for entry in &data.consolidations {
        assert!(candidates.ids.contains(&entry.target.id));
    }

    let transactions = linking_transactions(&candidates, 1, OPERATING_ADMIN)
        .ok_or(anyhow::anyhow!("no validators to link"))?;
    let execute = decode_hex(&transactions.execute.transactions[0].data)?;
    let decoder = AbiDecoder::from_calldata(&execute, selectors::EXECUTE_BATCH)?;
    let payloads = decoder.bytes_array(decoder.argument(2)?)?;
    assert_eq!(decoder.uint256_array(decoder.argument(1)?)?, vec![U256::ZERO]);

    let link = AbiDecoder::from_calldata(&payloads[0], selectors::LINK_LEGACY_VALIDATOR_IDS)?;
    let ids = link
        .uint256_array(link.argument(0)?)?
        .into_iter()
        .map(|id| id.to::<u64>())
        .collect::<Vec<_>>();
    assert_eq!(ids, candidates.ids);
    let pubkeys = link.bytes_array(link.argument(1)?)?;
    assert_eq!(
        pubkeys,
        candidates
            .pubkeys
            .iter()
            .map(|pubkey| pubkey.to_vec())
            .collect::<Vec<_>>()
    );
    Ok(())
}
