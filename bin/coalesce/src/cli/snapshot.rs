use std::{fs::read_to_string, path::Path};

use anyhow::{anyhow, bail};
use coalesce_consensus::{sweep::SweepState, validator::ValidatorRecord};
use serde::{Deserialize, Serialize};

/// Validators exported from the operator's registry, together with the beacon chain's sweep
/// cursor at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub sweep_index: Option<u64>,
    #[serde(default)]
    pub total_validators: Option<u64>,
    pub validators: Vec<ValidatorRecord>,
}

impl Snapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = read_to_string(path)
            .map_err(|err| anyhow!("Unable to read snapshot {}: {err:?}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|err| anyhow!("Invalid snapshot {}: {err}", path.display()))
    }

    pub fn sweep_state(&self) -> anyhow::Result<SweepState> {
        let (Some(sweep_index), Some(total_validators)) = (self.sweep_index, self.total_validators)
        else {
            bail!("Snapshot needs sweep_index and total_validators to plan around the sweep");
        };
        Ok(SweepState::new(sweep_index, total_validators)?)
    }
}
