pub const DEFAULT_ENCODE_BATCH_SIZE: &str = "50";
pub const DEFAULT_OUTPUT_DIR: &str = "consolidation-output";
pub const DEFAULT_VERBOSITY: &str = "3";

pub const CONSOLIDATION_DATA_FILE: &str = "consolidation-data.json";
pub const TARGETS_FILE: &str = "targets.json";
pub const LINK_SCHEDULE_FILE: &str = "link-schedule.json";
pub const LINK_EXECUTE_FILE: &str = "link-execute.json";
pub const SUBMARINE_PLAN_FILE: &str = "submarine-plan.json";
