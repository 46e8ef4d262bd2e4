//! Exit codes of the `sitegate` binary.
//! Scripts and CI gates depend on these values.

pub const SUCCESS: i32 = 0;
pub const FAILED: i32 = 1; // Run errored or was cancelled, gate FAIL, diff found differences
pub const INPUT_ERROR: i32 = 2; // Bad arguments, config, or nothing to act on
pub const INFRA_ERROR: i32 = 3; // Store unavailable or audit could not be assembled
pub const BUSY: i32 = 4; // Another run holds the project lock

/// Map a core error onto the binary's exit code table.
pub fn for_error(err: &sitegate_core::PipelineError) -> i32 {
    use sitegate_core::PipelineError;
    match err {
        PipelineError::RunInProgress { .. } => BUSY,
        PipelineError::Store { .. } | PipelineError::Http { .. } => INFRA_ERROR,
        _ => INPUT_ERROR,
    }
}
