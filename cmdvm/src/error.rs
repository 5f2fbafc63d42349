use thiserror::Error;

/// Errors this crate reports through `Result`, as opposed to the
/// replay-time diagnostics (unknown opcode, cycle detected, zero
/// indirect handle) which are logged and swallowed per the spec's
/// "no exceptions" error model.
#[derive(Error, Debug)]
pub enum CmdVmError {
    #[error("one or more driver entry points could not be resolved by the loader")]
    DispatchLoadFailed,

    #[error("block index {0} was never allocated by new_block")]
    InvalidBlockIndex(usize),

    #[error("fragment chain contains a cycle")]
    CycleDetected,
}

pub type Result<T> = std::result::Result<T, CmdVmError>;
