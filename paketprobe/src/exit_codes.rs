#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run completed or aborted without meeting its pass criteria
    /// (server unreachable, too few successful requests, failed CRUD steps, interrupt).
    Failed = 1,

    /// Invalid CLI input (bad flags, durations, ports or URLs).
    InvalidInput = 2,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_passed(passed: bool) -> Self {
        if passed { Self::Success } else { Self::Failed }
    }
}
