//! Exit-code taxonomy (§6, §7).

/// Process exit status. `Quit` is success; everything else maps to a
/// specific failure category so scripts invoking the CLI can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Quit = 0,
    BadArgs = 1,
    BadConfig = 2,
    Source = 3,
    Target = 4,
    InternalError = 5,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitCode::Quit => "QUIT",
            ExitCode::BadArgs => "BAD_ARGS",
            ExitCode::BadConfig => "BAD_CONFIG",
            ExitCode::Source => "SOURCE",
            ExitCode::Target => "TARGET",
            ExitCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{s}")
    }
}
