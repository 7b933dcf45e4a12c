//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success, no conflicts                          |
//! | 1    | Crosscheck completed with conflicts            |
//! | 2    | CLI usage error (clap-reported)                |
//! | 3    | I/O error (unreadable input, unwritable output)|
//! | 4    | Input parse error                              |
//! | 5    | Invalid engine config                          |
//! | 6    | Internal invariant violation (engine bug)      |

/// Success - run completed and found no conflicts.
pub const EXIT_SUCCESS: u8 = 0;

/// The run completed but produced Conflict classifications.
/// Like `diff(1)`, a nonzero code here means "review needed", not "crashed".
pub const EXIT_CONFLICTS: u8 = 1;

/// Usage error - bad arguments. Emitted by clap itself.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// I/O error reading inputs or writing reports.
pub const EXIT_IO_ERROR: u8 = 3;

/// Input file did not parse (missing header row, malformed CSV).
pub const EXIT_PARSE_ERROR: u8 = 4;

/// Engine config failed to parse or validate. Fatal before any record is
/// processed.
pub const EXIT_CONFIG_ERROR: u8 = 5;

/// The engine detected an output invariant violation. Always a bug.
pub const EXIT_INTERNAL: u8 = 6;
