//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; the scheduler that runs
//! `lagtrack run` relies on them.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success (at least one record written, or command completed)  |
//! | 1    | General error (unspecified)                                  |
//! | 2    | CLI usage error (bad args)                                   |
//! | 3    | No feature records acquired from any source                  |
//! | 4    | Invalid or unreadable configuration                          |
//! | 5    | Persisted store could not be written                         |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Every announcement source failed. The store is left untouched so an
/// empty run cannot erase history.
pub const EXIT_NO_DATA: u8 = 3;

/// Config file missing, unparsable, or failing validation.
pub const EXIT_CONFIG_INVALID: u8 = 4;

/// Output document could not be written.
pub const EXIT_STORE_WRITE: u8 = 5;
