//! Error handling utilities

use tracing::error;

/// Report a fatal error and exit with its status code
///
/// Crate [`Error`](crate::error::Error)s decide their own exit code; anything
/// else exits with 1. With `verbose >= 1` the full cause chain is printed.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}

/// Exit status for `error`: 2 for argument errors, otherwise 1
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<crate::error::Error>())
        .map(crate::error::Error::exit_code)
        .unwrap_or(1)
}
