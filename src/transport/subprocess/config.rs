//! Configuration constants for subprocess transport

use std::time::Duration;

/// Dangerous environment variables that should not be passed to subprocess
///
/// These variables can affect how the subprocess loads and executes code,
/// potentially creating security vulnerabilities.
pub const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

/// Allowed extra CLI flags (allowlist approach)
///
/// Only these flags can be passed through `StreamProcessConfig::extra_args`.
pub const ALLOWED_EXTRA_FLAGS: &[&str] = &[
    "max-turns",
    "append-system-prompt",
    "add-dir",
    "permission-mode",
    "allowedTools",
    "disallowedTools",
];

/// How long to wait for an exit status once stdout or stdin is gone
pub const EXIT_GRACE: Duration = Duration::from_secs(2);

/// How long `close` lets a child exit on its own before killing it
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
