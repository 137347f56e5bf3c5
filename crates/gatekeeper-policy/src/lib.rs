//! Argument globbing, shell tokenization, policy evaluation, and rate
//! limiting for the tool-execution gateway.

pub mod glob;
pub mod policy;
pub mod ratelimit;
pub mod registry;
pub mod shellwords;

pub use glob::{compile as compile_glob, matches as glob_matches, GlobError, Matcher};
pub use policy::{evaluate_args, filter_env, validate_tool, Decision};
pub use ratelimit::RateLimiter;
pub use registry::RateLimiterRegistry;
pub use shellwords::{split as split_shellwords, ShellwordsError};
