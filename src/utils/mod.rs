//! Binary support
//!
//! Logging setup and user-facing error formatting shared by
//! `beetle-server` and `beetle-feed`.
//!
//! ```no_run
//! use beetle_link::utils::{format_user_error, init_logging, LogFormat};
//!
//! # fn run() -> anyhow::Result<()> { Ok(()) }
//! let _guard = init_logging("debug", LogFormat::Compact, None)?;
//! if let Err(e) = run() {
//!     eprintln!("{}", format_user_error(&e));
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod errors;
pub mod logging;

pub use errors::format_user_error;
pub use logging::{default_filter, init_logging, verbosity_level, LogFormat};
