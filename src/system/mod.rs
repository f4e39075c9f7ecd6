//! # System Interaction Layer
//!
//! Everything that reaches outside the process: the installed host, external
//! programs and the terminal.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external client programs (such as the database
//!   client) with inherited standard streams.
//! - **`fetchers`**: looks up host users by ID, login or email.
//! - **`host`**: the [`host::HostEnvironment`] boundary and the filesystem-backed
//!   [`host::FsHost`].
//! - **`output`**: the [`output::Reporter`] used for every user-facing message.

pub mod executor;
pub mod fetchers;
pub mod host;
pub mod output;
