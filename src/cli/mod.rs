//! # CLI Module
//!
//! Command-line entry points for the `trellis` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Run the demo application on the blocking HTTP host:
//!
//! ```bash
//! trellis serve --config trellis.yaml --addr 0.0.0.0:8080 --static-dir ./public
//! ```
//!
//! Configuration is layered: file, then `TRELLIS_*` environment variables,
//! then command-line flags. `SIGINT`/`SIGTERM` stop the server after in-flight
//! requests finish.
//!
//! ### `hash`
//!
//! Print the keyed hash of a string, the same primitive that signs session tokens:
//!
//! ```bash
//! trellis hash --key s3cret --variant sha512 "some input"
//! ```
//!
//! ### `routes`
//!
//! Print the demo route table.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use trellis::cli::{run, Cli};
//! use clap::Parser;
//!
//! run(Cli::parse())?;
//! ```

mod commands;
mod demo;


pub use commands::{run, run_cli, Cli, Commands};
pub use demo::demo_application;
