//! Token-level style sniffer executable.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

mod cli;
mod sniff;

// Exercised only by the integration tests under `tests/`.
#[cfg(test)]
use assert_cmd as _;
#[cfg(test)]
use predicates as _;

mod prelude {
	pub use color_eyre::{Result, eyre};
}

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

fn main() -> ExitCode {
	if let Err(err) = color_eyre::install() {
		eprintln!("Failed to initialize error reporter: {err}.");

		return ExitCode::FAILURE;
	}

	match Cli::parse().run() {
		Ok(code) => code,
		Err(err) => {
			eprintln!("{err:?}");

			ExitCode::FAILURE
		},
	}
}
