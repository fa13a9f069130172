#![allow(missing_docs)]

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "hkxdoc", about = "Packfile and tagfile inspection tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Container, header, and section/type table summary.
	Info(cmd::info::Args),
	/// Decode and print the root object graph.
	Dump(cmd::dump::Args),
	/// Inspect a reflection layout file.
	Layout(cmd::layout::Args),
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> hkxdoc::hkx::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Dump(args) => cmd::dump::run(args),
		Commands::Layout(args) => cmd::layout::run(args),
	}
}
