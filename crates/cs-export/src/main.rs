//! command stream export binary

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use clap::{Args, Parser, Subcommand};

use cmdstream::export::{export_command_stream, ExportOptions};
use engine::Engine;

use std::fs;
use std::path::PathBuf;

macro_rules! error {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit(1);
    }};
}

#[derive(Parser)]
#[command(author, version)]
#[command(about = "chiptune command stream exporter")]
#[command(arg_required_else_help = true)]
struct ArgParser {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a song and write its command stream binary
    Export(ExportArgs),
}

// Export
// ======

#[derive(Args)]
struct ExportArgs {
    #[arg(short = 'o', long, value_name = "FILE", help = "output file")]
    output: PathBuf,

    #[arg(value_name = "JSON_FILE", help = "song json file")]
    song_file: PathBuf,

    #[arg(long, help = "disable speed-dial command aliases")]
    no_speed_dial: bool,

    #[arg(long, help = "disable delay condensation")]
    no_condense_delays: bool,

    #[arg(long, help = "disable sub-block extraction")]
    no_sub_blocks: bool,
}

fn export(args: ExportArgs) {
    let song = match engine::load_song_file(&args.song_file) {
        Ok(s) => s,
        Err(e) => error!("{}", e),
    };

    let mut engine = match Engine::new(song) {
        Ok(e) => e,
        Err(e) => error!("Cannot build engine: {}", e),
    };

    let options = ExportOptions {
        speed_dial: !args.no_speed_dial,
        condense_delays: !args.no_condense_delays,
        extract_blocks: !args.no_sub_blocks,
    };

    let data = match export_command_stream(&mut engine, &options) {
        Ok(d) => d,
        Err(e) => error!("Cannot export command stream: {}", e),
    };

    if let Err(e) = fs::write(&args.output, data) {
        error!("Error writing {}: {}", args.output.display(), e);
    }
}

fn main() {
    let args = ArgParser::parse();

    match args.command {
        Command::Export(e) => export(e),
    }
}
