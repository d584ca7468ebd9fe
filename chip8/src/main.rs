use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use chip8vm::Config;

mod audio;
mod display;
mod keymap;
mod run;

/// CHIP-8 interpreter
///
/// Backspace reboots the ROM, Escape or closing the window quits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Filepath to Chip-8 ROM file that will be executed
    #[arg(index = 1)]
    rom: PathBuf,

    /// Display scaling factor
    #[arg(short, long, default_value_t = 16)]
    scale: u32,

    /// Microseconds between two instructions
    #[arg(long, default_value_t = 1200)]
    cycle_us: u64,

    /// PRNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the window open after a fatal error so the ROM can be rebooted
    #[arg(long)]
    reboot_on_fault: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.scale == 0 || args.scale > 100 {
        anyhow::bail!("display scaling factor must be between [1-100]");
    }

    let config = Config {
        cycle_time: Duration::from_micros(args.cycle_us),
        reboot_on_fault: args.reboot_on_fault,
    };

    run::run(&args.rom, args.scale, args.seed, &config)
}
