//! Headless host for the CHIP-8 core.
//!
//! Loads a program image, runs it at a fixed instruction rate with the timer clock ticking alongside, and prints the
//! final screen once the step limit is reached or the program fails.

use chip8_vm::{HeldKey, Mute, NoInput, Program, RunConfig, System, TimerClock};
use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a CHIP-8 program image headlessly", long_about = None)]
struct Args {
    /// Path to the program image to run
    #[arg(short, long)]
    rom: PathBuf,

    /// Instructions per second; 0 runs as fast as possible
    #[arg(short, long, default_value_t = 700)]
    ips: u32,

    /// Stop after this many instructions. Without it the program runs until it fails
    #[arg(short, long)]
    steps: Option<u64>,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Keypad key (0-15) held down for the whole run
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..16))]
    key: Option<u8>,

    /// Print the program listing before running
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("chip8_vm=info")).init();

    let args = Args::parse();
    let program = Program::load(&args.rom)?;
    if args.list {
        print!("{}", program);
    }

    let mut sys = System::with_config(RunConfig {
        instructions_per_second: args.ips,
        max_steps: args.steps,
        seed: args.seed,
    });
    sys.load(&program)?;

    let clock = TimerClock::start(sys.timers(), Mute)?;
    let result = match args.key {
        Some(key) => sys.run(&mut HeldKey::new(key)),
        None => sys.run(&mut NoInput),
    };
    clock.stop();

    print!("{}", sys.framebuffer);
    match result {
        Ok(steps) => {
            info!("finished after {} steps", steps);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
