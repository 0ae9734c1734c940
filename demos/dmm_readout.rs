// Multimeter readout
//
// Connects to a TTi 1604 over its optical cable, optionally selects a
// measurement with key presses and prints the display at a fixed rate.

use clap::Parser;
use labdrivers::{Key, SerialConfig, Tti1604};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dmm_readout")]
#[command(version = "1.0")]
#[command(about = "Continuously print the TTi 1604 display")]
struct Args {
    /// Serial port of the optical cable
    #[arg(short, long, default_value = "/dev/ttyUSB1")]
    port: String,

    /// Measurement to select before reading
    #[arg(short, long, value_parser = ["volt", "millivolt", "amp", "milliamp", "ohm", "hertz"])]
    mode: Option<String>,

    /// Switch to AC coupling
    #[arg(long)]
    ac: bool,

    /// Interval between readings in milliseconds
    #[arg(short, long, default_value_t = 500)]
    interval: u64,

    /// Number of readings, 0 for endless
    #[arg(short, long, default_value_t = 0)]
    count: u64,

    /// Print the decoded display flags as well
    #[arg(long)]
    full_state: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let dmm = Tti1604::connect_new(SerialConfig::new(&args.port))?;
    println!("✓ Connected to multimeter on {}", dmm.serial_port());

    let timeout = Tti1604::DEFAULT_LOCK_TIMEOUT;
    if let Some(mode) = args.mode.as_deref() {
        let key = match mode {
            "volt" => Key::Volt,
            "millivolt" => Key::MilliVolt,
            "amp" => Key::Amp,
            "milliamp" => Key::MilliAmp,
            "ohm" => Key::Ohm,
            _ => Key::Hertz,
        };
        if !dmm.press(key, timeout)? {
            eprintln!("Multimeter did not acknowledge {:?}", key);
        }
    }
    if args.ac && !dmm.press(Key::Ac, timeout)? {
        eprintln!("Multimeter did not acknowledge AC");
    }

    let mut taken = 0u64;
    while args.count == 0 || taken < args.count {
        if args.full_state {
            match dmm.get_complete_state()? {
                Some(state) => println!("{:?}", state),
                None => println!("(incomplete frame)"),
            }
        } else {
            match dmm.get_value() {
                Ok(reading) => println!("{}", reading),
                Err(e) => eprintln!("Error reading value: {}", e),
            }
        }
        taken += 1;
        std::thread::sleep(Duration::from_millis(args.interval));
    }

    dmm.disconnect(timeout)?;
    Ok(())
}
