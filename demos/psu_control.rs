// Power supply control
//
// Sets voltage and current limit on a Delta supply through its serial
// bridge, switches the output on and reads the values back.

use clap::{Parser, Subcommand};
use labdrivers::{DeltaPsu, SerialConfig};

#[derive(Parser)]
#[command(name = "psu_control")]
#[command(version = "1.0")]
#[command(about = "Control a Delta power supply over its serial bridge")]
struct Args {
    /// Serial port of the bridge
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Program the output and switch it on
    Set {
        /// Output voltage in volts
        voltage: f64,
        /// Current limit in amperes
        current: f64,
    },
    /// Switch the output off
    Off,
    /// Print the programmed voltage and current
    Show,
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

    let psu = DeltaPsu::connect_new(SerialConfig::psu(&args.port))?;
    println!("✓ Connected to power supply bridge on {}", psu.serial_port());

    match args.command {
        Command::Set { voltage, current } => {
            psu.set_voltage(voltage)?;
            psu.set_current(current)?;
            psu.set_runmode()?;
            println!("Output on");
        }
        Command::Off => {
            psu.set_stopmode()?;
            println!("Output off");
        }
        Command::Show => {}
    }

    println!("Voltage: {:.3} V", psu.get_voltage()?);
    println!("Current: {:.3} A", psu.get_current()?);

    psu.disconnect()?;
    Ok(())
}
