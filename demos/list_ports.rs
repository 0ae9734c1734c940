// Serial port listing
//
// Prints every serial port the operating system reports, to find where the
// multimeter cable or the power supply bridge showed up.

use clap::Parser;
use labdrivers::available_ports;

#[derive(Parser)]
#[command(name = "list_ports")]
#[command(version = "1.0")]
#[command(about = "List serial ports usable by the instrument drivers")]
struct Args {
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

    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Found {} serial port(s):", ports.len());
    for port in ports {
        println!("  {:<20} {}", port.port, port.description);
    }
    Ok(())
}
