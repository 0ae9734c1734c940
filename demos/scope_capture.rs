// Oscilloscope capture
//
// Transfers one channel from a Tektronix scope over VISA and prints a
// summary of the waveform. Repeated captures reuse the calibration of the
// first one when the booster is on.

use clap::Parser;
use labdrivers::{AcquisitionRequest, TektronixScope};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "scope_capture")]
#[command(version = "1.0")]
#[command(about = "Read a waveform from a Tektronix oscilloscope")]
struct Args {
    /// VISA resource string, e.g. TCPIP::192.168.1.20::INSTR
    address: String,

    /// Channel number or name
    #[arg(short, long, default_value = "1")]
    channel: String,

    /// First sample, 1-based
    #[arg(long)]
    start: Option<i64>,

    /// Last sample
    #[arg(long)]
    stop: Option<i64>,

    /// Number of captures
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: u32,

    /// Skip reconfiguration on repeated captures
    #[arg(short, long)]
    booster: bool,

    /// Print the full table instead of a summary
    #[arg(long)]
    table: bool,

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

    let mut scope = TektronixScope::open(&args.address)?;
    println!("✓ Connected to {}", args.address);
    println!("Channels: {}", scope.number_of_channels()?);

    let mut request = AcquisitionRequest::new()
        .channel(args.channel.as_str())
        .with_time_axis()
        .booster(args.booster);
    if let Some(start) = args.start {
        request = request.data_start(start);
    }
    if let Some(stop) = args.stop {
        request = request.data_stop(stop);
    }

    for i in 0..args.repeat {
        let started = Instant::now();
        let waveform = scope.read_data_one_channel(&request)?;
        println!(
            "Capture {}: {} samples in {:.1} ms",
            i + 1,
            waveform.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        if args.table {
            println!("{}", waveform.to_dataframe()?);
        } else {
            println!("{}", waveform.voltage_summary()?);
        }
    }
    Ok(())
}
