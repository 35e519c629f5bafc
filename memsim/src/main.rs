mod heightmap;

use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::time::Instant;
use clap::{Parser, Subcommand};
use log::info;
use memlib::config::HierarchyConfig;
use memlib::io::get_trace_bytes;
use memlib::simulator::Simulator;
use memlib::{AccessWidth, Hierarchy};
use crate::heightmap::HeightMap;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Set-associative memory hierarchy simulator"))]
struct Args {
    /// JSON hierarchy configuration. The built in three level hierarchy is used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Access width in bits, overriding the configuration
    #[arg(short, long, value_parser = parse_width)]
    width: Option<AccessWidth>,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replays a trace file of `R <address>` and `W <address> <value>` lines
    Trace { trace: String },
    /// Generates a diamond-square height map through the hierarchy
    Heightmap {
        #[arg(long, default_value_t = 1000)]
        seed: u64,
        /// The map is 2^size + 1 cells wide and high
        #[arg(long, default_value_t = 9)]
        size: u32,
        #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u64).range(1..))]
        tasks_per_tick: u64,
        /// Print the service breakdown of every tick as a JSON line
        #[arg(long)]
        ticks: bool,
    },
}

fn parse_width(value: &str) -> Result<AccessWidth, String> {
    match value {
        "8" => Ok(AccessWidth::Byte),
        "16" => Ok(AccessWidth::Half),
        "32" => Ok(AccessWidth::Word),
        _ => Err(format!("{value} is not one of 8, 16 or 32")),
    }
}

fn main() -> Result<(), String> {
    env_logger::init();
    let start = Instant::now();
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            let config_file = File::open(path).map_err(|e| format!("Couldn't open the config file at path {path}: {e}"))?;
            serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?
        }
        None => HierarchyConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    let (result, uninitialised_lines) = match &args.command {
        Command::Trace { trace } => {
            let mut simulator = Simulator::new(&config).map_err(|e| format!("Couldn't build the hierarchy: {e}"))?;
            let trace_file = File::open(trace).map_err(|e| format!("Couldn't open the trace file at path {trace}: {e}"))?;
            let trace_bytes = get_trace_bytes(trace_file).map_err(|e| format!("Couldn't read the trace file: {e}"))?;
            let result = simulator.simulate(&trace_bytes).map_err(|e| e.to_string())?;
            if args.performance {
                println!("Simulation time: {}s", simulator.get_execution_time().as_nanos() as f64 / 1e9);
            }
            (result, simulator.get_uninitialised_line_counts())
        }
        Command::Heightmap { seed, size, tasks_per_tick, ticks } => {
            let mut hierarchy = Hierarchy::new(&config).map_err(|e| format!("Couldn't build the hierarchy: {e}"))?;
            let tasks_per_tick = usize::try_from(*tasks_per_tick)
                .ok()
                .and_then(NonZeroUsize::new)
                .ok_or_else(|| format!("Invalid number of tasks per tick {tasks_per_tick}"))?;
            let mut map = HeightMap::new(&mut hierarchy, *size, *seed, tasks_per_tick).map_err(|e| e.to_string())?;
            while !map.is_done() {
                let report = map.tick(&mut hierarchy).map_err(|e| e.to_string())?;
                if *ticks {
                    println!("{}", serde_json::to_string(&report).map_err(|e| format!("Couldn't serialise the tick report {e}"))?);
                }
            }
            // Collected first, the verification reads are not part of the run
            let result = map.result(&hierarchy);
            let uninitialised = hierarchy.levels().iter().map(|level| level.uninitialised_line_count() as u64).collect();
            let mismatches = map.verify(&mut hierarchy).map_err(|e| e.to_string())?;
            if mismatches != 0 {
                return Err(format!("{mismatches} cells of the height map don't match what was written"));
            }
            info!("height map verified");
            (result, uninitialised)
        }
    };
    println!("{}", serde_json::to_string_pretty(&result).map_err(|e| format!("Couldn't serialise the output {e}"))?);
    if args.performance {
        let total_time = start.elapsed();
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        let formatted = config.caches
            .iter()
            .map(|c| c.name.clone())
            .zip(uninitialised_lines.iter())
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Uninitialised cache lines by layer: ({formatted})");
        println!("Total uninitialised cache lines: {}", uninitialised_lines.iter().sum::<u64>())
    }
    Ok(())
}
