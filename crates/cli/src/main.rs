//! fwfinder
//!
//! Lists FreeWili boards and related devices attached over USB.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use common::setup_logging;
use config::FinderConfig;
use finder::enumerator::save_snapshot;
use finder::{Finder, RawEnumerator, RuleSet, SnapshotEnumerator, UsbEnumerator};
use model::{CompositeDevice, DeviceKind, RawUsbNode};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fwfinder")]
#[command(author, version, about = "Find FreeWili devices attached over USB")]
#[command(long_about = "
Enumerates the USB bus, groups the nodes that belong to one physical board
and prints one entry per board.

EXAMPLES:
    # List FreeWili devices
    fwfinder

    # Include unrecognized devices, as JSON
    fwfinder --all --json

    # Recognize badges from an external rule table
    fwfinder --rules ~/.config/fwfinder/badges.toml

    # Record the bus and replay it elsewhere
    fwfinder --dump bus.json
    fwfinder --replay bus.json --log-level debug

CONFIGURATION:
    fwfinder looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/fwfinder/config.toml
    3. /etc/fwfinder/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Rule table file (overrides the configuration)
    #[arg(short, long, value_name = "PATH")]
    rules: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print the raw USB nodes instead of devices
    #[arg(long)]
    raw: bool,

    /// Write the raw enumeration to a JSON snapshot
    #[arg(long, value_name = "PATH")]
    dump: Option<PathBuf>,

    /// Read USB nodes from a JSON snapshot instead of the bus
    #[arg(long, value_name = "PATH", conflicts_with = "dump")]
    replay: Option<PathBuf>,

    /// Only list devices of this kind (e.g. FreeWili, UF2)
    #[arg(short, long, value_name = "KIND", value_parser = parse_kind)]
    kind: Option<DeviceKind>,

    /// Also list devices of unknown kind
    #[arg(short, long)]
    all: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_kind(s: &str) -> std::result::Result<DeviceKind, String> {
    s.parse::<DeviceKind>().map_err(|e| {
        let ids: Vec<_> = DeviceKind::ALL.iter().map(|k| k.id()).collect();
        format!("{}, expected one of: {}", e, ids.join(", "))
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = FinderConfig::default();
        let path = FinderConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    // A broken default file is reported once logging is up
    let (config, fallback) = match &args.config {
        Some(path) => (
            FinderConfig::load(Some(path.clone())).context("Failed to load configuration")?,
            None,
        ),
        None => match FinderConfig::load_default() {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (FinderConfig::default(), Some(e)),
        },
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.finder.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;
    debug!("fwfinder v{}, log level {}", env!("CARGO_PKG_VERSION"), log_level);
    if let Some(e) = fallback {
        warn!("Failed to load config: {}, using defaults", e);
    }

    let enumerator: Box<dyn RawEnumerator> = match &args.replay {
        Some(path) => {
            info!("Replaying snapshot {}", path.display());
            Box::new(SnapshotEnumerator::from_path(path))
        }
        None => Box::new(UsbEnumerator::with_timeout(config.descriptor_timeout())),
    };

    let mut finder = Finder::new(enumerator).with_grouping(config.grouping());
    if let Some(path) = args.rules.clone().or_else(|| config.rules_path()) {
        let rules = RuleSet::load(&path)
            .with_context(|| format!("Failed to load rule table: {}", path.display()))?;
        finder = finder.with_rules(rules)?;
    }

    let raw = finder
        .enumerator()
        .enumerate()
        .context("USB enumeration failed")?;

    if let Some(path) = &args.dump {
        save_snapshot(&raw, path)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        info!("Wrote {} USB nodes to {}", raw.len(), path.display());
    }

    if args.raw {
        return print_raw(&raw, args.json);
    }

    let devices: Vec<CompositeDevice> = finder
        .discover(raw)
        .into_iter()
        .filter(|device| match args.kind {
            Some(kind) => device.kind() == kind,
            None => args.all || device.kind() != DeviceKind::Unknown,
        })
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&devices).context("Failed to encode devices")?;
        println!("{}", json);
    } else {
        print_devices(&devices);
    }

    Ok(())
}

fn print_raw(nodes: &[RawUsbNode], json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(nodes).context("Failed to encode USB nodes")?;
        println!("{}", json);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB node(s):\n", nodes.len());
    for node in nodes {
        println!(
            "  {:04x}:{:04x} {:<12} {} {}",
            node.vendor_id,
            node.product_id,
            display_or(&node.location, "?"),
            node.manufacturer,
            node.product
        );
        if !node.serial.is_empty() {
            println!("      Serial: {}", node.serial);
        }
        println!(
            "      Class {:#04x}, interfaces {:02x?}",
            node.device_class, node.interface_classes
        );
        if let Some(port) = &node.port {
            println!("      Port: {}", port);
        }
        for path in &node.paths {
            println!("      Mounted at: {}", path);
        }
        println!("      {}", node.raw);
    }
    Ok(())
}

fn print_devices(devices: &[CompositeDevice]) {
    if devices.is_empty() {
        println!("No devices found.");
        return;
    }

    println!("Found {} device(s):\n", devices.len());
    for (i, device) in devices.iter().enumerate() {
        println!(
            "  [{}] {} - {} {}",
            i + 1,
            device.kind(),
            display_or(device.name(), "Unknown Product"),
            device.serial()
        );
        if let Some(id) = device.unique_id() {
            println!("      Unique ID: {:#018x}", id);
        }
        for node in device.usb_devices() {
            println!(
                "      {:<13} {:04x}:{:04x} {:<12} {} {}",
                node.kind().name(),
                node.vid(),
                node.pid(),
                display_or(node.reported_location(), "?"),
                node.name(),
                node.serial()
            );
            if let Some(port) = node.serial_port() {
                println!("          Port: {}", port);
            }
            for path in node.paths() {
                println!("          Mounted at: {}", path);
            }
        }
        println!();
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("FreeWili"), Ok(DeviceKind::FreeWili));
        assert_eq!(parse_kind("uf2"), Ok(DeviceKind::Uf2));
        assert_eq!(parse_kind("defcon2024badge"), Ok(DeviceKind::Defcon2024Badge));
        assert!(parse_kind("toaster").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "fwfinder",
            "--json",
            "--kind",
            "UF2",
            "--replay",
            "bus.json",
        ])
        .unwrap();
        assert!(args.json);
        assert_eq!(args.kind, Some(DeviceKind::Uf2));
        assert_eq!(args.replay, Some(PathBuf::from("bus.json")));
        assert!(!args.all);
    }

    #[test]
    fn test_dump_conflicts_with_replay() {
        let result =
            Args::try_parse_from(["fwfinder", "--dump", "a.json", "--replay", "b.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_or() {
        assert_eq!(display_or("", "?"), "?");
        assert_eq!(display_or("1-2", "?"), "1-2");
    }
}
