//! Command-line surface (A5).

use clap::Parser;

#[derive(Parser)]
#[command(name = "ripd")]
#[command(about = "A RIPv2-style distance-vector routing daemon over loopback UDP")]
#[command(version)]
pub struct Cli {
    /// Path to the router's directive-file configuration
    pub config: String,
}
