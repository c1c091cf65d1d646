//! Command-line interface.

use clap::Parser;

/// Tic-tac-toe against the built-in AI or another player over a direct
/// connection.
#[derive(Debug, Parser)]
#[command(name = "tictactoe_p2p", version, about)]
pub struct Cli {
    /// Display name sent to the remote player (prompted for if omitted).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Address the hosting endpoint binds to.
    #[arg(long, default_value = "127.0.0.1:0")]
    pub bind: String,
}
