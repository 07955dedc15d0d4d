mod encode_pass;
mod fetch;
mod resolve;
mod stat;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    about = "Operator tool for the SQL-backed asset resolver",
    long_about = "Exercises the sql:// resolver against a live server: resolve a URI, \
                  read its timestamp, or fetch its bytes. Connection settings come from \
                  the QUARRY_SQL_* environment variables, optionally prefixed with the \
                  server identifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a password for at-rest storage in QUARRY_SQL_PASSWD
    #[command(
        long_about = "Produces the reversible encoded form expected by QUARRY_SQL_PASSWD. \
                      This is an obfuscation convenience, not encryption."
    )]
    EncodePass {
        /// The plaintext password to encode
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
    /// Resolve a sql:// URI to its canonical identifier
    Resolve {
        /// The URI to resolve, e.g. sql://server/shots/a.usda
        #[arg(value_name = "URI")]
        uri: String,
    },
    /// Print the server-side timestamp of a sql:// URI
    Stat {
        /// The URI to query
        #[arg(value_name = "URI")]
        uri: String,
    },
    /// Fetch the bytes behind a sql:// URI
    Fetch {
        /// The URI to fetch
        #[arg(value_name = "URI")]
        uri: String,
        /// Write the bytes to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = quarry_sql::logging::init_logging("cli", true);

    match cli.command {
        Commands::EncodePass { password } => encode_pass::run(&password),
        Commands::Resolve { uri } => resolve::run(&uri),
        Commands::Stat { uri } => stat::run(&uri),
        Commands::Fetch { uri, output } => fetch::run(&uri, output),
    }
}
