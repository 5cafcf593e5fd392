//! ldapd - Compare Operation Runner
//!
//! Loads a directory configuration and runs compare operations against it:
//! - from command-line arguments
//! - from hex-encoded LDAPMessage PDUs
//! - in batches, reporting statistics

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ldapd_compare::{build_engine, CompareEngine, CompareStats, DirectoryConfig, MANAGE_DSA_IT_OID};
use ldapd_core::types::{CompareRequest, Control, Dn, Operation};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod sink;

use sink::{ConsoleSink, OutputFormat, Written};

/// ldapd CLI
#[derive(Parser)]
#[command(name = "ldapd")]
#[command(about = "ldapd - directory compare operations")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/ldapd/ldapd.toml", env = "LDAPD_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare one attribute value assertion
    Compare {
        /// Target DN
        dn: String,

        /// Attribute description
        attribute: String,

        /// Asserted value
        value: String,

        /// Send the ManageDsaIT control
        #[arg(long)]
        manage_dsa_it: bool,

        /// Run as this authorization identity instead of anonymously
        #[arg(long, env = "LDAPD_BIND_DN")]
        bind_dn: Option<String>,

        /// Security strength factor of the simulated connection
        #[arg(long, default_value_t = 0)]
        ssf: u32,
    },

    /// Run a hex-encoded compare LDAPMessage and print the hex-encoded response
    Pdu {
        /// LDAPMessage as hex
        hex: String,
    },

    /// Validate the configuration file
    CheckConfig,

    /// Run hex-encoded PDUs (one per line) and print statistics
    Stats {
        /// File of PDUs; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = DirectoryConfig::load(&cli.config)?;
    debug!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Command::Compare {
            dn,
            attribute,
            value,
            manage_dsa_it,
            bind_dn,
            ssf,
        } => {
            let runner = Runner::new(&config, OutputFormat::Json)?;

            let mut op = Operation::new(1, 1).with_ssf(ssf);
            if let Some(bind_dn) = bind_dn {
                let authz = Dn::parse(&bind_dn).with_context(|| format!("Invalid bind DN '{}'", bind_dn))?;
                op = op.with_authz_dn(authz);
            }

            let mut controls = Vec::new();
            if manage_dsa_it {
                controls.push(Control::new(MANAGE_DSA_IT_OID, true));
            }

            let request = CompareRequest::new(dn, attribute, value.into_bytes());
            let status = runner.engine.compare(&op, &request, &controls).await;
            debug!("Compare finished: {:?}", status);
            runner.check_connection()?;
        }
        Command::Pdu { hex } => {
            let runner = Runner::new(&config, OutputFormat::Pdu)?;
            let bytes = decode_hex(&hex)?;
            let status = runner.engine.handle_pdu(&Operation::new(1, 0), &bytes).await;
            debug!("PDU finished: {:?}", status);
            runner.check_connection()?;
        }
        Command::CheckConfig => {
            config.validate()?;
            let entries: usize = config.backends.iter().map(|b| b.entries.len()).sum();
            println!(
                "Configuration OK: {} backends, {} entries, {} access rules, {} extra attribute types",
                config.backends.len(),
                entries,
                config.access.rules.len(),
                config.schema.attribute_types.len()
            );
        }
        Command::Stats { input } => {
            let runner = Runner::new(&config, OutputFormat::Silent)?;
            let lines = read_lines(input)?;
            info!("Running {} PDUs", lines.len());

            for (idx, line) in lines.iter().enumerate() {
                let bytes = decode_hex(line).with_context(|| format!("Line {}", idx + 1))?;
                let op = Operation::new(idx as u64 + 1, 0);
                runner.engine.handle_pdu(&op, &bytes).await;
            }

            println!("{}", serde_json::to_string_pretty(&runner.stats.snapshot())?);
        }
    }

    Ok(())
}

struct Runner {
    engine: CompareEngine,
    sink: Arc<ConsoleSink>,
    stats: Arc<CompareStats>,
}

impl Runner {
    fn new(config: &DirectoryConfig, format: OutputFormat) -> Result<Self> {
        let sink = Arc::new(ConsoleSink::new(format));
        let stats = Arc::new(CompareStats::new());
        let engine = build_engine(config, sink.clone(), stats.clone())?;
        Ok(Self { engine, sink, stats })
    }

    /// Fail when the last operation ended the connection
    fn check_connection(&self) -> Result<()> {
        if let Some(Written::Disconnect(code, text)) = self.sink.last() {
            bail!("Connection dropped: {} ({})", code, text);
        }
        Ok(())
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        bail!("Empty PDU");
    }
    hex::decode(&compact).context("PDU is not valid hex")
}

fn read_lines(input: Option<PathBuf>) -> Result<Vec<String>> {
    let lines: Vec<String> = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()
            .context("Failed to read stdin")?,
    };

    Ok(lines
        .into_iter()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .collect())
}
