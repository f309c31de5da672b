use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};

/// Compose, sign and aggregate co-signed account transactions without a chain connection.
///
/// Artifacts move between signers as envelope text. Any argument documented as "text" also
/// accepts `@path` to read it from a file, or `-` for stdin.
#[derive(Parser, Debug)]
#[command(name = "cosign", author, version, about)]
pub struct Cli {
    /// Chain id used when an artifact does not carry one.
    #[arg(long, env = "COSIGN_CHAIN_ID", default_value_t = 1, global = true)]
    pub chain_id: u64,

    /// JSON file overriding the canonical contract addresses.
    #[arg(long, env = "COSIGN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Draft and address-book file.
    #[arg(long, env = "COSIGN_STORE", default_value = "cosign-store.json", global = true)]
    pub store: PathBuf,

    /// Log filter (eg, info, cosign_protocol=debug). `RUST_LOG` takes precedence.
    #[arg(long, env = "COSIGN_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wrap an envelope's batch into one account transaction and print its identifier plus the
    /// proposal envelope to circulate.
    Hash {
        /// Account nonce the transaction is proposed at.
        #[arg(long)]
        nonce: U256,
        /// Batch through the call-only MultiSend deployment.
        #[arg(long)]
        call_only: bool,
        /// Envelope text.
        envelope: String,
    },
    /// Pack or unpack MultiSend batches.
    Multisend {
        #[command(subcommand)]
        action: MultisendCommand,
    },
    /// Predict the address of an account that has not been deployed yet.
    Predict {
        #[arg(long, value_delimiter = ',', required = true)]
        owners: Vec<Address>,
        #[arg(long)]
        threshold: u64,
        #[arg(long, default_value = "0")]
        salt_nonce: U256,
        /// Proxy creation code (hex text). Overrides `proxyCreationCode` from the config.
        #[arg(long)]
        deployment_code: Option<String>,
    },
    /// Sign the transaction a proposal envelope carries and print the signed envelope.
    Sign {
        #[arg(long, env = "COSIGN_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        /// Produce an `eth_sign` style signature instead of typed data.
        #[arg(long)]
        eth_sign: bool,
        /// Proposal envelope text.
        envelope: String,
    },
    /// Check signed envelopes against one transaction and print the aggregated signature bytes.
    Aggregate {
        #[arg(long, value_delimiter = ',', required = true)]
        owners: Vec<Address>,
        #[arg(long)]
        threshold: usize,
        /// Signed envelope texts. The first one fixes the transaction.
        #[arg(required = true)]
        envelopes: Vec<String>,
    },
    /// Convert between envelope JSON and envelope text.
    Envelope {
        #[command(subcommand)]
        action: EnvelopeCommand,
    },
    /// Work with transaction templates.
    Template {
        #[arg(long, env = "COSIGN_TEMPLATES_DIR", default_value = "src/cosign-templates/specs")]
        templates_dir: PathBuf,
        #[command(subcommand)]
        action: TemplateCommand,
    },
    /// Named batches kept between sessions.
    Draft {
        #[command(subcommand)]
        action: DraftCommand,
    },
    /// Named addresses per chain.
    AddressBook {
        #[command(subcommand)]
        action: AddressBookCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum MultisendCommand {
    /// Pack a JSON array of sub-calls.
    Encode {
        /// Print the account-level call (single sub-call or MultiSend delegate call) as JSON
        /// instead of the packed bytes.
        #[arg(long)]
        wrap: bool,
        #[arg(long, requires = "wrap")]
        call_only: bool,
        /// JSON text.
        transactions: String,
    },
    /// Unpack packed bytes or full `multiSend` calldata.
    Decode { data: String },
}

#[derive(Subcommand, Debug)]
pub enum EnvelopeCommand {
    /// Envelope JSON to envelope text.
    Encode { json: String },
    /// Envelope text to pretty JSON.
    Decode { envelope: String },
    /// Recompute the carried identifier and check the carried signature.
    Verify { envelope: String },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    List,
    Show {
        id: String,
    },
    /// Fill a template, finalize it, and print the resulting envelope.
    Run {
        id: String,
        #[arg(long, env = "COSIGN_ACCOUNT")]
        account: Address,
        /// Input value, `name=value`. Repeatable.
        #[arg(long = "set", value_parser = parse_assignment)]
        inputs: Vec<(String, String)>,
        /// Context value to use where no chain read is available, `key=value`. Repeatable.
        #[arg(long = "context", value_parser = parse_assignment)]
        context: Vec<(String, String)>,
        /// Append the result to this draft (created if missing).
        #[arg(long)]
        draft: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DraftCommand {
    /// Save an envelope's batch under `id`, replacing any draft with that id.
    Save {
        id: String,
        #[arg(long)]
        name: Option<String>,
        envelope: String,
    },
    List {
        #[arg(long)]
        account: Option<Address>,
        /// Include drafts on every chain.
        #[arg(long)]
        all_chains: bool,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AddressBookCommand {
    Add {
        address: Address,
        #[arg(long)]
        name: String,
    },
    List {
        #[arg(long)]
        all_chains: bool,
    },
    Remove {
        address: Address,
    },
}

pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
