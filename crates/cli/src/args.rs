use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand, ValueEnum};
use meson_sdk::{relayer::DEFAULT_RELAYER_URL, types};

pub(crate) const DEFAULT_RPC_PROVIDER: &str = "https://rpc.merlinchain.io";
pub(crate) const DEFAULT_RPC_THROTTLING: u32 = 15;

#[derive(Parser, Debug)]
#[command(name = "meson-cli", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Source chain RPC endpoint
    #[arg(long, global = true, env = "MESON_RPC_URL", default_value_t = DEFAULT_RPC_PROVIDER.to_string())]
    pub rpc: String,

    /// RPC throttling (req/sec) [default: 15 for default RPC provider and
    /// none for custom]
    #[arg(long, global = true)]
    pub rpc_throttle: Option<u32>,

    /// Relayer API base URL
    #[arg(long, global = true, env = "MESON_RELAYER_URL", default_value_t = DEFAULT_RELAYER_URL.to_string())]
    pub relayer: String,

    /// Log filter, overridden by `RUST_LOG`
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct Route {
    /// Source chain
    #[arg(long, default_value = types::MERLIN)]
    pub from_chain: String,

    /// Destination chain
    #[arg(long, default_value = types::ZKSYNC)]
    pub to_chain: String,

    /// Token name (mbtc, btc, merl) or relayer token ID
    #[arg(long, default_value = "mbtc")]
    pub token: String,

    /// Amount in token units, e.g. 0.01
    #[arg(long)]
    pub amount: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show fee, estimated time and limits for a route
    Price {
        #[command(flatten)]
        route: Route,
    },
    /// Approve the pool, then encode, sign and submit a swap
    Swap {
        #[command(flatten)]
        route: Route,

        /// Sender private key (hex)
        #[arg(long, env = "MESON_PRIVATE_KEY", hide_env_values = true)]
        key: String,

        /// Destination address [default: sender]
        #[arg(long)]
        recipient: Option<Address>,

        /// Token contract on the source chain [default: known address]
        #[arg(long)]
        token_address: Option<Address>,

        /// Pool contract on the source chain [default: known address]
        #[arg(long)]
        pool_address: Option<Address>,

        /// Do not send the token approval
        #[arg(long, default_value_t = false)]
        skip_approve: bool,

        /// Seconds to wait for the approval receipt [default: unlimited, until
        /// terminated by (Ctrl+C)]
        #[arg(long)]
        approval_timeout: Option<u64>,
    },
    /// Show swap status
    Status {
        /// Swap ID returned on submission
        swap_id: String,

        /// Keep polling until the swap is released, cancelled or expired
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
}
