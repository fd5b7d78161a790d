use clap::Parser;

pub const DEFAULT_RPC_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_DATA_DIR: &str = "./registryd-data";

#[derive(Parser, Debug)]
#[command(name = "registryd", about = "Record and naming registry node")]
pub struct NodeConfig {
    /// Address the HTTP query API binds to.
    #[arg(long, default_value = DEFAULT_RPC_BIND_ADDRESS)]
    pub rpc_bind_address: String,

    /// Directory the RocksDB column families are stored under.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Chain id stamped into every execution context.
    #[arg(long, default_value = "registry-1")]
    pub chain_id: String,

    /// Log verbosity.
    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,

    /// Directory log files are written under.
    #[arg(long, default_value = "./logs")]
    pub log_dir: String,
}
