use std::path::PathBuf;

use clap::Parser;

/// Executes one request against a file-system backed AppData store
#[derive(Debug, Parser)]
#[command(name = "appdata")]
#[command(bin_name = "appdata")]
#[command(about = "Issue one request against an AppData store", long_about = None)]
pub struct AppDataCli {
    /// Directory the store keeps its entities in
    #[arg(short, long, default_value = ".appdata")]
    pub root: PathBuf,

    /// Bearer token identifying the caller
    #[arg(short, long, env = "APPDATA_TOKEN", hide_env_values = true)]
    pub token: String,

    /// JSON request body
    #[arg(short, long)]
    pub body: Option<String>,

    /// Request method (GET, POST, PUT or DELETE)
    pub method: String,

    /// Resource path, such as `user/favorites` or `data/app1`
    pub path: String,
}
