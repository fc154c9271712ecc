use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{env, path::PathBuf};
use url::Url;

pub const DEFAULT_NODE_ADDR: &str = "localhost:47100";

#[derive(Parser, Debug, Default)]
#[command(name = "atlas-monitor", about = "Live terminal monitor for an atlas ledger/cache node")]
pub struct Args {
    /// Full WebSocket URL of the node, e.g. ws://localhost:47100
    #[arg(long, default_value = "")]
    pub node_url: String,
    /// host:port of the node; ignored when a URL is given
    #[arg(long, default_value = "")]
    pub node_addr: String,
    /// Append logs to this file instead of discarding them
    #[arg(long, default_value = "")]
    pub log_file: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub node_url: Url,
    pub log_file: Option<PathBuf>,
    pub log_stdout: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let node_url = resolve_node_url(&args.node_url, &args.node_addr)?;
        let log_file = if !args.log_file.trim().is_empty() {
            Some(PathBuf::from(args.log_file.trim()))
        } else {
            env_value("ATLAS_LOG_FILE").map(PathBuf::from)
        };
        let log_stdout = env_value("ATLAS_LOG_STDOUT")
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(false);
        Ok(Self {
            node_url,
            log_file,
            log_stdout,
        })
    }
}

pub fn resolve_node_url(flag_url: &str, flag_addr: &str) -> Result<Url> {
    node_url_from(
        flag_url,
        env_value("ATLAS_NODE_URL").as_deref(),
        flag_addr,
        env_value("ATLAS_NODE_ADDR").as_deref(),
    )
}

/// Precedence: `--node-url`, `ATLAS_NODE_URL`, `--node-addr`,
/// `ATLAS_NODE_ADDR`, then the default address.
fn node_url_from(
    flag_url: &str,
    env_url: Option<&str>,
    flag_addr: &str,
    env_addr: Option<&str>,
) -> Result<Url> {
    let raw = if !flag_url.trim().is_empty() {
        flag_url.trim().to_string()
    } else if let Some(value) = env_url {
        value.to_string()
    } else {
        let addr = if !flag_addr.trim().is_empty() {
            flag_addr.trim()
        } else {
            env_addr.unwrap_or(DEFAULT_NODE_ADDR)
        };
        format!("ws://{addr}")
    };
    let url = Url::parse(&raw).with_context(|| format!("invalid node url '{raw}'"))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        bail!("node url must use ws:// or wss://, got '{raw}'");
    }
    Ok(url)
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_local_node_port() {
        let url = node_url_from("", None, "", None).expect("default url");
        assert_eq!(url.as_str(), "ws://localhost:47100/");
    }

    #[test]
    fn url_flag_wins_over_everything() {
        let url = node_url_from(
            "wss://node.example:9000/feed",
            Some("ws://env:1"),
            "flag:2",
            Some("env:3"),
        )
        .expect("flag url");
        assert_eq!(url.host_str(), Some("node.example"));
        assert_eq!(url.port(), Some(9000));
    }

    #[test]
    fn address_sources_follow_precedence() {
        let from_env_url = node_url_from("", Some("ws://env-url:1"), "flag:2", None).expect("env url");
        assert_eq!(from_env_url.host_str(), Some("env-url"));

        let from_flag = node_url_from("", None, "10.0.0.5:47100", Some("env:3")).expect("flag addr");
        assert_eq!(from_flag.host_str(), Some("10.0.0.5"));

        let from_env = node_url_from("", None, "", Some("env-host:4")).expect("env addr");
        assert_eq!(from_env.port(), Some(4));
    }

    #[test]
    fn non_websocket_scheme_is_rejected() {
        let err = node_url_from("http://localhost:47100", None, "", None).unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn parse_bool_flag_accepts_common_spellings() {
        assert_eq!(parse_bool_flag("YES"), Some(true));
        assert_eq!(parse_bool_flag(" off "), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }
}
