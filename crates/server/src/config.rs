use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 39334;
pub const DEFAULT_BOARD: &str = "default";
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "idolboard-server")]
#[command(about = "Plan idol layouts on a 7x6 board and total their modifiers")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "IDOLBOARD_ADDR")]
    pub addr: Option<SocketAddr>,

    /// SQLite database holding saved boards
    #[arg(long, env = "IDOLBOARD_DB")]
    pub db: Option<PathBuf>,

    /// Directory containing the `<size>_mods.txt` modifier lists
    #[arg(long, env = "IDOLBOARD_MODS_DIR")]
    pub mods_dir: Option<PathBuf>,

    /// Name of the saved board to load and keep in sync
    #[arg(long)]
    pub board: Option<String>,

    /// Quiet period before an edited board is written
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// YAML config file (default: ~/.idolboard/config.yaml when present)
    #[arg(long, env = "IDOLBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Values read from the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub addr: Option<SocketAddr>,
    pub db_path: Option<PathBuf>,
    pub mods_dir: Option<PathBuf>,
    pub board: Option<String>,
    pub debounce_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("parse config yaml")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub mods_dir: PathBuf,
    pub board: String,
    pub debounce: Duration,
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".idolboard")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.yaml")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            db_path: data_dir().join("idolboard.db"),
            mods_dir: PathBuf::from("mods"),
            board: DEFAULT_BOARD.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl ServerConfig {
    /// CLI flags win over the file, which wins over defaults.
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            addr: cli.addr.or(file.addr).unwrap_or(defaults.addr),
            db_path: cli
                .db
                .clone()
                .or(file.db_path)
                .unwrap_or(defaults.db_path),
            mods_dir: cli
                .mods_dir
                .clone()
                .or(file.mods_dir)
                .unwrap_or(defaults.mods_dir),
            board: cli
                .board
                .clone()
                .or(file.board)
                .unwrap_or(defaults.board),
            debounce: cli
                .debounce_ms
                .or(file.debounce_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
        }
    }

    /// An explicit `--config` must exist; the default path is optional.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    FileConfig::load(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Ok(Self::merge(cli, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fills_gaps_and_cli_overrides() {
        let file = FileConfig::from_yaml(
            "addr: 127.0.0.1:4000\nmods_dir: /srv/mods\ndebounce_ms: 50\nboard: shared\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["idolboard-server", "--board", "mine", "--debounce-ms", "75"]);
        let cfg = ServerConfig::merge(&cli, file);
        assert_eq!(cfg.addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(cfg.mods_dir, PathBuf::from("/srv/mods"));
        assert_eq!(cfg.debounce, Duration::from_millis(75));
        assert_eq!(cfg.board, "mine");
    }

    #[test]
    fn empty_sources_use_defaults() {
        let cfg = ServerConfig::merge(&Cli::default(), FileConfig::from_yaml("").unwrap());
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_yaml("colour: blue\n").is_err());
    }

    #[test]
    fn explicit_missing_config_fails() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.yaml")),
            ..Cli::default()
        };
        assert!(ServerConfig::load(&cli).is_err());
    }
}
