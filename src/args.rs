use clap::{Args, Parser, Subcommand};

use crate::util::env::{Env, StoreBackend};

/// Snake with a time-partitioned leaderboard.
///
/// Settings come from the environment (and `.env`); flags given here win.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// API port (SERVER_API_PORT)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Score store backend (STORE_BACKEND)
    #[arg(short, long, value_enum, global = true)]
    pub store: Option<StoreBackend>,

    /// Redis connection string (REDIS_URL)
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// Log as newline-delimited JSON (LOG_JSON)
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the leaderboard API (default)
    Serve,

    /// Let the autopilot play a single game
    Autoplay(AutoplayArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AutoplayArgs {
    /// Seed for food placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Save the final score to the leaderboard under this username
    #[arg(long)]
    pub submit_as: Option<String>,

    /// Skip the tick timer and play as fast as possible
    #[arg(long)]
    pub instant: bool,

    /// Give up after this many ticks
    #[arg(long, default_value_t = 100_000)]
    pub max_ticks: u64,
}

impl Cli {
    /// Layers flags over the environment.
    pub fn apply(&self, env: &mut Env) {
        if let Some(port) = self.port {
            env.server_api_port = port;
        }

        if let Some(store) = self.store {
            env.store_backend = store;
        }

        if let Some(url) = &self.redis_url {
            env.redis_url = url.clone();
        }

        env.log_json |= self.log_json;
    }
}

pub fn parse_cli_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::env::from_iter;

    fn env() -> Env {
        from_iter(Vec::<(String, String)>::new()).unwrap()
    }

    #[test]
    fn test_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["snake-board"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.port, None);
    }

    #[test]
    fn test_flags_override_env() {
        let cli = Cli::try_parse_from([
            "snake-board",
            "serve",
            "--port",
            "8081",
            "--store",
            "redis",
            "--redis-url",
            "redis://cache:6379",
        ])
        .unwrap();

        let mut env = env();
        cli.apply(&mut env);

        assert_eq!(cli.command, Some(Command::Serve));
        assert_eq!(env.server_api_port, 8081);
        assert_eq!(env.store_backend, StoreBackend::Redis);
        assert_eq!(env.redis_url, "redis://cache:6379");
        assert!(!env.log_json);
    }

    #[test]
    fn test_autoplay_args() {
        let cli = Cli::try_parse_from([
            "snake-board",
            "autoplay",
            "--seed",
            "7",
            "--submit-as",
            "bot 🐍",
            "--instant",
        ])
        .unwrap();

        let Some(Command::Autoplay(args)) = cli.command else {
            panic!("expected autoplay, got {:?}", cli.command);
        };

        assert_eq!(args.seed, Some(7));
        assert_eq!(args.submit_as.as_deref(), Some("bot 🐍"));
        assert!(args.instant);
        assert_eq!(args.max_ticks, 100_000);
    }

    #[test]
    fn test_rejects_unknown_store() {
        assert!(Cli::try_parse_from(["snake-board", "--store", "postgres"]).is_err());
    }
}
