//! CLI argument parsing and run dispatch

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use log::debug;

use scm_bridge::config::Config;
use scm_bridge::phases::orchestrator::{self, Mode, Outcome};
use scm_bridge::repository::DefaultGitOperations;

/// SCM Bridge - Materialize a pinned git checkout from a single locator
#[derive(Parser, Debug)]
#[command(name = "scm-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Locator: <remote>[?subdir=<path>][&lfs=<0|1>][#<ref-or-commit>]
    #[arg(long, value_name = "LOCATOR")]
    url: String,

    /// Output directory
    #[arg(long, value_name = "PATH")]
    outdir: PathBuf,

    /// Write one package descriptor pair per submodule instead of a checkout
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "0",
        default_missing_value = "1",
        value_parser = BoolishValueParser::new()
    )]
    projectmode: bool,

    /// Fetch complete history (implied when OSC_VERSION is set)
    #[arg(long)]
    full_history: bool,

    /// Git executable to use
    #[arg(long, value_name = "PATH", env = "SCM_BRIDGE_GIT", default_value = "git")]
    git: PathBuf,

    /// Extra git configuration for every git invocation (repeatable)
    #[arg(long = "git-config", value_name = "KEY=VALUE")]
    git_config: Vec<String>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Execute the run
    pub fn execute(self) -> Result<()> {
        // a logger installed earlier (tests) wins
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .try_init();

        let mut config = Config::from_env().with_git_binary(self.git.clone());
        if self.full_history {
            config = config.with_full_history(true);
        }
        for raw in &self.git_config {
            let (key, value) = Config::parse_git_config_override(raw)?;
            config = config.with_git_config(key, value);
        }
        debug!("configuration: {:?}", config);

        let cwd = env::current_dir().context("cannot determine the current directory")?;
        let out_dir = cwd.join(&self.outdir);
        let mode = if self.projectmode {
            Mode::Project
        } else {
            Mode::Checkout
        };

        let git_ops = DefaultGitOperations::new(config.clone());
        match orchestrator::execute(&self.url, mode, &git_ops, &config, &out_dir, &cwd)? {
            Outcome::Checkout(marker) => println!("{}", marker.scmsync),
            Outcome::Project(packages) => {
                for package in packages {
                    println!("{} {}", package.name, package.scmsync());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    fn parse(args: &[&str]) -> bool {
        let mut argv = vec!["scm-bridge", "--url", "/srv/repo", "--outdir", "out"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().projectmode
    }

    #[test]
    fn test_projectmode_values() {
        assert!(!parse(&[]));
        assert!(parse(&["--projectmode"]));
        assert!(parse(&["--projectmode", "1"]));
        assert!(parse(&["--projectmode", "true"]));
        assert!(!parse(&["--projectmode", "0"]));
    }

    #[test]
    fn test_git_config_is_repeatable() {
        let cli = Cli::try_parse_from([
            "scm-bridge",
            "--url",
            "/srv/repo",
            "--outdir",
            "out",
            "--git-config",
            "user.name=Bridge",
            "--git-config",
            "protocol.file.allow=always",
        ])
        .unwrap();
        assert_eq!(cli.git_config.len(), 2);
    }

    #[test]
    fn test_url_is_required() {
        assert!(Cli::try_parse_from(["scm-bridge", "--outdir", "out"]).is_err());
    }
}
