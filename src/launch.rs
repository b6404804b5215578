use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use argh::FromArgs;
use exitcode::ExitCode;
use prometheus_ali_sd::config::Config;
use prometheus_ali_sd::trace;
use tracing::{debug, error};

use crate::ecs::Ecs;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_CONFIG_FILE: &str = ".prometheus-ali-sd.yaml";

#[derive(FromArgs)]
#[argh(
    description = "Generate Prometheus file_sd documents from Alibaba Cloud resources",
    help_triggers("-h", "--help")
)]
pub struct RootCommand {
    #[argh(switch, short = 'v', description = "show version")]
    version: bool,

    #[argh(
        option,
        short = 'c',
        long = "config",
        description = "config file, $HOME/.prometheus-ali-sd.yaml is used when it exists"
    )]
    config: Option<PathBuf>,

    #[argh(
        option,
        short = 'l',
        description = "log level, one of trace, debug, info, warn, error or off, default info"
    )]
    log_level: Option<String>,

    #[argh(option, description = "same as --log-level")]
    loglevel: Option<String>,

    #[argh(option, description = "append logs to this file instead of stdout")]
    log_file: Option<PathBuf>,

    #[argh(option, description = "same as --log-file")]
    logfile: Option<PathBuf>,

    #[argh(subcommand)]
    sub_commands: Option<SubCommands>,
}

impl RootCommand {
    #![allow(clippy::print_stdout)]
    fn show_version(&self) {
        println!("{PKG_NAME} {PKG_VERSION}");
    }

    pub fn run(&self) -> Result<(), ExitCode> {
        if self.version {
            self.show_version();
            return Ok(());
        }

        let log_level = self.log_level();
        let log_file = self.log_file();
        let levels = trace::levels(log_level);
        let filter = std::env::var(trace::LOG_ENV)
            .ok()
            .or_else(|| levels.clone())
            .unwrap_or_else(|| "info".to_string());
        let color = log_file.is_none() && std::io::stdout().is_terminal();
        trace::init(color, &filter, log_file);

        if levels.is_none() {
            error!(
                message = "unknown log level",
                level = log_level,
                expected = "trace, debug, info, warn, error, off"
            );
            return Err(exitcode::USAGE);
        }

        let Some(sub_command) = &self.sub_commands else {
            error!(message = "no command specified, run with --help to list commands");
            return Err(exitcode::USAGE);
        };

        let config = self.load_config().map_err(|err| {
            error!(message = "load config failed", %err);
            err.exit_code()
        })?;

        match sub_command {
            SubCommands::Ecs(ecs) => ecs.run(config),
        }
    }

    /// Flags given after the command win over the ones given before it.
    fn log_level(&self) -> &str {
        self.sub_command_log_level()
            .or(self.log_level.as_deref())
            .or(self.loglevel.as_deref())
            .unwrap_or("info")
    }

    fn log_file(&self) -> Option<&Path> {
        self.sub_command_log_file()
            .or(self.log_file.as_deref())
            .or(self.logfile.as_deref())
    }

    fn sub_command_log_level(&self) -> Option<&str> {
        match &self.sub_commands {
            Some(SubCommands::Ecs(ecs)) => ecs.log_level(),
            None => None,
        }
    }

    fn sub_command_log_file(&self) -> Option<&Path> {
        match &self.sub_commands {
            Some(SubCommands::Ecs(ecs)) => ecs.log_file(),
            None => None,
        }
    }

    fn load_config(&self) -> Result<Config, prometheus_ali_sd::config::Error> {
        if let Some(path) = &self.config {
            return Config::load(path);
        }

        match std::env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_FILE)) {
            Some(path) if path.exists() => {
                debug!(message = "use default config file", ?path);
                Config::load(&path)
            }
            _ => Ok(Config::default()),
        }
    }
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommands {
    Ecs(Ecs),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RootCommand {
        RootCommand::from_args(&["prometheus-ali-sd"], args).unwrap()
    }

    #[test]
    fn log_flags_default() {
        let root = parse(&["ecs"]);

        assert_eq!(root.log_level(), "info");
        assert_eq!(root.log_file(), None);
    }

    #[test]
    fn log_flags_before_command() {
        let root = parse(&["--loglevel", "warn", "--logfile", "/tmp/a.log", "ecs"]);
        assert_eq!(root.log_level(), "warn");
        assert_eq!(root.log_file(), Some(Path::new("/tmp/a.log")));

        let root = parse(&["-l", "debug", "--log-file", "/tmp/b.log", "ecs"]);
        assert_eq!(root.log_level(), "debug");
        assert_eq!(root.log_file(), Some(Path::new("/tmp/b.log")));
    }

    #[test]
    fn log_flags_after_command_win() {
        let root = parse(&[
            "--log-level",
            "warn",
            "--log-file",
            "/tmp/a.log",
            "ecs",
            "--loglevel",
            "debug",
            "--logfile",
            "/tmp/b.log",
        ]);

        assert_eq!(root.log_level(), "debug");
        assert_eq!(root.log_file(), Some(Path::new("/tmp/b.log")));
    }
}
