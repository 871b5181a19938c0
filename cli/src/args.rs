//! Command-line parsing.
//!
//! The surface is small enough for hand-rolled parsing:
//!
//! ```text
//! ssn <weekly|monthly> upload  (PERIOD | --all)
//! ssn <weekly|monthly> confirm (PERIOD | --all)
//! ssn <weekly|monthly> query   PERIOD
//! ssn <weekly|monthly> fix     PERIOD
//! ssn <weekly|monthly> empty   PERIOD
//! ssn env
//! ssn set-env <prod|test>
//! ```
//!
//! `--config-dir` and `--data-dir` may appear anywhere.

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use ssn_config::Environment;
use ssn_types::{Period, PeriodKind};

pub const USAGE: &str = "\
Usage: ssn [OPTIONS] <COMMAND>

Commands:
  weekly  <upload|confirm|query|fix|empty> <PERIOD|--all>
  monthly <upload|confirm|query|fix|empty> <PERIOD|--all>
  env                 show the active environment
  set-env <prod|test> point both flow configurations at an environment

Periods are YYYY-WW for weekly flows and YYYY-MM for monthly flows.
`--all` applies upload/confirm to every pending artifact of the flow.

Options:
  --config-dir <DIR>  configuration directory (default: config)
  --data-dir <DIR>    filing data directory (default: data)

Credentials are read from SSN_USER, SSN_PASSWORD and SSN_COMPANY.";

#[derive(Debug, PartialEq, Eq)]
pub enum Target {
    One(Period),
    All,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FlowCommand {
    Upload(Target),
    Confirm(Target),
    Query(Period),
    Fix(Period),
    Empty(Period),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Flow {
        kind: PeriodKind,
        command: FlowCommand,
    },
    ShowEnv,
    SetEnv(Environment),
}

#[derive(Debug)]
pub struct Cli {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub command: Command,
}

pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut config_dir = PathBuf::from("config");
    let mut data_dir = PathBuf::from("data");
    let mut positional: Vec<String> = Vec::new();
    let mut all = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-dir" => {
                config_dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--config-dir needs a value"))?
                    .into();
            }
            "--data-dir" => {
                data_dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--data-dir needs a value"))?
                    .into();
            }
            "--all" => all = true,
            "-h" | "--help" => bail!("{USAGE}"),
            other if other.starts_with('-') => bail!("unknown option '{other}'\n\n{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("env") => Command::ShowEnv,
        Some("set-env") => {
            let name = positional
                .next()
                .ok_or_else(|| anyhow!("set-env needs an environment name\n\n{USAGE}"))?;
            Command::SetEnv(name.parse()?)
        }
        Some(kind_name) => {
            let kind: PeriodKind = kind_name
                .parse()
                .map_err(|e: String| anyhow!("{e}\n\n{USAGE}"))?;
            let verb = positional
                .next()
                .ok_or_else(|| anyhow!("missing operation for '{kind_name}'\n\n{USAGE}"))?;
            let command = parse_flow(&verb, kind, positional.next().as_deref(), all)?;
            Command::Flow { kind, command }
        }
        None => bail!("{USAGE}"),
    };

    if let Some(extra) = positional.next() {
        bail!("unexpected argument '{extra}'\n\n{USAGE}");
    }

    Ok(Cli {
        config_dir,
        data_dir,
        command,
    })
}

fn parse_flow(
    verb: &str,
    kind: PeriodKind,
    period: Option<&str>,
    all: bool,
) -> Result<FlowCommand> {
    let target = || -> Result<Target> {
        if all {
            if period.is_some() {
                bail!("give either a period or --all, not both");
            }
            return Ok(Target::All);
        }
        Ok(Target::One(require_period(verb, kind, period)?))
    };

    match verb {
        "upload" => Ok(FlowCommand::Upload(target()?)),
        "confirm" => Ok(FlowCommand::Confirm(target()?)),
        "query" | "fix" | "empty" if all => {
            bail!("'{verb}' works on a single period, not --all")
        }
        "query" => Ok(FlowCommand::Query(require_period(verb, kind, period)?)),
        "fix" => Ok(FlowCommand::Fix(require_period(verb, kind, period)?)),
        "empty" => Ok(FlowCommand::Empty(require_period(verb, kind, period)?)),
        other => bail!("unknown operation '{other}'\n\n{USAGE}"),
    }
}

fn require_period(verb: &str, kind: PeriodKind, token: Option<&str>) -> Result<Period> {
    let token = token.ok_or_else(|| anyhow!("'{verb}' needs a period\n\n{USAGE}"))?;
    Ok(Period::parse(token, kind)?)
}

#[cfg(test)]
mod tests {
    use super::{Command, FlowCommand, Target, parse};
    use ssn_config::Environment;
    use ssn_types::PeriodKind;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_a_weekly_upload() {
        let cli = parse(args("weekly upload 2025-15")).unwrap();
        let Command::Flow { kind, command } = cli.command else {
            panic!("expected a flow command");
        };
        assert_eq!(kind, PeriodKind::Week);
        let FlowCommand::Upload(Target::One(period)) = command else {
            panic!("expected a single-period upload");
        };
        assert_eq!(period.to_string(), "2025-15");
        assert_eq!(cli.config_dir, std::path::Path::new("config"));
    }

    #[test]
    fn all_flag_works_anywhere() {
        let cli = parse(args("--all monthly confirm")).unwrap();
        assert!(matches!(
            cli.command,
            Command::Flow {
                kind: PeriodKind::Month,
                command: FlowCommand::Confirm(Target::All),
            }
        ));
    }

    #[test]
    fn directory_overrides_are_honored() {
        let cli = parse(args("--config-dir /etc/ssn weekly query 2025-01 --data-dir /srv/data"))
            .unwrap();
        assert_eq!(cli.config_dir, std::path::Path::new("/etc/ssn"));
        assert_eq!(cli.data_dir, std::path::Path::new("/srv/data"));
    }

    #[test]
    fn set_env_parses_environment_names() {
        let cli = parse(args("set-env test")).unwrap();
        assert_eq!(cli.command, Command::SetEnv(Environment::Test));
        assert!(parse(args("set-env staging")).is_err());
    }

    #[test]
    fn monthly_period_bounds_apply() {
        assert!(parse(args("monthly upload 2025-13")).is_err());
        assert!(parse(args("weekly upload 2025-53")).is_ok());
    }

    #[test]
    fn single_period_commands_reject_all() {
        assert!(parse(args("weekly query --all")).is_err());
        assert!(parse(args("weekly upload --all 2025-15")).is_err());
    }
}
