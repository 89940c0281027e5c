//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const USAGE: &str = "\
usage: jdbg [options] [MainClass]

options:
  -c, --config <file>      use this config file instead of the global/project ones
  -b, --break <line>       register a breakpoint before the first command (repeatable)
  -l, --log-level <level>  trace | debug | info | warn | error
  -h, --help               print this help";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    /// Overrides `target.main_class`.
    pub main_class: Option<String>,
    pub config_file: Option<PathBuf>,
    /// Added to `session.breakpoints`.
    pub breakpoints: Vec<u32>,
    /// Overrides `log.level`.
    pub log_level: Option<String>,
    pub help: bool,
}

impl CliArgs {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "-c" | "--config" => {
                    let value = value_of(&mut args, &arg)?;
                    parsed.config_file = Some(PathBuf::from(value));
                }
                "-b" | "--break" => {
                    let value = value_of(&mut args, &arg)?;
                    let line = value
                        .parse::<u32>()
                        .ok()
                        .filter(|l| *l > 0)
                        .with_context(|| format!("invalid breakpoint line '{value}'"))?;
                    parsed.breakpoints.push(line);
                }
                "-l" | "--log-level" => {
                    parsed.log_level = Some(value_of(&mut args, &arg)?);
                }
                flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
                _ if parsed.main_class.is_some() => {
                    bail!("unexpected argument '{arg}'\n{USAGE}")
                }
                _ => parsed.main_class = Some(arg),
            }
        }
        Ok(parsed)
    }
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("option '{flag}' needs a value"))
}
