//! Argument parsing for the `tally` binary.

use anyhow::{anyhow, bail, Context, Result};

pub const USAGE: &str = "\
Usage: tally <command> [options]

Currency:
  currencies                          List supported currencies
  format <amount> [--code C] [--no-symbol]
  parse <text> [--code C]
  use <code>                          Save the preferred currency

Session:
  login <email> <password> [--remember]
  logout
  refresh
  status
  whoami";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Currencies,
    Format {
        amount: f64,
        code: Option<String>,
        show_symbol: bool,
    },
    Parse {
        text: String,
        code: Option<String>,
    },
    Use {
        code: String,
    },
    Login {
        email: String,
        password: String,
        remember_me: bool,
    },
    Logout,
    Refresh,
    Status,
    WhoAmI,
    Help,
}

impl Command {
    /// Parses the arguments after the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };

        let mut positional = Vec::new();
        let mut code = None;
        let mut show_symbol = true;
        let mut remember_me = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--code" => {
                    let value = args.next().context("--code needs a currency code")?;
                    code = Some(value.to_uppercase());
                }
                "--no-symbol" => show_symbol = false,
                "--remember" => remember_me = true,
                flag if flag.starts_with("--") => bail!("Unknown option: {flag}"),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let mut required = |what: &str| {
            positional
                .next()
                .ok_or_else(|| anyhow!("`{name}` needs {what}"))
        };

        let command = match name.as_str() {
            "currencies" => Command::Currencies,
            "format" => {
                let raw = required("an amount")?;
                let amount = raw
                    .parse::<f64>()
                    .with_context(|| format!("Not a number: {raw}"))?;
                Command::Format {
                    amount,
                    code,
                    show_symbol,
                }
            }
            "parse" => Command::Parse {
                text: required("the text to parse")?,
                code,
            },
            "use" => Command::Use {
                code: required("a currency code")?.to_uppercase(),
            },
            "login" => Command::Login {
                email: required("an email")?,
                password: required("a password")?,
                remember_me,
            },
            "logout" => Command::Logout,
            "refresh" => Command::Refresh,
            "status" => Command::Status,
            "whoami" => Command::WhoAmI,
            "help" | "-h" | "--help" => Command::Help,
            other => bail!("Unknown command: {other}"),
        };

        Ok(command)
    }

    /// Commands that never touch the Auth API.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            Command::Currencies
                | Command::Format { .. }
                | Command::Parse { .. }
                | Command::Use { .. }
                | Command::Help
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        Command::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args_is_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_format_options() {
        assert_eq!(
            parse(&["format", "-1234.5", "--code", "eur", "--no-symbol"]).unwrap(),
            Command::Format {
                amount: -1234.5,
                code: Some("EUR".into()),
                show_symbol: false,
            }
        );
        assert!(parse(&["format", "abc"]).is_err());
        assert!(parse(&["format"]).is_err());
    }

    #[test]
    fn test_login() {
        assert_eq!(
            parse(&["login", "ada@example.com", "Secret123", "--remember"]).unwrap(),
            Command::Login {
                email: "ada@example.com".into(),
                password: "Secret123".into(),
                remember_me: true,
            }
        );
        assert!(parse(&["login", "ada@example.com"]).is_err());
    }

    #[test]
    fn test_unknown_input() {
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["status", "--verbose"]).is_err());
        assert!(parse(&["format", "1", "--code"]).is_err());
    }

    #[test]
    fn test_offline_commands() {
        assert!(parse(&["use", "ngn"]).unwrap().is_offline());
        assert!(!parse(&["status"]).unwrap().is_offline());
    }
}
