use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("AUTHFLOW_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use crate::cli::commands::{self, CMD_LOGIN};

    use super::ARG_VERBOSITY;

    #[test]
    fn test_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("AUTHFLOW_LOG_LEVEL", Some(level))], || {
                let matches = commands::new().get_matches_from(vec!["authflow", CMD_LOGIN]);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_log_level_flags() {
        for count in 0..5_usize {
            temp_env::with_vars([("AUTHFLOW_LOG_LEVEL", None::<&str>)], || {
                let mut args = vec!["authflow".to_string()];
                if count > 0 {
                    args.push(format!("-{}", "v".repeat(count)));
                }
                args.push(CMD_LOGIN.to_string());

                let matches = commands::new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    u8::try_from(count).ok()
                );
            });
        }
    }

    #[test]
    fn test_invalid_log_level() {
        temp_env::with_vars([("AUTHFLOW_LOG_LEVEL", Some("chatty"))], || {
            let result = commands::new().try_get_matches_from(vec!["authflow", CMD_LOGIN]);
            assert!(result.is_err());
        });
    }
}
