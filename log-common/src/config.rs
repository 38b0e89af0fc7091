use std::str::FromStr;
use std::time;

/// A duration read from the environment as a number of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl std::fmt::Display for ParseEnvMsDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected a duration in milliseconds")
    }
}

impl std::error::Error for ParseEnvMsDurationError {}

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.trim().parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_milliseconds() {
        assert_eq!(
            "60000".parse::<EnvMsDuration>(),
            Ok(EnvMsDuration(time::Duration::from_secs(60)))
        );
        assert_eq!("1m".parse::<EnvMsDuration>(), Err(ParseEnvMsDurationError));
        assert_eq!("-5".parse::<EnvMsDuration>(), Err(ParseEnvMsDurationError));
    }
}
