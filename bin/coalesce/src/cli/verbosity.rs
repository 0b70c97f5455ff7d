use std::str::FromStr;

use tracing::Level;

const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

/// Log level chosen with `-v 1..=5`, errors only up to trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verbosity(Level);

impl Verbosity {
    pub fn level(&self) -> Level {
        self.0
    }

    /// `EnvFilter` directive for this level.
    pub fn directive(&self) -> String {
        self.0.to_string().to_ascii_lowercase()
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let position = value.parse::<usize>().map_err(|err| err.to_string())?;
        position
            .checked_sub(1)
            .and_then(|index| LEVELS.get(index))
            .map(|level| Self(*level))
            .ok_or_else(|| format!("verbosity must be between 1 and 5, got {position}"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1", Level::ERROR, "error")]
    #[case("3", Level::INFO, "info")]
    #[case("5", Level::TRACE, "trace")]
    fn test_verbosity_levels(#[case] input: &str, #[case] level: Level, #[case] directive: &str) {
        let verbosity = input.parse::<Verbosity>();
        assert_eq!(verbosity.map(|verbosity| verbosity.level()), Ok(level));
        assert_eq!(Verbosity(level).directive(), directive);
    }

    #[rstest]
    #[case("0")]
    #[case("6")]
    #[case("loud")]
    fn test_invalid_verbosity(#[case] input: &str) {
        assert!(input.parse::<Verbosity>().is_err());
    }
}
