use std::fmt::{Display, Formatter};

pub const NAME_ENVIRONMENT: &str = "APP_ENVIRONMENT";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Reads `APP_ENVIRONMENT`, development when unset.
    pub fn from_env() -> Self {
        std::env::var(NAME_ENVIRONMENT).map_or(Environment::Development, |env| {
            env.try_into()
                .unwrap_or_else(|e| panic!("Failed to parse {NAME_ENVIRONMENT}: {e}"))
        })
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" | "remote" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not supported environment. Use either `local` or `production`"
            )),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn aliases_parse() {
        assert_eq!(Environment::try_from("LOCAL".to_string()), Ok(Environment::Development));
        assert_eq!(Environment::try_from("prod".to_string()), Ok(Environment::Production));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
