use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file, looked up relative to the working directory.
pub const CONFIG_FILE: &str = "Ledger.toml";
/// Prefix for environment overrides, e.g. `LEDGER_LOCKOUT_THRESHOLD=3`.
pub const ENV_PREFIX: &str = "LEDGER_";

const HOUR: u32 = 60 * 60;
const DAY: u32 = 24 * HOUR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),
    #[error("Invalid ledger config: {0}")]
    Invalid(String),
}

/// Ledger configuration, derived from defaults, `Ledger.toml` and `LEDGER_*`
/// environment variables, in increasing order of precedence. The ledger
/// keeps its own copy; governance proposals may change some values later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    min_election_duration: u32,
    max_election_duration: u32,
    max_positions_per_election: u32,
    max_candidates_per_position: u32,
    max_admins: u32,
    proposal_voting_period: u32,
    lockout_threshold: u32,
    lockout_duration: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_election_duration: HOUR,
            max_election_duration: 30 * DAY,
            max_positions_per_election: 20,
            max_candidates_per_position: 50,
            max_admins: 10,
            proposal_voting_period: 3 * DAY,
            lockout_threshold: 5,
            lockout_duration: HOUR,
        }
    }
}

impl LedgerConfig {
    /// Load from the default file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(CONFIG_FILE))
    }

    /// The layered providers for a given config file path.
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_election_duration", self.min_election_duration),
            ("max_positions_per_election", self.max_positions_per_election),
            ("max_candidates_per_position", self.max_candidates_per_position),
            ("max_admins", self.max_admins),
            ("proposal_voting_period", self.proposal_voting_period),
            ("lockout_threshold", self.lockout_threshold),
            ("lockout_duration", self.lockout_duration),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("`{name}` must be positive")));
        }
        if self.min_election_duration > self.max_election_duration {
            return Err(ConfigError::Invalid(
                "`min_election_duration` exceeds `max_election_duration`".to_string(),
            ));
        }
        Ok(())
    }

    /// Shortest allowed gap between an election's start and end.
    pub fn min_election_duration(&self) -> Duration {
        Duration::seconds(self.min_election_duration.into())
    }

    /// Longest allowed gap between an election's start and end.
    pub fn max_election_duration(&self) -> Duration {
        Duration::seconds(self.max_election_duration.into())
    }

    pub fn max_positions_per_election(&self) -> usize {
        self.max_positions_per_election as usize
    }

    pub fn max_candidates_per_position(&self) -> u32 {
        self.max_candidates_per_position
    }

    /// Upper bound on the governance quorum's admin set.
    pub fn max_admins(&self) -> usize {
        self.max_admins as usize
    }

    /// How long a governance proposal stays open for votes.
    pub fn proposal_voting_period(&self) -> Duration {
        Duration::seconds(self.proposal_voting_period.into())
    }

    /// Failed vote attempts that trigger a lockout.
    pub fn lockout_threshold(&self) -> u32 {
        self.lockout_threshold
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(self.lockout_duration.into())
    }

    pub(crate) fn set_proposal_voting_period(&mut self, seconds: u32) {
        self.proposal_voting_period = seconds;
    }

    pub(crate) fn set_lockout_threshold(&mut self, attempts: u32) {
        self.lockout_threshold = attempts;
    }

    pub(crate) fn set_lockout_duration(&mut self, seconds: u32) {
        self.lockout_duration = seconds;
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults() {
        let config = LedgerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.min_election_duration(), Duration::hours(1));
        assert_eq!(config.max_election_duration(), Duration::days(30));
        assert_eq!(config.max_admins(), 10);
        assert_eq!(config.lockout_threshold(), 5);
    }

    #[test]
    fn file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Ledger.toml",
                r#"
                    lockout_threshold = 3
                    max_admins = 7
                "#,
            )?;
            jail.set_env("LEDGER_MAX_ADMINS", "4");

            let config = LedgerConfig::load().unwrap();
            assert_eq!(config.lockout_threshold(), 3);
            // Environment wins over the file.
            assert_eq!(config.max_admins(), 4);
            // Untouched values keep their defaults.
            assert_eq!(config.proposal_voting_period(), Duration::days(3));
            Ok(())
        });
    }

    #[test]
    fn rejects_bad_values() {
        Jail::expect_with(|jail| {
            jail.create_file("Ledger.toml", "lockout_threshold = 0")?;
            assert!(matches!(
                LedgerConfig::load(),
                Err(ConfigError::Invalid(_))
            ));

            jail.create_file(
                "Ledger.toml",
                "min_election_duration = 7200\nmax_election_duration = 3600",
            )?;
            assert!(matches!(
                LedgerConfig::load(),
                Err(ConfigError::Invalid(_))
            ));

            jail.create_file("Ledger.toml", "max_admins = \"lots\"")?;
            assert!(matches!(
                LedgerConfig::load(),
                Err(ConfigError::Figment(_))
            ));
            Ok(())
        });
    }
}
