use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Branch of the web client a build was published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseChannel {
    #[default]
    Stable,
    Ptb,
    Canary,
    /// Internal channel, served from a separate domain.
    Staging,
}

/// Environment a build runs in. Every public channel is production;
/// only [`ReleaseChannel::Staging`] maps to `Staging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildEnv {
    Production,
    Staging,
}

impl ReleaseChannel {
    pub const ALL: [ReleaseChannel; 4] = [
        ReleaseChannel::Stable,
        ReleaseChannel::Ptb,
        ReleaseChannel::Canary,
        ReleaseChannel::Staging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseChannel::Stable => "stable",
            ReleaseChannel::Ptb => "ptb",
            ReleaseChannel::Canary => "canary",
            ReleaseChannel::Staging => "staging",
        }
    }

    /// Origin serving the channel's root document and assets
    pub fn default_domain(self) -> &'static str {
        match self {
            ReleaseChannel::Stable => "https://discord.com",
            ReleaseChannel::Ptb => "https://ptb.discord.com",
            ReleaseChannel::Canary => "https://canary.discord.com",
            ReleaseChannel::Staging => "https://staging.discord.co",
        }
    }

    pub fn build_env(self) -> BuildEnv {
        match self {
            ReleaseChannel::Stable | ReleaseChannel::Ptb | ReleaseChannel::Canary => {
                BuildEnv::Production
            }
            ReleaseChannel::Staging => BuildEnv::Staging,
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannel(pub String);

impl fmt::Display for UnknownChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown release channel '{}' (expected stable, ptb, canary or staging)",
            self.0
        )
    }
}

impl std::error::Error for UnknownChannel {}

impl FromStr for ReleaseChannel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}
