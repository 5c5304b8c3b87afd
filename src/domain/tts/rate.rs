use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

const MIN_PERCENT: i32 = -50;
const MAX_PERCENT: i32 = 100;

/// Relative speech rate adjustment, e.g. `-5%`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeechRate {
    percent: i32,
}

impl SpeechRate {
    pub fn from_percent(percent: i32) -> Result<Self, String> {
        if !(MIN_PERCENT..=MAX_PERCENT).contains(&percent) {
            return Err(format!(
                "speech rate {}% out of range ({}%..={}%)",
                percent, MIN_PERCENT, MAX_PERCENT
            ));
        }
        Ok(Self { percent })
    }

    pub fn percent(&self) -> i32 {
        self.percent
    }

    pub fn is_default(&self) -> bool {
        self.percent == 0
    }

    /// Multiplicative speed factor (`-5%` is `0.95`)
    pub fn speed_factor(&self) -> f32 {
        1.0 + self.percent as f32 / 100.0
    }
}

impl std::fmt::Display for SpeechRate {
    /// Signed percentage as used by SSML prosody
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}%", self.percent)
    }
}

impl FromStr for SpeechRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix('%')
            .ok_or_else(|| format!("speech rate must end with '%': {}", s))?;
        let percent = number
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid speech rate: {}", s))?;
        Self::from_percent(percent)
    }
}

impl Serialize for SpeechRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SpeechRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
