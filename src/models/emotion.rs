use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Most emotions a single record can carry
pub const MAX_EMOTIONS: usize = 3;

/// Emotion tags a record can be labelled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Calm,
    Sadness,
    Anger,
    Anxiety,
    Love,
    Gratitude,
    Confusion,
    Hope,
    Loneliness,
}

impl Emotion {
    pub const ALL: [Emotion; 10] = [
        Emotion::Joy,
        Emotion::Calm,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Anxiety,
        Emotion::Love,
        Emotion::Gratitude,
        Emotion::Confusion,
        Emotion::Hope,
        Emotion::Loneliness,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Calm => "calm",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Anxiety => "anxiety",
            Emotion::Love => "love",
            Emotion::Gratitude => "gratitude",
            Emotion::Confusion => "confusion",
            Emotion::Hope => "hope",
            Emotion::Loneliness => "loneliness",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Joy => "Joy",
            Emotion::Calm => "Calm",
            Emotion::Sadness => "Sadness",
            Emotion::Anger => "Anger",
            Emotion::Anxiety => "Anxiety",
            Emotion::Love => "Love",
            Emotion::Gratitude => "Gratitude",
            Emotion::Confusion => "Confusion",
            Emotion::Hope => "Hope",
            Emotion::Loneliness => "Loneliness",
        }
    }

    /// Check a selection: at most `MAX_EMOTIONS`, no repeats
    pub fn validate_selection(emotions: &[Emotion]) -> Result<()> {
        if emotions.len() > MAX_EMOTIONS {
            return Err(Error::InvalidEmotions(format!(
                "at most {} allowed, got {}",
                MAX_EMOTIONS,
                emotions.len()
            )));
        }

        for (i, emotion) in emotions.iter().enumerate() {
            if emotions[..i].contains(emotion) {
                return Err(Error::InvalidEmotions(format!("{} selected twice", emotion)));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .iter()
            .copied()
            .find(|emotion| emotion.id() == wanted)
            .ok_or_else(|| Error::InvalidEmotions(format!("unknown emotion {:?}", s)))
    }
}
