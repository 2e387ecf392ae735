use std::fmt;

/// Coarse sentiment bucket of a mood label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    High,
    Neutral,
    Low,
}

const HIGH_KEYWORDS: &[&str] = &["happy", "loved", "excited", "cool", "ecstatic"];
const LOW_KEYWORDS: &[&str] = &[
    "sad", "annoyed", "stressed", "sick", "furious", "angry", "frustrated", "bad", "terrible",
];

/// Stroke/fill colour pair used to draw a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub stroke: &'static str,
    pub fill: &'static str,
}

impl Tone {
    /// 2 for high, 1 for neutral, 0 for low.
    pub fn score(self) -> u8 {
        match self {
            Tone::High => 2,
            Tone::Neutral => 1,
            Tone::Low => 0,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Tone::High => Palette { stroke: "#2F6B4F", fill: "#CFE9DA" },
            Tone::Low => Palette { stroke: "#9B5B3F", fill: "#F3D4C8" },
            Tone::Neutral => Palette { stroke: "#8A7F73", fill: "#EFE7DD" },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::High => "high",
            Tone::Neutral => "neutral",
            Tone::Low => "low",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a label by case-insensitive keyword substrings. High keywords are
/// checked before low ones; anything unmatched is neutral.
pub fn mood_tone(label: &str) -> Tone {
    let label = label.to_lowercase();
    if HIGH_KEYWORDS.iter().any(|k| label.contains(k)) {
        Tone::High
    } else if LOW_KEYWORDS.iter().any(|k| label.contains(k)) {
        Tone::Low
    } else {
        Tone::Neutral
    }
}

pub fn mood_score(label: &str) -> u8 {
    mood_tone(label).score()
}
