//! Mock pronunciation and emotion analysis used until the real analysis
//! service is wired in. Produces a random score after a fixed delay

use log::debug;
use rand::Rng;
use serde::Serialize;
use std::{path::Path, time::Duration};

/// Artificial delay before the analysis completes
pub const ANALYSIS_DELAY: Duration = Duration::from_millis(1500);

/// Lowest possible score
pub const MIN_SCORE: u8 = 70;
/// Highest possible score
pub const MAX_SCORE: u8 = 100;

/// Emotion detected while speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionType {
    Neutral,
    Happy,
    Confused,
    Frustrated,
}

impl EmotionType {
    /// Short label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            EmotionType::Neutral => "calm",
            EmotionType::Happy => "confident",
            EmotionType::Confused => "confused",
            EmotionType::Frustrated => "frustrated",
        }
    }

    /// Encouraging tip matching the emotion
    pub fn tip(&self) -> &'static str {
        match self {
            EmotionType::Neutral => "Stay focused, keep going!",
            EmotionType::Happy => "Great job, you're doing really well!",
            EmotionType::Confused => {
                "Is this part tricky? Let's slow down and try once more."
            }
            EmotionType::Frustrated => {
                "Don't give up, you've worked hard. Take a deep breath."
            }
        }
    }
}

/// Emotion along with its presentation text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emotion {
    #[serde(rename = "type")]
    pub ty: EmotionType,
    pub label: &'static str,
    pub tip: &'static str,
}

impl From<EmotionType> for Emotion {
    fn from(ty: EmotionType) -> Self {
        Self {
            ty,
            label: ty.label(),
            tip: ty.tip(),
        }
    }
}

/// Result of analyzing a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub score: u8,
    pub emotion: Emotion,
    pub feedback: &'static str,
}

/// Analyzes the recording at the provided path. The file isn't read, the
/// result is random
///
/// ## Arguments
/// * `file_path` - Path of the recording
pub async fn analyze_audio(file_path: &Path) -> AnalysisResult {
    debug!("Analyzing recording: {}", file_path.display());
    tokio::time::sleep(ANALYSIS_DELAY).await;
    analyze_with_rng(&mut rand::thread_rng())
}

/// Creates an analysis result from the provided random source
pub fn analyze_with_rng<R: Rng>(rng: &mut R) -> AnalysisResult {
    let score: u8 = rng.gen_range(MIN_SCORE..=MAX_SCORE);

    // Low scores lean towards negative emotions
    let ty = if score < 80 {
        if rng.gen_bool(0.5) {
            EmotionType::Confused
        } else {
            EmotionType::Frustrated
        }
    } else if rng.gen_bool(0.3) {
        EmotionType::Happy
    } else {
        EmotionType::Neutral
    };

    AnalysisResult {
        score,
        emotion: Emotion::from(ty),
        feedback: feedback(score, ty),
    }
}

/// Feedback text for the score and detected emotion
pub fn feedback(score: u8, emotion: EmotionType) -> &'static str {
    if score >= 90 {
        return "Excellent pronunciation, just like a news anchor!";
    }
    if score >= 80 {
        return "Nice pronunciation, pay a little more attention to the tones.";
    }
    match emotion {
        EmotionType::Frustrated => {
            "No worries, these words are hard. Let's read them piece by piece."
        }
        EmotionType::Confused => "Let's slow down and listen to the example again first.",
        _ => "Keep it up, listen to the example a few more times and try again.",
    }
}
