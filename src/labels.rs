use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The seven emotion categories, in the fixed order shared by training and
/// inference. The softmax output index is meaningful only relative to this
/// ordering, so it must never be rearranged; `LabelSchema` guards against a
/// model trained with a different ordering being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }

    /// Index of this emotion in the fixed class order.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|e| e == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Emotion> {
        Self::ALL.get(index).copied()
    }

    /// Matches a dataset subdirectory name against the fixed label list.
    pub fn from_dir_name(name: &str) -> Option<Emotion> {
        Self::ALL.iter().find(|e| e.as_str() == name).copied()
    }

    /// One-hot target vector of length 7.
    pub fn one_hot(&self) -> Vec<f64> {
        let mut v = vec![0.0; Self::COUNT];
        v[self.index()] = 1.0;
        v
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current label schema version written into model artifacts.
pub const LABEL_SCHEMA_VERSION: u32 = 1;

/// Versioned label ordering stored alongside the model weights.
///
/// The schema is written at checkpoint time and validated at load time, so a
/// model trained against a different label list fails loudly instead of
/// silently producing wrong labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSchema {
    pub version: u32,
    pub labels: Vec<String>,
}

impl LabelSchema {
    /// The schema this build of the crate was compiled against.
    pub fn current() -> LabelSchema {
        LabelSchema {
            version: LABEL_SCHEMA_VERSION,
            labels: Emotion::ALL.iter().map(|e| e.as_str().to_owned()).collect(),
        }
    }

    /// Checks that a loaded schema matches the compiled-in label list exactly
    /// (same names, same order).
    pub fn validate(&self) -> Result<()> {
        if self.version != LABEL_SCHEMA_VERSION {
            return Err(Error::SchemaVersion(self.version));
        }
        let expected = LabelSchema::current();
        if self.labels != expected.labels {
            return Err(Error::SchemaMismatch {
                expected: expected.labels,
                found: self.labels.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
