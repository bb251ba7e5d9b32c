use crate::domain::value_objects::ids::StoryId;
use serde::{Deserialize, Serialize};

/// CEFR reading level a story is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl StoryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLevel::A1 => "A1",
            StoryLevel::A2 => "A2",
            StoryLevel::B1 => "B1",
            StoryLevel::B2 => "B2",
            StoryLevel::C1 => "C1",
            StoryLevel::C2 => "C2",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "A1" => Some(StoryLevel::A1),
            "A2" => Some(StoryLevel::A2),
            "B1" => Some(StoryLevel::B1),
            "B2" => Some(StoryLevel::B2),
            "C1" => Some(StoryLevel::C1),
            "C2" => Some(StoryLevel::C2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLength::Short => "short",
            StoryLength::Medium => "medium",
            StoryLength::Long => "long",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "short" => Some(StoryLength::Short),
            "medium" => Some(StoryLength::Medium),
            "long" => Some(StoryLength::Long),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryParameters {
    pub topic: String,
    pub level: StoryLevel,
    pub length: StoryLength,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParameters {
    pub story_id: StoryId,
    pub text: String,
    pub voice: Option<String>,
    pub segment_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParameters {
    pub story_id: StoryId,
    pub segment_index: u32,
    pub prompt: Option<String>,
}

/// Parameters that passed validation, typed per job kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobParameters {
    Story(StoryParameters),
    Audio(AudioParameters),
    Image(ImageParameters),
}

impl JobParameters {
    /// The content item these parameters refer to, when the job kind carries one.
    pub fn story_id(&self) -> Option<StoryId> {
        match self {
            JobParameters::Story(_) => None,
            JobParameters::Audio(p) => Some(p.story_id),
            JobParameters::Image(p) => Some(p.story_id),
        }
    }
}
