//! Slide content store.
//!
//! The deck is a declarative table of slide records. The built-in deck is
//! materialized once per process; alternative decks can be read from JSON.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One slide's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub title: String,
    pub highlight: String,
    pub bullets: Vec<String>,
}

/// A slide record paired with its positional identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// `slide-<1-based position>`
    pub id: String,
    pub record: SlideRecord,
}

impl Slide {
    /// Badge text shown on the panel, e.g. `#3`.
    pub fn badge(&self) -> String {
        self.id.replace("slide-", "#")
    }
}

/// Identifier for the slide at a 0-based position.
pub fn slide_id(index: usize) -> String {
    format!("slide-{}", index + 1)
}

/// An ordered deck with its header text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub slides: Vec<SlideRecord>,
}

impl Deck {
    /// Load a deck from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Deck(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Parse a deck from a JSON string. A deck must contain at least one slide.
    pub fn from_json(raw: &str) -> Result<Self> {
        let deck: Deck = serde_json::from_str(raw).map_err(|e| Error::Deck(e.to_string()))?;
        if deck.slides.is_empty() {
            return Err(Error::Deck("deck has no slides".to_string()));
        }
        Ok(deck)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Slides with their positional identifiers, in deck order.
    pub fn identified(&self) -> Vec<Slide> {
        self.slides
            .iter()
            .enumerate()
            .map(|(index, record)| Slide {
                id: slide_id(index),
                record: record.clone(),
            })
            .collect()
    }
}

fn record(title: &str, highlight: &str, bullets: [&str; 3]) -> SlideRecord {
    SlideRecord {
        title: title.to_string(),
        highlight: highlight.to_string(),
        bullets: bullets.iter().map(|b| b.to_string()).collect(),
    }
}

static DEFAULT_DECK: Lazy<Deck> = Lazy::new(|| Deck {
    title: "English Literature in Practical Life".to_string(),
    subtitle: "Five concise slides illustrating everyday benefits.".to_string(),
    slides: vec![
        record(
            "Interpreting People",
            "Analytical empathy sharpens workplace relationships",
            [
                "Literary analysis teaches us to read between the lines of conversations.",
                "Complex characters mirror diverse personalities we meet daily.",
                "Recognizing tone and subtext reduces miscommunication.",
            ],
        ),
        record(
            "Critical Thinking",
            "Argument evaluation prepares us for fast decisions",
            [
                "Plot reasoning trains us to spot faulty assumptions and bias.",
                "Comparing themes builds structured problem-solving habits.",
                "Evidence-driven interpretations transfer to data-driven roles.",
            ],
        ),
        record(
            "Communication Skills",
            "Vocabulary depth boosts clarity and persuasion",
            [
                "Exposure to nuanced diction expands expressive range.",
                "Narrative cadence inspires engaging presentations and emails.",
                "Metaphors and storytelling make technical ideas memorable.",
            ],
        ),
        record(
            "Cultural Intelligence",
            "Stories cultivate respect for global perspectives",
            [
                "Historical contexts explain modern social dynamics.",
                "Diverse voices highlight unseen assumptions in teams.",
                "Empathy with distant lives powers inclusive leadership.",
            ],
        ),
        record(
            "Personal Resilience",
            "Character journeys model resilience strategies",
            [
                "Literary conflicts normalize setbacks and adaptations.",
                "Reflective reading builds emotional vocabulary for stress.",
                "Role models from fiction inspire purposeful growth.",
            ],
        ),
    ],
});

/// The built-in deck.
pub fn default_deck() -> &'static Deck {
    &DEFAULT_DECK
}
