use serde::Deserialize;
use thiserror::Error;

use crate::config::DeckSettings;

/// Manifest shipped with the app, parsed once at startup.
pub const DECK_MANIFEST: &str = include_str!("../assets/deck.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub front_image: String,
    pub back_image: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl Card {
    /// Whether the flipped face has any text to show.
    pub fn has_back_content(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.link.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub cards: Vec<Card>,
    pub settings: DeckSettings,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("deck manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("deck manifest does not contain any cards")]
    Empty,
    #[error("card {0} has no front image")]
    MissingFront(usize),
}

#[derive(Deserialize)]
struct RawManifest {
    cards: Vec<RawCard>,
    #[serde(default)]
    settings: DeckSettings,
}

#[derive(Deserialize)]
struct RawCard {
    front_image: String,
    #[serde(default)]
    back_image: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

pub fn load_manifest() -> Result<Manifest, DataError> {
    parse_manifest(DECK_MANIFEST)
}

pub fn parse_manifest(text: &str) -> Result<Manifest, DataError> {
    let raw: RawManifest = serde_json::from_str(text)?;

    if raw.cards.is_empty() {
        return Err(DataError::Empty);
    }

    let mut cards = Vec::with_capacity(raw.cards.len());
    for (index, card) in raw.cards.into_iter().enumerate() {
        let front_image = card.front_image.trim().to_string();
        if front_image.is_empty() {
            return Err(DataError::MissingFront(index));
        }
        cards.push(Card {
            front_image,
            back_image: non_blank(card.back_image),
            title: non_blank(card.title),
            description: non_blank(card.description),
            link: non_blank(card.link),
        });
    }

    Ok(Manifest {
        cards,
        settings: raw.settings.sanitized(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
