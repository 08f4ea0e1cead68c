//! The value handed from the fetch stage to the render stage.
//!
//! A [`TransferBlob`] is built once per id change, serialized to text, and
//! decoded again by the two display projections. It is never stored anywhere.
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::PokemonSource;
use crate::models::{Pokemon, StatSnapshot};
use crate::utils::capitalize_first;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBlob {
    /// Id the fetch was started for.
    pub id: u32,
    pub name: String,
    pub stats: StatSnapshot,
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl TransferBlob {
    pub fn from_pokemon(id: u32, pokemon: &Pokemon) -> Result<Self> {
        Ok(Self {
            id,
            name: pokemon.name().to_string(),
            stats: pokemon.stats_snapshot()?,
            image: pokemon.images().front_default().map(str::to_string),
            types: pokemon.types().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Fetch stage: id in, serialized blob out.
pub async fn fetch_blob(source: &dyn PokemonSource, id: u32) -> Result<String> {
    let pokemon = source.pokemon(id).await?;
    let blob = TransferBlob::from_pokemon(id, &pokemon)?;
    tracing::debug!(id, name = %blob.name, "built transfer blob");
    Ok(blob.to_json())
}

/// Heading text for a blob: the name with its first letter uppercased.
/// Empty when the blob cannot be decoded.
pub fn display_name(blob: &str) -> String {
    TransferBlob::from_json(blob)
        .map(|b| capitalize_first(&b.name))
        .unwrap_or_default()
}

/// Image source for a blob. `None` renders no image.
pub fn display_image(blob: &str) -> Option<String> {
    TransferBlob::from_json(blob).ok().and_then(|b| b.image)
}

/// What the front-ends put on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayFields {
    pub id: u32,
    pub name: String,
    pub image: Option<String>,
    pub stats: Option<StatSnapshot>,
    pub types: Vec<String>,
}

impl DisplayFields {
    /// Project a serialized blob through both display functions.
    pub fn from_blob(blob: &str) -> Self {
        let decoded = TransferBlob::from_json(blob).ok();
        Self {
            id: decoded.as_ref().map(|b| b.id).unwrap_or_default(),
            name: display_name(blob),
            image: display_image(blob),
            stats: decoded.as_ref().map(|b| b.stats),
            types: decoded.map(|b| b.types).unwrap_or_default(),
        }
    }

    /// Blank name and no image, shown when a fetch fails.
    pub fn fallback(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
