use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The default pokemon API.
pub const DEFAULT_URL: &str = "https://pokeapi.co/api/v2/";

/// An error that happens when fetching a pokemon.
///
/// The error only carries strings so that it can be cloned out to every reader of a
/// resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// There is no pokemon with that name.
    #[error("No pokemon with the name \"{0}\"")]
    NotFound(String),
    /// The API responded with an unexpected status code.
    #[error("the server responded with status {0}")]
    Status(u16),
    /// The request could not be sent, or the response not be received.
    #[error("request failed: {0}")]
    Request(String),
    /// The response was received, but does not describe a pokemon.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// A named entry in one of the lists of a [`Pokemon`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ability {
    pub name: String,
    pub hidden: bool,
}

/// A base stat of a [`Pokemon`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub name: String,
    pub value: u32,
}

/// Everything the data view shows about a pokemon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    /// Height in decimetres.
    pub height: u32,
    /// Weight in hectograms.
    pub weight: u32,
    pub base_experience: Option<u32>,
    pub types: Vec<String>,
    pub abilities: Vec<Ability>,
    pub stats: Vec<Stat>,
    pub image: Option<String>,
    /// When this pokemon was fetched, which makes cache hits visible.
    pub fetched_at: String,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Deserialize)]
struct RawType {
    #[serde(rename = "type")]
    ty: NamedResource,
}

#[derive(Deserialize)]
struct RawAbility {
    ability: NamedResource,
    #[serde(default)]
    is_hidden: bool,
}

#[derive(Deserialize)]
struct RawStat {
    stat: NamedResource,
    base_stat: u32,
}

#[derive(Default, Deserialize)]
struct RawSprites {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct RawPokemon {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    base_experience: Option<u32>,
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default)]
    abilities: Vec<RawAbility>,
    #[serde(default)]
    stats: Vec<RawStat>,
    #[serde(default)]
    sprites: RawSprites,
}

impl RawPokemon {
    fn into_pokemon(self, fetched_at: SystemTime) -> Pokemon {
        Pokemon {
            id: self.id,
            name: self.name,
            height: self.height,
            weight: self.weight,
            base_experience: self.base_experience,
            types: self.types.into_iter().map(|t| t.ty.name).collect(),
            abilities: self
                .abilities
                .into_iter()
                .map(|a| Ability {
                    name: a.ability.name,
                    hidden: a.is_hidden,
                })
                .collect(),
            stats: self
                .stats
                .into_iter()
                .map(|s| Stat {
                    name: s.stat.name,
                    value: s.base_stat,
                })
                .collect(),
            image: self.sprites.front_default,
            fetched_at: humantime::format_rfc3339_seconds(fetched_at).to_string(),
        }
    }
}

/// Fetches pokemon from a pokeapi compatible HTTP API.
///
/// Requests are made exactly once, there is no retry.
#[derive(Clone, Debug)]
pub struct PokemonSource {
    client: reqwest::Client,
    base_url: Url,
}

impl PokemonSource {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn pokemon_url(&self, name: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Request(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["pokemon", name]);
        Ok(url)
    }

    /// Returns the operation fetching the pokemon called `name`.
    ///
    /// The returned future does not borrow from `self`, so it can be wrapped in a resource.
    pub fn fetch(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Arc<Pokemon>, FetchError>> + Send + use<> {
        let client = self.client.clone();
        let url = self.pokemon_url(name);
        let name = name.to_owned();

        async move {
            let url = url?;
            tracing::debug!(%name, %url, "Fetching pokemon");

            let response = client.get(url).send().await?;
            match response.status() {
                StatusCode::NOT_FOUND => return Err(FetchError::NotFound(name)),
                status if !status.is_success() => {
                    return Err(FetchError::Status(status.as_u16()));
                }
                _ => {}
            }

            let raw: RawPokemon = response.json().await?;
            Ok(Arc::new(raw.into_pokemon(SystemTime::now())))
        }
    }
}
