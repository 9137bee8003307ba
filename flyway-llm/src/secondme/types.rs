//! SecondMe API request and response types

use serde::{Deserialize, Serialize};

/// Every SecondMe JSON response is wrapped in this envelope; `code == 0` is success.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

// ============================================================================
// CHAT TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// One `data:` frame of the chat stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

// ============================================================================
// SHADES (INTEREST TAGS)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Shade {
    #[serde(alias = "shadeName")]
    pub name: String,
}

/// The shades endpoint returns either a bare list or `{ "shades": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ShadesPayload {
    List(Vec<Shade>),
    Wrapped {
        #[serde(default)]
        shades: Vec<Shade>,
    },
}

impl ShadesPayload {
    pub fn into_names(self) -> Vec<String> {
        let shades = match self {
            ShadesPayload::List(shades) => shades,
            ShadesPayload::Wrapped { shades } => shades,
        };
        shades.into_iter().map(|s| s.name).collect()
    }
}

// ============================================================================
// OAUTH TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RefreshForm<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    7200
}
