//! Data models for gift recommendations.
//! Defines the gift request form, the chat-style request body, suggestions
//! and the response envelope returned by `/api/chat`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Who the gift is for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Partner,
    Friend,
    Family,
    Colleague,
    Other,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Partner,
        Relation::Friend,
        Relation::Family,
        Relation::Colleague,
        Relation::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Partner => "Partner",
            Relation::Friend => "Friend",
            Relation::Family => "Family",
            Relation::Colleague => "Colleague",
            Relation::Other => "Other",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relation::ALL
            .iter()
            .copied()
            .find(|relation| relation.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown relation '{}', expected one of: Partner, Friend, Family, Colleague, Other",
                    s
                )
            })
    }
}

/// The gift form as submitted by the user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GiftRequest {
    pub target: Relation,
    pub relation_detail: String,
    pub budget: u32, // TWD
    pub interests: String,
    pub taboos: String,
}

impl GiftRequest {
    /// Render the form as the free-text user message sent inside the chat envelope.
    pub fn to_message(&self) -> String {
        format!(
            "Target: {}\nDetails: {}\nBudget: {} TWD\nInterests: {}\nTaboos: {}",
            self.target, self.relation_detail, self.budget, self.interests, self.taboos
        )
    }

    /// Wrap the form as a single user message, the shape the frontend posts.
    pub fn to_chat_envelope(&self) -> ChatEnvelope {
        ChatEnvelope {
            messages: vec![ChatMessage::user(self.to_message())],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatEnvelope {
    pub messages: Vec<ChatMessage>,
}

/// Request body of `POST /api/chat`, resolved once at the boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum RecommendationBody {
    /// A `{ messages: [...] }` envelope whose last message carries text content.
    /// Only that content is kept; earlier messages are never inspected.
    Chat(String),
    /// Anything else; the whole value becomes the user message.
    Opaque(Value),
}

impl RecommendationBody {
    pub fn from_value(value: Value) -> Self {
        let last_content = value
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.last())
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match last_content {
            Some(content) => RecommendationBody::Chat(content),
            None => RecommendationBody::Opaque(value),
        }
    }

    /// The text forwarded to the model: the last message's content, or the
    /// compact JSON serialization of the whole body.
    pub fn user_message(&self) -> String {
        match self {
            RecommendationBody::Chat(content) => content.clone(),
            RecommendationBody::Opaque(value) => value.to_string(),
        }
    }
}

/// Price as returned by the model, either a number or free text like "NT$1,200".
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Price {
    Amount(serde_json::Number),
    Text(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(n) => write!(f, "{}", n),
            Price::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub name: String,
    pub price: Price,
    pub reason: String,
    pub shopping_tips: String,
}

/// Body of every `/api/chat` response.
///
/// `suggestions` holds whatever JSON the model produced, unvalidated; see
/// [`ResponseEnvelope::outcome`] for the typed view used by clients.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn suggestions(value: Value) -> Self {
        ResponseEnvelope {
            suggestions: Some(value),
            ..Default::default()
        }
    }

    /// Model answered, but not with JSON. Keeps the raw text for the caller.
    pub fn unparsed(raw: impl Into<String>, error: impl Into<String>) -> Self {
        ResponseEnvelope {
            suggestions: Some(Value::Array(Vec::new())),
            raw: Some(raw.into()),
            error: Some(error.into()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ResponseEnvelope {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Classify the envelope the way the presentation layer must render it.
    pub fn outcome(&self) -> Outcome {
        if let Some(Value::Array(items)) = &self.suggestions {
            if !items.is_empty() {
                if let Ok(parsed) = serde_json::from_value::<Vec<Suggestion>>(Value::Array(items.clone())) {
                    return Outcome::Suggestions(parsed);
                }
            }
        }
        match &self.error {
            Some(error) if !error.is_empty() => Outcome::Error(error.clone()),
            _ => Outcome::Empty,
        }
    }
}

/// What a client should show for a given envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Suggestions(Vec<Suggestion>),
    Error(String),
    Empty,
}
