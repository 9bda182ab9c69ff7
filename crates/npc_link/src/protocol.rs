use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::LinkError;

/// Literal frame that asks the backend to end the session.
pub const TERMINATE_SENTINEL: &str = "_TERMINATE_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Dialogue {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        animation: Option<String>,
    },
    Action {
        command: ActionCommand,
        #[serde(default)]
        target: String,
        #[serde(default)]
        animation: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionCommand {
    Move,
    Interact,
    Other(String),
}

impl From<String> for ActionCommand {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MOVE" => ActionCommand::Move,
            "INTERACT" => ActionCommand::Interact,
            _ => ActionCommand::Other(value),
        }
    }
}

impl From<ActionCommand> for String {
    fn from(value: ActionCommand) -> Self {
        match value {
            ActionCommand::Move => "MOVE".to_string(),
            ActionCommand::Interact => "INTERACT".to_string(),
            ActionCommand::Other(other) => other,
        }
    }
}

/// One text frame from the session socket, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Frame(ServerFrame),
    /// Valid JSON whose `type` is missing or not one we handle.
    Unrecognized { kind: Option<String> },
    /// A known `type` whose fields do not decode.
    Invalid { kind: String, error: String },
    /// Not JSON at all; kept verbatim.
    Malformed(String),
}

pub fn parse_inbound(raw: &str) -> InboundFrame {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => return InboundFrame::Malformed(raw.to_string()),
    };
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind @ ("dialogue" | "action" | "error")) => kind.to_string(),
        other => {
            return InboundFrame::Unrecognized {
                kind: other.map(str::to_string),
            }
        }
    };
    match decode_json::<ServerFrame>(raw, "server frame") {
        Ok(frame) => InboundFrame::Frame(frame),
        Err(error) => InboundFrame::Invalid {
            kind,
            error: error.to_string(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    Story,
    BehaviorScript,
    Image,
}

impl UploadSlot {
    /// Upload order for a form submit.
    pub const ORDER: [UploadSlot; 3] = [
        UploadSlot::Story,
        UploadSlot::BehaviorScript,
        UploadSlot::Image,
    ];

    pub fn label(self) -> &'static str {
        match self {
            UploadSlot::Story => "Story",
            UploadSlot::BehaviorScript => "Behavior script",
            UploadSlot::Image => "Image",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitializeFiles {
    pub story_file_path: Option<String>,
    pub csharp_file_path: Option<String>,
    pub image_file_path: Option<String>,
}

impl InitializeFiles {
    pub fn set(&mut self, slot: UploadSlot, file_path: String) {
        let entry = match slot {
            UploadSlot::Story => &mut self.story_file_path,
            UploadSlot::BehaviorScript => &mut self.csharp_file_path,
            UploadSlot::Image => &mut self.image_file_path,
        };
        *entry = Some(file_path);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitializeRequest {
    pub name: String,
    pub background: String,
    pub behavior: String,
    /// Absent for a saved character; present (possibly all null) for a form submit.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub files: Option<InitializeFiles>,
}

impl InitializeRequest {
    pub fn from_form(
        name: impl Into<String>,
        background: impl Into<String>,
        behavior: impl Into<String>,
        files: InitializeFiles,
    ) -> Self {
        Self {
            name: name.into(),
            background: background.into(),
            behavior: behavior.into(),
            files: Some(files),
        }
    }

    pub fn saved(
        name: impl Into<String>,
        background: impl Into<String>,
        behavior: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            background: background.into(),
            behavior: behavior.into(),
            files: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitializeResponse {
    pub session_id: SessionId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub behavior: Option<String>,
}

impl AvatarRecord {
    pub fn new(name: &str, background: &str, behavior: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            background: Some(background.to_string()),
            behavior: Some(behavior.to_string()),
        }
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(
    raw: &str,
    what: &'static str,
) -> Result<T, LinkError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        LinkError::Decode {
            what,
            path,
            message: error.into_inner().to_string(),
        }
    })
}
