use serde::{Deserialize, Deserializer, Serialize};

/// Tone of the generated notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Marketing,
    Developer,
}

impl Mode {
    /// Parse a wire label. Anything other than `Marketing` gets the developer style.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Marketing" => Self::Marketing,
            "Developer" => Self::Developer,
            other => {
                tracing::warn!(mode = other, "Unrecognized mode, using developer style");
                Self::Developer
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Marketing => "Marketing",
            Self::Developer => "Developer",
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Body of a note generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesRequest {
    pub prompt: String,
    pub mode: Mode,
}

impl NotesRequest {
    /// Wrap a raw diff the way the relay expects it: a JSON document with a `content` field.
    pub fn for_diff(diff: &str, mode: Mode) -> Self {
        Self {
            prompt: serde_json::json!({ "content": diff }).to_string(),
            mode,
        }
    }
}

/// Identifies one accumulator: a diff and the tone requested for it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteKey {
    pub diff_id: String,
    pub mode: Mode,
}

impl NoteKey {
    pub fn new(diff_id: impl Into<String>, mode: Mode) -> Self {
        Self {
            diff_id: diff_id.into(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffItem {
    pub id: String,
    pub description: String,
    pub diff: String,
    pub url: String,
}

/// One page of merged pull requests from the diff source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffPage {
    pub diffs: Vec<DiffItem>,
    pub next_page: Option<u32>,
    pub current_page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Seconds to wait for the upstream connection and for each upstream event
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            idle_timeout: default_idle_timeout(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key: None,
            request_timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub relay_url: String,
    pub diff_source_url: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000".to_string(),
            diff_source_url: "http://127.0.0.1:3001/api/sample-diffs".to_string(),
            per_page: default_per_page(),
            request_timeout: default_timeout(),
        }
    }
}

const fn default_timeout() -> u64 {
    600
}

const fn default_idle_timeout() -> u64 {
    60
}

const fn default_per_page() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
