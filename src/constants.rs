/// OpenAI API endpoints
pub const OPENAI_CHAT_COMPLETIONS: &str = "https://api.openai.com/v1/chat/completions";

/// Upstream request defaults
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful, friendly chat assistant. Keep responses concise and clear.";

/// Replies and error texts
pub const PLACEHOLDER_REPLY: &str = "I couldn\u{2019}t generate a response. Please try again.";
pub const APOLOGY_REPLY: &str = "Sorry, something went wrong. Please try again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "OpenAI API key not configured. Add OPENAI_API_KEY to the environment.";

pub const CREDENTIAL_ENV_VAR: &str = "OPENAI_API_KEY";

/// HTTP routes
pub const CHAT_ROUTE: &str = "/api/chat";
