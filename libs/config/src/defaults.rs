//! Default values shared by the configuration structs and their consumers

/// Name shown in `Info` responses
pub const PROCESS_NAME: &str = "AO Process (Rust)";

/// Inbound raw message bound (bytes)
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Encoded response bound (bytes)
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Longest accepted store key (bytes)
pub const MAX_KEY_LEN: usize = 64;

/// Longest accepted store value (bytes)
pub const MAX_VALUE_LEN: usize = 1000;

/// Global function a script must define to receive messages
pub const ENTRY_POINT: &str = "handle";

/// Interpreter heap limit (bytes)
pub const SCRIPT_MEMORY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Default log filter
pub const LOG_LEVEL: &str = "info";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "AO";

/// Separator between nested sections in environment variable names
pub const ENV_SEPARATOR: &str = "__";
