//! Application constants and configuration defaults.

/// Default REST API base URL of the parking backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:1313/api/";

/// Default base URL of the AI prediction / report chat service.
pub const DEFAULT_AI_BASE_URL: &str = "http://localhost:5001/api/";

/// Default URL of the realtime event server.
pub const DEFAULT_REALTIME_URL: &str = "http://localhost:1313";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default HTTP connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// First reconnect delay in milliseconds.
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound for the reconnect delay in milliseconds.
pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Reconnect attempts before the realtime client gives up.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// Realtime connect timeout in seconds.
pub const DEFAULT_REALTIME_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Name of the cookie carrying the refresh credential.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Application directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "parkwatch";
