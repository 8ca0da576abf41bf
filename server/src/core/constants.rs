// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "RinTrack";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "rintrack";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".rintrack";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "rintrack.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "RINTRACK_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "RINTRACK_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "RINTRACK_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "RINTRACK_LOG";

/// Environment variable selecting `production` or `development`
pub const ENV_ENVIRONMENT: &str = "RINTRACK_ENV";

/// Public origin of the web client, used for CORS and checkout redirects
pub const ENV_SITE_DOMAIN: &str = "RINTRACK_SITE_DOMAIN";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default web client origin
pub const DEFAULT_SITE_DOMAIN: &str = "http://localhost:5173";

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "RINTRACK_DATA_DIR";

/// Environment variable to override the SQLite database file
pub const ENV_DB_PATH: &str = "RINTRACK_DB_PATH";

// =============================================================================
// Authentication
// =============================================================================

/// Environment variable for the HS256 session signing secret
pub const ENV_SESSION_SECRET: &str = "RINTRACK_SESSION_SECRET";

/// Environment variable for the identity provider project id
pub const ENV_FIREBASE_PROJECT_ID: &str = "RINTRACK_FIREBASE_PROJECT_ID";

/// Environment variable overriding the ID token JWKS endpoint
pub const ENV_JWKS_URL: &str = "RINTRACK_JWKS_URL";

/// Cookie name for session token
pub const SESSION_COOKIE_NAME: &str = "rin_session";

/// Session lifetime in days (cookie max-age and token expiry)
pub const SESSION_TTL_DAYS: i64 = 7;

/// Login requires an ID token whose sign-in happened within this window
pub const MAX_ASSERTION_AGE_SECS: i64 = 5 * 60;

/// Minimum session secret length in bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Published signing keys for identity provider ID tokens
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// ID token issuer prefix; the project id is appended
pub const ID_TOKEN_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// How long fetched signing keys are trusted before a refresh
pub const JWKS_CACHE_TTL_SECS: u64 = 60 * 60;

/// Minimum gap between forced refreshes triggered by an unknown key id
pub const JWKS_MIN_REFRESH_SECS: u64 = 30;

/// Generic body for every authentication failure
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized Access!";

// =============================================================================
// Payments
// =============================================================================

/// Environment variable for the Stripe secret key
pub const ENV_STRIPE_SECRET_KEY: &str = "RINTRACK_STRIPE_SECRET_KEY";

/// Environment variable overriding the Stripe API base URL
pub const ENV_STRIPE_API_BASE: &str = "RINTRACK_STRIPE_API_BASE";

/// Stripe REST API base URL
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Checkout currency
pub const CHECKOUT_CURRENCY: &str = "usd";

/// Placeholder the processor substitutes with the real session id
pub const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Maximum accepted length of a checkout session id
pub const MAX_SESSION_ID_LENGTH: usize = 256;

/// Metadata key linking a checkout session to a loan application
pub const METADATA_APPLICATION_ID: &str = "loanApplicationId";

/// Metadata key carrying the borrower email
pub const METADATA_BORROWER: &str = "borrower";

/// Outbound HTTP timeout for processor and key endpoints
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "rintrack.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Request Body Limits
// =============================================================================

/// Default body limit for general API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Body limit for auth endpoints (64 KB)
pub const AUTH_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Listing
// =============================================================================

/// Default page size for the user directory
pub const DEFAULT_USERS_PAGE_SIZE: u32 = 5;

/// Maximum page size for paginated listings
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
