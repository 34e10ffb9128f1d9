use std::time::Duration;

pub const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_API_KEY: &str = "placeholder-key";

pub const REST_PATH: &str = "rest/v1";
pub const REALTIME_PATH: &str = "realtime/v1/websocket";
pub const REALTIME_PROTOCOL_VSN: &str = "1.0.0";
pub const REALTIME_SCHEMA: &str = "public";

pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_PREFER: &str = "prefer";
pub const PREFER_RETURN_REPRESENTATION: &str = "return=representation";
pub const PREFER_COUNT_EXACT: &str = "count=exact";
pub const ACCEPT_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub const PGRST_SINGLE_OBJECT_CODE: &str = "PGRST116";
pub const PG_INSUFFICIENT_PRIVILEGE_CODE: &str = "42501";
pub const PG_UNDEFINED_TABLE_CODE: &str = "42P01";
pub const PGRST_SCHEMA_CACHE_MISS_CODE: &str = "PGRST205";

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
