/// Application name
pub const APP_NAME: &str = "DormGlide";

/// Local key-value store keys
pub const KEY_PRODUCTS: &str = "products";
pub const KEY_PREFERENCES: &str = "preferences";
pub const KEY_CURRENT_USER: &str = "current_user";
pub const KEY_CHAT_CONVERSATIONS: &str = "chat_conversations";
pub const KEY_CHAT_MESSAGES: &str = "chat_messages";
pub const KEY_USERS: &str = "users";
pub const KEY_USER_ACTIVITY: &str = "user_activity";

/// Remote table names
pub const TABLE_PRODUCTS: &str = "products";
pub const TABLE_CONVERSATIONS: &str = "conversations";
pub const TABLE_MESSAGES: &str = "messages";

/// Maximum number of images attached to a listing
pub const MAX_PRODUCT_IMAGES: usize = 5;

/// Activity caps (oldest entries are dropped)
pub const MAX_VIEW_ENTRIES: usize = 50;
pub const MAX_SEARCH_ENTRIES: usize = 30;
pub const MAX_MESSAGE_ENTRIES: usize = 200;

/// Search history kept in preferences
pub const MAX_SEARCH_HISTORY: usize = 10;

/// Default circuit-breaker cooldown for an unreachable remote backend
pub const DEFAULT_REMOTE_COOLDOWN_SECS: u64 = 30;

/// Longest accepted cooldown (one day)
pub const MAX_REMOTE_COOLDOWN_SECS: u64 = 86_400;

/// Default HTTP request timeout against the remote backend
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Realtime channel topic shared by every chat subscriber
pub const REALTIME_CHAT_TOPIC: &str = "dormglide-chat-global";

/// Realtime heartbeat interval in seconds
pub const REALTIME_HEARTBEAT_SECS: u64 = 30;

/// Fallback location when a listing omits one
pub const DEFAULT_LOCATION: &str = "Campus";
