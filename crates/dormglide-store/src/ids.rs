//! Identifiers for records created while offline.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `local_<unix-millis>_<8 random base36 chars>`; the prefix makes
/// device-only records recognisable.
pub fn generate_local_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("local_{}_{}", Utc::now().timestamp_millis(), suffix)
}
