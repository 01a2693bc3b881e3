use chrono::{DateTime, Utc};
use uuid::Uuid;

const PREFIX: &str = "KX";
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 4;

/// `KX` + base-36 millisecond timestamp + four random base-36 characters.
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let random = Uuid::new_v4().as_u128();

    let mut out = String::with_capacity(PREFIX.len() + 9 + SUFFIX_LEN);
    out.push_str(PREFIX);
    out.push_str(&to_base36(u128::from(millis)));
    out.push_str(&to_base36_padded(random, SUFFIX_LEN));
    out
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn to_base36_padded(mut value: u128, len: usize) -> String {
    let mut digits = vec![b'0'; len];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8_lossy(&digits).into_owned()
}

pub fn normalize(tracking_number: &str) -> String {
    tracking_number.trim().to_ascii_uppercase()
}
