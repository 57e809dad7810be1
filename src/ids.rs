//! Identifier generation for templates, log entries and evidence tags.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

const ID_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub(crate) fn base36(mut value: u64) -> String {
    let mut digits = [0u8; 13];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = ID_CHARSET[(value % 36) as usize];
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits[i..].iter().map(|&b| b as char).collect()
}

pub(crate) fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

/// `BT-<millis base36>-<9 random chars>`, uppercase.
pub(crate) fn template_id(now: DateTime<Utc>) -> String {
    format!(
        "BT-{}-{}",
        base36(now.timestamp_millis().max(0) as u64),
        random_suffix(9)
    )
}

/// `FRL-<YYYYMMDD>-<millis base36><6 random chars>`.
pub(crate) fn recognition_log_id(now: DateTime<Utc>) -> String {
    format!(
        "FRL-{}-{}{}",
        now.format("%Y%m%d"),
        base36(now.timestamp_millis().max(0) as u64),
        random_suffix(6)
    )
}

pub(crate) fn evidence_id() -> String {
    format!("EVD-{}", Uuid::new_v4())
}
