#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use noter_core::{Config, EntryDraft, ManualClock, Noter};
use noter_db::Database;

pub struct Harness {
    pub noter: Noter,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
    ));
    let noter = Noter::with_database(db, &Config::for_tests(), clock.clone()).expect("noter");
    Harness { noter, clock }
}

pub fn draft(title: &str, ttl_days: u32, is_public: bool) -> EntryDraft {
    EntryDraft {
        title: title.to_string(),
        body: format!("body of {title}"),
        ttl_days,
        is_public,
    }
}
