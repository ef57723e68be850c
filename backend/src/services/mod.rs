use time::{OffsetDateTime, UtcOffset};

pub mod badge_service;
pub mod flip_feel_service;
pub mod food_service;
pub mod gratitude_service;
pub mod journal_service;
pub mod mood_service;
pub mod pet_service;
pub mod quest_service;

/// Current time in the server's local offset. Calendar-day boundaries
/// (daily quests, today's check-ins) are computed in this offset.
pub fn local_now() -> OffsetDateTime {
    let offset_secs = chrono::Local::now().offset().local_minus_utc();
    let offset = UtcOffset::from_whole_seconds(offset_secs).unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset)
}
