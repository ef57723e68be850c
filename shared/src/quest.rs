use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use time::{Duration, OffsetDateTime, Time};
use uuid::Uuid;

use crate::constants::codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuestStatus {
    Pending,
    Complete,
    Claimed,
    Expired,
}

impl TryFrom<String> for QuestStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuestRewardType {
    Standard,
    Food,
}

impl TryFrom<String> for QuestRewardType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestClaimError {
    NotFound,
    NotOwned,
    AlreadyClaimed,
    Expired,
    NotComplete,
}

impl QuestClaimError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => codes::QUEST_NOT_FOUND,
            Self::NotOwned => codes::QUEST_NOT_OWNED,
            Self::AlreadyClaimed => codes::QUEST_ALREADY_CLAIMED,
            Self::Expired => codes::QUEST_EXPIRED,
            Self::NotComplete => codes::QUEST_NOT_COMPLETE,
        }
    }
}

impl std::fmt::Display for QuestClaimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::NotFound => "Quest not found",
            Self::NotOwned => "This quest belongs to another user",
            Self::AlreadyClaimed => "Quest reward has already been claimed",
            Self::Expired => "Quest has expired",
            Self::NotComplete => "Quest is not complete yet",
        };
        f.write_str(message)
    }
}

impl std::error::Error for QuestClaimError {}

/// Checks whether a user quest may be claimed by `requester`. Status checks
/// run in the order the errors are documented: ownership first, then the
/// terminal states, then completion.
pub fn check_claimable(
    requester: Uuid,
    owner_id: Uuid,
    status: QuestStatus,
    expires_at: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<(), QuestClaimError> {
    if requester != owner_id {
        return Err(QuestClaimError::NotOwned);
    }
    match status {
        QuestStatus::Claimed => Err(QuestClaimError::AlreadyClaimed),
        QuestStatus::Expired => Err(QuestClaimError::Expired),
        QuestStatus::Pending => Err(QuestClaimError::NotComplete),
        QuestStatus::Complete if now > expires_at => Err(QuestClaimError::Expired),
        QuestStatus::Complete => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// Calendar day containing `now`, in `now`'s offset. `end` is 23:59:59.999.
pub fn day_bounds(now: OffsetDateTime) -> DayBounds {
    let start = now.replace_time(Time::MIDNIGHT);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    DayBounds { start, end }
}

/// Daily quests from `today` that have no user quest yet, in input order.
pub fn missing_daily_quests(today: &[Uuid], existing: &[Uuid]) -> Vec<Uuid> {
    let existing: HashSet<&Uuid> = existing.iter().collect();
    let mut seen = HashSet::new();
    today
        .iter()
        .filter(|id| !existing.contains(id) && seen.insert(**id))
        .copied()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuestStatusCounts {
    pub total: usize,
    pub pending: usize,
    pub complete: usize,
    pub claimed: usize,
    pub expired: usize,
}

impl QuestStatusCounts {
    pub fn tally<I: IntoIterator<Item = QuestStatus>>(statuses: I) -> Self {
        statuses.into_iter().fold(Self::default(), |mut counts, status| {
            counts.total += 1;
            match status {
                QuestStatus::Pending => counts.pending += 1,
                QuestStatus::Complete => counts.complete += 1,
                QuestStatus::Claimed => counts.claimed += 1,
                QuestStatus::Expired => counts.expired += 1,
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_claim_rules() {
        let owner = Uuid::new_v4();
        let now = datetime!(2024-05-01 10:00 UTC);
        let expires = datetime!(2024-05-01 23:59:59.999 UTC);

        assert_eq!(
            check_claimable(owner, owner, QuestStatus::Pending, expires, now),
            Err(QuestClaimError::NotComplete)
        );
        assert_eq!(
            check_claimable(owner, owner, QuestStatus::Claimed, expires, now),
            Err(QuestClaimError::AlreadyClaimed)
        );
        assert_eq!(
            check_claimable(owner, owner, QuestStatus::Expired, expires, now),
            Err(QuestClaimError::Expired)
        );
        assert_eq!(
            check_claimable(Uuid::new_v4(), owner, QuestStatus::Complete, expires, now),
            Err(QuestClaimError::NotOwned)
        );
        assert_eq!(check_claimable(owner, owner, QuestStatus::Complete, expires, now), Ok(()));
        assert_eq!(
            check_claimable(owner, owner, QuestStatus::Complete, expires, datetime!(2024-05-02 00:00 UTC)),
            Err(QuestClaimError::Expired)
        );
    }

    #[test]
    fn test_claim_is_not_repeatable() {
        let owner = Uuid::new_v4();
        let now = datetime!(2024-05-01 10:00 UTC);
        let expires = day_bounds(now).end;
        let mut status = QuestStatus::Complete;

        assert!(check_claimable(owner, owner, status, expires, now).is_ok());
        status = QuestStatus::Claimed;
        assert_eq!(
            check_claimable(owner, owner, status, expires, now),
            Err(QuestClaimError::AlreadyClaimed)
        );
    }

    #[test]
    fn test_day_bounds() {
        let bounds = day_bounds(datetime!(2024-05-01 17:42:10 +02:00));
        assert_eq!(bounds.start, datetime!(2024-05-01 00:00 +02:00));
        assert_eq!(bounds.end, datetime!(2024-05-01 23:59:59.999 +02:00));
    }

    #[test]
    fn test_lazy_instantiation_creates_each_quest_once() {
        let today: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut existing: Vec<Uuid> = Vec::new();

        let first = missing_daily_quests(&today, &existing);
        assert_eq!(first, today);
        existing.extend(first);

        assert!(missing_daily_quests(&today, &existing).is_empty());
    }

    #[test]
    fn test_missing_skips_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(missing_daily_quests(&[a, b, a], &[b]), vec![a]);
    }

    #[test]
    fn test_status_tally() {
        let counts = QuestStatusCounts::tally([
            QuestStatus::Pending,
            QuestStatus::Pending,
            QuestStatus::Complete,
            QuestStatus::Claimed,
        ]);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.complete, 1);
        assert_eq!(counts.claimed, 1);
        assert_eq!(counts.expired, 0);
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!("complete".parse::<QuestStatus>().unwrap(), QuestStatus::Complete);
        assert_eq!(QuestStatus::Claimed.as_ref(), "claimed");
        assert!(QuestStatus::try_from("done".to_string()).is_err());
    }
}
