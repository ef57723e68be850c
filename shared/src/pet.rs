//! Pet progression rules.
//!
//! Everything here is pure: callers load a pet row, apply an action to a
//! [`PetVitals`] value at a given instant, and persist the result. Gauges are
//! clamped to `0..=GAUGE_MAX` and coin to `0..=COIN_CAP` on every write.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use time::{Duration, OffsetDateTime};

use crate::constants::codes;

pub const BASE_XP: i64 = 100;
pub const MAX_LEVEL: i32 = 50;
pub const GAUGE_MAX: i32 = 100;
pub const COIN_CAP: i32 = 9999;
pub const DEFAULT_SPECIES: &str = "cat";
pub const SLEEP_DURATION: Duration = Duration::hours(1);

pub const PET_COIN_REWARD: i32 = 1;
pub const FEED_COIN_REWARD: i32 = 2;
pub const WAKE_COIN_REWARD: i32 = 5;
pub const BATH_COIN_REWARD: i32 = 8;
pub const BOUNCE_COIN_REWARD: i32 = 10;

pub const BATH_ENERGY_COST: i32 = 10;
pub const BOUNCE_ENERGY_COST: i32 = 15;

const WAKE_HUNGER_DRAIN: i32 = 20;
const WAKE_CLEANLINESS_DRAIN: i32 = 10;
const WAKE_SAD_HUNGER_THRESHOLD: i32 = 10;
const BOUNCE_HAPPINESS_GAIN: i32 = 15;
const BOUNCE_CLEANLINESS_DRAIN: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgeStage {
    Infant,
    Teen,
    Adult,
}

impl AgeStage {
    pub fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=15 => AgeStage::Infant,
            16..=35 => AgeStage::Teen,
            _ => AgeStage::Adult,
        }
    }
}

impl TryFrom<String> for AgeStage {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PetMood {
    Happy,
    Excited,
    Sleepy,
    Sad,
    Hungry,
    Neutral,
}

impl TryFrom<String> for PetMood {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Cumulative experience needed to reach `level`.
pub fn xp_required_for_level(level: i32) -> i64 {
    if level <= 1 {
        return 0;
    }
    // floor(BASE * i * 1.5) kept in integer arithmetic
    (1..level as i64).map(|i| BASE_XP * i * 3 / 2).sum()
}

pub fn level_for_experience(experience: i64) -> i32 {
    let mut level = 1;
    while level < MAX_LEVEL && experience >= xp_required_for_level(level + 1) {
        level += 1;
    }
    level
}

pub fn calculate_level_from_xp(experience: i64) -> (i32, AgeStage) {
    let level = level_for_experience(experience);
    (level, AgeStage::from_level(level))
}

fn clamp_gauge(value: i32) -> i32 {
    value.clamp(0, GAUGE_MAX)
}

fn clamp_coin(value: i32) -> i32 {
    value.clamp(0, COIN_CAP)
}

fn minutes_until(until: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let millis = (until - now).whole_milliseconds().max(0) as i64;
    (millis + 59_999) / 60_000
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetRuleError {
    Sleeping { remaining_minutes: i64 },
    AlreadySleeping { remaining_minutes: i64 },
    NotSleeping,
    SleepNotCompleted { remaining_minutes: i64 },
    InsufficientEnergy { required: i32, current: i32 },
}

impl PetRuleError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sleeping { .. } => codes::PET_SLEEPING,
            Self::AlreadySleeping { .. } => codes::PET_ALREADY_SLEEPING,
            Self::NotSleeping => codes::PET_NOT_SLEEPING,
            Self::SleepNotCompleted { .. } => codes::SLEEP_NOT_COMPLETED,
            Self::InsufficientEnergy { .. } => codes::INSUFFICIENT_ENERGY,
        }
    }
}

impl std::fmt::Display for PetRuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sleeping { remaining_minutes } => {
                write!(f, "Your pet is sleeping. Try again in {} minute(s)", remaining_minutes)
            }
            Self::AlreadySleeping { remaining_minutes } => {
                write!(f, "Your pet is already asleep for another {} minute(s)", remaining_minutes)
            }
            Self::NotSleeping => write!(f, "Your pet is not sleeping"),
            Self::SleepNotCompleted { remaining_minutes } => {
                write!(f, "Your pet needs {} more minute(s) of sleep", remaining_minutes)
            }
            Self::InsufficientEnergy { required, current } => {
                write!(f, "Not enough energy: requires {}, pet has {}", required, current)
            }
        }
    }
}

impl std::error::Error for PetRuleError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodEffect {
    pub hunger_fill: i32,
    pub xp_gain: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reward {
    pub money: i32,
    pub experience: i32,
    pub hunger: i32,
}

/// The mutable state of a pet that the rules operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetVitals {
    pub level: i32,
    pub experience: i32,
    pub age_stage: AgeStage,
    pub mood: PetMood,
    pub coin: i32,
    pub energy: i32,
    pub hunger: i32,
    pub cleanliness: i32,
    pub happiness: i32,
    pub sleep_until: Option<OffsetDateTime>,
}

impl PetVitals {
    pub fn hatchling() -> Self {
        Self {
            level: 1,
            experience: 0,
            age_stage: AgeStage::Infant,
            mood: PetMood::Neutral,
            coin: 0,
            energy: GAUGE_MAX,
            hunger: 50,
            cleanliness: GAUGE_MAX,
            happiness: 50,
            sleep_until: None,
        }
    }

    fn ensure_awake(&self, now: OffsetDateTime) -> Result<(), PetRuleError> {
        match self.sleep_until {
            Some(until) if until > now => Err(PetRuleError::Sleeping {
                remaining_minutes: minutes_until(until, now),
            }),
            _ => Ok(()),
        }
    }

    fn ensure_energy(&self, required: i32) -> Result<(), PetRuleError> {
        if self.energy < required {
            return Err(PetRuleError::InsufficientEnergy { required, current: self.energy });
        }
        Ok(())
    }

    pub fn add_coin(&mut self, amount: i32) {
        self.coin = clamp_coin(self.coin.saturating_add(amount));
    }

    pub fn spend_coin(&mut self, amount: i32) -> bool {
        if amount < 0 || self.coin < amount {
            return false;
        }
        self.coin -= amount;
        true
    }

    pub fn add_experience(&mut self, amount: i32) {
        self.experience = self.experience.saturating_add(amount.max(0));
    }

    /// Re-derives level and age stage from experience. Returns `false` when
    /// nothing changed so callers can skip the write.
    pub fn update_level(&mut self) -> bool {
        let (level, age_stage) = calculate_level_from_xp(self.experience as i64);
        if level == self.level && age_stage == self.age_stage {
            return false;
        }
        self.level = level;
        self.age_stage = age_stage;
        true
    }

    pub fn pet(&mut self, now: OffsetDateTime) -> Result<(), PetRuleError> {
        self.ensure_awake(now)?;
        self.add_coin(PET_COIN_REWARD);
        self.happiness = clamp_gauge(self.happiness + 1);
        self.energy = clamp_gauge(self.energy - 1);
        self.mood = PetMood::Happy;
        Ok(())
    }

    /// Applies a meal. Inventory bookkeeping is the caller's job.
    pub fn feed(&mut self, food: FoodEffect, now: OffsetDateTime) -> Result<bool, PetRuleError> {
        self.ensure_awake(now)?;
        self.hunger = clamp_gauge(self.hunger.saturating_add(food.hunger_fill));
        self.add_experience(food.xp_gain);
        self.add_coin(FEED_COIN_REWARD);
        self.mood = PetMood::Happy;
        Ok(self.update_level())
    }

    pub fn sleep(&mut self, now: OffsetDateTime) -> Result<OffsetDateTime, PetRuleError> {
        if let Some(until) = self.sleep_until.filter(|until| *until > now) {
            return Err(PetRuleError::AlreadySleeping {
                remaining_minutes: minutes_until(until, now),
            });
        }
        let until = now + SLEEP_DURATION;
        self.sleep_until = Some(until);
        self.mood = PetMood::Sleepy;
        Ok(until)
    }

    pub fn wake(&mut self, now: OffsetDateTime) -> Result<(), PetRuleError> {
        let until = self.sleep_until.ok_or(PetRuleError::NotSleeping)?;
        if now < until {
            return Err(PetRuleError::SleepNotCompleted {
                remaining_minutes: minutes_until(until, now),
            });
        }
        self.sleep_until = None;
        self.energy = GAUGE_MAX;
        self.add_coin(WAKE_COIN_REWARD);
        self.hunger = clamp_gauge(self.hunger - WAKE_HUNGER_DRAIN);
        self.cleanliness = clamp_gauge(self.cleanliness - WAKE_CLEANLINESS_DRAIN);
        self.mood = if self.hunger <= WAKE_SAD_HUNGER_THRESHOLD {
            PetMood::Sad
        } else {
            PetMood::Excited
        };
        Ok(())
    }

    pub fn bath(&mut self, now: OffsetDateTime) -> Result<(), PetRuleError> {
        self.ensure_awake(now)?;
        self.ensure_energy(BATH_ENERGY_COST)?;
        self.cleanliness = GAUGE_MAX;
        self.add_coin(BATH_COIN_REWARD);
        self.energy = clamp_gauge(self.energy - BATH_ENERGY_COST);
        Ok(())
    }

    pub fn bounce(&mut self, now: OffsetDateTime) -> Result<(), PetRuleError> {
        self.ensure_awake(now)?;
        self.ensure_energy(BOUNCE_ENERGY_COST)?;
        self.add_coin(BOUNCE_COIN_REWARD);
        self.happiness = clamp_gauge(self.happiness + BOUNCE_HAPPINESS_GAIN);
        self.energy = clamp_gauge(self.energy - BOUNCE_ENERGY_COST);
        self.cleanliness = clamp_gauge(self.cleanliness - BOUNCE_CLEANLINESS_DRAIN);
        Ok(())
    }

    /// Credits a quest reward and re-derives the level.
    pub fn apply_reward(&mut self, reward: Reward) -> bool {
        self.add_coin(reward.money.max(0));
        self.add_experience(reward.experience);
        self.hunger = clamp_gauge(self.hunger.saturating_add(reward.hunger.max(0)));
        self.update_level()
    }

    pub fn stats(&self, now: OffsetDateTime) -> PetStatsView {
        let percent = |gauge: i32| (gauge as i64 * 100 / GAUGE_MAX as i64) as i32;
        let (xp_progress_percent, next_level_xp) = if self.level >= MAX_LEVEL {
            (100, None)
        } else {
            let next = xp_required_for_level(self.level + 1);
            let progress = (self.experience as i64 * 100 / next).min(100) as i32;
            (progress, Some(next))
        };
        let sleep_remaining_minutes = self
            .sleep_until
            .filter(|until| *until > now)
            .map(|until| minutes_until(until, now));

        PetStatsView {
            level: self.level,
            experience: self.experience,
            age_stage: self.age_stage,
            mood: self.mood,
            coin: self.coin,
            energy_percent: percent(self.energy),
            hunger_percent: percent(self.hunger),
            cleanliness_percent: percent(self.cleanliness),
            happiness_percent: percent(self.happiness),
            xp_progress_percent,
            next_level_xp,
            is_sleeping: sleep_remaining_minutes.is_some(),
            sleep_remaining_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetStatsView {
    pub level: i32,
    pub experience: i32,
    pub age_stage: AgeStage,
    pub mood: PetMood,
    pub coin: i32,
    pub energy_percent: i32,
    pub hunger_percent: i32,
    pub cleanliness_percent: i32,
    pub happiness_percent: i32,
    pub xp_progress_percent: i32,
    pub next_level_xp: Option<i64>,
    pub is_sleeping: bool,
    pub sleep_remaining_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn in_bounds(pet: &PetVitals) -> bool {
        [pet.energy, pet.hunger, pet.cleanliness, pet.happiness]
            .iter()
            .all(|g| (0..=GAUGE_MAX).contains(g))
            && (0..=COIN_CAP).contains(&pet.coin)
    }

    #[test]
    fn test_xp_requirements() {
        assert_eq!(xp_required_for_level(1), 0);
        assert_eq!(xp_required_for_level(2), 150);
        assert_eq!(xp_required_for_level(3), 450);
        assert_eq!(xp_required_for_level(4), 900);
    }

    #[test]
    fn test_level_bands_and_monotonicity() {
        let mut previous = 1;
        for xp in (0..250_000).step_by(97) {
            let (level, stage) = calculate_level_from_xp(xp);
            assert!((1..=MAX_LEVEL).contains(&level));
            assert!(level >= previous);
            assert_eq!(stage, AgeStage::from_level(level));
            previous = level;
        }
        assert_eq!(level_for_experience(149), 1);
        assert_eq!(level_for_experience(150), 2);
        assert_eq!(level_for_experience(i64::MAX / 4), MAX_LEVEL);
        assert_eq!(AgeStage::from_level(15), AgeStage::Infant);
        assert_eq!(AgeStage::from_level(16), AgeStage::Teen);
        assert_eq!(AgeStage::from_level(36), AgeStage::Adult);
    }

    #[test]
    fn test_update_level_is_idempotent() {
        let mut pet = PetVitals::hatchling();
        pet.experience = xp_required_for_level(20) as i32;
        assert!(pet.update_level());
        assert_eq!(pet.level, 20);
        assert_eq!(pet.age_stage, AgeStage::Teen);
        assert!(!pet.update_level());
    }

    #[test]
    fn test_feed_clamps_hunger() {
        let mut pet = PetVitals::hatchling();
        pet.hunger = 95;
        pet.feed(FoodEffect { hunger_fill: 20, xp_gain: 10 }, NOW).unwrap();
        assert_eq!(pet.hunger, 100);
        assert_eq!(pet.experience, 10);
        assert_eq!(pet.coin, FEED_COIN_REWARD);
    }

    #[test]
    fn test_feed_levels_up() {
        let mut pet = PetVitals::hatchling();
        let leveled = pet.feed(FoodEffect { hunger_fill: 5, xp_gain: 200 }, NOW).unwrap();
        assert!(leveled);
        assert_eq!(pet.level, 2);
    }

    #[test]
    fn test_sleep_then_early_wake_fails() {
        let mut pet = PetVitals::hatchling();
        let until = pet.sleep(NOW).unwrap();
        assert_eq!(pet.mood, PetMood::Sleepy);

        match pet.wake(NOW + Duration::minutes(10)) {
            Err(PetRuleError::SleepNotCompleted { remaining_minutes }) => assert_eq!(remaining_minutes, 50),
            other => panic!("unexpected {:?}", other),
        }
        match pet.wake(NOW + Duration::seconds(3599)) {
            Err(PetRuleError::SleepNotCompleted { remaining_minutes }) => assert_eq!(remaining_minutes, 1),
            other => panic!("unexpected {:?}", other),
        }

        pet.wake(until).unwrap();
        assert_eq!(pet.sleep_until, None);
        assert_eq!(pet.energy, GAUGE_MAX);
    }

    #[test]
    fn test_sleep_guards() {
        let mut pet = PetVitals::hatchling();
        assert_eq!(pet.wake(NOW), Err(PetRuleError::NotSleeping));
        pet.sleep(NOW).unwrap();
        assert!(matches!(pet.sleep(NOW), Err(PetRuleError::AlreadySleeping { .. })));
        assert!(matches!(pet.pet(NOW), Err(PetRuleError::Sleeping { .. })));
        assert!(matches!(pet.bath(NOW), Err(PetRuleError::Sleeping { .. })));
        assert!(matches!(
            pet.feed(FoodEffect { hunger_fill: 1, xp_gain: 1 }, NOW),
            Err(PetRuleError::Sleeping { .. })
        ));
    }

    #[test]
    fn test_expired_sleep_does_not_block_actions() {
        let mut pet = PetVitals::hatchling();
        pet.sleep_until = Some(NOW - Duration::minutes(5));
        assert!(pet.pet(NOW).is_ok());
        pet.sleep(NOW).unwrap();
    }

    #[test]
    fn test_wake_mood_depends_on_hunger() {
        let mut pet = PetVitals::hatchling();
        pet.hunger = 25;
        pet.sleep_until = Some(NOW);
        pet.wake(NOW).unwrap();
        assert_eq!(pet.hunger, 5);
        assert_eq!(pet.mood, PetMood::Sad);

        pet.hunger = 80;
        pet.cleanliness = 4;
        pet.sleep_until = Some(NOW);
        pet.wake(NOW).unwrap();
        assert_eq!(pet.mood, PetMood::Excited);
        assert_eq!(pet.cleanliness, 0);
    }

    #[test]
    fn test_minigame_energy_requirements() {
        let mut pet = PetVitals::hatchling();
        pet.energy = 9;
        assert_eq!(
            pet.bath(NOW),
            Err(PetRuleError::InsufficientEnergy { required: BATH_ENERGY_COST, current: 9 })
        );
        pet.energy = 14;
        assert!(matches!(pet.bounce(NOW), Err(PetRuleError::InsufficientEnergy { .. })));

        pet.energy = 15;
        pet.cleanliness = 3;
        pet.bounce(NOW).unwrap();
        assert_eq!(pet.energy, 0);
        assert_eq!(pet.cleanliness, 0);
        assert_eq!(pet.coin, BOUNCE_COIN_REWARD);
    }

    #[test]
    fn test_coin_cap() {
        let mut pet = PetVitals::hatchling();
        pet.coin = COIN_CAP - 3;
        pet.energy = 100;
        pet.bath(NOW).unwrap();
        assert_eq!(pet.coin, COIN_CAP);
        pet.apply_reward(Reward { money: 500, experience: 0, hunger: 0 });
        assert_eq!(pet.coin, COIN_CAP);
    }

    #[test]
    fn test_gauges_stay_in_bounds_over_action_sequences() {
        let mut pet = PetVitals::hatchling();
        let mut now = NOW;
        for step in 0..500 {
            now += Duration::minutes(7);
            let _ = match step % 6 {
                0 => pet.pet(now),
                1 => pet.feed(FoodEffect { hunger_fill: 37, xp_gain: 55 }, now).map(|_| ()),
                2 => pet.bath(now),
                3 => pet.bounce(now),
                4 => pet.sleep(now).map(|_| ()),
                _ => pet.wake(now + Duration::hours(2)),
            };
            assert!(in_bounds(&pet), "out of bounds at step {}: {:?}", step, pet);
            assert_eq!(pet.level, level_for_experience(pet.experience as i64));
        }
    }

    #[test]
    fn test_stats_view() {
        let mut pet = PetVitals::hatchling();
        pet.experience = 75;
        pet.sleep_until = Some(NOW + Duration::seconds(61));
        let view = pet.stats(NOW);
        assert_eq!(view.xp_progress_percent, 50);
        assert_eq!(view.next_level_xp, Some(150));
        assert!(view.is_sleeping);
        assert_eq!(view.sleep_remaining_minutes, Some(2));

        pet.experience = xp_required_for_level(MAX_LEVEL) as i32;
        pet.update_level();
        let view = pet.stats(NOW + Duration::hours(1));
        assert_eq!(view.xp_progress_percent, 100);
        assert_eq!(view.next_level_xp, None);
        assert!(!view.is_sleeping);
    }

    #[test]
    fn test_spend_coin() {
        let mut pet = PetVitals::hatchling();
        pet.coin = 10;
        assert!(!pet.spend_coin(11));
        assert!(pet.spend_coin(10));
        assert_eq!(pet.coin, 0);
    }
}
