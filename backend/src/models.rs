use mindpet_shared::pet::{AgeStage, FoodEffect, PetMood, PetStatsView, PetVitals};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

pub const PET_COLUMNS: &str = "id, name, species, level, experience, age_stage, mood, coin, \
     energy, hunger, cleanliness, happiness, sleep_until, last_interaction_at, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub level: i32,
    pub experience: i32,
    #[sqlx(try_from = "String")]
    pub age_stage: AgeStage,
    #[sqlx(try_from = "String")]
    pub mood: PetMood,
    pub coin: i32,
    pub energy: i32,
    pub hunger: i32,
    pub cleanliness: i32,
    pub happiness: i32,
    pub sleep_until: Option<OffsetDateTime>,
    pub last_interaction_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Pet {
    pub fn vitals(&self) -> PetVitals {
        PetVitals {
            level: self.level,
            experience: self.experience,
            age_stage: self.age_stage,
            mood: self.mood,
            coin: self.coin,
            energy: self.energy,
            hunger: self.hunger,
            cleanliness: self.cleanliness,
            happiness: self.happiness,
            sleep_until: self.sleep_until,
        }
    }

    /// Copies mutated vitals back and stamps the interaction time.
    pub fn apply(&mut self, vitals: PetVitals, now: OffsetDateTime) {
        self.level = vitals.level;
        self.experience = vitals.experience;
        self.age_stage = vitals.age_stage;
        self.mood = vitals.mood;
        self.coin = vitals.coin;
        self.energy = vitals.energy;
        self.hunger = vitals.hunger;
        self.cleanliness = vitals.cleanliness;
        self.happiness = vitals.happiness;
        self.sleep_until = vitals.sleep_until;
        self.last_interaction_at = now;
    }

    pub fn to_response(&self, now: OffsetDateTime) -> PetResponse {
        PetResponse {
            id: self.id,
            name: self.name.clone(),
            species: self.species.clone(),
            stats: self.vitals().stats(now),
            last_interaction_at: self.last_interaction_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PetResponse {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    #[serde(flatten)]
    pub stats: PetStatsView,
    #[serde(with = "time::serde::rfc3339")]
    pub last_interaction_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub hunger_fill: i32,
    pub xp_gain: i32,
    pub is_active: bool,
}

impl Food {
    pub fn effect(&self) -> FoodEffect {
        FoodEffect {
            hunger_fill: self.hunger_fill,
            xp_gain: self.xp_gain,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InventoryEntry {
    pub food_id: Uuid,
    pub name: String,
    pub description: String,
    pub hunger_fill: i32,
    pub xp_gain: i32,
    pub quantity: i32,
}
