pub const PET_NAME_MAX_LENGTH: usize = 30;
pub const JOURNAL_TITLE_MAX_LENGTH: usize = 200;
pub const JOURNAL_CONTENT_MAX_LENGTH: usize = 20_000;
pub const GRATITUDE_MAX_LENGTH: usize = 2_000;
pub const MOOD_NOTE_MAX_LENGTH: usize = 500;
pub const JOURNAL_MOOD_MAX_LENGTH: usize = 50;
pub const QUEST_NAME_MAX_LENGTH: usize = 100;
pub const QUEST_DESCRIPTION_MAX_LENGTH: usize = 500;
pub const FLIP_FEEL_TEXT_MAX_LENGTH: usize = 300;
pub const MIN_FLIP_FEEL_CHOICES: usize = 2;
pub const MAX_FOOD_PURCHASE_QUANTITY: i32 = 99;

pub const INVALID_PET_NAME_ERROR: &str = "Pet name must be between 1 and 30 characters";
pub const INAPPROPRIATE_NAME_ERROR: &str = "Please choose a different name";
pub const EMPTY_TEXT_ERROR: &str = "Text must not be empty";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Machine-readable codes carried in every response envelope.
pub mod codes {
    pub const OK: &str = "OK";
    pub const CREATED: &str = "CREATED";

    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

    pub const PET_NOT_FOUND: &str = "PET_NOT_FOUND";
    pub const PET_ALREADY_EXISTS: &str = "PET_ALREADY_EXISTS";
    pub const INVALID_PET_NAME: &str = "INVALID_PET_NAME";
    pub const PET_SLEEPING: &str = "PET_SLEEPING";
    pub const PET_ALREADY_SLEEPING: &str = "PET_ALREADY_SLEEPING";
    pub const PET_NOT_SLEEPING: &str = "PET_NOT_SLEEPING";
    pub const SLEEP_NOT_COMPLETED: &str = "SLEEP_NOT_COMPLETED";
    pub const INSUFFICIENT_ENERGY: &str = "INSUFFICIENT_ENERGY";
    pub const INSUFFICIENT_COINS: &str = "INSUFFICIENT_COINS";

    pub const FOOD_NOT_FOUND: &str = "FOOD_NOT_FOUND";
    pub const FOOD_NOT_IN_INVENTORY: &str = "FOOD_NOT_IN_INVENTORY";

    pub const QUEST_NOT_FOUND: &str = "QUEST_NOT_FOUND";
    pub const QUEST_NOT_OWNED: &str = "QUEST_NOT_OWNED";
    pub const QUEST_ALREADY_CLAIMED: &str = "QUEST_ALREADY_CLAIMED";
    pub const QUEST_EXPIRED: &str = "QUEST_EXPIRED";
    pub const QUEST_NOT_COMPLETE: &str = "QUEST_NOT_COMPLETE";

    pub const ENTRY_NOT_FOUND: &str = "ENTRY_NOT_FOUND";
    pub const QUESTION_NOT_FOUND: &str = "QUESTION_NOT_FOUND";
    pub const CHOICE_NOT_FOUND: &str = "CHOICE_NOT_FOUND";
    pub const DUPLICATE_QUESTION: &str = "DUPLICATE_QUESTION";
    pub const DUPLICATE_RESPONSE: &str = "DUPLICATE_RESPONSE";
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
    pub const SESSION_FINISHED: &str = "SESSION_FINISHED";
}
