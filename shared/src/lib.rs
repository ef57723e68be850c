pub mod constants;
pub mod mood;
pub mod pagination;
pub mod pet;
pub mod profanity;
pub mod quest;
pub mod rate_limit;
pub mod validation;
