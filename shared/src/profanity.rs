use rustrict::CensorStr;

#[derive(Debug)]
pub struct ProfanityFilter;

impl ProfanityFilter {
    pub fn contains_profanity(text: &str) -> bool {
        text.is_inappropriate()
    }

    pub fn validate_name(name: &str) -> Result<(), String> {
        if Self::contains_profanity(name) {
            return Err(format!("Inappropriate language detected: {}", name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_names_pass() {
        assert!(ProfanityFilter::validate_name("Biscuit").is_ok());
        assert!(ProfanityFilter::validate_name("Mochi").is_ok());
    }
}
