use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::{Config, EMAIL_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, USER_FIELDS_MAX_LENGTH},
    error::Error,
    schema::{Id, IngredientAmount},
};

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());
static USERNAME_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]$").unwrap());
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub fn validate_username(username: &str, config: &Config) -> Result<(), Error> {
    if username.is_empty() {
        return Err(Error::validation("Username may not be blank"));
    }
    if username.chars().count() > USER_FIELDS_MAX_LENGTH {
        return Err(Error::validation(format!(
            "Username may not be longer than {USER_FIELDS_MAX_LENGTH} characters"
        )));
    }

    let lowered = username.to_lowercase();
    if config.forbidden_usernames.iter().any(|name| *name == lowered) {
        return Err(Error::validation(format!("Username '{username}' is not allowed")));
    }

    if !USERNAME_PATTERN.is_match(username) {
        let mut invalid: Vec<String> = vec![];
        for c in username.chars() {
            let c = c.to_string();
            if !USERNAME_CHAR.is_match(&c) && !invalid.contains(&c) {
                invalid.push(c);
            }
        }
        return Err(Error::validation(format!(
            "Username contains invalid characters: {}",
            invalid.join(", ")
        )));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), Error> {
    if email.len() > EMAIL_MAX_LENGTH {
        return Err(Error::validation(format!(
            "Email may not be longer than {EMAIL_MAX_LENGTH} characters"
        )));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(Error::validation("Enter a valid email address"));
    }
    Ok(())
}

/// Bounded, non-blank text field.
pub fn validate_text(field: &str, value: &str, max_length: usize) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("Field '{field}' may not be blank")));
    }
    if value.chars().count() > max_length {
        return Err(Error::validation(format!(
            "Field '{field}' may not be longer than {max_length} characters"
        )));
    }
    Ok(())
}

pub fn validate_recipe_name(name: &str) -> Result<(), Error> {
    validate_text("name", name, RECIPE_NAME_MAX_LENGTH)
}

pub fn validate_cooking_time(cooking_time: i32, config: &Config) -> Result<(), Error> {
    if cooking_time < config.min_cooking_time || cooking_time > config.max_cooking_time {
        return Err(Error::validation(format!(
            "Cooking time must be between {} and {} minutes",
            config.min_cooking_time, config.max_cooking_time
        )));
    }
    Ok(())
}

pub fn validate_ingredient_amounts(
    ingredients: &[IngredientAmount],
    config: &Config,
) -> Result<(), Error> {
    if ingredients.is_empty() {
        return Err(Error::validation("A recipe needs at least one ingredient"));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for part in ingredients {
        if part.amount <= 0 {
            return Err(Error::validation("Amount must be greater than zero"));
        }
        if part.amount < config.min_amount || part.amount > config.max_amount {
            return Err(Error::validation(format!(
                "Amount must be between {} and {}",
                config.min_amount, config.max_amount
            )));
        }
        if !seen.insert(part.id) {
            return Err(Error::validation(format!(
                "Ingredient {} is listed more than once",
                part.id
            )));
        }
    }

    Ok(())
}

pub fn validate_tag_ids(tags: &[Id]) -> Result<(), Error> {
    if tags.is_empty() {
        return Err(Error::validation("A recipe needs at least one tag"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    for id in tags {
        if !seen.insert(*id) {
            return Err(Error::validation(format!("Tag {id} is listed more than once")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: Id, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[test]
    fn conforming_usernames_are_accepted() {
        let config = Config::default();
        for name in ["chef", "anna.k", "bob_42", "x+y@z-w", "Мария"] {
            assert!(validate_username(name, &config).is_ok(), "{name}");
        }
    }

    #[test]
    fn forbidden_usernames_are_rejected_case_insensitively() {
        let config = Config::default();
        assert!(validate_username("me", &config).is_err());
        assert!(validate_username("ME", &config).is_err());
        assert!(validate_username("Subscriptions", &config).is_err());
    }

    #[test]
    fn invalid_characters_are_listed_once() {
        let config = Config::default();
        match validate_username("bad name!!", &config) {
            Err(Error::Validation(info)) => {
                assert_eq!(info, "Username contains invalid characters:  , !")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn overlong_username_is_rejected() {
        let config = Config::default();
        let name = "a".repeat(USER_FIELDS_MAX_LENGTH + 1);
        assert!(validate_username(&name, &config).is_err());
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("cook@example.com").is_ok());
        assert!(validate_email("cook@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        let config = Config::default();
        assert!(validate_ingredient_amounts(&[part(1, 0)], &config).is_err());
        assert!(validate_ingredient_amounts(&[part(1, -3)], &config).is_err());
        assert!(validate_ingredient_amounts(&[part(1, 1)], &config).is_ok());
    }

    #[test]
    fn amounts_respect_configured_maximum() {
        let config = Config {
            max_amount: 100,
            ..Config::default()
        };
        assert!(validate_ingredient_amounts(&[part(1, 100)], &config).is_ok());
        assert!(validate_ingredient_amounts(&[part(1, 101)], &config).is_err());
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let config = Config::default();
        let result = validate_ingredient_amounts(&[part(1, 10), part(2, 5), part(1, 3)], &config);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn empty_relations_are_rejected() {
        let config = Config::default();
        assert!(validate_ingredient_amounts(&[], &config).is_err());
        assert!(validate_tag_ids(&[]).is_err());
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        assert!(validate_tag_ids(&[1, 2]).is_ok());
        assert!(validate_tag_ids(&[1, 2, 1]).is_err());
    }

    #[test]
    fn cooking_time_bounds() {
        let config = Config::default();
        assert!(validate_cooking_time(0, &config).is_err());
        assert!(validate_cooking_time(1, &config).is_ok());
        assert!(validate_cooking_time(config.max_cooking_time + 1, &config).is_err());
    }
}
