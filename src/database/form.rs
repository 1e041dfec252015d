use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::{Config, USER_FIELDS_MAX_LENGTH},
    error::Error,
    media::DecodedImage,
    schema::{Id, IngredientAmount},
    validators::{
        validate_cooking_time, validate_email, validate_ingredient_amounts, validate_recipe_name,
        validate_tag_ids, validate_text, validate_username,
    },
};

/// Turns a request payload into a validated value.
pub trait FromWire: Sized {
    type Wire: DeserializeOwned;

    fn from_wire(wire: Self::Wire, config: &Config) -> Result<Self, Error>;
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::validation(format!("Field '{field}' is required")))
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// Ingredient and tag sets that replace a recipe's current associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRelations {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
}

impl RecipeRelations {
    pub fn new(
        ingredients: Vec<IngredientAmount>,
        tags: Vec<Id>,
        config: &Config,
    ) -> Result<Self, Error> {
        validate_ingredient_amounts(&ingredients, config)?;
        validate_tag_ids(&tags)?;
        Ok(Self { ingredients, tags })
    }
}

/// `POST /recipes`: every field is required.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub relations: RecipeRelations,
}

impl FromWire for NewRecipe {
    type Wire = RecipeForm;

    fn from_wire(wire: RecipeForm, config: &Config) -> Result<Self, Error> {
        let relations = RecipeRelations::new(
            required(wire.ingredients, "ingredients")?,
            required(wire.tags, "tags")?,
            config,
        )?;

        let name = required(wire.name, "name")?;
        validate_recipe_name(&name)?;

        let text = required(wire.text, "text")?;
        validate_text("text", &text, usize::MAX)?;

        let cooking_time = required(wire.cooking_time, "cooking_time")?;
        validate_cooking_time(cooking_time, config)?;

        let image = DecodedImage::from_data_uri(&required(wire.image, "image")?)?;

        Ok(Self {
            name,
            text,
            cooking_time,
            image,
            relations,
        })
    }
}

/// `PATCH /recipes/{id}`: ingredients and tags are always replaced, the
/// remaining fields only when present.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub relations: RecipeRelations,
}

impl FromWire for RecipeChanges {
    type Wire = RecipeForm;

    fn from_wire(wire: RecipeForm, config: &Config) -> Result<Self, Error> {
        let relations = RecipeRelations::new(
            required(wire.ingredients, "ingredients")?,
            required(wire.tags, "tags")?,
            config,
        )?;

        if let Some(name) = &wire.name {
            validate_recipe_name(name)?;
        }
        if let Some(text) = &wire.text {
            validate_text("text", text, usize::MAX)?;
        }
        if let Some(cooking_time) = wire.cooking_time {
            validate_cooking_time(cooking_time, config)?;
        }
        let image = match wire.image {
            Some(image) => Some(DecodedImage::from_data_uri(&image)?),
            None => None,
        };

        Ok(Self {
            name: wire.name,
            text: wire.text,
            cooking_time: wire.cooking_time,
            image,
            relations,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserCreateForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Registration payload that passed validation; the password is still plain.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl FromWire for NewUser {
    type Wire = UserCreateForm;

    fn from_wire(wire: UserCreateForm, config: &Config) -> Result<Self, Error> {
        let email = wire.email.trim().to_lowercase();
        validate_email(&email)?;
        validate_username(&wire.username, config)?;
        validate_text("first_name", &wire.first_name, USER_FIELDS_MAX_LENGTH)?;
        validate_text("last_name", &wire.last_name, USER_FIELDS_MAX_LENGTH)?;
        validate_text("password", &wire.password, USER_FIELDS_MAX_LENGTH)?;

        Ok(Self {
            email,
            username: wire.username,
            first_name: wire.first_name,
            last_name: wire.last_name,
            password: wire.password,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetPasswordForm {
    pub new_password: String,
    pub current_password: String,
}

impl FromWire for SetPasswordForm {
    type Wire = SetPasswordForm;

    fn from_wire(wire: SetPasswordForm, _config: &Config) -> Result<Self, Error> {
        validate_text("new_password", &wire.new_password, USER_FIELDS_MAX_LENGTH)?;
        Ok(wire)
    }
}

/// Query of `GET /recipes`. `tags` may repeat, so it is read from raw pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, Error> {
        let mut query = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = Some(parse_number(&key, &value)?),
                "limit" => query.limit = Some(parse_number(&key, &value)?),
                "author" => query.author = Some(parse_number(&key, &value)?),
                "tags" => {
                    if !value.is_empty() {
                        query.tags.push(value)
                    }
                }
                "is_favorited" => query.is_favorited = parse_flag(&key, &value)?,
                "is_in_shopping_cart" => query.is_in_shopping_cart = parse_flag(&key, &value)?,
                _ => {}
            }
        }

        Ok(query)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::validation(format!("Query parameter '{key}' must be a number")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" | "" => Ok(false),
        _ => Err(Error::validation(format!(
            "Query parameter '{key}' must be 0 or 1"
        ))),
    }
}
