use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    schema::{Id, Recipe, RecipeDetail, RecipePart, SubscriptionDetail, Tag, User, UserProfile},
};

/// Shapes a loaded value for a response body.
pub trait ToWire {
    type Wire: Serialize;

    fn to_wire(self, config: &Config) -> Self::Wire;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRead {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl ToWire for UserProfile {
    type Wire = UserRead;

    fn to_wire(self, _config: &Config) -> UserRead {
        UserRead {
            email: self.user.email,
            id: self.user.id,
            username: self.user.username,
            first_name: self.user.first_name,
            last_name: self.user.last_name,
            is_subscribed: self.is_subscribed,
        }
    }
}

/// Response to a registration; never carries the password.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserCreated {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl ToWire for User {
    type Wire = UserCreated;

    fn to_wire(self, _config: &Config) -> UserCreated {
        UserCreated {
            email: self.email,
            id: self.id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientInRecipe {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for IngredientInRecipe {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecipeRead {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<IngredientInRecipe>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl ToWire for RecipeDetail {
    type Wire = RecipeRead;

    fn to_wire(self, config: &Config) -> RecipeRead {
        RecipeRead {
            id: self.recipe.id,
            tags: self.tags,
            author: self.author.to_wire(config),
            ingredients: self.ingredients.into_iter().map(Into::into).collect(),
            is_favorited: self.is_favorited,
            is_in_shopping_cart: self.is_in_shopping_cart,
            name: self.recipe.name,
            image: config.media_link(&self.recipe.image),
            text: self.recipe.text,
            cooking_time: self.recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecipeShort {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ToWire for Recipe {
    type Wire = RecipeShort;

    fn to_wire(self, config: &Config) -> RecipeShort {
        RecipeShort {
            id: self.id,
            name: self.name,
            image: config.media_link(&self.image),
            cooking_time: self.cooking_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub author: UserRead,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

impl ToWire for SubscriptionDetail {
    type Wire = SubscriptionRead;

    fn to_wire(self, config: &Config) -> SubscriptionRead {
        SubscriptionRead {
            author: self.author.to_wire(config),
            recipes: self
                .recipes
                .into_iter()
                .map(|recipe| recipe.to_wire(config))
                .collect(),
            recipes_count: self.recipes_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenRead {
    pub auth_token: String,
}
