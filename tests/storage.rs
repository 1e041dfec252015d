//! Storage tests against a real Postgres. They run only when `DATABASE_URL`
//! is set and create uniquely named rows, so they can share a database.
//! Without it every test prints a skip notice and returns.

use std::collections::HashSet;

use foodgram::{
    actions::{
        build_shopping_list, create_ingredient, create_recipe, create_tag, load_recipe_detail,
        login_user, register_user, subscribe, sync_recipe_relations, toggle_recipe_mark, unsubscribe,
        update_recipe, RecipeMark, Toggle,
    },
    config::Config,
    error::Error,
    form::{NewRecipe, NewUser, RecipeChanges, RecipeRelations},
    jwt::verify_jwt_session,
    media::DecodedImage,
    schema::{Id, IngredientAmount, User},
    shopping::ShoppingLine,
    MIGRATOR,
};
use pretty_assertions::assert_eq;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

async fn pool() -> Option<Pool<Postgres>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping storage test: DATABASE_URL is not set");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn user(pool: &Pool<Postgres>) -> User {
    let username = unique("cook");
    let new_user = NewUser {
        email: format!("{username}@example.com"),
        username,
        first_name: String::from("Ann"),
        last_name: String::from("Baker"),
        password: String::from("long-enough-pass"),
    };
    register_user(&new_user, pool).await.unwrap()
}

fn amounts(pairs: &[(Id, i32)]) -> Vec<IngredientAmount> {
    pairs
        .iter()
        .map(|&(id, amount)| IngredientAmount { id, amount })
        .collect()
}

async fn recipe(
    author: &User,
    ingredients: &[(Id, i32)],
    tags: &[Id],
    config: &Config,
    pool: &Pool<Postgres>,
) -> Id {
    let new_recipe = NewRecipe {
        name: unique("Pancakes"),
        text: String::from("Mix and fry."),
        cooking_time: 15,
        image: DecodedImage {
            extension: "png",
            bytes: vec![0x89],
        },
        relations: RecipeRelations::new(amounts(ingredients), tags.to_vec(), config).unwrap(),
    };
    create_recipe(author.id, &new_recipe, "recipes/images/test.png", config, pool)
        .await
        .unwrap()
}

async fn relation_sets(id: Id, pool: &Pool<Postgres>) -> (HashSet<(Id, i32)>, HashSet<Id>) {
    let detail = load_recipe_detail(id, None, pool).await.unwrap();
    (
        detail
            .ingredients
            .iter()
            .map(|part| (part.ingredient_id, part.amount))
            .collect(),
        detail.tags.iter().map(|tag| tag.id).collect(),
    )
}

#[tokio::test]
async fn created_recipe_reads_back_its_associations() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let author = user(&pool).await;
    let flour = create_ingredient(&unique("flour"), "g", &pool).await.unwrap();
    let milk = create_ingredient(&unique("milk"), "ml", &pool).await.unwrap();
    let breakfast = create_tag(&unique("Breakfast"), "#E26C2D", &unique("breakfast"), &pool)
        .await
        .unwrap();
    let sweet = create_tag(&unique("Sweet"), "#49B64E", &unique("sweet"), &pool)
        .await
        .unwrap();

    let id = recipe(
        &author,
        &[(flour.id, 10), (milk.id, 5)],
        &[breakfast.id, sweet.id],
        &config,
        &pool,
    )
    .await;

    let (ingredients, tags) = relation_sets(id, &pool).await;
    assert_eq!(ingredients, HashSet::from([(flour.id, 10), (milk.id, 5)]));
    assert_eq!(tags, HashSet::from([breakfast.id, sweet.id]));
}

#[tokio::test]
async fn failed_update_keeps_previous_associations() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let author = user(&pool).await;
    let flour = create_ingredient(&unique("flour"), "g", &pool).await.unwrap();
    let tag = create_tag(&unique("Lunch"), "#8775D2", &unique("lunch"), &pool)
        .await
        .unwrap();
    let id = recipe(&author, &[(flour.id, 10)], &[tag.id], &config, &pool).await;

    let changes = RecipeChanges {
        name: Some(String::from("Renamed")),
        text: None,
        cooking_time: None,
        image: None,
        relations: RecipeRelations::new(amounts(&[(i32::MAX, 3)]), vec![tag.id], &config)
            .unwrap(),
    };
    let result = update_recipe(id, &changes, None, &config, &pool).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let detail = load_recipe_detail(id, None, &pool).await.unwrap();
    assert_ne!(detail.recipe.name, "Renamed");
    let (ingredients, tags) = relation_sets(id, &pool).await;
    assert_eq!(ingredients, HashSet::from([(flour.id, 10)]));
    assert_eq!(tags, HashSet::from([tag.id]));
}

#[tokio::test]
async fn abandoned_sync_is_rolled_back() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let author = user(&pool).await;
    let flour = create_ingredient(&unique("flour"), "g", &pool).await.unwrap();
    let sugar = create_ingredient(&unique("sugar"), "g", &pool).await.unwrap();
    let tag = create_tag(&unique("Dinner"), "#FF0000", &unique("dinner"), &pool)
        .await
        .unwrap();
    let id = recipe(&author, &[(flour.id, 10)], &[tag.id], &config, &pool).await;

    {
        let mut tr = pool.begin().await.unwrap();
        let relations = RecipeRelations::new(amounts(&[(sugar.id, 1)]), vec![tag.id], &config)
            .unwrap();
        sync_recipe_relations(id, &relations, &config, &mut *tr)
            .await
            .unwrap();
        // dropped without commit
    }

    let (ingredients, _) = relation_sets(id, &pool).await;
    assert_eq!(ingredients, HashSet::from([(flour.id, 10)]));
}

#[tokio::test]
async fn shopping_list_sums_matching_ingredients() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let author = user(&pool).await;
    let shopper = user(&pool).await;
    let salt = create_ingredient(&unique("Salt"), "g", &pool).await.unwrap();
    let tag = create_tag(&unique("Soup"), "#00FF00", &unique("soup"), &pool)
        .await
        .unwrap();

    let first = recipe(&author, &[(salt.id, 10)], &[tag.id], &config, &pool).await;
    let second = recipe(&author, &[(salt.id, 5)], &[tag.id], &config, &pool).await;
    for id in [first, second] {
        toggle_recipe_mark(shopper.id, id, RecipeMark::ShoppingCart, Toggle::Add, &pool)
            .await
            .unwrap();
    }

    let list = build_shopping_list(shopper.id, &pool).await.unwrap();
    assert_eq!(
        list.lines(),
        vec![ShoppingLine {
            name: salt.name.clone(),
            measurement_unit: String::from("g"),
            amount: 15,
        }]
    );
    assert!(list.render().contains(&format!("{} - 15, g", salt.name)));
}

#[tokio::test]
async fn favorites_reject_repeated_adds_and_missing_removes() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let author = user(&pool).await;
    let fan = user(&pool).await;
    let flour = create_ingredient(&unique("flour"), "g", &pool).await.unwrap();
    let tag = create_tag(&unique("Bake"), "#0000FF", &unique("bake"), &pool)
        .await
        .unwrap();
    let id = recipe(&author, &[(flour.id, 1)], &[tag.id], &config, &pool).await;

    toggle_recipe_mark(fan.id, id, RecipeMark::Favorite, Toggle::Add, &pool)
        .await
        .unwrap();
    let again = toggle_recipe_mark(fan.id, id, RecipeMark::Favorite, Toggle::Add, &pool).await;
    assert!(matches!(again, Err(Error::Validation(_))));

    toggle_recipe_mark(fan.id, id, RecipeMark::Favorite, Toggle::Remove, &pool)
        .await
        .unwrap();
    let missing = toggle_recipe_mark(fan.id, id, RecipeMark::Favorite, Toggle::Remove, &pool).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn subscriptions_are_never_to_oneself_and_never_doubled() {
    let Some(pool) = pool().await else { return };

    let follower = user(&pool).await;
    let author = user(&pool).await;

    assert!(matches!(
        subscribe(follower.id, follower.id, &pool).await,
        Err(Error::Validation(_))
    ));

    subscribe(follower.id, author.id, &pool).await.unwrap();
    assert!(matches!(
        subscribe(follower.id, author.id, &pool).await,
        Err(Error::Validation(_))
    ));

    unsubscribe(follower.id, author.id, &pool).await.unwrap();
    assert!(matches!(
        unsubscribe(follower.id, author.id, &pool).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn login_issues_a_token_for_the_user() {
    let Some(pool) = pool().await else { return };
    let config = Config::default();

    let cook = user(&pool).await;
    let token = login_user(&cook.email, "long-enough-pass", &config, &pool)
        .await
        .unwrap();
    let session = verify_jwt_session(&token, &config).unwrap();
    assert_eq!(session.user_id, cook.id);
    assert_eq!(session.username, cook.username);

    let wrong = login_user(&cook.email, "not-the-password", &config, &pool).await;
    assert!(matches!(wrong, Err(Error::Validation(_))));
}
