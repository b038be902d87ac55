//! Integration tests for week plan and meal slot queries.

use sqlx::PgPool;

use diet_db::models::{Food, MealKind, MealKindSet};
use diet_db::queries::foods::{self, NewFood};
use diet_db::queries::ingredients;
use diet_db::queries::plans::{self, NewMealSlot, NewWeekPlan};
use diet_test_utils::{create_test_db, drop_test_db};

async fn seed_food(pool: &PgPool, name: &str) -> Food {
    let all: MealKindSet = MealKind::ALL.into();
    foods::insert_food(
        pool,
        &NewFood {
            name,
            allowed_meal_kinds: &all,
            ingredient_ids: &[],
        },
    )
    .await
    .expect("insert_food should succeed")
}

fn full_week(year: i32, week_number: i32, food: &Food) -> NewWeekPlan {
    let slots = (1..=7)
        .flat_map(|day| {
            MealKind::ALL.into_iter().map(move |meal_kind| NewMealSlot {
                day_of_week: day,
                meal_kind,
                food_id: food.id,
            })
        })
        .collect();
    NewWeekPlan {
        year,
        week_number,
        slots,
    }
}

#[tokio::test]
async fn insert_week_plan_stores_all_slots() {
    let (pool, db_name) = create_test_db().await;
    let food = seed_food(&pool, "porridge").await;

    let plan = plans::insert_week_plan(&pool, &full_week(2025, 10, &food))
        .await
        .unwrap()
        .expect("first insert should succeed");

    assert_eq!(plan.year, 2025);
    assert_eq!(plan.week_number, 10);
    assert_eq!(plan.slots.len(), 21);
    assert_eq!(plan.slots[0].day_of_week, 1);
    assert_eq!(plan.slots[0].meal_kind, MealKind::Breakfast);
    assert_eq!(plan.slots[2].meal_kind, MealKind::Dinner);
    assert_eq!(plan.slots[20].day_of_week, 7);

    for slot in &plan.slots {
        assert_eq!(slot.food_id, food.id);
        assert_eq!(slot.base_food_id, Some(food.id));
        assert_eq!(slot.food_name, "porridge");
        assert!(slot.manual_food_id.is_none());
        assert!(!slot.is_leftover);
        assert!(slot.leftover_source_id.is_none());
    }

    assert!(plans::week_plan_exists(&pool, 2025, 10).await.unwrap());
    assert!(!plans::week_plan_exists(&pool, 2025, 11).await.unwrap());
    assert!(foods::food_in_use(&pool, food.id).await.unwrap());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_week_returns_none_and_keeps_original() {
    let (pool, db_name) = create_test_db().await;
    let first = seed_food(&pool, "first").await;
    let second = seed_food(&pool, "second").await;

    plans::insert_week_plan(&pool, &full_week(2025, 10, &first))
        .await
        .unwrap()
        .expect("first insert should succeed");

    let dup = plans::insert_week_plan(&pool, &full_week(2025, 10, &second))
        .await
        .unwrap();
    assert!(dup.is_none());

    let stored = plans::get_week_plan(&pool, 2025, 10)
        .await
        .unwrap()
        .expect("plan should exist");
    assert_eq!(stored.slots.len(), 21);
    assert!(stored.slots.iter().all(|s| s.food_id == first.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn get_week_plan_returns_none_for_missing_week() {
    let (pool, db_name) = create_test_db().await;

    assert!(plans::get_week_plan(&pool, 1999, 1).await.unwrap().is_none());
    assert!(plans::list_week_plans(&pool).await.unwrap().is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_meal_slot_keeps_base_food() {
    let (pool, db_name) = create_test_db().await;
    let original = seed_food(&pool, "original").await;
    let manual = seed_food(&pool, "manual").await;

    let plan = plans::insert_week_plan(&pool, &full_week(2025, 10, &original))
        .await
        .unwrap()
        .unwrap();

    let mut slot = plan.slot(3, MealKind::Lunch).unwrap().clone();
    slot.food_id = manual.id;
    slot.manual_food_id = Some(manual.id);
    slot.base_food_id = None;
    plans::update_meal_slot(&pool, &slot).await.unwrap();

    let stored = plans::get_meal_slot(&pool, slot.id)
        .await
        .unwrap()
        .expect("slot should exist");
    assert_eq!(stored.food_id, manual.id);
    assert_eq!(stored.food_name, "manual");
    assert_eq!(stored.manual_food_id, Some(manual.id));
    assert_eq!(stored.base_food_id, Some(original.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn leftover_link_persists() {
    let (pool, db_name) = create_test_db().await;
    let food = seed_food(&pool, "soup").await;

    let plan = plans::insert_week_plan(&pool, &full_week(2025, 10, &food))
        .await
        .unwrap()
        .unwrap();
    let source = plan.slot(1, MealKind::Dinner).unwrap();
    let mut target = plan.slot(2, MealKind::Dinner).unwrap().clone();
    target.is_leftover = true;
    target.leftover_source_id = Some(source.id);
    plans::update_meal_slot(&pool, &target).await.unwrap();

    let reloaded = plans::get_week_plan(&pool, 2025, 10).await.unwrap().unwrap();
    let stored = reloaded.slot(2, MealKind::Dinner).unwrap();
    assert!(stored.is_leftover);
    assert_eq!(stored.leftover_source_id, Some(source.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn grocery_ingredients_are_distinct_and_sorted() {
    let (pool, db_name) = create_test_db().await;

    let salt = ingredients::insert_ingredient(&pool, "salt").await.unwrap();
    let flour = ingredients::insert_ingredient(&pool, "flour").await.unwrap();
    let unused = ingredients::insert_ingredient(&pool, "saffron").await.unwrap();
    let all: MealKindSet = MealKind::ALL.into();

    let bread = foods::insert_food(
        &pool,
        &NewFood {
            name: "bread",
            allowed_meal_kinds: &all,
            ingredient_ids: &[salt.id, flour.id],
        },
    )
    .await
    .unwrap();
    let broth = foods::insert_food(
        &pool,
        &NewFood {
            name: "broth",
            allowed_meal_kinds: &all,
            ingredient_ids: &[salt.id],
        },
    )
    .await
    .unwrap();

    let list = ingredients::list_ingredients_for_foods(&pool, &[bread.id, broth.id])
        .await
        .unwrap();
    let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["flour", "salt"]);
    assert!(list.iter().all(|i| i.id != unused.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}
