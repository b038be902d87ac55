use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use diet_core::calendar::{DAYS_PER_WEEK, WeekId};
use diet_core::catalog::{self, CatalogError, FoodInput};
use diet_core::{PlanError, PlanService};
use diet_db::models::{Ingredient, MealKind, MealSlot, WeekPlan};

use crate::plan_cmds::plan_service;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    /// Build from a domain error; `{:#}` keeps the anyhow context chain
    /// of store failures.
    fn with_status(status: StatusCode, err: &dyn std::fmt::Display) -> Self {
        let message = format!("{err:#}");
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        }
        Self { status, message }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            _ if err.is_not_found() => StatusCode::NOT_FOUND,
            PlanError::PlanAlreadyExists(_) => StatusCode::CONFLICT,
            PlanError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::with_status(status, &err)
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        // In-use deletes are client errors, not conflicts.
        let status = match &err {
            _ if err.is_not_found() => StatusCode::NOT_FOUND,
            CatalogError::DuplicateName(_) => StatusCode::CONFLICT,
            CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::with_status(status, &err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IngredientRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceQuery {
    pub food_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LeftoverQuery {
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

/// A week plan as served to clients: the stored plan plus its label and
/// calendar span.
#[derive(Debug, Serialize)]
pub struct WeekPlanResponse {
    pub id: Uuid,
    pub year: i32,
    pub week_number: i32,
    pub week_label: String,
    pub start_date: String,
    pub end_date: String,
    pub meals: Vec<MealSlot>,
}

impl WeekPlanResponse {
    fn new(week: WeekId, plan: WeekPlan) -> Self {
        Self {
            id: plan.id,
            year: plan.year,
            week_number: plan.week_number,
            week_label: week.label(),
            start_date: week.start_date().format("%Y-%m-%d").to_string(),
            end_date: week.end_date().format("%Y-%m-%d").to_string(),
            meals: plan.slots,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroceryListResponse {
    pub ingredients: Vec<Ingredient>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub service: PlanService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let service = plan_service(&pool);
        Self { pool, service }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/ingredients",
            get(list_ingredients).post(create_ingredient),
        )
        .route(
            "/api/ingredients/{id}",
            put(rename_ingredient).delete(delete_ingredient),
        )
        .route("/api/foods", get(list_foods).post(create_food))
        .route("/api/foods/{id}", put(update_food).delete(delete_food))
        .route("/api/plans/current", get(get_current_plan))
        .route("/api/plans/current/generate", post(generate_current_plan))
        .route("/api/plans/upcoming", get(get_upcoming_plan))
        .route("/api/plans/upcoming/generate", post(generate_upcoming_plan))
        .route("/api/plans/{year}/{week}", get(get_plan))
        .route("/api/plans/{year}/{week}/grocery-list", get(grocery_list))
        .route(
            "/api/plans/{year}/{week}/days/{day}/meals/{meal_kind}/replace",
            post(replace_meal),
        )
        .route(
            "/api/plans/{year}/{week}/days/{day}/meals/{meal_kind}/leftover",
            post(toggle_leftover),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(AppState::new(pool));
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("diet serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("diet serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Path validation
// ---------------------------------------------------------------------------

fn parse_week(year: i32, week: u32) -> Result<WeekId, AppError> {
    WeekId::new(year, week)
        .ok_or_else(|| AppError::bad_request(format!("{year} has no ISO week {week}")))
}

fn parse_slot(day: i32, meal_kind: &str) -> Result<(i32, MealKind), AppError> {
    if !(1..=DAYS_PER_WEEK).contains(&day) {
        return Err(AppError::bad_request(
            "day must be between 1 (Monday) and 7 (Sunday)",
        ));
    }
    let kind = meal_kind
        .parse::<MealKind>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok((day, kind))
}

// ---------------------------------------------------------------------------
// Handlers: health and catalog
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn list_ingredients(State(state): State<AppState>) -> Result<Response, AppError> {
    let ingredients = catalog::list_ingredients(&state.pool).await?;
    Ok(Json(ingredients).into_response())
}

async fn create_ingredient(
    State(state): State<AppState>,
    payload: Result<Json<IngredientRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let ingredient = catalog::create_ingredient(&state.pool, &body.name).await?;
    Ok((StatusCode::CREATED, Json(ingredient)).into_response())
}

async fn rename_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<IngredientRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let ingredient = catalog::rename_ingredient(&state.pool, id, &body.name).await?;
    Ok(Json(ingredient).into_response())
}

async fn delete_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    catalog::delete_ingredient(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_foods(State(state): State<AppState>) -> Result<Response, AppError> {
    let foods = catalog::list_foods(&state.pool).await?;
    Ok(Json(foods).into_response())
}

async fn create_food(
    State(state): State<AppState>,
    payload: Result<Json<FoodInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let food = catalog::create_food(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(food)).into_response())
}

async fn update_food(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<FoodInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let food = catalog::update_food(&state.pool, id, &input).await?;
    Ok(Json(food).into_response())
}

async fn delete_food(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    catalog::delete_food(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Handlers: plans
// ---------------------------------------------------------------------------

async fn plan_response(service: &PlanService, week: WeekId) -> Result<Response, AppError> {
    let plan = service.get_plan(week).await?;
    Ok(Json(WeekPlanResponse::new(week, plan)).into_response())
}

async fn generated_response(service: &PlanService, week: WeekId) -> Result<Response, AppError> {
    let plan = service.generate_plan(week).await?;
    Ok(Json(WeekPlanResponse::new(week, plan)).into_response())
}

async fn get_current_plan(State(state): State<AppState>) -> Result<Response, AppError> {
    plan_response(&state.service, state.service.current_week()).await
}

async fn generate_current_plan(State(state): State<AppState>) -> Result<Response, AppError> {
    generated_response(&state.service, state.service.current_week()).await
}

async fn get_upcoming_plan(State(state): State<AppState>) -> Result<Response, AppError> {
    plan_response(&state.service, state.service.upcoming_week()).await
}

async fn generate_upcoming_plan(State(state): State<AppState>) -> Result<Response, AppError> {
    generated_response(&state.service, state.service.upcoming_week()).await
}

async fn get_plan(
    State(state): State<AppState>,
    Path((year, week)): Path<(i32, u32)>,
) -> Result<Response, AppError> {
    plan_response(&state.service, parse_week(year, week)?).await
}

async fn grocery_list(
    State(state): State<AppState>,
    Path((year, week)): Path<(i32, u32)>,
) -> Result<Response, AppError> {
    let week = parse_week(year, week)?;
    let ingredients = state.service.grocery_list(week).await?;
    Ok(Json(GroceryListResponse { ingredients }).into_response())
}

async fn replace_meal(
    State(state): State<AppState>,
    Path((year, week, day, meal_kind)): Path<(i32, u32, i32, String)>,
    Query(query): Query<ReplaceQuery>,
) -> Result<Response, AppError> {
    let week = parse_week(year, week)?;
    let (day, kind) = parse_slot(day, &meal_kind)?;
    let slot = state
        .service
        .replace_meal_slot(week, day, kind, query.food_id)
        .await?;
    Ok(Json(slot).into_response())
}

async fn toggle_leftover(
    State(state): State<AppState>,
    Path((year, week, day, meal_kind)): Path<(i32, u32, i32, String)>,
    Query(query): Query<LeftoverQuery>,
) -> Result<Response, AppError> {
    let week = parse_week(year, week)?;
    let (day, kind) = parse_slot(day, &meal_kind)?;
    let target = state
        .service
        .toggle_leftover(week, day, kind, query.enable)
        .await?;
    Ok(Json(target).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use diet_core::calendar::WeekId;
    use diet_core::store::PgStore;
    use diet_core::{FixedClock, PlanService};
    use diet_test_utils::{create_test_db, drop_test_db};

    use super::AppState;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn this_week() -> WeekId {
        WeekId::new(2025, 11).unwrap()
    }

    fn state(pool: &PgPool) -> AppState {
        let store = Arc::new(PgStore::new(pool.clone()));
        let service = PlanService::new(
            store.clone(),
            store,
            Arc::new(FixedClock::in_week(this_week())),
        );
        AppState {
            pool: pool.clone(),
            service,
        }
    }

    async fn send(
        pool: &PgPool,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let app = super::build_router(state(pool));
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// One ingredient and one food per meal kind.
    async fn seed_catalog(pool: &PgPool) {
        for (name, kind) in [
            ("Porridge", "breakfast"),
            ("Soup", "lunch"),
            ("Stew", "dinner"),
        ] {
            let resp = send(
                pool,
                "POST",
                "/api/ingredients",
                Some(serde_json::json!({ "name": format!("{name} stock") })),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let ingredient = body_json(resp).await;

            let resp = send(
                pool,
                "POST",
                "/api/foods",
                Some(serde_json::json!({
                    "name": name,
                    "allowed_meal_kinds": [kind],
                    "ingredient_ids": [ingredient["id"]],
                })),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_error_status_mapping() {
        use diet_core::PlanError;
        use diet_core::catalog::CatalogError;
        use diet_db::models::MealKind;

        use super::AppError;

        let week = this_week();
        let status = |err: PlanError| AppError::from(err).status;
        assert_eq!(status(PlanError::PlanNotFound(week)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(PlanError::SlotNotFound {
                week,
                day: 3,
                kind: MealKind::Lunch
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(PlanError::PlanAlreadyExists(week)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(PlanError::TargetSlotNotFound {
                week,
                day: 1,
                kind: MealKind::Dinner
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PlanError::Store(anyhow::anyhow!("pool timed out"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let status = |err: CatalogError| AppError::from(err).status;
        let id = uuid::Uuid::new_v4();
        assert_eq!(status(CatalogError::FoodNotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CatalogError::DuplicateName("Salt".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status(CatalogError::FoodInUse(id)), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, "GET", "/api/health", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({ "status": "healthy" })
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_ingredient_crud() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(
            &pool,
            "POST",
            "/api/ingredients",
            Some(serde_json::json!({ "name": " Flour " })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["name"], "Flour");
        let id = created["id"].as_str().unwrap().to_string();

        let resp = send(
            &pool,
            "POST",
            "/api/ingredients",
            Some(serde_json::json!({ "name": "flour" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert!(body_json(resp).await.get("error").is_some());

        let resp = send(
            &pool,
            "PUT",
            &format!("/api/ingredients/{id}"),
            Some(serde_json::json!({ "name": "Rye flour" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["name"], "Rye flour");

        let resp = send(&pool, "GET", "/api/ingredients", None).await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

        let resp = send(&pool, "DELETE", &format!("/api/ingredients/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&pool, "DELETE", &format!("/api/ingredients/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_food_validation() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(
            &pool,
            "POST",
            "/api/foods",
            Some(serde_json::json!({
                "name": "Mystery",
                "allowed_meal_kinds": [],
                "ingredient_ids": [uuid::Uuid::new_v4()],
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &pool,
            "POST",
            "/api/foods",
            Some(serde_json::json!({
                "name": "Mystery",
                "allowed_meal_kinds": ["brunch"],
                "ingredient_ids": [],
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        seed_catalog(&pool).await;
        let resp = send(&pool, "GET", "/api/foods", None).await;
        let foods = body_json(resp).await;
        let foods = foods.as_array().unwrap();
        assert_eq!(foods.len(), 3);
        assert_eq!(foods[0]["name"], "Porridge");
        assert_eq!(foods[0]["ingredients"][0]["name"], "Porridge stock");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_and_fetch_current_plan() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, "GET", "/api/plans/current", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&pool, "POST", "/api/plans/current/generate", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        seed_catalog(&pool).await;
        let resp = send(&pool, "POST", "/api/plans/current/generate", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let plan = body_json(resp).await;
        assert_eq!(plan["week_label"], "Week 11, 2025");
        assert_eq!(plan["start_date"], "2025-03-10");
        assert_eq!(plan["end_date"], "2025-03-16");
        assert_eq!(plan["meals"].as_array().unwrap().len(), 21);

        let resp = send(&pool, "POST", "/api/plans/current/generate", None).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = send(&pool, "GET", "/api/plans/2025/11", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["id"], plan["id"]);

        let resp = send(&pool, "GET", "/api/plans/upcoming", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&pool, "GET", "/api/plans/2025/11/grocery-list", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let list = body_json(resp).await;
        assert_eq!(list["ingredients"].as_array().unwrap().len(), 3);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_path_validation() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, "GET", "/api/plans/2025/54", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&pool, "GET", "/api/plans/2025/53", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let food = uuid::Uuid::new_v4();
        let resp = send(
            &pool,
            "POST",
            &format!("/api/plans/2025/11/days/8/meals/dinner/replace?food_id={food}"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &pool,
            "POST",
            &format!("/api/plans/2025/11/days/1/meals/brunch/replace?food_id={food}"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_replace_and_leftover() {
        let (pool, db_name) = create_test_db().await;
        seed_catalog(&pool).await;
        send(&pool, "POST", "/api/plans/current/generate", None).await;

        let foods = body_json(send(&pool, "GET", "/api/foods", None).await).await;
        let porridge = foods
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "Porridge")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let resp = send(
            &pool,
            "POST",
            &format!("/api/plans/2025/11/days/2/meals/dinner/replace?food_id={porridge}"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(
            body_json(resp).await["error"]
                .as_str()
                .unwrap()
                .contains("Porridge")
        );

        let resp = send(
            &pool,
            "POST",
            &format!("/api/plans/2025/11/days/2/meals/Breakfast/replace?food_id={porridge}"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["manual_food_id"], porridge.as_str());

        let resp = send(
            &pool,
            "POST",
            "/api/plans/2025/11/days/3/meals/lunch/leftover?enable=true",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let target = body_json(resp).await;
        assert_eq!(target["day_of_week"], 4);
        assert_eq!(target["is_leftover"], true);

        let resp = send(
            &pool,
            "POST",
            "/api/plans/2025/11/days/7/meals/lunch/leftover?enable=true",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &pool,
            "POST",
            "/api/plans/2025/10/days/3/meals/lunch/leftover?enable=true",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &pool,
            "POST",
            "/api/plans/2025/11/days/3/meals/lunch/leftover?enable=false",
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["is_leftover"], false);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
