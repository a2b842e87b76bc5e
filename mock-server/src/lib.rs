//! In-memory backend for the cycle tracking API.
//!
//! Serves every route the client core calls, with bearer-token sessions and
//! per-user data. State lives in one `RwLock`; nothing is persisted.

pub mod models;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Days, NaiveDate, Utc};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub use models::*;

const DEFAULT_CYCLE_DAYS: u64 = 28;
const LUTEAL_DAYS: u64 = 14;

struct Account {
    user_id: String,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    users: HashMap<String, User>,
    cycles: Vec<Cycle>,
    logs: Vec<DailyLog>,
    insights: Vec<Insight>,
    predictions: Vec<Prediction>,
    settings: HashMap<String, Settings>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult<T> = Result<T, StatusCode>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/user/profile", get(get_profile).put(update_profile))
        .route("/cycles", get(list_cycles).post(create_cycle))
        .route("/cycles/current", get(current_cycle))
        .route("/cycles/{id}", put(update_cycle).delete(delete_cycle))
        .route("/daily-logs", get(list_logs).post(create_log))
        .route(
            "/daily-logs/{key}",
            get(get_log_by_date).put(update_log).delete(delete_log),
        )
        .route("/insights", get(list_insights))
        .route("/insights/generate", post(generate_insights))
        .route("/insights/{id}/read", post(mark_insight_read))
        .route("/predictions/latest", get(latest_prediction))
        .route("/predictions/generate", post(generate_prediction))
        .route("/settings", get(get_settings).put(put_settings))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Resolve the bearer token to a user id, or 401.
fn authorize(store: &Store, headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| store.sessions.get(token))
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn start_session(store: &mut Store, user_id: &str) -> String {
    let token = new_id();
    store.sessions.insert(token.clone(), user_id.to_string());
    token
}

// --- auth ---

async fn register(
    State(db): State<Db>,
    Json(input): Json<Register>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let mut store = db.write().await;
    if store.accounts.contains_key(&input.email) {
        return Err(StatusCode::CONFLICT);
    }
    let user = User {
        id: new_id(),
        email: input.email.clone(),
        first_name: input.first_name,
        last_name: input.last_name,
        created_at: Utc::now(),
    };
    store.accounts.insert(
        input.email,
        Account {
            user_id: user.id.clone(),
            password: input.password,
        },
    );
    store.users.insert(user.id.clone(), user.clone());
    let token = start_session(&mut store, &user.id);
    debug!(user_id = %user.id, "registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> ApiResult<Json<AuthResponse>> {
    let mut store = db.write().await;
    let user_id = match store.accounts.get(&input.email) {
        Some(account) if account.password == input.password => account.user_id.clone(),
        _ => return Err(StatusCode::UNAUTHORIZED),
    };
    let user = store.users.get(&user_id).cloned().ok_or(StatusCode::UNAUTHORIZED)?;
    let token = start_session(&mut store, &user_id);
    Ok(Json(AuthResponse { user, token }))
}

async fn get_profile(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    store.users.get(&user_id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let user = store.users.get_mut(&user_id).ok_or(StatusCode::NOT_FOUND)?;
    user.first_name = input.first_name;
    user.last_name = input.last_name;
    Ok(Json(user.clone()))
}

// --- cycles ---

fn user_cycles<'a>(store: &'a Store, user_id: &'a str) -> impl Iterator<Item = &'a Cycle> {
    store.cycles.iter().filter(move |c| c.user_id == user_id)
}

async fn list_cycles(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<Cycle>>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    let mut cycles: Vec<Cycle> = user_cycles(&store, &user_id).cloned().collect();
    cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(Json(cycles))
}

/// Most recent cycle that is not marked complete.
async fn current_cycle(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Cycle>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    user_cycles(&store, &user_id)
        .filter(|c| c.is_complete != Some(true))
        .max_by_key(|c| c.start_date)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn fill_cycle_length(cycle: &mut Cycle) {
    if let (Some(end), None) = (cycle.end_date, cycle.cycle_length) {
        let days = (end - cycle.start_date).num_days() + 1;
        cycle.cycle_length = u32::try_from(days).ok();
    }
}

async fn create_cycle(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut cycle): Json<Cycle>,
) -> ApiResult<(StatusCode, Json<Cycle>)> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    cycle.id = Some(new_id());
    cycle.user_id = user_id;
    cycle.created_at = Some(Utc::now());
    fill_cycle_length(&mut cycle);
    store.cycles.push(cycle.clone());
    Ok((StatusCode::CREATED, Json(cycle)))
}

async fn update_cycle(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut input): Json<Cycle>,
) -> ApiResult<Json<Cycle>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let existing = store
        .cycles
        .iter_mut()
        .find(|c| c.id.as_deref() == Some(id.as_str()) && c.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    input.id = existing.id.clone();
    input.user_id = user_id;
    input.created_at = existing.created_at;
    fill_cycle_length(&mut input);
    *existing = input.clone();
    Ok(Json(input))
}

async fn delete_cycle(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let before = store.cycles.len();
    store
        .cycles
        .retain(|c| !(c.id.as_deref() == Some(id.as_str()) && c.user_id == user_id));
    if store.cycles.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- daily logs ---

async fn list_logs(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(range): Query<LogRange>,
) -> ApiResult<Json<Vec<DailyLog>>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    let mut logs: Vec<DailyLog> = store
        .logs
        .iter()
        .filter(|l| l.user_id == user_id)
        .filter(|l| range.start_date.map_or(true, |s| l.date >= s))
        .filter(|l| range.end_date.map_or(true, |e| l.date <= e))
        .cloned()
        .collect();
    logs.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(logs))
}

async fn get_log_by_date(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> ApiResult<Json<DailyLog>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    let date: NaiveDate = key.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    store
        .logs
        .iter()
        .find(|l| l.user_id == user_id && l.date == date)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_log(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut log): Json<DailyLog>,
) -> ApiResult<(StatusCode, Json<DailyLog>)> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    if store.logs.iter().any(|l| l.user_id == user_id && l.date == log.date) {
        return Err(StatusCode::CONFLICT);
    }
    log.id = Some(new_id());
    log.user_id = user_id;
    log.created_at = Some(Utc::now());
    store.logs.push(log.clone());
    Ok((StatusCode::CREATED, Json(log)))
}

async fn update_log(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut input): Json<DailyLog>,
) -> ApiResult<Json<DailyLog>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let existing = store
        .logs
        .iter_mut()
        .find(|l| l.id.as_deref() == Some(id.as_str()) && l.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    input.id = existing.id.clone();
    input.user_id = user_id;
    input.created_at = existing.created_at;
    *existing = input.clone();
    Ok(Json(input))
}

async fn delete_log(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let before = store.logs.len();
    store
        .logs
        .retain(|l| !(l.id.as_deref() == Some(id.as_str()) && l.user_id == user_id));
    if store.logs.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- insights ---

async fn list_insights(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Json<Vec<Insight>>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    let limit = query.limit.unwrap_or(10);
    let insights = store
        .insights
        .iter()
        .rev()
        .filter(|i| i.user_id == user_id)
        .take(limit)
        .cloned()
        .collect();
    Ok(Json(insights))
}

/// Creates one insight and returns it alongside the previous newest one,
/// so clients see a batch that overlaps what they already hold.
async fn generate_insights(
    State(db): State<Db>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Insight>>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let previous = store.insights.iter().rev().find(|i| i.user_id == user_id).cloned();
    let logged_days = store.logs.iter().filter(|l| l.user_id == user_id).count();

    let (kind, title, content, priority) = if logged_days == 0 {
        (
            "recommendation",
            "Start logging daily",
            "Daily logs make predictions and patterns more accurate.",
            "high",
        )
    } else {
        (
            "pattern",
            "Logging streak",
            "Keep logging to reveal trends across your cycle.",
            "medium",
        )
    };
    let insight = Insight {
        id: new_id(),
        user_id,
        kind: kind.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        priority: priority.to_string(),
        is_read: false,
        generated_at: Utc::now(),
    };
    store.insights.push(insight.clone());

    let mut batch = vec![insight];
    batch.extend(previous);
    Ok(Json(batch))
}

async fn mark_insight_read(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let insight = store
        .insights
        .iter_mut()
        .find(|i| i.id == id && i.user_id == user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    insight.is_read = true;
    Ok(Json(json!({})))
}

// --- predictions ---

async fn latest_prediction(
    State(db): State<Db>,
    headers: HeaderMap,
) -> ApiResult<Json<Prediction>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    store
        .predictions
        .iter()
        .rev()
        .find(|p| p.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Projects the next period from the newest cycle start and the mean
/// completed cycle length. Needs at least one cycle.
async fn generate_prediction(
    State(db): State<Db>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<Prediction>)> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;

    let last_start = user_cycles(&store, &user_id)
        .map(|c| c.start_date)
        .max()
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let lengths: Vec<u64> = user_cycles(&store, &user_id)
        .filter(|c| c.is_complete == Some(true))
        .filter_map(|c| c.cycle_length.map(u64::from))
        .collect();
    let cycle_days = if lengths.is_empty() {
        DEFAULT_CYCLE_DAYS
    } else {
        lengths.iter().sum::<u64>() / lengths.len() as u64
    };

    let next_period = last_start + Days::new(cycle_days);
    let ovulation = next_period - Days::new(LUTEAL_DAYS);
    let confidence = (50 + 10 * lengths.len()).min(95) as u8;

    let prediction = Prediction {
        id: new_id(),
        user_id,
        next_period_date: next_period,
        ovulation_date: ovulation,
        fertility_window: FertilityWindow {
            start: ovulation - Days::new(5),
            end: ovulation + Days::new(1),
        },
        confidence,
        generated_at: Utc::now(),
    };
    store.predictions.push(prediction.clone());
    Ok((StatusCode::CREATED, Json(prediction)))
}

// --- settings ---

async fn get_settings(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Settings>> {
    let store = db.read().await;
    let user_id = authorize(&store, &headers)?;
    store.settings.get(&user_id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Upsert; the first write creates the record.
async fn put_settings(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut input): Json<Settings>,
) -> ApiResult<Json<Settings>> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    input.id = store
        .settings
        .get(&user_id)
        .and_then(|s| s.id.clone())
        .or_else(|| Some(new_id()));
    input.user_id = user_id.clone();
    store.settings.insert(user_id, input.clone());
    Ok(Json(input))
}
