//! HTTP surface of the back office.

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::backoffice::BackOffice;
use crate::domain::aggregates::{Issue, IssueError, NegligenceError, NegligenceReport, Order, OrderError, ReportStatus, SendingIssue};
use crate::domain::drone::DrivingMode;
use crate::domain::sensors::{AlertLevel, AlertType, SensorReading};
use crate::domain::value_objects::{
    Assignee, Client, DroneData, DroneId, IssueIdentifier, NegligenceActionForm, NegligenceIdentifier, Negligent, OrderDate,
    OrderIdentifier, Product, Username,
};
use crate::protocol::Signal;
use crate::repositories::RepositoryError;
use crate::DeliveryError;

type AppState = Arc<BackOffice>;
type ApiError = (StatusCode, String);

pub fn router(office: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "drone-delivery"})) }))
        .route("/api/v1/orders", get(list_orders).post(place_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/deliver", post(deliver))
        .route("/api/v1/orders/:id/reschedule", post(reschedule))
        .route("/api/v1/orders/:id/callback", post(callback))
        .route("/api/v1/orders/:id/halt", post(halt))
        .route("/api/v1/orders/:id/proceed", post(proceed))
        .route("/api/v1/orders/:id/mode", put(change_mode))
        .route("/api/v1/orders/:id/alerts", get(alert_levels))
        .route("/api/v1/orders/:id/snapshot", get(snapshot))
        .route("/api/v1/orders/:id/telemetry/:signal", get(telemetry))
        .route("/api/v1/negligence", get(list_negligence))
        .route("/api/v1/negligence/:id", get(get_negligence))
        .route("/api/v1/negligence/:id/action", post(take_action))
        .route("/api/v1/negligence/couriers/:courier", post(watch_courier).delete(unwatch_courier))
        .route("/api/v1/issues", get(list_issues).post(create_issue))
        .route("/api/v1/issues/:id", get(get_issue))
        .route("/api/v1/issues/:id/vision", post(vision_issue))
        .route("/api/v1/issues/:id/close", post(close_issue))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(office)
}

fn api_error(e: impl Into<DeliveryError>) -> ApiError {
    let e = e.into();
    let status = match &e {
        DeliveryError::Order(OrderError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        DeliveryError::Order(_) | DeliveryError::Value(_) | DeliveryError::Issue(IssueError::Value(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        DeliveryError::Negligence(NegligenceError::AlreadyClosed(_)) | DeliveryError::Issue(IssueError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        DeliveryError::Repository(RepositoryError::Duplicate { .. }) => StatusCode::CONFLICT,
        DeliveryError::Negligence(NegligenceError::NotAssignee { .. }) => StatusCode::FORBIDDEN,
        DeliveryError::Negligence(NegligenceError::NotFound(_))
        | DeliveryError::Issue(IssueError::NotFound(_))
        | DeliveryError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DeliveryError::Transport(_) => StatusCode::BAD_GATEWAY,
        DeliveryError::Codec(_) | DeliveryError::Executor(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn invalid(e: validator::ValidationErrors) -> ApiError { (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()) }

fn not_found() -> ApiError { (StatusCode::NOT_FOUND, "Not found".to_string()) }

fn order_id(id: u64) -> Result<OrderIdentifier, ApiError> { OrderIdentifier::new(id).map_err(api_error) }

// ========== Orders ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 200))]
    pub product: String,
    #[validate(length(min = 1, max = 200))]
    pub client: String,
    pub estimated_arrival: NaiveDate,
}

async fn list_orders(State(s): State<AppState>) -> Json<Vec<Order>> { Json(s.orders.list_orders()) }

async fn get_order(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<Order>, ApiError> {
    s.orders.retrieve_order(order_id(id)?).map(Json).ok_or_else(not_found)
}

async fn place_order(State(s): State<AppState>, Json(r): Json<PlaceOrderRequest>) -> Result<(StatusCode, Json<Order>), ApiError> {
    r.validate().map_err(invalid)?;
    let product = Product::new(r.product).map_err(api_error)?;
    let client = Client::new(r.client).map_err(api_error)?;
    let order = s.orders.place_order(product, client, OrderDate::from_naive(r.estimated_arrival)).map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    #[validate(length(min = 1, max = 64))]
    pub drone_id: String,
    #[validate(length(min = 1, max = 64))]
    pub courier: String,
}

async fn deliver(State(s): State<AppState>, Path(id): Path<u64>, Json(r): Json<DeliverRequest>) -> Result<Json<Order>, ApiError> {
    r.validate().map_err(invalid)?;
    let drone_id = DroneId::new(r.drone_id).map_err(api_error)?;
    let courier = Username::new(r.courier).map_err(api_error)?;
    s.delivery.perform_delivery(order_id(id)?, drone_id, courier).await.map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest { pub estimated_arrival: NaiveDate }

async fn reschedule(State(s): State<AppState>, Path(id): Path<u64>, Json(r): Json<RescheduleRequest>) -> Result<Json<Order>, ApiError> {
    s.delivery.reschedule_delivery(order_id(id)?, OrderDate::from_naive(r.estimated_arrival)).await.map(Json).map_err(api_error)
}

async fn callback(State(s): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, ApiError> {
    s.drones.callback(order_id(id)?).await.map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn halt(State(s): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, ApiError> {
    s.drones.halt(order_id(id)?).await.map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn proceed(State(s): State<AppState>, Path(id): Path<u64>) -> Result<StatusCode, ApiError> {
    s.drones.proceed(order_id(id)?).await.map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest { pub mode: DrivingMode }

async fn change_mode(State(s): State<AppState>, Path(id): Path<u64>, Json(r): Json<ModeRequest>) -> Result<StatusCode, ApiError> {
    s.drones.change_mode(order_id(id)?, r.mode).await.map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn alert_levels(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<HashMap<AlertType, AlertLevel>>, ApiError> {
    s.monitoring.alert_levels(order_id(id)?).map(Json).ok_or_else(not_found)
}

async fn snapshot(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<DroneData>, ApiError> {
    s.data.latest_snapshot(order_id(id)?).map(Json).ok_or_else(not_found)
}

async fn telemetry(State(s): State<AppState>, Path((id, signal)): Path<(u64, Signal)>) -> Result<Json<Vec<SensorReading>>, ApiError> {
    Ok(Json(s.data.history(order_id(id)?, signal.alert_type())))
}

// ========== Negligence ==========

#[derive(Debug, Deserialize)]
pub struct NegligenceQuery {
    pub negligent: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<ReportStatus>,
}

async fn list_negligence(State(s): State<AppState>, Query(q): Query<NegligenceQuery>) -> Result<Json<Vec<NegligenceReport>>, ApiError> {
    let status = q.status.unwrap_or(ReportStatus::Open);
    match (q.negligent, q.assignee) {
        (Some(negligent), _) => Ok(Json(s.negligence.for_negligent(&Negligent::new(negligent).map_err(api_error)?, status))),
        (None, Some(assignee)) => Ok(Json(s.negligence.for_assignee(&Assignee::new(assignee).map_err(api_error)?, status))),
        (None, None) => Ok(Json(s.negligence.for_assignee(s.supervisor.assignee(), status))),
    }
}

async fn get_negligence(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<NegligenceReport>, ApiError> {
    let id = NegligenceIdentifier::new(id).map_err(api_error)?;
    s.negligence.find(id).map(Json).ok_or_else(not_found)
}

#[derive(Debug, Deserialize, Validate)]
pub struct TakeActionRequest {
    #[validate(length(min = 1, max = 64))]
    pub assignee: String,
    #[validate(length(min = 1, max = 2000))]
    pub solution: String,
}

async fn take_action(State(s): State<AppState>, Path(id): Path<u64>, Json(r): Json<TakeActionRequest>) -> Result<Json<NegligenceReport>, ApiError> {
    r.validate().map_err(invalid)?;
    let id = NegligenceIdentifier::new(id).map_err(api_error)?;
    let assignee = Assignee::new(r.assignee).map_err(api_error)?;
    let form = NegligenceActionForm::create(r.solution).map_err(api_error)?;
    s.negligence.take_action(id, &assignee, form).map(Json).map_err(api_error)
}

async fn watch_courier(State(s): State<AppState>, Path(courier): Path<String>) -> Result<StatusCode, ApiError> {
    let courier = Username::new(courier).map_err(api_error)?;
    s.supervisor.watch_courier(&courier).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unwatch_courier(State(s): State<AppState>, Path(courier): Path<String>) -> Result<StatusCode, ApiError> {
    let courier = Username::new(courier).map_err(api_error)?;
    s.supervisor.unwatch_courier(&courier).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== Issues ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub details: String,
    #[validate(length(min = 1, max = 64))]
    pub courier: String,
    #[validate(length(min = 1, max = 64))]
    pub assignee: String,
    pub drone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    pub assignee: Option<String>,
    pub courier: Option<String>,
    pub status: Option<ReportStatus>,
}

async fn create_issue(State(s): State<AppState>, Json(r): Json<CreateIssueRequest>) -> Result<(StatusCode, Json<Issue>), ApiError> {
    r.validate().map_err(invalid)?;
    let drone_id = r.drone_id.map(DroneId::new).transpose().map_err(api_error)?;
    let courier = Username::new(r.courier).map_err(api_error)?;
    let assignee = Username::new(r.assignee).map_err(api_error)?;
    let sending = SendingIssue::new(r.subject, r.details, courier, assignee, drone_id).map_err(api_error)?;
    let issue = s.issues.create(sending).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn list_issues(State(s): State<AppState>, Query(q): Query<IssueQuery>) -> Result<Json<Vec<Issue>>, ApiError> {
    let status = q.status.unwrap_or(ReportStatus::Open);
    match (q.courier, q.assignee) {
        (Some(courier), _) => Ok(Json(s.issues.for_courier(&Username::new(courier).map_err(api_error)?, status))),
        (None, Some(assignee)) => Ok(Json(s.issues.for_assignee(&Username::new(assignee).map_err(api_error)?, status))),
        (None, None) => Ok(Json(s.issues.for_assignee(s.maintainer(), status))),
    }
}

async fn get_issue(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<Issue>, ApiError> {
    let id = IssueIdentifier::new(id).map_err(api_error)?;
    s.issues.find(id).map(Json).ok_or_else(not_found)
}

async fn vision_issue(State(s): State<AppState>, Path(id): Path<u64>) -> Result<Json<Issue>, ApiError> {
    let id = IssueIdentifier::new(id).map_err(api_error)?;
    s.issues.vision(id).map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloseIssueRequest {
    #[validate(length(min = 1, max = 2000))]
    pub solution: String,
}

async fn close_issue(State(s): State<AppState>, Path(id): Path<u64>, Json(r): Json<CloseIssueRequest>) -> Result<Json<Issue>, ApiError> {
    r.validate().map_err(invalid)?;
    let id = IssueIdentifier::new(id).map_err(api_error)?;
    s.issues.close(id, &r.solution).map(Json).map_err(api_error)
}
