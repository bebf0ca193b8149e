//! Company CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Company, CompanyId};
use company_store::CompanyStore;
use domain::{CreateCompanyRequest, UpdateCompanyRequest};

use crate::AppState;
use crate::error::ApiError;

/// POST /api/companies: create a company.
#[tracing::instrument(skip_all)]
pub async fn create<S: CompanyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let Json(req) = payload?;
    let company = state.service.create(req).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/companies/{id}: load a company.
#[tracing::instrument(skip(state))]
pub async fn get<S: CompanyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Company>, ApiError> {
    let id = CompanyId::parse(&id)?;
    let company = state.service.get(id).await?;
    Ok(Json(company))
}

/// PATCH /api/companies/{id}: apply a partial update.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: CompanyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> Result<Json<Company>, ApiError> {
    let id = CompanyId::parse(&id)?;
    let Json(req) = payload?;
    let company = state.service.update(id, req).await?;
    Ok(Json(company))
}

/// DELETE /api/companies/{id}: remove a company.
#[tracing::instrument(skip(state))]
pub async fn delete<S: CompanyStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = CompanyId::parse(&id)?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
