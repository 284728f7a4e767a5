// src/handlers.rs
use crate::{
    AppState,
    errors::AutoCheckError,
    models::*,
    navigation::Route,
    report::DamageReport,
    services::{catalog, photo_validator::PhotoSet},
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::{debug, info};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub path: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/catalog", web::get().to(get_catalog))
        .route("/flows", web::post().to(start_flow))
        .route("/flows/resume", web::post().to(resume_flow))
        .route("/flows/{flow_id}", web::get().to(get_flow))
        .route("/flows/{flow_id}", web::delete().to(close_flow))
        .route("/flows/{flow_id}/parameters", web::patch().to(edit_parameters))
        .route(
            "/flows/{flow_id}/parameters/confirm",
            web::post().to(confirm_parameters),
        )
        .route("/flows/{flow_id}/photos", web::post().to(upload_photos))
        .route("/flows/{flow_id}/analysis", web::post().to(run_analysis))
        .route("/flows/{flow_id}/progress", web::get().to(get_progress))
        .route("/flows/{flow_id}/report", web::get().to(get_report));
}

pub async fn get_catalog() -> HttpResponse {
    HttpResponse::Ok().json(catalog::catalog())
}

pub async fn start_flow(
    body: web::Json<CreateAnalysisRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let vin = body.vin.trim();
    if vin.is_empty() {
        return Err(AutoCheckError::Validation("Please enter a VIN".to_string()).into());
    }

    let (flow_id, entry) = data.flows.open().await;
    let created = entry.session.lock().await.create_analysis(vin).await;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "flow_id": flow_id,
        "analysis": created
    })))
}

pub async fn resume_flow(
    body: web::Json<ResumeRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let Ok(route) = body.path.parse::<Route>();
    let analyse_id = match (route, route.analyse_id()) {
        (_, Some(analyse_id)) => analyse_id,
        (Route::NotFound, None) => {
            return Err(AutoCheckError::RouteNotFound(body.path.clone()).into());
        }
        (_, None) => {
            return Err(AutoCheckError::Validation(format!(
                "Route {} carries no analysis id",
                route
            ))
            .into());
        }
    };

    let (flow_id, entry) = data.flows.resume(analyse_id).await;
    info!("Resumed analysis {} at {}", analyse_id, route);
    let snapshot = entry.session.lock().await.snapshot();

    Ok(HttpResponse::Created().json(serde_json::json!({
        "flow_id": flow_id,
        "route": route,
        "session": snapshot
    })))
}

pub async fn get_flow(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let snapshot = entry.session.lock().await.snapshot();
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn close_flow(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.flows.close(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn edit_parameters(
    path: web::Path<Uuid>,
    body: web::Json<ParametersEdit>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let mut session = entry.session.lock().await;
    let draft = session.edit_car_parameters(body.into_inner())?;
    Ok(HttpResponse::Ok().json(draft))
}

pub async fn confirm_parameters(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let mut session = entry.session.lock().await;
    let next = session.confirm_car_parameters().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "next": next,
        "car_parameters": session.car_parameters()
    })))
}

/// Multipart intake: each field is named after the position the photo shows.
pub async fn upload_photos(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let max_bytes = data.photo_validator.max_bytes();
    let mut photos = PhotoSet::new();

    while let Some(mut field) = payload.try_next().await? {
        let position = PhotoPosition::parse(field.name()).ok_or_else(|| {
            AutoCheckError::Validation(format!("Unknown photo position: {}", field.name()))
        })?;

        let file_name = field
            .content_disposition()
            .get_filename()
            .map(|name| name.to_string())
            .unwrap_or_else(|| position.to_string());

        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            buffer.extend_from_slice(&chunk);
            if buffer.len() > max_bytes {
                return Err(AutoCheckError::Validation(format!(
                    "{} exceeds the {} byte limit",
                    file_name, max_bytes
                ))
                .into());
            }
        }

        let photo = Photo {
            file_name,
            content_type,
            data: buffer.freeze(),
        };
        data.photo_validator.validate_photo(&photo)?;

        if photos.insert(position, photo).is_some() {
            debug!("Replaced the {} photo", position);
        }
    }

    if !photos.is_empty() && !photos.is_complete() {
        let missing: Vec<&str> = photos
            .missing_required()
            .iter()
            .map(|position| position.as_str())
            .collect();
        return Err(AutoCheckError::Validation(format!(
            "Missing photos: {}",
            missing.join(", ")
        ))
        .into());
    }

    debug!("Received {} photos", photos.len());
    let (files, positions) = photos.into_upload();
    let mut session = entry.session.lock().await;
    let next = session.upload_photos(files, positions).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "next": next,
        "progress": session.progress(),
        "photos": session.uploaded_photos().positions()
    })))
}

pub async fn run_analysis(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let mut session = entry.session.lock().await;
    let (details, next) = session.run_analysis().await?;

    let report = match (details, session.analyse_id()) {
        (Some(details), Some(analyse_id)) => Some(DamageReport::new(
            analyse_id,
            &details,
            session.result_source(),
        )),
        _ => None,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "next": next,
        "progress": session.progress(),
        "report": report
    })))
}

/// Served from the watch channels, so it answers while an analysis holds the session.
pub async fn get_progress(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let progress = *entry.progress.borrow();
    let is_loading = *entry.loading.borrow();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "progress": progress,
        "is_loading": is_loading
    })))
}

pub async fn get_report(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entry = data.flows.get(path.into_inner()).await?;
    let mut session = entry.session.lock().await;

    if session.analysis_result().is_none() {
        session.get_analysis_results().await?;
    }

    let analyse_id = session
        .analyse_id()
        .ok_or(AutoCheckError::NoActiveSession)?;
    let response = session
        .analysis_result()
        .ok_or(AutoCheckError::ResultsUnavailable(analyse_id))?;
    let report = DamageReport::new(analyse_id, &response.details_analize, session.result_source());

    Ok(HttpResponse::Ok().json(report))
}
