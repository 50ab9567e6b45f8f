use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::MatchingError;
use crate::models::{
    AcceptResponse, ApplicationId, ErrorResponse, HealthResponse, RecommendationListResponse,
    RecommendationsQuery, RunMatchingResponse,
};
use crate::services::{MatchingService, PgRingStore, ServiceError, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchingService>,
    /// Present when running against PostgreSQL; used by the health check
    pub postgres: Option<Arc<PgRingStore>>,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matching/run", web::post().to(run_matching))
        .route("/participants/{id}/accept", web::post().to(accept_participant))
        .route("/recommendations", web::get().to(list_recommendations))
        .route("/recommendations/{id}", web::get().to(get_recommendation));
}

fn error_response(err: &ServiceError) -> HttpResponse {
    let (status, error) = match err {
        ServiceError::Store(StoreError::NotFound(_)) => (404, "Not found"),
        ServiceError::Store(StoreError::ConsistencyViolation(_)) => (409, "Consistency violation"),
        ServiceError::Store(StoreError::InvalidInput(_)) | ServiceError::Store(StoreError::Ring(_)) => {
            (422, "Data integrity failure")
        }
        ServiceError::Matching(MatchingError::GroupTooLarge { .. }) => (422, "Group too large"),
        ServiceError::Matching(_) => (422, "Data integrity failure"),
        ServiceError::Store(_) => (500, "Storage failure"),
    };

    let body = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status,
    };
    match status {
        404 => HttpResponse::NotFound().json(body),
        409 => HttpResponse::Conflict().json(body),
        422 => HttpResponse::UnprocessableEntity().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Recompute the proposal set
///
/// POST /api/v1/matching/run
async fn run_matching(state: web::Data<AppState>) -> impl Responder {
    match state.service.run_matching().await {
        Ok(run) => HttpResponse::Ok().json(RunMatchingResponse::from(run)),
        Err(e) => {
            tracing::error!("Matching run failed: {}", e);
            error_response(&e)
        }
    }
}

/// Accept a ring on behalf of one participant
///
/// POST /api/v1/participants/{id}/accept
async fn accept_participant(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let participant = path.into_inner();

    match state.service.accept_participant(participant).await {
        Ok(outcome) => HttpResponse::Ok().json(AcceptResponse::from(outcome)),
        Err(e) => {
            tracing::warn!("Accept failed for participant {}: {}", participant, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/recommendations/{id}
async fn get_recommendation(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    match state.service.recommendation(path.into_inner()).await {
        Ok(ring) => HttpResponse::Ok().json(ring),
        Err(e) => error_response(&e),
    }
}

/// List the rings an application takes part in
///
/// GET /api/v1/recommendations?applicationId={id}
async fn list_recommendations(
    state: web::Data<AppState>,
    query: web::Query<RecommendationsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let application_id = ApplicationId(query.application_id);
    match state.service.recommendations_for_application(application_id).await {
        Ok(rings) => HttpResponse::Ok().json(RecommendationListResponse {
            application_id,
            count: rings.len(),
            recommendations: rings,
        }),
        Err(e) => {
            tracing::error!("Failed to list recommendations for {}: {}", application_id, e);
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MatchLimits, Matcher};
    use crate::models::{Application, CityId, LengthOfStay, Property, PropertyId};
    use crate::services::InMemoryRingStore;
    use actix_web::{test, App};

    fn create_application(id: i64, offers: i64, prefers: i64) -> Application {
        Application {
            id: ApplicationId(id),
            length_of_stay: LengthOfStay::SixMonths,
            property: Some(Property { id: PropertyId(id), city_id: Some(CityId(offers)) }),
            preferred_cities: vec![CityId(prefers)],
            pet_friendly: None,
            move_in_date: None,
            accepted: false,
        }
    }

    fn app_state() -> AppState {
        let store = InMemoryRingStore::with_applications(vec![
            create_application(1, 10, 20),
            create_application(2, 20, 10),
        ]);
        AppState {
            service: Arc::new(MatchingService::new(
                Arc::new(store),
                Matcher::new(MatchLimits::default()),
            )),
            postgres: None,
        }
    }

    #[actix_web::test]
    async fn test_run_then_accept_over_http() {
        let state = app_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/matching/run").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ringsCreated"], 1);

        let rings = state
            .service
            .recommendations_for_application(ApplicationId(1))
            .await
            .unwrap();
        let participants: Vec<Uuid> = rings[0].members.iter().map(|m| m.id).collect();

        for participant in &participants {
            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/participants/{}/accept", participant))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/recommendations/{}", rings[0].id()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["recommendation"]["accepted"], true);
    }

    #[actix_web::test]
    async fn test_accept_unknown_participant_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/participants/{}/accept", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_list_requires_positive_application_id() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/recommendations?applicationId=0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
