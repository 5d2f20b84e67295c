// src/monitoring.rs
use actix_web::{HttpResponse, web};
use serde::Serialize;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use std::time::Instant;
use chrono::{DateTime, Utc};

use crate::handlers::AppState;

// Окно последних времён ответа для среднего
const RESPONSE_TIME_WINDOW: usize = 1000;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub backend_error_count: Arc<AtomicU64>,
    pub response_times: Arc<std::sync::Mutex<Vec<u64>>>,
    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            backend_error_count: Arc::new(AtomicU64::new(0)),
            response_times: Arc::new(std::sync::Mutex::new(Vec::new())),
            started_at: Instant::now(),
        }
    }

    pub fn increment_requests(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backend_errors(&self) {
        self.backend_error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response_time(&self, time_ms: u64) {
        if let Ok(mut times) = self.response_times.lock() {
            times.push(time_ms);
            if times.len() > RESPONSE_TIME_WINDOW {
                times.remove(0);
            }
        }
    }

    pub fn avg_response_time_ms(&self) -> f64 {
        match self.response_times.lock() {
            Ok(times) if !times.is_empty() => times.iter().sum::<u64>() as f64 / times.len() as f64,
            _ => 0.0,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub requests_total: u64,
    pub errors_total: u64,
    pub backend_errors_total: u64,
    pub avg_response_time_ms: f64,
    pub uptime_seconds: u64,
}

pub async fn health_check(metrics: web::Data<Arc<Metrics>>) -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: metrics.uptime_seconds(),
    };

    HttpResponse::Ok().json(response)
}

/// Готовность = бэкенд отвечает (любым HTTP-статусом)
pub async fn readiness_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    if state.backend.ping().await {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "backend": "reachable"
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not ready",
            "backend": "unreachable"
        }))
    }
}

pub async fn metrics_endpoint(metrics: web::Data<Arc<Metrics>>) -> HttpResponse {
    let response = MetricsResponse {
        requests_total: metrics.request_count.load(Ordering::Relaxed),
        errors_total: metrics.error_count.load(Ordering::Relaxed),
        backend_errors_total: metrics.backend_error_count.load(Ordering::Relaxed),
        avg_response_time_ms: metrics.avg_response_time_ms(),
        uptime_seconds: metrics.uptime_seconds(),
    };

    HttpResponse::Ok().json(response)
}

pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(health_check))
            .route("/ready", web::get().to(readiness_check))
            .route("/metrics", web::get().to(metrics_endpoint)),
    );
}

pub struct RequestLogger {
    metrics: Arc<Metrics>,
}

impl RequestLogger {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> actix_web::dev::Transform<S, actix_web::dev::ServiceRequest> for RequestLogger
where
    S: actix_web::dev::Service<
        actix_web::dev::ServiceRequest,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
    B: 'static,
{
    type Response = actix_web::dev::ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerMiddleware {
            service,
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
    metrics: Arc<Metrics>,
}

impl<S, B> actix_web::dev::Service<actix_web::dev::ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: actix_web::dev::Service<
        actix_web::dev::ServiceRequest,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
    B: 'static,
{
    type Response = actix_web::dev::ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: actix_web::dev::ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let metrics = self.metrics.clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            metrics.increment_requests();
            let res = fut.await;
            metrics.record_response_time(start_time.elapsed().as_millis() as u64);

            if let Ok(ref response) = res {
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    metrics.increment_errors();
                }
                // 502/503/504: бэкенд недоступен или ответил мусором
                if matches!(status.as_u16(), 502..=504) {
                    metrics.increment_backend_errors();
                }
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App, HttpResponse as Resp};

    #[test]
    fn test_metrics_window() {
        let metrics = Metrics::new();
        for ms in 0..(RESPONSE_TIME_WINDOW as u64 + 10) {
            metrics.record_response_time(ms);
        }
        assert_eq!(metrics.response_times.lock().unwrap().len(), RESPONSE_TIME_WINDOW);
        assert!(metrics.avg_response_time_ms() > 0.0);
    }

    #[actix_rt::test]
    async fn test_request_logger_counts_errors() {
        let metrics = Arc::new(Metrics::new());
        let app = actix_test::init_service(
            App::new()
                .wrap(RequestLogger::new(metrics.clone()))
                .route("/ok", web::get().to(|| async { Resp::Ok().finish() }))
                .route("/down", web::get().to(|| async { Resp::BadGateway().finish() })),
        )
        .await;

        actix_test::call_service(&app, actix_test::TestRequest::get().uri("/ok").to_request()).await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri("/down").to_request()).await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri("/missing").to_request()).await;

        assert_eq!(metrics.request_count.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.error_count.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.backend_error_count.load(Ordering::Relaxed), 1);
    }
}
