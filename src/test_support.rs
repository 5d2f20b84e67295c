// src/test_support.rs
//! Бэкенд-заглушка на случайном порту для тестов клиента и шлюза

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::Value;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use crate::backend::{BackendClient, REQUEST_ID_HEADER};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    routes: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: &str, path: &str, status: u16, body: Value) -> Self {
        self.respond_raw(method, path, status, &body.to_string())
    }

    pub fn respond_raw(self, method: &str, path: &str, status: u16, text: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, text.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

async fn handle(req: HttpRequest, body: web::Bytes, mock: web::Data<MockBackend>) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    mock.seen.lock().unwrap().push(SeenRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        authorization: header("authorization"),
        request_id: header(REQUEST_ID_HEADER),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let key = (req.method().to_string(), req.path().to_string());
    let route = mock.routes.lock().unwrap().get(&key).cloned();
    match route {
        Some((status, text)) => HttpResponse::build(StatusCode::from_u16(status).unwrap())
            .content_type("application/json")
            .body(text),
        None => HttpResponse::NotFound()
            .content_type("application/json")
            .body(r#"{"message":"no such mock route"}"#),
    }
}

/// Поднимает заглушку и возвращает клиент, направленный на неё
pub async fn spawn_backend(mock: MockBackend) -> BackendClient {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(mock.clone()))
            .default_service(web::to(handle))
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .unwrap()
    .run();

    actix_rt::spawn(server);

    BackendClient::with_client(reqwest::Client::new(), &format!("http://{}", addr))
}
