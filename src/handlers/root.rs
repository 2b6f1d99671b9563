use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Passkey Ceremony API
Version: {version}

Available endpoints:
  - POST   /register/start    - Begin passkey registration ({{"username"}})
  - POST   /register/finish   - Finish registration (Session-Key header)
  - POST   /login/start       - Begin passkey login ({{"username"}})
  - POST   /login/finish      - Finish login (Session-Key header)
  - GET    /health            - Light health check
  - GET    /health?mode=full  - Full health check (includes pending ceremonies)
  - GET    /metrics           - Prometheus metrics
"#
    )
}
