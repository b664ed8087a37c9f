// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum handlers.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Failures become a JSON body carrying the
//! request coordinates.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use super::render::Format;
use super::AppState;
use crate::domain::{ConfigError, RequestError};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Maps a request failure to its HTTP status.
fn status_for(error: &ConfigError) -> StatusCode {
    match error {
        ConfigError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        ConfigError::NotFound { .. } => StatusCode::NOT_FOUND,
        ConfigError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build a JSON error response carrying the request coordinates.
fn json_error(
    status: StatusCode,
    message: impl std::fmt::Display,
    application: &str,
    profiles: &str,
    label: Option<&str>,
) -> Response {
    let body = json!({
        "status": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": format!("{message}"),
        "application": application,
        "profiles": profiles,
        "label": label,
    });
    (status, Json(body)).into_response()
}

fn request_error(err: RequestError) -> Response {
    let status = status_for(&err.error);
    if status.is_server_error() {
        warn!(
            application = %err.application,
            profiles = %err.profiles,
            label = err.label.as_deref().unwrap_or("<default>"),
            error = %err.error,
            "configuration request failed"
        );
    }
    json_error(
        status,
        &err.error,
        &err.application,
        &err.profiles,
        err.label.as_deref(),
    )
}

/// A document request: `<application>-<profiles>.<extension>`.
#[derive(Debug, PartialEq, Eq)]
struct DocumentName<'a> {
    application: &'a str,
    profiles: &'a str,
    extension: &'a str,
}

/// Splits a document name at its last `.` and the last `-` before it, so
/// application names may contain hyphens and profile names may not.
fn parse_document_name(name: &str) -> Option<DocumentName<'_>> {
    let (stem, extension) = name.rsplit_once('.')?;
    let (application, profiles) = stem.rsplit_once('-')?;
    if application.is_empty() || profiles.is_empty() || extension.is_empty() {
        return None;
    }
    Some(DocumentName {
        application,
        profiles,
        extension,
    })
}

/// Whether a path segment names a renderable document.
fn is_document_name(segment: &str) -> bool {
    parse_document_name(segment)
        .is_some_and(|document| document.extension.parse::<Format>().is_ok())
}

async fn render_document(state: &AppState, name: &str, label: Option<&str>) -> Response {
    let Some(document) = parse_document_name(name) else {
        return json_error(
            StatusCode::NOT_FOUND,
            format!("'{name}' is not of the form <application>-<profiles>.<format>"),
            "",
            "",
            label,
        );
    };
    let Ok(format) = document.extension.parse::<Format>() else {
        return json_error(
            StatusCode::NOT_FOUND,
            format!("unknown format '{}'", document.extension),
            document.application,
            document.profiles,
            label,
        );
    };

    let environment = match state
        .server
        .resolve_config(document.application, document.profiles, label)
        .await
    {
        Ok(environment) => environment,
        Err(err) => return request_error(err),
    };

    match format.render(&environment.config) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            e,
            document.application,
            document.profiles,
            label,
        ),
    }
}

async fn render_environment(
    state: &AppState,
    application: &str,
    profiles: &str,
    label: Option<&str>,
) -> Response {
    match state.server.resolve_config(application, profiles, label).await {
        Ok(environment) => (StatusCode::OK, Json(environment)).into_response(),
        Err(err) => request_error(err),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /actuator/health
pub(super) async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "UP" }))).into_response()
}

/// GET /{application}-{profiles}.{format}
pub(super) async fn document(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    render_document(&state, &name, None).await
}

/// GET /{application}/{profiles}, or GET /{label}/{application}-{profiles}.{format}
/// when the second segment names a document.
pub(super) async fn environment_or_labelled_document(
    State(state): State<AppState>,
    Path((first, second)): Path<(String, String)>,
) -> Response {
    if is_document_name(&second) {
        render_document(&state, &second, Some(&first)).await
    } else {
        render_environment(&state, &first, &second, None).await
    }
}

/// GET /{application}/{profiles}/{label}
pub(super) async fn labelled_environment(
    State(state): State<AppState>,
    Path((application, profiles, label)): Path<(String, String, String)>,
) -> Response {
    render_environment(&state, &application, &profiles, Some(&label)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_name() {
        assert_eq!(
            parse_document_name("billing-api-prod.yml"),
            Some(DocumentName {
                application: "billing-api",
                profiles: "prod",
                extension: "yml",
            })
        );
        assert_eq!(
            parse_document_name("billing-prod,eu.properties").map(|d| d.profiles),
            Some("prod,eu")
        );
        assert_eq!(parse_document_name("billing.yml"), None);
        assert_eq!(parse_document_name("billing-prod"), None);
        assert_eq!(parse_document_name("-prod.yml"), None);
    }

    #[test]
    fn test_is_document_name() {
        assert!(is_document_name("billing-prod.json"));
        assert!(!is_document_name("prod"));
        assert!(!is_document_name("billing-prod.txt"));
    }

    #[test]
    fn test_status_for() {
        assert_eq!(
            status_for(&ConfigError::invalid_request("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ConfigError::CyclicReference { cycle: vec![] }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&ConfigError::unavailable(
                &crate::domain::Coordinates::new("a", "p", None),
                "file",
                "down"
            )),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
