use crate::payloads::*;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use pdf_query::encoder::data_uri_media_type;
use pdf_query::orchestrator::SAVED_NOTIFICATION;
use pdf_query::{
    AnalysisError, AnalysisOrchestrator, ErrorResponse, Question, QuestionSet, QuestionStore,
    SelectedDocument, WorkspaceView,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
    pub store: QuestionStore,
}

pub type SharedState = Arc<AppState>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/workspace", get(get_workspace))
        .route("/document", put(select_document))
        .route("/document/data-uri", post(select_data_uri_document))
        .route("/questions", post(add_question))
        .route("/questions/reset", post(reset_questions))
        .route("/questions/save", post(save_questions))
        .route("/questions/load", post(load_questions))
        .route("/questions/:id", put(update_question).delete(remove_question))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(err: &AnalysisError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        AnalysisError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Encoding(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Transport(_)
        | AnalysisError::MalformedResponse(_)
        | AnalysisError::InvalidShape => StatusCode::BAD_GATEWAY,
        AnalysisError::AlreadyRunning => StatusCode::CONFLICT,
        AnalysisError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        AnalysisError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
        AnalysisError::Config(_) | AnalysisError::Persistence(_) | AnalysisError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        log::error!("Request failed with {}: {}", status, err);
    }

    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            error: err.to_string(),
        }),
    )
}

async fn get_workspace(State(state): State<SharedState>) -> Json<WorkspaceView> {
    Json(state.orchestrator.view().await)
}

async fn select_document(
    State(state): State<SharedState>,
    Query(params): Query<DocumentParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<DocumentResponse> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mime_type = header_value(header::CONTENT_TYPE.as_str());
    let name = Some(header_value("x-file-name"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string());

    let response = DocumentResponse {
        name: name.clone(),
        mime_type: mime_type.clone(),
        size: body.len(),
    };
    let document = SelectedDocument::from_bytes(name, mime_type, body.to_vec());

    apply_selection(&state, document, params.dropped).await?;
    Ok(Json(response))
}

/// The payload is validated when the run encodes it, not here.
async fn select_data_uri_document(
    State(state): State<SharedState>,
    Json(payload): Json<DataUriDocumentPayload>,
) -> ApiResult<DocumentResponse> {
    let mime_type = data_uri_media_type(&payload.data_uri).unwrap_or_default();
    let response = DocumentResponse {
        name: payload.name.clone(),
        mime_type: mime_type.clone(),
        size: payload.data_uri.len(),
    };
    let document = SelectedDocument {
        mime_type,
        ..SelectedDocument::from_data_uri(payload.name, payload.data_uri)
    };

    apply_selection(&state, document, payload.dropped).await?;
    Ok(Json(response))
}

async fn apply_selection(
    state: &AppState,
    document: SelectedDocument,
    dropped: bool,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if dropped {
        state
            .orchestrator
            .select_dropped_document(document)
            .await
            .map_err(|e| error_response(&e))
    } else {
        state.orchestrator.select_document(document).await;
        Ok(())
    }
}

async fn add_question(
    State(state): State<SharedState>,
    payload: Option<Json<NewQuestionPayload>>,
) -> ApiResult<Question> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    state
        .orchestrator
        .add_question(payload.question)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn update_question(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<QuestionTextPayload>,
) -> ApiResult<QuestionSet> {
    state
        .orchestrator
        .update_question(&id, payload.question)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(state.orchestrator.questions().await))
}

async fn remove_question(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<QuestionSet> {
    state
        .orchestrator
        .remove_question(&id)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(state.orchestrator.questions().await))
}

async fn reset_questions(State(state): State<SharedState>) -> ApiResult<QuestionSet> {
    state
        .orchestrator
        .reset_questions()
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn load_questions(State(state): State<SharedState>) -> ApiResult<QuestionSet> {
    state
        .orchestrator
        .load_questions(&state.store)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn save_questions(State(state): State<SharedState>) -> ApiResult<NotificationResponse> {
    state
        .orchestrator
        .save_questions(&state.store)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(NotificationResponse {
        notification: SAVED_NOTIFICATION.to_string(),
    }))
}

async fn analyze(State(state): State<SharedState>) -> ApiResult<QuestionSet> {
    state
        .orchestrator
        .analyze()
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pdf_query::{AnalysisClient, AnalysisRequest};
    use tower::ServiceExt;

    struct FixedClient(&'static str);

    #[async_trait]
    impl AnalysisClient for FixedClient {
        async fn call(&self, _request: &AnalysisRequest) -> pdf_query::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn app(reply: &'static str, questions: QuestionSet, store_dir: &std::path::Path) -> (Router, SharedState) {
        let state = Arc::new(AppState {
            orchestrator: AnalysisOrchestrator::new(Arc::new(FixedClient(reply)), questions),
            store: QuestionStore::new(store_dir),
        });
        (router(state.clone(), 1024 * 1024), state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put_pdf(uri: &str, mime: &str) -> Request<Body> {
        Request::put(uri)
            .header("content-type", mime)
            .header("x-file-name", "pliego.pdf")
            .body(Body::from("%PDF-1.7 test"))
            .unwrap()
    }

    #[tokio::test]
    async fn analyze_without_document_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app("[]", QuestionSet::from_texts(["A"]), dir.path());

        let response = app
            .oneshot(Request::post("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], pdf_query::error::MISSING_DOCUMENT);
    }

    #[tokio::test]
    async fn upload_then_analyze_returns_answers() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(r#"[{"question":"A","answer":"42"}]"#, QuestionSet::from_texts(["A", "B"]), dir.path());

        let response = app.clone().oneshot(put_pdf("/document", "application/pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["name"], "pliego.pdf");

        let response = app
            .clone()
            .oneshot(Request::post("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["answer"], "42");
        assert_eq!(body[1]["answer"], pdf_query::reconciler::MISSING_ANSWER);

        let response = app
            .oneshot(Request::get("/workspace").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["is_loading"], false);
        assert_eq!(body["last_outcome"], "succeeded");
    }

    #[tokio::test]
    async fn bad_response_maps_to_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app("oops", QuestionSet::from_texts(["A"]), dir.path());

        app.clone().oneshot(put_pdf("/document", "application/pdf")).await.unwrap();
        let response = app
            .oneshot(Request::post("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn dropped_non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app("[]", QuestionSet::from_texts(["A"]), dir.path());

        let response = app
            .clone()
            .oneshot(put_pdf("/document?dropped=true", "text/plain"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!state.orchestrator.view().await.has_document);

        // The picker path does not filter by type.
        let response = app.oneshot(put_pdf("/document", "text/plain")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.orchestrator.view().await.has_document);
    }

    #[tokio::test]
    async fn question_edits_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app("[]", QuestionSet::default(), dir.path());

        let response = app
            .clone()
            .oneshot(
                Request::post("/questions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"question":"Plazo"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::put(format!("/questions/{}", id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"question":"Plazo de ejecución"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await[0]["question"], "Plazo de ejecución");

        let response = app
            .clone()
            .oneshot(Request::post("/questions/save").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["notification"], SAVED_NOTIFICATION);

        // The notification is shown once by the workspace view.
        let response = app
            .clone()
            .oneshot(Request::get("/workspace").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["notification"], SAVED_NOTIFICATION);
        let response = app
            .clone()
            .oneshot(Request::get("/workspace").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(json_body(response).await["notification"].is_null());

        let response = app
            .clone()
            .oneshot(Request::delete(format!("/questions/{}", id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!([]));

        let response = app
            .clone()
            .oneshot(Request::delete("/questions/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::post("/questions/load").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.orchestrator.questions().await.texts(), vec!["Plazo de ejecución"]);
    }

    #[tokio::test]
    async fn reset_restores_default_list() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app("[]", QuestionSet::from_texts(["custom"]), dir.path());

        let response = app
            .oneshot(Request::post("/questions/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(
            body.as_array().unwrap().len(),
            pdf_query::question_store::DEFAULT_QUESTIONS.len()
        );
        assert_eq!(body[0]["question"], "Título del contrato");
        assert_eq!(body[0]["answer"], "");
    }

    #[tokio::test]
    async fn save_failure_is_reported_with_the_user_message() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let (app, state) = app("[]", QuestionSet::from_texts(["A"]), &blocker.join("sub"));

        let response = app
            .clone()
            .oneshot(Request::post("/questions/save").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], pdf_query::error::SAVE_FAILED);

        let view = state.orchestrator.view().await;
        assert_eq!(view.notification.as_deref(), Some(pdf_query::error::SAVE_FAILED));
        assert_eq!(view.last_outcome, None);
    }

    fn post_data_uri(body: serde_json::Value) -> Request<Body> {
        Request::post("/document/data-uri")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn data_uri_document_is_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(r#"[{"question":"A","answer":"42"}]"#, QuestionSet::from_texts(["A"]), dir.path());

        let response = app
            .clone()
            .oneshot(post_data_uri(serde_json::json!({
                "name": "pliego.pdf",
                "data_uri": "data:application/pdf;base64,JVBERi0xLjc=",
                "dropped": true,
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["mime_type"], "application/pdf");

        let response = app
            .oneshot(Request::post("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[0]["answer"], "42");
    }

    #[tokio::test]
    async fn data_uri_that_is_not_base64_fails_to_encode() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app("[]", QuestionSet::from_texts(["A"]), dir.path());

        let response = app
            .clone()
            .oneshot(post_data_uri(serde_json::json!({
                "name": "notes.txt",
                "data_uri": "data:text/plain,hello%20world",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::post("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.orchestrator.view().await.last_outcome, Some(pdf_query::RunPhase::Failed));
    }

    #[tokio::test]
    async fn dropped_data_uri_must_be_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app("[]", QuestionSet::from_texts(["A"]), dir.path());

        let response = app
            .oneshot(post_data_uri(serde_json::json!({
                "name": "photo.png",
                "data_uri": "data:image/png;base64,iVBORw0KGgo=",
                "dropped": true,
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!state.orchestrator.view().await.has_document);
    }
}
