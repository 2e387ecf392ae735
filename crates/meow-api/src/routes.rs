use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};

use meow_gateway::connection;

use crate::state::AppState;
use crate::{moods, qna, spaces, users};

/// Full HTTP surface: REST tables, health check and the realtime gateway.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/spaces", post(spaces::create_space))
        .route("/spaces/{space_id}", get(spaces::get_space))
        .route("/spaces/code/{code}", get(spaces::get_space_by_code))
        .route("/spaces/{space_id}/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/spaces/{space_id}/moods", get(moods::get_moods).post(moods::insert_mood))
        .route("/questions", get(qna::get_questions))
        .route("/spaces/{space_id}/answers", get(qna::get_answers).put(qna::upsert_answer))
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.dispatcher.connection_count().await;
    Json(serde_json::json!({ "status": "ok", "connections": connections }))
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use meow_db::Database;
    use meow_gateway::dispatcher::Dispatcher;
    use meow_types::events::RealtimeEvent;

    use crate::state::AppStateInner;

    const QUESTION: &str = "00000000-0000-0000-0000-000000000101";

    fn app() -> (Router, Dispatcher) {
        let dispatcher = Dispatcher::new();
        let state = AppStateInner::new(Database::open_in_memory().unwrap(), dispatcher.clone());
        (router(state), dispatcher)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn space_with_user(app: &Router, name: &str) -> (String, String) {
        let (status, space) = call(app, Method::POST, "/spaces", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let space_id = space["id"].as_str().unwrap().to_string();
        let user = join(app, &space_id, name).await;
        (space_id, user)
    }

    async fn join(app: &Router, space_id: &str, name: &str) -> String {
        let (status, user) = call(
            app,
            Method::POST,
            &format!("/spaces/{space_id}/users"),
            Some(json!({ "name": name, "avatar_color": "bg-pastel-blue" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        user["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn space_lookup_by_code() {
        let (app, _) = app();
        let (_, space) = call(&app, Method::POST, "/spaces", None).await;
        let code = space["code"].as_str().unwrap().to_lowercase();

        let (status, found) = call(&app, Method::GET, &format!("/spaces/code/{code}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], space["id"]);

        let (status, body) = call(&app, Method::GET, "/spaces/code/ZZ", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");

        let (status, body) = call(&app, Method::GET, "/spaces/code/QQQQQQ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn health_reports_gateway_connections() {
        let (app, dispatcher) = app();
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "connections": 0 }));

        dispatcher.register_connection().await;
        let (_, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(body["connections"], 1);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let (app, _) = app();
        let uri = format!("/users/{}", uuid::Uuid::new_v4());
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mood_insert_broadcasts_and_lists() {
        let (app, dispatcher) = app();
        let (space_id, user_id) = space_with_user(&app, "Mia").await;
        let mut events = dispatcher.subscribe();

        let (status, mood) = call(
            &app,
            Method::POST,
            &format!("/spaces/{space_id}/moods"),
            Some(json!({
                "user_id": user_id,
                "emoji": "😊",
                "label": "Happy",
                "color": "bg-pastel-yellow",
                "tags": ["work", "work", "home"],
                "note": "   a long day   "
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(mood["note"], "a long day");
        assert_eq!(mood["tags"], json!(["work", "home"]));

        match events.recv().await.unwrap() {
            RealtimeEvent::MoodInserted { user_id: uid, .. } => assert_eq!(uid.to_string(), user_id),
            other => panic!("unexpected event {other:?}"),
        }

        let (status, list) = call(&app, Method::GET, &format!("/spaces/{space_id}/moods?limit=500"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["author"]["name"], "Mia");
    }

    #[tokio::test]
    async fn mood_from_foreign_user_is_rejected() {
        let (app, _) = app();
        let (space_a, _) = space_with_user(&app, "Mia").await;
        let (_, outsider) = space_with_user(&app, "Leo").await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/spaces/{space_a}/moods"),
            Some(json!({ "user_id": outsider, "emoji": "😢", "label": "Sad", "color": "bg-blue-100" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn answer_upsert_overwrites() {
        let (app, _) = app();
        let (space_id, user_id) = space_with_user(&app, "Mia").await;
        let uri = format!("/spaces/{space_id}/answers");

        for index in [0, 3] {
            let (status, _) = call(
                &app,
                Method::PUT,
                &uri,
                Some(json!({ "user_id": user_id, "question_id": QUESTION, "selected_option_index": index })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, list) = call(&app, Method::GET, &format!("{uri}?question_id={QUESTION}"), None).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["selected_option_index"], 3);
        assert_eq!(list[0]["question"]["text"], "Perfect lazy Sunday?");
    }

    #[tokio::test]
    async fn answer_index_out_of_range() {
        let (app, _) = app();
        let (space_id, user_id) = space_with_user(&app, "Mia").await;

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/spaces/{space_id}/answers"),
            Some(json!({ "user_id": user_id, "question_id": QUESTION, "selected_option_index": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/spaces/{space_id}/answers"),
            Some(json!({ "user_id": user_id, "question_id": uuid::Uuid::new_v4(), "selected_option_index": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn questions_are_seeded() {
        let (app, _) = app();
        let (status, questions) = call(&app, Method::GET, "/questions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(questions.as_array().unwrap().len(), 4);
        assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);
    }
}
