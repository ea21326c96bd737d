use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::ProbeError;
use crate::models::{now_secs, ProbeResult};

#[derive(Debug, Deserialize)]
pub struct PingRequest {
    pub host: String,
    pub count: Option<u32>,
    /// Seconds.
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub host: String,
    #[serde(default = "default_level")]
    pub optimization_level: u8,
}

fn default_level() -> u8 { 1 }

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "PingBooster API Server", "status": "running" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": now_secs() }))
}

pub async fn ping(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<PingRequest>,
) -> Result<Json<ProbeResult>, ProbeError> {
    let count = req.count.unwrap_or(engine.config.default_count);
    let timeout = req
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| engine.config.default_timeout());
    let result = engine.measure(&req.host, count, timeout).await?;
    Ok(Json(result))
}

pub async fn optimize(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<Value>, ProbeError> {
    let result = engine.optimize(&req.host, req.optimization_level).await?;
    Ok(Json(json!({ "success": true, "result": result })))
}

pub async fn ping_history(State(engine): State<Arc<Engine>>) -> Json<Value> {
    let results = engine.recent_history(engine.config.history_page);
    Json(json!({ "results": results }))
}

pub async fn servers(State(engine): State<Arc<Engine>>) -> Json<Value> {
    Json(json!({ "servers": engine.servers() }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(engine): State<Arc<Engine>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, engine))
}

async fn handle_socket(mut socket: WebSocket, engine: Arc<Engine>) {
    let mut sub = engine.subscribe();

    loop {
        tokio::select! {
            event = sub.recv() => {
                let Some(event) = event else { break };
                let msg = match serde_json::to_string(&event) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Failed to serialize ws event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Client frames only keep the connection alive.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    engine.unsubscribe(sub.id());
}

pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/ping", post(ping))
        .route("/api/optimize", post(optimize))
        .route("/api/ping-history", get(ping_history))
        .route("/api/servers", get(servers))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

pub async fn start_server(port: u16, engine: Arc<Engine>) -> anyhow::Result<()> {
    let app = create_router(engine);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on http://localhost:{}", addr.port());
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProbeCommand;
    use crate::config::ServerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    struct NoSpawn;

    impl ProbeCommand for NoSpawn {
        fn build(&self, _host: &str, _count: u32) -> Vec<String> {
            Vec::new()
        }
    }

    fn router() -> (Router, Arc<Engine>) {
        let engine = Arc::new(Engine::with_command(
            ServerConfig::default(),
            Arc::new(NoSpawn),
        ));
        (create_router(Arc::clone(&engine)), engine)
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_and_servers() {
        let (app, _) = router();
        let res = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "healthy");

        let res = app
            .oneshot(Request::get("/api/servers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(res).await;
        assert_eq!(body["servers"][1]["host"], "1.1.1.1");
    }

    #[tokio::test]
    async fn ping_with_bad_count_is_rejected() {
        let (app, engine) = router();
        let req = Request::post("/api/ping")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"host": "8.8.8.8", "count": 0}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(engine.recent_history(10).is_empty());
    }

    #[tokio::test]
    async fn faulty_probe_still_answers_with_a_result() {
        let (app, engine) = router();
        let req = Request::post("/api/ping")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"host": "8.8.8.8"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["latency"], 999.0);

        // error results are not kept in history
        let res = app
            .oneshot(Request::get("/api/ping-history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(res).await["results"], json!([]));
        assert!(engine.recent_history(10).is_empty());
    }

    async fn next_json<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn websocket_observer_lifecycle() {
        let (app, engine) = router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();

        let catch_up = next_json(&mut ws).await;
        assert_eq!(catch_up["kind"], "history");
        assert_eq!(catch_up["value"], json!([]));
        assert_eq!(engine.observer_count(), 1);

        engine
            .measure("8.8.8.8", 1, Duration::from_secs(1))
            .await
            .unwrap();
        let live = next_json(&mut ws).await;
        assert_eq!(live["kind"], "result");
        assert_eq!(live["value"]["host"], "8.8.8.8");
        assert_eq!(live["value"]["status"], "error");

        ws.close(None).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while engine.observer_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("observer removed after the client closed");
    }
}
