use crate::{
    config::{Config, CorsConfig, UploadConfig},
    routes::api_routes,
    telemetry::Metrics,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    Router,
};
use axum_otel_metrics::HttpMetricsLayerBuilder;
use deepfake_detection::InferenceService;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Clone)]
pub struct SharedState {
    pub inference: Arc<InferenceService>,
    pub metrics: Arc<Metrics>,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_router(state: SharedState, upload: &UploadConfig, cors: &CorsConfig) -> Router {
    let metrics_layer = HttpMetricsLayerBuilder::new().build();

    Router::new()
        .merge(api_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(upload.max_bytes))
        .layer(cors_layer(cors))
        .layer(metrics_layer)
}

impl HttpServer {
    pub async fn new(state: SharedState, config: &Config) -> anyhow::Result<Self> {
        let addr = config.server.get_address();
        let router = build_router(state, &config.upload, &config.cors);
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
        response::Response,
    };
    use deepfake_detection::{config::PipelineConfig, DetectionError, ModelInfo, ModelService};
    use image::{ImageBuffer, ImageFormat, Rgb};
    use ndarray::{ArrayView4, Axis};
    use serde_json::Value;
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "deepfake-test-boundary";

    struct StubModel(f32);

    impl ModelService for StubModel {
        fn predict(
            &self,
            batch: ArrayView4<f32>,
            _batch_size: usize,
        ) -> Result<Vec<f32>, DetectionError> {
            Ok(vec![self.0; batch.len_of(Axis(0))])
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                backend: "stub".into(),
                inputs: vec!["input".into()],
                outputs: vec!["output".into()],
                instances: 1,
            }
        }
    }

    fn router(upload: UploadConfig) -> Router {
        let model: Arc<dyn ModelService> = Arc::new(StubModel(0.9));
        let state = SharedState {
            inference: Arc::new(InferenceService::new(model, PipelineConfig::default())),
            metrics: Arc::new(Metrics::new().unwrap()),
        };
        build_router(state, &upload, &CorsConfig::default())
    }

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(64, 48, Rgb([10, 120, 240]));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn multipart_request(
        field: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/classify")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_routes() {
        for uri in ["/", "/health"] {
            let response = router(UploadConfig::default())
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["status"], "ok");
            assert_eq!(body["message"], "Server is running");
        }
    }

    #[tokio::test]
    async fn test_model_info_route() {
        let response = router(UploadConfig::default())
            .oneshot(Request::get("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Model loaded successfully");
        assert_eq!(body["model_info"]["backend"], "stub");
    }

    #[tokio::test]
    async fn test_classify_image() {
        let request = multipart_request("mediaFile", "face.png", "image/png", &png_bytes());
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["classification"], "Fake");
        assert_eq!(body["predictions"].as_array().unwrap().len(), 1);
        let best = body["best_prediction"].as_f64().unwrap();
        assert!((best - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_classify_missing_field() {
        let request = multipart_request("attachment", "face.png", "image/png", &png_bytes());
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_classify_empty_filename() {
        let request = multipart_request("mediaFile", "", "image/png", &png_bytes());
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file selected");
    }

    #[tokio::test]
    async fn test_classify_rejects_unsupported_type() {
        let request = multipart_request("mediaFile", "notes.txt", "text/plain", b"hello");
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].to_string();
        assert!(error.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_classify_rejects_empty_file() {
        let request = multipart_request("mediaFile", "face.png", "image/png", b"");
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Empty file");
    }

    #[tokio::test]
    async fn test_classify_corrupt_image() {
        let request = multipart_request("mediaFile", "face.jpg", "image/jpeg", b"not a jpeg");
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_classify_rejects_oversized_upload() {
        let upload = UploadConfig { max_bytes: 1024 };
        let request = multipart_request("mediaFile", "face.png", "image/png", &[7u8; 4096]);
        let response = router(upload).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[cfg(not(feature = "video"))]
    #[tokio::test]
    async fn test_video_requires_feature() {
        let clip = b"\x00\x00\x00\x18ftyp";
        let request = multipart_request("mediaFile", "clip.mp4", "video/mp4", clip);
        let response = router(UploadConfig::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let app = router(UploadConfig::default());
        let request = multipart_request("mediaFile", "face.png", "image/png", &png_bytes());
        app.clone().oneshot(request).await.unwrap();

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
