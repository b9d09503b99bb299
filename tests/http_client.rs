use histo_lense_lib::models::classify_types::Prediction;
use histo_lense_lib::models::session_types::{ImageCandidate, SessionState, UploadedImage};
use histo_lense_lib::services::history_store::{HistoryStore, MemoryBackend};
use histo_lense_lib::services::inference_client::{HttpInferenceClient, InferenceClient};
use histo_lense_lib::services::upload;
use histo_lense_lib::{AppError, SessionController};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Serves exactly one canned response and hands back the raw request.
async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (base_url, rx)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if request_complete(&buf) {
            break;
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let headers = text[..header_end].to_ascii_lowercase();
    let body_len = buf.len() - (header_end + 4);
    if let Some(line) = headers.lines().find(|l| l.starts_with("content-length:")) {
        let expected: usize = line["content-length:".len()..].trim().parse().unwrap_or(0);
        return body_len >= expected;
    }
    text.ends_with("0\r\n\r\n")
}

fn slide() -> UploadedImage {
    upload::validate(ImageCandidate::new("slide.jpg", "image/jpeg", b"fake-jpeg-bytes".to_vec())).unwrap()
}

#[tokio::test]
async fn posts_multipart_image_field() {
    let (base_url, request) = one_shot_server(
        "200 OK",
        r#"{"prediction":"Malignant","confidence":87.5,"heatmapUrl":"http://host/heatmap.png"}"#,
    )
    .await;
    let client = HttpInferenceClient::new(&base_url, Some(Duration::from_secs(5))).unwrap();

    let result = client.predict(slide()).await.unwrap();
    assert_eq!(result.prediction, Prediction::Malignant);
    assert_eq!(result.confidence, 87.5);
    assert_eq!(result.heatmap_url.as_deref(), Some("http://host/heatmap.png"));

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /predict HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("content-type: multipart/form-data"));
    assert!(request.contains(r#"name="image"; filename="slide.jpg""#));
    assert!(request.contains("Content-Type: image/jpeg"));
    assert!(request.contains("fake-jpeg-bytes"));
}

#[tokio::test]
async fn detail_from_error_body() {
    let (base_url, _request) =
        one_shot_server("503 Service Unavailable", r#"{"detail":"model unavailable"}"#).await;
    let client = HttpInferenceClient::new(&base_url, None).unwrap();

    let err = client.predict(slide()).await.unwrap_err();
    assert_eq!(err, AppError::Service("model unavailable".into()));
}

#[tokio::test]
async fn status_text_when_body_is_not_json() {
    let (base_url, _request) = one_shot_server("500 Internal Server Error", "oops").await;
    let client = HttpInferenceClient::new(&base_url, None).unwrap();

    let err = client.predict(slide()).await.unwrap_err();
    assert_eq!(err, AppError::Service("Internal Server Error".into()));
}

#[tokio::test]
async fn malformed_success_body_is_service_error() {
    let (base_url, _request) = one_shot_server("200 OK", r#"{"label":"cat"}"#).await;
    let client = HttpInferenceClient::new(&base_url, None).unwrap();

    assert!(matches!(client.predict(slide()).await, Err(AppError::Service(_))));
}

#[tokio::test]
async fn connection_refused_is_service_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpInferenceClient::new(&base_url, Some(Duration::from_secs(5))).unwrap();
    assert!(matches!(client.predict(slide()).await, Err(AppError::Service(_))));
}

#[tokio::test]
async fn timeout_is_enforced() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = HttpInferenceClient::new(&base_url, Some(Duration::from_millis(300))).unwrap();
    let err = client.predict(slide()).await.unwrap_err();
    assert_eq!(err.kind(), "service");
}

#[tokio::test]
async fn failed_service_call_leaves_history_unchanged() {
    let (base_url, _request) =
        one_shot_server("503 Service Unavailable", r#"{"detail":"model unavailable"}"#).await;
    let client = HttpInferenceClient::new(&base_url, None).unwrap();
    let controller = SessionController::new(
        Arc::new(client),
        HistoryStore::load_on_init(Box::new(MemoryBackend::new())),
    );

    controller
        .select_file(ImageCandidate::new("slide.jpg", "image/jpeg", vec![0; 1024]))
        .unwrap();
    let snapshot = controller.submit().await;
    assert_eq!(snapshot.state, SessionState::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("model unavailable"));
    assert!(snapshot.history.is_empty());
}
