use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use paperhub_clients::{EmbederClient, EmbeddingEndpoint};
use paperhub_recommender::EmbeddingModel;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const RATE_LIMITED: &str =
    r#"{"error":{"message":"Rate limit reached","type":"rate_limit","param":null,"code":null}}"#;

async fn answer(mut socket: TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Answers every request with the same status and body, counting requests.
async fn spawn_endpoint(status: &'static str, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = requests.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(answer(socket, status, body));
        }
    });

    (addr, requests)
}

fn client_for(addr: SocketAddr) -> EmbederClient {
    let endpoint = EmbeddingEndpoint::new(&format!("http://{}/v1", addr), "test-key", "all-MiniLM-L6-v2").unwrap();
    EmbederClient::from_client(endpoint)
}

#[tokio::test]
async fn test_rate_limited_embedding_fails_after_one_request() {
    let (addr, requests) = spawn_endpoint("429 Too Many Requests", RATE_LIMITED).await;
    let client = client_for(addr);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        <EmbederClient as EmbeddingModel>::embed(&client, "hello"),
    )
    .await
    .expect("rate limited call must not be retried");

    assert!(result.is_err());
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_is_returned_once() {
    let (addr, requests) = spawn_endpoint(
        "500 Internal Server Error",
        r#"{"error":{"message":"boom","type":"server_error","param":null,"code":null}}"#,
    )
    .await;
    let client = client_for(addr);

    let result = tokio::time::timeout(Duration::from_secs(5), client.embed(vec!["a".to_string()]))
        .await
        .unwrap();

    assert!(result.is_err());
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_embeddings_are_ordered_by_index() {
    let (addr, requests) = spawn_endpoint(
        "200 OK",
        r#"{"object":"list","model":"all-MiniLM-L6-v2","data":[
            {"object":"embedding","index":1,"embedding":[0.0,1.0]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"usage":{"prompt_tokens":2,"total_tokens":2}}"#,
    )
    .await;
    let client = client_for(addr);

    let embeddings = client
        .embed(vec!["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    assert_eq!(client.model(), "all-MiniLM-L6-v2");
}
