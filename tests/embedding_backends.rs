//! HTTP embedding backends against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exam_verifier::config::EmbeddingConfig;
use exam_verifier::embedding::{EmbeddingProvider, OllamaProvider, OpenAIProvider};
use exam_verifier::error::EmbeddingError;

fn config_for(server: &MockServer, provider: &str, batch_size: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: provider.to_string(),
        model: Some("test-embed".to_string()),
        dims: Some(2),
        url: Some(server.uri()),
        batch_size,
        max_retries: 1,
        timeout_secs: 5,
    }
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_openai_splits_batches_and_keeps_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "input": ["alpha", "beta"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "input": ["gamma"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [0.5, 0.5] }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&config_for(&server, "openai", 2), "test-key").unwrap();
    let vectors = provider
        .embed_batch(&texts(&["alpha", "beta", "gamma"]))
        .await
        .unwrap();

    assert_eq!(
        vectors,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
}

#[tokio::test]
async fn test_openai_client_error_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&config_for(&server, "openai", 8), "wrong").unwrap();
    let err = provider.embed("what is calculus?").await.unwrap_err();

    match err {
        EmbeddingError::Transport(message) => assert!(message.contains("401")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_wrong_dimensions_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [1.0, 0.0, 0.0] }]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAIProvider::with_api_key(&config_for(&server, "openai", 8), "test-key").unwrap();
    let err = provider.embed("q").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Malformed(_)));
}

#[tokio::test]
async fn test_ollama_retries_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.25, 0.75]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&config_for(&server, "ollama", 8)).unwrap();
    let vector = provider.embed("what is calculus?").await.unwrap();
    assert_eq!(vector, vec![0.25, 0.75]);
}
