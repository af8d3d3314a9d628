//! Mock HTTP server tests for `TavilySearch::search()`.

use std::time::Duration;

use pipeline::{ApiKey, ProviderFailure, SearchHit, SearchProvider, SourceLocator};
use search::{TavilyConfig, TavilySearch};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> TavilySearch {
    let config = TavilyConfig::new(ApiKey::new("tvly-mock").unwrap())
        .with_base_url(server.uri())
        .with_max_results(3);
    TavilySearch::new(config).unwrap()
}

async fn serve(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn sends_query_and_maps_results_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(serde_json::json!({
            "api_key": "tvly-mock",
            "query": "quantum computing",
            "max_results": 3,
            "search_depth": "basic"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": "quantum computing",
            "results": [
                { "title": "A", "url": "http://a", "content": "Q is...", "score": 0.9 },
                { "title": "B", "content": "more", "score": 0.5 },
                { "title": "C", "url": null, "content": "third", "score": 0.4 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server).search("quantum computing").await.unwrap();

    assert_eq!(
        hits,
        vec![
            SearchHit::new("Q is...", SourceLocator::new("http://a").unwrap()),
            SearchHit::without_locator("more"),
            SearchHit::without_locator("third"),
        ]
    );
}

#[tokio::test]
async fn empty_result_list_is_not_an_error() {
    let server = serve(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
    )
    .await;
    assert!(client(&server).search("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn bad_key_is_auth_failure() {
    let server = serve(ResponseTemplate::new(401).set_body_string("Unauthorized")).await;
    let err = client(&server).search("q").await.unwrap_err();
    assert_eq!(err.provider, "tavily");
    assert_eq!(err.failure, ProviderFailure::AuthFailed("Unauthorized".into()));
}

#[tokio::test]
async fn rate_limit_without_header_has_no_delay() {
    let server = serve(ResponseTemplate::new(429)).await;
    let err = client(&server).search("q").await.unwrap_err();
    assert_eq!(err.failure, ProviderFailure::RateLimited { retry_after: None });
}

#[tokio::test]
async fn missing_results_key_is_invalid_response() {
    let server = serve(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": "x" })),
    )
    .await;
    let err = client(&server).search("q").await.unwrap_err();
    assert!(matches!(err.failure, ProviderFailure::InvalidResponse(_)));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = serve(
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "results": [] }))
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    let config = TavilyConfig::new(ApiKey::new("k").unwrap())
        .with_base_url(server.uri())
        .with_request_timeout(Duration::from_millis(100));
    let err = TavilySearch::new(config)
        .unwrap()
        .search("q")
        .await
        .unwrap_err();
    assert_eq!(err.failure, ProviderFailure::Timeout);
}
