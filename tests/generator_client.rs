//! Integration tests for C6's HTTP client to the message-generator service
//! (`MessageGeneratorClient`), exercised against a `wiremock` mock server
//! instead of a real `/generate` endpoint.

use nearyou::generator_client::MessageGeneratorClient;
use nearyou::models::{Poi, UserProfile};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile() -> UserProfile {
    UserProfile {
        user_id: 7,
        age: 30,
        profession: "Ingegnere".to_string(),
        interests: "tecnologia, cucina".to_string(),
    }
}

fn poi() -> Poi {
    Poi {
        shop_id: 1,
        shop_name: "Caffè X".to_string(),
        category: "bar".to_string(),
        distance_m: 12.0,
    }
}

#[tokio::test]
async fn successful_response_yields_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Sei vicino a Caffè X!",
            "cached": false,
        })))
        .mount(&server)
        .await;

    let client = MessageGeneratorClient::new(server.uri());
    let message = client.generate(&profile(), &poi()).await;

    assert_eq!(message.as_deref(), Some("Sei vicino a Caffè X!"));
}

#[tokio::test]
async fn server_error_is_treated_as_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = MessageGeneratorClient::new(server.uri());
    let message = client.generate(&profile(), &poi()).await;

    assert_eq!(message, None);
}

#[tokio::test]
async fn unreachable_server_is_treated_as_no_message() {
    // Nothing is listening on this port.
    let client = MessageGeneratorClient::new("http://127.0.0.1:1".to_string());
    let message = client.generate(&profile(), &poi()).await;

    assert_eq!(message, None);
}
