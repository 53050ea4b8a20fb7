#![allow(unused_crate_dependencies)]

use std::time::Duration;

use query_client::{
    Client, ExecutionLink, FetchStatus, Link, Operation, OperationSource, QueryController, QueryOptions, Variables,
};
use query_client_http::{HttpLink, HttpLinkConfig};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const QUERY: &str = "query ArticleQuery($articleId: String!) { anyWork(id: $articleId) { headline } }";

fn init_logs() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

fn variables(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("variables must be an object"),
    }
}

async fn mock_server(template: ResponseTemplate) -> MockServer {
    let mock_server = MockServer::builder().start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .respond_with(template)
        .mount(&mock_server)
        .await;

    mock_server
}

fn config(server: &MockServer) -> HttpLinkConfig {
    HttpLinkConfig::new(format!("{}/graphql", server.uri()).parse().unwrap())
}

fn text_source() -> OperationSource {
    query_client::gql!("query Viewer { viewer { id } }")
        .unwrap()
        .try_into()
        .unwrap()
}

#[tokio::test]
async fn posts_the_operation_wire_shape() {
    init_logs();
    let server = MockServer::builder().start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": "query Viewer { viewer { id } } ",
            "variables": {"first": 10},
            "operationName": "Viewer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"viewer": {"id": "1"}}})))
        .expect(1)
        .mount(&server)
        .await;

    let link = HttpLink::new(config(&server)).unwrap();
    let client = Client::new(Link::new(link));
    let operation = client
        .create_operation(&text_source(), Some(variables(json!({"first": 10}))))
        .unwrap();

    let data = client.load(&operation).await.unwrap();

    assert_eq!(data, Some(json!({"viewer": {"id": "1"}})));
    assert_eq!(client.store().get(&operation), data);
}

#[tokio::test]
async fn structured_documents_are_printed() {
    init_logs();
    let server = mock_server(ResponseTemplate::new(200).set_body_json(json!({"data": {"anyWork": null}}))).await;
    let link = HttpLink::new(config(&server)).unwrap();
    let client = Client::new(Link::new(link));
    let operation = client
        .create_operation(
            &OperationSource::parse_document(QUERY).unwrap(),
            Some(variables(json!({"articleId": "hola"}))),
        )
        .unwrap();

    client.link().execute_once(&operation).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["operationName"], json!("ArticleQuery"));
    assert_eq!(body["variables"], json!({"articleId": "hola"}));
    assert!(body["query"].as_str().unwrap().starts_with("query ArticleQuery($articleId: String!)"));
}

#[tokio::test]
async fn server_errors_are_execution_errors() {
    init_logs();
    let server = mock_server(ResponseTemplate::new(500)).await;
    let link = HttpLink::new(config(&server)).unwrap();
    let operation = Operation::build(&text_source(), None).unwrap();

    let error = link.execute_once(&operation).await.unwrap_err();

    assert!(error.to_string().contains("500"), "{error}");
}

#[tokio::test]
async fn undecodable_bodies_are_execution_errors() {
    init_logs();
    let server = mock_server(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    let link = HttpLink::new(config(&server)).unwrap();
    let operation = Operation::build(&text_source(), None).unwrap();

    assert!(link.execute_once(&operation).await.is_err());
}

#[tokio::test]
async fn slow_servers_time_out() {
    init_logs();
    let server = mock_server(
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"viewer": null}}))
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    let link = HttpLink::new(HttpLinkConfig {
        timeout: Duration::from_millis(100),
        ..config(&server)
    })
    .unwrap();
    let operation = Operation::build(&text_source(), None).unwrap();

    assert!(link.execute_once(&operation).await.is_err());
}

#[tokio::test]
async fn controller_fetches_over_http() {
    init_logs();
    let server = mock_server(
        ResponseTemplate::new(200).set_body_json(json!({"data": {"anyWork": {"headline": "hola"}}})),
    )
    .await;
    let client = Client::new(HttpLink::runtime_link(config(&server)).unwrap());

    let mut controller = QueryController::new(
        &client,
        OperationSource::parse_document(QUERY).unwrap(),
        QueryOptions::with_variables(variables(json!({"articleId": "hola"}))),
    )
    .unwrap();
    assert_eq!(controller.status(), FetchStatus::Loading);

    controller.next_update().await.unwrap();

    assert_eq!(controller.status(), FetchStatus::Success);
    assert_eq!(
        controller.state().data,
        Some(json!({"anyWork": {"headline": "hola"}}))
    );

    // the single response completes the subscription
    controller.next_update().await.unwrap();
    assert!(controller.next_update().await.is_none());
}

#[tokio::test]
async fn controller_reports_http_failures() {
    init_logs();
    let server = mock_server(ResponseTemplate::new(502)).await;
    let client = Client::new(HttpLink::runtime_link(config(&server)).unwrap());

    let mut controller = QueryController::new(&client, text_source(), QueryOptions::default()).unwrap();
    controller.next_update().await.unwrap();

    assert_eq!(controller.status(), FetchStatus::Failure);
    assert!(controller.state().error);
    assert!(!controller.state().loading);
    assert!(client.store().is_empty());
}
