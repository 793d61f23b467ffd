// ABOUTME: Integration tests for the HTTP metrics service against a mock server.
// ABOUTME: Tests form submission, export download and missing-control reporting.

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use reqwest::blocking::Client;
use statement_miner::{HttpMetricsService, MetricsService, ServiceError};

const FORM_PAGE: &str = r#"<html><body>
<form action="/analyze" method="post">
    <input type="hidden" name="token" value="t-1">
    <textarea id="text" name="text"></textarea>
    <input type="submit" value="Analisar">
</form>
</body></html>"#;

const RESULT_PAGE: &str = r#"<html><body>
<table><tr><td>Words</td><td>3</td></tr></table>
<a id="export" href="/export/data.csv">Exportar</a>
</body></html>"#;

const METRICS: &str = ",Group,Metric,Value\n0,Basic,Words,3\n";

fn service(server: &MockServer) -> HttpMetricsService {
    HttpMetricsService::new(
        Client::new(),
        &server.url("/cohmetrixport"),
        "text",
        "export",
    )
    .unwrap()
}

#[test]
fn submit_then_download_export() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/cohmetrixport");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(FORM_PAGE);
    });
    let analyze = server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(RESULT_PAGE);
    });
    let export = server.mock(|when, then| {
        when.method(GET).path("/export/data.csv");
        then.status(200)
            .header("content-type", "text/csv")
            .body(METRICS);
    });

    let mut service = service(&server);
    service.submit("leia dois números").unwrap();
    let bytes = service.fetch_result().unwrap();

    page.assert();
    analyze.assert();
    export.assert();
    assert_eq!(String::from_utf8(bytes).unwrap(), METRICS);
}

#[test]
fn missing_text_control_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cohmetrixport");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body("<html><body><p>Manutenção</p></body></html>");
    });

    let mut service = service(&server);
    let err = service.submit("texto").unwrap_err();
    assert!(err.is_missing_control(), "{}", err);
    assert!(err.to_string().contains("'#text'"), "{}", err);
}

#[test]
fn missing_export_control_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cohmetrixport");
        then.status(200).body(FORM_PAGE);
    });
    server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(200).body("<html><body><p>sem resultado</p></body></html>");
    });

    let mut service = service(&server);
    service.submit("texto").unwrap();
    let err = service.fetch_result().unwrap_err();
    assert!(err.to_string().contains("'#export'"), "{}", err);
}

#[test]
fn server_error_fails_submission() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cohmetrixport");
        then.status(503);
    });

    let mut service = service(&server);
    assert!(matches!(
        service.submit("texto").unwrap_err(),
        ServiceError::Http(_)
    ));
}

#[test]
fn fetch_without_submit_fails() {
    let server = MockServer::start();
    let mut service = service(&server);
    assert!(matches!(
        service.fetch_result().unwrap_err(),
        ServiceError::NotSubmitted
    ));
}
