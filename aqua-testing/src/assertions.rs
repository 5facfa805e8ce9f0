// Assertion helpers for test responses

use crate::TestResponse;
use serde_json::Value;

/// Assert that response has expected status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {} with body {:?}",
        expected,
        response.status(),
        response.body_string()
    );
}

/// Assert that the response body is exactly `expected`
pub fn assert_json(response: &TestResponse, expected: &Value) {
    let actual = response.json();
    assert_eq!(
        &actual, expected,
        "JSON mismatch:\nExpected: {}\nActual: {}",
        expected, actual
    );
}

/// Assert that response has header with value
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    match response.header(key) {
        Some(actual) => assert_eq!(
            actual, expected,
            "Header '{}' mismatch: expected '{}', got '{}'",
            key, expected, actual
        ),
        None => panic!("Header '{}' not found", key),
    }
}

/// Assert that response body contains text
pub fn assert_body_contains(response: &TestResponse, text: &str) {
    let body = response.body_string().unwrap_or_default();
    assert!(
        body.contains(text),
        "Body does not contain '{}'\nBody: {}",
        text,
        body
    );
}

/// Assert a 400 validation failure reporting the given fields, in order
pub fn assert_validation_error(response: &TestResponse, fields: &[&str]) {
    assert_status(response, 400);
    let body = response.json();
    assert_eq!(body["error"], "Validation Error", "Unexpected body: {}", body);

    let reported: Vec<&str> = body["details"]
        .as_array()
        .map(|details| details.iter().filter_map(|d| d["field"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(reported, fields, "Unexpected validation details: {}", body);
}

pub fn assert_success(response: &TestResponse) {
    assert!(
        (200..300).contains(&response.status()),
        "Expected success status, got {}",
        response.status()
    );
}

pub fn assert_client_error(response: &TestResponse) {
    assert!(
        (400..500).contains(&response.status()),
        "Expected client error status, got {}",
        response.status()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_core::HttpResponse;
    use serde_json::json;

    fn response(status: u16, body: Value) -> TestResponse {
        TestResponse::new(HttpResponse {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap(),
        })
    }

    #[test]
    fn test_passing_assertions() {
        let res = response(201, json!({"user": {"name": "Ann"}}));
        assert_status(&res, 201);
        assert_success(&res);
        assert_json(&res, &json!({"user": {"name": "Ann"}}));
        assert_header(&res, "content-type", "application/json");
        assert_body_contains(&res, "Ann");
    }

    #[test]
    fn test_validation_error_assertion() {
        let res = response(
            400,
            json!({
                "error": "Validation Error",
                "message": "Validation failed",
                "details": [
                    {"field": "name", "message": "Expected string, but got number"},
                    {"field": "age", "message": "Expected number, but got string"}
                ]
            }),
        );
        assert_client_error(&res);
        assert_validation_error(&res, &["name", "age"]);
    }

    #[test]
    #[should_panic(expected = "Expected status 200")]
    fn test_status_mismatch_panics() {
        assert_status(&response(404, json!({"error": "Not Found"})), 200);
    }

    #[test]
    #[should_panic(expected = "Header 'x-missing' not found")]
    fn test_missing_header_panics() {
        assert_header(&response(200, json!({})), "x-missing", "1");
    }
}
