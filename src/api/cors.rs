use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// `*` allows any origin; otherwise a comma separated list of exact origins.
pub fn cors_layer(allowed: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);

    if allowed.trim() == "*" {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod test {
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use http::{Request, header};
    use tower::ServiceExt;

    use super::*;

    async fn allow_origin(allowed: &str, origin: &str) -> Option<HeaderValue> {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(allowed));

        let req = Request::get("/")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn test_wildcard() {
        let value = allow_origin("*", "https://snake.example").await;
        assert_eq!(value.unwrap(), "*");
    }

    #[tokio::test]
    async fn test_origin_list() {
        let allowed = "https://snake.example, https://other.example";

        let value = allow_origin(allowed, "https://other.example").await;
        assert_eq!(value.unwrap(), "https://other.example");

        assert!(allow_origin(allowed, "https://evil.example").await.is_none());
    }
}
