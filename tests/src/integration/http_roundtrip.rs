//! # HTTP Round-Trip
//!
//! Drives the public and admin routers with `tower::ServiceExt::oneshot`,
//! exactly as a client would see them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use eg_01_routing_engine::{CatalogRouter, ServiceInstance};
    use eg_02_api_gateway::{ApiGatewayService, AppState, GatewayConfig};
    use eg_telemetry::RoutingMetrics;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::integration::fixture::{Cluster, SERVICE};

    struct Gateway {
        http: Router,
        admin: Router,
        cluster: Cluster,
    }

    fn gateway() -> Gateway {
        let cluster = Cluster::new(&["node1", "node2", "node3"]);
        cluster.catalog.register(
            SERVICE,
            ServiceInstance::new("node3", "10.0.0.3", 50052).with_tag("chain:btc"),
        );
        let catalog_router = Arc::new(CatalogRouter::new(
            cluster.config.clone(),
            Arc::clone(&cluster.guard),
            cluster.catalog.clone(),
        ));
        let state = AppState::new(
            cluster.engine.clone(),
            catalog_router,
            RoutingMetrics::standalone().unwrap(),
        );
        let service = ApiGatewayService::new(GatewayConfig::default(), state).unwrap();
        Gateway {
            http: service.build_http_router(),
            admin: service.build_admin_router(),
            cluster,
        }
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register(router: &Router, node: &str, key: &str) -> (StatusCode, Value) {
        call(
            router,
            Method::POST,
            "/v1/register",
            Some(json!({ "node_id": node, "data_id": key })),
        )
        .await
    }

    #[tokio::test]
    async fn test_register_resolve_scenario() {
        let gw = gateway();

        let (status, body) = register(&gw.http, "node1", "btc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "registered");
        let (_, body) = register(&gw.http, "node2", "btc").await;
        assert_eq!(body["total_nodes"], 2);

        let mut picks = Vec::new();
        for _ in 0..4 {
            let (status, body) = call(&gw.http, Method::GET, "/v1/nodes/btc", None).await;
            assert_eq!(status, StatusCode::OK);
            picks.push(body["node_id"].as_str().unwrap().to_string());
        }
        assert_eq!(picks, ["node1", "node2", "node1", "node2"]);

        let (status, body) = register(&gw.http, "node9", "btc").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], 403);
        assert_eq!(
            gw.cluster.kv.raw("event-catcher/nodes/btc").as_deref(),
            Some(b"node1,node2".as_slice())
        );

        let (status, body) = call(&gw.http, Method::GET, "/v1/nodes/unknown-key", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_500_with_reason() {
        let gw = gateway();
        gw.cluster.kv.fail_next(1);

        let (status, body) = register(&gw.http, "node1", "btc").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["kind"], "INTERNAL");
        assert_eq!(body["error"]["reason"], "store");
    }

    #[tokio::test]
    async fn test_chain_endpoint() {
        let gw = gateway();

        let (status, body) = call(&gw.http, Method::GET, "/v1/chains/btc/node", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], true);
        assert_eq!(body["node_id"], "node3");
        assert_eq!(body["node_address"], "10.0.0.3:50052");

        let (status, body) = call(&gw.http, Method::GET, "/v1/chains/ltc/node", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "available": false }));
    }

    #[tokio::test]
    async fn test_admin_reload_applies_to_public_api() {
        let gw = gateway();
        register(&gw.http, "node1", "btc").await;
        register(&gw.http, "node2", "btc").await;

        let (status, _) = call(
            &gw.admin,
            Method::PUT,
            "/admin/authorization",
            Some(json!({ "nodes": ["node2"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        for _ in 0..3 {
            let (_, body) = call(&gw.http, Method::GET, "/v1/nodes/btc", None).await;
            assert_eq!(body["node_id"], "node2");
        }

        let (status, _) = register(&gw.http, "node1", "eth").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let gw = gateway();
        let response = gw
            .http
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "trace-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "trace-42");
    }
}
