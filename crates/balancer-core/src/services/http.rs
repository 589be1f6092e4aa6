//! Port listener and forwarder: resolves a request to a site, selects a
//! healthy endpoint, and streams the upstream response back rather than
//! buffering it, since the balancer cannot assume arbitrary upstream
//! payloads fit comfortably in memory.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::{info, warn};
use reqwest::Client;

use crate::models::site::Site;
use crate::routing::PathTable;

const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Headers that must never be copied from the upstream response to the
/// client response.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
    "upgrade",
];

/// Entry point for every request accepted by a port's listener: resolves
/// the path to a site via the port's routing table, then hands off to
/// [`forward`]. Answers 404 directly when no site claims the path.
pub async fn route_request(
    req: HttpRequest,
    table: web::Data<Arc<PathTable>>,
    client: web::Data<Client>,
) -> HttpResponse {
    match table.match_path(req.path()) {
        Some(site) => forward(req, site, client.get_ref().clone()).await,
        None => HttpResponse::NotFound().body("no route matches this path"),
    }
}

/// Forwards one request to a healthy endpoint of `site` and streams the
/// response back.
async fn forward(req: HttpRequest, site: Arc<Site>, client: Client) -> HttpResponse {
    let endpoint = match site.select_endpoint().await {
        Ok(endpoint) => endpoint,
        Err(err) => {
            warn!("{err}");
            return err.to_response();
        }
    };

    let client_addr = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut target = endpoint.clone();
    target.set_path(req.path());
    if req.query_string().is_empty() {
        target.set_query(None);
    } else {
        target.set_query(Some(req.query_string()));
    }

    let upstream = match tokio::time::timeout(FORWARD_TIMEOUT, client.get(target.clone()).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!("upstream request to {target} failed: {err}");
            return HttpResponse::ServiceUnavailable().body("upstream request failed");
        }
        Err(_) => {
            warn!("upstream request to {target} timed out after {FORWARD_TIMEOUT:?}");
            return HttpResponse::ServiceUnavailable().body("upstream request timed out");
        }
    };

    let status = upstream.status().as_u16();
    let mut builder = HttpResponse::build(
        actix_web::http::StatusCode::from_u16(status).unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY),
    );

    for (name, value) in upstream.headers() {
        let name_str = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP.contains(&name_str.as_str()) {
            continue;
        }
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::from_bytes(name.as_ref()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            builder.append_header((header_name, header_value));
        }
    }

    info!(
        "site={} client={} upstream={} path={}",
        site.name,
        client_addr,
        endpoint.host_str().unwrap_or("unknown"),
        req.path()
    );

    let body_stream = upstream.bytes_stream().map(|chunk| {
        chunk.map_err(|err| {
            warn!("client write failure while streaming response body: {err}");
            actix_web::error::ErrorBadGateway(err)
        })
    });

    builder.streaming(body_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::build_port_index;
    use actix_web::{test, App};
    use reqwest::Url;
    use std::collections::HashMap;

    fn single_site_table(site: Arc<Site>) -> Arc<PathTable> {
        let mut sites = HashMap::new();
        sites.insert(site.name.clone(), site);
        let index = build_port_index(&sites).unwrap();
        Arc::new(index.into_values().next().unwrap())
    }

    #[actix_web::test]
    async fn missing_route_returns_404() {
        let site = Arc::new(Site::new(
            "a".to_string(),
            vec![Url::parse("http://127.0.0.1:1").unwrap()],
            Duration::from_secs(1),
            String::new(),
            "/a".to_string(),
            8080,
        ));
        let table = single_site_table(site);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(table))
                .app_data(web::Data::new(Client::new()))
                .default_service(web::to(route_request)),
        )
        .await;

        let req = test::TestRequest::get().uri("/unmatched").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn no_healthy_endpoint_returns_503() {
        let site = Arc::new(Site::new(
            "a".to_string(),
            vec![Url::parse("http://127.0.0.1:1").unwrap()],
            Duration::from_secs(1),
            String::new(),
            "/".to_string(),
            8080,
        ));
        let table = single_site_table(site);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(table))
                .app_data(web::Data::new(Client::new()))
                .default_service(web::to(route_request)),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);
    }

    #[actix_web::test]
    async fn healthy_endpoint_is_forwarded_to() {
        let upstream = actix_web::HttpServer::new(|| {
            App::new().route(
                "/hello",
                web::get().to(|| async { HttpResponse::Ok().body("world") }),
            )
        })
        .bind("127.0.0.1:0")
        .unwrap();
        let addr = upstream.addrs()[0];
        let running = upstream.run();
        let handle = running.handle();
        tokio::spawn(running);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let site = Arc::new(Site::new(
            "a".to_string(),
            vec![url.clone()],
            Duration::from_secs(1),
            String::new(),
            "/".to_string(),
            addr.port(),
        ));
        site.healthy.replace(vec![url]).await;
        let table = single_site_table(site);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(table))
                .app_data(web::Data::new(Client::new()))
                .default_service(web::to(route_request)),
        )
        .await;

        let req = test::TestRequest::get().uri("/hello").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body = test::read_body(resp).await;
        assert_eq!(body, "world");

        handle.stop(true).await;
    }
}
