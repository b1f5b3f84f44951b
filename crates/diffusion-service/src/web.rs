//! Embedded HTTP server for the diffusion routes.

#![allow(missing_docs)]

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;

use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::bridge::{DiffusionRoute, ExecutionBridge};
use crate::config::WebConfig;
use crate::error::ServiceError;
use crate::resolver::TargetIds;
use crate::task::DiffusionParameters;

const ROUTE_PREFIX: &str = "/diffusion/v1/";

pub struct WebServer {
    handle: thread::JoinHandle<()>,
    pub listen: String,
}

impl WebServer {
    /// Blocks until the accept loop exits.
    pub fn join(self) -> Result<(), ServiceError> {
        self.handle
            .join()
            .map_err(|_| ServiceError::Server("web server thread panicked".into()))
    }
}

/// Binds `config.listen` and serves each request on its own thread.
pub fn start_diffusion_server(
    config: &WebConfig,
    bridge: Arc<ExecutionBridge>,
) -> Result<WebServer, ServiceError> {
    if !config.enabled {
        return Err(ServiceError::Server("web disabled".into()));
    }
    let server = Server::http(config.listen.as_str())
        .map_err(|err| ServiceError::Server(format!("web bind: {err}").into()))?;
    let listen = server
        .server_addr()
        .to_ip()
        .map_or_else(|| config.listen.to_string(), |addr| addr.to_string());
    info!("diffusion routes listening on http://{listen}{ROUTE_PREFIX}");
    let handle = thread::spawn(move || {
        for request in server.incoming_requests() {
            let bridge = bridge.clone();
            thread::spawn(move || handle_request(request, &bridge));
        }
    });
    Ok(WebServer { handle, listen })
}

/// Maps a request path onto a route and its explicit identifiers.
///
/// Returns `None` for unknown paths and for non-numeric identifiers.
pub fn match_route(url: &str) -> Option<(DiffusionRoute, Option<TargetIds>)> {
    let path = url.split('?').next().unwrap_or(url);
    let rest = path.strip_prefix(ROUTE_PREFIX)?;
    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        ["currentView", "diffuse"] => Some((DiffusionRoute::CurrentViewDiffuse, None)),
        ["currentView", "diffuse_with_options"] => {
            Some((DiffusionRoute::CurrentViewDiffuseWithOptions, None))
        }
        [network, "views", view, operation] => {
            let route = match *operation {
                "diffuse" => DiffusionRoute::Diffuse,
                "diffuse_with_options" => DiffusionRoute::DiffuseWithOptions,
                _ => return None,
            };
            let ids = TargetIds {
                network: network.parse().ok()?,
                view: view.parse().ok()?,
            };
            Some((route, Some(ids)))
        }
        _ => None,
    }
}

fn handle_request(mut request: Request, bridge: &ExecutionBridge) {
    let method = request.method().clone();
    let url = request.url().to_string();
    debug!(%method, %url, "diffusion request");

    let Some((route, ids)) = match_route(&url) else {
        respond(request, text_response(404, "not found"));
        return;
    };
    if method != Method::Post {
        respond(request, text_response(405, "method not allowed"));
        return;
    }

    let parameters = if route.takes_options() {
        let mut body = String::new();
        if request.as_reader().read_to_string(&mut body).is_err() {
            respond(request, text_response(400, "invalid json"));
            return;
        }
        match serde_json::from_str::<DiffusionParameters>(&body) {
            Ok(parameters) => Some(parameters),
            Err(err) => {
                warn!("rejected diffusion options: {err}");
                respond(request, text_response(400, "invalid json"));
                return;
            }
        }
    } else {
        None
    };

    bridge.execute_with(route, ids, parameters.as_ref(), move |outcome| {
        let body = serde_json::to_string(&outcome.envelope)
            .unwrap_or_else(|_| r#"{"data":{},"errors":[]}"#.to_string());
        respond(request, json_response(outcome.status, body));
    });
}

fn respond(request: Request, response: Response<Cursor<Vec<u8>>>) {
    if let Err(err) = request.respond(response) {
        warn!("failed to write response: {err}");
    }
}

fn text_response(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(StatusCode(status))
}

fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_string(body).with_status_code(StatusCode(status));
    match Header::from_bytes("Content-Type", "application/json") {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_explicit_and_current_routes() {
        assert_eq!(
            match_route("/diffusion/v1/101/views/55/diffuse"),
            Some((
                DiffusionRoute::Diffuse,
                Some(TargetIds {
                    network: 101,
                    view: 55
                })
            ))
        );
        assert_eq!(
            match_route("/diffusion/v1/101/views/55/diffuse_with_options?x=1"),
            Some((
                DiffusionRoute::DiffuseWithOptions,
                Some(TargetIds {
                    network: 101,
                    view: 55
                })
            ))
        );
        assert_eq!(
            match_route("/diffusion/v1/currentView/diffuse"),
            Some((DiffusionRoute::CurrentViewDiffuse, None))
        );
        assert_eq!(
            match_route("/diffusion/v1/currentView/diffuse_with_options"),
            Some((DiffusionRoute::CurrentViewDiffuseWithOptions, None))
        );
    }

    #[test]
    fn rejects_unknown_paths_and_bad_ids() {
        assert_eq!(match_route("/diffusion/v1/abc/views/55/diffuse"), None);
        assert_eq!(match_route("/diffusion/v1/101/views/x/diffuse"), None);
        assert_eq!(match_route("/diffusion/v1/101/views/55/spread"), None);
        assert_eq!(match_route("/diffusion/v2/currentView/diffuse"), None);
        assert_eq!(match_route("/"), None);
    }
}
