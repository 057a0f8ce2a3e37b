//! The transport dispatcher: one POST endpoint carrying a serialized
//! request, the content type selecting the serializer, and the error
//! envelope for every failure (HTTP 500, body inspected by the client).

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse};
use portico_commons::MetaError;
use portico_meta::MetaService;
use portico_protocol::{for_content_type, JsonTranslator, Response, RpcMetadata, Translator};
use portico_session::RequestContext;
use serde_json::json;

/// Configure gateway routes
///
/// - POST / - protocol endpoint (opaque serialized request body)
/// - GET /health - build metadata for probes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(rpc_handler)
        .route("/health", web::get().to(healthcheck_handler));
}

/// POST / - parses the body with the translator the content type names,
/// dispatches to the meta service, and writes the paired response back in
/// the same serialization. Decode failures and uncaught dispatch failures
/// become an ErrorResponse with HTTP status 500.
#[post("/")]
pub async fn rpc_handler(
    http_req: HttpRequest,
    body: web::Bytes,
    service: web::Data<Arc<MetaService>>,
) -> HttpResponse {
    let content_type = http_req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let translator: &dyn Translator = for_content_type(content_type).unwrap_or(&JsonTranslator);

    let ctx = RequestContext::new(
        http_req
            .headers()
            .get("x-remote-user")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        http_req.peer_addr().map(|addr| addr.to_string()),
    );

    let request = match translator.parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("failed to decode request body: {}", e);
            return error_response(translator, &e, service.rpc_metadata());
        }
    };

    let response = service.handle(request, &ctx).await;
    let is_error = response.is_error();
    match translator.serialize_response(&response) {
        Ok(bytes) => {
            let mut builder = if is_error {
                HttpResponse::InternalServerError()
            } else {
                HttpResponse::Ok()
            };
            builder.content_type(translator.content_type()).body(bytes)
        }
        Err(e) => error_response(translator, &e, service.rpc_metadata()),
    }
}

fn error_response(
    translator: &dyn Translator,
    error: &MetaError,
    rpc_metadata: RpcMetadata,
) -> HttpResponse {
    let response = Response::error(error, rpc_metadata);
    match translator.serialize_response(&response) {
        Ok(bytes) => HttpResponse::InternalServerError()
            .content_type(translator.content_type())
            .body(bytes),
        Err(e) => {
            log::error!("failed to serialize error response: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// GET /health - liveness probe with build metadata.
pub async fn healthcheck_handler(service: web::Data<Arc<MetaService>>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": portico_commons::GATEWAY_VERSION,
        "serverAddress": service.rpc_metadata().server_address,
    }))
}
