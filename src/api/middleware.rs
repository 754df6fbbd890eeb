//! Request context and request logging middleware

use std::time::Instant;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{Error, HttpMessage, web};
use tracing::Instrument;
use uuid::Uuid;

use crate::model::Config;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Paths excluded from request logging
const QUIET_PATHS: &[&str] = &["/ping"];

/// Per-request identity, available to handlers through `web::ReqData`
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: Option<String>,
}

impl RequestContext {
    fn from_request(req: &ServiceRequest) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            request_id: header(REQUEST_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: header(USER_ID_HEADER),
        }
    }
}

/// Attach a request id and user id to the request and to every log line it emits
pub async fn request_context(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let ctx = RequestContext::from_request(&req);

    let (service, environment) = req
        .app_data::<web::Data<Config>>()
        .map(|c| (c.service_name.clone(), c.environment.as_str()))
        .unwrap_or_default();

    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id,
        user_id = ctx.user_id.as_deref().unwrap_or(""),
        service = %service,
        environment = environment,
    );

    let request_id = ctx.request_id.clone();
    req.extensions_mut().insert(ctx);

    let mut res = next.call(req).instrument(span).await?;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    Ok(res)
}

/// Log the start and completion of every request except health checks
pub async fn request_logging(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if QUIET_PATHS.contains(&req.path()) {
        return next.call(req).await;
    }

    let start_time = Instant::now();
    let method = req.method().to_string();
    let route = req.path().to_string();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let client_ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("")
        .to_string();

    tracing::info!(
        method = %method,
        route = %route,
        user_agent = %user_agent,
        client_ip = %client_ip,
        "Request started"
    );

    let res = next.call(req).await?;

    tracing::info!(
        method = %method,
        route = %route,
        status = res.status().as_u16(),
        duration_ms = start_time.elapsed().as_millis(),
        "Request completed"
    );

    Ok(res)
}
