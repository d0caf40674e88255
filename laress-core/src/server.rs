// HTTP/1 accept loop

use crate::logging::{error, info};
use crate::{Application, HttpRequest, HttpResponse, RequestHandler, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

impl Application {
    /// Serve HTTP/1 on `addr`, opening one request scope per request
    pub async fn listen(self, addr: SocketAddr, handler: Arc<dyn RequestHandler>) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;

        info!(address = %addr, "Server listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let app = self.clone();
            let handler = handler.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let app = app.clone();
                    let handler = handler.clone();
                    async move { serve_request(req, app, handler).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(peer = %peer, error = ?err, "Error serving connection");
                }
            });
        }
    }
}

async fn serve_request(
    req: Request<IncomingBody>,
    app: Application,
    handler: Arc<dyn RequestHandler>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let mut request = HttpRequest::new(req.method().as_str(), req.uri().path());

    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request.set_header(name.as_str(), value);
        }
    }

    request.body = req.collect().await?.to_bytes().to_vec();

    let response = app.handle(request, handler.as_ref()).await;
    Ok(into_hyper(response))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            out.headers_mut().insert(name, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_hyper_copies_status_and_headers() {
        let response = HttpResponse::new(201)
            .with_header("x-request-id", "abc")
            .with_body("created");
        let out = into_hyper(response);

        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(out.headers()["x-request-id"], "abc");
    }

    #[test]
    fn test_into_hyper_rejects_invalid_status() {
        let out = into_hyper(HttpResponse::new(1000));
        assert_eq!(out.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
