//! Serve the build output over HTTP.

use anyhow::{Context as _, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use ssr_core::ResponseSpec;
use ssr_host::fetch::into_http_response;
use ssr_host::{IncomingMessage, ServerResponse};
use tokio::net::TcpListener;

use super::ServeArgs;
use crate::context::{Context, HostHandler};

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let handler = ctx.handler(args.adapter);

    if args.eager {
        let spinner = ctx.output.spinner("Loading artifacts...");
        let result = handler.assets().preload().await;
        spinner.finish_and_clear();
        match result {
            Ok(()) => ctx.output.success("Artifacts loaded"),
            Err(err) => ctx
                .output
                .warn(&format!("Preload failed, requests will retry: {}", err)),
        }
    }

    let app = Router::new().fallback(serve_request).with_state(handler);

    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, adapter = ?args.adapter, "listening");

    ctx.output.success(&format!(
        "Serving {} on http://{} ({:?} adapter)",
        ctx.layout().root.display(),
        args.addr,
        args.adapter
    ));

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Every path is handed to the adapter; routing is the renderer's concern.
async fn serve_request(State(handler): State<HostHandler>, req: Request) -> Response {
    match handler {
        HostHandler::Node(handler) => {
            let msg = incoming_message(&req);
            let mut res = ServerResponse::new();
            handler.handle(&msg, &mut res).await;
            let spec = ResponseSpec {
                status: res.status_code(),
                headers: res.headers().clone(),
                body: res.body().unwrap_or_default().to_string(),
            };
            into_http_response(spec).map(Body::from).into_response()
        }
        HostHandler::Fetch(handler) => handler.handle(&req).await.map(Body::from).into_response(),
    }
}

fn incoming_message(req: &Request) -> IncomingMessage {
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    IncomingMessage {
        method: req.method().as_str().to_string(),
        url: Some(url),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_message_from_request() {
        let req = Request::builder()
            .method("GET")
            .uri("http://localhost:3000/products/42?color=red")
            .header("accept-language", "en")
            .body(Body::empty())
            .unwrap();

        let msg = incoming_message(&req);
        assert_eq!(msg.method, "GET");
        assert_eq!(msg.url.as_deref(), Some("/products/42?color=red"));
        assert_eq!(
            msg.headers,
            vec![("accept-language".to_string(), "en".to_string())]
        );
    }
}
