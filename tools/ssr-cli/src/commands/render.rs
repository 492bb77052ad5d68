//! Run a single request through a host adapter.

use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use ssr_core::ResponseSpec;
use ssr_host::{IncomingMessage, ServerResponse};

use super::{parse_header, RenderArgs};
use crate::context::{Context, HostHandler};
use crate::output::{format_bytes, status_badge};

#[derive(Serialize)]
struct RenderReport<'a> {
    method: &'a str,
    path: &'a str,
    status: u16,
    headers: &'a [(String, String)],
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Run the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let mut headers = Vec::new();
    for raw in &args.headers {
        match parse_header(raw) {
            Some(header) => headers.push(header),
            None => bail!("Invalid header '{}': expected 'Name: value'", raw),
        }
    }

    let handler = ctx.handler(args.adapter);
    ctx.output
        .debug(&format!("{} {} via {:?} adapter", args.method, args.path, args.adapter));

    let response = dispatch(&handler, &args, headers).await?;

    if ctx.output.is_json() {
        ctx.output.json(&RenderReport {
            method: &args.method,
            path: &args.path,
            status: response.status,
            headers: &response.headers,
            body: (!args.no_body).then_some(response.body.as_str()),
        });
    } else {
        ctx.output.header(&format!(
            "{} {} -> {}",
            args.method,
            args.path,
            status_badge(response.status)
        ));
        for (name, value) in &response.headers {
            ctx.output.kv(name, value);
        }
        ctx.output
            .kv("body", &format_bytes(response.body.len() as u64));
        if !args.no_body && !response.body.is_empty() {
            println!("\n{}", response.body);
        }
    }

    if !response.is_success() {
        bail!("Request failed with status {}", response.status);
    }
    Ok(())
}

/// Send the request through the chosen adapter and collect the response.
async fn dispatch(
    handler: &HostHandler,
    args: &RenderArgs,
    headers: Vec<(String, String)>,
) -> Result<ResponseSpec> {
    match handler {
        HostHandler::Node(handler) => {
            let req = IncomingMessage {
                method: args.method.clone(),
                url: Some(args.path.clone()),
                headers,
            };
            let mut res = ServerResponse::new();
            handler.handle(&req, &mut res).await;
            Ok(ResponseSpec {
                status: res.status_code(),
                headers: res.headers().clone(),
                body: res.body().unwrap_or_default().to_string(),
            })
        }
        HostHandler::Fetch(handler) => {
            let mut builder = http::Request::builder()
                .method(args.method.as_str())
                .uri(args.path.as_str());
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let req = builder.body(()).context("Invalid request")?;
            let response = handler.handle(&req).await;
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            Ok(ResponseSpec {
                status: response.status().as_u16(),
                headers,
                body: response.into_body(),
            })
        }
    }
}
