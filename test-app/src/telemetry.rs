//! One server span per request, so client tracking has a span to label.

use axum::{extract::Request, middleware::Next, response::Response};
use opentelemetry::context::FutureExt;
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracerProvider;

pub(crate) const TRACER_NAME: &str = "test-app";

/// Registers the process-wide tracer provider. Exporters are attached by the deployment.
pub(crate) fn init_tracer_provider() -> SdkTracerProvider {
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    provider
}

pub(crate) async fn request_span_middleware(request: Request, next: Next) -> Response {
    let tracer = global::tracer(TRACER_NAME);
    let span = tracer
        .span_builder(format!("{} {}", request.method(), request.uri().path()))
        .with_kind(SpanKind::Server)
        .start(&tracer);
    let cx = Context::current_with_span(span);

    let response = next.run(request).with_context(cx.clone()).await;

    let span = cx.span();
    span.set_attribute(KeyValue::new(
        "http.response.status_code",
        i64::from(response.status().as_u16()),
    ));
    span.end();
    response
}
