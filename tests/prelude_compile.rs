//! Compile-time prelude coverage test.
use paceline::prelude::*;
use std::time::Duration;
use tower::service_fn;
use tower_layer::Layer;
use tower_service::Service;

#[tokio::test]
async fn prelude_reexports_core_types() {
    let config = RateLimiterConfig::new(2, Duration::from_millis(100))
        .with_release(ReleaseMode::FromAcquisition);
    config.validate().expect("valid config");

    let limiter = RateLimiter::builder()
        .config(config)
        .sink(NullSink)
        .build()
        .expect("Failed to create RateLimiter");
    let layer = RateLimitLayer::new(limiter);

    let mut svc = layer.layer(service_fn(|_req: ()| async { Ok::<_, std::io::Error>(()) }));
    svc.call(()).await.expect("service call failed");
}
