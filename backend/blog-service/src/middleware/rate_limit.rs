//! Rate limiting middleware for blog-service
//!
//! Per-client-IP token bucket built on the `governor` crate. The quota is
//! `max_requests` per `window_secs`, refilled evenly across the window.
//!
//! - Client IP is the `X-Forwarded-For` hop appended by the outermost
//!   trusted proxy, counted from the right
//! - Falls back to direct connection IP if no proxy header
//! - Idle client buckets are pruned once a minute

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::AppError;

const LIMIT_MESSAGE: &str = "Too many request from this IP, Please try again in 15 minutes";
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

fn quota(config: &RateLimitConfig) -> Quota {
    let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_secs(config.window_secs.max(1)) / burst.get();

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Rate limit middleware factory
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<ClientLimiter>,
    trusted_proxies: usize,
}

impl RateLimitMiddleware {
    /// Build the limiter; inside a Tokio runtime this also starts the
    /// background pruning of idle clients
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = Arc::new(RateLimiter::keyed(quota(config)));
        spawn_pruner(&limiter);
        Self {
            limiter,
            trusted_proxies: config.trusted_proxies,
        }
    }
}

/// Periodically drop buckets that have refilled completely
///
/// The task holds a weak reference and ends once the middleware is gone.
fn spawn_pruner(limiter: &Arc<ClientLimiter>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    let limiter = Arc::downgrade(limiter);

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(clients = limiter.len(), "pruned rate limiter state");
        }
    });
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<ClientLimiter>,
    trusted_proxies: usize,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ip = extract_client_ip(&req, self.trusted_proxies);

        if self.limiter.check_key(&ip).is_err() {
            warn!(client_ip = %ip, path = %req.path(), "rate limit exceeded");
            return Box::pin(async move {
                Err(AppError::TooManyRequests(LIMIT_MESSAGE.to_string()).into())
            });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

/// Extract the client IP behind `trusted_proxies` reverse proxies
///
/// Each trusted proxy appends the address it received the request from, so
/// walking `X-Forwarded-For` from the right, one entry per trusted proxy,
/// ends at the client. Entries left of that are caller supplied and ignored.
/// Zero trusted proxies means the peer address is the client.
pub fn extract_client_ip(req: &ServiceRequest, trusted_proxies: usize) -> IpAddr {
    let mut client = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    let hops: Vec<&str> = req
        .headers()
        .get_all("X-Forwarded-For")
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    for hop in hops.iter().rev().take(trusted_proxies) {
        match hop.parse::<IpAddr>() {
            Ok(ip) => client = ip,
            // A proxy we trust would not write garbage
            Err(_) => break,
        }
    }

    client
}
