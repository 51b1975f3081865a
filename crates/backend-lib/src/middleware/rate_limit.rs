// ============================
// crates/backend-lib/src/middleware/rate_limit.rs
// ============================
//! Per-client token-bucket admission control.
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::error::AppError;
use crate::metrics::{RATELIMIT_BUCKETS, RATELIMIT_REJECTED};

pub const DEFAULT_CAPACITY: u32 = 4;
pub const DEFAULT_REFILL_PER_SEC: f64 = 2.0;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3 * 60);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token buckets keyed by client identifier.
///
/// All buckets sit behind one lock. Sharding the map (a `DashMap` of buckets)
/// would raise throughput under heavy fan-in.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
    idle_ttl: Duration,
    trust_forwarded_headers: bool,
    span: Span,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64, idle_ttl: Duration, span: Span) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: f64::from(capacity),
            refill_per_sec,
            idle_ttl,
            trust_forwarded_headers: false,
            span,
        }
    }

    /// Key clients by `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address. Only sound behind a proxy that overwrites those headers.
    pub fn with_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    /// Take one token for `client_id`, creating its bucket on first sight
    pub fn allow(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();

        let bucket = buckets.entry(client_id.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
            last_seen: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Evict buckets idle for longer than the idle TTL; returns how many
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) <= self.idle_ttl);
        let remaining = buckets.len();
        drop(buckets);

        gauge!(RATELIMIT_BUCKETS).set(remaining as f64);
        let evicted = before - remaining;
        if evicted > 0 {
            tracing::debug!(parent: &self.span, evicted, remaining, "rate limit sweep");
        }
        evicted
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run [`sweep`](Self::sweep) every `interval` until `shutdown` fires
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        limiter.sweep();
                    },
                }
            }
            tracing::debug!(parent: &limiter.span, "rate limit sweeper stopped");
        })
    }
}

/// Identify the caller. With `trust_forwarded` the first `X-Forwarded-For`
/// hop wins, then `X-Real-IP`; otherwise, or when neither is set, the peer
/// address.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let peer_id = || peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string());
    if !trust_forwarded {
        return peer_id();
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded.or(real_ip) {
        Some(id) => id.to_string(),
        None => peer_id(),
    }
}

/// Rate limiter middleware
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(request.headers(), peer, limiter.trust_forwarded_headers);

    if !limiter.allow(&client) {
        counter!(RATELIMIT_REJECTED).increment(1);
        tracing::debug!(parent: &limiter.span, client = %client, "rate limited");
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
