//! Client-side authentication gate.
//!
//! [`ClientAuthGate`] performs one login at construction (failing if the
//! login fails), then exposes a tower layer that attaches the current
//! token to outgoing requests whose method path is in the configured set.
//! One long-lived background task re-logins periodically, swapping the
//! held token on success and keeping the last good token on failure.
//!
//! The held token is written by the refresh task and read by every
//! concurrent outgoing call, so it lives behind an `RwLock` and is always
//! observed as a complete value.

use http::header::AUTHORIZATION;
use http::HeaderValue;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Fallback delay between re-login attempts after a refresh failure.
/// Deliberately much shorter than any sensible refresh interval.
const LOGIN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Obtains a fresh access token, typically by calling a login RPC.
#[async_trait::async_trait]
pub trait LoginProvider: Send + Sync {
    async fn login(&self) -> Result<String, Status>;
}

/// Shared slot holding the current token as a pre-parsed header value.
#[derive(Clone)]
struct TokenSlot {
    header: Arc<RwLock<HeaderValue>>,
}

impl TokenSlot {
    fn new(token: &str) -> Result<Self, Status> {
        let header = Self::parse(token)?;
        Ok(Self {
            header: Arc::new(RwLock::new(header)),
        })
    }

    fn parse(token: &str) -> Result<HeaderValue, Status> {
        HeaderValue::from_str(token)
            .map_err(|_| Status::internal("access token is not a valid header value"))
    }

    fn replace(&self, token: &str) -> Result<(), Status> {
        let header = Self::parse(token)?;
        *self.header.write() = header;
        Ok(())
    }

    fn current(&self) -> HeaderValue {
        self.header.read().clone()
    }
}

/// Client-side auth gate: token holder, method set and refresh task handle.
pub struct ClientAuthGate {
    slot: TokenSlot,
    methods: Arc<HashSet<String>>,
    shutdown: CancellationToken,
}

impl ClientAuthGate {
    /// Log in once and start the background refresh task.
    ///
    /// Fails if the initial login fails: no gate exists without a valid
    /// starting token.
    pub async fn connect(
        provider: Arc<dyn LoginProvider>,
        methods: HashSet<String>,
        refresh_interval: Duration,
    ) -> Result<Self, Status> {
        let token = provider.login().await?;
        debug!("obtained initial access token");

        let slot = TokenSlot::new(&token)?;
        let shutdown = CancellationToken::new();
        tokio::spawn(refresh_token_periodically(
            provider,
            slot.clone(),
            refresh_interval,
            shutdown.clone(),
        ));

        Ok(Self {
            slot,
            methods: Arc::new(methods),
            shutdown,
        })
    }

    /// Layer attaching the current token to configured methods.
    pub fn layer(&self) -> AuthTokenLayer {
        AuthTokenLayer {
            slot: self.slot.clone(),
            methods: Arc::clone(&self.methods),
        }
    }

    /// Wrap a transport (e.g. a `Channel`) with the token-attaching service.
    pub fn wrap<S>(&self, service: S) -> AuthTokenService<S> {
        self.layer().layer(service)
    }

    /// Token currently held by the gate.
    pub fn current_token(&self) -> String {
        self.slot
            .current()
            .to_str()
            .unwrap_or_default()
            .to_owned()
    }

    /// Stop the background refresh task.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn refresh_token_periodically(
    provider: Arc<dyn LoginProvider>,
    slot: TokenSlot,
    refresh_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut wait = refresh_interval;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("token refresh task stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match provider.login().await {
            Ok(token) => {
                wait = refresh_interval;
                match slot.replace(&token) {
                    Ok(()) => debug!("access token refreshed"),
                    Err(err) => warn!(%err, "keeping previous token"),
                }
            }
            Err(status) => {
                // Keep the last good token; retry sooner than the
                // regular interval.
                warn!(%status, "cannot refresh access token");
                wait = LOGIN_RETRY_DELAY;
            }
        }
    }
}

/// Tower layer produced by [`ClientAuthGate::layer`].
#[derive(Clone)]
pub struct AuthTokenLayer {
    slot: TokenSlot,
    methods: Arc<HashSet<String>>,
}

impl<S> Layer<S> for AuthTokenLayer {
    type Service = AuthTokenService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthTokenService {
            inner,
            slot: self.slot.clone(),
            methods: Arc::clone(&self.methods),
        }
    }
}

/// Service attaching the held token to requests for configured methods.
#[derive(Clone)]
pub struct AuthTokenService<S> {
    inner: S,
    slot: TokenSlot,
    methods: Arc<HashSet<String>>,
}

impl<S, B> Service<http::Request<B>> for AuthTokenService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        if self.methods.contains(req.uri().path()) {
            req.headers_mut().insert(AUTHORIZATION, self.slot.current());
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const GATED: &str = "/pcstore.catalog.v1.CatalogService/CreateLaptop";
    const OPEN: &str = "/pcstore.catalog.v1.CatalogService/SearchLaptop";

    /// Login provider returning numbered tokens, failing on the call
    /// indices it was configured with.
    struct ScriptedLogin {
        calls: AtomicU32,
        failures: Mutex<Vec<u32>>,
    }

    impl ScriptedLogin {
        fn failing_on(failures: &[u32]) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures: Mutex::new(failures.to_vec()),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LoginProvider for ScriptedLogin {
        async fn login(&self) -> Result<String, Status> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.lock().unwrap().contains(&call) {
                Err(Status::unauthenticated("scripted failure"))
            } else {
                Ok(format!("token-{call}"))
            }
        }
    }

    /// Service recording the headers of every request it sees.
    #[derive(Clone, Default)]
    struct CapturingService {
        seen: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl Service<http::Request<()>> for CapturingService {
        type Response = ();
        type Error = Status;
        type Future = Pin<Box<dyn Future<Output = Result<(), Status>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Status>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<()>) -> Self::Future {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            self.seen.lock().unwrap().push(header);
            Box::pin(async { Ok(()) })
        }
    }

    fn request(path: &str) -> http::Request<()> {
        http::Request::builder()
            .uri(format!("http://server{path}"))
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn construction_fails_when_initial_login_fails() {
        let provider = ScriptedLogin::failing_on(&[0]);
        let result = ClientAuthGate::connect(
            provider,
            HashSet::new(),
            Duration::from_secs(60),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn attaches_token_only_to_configured_methods() {
        let provider = ScriptedLogin::failing_on(&[]);
        let methods: HashSet<String> = [GATED.to_owned()].into();
        let gate = ClientAuthGate::connect(provider, methods, Duration::from_secs(60))
            .await
            .unwrap();

        let capture = CapturingService::default();
        let mut service = gate.wrap(capture.clone());

        service.call(request(GATED)).await.unwrap();
        service.call(request(OPEN)).await.unwrap();

        let seen = capture.seen.lock().unwrap();
        assert_eq!(seen[0].as_deref(), Some("token-0"));
        assert_eq!(seen[1], None);

        gate.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_falls_back_to_short_delay_then_recovers() {
        // Call 0: initial login. Call 1 (t=60s): fails. Call 2 (t=61s):
        // succeeds, restoring the full interval. Call 3: t=121s.
        let provider = ScriptedLogin::failing_on(&[1]);
        let gate = ClientAuthGate::connect(
            Arc::clone(&provider) as Arc<dyn LoginProvider>,
            HashSet::new(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert_eq!(gate.current_token(), "token-0");

        // Past the first refresh attempt, which fails.
        tokio::time::sleep(Duration::from_millis(60_500)).await;
        assert_eq!(provider.call_count(), 2);
        assert_eq!(gate.current_token(), "token-0"); // last good token kept

        // The retry happens after the short fallback delay, not a full
        // interval.
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(provider.call_count(), 3);
        assert_eq!(gate.current_token(), "token-2");

        // Back on the full interval: nothing for almost 60s.
        tokio::time::sleep(Duration::from_millis(59_000)).await;
        assert_eq!(provider.call_count(), 3);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(provider.call_count(), 4);

        gate.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_refreshing() {
        let provider = ScriptedLogin::failing_on(&[]);
        let gate = ClientAuthGate::connect(
            Arc::clone(&provider) as Arc<dyn LoginProvider>,
            HashSet::new(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        gate.shutdown();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(provider.call_count(), 1);
    }
}
