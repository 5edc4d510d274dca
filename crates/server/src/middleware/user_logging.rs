use axum::http::Request;
use futures::future::BoxFuture;
use loggate_core::config::UserLoggingConfig;
use loggate_core::user_logging::UserLogging;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Puts the username and client address into the diagnostic context while
/// the inner service handles the request.
#[derive(Debug, Clone)]
pub struct UserLoggingLayer {
    logging: UserLogging,
}

impl UserLoggingLayer {
    pub fn new(config: Arc<UserLoggingConfig>) -> Self {
        tracing::info!(
            ip_key = %config.ip_key,
            user_key = %config.user_key,
            user_session_attribute = %config.user_session_attribute,
            use_principal = config.use_principal,
            "User logging enabled"
        );
        Self {
            logging: UserLogging::new(config),
        }
    }
}

impl<S> Layer<S> for UserLoggingLayer {
    type Service = UserLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserLoggingService {
            inner,
            logging: self.logging.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserLoggingService<S> {
    inner: S,
    logging: UserLogging,
}

impl<S, B> Service<Request<B>> for UserLoggingService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let ctx = self.logging.capture(&request);
        let logging = self.logging.clone();

        // Use the service that was polled ready and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            logging
                .enrich(ctx, async move { inner.call(request).await })
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ConnectInfo;
    use loggate_core::identity::{Principal, Session};
    use loggate_core::mdc;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    type Seen = (Option<String>, Option<String>, bool);

    fn layer(params: &[(&str, &str)]) -> UserLoggingLayer {
        UserLoggingLayer::new(Arc::new(UserLoggingConfig::from_init_params(
            params.iter().copied(),
        )))
    }

    fn request(addr: &str) -> Request<()> {
        let mut request = Request::new(());
        let addr: SocketAddr = addr.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    async fn observe(_req: Request<()>) -> Result<Seen, Infallible> {
        Ok((
            mdc::get("username"),
            mdc::get("ip"),
            mdc::contains_key("username"),
        ))
    }

    #[tokio::test]
    async fn test_session_username_visible_to_inner_service() {
        let mut req = request("198.51.100.23:40000");
        let session = Session::new("s1");
        session.set_attribute("username", "alice");
        req.extensions_mut().insert(session);

        let svc = layer(&[]).layer(tower::service_fn(observe));
        let seen = svc.oneshot(req).await.unwrap();
        assert_eq!(
            seen,
            (Some("alice".into()), Some("198.51.100.23".into()), true)
        );
        assert!(!mdc::contains_key("username"));
        assert!(!mdc::contains_key("ip"));
    }

    #[tokio::test]
    async fn test_missing_principal_writes_no_value() {
        let mut req = request("[2001:db8::1]:443");
        let session = Session::new("s1");
        session.set_attribute("username", "alice");
        req.extensions_mut().insert(session);

        let svc = layer(&[("usePrincipal", "true")]).layer(tower::service_fn(observe));
        let seen = svc.oneshot(req).await.unwrap();
        assert_eq!(seen, (None, Some("2001:db8::1".into()), true));
    }

    #[tokio::test]
    async fn test_principal_username() {
        let mut req = request("127.0.0.1:8080");
        req.extensions_mut().insert(Principal::new("erin"));

        let svc = layer(&[("usePrincipal", "yes")]).layer(tower::service_fn(observe));
        let seen = svc.oneshot(req).await.unwrap();
        assert_eq!(seen.0.as_deref(), Some("erin"));
    }

    #[derive(Debug, PartialEq)]
    struct Boom(&'static str);

    #[tokio::test]
    async fn test_inner_error_propagates_unchanged() {
        let svc = layer(&[]).layer(tower::service_fn(|_req: Request<()>| async {
            assert!(mdc::contains_key("ip"));
            Err::<(), _>(Boom("downstream"))
        }));

        mdc::scope(async {
            let err = svc.oneshot(request("10.9.8.7:1")).await.unwrap_err();
            assert_eq!(err, Boom("downstream"));
            assert!(!mdc::contains_key("username"));
            assert!(!mdc::contains_key("ip"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_reused_service_does_not_leak_between_requests() {
        let mut svc = layer(&[]).layer(tower::service_fn(observe));

        let mut first = request("10.0.0.1:1");
        let session = Session::new("s1");
        session.set_attribute("username", "alice");
        first.extensions_mut().insert(session);

        mdc::scope(async {
            let seen = svc.ready().await.unwrap().call(first).await.unwrap();
            assert_eq!(seen.0.as_deref(), Some("alice"));

            let seen = svc
                .ready()
                .await
                .unwrap()
                .call(request("10.0.0.2:1"))
                .await
                .unwrap();
            assert_eq!(seen, (None, Some("10.0.0.2".into()), true));
        })
        .await;
    }
}
