//! The two handler shapes and the uniform invocation contract over them.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{ErrorSource, Rejection};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::request::Request;

/// Synchronous handler that answers through the request's responder.
///
/// An `Err` or a panic is logged and nothing is sent; the handler owns its
/// own error replies.
pub trait CallbackHandler: Send + Sync {
    /// Handle one request.
    fn call(&self, request: Request) -> anyhow::Result<()>;
}

impl<F> CallbackHandler for F
where
    F: Fn(Request) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, request: Request) -> anyhow::Result<()> {
        self(request)
    }
}

/// Outcome of a promise handler that settled successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send one success reply carrying this data.
    Data(Value),
    /// Send nothing.
    NoResponse,
}

impl Reply {
    /// Success reply from anything convertible to JSON.
    pub fn data(data: impl Into<Value>) -> Self {
        Self::Data(data.into())
    }
}

impl From<Value> for Reply {
    fn from(data: Value) -> Self {
        Self::Data(data)
    }
}

/// Async handler whose outcome becomes exactly one reply.
///
/// `Ok(Reply::Data)` → success reply, `Ok(Reply::NoResponse)` → silence,
/// `Err(rejection)` → error reply with `errsrc = "application"`.
#[async_trait]
pub trait PromiseHandler: Send + Sync {
    /// Handle one request.
    async fn call(&self, request: Request) -> Result<Reply, Rejection>;
}

#[async_trait]
impl<F, Fut> PromiseHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply, Rejection>> + Send + 'static,
{
    async fn call(&self, request: Request) -> Result<Reply, Rejection> {
        self(request).await
    }
}

/// A registered handler, tagged by shape.
#[derive(Clone)]
pub enum Handler {
    /// See [`CallbackHandler`].
    Callback(Arc<dyn CallbackHandler>),
    /// See [`PromiseHandler`].
    Promise(Arc<dyn PromiseHandler>),
}

impl Handler {
    /// Wrap a callback handler.
    pub fn callback(handler: impl CallbackHandler + 'static) -> Self {
        Self::Callback(Arc::new(handler))
    }

    /// Wrap a promise handler.
    pub fn promise(handler: impl PromiseHandler + 'static) -> Self {
        Self::Promise(Arc::new(handler))
    }

    /// Shape name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Callback(_) => "callback",
            Self::Promise(_) => "promise",
        }
    }

    /// Run the handler. Never panics and never propagates handler faults.
    pub async fn invoke(&self, request: Request) {
        let responder = request.responder().clone();
        let func = request.func().to_owned();
        let conn_id = request.connection_id().to_owned();

        match self {
            Self::Callback(handler) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(request))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(%conn_id, %func, error = %e, "callback handler failed");
                    }
                    Err(panic) => {
                        error!(%conn_id, %func, panic = %panic_message(&*panic), "callback handler panicked");
                    }
                }
            }
            Self::Promise(handler) => {
                match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
                    Ok(Ok(Reply::Data(data))) => responder.ok(data),
                    Ok(Ok(Reply::NoResponse)) => {
                        debug!(%conn_id, %func, "promise handler chose not to reply");
                    }
                    Ok(Err(rejection)) => {
                        warn!(%conn_id, %func, reason = %rejection, "promise handler rejected");
                        responder.send_with_source(
                            Some(rejection.reason),
                            Value::Null,
                            ErrorSource::Application,
                        );
                    }
                    Err(panic) => {
                        error!(%conn_id, %func, panic = %panic_message(&*panic), "promise handler panicked");
                        responder.send_with_source(
                            Some(Value::String("handler panicked".into())),
                            Value::Null,
                            ErrorSource::Application,
                        );
                    }
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Responder;
    use crate::test_helpers::{drain, next_reply, recording_sink};
    use courier_core::{CallerAttributes, decode};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn request(text: &str) -> (Request, UnboundedReceiver<Arc<String>>) {
        let (sink, rx) = recording_sink();
        let (data, _token, template) = decode(text).unwrap().into_parts();
        let func = template.func().unwrap_or_default().to_owned();
        let responder = Responder::new(template, sink);
        (
            Request::new(func, data.unwrap_or_default(), CallerAttributes::new(), responder),
            rx,
        )
    }

    #[tokio::test]
    async fn callback_can_send_many_times() {
        let handler = Handler::callback(|req: Request| -> anyhow::Result<()> {
            for i in 0..3 {
                req.send(None, json!(i));
            }
            Ok(())
        });
        let (req, mut rx) = request(r#"{"func":"multi","data":{},"seq":1}"#);
        handler.invoke(req).await;
        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 3);
        for (i, reply) in replies.iter().enumerate() {
            assert_eq!(reply["data"], i);
            assert_eq!(reply["seq"], 1);
            assert_eq!(reply["func"], "multi");
        }
    }

    #[tokio::test]
    async fn callback_error_is_logged_not_replied() {
        let handler = Handler::callback(|_req: Request| -> anyhow::Result<()> { anyhow::bail!("broken") });
        let (req, mut rx) = request(r#"{"func":"f","data":{}}"#);
        handler.invoke(req).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn callback_panic_is_contained() {
        let handler = Handler::callback(|_req: Request| -> anyhow::Result<()> { panic!("kaboom") });
        let (req, mut rx) = request(r#"{"func":"f","data":{}}"#);
        handler.invoke(req).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn callback_may_reply_after_returning() {
        let handler = Handler::callback(|req: Request| -> anyhow::Result<()> {
            let (data, responder) = req.into_parts();
            drop(tokio::spawn(async move {
                tokio::task::yield_now().await;
                responder.ok(data);
            }));
            Ok(())
        });
        let (req, mut rx) = request(r#"{"func":"deferred","data":{"v":1}}"#);
        handler.invoke(req).await;
        let reply = next_reply(&mut rx).await;
        assert_eq!(reply["data"]["v"], 1);
    }

    #[tokio::test]
    async fn callback_silence_is_valid() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let handler = Handler::callback(move |_req: Request| -> anyhow::Result<()> {
            let _ = seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let (req, mut rx) = request(r#"{"func":"quiet","data":{}}"#);
        handler.invoke(req).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn promise_resolve_sends_one_reply() {
        let handler = Handler::promise(|_req: Request| async {
            Ok::<_, Rejection>(Reply::data(json!({"foo": "bar"})))
        });
        let (req, mut rx) = request(r#"{"func":"p","data":{}}"#);
        handler.invoke(req).await;
        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["data"], json!({"foo": "bar"}));
        assert!(replies[0]["err"].is_null());
    }

    #[tokio::test]
    async fn promise_no_response_sends_nothing() {
        let handler = Handler::promise(|_req: Request| async { Ok::<_, Rejection>(Reply::NoResponse) });
        let (req, mut rx) = request(r#"{"func":"p","data":{}}"#);
        handler.invoke(req).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn promise_reject_sends_one_error_reply() {
        let handler =
            Handler::promise(|_req: Request| async { Err::<Reply, _>(Rejection::from("x")) });
        let (req, mut rx) = request(r#"{"func":"p","data":{}}"#);
        handler.invoke(req).await;
        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["err"], "x");
        assert_eq!(replies[0]["errsrc"], "application");
    }

    #[tokio::test]
    async fn promise_panic_becomes_error_reply() {
        let handler = Handler::promise(|_req: Request| async {
            if true {
                panic!("inside future");
            }
            Ok::<_, Rejection>(Reply::NoResponse)
        });
        let (req, mut rx) = request(r#"{"func":"p","data":{}}"#);
        handler.invoke(req).await;
        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["err"], "handler panicked");
    }

    struct Doubler;

    #[async_trait]
    impl PromiseHandler for Doubler {
        async fn call(&self, request: Request) -> Result<Reply, Rejection> {
            let n = request
                .data()
                .as_i64()
                .ok_or_else(|| Rejection::from("expected a number"))?;
            Ok(Reply::data(n * 2))
        }
    }

    #[tokio::test]
    async fn struct_promise_handler() {
        let handler = Handler::promise(Doubler);
        assert_eq!(handler.kind(), "promise");

        let (req, mut rx) = request(r#"{"func":"double","data":21}"#);
        handler.invoke(req).await;
        assert_eq!(drain(&mut rx)[0]["data"], 42);

        let (req, mut rx) = request(r#"{"func":"double","data":"x"}"#);
        handler.invoke(req).await;
        assert_eq!(drain(&mut rx)[0]["err"], "expected a number");
    }

    #[test]
    fn panic_message_extracts_text() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(&*boxed), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
