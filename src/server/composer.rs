//! Server assembly and lifecycle.

use std::convert::Infallible;
use std::mem;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::sync::broadcast;

use crate::config::{validate_config, ConfigError, ServerConfig};
use crate::exception::{ExceptionResolver, Failure, FailureKind};
use crate::http::RequestContext;
use crate::resources::{ResourceChain, SinglePageHandler};
use crate::server::listener::Listener;
use crate::server::tree::{attach_pipeline, graft_point_exists, Handler, HandlerTree};
use crate::server::ServerError;

/// The embedder's routing collaborator.
///
/// Returns `Ok(true)` when a route produced the response, `Ok(false)` when
/// no route matched (handing the request to the resource chain), and `Err`
/// to raise a failure into the exception resolver.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<bool, Box<dyn Failure>>;
}

impl<F> Dispatcher for F
where
    F: Fn(&mut RequestContext) -> Result<bool, Box<dyn Failure>> + Send + Sync,
{
    fn dispatch(&self, ctx: &mut RequestContext) -> Result<bool, Box<dyn Failure>> {
        self(ctx)
    }
}

/// Broadcast used to stop the accept loop.
struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// The composed server.
///
/// Construction order is fixed: `new` loads every configured resource root
/// and single-page document (failing fast on any of them), registrations
/// happen next, and `start` grafts the pipeline, binds, and begins
/// accepting. The lifecycle is one-shot; a stopped server is not
/// restartable.
pub struct Server {
    config: ServerConfig,
    resolver: ExceptionResolver,
    resources: ResourceChain,
    single_page: SinglePageHandler,
    user_tree: Option<HandlerTree>,
    connector: Option<std::net::TcpListener>,
    shutdown: Shutdown,
    started: bool,
    bound_port: Option<u16>,
}

impl Server {
    /// Compose a server from configuration.
    ///
    /// Validates the configuration and eagerly loads all static roots and
    /// single-page documents; any missing path fails here, before a
    /// listener ever exists.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let mut resources = ResourceChain::new(config.ignore_trailing_slashes);
        for root in &config.static_roots {
            resources.add_root(root)?;
        }

        let mut single_page = SinglePageHandler::new();
        for entry in &config.single_page {
            single_page.add(&entry.mount_path, &entry.file)?;
        }

        Ok(Self {
            config,
            resolver: ExceptionResolver::new(),
            resources,
            single_page,
            user_tree: None,
            connector: None,
            shutdown: Shutdown::new(),
            started: false,
            bound_port: None,
        })
    }

    /// Register an exception handler. Covers the kind and every descendant
    /// without a more specific registration.
    pub fn exception<F>(&mut self, kind: &'static FailureKind, handler: F) -> &mut Self
    where
        F: Fn(&dyn Failure, &mut RequestContext) + Send + Sync + 'static,
    {
        self.resolver.register(kind, handler);
        self
    }

    /// Install the embedder's handler tree. The pipeline group is grafted
    /// into it at start.
    pub fn handler(&mut self, tree: HandlerTree) -> &mut Self {
        self.user_tree = Some(tree);
        self
    }

    /// Attach a pre-bound listener. Without one, a default listener is
    /// built from the configured bind address at start.
    pub fn connector(&mut self, listener: std::net::TcpListener) -> &mut Self {
        self.connector = Some(listener);
        self
    }

    /// The actually-bound port, available once `start` has returned.
    pub fn port(&self) -> Option<u16> {
        self.bound_port
    }

    /// Compose the pipeline, bind the listener, and begin accepting.
    ///
    /// The embedder tree's shape is rejected before any socket is bound,
    /// and registered state is only moved out of the server once every
    /// fallible step has succeeded: after a bind or graft error the
    /// server keeps its handlers, roots, and documents and `start` may be
    /// retried. Internal logging is suspended for the bind itself; the
    /// one startup line below is the only output of a clean start.
    pub async fn start(
        &mut self,
        dispatcher: Arc<dyn Dispatcher>,
        upgrade: Arc<dyn Handler>,
    ) -> Result<(), ServerError> {
        if self.started {
            return Err(ServerError::AlreadyStarted);
        }

        if let Some(tree) = &self.user_tree {
            if !graft_point_exists(tree) {
                return Err(ConfigError::UnrecognizedHandlerShape.into());
            }
        }

        let max_workers = self.config.worker_pool.max_workers;
        let listener = match self.connector.take() {
            Some(std_listener) => Listener::from_std(std_listener, max_workers)?,
            // The default connector is only built when the embedder did
            // not supply one; its construction logging is suspended.
            None => tracing::subscriber::with_default(
                tracing::subscriber::NoSubscriber::default(),
                || Listener::bind(&self.config.listener, max_workers),
            )?,
        };

        let resolver = Arc::new(mem::take(&mut self.resolver));
        let resources = Arc::new(mem::replace(
            &mut self.resources,
            ResourceChain::new(self.config.ignore_trailing_slashes),
        ));
        let single_page = Arc::new(mem::take(&mut self.single_page));

        let group = HandlerTree::Collection(vec![
            HandlerTree::Leaf(Arc::new(HttpPipeline {
                dispatcher,
                resolver,
                resources,
                single_page,
                context_path: self.config.context_path.clone(),
            })),
            HandlerTree::Leaf(Arc::new(UpgradeGate { upgrade })),
            HandlerTree::Leaf(Arc::new(ContextPathFallback {
                context_path: self.config.context_path.clone(),
            })),
        ]);
        let tree = Arc::new(attach_pipeline(self.user_tree.take(), group)?);

        let local_addr = listener.local_addr();
        self.bound_port = Some(local_addr.port());
        self.started = true;

        tracing::info!(
            "Listening on http://{}:{}{}",
            self.config.listener.host,
            local_addr.port(),
            self.config.context_path
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("accept loop stopped");
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer, permit)) => {
                                serve_connection(stream, peer, permit, Arc::clone(&tree));
                            }
                            Err(error) => {
                                tracing::error!(error = %error, "failed to accept connection");
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop accepting new connections. In-flight requests run to
    /// completion on their worker threads.
    pub fn stop(&mut self) {
        if self.started {
            tracing::info!("server stopping");
            self.shutdown.trigger();
        }
    }
}

fn serve_connection(
    stream: tokio::net::TcpStream,
    peer: std::net::SocketAddr,
    permit: crate::server::listener::WorkerPermit,
    tree: Arc<HandlerTree>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req: Request<Incoming>| {
            let tree = Arc::clone(&tree);
            async move { Ok::<_, Infallible>(handle_request(tree, req).await) }
        });

        if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
            tracing::debug!(peer_addr = %peer, error = %error, "connection ended with error");
        }
        drop(permit);
    });
}

/// Run one request through the handler tree on a blocking worker.
///
/// This is the outermost per-request boundary: a panicking handler reaches
/// here as a failed join, is logged, and becomes a bare 500 without
/// touching the connection or the pool.
async fn handle_request(tree: Arc<HandlerTree>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let mut ctx = RequestContext::new(req.method().as_str(), req.uri().path());
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            ctx.add_request_header(name.as_str(), value);
        }
    }
    let request_id = ctx.request_id().to_string();

    let outcome = tokio::task::spawn_blocking(move || {
        tree.invoke(&mut ctx);
        ctx.into_response()
    })
    .await;

    match outcome {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                error = %error,
                "exception occurred while servicing request"
            );
            let mut response = Response::new(Full::new(Bytes::from("Internal server error")));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// The main HTTP stage: dispatch, then the static fallbacks.
struct HttpPipeline {
    dispatcher: Arc<dyn Dispatcher>,
    resolver: Arc<ExceptionResolver>,
    resources: Arc<ResourceChain>,
    single_page: Arc<SinglePageHandler>,
    context_path: String,
}

impl Handler for HttpPipeline {
    fn handle(&self, ctx: &mut RequestContext) {
        if ctx.is_upgrade() {
            return;
        }
        if !under_context_path(&self.context_path, ctx.path()) {
            return;
        }

        match self.dispatcher.dispatch(ctx) {
            Ok(true) => {}
            Ok(false) => {
                if !self.resources.try_serve(ctx) && !self.single_page.handle(ctx) {
                    ctx.status(404);
                    ctx.text("Not found");
                }
            }
            Err(failure) => self.resolver.handle(failure.as_ref(), ctx),
        }
        ctx.mark_handled();
    }
}

/// Routes protocol-upgrade handshakes to the embedder's upgrade
/// collaborator, bypassing HTTP dispatch entirely.
struct UpgradeGate {
    upgrade: Arc<dyn Handler>,
}

impl Handler for UpgradeGate {
    fn handle(&self, ctx: &mut RequestContext) {
        if !ctx.is_upgrade() {
            return;
        }
        self.upgrade.handle(ctx);
        ctx.mark_handled();
    }
}

/// Terminal stage for requests outside the context path.
struct ContextPathFallback {
    context_path: String,
}

impl Handler for ContextPathFallback {
    fn handle(&self, ctx: &mut RequestContext) {
        tracing::warn!(
            path = %ctx.path(),
            context_path = %self.context_path,
            "request below context path"
        );
        ctx.status(404);
        ctx.text(&format!(
            "Not found. Request is below context-path (context-path: '{}')",
            self.context_path
        ));
        ctx.mark_handled();
    }
}

fn under_context_path(context_path: &str, path: &str) -> bool {
    if context_path == "/" {
        return true;
    }
    path == context_path
        || path
            .strip_prefix(context_path)
            .is_some_and(|rest| rest.starts_with('/'))
}
