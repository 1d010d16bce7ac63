//! Stdio request loop
//!
//! `configure`, `schema` and `cancel` are answered inline, in arrival order.
//! Every resource operation runs as its own task so a slow registrar call
//! never blocks the next request. Responses are funnelled through a single
//! writer task so lines never interleave.

use regdns_client::HttpRegistrarApi;
use regdns_core::{Credential, Error, PropertyMap, ProviderConfig, ReconcileEngine};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    CheckParams, ConfigureParams, CreateParams, DiffParams, InstanceParams, Method, Request,
    Response, UpdateParams,
};

/// Connection settings picked up from the environment
///
/// Values passed to `configure` take precedence.
#[derive(Clone, Default)]
pub struct Settings {
    pub api_token: Option<String>,
    pub private_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<REDACTED>"))
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Why the request loop stopped
#[derive(Debug)]
pub enum Stopped {
    /// Stdin reached EOF and in-flight operations finished
    InputClosed,
    /// Shutdown was requested; in-flight operations were cancelled
    Shutdown,
    /// `configure` failed; no resource operation can run
    ConfigureFailed(Error),
}

/// Resource operations, the requests that need a configured engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Check,
    Diff,
    Create,
    Update,
    Delete,
    Read,
}

impl Method {
    fn operation(self) -> Option<Operation> {
        match self {
            Method::Check => Some(Operation::Check),
            Method::Diff => Some(Operation::Diff),
            Method::Create => Some(Operation::Create),
            Method::Update => Some(Operation::Update),
            Method::Delete => Some(Operation::Delete),
            Method::Read => Some(Operation::Read),
            Method::Schema | Method::Configure | Method::Cancel => None,
        }
    }
}

pub struct Server {
    settings: Settings,
    engine: Option<ReconcileEngine>,
    cancel: watch::Sender<u64>,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            engine: None,
            cancel: watch::Sender::new(0),
        }
    }

    /// Start with an engine already in place, skipping `configure`
    #[cfg(test)]
    pub fn with_engine(engine: ReconcileEngine) -> Self {
        Self {
            engine: Some(engine),
            ..Self::new(Settings::default())
        }
    }

    /// Serve requests from `input` until EOF, a failed configure, or `shutdown`
    pub async fn serve<R, W>(
        mut self,
        input: R,
        output: W,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<Stopped>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (responses, outbox) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_responses(output, outbox));

        let mut lines = LinesStream::new(input.lines());
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        let stopped = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    let in_flight = self.cancel_all();
                    info!("Shutdown requested, cancelled {} operation(s)", in_flight);
                    break Stopped::Shutdown;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Operation task failed: {}", e);
                    }
                }
                line = lines.next() => {
                    let line = match line {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => return Err(anyhow::anyhow!("Failed to read request: {}", e)),
                        None => {
                            debug!("Input closed with {} operation(s) in flight", tasks.len());
                            break Stopped::InputClosed;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let request = match serde_json::from_str::<Request>(&line) {
                        Ok(request) => request,
                        Err(e) => {
                            warn!("Unparseable request: {}", e);
                            let _ = responses.send(Response::err(Value::Null, format!("invalid request: {e}")));
                            continue;
                        }
                    };

                    if let Some(failure) = self.handle(request, &responses, &mut tasks).await {
                        break Stopped::ConfigureFailed(failure);
                    }
                }
            }
        };

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Operation task failed: {}", e);
            }
        }

        drop(responses);
        writer
            .await
            .map_err(|e| anyhow::anyhow!("Response writer failed: {}", e))??;
        Ok(stopped)
    }

    /// Answer one request; returns the error of a failed `configure`
    async fn handle(
        &mut self,
        request: Request,
        responses: &mpsc::UnboundedSender<Response>,
        tasks: &mut JoinSet<()>,
    ) -> Option<Error> {
        let Request { id, method, params } = request;

        if let Some(operation) = method.operation() {
            match &self.engine {
                Some(engine) => self.spawn(engine.clone(), operation, id, params, responses, tasks),
                None => {
                    let _ = responses.send(Response::err(id, Error::NotConfigured));
                }
            }
            return None;
        }

        match method {
            Method::Schema => {
                let _ = responses.send(Response::ok(id, regdns_core::schema()));
            }
            Method::Cancel => {
                let in_flight = self.cancel_all();
                let _ = responses.send(Response::ok(id, json!({ "cancelled": in_flight })));
            }
            Method::Configure if self.engine.is_some() => {
                let _ = responses.send(Response::err(id, "provider is already configured"));
            }
            Method::Configure => match self.configure(params).await {
                Ok(engine) => {
                    self.engine = Some(engine);
                    let _ = responses.send(Response::ok(id, json!({})));
                }
                Err(e) => {
                    error!("Configuration failed: {}", e);
                    let _ = responses.send(Response::err(id, &e));
                    return Some(e);
                }
            },
            _ => {}
        }
        None
    }

    async fn configure(&self, params: Value) -> regdns_core::Result<ReconcileEngine> {
        let params: ConfigureParams = if params.is_null() {
            ConfigureParams::default()
        } else {
            serde_json::from_value(params)?
        };

        // credentials are taken as a pair so a token passed here is not
        // overridden by a key from the environment
        let (api_token, private_key) = if params.api_token.is_some() || params.private_key.is_some()
        {
            (params.api_token, params.private_key)
        } else {
            (
                self.settings.api_token.clone(),
                self.settings.private_key.clone(),
            )
        };

        let mut config = ProviderConfig::new(Credential::resolve(api_token, private_key)?);
        if let Some(api_url) = params.api_url.or_else(|| self.settings.api_url.clone()) {
            config = config.with_api_url(api_url);
        }
        if let Some(timeout_secs) = params.timeout_secs.or(self.settings.timeout_secs) {
            config = config.with_timeout_secs(timeout_secs);
        }

        let api = HttpRegistrarApi::connect(&config).await?;
        info!("Provider configured against {}", api.base_url());
        Ok(ReconcileEngine::new(Arc::new(api)))
    }

    fn spawn(
        &self,
        engine: ReconcileEngine,
        operation: Operation,
        id: Value,
        params: Value,
        responses: &mpsc::UnboundedSender<Response>,
        tasks: &mut JoinSet<()>,
    ) {
        let responses = responses.clone();
        let cancelled = self.cancel.subscribe();

        tasks.spawn(async move {
            let response = run_cancellable(&engine, operation, id, params, cancelled).await;
            let _ = responses.send(response);
        });
    }

    /// Cancel every operation still waiting on the registrar; returns how many
    fn cancel_all(&self) -> usize {
        let waiting = self.cancel.receiver_count();
        self.cancel.send_modify(|generation| *generation += 1);
        waiting
    }
}

/// Run one operation unless a cancel arrives first
///
/// An operation that has already finished wins over a concurrent cancel, so
/// a completed remote change is always reported. The cancel receiver is
/// dropped before returning, so `receiver_count` only sees operations still
/// in flight.
async fn run_cancellable(
    engine: &ReconcileEngine,
    operation: Operation,
    id: Value,
    params: Value,
    mut cancelled: watch::Receiver<u64>,
) -> Response {
    let response = tokio::select! {
        biased;

        result = dispatch(engine, operation, params) => match result {
            Ok(result) => Response::ok(id, result),
            Err(e) => {
                warn!("{:?} failed: {}", operation, e);
                Response::err(id, e)
            }
        },
        _ = cancelled.changed() => {
            debug!("{:?} cancelled", operation);
            Response::err(id, "operation cancelled")
        }
    };
    drop(cancelled);
    response
}

async fn dispatch(
    engine: &ReconcileEngine,
    operation: Operation,
    params: Value,
) -> regdns_core::Result<Value> {
    let result = match operation {
        Operation::Check => {
            let p: CheckParams = serde_json::from_value(params)?;
            serde_json::to_value(engine.check_json(&p.kind, &p.news)?)?
        }
        Operation::Diff => {
            let p: DiffParams = serde_json::from_value(params)?;
            let olds = PropertyMap::from_json(&p.olds)?;
            let news = PropertyMap::from_json(&p.news)?;
            serde_json::to_value(engine.diff(&p.kind, &olds, &news)?)?
        }
        Operation::Create => {
            let p: CreateParams = serde_json::from_value(params)?;
            let created = engine
                .create(&p.kind, PropertyMap::from_json(&p.properties)?)
                .await?;
            serde_json::to_value(created)?
        }
        Operation::Update => {
            let p: UpdateParams = serde_json::from_value(params)?;
            let olds = PropertyMap::from_json(&p.olds)?;
            let news = PropertyMap::from_json(&p.news)?;
            let properties = engine.update(&p.kind, &p.id, &olds, &news).await?;
            json!({ "properties": properties.to_json() })
        }
        Operation::Delete => {
            let p: InstanceParams = serde_json::from_value(params)?;
            engine
                .delete(&p.kind, &p.id, &PropertyMap::from_json(&p.properties)?)
                .await?;
            json!({})
        }
        Operation::Read => {
            let p: InstanceParams = serde_json::from_value(params)?;
            let read = engine
                .read(&p.kind, &p.id, &PropertyMap::from_json(&p.properties)?)
                .await?;
            serde_json::to_value(read)?
        }
    };
    Ok(result)
}

async fn write_responses<W>(
    mut output: W,
    mut outbox: mpsc::UnboundedReceiver<Response>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = outbox.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(())
}
