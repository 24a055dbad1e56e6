use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use snr_primitives::json_rpc::{
    ErrorData, InboundMessage, JsonRpcId, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
use snr_primitives::manifest::{FeatureSet, Manifest, RpcMethodSpec};

use crate::codec::{JsonReader, JsonWriter};
use crate::logging::{self, LogEntry};
use crate::options::{ConfigOption, Value};

type SharedWriter<O> = Arc<Mutex<JsonWriter<O>>>;
type FatalSlot = Arc<std::sync::Mutex<Option<anyhow::Error>>>;

type RpcCallback<S> = Box<
    dyn Fn(
            Plugin<S>,
            serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
        + Send
        + Sync,
>;

type NotificationCallback<S> = Box<
    dyn Fn(Plugin<S>, serde_json::Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

struct RpcMethod<S> {
    name: String,
    usage: String,
    description: String,
    callback: RpcCallback<S>,
}

struct Subscription<S> {
    topic: String,
    callback: NotificationCallback<S>,
}

/// Lifecycle of the host connection. Transitions are one-directional;
/// there is no re-negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Uninitialized,
    ManifestSent,
    Running,
    ShuttingDown,
}

/// Host-supplied runtime configuration, delivered with `init`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(rename = "lightning-dir", default)]
    pub lightning_dir: String,
    #[serde(rename = "rpc-file", default)]
    pub rpc_file: String,
    #[serde(default)]
    pub startup: bool,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub feature_set: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct InitParams {
    #[serde(default)]
    options: HashMap<String, serde_json::Value>,
    #[serde(default)]
    configuration: Configuration,
}

/// Assembles a plugin: declared options, RPC methods and notification
/// topics, then drives the `getmanifest`/`init` handshake.
pub struct Builder<S, I, O>
where
    S: Clone + Send + Sync + 'static,
    I: AsyncRead + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    input: I,
    writer: SharedWriter<O>,
    options: Vec<ConfigOption>,
    rpcmethods: Vec<RpcMethod<S>>,
    subscriptions: Vec<Subscription<S>>,
    dynamic: bool,
}

impl<S, I, O> Builder<S, I, O>
where
    S: Clone + Send + Sync + 'static,
    I: AsyncRead + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(input: I, output: O) -> Self {
        let writer = Arc::new(Mutex::new(JsonWriter::new(output)));

        // Log records are forwarded to the host as notifications through
        // the same serialized writer the responses use.
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        logging::init(log_tx);
        tokio::spawn(forward_log_entries(log_rx, writer.clone()));

        Self {
            input,
            writer,
            options: Vec::new(),
            rpcmethods: Vec::new(),
            subscriptions: Vec::new(),
            dynamic: true,
        }
    }

    pub fn option(mut self, option: ConfigOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn rpcmethod<C, F>(self, name: &str, description: &str, callback: C) -> Self
    where
        C: Fn(Plugin<S>, serde_json::Value) -> F + Send + Sync + 'static,
        F: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        self.rpcmethod_with_usage(name, "", description, callback)
    }

    pub fn rpcmethod_with_usage<C, F>(
        mut self,
        name: &str,
        usage: &str,
        description: &str,
        callback: C,
    ) -> Self
    where
        C: Fn(Plugin<S>, serde_json::Value) -> F + Send + Sync + 'static,
        F: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        self.rpcmethods.push(RpcMethod {
            name: name.to_string(),
            usage: usage.to_string(),
            description: description.to_string(),
            callback: Box::new(move |plugin, params| Box::pin(callback(plugin, params))),
        });
        self
    }

    pub fn subscribe<C, F>(mut self, topic: &str, callback: C) -> Self
    where
        C: Fn(Plugin<S>, serde_json::Value) -> F + Send + Sync + 'static,
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.subscriptions.push(Subscription {
            topic: topic.to_string(),
            callback: Box::new(move |plugin, params| Box::pin(callback(plugin, params))),
        });
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    fn manifest(&self) -> Manifest {
        Manifest {
            options: self.options.iter().map(ConfigOption::to_spec).collect(),
            rpcmethods: self
                .rpcmethods
                .iter()
                .map(|m| RpcMethodSpec {
                    name: m.name.clone(),
                    usage: m.usage.clone(),
                    description: m.description.clone(),
                })
                .collect(),
            subscriptions: self.subscriptions.iter().map(|s| s.topic.clone()).collect(),
            hooks: Vec::new(),
            features: FeatureSet::default(),
            dynamic: self.dynamic,
        }
    }

    /// Runs the startup handshake: answers `getmanifest`, consumes `init`
    /// and binds the option values. The `init` response itself is deferred
    /// to [`ConfiguredPlugin::start`] or [`ConfiguredPlugin::disable`] so
    /// the caller can veto startup after inspecting the configuration.
    ///
    /// Returns `None` if the host closes the stream before `init` arrives.
    pub async fn configure(self) -> Result<Option<ConfiguredPlugin<S, I, O>>> {
        let manifest = self.manifest();
        let Builder {
            input,
            writer,
            options,
            rpcmethods,
            subscriptions,
            ..
        } = self;

        let mut reader = JsonReader::new(input);
        let mut stage = Stage::Uninitialized;

        let init_request: JsonRpcRequest<serde_json::Value> = loop {
            let value = match reader.read_object().await? {
                Some(value) => value,
                None => return Ok(None),
            };
            let message = InboundMessage::classify(value)
                .context("Received an unclassifiable message during the handshake")?;

            match message {
                InboundMessage::Request(request) => {
                    match (stage, request.method.as_str()) {
                        (Stage::Uninitialized, "getmanifest") => {
                            let result = serde_json::to_value(&manifest)?;
                            write_response(&writer, &JsonRpcResponse::success(request.id, result))
                                .await?;
                            stage = Stage::ManifestSent;
                        }
                        (Stage::ManifestSent, "init") => break request,
                        (_, method) => {
                            let error = ErrorData::invalid_request(format!(
                                "Method '{}' is not valid before initialization",
                                method
                            ));
                            write_response(&writer, &JsonRpcResponse::error(request.id, error))
                                .await?;
                        }
                    }
                }
                InboundMessage::Notification(notification) => {
                    log::debug!(
                        "Ignoring notification '{}' during the handshake",
                        notification.method
                    );
                }
            }
        };

        let init_id = init_request.id.clone();
        let params: InitParams = serde_json::from_value(init_request.params)
            .context("Failed to parse 'init' parameters")?;

        let mut bound = HashMap::new();
        for declared in &options {
            let value = match params.options.get(declared.name()) {
                Some(supplied) => declared
                    .bind(supplied)
                    .with_context(|| format!("Failed to bind option '{}'", declared.name()))?,
                None => declared.default_value().clone(),
            };
            bound.insert(declared.name().to_string(), value);
        }

        Ok(Some(ConfiguredPlugin {
            init_id,
            options: bound,
            configuration: params.configuration,
            reader,
            writer,
            rpcmethods,
            subscriptions,
        }))
    }
}

/// A plugin that has completed the handshake but not yet answered `init`.
pub struct ConfiguredPlugin<S, I, O>
where
    S: Clone + Send + Sync + 'static,
    I: AsyncRead + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    init_id: JsonRpcId,
    options: HashMap<String, Value>,
    configuration: Configuration,
    reader: JsonReader<I>,
    writer: SharedWriter<O>,
    rpcmethods: Vec<RpcMethod<S>>,
    subscriptions: Vec<Subscription<S>>,
}

impl<S, I, O> ConfiguredPlugin<S, I, O>
where
    S: Clone + Send + Sync + 'static,
    I: AsyncRead + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    /// The bound value of a declared option (host-supplied, or the
    /// declared default).
    pub fn option(&self, name: &str) -> Option<Value> {
        self.options.get(name).cloned()
    }

    pub fn configuration(&self) -> Configuration {
        self.configuration.clone()
    }

    /// Vetoes startup: answers `init` with a `disable` directive. The host
    /// kills the plugin afterwards; the caller should simply return.
    pub async fn disable(self, reason: &str) -> Result<()> {
        log::warn!("Disabling plugin: {}", reason);
        let response = JsonRpcResponse::success(self.init_id, json!({ "disable": reason }));
        write_response(&self.writer, &response).await
    }

    /// Acknowledges `init` and starts the message loop: one reader task
    /// draining the stream into a queue, one worker handling messages
    /// strictly in receipt order.
    pub async fn start(self, state: S) -> Result<Plugin<S>> {
        let ConfiguredPlugin {
            init_id,
            options,
            configuration,
            reader,
            writer,
            rpcmethods,
            subscriptions,
        } = self;

        write_response(&writer, &JsonRpcResponse::success(init_id, json!({}))).await?;

        let methods: HashMap<String, RpcCallback<S>> = rpcmethods
            .into_iter()
            .map(|m| (m.name, m.callback))
            .collect();
        let topics: HashMap<String, NotificationCallback<S>> = subscriptions
            .into_iter()
            .map(|s| (s.topic, s.callback))
            .collect();

        let fatal: FatalSlot = Arc::new(std::sync::Mutex::new(None));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let reader_handle = tokio::spawn(read_loop(reader, queue_tx, fatal.clone()));

        let plugin = Plugin {
            inner: Arc::new(PluginInner {
                state,
                configuration,
                options,
            }),
            tasks: Arc::new(std::sync::Mutex::new(None)),
        };

        let worker_handle = tokio::spawn(work_loop(
            queue_rx,
            plugin.clone(),
            methods,
            topics,
            writer,
            fatal,
        ));

        if let Ok(mut tasks) = plugin.tasks.lock() {
            *tasks = Some(Tasks {
                worker: worker_handle,
                reader: reader_handle,
            });
        }

        Ok(plugin)
    }
}

struct Tasks {
    worker: JoinHandle<Result<()>>,
    reader: JoinHandle<()>,
}

struct PluginInner<S> {
    state: S,
    configuration: Configuration,
    options: HashMap<String, Value>,
}

/// Handle passed to every callback. Cheap to clone; the shared state is
/// read-only after `init`.
pub struct Plugin<S> {
    inner: Arc<PluginInner<S>>,
    tasks: Arc<std::sync::Mutex<Option<Tasks>>>,
}

impl<S> Clone for Plugin<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<S> Plugin<S> {
    pub fn state(&self) -> &S {
        &self.inner.state
    }

    pub fn configuration(&self) -> Configuration {
        self.inner.configuration.clone()
    }

    pub fn option(&self, name: &str) -> Option<Value> {
        self.inner.options.get(name).cloned()
    }

    /// Waits for the message loop to finish. `Ok` on graceful shutdown or
    /// host disconnect; `Err` when the stream died of a protocol error, so
    /// the binary can exit non-zero and get restarted by the host.
    pub async fn join(&self) -> Result<()> {
        let tasks = match self.tasks.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let tasks = tasks.ok_or_else(|| anyhow!("Plugin was already joined"))?;

        let result = tasks.worker.await.context("Plugin worker task died")?;
        tasks.reader.abort();
        result
    }
}

async fn forward_log_entries<O>(
    mut entries: mpsc::UnboundedReceiver<LogEntry>,
    writer: SharedWriter<O>,
) where
    O: AsyncWrite + Unpin,
{
    while let Some(entry) = entries.recv().await {
        let notification = JsonRpcNotification::new(
            "log",
            json!({ "level": entry.level, "message": entry.message }),
        );
        let value = match serde_json::to_value(&notification) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if writer.lock().await.write_object(&value).await.is_err() {
            break;
        }
    }
}

async fn read_loop<I>(
    mut reader: JsonReader<I>,
    queue: mpsc::UnboundedSender<InboundMessage>,
    fatal: FatalSlot,
) where
    I: AsyncRead + Send + Unpin,
{
    loop {
        match reader.read_object().await {
            Ok(Some(value)) => match InboundMessage::classify(value) {
                Ok(message) => {
                    if queue.send(message).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    store_fatal(&fatal, err);
                    break;
                }
            },
            Ok(None) => break,
            Err(err) => {
                store_fatal(&fatal, err);
                break;
            }
        }
    }
    // Dropping the sender lets the worker drain the queue and stop.
}

fn store_fatal(fatal: &FatalSlot, err: anyhow::Error) {
    if let Ok(mut slot) = fatal.lock() {
        *slot = Some(err);
    }
}

async fn work_loop<S, O>(
    mut queue: mpsc::UnboundedReceiver<InboundMessage>,
    plugin: Plugin<S>,
    methods: HashMap<String, RpcCallback<S>>,
    topics: HashMap<String, NotificationCallback<S>>,
    writer: SharedWriter<O>,
    fatal: FatalSlot,
) -> Result<()>
where
    S: Clone + Send + Sync + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    let mut stage = Stage::Running;

    while let Some(message) = queue.recv().await {
        match message {
            InboundMessage::Request(request) => {
                let response = dispatch_request(&plugin, &methods, request).await;
                write_response(&writer, &response).await?;
            }
            InboundMessage::Notification(notification) => {
                let topic = notification.method;
                if topic == "shutdown" {
                    stage = Stage::ShuttingDown;
                    route_notification(&plugin, &topics, &topic, notification.params).await;
                    break;
                }
                route_notification(&plugin, &topics, &topic, notification.params).await;
            }
        }
    }

    if stage == Stage::ShuttingDown {
        log::debug!("Message loop stopped for shutdown");
        return Ok(());
    }

    let stream_error = match fatal.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    match stream_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every request with an id gets exactly one response; a failing handler
/// produces an error response, never a dead connection.
async fn dispatch_request<S>(
    plugin: &Plugin<S>,
    methods: &HashMap<String, RpcCallback<S>>,
    request: JsonRpcRequest<serde_json::Value>,
) -> JsonRpcResponse<serde_json::Value>
where
    S: Clone + Send + Sync + 'static,
{
    let id = request.id.clone();
    match request.method.as_str() {
        // Lifecycle methods are only valid before the loop starts.
        "getmanifest" | "init" => JsonRpcResponse::error(
            id,
            ErrorData::invalid_request(format!(
                "Method '{}' is only valid during initialization",
                request.method
            )),
        ),
        method => match methods.get(method) {
            None => JsonRpcResponse::error(id, ErrorData::unknown_method(method)),
            Some(callback) => match callback(plugin.clone(), request.params).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(err) => {
                    log::debug!("Method '{}' failed: {:#}", method, err);
                    JsonRpcResponse::error(id, ErrorData::method_error(err.to_string()))
                }
            },
        },
    }
}

/// Notifications have no response channel; failures are logged and
/// swallowed so a bad event can never take the plugin down.
async fn route_notification<S>(
    plugin: &Plugin<S>,
    topics: &HashMap<String, NotificationCallback<S>>,
    topic: &str,
    params: serde_json::Value,
) where
    S: Clone + Send + Sync + 'static,
{
    match topics.get(topic) {
        Some(callback) => {
            if let Err(err) = callback(plugin.clone(), params).await {
                log::warn!("Handler for notification '{}' failed: {:#}", topic, err);
            }
        }
        None => log::debug!("No subscriber for notification '{}'", topic),
    }
}

async fn write_response<O>(
    writer: &SharedWriter<O>,
    response: &JsonRpcResponse<serde_json::Value>,
) -> Result<()>
where
    O: AsyncWrite + Unpin,
{
    let value = serde_json::to_value(response)?;
    writer.lock().await.write_object(&value).await
}
