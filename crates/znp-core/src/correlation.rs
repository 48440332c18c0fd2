//! The request/response correlation core: a `Znp` handle backed by a single
//! tokio task that owns the serial transport and the listener registry.
//!
//! Every `Znp` method that needs to touch the transport or the registry
//! sends a [`CoreMessage`] across an mpsc channel to that task rather than
//! taking a lock — the task is the only thing that ever reads or writes the
//! serial port or mutates [`ListenerRegistry`], satisfying the
//! single-writer requirement without any shared mutable state beyond the
//! channel itself.

use std::sync::{Arc, PoisonError};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, oneshot},
    task::{AbortHandle, JoinHandle},
};
use znp_proto::{
    AsDecoded, CommandInstance, DecodedCommand, FrameCodec, GeneralFrame, SreqRequest,
    commands::{rpc_error, sys},
};

use crate::{
    application::Application,
    config::{DevicePath, ZnpConfig},
    errors::{ConnectError, RequestError, TransportError},
    listener::{ListenerId, ListenerRegistry, Resolution},
    probe, transport,
};

enum CoreMessage {
    Send(GeneralFrame, oneshot::Sender<Result<(), TransportError>>),
    Register(Vec<DecodedCommand>, Resolution, oneshot::Sender<ListenerId>),
    Cancel(ListenerId),
}

struct Connection {
    commands_tx: mpsc::Sender<CoreMessage>,
    core_abort: AbortHandle,
}

struct ZnpInner {
    connection: tokio::sync::RwLock<Connection>,
    sreq_mutex: tokio::sync::Mutex<()>,
    config: ZnpConfig,
    application: Arc<dyn Application>,
    reconnect_handle: std::sync::Mutex<Option<AbortHandle>>,
}

/// A live ZNP connection: frame codec, command catalog dispatch and
/// request/response correlation wired together.
///
/// Cheap to clone — every clone shares the same core task and listener
/// registry, so handing a `Znp` to multiple concurrent callers is the
/// expected usage.
#[derive(Clone)]
pub struct Znp {
    inner: Arc<ZnpInner>,
}

impl Znp {
    /// Open `config.device`, spawn the correlation core, run a `SYS.Ping`
    /// liveness check, then hand off to `application.startup`.
    ///
    /// If `config.device.path` is [`DevicePath::Auto`], every currently
    /// available serial port is probed in turn (see [`crate::probe`]) and
    /// the first that answers is opened.
    pub async fn connect(config: ZnpConfig, application: Arc<dyn Application>) -> Result<Self, ConnectError> {
        let path = resolve_path(&config).await?;
        let stream = transport::open(&path, &config.device)?;
        Self::connect_with_transport(config, application, stream).await
    }

    /// As [`Znp::connect`], but run the core over an already-open
    /// transport. Used by tests to drive the correlation core against a
    /// fake device (e.g. a `tokio::io::duplex` pair); production callers
    /// should use [`Znp::connect`]. Automatic reconnection still reopens
    /// the real serial device from `config`, so it is only meaningful for
    /// handles built through [`Znp::connect`].
    pub async fn connect_with_transport<T>(
        config: ZnpConfig,
        application: Arc<dyn Application>,
        transport: T,
    ) -> Result<Self, ConnectError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (commands_tx, core_task) = spawn_core(transport);
        let core_abort = core_task.abort_handle();

        let znp = Self {
            inner: Arc::new(ZnpInner {
                connection: tokio::sync::RwLock::new(Connection { commands_tx, core_abort }),
                sreq_mutex: tokio::sync::Mutex::new(()),
                config,
                application,
                reconnect_handle: std::sync::Mutex::new(None),
            }),
        };

        znp.request(sys::PingReq, sys::PingRsp::partial()).await?;
        znp.apply_tx_power().await?;
        znp.inner.application.startup(&znp).await?;

        let supervised = znp.clone();
        let reconnect_handle = tokio::spawn(async move { supervise(supervised, core_task).await }).abort_handle();
        *lock_ignore_poison(&znp.inner.reconnect_handle) = Some(reconnect_handle);

        tracing::info!("connected to ZNP device");
        Ok(znp)
    }

    /// Send `req`, serialized under the SREQ mutex so at most one request is
    /// outstanding at a time, and await a response matching `rsp_constraint`
    /// (or an `RPC_ERROR.CommandNotRecognized` naming `req`'s header).
    pub async fn request<Req>(&self, req: Req, rsp_constraint: Req::Rsp) -> Result<Req::Rsp, RequestError>
    where
        Req: SreqRequest + AsDecoded,
        Req::Rsp: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand>,
    {
        let _permit = self.inner.sreq_mutex.lock().await;
        self.request_locked(req, rsp_constraint).await
    }

    /// As [`Znp::request`], but also registers a one-shot listener for
    /// `callback_constraint` before sending, so a notification racing the
    /// SRSP is never missed. Resolves once both the SRSP and the
    /// notification have arrived.
    pub async fn request_callback_rsp<Req, Cb>(
        &self,
        req: Req,
        rsp_constraint: Req::Rsp,
        callback_constraint: Cb,
    ) -> Result<(Req::Rsp, Cb), RequestError>
    where
        Req: SreqRequest + AsDecoded,
        Req::Rsp: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand>,
        Cb: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand>,
    {
        let _permit = self.inner.sreq_mutex.lock().await;

        let (callback_id, callback_rx) = self.register_one_shot(vec![callback_constraint.into_decoded()]).await?;
        let rsp = match self.request_locked(req, rsp_constraint).await {
            Ok(rsp) => rsp,
            Err(error) => {
                self.cancel(callback_id).await;
                return Err(error);
            },
        };

        let callback = callback_rx.await.map_err(|_recv_error| RequestError::Cancelled)?;
        let callback = Cb::try_from(callback).map_err(|_| RequestError::InvalidResponse)?;
        Ok((rsp, callback))
    }

    /// Send a fire-and-forget outbound AREQ (e.g. `SYS.ResetReq`), which has
    /// no matching SRSP to correlate against. Callers that need to observe
    /// an asynchronous follow-up should register a listener with
    /// [`Znp::wait_for_response`] before calling this.
    pub async fn notify<C>(&self, cmd: C) -> Result<(), RequestError>
    where
        C: CommandInstance,
    {
        self.send_frame(cmd.to_frame()?).await
    }

    /// Wait for a single command matching `constraint`, without sending
    /// anything first. Used to await an unsolicited AREQ (e.g. a reset
    /// indication) as its own step in a startup sequence.
    pub async fn wait_for_response<C>(&self, constraint: C) -> Result<C, RequestError>
    where
        C: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand>,
    {
        let decoded = self.wait_for_responses(vec![constraint.into_decoded()]).await?;
        C::try_from(decoded).map_err(|_| RequestError::InvalidResponse)
    }

    /// As [`Znp::wait_for_response`], but accepting a heterogeneous matching
    /// set (e.g. "either this callback or that one") and returning the raw
    /// [`DecodedCommand`] for the caller to match on.
    pub async fn wait_for_responses(&self, matching: Vec<DecodedCommand>) -> Result<DecodedCommand, RequestError> {
        let (_listener_id, resolve_rx) = self.register_one_shot(matching).await?;
        resolve_rx.await.map_err(|_recv_error| RequestError::Cancelled)
    }

    /// Register a persistent callback fired every time `constraint`
    /// matches an incoming command, until [`Znp::cancel_callback`].
    pub async fn callback_for_response<C>(
        &self,
        constraint: C,
        callback: impl Fn(C) + Send + Sync + 'static,
    ) -> Result<ListenerId, RequestError>
    where
        C: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand> + Clone,
    {
        let erased: Arc<dyn Fn(DecodedCommand) + Send + Sync> = Arc::new(move |decoded: DecodedCommand| {
            if let Ok(value) = C::try_from(decoded) {
                callback(value);
            }
        });
        self.callback_for_responses(vec![constraint.into_decoded()], erased).await
    }

    /// As [`Znp::callback_for_response`], but over a heterogeneous matching
    /// set, receiving the raw [`DecodedCommand`] on every match.
    pub async fn callback_for_responses(
        &self,
        matching: Vec<DecodedCommand>,
        callback: Arc<dyn Fn(DecodedCommand) + Send + Sync>,
    ) -> Result<ListenerId, RequestError> {
        self.register(matching, Resolution::Callback(callback)).await
    }

    /// Deregister a listener previously returned by
    /// [`Znp::callback_for_response`] or [`Znp::callback_for_responses`].
    pub async fn cancel_callback(&self, id: ListenerId) {
        self.cancel(id).await;
    }

    /// Stop the reconnect supervisor and the current core task. Any
    /// outstanding `request`/`wait_for_response` calls observe
    /// [`RequestError::Cancelled`].
    pub async fn close(&self) {
        if let Some(handle) = lock_ignore_poison(&self.inner.reconnect_handle).take() {
            handle.abort();
        }
        self.inner.connection.read().await.core_abort.abort();
    }

    async fn request_locked<Req>(&self, req: Req, rsp_constraint: Req::Rsp) -> Result<Req::Rsp, RequestError>
    where
        Req: SreqRequest + AsDecoded,
        Req::Rsp: AsDecoded + TryFrom<DecodedCommand, Error = DecodedCommand>,
    {
        let frame = req.to_frame()?;
        let not_recognized =
            rpc_error::CommandNotRecognizedRsp::partial().with_request_header(Req::HEADER).into_decoded();
        let (listener_id, resolve_rx) =
            self.register_one_shot(vec![rsp_constraint.into_decoded(), not_recognized]).await?;

        if let Err(error) = self.send_frame(frame).await {
            self.cancel(listener_id).await;
            return Err(error);
        }

        let timeout = self.inner.config.znp.sreq_timeout;
        let decoded = match tokio::time::timeout(timeout, resolve_rx).await {
            Ok(Ok(decoded)) => decoded,
            Ok(Err(_recv_error)) => return Err(RequestError::Cancelled),
            Err(_elapsed) => {
                self.cancel(listener_id).await;
                return Err(RequestError::Timeout(timeout));
            },
        };

        if matches!(decoded, DecodedCommand::RpcErrorCommandNotRecognizedRsp(_)) {
            return Err(RequestError::CommandNotRecognized);
        }

        Req::Rsp::try_from(decoded).map_err(|_| RequestError::InvalidResponse)
    }

    async fn send_frame(&self, frame: GeneralFrame) -> Result<(), RequestError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx()
            .await
            .send(CoreMessage::Send(frame, reply_tx))
            .await
            .map_err(|_send_error| RequestError::Cancelled)?;
        reply_rx
            .await
            .map_err(|_recv_error| RequestError::Cancelled)?
            .map_err(|_transport_error| RequestError::Cancelled)
    }

    async fn register(&self, matching: Vec<DecodedCommand>, resolution: Resolution) -> Result<ListenerId, RequestError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx()
            .await
            .send(CoreMessage::Register(matching, resolution, reply_tx))
            .await
            .map_err(|_send_error| RequestError::Cancelled)?;
        reply_rx.await.map_err(|_recv_error| RequestError::Cancelled)
    }

    async fn register_one_shot(
        &self,
        matching: Vec<DecodedCommand>,
    ) -> Result<(ListenerId, oneshot::Receiver<DecodedCommand>), RequestError> {
        let (resolve_tx, resolve_rx) = oneshot::channel();
        let id = self.register(matching, Resolution::OneShot(resolve_tx)).await?;
        Ok((id, resolve_rx))
    }

    async fn cancel(&self, id: ListenerId) {
        let _ = self.commands_tx().await.send(CoreMessage::Cancel(id)).await;
    }

    async fn commands_tx(&self) -> mpsc::Sender<CoreMessage> {
        self.inner.connection.read().await.commands_tx.clone()
    }

    /// Reopen the serial device, spawn a fresh core task, swap it into
    /// place, re-probe and re-run the startup sequence. On success returns
    /// the new core task for the supervisor to wait on next.
    async fn reconnect(&self) -> Result<JoinHandle<()>, ConnectError> {
        let path = resolve_path(&self.inner.config).await?;
        let stream = transport::open(&path, &self.inner.config.device)?;
        let (commands_tx, core_task) = spawn_core(stream);
        let core_abort = core_task.abort_handle();

        *self.inner.connection.write().await = Connection { commands_tx, core_abort };

        self.request(sys::PingReq, sys::PingRsp::partial()).await?;
        self.apply_tx_power().await?;
        self.inner.application.startup(self).await?;
        Ok(core_task)
    }

    /// Issue `SYS.SetTxPower` if [`ZnpRuntimeConfig::tx_power`] is set,
    /// logging the value the device actually applied (it may clamp the
    /// request to the nearest power it supports).
    async fn apply_tx_power(&self) -> Result<(), RequestError> {
        let Some(tx_power) = self.inner.config.znp.tx_power else {
            return Ok(());
        };

        let applied =
            self.request(sys::SetTxPowerReq { tx_power }, sys::SetTxPowerRsp::partial()).await?;
        tracing::info!(requested = tx_power, ?applied.tx_power, "applied radio transmit power");
        Ok(())
    }
}

async fn resolve_path(config: &ZnpConfig) -> Result<String, TransportError> {
    match &config.device.path {
        DevicePath::Exact(path) => Ok(path.clone()),
        DevicePath::Auto => probe::find_device(&config.device).await,
    }
}

fn spawn_core<T>(transport: T) -> (mpsc::Sender<CoreMessage>, JoinHandle<()>)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(32);
    let task = tokio::spawn(run_core(transport, commands_rx, false));
    (commands_tx, task)
}

/// The single task that owns the transport and the listener registry: one
/// `tokio::select!` loop serving both outbound commands from `Znp` methods
/// and inbound bytes off the wire, per `SPEC_FULL.md` section 5.
async fn run_core<T>(mut transport: T, mut commands_rx: mpsc::Receiver<CoreMessage>, ignore_unparsed: bool)
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut registry = ListenerRegistry::new();
    let mut codec = FrameCodec::new();
    let mut read_buf = [0u8; 512];

    loop {
        tokio::select! {
            message = commands_rx.recv() => {
                let Some(message) = message else { break };
                match message {
                    CoreMessage::Send(frame, reply) => {
                        let mut buf = Vec::new();
                        frame.encode(&mut buf);
                        let result = transport.write_all(&buf).await.map_err(TransportError::Io);
                        if result.is_ok() {
                            tracing::debug!(header = %frame.header(), "sent frame");
                        }
                        let _ = reply.send(result);
                    },
                    CoreMessage::Register(matching, resolution, reply) => {
                        let id = registry.register(matching, resolution);
                        let _ = reply.send(id);
                    },
                    CoreMessage::Cancel(id) => registry.cancel(id),
                }
            },
            read_result = transport.read(&mut read_buf) => {
                match read_result {
                    Ok(0) => {
                        tracing::warn!("serial transport closed");
                        break;
                    },
                    Ok(n) => {
                        for frame in codec.feed(&read_buf[..n]) {
                            match DecodedCommand::from_frame(&frame, ignore_unparsed) {
                                Ok(Some(command)) => registry.dispatch(command),
                                Ok(None) => {},
                                Err(error) => tracing::warn!(%error, "failed to decode catalog frame"),
                            }
                        }
                    },
                    Err(error) => {
                        tracing::error!(%error, "serial read error");
                        break;
                    },
                }
            },
        }
    }
}

async fn supervise(znp: Znp, mut core_task: JoinHandle<()>) {
    loop {
        let _ = (&mut core_task).await;
        tracing::warn!("ZNP core task ended, connection lost");

        if !znp.inner.config.znp.auto_reconnect {
            return;
        }

        loop {
            match znp.reconnect().await {
                Ok(new_task) => {
                    core_task = new_task;
                    tracing::info!("reconnected to ZNP device");
                    break;
                },
                Err(error) => {
                    tracing::warn!(%error, "reconnect attempt failed, retrying");
                    tokio::time::sleep(znp.inner.config.znp.auto_reconnect_retry_delay).await;
                },
            }
        }
    }
}

fn lock_ignore_poison<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
