use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use leakwire_frame::FrameBuffer;
use tracing::{debug, error, warn};

use crate::command::Command;
use crate::error::{ClientError, Result};
use crate::event::{classify, Event, EventPayload};
use crate::interceptor::{run_chain, Interceptor, InterceptorId, InterceptorRegistry, Outcome};
use crate::registry::{Handler, HandlerId, HandlerRegistry, StopHandle};
use crate::subscribe::Subscriptions;

/// Default engine endpoint.
pub const DEFAULT_ENDPOINT: &str = "localhost:69420";

/// Default connect timeout. Zero means no timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Poll interval of the [`Client::run`] loop.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(100);

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Engine endpoint, `host:port`.
    pub endpoint: String,
    /// Maximum time to wait for the transport to connect. Zero disables
    /// the timeout.
    pub connect_timeout: Duration,
    /// Optional cap on bytes buffered per frame. Unbounded when `None`.
    pub max_frame_size: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_size: None,
        }
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Shared {
    state: Mutex<SessionState>,
    running: Arc<AtomicBool>,
    sharing: AtomicBool,
    writer: Mutex<Option<TcpStream>>,
    handlers: Mutex<HandlerRegistry>,
    interceptors: Mutex<InterceptorRegistry>,
    subscriptions: Mutex<Subscriptions>,
    max_frame_size: Option<usize>,
}

impl Shared {
    /// Write raw command bytes; only the session controller calls this.
    fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = lock(&self.writer);
        let stream = writer.as_mut().ok_or(ClientError::NotConnected)?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    /// Unconditional transport teardown; idempotent, also the peer-close
    /// path taken by the reader thread.
    fn teardown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.sharing.store(false, Ordering::SeqCst);
        if let Some(stream) = lock(&self.writer).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        *lock(&self.state) = SessionState::Disconnected;
    }
}

/// Client for the instrumentation engine.
///
/// Owns the duplex connection, classifies inbound frames, answers
/// interception frames, and dispatches notifications to registered
/// handlers and subscribers. Registries outlive the connection and
/// survive reconnects.
pub struct Client {
    config: ClientConfig,
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Client with the default endpoint and timeout.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let shared = Shared {
            state: Mutex::new(SessionState::Disconnected),
            running: Arc::new(AtomicBool::new(false)),
            sharing: AtomicBool::new(false),
            writer: Mutex::new(None),
            handlers: Mutex::new(HandlerRegistry::new()),
            interceptors: Mutex::new(InterceptorRegistry::new()),
            subscriptions: Mutex::new(Subscriptions::new()),
            max_frame_size: config.max_frame_size,
        };
        Self {
            config,
            shared: Arc::new(shared),
            reader: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.shared.state)
    }

    /// Whether the dispatch loop is accepting frames.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether a START command has been sent without a matching STOP.
    pub fn is_sharing(&self) -> bool {
        self.shared.sharing.load(Ordering::SeqCst)
    }

    /// Connect to the engine and start the reader loop.
    ///
    /// A no-op success when already connected. On timeout or transport
    /// failure the state returns to [`SessionState::Disconnected`] and the
    /// error is returned to this caller only.
    pub fn connect(&self) -> Result<()> {
        {
            let mut state = lock(&self.shared.state);
            if *state == SessionState::Connected {
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        let stream = match open_stream(&self.config.endpoint, self.config.connect_timeout) {
            Ok(stream) => stream,
            Err(err) => {
                *lock(&self.shared.state) = SessionState::Disconnected;
                return Err(err);
            }
        };
        let reader_stream = match stream.try_clone() {
            Ok(stream) => stream,
            Err(err) => {
                *lock(&self.shared.state) = SessionState::Disconnected;
                return Err(err.into());
            }
        };

        *lock(&self.shared.writer) = Some(stream);
        self.shared.running.store(true, Ordering::SeqCst);
        *lock(&self.shared.state) = SessionState::Connected;
        debug!(endpoint = %self.config.endpoint, "connected to engine");

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("leakwire-reader".to_string())
            .spawn(move || read_events(shared, reader_stream));
        match handle {
            Ok(handle) => {
                *lock(&self.reader) = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.teardown();
                Err(err.into())
            }
        }
    }

    /// Tear down the connection. Safe to call repeatedly, from handlers,
    /// or after a peer-initiated close.
    pub fn disconnect(&self) {
        self.shared.teardown();
        if let Some(handle) = lock(&self.reader).take() {
            // A handler may call disconnect from the reader thread itself;
            // joining that thread from within would deadlock.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    /// Send START unless already sharing (idempotent).
    pub fn start_leaking(&self) -> Result<()> {
        if !self.shared.sharing.load(Ordering::SeqCst) {
            self.send_command(&Command::Start)?;
            self.shared.sharing.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Send STOP if currently sharing (idempotent).
    pub fn stop_leaking(&self) -> Result<()> {
        if self.shared.sharing.load(Ordering::SeqCst) {
            self.send_command(&Command::Stop)?;
            self.shared.sharing.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Send a raw command to the engine.
    pub fn send_command(&self, command: &Command) -> Result<()> {
        self.shared.send_raw(command.encode().as_bytes())
    }

    /// Register a handler for one or more event names.
    pub fn register_handler<I, S, F>(&self, events: I, handler: F) -> HandlerId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &EventPayload, &StopHandle) + Send + Sync + 'static,
    {
        lock(&self.shared.handlers).register(events, Arc::new(handler) as Handler)
    }

    pub fn unregister_handler(&self, id: HandlerId) {
        lock(&self.shared.handlers).unregister(id);
    }

    /// Register a handler invoked for every non-interception event.
    pub fn register_global_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&str, &EventPayload, &StopHandle) + Send + Sync + 'static,
    {
        lock(&self.shared.handlers).register_global(Arc::new(handler) as Handler)
    }

    pub fn unregister_global_handler(&self, id: HandlerId) {
        lock(&self.shared.handlers).unregister(id);
    }

    /// Register an interceptor for one or more event names.
    pub fn register_interceptor<I, S, F>(&self, events: I, interceptor: F) -> InterceptorId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &EventPayload) -> Outcome + Send + Sync + 'static,
    {
        lock(&self.shared.interceptors).register(events, Arc::new(interceptor) as Interceptor)
    }

    pub fn unregister_interceptor(&self, id: InterceptorId) {
        lock(&self.shared.interceptors).unregister(id);
    }

    /// Open a channel receiving every non-interception event with the
    /// given name, independent of the handler registry.
    pub fn subscribe(&self, event: impl Into<String>) -> Receiver<(String, EventPayload)> {
        lock(&self.shared.subscriptions).subscribe(event)
    }

    /// Convenience run mode: connect, start leaking, route every event
    /// through `callback`, and poll until the callback (or anyone else)
    /// stops the session; then stop leaking and disconnect.
    ///
    /// Connect-phase failures are returned with the state back at
    /// [`SessionState::Disconnected`].
    pub fn run<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&str, &EventPayload, &StopHandle) + Send + Sync + 'static,
    {
        self.connect()?;
        if let Err(err) = self.start_leaking() {
            self.disconnect();
            return Err(err);
        }
        let id = self.register_global_handler(callback);

        while self.shared.running.load(Ordering::SeqCst) {
            thread::sleep(RUN_POLL_INTERVAL);
        }

        if let Err(err) = self.stop_leaking() {
            debug!(%err, "stop on shutdown failed");
        }
        self.disconnect();
        self.unregister_handler(id);
        Ok(())
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Mutex guard that survives a poisoning handler panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn open_stream(endpoint: &str, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = endpoint
        .to_socket_addrs()
        .map_err(|source| ClientError::Connect {
            addr: endpoint.to_string(),
            source,
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = if timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(&addr, timeout)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    let source = last_err.unwrap_or_else(|| {
        std::io::Error::new(
            ErrorKind::AddrNotAvailable,
            "endpoint resolved to no addresses",
        )
    });
    if matches!(source.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
        Err(ClientError::ConnectTimeout {
            addr: endpoint.to_string(),
            timeout,
        })
    } else {
        Err(ClientError::Connect {
            addr: endpoint.to_string(),
            source,
        })
    }
}

/// Reader loop: feeds transport bytes through the frame buffer and
/// dispatches every complete frame, in delimiter order, on this one thread.
fn read_events(shared: Arc<Shared>, mut stream: TcpStream) {
    let mut frames = match shared.max_frame_size {
        Some(max) => FrameBuffer::with_max_frame_size(max),
        None => FrameBuffer::new(),
    };
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    'io: while shared.running.load(Ordering::SeqCst) {
        let read = match stream.read(&mut chunk) {
            Ok(0) => {
                debug!("engine closed the connection");
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                // Expected when disconnect() shuts the socket under us.
                if shared.running.load(Ordering::SeqCst) {
                    error!(%err, "transport read failed");
                }
                break;
            }
        };

        if let Err(err) = frames.push(&chunk[..read]) {
            error!(%err, "dropping connection");
            break;
        }

        while let Some(frame) = frames.next_frame() {
            match frame {
                Ok(text) => {
                    if let Err(err) = process_frame(&shared, &text) {
                        error!(%err, "failed to send interception reply");
                        break 'io;
                    }
                }
                Err(err) => warn!(%err, "skipping undecodable frame"),
            }
        }
    }

    shared.teardown();
}

/// Classify one frame and route it. Protocol errors are frame-scoped: they
/// are logged and swallowed so the stream continues. Only transport-level
/// reply failures propagate.
fn process_frame(shared: &Shared, frame: &str) -> Result<()> {
    let event = match classify(frame) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "skipping malformed frame");
            return Ok(());
        }
    };

    if event.is_prefix {
        answer_interception(shared, event)
    } else {
        dispatch_notification(shared, event);
        Ok(())
    }
}

/// Run the interceptor chain and reply. Exactly one reply per interception
/// frame, even when no interceptor is registered: the engine is blocked
/// until it arrives.
fn answer_interception(shared: &Shared, event: Event) -> Result<()> {
    let Event { name, payload, .. } = event;
    let chain = lock(&shared.interceptors).chain(&name);
    let params = run_chain(&chain, &name, payload);
    if params.is_none() {
        debug!(event = %name, "interception suppressed");
    }
    let reply = Command::InterceptionResult {
        event: name,
        params,
    };
    shared.send_raw(reply.encode().as_bytes())
}

/// Notify exact-name handlers, then global handlers, then subscribers.
fn dispatch_notification(shared: &Shared, event: Event) {
    let stop = StopHandle::new(Arc::clone(&shared.running));
    let handlers = lock(&shared.handlers).snapshot(&event.name);
    for handler in handlers {
        handler(&event.name, &event.payload, &stop);
    }
    lock(&shared.subscriptions).publish(&event.name, &event.payload);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shared() -> Arc<Shared> {
        Client::new().shared.clone()
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "localhost:69420");
        assert_eq!(config.connect_timeout, Duration::from_millis(5000));
        assert!(config.max_frame_size.is_none());
    }

    #[test]
    fn starts_disconnected_and_not_running() {
        let client = Client::new();
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(!client.is_running());
        assert!(!client.is_sharing());
    }

    #[test]
    fn send_requiring_operations_fail_when_not_connected() {
        let client = Client::new();

        assert!(matches!(
            client.start_leaking(),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.send_command(&Command::Stop),
            Err(ClientError::NotConnected)
        ));
        // Not sharing, so stop has nothing to send.
        assert!(client.stop_leaking().is_ok());
    }

    #[test]
    fn disconnect_is_idempotent_when_never_connected() {
        let client = Client::new();
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn malformed_frame_is_swallowed_by_process_frame() {
        let shared = shared();
        assert!(process_frame(&shared, "Broken\n{nope").is_ok());
    }

    #[test]
    fn notification_dispatch_reaches_named_then_global_handlers() {
        use std::sync::Mutex as StdMutex;

        let shared = shared();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let named_log = log.clone();
        lock(&shared.handlers).register(
            ["Foo"],
            Arc::new(move |name: &str, payload: &EventPayload, _: &StopHandle| {
                named_log
                    .lock()
                    .unwrap()
                    .push(format!("named:{name}:{}", payload["a"]));
            }) as Handler,
        );
        let global_log = log.clone();
        lock(&shared.handlers).register_global(Arc::new(
            move |name: &str, _: &EventPayload, _: &StopHandle| {
                global_log.lock().unwrap().push(format!("global:{name}"));
            },
        ) as Handler);

        let event = classify("Foo\n{\"a\":1}").unwrap();
        dispatch_notification(&shared, event);

        assert_eq!(*log.lock().unwrap(), vec!["named:Foo:1", "global:Foo"]);
    }

    #[test]
    fn stop_handle_from_dispatch_flips_running() {
        let shared = shared();
        shared.running.store(true, Ordering::SeqCst);

        lock(&shared.handlers).register_global(Arc::new(
            |_: &str, _: &EventPayload, stop: &StopHandle| {
                stop.stop();
            },
        ) as Handler);

        let event = Event {
            name: "Halt".to_string(),
            payload: EventPayload::new(),
            is_prefix: false,
        };
        dispatch_notification(&shared, event);

        assert!(!shared.running.load(Ordering::SeqCst));
    }

    #[test]
    fn subscriptions_receive_after_handler_dispatch() {
        let shared = shared();
        let rx = lock(&shared.subscriptions).subscribe("Foo");

        let event = classify("Foo\n{\"a\":1}").unwrap();
        dispatch_notification(&shared, event);

        let (name, payload) = rx.try_recv().unwrap();
        assert_eq!(name, "Foo");
        assert_eq!(payload.get("a"), Some(&json!(1)));
    }
}
