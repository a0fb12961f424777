use crate::core::channel::Channel;
use crate::core::codec::TextCodec;
use crate::core::console::{Console, Keystroke};
use crate::core::session::state::{Counters, SessionState, SessionStatistics, StateCell};
use crate::core::transform::Pipeline;
use crate::domain::config::{EolMode, FilterKind, TerminalConfig};
use crate::domain::error::{ChannelOp, LinkTermError, LinkTermResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Character sent when the console reports an interrupt instead of a key
pub const INTERRUPT_CHARACTER: char = '\x03';

/// Receives the keystroke that follows the menu key.
///
/// The menu key reserves the next keystroke for local interpretation; what
/// that means is up to the handler installed on the session.
pub trait MenuHandler: Send + Sync {
    fn handle_menu_key(&self, session: &SessionControl, key: &str) -> LinkTermResult<()>;
}

/// Default handler: the reserved keystroke is dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreMenu;

impl MenuHandler for IgnoreMenu {
    fn handle_menu_key(&self, _session: &SessionControl, key: &str) -> LinkTermResult<()> {
        debug!("Ignoring menu key {:?}", key);
        Ok(())
    }
}

/// Codec shared by configuration and one loop. The loop keeps its own
/// incremental coder and rebuilds it when the generation changes.
struct CodecSlot {
    codec: Mutex<TextCodec>,
    generation: AtomicU64,
}

impl CodecSlot {
    fn new(codec: TextCodec) -> Self {
        Self {
            codec: Mutex::new(codec),
            generation: AtomicU64::new(0),
        }
    }

    fn get(&self) -> TextCodec {
        *self.codec.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, codec: TextCodec) {
        *self.codec.lock().unwrap_or_else(PoisonError::into_inner) = codec;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

struct Shared {
    id: Uuid,
    channel: Arc<dyn Channel>,
    console: Arc<dyn Console>,
    state: StateCell,
    alive: AtomicBool,
    reader_alive: AtomicBool,
    echo: AtomicBool,
    raw: AtomicBool,
    exit_character: char,
    menu_character: char,
    pipeline: RwLock<Arc<Pipeline>>,
    rx_codec: CodecSlot,
    tx_codec: CodecSlot,
    menu: RwLock<Arc<dyn MenuHandler>>,
    counters: Counters,
}

impl Shared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn reader_alive(&self) -> bool {
        self.reader_alive.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.alive.store(false, Ordering::Release);
        // a stop before start keeps the session from ever starting
        if !self
            .state
            .transition(SessionState::NotStarted, SessionState::Stopped)
        {
            self.state.transition(SessionState::Running, SessionState::Stopping);
        }
    }

    fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn menu_handler(&self) -> Arc<dyn MenuHandler> {
        Arc::clone(&self.menu.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn request_read_abort(&self) {
        if self.channel.supports_cancel_read() {
            self.channel.cancel_read();
        }
    }
}

/// Cloneable handle for controlling a running session from other threads
/// (signal handlers, menu handlers).
#[derive(Clone)]
pub struct SessionControl {
    shared: Arc<Shared>,
}

impl SessionControl {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Ask both loops to finish. Does not wait for them.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Stop the session and wake the writer if it is waiting for a key
    pub fn interrupt(&self) {
        info!(session = %self.shared.id, "Interrupt requested");
        self.shared.stop();
        self.shared.console.cancel();
    }

    pub fn echo(&self) -> bool {
        self.shared.echo.load(Ordering::Acquire)
    }

    pub fn set_echo(&self, enabled: bool) {
        self.shared.echo.store(enabled, Ordering::Release);
    }

    pub fn raw(&self) -> bool {
        self.shared.raw.load(Ordering::Acquire)
    }

    pub fn set_raw(&self, enabled: bool) {
        self.shared.raw.store(enabled, Ordering::Release);
    }

    pub fn exit_character(&self) -> char {
        self.shared.exit_character
    }

    pub fn menu_character(&self) -> char {
        self.shared.menu_character
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.shared.pipeline()
    }

    /// Rebuild the transform pipeline and swap it in
    pub fn update_transformations(&self, eol: EolMode, filters: &[FilterKind]) {
        let pipeline = Arc::new(Pipeline::new(eol, filters));
        debug!("Installing {:?}", pipeline);
        *self
            .shared
            .pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner) = pipeline;
    }

    pub fn rx_encoding(&self) -> TextCodec {
        self.shared.rx_codec.get()
    }

    pub fn tx_encoding(&self) -> TextCodec {
        self.shared.tx_codec.get()
    }

    /// Set the encoding for received data
    pub fn set_rx_encoding(&self, label: &str) -> LinkTermResult<()> {
        let codec = TextCodec::for_label(label)?;
        self.shared.rx_codec.set(codec);
        Ok(())
    }

    /// Set the encoding for transmitted data
    pub fn set_tx_encoding(&self, label: &str) -> LinkTermResult<()> {
        let codec = TextCodec::for_label(label)?;
        self.shared.tx_codec.set(codec);
        Ok(())
    }

    pub fn set_menu_handler(&self, handler: Arc<dyn MenuHandler>) {
        *self.shared.menu.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    pub fn statistics(&self) -> SessionStatistics {
        self.shared.counters.snapshot()
    }
}

/// Terminal session: copies channel data to the console and keystrokes to
/// the channel, on one reader thread and one writer thread.
pub struct Session {
    control: SessionControl,
    reader: Mutex<Option<JoinHandle<LinkTermResult<()>>>>,
    writer: Mutex<Option<JoinHandle<LinkTermResult<()>>>>,
}

impl Session {
    /// Create a session over an opened channel
    pub fn new(
        channel: Arc<dyn Channel>,
        console: Arc<dyn Console>,
        config: &TerminalConfig,
    ) -> LinkTermResult<Self> {
        let rx_codec = TextCodec::for_label(&config.rx_encoding)?;
        let tx_codec = TextCodec::for_label(&config.tx_encoding)?;
        let pipeline = Pipeline::new(config.eol, &config.filters);

        let shared = Shared {
            id: Uuid::new_v4(),
            channel,
            console,
            state: StateCell::new(),
            alive: AtomicBool::new(false),
            reader_alive: AtomicBool::new(false),
            echo: AtomicBool::new(config.echo),
            raw: AtomicBool::new(config.raw),
            exit_character: config.exit_char,
            menu_character: config.menu_char,
            pipeline: RwLock::new(Arc::new(pipeline)),
            rx_codec: CodecSlot::new(rx_codec),
            tx_codec: CodecSlot::new(tx_codec),
            menu: RwLock::new(Arc::new(IgnoreMenu)),
            counters: Counters::default(),
        };

        Ok(Self {
            control: SessionControl {
                shared: Arc::new(shared),
            },
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        })
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn id(&self) -> Uuid {
        self.control.id()
    }

    pub fn state(&self) -> SessionState {
        self.control.state()
    }

    pub fn is_alive(&self) -> bool {
        self.control.is_alive()
    }

    pub fn statistics(&self) -> SessionStatistics {
        self.control.statistics()
    }

    /// Put the console in raw mode and launch the reader and writer threads
    pub fn start(&self) -> LinkTermResult<()> {
        let shared = &self.control.shared;
        if shared.state.get() != SessionState::NotStarted {
            return Err(LinkTermError::session(format!(
                "session cannot be started from state {}",
                shared.state.get()
            )));
        }

        shared.console.setup()?;

        shared.alive.store(true, Ordering::Release);
        shared.reader_alive.store(true, Ordering::Release);
        if !shared
            .state
            .transition(SessionState::NotStarted, SessionState::Running)
        {
            let state = shared.state.get();
            return Err(self.abandon_start(LinkTermError::session(format!(
                "session cannot be started from state {}",
                state
            ))));
        }

        let reader = spawn_loop("rx", Arc::clone(shared), reader_loop)
            .map_err(|e| self.abandon_start(e))?;
        *lock(&self.reader) = Some(reader);

        let writer = spawn_loop("tx", Arc::clone(shared), writer_loop)
            .map_err(|e| self.abandon_start(e))?;
        *lock(&self.writer) = Some(writer);

        info!(
            session = %shared.id,
            channel = shared.channel.name(),
            "Session started"
        );
        Ok(())
    }

    /// Undo a partial `start`: stop whatever was spawned and restore the console
    fn abandon_start(&self, error: LinkTermError) -> LinkTermError {
        let shared = &self.control.shared;
        shared.stop();
        shared.request_read_abort();
        if let Err(e) = join_loop(&self.reader, "rx") {
            warn!(session = %shared.id, "Reader failed during start: {}", e);
        }
        shared.state.set(SessionState::Stopped);
        if let Err(e) = shared.console.cleanup() {
            warn!(session = %shared.id, "Failed to restore console: {}", e);
        }
        error
    }

    /// Set the flag that ends both loops. Idempotent; does not join.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Stop and wake the writer out of a pending console read
    pub fn interrupt(&self) {
        self.control.interrupt();
    }

    /// Stop the reader only and wait for it to finish
    pub fn stop_reader(&self) -> LinkTermResult<()> {
        let shared = &self.control.shared;
        shared.reader_alive.store(false, Ordering::Release);
        shared.request_read_abort();
        join_loop(&self.reader, "rx")
    }

    /// Wait for the writer thread, and unless `transmit_only` also abort a
    /// pending channel read and wait for the reader. Returns the first fault
    /// either loop ended with.
    pub fn join(&self, transmit_only: bool) -> LinkTermResult<()> {
        let writer_result = join_loop(&self.writer, "tx");
        if transmit_only {
            return writer_result;
        }

        let shared = &self.control.shared;
        shared.request_read_abort();
        let reader_result = join_loop(&self.reader, "rx");

        if shared.state.get() != SessionState::NotStarted {
            shared.state.set(SessionState::Stopped);
        }
        debug!(session = %shared.id, "Session joined");

        reader_result.and(writer_result)
    }

    /// Close the channel. Both loops must have been joined.
    pub fn close(&self) -> LinkTermResult<()> {
        if lock(&self.reader).is_some() || lock(&self.writer).is_some() {
            return Err(LinkTermError::session(
                "close() called while session threads are still running; join() first",
            ));
        }

        let shared = &self.control.shared;
        shared.channel.close()?;
        shared.state.set(SessionState::Stopped);
        info!(session = %shared.id, "Channel closed");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state() == SessionState::Running || self.state() == SessionState::Stopping {
            let shared = &self.control.shared;
            warn!(session = %shared.id, "Session dropped without join");
            shared.stop();
            shared.console.cancel();
            shared.request_read_abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type LoopFn = fn(&Arc<Shared>) -> LinkTermResult<()>;

fn spawn_loop(
    name: &str,
    shared: Arc<Shared>,
    body: LoopFn,
) -> LinkTermResult<JoinHandle<LinkTermResult<()>>> {
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let span = info_span!("session", id = %shared.id, thread = %thread_name);
            let _entered = span.enter();

            let result = body(&shared);
            if let Err(e) = &result {
                error!("{} loop failed: {}", thread_name, e);
                // wake the other loop so the whole session winds down
                shared.stop();
                shared.console.cancel();
                shared.request_read_abort();
            }
            debug!("{} loop finished", thread_name);
            result
        })
        .map_err(|e| LinkTermError::session(format!("failed to spawn {} thread: {}", name, e)))
}

fn join_loop(slot: &Mutex<Option<JoinHandle<LinkTermResult<()>>>>, name: &str) -> LinkTermResult<()> {
    let handle = lock(slot).take();
    match handle {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(LinkTermError::session(format!("{} thread panicked", name)))),
        None => Ok(()),
    }
}

fn is_key(key: &str, character: char) -> bool {
    let mut chars = key.chars();
    chars.next() == Some(character) && chars.next().is_none()
}

/// Copy channel -> console
fn reader_loop(shared: &Arc<Shared>) -> LinkTermResult<()> {
    let mut generation = shared.rx_codec.generation();
    let mut decoder = shared.rx_codec.get().decoder();

    while shared.is_alive() && shared.reader_alive() {
        // read all that is there or wait for one byte
        let wanted = shared.channel.bytes_available().unwrap_or(0).max(1);
        let data = shared
            .channel
            .read(wanted)
            .map_err(|e| LinkTermError::transport(ChannelOp::Read, e))?;
        if data.is_empty() {
            continue;
        }
        shared.counters.add_received(data.len());
        debug!("Received {} bytes", data.len());

        if shared.raw.load(Ordering::Acquire) {
            shared.console.write_bytes(&data)?;
            continue;
        }

        let current = shared.rx_codec.generation();
        if current != generation {
            generation = current;
            decoder = shared.rx_codec.get().decoder();
        }

        let text = decoder.decode(&data);
        if text.is_empty() {
            continue;
        }
        let text = shared.pipeline().rx(text);
        shared.console.write(&text)?;
    }
    Ok(())
}

/// Copy console -> channel until the exit key is pressed. The key after the
/// menu key goes to the menu handler instead of the channel.
fn writer_loop(shared: &Arc<Shared>) -> LinkTermResult<()> {
    let mut generation = shared.tx_codec.generation();
    let mut encoder = shared.tx_codec.get().encoder();
    let mut menu_active = false;

    while shared.is_alive() {
        let key = match shared.console.getkey()? {
            Keystroke::Text(text) => text,
            Keystroke::Interrupt => INTERRUPT_CHARACTER.to_string(),
            Keystroke::Cancelled => continue,
            Keystroke::EndOfInput => {
                info!("Console input closed");
                shared.stop();
                break;
            }
        };
        if !shared.is_alive() {
            break;
        }

        if menu_active {
            menu_active = false;
            let control = SessionControl {
                shared: Arc::clone(shared),
            };
            shared.menu_handler().handle_menu_key(&control, &key)?;
            continue;
        }
        if is_key(&key, shared.menu_character) {
            // next key is for the menu
            menu_active = true;
            continue;
        }
        if is_key(&key, shared.exit_character) {
            info!("Exit key pressed");
            shared.stop();
            break;
        }

        let current = shared.tx_codec.generation();
        if current != generation {
            generation = current;
            encoder = shared.tx_codec.get().encoder();
        }

        let pipeline = shared.pipeline();
        let text = pipeline.tx(key.clone());
        let bytes = encoder.encode(&text);
        if !bytes.is_empty() {
            shared
                .channel
                .write(&bytes)
                .map_err(|e| LinkTermError::transport(ChannelOp::Write, e))?;
            shared.counters.add_sent(bytes.len());
        }

        if shared.echo.load(Ordering::Acquire) {
            shared.console.write(&pipeline.echo(key))?;
        }
    }
    Ok(())
}
