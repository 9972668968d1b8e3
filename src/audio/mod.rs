use crate::model::{FLAG_AUDIBILITY_ENFORCED, SoundCategory, SoundUri, StreamKind};
use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

const ENFORCED_MIN_GAIN: f32 = 0.5;

pub trait SoundHandle {
    fn play(&self);
    fn stop(&self);
    fn is_playing(&self) -> bool;
    fn set_stream(&self, stream: StreamKind);
    fn set_attribute_flags(&self, flags: u32);
}

pub type SharedSound = Rc<dyn SoundHandle>;

// Test-only plumbing so `assert_eq!` can compare `Result<SharedSound, _>`
// values. Not part of the production API; never exercised for `Ok` variants.
#[cfg(test)]
impl std::fmt::Debug for dyn SoundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<sound handle>")
    }
}

#[cfg(test)]
impl PartialEq for dyn SoundHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

pub trait SoundOpener {
    fn open(&self, uri: &SoundUri) -> Option<SharedSound>;
}

pub fn stream_gain(stream: StreamKind) -> f32 {
    match stream {
        StreamKind::Ring => 0.9,
        StreamKind::Notification => 0.8,
        StreamKind::Alarm => 1.0,
    }
}

pub struct RodioOpener {
    stream: OutputStream,
    defaults: HashMap<SoundCategory, PathBuf>,
}

impl RodioOpener {
    pub fn new(defaults: HashMap<SoundCategory, PathBuf>) -> Result<Self> {
        let stream = open_output_stream()?;
        Ok(Self { stream, defaults })
    }

    fn resolve(&self, uri: &SoundUri) -> Option<PathBuf> {
        if let Some(category) = uri.default_category() {
            return self.defaults.get(&category).cloned();
        }
        uri.to_path()
    }
}

impl SoundOpener for RodioOpener {
    fn open(&self, uri: &SoundUri) -> Option<SharedSound> {
        let path = self.resolve(uri)?;
        match RodioHandle::load(&self.stream, path) {
            Ok(handle) => Some(Rc::new(handle)),
            Err(err) => {
                debug!("failed to open {uri}: {err:#}");
                None
            }
        }
    }
}

fn open_output_stream() -> Result<OutputStream> {
    let mut stream = with_silenced_stderr(|| {
        OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            })
    })?;
    stream.log_on_drop(false);
    Ok(stream)
}

pub struct RodioHandle {
    sink: Sink,
    path: PathBuf,
    stream: Cell<StreamKind>,
    flags: Cell<u32>,
}

impl RodioHandle {
    fn load(stream: &OutputStream, path: PathBuf) -> Result<Self> {
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        let handle = Self {
            sink,
            path,
            stream: Cell::new(StreamKind::Ring),
            flags: Cell::new(0),
        };
        handle.enqueue()?;
        handle.apply_gain();
        Ok(handle)
    }

    fn enqueue(&self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open sound {}", self.path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        self.sink.append(source);
        Ok(())
    }

    fn apply_gain(&self) {
        let mut gain = stream_gain(self.stream.get());
        if self.flags.get() & FLAG_AUDIBILITY_ENFORCED != 0 {
            gain = gain.max(ENFORCED_MIN_GAIN);
        }
        self.sink.set_volume(gain);
    }
}

impl SoundHandle for RodioHandle {
    fn play(&self) {
        // A stopped sink has an empty queue; replaying needs a fresh decode.
        if self.sink.empty()
            && let Err(err) = self.enqueue()
        {
            debug!("failed to requeue {}: {err:#}", self.path.display());
            return;
        }
        self.apply_gain();
        self.sink.play();
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn is_playing(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }

    fn set_stream(&self, stream: StreamKind) {
        self.stream.set(stream);
        self.apply_gain();
    }

    fn set_attribute_flags(&self, flags: u32) {
        self.flags.set(flags);
        self.apply_gain();
    }
}

#[derive(Default)]
pub struct NullOpener;

impl NullOpener {
    pub fn new() -> Self {
        Self
    }
}

impl SoundOpener for NullOpener {
    fn open(&self, uri: &SoundUri) -> Option<SharedSound> {
        if uri.is_default() || uri.to_path().is_some() {
            Some(Rc::new(NullHandle::new(uri.clone())))
        } else {
            None
        }
    }
}

pub struct NullHandle {
    uri: SoundUri,
    playing: Cell<bool>,
    stream: Cell<StreamKind>,
    flags: Cell<u32>,
}

impl NullHandle {
    pub fn new(uri: SoundUri) -> Self {
        Self {
            uri,
            playing: Cell::new(false),
            stream: Cell::new(StreamKind::Ring),
            flags: Cell::new(0),
        }
    }

    pub fn uri(&self) -> &SoundUri {
        &self.uri
    }

    pub fn stream(&self) -> StreamKind {
        self.stream.get()
    }

    pub fn flags(&self) -> u32 {
        self.flags.get()
    }
}

impl SoundHandle for NullHandle {
    fn play(&self) {
        self.playing.set(true);
    }

    fn stop(&self) {
        self.playing.set(false);
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn set_stream(&self, stream: StreamKind) {
        self.stream.set(stream);
    }

    fn set_attribute_flags(&self, flags: u32) {
        self.flags.set(flags);
    }
}

#[derive(Default)]
pub struct PlaybackRegistry {
    slot: Option<SharedSound>,
}

impl PlaybackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, handle: SharedSound) {
        self.slot = Some(handle);
    }

    pub fn take(&mut self) -> Option<SharedSound> {
        self.slot.take()
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    pub fn stop_and_clear(&mut self) {
        if let Some(handle) = self.slot.take()
            && handle.is_playing()
        {
            handle.stop();
        }
    }
}

pub type SharedRegistry = Rc<RefCell<PlaybackRegistry>>;

pub fn shared_registry() -> SharedRegistry {
    Rc::new(RefCell::new(PlaybackRegistry::new()))
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}
