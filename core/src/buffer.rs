//! Value buffers, either held in memory or deferred to their origin stream.
//!
//! A [`Buffer`] is a cell with three states:
//! unloaded (only a [`LazySource`] describing where the bytes are),
//! loading (a thread is reading them),
//! and loaded (an immutable, shared byte slice).
//! Bytes are always kept in little endian,
//! with an even length.

use crate::stream::ByteStream;
use byteordered::Endianness;
use snafu::{Backtrace, ResultExt, Snafu};
use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not load {} bytes of value data at position {}", length, position))]
    LoadValue {
        position: u64,
        length: u32,
        source: io::Error,
        backtrace: Backtrace,
    },
}

impl Error {
    /// Whether the origin stream ended before the value did.
    pub fn is_truncated(&self) -> bool {
        match self {
            Error::LoadValue { source, .. } => source.kind() == io::ErrorKind::UnexpectedEof,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reverse the bytes of every `word_size` sized word,
/// converting values between little and big endian.
/// Trailing bytes which do not make a full word are left untouched.
pub fn swap_words(bytes: &mut [u8], word_size: usize) {
    if word_size < 2 {
        return;
    }
    for word in bytes.chunks_exact_mut(word_size) {
        word.reverse();
    }
}

/// Where a deferred value lives and how to decode it.
#[derive(Clone)]
pub struct LazySource {
    stream: Arc<dyn ByteStream>,
    offset: u64,
    length: u32,
    word_size: usize,
    endianness: Endianness,
    padding: u8,
}

impl LazySource {
    pub fn new(
        stream: Arc<dyn ByteStream>,
        offset: u64,
        length: u32,
        word_size: usize,
        endianness: Endianness,
        padding: u8,
    ) -> Self {
        LazySource {
            stream,
            offset,
            length,
            word_size,
            endianness,
            padding,
        }
    }

    /// Position of the first value byte in the origin stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the value in the origin stream.
    pub fn length(&self) -> u32 {
        self.length
    }

    fn padded_len(&self) -> usize {
        let len = self.length as usize;
        len + (len & 1)
    }

    fn load(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.length as usize];
        self.stream
            .read_exact_at(self.offset, &mut data)
            .context(LoadValueSnafu {
                position: self.offset,
                length: self.length,
            })?;
        if data.len() % 2 == 1 {
            data.push(self.padding);
        }
        if self.endianness == Endianness::Big {
            swap_words(&mut data, self.word_size);
        }
        Ok(data)
    }
}

impl fmt::Debug for LazySource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LazySource")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("word_size", &self.word_size)
            .field("endianness", &self.endianness)
            .finish()
    }
}

impl PartialEq for LazySource {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.stream) as *const u8 == Arc::as_ptr(&other.stream) as *const u8
            && self.offset == other.offset
            && self.length == other.length
            && self.word_size == other.word_size
            && self.endianness == other.endianness
    }
}

enum State {
    Unloaded,
    Loading,
    Loaded(Arc<[u8]>),
}

/// The bytes of one value, or of one fragment or item of it.
pub struct Buffer {
    source: Option<LazySource>,
    state: Mutex<State>,
    ready: Condvar,
}

fn pad_even(mut data: Vec<u8>, padding: u8) -> Vec<u8> {
    if data.len() % 2 == 1 {
        data.push(padding);
    }
    data
}

impl Buffer {
    /// Create a loaded buffer,
    /// padding odd length data with the given byte.
    pub fn new(data: Vec<u8>, padding: u8) -> Self {
        Buffer {
            source: None,
            state: Mutex::new(State::Loaded(pad_even(data, padding).into())),
            ready: Condvar::new(),
        }
    }

    /// Create an empty loaded buffer.
    pub fn empty() -> Self {
        Buffer::new(Vec::new(), 0)
    }

    /// Create a buffer which is only read from its stream when first accessed.
    pub fn lazy(source: LazySource) -> Self {
        Buffer {
            source: Some(source),
            state: Mutex::new(State::Unloaded),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The even length of the content, known without loading it.
    pub fn len(&self) -> usize {
        match &*self.lock() {
            State::Loaded(data) => data.len(),
            _ => self.source.as_ref().map(LazySource::padded_len).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the content is in memory.
    pub fn is_loaded(&self) -> bool {
        matches!(&*self.lock(), State::Loaded(_))
    }

    /// The deferred source of this buffer, if it was created lazily.
    pub fn source(&self) -> Option<&LazySource> {
        self.source.as_ref()
    }

    /// The content if it is already in memory.
    pub fn snapshot(&self) -> Option<Arc<[u8]>> {
        match &*self.lock() {
            State::Loaded(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }

    /// Obtain the content, loading it from the origin stream
    /// if this is the first access.
    ///
    /// Loading happens at most once:
    /// concurrent callers wait for the first one to finish
    /// and receive the same shared bytes.
    /// If loading fails, the buffer stays unloaded
    /// and a later call tries again.
    pub fn data(&self) -> Result<Arc<[u8]>> {
        let mut state = self.lock();
        loop {
            match &*state {
                State::Loaded(data) => return Ok(Arc::clone(data)),
                State::Unloaded => break,
                State::Loading => {}
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let source = match &self.source {
            Some(source) => source,
            None => {
                // only reachable for buffers with no content
                let data: Arc<[u8]> = Arc::from(Vec::new());
                *state = State::Loaded(Arc::clone(&data));
                return Ok(data);
            }
        };
        *state = State::Loading;
        drop(state);

        tracing::trace!(
            "Loading {} bytes of deferred value at {}",
            source.length,
            source.offset
        );
        let loaded = source.load();

        let mut state = self.lock();
        let outcome = if let State::Loaded(current) = &*state {
            // committed while loading: the committed content wins
            Ok(Arc::clone(current))
        } else {
            match loaded {
                Ok(data) => {
                    let data: Arc<[u8]> = data.into();
                    *state = State::Loaded(Arc::clone(&data));
                    Ok(data)
                }
                Err(e) => {
                    *state = State::Unloaded;
                    Err(e)
                }
            }
        };
        drop(state);
        self.ready.notify_all();
        outcome
    }

    /// Replace the content.
    ///
    /// Readers which already obtained the previous content
    /// keep their copy of it.
    pub fn commit(&self, data: Vec<u8>, padding: u8) {
        let data: Arc<[u8]> = pad_even(data, padding).into();
        *self.lock() = State::Loaded(data);
        self.ready.notify_all();
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::empty()
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        let state = match &*self.lock() {
            State::Loaded(data) => State::Loaded(Arc::clone(data)),
            _ => State::Unloaded,
        };
        Buffer {
            source: self.source.clone(),
            state: Mutex::new(state),
            ready: Condvar::new(),
        }
    }
}

/// Two buffers are equal if their loaded contents are equal,
/// or if neither is loaded and both point to the same origin.
/// Comparing never triggers a load.
impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        match (self.snapshot(), other.snapshot()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.source == other.source,
            _ => false,
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &*self.lock() {
            State::Loaded(data) => f.debug_tuple("Buffer").field(&&data[..]).finish(),
            State::Loading => f.write_str("Buffer(<loading>)"),
            State::Unloaded => f.debug_tuple("Buffer").field(&self.source).finish(),
        }
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Buffer::new(data, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// counts reads and slows them down to widen race windows
    #[derive(Debug)]
    struct CountingStream {
        inner: MemoryStream,
        reads: AtomicUsize,
    }

    impl ByteStream for CountingStream {
        fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.inner.read_at(position, buf)
        }

        fn write_at(&self, position: u64, buf: &[u8]) -> io::Result<()> {
            self.inner.write_at(position, buf)
        }

        fn len(&self) -> io::Result<u64> {
            self.inner.len()
        }
    }

    fn counting(data: Vec<u8>) -> Arc<CountingStream> {
        Arc::new(CountingStream {
            inner: MemoryStream::from_bytes(data),
            reads: AtomicUsize::new(0),
        })
    }

    #[test]
    fn eager_buffers_are_padded() {
        let buffer = Buffer::new(b"ABC".to_vec(), b' ');
        assert_eq!(buffer.len(), 4);
        assert_eq!(&buffer.data().unwrap()[..], b"ABC ");
        assert!(buffer.is_loaded());
    }

    #[test]
    fn lazy_buffer_swaps_big_endian_words() {
        let stream = counting(vec![0xFF, 0xFF, 0x12, 0x34, 0x56, 0x78]);
        let source = LazySource::new(stream.clone(), 2, 4, 2, Endianness::Big, 0);
        let buffer = Buffer::lazy(source);
        assert_eq!(buffer.len(), 4);
        assert!(!buffer.is_loaded());
        assert_eq!(&buffer.data().unwrap()[..], &[0x34, 0x12, 0x78, 0x56]);
        assert_eq!(stream.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_buffer_odd_length() {
        let stream = counting(b"1.2.3".to_vec());
        let buffer = Buffer::lazy(LazySource::new(stream, 0, 5, 1, Endianness::Little, 0));
        assert_eq!(buffer.len(), 6);
        assert_eq!(&buffer.data().unwrap()[..], b"1.2.3\0");
    }

    #[test]
    fn concurrent_access_loads_once() {
        let stream = counting((0..64).collect());
        let buffer = Arc::new(Buffer::lazy(LazySource::new(
            stream.clone(),
            0,
            64,
            1,
            Endianness::Little,
            0,
        )));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || buffer.data().unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(stream.reads.load(Ordering::SeqCst), 1);
        for data in &results {
            assert!(Arc::ptr_eq(data, &results[0]));
        }
    }

    #[test]
    fn commit_keeps_prior_snapshots() {
        let buffer = Buffer::new(vec![1, 2], 0);
        let before = buffer.data().unwrap();
        buffer.commit(vec![3, 4, 5], 0);
        assert_eq!(&before[..], &[1, 2]);
        assert_eq!(&buffer.data().unwrap()[..], &[3, 4, 5, 0]);
    }

    #[test]
    fn failed_load_can_be_retried() {
        let stream = Arc::new(MemoryStream::from_bytes(vec![1, 2]));
        let buffer = Buffer::lazy(LazySource::new(
            stream.clone(),
            0,
            4,
            1,
            Endianness::Little,
            0,
        ));
        let err = buffer.data().unwrap_err();
        assert!(err.is_truncated());
        assert!(!buffer.is_loaded());

        stream.write_at(2, &[3, 4]).unwrap();
        assert_eq!(&buffer.data().unwrap()[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn swap_words_ignores_partial_words() {
        let mut data = [1, 2, 3, 4, 5];
        swap_words(&mut data, 4);
        assert_eq!(data, [4, 3, 2, 1, 5]);
    }
}
