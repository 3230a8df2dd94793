//! Value types shared by mods and the host.
//!
//! Everything in this module crosses the mod boundary, so the layouts are
//! kept small and explicit. [`ModStr`] in particular is `#[repr(C)]` and
//! carries its length instead of relying on a terminator.

use crate::error::ModError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;

/// Borrowed text passed as an explicit pointer and length.
///
/// A `ModStr` never owns its buffer. The lifetime `'a` ties it to the
/// borrow it was created from, so the buffer always outlives the call that
/// receives it. Receivers that need the text after the call must copy it.
///
/// # Examples
///
/// ```rust
/// use ember_mod_api::ModStr;
///
/// let name = ModStr::new("cpp_hell");
/// assert_eq!(name.len(), 8);
/// assert_eq!(name.to_str().unwrap(), "cpp_hell");
/// ```
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ModStr<'a> {
    ptr: *const u8,
    len: usize,
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> ModStr<'a> {
    /// Borrows a string slice.
    pub const fn new(text: &'a str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Borrows raw bytes. The bytes are not required to be UTF-8 until
    /// [`ModStr::to_str`] is called.
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
            _borrow: PhantomData,
        }
    }

    /// Builds a `ModStr` from a raw pointer and length.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized bytes that stay valid and
    /// unmodified for `'a`. A null `ptr` is only allowed when `len` is zero.
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Self {
        Self {
            ptr,
            len,
            _borrow: PhantomData,
        }
    }

    /// Number of bytes in the buffer.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// The borrowed bytes, exactly `len` of them.
    pub fn as_bytes(&self) -> &'a [u8] {
        if self.len == 0 || self.ptr.is_null() {
            return &[];
        }
        // SAFETY: every constructor either borrows a live slice of `len`
        // bytes for 'a, or is `from_raw_parts` whose caller guarantees it.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Validates the bytes as UTF-8.
    pub fn to_str(&self) -> Result<&'a str, ModError> {
        Ok(std::str::from_utf8(self.as_bytes())?)
    }

    /// Text with invalid UTF-8 sequences replaced.
    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl<'a> From<&'a str> for ModStr<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl<'a> From<&'a String> for ModStr<'a> {
    fn from(text: &'a String) -> Self {
        Self::new(text.as_str())
    }
}

impl PartialEq for ModStr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ModStr<'_> {}

impl fmt::Debug for ModStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModStr")
            .field("text", &self.to_string_lossy())
            .field("len", &self.len)
            .finish()
    }
}

impl fmt::Display for ModStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Raw keyboard key code as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.0)
    }
}

/// A point or offset in world units, used for the camera and the mouse.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Position = Position::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position::new(self.x + other.x, self.y + other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Opaque handle the host assigns to a named event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventHandle(u64);

impl EventHandle {
    /// Only hosts should mint handles; mods receive them from
    /// `HostApi::subscribe_event`.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Payload carried by a named event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventData {
    I32(i32),
    I64(i64),
    String(String),
    Vector { x: f32, y: f32 },
    Color([f32; 4]),
    Raw(Vec<u8>),
    #[default]
    None,
}

impl From<&str> for EventData {
    fn from(text: &str) -> Self {
        EventData::String(text.to_string())
    }
}

impl From<String> for EventData {
    fn from(text: String) -> Self {
        EventData::String(text)
    }
}

/// Severity of a message a mod sends through the host log channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Critical errors that may affect the mod's behavior
    Error,
    /// Conditions that should be investigated
    Warn,
    /// General informational messages
    Info,
    /// Detailed information for debugging
    Debug,
    /// Very detailed trace information
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
