//! Dynamic library loading for mods built with `create_mod!`.

use crate::error::HostError;
use ember_mod_api::{
    EventData, EventHandle, GameMod, HostApi, KeyCode, ModError, API_VERSION_SYMBOL,
    CREATE_MOD_SYMBOL, DESTROY_MOD_SYMBOL, MOD_API_VERSION,
};
use libloading::{Library, Symbol};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::debug;

type VersionFn = unsafe extern "C" fn() -> *const c_char;
#[allow(improper_ctypes_definitions)]
type CreateFn = unsafe extern "C" fn() -> *mut dyn GameMod;
#[allow(improper_ctypes_definitions)]
type DestroyFn = unsafe extern "C" fn(*mut dyn GameMod);

/// File extensions treated as mod libraries.
pub const LIBRARY_EXTENSIONS: [&str; 3] = ["so", "dll", "dylib"];

pub fn is_library_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| LIBRARY_EXTENSIONS.iter().any(|known| ext == *known))
        .unwrap_or(false)
}

/// A mod instance living inside a loaded dynamic library.
///
/// The instance is released through the library's own `destroy_mod` before
/// the library itself is closed.
pub struct LibraryMod {
    instance: NonNull<dyn GameMod>,
    destroy: DestroyFn,
    path: PathBuf,
    // Dropped after `instance` has been destroyed.
    _library: Library,
}

// The instance is `GameMod: Send` and the library handle is only touched on drop.
unsafe impl Send for LibraryMod {}

impl LibraryMod {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn instance(&mut self) -> &mut dyn GameMod {
        // Valid until drop; `&mut self` gives exclusive access.
        unsafe { self.instance.as_mut() }
    }
}

impl Drop for LibraryMod {
    fn drop(&mut self) {
        debug!("Destroying mod instance from {}", self.path.display());
        unsafe { (self.destroy)(self.instance.as_ptr()) };
    }
}

impl GameMod for LibraryMod {
    fn name(&self) -> &str {
        unsafe { self.instance.as_ref() }.name()
    }

    fn version(&self) -> &str {
        unsafe { self.instance.as_ref() }.version()
    }

    fn init(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.instance().init(host)
    }

    fn update(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.instance().update(host)
    }

    fn event(
        &mut self,
        host: &mut dyn HostApi,
        handle: EventHandle,
        data: &EventData,
    ) -> Result<(), ModError> {
        self.instance().event(host, handle, data)
    }

    fn key_event(&mut self, host: &mut dyn HostApi, key: KeyCode) -> Result<(), ModError> {
        self.instance().key_event(host, key)
    }

    fn scroll(&mut self, host: &mut dyn HostApi, amount: f32) -> Result<(), ModError> {
        self.instance().scroll(host, amount)
    }

    fn shutdown(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.instance().shutdown(host)
    }
}

/// Opens `path`, checks the exported API version and creates the mod.
pub fn load_library(path: impl AsRef<Path>) -> Result<LibraryMod, HostError> {
    let path = path.as_ref();
    debug!("Loading mod library from: {}", path.display());

    let library = unsafe {
        Library::new(path).map_err(|e| HostError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    };

    let found = {
        let version: Symbol<VersionFn> = lookup(&library, path, API_VERSION_SYMBOL)?;
        let raw = unsafe { version() };
        if raw.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
        }
    };
    check_api_version(path, found)?;

    let create: CreateFn = *lookup::<CreateFn>(&library, path, CREATE_MOD_SYMBOL)?;
    let destroy: DestroyFn = *lookup::<DestroyFn>(&library, path, DESTROY_MOD_SYMBOL)?;

    let instance = NonNull::new(unsafe { create() }).ok_or_else(|| HostError::NullInstance {
        path: path.to_path_buf(),
    })?;

    let loaded = LibraryMod {
        instance,
        destroy,
        path: path.to_path_buf(),
        _library: library,
    };
    debug!("Created mod instance: {} v{}", loaded.name(), loaded.version());
    Ok(loaded)
}

/// Libraries must be built against exactly this API version.
fn check_api_version(path: &Path, found: String) -> Result<(), HostError> {
    if found == MOD_API_VERSION {
        return Ok(());
    }
    Err(HostError::VersionMismatch {
        path: path.to_path_buf(),
        expected: MOD_API_VERSION.to_string(),
        found,
    })
}

fn lookup<'lib, T>(
    library: &'lib Library,
    path: &Path,
    symbol: &[u8],
) -> Result<Symbol<'lib, T>, HostError> {
    unsafe {
        library.get(symbol).map_err(|e| HostError::SymbolMissing {
            path: path.to_path_buf(),
            symbol: String::from_utf8_lossy(symbol).into_owned(),
            reason: e.to_string(),
        })
    }
}
