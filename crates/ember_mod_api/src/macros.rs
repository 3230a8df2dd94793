//! Export macro for mods shipped as dynamic libraries.

/// Exports the symbols the host loader looks for.
///
/// Generates three `extern "C"` functions at the call site:
///
/// - `get_mod_api_version`: NUL-terminated [`MOD_API_VERSION`](crate::MOD_API_VERSION)
///   this mod was built against. The host refuses mismatching libraries.
/// - `create_mod`: constructs the mod and leaks it as a raw `dyn GameMod`
///   pointer. Returns null if construction panics.
/// - `destroy_mod`: reclaims a pointer returned by `create_mod`. The host
///   calls it before unloading the library so the mod is freed by the same
///   code that allocated it.
///
/// The single-argument form builds the mod with `Default::default()`;
/// the two-argument form takes a constructor expression.
///
/// ```rust,ignore
/// #[derive(Default)]
/// pub struct MyMod;
/// impl ember_mod_api::GameMod for MyMod { /* ... */ }
///
/// ember_mod_api::create_mod!(MyMod);
/// ```
#[macro_export]
macro_rules! create_mod {
    ($mod_type:ty) => {
        $crate::create_mod!($mod_type, <$mod_type as ::std::default::Default>::default());
    };
    ($mod_type:ty, $constructor:expr) => {
        #[no_mangle]
        pub extern "C" fn get_mod_api_version() -> *const ::std::os::raw::c_char {
            $crate::MOD_API_VERSION_NUL.as_ptr() as *const ::std::os::raw::c_char
        }

        /// # Safety
        ///
        /// The returned pointer must be released with `destroy_mod` from the
        /// same library.
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn create_mod() -> *mut dyn $crate::GameMod {
            match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                let instance: $mod_type = $constructor;
                ::std::boxed::Box::new(instance)
            })) {
                Ok(instance) => ::std::boxed::Box::into_raw(instance) as *mut dyn $crate::GameMod,
                Err(_) => ::std::ptr::null_mut::<$mod_type>() as *mut dyn $crate::GameMod,
            }
        }

        /// # Safety
        ///
        /// `instance` must come from this library's `create_mod` and must not
        /// be used afterwards.
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn destroy_mod(instance: *mut dyn $crate::GameMod) {
            if instance.is_null() {
                return;
            }
            let _ = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                drop(::std::boxed::Box::from_raw(instance));
            }));
        }
    };
}
