//! Symbol lookup in modules the host process has already loaded.

use libloading::Library;

pub fn libjvm_filename() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "jvm.dll"
    }
    #[cfg(target_os = "macos")]
    {
        "libjvm.dylib"
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        "libjvm.so"
    }
}

/// The module exporting the fixed-function OpenGL entry points.
pub fn opengl_filename() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "opengl32.dll"
    }
    #[cfg(target_os = "macos")]
    {
        "/System/Library/Frameworks/OpenGL.framework/OpenGL"
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        "libGL.so.1"
    }
}

/// Opens `name` only if it is already mapped into the process.
pub fn open_loaded(name: &str) -> Result<Library, libloading::Error> {
    #[cfg(windows)]
    {
        libloading::os::windows::Library::open_already_loaded(name).map(Library::from)
    }
    #[cfg(unix)]
    {
        let flags = libloading::os::unix::RTLD_NOW | libc::RTLD_NOLOAD;
        unsafe { libloading::os::unix::Library::open(Some(name), flags) }.map(Library::from)
    }
}

/// Address of `symbol` in the already-loaded module `module`.
///
/// The module handle is returned alongside so callers decide how long the
/// module stays pinned.
pub fn find_symbol(module: &str, symbol: &str) -> Result<(Library, *const ()), libloading::Error> {
    let lib = open_loaded(module)?;
    let mut name = Vec::with_capacity(symbol.len() + 1);
    name.extend_from_slice(symbol.as_bytes());
    name.push(0);
    let addr = unsafe {
        let sym: libloading::Symbol<*const ()> = lib.get(&name)?;
        *sym
    };
    Ok((lib, addr))
}
