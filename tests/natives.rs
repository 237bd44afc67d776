use jvmti_graft::bridge::companion_natives;
use jvmti_graft::entry;
use jvmti_graft::sys::jni::{self, jboolean, jclass, jstring, JNINativeInterface_};
use jvmti_graft::Payload;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

type AllowBlockFn = unsafe extern "system" fn(*mut jni::JNIEnv, jclass, jstring) -> jboolean;
type XrayOnFn = unsafe extern "system" fn(*mut jni::JNIEnv, jclass) -> jboolean;

const JNI_TABLE_LEN: usize = 236;
const GET_STRING_UTF_CHARS: usize = 169;
const RELEASE_STRING_UTF_CHARS: usize = 170;
const EXCEPTION_CHECK: usize = 228;

static RELEASED: AtomicUsize = AtomicUsize::new(0);

// The fake VM hands the string's own bytes back as its UTF chars.
unsafe extern "system" fn get_string_utf_chars(_env: *mut jni::JNIEnv, s: jstring, _is_copy: *mut jboolean) -> *const c_char {
    s as *const c_char
}

unsafe extern "system" fn release_string_utf_chars(_env: *mut jni::JNIEnv, _s: jstring, _chars: *const c_char) {
    RELEASED.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn exception_check(_env: *mut jni::JNIEnv) -> jboolean {
    jni::JNI_FALSE
}

fn jni_table() -> Vec<*const c_void> {
    let mut table = vec![ptr::null(); JNI_TABLE_LEN];
    table[GET_STRING_UTF_CHARS] = get_string_utf_chars as *const c_void;
    table[RELEASE_STRING_UTF_CHARS] = release_string_utf_chars as *const c_void;
    table[EXCEPTION_CHECK] = exception_check as *const c_void;
    table
}

fn started() {
    if entry::graft().is_none() {
        entry::process_attach(
            Payload {
                patched_class: &[],
                companion_class: &[],
            },
            "",
        );
    }
}

fn allow_block(name: Option<&CStr>) -> bool {
    started();
    let table = jni_table();
    let mut env: jni::JNIEnv = table.as_ptr().cast::<JNINativeInterface_>();
    let name = name.map_or(ptr::null_mut(), |n| n.as_ptr() as jstring);
    let allow: AllowBlockFn = unsafe { std::mem::transmute(companion_natives()[0].fn_ptr) };
    unsafe { allow(&mut env, ptr::null_mut(), name) == jni::JNI_TRUE }
}

fn cstr(bytes: &[u8]) -> &CStr {
    CStr::from_bytes_with_nul(bytes).unwrap()
}

#[test]
fn allow_block_matches_the_suffix() {
    let before = RELEASED.load(Ordering::SeqCst);
    assert!(allow_block(Some(cstr(b"diamond_ore}\0"))));
    assert!(!allow_block(Some(cstr(b"stone\0"))));
    assert!(RELEASED.load(Ordering::SeqCst) >= before + 2);
}

#[test]
fn allow_block_accepts_modified_utf8_names() {
    assert!(allow_block(Some(cstr(b"\xED\xA0\xBD\xED\xB2\x8E_ore}\0"))));
    assert!(allow_block(Some(cstr(b"a\xC0\x80b_ore}\0"))));
    assert!(!allow_block(Some(cstr(b"\xED\xA0\xBD\xED\xB2\x8E\0"))));
}

#[test]
fn allow_block_rejects_null() {
    assert!(!allow_block(None));
}

#[test]
fn xray_on_follows_the_toggle() {
    started();
    let table = jni_table();
    let mut env: jni::JNIEnv = table.as_ptr().cast::<JNINativeInterface_>();
    let xray_on: XrayOnFn = unsafe { std::mem::transmute(companion_natives()[1].fn_ptr) };
    let toggle = entry::graft().unwrap().toggle();

    let before = toggle.get();
    assert_eq!(unsafe { xray_on(&mut env, ptr::null_mut()) } == jni::JNI_TRUE, before);
    toggle.flip();
    assert_eq!(unsafe { xray_on(&mut env, ptr::null_mut()) } == jni::JNI_TRUE, !before);
}
