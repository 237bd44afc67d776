#![allow(dead_code)]

use jvmti_graft::bridge::{POLICY_NATIVE, POLICY_NATIVE_SIG, TOGGLE_NATIVE, TOGGLE_NATIVE_SIG};
use jvmti_graft::config::GraftConfig;
use jvmti_graft::env::{Instrumentation, Jni, NativeBinding, Runtime};
use jvmti_graft::error::{CallError, GraftError, HookStage};
use jvmti_graft::hook::{BackendError, HookBackend, HookSite, HookTarget};
use jvmti_graft::sys::jni::{self, jclass, jfieldID, jint, jmethodID, jobject, jstring, jvalue};
use jvmti_graft::sys::jvmti::{jvmtiCapabilities, jvmtiError};
use jvmti_graft::{Graft, Payload};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// Opaque handles handed out by the fake VM.
pub const LOADER: usize = 0x2000;
pub const LOADER_CLASS: usize = 0x2001;
pub const LOAD_CLASS_MID: usize = 0x2002;
pub const COMPANION: usize = 0x3000;
pub const OWNER_LOCAL: usize = 0x5000;
pub const OWNER_GLOBAL: usize = 0x5001;
pub const NESTED_CLASS: usize = 0x5002;
pub const INSTANCE_MID: usize = 0x6001;
pub const NESTED_FID: usize = 0x6002;
pub const RELOAD_MID: usize = 0x6003;
pub const INSTANCE: usize = 0x7001;
pub const NESTED: usize = 0x7002;
const CLASS_BASE: usize = 0x1000;
const STRING_BASE: usize = 0x10000;

pub const TARGET_SIG: &str = "Lnet/minecraft/block/Block;";
pub const OWNER_NAME: &str = "net.minecraft.client.Minecraft";
pub const NESTED_NAME: &str = "net.minecraft.client.renderer.RenderGlobal";

pub const ACC_PUBLIC: u16 = 0x0001;

// =========================================================================
// Fake VM
// =========================================================================

pub struct FakeState {
    /// Every VM call in order, by name.
    pub calls: Vec<String>,
    /// Whether the calling thread is attached. The fake models one thread.
    pub attached: bool,
    pub attaches: usize,
    pub detaches: usize,
    pub live_locals: i64,
    pub live_globals: i64,
    pub classes: Vec<&'static str>,
    /// Call names that fail when reached.
    pub fail: HashSet<String>,
    pub capability_error: Option<jvmtiError>,
    pub companion_defined: bool,
    /// Native methods the companion declares, as the VM sees them.
    pub declared_natives: Vec<(&'static str, &'static str)>,
    pub registered: Vec<String>,
    pub redefined: Vec<(String, usize)>,
    pub reloads: usize,
    pub bootstrap_target: bool,
    pub pending_exception: bool,
    strings: HashMap<usize, String>,
    next_string: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        FakeState {
            calls: Vec::new(),
            attached: false,
            attaches: 0,
            detaches: 0,
            live_locals: 0,
            live_globals: 0,
            classes: vec!["Ljava/lang/Object;", TARGET_SIG, "Ljava/lang/String;"],
            fail: HashSet::new(),
            capability_error: None,
            companion_defined: false,
            declared_natives: vec![(POLICY_NATIVE, POLICY_NATIVE_SIG), (TOGGLE_NATIVE, TOGGLE_NATIVE_SIG)],
            registered: Vec::new(),
            redefined: Vec::new(),
            reloads: 0,
            bootstrap_target: false,
            pending_exception: false,
            strings: HashMap::new(),
            next_string: STRING_BASE,
        }
    }
}

impl FakeState {
    fn record(&mut self, call: &str) {
        self.calls.push(call.to_string());
    }

    fn fails(&self, call: &str) -> bool {
        self.fail.contains(call)
    }

    fn local(&mut self, handle: usize) -> jobject {
        self.live_locals += 1;
        handle as jobject
    }
}

#[derive(Clone, Default)]
pub struct FakeVm {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeVm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(setup: impl FnOnce(&mut FakeState)) -> Self {
        let vm = Self::default();
        setup(&mut vm.state.lock());
        vm
    }

    pub fn fail(&self, call: &str) {
        self.state.lock().fail.insert(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn balanced(&self) -> bool {
        let state = self.state.lock();
        state.attaches == state.detaches && !state.attached
    }

    pub fn env(&self) -> FakeEnv {
        FakeEnv {
            state: self.state.clone(),
        }
    }

    pub fn ti(&self) -> FakeTi {
        FakeTi {
            state: self.state.clone(),
        }
    }
}

impl Runtime for FakeVm {
    type Env = FakeEnv;
    type Tooling = FakeTi;

    fn get_env(&self) -> Result<Option<FakeEnv>, jint> {
        let mut state = self.state.lock();
        state.record("GetEnv");
        if state.fails("GetEnv") {
            return Err(jni::JNI_ERR);
        }
        Ok(state.attached.then(|| self.env()))
    }

    fn attach_current_thread(&self) -> Result<FakeEnv, jint> {
        let mut state = self.state.lock();
        state.record("AttachCurrentThread");
        if state.fails("AttachCurrentThread") {
            return Err(jni::JNI_ENOMEM);
        }
        state.attached = true;
        state.attaches += 1;
        Ok(self.env())
    }

    fn detach_current_thread(&self) -> Result<(), jint> {
        let mut state = self.state.lock();
        state.record("DetachCurrentThread");
        state.attached = false;
        state.detaches += 1;
        Ok(())
    }

    fn instrumentation(&self) -> Result<FakeTi, jint> {
        let mut state = self.state.lock();
        state.record("GetJvmti");
        if state.fails("GetJvmti") {
            return Err(jni::JNI_EVERSION);
        }
        Ok(self.ti())
    }
}

pub struct FakeEnv {
    state: Arc<Mutex<FakeState>>,
}

fn raised(call: &'static str) -> CallError {
    CallError::ExceptionPending(call)
}

impl Jni for FakeEnv {
    fn define_class(&self, name: &str, loader: jobject, bytes: &[u8]) -> Result<jclass, CallError> {
        let mut state = self.state.lock();
        state.record("DefineClass");
        if state.fails("DefineClass") || state.pending_exception || loader as usize != LOADER || bytes.is_empty() {
            return Err(raised("DefineClass"));
        }
        if state.companion_defined {
            // LinkageError: duplicate class definition
            return Err(raised("DefineClass"));
        }
        assert_eq!(name, "JNIBridge");
        state.companion_defined = true;
        Ok(state.local(COMPANION))
    }

    fn get_object_class(&self, obj: jobject) -> Result<jclass, CallError> {
        let mut state = self.state.lock();
        state.record("GetObjectClass");
        match obj as usize {
            LOADER => Ok(state.local(LOADER_CLASS)),
            _ => Err(CallError::NullResult("GetObjectClass")),
        }
    }

    fn get_method_id(&self, class: jclass, name: &str, sig: &str) -> Result<jmethodID, CallError> {
        let mut state = self.state.lock();
        let call = format!("GetMethodID:{name}");
        state.record(&call);
        if state.fails(&call) {
            return Err(raised("GetMethodID"));
        }
        match (class as usize, name, sig) {
            (LOADER_CLASS, "loadClass", "(Ljava/lang/String;)Ljava/lang/Class;") => Ok(LOAD_CLASS_MID as jmethodID),
            (NESTED_CLASS, "loadRenderers", "()V") => Ok(RELOAD_MID as jmethodID),
            _ => Err(raised("GetMethodID")),
        }
    }

    fn get_static_method_id(&self, class: jclass, name: &str, _sig: &str) -> Result<jmethodID, CallError> {
        let mut state = self.state.lock();
        state.record("GetStaticMethodID");
        if state.fails("GetStaticMethodID") {
            return Err(raised("GetStaticMethodID"));
        }
        match (class as usize, name) {
            (OWNER_GLOBAL, "getMinecraft") => Ok(INSTANCE_MID as jmethodID),
            _ => Err(raised("GetStaticMethodID")),
        }
    }

    fn get_field_id(&self, class: jclass, name: &str, _sig: &str) -> Result<jfieldID, CallError> {
        let mut state = self.state.lock();
        state.record("GetFieldID");
        if state.fails("GetFieldID") {
            return Err(raised("GetFieldID"));
        }
        match (class as usize, name) {
            (OWNER_GLOBAL, "renderGlobal") => Ok(NESTED_FID as jfieldID),
            _ => Err(raised("GetFieldID")),
        }
    }

    fn new_string_utf(&self, s: &str) -> Result<jstring, CallError> {
        let mut state = self.state.lock();
        let handle = state.next_string;
        state.next_string += 1;
        state.strings.insert(handle, s.to_string());
        Ok(state.local(handle))
    }

    fn call_object_method(&self, obj: jobject, method: jmethodID, args: &[jvalue]) -> Result<jobject, CallError> {
        let mut state = self.state.lock();
        if obj as usize != LOADER || method as usize != LOAD_CLASS_MID {
            state.record("CallObjectMethod");
            return Err(raised("CallObjectMethod"));
        }
        let arg = unsafe { args[0].l } as usize;
        let name = state.strings.get(&arg).cloned().unwrap_or_default();
        let call = format!("loadClass:{name}");
        state.record(&call);
        if state.fails(&call) {
            return Err(raised("CallObjectMethod"));
        }
        match name.as_str() {
            OWNER_NAME => Ok(state.local(OWNER_LOCAL)),
            NESTED_NAME => Ok(state.local(NESTED_CLASS)),
            "JNIBridge" if state.companion_defined => Ok(state.local(COMPANION)),
            // ClassNotFoundException
            _ => Err(raised("CallObjectMethod")),
        }
    }

    fn call_static_object_method(&self, class: jclass, method: jmethodID, _args: &[jvalue]) -> Result<jobject, CallError> {
        let mut state = self.state.lock();
        state.record("CallStaticObjectMethod");
        if state.fails("CallStaticObjectMethod") {
            return Err(raised("CallStaticObjectMethod"));
        }
        match (class as usize, method as usize) {
            (OWNER_GLOBAL, INSTANCE_MID) => Ok(state.local(INSTANCE)),
            _ => Err(raised("CallStaticObjectMethod")),
        }
    }

    fn call_void_method(&self, obj: jobject, method: jmethodID, _args: &[jvalue]) -> Result<(), CallError> {
        let mut state = self.state.lock();
        state.record("CallVoidMethod");
        if state.fails("CallVoidMethod") {
            return Err(raised("CallVoidMethod"));
        }
        match (obj as usize, method as usize) {
            (NESTED, RELOAD_MID) => {
                state.reloads += 1;
                Ok(())
            }
            _ => Err(raised("CallVoidMethod")),
        }
    }

    fn get_object_field(&self, obj: jobject, field: jfieldID) -> Result<jobject, CallError> {
        let mut state = self.state.lock();
        state.record("GetObjectField");
        if state.fails("GetObjectField") {
            return Err(raised("GetObjectField"));
        }
        match (obj as usize, field as usize) {
            (INSTANCE, NESTED_FID) => Ok(state.local(NESTED)),
            _ => Err(CallError::NullResult("GetObjectField")),
        }
    }

    fn register_natives(&self, class: jclass, methods: &[NativeBinding]) -> Result<(), CallError> {
        let mut state = self.state.lock();
        state.record("RegisterNatives");
        if state.fails("RegisterNatives") {
            return Err(CallError::Status {
                call: "RegisterNatives",
                code: jni::JNI_ERR,
            });
        }
        if class as usize != COMPANION {
            return Err(raised("RegisterNatives"));
        }
        // NoSuchMethodError binds nothing.
        let all_declared = methods.iter().all(|m| {
            !m.fn_ptr.is_null() && state.declared_natives.contains(&(m.name, m.signature))
        });
        if !all_declared {
            return Err(raised("RegisterNatives"));
        }
        state.registered.extend(methods.iter().map(|m| m.name.to_string()));
        Ok(())
    }

    fn new_global_ref(&self, obj: jobject) -> Result<jobject, CallError> {
        let mut state = self.state.lock();
        state.record("NewGlobalRef");
        if state.fails("NewGlobalRef") || obj as usize != OWNER_LOCAL {
            return Err(CallError::NullResult("NewGlobalRef"));
        }
        state.live_globals += 1;
        Ok(OWNER_GLOBAL as jobject)
    }

    fn delete_global_ref(&self, _obj: jobject) {
        let mut state = self.state.lock();
        state.record("DeleteGlobalRef");
        state.live_globals -= 1;
    }

    fn delete_local_ref(&self, _obj: jobject) {
        self.state.lock().live_locals -= 1;
    }

    fn clear_pending_exception(&self) -> bool {
        let mut state = self.state.lock();
        std::mem::replace(&mut state.pending_exception, false)
    }
}

pub struct FakeTi {
    state: Arc<Mutex<FakeState>>,
}

impl Instrumentation for FakeTi {
    fn add_capabilities(&self, _caps: &jvmtiCapabilities) -> Result<(), jvmtiError> {
        let mut state = self.state.lock();
        state.record("AddCapabilities");
        match state.capability_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn get_capabilities(&self) -> Result<jvmtiCapabilities, jvmtiError> {
        let mut caps = jvmtiCapabilities::default();
        caps.set_can_redefine_classes(self.state.lock().capability_error.is_none());
        Ok(caps)
    }

    fn get_loaded_classes(&self) -> Result<Vec<jclass>, jvmtiError> {
        let mut state = self.state.lock();
        state.record("GetLoadedClasses");
        if state.fails("GetLoadedClasses") {
            return Err(jvmtiError::WRONG_PHASE);
        }
        let count = state.classes.len();
        Ok((0..count).map(|i| state.local(CLASS_BASE + i)).collect())
    }

    fn get_class_signature(&self, class: jclass) -> Result<String, jvmtiError> {
        let state = self.state.lock();
        let sig = state
            .classes
            .get((class as usize).wrapping_sub(CLASS_BASE))
            .ok_or(jvmtiError::INVALID_CLASS)?;
        if state.fails(&format!("GetClassSignature:{sig}")) {
            return Err(jvmtiError::INVALID_CLASS);
        }
        Ok(sig.to_string())
    }

    fn redefine_class(&self, class: jclass, bytes: &[u8]) -> Result<(), jvmtiError> {
        let mut state = self.state.lock();
        state.record("RedefineClasses");
        if state.fails("RedefineClasses") {
            return Err(jvmtiError::UNSUPPORTED_REDEFINITION_METHOD_ADDED);
        }
        let sig = state.classes[class as usize - CLASS_BASE].to_string();
        state.redefined.push((sig, bytes.len()));
        Ok(())
    }

    fn get_class_loader(&self, _class: jclass) -> Result<jobject, jvmtiError> {
        let mut state = self.state.lock();
        state.record("GetClassLoader");
        if state.fails("GetClassLoader") {
            return Err(jvmtiError::INVALID_CLASS);
        }
        if state.bootstrap_target {
            return Ok(std::ptr::null_mut());
        }
        Ok(state.local(LOADER))
    }
}

// =========================================================================
// Fake hook backend
// =========================================================================

#[derive(Default)]
pub struct FakeBackend {
    pub log: Arc<Mutex<Vec<&'static str>>>,
    pub fail_at: Option<HookStage>,
}

impl FakeBackend {
    pub fn failing_at(stage: HookStage) -> Self {
        FakeBackend {
            fail_at: Some(stage),
            ..Default::default()
        }
    }

    fn step(&self, name: &'static str, stage: HookStage) -> Result<(), BackendError> {
        self.log.lock().push(name);
        if self.fail_at == Some(stage) {
            return Err(format!("{name} refused").into());
        }
        Ok(())
    }
}

impl HookBackend for FakeBackend {
    fn initialize(&mut self) -> Result<(), BackendError> {
        self.step("initialize", HookStage::Initialize)
    }

    unsafe fn create(&mut self, target: *const (), _detour: *const ()) -> Result<*const (), BackendError> {
        self.step("create", HookStage::Create)?;
        // Nothing is patched, so the target itself runs the original code.
        Ok(target)
    }

    fn enable(&mut self) -> Result<(), BackendError> {
        self.step("enable", HookStage::Enable)
    }

    fn disable(&mut self) -> Result<(), BackendError> {
        self.log.lock().push("disable");
        Ok(())
    }

    fn uninitialize(&mut self) {
        self.log.lock().push("uninitialize");
    }
}

/// A hook site that is already resolved.
pub struct FixedSite(pub HookTarget);

impl HookSite for FixedSite {
    fn resolve(&self) -> jvmti_graft::error::Result<HookTarget> {
        Ok(self.0)
    }
}

pub extern "system" fn noop_target() {}

pub extern "system" fn noop_detour() {}

pub fn noop_site() -> FixedSite {
    FixedSite(HookTarget {
        target: noop_target as *const (),
        detour: noop_detour as *const (),
    })
}

/// A graft over `vm` with the runtime already stored.
pub fn graft_on(vm: &FakeVm, backend: FakeBackend) -> Graft<FakeVm> {
    let graft = Graft::new(GraftConfig::default(), Box::new(backend));
    graft.install_runtime(vm.clone()).expect("runtime stored");
    graft
}

pub fn is_cache_failure(err: &GraftError, expected: &str) -> bool {
    matches!(err, GraftError::CacheResolutionFailed { step, .. } if *step == expected)
}

// =========================================================================
// Class bytes
// =========================================================================

struct CpBuilder {
    entries: Vec<Vec<u8>>,
}

impl CpBuilder {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend_from_slice(&(s.len() as u16).to_be_bytes());
        entry.extend_from_slice(s.as_bytes());
        self.push(entry)
    }

    fn class(&mut self, name_index: u16) -> u16 {
        let mut entry = vec![7];
        entry.extend_from_slice(&name_index.to_be_bytes());
        self.push(entry)
    }

    fn integer(&mut self, value: i32) -> u16 {
        let mut entry = vec![3];
        entry.extend_from_slice(&value.to_be_bytes());
        self.push(entry)
    }

    /// Occupies two constant pool slots.
    fn long(&mut self, value: i64) -> u16 {
        let mut entry = vec![5];
        entry.extend_from_slice(&value.to_be_bytes());
        let index = self.push(entry);
        self.entries.push(Vec::new());
        index
    }

    fn write(&self, out: &mut Vec<u8>) {
        u2(out, self.entries.len() as u16 + 1);
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

fn u2(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn u4(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_attr(out: &mut Vec<u8>, name_index: u16, info: &[u8]) {
    u2(out, name_index);
    u4(out, info.len() as u32);
    out.extend_from_slice(info);
}

/// A class with one constant field, the given methods and a `SourceFile`
/// attribute. Non-native methods get a `Code` attribute.
pub fn class_bytes(name: &str, methods: &[(u16, &str, &str)]) -> Vec<u8> {
    let mut cp = CpBuilder::new();
    let this_name = cp.utf8(name);
    let this_class = cp.class(this_name);
    let super_name = cp.utf8("java/lang/Object");
    let super_class = cp.class(super_name);
    let _wide = cp.long(0x0102_0304_0506_0708);
    let utf_code = cp.utf8("Code");
    let utf_source = cp.utf8("SourceFile");
    let utf_source_name = cp.utf8("Generated.java");
    let utf_field = cp.utf8("VERSION");
    let utf_int = cp.utf8("I");
    let utf_constant = cp.utf8("ConstantValue");
    let const_int = cp.integer(7);
    let method_refs: Vec<(u16, u16, u16)> = methods
        .iter()
        .map(|(flags, name, desc)| (*flags, cp.utf8(name), cp.utf8(desc)))
        .collect();

    let mut out = Vec::new();
    u4(&mut out, 0xCAFEBABE);
    u2(&mut out, 0);
    u2(&mut out, 52);
    cp.write(&mut out);

    u2(&mut out, 0x0021);
    u2(&mut out, this_class);
    u2(&mut out, super_class);
    u2(&mut out, 0);

    u2(&mut out, 1);
    u2(&mut out, 0x0019);
    u2(&mut out, utf_field);
    u2(&mut out, utf_int);
    u2(&mut out, 1);
    push_attr(&mut out, utf_constant, &const_int.to_be_bytes());

    u2(&mut out, method_refs.len() as u16);
    for (flags, name, desc) in method_refs {
        u2(&mut out, flags);
        u2(&mut out, name);
        u2(&mut out, desc);
        if flags & jvmti_graft::classfile::ACC_NATIVE != 0 {
            u2(&mut out, 0);
        } else {
            u2(&mut out, 1);
            // max_stack, max_locals, code_length, return, no handlers or attributes
            push_attr(&mut out, utf_code, &[0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0]);
        }
    }

    u2(&mut out, 1);
    push_attr(&mut out, utf_source, &utf_source_name.to_be_bytes());
    out
}

pub fn patched_class() -> Vec<u8> {
    class_bytes(
        "net/minecraft/block/Block",
        &[(ACC_PUBLIC, "shouldSideBeRendered", "(Ljava/lang/String;)Z")],
    )
}

pub fn companion_class() -> Vec<u8> {
    use jvmti_graft::classfile::{ACC_NATIVE, ACC_STATIC};
    let flags = ACC_PUBLIC | ACC_STATIC | ACC_NATIVE;
    class_bytes(
        "JNIBridge",
        &[(flags, POLICY_NATIVE, POLICY_NATIVE_SIG), (flags, TOGGLE_NATIVE, TOGGLE_NATIVE_SIG)],
    )
}

/// Owned class blobs for a [`Payload`].
pub struct Blobs {
    pub patched: Vec<u8>,
    pub companion: Vec<u8>,
}

impl Blobs {
    pub fn new() -> Self {
        Blobs {
            patched: patched_class(),
            companion: companion_class(),
        }
    }

    pub fn payload(&self) -> Payload<'_> {
        Payload {
            patched_class: &self.patched,
            companion_class: &self.companion,
        }
    }
}
