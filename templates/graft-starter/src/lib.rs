//! Starter graft library.
//!
//! Put the compiled replacement of the target class and the companion class
//! in `classes/`, then build with `cargo build --release` and inject the
//! resulting library into the host, or attach it as an agent:
//!
//! ```text
//! jcmd <pid> JVMTI.agent_load /path/to/libmy_graft.so "key=X,log=debug"
//! ```

jvmti_graft::export_graft! {
    patched: include_bytes!("../classes/Block.class"),
    companion: include_bytes!("../classes/JNIBridge.class"),
}
