//! The one-shot installation sequence.
//!
//! Each step runs only if the previous one succeeded. Nothing already
//! applied is rolled back: a redefined class stays redefined if the bridge
//! later fails.

use crate::bridge;
use crate::env::Runtime;
use crate::error::{GraftError, Result};
use crate::graft::{Graft, Stage};
use crate::hook::HookSite;
use crate::locator::ExecutionContext;
use crate::patcher;
use crate::payload::Payload;
use crate::session::IntrospectionSession;
use tracing::info;

/// Installs the graft into the runtime already stored in `graft`.
pub fn run<R: Runtime>(graft: &Graft<R>, payload: &Payload<'_>, site: &dyn HookSite) -> Result<Stage> {
    let config = graft.config();
    let natives = bridge::companion_natives();
    payload.validate(config, &natives)?;

    let runtime = graft.runtime()?;
    let cx = ExecutionContext::acquire(runtime)?;
    let jni = cx.env();

    let ti = runtime
        .instrumentation()
        .map_err(GraftError::InstrumentationUnavailable)?;
    let session = IntrospectionSession::new(ti);
    session.request_redefinition()?;
    graft.advance(Stage::Instrumented);

    let target = session.find_type(jni, &config.target_signature)?;
    graft.advance(Stage::TargetFound);

    patcher::redefine(session.tooling(), &target, payload.patched_class)?;
    graft.advance(Stage::Redefined);

    let loader = session.defining_loader(jni, &target)?;
    let companion = bridge::inject(
        jni,
        loader.get(),
        &config.companion_name,
        payload.companion_class,
        &natives,
    )?;
    graft.advance(Stage::BridgeBound);

    graft.cache().resolve(jni, loader.get(), &config.lookup)?;
    graft.advance(Stage::HandlesResolved);
    drop(companion);

    let hook = site.resolve()?;
    graft.interceptor().install(hook)?;
    graft.advance(Stage::HookInstalled);

    info!(
        target = %config.target_signature,
        companion = %config.companion_name,
        "graft installed"
    );
    Ok(Stage::HookInstalled)
}
