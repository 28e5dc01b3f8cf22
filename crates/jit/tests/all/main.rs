#![cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]

mod oracle;
mod properties;
mod scenarios;

/// Initialize test logging once; later calls are no-ops.
pub(crate) fn init() {
    let _ = env_logger::try_init();
}

/// Whether this machine can execute the emitted code. Tests that invoke
/// callables skip themselves (loudly) on hosts without a back-end.
pub(crate) fn host_supported() -> bool {
    match lsejit::isa::host() {
        Ok(_) => true,
        Err(why) => {
            eprintln!("skipping invocation test: {why}");
            false
        }
    }
}
