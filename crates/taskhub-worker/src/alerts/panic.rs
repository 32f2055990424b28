//! Process-level failure alerts.

use std::any::Any;
use std::sync::Arc;

use tracing::error;

use super::notifier::FailureNotifier;

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Send a process failure alert from synchronous code and wait for it.
///
/// The alert runs on a dedicated thread with its own runtime, so this is
/// callable from a panic hook or after the main runtime stopped.
pub fn alert_blocking(notifier: Arc<FailureNotifier>, what: &'static str, message: String) {
    let sender = std::thread::spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(notifier.process_failure(what, &message)),
            Err(e) => error!(error = %e, "Failed to start alert runtime"),
        }
    });
    if sender.join().is_err() {
        error!("Alert thread panicked");
    }
}

/// Alert on panics of the main thread, then exit with status 1.
///
/// Panics on other threads (job tasks) only go through the previous hook;
/// the runner catches and reports those itself.
pub fn install_panic_hook(notifier: Arc<FailureNotifier>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        if std::thread::current().name() != Some("main") {
            return;
        }

        let location = info
            .location()
            .map(|l| format!(" at {}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = format!("{}{location}", panic_message(info.payload()));
        error!(panic = %message, "Worker panicked on the main thread");

        alert_blocking(notifier.clone(), "panicked", message);
        std::process::exit(1);
    }));
}
