use crate::{
    display::{show_banner, TextDisplay, BOOT_MESSAGE, SHUTDOWN_MESSAGE},
    Error, Result,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Install a ctrl-c handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

pub(super) fn render_boot<D: TextDisplay + ?Sized>(display: &mut D) -> Result<()> {
    show_banner(display, BOOT_MESSAGE)
}

/// Leave the panel showing that the daemon is gone.
pub(super) fn render_shutdown<D: TextDisplay + ?Sized>(display: &mut D) -> Result<()> {
    show_banner(display, SHUTDOWN_MESSAGE)
}
