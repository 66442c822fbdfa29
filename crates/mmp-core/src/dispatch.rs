// ── Event dispatch ──
//
// Runs subscriber callbacks for one event. Each call is isolated so a
// panicking subscriber does not stop delivery to the rest.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::event::PushEvent;
use crate::subscription::Callback;

/// Invoke every callback with `event`. Returns how many completed normally.
pub(crate) fn deliver(callbacks: &[Callback], event: &PushEvent) -> usize {
    let mut delivered = 0;
    for callback in callbacks {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(()) => delivered += 1,
            Err(payload) => {
                tracing::warn!(
                    event = %event.name,
                    panic = panic_message(payload.as_ref()),
                    "subscriber callback panicked"
                );
            }
        }
    }
    delivered
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
