//! A typed progress event emitted at named lifecycle points (§2 `ProgressBus`, §5 "progress
//! events are emitted synchronously").
//!
//! The teacher's own progress reporting (`visual.rs`) is a thin `indicatif` spinner wrapper keyed
//! to a `visual` feature flag - there's no structured event type to generalize from, so this
//! follows the plain registered-callback shape already used by
//! [`crate::payload::BufferedPayload::on_finish`], just with a named event enum instead of a
//! single byte count.

/// A lifecycle point reached by a [`crate::stream::StreamCodec`] or archive operation.
///
/// Variants correspond 1:1 to the state names in §4.1.1/§4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Configured,
    Writing { bytes_so_far: u64 },
    Finalizing,
    Emitted { total_bytes: u64 },
    HeaderParsed,
    EncryptedWaitingKey,
    PayloadLoaded { bytes: u64 },
    Decrypted,
    Decompressed { bytes: u64 },
    Verified,
    Closed,
    Failed { reason: String },
    EntryStarted { index: u64, path: String },
    EntryFinished { index: u64 },
    ManifestWritten { entry_count: u64 },
}

/// A synchronous sink for [`ProgressEvent`]s, emitted in the exact order state transitions occur.
///
/// Holding no listener is the default and costs nothing on `emit`.
#[derive(Default)]
pub struct ProgressBus {
    listener: Option<Box<dyn FnMut(&ProgressEvent)>>,
}

impl ProgressBus {
    #[must_use]
    pub fn new() -> Self {
        ProgressBus { listener: None }
    }

    pub fn set_listener(&mut self, listener: impl FnMut(&ProgressEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn emit(&mut self, event: ProgressEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBus")
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn events_are_delivered_in_emission_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ProgressBus::new();
        {
            let seen = seen.clone();
            bus.set_listener(move |event| seen.borrow_mut().push(event.clone()));
        }

        bus.emit(ProgressEvent::Configured);
        bus.emit(ProgressEvent::Writing { bytes_so_far: 10 });
        bus.emit(ProgressEvent::Closed);

        assert_eq!(
            *seen.borrow(),
            vec![
                ProgressEvent::Configured,
                ProgressEvent::Writing { bytes_so_far: 10 },
                ProgressEvent::Closed,
            ]
        );
    }

    #[test]
    fn emit_without_listener_is_a_no_op() {
        let mut bus = ProgressBus::new();
        bus.emit(ProgressEvent::Configured);
    }
}
