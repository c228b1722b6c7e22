//! Event queue and consumer session.
//!
//! One mutex guards the records, the read cursor and the session, and it is
//! never held across an `.await`. Consumers park on a [`Notify`] and re-check
//! the state after every wake-up.
//!
//! # Interruption
//!
//! Each call to [`EventQueue::interrupt`] and each session close bumps an
//! interrupt epoch. A blocked read remembers the epoch it started with and
//! returns `HardwareError::Interrupted` as soon as it changes.

use crate::{HardwareError, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use wiegand_protocol::EventRecord;

/// Identifier of a consumer session.
pub type SessionId = u64;

/// How a read behaves on an empty queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Wait until a record arrives or the read is interrupted.
    #[default]
    Blocking,

    /// Fail with `HardwareError::WouldBlock`.
    NonBlocking,
}

#[derive(Debug, Default)]
struct QueueState {
    session: Option<SessionId>,
    next_session: SessionId,
    records: VecDeque<EventRecord>,
    /// Bytes of the head record already handed out.
    cursor: usize,
    interrupts: u64,
}

impl QueueState {
    /// Copy from the head record into `buf`, popping it once fully read.
    fn copy_out(&mut self, buf: &mut [u8]) -> Option<usize> {
        let head = self.records.front()?;
        let remaining = &head.as_bytes()[self.cursor..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);

        self.cursor += count;
        if self.cursor >= head.len() {
            self.records.pop_front();
            self.cursor = 0;
        }
        Some(count)
    }

    fn drain(&mut self) -> usize {
        let drained = self.records.len();
        self.records.clear();
        self.cursor = 0;
        drained
    }
}

/// FIFO of rendered records for a single consumer session.
///
/// # Examples
///
/// ```
/// use wiegand_core::TransmissionFormat;
/// use wiegand_hardware::queue::{EventQueue, ReadMode};
/// use wiegand_protocol::{DecodedEvent, Payload};
///
/// #[tokio::main]
/// async fn main() -> wiegand_hardware::Result<()> {
///     let queue = EventQueue::new();
///     let session = queue.open_session()?;
///
///     let event = DecodedEvent::ok(TransmissionFormat::Skw06Rf, Payload::Key('5'), 6);
///     assert!(queue.enqueue(event.to_record()));
///
///     let mut buf = [0u8; 64];
///     let n = queue.read(session, &mut buf, ReadMode::Blocking).await?;
///     assert_eq!(&buf[..n], b"R=0, M=0, K='5', L=6\n");
///
///     queue.close_session(session)?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the consumer session.
    ///
    /// # Errors
    /// Returns `HardwareError::SessionBusy` if a session is already open.
    pub fn open_session(&self) -> Result<SessionId> {
        let mut state = self.lock();
        if state.session.is_some() {
            return Err(HardwareError::SessionBusy);
        }
        state.next_session += 1;
        let id = state.next_session;
        state.session = Some(id);
        Ok(id)
    }

    /// Close the consumer session, discarding every pending record.
    ///
    /// Returns the number of records discarded. A read blocked on the
    /// session is interrupted.
    ///
    /// # Errors
    /// Returns `HardwareError::BadClose` if `session` is not the open session.
    pub fn close_session(&self, session: SessionId) -> Result<usize> {
        let drained = {
            let mut state = self.lock();
            if state.session != Some(session) {
                return Err(HardwareError::bad_close(session));
            }
            state.session = None;
            state.interrupts += 1;
            state.drain()
        };
        self.notify.notify_waiters();
        Ok(drained)
    }

    /// Close any open session, regardless of its id.
    ///
    /// Returns the number of records discarded.
    pub fn close_all(&self) -> usize {
        let drained = {
            let mut state = self.lock();
            state.session = None;
            state.interrupts += 1;
            state.drain()
        };
        self.notify.notify_waiters();
        drained
    }

    /// Append a record and wake any waiting consumer.
    ///
    /// Returns `false` and drops the record if no session is open.
    pub fn enqueue(&self, record: EventRecord) -> bool {
        {
            let mut state = self.lock();
            if state.session.is_none() {
                return false;
            }
            state.records.push_back(record);
        }
        self.notify.notify_waiters();
        true
    }

    /// Read up to one record, or the rest of a partially read one.
    ///
    /// Returns the number of bytes copied into `buf`. A record longer than
    /// `buf` is handed out over several reads.
    ///
    /// # Errors
    /// - `HardwareError::SessionNotOpen` if `session` is not the open session
    /// - `HardwareError::WouldBlock` for a non-blocking read on an empty queue
    /// - `HardwareError::Interrupted` if a blocking read is interrupted or its
    ///   session is closed while waiting
    pub async fn read(&self, session: SessionId, buf: &mut [u8], mode: ReadMode) -> Result<usize> {
        let epoch = {
            let state = self.lock();
            if state.session != Some(session) {
                return Err(HardwareError::session_not_open(session));
            }
            state.interrupts
        };

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.interrupts != epoch {
                    return Err(HardwareError::Interrupted);
                }
                if state.session != Some(session) {
                    return Err(HardwareError::session_not_open(session));
                }
                if buf.is_empty() {
                    return Ok(0);
                }
                if let Some(count) = state.copy_out(buf) {
                    return Ok(count);
                }
                if mode == ReadMode::NonBlocking {
                    return Err(HardwareError::WouldBlock);
                }
            }

            notified.await;
        }
    }

    /// Interrupt a read blocked on `session`.
    ///
    /// # Errors
    /// Returns `HardwareError::SessionNotOpen` if `session` is not open.
    pub fn interrupt(&self, session: SessionId) -> Result<()> {
        {
            let mut state = self.lock();
            if state.session != Some(session) {
                return Err(HardwareError::session_not_open(session));
            }
            state.interrupts += 1;
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a consumer session is open.
    pub fn is_open(&self) -> bool {
        self.lock().session.is_some()
    }
}
