//! Zero-capacity channels where a send completes only once a receiver has taken the value.
//!
//! # Overview
//!
//! [channel] returns a [Sender] and [Receiver] pair that behaves like an unbuffered queue:
//! [Sender::send] resolves only after [Receiver::recv] has handed the value to its caller, and
//! [Receiver::recv] resolves only once some sender offers a value. Back-pressure is therefore
//! implicit: a slow receiver stalls every sender feeding it.
//!
//! Each offered value travels with a `oneshot` acknowledgement that the receiver fires as it
//! takes the value, so the sender observes the handoff itself rather than mere buffer space.
//!
//! # Shutdown
//!
//! Channels close in two steps:
//!
//! 1. Stop producing: either drop every [Sender] or call [Receiver::close]. After
//!    [Receiver::close], new sends fail with [Error::Closed] but values already offered
//!    remain receivable.
//! 2. Drain: keep calling [Receiver::recv] until it returns `None`.
//!
//! Dropping a [Receiver] with values still offered fails their senders with [Error::Closed].

use futures::{
    channel::{mpsc, oneshot},
    SinkExt, StreamExt,
};
use thiserror::Error;

/// Errors that can occur when offering a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("channel closed")]
    Closed,
}

/// A value offered to the receiver along with the acknowledgement fired when it is taken.
type Handoff<T> = (T, oneshot::Sender<()>);

/// Create a new rendezvous channel.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let (sender, receiver) = mpsc::channel(0);
    (Sender { inner: sender }, Receiver { inner: receiver })
}

/// Sending half of a rendezvous channel.
pub struct Sender<T> {
    inner: mpsc::Sender<Handoff<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// Offer a value and wait until a receiver takes it.
    ///
    /// If the returned future is dropped after the value was offered but before it was taken,
    /// the value may still be received.
    pub async fn send(&mut self, value: T) -> Result<(), Error> {
        let (ack, taken) = oneshot::channel();
        self.inner
            .send((value, ack))
            .await
            .map_err(|_| Error::Closed)?;
        taken.await.map_err(|_| Error::Closed)
    }

    /// Returns whether the receiving half has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Receiving half of a rendezvous channel.
pub struct Receiver<T> {
    inner: mpsc::Receiver<Handoff<T>>,
}

impl<T> Receiver<T> {
    /// Take the next offered value.
    ///
    /// Returns `None` once the channel is closed (all senders dropped or [Receiver::close]
    /// called) and every offered value has been drained.
    pub async fn recv(&mut self) -> Option<T> {
        let (value, ack) = self.inner.next().await?;

        // The sender may have given up waiting, which does not affect delivery
        let _ = ack.send(());
        Some(value)
    }

    /// Refuse new values while allowing those already offered to be drained.
    pub fn close(&mut self) {
        self.inner.close();
    }
}
