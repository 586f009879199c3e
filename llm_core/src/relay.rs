//! Length-bounded pass-through for generated text.
//!
//! [`BoundedRelay`] forwards upstream fragments as soon as they arrive and
//! stops once `max_length` characters have gone out, cutting the last
//! fragment if needed. Stopping drops the upstream stream; nothing after the
//! cut is ever requested from it.

use std::{
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures::stream::{FusedStream, Stream, StreamExt};

#[derive(Debug)]
pub struct BoundedRelay<S> {
    upstream: Option<S>,
    max_length: usize,
    accumulated: usize,
    truncated: bool,
}

impl<S> BoundedRelay<S> {
    pub fn new(upstream: S, max_length: usize) -> Self {
        Self {
            upstream: Some(upstream),
            max_length,
            accumulated: 0,
            truncated: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Characters forwarded so far.
    pub fn accumulated(&self) -> usize {
        self.accumulated
    }

    /// Whether a fragment had to be cut to stay within the budget.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_closed(&self) -> bool {
        self.upstream.is_none()
    }

    /// Stop relaying and release the upstream stream.
    pub fn close(&mut self) {
        self.upstream = None;
    }
}

impl<S, E> Stream for BoundedRelay<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.accumulated >= this.max_length {
            this.close();
        }
        let Some(upstream) = this.upstream.as_mut() else {
            return Poll::Ready(None);
        };

        match ready!(upstream.poll_next_unpin(cx)) {
            None => {
                this.close();
                Poll::Ready(None)
            }
            Some(Err(e)) => {
                this.close();
                Poll::Ready(Some(Err(e)))
            }
            Some(Ok(fragment)) => {
                let remaining = this.max_length - this.accumulated;
                let len = fragment.chars().count();

                let fragment = if len <= remaining {
                    this.accumulated += len;
                    fragment
                } else {
                    this.accumulated = this.max_length;
                    this.truncated = true;
                    char_prefix(&fragment, remaining).to_string()
                };

                if this.accumulated >= this.max_length {
                    this.close();
                }
                Poll::Ready(Some(Ok(fragment)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.upstream {
            Some(upstream) => (0, upstream.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl<S, E> FusedStream for BoundedRelay<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.upstream.is_none()
    }
}

/// The first `n` characters of `s`.
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
