//! Read-side gate between a kept-alive socket and the HTTP engine.
//!
//! # Responsibilities
//! - Replay the bytes consumed by classification
//! - Let every later request head through only after the classifier accepts it
//! - Follow body framing so the next head is found exactly
//!
//! # Design Decisions
//! - A refused head is never shown to the engine; the gate reports end of
//!   stream instead, so the connection closes without a response
//! - Approved bytes are always handed over before anything new is judged
//! - Writes pass straight through

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

use crate::net::classify::{is_upgrade_request, parse_request_head, BodyFraming, ClassifyError};

/// Socket read size.
const READ_CHUNK: usize = 8 * 1024;

/// Longest chunk-size line accepted, extensions included.
const MAX_CHUNK_LINE: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
enum Refusal {
    #[error(transparent)]
    Head(#[from] ClassifyError),
    #[error("upgrade request on an established HTTP connection")]
    LateUpgrade,
    #[error("invalid chunked body: {0}")]
    Chunked(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// Waiting for a request head.
    Head,
    /// Fixed-length body bytes left.
    Body(u64),
    /// Waiting for a chunk-size line.
    ChunkSize,
    /// Chunk payload bytes left.
    ChunkData(u64),
    /// CRLF after a chunk payload.
    ChunkDataEnd,
    /// Trailer section, with its size so far.
    Trailers(usize),
    /// Nothing more is passed on.
    Closed,
}

/// `inner` as the HTTP engine is allowed to see it.
pub struct RequestGate<T> {
    inner: T,
    /// Bytes read but not yet handed over; the first `approved` are cleared.
    buf: BytesMut,
    approved: usize,
    state: GateState,
    max_head: usize,
    header_timeout: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl<T> RequestGate<T> {
    /// Gate `inner`, with `buffered` already read off it.
    ///
    /// `header_timeout` bounds the wait for each head, idle keep-alive time
    /// included.
    pub fn new(inner: T, buffered: Bytes, max_head: usize, header_timeout: Duration) -> Self {
        Self {
            inner,
            buf: BytesMut::from(&buffered[..]),
            approved: 0,
            state: GateState::Head,
            max_head,
            header_timeout,
            deadline: None,
        }
    }

    /// Whether the gate has stopped passing data.
    pub fn is_closed(&self) -> bool {
        self.state == GateState::Closed
    }

    fn close(&mut self, refusal: Refusal) {
        tracing::debug!(reason = %refusal, "Closing HTTP connection without a response");
        self.state = GateState::Closed;
        self.buf.clear();
        self.approved = 0;
        self.deadline = None;
    }

    fn approve(&mut self, len: usize) -> bool {
        self.approved = len;
        len > 0
    }

    /// Judge the unapproved bytes at the front of `buf`.
    ///
    /// Returns whether anything was approved; `false` means more input is needed.
    fn step(&mut self) -> Result<bool, Refusal> {
        match self.state {
            GateState::Head => {
                let Some((request, head_len, framing)) = parse_request_head(&self.buf, self.max_head)? else {
                    return Ok(false);
                };
                if is_upgrade_request(request.headers()) {
                    return Err(Refusal::LateUpgrade);
                }
                self.deadline = None;
                self.state = match framing {
                    BodyFraming::Empty => GateState::Head,
                    BodyFraming::Length(n) => GateState::Body(n),
                    BodyFraming::Chunked => GateState::ChunkSize,
                };
                Ok(self.approve(head_len))
            }
            GateState::Body(remaining) => {
                let n = remaining.min(self.buf.len() as u64);
                let left = remaining - n;
                self.state = if left == 0 { GateState::Head } else { GateState::Body(left) };
                Ok(self.approve(n as usize))
            }
            GateState::ChunkSize => match httparse::parse_chunk_size(&self.buf) {
                Ok(httparse::Status::Complete((line_len, size))) => {
                    self.state = if size == 0 {
                        GateState::Trailers(0)
                    } else {
                        GateState::ChunkData(size)
                    };
                    Ok(self.approve(line_len))
                }
                Ok(httparse::Status::Partial) if self.buf.len() > MAX_CHUNK_LINE => {
                    Err(Refusal::Chunked("chunk size line too long"))
                }
                Ok(httparse::Status::Partial) => Ok(false),
                Err(_) => Err(Refusal::Chunked("bad chunk size")),
            },
            GateState::ChunkData(remaining) => {
                let n = remaining.min(self.buf.len() as u64);
                let left = remaining - n;
                self.state = if left == 0 {
                    GateState::ChunkDataEnd
                } else {
                    GateState::ChunkData(left)
                };
                Ok(self.approve(n as usize))
            }
            GateState::ChunkDataEnd => {
                if self.buf.len() < 2 {
                    return Ok(false);
                }
                if &self.buf[..2] != b"\r\n" {
                    return Err(Refusal::Chunked("missing CRLF after chunk"));
                }
                self.state = GateState::ChunkSize;
                Ok(self.approve(2))
            }
            GateState::Trailers(seen) => {
                let Some(end) = self.buf.windows(2).position(|w| w == b"\r\n") else {
                    if seen + self.buf.len() > self.max_head {
                        return Err(ClassifyError::TooLarge(self.max_head).into());
                    }
                    return Ok(false);
                };
                let line_len = end + 2;
                self.state = if end == 0 {
                    GateState::Head
                } else if seen + line_len > self.max_head {
                    return Err(ClassifyError::TooLarge(self.max_head).into());
                } else {
                    GateState::Trailers(seen + line_len)
                };
                Ok(self.approve(line_len))
            }
            GateState::Closed => Ok(false),
        }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for RequestGate<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if out.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if this.approved > 0 {
                let n = this.approved.min(out.remaining());
                out.put_slice(&this.buf[..n]);
                this.buf.advance(n);
                this.approved -= n;
                return Poll::Ready(Ok(()));
            }
            if this.state == GateState::Closed {
                return Poll::Ready(Ok(()));
            }

            match this.step() {
                Ok(true) => continue,
                Ok(false) => {}
                Err(refusal) => {
                    this.close(refusal);
                    continue;
                }
            }

            if this.state == GateState::Head {
                let timeout = this.header_timeout;
                let deadline = this
                    .deadline
                    .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                if deadline.as_mut().poll(cx).is_ready() {
                    this.close(ClassifyError::Timeout.into());
                    continue;
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let mut read = ReadBuf::new(&mut chunk);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut read))?;
            if read.filled().is_empty() {
                if !this.buf.is_empty() {
                    tracing::debug!(pending = this.buf.len(), "Peer closed mid-request");
                }
                this.state = GateState::Closed;
                this.buf.clear();
                this.deadline = None;
                continue;
            }
            this.buf.extend_from_slice(read.filled());
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for RequestGate<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
