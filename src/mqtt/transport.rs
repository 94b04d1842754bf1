// MIT License
//
// Copyright (c) 2025 Takatoshi Kondo
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The I/O seam. [`ClientSession`](crate::mqtt::ClientSession) and
//! [`Broker`](crate::mqtt::Broker) only ever talk to these two traits —
//! nothing in this crate touches a socket directly, so the core builds
//! for `no_std + alloc` and tests run against an in-memory double.

/// A single byte-stream connection: either a broker-accepted socket or
/// the broker's outbound bridge connection.
pub trait Transport {
    /// Number of bytes immediately available to `read_byte` without
    /// blocking.
    fn available(&mut self) -> usize;

    /// Read one byte. Only called when `available() > 0`.
    fn read_byte(&mut self) -> u8;

    /// Write the whole buffer or fail. QoS 0 offers no retry: a short
    /// write is treated the same as a closed transport.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), super::error::TransportError>;

    /// Whether the underlying connection is still open.
    fn connected(&self) -> bool;

    /// Close the underlying connection.
    fn stop(&mut self);
}

/// Produces newly accepted [`Transport`]s for a broker's listening port.
pub trait Listener {
    type Transport: Transport;

    /// Non-blocking accept: `None` if nothing is waiting.
    fn accept(&mut self) -> Option<Self::Transport>;
}

#[cfg(feature = "std")]
pub mod std_tcp {
    //! `std::net` backed [`Transport`]/[`Listener`] implementations.

    use super::Transport;
    use crate::mqtt::error::TransportError;
    use std::io::{Read, Write};
    use std::net::{TcpListener as StdTcpListener, TcpStream};

    /// Wraps a connected, non-blocking [`TcpStream`].
    pub struct TcpTransport {
        stream: TcpStream,
        connected: bool,
    }

    impl TcpTransport {
        pub fn new(stream: TcpStream) -> std::io::Result<Self> {
            stream.set_nonblocking(true)?;
            let _ = stream.set_nodelay(true);
            Ok(Self {
                stream,
                connected: true,
            })
        }
    }

    impl Transport for TcpTransport {
        fn available(&mut self) -> usize {
            if !self.connected {
                return 0;
            }
            let mut probe = [0u8; 1];
            match self.stream.peek(&mut probe) {
                Ok(0) => {
                    self.connected = false;
                    0
                }
                Ok(_) => 1,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => 0,
                Err(_) => {
                    self.connected = false;
                    0
                }
            }
        }

        fn read_byte(&mut self) -> u8 {
            let mut byte = [0u8; 1];
            match self.stream.read_exact(&mut byte) {
                Ok(()) => byte[0],
                Err(_) => {
                    self.connected = false;
                    0
                }
            }
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            match self.stream.write_all(bytes) {
                Ok(()) => Ok(()),
                Err(_) => {
                    self.connected = false;
                    Err(TransportError)
                }
            }
        }

        fn connected(&self) -> bool {
            self.connected
        }

        fn stop(&mut self) {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            self.connected = false;
        }
    }

    /// Wraps a non-blocking [`StdTcpListener`].
    pub struct TcpListener {
        listener: StdTcpListener,
    }

    impl TcpListener {
        pub fn bind(addr: impl std::net::ToSocketAddrs) -> std::io::Result<Self> {
            let listener = StdTcpListener::bind(addr)?;
            listener.set_nonblocking(true)?;
            Ok(Self { listener })
        }
    }

    impl super::Listener for TcpListener {
        type Transport = TcpTransport;

        fn accept(&mut self) -> Option<Self::Transport> {
            match self.listener.accept() {
                Ok((stream, _addr)) => TcpTransport::new(stream).ok(),
                Err(_) => None,
            }
        }
    }
}
