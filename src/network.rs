//! Networking abstraction layer for TCP connections
//!
//! This module provides some abstraction from raw TCP sockets to
//! connections allowing to send and receive [`Message`] objects.
//! Furthermore, it includes parallel handling of incoming connections
//! using a thread pool and the abstraction of handlers.
//!
//! A request/response exchange is one connection: the requester sends its
//! message and shuts down the write half, the responder reads up to that
//! mark, answers and closes.
//!
//! [`Message`]: ../message/enum.Message.html

use std::io;
use std::io::prelude::*;
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

use crate::message::Message;

/// A connection between two peers to send Message objects via TCP
pub struct Connection {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl Connection {
    /// Opens a TCP connection to the remote peer at `addr`.
    ///
    /// `timeout` bounds both read and write operations on the new
    /// connection; connection errors surface immediately.
    pub fn open<A: ToSocketAddrs>(addr: A, timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let buffer = Vec::with_capacity(Message::MAX_LENGTH);
        Self { stream, buffer }
    }

    /// Receives a message from the remote peer.
    ///
    /// This blocks until the peer has shut down its write half of the
    /// connection.
    pub fn receive(&mut self) -> io::Result<Message> {
        self.buffer.clear();
        self.stream.read_to_end(&mut self.buffer)?;
        Message::parse(self.buffer.as_slice())
    }

    /// Sends a message to the remote peer.
    pub fn send(&mut self, msg: &Message) -> io::Result<()> {
        self.buffer.clear();
        msg.write_bytes(&mut self.buffer)?;
        self.stream.write_all(self.buffer.as_slice())
    }

    /// Sends a message and waits for the single reply.
    ///
    /// The write half is shut down after sending so the remote `receive`
    /// can complete.
    pub fn request(&mut self, msg: &Message) -> io::Result<Message> {
        self.send(msg)?;
        self.stream.shutdown(Shutdown::Write)?;
        self.receive()
    }

    /// Returns the socket address of the remote peer of this connection.
    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}

/// A trait to handle incoming requests from a [`Server`].
///
/// The methods [`handle_connection`] and [`handle_error`] are called
/// based on the success of the incoming request.
///
/// [`Server`]: struct.Server.html
/// [`handle_connection`]: #tymethod.handle_connection
/// [`handle_error`]: #tymethod.handle_error
pub trait ServerHandler {
    /// A connection has been established with some remote peer.
    fn handle_connection(&self, connection: Connection);

    /// The incoming request was unsuccessful and an error was raised.
    fn handle_error(&self, error: io::Error);

    /// Handles an incoming connection.
    ///
    /// Depending on the `result` this either calls [`handle_error`] or
    /// creates a new [`Connection`] from the given [`TcpStream`] and
    /// calls [`handle_connection`].
    ///
    /// [`handle_error`]: #tymethod.handle_error
    /// [`Connection`]: struct.Connection.html
    /// [`TcpStream`]: ../../std/net/struct.TcpStream.html
    /// [`handle_connection`]: #tymethod.handle_connection
    fn handle_incoming(&self, result: io::Result<TcpStream>) {
        match result {
            Ok(stream) => {
                let connection = Connection::from_stream(stream);
                self.handle_connection(connection)
            }
            Err(error) => self.handle_error(error),
        }
    }
}

/// A multithreaded server waiting for connections
///
/// The accept loop runs until the shared `running` flag is cleared;
/// whoever clears it must open one throwaway connection to the listen
/// address so a blocked `accept` wakes up.
pub struct Server {
    handler: Arc<Box<dyn ServerHandler + Send + Sync>>,
}

impl Server {
    /// Creates a new server for the given handler.
    ///
    /// The [`ServerHandler`] must also implement [`Send`] and [`Sync`] to
    /// ensure it can be shared between threads.
    ///
    /// [`ServerHandler`]: trait.ServerHandler.html
    /// [`Send`]: ../../std/marker/trait.Send.html
    /// [`Sync`]: ../../std/marker/trait.Sync.html
    pub fn new(handler: Box<dyn ServerHandler + Send + Sync>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Listens on the given socket address.
    ///
    /// `num_workers` defines the number of worker threads which handle
    /// incoming requests in parallel. Binding happens before this
    /// returns; accepting runs on the returned thread.
    pub fn listen(
        self,
        addr: &str,
        num_workers: usize,
        running: Arc<AtomicBool>,
    ) -> io::Result<thread::JoinHandle<()>> {
        let listener = TcpListener::bind(addr)?;

        let handle = thread::spawn(move || {
            let pool = ThreadPool::new(num_workers);

            for result in listener.incoming() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let handler = Arc::clone(&self.handler);
                pool.execute(move || {
                    handler.handle_incoming(result);
                });
            }

            pool.join();
        });

        Ok(handle)
    }
}
