//! Connection registry.
//!
//! A bounded, dense table of live client connections. Removal swaps the last
//! entry into the vacated slot, so positions are only meaningful within a
//! single reactor iteration; [`ConnectionId`] is the stable key.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

/// Opaque identifier assigned to each accepted connection. Never reused
/// within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered client: its socket plus a fixed-capacity receive buffer.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    id: ConnectionId,
    peer: SocketAddr,
    pub stream: S,
    buffer: Box<[u8]>,
    len: usize,
}

impl<S> Connection<S> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Bytes received but not yet framed.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn buffer_len(&self) -> usize {
        self.len
    }

    /// Copies out and clears everything currently buffered.
    pub fn take_pending(&mut self) -> Vec<u8> {
        let data = self.pending().to_vec();
        self.len = 0;
        data
    }
}

/// A stream that can be read without waiting.
pub trait NonBlockingRead {
    /// Reads into `buf`, failing with `WouldBlock` when nothing is ready.
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl NonBlockingRead for TcpStream {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }
}

impl<S: NonBlockingRead> Connection<S> {
    /// Reads whatever the stream has into the spare part of the buffer.
    pub fn try_fill(&mut self) -> io::Result<usize> {
        let Self {
            stream,
            buffer,
            len,
            ..
        } = self;

        let n = stream.read_nonblocking(&mut buffer[*len..])?;
        *len = (*len + n).min(buffer.len());
        Ok(n)
    }
}

/// Bounded table of active connections.
#[derive(Debug)]
pub struct Registry<S = TcpStream> {
    connections: Vec<Connection<S>>,
    max_clients: usize,
    buffer_capacity: usize,
    next_id: u64,
}

impl<S> Registry<S> {
    pub fn new(max_clients: usize, buffer_capacity: usize) -> Self {
        Self {
            connections: Vec::with_capacity(max_clients),
            max_clients,
            buffer_capacity: buffer_capacity.max(1),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_clients
    }

    /// Registers a new connection, handing the stream back if the table is
    /// full.
    pub fn insert(&mut self, stream: S, peer: SocketAddr) -> Result<ConnectionId, S> {
        if self.is_full() {
            return Err(stream);
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        self.connections.push(Connection {
            id,
            peer,
            stream,
            buffer: vec![0u8; self.buffer_capacity].into_boxed_slice(),
            len: 0,
        });

        Ok(id)
    }

    /// Current position of `id`, if still registered.
    pub fn index_of(&self, id: ConnectionId) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Connection<S>> {
        self.connections.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Connection<S>> {
        self.connections.get_mut(index)
    }

    pub fn find(&self, id: ConnectionId) -> Option<&Connection<S>> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection<S>> {
        self.connections.iter()
    }

    /// Removes the entry at `index` by moving the last entry into its slot.
    pub fn swap_remove(&mut self, index: usize) -> Connection<S> {
        self.connections.swap_remove(index)
    }
}
