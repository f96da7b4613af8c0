use crate::format::{EventFormatter, HumanFormatter};
use herald::{Collect, Event, Result};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, UdpSocket};
use std::sync::Arc;

#[derive(Clone, Copy)]
enum Network {
  Tcp,
  Udp,
}

impl Network {
  fn as_str(self) -> &'static str {
    match self {
      Network::Tcp => "tcp",
      Network::Udp => "udp",
    }
  }
}

enum Connection {
  Tcp(TcpStream),
  Udp(UdpSocket),
}

impl Connection {
  fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
    match self {
      Connection::Tcp(stream) => stream.write_all(bytes),
      Connection::Udp(socket) => socket.send(bytes).map(|_| ()),
    }
  }
}

/// Writes formatted events to a TCP or UDP peer.
///
/// The connection is established lazily on the first delivery.  A failed
/// write drops the connection and returns the error, so the retry machinery
/// reconnects on the next attempt.  Framing is the formatter's concern; the
/// default human-readable formatter emits one line per event.
pub struct SocketCollector {
  network: Network,
  address: String,
  formatter: Box<dyn EventFormatter>,
  conn: Mutex<Option<Connection>>,
}

impl SocketCollector {
  pub fn tcp(address: impl Into<String>) -> SocketCollector {
    SocketCollector::build(Network::Tcp, address.into())
  }

  pub fn udp(address: impl Into<String>) -> SocketCollector {
    SocketCollector::build(Network::Udp, address.into())
  }

  fn build(network: Network, address: String) -> SocketCollector {
    SocketCollector {
      network,
      address,
      formatter: Box::new(HumanFormatter::new()),
      conn: Mutex::new(None),
    }
  }

  pub fn formatter(mut self, formatter: impl EventFormatter) -> SocketCollector {
    self.formatter = Box::new(formatter);
    self
  }

  fn connect(&self) -> Result<Connection> {
    match self.network {
      Network::Tcp => Ok(Connection::Tcp(TcpStream::connect(self.address.as_str())?)),
      Network::Udp => {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(self.address.as_str())?;
        Ok(Connection::Udp(socket))
      }
    }
  }
}

impl fmt::Display for SocketCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Socket(network={}, address={})",
      self.network.as_str(),
      self.address
    )
  }
}

impl Collect for SocketCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    let bytes = self.formatter.format_event(event)?;
    let mut slot = self.conn.lock();
    let mut conn = match slot.take() {
      Some(conn) => conn,
      None => self.connect()?,
    };
    match conn.write(&bytes) {
      Ok(()) => {
        *slot = Some(conn);
        Ok(())
      }
      Err(err) => Err(err.into()),
    }
  }

  fn close(&self) -> Result<()> {
    if let Some(Connection::Tcp(stream)) = self.conn.lock().take() {
      stream.shutdown(Shutdown::Both)?;
    }
    Ok(())
  }
}
