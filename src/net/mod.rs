//! Networking collaborators: the UDP info-probe client and the TCP client
//! used to federate with peer masters.

pub mod pinger;
pub mod remote_master;

pub use pinger::{PingError, Pinger, UdpPinger};
pub use remote_master::{RemoteMasterClient, RemoteMasterError};
