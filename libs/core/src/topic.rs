use std::fmt;

/// Packet kinds that have a dedicated topic on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Discover,
    Request,
    Response,
    Info,
    Ping,
    Pong,
    Event,
}

impl Command {
    /// Topic prefix shared by every node, also used as the broadcast topic
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Discover => "MOL.DISCOVER",
            Self::Request => "MOL.REQ",
            Self::Response => "MOL.RES",
            Self::Info => "MOL.INFO",
            Self::Ping => "MOL.PING",
            Self::Pong => "MOL.PONG",
            Self::Event => "MOL.EVENT",
        }
    }

    /// Topic addressed to a single node
    pub fn topic(self, node: &str) -> String {
        format!("{}.{}", self.prefix(), node)
    }

    /// Topic addressed to every node on the mesh
    ///
    /// Only Discover and Ping are broadcast by peers, but the form is
    /// well-defined for every command.
    pub fn broadcast(self) -> String {
        self.prefix().to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Resolve the topic for a command, either for `node` or broadcast
pub fn topic(command: Command, node: &str, broadcast: bool) -> String {
    if broadcast {
        command.broadcast()
    } else {
        command.topic(node)
    }
}
