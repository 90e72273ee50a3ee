//! Runtime readiness notifications.

/// A network-facing process inside the runtime became reachable.
///
/// Emitted by the runtime zero or more times per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReady {
    /// Port the process listens on inside the sandbox.
    pub port: u16,
    /// Address the preview surface should load.
    pub url: String,
}

impl ServerReady {
    pub fn new(port: u16, url: impl Into<String>) -> Self {
        Self {
            port,
            url: url.into(),
        }
    }

    /// Readiness for a server on `localhost`.
    pub fn localhost(port: u16) -> Self {
        Self::new(port, format!("http://localhost:{port}"))
    }
}

impl std::fmt::Display for ServerReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (port {})", self.url, self.port)
    }
}
