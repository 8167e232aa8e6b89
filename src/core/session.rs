//! Outbound connection pool shared by the collector and enricher for one cycle.
//!
//! [`ResourceSession::acquire`] is idempotent while the session is open.
//! [`ResourceSession::scoped`] hands out a [`SessionGuard`] that releases the
//! pool when dropped, so every exit path of a cycle (normal return, early
//! return on cancellation, panic, or the future being dropped) closes it.

use std::time::{Duration, Instant};

use reqwest::Client;

use crate::utils::error::{LeadError, Result};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("lead-automation/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

/// Handle to an open pooled client. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    opened_at: Instant,
}

impl HttpSession {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

#[derive(Debug)]
pub struct ResourceSession {
    config: SessionConfig,
    handle: Option<HttpSession>,
    times_opened: u64,
}

impl ResourceSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            handle: None,
            times_opened: 0,
        }
    }

    fn open(&self) -> Result<HttpSession> {
        let mut builder = Client::builder()
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connect_timeout)
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .user_agent(self.config.user_agent.as_str());

        if let Some(proxy) = &self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                LeadError::SessionUnavailable {
                    message: format!("invalid proxy {}: {}", proxy, e),
                }
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| LeadError::SessionUnavailable {
            message: e.to_string(),
        })?;

        Ok(HttpSession {
            client,
            opened_at: Instant::now(),
        })
    }

    /// Returns the open session, opening one first if needed.
    pub fn acquire(&mut self) -> Result<&HttpSession> {
        if self.handle.is_none() {
            let handle = self.open()?;
            self.times_opened += 1;
            tracing::debug!(times_opened = self.times_opened, "outbound session opened");
            self.handle = Some(handle);
        }

        self.handle
            .as_ref()
            .ok_or_else(|| LeadError::SessionUnavailable {
                message: "session vanished after open".to_string(),
            })
    }

    /// Closes the pool and clears the reference. Returns whether anything was open.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                tracing::debug!(age = ?handle.age(), "outbound session released");
                true
            }
            None => false,
        }
    }

    /// Acquires the session for the lifetime of the returned guard.
    pub fn scoped(&mut self) -> Result<SessionGuard<'_>> {
        self.acquire()?;
        Ok(SessionGuard { session: self })
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn times_opened(&self) -> u64 {
        self.times_opened
    }
}

/// Releases the session on drop.
pub struct SessionGuard<'a> {
    session: &'a mut ResourceSession,
}

impl SessionGuard<'_> {
    pub fn handle(&mut self) -> Result<&HttpSession> {
        self.session.acquire()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.release();
    }
}
