//! Reconnect supervisor
//!
//! Pure state machine deciding what a broker link does next. It owns the
//! retry counter and the shutdown flag; [`super::BrokerLink`] only executes
//! the returned actions.
//!
//! ```text
//!            Start / RetryElapsed / HealthTick / ManualReconnect
//! Disconnected ──────────────────────────────────────────────▶ Connecting
//!      ▲                                                          │
//!      │ failure, attempts < max (ScheduleRetry)                  │ ConnectSucceeded
//!      │                                                          ▼
//!      └──────────────────── ConnectionLost ◀──────────────── Connected
//!
//! failure, attempts == max ──▶ Exhausted (only ManualReconnect leaves)
//! Shutdown (any state)      ──▶ ShutDown (terminal)
//! ```

use std::time::Duration;

use crate::config::LinkPolicy;

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Automatic attempts used up; printing disabled until a manual reconnect
    Exhausted,
    ShutDown,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Exhausted => "exhausted",
            LinkState::ShutDown => "shut_down",
        }
    }
}

/// What went wrong with a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Socket error, refused connection, heart-beat loss
    Transport,
    /// Broker ERROR frame
    Protocol,
    /// Peer closed the socket
    Closed,
}

/// Input to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Start,
    ConnectSucceeded,
    ConnectFailed(FailureKind),
    ConnectionLost(FailureKind),
    RetryElapsed,
    HealthTick,
    ManualReconnect,
    Shutdown,
}

/// Decision for the runtime to carry out, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Open a session
    Activate,
    /// (Re)subscribe the fresh session
    Subscribe,
    /// Arm the retry timer
    ScheduleRetry { attempt: u32, delay: Duration },
    /// Disarm the retry timer
    CancelRetry,
    /// Tell the user printing is disabled
    NotifyDisabled,
    /// Close the session
    Deactivate,
}

/// Reconnection state machine
#[derive(Debug, Clone)]
pub struct Supervisor {
    policy: LinkPolicy,
    state: LinkState,
    attempts: u32,
    retry_pending: bool,
    shutting_down: bool,
}

impl Supervisor {
    pub fn new(policy: LinkPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Disconnected,
            attempts: 0,
            retry_pending: false,
            shutting_down: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Consecutive automatic attempts since the last success or manual reconnect
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Apply one event
    pub fn handle(&mut self, event: LinkEvent) -> Vec<LinkAction> {
        if self.shutting_down {
            return Vec::new();
        }

        match event {
            LinkEvent::Start => match self.state {
                LinkState::Disconnected => self.activate(),
                _ => Vec::new(),
            },

            LinkEvent::ConnectSucceeded => {
                self.state = LinkState::Connected;
                self.attempts = 0;
                let mut actions = Vec::new();
                if self.retry_pending {
                    self.retry_pending = false;
                    actions.push(LinkAction::CancelRetry);
                }
                actions.push(LinkAction::Subscribe);
                actions
            }

            LinkEvent::ConnectFailed(_) | LinkEvent::ConnectionLost(_) => self.on_failure(),

            LinkEvent::RetryElapsed => {
                self.retry_pending = false;
                match self.state {
                    LinkState::Disconnected => self.activate(),
                    _ => Vec::new(),
                }
            }

            LinkEvent::HealthTick => {
                if self.state == LinkState::Disconnected
                    && self.attempts < self.policy.max_reconnect_attempts
                {
                    self.activate()
                } else {
                    Vec::new()
                }
            }

            LinkEvent::ManualReconnect => {
                self.attempts = 0;
                let mut actions = Vec::new();
                if self.retry_pending {
                    self.retry_pending = false;
                    actions.push(LinkAction::CancelRetry);
                }
                if matches!(
                    self.state,
                    LinkState::Disconnected | LinkState::Exhausted
                ) {
                    actions.extend(self.activate());
                }
                actions
            }

            LinkEvent::Shutdown => {
                self.shutting_down = true;
                self.state = LinkState::ShutDown;
                let mut actions = Vec::new();
                if self.retry_pending {
                    self.retry_pending = false;
                    actions.push(LinkAction::CancelRetry);
                }
                actions.push(LinkAction::Deactivate);
                actions
            }
        }
    }

    fn activate(&mut self) -> Vec<LinkAction> {
        self.state = LinkState::Connecting;
        vec![LinkAction::Activate]
    }

    fn on_failure(&mut self) -> Vec<LinkAction> {
        if self.state == LinkState::Exhausted {
            return Vec::new();
        }
        self.state = LinkState::Disconnected;

        // A retry is already armed for an earlier failure
        if self.retry_pending {
            return Vec::new();
        }

        if self.attempts < self.policy.max_reconnect_attempts {
            self.attempts += 1;
            self.retry_pending = true;
            vec![LinkAction::ScheduleRetry {
                attempt: self.attempts,
                delay: self.policy.reconnect_delay,
            }]
        } else {
            self.state = LinkState::Exhausted;
            vec![LinkAction::NotifyDisabled]
        }
    }
}
