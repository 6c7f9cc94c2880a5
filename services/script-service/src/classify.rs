//! Header-based client classification.
//!
//! This is access gating by convention, not authorization: any caller can
//! set a `User-Agent` that passes. Nothing here verifies who the client is.

const EXECUTOR_PATTERNS: &[&str] = &[
    "synapse",
    "krnl",
    "script-ware",
    "sentinel",
    "oxygen",
    "fluxus",
    "electron",
    "jjsploit",
    "exploit",
    "injector",
    "executor",
];

const BROWSER_PATTERNS: &[&str] = &[
    "chrome", "firefox", "safari", "edge", "opera", "mozilla", "webkit", "gecko", "version",
];

const SHORT_AGENT_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    Executor,
    Browser,
    Unrecognized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: ClientKind,
    pub allowed: bool,
}

pub fn classify(user_agent: &str, referer: &str) -> Classification {
    let agent = user_agent.to_lowercase();

    if EXECUTOR_PATTERNS.iter().any(|pattern| agent.contains(pattern)) {
        return Classification {
            kind: ClientKind::Executor,
            allowed: true,
        };
    }

    if BROWSER_PATTERNS.iter().any(|pattern| agent.contains(pattern)) {
        return Classification {
            kind: ClientKind::Browser,
            allowed: false,
        };
    }

    // Executors rarely send a referer and tend to use terse agents.
    let allowed = referer.is_empty() || user_agent.chars().count() < SHORT_AGENT_LIMIT;
    Classification {
        kind: ClientKind::Unrecognized,
        allowed,
    }
}

#[cfg(test)]
pub fn is_executor_request(user_agent: &str, referer: &str) -> bool {
    classify(user_agent, referer).allowed
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Executor => "executor",
            ClientKind::Browser => "browser",
            ClientKind::Unrecognized => "unrecognized",
        }
    }
}
