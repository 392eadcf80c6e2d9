use std::fmt;

/// Properties of the Authorization Code grant checked against a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Every non-empty subset of the client's scopes is granted when approved.
    ScopeSubsets,
    /// The access token carries the scopes requested for the code.
    TokenScopes,
    /// A code can be exchanged once; the second attempt is `invalid_grant`.
    CodeSingleUse,
    /// Denying consent yields `access_denied`.
    ConsentDenied,
    /// An unknown scope yields `invalid_scope`.
    InvalidScope,
    /// A redirect URI differing only by port is refused with 400.
    RedirectPortMismatch,
    /// A redirect URI on an unregistered host is refused with 400.
    RedirectHostMismatch,
    /// Wrong credentials never produce a code.
    WrongCredentials,
}

impl Check {
    pub const ALL: [Check; 8] = [
        Check::ScopeSubsets,
        Check::TokenScopes,
        Check::CodeSingleUse,
        Check::ConsentDenied,
        Check::InvalidScope,
        Check::RedirectPortMismatch,
        Check::RedirectHostMismatch,
        Check::WrongCredentials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScopeSubsets => "scope_subsets",
            Self::TokenScopes => "token_scopes",
            Self::CodeSingleUse => "code_single_use",
            Self::ConsentDenied => "consent_denied",
            Self::InvalidScope => "invalid_scope",
            Self::RedirectPortMismatch => "redirect_port_mismatch",
            Self::RedirectHostMismatch => "redirect_host_mismatch",
            Self::WrongCredentials => "wrong_credentials",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub check: Check,
    pub passed: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn outcome(&self, check: Check) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            let verdict = if outcome.passed { "PASS" } else { "FAIL" };
            match &outcome.detail {
                Some(detail) => writeln!(f, "{verdict} {}: {detail}", outcome.check.as_str())?,
                None => writeln!(f, "{verdict} {}", outcome.check.as_str())?,
            }
        }
        let failed = self.failures().count();
        write!(
            f,
            "{} checks, {} passed, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        )
    }
}
