//! Security Event Logging
//!
//! Structured logging for security-relevant events. Handlers and middleware
//! use the [`security_event!`] macro so every auth decision, account change,
//! and lifecycle event carries the same `security_event`/`category`/
//! `severity` fields, regardless of which module emitted it.

use std::fmt;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful user or admin authentication
    AuthenticationSuccess,
    /// Failed authentication attempt
    AuthenticationFailure,

    // Authorization events
    /// Access granted to a protected resource
    AccessGranted,
    /// Access denied to a protected resource
    AccessDenied,

    // User management events
    /// New user registered
    UserRegistered,
    /// User account suspended
    UserSuspended,
    /// User account deleted
    UserDeleted,
    /// Password reset by an administrator
    PasswordReset,

    // System events
    /// Application started
    SystemStartup,
    /// Database connection established
    DatabaseConnected,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",

            Self::AccessGranted | Self::AccessDenied => "authorization",

            Self::UserRegistered
            | Self::UserSuspended
            | Self::UserDeleted
            | Self::PasswordReset => "user_management",

            Self::SystemStartup | Self::DatabaseConnected => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::AuthenticationFailure | Self::AccessDenied => Severity::High,

            Self::AuthenticationSuccess
            | Self::UserRegistered
            | Self::UserSuspended
            | Self::UserDeleted
            | Self::PasswordReset => Severity::Medium,

            Self::AccessGranted | Self::SystemStartup | Self::DatabaseConnected => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::UserRegistered => "user_registered",
            Self::UserSuspended => "user_suspended",
            Self::UserDeleted => "user_deleted",
            Self::PasswordReset => "password_reset",
            Self::SystemStartup => "system_startup",
            Self::DatabaseConnected => "database_connected",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro automatically includes `security_event`, `category`, and
/// `severity` fields and picks the tracing level from the event severity.
///
/// ```ignore
/// security_event!(
///     SecurityEvent::AuthenticationFailure,
///     email = %email,
///     ip_address = %client_ip,
///     "Authentication failed"
/// );
/// ```
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        match event.severity() {
            $crate::events::Severity::High => {
                ::tracing::warn!(
                    security_event = event.name(),
                    category = event.category(),
                    severity = %event.severity(),
                    $($field)*
                );
            }
            _ => {
                ::tracing::info!(
                    security_event = event.name(),
                    category = event.category(),
                    severity = %event.severity(),
                    $($field)*
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        assert_eq!(SecurityEvent::AuthenticationFailure.category(), "authentication");
        assert_eq!(SecurityEvent::AccessDenied.category(), "authorization");
        assert_eq!(SecurityEvent::UserRegistered.category(), "user_management");
        assert_eq!(SecurityEvent::SystemStartup.category(), "system");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_failure_events_are_high_severity() {
        assert_eq!(SecurityEvent::AuthenticationFailure.severity(), Severity::High);
        assert_eq!(SecurityEvent::AccessDenied.severity(), Severity::High);
    }
}
