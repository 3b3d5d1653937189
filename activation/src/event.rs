use crate::Arguments;
use crate::payload::parse_arguments;
use std::collections::HashMap;

/// How an activation reached the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    /// Normal launch with arguments on the command line.
    Foreground,
    /// Delivered by the external trigger system through the registered
    /// entry point (e.g. a notification interaction).
    Background,
    /// Protocol/URI invocation.
    Protocol,
    /// Forwarded over the activation channel by a second launch.
    ForwardedPipe,
}

/// Canonical, immutable representation of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEvent {
    /// Free-form action tag, `""` for the default activation.
    pub action: String,
    pub arguments: Arguments,
    /// Values the user typed or selected on the originating surface,
    /// present only for activations that included input widgets.
    pub user_input: HashMap<String, String>,
    pub source: ActivationSource,
}

impl ActivationEvent {
    /// Builds an event from a raw payload. Unparseable payloads yield an
    /// event with an empty action, never an error.
    pub fn parse(
        raw_payload: &str,
        user_input: HashMap<String, String>,
        source: ActivationSource,
    ) -> Self {
        let arguments = parse_arguments(raw_payload);
        let action = arguments.get("action").unwrap_or("").to_string();
        ActivationEvent {
            action,
            arguments,
            user_input,
            source,
        }
    }
}
