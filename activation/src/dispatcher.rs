use crate::ActivationEvent;
use crate::ActivationSource;
use crate::Notifier;
use crate::Presentation;
use crate::payload::is_launch_marker;
use std::collections::HashMap;
use std::fmt;

/// What the process should do after a dispatch.
///
/// `Exit` is only produced by a background action that finishes with zero
/// open UI surfaces; the caller is expected to terminate with code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Exit,
}

/// A known action whose required argument or user input was missing or
/// unparseable. Always recovered locally by downgrading to the default
/// transition, never surfaced to the user.
#[derive(Debug)]
enum MalformedActivation {
    MissingArgument(&'static str),
    BadArgument(&'static str, String),
    MissingUserInput(&'static str),
}

impl fmt::Display for MalformedActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedActivation::MissingArgument(key) => {
                write!(f, "missing argument {:?}", key)
            }
            MalformedActivation::BadArgument(key, value) => {
                write!(f, "argument {:?} has unparseable value {:?}", key, value)
            }
            MalformedActivation::MissingUserInput(key) => {
                write!(f, "missing user input {:?}", key)
            }
        }
    }
}

/// Routes activation payloads from every origin (launch arguments,
/// channel-forwarded second launches, external-trigger callbacks) to the
/// presentation and notifier collaborators.
///
/// Must be driven from a single logical lane: `dispatch` mutates shared
/// surface-count state and is never safe to run concurrently with itself.
pub struct ActivationDispatcher<P, N> {
    presentation: P,
    notifier: N,
}

impl<P: Presentation, N: Notifier> ActivationDispatcher<P, N> {
    pub fn new(presentation: P, notifier: N) -> Self {
        ActivationDispatcher {
            presentation,
            notifier,
        }
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Dispatches a payload that carries no user input (second launches,
    /// protocol invocations).
    pub fn dispatch(&mut self, raw_payload: &str, source: ActivationSource) -> DispatchOutcome {
        self.dispatch_with_input(raw_payload, HashMap::new(), source)
    }

    /// Single entry point: parses the raw payload into an
    /// [`ActivationEvent`] and routes it. Never fails; malformed
    /// activations degrade to the default open-the-app transition.
    pub fn dispatch_with_input(
        &mut self,
        raw_payload: &str,
        user_input: HashMap<String, String>,
        source: ActivationSource,
    ) -> DispatchOutcome {
        if is_launch_marker(raw_payload) {
            // The entry-point callback delivers this activation; acting on
            // the launch argument as well would dispatch it twice.
            log::trace!("Launch marker payload, deferring to entry-point delivery");
            return DispatchOutcome::Continue;
        }

        let event = ActivationEvent::parse(raw_payload, user_input, source);
        log::trace!("Dispatching activation: {:?}", event);

        match self.route(&event) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!(
                    "Malformed activation for action {:?} ({}), opening default view",
                    event.action,
                    err
                );
                self.open_default();
                DispatchOutcome::Continue
            }
        }
    }

    fn route(&mut self, event: &ActivationEvent) -> Result<DispatchOutcome, MalformedActivation> {
        match event.action.as_str() {
            // Foreground: show the image referenced by the payload.
            "viewImage" => {
                let image_url = event
                    .arguments
                    .get("imageUrl")
                    .ok_or(MalformedActivation::MissingArgument("imageUrl"))?;
                self.open_default();
                self.presentation.show_image(image_url);
                Ok(DispatchOutcome::Continue)
            }

            // Foreground: open the conversation.
            "viewConversation" => {
                let raw_id = event
                    .arguments
                    .get("conversationId")
                    .ok_or(MalformedActivation::MissingArgument("conversationId"))?;
                let conversation_id: i64 = raw_id.parse().map_err(|_| {
                    MalformedActivation::BadArgument("conversationId", raw_id.to_string())
                })?;
                self.open_default();
                self.presentation.show_conversation(conversation_id);
                Ok(DispatchOutcome::Continue)
            }

            // Background: quick reply typed on the originating surface.
            "reply" => {
                let message = event
                    .user_input
                    .get("tbReply")
                    .ok_or(MalformedActivation::MissingUserInput("tbReply"))?;
                self.notifier.notify(&format!("Sending message: {}", message));
                Ok(self.after_background_action())
            }

            // Background: send a like.
            "like" => {
                self.notifier.notify("Sending like");
                Ok(self.after_background_action())
            }

            // Default activation, and any action this build does not know:
            // future actions degrade to "just show the app".
            _ => {
                self.open_default();
                Ok(DispatchOutcome::Continue)
            }
        }
    }

    fn open_default(&mut self) {
        self.presentation.ensure_surface();
        self.presentation.foreground_surface();
    }

    /// Background actions never create a surface; with none open there is
    /// nothing left for the process to do.
    fn after_background_action(&mut self) -> DispatchOutcome {
        if self.presentation.open_surfaces() == 0 {
            log::trace!("No open surfaces after background action, requesting exit");
            DispatchOutcome::Exit
        } else {
            DispatchOutcome::Continue
        }
    }
}
