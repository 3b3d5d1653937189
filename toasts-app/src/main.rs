use activation::ActivationDispatcher;
use activation::ActivationSource;
use activation::DispatchOutcome;
use activation::NOTIFICATION_LAUNCH_ARG;
use activation::is_launch_marker;
use activation_channel::ChannelServer;
use activation_channel::send_to_owner;
use activation_registry::ActivationRegistry;
use activation_registry::DBusBackend;
use activation_registry::DeliveredActivation;
use clap::Parser;
use instance_guard::InstanceGuard;
use std::sync::Arc;
use std::time::Duration;
mod console_window;
mod notifier;
use crate::console_window::ConsoleWindow;
use crate::notifier::ToastNotifier;

#[derive(Parser)]
#[command(name = "toasts-app")]
#[command(about = "Single-instance desktop activation demo", long_about = None)]
struct Cli {
    /// Application identity registered with the external trigger system
    #[arg(long, default_value = "org.desktoptoasts.DemoApp")]
    app_id: String,

    /// Display name registered alongside the identity
    #[arg(long, default_value = "Desktop toasts app")]
    display_name: String,

    /// Icon path registered alongside the identity
    #[arg(long, default_value = "/usr/share/icons/hicolor/48x48/apps/toasts.png")]
    icon: String,

    /// Seconds a second launch waits for the owning instance before
    /// giving up
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// When no owner is reachable within the timeout, become the owner
    /// instead of failing the launch
    #[arg(long)]
    become_owner_on_timeout: bool,

    /// Raw activation payload fragments, e.g.
    /// "action=viewConversation&conversationId=5"
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    payload: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum AppMessage {
    /// Payload forwarded over the activation channel by a second launch
    Forwarded(String),
    /// Activation delivered through the registered entry point
    External(DeliveredActivation),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        "toasts_app=trace,activation=trace,activation_channel=trace,activation_registry=trace,\
         instance_guard=trace",
    ))
    .init();

    #[cfg(not(debug_assertions))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        "toasts_app=warn,activation=warn,activation_channel=warn,activation_registry=warn,\
         instance_guard=warn",
    ))
    .init();

    let cli = Cli::parse();
    let connect_timeout = Duration::from_secs(cli.connect_timeout);

    // A launch the external trigger system started carries the marker;
    // its activation arrives through the entry point instead.
    let raw_payload = if cli.payload.iter().any(|arg| is_launch_marker(arg)) {
        NOTIFICATION_LAUNCH_ARG.to_string()
    } else {
        cli.payload.join("&")
    };

    // Ensure only a single instance is running for this identity
    let guard = match InstanceGuard::try_acquire(&cli.app_id).await? {
        Some(guard) => guard,
        None => {
            match send_to_owner(&cli.app_id, &raw_payload, connect_timeout).await {
                Ok(()) => {
                    log::info!("Forwarded activation to the owning instance");
                    return Ok(());
                }
                Err(err) if cli.become_owner_on_timeout => {
                    // Race recovery: the owner died between the ownership
                    // check and the connect
                    log::warn!("No reachable owner ({}), taking ownership", err);
                    match InstanceGuard::try_acquire(&cli.app_id).await? {
                        Some(guard) => guard,
                        None => {
                            return Err(
                                "another instance owns the identity but is not reachable".into()
                            );
                        }
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    log::trace!("Holding instance ownership as {}", guard.bus_name());

    let (appmsg_sender, mut appmsgs) = tokio::sync::mpsc::unbounded_channel::<AppMessage>();

    // Second launches forward their payloads onto the dispatch lane
    let server = ChannelServer::bind(&cli.app_id)?;
    let forwarded_sender = appmsg_sender.clone();
    tokio::spawn(server.run(move |payload| {
        let _ = forwarded_sender.send(AppMessage::Forwarded(payload));
    }));

    // External trigger activations land on the same lane
    let mut registry = ActivationRegistry::new(DBusBackend::new());
    registry
        .register_identity(&cli.app_id, &cli.display_name, &cli.icon)
        .await?;
    let external_sender = appmsg_sender.clone();
    registry
        .register_entry_point(Arc::new(move |delivered| {
            let _ = external_sender.send(AppMessage::External(delivered));
        }))
        .await?;

    let mut dispatcher =
        ActivationDispatcher::new(ConsoleWindow::new(), ToastNotifier::new(registry));

    // The launch itself is the first activation
    if dispatcher.dispatch(&raw_payload, ActivationSource::Foreground) == DispatchOutcome::Exit {
        return Ok(());
    }

    // Single dispatch lane: payloads from every origin are processed one
    // at a time, never concurrently
    while let Some(msg) = appmsgs.recv().await {
        let outcome = match msg {
            AppMessage::Forwarded(payload) => {
                dispatcher.dispatch(&payload, ActivationSource::ForwardedPipe)
            }
            AppMessage::External(delivered) => dispatcher.dispatch_with_input(
                &delivered.payload,
                delivered.user_input,
                ActivationSource::Background,
            ),
        };
        if outcome == DispatchOutcome::Exit {
            break;
        }
    }

    Ok(())
}
