//! Scripted stand-in for the provider's hosted login page.
//!
//! The page answers every `initAuth` by posting `{ "user": <identity> }`
//! back into the host window, where the identity comes from a JSON file.
//! Without a file the page stays silent, like a user who never finishes
//! signing in.

use auth_relay::{AuthRelayError, AuthRelayResult, ProviderFrameFactory};
use relay_channel::{ChannelResult, FrameWindow, ProviderFrame};
use relay_protocol_types::ProviderCommand;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Delay before the page answers, standing in for the user's interaction.
const ANSWER_DELAY: Duration = Duration::from_millis(50);

pub struct ScriptedProviderFrames {
    origin: String,
    identity_file: Option<PathBuf>,
}

impl ScriptedProviderFrames {
    pub fn new(origin: String, identity_file: Option<PathBuf>) -> Self {
        Self {
            origin,
            identity_file,
        }
    }

    fn load_identity(&self) -> AuthRelayResult<Option<Value>> {
        let Some(path) = &self.identity_file else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AuthRelayError::HostCreationFailed(format!(
                "Failed to read identity file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

impl ProviderFrameFactory for ScriptedProviderFrames {
    fn embed(&self, window: &FrameWindow, src: &str) -> AuthRelayResult<Arc<dyn ProviderFrame>> {
        let identity = self.load_identity()?;
        info!(src = %src, scripted = identity.is_some(), "Embedded provider page");
        Ok(Arc::new(ScriptedProviderFrame {
            origin: self.origin.clone(),
            window: window.clone(),
            identity,
        }))
    }
}

struct ScriptedProviderFrame {
    origin: String,
    window: FrameWindow,
    identity: Option<Value>,
}

impl ProviderFrame for ScriptedProviderFrame {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn deliver(&self, command: &ProviderCommand) -> ChannelResult<()> {
        if !command.init_auth {
            return Ok(());
        }
        let Some(identity) = self.identity.clone() else {
            debug!("Provider page has no identity to post");
            return Ok(());
        };

        let window = self.window.clone();
        let payload = json!({ "user": identity }).to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ANSWER_DELAY).await;
            let listeners = window.dispatch_message(&payload);
            debug!(listeners, "Provider page posted identity");
        });
        Ok(())
    }
}
