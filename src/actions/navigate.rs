//! Navigate action: switch the client to one of the app's screens

use super::{Action, ActionContext, ActionDescriptor, ActionResult, ParameterSchema, PropertySpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

pub const NAVIGATE: &str = "navigate_to_screen";

/// Screens of the mobile client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Screen {
    Home,
    Marketplace,
    CropGuide,
    Alerts,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Home,
        Screen::Marketplace,
        Screen::CropGuide,
        Screen::Alerts,
        Screen::Profile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Home => "HOME",
            Screen::Marketplace => "MARKETPLACE",
            Screen::CropGuide => "CROP_GUIDE",
            Screen::Alerts => "ALERTS",
            Screen::Profile => "PROFILE",
        }
    }
}

/// Sends navigation signals to connected clients
#[derive(Clone)]
pub struct Navigator {
    tx: broadcast::Sender<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }
}

impl Navigator {
    pub fn subscribe(&self) -> broadcast::Receiver<Screen> {
        self.tx.subscribe()
    }

    pub fn navigate(&self, screen: Screen) {
        // Nobody listening is not an error: the client may reconnect later
        let _ = self.tx.send(screen);
    }
}

#[derive(Debug, Deserialize)]
pub struct NavigateInput {
    pub screen: Screen,
}

pub struct NavigateAction;

#[async_trait]
impl Action for NavigateAction {
    fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            name: NAVIGATE.to_string(),
            description: "Navigate the user to a specific section/screen of the AgriAssist app.".to_string(),
            parameters: ParameterSchema::new().required(
                "screen",
                PropertySpec::string("The destination screen ID.")
                    .one_of(Screen::ALL.iter().map(|s| s.as_str())),
            ),
        }
    }

    async fn run(&self, arguments: Value, ctx: &ActionContext) -> ActionResult {
        let input: NavigateInput = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(e) => {
                return ActionResult::failure(
                    NAVIGATE,
                    format!("Failed to navigate. Unknown screen: {e}"),
                );
            }
        };

        ctx.navigator.navigate(input.screen);
        ActionResult::success(
            NAVIGATE,
            format!("Navigated to {} successfully.", input.screen.as_str()),
        )
    }
}
