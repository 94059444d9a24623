//! Control-surface seam: the calls the core makes on the surface, the events
//! it receives from it, and a JSON-lines wire adapter.

use crate::{ActionSettings, ContextId, VisualState};
use log::{error, trace};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;

/// What the core needs from the button surface
pub trait ControlSurface: Send + Sync {
    fn set_visual_state(&self, context: &ContextId, state: VisualState);

    /// Brief success indication on the button
    fn acknowledge(&self, context: &ContextId);

    /// Brief failure indication on the button
    fn alert(&self, context: &ContextId);

    /// Ask for the button's saved settings. The answer arrives later as a
    /// [`SurfaceEvent::DidReceiveSettings`].
    fn get_persisted_settings(&self, context: &ContextId);

    fn set_persisted_settings(&self, context: &ContextId, settings: &ActionSettings);
}

/// Payload shared by the button events
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    pub settings: Option<ActionSettings>,
    pub state: Option<u32>,
}

/// Events delivered by the surface
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SurfaceEvent {
    KeyDown {
        context: ContextId,
        #[serde(default)]
        payload: EventPayload,
    },
    WillAppear {
        context: ContextId,
        #[serde(default)]
        payload: EventPayload,
    },
    WillDisappear {
        context: ContextId,
        #[serde(default)]
        payload: EventPayload,
    },
    DidReceiveSettings {
        context: ContextId,
        #[serde(default)]
        payload: EventPayload,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    pub state: u32,
}

/// Commands sent back to the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SurfaceCommand {
    SetState {
        context: ContextId,
        payload: StatePayload,
    },
    ShowOk {
        context: ContextId,
    },
    ShowAlert {
        context: ContextId,
    },
    GetSettings {
        context: ContextId,
    },
    SetSettings {
        context: ContextId,
        payload: ActionSettings,
    },
}

/// [`ControlSurface`] that writes one JSON command per line
pub struct JsonLinesSurface<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn send(&self, command: SurfaceCommand) {
        let line = match serde_json::to_string(&command) {
            Ok(line) => line,
            Err(e) => {
                error!("failed to encode surface command {:?}: {}", command, e);
                return;
            }
        };
        trace!("-> {}", line);

        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            error!("failed to write surface command: {}", e);
        }
    }
}

impl<W: Write + Send> ControlSurface for JsonLinesSurface<W> {
    fn set_visual_state(&self, context: &ContextId, state: VisualState) {
        self.send(SurfaceCommand::SetState {
            context: context.clone(),
            payload: StatePayload {
                state: state.as_raw(),
            },
        });
    }

    fn acknowledge(&self, context: &ContextId) {
        self.send(SurfaceCommand::ShowOk {
            context: context.clone(),
        });
    }

    fn alert(&self, context: &ContextId) {
        self.send(SurfaceCommand::ShowAlert {
            context: context.clone(),
        });
    }

    fn get_persisted_settings(&self, context: &ContextId) {
        self.send(SurfaceCommand::GetSettings {
            context: context.clone(),
        });
    }

    fn set_persisted_settings(&self, context: &ContextId, settings: &ActionSettings) {
        self.send(SurfaceCommand::SetSettings {
            context: context.clone(),
            payload: settings.clone(),
        });
    }
}
