//! Wire messages exchanged with the browser-extension clients, and the
//! broadcast commands the control panel issues.
//!
//! Every frame is a JSON text message tagged by a `type` field.
//!
//! # Inbound (client → relay)
//!
//! ```json
//! {"type":"register","productId":"123456","imageUrl":"https://…/p.jpg"}
//! ```
//!
//! # Outbound (relay → client)
//!
//! ```json
//! {"type":"stop"}
//! {"type":"start","globalParams":{…},"specificParams":{…,"randomDelay":120}}
//! {"type":"apply_settings","globalParams":{…},"specificParams":{…}}
//! ```

use crate::params::{ClientParams, GlobalParams};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce the product this connection is tracking.
    ///
    /// `productId` is optional on the wire so a missing id can be rejected
    /// by the registry (and logged) instead of failing the parse.
    Register {
        #[serde(rename = "productId", default)]
        product_id: Option<String>,
        #[serde(rename = "imageUrl", default)]
        image_url: Option<String>,
    },
}

/// The `specificParams` object of `start` and `apply_settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificParams {
    pub min_values: Vec<f64>,
    pub sku_prices: Vec<f64>,
    pub auto_decrement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_delay: Option<u64>,
}

/// A frame sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Start {
        #[serde(rename = "globalParams")]
        global_params: GlobalParams,
        #[serde(
            rename = "specificParams",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        specific_params: Option<SpecificParams>,
    },
    Stop,
    ApplySettings {
        #[serde(rename = "globalParams")]
        global_params: GlobalParams,
        #[serde(
            rename = "specificParams",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        specific_params: Option<SpecificParams>,
    },
}

/// The three broadcast actions, without their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Stop,
    ApplySettings,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Start => write!(f, "start"),
            CommandKind::Stop => write!(f, "stop"),
            CommandKind::ApplySettings => write!(f, "apply_settings"),
        }
    }
}

/// A broadcast requested by the operator.
///
/// `clients` maps a registered identifier to that client's parameters.
/// Identifiers missing from the map still receive the message, with
/// `specificParams` omitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start {
        global: GlobalParams,
        clients: HashMap<String, ClientParams>,
    },
    Stop,
    ApplySettings {
        global: GlobalParams,
        clients: HashMap<String, ClientParams>,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Start { .. } => CommandKind::Start,
            Command::Stop => CommandKind::Stop,
            Command::ApplySettings { .. } => CommandKind::ApplySettings,
        }
    }

    /// Build the message addressed to the client registered as `identifier`.
    pub fn message_for(&self, identifier: &str) -> ServerMessage {
        match self {
            Command::Stop => ServerMessage::Stop,
            Command::Start { global, clients } => ServerMessage::Start {
                global_params: global.clone(),
                specific_params: clients.get(identifier).map(|p| SpecificParams {
                    min_values: p.min_values.clone(),
                    sku_prices: p.sku_prices.clone(),
                    auto_decrement: p.auto_decrement,
                    random_delay: Some(p.random_delay.unwrap_or(0)),
                }),
            },
            Command::ApplySettings { global, clients } => ServerMessage::ApplySettings {
                global_params: global.clone(),
                specific_params: clients.get(identifier).map(|p| SpecificParams {
                    min_values: p.min_values.clone(),
                    sku_prices: p.sku_prices.clone(),
                    auto_decrement: p.auto_decrement,
                    random_delay: None,
                }),
            },
        }
    }
}
