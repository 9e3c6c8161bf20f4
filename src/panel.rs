//! Toolkit-independent model of the control panel.
//!
//! [`PanelState`] owns the product cards and the status line.  The GTK
//! front-end mirrors card text into it right before a broadcast and renders
//! whatever [`CardChange`] each [`PanelEvent`] produces, so everything here
//! can be exercised without a display.

use crate::config::PanelConfig;
use crate::params::{self, ClientParams, GlobalFields, ParamError};
use crate::protocol::{Command, CommandKind};
use crate::traits::PanelEvent;
use chrono::NaiveTime;
use log::{info, warn};
use rand::Rng;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Per-client inputs shown on one product card.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub identifier: String,
    pub image_url: Option<String>,
    /// One minimum value per line.
    pub min_values_text: String,
    /// One SKU price per line.
    pub sku_prices_text: String,
    pub auto_decrement: bool,
}

impl ProductCard {
    pub fn new(identifier: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            image_url,
            min_values_text: "0.0".into(),
            sku_prices_text: "0.0".into(),
            auto_decrement: true,
        }
    }

    /// Parse the card's inputs.  Invalid lines are dropped with a warning.
    pub fn params(&self) -> ClientParams {
        ClientParams {
            min_values: params::parse_number_lines(
                &self.min_values_text,
                "min value",
                &self.identifier,
            ),
            sku_prices: params::parse_number_lines(
                &self.sku_prices_text,
                "SKU price",
                &self.identifier,
            ),
            auto_decrement: self.auto_decrement,
            random_delay: None,
        }
    }
}

/// What the GUI has to change after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardChange {
    /// A card was appended at `index`.
    Added { index: usize },
    /// The card for `identifier` was removed; cards after it shifted left.
    Removed { identifier: String },
}

/// Control panel model: product cards, listener address and status text.
#[derive(Debug)]
pub struct PanelState {
    cards: Vec<ProductCard>,
    columns: usize,
    max_random_delay_ms: u64,
    listen_addr: Option<SocketAddr>,
    clients: usize,
    status: String,
}

impl PanelState {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            cards: Vec::new(),
            columns: config.card_columns.max(1),
            max_random_delay_ms: config.max_random_delay_ms,
            listen_addr: None,
            clients: 0,
            status: "Starting…".into(),
        }
    }

    pub fn cards(&self) -> &[ProductCard] {
        &self.cards
    }

    pub fn card(&self, identifier: &str) -> Option<&ProductCard> {
        self.cards.iter().find(|c| c.identifier == identifier)
    }

    pub fn card_mut(&mut self, identifier: &str) -> Option<&mut ProductCard> {
        self.cards.iter_mut().find(|c| c.identifier == identifier)
    }

    /// Grid cell `(col, row)` of the card at `index`.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.columns, index / self.columns)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        info!("status: {}", self.status);
    }

    /// Fold one relay notification into the model.
    pub fn apply(&mut self, event: PanelEvent) -> Option<CardChange> {
        match event {
            PanelEvent::Listening { addr } => {
                self.listen_addr = Some(addr);
                self.refresh_listening_status();
                None
            }
            PanelEvent::ClientAdded {
                identifier,
                image_url,
                clients,
            } => {
                self.clients = clients;
                self.refresh_listening_status();
                if self.card(&identifier).is_some() {
                    warn!("card for {} already exists", identifier);
                    return None;
                }
                self.cards.push(ProductCard::new(identifier.clone(), image_url));
                info!("added card for {}", identifier);
                Some(CardChange::Added {
                    index: self.cards.len() - 1,
                })
            }
            PanelEvent::ClientRemoved {
                identifier,
                clients,
            } => {
                self.clients = clients;
                self.refresh_listening_status();
                let index = self.cards.iter().position(|c| c.identifier == identifier)?;
                self.cards.remove(index);
                info!("removed card for {}", identifier);
                Some(CardChange::Removed { identifier })
            }
            PanelEvent::Broadcasted { kind, attempted } => {
                self.set_status(format!("Sent '{}' to {} client(s).", kind, attempted));
                None
            }
            PanelEvent::RelayStopped { error } => {
                self.listen_addr = None;
                match error {
                    Some(e) => self.set_status(format!("Relay stopped: {}", e)),
                    None => self.set_status("Relay stopped"),
                }
                None
            }
        }
    }

    /// Build the broadcast for `kind` from the global entries and every card.
    ///
    /// `start` draws an independent jitter for each card from `rng`.
    pub fn build_command<R: Rng>(
        &self,
        kind: CommandKind,
        fields: &GlobalFields,
        rng: &mut R,
    ) -> Result<Command, ParamError> {
        if kind == CommandKind::Stop {
            return Ok(Command::Stop);
        }
        let global = fields.parse()?;
        info!("global parameters for {}: {:?}", kind, global);

        let clients: HashMap<String, ClientParams> = self
            .cards
            .iter()
            .map(|card| {
                let mut p = card.params();
                if kind == CommandKind::Start {
                    p.random_delay = Some(rng.random_range(0..=self.max_random_delay_ms));
                }
                (card.identifier.clone(), p)
            })
            .collect();

        Ok(match kind {
            CommandKind::Start => Command::Start { global, clients },
            _ => Command::ApplySettings { global, clients },
        })
    }

    fn refresh_listening_status(&mut self) {
        let text = match self.listen_addr {
            Some(addr) => format!(
                "Listening on ws://{}. Connected clients: {}",
                addr, self.clients
            ),
            None => format!("Connected clients: {}", self.clients),
        };
        self.set_status(text);
    }
}

/// Global entry values shown at start-up: the current time plus the
/// configured defaults.
pub fn initial_fields(config: &PanelConfig, now: NaiveTime) -> GlobalFields {
    GlobalFields::with_target(
        params::target_time(now, 0),
        config.decrement_value,
        config.check_delay_ms,
        config.result_check_delay_ms,
        config.resubmit_delay_ms,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state() -> PanelState {
        PanelState::new(&PanelConfig::default())
    }

    fn added(id: &str, clients: usize) -> PanelEvent {
        PanelEvent::ClientAdded {
            identifier: id.into(),
            image_url: None,
            clients,
        }
    }

    fn fields() -> GlobalFields {
        let now = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        initial_fields(&PanelConfig::default(), now)
    }

    #[test]
    fn listening_status_tracks_client_count() {
        let mut s = state();
        s.apply(PanelEvent::Listening {
            addr: "127.0.0.1:8765".parse().unwrap(),
        });
        assert_eq!(
            s.status(),
            "Listening on ws://127.0.0.1:8765. Connected clients: 0"
        );
        s.apply(added("a", 1));
        assert_eq!(
            s.status(),
            "Listening on ws://127.0.0.1:8765. Connected clients: 1"
        );
    }

    #[test]
    fn cards_follow_lifecycle_events() {
        let mut s = state();
        assert_eq!(s.apply(added("a", 1)), Some(CardChange::Added { index: 0 }));
        assert_eq!(s.apply(added("b", 2)), Some(CardChange::Added { index: 1 }));
        assert_eq!(s.apply(added("a", 2)), None);
        assert_eq!(s.cards().len(), 2);

        let change = s.apply(PanelEvent::ClientRemoved {
            identifier: "a".into(),
            clients: 1,
        });
        assert_eq!(
            change,
            Some(CardChange::Removed {
                identifier: "a".into()
            })
        );
        assert_eq!(s.cards()[0].identifier, "b");

        let missing = s.apply(PanelEvent::ClientRemoved {
            identifier: "zzz".into(),
            clients: 1,
        });
        assert_eq!(missing, None);
    }

    #[test]
    fn new_card_has_defaults() {
        let card = ProductCard::new("p", Some("u".into()));
        let p = card.params();
        assert_eq!(p.min_values, vec![0.0]);
        assert_eq!(p.sku_prices, vec![0.0]);
        assert!(p.auto_decrement);
        assert_eq!(p.random_delay, None);
    }

    #[test]
    fn card_positions_wrap_at_column_count() {
        let s = state();
        assert_eq!(s.position(0), (0, 0));
        assert_eq!(s.position(2), (2, 0));
        assert_eq!(s.position(3), (0, 1));
        assert_eq!(s.position(7), (1, 2));
    }

    #[test]
    fn zero_columns_treated_as_one() {
        let cfg = PanelConfig {
            card_columns: 0,
            ..PanelConfig::default()
        };
        let s = PanelState::new(&cfg);
        assert_eq!(s.position(2), (0, 2));
    }

    #[test]
    fn start_collects_cards_with_jitter() {
        let mut s = state();
        s.apply(added("a", 1));
        s.apply(added("b", 2));
        {
            let card = s.card_mut("a").unwrap();
            card.min_values_text = "1.0\nabc\n2.5".into();
            card.sku_prices_text = "9.99".into();
            card.auto_decrement = false;
        }

        let mut rng = StdRng::seed_from_u64(7);
        let cmd = s
            .build_command(CommandKind::Start, &fields(), &mut rng)
            .unwrap();
        let Command::Start { global, clients } = cmd else {
            panic!("expected start");
        };
        assert_eq!(global.target_hour, 10);
        assert_eq!(global.decrement_value, 0.1);
        let a = &clients["a"];
        assert_eq!(a.min_values, vec![1.0, 2.5]);
        assert_eq!(a.sku_prices, vec![9.99]);
        assert!(!a.auto_decrement);
        for p in clients.values() {
            let delay = p.random_delay.unwrap();
            assert!(delay <= 500);
        }
    }

    #[test]
    fn apply_settings_has_no_jitter() {
        let mut s = state();
        s.apply(added("a", 1));
        let mut rng = StdRng::seed_from_u64(1);
        let cmd = s
            .build_command(CommandKind::ApplySettings, &fields(), &mut rng)
            .unwrap();
        let Command::ApplySettings { clients, .. } = cmd else {
            panic!("expected apply_settings");
        };
        assert_eq!(clients["a"].random_delay, None);
    }

    #[test]
    fn stop_ignores_invalid_fields() {
        let s = state();
        let mut bad = fields();
        bad.hour = "nope".into();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            s.build_command(CommandKind::Stop, &bad, &mut rng).unwrap(),
            Command::Stop
        );
    }

    #[test]
    fn invalid_global_field_aborts_start() {
        let s = state();
        let mut bad = fields();
        bad.check_delay = "soon".into();
        let mut rng = StdRng::seed_from_u64(1);
        let err = s
            .build_command(CommandKind::Start, &bad, &mut rng)
            .unwrap_err();
        assert_eq!(err.field, "check delay");
    }

    #[test]
    fn broadcast_and_stop_events_update_status() {
        let mut s = state();
        s.apply(PanelEvent::Broadcasted {
            kind: CommandKind::ApplySettings,
            attempted: 3,
        });
        assert_eq!(s.status(), "Sent 'apply_settings' to 3 client(s).");
        s.apply(PanelEvent::RelayStopped {
            error: Some("boom".into()),
        });
        assert_eq!(s.status(), "Relay stopped: boom");
    }

    #[test]
    fn initial_fields_use_config_defaults() {
        let f = fields();
        assert_eq!(f.hour, "10");
        assert_eq!(f.minute, "30");
        assert_eq!(f.second, "00");
        assert_eq!(f.result_check_delay, "1500");
    }
}
