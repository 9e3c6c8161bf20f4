//! Control panel window.
//!
//! # Widget tree
//!
//! ```text
//! window
//! └ vertical box
//!     ├ .globals        target time, +N s, clock, decrement, delays
//!     ├ scrolled window
//!     │   └ grid        .product-card frames, `card_columns` per row
//!     ├ action row      Start / Apply settings / Stop / Arrange browsers
//!     └ .status
//! ```

use crate::config::{config_dir, Config, PanelConfig};
use crate::panel::{initial_fields, CardChange, PanelState};
use crate::params::{self, GlobalFields};
use crate::protocol::CommandKind;
use crate::relay::RelayHandle;
use crate::traits::PanelEvent;
use chrono::Local;
use gtk4::prelude::*;
use gtk4::{glib, pango};
use log::{error, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

const EVENT_POLL: Duration = Duration::from_millis(50);

#[derive(Clone)]
struct GlobalEntries {
    hour: gtk4::Entry,
    minute: gtk4::Entry,
    second: gtk4::Entry,
    decrement_value: gtk4::Entry,
    check_delay: gtk4::Entry,
    result_check_delay: gtk4::Entry,
    resubmit_delay: gtk4::Entry,
}

impl GlobalEntries {
    fn new(initial: &GlobalFields) -> Self {
        let entry = |text: &str, width: i32| {
            let e = gtk4::Entry::new();
            e.set_text(text);
            e.set_width_chars(width);
            e
        };
        Self {
            hour: entry(&initial.hour, 3),
            minute: entry(&initial.minute, 3),
            second: entry(&initial.second, 3),
            decrement_value: entry(&initial.decrement_value, 6),
            check_delay: entry(&initial.check_delay, 6),
            result_check_delay: entry(&initial.result_check_delay, 6),
            resubmit_delay: entry(&initial.resubmit_delay, 6),
        }
    }

    fn read(&self) -> GlobalFields {
        GlobalFields {
            hour: self.hour.text().to_string(),
            minute: self.minute.text().to_string(),
            second: self.second.text().to_string(),
            decrement_value: self.decrement_value.text().to_string(),
            check_delay: self.check_delay.text().to_string(),
            result_check_delay: self.result_check_delay.text().to_string(),
            resubmit_delay: self.resubmit_delay.text().to_string(),
        }
    }

    fn set_target(&self, (h, m, s): (u32, u32, u32)) {
        self.hour.set_text(&format!("{:02}", h));
        self.minute.set_text(&format!("{:02}", m));
        self.second.set_text(&format!("{:02}", s));
    }
}

struct CardWidgets {
    frame: gtk4::Frame,
    min_values: gtk4::TextView,
    sku_prices: gtk4::TextView,
    auto_decrement: gtk4::CheckButton,
}

impl CardWidgets {
    fn new(identifier: &str, image_url: Option<&str>) -> Self {
        let frame = gtk4::Frame::new(Some(identifier));
        frame.add_css_class("product-card");

        let body = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
        let image = gtk4::Label::new(Some(image_url.unwrap_or("(no image)")));
        image.add_css_class("image-url");
        image.set_ellipsize(pango::EllipsizeMode::Middle);
        image.set_max_width_chars(32);
        image.set_tooltip_text(image_url);
        body.append(&image);

        let min_values = text_input("0.0");
        let sku_prices = text_input("0.0");
        body.append(&gtk4::Label::new(Some("Min values (one per line)")));
        body.append(&min_values);
        body.append(&gtk4::Label::new(Some("SKU prices (one per line)")));
        body.append(&sku_prices);

        let auto_decrement = gtk4::CheckButton::with_label("Auto decrement");
        auto_decrement.set_active(true);
        body.append(&auto_decrement);

        frame.set_child(Some(&body));
        Self {
            frame,
            min_values,
            sku_prices,
            auto_decrement,
        }
    }
}

fn text_input(initial: &str) -> gtk4::TextView {
    let view = gtk4::TextView::new();
    view.buffer().set_text(initial);
    view
}

fn buffer_text(view: &gtk4::TextView) -> String {
    let buf = view.buffer();
    buf.text(&buf.start_iter(), &buf.end_iter(), false).to_string()
}

struct PanelUi {
    state: RefCell<PanelState>,
    cards: RefCell<HashMap<String, CardWidgets>>,
    card_grid: gtk4::Grid,
    entries: GlobalEntries,
    status: gtk4::Label,
    relay: RefCell<Option<RelayHandle>>,
}

impl PanelUi {
    fn refresh_status(&self) {
        self.status.set_text(self.state.borrow().status());
    }

    fn set_status(&self, text: String) {
        self.state.borrow_mut().set_status(text);
        self.refresh_status();
    }

    fn handle_event(&self, event: PanelEvent) {
        let change = self.state.borrow_mut().apply(event);
        match change {
            Some(CardChange::Added { index }) => {
                let state = self.state.borrow();
                let card = &state.cards()[index];
                let widgets = CardWidgets::new(&card.identifier, card.image_url.as_deref());
                let (col, row) = state.position(index);
                self.card_grid.attach(&widgets.frame, col as i32, row as i32, 1, 1);
                self.cards
                    .borrow_mut()
                    .insert(card.identifier.clone(), widgets);
            }
            Some(CardChange::Removed { identifier }) => {
                if let Some(widgets) = self.cards.borrow_mut().remove(&identifier) {
                    self.card_grid.remove(&widgets.frame);
                }
                self.relayout();
            }
            None => {}
        }
        self.refresh_status();
    }

    /// Re-attach every card at its current grid position.
    fn relayout(&self) {
        let state = self.state.borrow();
        let cards = self.cards.borrow();
        for (index, card) in state.cards().iter().enumerate() {
            if let Some(widgets) = cards.get(&card.identifier) {
                let (col, row) = state.position(index);
                self.card_grid.remove(&widgets.frame);
                self.card_grid
                    .attach(&widgets.frame, col as i32, row as i32, 1, 1);
            }
        }
    }

    /// Copy card widget contents into the model.
    fn sync_cards(&self) {
        let cards = self.cards.borrow();
        let mut state = self.state.borrow_mut();
        for (identifier, widgets) in cards.iter() {
            if let Some(card) = state.card_mut(identifier) {
                card.min_values_text = buffer_text(&widgets.min_values);
                card.sku_prices_text = buffer_text(&widgets.sku_prices);
                card.auto_decrement = widgets.auto_decrement.is_active();
            }
        }
    }

    fn broadcast(&self, kind: CommandKind) {
        self.sync_cards();
        let fields = self.entries.read();
        let command = {
            let state = self.state.borrow();
            state.build_command(kind, &fields, &mut rand::rng())
        };
        let command = match command {
            Ok(c) => c,
            Err(e) => {
                warn!("{} aborted: {}", kind, e);
                self.set_status(format!("Not sent: {}", e));
                return;
            }
        };
        let sent = match self.relay.borrow().as_ref() {
            Some(relay) => relay.send(command),
            None => Err(crate::relay::RelayError::NotRunning),
        };
        if let Err(e) = sent {
            error!("{} not sent: {}", kind, e);
            self.set_status(format!("Not sent: {}", e));
        }
    }
}

/// Path of the arranger binary installed next to the running executable.
fn arranger_executable() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "executable has no directory")
    })?;
    Ok(dir.join(format!(
        "relaydeck-arrange{}",
        std::env::consts::EXE_SUFFIX
    )))
}

fn launch_arranger() -> std::io::Result<PathBuf> {
    let path = arranger_executable()?;
    std::process::Command::new(&path).spawn()?;
    Ok(path)
}

fn labelled(row: &gtk4::Box, text: &str, entry: &gtk4::Entry) {
    row.append(&gtk4::Label::new(Some(text)));
    row.append(entry);
}

fn globals_row(entries: &GlobalEntries, panel: &PanelConfig) -> gtk4::Box {
    let row = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    row.add_css_class("globals");

    labelled(&row, "Target", &entries.hour);
    labelled(&row, ":", &entries.minute);
    labelled(&row, ":", &entries.second);

    let offset = panel.target_offset_secs;
    let plus = gtk4::Button::with_label(&format!("+{} s", offset));
    {
        let entries = entries.clone();
        plus.connect_clicked(move |_| {
            entries.set_target(params::target_time(Local::now().time(), offset));
        });
    }
    row.append(&plus);

    let clock = gtk4::Label::new(Some(&Local::now().format("%H:%M:%S").to_string()));
    clock.add_css_class("clock");
    row.append(&clock);
    glib::timeout_add_seconds_local(1, move || {
        clock.set_text(&Local::now().format("%H:%M:%S").to_string());
        glib::ControlFlow::Continue
    });

    labelled(&row, "Decrement", &entries.decrement_value);
    labelled(&row, "Check (ms)", &entries.check_delay);
    labelled(&row, "Result check (ms)", &entries.result_check_delay);
    labelled(&row, "Resubmit (ms)", &entries.resubmit_delay);
    row
}

/// Build the control panel window and run the GLib main loop until it is
/// closed.  The relay is shut down before returning.
pub fn run_panel(
    config: &Config,
    relay: Option<RelayHandle>,
    events: mpsc::Receiver<PanelEvent>,
    startup_error: Option<String>,
) -> Result<(), glib::BoolError> {
    gtk4::init()?;
    info!("GTK4 initialised on main thread");
    super::load_css(&config_dir().join("style.css"));

    let entries = GlobalEntries::new(&initial_fields(&config.panel, Local::now().time()));

    let card_grid = gtk4::Grid::new();
    card_grid.set_column_spacing(6);
    card_grid.set_row_spacing(6);
    let scroller = gtk4::ScrolledWindow::new();
    scroller.set_child(Some(&card_grid));
    scroller.set_vexpand(true);

    let status = gtk4::Label::new(None);
    status.add_css_class("status");
    status.set_xalign(0.0);

    let ui = Rc::new(PanelUi {
        state: RefCell::new(PanelState::new(&config.panel)),
        cards: RefCell::new(HashMap::new()),
        card_grid,
        entries: entries.clone(),
        status: status.clone(),
        relay: RefCell::new(relay),
    });
    match startup_error {
        Some(e) => ui.set_status(format!("Relay not running: {}", e)),
        None => ui.refresh_status(),
    }

    let actions = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    for kind in [CommandKind::Start, CommandKind::ApplySettings, CommandKind::Stop] {
        let label = match kind {
            CommandKind::Start => "Start",
            CommandKind::ApplySettings => "Apply settings",
            CommandKind::Stop => "Stop",
        };
        let button = gtk4::Button::with_label(label);
        let ui = ui.clone();
        button.connect_clicked(move |_| ui.broadcast(kind));
        actions.append(&button);
    }
    let arrange = gtk4::Button::with_label("Arrange browsers");
    {
        let ui = ui.clone();
        arrange.connect_clicked(move |_| match launch_arranger() {
            Ok(path) => info!("launched {}", path.display()),
            Err(e) => {
                error!("cannot launch arranger: {}", e);
                ui.set_status(format!("Cannot launch arranger: {}", e));
            }
        });
    }
    actions.append(&arrange);

    let root = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    root.append(&globals_row(&entries, &config.panel));
    root.append(&scroller);
    root.append(&actions);
    root.append(&status);

    let window = gtk4::Window::new();
    window.set_title(Some("relaydeck control panel"));
    window.set_default_size(1100, 720);
    window.set_child(Some(&root));

    let main_loop = glib::MainLoop::new(None, false);
    {
        let main_loop = main_loop.clone();
        window.connect_close_request(move |_| {
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }

    {
        let ui = ui.clone();
        glib::timeout_add_local(EVENT_POLL, move || loop {
            match events.try_recv() {
                Ok(event) => ui.handle_event(event),
                Err(mpsc::TryRecvError::Empty) => return glib::ControlFlow::Continue,
                Err(mpsc::TryRecvError::Disconnected) => {
                    info!("relay event channel closed");
                    return glib::ControlFlow::Break;
                }
            }
        });
    }

    window.present();
    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");

    let relay = ui.relay.borrow_mut().take();
    if let Some(relay) = relay {
        relay.shutdown();
    }
    Ok(())
}
