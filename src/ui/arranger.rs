//! Browser grid arranger window.
//!
//! Every action runs on a worker thread that temporarily owns the
//! [`Arranger`]; the window is insensitive until the worker hands it back.

use crate::arranger::launcher::{load_urls, resolve_browser, ProcessLauncher};
use crate::arranger::{Arranger, ArrangerError};
use crate::config::config_dir;
use crate::traits::WindowManager;
use gtk4::glib;
use gtk4::prelude::*;
use log::{error, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

const JOB_POLL: Duration = Duration::from_millis(100);

type Job<W> = Box<dyn FnOnce(&mut Arranger<W>) -> Result<String, ArrangerError> + Send>;

struct ArrangerUi<W: WindowManager> {
    arranger: RefCell<Option<Arranger<W>>>,
    list: gtk4::ListBox,
    controls: gtk4::Box,
    status: gtk4::Label,
}

impl<W: WindowManager + Send + 'static> ArrangerUi<W> {
    fn set_status(&self, text: &str) {
        info!("status: {}", text);
        self.status.set_text(text);
    }

    fn rebuild_list(self: &Rc<Self>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let guard = self.arranger.borrow();
        let Some(arranger) = guard.as_ref() else {
            return;
        };
        for (index, window) in arranger.windows().iter().enumerate() {
            let check = gtk4::CheckButton::with_label(&window.title);
            check.set_active(arranger.is_selected(index));
            let ui = self.clone();
            check.connect_toggled(move |c| {
                if let Some(a) = ui.arranger.borrow_mut().as_mut() {
                    a.set_selected(index, c.is_active());
                }
            });
            self.list.append(&check);
        }
    }

    /// Hand the arranger to a worker thread running `job`, and take it back
    /// when the job is done.
    fn run_job(self: &Rc<Self>, busy: &str, job: Job<W>) {
        let Some(mut arranger) = self.arranger.borrow_mut().take() else {
            self.set_status("Busy…");
            return;
        };
        self.controls.set_sensitive(false);
        self.list.set_sensitive(false);
        self.set_status(busy);

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = job(&mut arranger);
            let _ = tx.send((arranger, result));
        });

        let ui = self.clone();
        glib::timeout_add_local(JOB_POLL, move || match rx.try_recv() {
            Ok((arranger, result)) => {
                ui.arranger.replace(Some(arranger));
                match result {
                    Ok(text) => ui.set_status(&text),
                    Err(e) => {
                        error!("{}", e);
                        ui.set_status(&format!("Error: {}", e));
                    }
                }
                ui.rebuild_list();
                ui.controls.set_sensitive(true);
                ui.list.set_sensitive(true);
                glib::ControlFlow::Break
            }
            Err(mpsc::TryRecvError::Empty) => glib::ControlFlow::Continue,
            Err(mpsc::TryRecvError::Disconnected) => {
                error!("arranger worker died");
                ui.set_status("Error: worker stopped unexpectedly");
                glib::ControlFlow::Break
            }
        });
    }

    fn open_urls(self: &Rc<Self>) {
        let config = match self.arranger.borrow().as_ref() {
            Some(a) => a.config().clone(),
            None => return,
        };
        let path = config.url_file_in(&config_dir());
        let urls = match load_urls(&path) {
            Ok(urls) if urls.is_empty() => {
                self.set_status(&format!("No URLs in {}", path.display()));
                return;
            }
            Ok(urls) => urls,
            Err(e) => {
                self.set_status(&format!("Error: {}", e));
                return;
            }
        };
        let browser = match resolve_browser(config.browser_path.as_deref()) {
            Ok(b) => b,
            Err(e) => {
                self.set_status(&format!("Error: {}", e));
                return;
            }
        };
        let launcher = ProcessLauncher::new(browser);
        let busy = format!("Opening {} URL(s)…", urls.len());
        self.run_job(
            &busy,
            Box::new(move |a: &mut Arranger<W>| {
                let n = a.open_urls(&launcher, &urls)?;
                Ok(format!("Opened {} of {} window(s).", n, urls.len()))
            }),
        );
    }
}

fn button<W: WindowManager + Send + 'static>(
    ui: &Rc<ArrangerUi<W>>,
    label: &str,
    on_click: impl Fn(&Rc<ArrangerUi<W>>) + 'static,
) {
    let b = gtk4::Button::with_label(label);
    let ui_ref = ui.clone();
    b.connect_clicked(move |_| on_click(&ui_ref));
    ui.controls.append(&b);
}

/// Build the arranger window and run the GLib main loop until it is closed.
pub fn run_arranger<W: WindowManager + Send + 'static>(
    arranger: Arranger<W>,
) -> Result<(), glib::BoolError> {
    gtk4::init()?;
    super::load_css(&config_dir().join("style.css"));

    let status = gtk4::Label::new(None);
    status.add_css_class("status");
    status.set_xalign(0.0);

    let ui = Rc::new(ArrangerUi {
        arranger: RefCell::new(Some(arranger)),
        list: gtk4::ListBox::new(),
        controls: gtk4::Box::new(gtk4::Orientation::Horizontal, 6),
        status,
    });

    button(&ui, "Open URLs", |ui| ui.open_urls());
    button(&ui, "Refresh", |ui| {
        ui.run_job(
            "Refreshing…",
            Box::new(|a: &mut Arranger<W>| {
                Ok(format!("Found {} browser window(s).", a.refresh()?))
            }),
        )
    });
    button(&ui, "Arrange", |ui| {
        ui.run_job(
            "Arranging…",
            Box::new(|a: &mut Arranger<W>| {
                Ok(match a.arrange()? {
                    0 => "No windows selected.".to_string(),
                    n => format!("Arranged {} window(s).", n),
                })
            }),
        )
    });
    button(&ui, "Close opened", |ui| {
        ui.run_job(
            "Closing…",
            Box::new(|a: &mut Arranger<W>| {
                Ok(format!("Closed {} window(s).", a.close_opened()?))
            }),
        )
    });

    let scroller = gtk4::ScrolledWindow::new();
    scroller.set_child(Some(&ui.list));
    scroller.set_vexpand(true);

    let root = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    root.append(&ui.controls);
    root.append(&scroller);
    root.append(&ui.status);

    let window = gtk4::Window::new();
    window.set_title(Some("relaydeck browser arranger"));
    window.set_default_size(520, 480);
    window.set_child(Some(&root));

    let main_loop = glib::MainLoop::new(None, false);
    {
        let main_loop = main_loop.clone();
        window.connect_close_request(move |_| {
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }

    ui.run_job(
        "Detecting browser windows…",
        Box::new(|a: &mut Arranger<W>| {
            Ok(format!("Found {} browser window(s).", a.refresh()?))
        }),
    );

    window.present();
    main_loop.run();
    Ok(())
}
