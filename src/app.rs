//! Application shell: one frame window, a blocking message pump, and the
//! HWND registry the window procedure consults.
//!
//! Controllers are stored in an explicit thread-local table keyed by raw
//! window handle instead of being smuggled through per-window user data; the
//! window procedure looks them up on every message and simply falls through
//! to default handling for handles it does not know.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;
use rustc_hash::FxHashMap;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, TranslateMessage,
};

use crate::error::SetupError;
use crate::window::FrameWindow;

thread_local! {
    static WINDOWS: RefCell<FxHashMap<isize, Rc<RefCell<FrameWindow>>>> =
        RefCell::new(FxHashMap::default());
}

/// Records `window` as the controller for `hwnd`.
pub(crate) fn register(hwnd: HWND, window: Rc<RefCell<FrameWindow>>) {
    WINDOWS.with(|table| table.borrow_mut().insert(hwnd.0 as isize, window));
}

/// Drops the controller for `hwnd`, if any.
pub(crate) fn unregister(hwnd: HWND) {
    WINDOWS.with(|table| table.borrow_mut().remove(&(hwnd.0 as isize)));
}

/// Looks up the controller for `hwnd`. Messages that arrive before
/// registration (or after removal) miss and take the default path.
pub(crate) fn lookup(hwnd: HWND) -> Option<Rc<RefCell<FrameWindow>>> {
    WINDOWS.with(|table| table.borrow().get(&(hwnd.0 as isize)).cloned())
}

pub struct Application {
    _main_window: Rc<RefCell<FrameWindow>>,
}

impl Application {
    /// Builds and shows the main window.
    pub fn new() -> Result<Self, SetupError> {
        let frame = Rect::new(100.0, 100.0, 100.0 + 1280.0, 100.0 + 720.0);
        let main_window = FrameWindow::create("Chrome management", frame)?;
        main_window.borrow().show();
        Ok(Self {
            _main_window: main_window,
        })
    }

    /// Pumps messages until the quit message and returns its payload as the
    /// process exit status.
    pub fn run(self) -> i32 {
        let mut message = MSG::default();
        unsafe {
            while GetMessageW(&mut message, None, 0, 0).as_bool() {
                let _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            }
        }
        message.wParam.0 as i32
    }
}
