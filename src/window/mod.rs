//! Window chrome controller.
//!
//! [`FrameWindow`] owns one borderless top-level window: it extends the DWM
//! frame into the client area, answers the non-client messages that keep
//! dragging, resizing and snapping native, and paints the chrome (tab strip,
//! toolbar, sidebar) through the composition renderer.

pub mod hit_test;

#[cfg(windows)]
use std::cell::RefCell;
#[cfg(windows)]
use std::rc::Rc;

#[cfg(windows)]
use kurbo::{Affine, Point, Rect};
#[cfg(windows)]
use peniko::Color;
#[cfg(windows)]
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
#[cfg(windows)]
use windows::Win32::Graphics::Dwm::{DwmDefWindowProc, DwmExtendFrameIntoClientArea};
#[cfg(windows)]
use windows::Win32::Graphics::Gdi::{BLACK_BRUSH, GetStockObject, HBRUSH};
#[cfg(windows)]
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
#[cfg(windows)]
use windows::Win32::UI::Controls::MARGINS;
#[cfg(windows)]
use windows::Win32::UI::HiDpi::{GetDpiForWindow, GetSystemMetricsForDpi};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, GetClientRect, GetSystemMetrics,
    GetWindowRect, HTBOTTOM, HTBOTTOMLEFT, HTBOTTOMRIGHT, HTCAPTION, HTLEFT, HTRIGHT, HTTOP,
    HTTOPLEFT, HTTOPRIGHT, IDC_ARROW, LoadCursorW, NCCALCSIZE_PARAMS, PostQuitMessage,
    RegisterClassExW, SM_CXFIXEDFRAME, SM_CXFRAME, SM_CXPADDEDBORDER, SM_CYBORDER, SM_CYCAPTION,
    SM_CYFRAME, SM_CYSIZEFRAME, SW_HIDE, SW_SHOW, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE,
    SWP_NOSIZE, SWP_NOZORDER, SetWindowPos, ShowWindow, WM_CLOSE, WM_CREATE, WM_DESTROY,
    WM_DPICHANGED, WM_NCCALCSIZE, WM_NCHITTEST, WM_PAINT, WM_SIZE, WNDCLASSEXW,
    WS_EX_NOREDIRECTIONBITMAP, WS_OVERLAPPEDWINDOW,
};
#[cfg(windows)]
use windows::core::{HSTRING, w};

#[cfg(windows)]
use crate::app;
#[cfg(windows)]
use crate::error::SetupError;
#[cfg(windows)]
use crate::render::{CompositionRenderer, FontWeight, ImageHandle};
#[cfg(windows)]
use hit_test::{CaptionMetrics, FrameMetrics, HitZone, WindowBounds, classify};

#[cfg(windows)]
pub struct FrameWindow {
    hwnd: HWND,
    scale: f32,
    /// Pixels of DWM frame extended below the window top; also the caption
    /// band the hit-test answers `HTCAPTION` for.
    caption_margin: i32,
    /// The same margin expressed in DIPs, applied as the paint translation
    /// so chrome content can draw in caption-relative coordinates.
    client_offset_dip: f32,
    renderer: CompositionRenderer,
    tab_raster: ImageHandle,
    new_tab_symbol: ImageHandle,
}

#[cfg(windows)]
impl FrameWindow {
    /// Creates, frames and registers the window. `frame` is the desired
    /// screen rectangle in DIPs at the 96-DPI baseline; the size is rescaled
    /// to the monitor the window lands on, the origin is not.
    pub fn create(title: &str, frame: Rect) -> Result<Rc<RefCell<Self>>, SetupError> {
        let tab_raster = ImageHandle::new("media/tab_raster.png");
        let new_tab_symbol = ImageHandle::new("media/new_tab_symbol.png");
        for asset in [&tab_raster, &new_tab_symbol] {
            if !asset.path().exists() {
                return Err(SetupError::MissingAsset(asset.path().to_path_buf()));
            }
        }

        unsafe {
            let module = GetModuleHandleW(None).map_err(SetupError::WindowCreation)?;
            let instance = HINSTANCE(module.0);
            let class_name = w!("GlasspaneFrameWindow");

            let window_class = WNDCLASSEXW {
                cbSize: size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_procedure),
                hInstance: instance,
                hCursor: LoadCursorW(None, IDC_ARROW).map_err(SetupError::WindowCreation)?,
                hbrBackground: HBRUSH(GetStockObject(BLACK_BRUSH).0),
                lpszClassName: class_name,
                ..Default::default()
            };
            // Re-registration across windows of the same class is harmless.
            let _ = RegisterClassExW(&window_class);

            let hwnd = CreateWindowExW(
                WS_EX_NOREDIRECTIONBITMAP,
                class_name,
                &HSTRING::from(title),
                WS_OVERLAPPEDWINDOW,
                10,
                10,
                100,
                100,
                None,
                None,
                Some(instance),
                None,
            )
            .map_err(SetupError::WindowCreation)?;

            let dpi = GetDpiForWindow(hwnd);
            let metrics = FrameMetrics::for_dpi(system_caption_metrics(dpi), dpi);
            SetWindowPos(
                hwnd,
                None,
                frame.x0 as i32,
                frame.y0 as i32,
                (frame.width() * metrics.scale as f64) as i32,
                (frame.height() * metrics.scale as f64) as i32,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
            .map_err(SetupError::WindowCreation)?;

            let margins = MARGINS {
                cyTopHeight: metrics.caption_margin,
                ..Default::default()
            };
            DwmExtendFrameIntoClientArea(hwnd, &margins).map_err(SetupError::FrameExtension)?;

            let mut renderer = CompositionRenderer::new()?;
            renderer.attach_to_window(hwnd)?;

            tracing::info!(title, dpi, caption_margin = metrics.caption_margin, "frame window created");

            let window = Rc::new(RefCell::new(Self {
                hwnd,
                scale: metrics.scale,
                caption_margin: metrics.caption_margin,
                client_offset_dip: metrics.client_offset_dip,
                renderer,
                tab_raster,
                new_tab_symbol,
            }));
            app::register(hwnd, window.clone());
            Ok(window)
        }
    }

    pub fn show(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOW);
        }
    }

    pub fn hide(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }

    /// Classifies a screen-space cursor position against this window.
    fn hit_test(&self, cursor_x: i32, cursor_y: i32) -> HitZone {
        let mut rect = RECT::default();
        if unsafe { GetWindowRect(self.hwnd, &mut rect) }.is_err() {
            return HitZone::Nowhere;
        }
        classify(
            WindowBounds {
                left: rect.left,
                top: rect.top,
                right: rect.right,
                bottom: rect.bottom,
            },
            cursor_x,
            cursor_y,
            self.caption_margin,
        )
    }

    /// Paints one frame of chrome. The whole frame draws in DIPs translated
    /// down by the caption offset, so y = 0 is the chrome/content boundary
    /// and the tab strip lives at negative y.
    fn paint(&mut self) -> windows::core::Result<()> {
        let mut client = RECT::default();
        unsafe {
            GetClientRect(self.hwnd, &mut client)?;
        }
        let scale = self.scale as f64;
        let client_area = Rect::new(
            0.0,
            0.0,
            client.right as f64 / scale,
            (client.bottom - self.caption_margin) as f64 / scale,
        );

        self.renderer.begin_draw()?;
        self.renderer
            .push_transform(Affine::translate((0.0, self.client_offset_dip as f64)))?;
        self.renderer
            .fill_rectangle(client_area, Color::new([0.96, 0.96, 0.96, 1.0]))?;
        self.paint_tab_strip(client_area)?;
        self.paint_toolbar(client_area)?;
        self.paint_sidebar(client_area)?;
        self.renderer.end_draw()
    }

    fn paint_tab_strip(&mut self, client_area: Rect) -> windows::core::Result<()> {
        self.renderer
            .draw_image(&self.tab_raster, 0.5, Point::new(229.0, -28.0), 0.6)?;
        self.renderer
            .draw_image(&self.new_tab_symbol, 0.5, Point::new(460.0, -22.0), 1.0)?;
        self.renderer.draw_line(
            Point::new(client_area.x0, -0.5),
            Point::new(client_area.x1, -0.5),
            1.0,
            Color::new([0.77, 0.77, 0.77, 1.0]),
        )?;
        self.renderer
            .draw_image(&self.tab_raster, 0.5, Point::new(10.0, -28.0), 1.0)?;
        self.renderer.draw_text(
            "Expand the frame into t...",
            Point::new(48.0, -24.0),
            "Segoe UI",
            14.0,
            Color::new([0.4, 0.4, 0.4, 1.0]),
            FontWeight::Normal,
        )?;
        self.renderer.draw_text(
            "Recompute the window...",
            Point::new(269.0, -24.0),
            "Segoe UI",
            14.0,
            Color::new([0.4, 0.4, 0.4, 0.6]),
            FontWeight::Normal,
        )?;
        Ok(())
    }

    fn paint_toolbar(&mut self, client_area: Rect) -> windows::core::Result<()> {
        let width = client_area.x1;
        self.renderer.draw_line(
            Point::new(client_area.x0, 50.5),
            Point::new(width, 50.5),
            1.0,
            Color::new([0.82, 0.82, 0.82, 1.0]),
        )?;
        self.renderer.draw_line(
            Point::new(client_area.x0, 54.5),
            Point::new(width, 54.5),
            1.0,
            Color::new([0.82, 0.82, 0.82, 1.0]),
        )?;
        self.renderer.fill_rectangle(
            Rect::new(client_area.x0, 55.0, width, client_area.y1),
            Color::WHITE,
        )?;
        // Address bar mock: gray outline with a white inset.
        self.renderer.fill_rectangle(
            Rect::new(14.0, 9.0, width - 14.0, 41.0),
            Color::new([0.9, 0.9, 0.9, 1.0]),
        )?;
        self.renderer.fill_rectangle(
            Rect::new(15.0, 10.0, width - 15.0, 40.0),
            Color::WHITE,
        )?;
        Ok(())
    }

    fn paint_sidebar(&mut self, client_area: Rect) -> windows::core::Result<()> {
        self.renderer.fill_rectangle(
            Rect::new(client_area.x0, 55.0, 400.0, 55.0 + client_area.y1),
            Color::new([0.92, 0.92, 0.92, 1.0]),
        )
    }

    fn handle_resize(&mut self) {
        if let Err(error) = self.renderer.resize_buffers() {
            tracing::error!(%error, "surface resize failed");
        }
    }

    /// Adopts a new DPI: recompute the caption margin and re-extend the
    /// frame. Repositioning to the suggested rectangle is left to the
    /// message handler; `SetWindowPos` re-enters the window procedure
    /// synchronously and must not run while this controller is borrowed.
    fn handle_dpi_changed(&mut self, dpi: u32) {
        let metrics = FrameMetrics::for_dpi(system_caption_metrics(dpi), dpi);
        self.scale = metrics.scale;
        self.caption_margin = metrics.caption_margin;
        self.client_offset_dip = metrics.client_offset_dip;

        let margins = MARGINS {
            cyTopHeight: self.caption_margin,
            ..Default::default()
        };
        unsafe {
            if let Err(error) = DwmExtendFrameIntoClientArea(self.hwnd, &margins) {
                tracing::error!(%error, "frame re-extension failed");
            }
        }
        self.renderer.update_dpi(dpi as f32);
        tracing::info!(dpi, caption_margin = self.caption_margin, "DPI changed");
    }
}

/// Metrics feeding the caption-height formula: title-bar and padding at the
/// 96-DPI baseline, frame and border at the actual DPI.
#[cfg(windows)]
fn system_caption_metrics(dpi: u32) -> CaptionMetrics {
    unsafe {
        CaptionMetrics {
            base_caption: GetSystemMetricsForDpi(SM_CYCAPTION, 96),
            base_frame_padding: GetSystemMetricsForDpi(SM_CXFIXEDFRAME, 96),
            frame_size: GetSystemMetricsForDpi(SM_CYSIZEFRAME, dpi),
            border: GetSystemMetricsForDpi(SM_CYBORDER, dpi),
        }
    }
}

#[cfg(windows)]
fn hit_zone_code(zone: HitZone) -> u32 {
    match zone {
        HitZone::TopLeft => HTTOPLEFT,
        HitZone::TopRight => HTTOPRIGHT,
        HitZone::BottomRight => HTBOTTOMRIGHT,
        HitZone::BottomLeft => HTBOTTOMLEFT,
        HitZone::Top => HTTOP,
        HitZone::Bottom => HTBOTTOM,
        HitZone::Left => HTLEFT,
        HitZone::Right => HTRIGHT,
        HitZone::Caption => HTCAPTION,
        HitZone::Nowhere => 0,
    }
}

#[cfg(windows)]
fn cursor_from_lparam(lparam: LPARAM) -> (i32, i32) {
    let x = (lparam.0 & 0xffff) as u16 as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xffff) as u16 as i16 as i32;
    (x, y)
}

#[cfg(windows)]
pub(crate) unsafe extern "system" fn window_procedure(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        // DWM gets first refusal so the caption buttons keep working.
        let mut dwm_result = LRESULT(0);
        if DwmDefWindowProc(hwnd, message, wparam, lparam, &mut dwm_result).as_bool() {
            return dwm_result;
        }

        match message {
            WM_CREATE => {
                // Force a non-client recalc so the frame removal applies
                // before the window is first shown.
                let _ = SetWindowPos(
                    hwnd,
                    None,
                    0,
                    0,
                    0,
                    0,
                    SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER,
                );
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            WM_NCCALCSIZE if wparam.0 != 0 => {
                // Claim the left/right/bottom frame for the client area and
                // leave the top untouched; the caption is ours to paint.
                let params = &mut *(lparam.0 as *mut NCCALCSIZE_PARAMS);
                let frame_x = GetSystemMetrics(SM_CXFRAME) + GetSystemMetrics(SM_CXPADDEDBORDER);
                let frame_y = GetSystemMetrics(SM_CYFRAME) + GetSystemMetrics(SM_CXPADDEDBORDER);
                let proposed = &mut params.rgrc[0];
                proposed.left += frame_x;
                proposed.right -= frame_x;
                proposed.bottom -= frame_y;
                LRESULT(0)
            }
            WM_NCHITTEST => {
                if let Some(window) = app::lookup(hwnd) {
                    let (x, y) = cursor_from_lparam(lparam);
                    let zone = window.borrow().hit_test(x, y);
                    if zone != HitZone::Nowhere {
                        return LRESULT(hit_zone_code(zone) as isize);
                    }
                }
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            WM_PAINT => {
                if let Some(window) = app::lookup(hwnd) {
                    if let Err(error) = window.borrow_mut().paint() {
                        tracing::error!(%error, "frame dropped");
                    }
                }
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            WM_SIZE => {
                if let Some(window) = app::lookup(hwnd) {
                    window.borrow_mut().handle_resize();
                }
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            WM_DPICHANGED => {
                if let Some(window) = app::lookup(hwnd) {
                    let dpi = (wparam.0 & 0xffff) as u32;
                    window.borrow_mut().handle_dpi_changed(dpi);
                    // Applied only after the borrow above is released:
                    // SetWindowPos dispatches WM_SIZE (and more) back into
                    // this procedure before returning.
                    let suggested = *(lparam.0 as *const RECT);
                    let _ = SetWindowPos(
                        hwnd,
                        None,
                        suggested.left,
                        suggested.top,
                        suggested.right - suggested.left,
                        suggested.bottom - suggested.top,
                        SWP_NOZORDER | SWP_NOACTIVATE,
                    );
                }
                LRESULT(0)
            }
            WM_CLOSE => {
                PostQuitMessage(0);
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            WM_DESTROY => {
                app::unregister(hwnd);
                DefWindowProcW(hwnd, message, wparam, lparam)
            }
            _ => DefWindowProcW(hwnd, message, wparam, lparam),
        }
    }
}
