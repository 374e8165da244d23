//! DirectComposition-backed retained renderer.
//!
//! One [`CompositionRenderer`] drives one window. Construction builds the
//! whole device chain (D3D11 -> DXGI -> Direct2D -> DirectWrite -> WIC ->
//! DirectComposition) up front; attaching binds a virtual surface to the
//! window's root visual. Every frame is bracketed by [`begin_draw`] /
//! [`end_draw`], and the draw primitives are only valid inside that bracket.
//!
//! [`begin_draw`]: CompositionRenderer::begin_draw
//! [`end_draw`]: CompositionRenderer::end_draw

pub mod transform;

use std::path::{Path, PathBuf};

#[cfg(windows)]
use kurbo::{Affine, Point, Rect};
#[cfg(windows)]
use peniko::Color;
#[cfg(windows)]
use rustc_hash::FxHashMap;
#[cfg(windows)]
use windows::Foundation::Numerics::Matrix3x2;
#[cfg(windows)]
use windows::Win32::Foundation::{E_FAIL, GENERIC_READ, HMODULE, HWND, POINT, RECT};
#[cfg(windows)]
use windows::Win32::Graphics::Direct2D::Common::{D2D1_COLOR_F, D2D_POINT_2F, D2D_RECT_F};
#[cfg(windows)]
use windows::Win32::Graphics::Direct2D::{
    D2D1CreateFactory, D2D1_DEVICE_CONTEXT_OPTIONS_NONE, D2D1_DRAW_TEXT_OPTIONS_NONE,
    D2D1_FACTORY_TYPE_SINGLE_THREADED, D2D1_INTERPOLATION_MODE_LINEAR, ID2D1Bitmap1,
    ID2D1DeviceContext, ID2D1Factory1, ID2D1SolidColorBrush,
};
#[cfg(windows)]
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_11_1,
    D3D_FEATURE_LEVEL_12_0, D3D_FEATURE_LEVEL_12_1,
};
#[cfg(windows)]
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION, ID3D11Device,
};
#[cfg(windows)]
use windows::Win32::Graphics::DirectComposition::{
    DCompositionCreateDevice2, IDCompositionDesktopDevice, IDCompositionTarget,
    IDCompositionVirtualSurface, IDCompositionVisual2,
};
#[cfg(windows)]
use windows::Win32::Graphics::DirectWrite::{
    DWRITE_FACTORY_TYPE_ISOLATED, DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE_NORMAL,
    DWRITE_FONT_WEIGHT, DWRITE_FONT_WEIGHT_BOLD, DWRITE_FONT_WEIGHT_LIGHT,
    DWRITE_FONT_WEIGHT_NORMAL, DWRITE_FONT_WEIGHT_SEMI_BOLD, DWRITE_MEASURING_MODE_NATURAL,
    DWriteCreateFactory, IDWriteFactory,
};
#[cfg(windows)]
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_ALPHA_MODE_PREMULTIPLIED, DXGI_FORMAT_B8G8R8A8_UNORM,
};
#[cfg(windows)]
use windows::Win32::Graphics::Dxgi::IDXGIDevice;
#[cfg(windows)]
use windows::Win32::Graphics::Imaging::{
    CLSID_WICImagingFactory, GUID_WICPixelFormat32bppPBGRA, IWICImagingFactory,
    WICBitmapDitherTypeNone, WICBitmapPaletteTypeMedianCut, WICDecodeMetadataCacheOnLoad,
};
#[cfg(windows)]
use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx,
};
#[cfg(windows)]
use windows::Win32::UI::HiDpi::GetDpiForSystem;
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;
#[cfg(windows)]
use windows::core::{HSTRING, Interface, w};
#[cfg(windows)]
use windows_core::Result;

#[cfg(windows)]
use crate::error::SetupError;
#[cfg(windows)]
use transform::TransformStack;

/// Path-keyed handle to a raster asset.
///
/// The handle itself is just the path. GPU residency lives in the renderer's
/// texture cache and is established on first draw; drawing the same handle
/// again reuses the cached device bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    path: PathBuf,
}

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Weights accepted by [`CompositionRenderer::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Light,
    Normal,
    SemiBold,
    Bold,
}

#[cfg(windows)]
impl From<FontWeight> for DWRITE_FONT_WEIGHT {
    fn from(weight: FontWeight) -> Self {
        match weight {
            FontWeight::Light => DWRITE_FONT_WEIGHT_LIGHT,
            FontWeight::Normal => DWRITE_FONT_WEIGHT_NORMAL,
            FontWeight::SemiBold => DWRITE_FONT_WEIGHT_SEMI_BOLD,
            FontWeight::Bold => DWRITE_FONT_WEIGHT_BOLD,
        }
    }
}

#[cfg(windows)]
pub struct CompositionRenderer {
    _d3d_device: ID3D11Device,
    _d2d_factory: ID2D1Factory1,
    /// Long-lived context used for resource creation (bitmap uploads). The
    /// per-frame drawing context comes out of the surface's `BeginDraw`.
    resource_context: ID2D1DeviceContext,
    dwrite_factory: IDWriteFactory,
    wic_factory: IWICImagingFactory,
    composition_device: IDCompositionDesktopDevice,
    root_visual: IDCompositionVisual2,
    target: Option<IDCompositionTarget>,
    surface: Option<IDCompositionVirtualSurface>,
    hwnd: Option<HWND>,
    frame_context: Option<ID2D1DeviceContext>,
    brush: ID2D1SolidColorBrush,
    transforms: TransformStack,
    textures: FxHashMap<PathBuf, ID2D1Bitmap1>,
    dpi: f32,
}

#[cfg(windows)]
impl CompositionRenderer {
    /// Builds the full device chain. Any failure is fatal; a renderer is
    /// never partially usable.
    pub fn new() -> std::result::Result<Self, SetupError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(SetupError::device("COM initialization"))?;
            let wic_factory: IWICImagingFactory =
                CoCreateInstance(&CLSID_WICImagingFactory, None, CLSCTX_INPROC_SERVER)
                    .map_err(SetupError::device("WIC imaging factory"))?;

            let feature_levels = [
                D3D_FEATURE_LEVEL_12_1,
                D3D_FEATURE_LEVEL_12_0,
                D3D_FEATURE_LEVEL_11_1,
                D3D_FEATURE_LEVEL_11_0,
            ];
            let mut d3d_device: Option<ID3D11Device> = None;
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                Some(&feature_levels),
                D3D11_SDK_VERSION,
                Some(&mut d3d_device),
                None,
                None,
            )
            .map_err(SetupError::device("D3D11 device"))?;
            let d3d_device = d3d_device.ok_or_else(|| SetupError::Device {
                stage: "D3D11 device",
                source: windows_core::Error::from_hresult(E_FAIL),
            })?;
            let dxgi_device: IDXGIDevice = d3d_device
                .cast()
                .map_err(SetupError::device("DXGI device cast"))?;

            let d2d_factory: ID2D1Factory1 =
                D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None)
                    .map_err(SetupError::device("Direct2D factory"))?;
            let d2d_device = d2d_factory
                .CreateDevice(&dxgi_device)
                .map_err(SetupError::device("Direct2D device"))?;
            let resource_context = d2d_device
                .CreateDeviceContext(D2D1_DEVICE_CONTEXT_OPTIONS_NONE)
                .map_err(SetupError::device("Direct2D device context"))?;

            let dpi = GetDpiForSystem() as f32;
            resource_context.SetDpi(dpi, dpi);

            let dwrite_factory: IDWriteFactory =
                DWriteCreateFactory(DWRITE_FACTORY_TYPE_ISOLATED)
                    .map_err(SetupError::device("DirectWrite factory"))?;

            let composition_device: IDCompositionDesktopDevice =
                DCompositionCreateDevice2(&d2d_device)
                    .map_err(SetupError::device("DirectComposition device"))?;
            let root_visual = composition_device
                .CreateVisual()
                .map_err(SetupError::device("root visual"))?;

            let brush = resource_context
                .CreateSolidColorBrush(
                    &D2D1_COLOR_F {
                        r: 0.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    },
                    None,
                )
                .map_err(SetupError::device("solid color brush"))?;

            Ok(Self {
                _d3d_device: d3d_device,
                _d2d_factory: d2d_factory,
                resource_context,
                dwrite_factory,
                wic_factory,
                composition_device,
                root_visual,
                target: None,
                surface: None,
                hwnd: None,
                frame_context: None,
                brush,
                transforms: TransformStack::new(),
                textures: FxHashMap::default(),
                dpi,
            })
        }
    }

    /// Binds the renderer to `hwnd`: composition target, root visual and a
    /// virtual surface sized to the current client area. Called exactly once,
    /// before any drawing.
    pub fn attach_to_window(&mut self, hwnd: HWND) -> std::result::Result<(), SetupError> {
        unsafe {
            let target = self
                .composition_device
                .CreateTargetForHwnd(hwnd, true)
                .map_err(SetupError::device("composition target"))?;
            target
                .SetRoot(&self.root_visual)
                .map_err(SetupError::device("visual tree root"))?;

            let mut client = RECT::default();
            GetClientRect(hwnd, &mut client).map_err(SetupError::device("client rect"))?;
            let width = client.right.max(1) as u32;
            let height = client.bottom.max(1) as u32;
            let surface = self
                .composition_device
                .CreateVirtualSurface(
                    width,
                    height,
                    DXGI_FORMAT_B8G8R8A8_UNORM,
                    DXGI_ALPHA_MODE_PREMULTIPLIED,
                )
                .map_err(SetupError::device("virtual surface"))?;
            self.root_visual
                .SetContent(&surface)
                .map_err(SetupError::device("surface binding"))?;
            self.composition_device
                .Commit()
                .map_err(SetupError::device("composition commit"))?;

            tracing::info!(width, height, "renderer attached");

            self.target = Some(target);
            self.surface = Some(surface);
            self.hwnd = Some(hwnd);
            Ok(())
        }
    }

    /// Opens a frame: acquires the surface's drawing context, applies the
    /// surface offset as the root transform and clears to transparent.
    /// Frames do not nest; a frame left open by a failed paint is abandoned
    /// here so the new frame starts clean.
    pub fn begin_draw(&mut self) -> Result<()> {
        let surface = self.surface.as_ref().ok_or_else(out_of_sequence)?;

        if let Some(stale) = self.frame_context.take() {
            unsafe {
                stale.SetTransform(&to_matrix(Affine::IDENTITY));
                drop(stale);
                surface.EndDraw()?;
            }
            self.transforms.reset();
            tracing::debug!("abandoned an unfinished frame");
        }

        let mut update_offset = POINT::default();
        unsafe {
            let context: ID2D1DeviceContext = surface.BeginDraw(None, &mut update_offset)?;
            context.SetDpi(self.dpi, self.dpi);

            // The surface hands back a device-pixel offset; convert to DIPs.
            let to_dip = 96.0 / self.dpi as f64;
            self.transforms.reset();
            let root = self.transforms.push(Affine::translate((
                update_offset.x as f64 * to_dip,
                update_offset.y as f64 * to_dip,
            )));
            context.SetTransform(&to_matrix(root));
            context.Clear(Some(&D2D1_COLOR_F {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            }));

            self.frame_context = Some(context);
        }
        Ok(())
    }

    /// Closes the frame and commits the composition tree.
    pub fn end_draw(&mut self) -> Result<()> {
        let context = self.frame_context.take().ok_or_else(out_of_sequence)?;
        let surface = self.surface.as_ref().ok_or_else(out_of_sequence)?;
        unsafe {
            context.SetTransform(&to_matrix(Affine::IDENTITY));
            self.transforms.reset();
            drop(context);
            surface.EndDraw()?;
            self.composition_device.Commit()?;
        }
        Ok(())
    }

    pub fn fill_rectangle(&mut self, rect: Rect, color: Color) -> Result<()> {
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        unsafe {
            self.brush.SetColor(&to_color(color));
            context.FillRectangle(&to_rect(rect), &self.brush);
        }
        Ok(())
    }

    pub fn draw_line(&mut self, from: Point, to: Point, width: f32, color: Color) -> Result<()> {
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        unsafe {
            self.brush.SetColor(&to_color(color));
            context.DrawLine(to_point(from), to_point(to), &self.brush, width, None);
        }
        Ok(())
    }

    /// Draws a cached bitmap at `top_left`, scaled uniformly from its native
    /// pixel size. The first draw of a path decodes and uploads it.
    pub fn draw_image(
        &mut self,
        image: &ImageHandle,
        scale: f32,
        top_left: Point,
        opacity: f32,
    ) -> Result<()> {
        let bitmap = self.texture(image)?;
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        unsafe {
            let size = bitmap.GetSize();
            let dest = D2D_RECT_F {
                left: top_left.x as f32,
                top: top_left.y as f32,
                right: top_left.x as f32 + size.width * scale,
                bottom: top_left.y as f32 + size.height * scale,
            };
            context.DrawBitmap(
                &bitmap,
                Some(&dest),
                opacity,
                D2D1_INTERPOLATION_MODE_LINEAR,
                None,
                None,
            );
        }
        Ok(())
    }

    /// Draws a single run of text with a transient format object.
    pub fn draw_text(
        &mut self,
        text: &str,
        top_left: Point,
        family: &str,
        size: f32,
        color: Color,
        weight: FontWeight,
    ) -> Result<()> {
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        unsafe {
            let format = self.dwrite_factory.CreateTextFormat(
                &HSTRING::from(family),
                None,
                weight.into(),
                DWRITE_FONT_STYLE_NORMAL,
                DWRITE_FONT_STRETCH_NORMAL,
                size,
                w!("en-US"),
            )?;
            let wide: Vec<u16> = text.encode_utf16().collect();
            // Effectively unbounded layout box; the run is never wrapped.
            let layout = D2D_RECT_F {
                left: top_left.x as f32,
                top: top_left.y as f32,
                right: top_left.x as f32 + 4096.0,
                bottom: top_left.y as f32 + 4096.0,
            };
            self.brush.SetColor(&to_color(color));
            context.DrawText(
                &wide,
                &format,
                &layout,
                &self.brush,
                D2D1_DRAW_TEXT_OPTIONS_NONE,
                DWRITE_MEASURING_MODE_NATURAL,
            );
        }
        Ok(())
    }

    /// Composes `transform` onto the current transform for subsequent draws.
    pub fn push_transform(&mut self, transform: Affine) -> Result<()> {
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        let composed = self.transforms.push(transform);
        unsafe {
            context.SetTransform(&to_matrix(composed));
        }
        Ok(())
    }

    /// Restores the transform that was current before the matching push.
    pub fn pop_transform(&mut self) -> Result<()> {
        let context = self.frame_context.as_ref().ok_or_else(out_of_sequence)?;
        let restored = self.transforms.pop();
        unsafe {
            context.SetTransform(&to_matrix(restored));
        }
        Ok(())
    }

    /// Resizes the virtual surface to the window's current client area. The
    /// content is repainted by the next frame, not here.
    pub fn resize_buffers(&mut self) -> Result<()> {
        let (Some(surface), Some(hwnd)) = (self.surface.as_ref(), self.hwnd) else {
            return Ok(());
        };
        let mut client = RECT::default();
        unsafe {
            GetClientRect(hwnd, &mut client)?;
        }
        let width = client.right.max(1) as u32;
        let height = client.bottom.max(1) as u32;
        unsafe {
            surface.Resize(width, height)?;
        }
        tracing::debug!(width, height, "virtual surface resized");
        Ok(())
    }

    /// Adopts a new DPI for subsequent frames.
    pub fn update_dpi(&mut self, dpi: f32) {
        self.dpi = dpi;
        unsafe {
            self.resource_context.SetDpi(dpi, dpi);
        }
    }

    /// Resolves a handle to a device bitmap, decoding and uploading on the
    /// first request. The cache is append-only.
    fn texture(&mut self, image: &ImageHandle) -> Result<ID2D1Bitmap1> {
        if let Some(bitmap) = self.textures.get(image.path()) {
            return Ok(bitmap.clone());
        }
        tracing::trace!(path = %image.path().display(), "texture cache miss");

        let bitmap = unsafe {
            let decoder = self.wic_factory.CreateDecoderFromFilename(
                &HSTRING::from(image.path().as_os_str()),
                None,
                GENERIC_READ,
                WICDecodeMetadataCacheOnLoad,
            )?;
            let frame = decoder.GetFrame(0)?;
            let converter = self.wic_factory.CreateFormatConverter()?;
            converter.Initialize(
                &frame,
                &GUID_WICPixelFormat32bppPBGRA,
                WICBitmapDitherTypeNone,
                None,
                0.0,
                WICBitmapPaletteTypeMedianCut,
            )?;
            self.resource_context
                .CreateBitmapFromWicBitmap(&converter, None)?
        };
        self.textures
            .insert(image.path().to_path_buf(), bitmap.clone());
        Ok(bitmap)
    }
}

// E_FAIL: draw traffic outside an attached begin/end bracket.
#[cfg(windows)]
fn out_of_sequence() -> windows_core::Error {
    windows_core::Error::from_hresult(E_FAIL)
}

#[cfg(windows)]
fn to_matrix(transform: Affine) -> Matrix3x2 {
    let [a, b, c, d, e, f] = transform.as_coeffs().map(|v| v as f32);
    Matrix3x2 {
        M11: a,
        M12: b,
        M21: c,
        M22: d,
        M31: e,
        M32: f,
    }
}

#[cfg(windows)]
fn to_color(color: Color) -> D2D1_COLOR_F {
    let [r, g, b, a] = color.components;
    D2D1_COLOR_F { r, g, b, a }
}

#[cfg(windows)]
fn to_rect(rect: Rect) -> D2D_RECT_F {
    D2D_RECT_F {
        left: rect.x0 as f32,
        top: rect.y0 as f32,
        right: rect.x1 as f32,
        bottom: rect.y1 as f32,
    }
}

#[cfg(windows)]
fn to_point(point: Point) -> D2D_POINT_2F {
    D2D_POINT_2F {
        x: point.x as f32,
        y: point.y as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_handles_with_the_same_path_are_one_cache_key() {
        let a = ImageHandle::new("media/tab_raster.png");
        let b = ImageHandle::new("media/tab_raster.png");
        assert_eq!(a, b);

        let mut keys = std::collections::HashSet::new();
        keys.insert(a.path().to_path_buf());
        keys.insert(b.path().to_path_buf());
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn image_handles_keep_their_path() {
        let handle = ImageHandle::new("media/new_tab_symbol.png");
        assert_eq!(
            handle.path(),
            std::path::Path::new("media/new_tab_symbol.png")
        );
    }
}
