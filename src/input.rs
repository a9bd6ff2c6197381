//! Platform-agnostic input and its translation into viewer actions.
//!
//! The viewer converts winit events into [`InputEvent`]s and feeds them to an
//! [`InputAdapter`], which owns pointer and crop-drag state and yields at most
//! one [`UiAction`] per event. Nothing here touches a window, so the whole
//! pick/crop flow is testable headless.

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key as WinitKey, NamedKey};

use crate::coords::{FullUv, pointer_to_full_uv};
use crate::crop::{CropBox, CropRect};
use crate::loupe::Loupe;
use crate::processing::layout::PixelRect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Cursor position in physical pixels, top-left origin.
    CursorMoved { x: f32, y: f32 },
    /// Primary button pressed (`true`) or released.
    PrimaryButton { pressed: bool },
    ModifiersChanged { shift: bool },
    KeyPressed(Key),
    KeyReleased(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable key, lowercased.
    Char(char),
    Tab,
    Escape,
    Space,
}

fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::Tab) => Some(Key::Tab),
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Character(s) if s.as_str() == " " => Some(Key::Space),
        WinitKey::Character(s) => Some(Key::Char(s.chars().next()?.to_ascii_lowercase())),
        _ => None,
    }
}

impl InputEvent {
    /// Translate the window events the viewer cares about.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CursorMoved { position, .. } => Some(InputEvent::CursorMoved {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::MouseInput {
                state,
                button: winit::event::MouseButton::Left,
                ..
            } => Some(InputEvent::PrimaryButton {
                pressed: *state == ElementState::Pressed,
            }),
            WindowEvent::ModifiersChanged(m) => Some(InputEvent::ModifiersChanged {
                shift: m.state().shift_key(),
            }),
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => {
                let key = map_key(&event.logical_key)?;
                Some(match event.state {
                    ElementState::Pressed => InputEvent::KeyPressed(key),
                    ElementState::Released => InputEvent::KeyReleased(key),
                })
            }
            _ => None,
        }
    }
}

/// Which picture the window currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// The whole plate with midline and landmark markers; clicks pick.
    #[default]
    Overview,
    /// The composited stereo frame; drags edit the crop.
    Stereo,
}

impl View {
    pub fn toggled(self) -> Self {
        match self {
            View::Overview => View::Stereo,
            View::Stereo => View::Overview,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    Pick(FullUv),
    CropChanged(Option<CropRect>),
    ResetPicks,
    ToggleMode,
    /// Multiply the wiggle frequency by this factor.
    ScaleWiggleHz(f32),
    ToggleBlend,
    ToggleView,
    /// The loupe inset appeared, moved or disappeared.
    LoupeChanged,
    Quit,
}

#[derive(Debug, Clone)]
pub struct InputAdapter {
    cursor: Option<(f32, f32)>,
    shift: bool,
    crop_box: CropBox,
    crop_min_px: f32,
    loupe: Loupe,
}

impl InputAdapter {
    /// `crop_min_px` is in logical pixels; it is scaled on [`InputAdapter::resize`].
    pub fn new(
        crop: Option<CropRect>,
        surface_w: u32,
        surface_h: u32,
        crop_min_px: f32,
        scale_factor: f64,
    ) -> Self {
        let min_px = crop_min_px * scale_factor as f32;
        Self {
            cursor: None,
            shift: false,
            crop_box: CropBox::new(crop, surface_w, surface_h, min_px),
            crop_min_px,
            loupe: Loupe::default(),
        }
    }

    pub fn crop(&self) -> Option<CropRect> {
        self.crop_box.normalized()
    }

    /// Plate point the loupe magnifies, while it is held over the plate.
    pub fn loupe_target(&self) -> Option<FullUv> {
        self.loupe.visible_target()
    }

    /// Rebuild the crop box for a new surface; returns the crop to apply.
    pub fn resize(&mut self, surface_w: u32, surface_h: u32, scale_factor: f64) -> Option<CropRect> {
        self.crop_box.set_min_px(self.crop_min_px * scale_factor as f32);
        self.crop_box.resize(surface_w, surface_h)
    }

    /// `content` is the rectangle the overview plate occupies on the surface.
    pub fn handle(&mut self, event: InputEvent, view: View, content: PixelRect) -> Option<UiAction> {
        match event {
            InputEvent::CursorMoved { x, y } => {
                self.cursor = Some((x, y));
                match view {
                    View::Stereo if self.crop_box.is_dragging() => {
                        self.crop_box.pointer_move(x, y).map(|c| UiAction::CropChanged(Some(c)))
                    }
                    View::Stereo => None,
                    View::Overview => self
                        .loupe
                        .set_target(pointer_to_full_uv(x, y, content))
                        .then_some(UiAction::LoupeChanged),
                }
            }
            InputEvent::PrimaryButton { pressed: true } => {
                let (x, y) = self.cursor?;
                match view {
                    View::Overview => pointer_to_full_uv(x, y, content).map(UiAction::Pick),
                    View::Stereo => {
                        self.crop_box.pointer_down(x, y);
                        None
                    }
                }
            }
            InputEvent::PrimaryButton { pressed: false } => {
                self.crop_box.pointer_up();
                None
            }
            InputEvent::ModifiersChanged { shift } => {
                self.shift = shift;
                None
            }
            InputEvent::KeyPressed(Key::Space) => {
                self.loupe.set_held(true).then_some(UiAction::LoupeChanged)
            }
            InputEvent::KeyReleased(Key::Space) => {
                self.loupe.set_held(false).then_some(UiAction::LoupeChanged)
            }
            InputEvent::KeyReleased(_) => None,
            InputEvent::KeyPressed(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: Key) -> Option<UiAction> {
        let action = match key {
            Key::Tab => UiAction::ToggleView,
            Key::Escape | Key::Char('q') => UiAction::Quit,
            Key::Char('r') => UiAction::ResetPicks,
            Key::Char('m') => UiAction::ToggleMode,
            Key::Char('[') => UiAction::ScaleWiggleHz(0.5),
            Key::Char(']') => UiAction::ScaleWiggleHz(2.0),
            Key::Char('b') => UiAction::ToggleBlend,
            Key::Char('c') => {
                let next = if self.shift {
                    Some(CropRect::default())
                } else {
                    None
                };
                UiAction::CropChanged(self.crop_box.set_normalized(next))
            }
            Key::Char(_) | Key::Space => return None,
        };
        Some(action)
    }
}
