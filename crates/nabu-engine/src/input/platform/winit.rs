use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::Window;

use crate::input::{
    InputEvent, InputState, Key, KeyState, Modifiers, MouseButton, MouseButtonState,
    MouseWheelDelta, PointerButtonEvent, PointerMoveEvent,
};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Positions and sizes are converted to logical pixels with the window's current
/// scale factor. Returns `None` for events the input subsystem does not model.
pub fn translate_window_event(
    window: &Window,
    state: &InputState,
    event: &WindowEvent,
) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => {
            // winit 0.30: ModifiersChanged carries a wrapper with `.state()`.
            let ms: ModifiersState = m.state();
            Some(InputEvent::ModifiersChanged(map_modifiers(ms)))
        }

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::Resized(size) => {
            let (width, height) = size_to_logical(window, *size);
            Some(InputEvent::Resized { width, height })
        }

        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            Some(InputEvent::ScaleFactorChanged(*scale_factor))
        }

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical_f32(window, *position);
            Some(InputEvent::PointerMoved(PointerMoveEvent { x, y }))
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let st = match st {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            };

            let button = map_mouse_button(*button);

            // winit has no cursor or modifier query; use tracked state.
            let modifiers = state.modifiers;
            let (x, y) = state.pointer_pos.unwrap_or((0.0, 0.0));

            Some(InputEvent::PointerButton(PointerButtonEvent {
                button,
                state: st,
                x,
                y,
                modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let modifiers = state.modifiers;
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => {
                    let (x, y) = to_logical_f32(window, *p);
                    MouseWheelDelta::Pixel { x, y }
                }
            };
            Some(InputEvent::MouseWheel { delta, modifiers })
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let modifiers = state.modifiers;
            let st = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };

            let (key, code) = map_key(event.physical_key);

            Some(InputEvent::Key {
                key,
                state: st,
                modifiers,
                code,
                repeat: event.repeat,
            })
        }

        _ => None,
    }
}

fn to_logical_f32(window: &Window, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    (logical.x as f32, logical.y as f32)
}

fn size_to_logical(window: &Window, size: PhysicalSize<u32>) -> (f32, f32) {
    let logical = size.to_logical::<f64>(window.scale_factor());
    (logical.width as f32, logical.height as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

#[rustfmt::skip]
const NAMED_CODES: &[(KeyCode, Key)] = &[
    (KeyCode::Escape, Key::Escape), (KeyCode::Enter, Key::Enter), (KeyCode::Tab, Key::Tab), (KeyCode::Backspace, Key::Backspace), (KeyCode::Space, Key::Space),
    (KeyCode::Insert, Key::Insert), (KeyCode::Delete, Key::Delete), (KeyCode::Home, Key::Home), (KeyCode::End, Key::End), (KeyCode::PageUp, Key::PageUp), (KeyCode::PageDown, Key::PageDown),
    (KeyCode::ArrowUp, Key::ArrowUp), (KeyCode::ArrowDown, Key::ArrowDown), (KeyCode::ArrowLeft, Key::ArrowLeft), (KeyCode::ArrowRight, Key::ArrowRight),
    (KeyCode::KeyA, Key::A), (KeyCode::KeyB, Key::B), (KeyCode::KeyC, Key::C), (KeyCode::KeyD, Key::D), (KeyCode::KeyE, Key::E), (KeyCode::KeyF, Key::F),
    (KeyCode::KeyG, Key::G), (KeyCode::KeyH, Key::H), (KeyCode::KeyI, Key::I), (KeyCode::KeyJ, Key::J), (KeyCode::KeyK, Key::K), (KeyCode::KeyL, Key::L),
    (KeyCode::KeyM, Key::M), (KeyCode::KeyN, Key::N), (KeyCode::KeyO, Key::O), (KeyCode::KeyP, Key::P), (KeyCode::KeyQ, Key::Q), (KeyCode::KeyR, Key::R),
    (KeyCode::KeyS, Key::S), (KeyCode::KeyT, Key::T), (KeyCode::KeyU, Key::U), (KeyCode::KeyV, Key::V), (KeyCode::KeyW, Key::W), (KeyCode::KeyX, Key::X),
    (KeyCode::KeyY, Key::Y), (KeyCode::KeyZ, Key::Z),
    (KeyCode::Digit0, Key::Digit0), (KeyCode::Digit1, Key::Digit1), (KeyCode::Digit2, Key::Digit2), (KeyCode::Digit3, Key::Digit3), (KeyCode::Digit4, Key::Digit4),
    (KeyCode::Digit5, Key::Digit5), (KeyCode::Digit6, Key::Digit6), (KeyCode::Digit7, Key::Digit7), (KeyCode::Digit8, Key::Digit8), (KeyCode::Digit9, Key::Digit9),
    (KeyCode::F1, Key::F1), (KeyCode::F2, Key::F2), (KeyCode::F3, Key::F3), (KeyCode::F4, Key::F4), (KeyCode::F5, Key::F5), (KeyCode::F6, Key::F6),
    (KeyCode::F7, Key::F7), (KeyCode::F8, Key::F8), (KeyCode::F9, Key::F9), (KeyCode::F10, Key::F10), (KeyCode::F11, Key::F11), (KeyCode::F12, Key::F12),
];

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    // Unidentified native codes have no stable numeric form.
    let PhysicalKey::Code(code) = pk else {
        return (Key::Unknown(0), 0);
    };

    let key = match code {
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,
        other => NAMED_CODES
            .iter()
            .find(|(c, _)| *c == other)
            .map_or(Key::Unknown(other as u32), |(_, k)| *k),
    };

    (key, code as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::NativeKeyCode;

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn every_named_key_has_a_code() {
        for key in Key::ALL {
            let mapped = matches!(key, Key::Shift | Key::Control | Key::Alt | Key::Meta)
                || NAMED_CODES.iter().any(|(_, k)| k == key);
            assert!(mapped, "{key} has no winit key code");
        }
    }

    #[test]
    fn left_and_right_modifiers_share_a_key() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftLeft)).0, Key::Shift);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftRight)).0, Key::Shift);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::SuperRight)).0, Key::Meta);
    }

    #[test]
    fn camera_keys_map_by_physical_position() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyW)).0, Key::W);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ArrowLeft)).0, Key::ArrowLeft);
        let (key, code) = map_key(PhysicalKey::Code(KeyCode::KeyQ));
        assert_eq!((key, code), (Key::Q, KeyCode::KeyQ as u32));
    }

    #[test]
    fn unnamed_codes_become_unknown() {
        let (key, code) = map_key(PhysicalKey::Code(KeyCode::NumpadAdd));
        assert_eq!(key, Key::Unknown(code));
        assert_eq!(map_key(PhysicalKey::Unidentified(NativeKeyCode::Unidentified)), (Key::Unknown(0), 0));
    }

    // ── buttons / modifiers ───────────────────────────────────────────────

    #[test]
    fn mouse_buttons_keep_identity() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(map_mouse_button(WinitMouseButton::Forward), MouseButton::Forward);
        assert_eq!(map_mouse_button(WinitMouseButton::Other(9)), MouseButton::Other(9));
    }

    #[test]
    fn modifier_flags_translate() {
        let m = map_modifiers(ModifiersState::SHIFT | ModifiersState::SUPER);
        assert_eq!(m, Modifiers { shift: true, ctrl: false, alt: false, meta: true });
        assert!(!map_modifiers(ModifiersState::empty()).any());
    }
}
