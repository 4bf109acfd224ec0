extern crate sfml;

use crate::config::Config;
use crate::emulator::basics::{HIGH_RES_HEIGHT, HIGH_RES_WIDTH};
use crate::emulator::display::SharedFrame;
use crate::emulator::executor::ControlHandle;
use sfml::graphics::{Color, RectangleShape, RenderTarget, RenderWindow, Shape, Transformable};
use sfml::system::Vector2f;
use sfml::window::{ContextSettings, Event, Key, Style, VideoMode};
use tracing::debug;

const SCALE: usize = 8;
const KEY_CHARS: [(Key, char); 36] = [
    (Key::Num0, '0'),
    (Key::Num1, '1'),
    (Key::Num2, '2'),
    (Key::Num3, '3'),
    (Key::Num4, '4'),
    (Key::Num5, '5'),
    (Key::Num6, '6'),
    (Key::Num7, '7'),
    (Key::Num8, '8'),
    (Key::Num9, '9'),
    (Key::A, 'a'),
    (Key::B, 'b'),
    (Key::C, 'c'),
    (Key::D, 'd'),
    (Key::E, 'e'),
    (Key::F, 'f'),
    (Key::G, 'g'),
    (Key::H, 'h'),
    (Key::I, 'i'),
    (Key::J, 'j'),
    (Key::K, 'k'),
    (Key::L, 'l'),
    (Key::M, 'm'),
    (Key::N, 'n'),
    (Key::O, 'o'),
    (Key::P, 'p'),
    (Key::Q, 'q'),
    (Key::R, 'r'),
    (Key::S, 's'),
    (Key::T, 't'),
    (Key::U, 'u'),
    (Key::V, 'v'),
    (Key::W, 'w'),
    (Key::X, 'x'),
    (Key::Y, 'y'),
    (Key::Z, 'z'),
];

/// A window that shows the latest frame and feeds key presses back to the
/// executor. Runs on the calling thread.
pub struct Visualizer {
    frame: SharedFrame,
    controls: ControlHandle,
    config: Config,
}

impl Visualizer {
    pub fn new(frame: SharedFrame, controls: ControlHandle, config: Config) -> Visualizer {
        Visualizer {
            frame,
            controls,
            config,
        }
    }

    /// Blocks until the window is closed.
    pub fn run(mut self) {
        let mut window = init_window();
        let mut pixel = RectangleShape::new();
        pixel.set_fill_color(Color::WHITE);

        while window.is_open() {
            while let Some(event) = window.poll_event() {
                match event {
                    Event::Closed => window.close(),
                    Event::LostFocus => self.controls.release_all(),
                    Event::KeyPressed { code, .. } => match code {
                        Key::Escape => window.close(),
                        Key::F5 => {
                            self.config.reset_speed();
                            self.controls.set_cpu_frequency(self.config.cpu_frequency);
                            self.controls.request_reset();
                        }
                        Key::Add => self.change_speed(Config::speed_up),
                        Key::Subtract => self.change_speed(Config::slow_down),
                        _ => self.set_key(code, true),
                    },
                    Event::KeyReleased { code, .. } => self.set_key(code, false),
                    _ => { /* do nothing */ }
                }
            }
            if self.controls.is_stopped() {
                window.close();
            }

            let frame = self.frame.snapshot();
            let scale = (HIGH_RES_WIDTH * SCALE / frame.width) as f32;
            pixel.set_size(Vector2f::new(scale, scale));
            window.clear(Color::BLACK);
            for (i, _) in frame.pixels.iter().enumerate().filter(|(_, p)| **p != 0) {
                let (x, y) = (i % frame.width, i / frame.width);
                pixel.set_position(Vector2f::new(x as f32 * scale, y as f32 * scale));
                window.draw(&pixel);
            }
            window.display();
        }
    }

    fn set_key(&self, code: Key, down: bool) {
        let key = KEY_CHARS
            .iter()
            .find(|(k, _)| *k == code)
            .and_then(|(_, c)| self.config.layout.key_for(*c));
        if let Some(key) = key {
            self.controls.set_key(key, down);
        }
    }

    fn change_speed(&mut self, adjust: fn(&mut Config)) {
        adjust(&mut self.config);
        debug!("cpu frequency {:?}", self.config.cpu_frequency);
        self.controls.set_cpu_frequency(self.config.cpu_frequency);
    }
}

fn init_window() -> RenderWindow {
    let video_mode = VideoMode::new(
        (HIGH_RES_WIDTH * SCALE) as u32,
        (HIGH_RES_HEIGHT * SCALE) as u32,
        32,
    );
    let mut window = RenderWindow::new(
        video_mode,
        "SUPER-CHIP",
        Style::CLOSE,
        &ContextSettings::default(),
    );
    window.set_framerate_limit(60);
    window
}
