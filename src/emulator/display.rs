use super::framebuffer::Resolution;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives finished frames from the machine. Implementations own all
/// rendering; the machine only hands over pixels.
pub trait Display {
    /// Called at most once per I/O tick with the whole frame, row-major, one
    /// byte per pixel (nonzero = on).
    fn redraw(&mut self, pixels: &[u8], width: usize, height: usize);

    /// Called whenever the framebuffer switches between low and high resolution.
    fn resolution_changed(&mut self, _resolution: Resolution) {}
}

/// Drops every frame. Used when the machine runs without a frontend.
pub struct NullDisplay;

impl Display for NullDisplay {
    fn redraw(&mut self, _pixels: &[u8], _width: usize, _height: usize) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub resolution: Resolution,
    /// Bumped on every delivered frame so readers can skip repaints.
    pub generation: u64,
}

impl Default for Frame {
    fn default() -> Self {
        let (width, height) = Resolution::Low.dimensions();
        Frame {
            pixels: vec![0; width * height],
            width,
            height,
            resolution: Resolution::Low,
            generation: 0,
        }
    }
}

/// A display that copies each delivered frame into shared memory, so a
/// presentation layer on another thread can read the latest snapshot.
#[derive(Clone, Default)]
pub struct SharedFrame(Arc<Mutex<Frame>>);

impl SharedFrame {
    pub fn new() -> SharedFrame {
        SharedFrame::default()
    }

    pub fn snapshot(&self) -> Frame {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn generation(&self) -> u64 {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).generation
    }
}

impl Display for SharedFrame {
    fn redraw(&mut self, pixels: &[u8], width: usize, height: usize) {
        let mut frame = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        frame.pixels.clear();
        frame.pixels.extend_from_slice(pixels);
        frame.width = width;
        frame.height = height;
        frame.generation += 1;
    }

    fn resolution_changed(&mut self, resolution: Resolution) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).resolution = resolution;
    }
}
