use super::basics::{HIGH_RES_HEIGHT, HIGH_RES_WIDTH, LOW_RES_HEIGHT, LOW_RES_WIDTH};
use super::display::Display;

const PIXEL_ON: u8 = 0xFF;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Resolution {
    Low,
    High,
}

impl Resolution {
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            Resolution::Low => (LOW_RES_WIDTH, LOW_RES_HEIGHT),
            Resolution::High => (HIGH_RES_WIDTH, HIGH_RES_HEIGHT),
        }
    }
}

/// Monochrome pixel grid with XOR drawing. Tracks whether anything changed
/// since the last flush so unchanged frames are never delivered twice.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    pixels: Vec<u8>,
    resolution: Resolution,
    width: usize,
    height: usize,
    dirty: bool,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        let (width, height) = Resolution::Low.dimensions();
        Framebuffer {
            pixels: vec![0; width * height],
            resolution: Resolution::Low,
            width,
            height,
            dirty: true,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_high_res(&self) -> bool {
        self.resolution == Resolution::High
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Row-major pixels, nonzero = on.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 0);
        self.dirty = true;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (y % self.height) * self.width + (x % self.width)
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[self.index(x, y)] != 0
    }

    /// Flips one pixel and returns whether it is on afterwards.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let i = self.index(x, y);
        self.pixels[i] ^= PIXEL_ON;
        self.dirty = true;
        self.pixels[i] != 0
    }

    /// Switches resolution, which always leaves a blank grid. Returns whether
    /// anything changed; `display` is only told about actual changes.
    pub fn set_resolution(&mut self, resolution: Resolution, display: &mut dyn Display) -> bool {
        if self.resolution == resolution {
            return false;
        }
        let (width, height) = resolution.dimensions();
        self.resolution = resolution;
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height];
        self.dirty = true;
        display.resolution_changed(resolution);
        true
    }

    pub fn scroll_up(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let shift = n.min(self.height) * self.width;
        self.pixels.copy_within(shift.., 0);
        let len = self.pixels.len();
        self.pixels[len - shift..].iter_mut().for_each(|p| *p = 0);
        self.dirty = true;
    }

    pub fn scroll_down(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let shift = n.min(self.height) * self.width;
        let len = self.pixels.len();
        self.pixels.copy_within(..len - shift, shift);
        self.pixels[..shift].iter_mut().for_each(|p| *p = 0);
        self.dirty = true;
    }

    pub fn scroll_left(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let shift = n.min(self.width);
        for row in self.pixels.chunks_mut(self.width) {
            row.copy_within(shift.., 0);
            let len = row.len();
            row[len - shift..].iter_mut().for_each(|p| *p = 0);
        }
        self.dirty = true;
    }

    pub fn scroll_right(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let shift = n.min(self.width);
        for row in self.pixels.chunks_mut(self.width) {
            let len = row.len();
            row.copy_within(..len - shift, shift);
            row[..shift].iter_mut().for_each(|p| *p = 0);
        }
        self.dirty = true;
    }

    /// Hands the frame to `display` if it changed since the last flush.
    pub fn flush(&mut self, display: &mut dyn Display) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        display.redraw(&self.pixels, self.width, self.height);
        true
    }
}
