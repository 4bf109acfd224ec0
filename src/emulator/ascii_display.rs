use super::framebuffer::Framebuffer;

/// Renders a frame as text, one line per row, `@` for lit pixels.
pub fn render(pixels: &[u8], width: usize, height: usize) -> String {
    let mut out = String::with_capacity((width + 1) * height);
    for (y, row) in pixels.chunks(width).take(height).enumerate() {
        if y > 0 {
            out.push('\n');
        }
        out.extend(row.iter().map(|p| if *p != 0 { '@' } else { ' ' }));
    }
    out
}

pub fn render_framebuffer(fb: &Framebuffer) -> String {
    render(fb.pixels(), fb.width(), fb.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_rows() {
        assert_eq!(render(&[1, 0, 0, 0, 0xFF, 0], 3, 2), "@  \n @ ");
    }

    #[test]
    fn test_render_blank_framebuffer() {
        let text = render_framebuffer(&Framebuffer::new());
        assert_eq!(text.lines().count(), 32);
        assert!(text.lines().all(|line| line.len() == 64 && line.trim().is_empty()));
    }
}
