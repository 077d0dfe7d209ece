//! The 64×32 monochrome framebuffer.
//!
//! Sprites clip at the right and bottom edges.
//! A sprite pixel landing on a lit pixel marks it as a [`Pixel::Collision`] until the next draw.

/// The width of the screen in pixels.
pub const WIDTH: usize = 64;
/// The height of the screen in pixels.
pub const HEIGHT: usize = 32;

/// The state of a single pixel.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
#[repr(u8)]
pub enum Pixel {
    /// The pixel is off.
    #[default]
    Empty = 0,
    /// The pixel is on.
    Set = 1,
    /// The pixel was on and was hit by the last sprite drawn.
    ///
    /// This is a transient state which is cleared at the start of the next draw.
    Collision = 2,
}
impl Pixel {
    /// Whether the pixel is not [`Pixel::Empty`].
    pub fn is_lit(self) -> bool {
        self != Pixel::Empty
    }
}
impl From<Pixel> for u8 {
    fn from(value: Pixel) -> Self {
        value as u8
    }
}

/// The screen's pixel grid.
///
/// The grid is stored column-major: it is indexed by `x` (`0..WIDTH`), then `y` (`0..HEIGHT`).
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    grid: Box<[[Pixel; HEIGHT]; WIDTH]>
}

impl Framebuffer {
    /// Creates a new, empty framebuffer.
    pub fn new() -> Self {
        Self { grid: Box::new([[Pixel::Empty; HEIGHT]; WIDTH]) }
    }

    /// Gets the pixel at the given coordinates, or `None` if they are off-screen.
    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        self.grid.get(x)?.get(y).copied()
    }

    /// Gets the whole pixel grid.
    pub fn grid(&self) -> &[[Pixel; HEIGHT]; WIDTH] {
        &self.grid
    }

    /// Clears the screen.
    pub fn clear(&mut self) {
        self.grid.iter_mut()
            .flatten()
            .for_each(|p| *p = Pixel::Empty);
    }

    /// Clears every [`Pixel::Collision`] pixel.
    pub fn clear_collisions(&mut self) {
        self.grid.iter_mut()
            .flatten()
            .filter(|p| **p == Pixel::Collision)
            .for_each(|p| *p = Pixel::Empty);
    }

    /// Draws a sprite with its top-left corner at `(x0, y0)`.
    ///
    /// Each byte of `rows` is one row of 8 pixels, most significant bit leftmost.
    /// A set bit turns an empty pixel on; if the pixel was already on,
    /// it is instead marked as a [`Pixel::Collision`].
    /// Pixels off the right or bottom edges of the screen are not drawn.
    ///
    /// Collision pixels from the previous draw are cleared first.
    ///
    /// This returns whether a collision occurred.
    ///
    /// # Example
    /// ```
    /// use chip8_ensemble::sim::device::{Framebuffer, Pixel};
    ///
    /// let mut fb = Framebuffer::new();
    /// assert!(!fb.draw_sprite(0, 0, &[0b1100_0000]));
    /// assert_eq!(fb.get(1, 0), Some(Pixel::Set));
    ///
    /// assert!(fb.draw_sprite(1, 0, &[0b1000_0000]));
    /// assert_eq!(fb.get(1, 0), Some(Pixel::Collision));
    /// ```
    pub fn draw_sprite(&mut self, x0: u8, y0: u8, rows: &[u8]) -> bool {
        self.clear_collisions();

        let (x0, y0) = (usize::from(x0), usize::from(y0));
        let mut collision = false;
        for (y, &row) in (y0..).zip(rows.iter().take(HEIGHT)) {
            for col in (0..8).take_while(|col| x0 + col < WIDTH) {
                if row & (0x80 >> col) == 0 { continue; }

                let Some(px) = self.grid[x0 + col].get_mut(y) else { continue };
                *px = match *px {
                    Pixel::Empty => Pixel::Set,
                    Pixel::Set | Pixel::Collision => {
                        collision = true;
                        Pixel::Collision
                    },
                };
            }
        }

        collision
    }
}
impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.grid.iter()
            .flatten()
            .filter(|p| p.is_lit())
            .count();

        f.debug_struct("Framebuffer")
            .field("lit", &lit)
            .finish_non_exhaustive()
    }
}
