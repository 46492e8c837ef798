use image::{
    ImageBuffer,
    Luma,
};

pub const FRAME_HEIGHT: usize = 505;

/// 213 subcarrier cycles at 4 samples per cycle.
pub const FRAME_WIDTH: usize = 852;

pub const FIRST_FIELD_START: usize = 10;
pub const FIRST_FIELD_END: usize = 262;
pub const SECOND_FIELD_START: usize = 271;
pub const SECOND_FIELD_OFFSET: usize = 273;
pub const SECOND_FIELD_END: usize = 525;

/// Maps a line position to the frame row it is written to.
///
/// The first field fills the even rows, the second field the odd rows.
/// Positions inside the vertical interval have no row.
pub fn output_row(line: f64) -> Option<usize> {
    let position = (line + 0.5).floor();
    if !(0.0..SECOND_FIELD_END as f64).contains(&position) {
        return None;
    }
    let position = position as usize;

    if position < FIRST_FIELD_START {
        None
    }
    else if position < FIRST_FIELD_END {
        Some((position - FIRST_FIELD_START) * 2)
    }
    else if position < SECOND_FIELD_START {
        None
    }
    else {
        position
            .checked_sub(SECOND_FIELD_OFFSET)
            .map(|offset| offset * 2 + 1)
    }
}

/// An interlaced frame of 4x subcarrier samples.
///
/// Column 0 of every written row carries the color phase flag of that row.
///
/// The frame is reused for the whole stream and never cleared. Rows that are
/// not written for a frame keep whatever the previous frame left there.
#[derive(Clone, derive_more::Debug)]
pub struct Frame {
    #[debug(skip)]
    data: Vec<u16>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            data: vec![0; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        FRAME_WIDTH
    }

    #[inline]
    pub fn height(&self) -> usize {
        FRAME_HEIGHT
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> u16 {
        self.data[row * FRAME_WIDTH + column]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[u16] {
        &self.data[row * FRAME_WIDTH..][..FRAME_WIDTH]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [u16] {
        &mut self.data[row * FRAME_WIDTH..][..FRAME_WIDTH]
    }

    /// All rows, top to bottom.
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    pub fn to_image(&self) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        ImageBuffer::from_fn(FRAME_WIDTH as u32, FRAME_HEIGHT as u32, |x, y| {
            Luma([self.get(y as usize, x as usize)])
        })
    }
}
