//! Line (I/O pin) abstractions
//!
//! Lines are addressed by index and accessed through a shared register
//! view, so the foreground and background workers can all reach the same
//! physical pins. Exclusive use is arbitrated one level up by the line
//! ownership registry, not here.

/// Number of physical I/O lines on the board
pub const LINE_COUNT: usize = 32;

/// One physical I/O line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line(u8);

impl Line {
    /// Create a line from its index, `None` if out of range
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < LINE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Interpret a signed pin number
    ///
    /// Negative numbers mean "no line" and map to `Ok(None)`. Indices past
    /// the last line are an error.
    pub fn from_pin(pin: i32) -> Result<Option<Self>, InvalidLine> {
        if pin < 0 {
            return Ok(None);
        }
        u8::try_from(pin)
            .ok()
            .and_then(Self::new)
            .map(Some)
            .ok_or(InvalidLine)
    }

    /// Line index
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask for this line in a 32-bit port register
    pub const fn mask(self) -> u32 {
        1 << self.0
    }

    /// Iterate over every line on the board
    pub fn all() -> impl Iterator<Item = Line> {
        (0..LINE_COUNT as u8).map(Line)
    }
}

/// Line index outside the board's range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLine;

/// Logic level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    /// Opposite level
    pub const fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Level as a register bit (1 = high)
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Input,
    Output,
}

/// Shared line register access
///
/// All methods take `&self`: implementations use interior mutability so a
/// single board handle can be used from the foreground and from workers.
pub trait LineIo {
    /// Set the direction register bit for a line
    fn set_direction(&self, line: Line, direction: Direction);

    /// Read back the direction register bit
    fn direction(&self, line: Line) -> Direction;

    /// Set the output register bit (only visible while the line is an output)
    fn set_output(&self, line: Line, level: Level);

    /// Read back the output register bit
    fn output(&self, line: Line) -> Level;

    /// Actual level on the line
    ///
    /// For an output this is what the board drives; for an input it is
    /// whatever the external circuit applies.
    fn level(&self, line: Line) -> Level;

    /// Make the line an output driving high
    fn high(&self, line: Line) {
        self.set_output(line, Level::High);
        self.set_direction(line, Direction::Output);
    }

    /// Make the line an output driving low
    fn low(&self, line: Line) {
        self.set_output(line, Level::Low);
        self.set_direction(line, Direction::Output);
    }

    /// Flip the output register bit, returning the new value
    fn toggle(&self, line: Line) -> Level {
        let next = self.output(line).inverted();
        self.set_output(line, next);
        next
    }

    /// Make the line an input and read it
    fn input(&self, line: Line) -> Level {
        self.set_direction(line, Direction::Input);
        self.level(line)
    }

    /// Flip the direction register bit, returning the new direction
    fn reverse(&self, line: Line) -> Direction {
        let next = match self.direction(line) {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        };
        self.set_direction(line, next);
        next
    }

    /// Levels of a contiguous group of lines, `start` in bit 0
    fn levels(&self, start: Line, end: Line) -> u32 {
        range(start, end).fold(0, |acc, (bit, line)| acc | (self.level(line).bit() << bit))
    }

    /// Direction bits of a contiguous group of lines, `start` in bit 0
    fn directions(&self, start: Line, end: Line) -> u32 {
        range(start, end).fold(0, |acc, (bit, line)| {
            acc | ((self.direction(line) == Direction::Output) as u32) << bit
        })
    }

    /// Output register bits of a contiguous group of lines, `start` in bit 0
    fn outputs(&self, start: Line, end: Line) -> u32 {
        range(start, end).fold(0, |acc, (bit, line)| acc | (self.output(line).bit() << bit))
    }

    /// Set output bits of a contiguous group of lines from `pattern`
    fn set_outputs(&self, start: Line, end: Line, pattern: u32) {
        for (bit, line) in range(start, end) {
            self.set_output(line, Level::from(pattern >> bit & 1 == 1));
        }
    }

    /// Set direction bits of a contiguous group of lines from `pattern`
    fn set_directions(&self, start: Line, end: Line, pattern: u32) {
        for (bit, line) in range(start, end) {
            let direction = if pattern >> bit & 1 == 1 {
                Direction::Output
            } else {
                Direction::Input
            };
            self.set_direction(line, direction);
        }
    }
}

/// Lines from `start` to `end` inclusive with their bit offsets
fn range(start: Line, end: Line) -> impl Iterator<Item = (u32, Line)> {
    let (lo, hi) = if start.0 <= end.0 {
        (start.0, end.0)
    } else {
        (end.0, start.0)
    };
    (lo..=hi).map(move |i| (u32::from(i - lo), Line(i)))
}
