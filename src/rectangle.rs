//! Iterable rectangle used by the demonstration run.

use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub width: u32,
    pub height: u32,
}

/// One element yielded when iterating a [`Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width(u32),
    Height(u32),
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Width(_) => "width",
            Dimension::Height(_) => "height",
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Dimension::Width(v) | Dimension::Height(v) => *v,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"{}\": {}}}", self.name(), self.value())
    }
}

// Serialises as a single-key map, e.g. {"width": 10}.
impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.name(), &self.value())?;
        map.end()
    }
}

impl Rectangle {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width first, then height. Each call starts a fresh iteration.
    pub fn iter(&self) -> Dimensions {
        Dimensions {
            rect: *self,
            pos: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Rectangle {
    type Item = Dimension;
    type IntoIter = Dimensions;

    fn into_iter(self) -> Dimensions {
        self.iter()
    }
}

impl IntoIterator for Rectangle {
    type Item = Dimension;
    type IntoIter = Dimensions;

    fn into_iter(self) -> Dimensions {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Dimensions {
    rect: Rectangle,
    pos: u8,
}

impl Iterator for Dimensions {
    type Item = Dimension;

    fn next(&mut self) -> Option<Dimension> {
        let item = match self.pos {
            0 => Dimension::Width(self.rect.width),
            1 => Dimension::Height(self.rect.height),
            _ => return None,
        };
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = 2usize.saturating_sub(self.pos as usize);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Dimensions {}
impl FusedIterator for Dimensions {}
