//! Sustain and release markers.
//!
//! A marker names a phase boundary: marker `p` sits at the start of phase
//! `p`, and `p == phase_count` is the natural end. Its kind is two
//! independent bits:
//!
//! - `hold`: playback stops at the boundary until the marker's release
//!   event arrives ("sustain" kinds). Without it the marker only matters
//!   at release time ("release" kinds).
//! - `skip`: on release, if playback has not reached the boundary yet it
//!   jumps there directly. Without it playback just continues.

/// Number of independent markers (and release events) per envelope.
pub const MARKER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerKind {
    pub hold: bool,
    pub skip: bool,
}

impl MarkerKind {
    pub const SUSTAIN_SKIP: MarkerKind = MarkerKind {
        hold: true,
        skip: true,
    };
    pub const SUSTAIN_NO_SKIP: MarkerKind = MarkerKind {
        hold: true,
        skip: false,
    };
    pub const RELEASE_SKIP: MarkerKind = MarkerKind {
        hold: false,
        skip: true,
    };
    pub const RELEASE_NO_SKIP: MarkerKind = MarkerKind {
        hold: false,
        skip: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    /// Boundary index, or -1 when unused.
    pub phase: isize,
    pub kind: MarkerKind,
}

impl Marker {
    pub const UNUSED: Marker = Marker {
        phase: -1,
        kind: MarkerKind::RELEASE_NO_SKIP,
    };

    pub fn is_used(&self) -> bool {
        self.phase >= 0
    }

    /// Boundary index when used.
    pub fn boundary(&self) -> Option<usize> {
        usize::try_from(self.phase).ok()
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::UNUSED
    }
}
