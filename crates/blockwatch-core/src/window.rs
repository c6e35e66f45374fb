//! Scan window resolution: turns configured bounds into concrete heights.

use crate::config::{EndHeight, StartHeight};
use crate::error::WatcherError;

/// Exclusive upper bound of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBound {
    /// Live tail: never stop on height.
    Unbounded,
    At(i64),
}

/// The heights a watcher run covers: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: i64,
    pub end: EndBound,
}

impl ScanWindow {
    pub fn is_bounded(&self) -> bool {
        matches!(self.end, EndBound::At(_))
    }

    /// Returns `true` if `height` is at or past the end bound.
    pub fn is_exhausted(&self, height: i64) -> bool {
        match self.end {
            EndBound::Unbounded => false,
            EndBound::At(end) => height >= end,
        }
    }
}

/// Outcome of [`resolve_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub window: ScanWindow,
    /// Chain head observed at resolution time.
    pub head: i64,
    /// The start was taken from the head, so the head block itself counts
    /// as already seen.
    pub follow_head: bool,
}

impl Resolution {
    /// First height the loop will dispatch.
    pub fn first_height(&self) -> i64 {
        if self.follow_head {
            self.window.start + 1
        } else {
            self.window.start
        }
    }
}

/// Resolve configured bounds against the chain head observed at startup.
///
/// - `StartHeight::Head` starts at `head` (no backlog).
/// - `EndHeight::Head` ends at `head` (process the current backlog, then stop).
/// - A start of `0` is bumped to `1`; height 0 does not exist. This also
///   applies to a head of `0`, in which case block 1 is delivered.
/// - A bounded end below the resolved start is a [`WatcherError::Config`].
pub fn resolve_window(
    start: StartHeight,
    end: EndHeight,
    head: i64,
) -> Result<Resolution, WatcherError> {
    let (mut start, mut follow_head) = match start {
        StartHeight::Head => (head, true),
        StartHeight::At(h) => (h, false),
    };
    if start == 0 {
        // a genesis head has nothing to skip: block 1 is the first to deliver
        start = 1;
        follow_head = false;
    }
    let end = match end {
        EndHeight::Unbounded => EndBound::Unbounded,
        EndHeight::Head => EndBound::At(head),
        EndHeight::At(h) => EndBound::At(h),
    };
    if let EndBound::At(end) = end {
        if end < start {
            return Err(WatcherError::Config(format!(
                "invalid block height params: end {end} is below start {start}"
            )));
        }
    }
    Ok(Resolution {
        window: ScanWindow { start, end },
        head,
        follow_head,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_head_starts_at_head() {
        let r = resolve_window(StartHeight::Head, EndHeight::Unbounded, 100).unwrap();
        assert_eq!(r.window.start, 100);
        assert_eq!(r.window.end, EndBound::Unbounded);
        assert_eq!(r.head, 100);
        assert_eq!(r.first_height(), 101);
    }

    #[test]
    fn end_at_head_bounds_the_run() {
        let r = resolve_window(StartHeight::At(10), EndHeight::Head, 100).unwrap();
        assert_eq!(r.window, ScanWindow { start: 10, end: EndBound::At(100) });
        assert_eq!(r.first_height(), 10);
        assert!(r.window.is_bounded());
        assert!(r.window.is_exhausted(100));
        assert!(!r.window.is_exhausted(99));
    }

    #[test]
    fn start_zero_is_bumped_to_one() {
        let r = resolve_window(StartHeight::At(0), EndHeight::At(5), 100).unwrap();
        assert_eq!(r.window.start, 1);
    }

    #[test]
    fn follow_head_at_genesis_delivers_block_one() {
        let r = resolve_window(StartHeight::Head, EndHeight::Unbounded, 0).unwrap();
        assert_eq!(r.window.start, 1);
        assert!(!r.follow_head);
        assert_eq!(r.first_height(), 1);
    }

    #[test]
    fn end_below_start_is_config_error() {
        let err = resolve_window(StartHeight::At(20), EndHeight::At(15), 100).unwrap_err();
        assert!(matches!(err, WatcherError::Config(_)));

        // Following a head that is already past the fixed end.
        let err = resolve_window(StartHeight::Head, EndHeight::At(50), 100).unwrap_err();
        assert!(matches!(err, WatcherError::Config(_)));

        // Height 0 bumped past an end-at-genesis head.
        let err = resolve_window(StartHeight::At(0), EndHeight::Head, 0).unwrap_err();
        assert!(matches!(err, WatcherError::Config(_)));
    }

    #[test]
    fn resolved_end_never_below_start() {
        let starts = [-1, 0, 1, 10, 99, 100, 150];
        let ends = [-1, 0, 1, 10, 100, 150];
        for head in [0, 1, 100] {
            for &s in &starts {
                for &e in &ends {
                    let res = resolve_window(StartHeight::from_raw(s), EndHeight::from_raw(e), head);
                    if let Ok(r) = res {
                        if let EndBound::At(end) = r.window.end {
                            assert!(end >= r.window.start, "s={s} e={e} head={head}");
                        }
                        assert!(r.window.start >= 1 || (s <= -1 && head < 1));
                    }
                }
            }
        }
    }

    #[test]
    fn empty_window_is_valid() {
        let r = resolve_window(StartHeight::At(5), EndHeight::At(5), 100).unwrap();
        assert!(r.window.is_exhausted(r.first_height()));
    }
}
