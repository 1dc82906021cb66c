//! Toolpath parser and motion simulation
//!
//! Parses programs in the legacy numeric-control dialect well enough to
//! preview them: straight rapid (`G0`) and feed (`G1`) moves under the
//! `G90`/`G91` distance modes, with everything else forwarded untouched by
//! the executor and ignored here. Parsing is best-effort: a line that
//! cannot be understood is skipped, never an error.

use routerkit_core::{PathSegment, Position, Preview, Result};
use std::path::Path;

/// Modal state threaded through a program: current position and distance mode
#[derive(Debug, Clone, Copy)]
pub(crate) struct MotionState {
    /// Simulated machine position
    pub position: Position,
    /// True in absolute mode (G90), false in incremental (G91)
    pub absolute: bool,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            position: Position::ZERO,
            absolute: true,
        }
    }
}

impl MotionState {
    /// Consume one physical line, returning the segment it produces, if any
    ///
    /// Updates the distance mode on `G90`/`G91` tokens (last occurrence in
    /// scan order wins) and the simulated position on motion lines. A
    /// malformed axis number skips the whole move.
    pub fn apply_line(&mut self, raw: &str) -> Option<PathSegment> {
        let residue = strip_comment(raw).trim();
        if residue.is_empty() {
            return None;
        }
        let code = residue.to_ascii_uppercase();

        for token in code.split_whitespace() {
            match token {
                "G90" => self.absolute = true,
                "G91" => self.absolute = false,
                _ => {}
            }
        }

        if !(code.starts_with("G0") || code.starts_with("G1")) {
            return None;
        }
        let rapid = code.starts_with("G0");

        let Some(end) = self.extract_move(&code) else {
            tracing::trace!("skipping unparseable motion line: {:?}", residue);
            return None;
        };
        let start = self.position;
        self.position = end;
        Some(PathSegment { start, end, rapid })
    }

    /// Compute the target of a motion line from its axis words
    ///
    /// Absolute words replace a component, incremental words add to the
    /// pre-move position. Returns `None` on any malformed number.
    fn extract_move(&self, code: &str) -> Option<Position> {
        let mut target = self.position;
        for token in code.split_whitespace() {
            let axis = match token.chars().next() {
                Some('X') => 0,
                Some('Y') => 1,
                Some('Z') => 2,
                _ => continue,
            };
            let value: f64 = token[1..].parse().ok()?;
            *target.component_mut(axis) = if self.absolute {
                value
            } else {
                self.position.component(axis) + value
            };
        }
        Some(target)
    }
}

/// Strip an inline comment: everything from the first `;` or `(` onward
fn strip_comment(line: &str) -> &str {
    match line.find([';', '(']) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Toolpath parser producing preview geometry
///
/// Simulates the motion model across a whole program to build the segment
/// list and bounding box shown to the operator before a job starts.
pub struct ToolpathParser {
    motion: MotionState,
}

impl ToolpathParser {
    /// Create a parser at the machine origin in absolute mode
    pub fn new() -> Self {
        Self {
            motion: MotionState::default(),
        }
    }

    /// Reset position and distance mode
    pub fn reset(&mut self) {
        self.motion = MotionState::default();
    }

    /// Parse a whole program from text
    pub fn parse_text(&mut self, text: &str) -> Preview {
        self.reset();
        let mut segments = Vec::new();
        let mut bounds: Option<(Position, Position)> = None;

        for raw in text.lines() {
            if let Some(segment) = self.motion.apply_line(raw) {
                let (lo, hi) = bounds.get_or_insert((segment.start, segment.start));
                *lo = lo.min(&segment.start).min(&segment.end);
                *hi = hi.max(&segment.start).max(&segment.end);
                segments.push(segment);
            }
        }

        let (bbox_min, bbox_max) = bounds.unwrap_or((Position::ZERO, Position::ZERO));
        Preview {
            segments,
            bbox_min,
            bbox_max,
        }
    }

    /// Parse a program file, reading it lossy on invalid UTF-8
    pub fn parse_file(&mut self, path: &Path) -> Result<Preview> {
        let bytes = std::fs::read(path)?;
        Ok(self.parse_text(&String::from_utf8_lossy(&bytes)))
    }
}

impl Default for ToolpathParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(text: &str) -> Preview {
        ToolpathParser::new().parse_text(text)
    }

    #[test]
    fn absolute_moves_produce_segments() {
        let p = preview("G90\nG0 X10 Y0\nG1 X10 Y20 Z-1\n");
        assert_eq!(p.segments.len(), 2);
        assert!(p.segments[0].rapid);
        assert!(!p.segments[1].rapid);
        assert_eq!(p.segments[0].start, Position::ZERO);
        assert_eq!(p.segments[0].end, Position::new(10.0, 0.0, 0.0));
        assert_eq!(p.segments[1].end, Position::new(10.0, 20.0, -1.0));
    }

    #[test]
    fn incremental_moves_accumulate() {
        let p = preview("G91\nG1 X5\nG1 Y5\nG1 Z-2\n");
        assert_eq!(p.segments.len(), 3);
        assert_eq!(p.segments[2].end, Position::new(5.0, 5.0, -2.0));
    }

    #[test]
    fn mixed_case_mode_tokens_are_recognized() {
        let p = preview("g91\ng1 x2.5\n");
        assert_eq!(p.segments[0].end, Position::new(2.5, 0.0, 0.0));
    }

    #[test]
    fn last_mode_token_in_line_wins() {
        let p = preview("G90 G91\nG1 X5\nG1 X5\n");
        assert_eq!(p.segments[1].end.x, 10.0);
    }

    #[test]
    fn comments_are_stripped() {
        let p = preview("G0 X10 ; rapid to start\nG1 X20 (cut)\n(whole line comment)\n");
        assert_eq!(p.segments.len(), 2);
        assert_eq!(p.segments[1].end.x, 20.0);
    }

    #[test]
    fn motion_line_without_axes_is_degenerate() {
        let p = preview("G0 X10\nG1\n");
        assert_eq!(p.segments.len(), 2);
        assert_eq!(p.segments[1].start, p.segments[1].end);
    }

    #[test]
    fn non_motion_lines_emit_nothing() {
        let p = preview("M3 S12000\nF600\nM5\n");
        assert!(p.segments.is_empty());
    }

    #[test]
    fn malformed_axis_number_skips_the_line() {
        let p = preview("G1 Xnope Y5\nG1 X3\n");
        assert_eq!(p.segments.len(), 1);
        assert_eq!(p.segments[0].end, Position::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn empty_and_comment_only_programs_have_zero_bbox() {
        for text in ["", "\n\n", "; nothing here\n(still nothing)\n"] {
            let p = preview(text);
            assert!(p.segments.is_empty());
            assert_eq!(p.bbox_min, Position::ZERO);
            assert_eq!(p.bbox_max, Position::ZERO);
        }
    }

    #[test]
    fn bbox_spans_negative_coordinates() {
        let p = preview("G0 X-5 Y3\nG1 Z-2\nG0 X8\n");
        assert_eq!(p.bbox_min, Position::new(-5.0, 0.0, -2.0));
        assert_eq!(p.bbox_max, Position::new(8.0, 3.0, 0.0));
    }

    #[test]
    fn parse_file_reads_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.gcode");
        let mut bytes = b"G0 X1\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\nG1 Y2\n");
        std::fs::write(&path, bytes).unwrap();

        let p = ToolpathParser::new().parse_file(&path).unwrap();
        assert_eq!(p.segments.len(), 2);
    }
}
