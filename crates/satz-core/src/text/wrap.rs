//! Knuth-Plass line breaking over shaped lines, following the
//! box/glue/penalty model.

use glam::Vec2;

use crate::text::{Alignment, LineLayout};
use crate::{Error, ErrorKind, Result};

const LINE_INFINITY: i32 = 10000;

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    /// An unbreakable chunk; `id` is the exclusive end index of its shapes.
    Box { id: u32 },
    Glue { stretch: i32, shrink: i32 },
    Penalty { penalty: i32, flagged: bool },
}

#[derive(Clone, Copy, Debug)]
struct Node {
    width: i32,
    kind: NodeKind,
}

impl Node {
    fn is_box(&self) -> bool {
        matches!(self.kind, NodeKind::Box { .. })
    }
}

/// A feasible breakpoint. Breakpoints form chains through `prev` and are
/// reference counted into a free list, since many active candidates can
/// share one tail.
#[derive(Clone, Copy, Debug, Default)]
struct Breakpoint {
    index: u32,
    demerits: f64,
    ratio: f64,
    line: i32,
    fitness_class: usize,
    total_width: i32,
    total_stretch: i32,
    total_shrink: i32,
    prev: Option<u32>,
    refs: i32,
}

/// One row of the final paragraph.
#[derive(Clone, Copy, Debug)]
struct Row {
    /// Node index the row breaks at.
    breakpoint: u32,
    /// Adjustment ratio of the row's glue.
    ratio: f64,
    width: f32,
}

#[derive(Clone, Copy, Default)]
struct Candidate {
    active: Option<u32>,
    demerits: f64,
    ratio: f64,
}

/// Breaks a [`LineLayout`] into rows of a given width, writing per-glyph
/// offsets into the layout.
pub struct WordWrap {
    nodes: Vec<Node>,
    arena: Vec<Breakpoint>,
    free: Vec<u32>,
    active: Vec<u32>,

    line_lengths: Vec<i32>,
    sum_width: i32,
    sum_stretch: i32,
    sum_shrink: i32,

    tolerance: f64,
    flagged_demerit: f64,
    line_demerit: f64,
    fitness_demerit: f64,
}

impl Default for WordWrap {
    fn default() -> WordWrap {
        WordWrap::new()
    }
}

impl WordWrap {
    pub fn new() -> WordWrap {
        WordWrap {
            nodes: Vec::new(),
            arena: Vec::new(),
            free: Vec::new(),
            active: Vec::new(),
            line_lengths: vec![0],
            sum_width: 0,
            sum_stretch: 0,
            sum_shrink: 0,
            tolerance: 10.0,
            flagged_demerit: 100.0,
            line_demerit: 10.0,
            fitness_demerit: 0.0,
        }
    }

    fn add_box(&mut self, width: f32, id: u32) {
        self.nodes.push(Node {
            width: width as i32,
            kind: NodeKind::Box { id },
        });
    }

    fn add_glue(&mut self, width: f32, stretch: f32, shrink: f32) {
        self.nodes.push(Node {
            width: width as i32,
            kind: NodeKind::Glue {
                stretch: stretch as i32,
                shrink: shrink as i32,
            },
        });
    }

    fn add_penalty(&mut self, width: f32, penalty: i32, flagged: bool) {
        self.nodes.push(Node {
            width: width as i32,
            kind: NodeKind::Penalty { penalty, flagged },
        });
    }

    fn add_closing_penalty(&mut self) {
        self.add_glue(0.0, LINE_INFINITY as f32, 0.0);
        self.add_penalty(0.0, -LINE_INFINITY, true);
    }

    fn new_breakpoint(
        &mut self,
        index: u32,
        demerits: f64,
        ratio: f64,
        line: i32,
        fitness_class: usize,
        total_width: i32,
        total_stretch: i32,
        total_shrink: i32,
        prev: Option<u32>,
    ) -> u32 {
        let breakpoint = Breakpoint {
            index,
            demerits,
            ratio,
            line,
            fitness_class,
            total_width,
            total_stretch,
            total_shrink,
            prev,
            refs: 1,
        };

        match self.free.pop() {
            Some(slot) => {
                self.arena[slot as usize] = breakpoint;
                slot
            }
            None => {
                self.arena.push(breakpoint);
                (self.arena.len() - 1) as u32
            }
        }
    }

    /// Drops one reference, freeing the breakpoint and walking down its
    /// chain while the counts reach zero.
    fn release(&mut self, index: u32) {
        let mut current = index;
        loop {
            let breakpoint = &mut self.arena[current as usize];
            breakpoint.refs -= 1;
            if breakpoint.refs > 0 {
                break;
            }

            let prev = breakpoint.prev;
            self.free.push(current);

            match prev {
                Some(prev) => current = prev,
                None => break,
            }
        }
    }

    /// Adjustment ratio for a line from `start` to the current node.
    fn compute_cost(&self, start: u32, node: &Node) -> f64 {
        let start = &self.arena[start as usize];
        let mut width = self.sum_width - start.total_width;

        // If the line length list is too short, the last value is used for
        // all subsequent lines.
        let line_length = if (start.line as usize) < self.line_lengths.len() - 1 {
            self.line_lengths[start.line as usize]
        } else {
            self.line_lengths[self.line_lengths.len() - 1]
        };

        if let NodeKind::Penalty { .. } = node.kind {
            width += node.width;
        }

        if width < line_length {
            let stretch = self.sum_stretch - start.total_stretch;
            if stretch > 0 {
                (line_length - width) as f64 / stretch as f64
            } else {
                LINE_INFINITY as f64
            }
        } else if width > line_length {
            let shrink = self.sum_shrink - start.total_shrink;
            if shrink > 0 {
                (line_length - width) as f64 / shrink as f64
            } else {
                LINE_INFINITY as f64
            }
        } else {
            0.0
        }
    }

    /// Considers breaking at node `index`, updating the set of active
    /// breakpoints. The active list stays sorted by line number.
    fn mainloop(&mut self, index: u32, node: &Node) {
        if self.active.is_empty() {
            return;
        }

        let mut iter = 0usize;
        let mut active = Some(self.active[0]);

        let forced_break = matches!(
            node.kind,
            NodeKind::Penalty { penalty, .. } if penalty == -LINE_INFINITY
        );

        while active.is_some() {
            let mut candidate = [Candidate {
                active: None,
                demerits: f64::INFINITY,
                ratio: 0.0,
            }; 4];

            // Walk the active nodes of the current line, collecting the
            // best feasible break per fitness class.
            while let Some(current) = active {
                let current_line = self.arena[current as usize].line + 1;
                let ratio = self.compute_cost(current, node);

                // Deactivate once the line cannot start here anymore, or on
                // a forced break.
                if ratio < -1.0 || forced_break {
                    self.active.remove(iter);
                    self.arena[current as usize].refs -= 1;
                } else {
                    iter += 1;
                }

                if ratio >= -1.0 && ratio <= self.tolerance {
                    let mut demerits =
                        (self.line_demerit + 100.0 * ratio.abs().powi(3)).powi(2);

                    if let NodeKind::Penalty { penalty, flagged } = node.kind {
                        if penalty > 0 {
                            demerits += (penalty as f64).powi(2);
                        } else if penalty != -LINE_INFINITY {
                            demerits -= (penalty as f64).powi(2);
                        }

                        let previous_node =
                            self.nodes[self.arena[current as usize].index as usize];
                        if let NodeKind::Penalty {
                            flagged: previous_flagged,
                            ..
                        } = previous_node.kind
                        {
                            if flagged && previous_flagged {
                                demerits += self.flagged_demerit;
                            }
                        }
                    }

                    let fitness_class = if ratio < -0.5 {
                        0
                    } else if ratio <= 0.5 {
                        1
                    } else if ratio <= 1.0 {
                        2
                    } else {
                        3
                    };

                    // Penalize very different fitness classes on adjacent
                    // lines.
                    let class_jump = fitness_class as i32
                        - self.arena[current as usize].fitness_class as i32;
                    if class_jump.abs() > 1 {
                        demerits += self.fitness_demerit;
                    }

                    demerits += self.arena[current as usize].demerits;

                    if demerits < candidate[fitness_class].demerits {
                        if let Some(old) = candidate[fitness_class].active {
                            self.release(old);
                        }

                        self.arena[current as usize].refs += 1;
                        candidate[fitness_class] = Candidate {
                            active: Some(current),
                            demerits,
                            ratio,
                        };
                    }
                }

                if self.arena[current as usize].refs == 0 {
                    self.release(current);
                }

                active = None;
                if iter < self.active.len() {
                    let next = self.active[iter];
                    active = Some(next);

                    // Insert the new candidates before moving on to active
                    // nodes of the next line.
                    if self.arena[next as usize].line >= current_line {
                        break;
                    }
                }
            }

            // Width, stretch and shrink from this break up to the next box
            // or forced penalty.
            let mut width = self.sum_width;
            let mut stretch = self.sum_stretch;
            let mut shrink = self.sum_shrink;
            for i in (index as usize)..self.nodes.len() {
                let n = self.nodes[i];
                match n.kind {
                    NodeKind::Glue {
                        stretch: s,
                        shrink: sh,
                    } => {
                        width += n.width;
                        stretch += s;
                        shrink += sh;
                    }
                    NodeKind::Box { .. } => break,
                    NodeKind::Penalty { penalty, .. } => {
                        if penalty == -LINE_INFINITY && i > index as usize {
                            break;
                        }
                    }
                }
            }

            for (fitness_class, c) in candidate.into_iter().enumerate() {
                let Some(prev) = c.active else { continue };

                // The candidate's reference is transferred to the new
                // breakpoint's prev pointer.
                let line = self.arena[prev as usize].line + 1;
                let new_node = self.new_breakpoint(
                    index,
                    c.demerits,
                    c.ratio,
                    line,
                    fitness_class,
                    width,
                    stretch,
                    shrink,
                    Some(prev),
                );

                if active.is_some() {
                    self.active.insert(iter, new_node);
                    iter += 1;
                } else {
                    self.active.push(new_node);
                }
            }
        }
    }

    fn break_lines(&mut self) -> Vec<Row> {
        self.active.clear();
        self.sum_width = 0;
        self.sum_stretch = 0;
        self.sum_shrink = 0;

        // Active node for the start of the paragraph
        let initial = self.new_breakpoint(0, 0.0, 0.0, 0, 0, 0, 0, 0, None);
        self.active.push(initial);

        let mut index = 0u32;
        for i in 0..self.nodes.len() {
            let node = self.nodes[i];
            match node.kind {
                NodeKind::Box { .. } => {
                    self.sum_width += node.width;
                }
                NodeKind::Glue { stretch, shrink } => {
                    if i > 0 && self.nodes[i - 1].is_box() {
                        self.mainloop(index, &node);
                    }
                    self.sum_width += node.width;
                    self.sum_stretch += stretch;
                    self.sum_shrink += shrink;
                }
                NodeKind::Penalty { penalty, .. } => {
                    if penalty != LINE_INFINITY {
                        self.mainloop(index, &node);
                    }
                }
            }

            index += 1;

            if self.active.is_empty() {
                break;
            }
        }

        // Pick the chain with the least total demerits.
        let mut best: Option<u32> = None;
        for &candidate in &self.active {
            let breakpoint = &self.arena[candidate as usize];

            if breakpoint.index + 1 < index {
                // Does not reach the end of the paragraph
                continue;
            }

            match best {
                None => best = Some(candidate),
                Some(current)
                    if breakpoint.demerits < self.arena[current as usize].demerits =>
                {
                    best = Some(candidate)
                }
                _ => {}
            }
        }

        let mut rows = Vec::new();
        let mut current = best;
        while let Some(index) = current {
            let breakpoint = self.arena[index as usize];
            let Some(prev) = breakpoint.prev else { break };

            rows.push(Row {
                breakpoint: breakpoint.index,
                ratio: breakpoint.ratio,
                width: (breakpoint.total_width - self.arena[prev as usize].total_width) as f32,
            });

            current = Some(prev);
        }

        let actives = std::mem::take(&mut self.active);
        for breakpoint in actives {
            self.release(breakpoint);
        }

        rows.reverse();
        rows
    }

    /// Breaks `layout` into rows no wider than `width` (growing up to
    /// `max_width` when a single word does not fit) and fills
    /// `layout.offsets` with one offset per visible glyph, relative to the
    /// last row's baseline origin.
    ///
    /// Returns the overall size of the wrapped text.
    pub fn wrap_line(
        &mut self,
        layout: &mut LineLayout,
        width: f32,
        max_width: f32,
        align: Alignment,
    ) -> Result<Vec2> {
        self.nodes.clear();

        let block = align == Alignment::Block;
        let centered = align == Alignment::Middle;

        let mut width = width;
        let mut word_width: f32 = 0.0;

        let mut space: f32 = 0.0;
        let mut stretch: f32 = 0.0;
        let mut shrink: f32 = 0.0;

        for i in 0..layout.shapes().len() {
            let c = layout.shapes()[i];

            if !c.can_break() && !c.must_break() {
                word_width += layout.advance_of(&c);
                continue;
            }

            if space == 0.0 && c.is_space() {
                space = layout.advance_of(&c);
                stretch = space * 2.0;
                shrink = space / 2.0;
            }

            let mut s = space;
            let mut pos = i;

            if !c.is_space() {
                word_width += layout.advance_of(&c);
                s = 0.0;
                pos += 1;
            }

            word_width += 0.5;

            if word_width > width {
                width = word_width;
                if width > max_width {
                    let e = Error::new(
                        ErrorKind::WrapFailed,
                        format!("word of width {} exceeds maximum width {}", width, max_width),
                    );
                    log::warn!("{}", e);
                    return Err(e);
                }
            }

            self.add_box(word_width, pos as u32);

            if block {
                self.add_glue(s, stretch, shrink);
            } else {
                self.add_glue(0.0, width, 0.0);
                self.add_penalty(0.0, 0, false);
                self.add_glue(s, -width, 0.0);
            }

            word_width = 0.0;
        }

        if word_width > 0.0 {
            word_width += 0.5;

            if word_width > width {
                width = word_width;
                if width > max_width {
                    let e = Error::new(
                        ErrorKind::WrapFailed,
                        format!("word of width {} exceeds maximum width {}", width, max_width),
                    );
                    log::warn!("{}", e);
                    return Err(e);
                }
            }

            self.add_box(word_width, layout.shapes().len() as u32);

            if block {
                self.add_glue(space, stretch, shrink);
            } else {
                self.add_glue(0.0, width, 0.0);
                self.add_penalty(0.0, 0, false);
                self.add_glue(space, -width, 0.0);
            }
        }

        self.add_closing_penalty();

        self.line_lengths.clear();
        self.line_lengths.push(width as i32);

        self.tolerance = 10.0;
        self.flagged_demerit = 100.0;
        self.line_demerit = 10.0;
        self.fitness_demerit = if block || centered { 1000.0 } else { 0.0 };

        let rows = self.break_lines();

        if rows.is_empty() {
            let e = Error::new(
                ErrorKind::WrapFailed,
                format!("no feasible line breaks for width {}", width),
            );
            log::warn!("{}", e);
            return Err(e);
        }

        let mut max_row_width: f32 = 0.0;
        for row in &rows {
            max_row_width = max_row_width.max(row.width);
        }

        let glyph_count = layout.shapes().iter().filter(|s| !s.is_space()).count();

        layout.offsets.clear();
        layout.offsets.reserve(glyph_count);

        let mut offset = Vec2::new(0.0, -((rows.len() - 1) as f32) * layout.height());
        let mut node_start = 0usize;
        let mut word_start = 0usize;

        for row in &rows {
            let mut line_word_spacing = space;
            if block {
                line_word_spacing +=
                    row.ratio as f32 * if row.ratio < 0.0 { shrink } else { stretch };
            }

            let offset_start = layout.offsets.len();

            for i in node_start..(row.breakpoint as usize) {
                let node = self.nodes[i];
                match node.kind {
                    NodeKind::Glue { .. } => {
                        if node.width > 0 {
                            offset.x += line_word_spacing;
                        }
                    }
                    NodeKind::Box { id } => {
                        if node.width > 0 {
                            for j in word_start..(id as usize) {
                                let c = layout.shapes()[j];
                                if !c.is_space() {
                                    layout.offsets.push(offset);
                                    offset.x += layout.advance_of(&c);
                                }
                            }
                            word_start = id as usize;
                        }
                    }
                    NodeKind::Penalty { .. } => {}
                }
            }

            if centered {
                let justify = (max_row_width - offset.x) / 2.0;
                for o in &mut layout.offsets[offset_start..] {
                    o.x += justify;
                }
            }

            node_start = row.breakpoint as usize + 1;

            offset.x = 0.0;
            offset.y += layout.height();
        }

        Ok(Vec2::new(max_row_width, rows.len() as f32 * layout.height()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::text::{
        shape_flags as flags, Direction, FaceId, FaceMetrics, Font, Properties, Shape,
    };

    fn word(shapes: &mut Vec<Shape>, glyphs: usize, advance: f32) {
        for _ in 0..glyphs {
            shapes.push(Shape::new(
                FaceId(0),
                1,
                glam::Vec2::ZERO,
                advance,
                flags::CLUSTER_START | flags::NO_BREAK,
            ));
        }
    }

    fn blank(shapes: &mut Vec<Shape>, advance: f32) {
        shapes.push(Shape::new(
            FaceId(0),
            2,
            glam::Vec2::ZERO,
            advance,
            flags::CLUSTER_START | flags::CAN_BREAK | flags::IS_SPACE,
        ));
    }

    fn layout_with_words(words: usize, glyphs_per_word: usize) -> LineLayout {
        let mut shapes = Vec::new();
        for i in 0..words {
            if i > 0 {
                blank(&mut shapes, 5.0);
            }
            word(&mut shapes, glyphs_per_word, 10.0);
        }

        let metrics = FaceMetrics {
            height: 10.0,
            ascent: 8.0,
            descent: 2.0,
            ..Default::default()
        };
        let font = Arc::new(Font::new(Properties::default()));
        LineLayout::new(font, shapes, metrics, Direction::LeftToRight)
    }

    #[test]
    fn single_word_is_one_row() {
        let mut layout = layout_with_words(1, 3);
        let mut wrap = WordWrap::new();

        let size = wrap.wrap_line(&mut layout, 100.0, 200.0, Alignment::Left).unwrap();

        assert_eq!(layout.offsets.len(), 3);
        assert_eq!(size.y, 10.0);
        assert!(layout.offsets.iter().all(|o| o.y == 0.0));
        assert_eq!(layout.offsets[0], glam::Vec2::ZERO);
        assert_eq!(layout.offsets[1].x, 10.0);
    }

    #[test]
    fn long_text_breaks_into_rows() {
        // 6 words of width 30 with spaces of width 5 cannot fit a width of
        // 70 in one row
        let mut layout = layout_with_words(6, 3);
        let mut wrap = WordWrap::new();

        let size = wrap.wrap_line(&mut layout, 70.0, 300.0, Alignment::Left).unwrap();

        let rows = (size.y / 10.0).round() as usize;
        assert!(rows >= 3, "expected at least 3 rows, got {rows}");

        // One offset per visible glyph
        assert_eq!(layout.offsets.len(), 18);

        // The last row sits at y = 0 and earlier rows above it
        let min_y = layout.offsets.iter().map(|o| o.y).fold(f32::MAX, f32::min);
        let max_y = layout.offsets.iter().map(|o| o.y).fold(f32::MIN, f32::max);
        assert_eq!(max_y, 0.0);
        assert_eq!(min_y, -((rows - 1) as f32) * 10.0);

        // No row wider than the target (plus the rounding slack per word)
        assert!(size.x <= 72.0);
    }

    #[test]
    fn oversized_word_fails() {
        let mut layout = layout_with_words(1, 30);
        let mut wrap = WordWrap::new();

        let result = wrap.wrap_line(&mut layout, 100.0, 150.0, Alignment::Left);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::WrapFailed);
    }

    #[test]
    fn width_grows_up_to_max_width() {
        let mut layout = layout_with_words(1, 30);
        let mut wrap = WordWrap::new();

        // 30 glyphs of 10px need 300px plus slack
        let size = wrap.wrap_line(&mut layout, 100.0, 400.0, Alignment::Left).unwrap();
        assert!(size.x >= 300.0);
        assert_eq!(size.y, 10.0);
    }

    #[test]
    fn centered_rows_are_shifted() {
        let mut layout = layout_with_words(3, 3);
        let mut wrap = WordWrap::new();

        // Force "word word / word"
        wrap.wrap_line(&mut layout, 70.0, 300.0, Alignment::Middle).unwrap();

        let last_row: Vec<_> = layout
            .offsets
            .iter()
            .filter(|o| o.y == 0.0)
            .collect();

        // The shorter last row starts indented
        assert!(!last_row.is_empty());
        assert!(last_row[0].x > 0.0);
    }

    #[test]
    fn wrapping_is_deterministic() {
        let mut first = layout_with_words(6, 3);
        let mut second = first.clone();
        let mut wrap = WordWrap::new();

        let a = wrap.wrap_line(&mut first, 70.0, 300.0, Alignment::Left).unwrap();
        let b = wrap.wrap_line(&mut second, 70.0, 300.0, Alignment::Left).unwrap();

        assert_eq!(a, b);
        assert_eq!(first.offsets, second.offsets);
    }

    #[test]
    fn justified_rows_stretch_spaces() {
        let mut layout = layout_with_words(6, 3);
        let mut wrap = WordWrap::new();

        let size = wrap.wrap_line(&mut layout, 70.0, 300.0, Alignment::Block).unwrap();
        assert_eq!(layout.offsets.len(), 18);
        assert!(size.y > 10.0);
    }
}
