//! Selection and scroll state for a presentation layer.
//!
//! The state is a plain record owned by whoever draws the output. The
//! matcher never reads or writes it, and none of the operations here need
//! to re-run the matcher.

use std::path::PathBuf;

use crate::model::{Match, Output};

pub const DEFAULT_TEXT_SIZE: u32 = 12;

/// Settings only a graphical front end cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    pub text_size: u32,
    pub font: Option<PathBuf>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            text_size: DEFAULT_TEXT_SIZE,
            font: None,
        }
    }
}

/// First visible row of each pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaneScroll {
    pub asm: usize,
    pub src: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    selected: Option<usize>,
    /// Block index both panes are synchronised on
    cursor: usize,
    scroll: PaneScroll,
}

/// A second view opened on the currently selected match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedView {
    pub title: String,
    pub match_index: usize,
    pub state: ViewState,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> PaneScroll {
        self.scroll
    }

    pub fn selected_match<'a>(&self, output: &'a Output) -> Option<&'a Match> {
        self.selected.and_then(|i| output.matches.get(i))
    }

    /// Select the match at `index`. An index past the end clears the
    /// selection. Switching to a different match resets scrolling;
    /// reselecting the current one keeps it.
    pub fn select_index(&mut self, output: &Output, index: usize) {
        if index >= output.matches.len() {
            self.selected = None;
            self.reset_scroll();
            return;
        }
        if self.selected == Some(index) {
            return;
        }
        self.selected = Some(index);
        self.reset_scroll();
    }

    /// Select the first match if nothing is selected yet.
    pub fn ensure_selection(&mut self, output: &Output) {
        if self.selected.is_none() && !output.matches.is_empty() {
            self.select_index(output, 0);
        }
    }

    pub fn reset_scroll(&mut self) {
        self.cursor = 0;
        self.scroll = PaneScroll::default();
    }

    /// Move the shared cursor to `block` (clamped) and scroll both panes so
    /// that block's rows are at the top.
    pub fn scroll_to_block(&mut self, m: &Match, block: usize) {
        if m.blocks.is_empty() {
            self.reset_scroll();
            return;
        }
        let block = block.min(m.blocks.len() - 1);
        self.cursor = block;
        self.scroll = PaneScroll {
            asm: (0..block).map(|b| asm_rows(m, b)).sum(),
            src: (0..block).map(|b| src_rows(m, b)).sum(),
        };
    }

    /// Shift the cursor by `delta` blocks.
    pub fn scroll_by(&mut self, m: &Match, delta: isize) {
        let target = self.cursor.saturating_add_signed(delta);
        self.scroll_to_block(m, target);
    }

    /// Copy of the current state for a separate view of the selected match.
    pub fn open_in_new(&self, output: &Output) -> Option<DetachedView> {
        let index = self.selected?;
        let m = output.matches.get(index)?;
        Some(DetachedView {
            title: m.name.clone(),
            match_index: index,
            state: self.clone(),
        })
    }
}

/// Rows block `b` takes in the assembly pane.
pub fn asm_rows(m: &Match, b: usize) -> usize {
    m.blocks.get(b).map_or(0, |block| block.instructions.len())
}

/// Rows block `b` takes in the source pane: its window, or one placeholder
/// row when the source is unavailable.
pub fn src_rows(m: &Match, b: usize) -> usize {
    match m.sources.get(b) {
        Some(Some(window)) => window.lines.len(),
        Some(None) => 1,
        None => 0,
    }
}
