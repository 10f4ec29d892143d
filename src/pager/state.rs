//! Pagination state machine for search results.
//!
//! The listing is in one state at a time, `(page, page_size)`. Every line
//! of user input goes through [`Pager::handle_input`], which mutates the
//! state and returns the [`Transition`] the session should perform.

use std::fmt;
use std::ops::Range;

/// Bounds and step for page-size changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            min: 5,
            max: 100,
            step: 5,
        }
    }
}

/// A parsed line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Grow,
    Shrink,
    /// 1-based result number as typed by the user.
    Select(usize),
    Quit,
}

impl Command {
    /// Parse one line of input. Returns `None` for anything unrecognized.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "n" | "next" => Some(Self::Next),
            "p" | "prev" => Some(Self::Prev),
            "+" | "grow" => Some(Self::Grow),
            "-" | "shrink" => Some(Self::Shrink),
            "q" | "quit" => Some(Self::Quit),
            other => other.parse::<usize>().ok().map(Self::Select),
        }
    }
}

/// Feedback shown under the listing when a command changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    FirstPage,
    LastPage,
    MinPageSize(usize),
    MaxPageSize(usize),
    InvalidInput,
    InvalidNumber,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstPage => write!(f, "Already on the first page."),
            Self::LastPage => write!(f, "Already on the last page."),
            Self::MinPageSize(n) => write!(f, "Page size is already at its minimum ({n})."),
            Self::MaxPageSize(n) => write!(f, "Page size is already at its maximum ({n})."),
            Self::InvalidInput => write!(f, "Invalid input."),
            Self::InvalidNumber => write!(f, "Invalid number."),
        }
    }
}

/// What the session does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Re-render the listing for the (possibly new) state.
    Render,
    /// Report a notice and re-render the same state.
    Notice(Notice),
    /// Show one result (0-based index into all results), then return to
    /// the listing.
    Detail(usize),
    /// Leave the session.
    Quit,
}

/// Listing position over `total` results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    total: usize,
    page: usize,
    page_size: usize,
    limits: PageLimits,
}

impl Pager {
    /// Start on the first page. `page_size` is clamped to `limits`.
    pub fn new(total: usize, page_size: usize, limits: PageLimits) -> Self {
        let limits = PageLimits {
            min: limits.min.max(1),
            max: limits.max.max(limits.min.max(1)),
            step: limits.step.max(1),
        };
        Self {
            total,
            page: 0,
            page_size: page_size.clamp(limits.min, limits.max),
            limits,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Current page, 0-based.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages; at least one, even with no results.
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Indices of the results on the current page.
    pub fn visible(&self) -> Range<usize> {
        let start = (self.page * self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        start..end
    }

    /// Parse and apply one line of input.
    pub fn handle_input(&mut self, input: &str) -> Transition {
        match Command::parse(input) {
            Some(command) => self.apply(command),
            None => Transition::Notice(Notice::InvalidInput),
        }
    }

    /// Apply a command to the state.
    pub fn apply(&mut self, command: Command) -> Transition {
        match command {
            Command::Next => {
                if self.page + 1 < self.total_pages() {
                    self.page += 1;
                    Transition::Render
                } else {
                    Transition::Notice(Notice::LastPage)
                }
            }
            Command::Prev => {
                if self.page > 0 {
                    self.page -= 1;
                    Transition::Render
                } else {
                    Transition::Notice(Notice::FirstPage)
                }
            }
            Command::Grow => {
                if self.page_size >= self.limits.max {
                    return Transition::Notice(Notice::MaxPageSize(self.limits.max));
                }
                self.resize(self.page_size + self.limits.step);
                Transition::Render
            }
            Command::Shrink => {
                if self.page_size <= self.limits.min {
                    return Transition::Notice(Notice::MinPageSize(self.limits.min));
                }
                self.resize(self.page_size.saturating_sub(self.limits.step));
                Transition::Render
            }
            Command::Select(n) if (1..=self.total).contains(&n) => Transition::Detail(n - 1),
            Command::Select(_) => Transition::Notice(Notice::InvalidNumber),
            Command::Quit => Transition::Quit,
        }
    }

    fn resize(&mut self, page_size: usize) {
        self.page_size = page_size.clamp(self.limits.min, self.limits.max);
        self.page = self.page.min(self.total_pages() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pager(total: usize, page_size: usize) -> Pager {
        Pager::new(total, page_size, PageLimits::default())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("n"), Some(Command::Next));
        assert_eq!(Command::parse(" NEXT \n"), Some(Command::Next));
        assert_eq!(Command::parse("p"), Some(Command::Prev));
        assert_eq!(Command::parse("+"), Some(Command::Grow));
        assert_eq!(Command::parse("-"), Some(Command::Shrink));
        assert_eq!(Command::parse("Q"), Some(Command::Quit));
        assert_eq!(Command::parse("12"), Some(Command::Select(12)));
        assert_eq!(Command::parse("abc"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("-3"), None);
    }

    #[test]
    fn test_twenty_five_results_two_pages() {
        let mut p = pager(25, 20);
        assert_eq!(p.total_pages(), 2);
        assert_eq!(p.visible(), 0..20);

        assert_eq!(p.handle_input("n"), Transition::Render);
        assert_eq!(p.page(), 1);
        assert_eq!(p.visible(), 20..25);

        assert_eq!(p.handle_input("n"), Transition::Notice(Notice::LastPage));
        assert_eq!(p.page(), 1);
        assert_eq!(
            Notice::LastPage.to_string(),
            "Already on the last page."
        );
    }

    #[test]
    fn test_prev_at_first_page() {
        let mut p = pager(25, 20);
        assert_eq!(p.handle_input("p"), Transition::Notice(Notice::FirstPage));
        assert_eq!(p.page(), 0);
    }

    #[test]
    fn test_grow_reclamps_page() {
        let mut p = pager(25, 10);
        p.apply(Command::Next);
        p.apply(Command::Next);
        assert_eq!(p.page(), 2);
        assert_eq!(p.visible(), 20..25);

        assert_eq!(p.apply(Command::Grow), Transition::Render);
        assert_eq!(p.page_size(), 15);
        assert_eq!(p.total_pages(), 2);
        assert_eq!(p.page(), 1);
        assert_eq!(p.visible(), 15..25);
    }

    #[test]
    fn test_page_size_bounds() {
        let mut p = pager(500, 100);
        assert_eq!(p.apply(Command::Grow), Transition::Notice(Notice::MaxPageSize(100)));
        assert_eq!(p.page_size(), 100);

        let mut p = pager(500, 7);
        assert_eq!(p.apply(Command::Shrink), Transition::Render);
        assert_eq!(p.page_size(), 5);
        assert_eq!(p.apply(Command::Shrink), Transition::Notice(Notice::MinPageSize(5)));
    }

    #[test]
    fn test_initial_page_size_is_clamped() {
        assert_eq!(pager(10, 1).page_size(), 5);
        assert_eq!(pager(10, 1000).page_size(), 100);
    }

    #[test]
    fn test_select_ranges() {
        let mut p = pager(25, 20);
        assert_eq!(p.handle_input("1"), Transition::Detail(0));
        // Any result can be selected, not only the visible page.
        assert_eq!(p.handle_input("25"), Transition::Detail(24));
        assert_eq!(p.handle_input("0"), Transition::Notice(Notice::InvalidNumber));
        assert_eq!(p.handle_input("26"), Transition::Notice(Notice::InvalidNumber));
        assert_eq!(p.handle_input("x"), Transition::Notice(Notice::InvalidInput));
        assert_eq!(p.page(), 0);
    }

    #[test]
    fn test_quit() {
        assert_eq!(pager(1, 20).handle_input("q"), Transition::Quit);
    }

    #[test]
    fn test_no_results_single_page() {
        let mut p = pager(0, 20);
        assert_eq!(p.total_pages(), 1);
        assert_eq!(p.visible(), 0..0);
        assert_eq!(p.apply(Command::Next), Transition::Notice(Notice::LastPage));
    }
}
