//! Interactive result session: render, read a command, act, repeat.

use std::io::Write;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::MboxError;
use crate::model::mail::SearchHit;
use crate::store::{ArchiveReader, IndexStore};

use super::input::InputSource;
use super::render::{self, Columns, Palette};
use super::state::{PageLimits, Pager, Transition};

/// Presentation settings for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub page_size: usize,
    pub limits: PageLimits,
    pub palette: Palette,
    pub columns: Columns,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            page_size: cfg.pager.page_size,
            limits: PageLimits {
                min: cfg.pager.min_page_size,
                max: cfg.pager.max_page_size,
                step: cfg.pager.page_step,
            },
            palette: Palette::new(cfg.pager.color),
            columns: Columns::from(&cfg.display),
        }
    }
}

/// One browsing session over a fixed list of search hits.
pub struct Session<'a, I, W> {
    store: &'a IndexStore,
    reader: &'a mut ArchiveReader,
    term: String,
    hits: Vec<SearchHit>,
    pager: Pager,
    options: SessionOptions,
    input: I,
    out: W,
}

impl<'a, I: InputSource, W: Write> Session<'a, I, W> {
    pub fn new(
        store: &'a IndexStore,
        reader: &'a mut ArchiveReader,
        term: &str,
        hits: Vec<SearchHit>,
        options: SessionOptions,
        input: I,
        out: W,
    ) -> Self {
        let pager = Pager::new(hits.len(), options.page_size, options.limits);
        Self {
            store,
            reader,
            term: term.to_string(),
            hits,
            pager,
            options,
            input,
            out,
        }
    }

    /// Run until the user quits or input ends.
    pub fn run(&mut self) -> anyhow::Result<()> {
        if self.hits.is_empty() {
            writeln!(self.out, "No matches found.")?;
            return Ok(());
        }

        loop {
            render::render_listing(
                &mut self.out,
                &self.hits,
                &self.pager,
                &self.term,
                self.options.palette,
                self.options.columns,
            )?;
            write!(self.out, "\n{}", render::prompt(self.options.palette))?;
            self.out.flush()?;

            let Some(line) = self.input.read_line()? else {
                debug!("Input closed, leaving session");
                break;
            };

            match self.pager.handle_input(&line) {
                Transition::Render => {
                    debug!(
                        page = self.pager.page(),
                        page_size = self.pager.page_size(),
                        "Page changed"
                    );
                }
                Transition::Notice(notice) => {
                    writeln!(self.out, "{}", self.options.palette.error(&notice.to_string()))?;
                }
                Transition::Detail(index) => {
                    self.show_detail(index)?;
                    write!(self.out, "\nPress Enter to return to the list...")?;
                    self.out.flush()?;
                    if self.input.read_line()?.is_none() {
                        break;
                    }
                }
                Transition::Quit => break,
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// Print one message. Lookup and read failures are reported inline and
    /// do not end the session.
    fn show_detail(&mut self, index: usize) -> anyhow::Result<()> {
        let id = self.hits[index].id;
        debug!(index, id, "Showing message");

        let shown = match self.store.record(id) {
            Ok(Some(record)) => match self.reader.decoded_message(&record) {
                Ok(message) => {
                    render::render_message(
                        &mut self.out,
                        message,
                        &self.term,
                        self.options.palette,
                    )?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Ok(None) => Err(MboxError::MessageNotFound(id)),
            Err(e) => Err(e),
        };

        if let Err(e) = shown {
            warn!(id, error = %e, "Could not show message");
            writeln!(
                self.out,
                "{}",
                self.options.palette.error(&format!("Error: {e}"))
            )?;
        }
        Ok(())
    }
}
