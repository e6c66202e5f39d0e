//! Terminal interaction used by the assistant.
//!
//! [`Prompter`] keeps the assistant independent of the terminal so the whole
//! session can be driven from tests with a scripted double.

use std::io::{self, Write};

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use thiserror::Error;

/// Errors surfaced while interacting with the user.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PromptError {
    /// Raised when a selection is requested from an empty list.
    #[error("nothing to choose from for '{prompt}'")]
    NoChoices {
        /// Prompt text shown to the user.
        prompt: String,
    },
    /// Raised when a selection index does not match any offered item.
    #[error("selection {index} is outside the {len} offered choices")]
    OutOfRange {
        /// Index returned by the prompter.
        index: usize,
        /// Number of items offered.
        len: usize,
    },
    /// Raised when the terminal cannot be read or written.
    #[error("terminal interaction failed: {0}")]
    Terminal(String),
}

impl From<dialoguer::Error> for PromptError {
    fn from(value: dialoguer::Error) -> Self {
        Self::Terminal(value.to_string())
    }
}

/// Source of user decisions.
pub trait Prompter {
    /// Asks the user to pick one of `items`, returning its index. The first
    /// item is the default.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::NoChoices`] for an empty list and
    /// [`PromptError::Terminal`] when the terminal fails.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError>;

    /// Asks a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Terminal`] when the terminal fails.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Asks for free text. An empty answer is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Terminal`] when the terminal fails.
    fn input(&self, prompt: &str) -> Result<String, PromptError>;

    /// Shows an informational line.
    fn say(&self, message: &str);
}

/// Asks `prompter` to choose one of `items` and returns the chosen item.
///
/// # Errors
///
/// Propagates prompt failures and returns [`PromptError::OutOfRange`] when
/// the prompter answers with an index past the end of `items`.
pub fn choose<'a, P, T>(
    prompter: &P,
    prompt: &str,
    items: &'a [T],
    label: impl Fn(&T) -> String,
) -> Result<&'a T, PromptError>
where
    P: Prompter + ?Sized,
{
    let labels: Vec<String> = items.iter().map(label).collect();
    let index = prompter.select(prompt, &labels)?;
    items.get(index).ok_or(PromptError::OutOfRange {
        index,
        len: items.len(),
    })
}

/// [`Prompter`] backed by `dialoguer` on the controlling terminal.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    /// Creates a prompter with the colourful theme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        if items.is_empty() {
            return Err(PromptError::NoChoices {
                prompt: prompt.to_owned(),
            });
        }
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(0)
            .items(items)
            .interact()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn input(&self, prompt: &str) -> Result<String, PromptError> {
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn say(&self, message: &str) {
        writeln!(io::stdout(), "{message}").ok();
    }
}
