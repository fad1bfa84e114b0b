//! Target disambiguation
//!
//! Turns the resolver's candidates into the list of processes to capture:
//!
//! - none: fall back to the root, asking first unless its name already looks
//!   like Python
//! - one: take it without asking
//! - several: the user must pick one or "all"; there is no silent default
//!
//! Prompts sit behind [`Prompter`] so the policy can be tested without a
//! terminal.

use std::io::IsTerminal;

use anyhow::{bail, Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect};

use crate::domain::types::looks_like_interpreter;
use crate::domain::{ProcessCandidate, ProcessInfo};

/// Characters of command line shown per candidate.
pub const COMMAND_LINE_PREVIEW: usize = 80;

/// Answer to the multi-candidate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Index into the candidate list
    One(usize),
    All,
}

/// Asks the user to resolve ambiguity.
pub trait Prompter {
    /// No interpreter found below `root`: sample the root anyway?
    fn confirm_root_fallback(&mut self, root: &ProcessInfo) -> Result<bool>;

    /// Pick among several candidates. `None` means the user cancelled.
    fn choose(&mut self, candidates: &[ProcessCandidate]) -> Result<Option<Choice>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Targets(Vec<ProcessInfo>),
    /// Aborted at a prompt; nothing is captured.
    Cancelled,
}

/// Apply the disambiguation policy.
pub fn select_targets(
    root: &ProcessInfo,
    candidates: &[ProcessCandidate],
    prompter: &mut dyn Prompter,
) -> Result<Selection> {
    match candidates {
        [] => {
            if looks_like_interpreter(&root.name) || prompter.confirm_root_fallback(root)? {
                Ok(Selection::Targets(vec![root.clone()]))
            } else {
                Ok(Selection::Cancelled)
            }
        }
        [only] => Ok(Selection::Targets(vec![only.info()])),
        _ => match prompter.choose(candidates)? {
            None => Ok(Selection::Cancelled),
            Some(Choice::All) => {
                Ok(Selection::Targets(candidates.iter().map(ProcessCandidate::info).collect()))
            }
            Some(Choice::One(index)) => match candidates.get(index) {
                Some(candidate) => Ok(Selection::Targets(vec![candidate.info()])),
                None => bail!("Selection {index} out of range ({} candidates)", candidates.len()),
            },
        },
    }
}

/// Picker label: `name (PID: n)` plus the start of the command line.
#[must_use]
pub fn candidate_label(candidate: &ProcessCandidate) -> String {
    let label = candidate.info().label();
    match candidate.command_line.as_deref().map(str::trim) {
        Some(cmdline) if !cmdline.is_empty() => {
            format!("{label}  {}", truncate(cmdline, COMMAND_LINE_PREVIEW))
        }
        _ => label,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Terminal prompts via dialoguer.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Prompter for DialoguerPrompter {
    fn confirm_root_fallback(&mut self, root: &ProcessInfo) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(format!(
                "No Python process found under {}. Capture it anyway?",
                root.label()
            ))
            .default(false)
            .interact_opt()
            .context("Confirmation prompt failed")?;
        Ok(answer.unwrap_or(false))
    }

    fn choose(&mut self, candidates: &[ProcessCandidate]) -> Result<Option<Choice>> {
        let mut items: Vec<String> = candidates.iter().map(candidate_label).collect();
        items.push("Capture all Python processes".to_string());

        let picked = FuzzySelect::with_theme(&self.theme)
            .with_prompt("Multiple Python processes found (type to filter)")
            .items(&items)
            .default(0)
            .interact_opt()
            .context("Interactive picker failed")?;

        Ok(picked.map(|index| {
            if index == candidates.len() {
                Choice::All
            } else {
                Choice::One(index)
            }
        }))
    }
}

/// Prompter for scripts and pipes: never blocks on input.
///
/// The root fallback is taken only with `assume_yes`; several candidates are
/// an error listing them, so the caller can rerun against one pid.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter {
    pub assume_yes: bool,
}

impl Prompter for NonInteractivePrompter {
    fn confirm_root_fallback(&mut self, root: &ProcessInfo) -> Result<bool> {
        if !self.assume_yes {
            log::info!("No Python process under {}; pass --yes to capture it anyway", root.label());
        }
        Ok(self.assume_yes)
    }

    fn choose(&mut self, candidates: &[ProcessCandidate]) -> Result<Option<Choice>> {
        let listing: Vec<String> =
            candidates.iter().map(|c| format!("  {}", candidate_label(c))).collect();
        bail!(
            "Multiple Python processes found:\n{}\n\n\
             Capture one with: pystacker capture <PID>",
            listing.join("\n")
        )
    }
}

/// Dialoguer when attached to a terminal, otherwise non-interactive.
#[must_use]
pub fn default_prompter(assume_yes: bool) -> Box<dyn Prompter> {
    if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        Box::<DialoguerPrompter>::default()
    } else {
        Box::new(NonInteractivePrompter { assume_yes })
    }
}
